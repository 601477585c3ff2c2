//! Repository adapter that speaks domain objects to callers and entities to
//! the store underneath.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    CrudRepository, Example, ExampleRepository, Mapper, Page, Pageable,
    PagingAndSortingRepository, Repository, RepositoryError, Sort,
};

/// Exposes a store of `M::Entity` as a store of `M::Domain`.
///
/// Inputs are converted with [`Mapper::to_entity`] before the call and
/// results with [`Mapper::to_domain`] after it. Ids, sorts and paging
/// requests pass through untouched. Every capability of the wrapped store is
/// re-exposed and nothing more: a store that only implements
/// [`CrudRepository`] yields a mapped repository that only implements
/// [`CrudRepository`].
///
/// The adapter keeps no state of its own beyond its two collaborators, so it
/// is as thread-safe as they are.
pub struct MappedRepository<R, M> {
    repository: Arc<R>,
    mapper: M,
}

impl<R, M> MappedRepository<R, M>
where
    M: Mapper,
{
    pub fn new(repository: Arc<R>, mapper: M) -> Self {
        Self { repository, mapper }
    }

    /// The wrapped store.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn to_entity(&self, item: M::Domain) -> M::Entity {
        self.mapper.to_entity(item)
    }

    pub fn to_entity_list(&self, items: Vec<M::Domain>) -> Vec<M::Entity> {
        items.into_iter().map(|d| self.mapper.to_entity(d)).collect()
    }

    /// Re-type the probe of `example`, keeping its matcher.
    pub fn to_entity_example(&self, example: Example<M::Domain>) -> Example<M::Entity> {
        example.map_probe(|probe| self.mapper.to_entity(probe))
    }

    pub fn to_domain_option(&self, found: Option<M::Entity>) -> Option<M::Domain> {
        found.map(|e| self.mapper.to_domain(e))
    }

    pub fn to_domain_list(&self, entities: Vec<M::Entity>) -> Vec<M::Domain> {
        entities
            .into_iter()
            .map(|e| self.mapper.to_domain(e))
            .collect()
    }

    fn to_domain_page(&self, page: Page<M::Entity>) -> Page<M::Domain> {
        page.map(|e| self.mapper.to_domain(e))
    }
}

impl<R, M> Clone for MappedRepository<R, M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            mapper: self.mapper.clone(),
        }
    }
}

/// Run one delegated call, normalising its failure into [`RepositoryError`].
/// A successful payload is returned exactly as produced.
fn attempt<T, E, F>(operation: &'static str, call: F) -> Result<T, RepositoryError>
where
    F: FnOnce() -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    trace!(operation, "delegating to wrapped repository");
    call().map_err(|err| {
        debug!(operation, error = %err, "wrapped repository call failed");
        RepositoryError::wrap(err)
    })
}

impl<R, M, ID> CrudRepository<M::Domain, ID> for MappedRepository<R, M>
where
    R: CrudRepository<M::Entity, ID>,
    M: Mapper,
{
    type Error = RepositoryError;

    fn find_by_id(&self, id: &ID) -> Result<Option<M::Domain>, RepositoryError> {
        let found = attempt("find_by_id", || self.repository.find_by_id(id))?;
        Ok(self.to_domain_option(found))
    }

    fn exists_by_id(&self, id: &ID) -> Result<bool, RepositoryError> {
        attempt("exists_by_id", || self.repository.exists_by_id(id))
    }

    fn find_all(&self) -> Result<Vec<M::Domain>, RepositoryError> {
        let entities = attempt("find_all", || self.repository.find_all())?;
        Ok(self.to_domain_list(entities))
    }

    fn find_all_by_id(&self, ids: &[ID]) -> Result<Vec<M::Domain>, RepositoryError> {
        let entities = attempt("find_all_by_id", || self.repository.find_all_by_id(ids))?;
        Ok(self.to_domain_list(entities))
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        attempt("count", || self.repository.count())
    }

    fn delete_by_id(&self, id: &ID) -> Result<(), RepositoryError> {
        attempt("delete_by_id", || self.repository.delete_by_id(id))
    }

    fn delete(&self, item: M::Domain) -> Result<(), RepositoryError> {
        let entity = self.mapper.to_entity(item);
        attempt("delete", || self.repository.delete(entity))
    }

    fn delete_all_by_id(&self, ids: &[ID]) -> Result<(), RepositoryError> {
        attempt("delete_all_by_id", || self.repository.delete_all_by_id(ids))
    }

    fn delete_many(&self, items: Vec<M::Domain>) -> Result<(), RepositoryError> {
        let entities = self.to_entity_list(items);
        attempt("delete_many", || self.repository.delete_many(entities))
    }

    fn delete_all(&self) -> Result<(), RepositoryError> {
        attempt("delete_all", || self.repository.delete_all())
    }

    fn save(&self, item: M::Domain) -> Result<M::Domain, RepositoryError> {
        let entity = self.mapper.to_entity(item);
        let saved = attempt("save", || self.repository.save(entity))?;
        Ok(self.mapper.to_domain(saved))
    }

    fn save_all(&self, items: Vec<M::Domain>) -> Result<Vec<M::Domain>, RepositoryError> {
        let entities = self.to_entity_list(items);
        let saved = attempt("save_all", || self.repository.save_all(entities))?;
        Ok(self.to_domain_list(saved))
    }
}

impl<R, M, ID> PagingAndSortingRepository<M::Domain, ID> for MappedRepository<R, M>
where
    R: PagingAndSortingRepository<M::Entity, ID>,
    M: Mapper,
{
    fn find_all_sorted(&self, sort: &Sort) -> Result<Vec<M::Domain>, RepositoryError> {
        let entities = attempt("find_all_sorted", || self.repository.find_all_sorted(sort))?;
        Ok(self.to_domain_list(entities))
    }

    fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<M::Domain>, RepositoryError> {
        let page = attempt("find_all_paged", || self.repository.find_all_paged(pageable))?;
        Ok(self.to_domain_page(page))
    }
}

impl<R, M, ID> ExampleRepository<M::Domain, ID> for MappedRepository<R, M>
where
    R: ExampleRepository<M::Entity, ID>,
    M: Mapper,
{
    fn find_one(&self, example: Example<M::Domain>) -> Result<Option<M::Domain>, RepositoryError> {
        let example = self.to_entity_example(example);
        let found = attempt("find_one", || self.repository.find_one(example))?;
        Ok(self.to_domain_option(found))
    }

    fn find_all_by_example(
        &self,
        example: Example<M::Domain>,
    ) -> Result<Vec<M::Domain>, RepositoryError> {
        let example = self.to_entity_example(example);
        let entities = attempt("find_all_by_example", || {
            self.repository.find_all_by_example(example)
        })?;
        Ok(self.to_domain_list(entities))
    }

    fn find_all_by_example_sorted(
        &self,
        example: Example<M::Domain>,
        sort: &Sort,
    ) -> Result<Vec<M::Domain>, RepositoryError> {
        let example = self.to_entity_example(example);
        let entities = attempt("find_all_by_example_sorted", || {
            self.repository.find_all_by_example_sorted(example, sort)
        })?;
        Ok(self.to_domain_list(entities))
    }

    fn find_all_by_example_paged(
        &self,
        example: Example<M::Domain>,
        pageable: &Pageable,
    ) -> Result<Page<M::Domain>, RepositoryError> {
        let example = self.to_entity_example(example);
        let page = attempt("find_all_by_example_paged", || {
            self.repository.find_all_by_example_paged(example, pageable)
        })?;
        Ok(self.to_domain_page(page))
    }

    fn count_by_example(&self, example: Example<M::Domain>) -> Result<u64, RepositoryError> {
        let example = self.to_entity_example(example);
        attempt("count_by_example", || self.repository.count_by_example(example))
    }

    fn exists_by_example(&self, example: Example<M::Domain>) -> Result<bool, RepositoryError> {
        let example = self.to_entity_example(example);
        attempt("exists_by_example", || {
            self.repository.exists_by_example(example)
        })
    }
}

impl<R, M, ID> Repository<M::Domain, ID> for MappedRepository<R, M>
where
    R: Repository<M::Entity, ID>,
    M: Mapper,
{
    fn flush(&self) -> Result<(), RepositoryError> {
        attempt("flush", || self.repository.flush())
    }

    fn save_and_flush(&self, item: M::Domain) -> Result<M::Domain, RepositoryError> {
        let entity = self.mapper.to_entity(item);
        let saved = attempt("save_and_flush", || self.repository.save_and_flush(entity))?;
        Ok(self.mapper.to_domain(saved))
    }

    fn save_all_and_flush(
        &self,
        items: Vec<M::Domain>,
    ) -> Result<Vec<M::Domain>, RepositoryError> {
        let entities = self.to_entity_list(items);
        let saved = attempt("save_all_and_flush", || {
            self.repository.save_all_and_flush(entities)
        })?;
        Ok(self.to_domain_list(saved))
    }

    fn delete_in_batch(&self, items: Vec<M::Domain>) -> Result<(), RepositoryError> {
        let entities = self.to_entity_list(items);
        attempt("delete_in_batch", || self.repository.delete_in_batch(entities))
    }

    fn delete_many_in_batch(&self, items: Vec<M::Domain>) -> Result<(), RepositoryError> {
        let entities = self.to_entity_list(items);
        attempt("delete_many_in_batch", || {
            self.repository.delete_many_in_batch(entities)
        })
    }

    fn delete_all_by_id_in_batch(&self, ids: &[ID]) -> Result<(), RepositoryError> {
        attempt("delete_all_by_id_in_batch", || {
            self.repository.delete_all_by_id_in_batch(ids)
        })
    }

    fn delete_all_in_batch(&self) -> Result<(), RepositoryError> {
        attempt("delete_all_in_batch", || self.repository.delete_all_in_batch())
    }

    fn get_one(&self, id: &ID) -> Result<M::Domain, RepositoryError> {
        let entity = attempt("get_one", || self.repository.get_one(id))?;
        Ok(self.mapper.to_domain(entity))
    }

    fn get_by_id(&self, id: &ID) -> Result<M::Domain, RepositoryError> {
        let entity = attempt("get_by_id", || self.repository.get_by_id(id))?;
        Ok(self.mapper.to_domain(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Identified, InMemoryRepository, MemoryRepoError};
    use crate::{ExampleMatcher, FnMapper, SequentialIds, StringMatcher};
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stored form: names are kept upper-case.
    #[derive(Clone, Debug, PartialEq, Serialize)]
    struct PersonRow {
        id: Option<u64>,
        name: String,
        city: Option<String>,
        age: u32,
    }

    impl Identified for PersonRow {
        type Id = u64;

        fn id(&self) -> Option<u64> {
            self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Person {
        id: Option<u64>,
        name: String,
        city: Option<String>,
        age: u32,
    }

    #[derive(Default)]
    struct CountingMapper {
        to_domain: AtomicUsize,
        to_entity: AtomicUsize,
    }

    impl CountingMapper {
        fn calls(&self) -> (usize, usize) {
            (
                self.to_domain.load(Ordering::SeqCst),
                self.to_entity.load(Ordering::SeqCst),
            )
        }
    }

    impl Mapper for CountingMapper {
        type Domain = Person;
        type Entity = PersonRow;

        fn to_domain(&self, row: PersonRow) -> Person {
            self.to_domain.fetch_add(1, Ordering::SeqCst);
            Person {
                id: row.id,
                name: row.name.to_lowercase(),
                city: row.city,
                age: row.age,
            }
        }

        fn to_entity(&self, person: Person) -> PersonRow {
            self.to_entity.fetch_add(1, Ordering::SeqCst);
            PersonRow {
                id: person.id,
                name: person.name.to_uppercase(),
                city: person.city,
                age: person.age,
            }
        }
    }

    type Store = InMemoryRepository<PersonRow, SequentialIds>;

    fn person(name: &str, city: Option<&str>, age: u32) -> Person {
        Person {
            id: None,
            name: name.to_string(),
            city: city.map(str::to_string),
            age,
        }
    }

    fn row(name: &str, age: u32) -> PersonRow {
        PersonRow {
            id: None,
            name: name.to_uppercase(),
            city: None,
            age,
        }
    }

    fn setup(rows: Vec<PersonRow>) -> (Arc<Store>, MappedRepository<Store, CountingMapper>) {
        let store = Arc::new(InMemoryRepository::new(SequentialIds));
        store.save_all(rows).unwrap();
        let mapped = MappedRepository::new(Arc::clone(&store), CountingMapper::default());
        (store, mapped)
    }

    #[test]
    fn mapper_round_trips() {
        let mapper = CountingMapper::default();
        let original = Person {
            id: Some(7),
            ..person("ann", Some("Oslo"), 31)
        };
        assert_eq!(mapper.to_domain(mapper.to_entity(original.clone())), original);
    }

    #[test]
    fn find_all_translates_every_row_in_order() {
        let (store, mapped) = setup(vec![row("cid", 27), row("ann", 31), row("bob", 45)]);
        let expected: Vec<Person> = store
            .find_all()
            .unwrap()
            .into_iter()
            .map(|r| CountingMapper::default().to_domain(r))
            .collect();
        let found = mapped.find_all().unwrap();
        assert_eq!(found, expected);
        assert_eq!(
            found.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ["cid", "ann", "bob"]
        );
        assert_eq!(mapped.mapper().calls(), (3, 0));
    }

    #[test]
    fn empty_store_gives_empty_results() {
        let (_store, mapped) = setup(Vec::new());
        assert!(mapped.find_all().unwrap().is_empty());
        assert!(mapped.find_all_by_id(&[1, 2]).unwrap().is_empty());
        assert_eq!(mapped.count().unwrap(), 0);
    }

    #[test]
    fn find_by_id_present_and_missing() {
        let (_store, mapped) = setup(vec![row("ann", 31)]);
        assert_eq!(mapped.find_by_id(&99).unwrap(), None);
        assert_eq!(mapped.mapper().calls(), (0, 0));
        let ann = mapped.find_by_id(&1).unwrap();
        assert_eq!(ann.map(|p| p.name), Some("ann".to_string()));
        assert!(mapped.exists_by_id(&1).unwrap());
    }

    #[test]
    fn save_returns_persisted_state() {
        let (store, mapped) = setup(Vec::new());
        let input = person("eve", Some("Bergen"), 19);
        let saved = mapped.save(input.clone()).unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.name, "eve");
        let stored = store.find_by_id(&1).unwrap();
        let expected_row = PersonRow {
            id: Some(1),
            ..CountingMapper::default().to_entity(input)
        };
        assert_eq!(stored, Some(expected_row));
        assert_eq!(mapped.mapper().calls(), (1, 1));
    }

    #[test]
    fn save_all_keeps_order() {
        let (_store, mapped) = setup(Vec::new());
        let saved = mapped
            .save_all(vec![person("a", None, 1), person("b", None, 2)])
            .unwrap();
        let ids: Vec<Option<u64>> = saved.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
        assert_eq!(saved[1].name, "b");
    }

    #[test]
    fn page_metadata_survives_translation() {
        let rows = (0..10).map(|n| row(&format!("p{n}"), n)).collect();
        let (_store, mapped) = setup(rows);
        let page = mapped
            .find_all_paged(&Pageable::of(1, 3).unwrap())
            .unwrap();
        assert_eq!(page.number_of_elements(), 3);
        assert_eq!(page.total_elements(), 10);
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), 3);
        assert_eq!(
            page.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ["p3", "p4", "p5"]
        );
        assert_eq!(mapped.mapper().calls(), (3, 0));
    }

    #[test]
    fn sorted_and_by_id_lookups_pass_arguments_through() {
        let (_store, mapped) = setup(vec![row("ann", 31), row("bob", 45), row("cid", 27)]);
        let ages: Vec<u32> = mapped
            .find_all_sorted(&Sort::by(["age"]))
            .unwrap()
            .iter()
            .map(|p| p.age)
            .collect();
        assert_eq!(ages, vec![27, 31, 45]);

        let names: Vec<String> = mapped
            .find_all_by_id(&[3, 1])
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["cid", "ann"]);
    }

    #[test]
    fn failed_delete_by_id_translates_nothing() {
        let (store, mapped) = setup(vec![row("ann", 31)]);
        store.fail_next("delete_by_id").unwrap();

        let err = mapped.delete_by_id(&1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MemoryRepoError>(),
            Some(MemoryRepoError::Injected {
                operation: "delete_by_id"
            })
        ));
        assert_eq!(mapped.mapper().calls(), (0, 0));
        assert!(store.exists_by_id(&1).unwrap());
    }

    #[test]
    fn get_by_id_miss_is_passed_through() {
        let (_store, mapped) = setup(Vec::new());
        let err = mapped.get_by_id(&5).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MemoryRepoError>(),
            Some(MemoryRepoError::NotFound { .. })
        ));
        assert!(mapped.get_one(&5).is_err());
        assert_eq!(mapped.mapper().calls(), (0, 0));
    }

    #[test]
    fn example_probe_is_translated_and_matcher_kept() {
        let (_store, mapped) = setup(vec![row("dee", 52), row("dan", 40), row("bob", 45)]);
        let starts_with_d = Example::with_matcher(
            person("d", None, 0),
            ExampleMatcher::matching()
                .with_ignore_paths(["age"])
                .with_string_matcher(StringMatcher::Starting),
        );

        let found = mapped.find_all_by_example(starts_with_d.clone()).unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["dee", "dan"]);

        let sorted = mapped
            .find_all_by_example_sorted(starts_with_d.clone(), &Sort::by(["age"]))
            .unwrap();
        assert_eq!(sorted.first().map(|p| p.age), Some(40));

        let page = mapped
            .find_all_by_example_paged(starts_with_d.clone(), &Pageable::of(0, 1).unwrap())
            .unwrap();
        assert_eq!(page.total_elements(), 2);
        assert_eq!(page.content().len(), 1);

        let one = mapped
            .find_one(Example::with_matcher(
                person("bob", None, 0),
                ExampleMatcher::matching().with_ignore_paths(["age"]),
            ))
            .unwrap();
        assert_eq!(one.map(|p| p.age), Some(45));
    }

    #[test]
    fn count_and_exists_by_example_only_translate_the_probe() {
        let (_store, mapped) = setup(vec![row("dee", 52), row("dan", 40)]);
        let probe = Example::with_matcher(
            person("dan", None, 0),
            ExampleMatcher::matching().with_ignore_paths(["age"]),
        );
        assert_eq!(mapped.count_by_example(probe.clone()).unwrap(), 1);
        assert!(mapped.exists_by_example(probe).unwrap());
        assert_eq!(mapped.mapper().calls(), (0, 2));
    }

    #[test]
    fn batch_and_flush_operations_delegate() {
        let (store, mapped) = setup(Vec::new());
        let saved = mapped.save_and_flush(person("ann", None, 31)).unwrap();
        let more = mapped
            .save_all_and_flush(vec![person("bob", None, 45), person("cid", None, 27)])
            .unwrap();
        mapped.flush().unwrap();
        assert_eq!(store.flush_count(), 3);
        assert_eq!(mapped.count().unwrap(), 3);

        mapped.delete_in_batch(vec![saved]).unwrap();
        assert_eq!(mapped.count().unwrap(), 2);
        mapped.delete_many_in_batch(vec![more[0].clone()]).unwrap();
        mapped.delete_all_by_id_in_batch(&[3]).unwrap();
        assert_eq!(mapped.count().unwrap(), 0);

        mapped.save_all(vec![person("x", None, 1), person("y", None, 2)]).unwrap();
        mapped.delete_all_in_batch().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn deletes_translate_values_not_ids() {
        let (store, mapped) = setup(vec![row("ann", 31), row("bob", 45), row("cid", 27), row("dee", 52)]);
        let ann = mapped.get_by_id(&1).unwrap();
        mapped.delete(ann).unwrap();
        let bob = mapped.get_by_id(&2).unwrap();
        mapped.delete_many(vec![bob]).unwrap();
        mapped.delete_all_by_id(&[3]).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        // get_by_id twice (2 to_domain), delete + delete_many (2 to_entity)
        assert_eq!(mapped.mapper().calls(), (2, 2));
        mapped.delete_all().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn failed_save_all_delegates_nothing() {
        let (store, mapped) = setup(Vec::new());
        store.fail_next("save_all").unwrap();
        let result = mapped.save_all(vec![person("a", None, 1), person("b", None, 2)]);
        assert!(result.is_err());
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(mapped.mapper().calls(), (0, 2));
    }

    #[test]
    fn stacked_adapters_do_not_double_wrap() {
        let (store, inner) = setup(Vec::new());
        let identity = FnMapper::new(|p: Person| p, |p: Person| p);
        let outer = MappedRepository::new(Arc::new(inner), identity);
        store.fail_next("count").unwrap();

        let err = outer.count().unwrap_err();
        assert!(err.downcast_ref::<MemoryRepoError>().is_some());
        assert!(err.downcast_ref::<RepositoryError>().is_none());
    }

    #[test]
    #[should_panic(expected = "unmappable row")]
    fn mapper_panic_unwinds_through_the_call() {
        let (store, _mapped) = setup(vec![row("ann", 31)]);
        let failing = FnMapper::new(
            |_: PersonRow| -> Person { panic!("unmappable row") },
            |p: Person| PersonRow {
                id: p.id,
                name: p.name,
                city: p.city,
                age: p.age,
            },
        );
        let mapped = MappedRepository::new(store, failing);
        let _ = mapped.find_all();
    }

    #[test]
    fn shared_across_threads() {
        let (store, mapped) = setup(Vec::new());
        let mapped = Arc::new(mapped);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let mapped = Arc::clone(&mapped);
                scope.spawn(move || {
                    for n in 0..25 {
                        mapped.save(person(&format!("t{t}-{n}"), None, n)).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.count().unwrap(), 100);
        assert_eq!(mapped.mapper().calls(), (100, 100));
    }
}
