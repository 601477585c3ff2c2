use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use super::matching::{compare_documents, ExampleFilter};
use crate::{
    CrudRepository, Example, ExampleRepository, IdGenerator, Page, Pageable,
    PagingAndSortingRepository, Repository, Sort,
};

/// Generated ids are retried this many times before giving up.
const MAX_ID_ATTEMPTS: usize = 100;

/// Entities that carry their own (possibly not yet assigned) id.
pub trait Identified {
    type Id: Clone + Ord + Debug + Send + Sync;

    fn id(&self) -> Option<Self::Id>;
    fn set_id(&mut self, id: Self::Id);
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryRepoError {
    #[error("no entity with id {id}")]
    NotFound { id: String },
    #[error("mutex poisoned")]
    LockPoisoned,
    #[error("failed to generate unique id")]
    IdSpaceExhausted,
    #[error("entity cannot be represented as a document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("invalid example pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("injected failure in {operation}")]
    Injected { operation: &'static str },
}

/// In-memory implementation of the full [`Repository`] contract.
///
/// Rows live in a mutex-guarded map ordered by id, so unsorted reads come
/// back in id order. Entities without an id get one from the generator on
/// save. Example queries and sorts work on the serde representation of `T`.
pub struct InMemoryRepository<T: Identified, G> {
    rows: Mutex<BTreeMap<T::Id, T>>,
    ids: G,
    sequence: AtomicU64,
    flushes: AtomicU64,
    faults: Mutex<Vec<&'static str>>,
}

impl<T, G> InMemoryRepository<T, G>
where
    T: Identified + Clone + Serialize,
    G: IdGenerator<T::Id>,
{
    pub fn new(ids: G) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            ids,
            sequence: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Number of `flush` calls so far, including the flushing saves.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Make the next call of `operation` (a trait method name such as
    /// `"delete_by_id"`) fail with [`MemoryRepoError::Injected`].
    pub fn fail_next(&self, operation: &'static str) -> Result<(), MemoryRepoError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| MemoryRepoError::LockPoisoned)?;
        faults.push(operation);
        Ok(())
    }

    fn check(&self, operation: &'static str) -> Result<(), MemoryRepoError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| MemoryRepoError::LockPoisoned)?;
        match faults.iter().position(|op| *op == operation) {
            Some(idx) => {
                faults.remove(idx);
                Err(MemoryRepoError::Injected { operation })
            }
            None => Ok(()),
        }
    }

    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<T::Id, T>>, MemoryRepoError> {
        self.rows.lock().map_err(|_| MemoryRepoError::LockPoisoned)
    }

    /// Insert or replace `item`, assigning an id first when it has none.
    fn store(&self, rows: &mut BTreeMap<T::Id, T>, mut item: T) -> Result<T, MemoryRepoError> {
        let id = match item.id() {
            Some(id) => id,
            None => {
                let id = self.fresh_id(rows)?;
                item.set_id(id.clone());
                id
            }
        };
        rows.insert(id, item.clone());
        Ok(item)
    }

    /// Store every item or none: inserts land on a copy that replaces `rows`
    /// only once all of them succeeded.
    fn store_all(
        &self,
        rows: &mut BTreeMap<T::Id, T>,
        items: Vec<T>,
    ) -> Result<Vec<T>, MemoryRepoError> {
        let mut staged = rows.clone();
        let saved = items
            .into_iter()
            .map(|item| self.store(&mut staged, item))
            .collect::<Result<Vec<T>, MemoryRepoError>>()?;
        *rows = staged;
        Ok(saved)
    }

    fn fresh_id(&self, rows: &BTreeMap<T::Id, T>) -> Result<T::Id, MemoryRepoError> {
        // explicit ids saved earlier may collide with generated ones
        for _ in 0..MAX_ID_ATTEMPTS {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let id = self.ids.next_id(sequence);
            if !rows.contains_key(&id) {
                trace!(?id, sequence, "assigned id");
                return Ok(id);
            }
        }
        Err(MemoryRepoError::IdSpaceExhausted)
    }

    fn remove_items(rows: &mut BTreeMap<T::Id, T>, items: &[T]) {
        // unsaved values have nothing to remove
        for id in items.iter().filter_map(Identified::id) {
            rows.remove(&id);
        }
    }

    fn select(&self, example: &Example<T>) -> Result<Vec<T>, MemoryRepoError> {
        let probe = serde_json::to_value(example.probe())?;
        let filter = ExampleFilter::compile(&probe, example.matcher())?;
        let rows = self.rows()?;
        let mut matched = Vec::new();
        for item in rows.values() {
            if filter.matches(&serde_json::to_value(item)?) {
                matched.push(item.clone());
            }
        }
        Ok(matched)
    }

    /// Stable sort by `sort`; unsorted input is returned as is.
    fn sorted(items: Vec<T>, sort: &Sort) -> Result<Vec<T>, MemoryRepoError> {
        if !sort.is_sorted() {
            return Ok(items);
        }
        let mut keyed = items
            .into_iter()
            .map(|item| Ok((serde_json::to_value(&item)?, item)))
            .collect::<Result<Vec<(Value, T)>, MemoryRepoError>>()?;
        keyed.sort_by(|(a, _), (b, _)| compare_documents(sort, a, b));
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }

    fn paginate(items: Vec<T>, pageable: &Pageable) -> Result<Page<T>, MemoryRepoError> {
        let items = Self::sorted(items, pageable.sort())?;
        let total = items.len() as u64;
        let content = match pageable.page_size() {
            Some(size) => items
                .into_iter()
                .skip(pageable.offset())
                .take(size)
                .collect(),
            None => items,
        };
        Ok(Page::new(content, pageable.clone(), total))
    }
}

impl<T, G> CrudRepository<T, T::Id> for InMemoryRepository<T, G>
where
    T: Identified + Clone + Serialize + Send + Sync,
    G: IdGenerator<T::Id>,
{
    type Error = MemoryRepoError;

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, MemoryRepoError> {
        self.check("find_by_id")?;
        Ok(self.rows()?.get(id).cloned())
    }

    fn exists_by_id(&self, id: &T::Id) -> Result<bool, MemoryRepoError> {
        self.check("exists_by_id")?;
        Ok(self.rows()?.contains_key(id))
    }

    fn find_all(&self) -> Result<Vec<T>, MemoryRepoError> {
        self.check("find_all")?;
        Ok(self.rows()?.values().cloned().collect())
    }

    /// Results follow the order of `ids`.
    fn find_all_by_id(&self, ids: &[T::Id]) -> Result<Vec<T>, MemoryRepoError> {
        self.check("find_all_by_id")?;
        let rows = self.rows()?;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    fn count(&self) -> Result<u64, MemoryRepoError> {
        self.check("count")?;
        Ok(self.rows()?.len() as u64)
    }

    fn delete_by_id(&self, id: &T::Id) -> Result<(), MemoryRepoError> {
        self.check("delete_by_id")?;
        self.rows()?.remove(id);
        Ok(())
    }

    fn delete(&self, item: T) -> Result<(), MemoryRepoError> {
        self.check("delete")?;
        Self::remove_items(&mut *self.rows()?, std::slice::from_ref(&item));
        Ok(())
    }

    fn delete_all_by_id(&self, ids: &[T::Id]) -> Result<(), MemoryRepoError> {
        self.check("delete_all_by_id")?;
        let mut rows = self.rows()?;
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }

    fn delete_many(&self, items: Vec<T>) -> Result<(), MemoryRepoError> {
        self.check("delete_many")?;
        Self::remove_items(&mut *self.rows()?, &items);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), MemoryRepoError> {
        self.check("delete_all")?;
        self.rows()?.clear();
        Ok(())
    }

    fn save(&self, item: T) -> Result<T, MemoryRepoError> {
        self.check("save")?;
        let mut rows = self.rows()?;
        self.store(&mut rows, item)
    }

    fn save_all(&self, items: Vec<T>) -> Result<Vec<T>, MemoryRepoError> {
        self.check("save_all")?;
        let mut rows = self.rows()?;
        self.store_all(&mut rows, items)
    }
}

impl<T, G> PagingAndSortingRepository<T, T::Id> for InMemoryRepository<T, G>
where
    T: Identified + Clone + Serialize + Send + Sync,
    G: IdGenerator<T::Id>,
{
    fn find_all_sorted(&self, sort: &Sort) -> Result<Vec<T>, MemoryRepoError> {
        self.check("find_all_sorted")?;
        let items: Vec<T> = self.rows()?.values().cloned().collect();
        Self::sorted(items, sort)
    }

    fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<T>, MemoryRepoError> {
        self.check("find_all_paged")?;
        let items: Vec<T> = self.rows()?.values().cloned().collect();
        Self::paginate(items, pageable)
    }
}

impl<T, G> ExampleRepository<T, T::Id> for InMemoryRepository<T, G>
where
    T: Identified + Clone + Serialize + Send + Sync,
    G: IdGenerator<T::Id>,
{
    /// First match in id order.
    fn find_one(&self, example: Example<T>) -> Result<Option<T>, MemoryRepoError> {
        self.check("find_one")?;
        Ok(self.select(&example)?.into_iter().next())
    }

    fn find_all_by_example(&self, example: Example<T>) -> Result<Vec<T>, MemoryRepoError> {
        self.check("find_all_by_example")?;
        self.select(&example)
    }

    fn find_all_by_example_sorted(
        &self,
        example: Example<T>,
        sort: &Sort,
    ) -> Result<Vec<T>, MemoryRepoError> {
        self.check("find_all_by_example_sorted")?;
        Self::sorted(self.select(&example)?, sort)
    }

    fn find_all_by_example_paged(
        &self,
        example: Example<T>,
        pageable: &Pageable,
    ) -> Result<Page<T>, MemoryRepoError> {
        self.check("find_all_by_example_paged")?;
        Self::paginate(self.select(&example)?, pageable)
    }

    fn count_by_example(&self, example: Example<T>) -> Result<u64, MemoryRepoError> {
        self.check("count_by_example")?;
        Ok(self.select(&example)?.len() as u64)
    }

    fn exists_by_example(&self, example: Example<T>) -> Result<bool, MemoryRepoError> {
        self.check("exists_by_example")?;
        Ok(!self.select(&example)?.is_empty())
    }
}

impl<T, G> Repository<T, T::Id> for InMemoryRepository<T, G>
where
    T: Identified + Clone + Serialize + Send + Sync,
    G: IdGenerator<T::Id>,
{
    /// Nothing is buffered; flushing is only counted.
    fn flush(&self) -> Result<(), MemoryRepoError> {
        self.check("flush")?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn save_and_flush(&self, item: T) -> Result<T, MemoryRepoError> {
        self.check("save_and_flush")?;
        let saved = {
            let mut rows = self.rows()?;
            self.store(&mut rows, item)?
        };
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(saved)
    }

    fn save_all_and_flush(&self, items: Vec<T>) -> Result<Vec<T>, MemoryRepoError> {
        self.check("save_all_and_flush")?;
        let saved = {
            let mut rows = self.rows()?;
            self.store_all(&mut rows, items)?
        };
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(saved)
    }

    fn delete_many_in_batch(&self, items: Vec<T>) -> Result<(), MemoryRepoError> {
        self.check("delete_many_in_batch")?;
        Self::remove_items(&mut *self.rows()?, &items);
        Ok(())
    }

    fn delete_all_by_id_in_batch(&self, ids: &[T::Id]) -> Result<(), MemoryRepoError> {
        self.check("delete_all_by_id_in_batch")?;
        let mut rows = self.rows()?;
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }

    fn delete_all_in_batch(&self) -> Result<(), MemoryRepoError> {
        self.check("delete_all_in_batch")?;
        self.rows()?.clear();
        Ok(())
    }

    fn get_by_id(&self, id: &T::Id) -> Result<T, MemoryRepoError> {
        self.check("get_by_id")?;
        self.rows()?
            .get(id)
            .cloned()
            .ok_or_else(|| MemoryRepoError::NotFound {
                id: format!("{id:?}"),
            })
    }
}
