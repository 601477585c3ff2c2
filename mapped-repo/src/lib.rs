//! Repository ports and a mapping adapter over them.
//!
//! The ports describe a generic store over `(T, ID)`: plain CRUD, sorting and
//! paging, query-by-example, and the batch/flush extras of a full repository.
//! [`MappedRepository`] takes any store of entities plus a [`Mapper`] and
//! exposes the same ports over domain objects, translating every argument and
//! every result on the way through.
//!
//! Stores report failures through their own `Error` type. The adapter turns
//! each of them into a [`RepositoryError`] that keeps the original as its
//! source.

pub mod adapters;
pub mod error;
pub mod example;
pub mod ids;
pub mod mapped;
pub mod mapper;
pub mod page;

pub use error::{BoxError, RepositoryError};
pub use example::{Example, ExampleMatcher, MatchMode, NullHandler, PropertyMatcher, StringMatcher};
pub use ids::{Base62Ids, IdGenerator, SequentialIds};
pub use mapped::MappedRepository;
pub use mapper::{FnMapper, Mapper};
pub use page::{Direction, Order, Page, Pageable, PageableError, Sort};

/// Basic create/read/delete over a store of `T` keyed by `ID`.
///
/// Ids go in by reference and are never rewritten. Values go in by value: a
/// store is free to hand back a different value from `save` (for example
/// with a generated id filled in).
pub trait CrudRepository<T, ID>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find_by_id(&self, id: &ID) -> Result<Option<T>, Self::Error>;
    fn exists_by_id(&self, id: &ID) -> Result<bool, Self::Error>;
    fn find_all(&self) -> Result<Vec<T>, Self::Error>;
    /// Values for the ids that exist; unknown ids are skipped.
    fn find_all_by_id(&self, ids: &[ID]) -> Result<Vec<T>, Self::Error>;
    fn count(&self) -> Result<u64, Self::Error>;
    fn delete_by_id(&self, id: &ID) -> Result<(), Self::Error>;
    fn delete(&self, item: T) -> Result<(), Self::Error>;
    fn delete_all_by_id(&self, ids: &[ID]) -> Result<(), Self::Error>;
    fn delete_many(&self, items: Vec<T>) -> Result<(), Self::Error>;
    fn delete_all(&self) -> Result<(), Self::Error>;
    /// Persist `item` and return the stored state.
    fn save(&self, item: T) -> Result<T, Self::Error>;
    fn save_all(&self, items: Vec<T>) -> Result<Vec<T>, Self::Error>;
}

/// Sorted and paged reads.
pub trait PagingAndSortingRepository<T, ID>: CrudRepository<T, ID> {
    fn find_all_sorted(&self, sort: &Sort) -> Result<Vec<T>, Self::Error>;
    fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<T>, Self::Error>;
}

/// Query-by-example reads. Matching semantics belong to the implementor.
pub trait ExampleRepository<T, ID>: CrudRepository<T, ID> {
    fn find_one(&self, example: Example<T>) -> Result<Option<T>, Self::Error>;
    fn find_all_by_example(&self, example: Example<T>) -> Result<Vec<T>, Self::Error>;
    fn find_all_by_example_sorted(
        &self,
        example: Example<T>,
        sort: &Sort,
    ) -> Result<Vec<T>, Self::Error>;
    fn find_all_by_example_paged(
        &self,
        example: Example<T>,
        pageable: &Pageable,
    ) -> Result<Page<T>, Self::Error>;
    fn count_by_example(&self, example: Example<T>) -> Result<u64, Self::Error>;
    fn exists_by_example(&self, example: Example<T>) -> Result<bool, Self::Error>;
}

/// The full repository contract: everything above plus flushing, batch
/// deletes and must-exist lookups.
pub trait Repository<T, ID>: PagingAndSortingRepository<T, ID> + ExampleRepository<T, ID> {
    fn flush(&self) -> Result<(), Self::Error>;
    fn save_and_flush(&self, item: T) -> Result<T, Self::Error>;
    fn save_all_and_flush(&self, items: Vec<T>) -> Result<Vec<T>, Self::Error>;

    /// Older name for [`Repository::delete_many_in_batch`].
    fn delete_in_batch(&self, items: Vec<T>) -> Result<(), Self::Error> {
        self.delete_many_in_batch(items)
    }

    fn delete_many_in_batch(&self, items: Vec<T>) -> Result<(), Self::Error>;
    fn delete_all_by_id_in_batch(&self, ids: &[ID]) -> Result<(), Self::Error>;
    fn delete_all_in_batch(&self) -> Result<(), Self::Error>;

    /// Older name for [`Repository::get_by_id`].
    fn get_one(&self, id: &ID) -> Result<T, Self::Error> {
        self.get_by_id(id)
    }

    /// Like `find_by_id`, but a missing value is an error of the store.
    fn get_by_id(&self, id: &ID) -> Result<T, Self::Error>;
}

/// Return a short about/version line for binaries to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{}", pkg, ver)
}
