//! The single failure kind surfaced by mapped repositories.

use std::error::Error;

/// Boxed, thread-safe error used as the cause of a [`RepositoryError`].
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Failure of a delegated repository call.
///
/// Whatever the wrapped store reports (constraint violation, missing row,
/// lost connection) is kept as the `source()` of this error. Nothing is
/// interpreted or discarded.
#[derive(Debug, thiserror::Error)]
#[error("repository operation failed")]
pub struct RepositoryError {
    #[source]
    source: BoxError,
}

impl RepositoryError {
    /// Wrap an underlying error. An error that already is a
    /// `RepositoryError` is returned as-is, so stacked adapters do not nest.
    pub fn wrap<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let boxed: BoxError = Box::new(err);
        match boxed.downcast::<RepositoryError>() {
            Ok(existing) => *existing,
            Err(source) => Self { source },
        }
    }

    /// Borrow the underlying cause as a concrete type, if it is one.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Error + 'static,
    {
        self.source.downcast_ref::<E>()
    }

    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq, Eq)]
    #[error("row locked: {0}")]
    struct Locked(u32);

    #[test]
    fn wrap_keeps_cause() {
        let err = RepositoryError::wrap(Locked(7));
        assert_eq!(err.downcast_ref::<Locked>(), Some(&Locked(7)));
        assert_eq!(err.to_string(), "repository operation failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("row locked: 7"));
    }

    #[test]
    fn wrap_does_not_nest() {
        let inner = RepositoryError::wrap(Locked(1));
        let outer = RepositoryError::wrap(inner);
        // still exactly one layer around the original cause
        assert!(outer.downcast_ref::<Locked>().is_some());
        assert!(outer.downcast_ref::<RepositoryError>().is_none());
    }

    #[test]
    fn into_source_returns_original() {
        let err = RepositoryError::wrap(Locked(3));
        let source = err.into_source();
        assert_eq!(source.downcast_ref::<Locked>(), Some(&Locked(3)));
    }
}
