//! Conversion strategy between a domain object and its persisted entity.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Bidirectional conversion between one domain type and one entity type.
///
/// Both directions are total. A mapper that cannot convert a value has a bug;
/// if it panics the panic unwinds through whichever repository call used it.
pub trait Mapper: Send + Sync {
    type Domain;
    type Entity;

    fn to_domain(&self, entity: Self::Entity) -> Self::Domain;
    fn to_entity(&self, domain: Self::Domain) -> Self::Entity;
}

impl<M: Mapper + ?Sized> Mapper for &M {
    type Domain = M::Domain;
    type Entity = M::Entity;

    fn to_domain(&self, entity: Self::Entity) -> Self::Domain {
        (**self).to_domain(entity)
    }

    fn to_entity(&self, domain: Self::Domain) -> Self::Entity {
        (**self).to_entity(domain)
    }
}

impl<M: Mapper + ?Sized> Mapper for Arc<M> {
    type Domain = M::Domain;
    type Entity = M::Entity;

    fn to_domain(&self, entity: Self::Entity) -> Self::Domain {
        (**self).to_domain(entity)
    }

    fn to_entity(&self, domain: Self::Domain) -> Self::Entity {
        (**self).to_entity(domain)
    }
}

/// Mapper assembled from a pair of closures.
pub struct FnMapper<D, E, F, G> {
    to_domain: F,
    to_entity: G,
    _types: PhantomData<fn(D) -> E>,
}

impl<D, E, F, G> FnMapper<D, E, F, G>
where
    F: Fn(E) -> D + Send + Sync,
    G: Fn(D) -> E + Send + Sync,
{
    pub fn new(to_domain: F, to_entity: G) -> Self {
        Self {
            to_domain,
            to_entity,
            _types: PhantomData,
        }
    }
}

impl<D, E, F, G> Mapper for FnMapper<D, E, F, G>
where
    F: Fn(E) -> D + Send + Sync,
    G: Fn(D) -> E + Send + Sync,
{
    type Domain = D;
    type Entity = E;

    fn to_domain(&self, entity: E) -> D {
        (self.to_domain)(entity)
    }

    fn to_entity(&self, domain: D) -> E {
        (self.to_entity)(domain)
    }
}

impl<D, E, F, G> fmt::Debug for FnMapper<D, E, F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMapper")
            .field("domain", &std::any::type_name::<D>())
            .field("entity", &std::any::type_name::<E>())
            .finish()
    }
}
