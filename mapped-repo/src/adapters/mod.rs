//! Store implementations that live inside the library for convenience.
//!
//! The in-memory repository is meant for unit tests and local demos. Stores
//! backed by a real database belong in their own crates.

mod matching;
pub mod memory_repo;

pub use memory_repo::{Identified, InMemoryRepository, MemoryRepoError};
