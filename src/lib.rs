//! Reusable query fragments for providers that only understand primitive trees.
//!
//! The engine lives in [`splice_query`] (tag registry, rewriting visitor and
//! proxy layer) over the tree model of [`splice_tree`]. This crate adds an
//! in-memory provider and a sample model that exercises both tag kinds.

pub mod memory;
pub mod sample;

use derive_more::{Display, Error, From};

pub use memory::{ExecutionError, MemoryProvider};
pub use splice_query as query;
pub use splice_tree as tree;

#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("invalid tag registry: {_0}")]
    Registry(splice_query::RegistryError),

    #[display("{_0}")]
    Query(splice_query::QueryError),
}
