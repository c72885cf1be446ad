//! Macro expansion for query expression trees.
//!
//! Functions registered in a [`TagRegistry`] can be called inside a query
//! even though the execution provider knows nothing about them. Wrapping a
//! query with [`Query::extendable`] installs a [`RewritingProvider`] which
//! inlines every tagged call before the tree reaches the real provider:
//!
//! - [`Tag::Expand`] functions build a replacement query from their
//!   arguments;
//! - [`Tag::Redirect`] functions point at a template lambda whose body is
//!   inlined with the call arguments substituted for its parameters.

pub mod error;
pub mod options;
pub mod provider;
pub mod query;
pub mod registry;
pub mod rewrite;
pub mod scope;
pub mod tag;

#[cfg(test)]
mod test_support;

pub use error::{
    ConstructionError, FallbackReason, QueryError, QueryResult, RegistryError, RewriteError,
};
pub use options::{Fallback, RewriteOptions};
pub use provider::{Provider, RewritingProvider};
pub use query::Query;
pub use registry::{
    ExpandArg, ExpandArgs, ExpandFn, TagRegistry, TagRegistryBuilder, TemplateFactory,
};
pub use rewrite::{RewriteOutcome, Rewriter};
pub use scope::Scope;
pub use tag::Tag;
