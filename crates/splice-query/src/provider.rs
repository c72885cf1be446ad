//! Execution providers and the rewriting proxy.

use std::fmt;
use std::sync::Arc;

use splice_tree::{Expr, Value};

use crate::error::{QueryError, QueryResult, RewriteError};
use crate::options::RewriteOptions;
use crate::registry::TagRegistry;
use crate::rewrite::{RewriteOutcome, Rewriter};

/// Something that executes expression trees.
///
/// Providers only understand primitive node kinds and reject calls to
/// functions they do not know.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Execute a tree of sequence type.
    fn execute(&self, expr: &Expr) -> QueryResult<Vec<Value>>;

    /// Execute a tree producing a single value.
    fn execute_scalar(&self, expr: &Expr) -> QueryResult<Value>;

    /// Downcast hook used to keep wrapping idempotent.
    fn as_rewriting(&self) -> Option<&RewritingProvider> {
        None
    }
}

/// Proxy provider: rewrites every tree, then delegates to the provider it wraps.
pub struct RewritingProvider {
    rewriter: Rewriter,
    underlying: Arc<dyn Provider>,
}

impl RewritingProvider {
    pub fn new(underlying: Arc<dyn Provider>, registry: Arc<TagRegistry>) -> Self {
        Self::with_options(underlying, registry, RewriteOptions::default())
    }

    pub fn with_options(
        underlying: Arc<dyn Provider>,
        registry: Arc<TagRegistry>,
        options: RewriteOptions,
    ) -> Self {
        RewritingProvider {
            rewriter: Rewriter::new(registry, underlying.clone()).with_options(options),
            underlying,
        }
    }

    pub fn underlying(&self) -> &Arc<dyn Provider> {
        &self.underlying
    }

    pub fn registry(&self) -> &Arc<TagRegistry> {
        self.rewriter.registry()
    }

    pub fn options(&self) -> &RewriteOptions {
        self.rewriter.options()
    }

    /// Rewrite `expr` without executing it.
    pub fn rewrite(&self, expr: &Expr) -> QueryResult<RewriteOutcome> {
        self.rewriter
            .rewrite_with_stats(expr)
            .map_err(|error| match error {
                RewriteError::Construction(error) => QueryError::Construction(error),
                other => QueryError::Rewrite(other),
            })
    }
}

impl Provider for RewritingProvider {
    fn execute(&self, expr: &Expr) -> QueryResult<Vec<Value>> {
        let outcome = self.rewrite(expr)?;
        tracing::debug!(tree = %outcome.expr, "executing rewritten tree");
        self.underlying.execute(&outcome.expr)
    }

    fn execute_scalar(&self, expr: &Expr) -> QueryResult<Value> {
        let outcome = self.rewrite(expr)?;
        tracing::debug!(tree = %outcome.expr, "evaluating rewritten tree");
        self.underlying.execute_scalar(&outcome.expr)
    }

    fn as_rewriting(&self) -> Option<&RewritingProvider> {
        Some(self)
    }
}

impl fmt::Debug for RewritingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewritingProvider")
            .field("underlying", &self.underlying)
            .field("options", self.options())
            .finish_non_exhaustive()
    }
}
