//! Query handles.
//!
//! A [`Query`] pairs an expression tree with the provider that will execute
//! it. Composing operators builds a longer tree over the same provider;
//! nothing runs until [`Query::fetch`] or one of the scalar operations.
//!
//! Wrapping a handle with [`Query::extendable`] swaps its provider for a
//! [`RewritingProvider`], after which tagged functions may appear anywhere
//! in the composed tree.

use std::fmt;
use std::iter;
use std::sync::Arc;

use splice_tree::{Callee, Expr, Symbol, Type, Value, ops};

use crate::error::{ConstructionError, QueryError, QueryResult};
use crate::options::RewriteOptions;
use crate::provider::{Provider, RewritingProvider};
use crate::registry::TagRegistry;

#[derive(Clone)]
pub struct Query {
    expr: Expr,
    element: Type,
    provider: Arc<dyn Provider>,
}

impl Query {
    /// Build a handle for `expr`, which must have a sequence or query type.
    pub fn try_new(provider: Arc<dyn Provider>, expr: Expr) -> Result<Self, ConstructionError> {
        let Some(element) = expr.ty().element_type().cloned() else {
            return Err(ConstructionError::NotASequence {
                ty: expr.ty().clone(),
            });
        };
        Ok(Query {
            expr,
            element,
            provider,
        })
    }

    /// Handle over the root table `table`.
    pub fn source(provider: Arc<dyn Provider>, table: impl Into<Symbol>, element: Type) -> Self {
        Query {
            expr: Expr::source(table, element.clone()),
            element,
            provider,
        }
    }

    /// Wrap this handle so tagged calls are rewritten before execution.
    ///
    /// Wrapping an already wrapped handle returns it unchanged.
    pub fn extendable(&self, registry: Arc<TagRegistry>) -> Query {
        self.extendable_with(registry, RewriteOptions::default())
    }

    pub fn extendable_with(&self, registry: Arc<TagRegistry>, options: RewriteOptions) -> Query {
        if self.is_extendable() {
            return self.clone();
        }
        let provider = RewritingProvider::with_options(self.provider.clone(), registry, options);
        Query {
            expr: self.expr.clone(),
            element: self.element.clone(),
            provider: Arc::new(provider),
        }
    }

    pub fn is_extendable(&self) -> bool {
        self.provider.as_rewriting().is_some()
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn element_type(&self) -> &Type {
        &self.element
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Project each element through a one-parameter lambda.
    pub fn select(&self, selector: Expr) -> Result<Query, ConstructionError> {
        expect_unary_lambda(&selector)?;
        self.compose(ops::select(self.expr.clone(), selector))
    }

    pub fn filter(&self, predicate: Expr) -> Result<Query, ConstructionError> {
        expect_unary_lambda(&predicate)?;
        self.compose(ops::filter(self.expr.clone(), predicate))
    }

    /// Call `callee` with this query as its first argument.
    pub fn apply(
        &self,
        callee: &Callee,
        args: impl IntoIterator<Item = Expr>,
    ) -> Result<Query, ConstructionError> {
        let args = iter::once(self.expr.clone()).chain(args);
        self.compose(Expr::call(callee.clone(), args))
    }

    fn compose(&self, expr: Expr) -> Result<Query, ConstructionError> {
        Query::try_new(self.provider.clone(), expr)
    }

    /// Execute the query. Every call executes it again.
    pub fn fetch(&self) -> QueryResult<Vec<Value>> {
        self.provider.execute(&self.expr)
    }

    /// Execute a scalar terminal built over this query, such as `ops::count`.
    pub fn scalar(&self, terminal: impl FnOnce(Expr) -> Expr) -> QueryResult<Value> {
        self.evaluate(&terminal(self.expr.clone()))
    }

    /// Evaluate any scalar tree through this query's provider.
    pub fn evaluate(&self, expr: &Expr) -> QueryResult<Value> {
        self.provider.execute_scalar(expr)
    }

    pub fn count(&self) -> QueryResult<i64> {
        let value = self.scalar(ops::count)?;
        value
            .as_int()
            .ok_or_else(|| QueryError::execution(format!("count produced `{value}`")))
    }
}

fn expect_unary_lambda(expr: &Expr) -> Result<(), ConstructionError> {
    match expr.as_lambda() {
        Some((params, _)) if params.len() == 1 => Ok(()),
        Some((params, _)) => Err(ConstructionError::LambdaArity {
            expected: 1,
            found: params.len(),
        }),
        None => Err(ConstructionError::NotALambda {
            ty: expr.ty().clone(),
        }),
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("expr", &format_args!("{}", self.expr))
            .field("element", &self.element)
            .field("extendable", &self.is_extendable())
            .finish()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.expr, f)
    }
}
