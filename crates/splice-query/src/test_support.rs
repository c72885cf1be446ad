use splice_tree::{Expr, Value};

use crate::{Provider, QueryError, QueryResult};

/// Provider with no tables; every execution fails.
#[derive(Debug)]
pub struct NullProvider;

impl Provider for NullProvider {
    fn execute(&self, _expr: &Expr) -> QueryResult<Vec<Value>> {
        Err(QueryError::execution("no tables"))
    }

    fn execute_scalar(&self, _expr: &Expr) -> QueryResult<Value> {
        Err(QueryError::execution("no tables"))
    }
}
