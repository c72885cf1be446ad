//! Error types for rewriting and query execution.

use derive_more::{Display, Error, From};
use splice_tree::{FunctionId, Symbol, Type};

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Failure to build a query handle or compose an operator onto one.
#[derive(Debug, Display, Error)]
pub enum ConstructionError {
    #[display("cannot build a query over `{ty}`: not a sequence type")]
    NotASequence { ty: Type },

    #[display("expected a lambda, found an expression of type `{ty}`")]
    NotALambda { ty: Type },

    #[display("lambda takes {found} parameter(s), expected {expected}")]
    LambdaArity { expected: usize, found: usize },

    #[display("expansion argument {index} is not {expected}")]
    ArgumentKind { index: usize, expected: &'static str },
}

/// Why a tag could not be applied to a call site.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum FallbackReason {
    #[display("expandable target requires a receiver instance")]
    InstanceReceiver,

    #[display("redirect factory did not produce a lambda template")]
    NotATemplate,
}

#[derive(Debug, Display, Error, From)]
pub enum RewriteError {
    /// Malformed redirect: call-site arity differs from the template's.
    #[from(ignore)]
    #[display(
        "redirect of `{function}` expects {expected} argument(s) but the call site passes {found}"
    )]
    ArityMismatch {
        function: FunctionId,
        expected: usize,
        found: usize,
    },

    #[from(ignore)]
    #[display("parameter `{name}` registered twice in one substitution scope")]
    DuplicateParameter { name: Symbol },

    #[from(ignore)]
    #[display("template factory `{scope}::{name}` is not registered")]
    UnknownFactory { scope: Symbol, name: Symbol },

    #[from(ignore)]
    #[display("tag on `{function}` cannot be applied: {reason}")]
    UnhandledTag {
        function: FunctionId,
        reason: FallbackReason,
    },

    #[from(ignore)]
    #[display("rewrite nesting exceeded {limit} levels")]
    RecursionLimit { limit: usize },

    #[from(ignore)]
    #[display("expansion of `{function}` failed: {source}")]
    Expansion {
        function: FunctionId,
        source: Box<QueryError>,
    },

    #[display("{_0}")]
    Construction(ConstructionError),
}

/// Errors surfaced by query handles and providers.
#[derive(Debug, Display, From)]
pub enum QueryError {
    #[display("rewrite failed: {_0}")]
    Rewrite(RewriteError),

    #[display("{_0}")]
    Construction(ConstructionError),

    /// Failure reported by the underlying provider.
    #[from(ignore)]
    #[display("execution failed: {_0}")]
    Execution(Box<dyn std::error::Error + Send + Sync>),
}

impl QueryError {
    pub fn execution(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        QueryError::Execution(error.into())
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Rewrite(e) => Some(e),
            QueryError::Construction(e) => Some(e),
            QueryError::Execution(e) => Some(&**e),
        }
    }
}

/// Invalid registrations in a [`crate::TagRegistry`].
#[derive(Debug, Display, Error)]
pub enum RegistryError {
    #[display("`{function}` is already tagged")]
    AlreadyTagged { function: FunctionId },

    #[display("template factory `{scope}::{name}` is already registered")]
    DuplicateFactory { scope: Symbol, name: Symbol },
}
