//! Built-in query operators.
//!
//! These are the primitive call kinds every provider understands natively.
//! Their declarations use [`Type::Any`] for generic positions; the builders
//! compute the concrete result type of each call.

use std::sync::LazyLock;

use crate::{Callee, Expr, FunctionDecl, Type};

pub const QUERY_SCOPE: &str = "query";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Select,
    Filter,
    Count,
    AsQueryable,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Select => "select",
            Builtin::Filter => "filter",
            Builtin::Count => "count",
            Builtin::AsQueryable => "as_queryable",
        }
    }
}

static SELECT: LazyLock<Callee> = LazyLock::new(|| {
    FunctionDecl::builder(QUERY_SCOPE, Builtin::Select.name())
        .param("source", Type::query(Type::Any))
        .param("selector", Type::function(vec![Type::Any], Type::Any))
        .returns(Type::query(Type::Any))
        .build()
});

static FILTER: LazyLock<Callee> = LazyLock::new(|| {
    FunctionDecl::builder(QUERY_SCOPE, Builtin::Filter.name())
        .param("source", Type::query(Type::Any))
        .param("predicate", Type::function(vec![Type::Any], Type::Bool))
        .returns(Type::query(Type::Any))
        .build()
});

static COUNT: LazyLock<Callee> = LazyLock::new(|| {
    FunctionDecl::builder(QUERY_SCOPE, Builtin::Count.name())
        .param("source", Type::query(Type::Any))
        .returns(Type::Int)
        .build()
});

static AS_QUERYABLE: LazyLock<Callee> = LazyLock::new(|| {
    FunctionDecl::builder(QUERY_SCOPE, Builtin::AsQueryable.name())
        .param("source", Type::seq(Type::Any))
        .returns(Type::query(Type::Any))
        .build()
});

pub fn decl(builtin: Builtin) -> &'static Callee {
    match builtin {
        Builtin::Select => &SELECT,
        Builtin::Filter => &FILTER,
        Builtin::Count => &COUNT,
        Builtin::AsQueryable => &AS_QUERYABLE,
    }
}

/// Classify a callee as a built-in operator.
pub fn builtin(callee: &FunctionDecl) -> Option<Builtin> {
    if callee.scope != QUERY_SCOPE {
        return None;
    }
    [
        Builtin::Select,
        Builtin::Filter,
        Builtin::Count,
        Builtin::AsQueryable,
    ]
    .into_iter()
    .find(|b| callee.name == b.name())
}

fn element_of(source: &Expr) -> Type {
    source.ty().element_type().cloned().unwrap_or(Type::Any)
}

/// `source.select(selector)`. The result element type is the selector's body type.
pub fn select(source: Expr, selector: Expr) -> Expr {
    let element = match selector.ty() {
        Type::Function { ret, .. } => (**ret).clone(),
        _ => Type::Any,
    };
    Expr::call_typed(SELECT.clone(), [source, selector], Type::query(element))
}

/// `source.filter(predicate)`.
pub fn filter(source: Expr, predicate: Expr) -> Expr {
    let element = element_of(&source);
    Expr::call_typed(FILTER.clone(), [source, predicate], Type::query(element))
}

pub fn count(source: Expr) -> Expr {
    Expr::call_typed(COUNT.clone(), [source], Type::Int)
}

/// Lift an in-memory sequence (e.g. a navigation collection) into a query.
pub fn as_queryable(source: Expr) -> Expr {
    let element = element_of(&source);
    Expr::call_typed(AS_QUERYABLE.clone(), [source], Type::query(element))
}
