//! Function declarations referenced by call nodes.
//!
//! A call node does not own its callee; it points at a shared [`FunctionDecl`]
//! carrying the metadata the rewriter and providers need: declaring scope,
//! name, whether a receiver instance is required, and the declared signature.

use std::fmt;
use std::sync::Arc;

use crate::{Symbol, Type};

/// Shared reference to a function declaration.
pub type Callee = Arc<FunctionDecl>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamDecl {
    pub name: Symbol,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDecl {
    pub scope: Symbol,
    pub name: Symbol,
    /// Receiver type for instance methods; `None` for static functions.
    pub receiver: Option<Type>,
    pub params: Vec<ParamDecl>,
    pub ret: Type,
}

/// Identity of a function: scope, name and signature.
///
/// Overloads that differ only by parameter types are distinct functions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub scope: Symbol,
    pub name: Symbol,
    pub receiver: Option<Type>,
    pub params: Vec<Type>,
}

impl FunctionDecl {
    pub fn builder(scope: impl Into<Symbol>, name: impl Into<Symbol>) -> FunctionDeclBuilder {
        FunctionDeclBuilder {
            decl: FunctionDecl {
                scope: scope.into(),
                name: name.into(),
                receiver: None,
                params: Vec::new(),
                ret: Type::Unit,
            },
        }
    }

    pub fn id(&self) -> FunctionId {
        FunctionId {
            scope: self.scope.clone(),
            name: self.name.clone(),
            receiver: self.receiver.clone(),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
        }
    }

    /// Whether the function can be invoked without a receiver instance.
    pub fn is_static(&self) -> bool {
        self.receiver.is_none()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.scope, self.name)
    }
}

pub struct FunctionDeclBuilder {
    decl: FunctionDecl,
}

impl FunctionDeclBuilder {
    /// Make this an instance method on `ty`.
    pub fn receiver(mut self, ty: Type) -> Self {
        self.decl.receiver = Some(ty);
        self
    }

    pub fn param(mut self, name: impl Into<Symbol>, ty: Type) -> Self {
        self.decl.params.push(ParamDecl {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.decl.ret = ty;
        self
    }

    pub fn build(self) -> Callee {
        Arc::new(self.decl)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::", self.scope)?;
        if let Some(receiver) = &self.receiver {
            write!(f, "{receiver}.")?;
        }
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
