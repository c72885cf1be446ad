//! Static types carried by expression nodes.

use std::fmt;

use crate::Symbol;

/// The static type of an expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Unit,
    Bool,
    Int,
    Str,
    /// Placeholder for the generic parameters of built-in operators.
    Any,
    /// A named record type such as `Person`.
    Record(Symbol),
    /// An in-memory sequence, e.g. a navigation collection on a record.
    Seq(Box<Type>),
    /// A provider-backed query producing elements of the inner type.
    Query(Box<Type>),
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn record(name: impl Into<Symbol>) -> Self {
        Type::Record(name.into())
    }

    pub fn seq(element: Type) -> Self {
        Type::Seq(Box::new(element))
    }

    pub fn query(element: Type) -> Self {
        Type::Query(Box::new(element))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Element type of a `Seq` or `Query`.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Seq(element) | Type::Query(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.element_type().is_some()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => f.write_str("()"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Str => f.write_str("str"),
            Type::Any => f.write_str("_"),
            Type::Record(name) => write!(f, "{name}"),
            Type::Seq(element) => write!(f, "Seq<{element}>"),
            Type::Query(element) => write!(f, "Query<{element}>"),
            Type::Function { params, ret } => {
                f.write_str("fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_types() {
        let profile = Type::record("Profile");
        assert_eq!(Type::seq(profile.clone()).element_type(), Some(&profile));
        assert_eq!(Type::query(profile.clone()).element_type(), Some(&profile));
        assert_eq!(profile.element_type(), None);
        assert!(!Type::Int.is_sequence());
    }

    #[test]
    fn display() {
        let ty = Type::function(
            vec![Type::record("Person")],
            Type::query(Type::seq(Type::Str)),
        );
        assert_eq!(ty.to_string(), "fn(Person) -> Query<Seq<str>>");
    }
}
