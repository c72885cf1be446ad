//! Expression trees for splice.
//!
//! A tree describes a not-yet-executed query: a root table ([`ExprKind::Source`]),
//! calls to query operators, lambdas, member accesses and record construction.
//! Trees are immutable. Every transformation builds a new tree and shares the
//! untouched subtrees with its input.
//!
//! # Example
//!
//! ```
//! use splice_tree::{Expr, Type, ops};
//!
//! let people = Expr::source("people", Type::record("Person"));
//! let names = ops::select(
//!     people,
//!     Expr::lambda1("p", Type::record("Person"), |p| Expr::member(p, "Name", Type::Str)),
//! );
//! assert_eq!(names.to_string(), "query::select(@people, |p| p.Name)");
//! assert_eq!(names.ty(), &Type::query(Type::Str));
//! ```

pub mod expr;
pub mod function;
pub mod ops;
pub mod printer;
pub mod symbol;
pub mod types;
pub mod value;
pub mod walk;

pub use expr::{BinaryOp, Expr, ExprKind, Param, ParamId};
pub use function::{Callee, FunctionDecl, FunctionDeclBuilder, FunctionId, ParamDecl};
pub use symbol::Symbol;
pub use types::Type;
pub use value::{Record, Value};
pub use walk::WalkAction;

/// Small vector for call arguments.
pub type ExprVec = smallvec::SmallVec<[Expr; 4]>;
