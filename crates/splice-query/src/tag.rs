//! Tags attached to function declarations.

use std::fmt;

use splice_tree::Symbol;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Replace call sites by the tree the function produces when invoked.
    Expand,
    /// Replace call sites by the body of the template returned by `factory`,
    /// a zero-argument function declared in the same scope.
    Redirect { factory: Symbol },
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Expand => f.write_str("expand"),
            Tag::Redirect { factory } => write!(f, "redirect({factory})"),
        }
    }
}
