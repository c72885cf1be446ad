//! Recursive traversal utilities.
//!
//! [`Expr::walk`] visits nodes pre-order and can stop early:
//!
//! ```
//! use std::ops::ControlFlow;
//! use splice_tree::{Expr, ExprKind, Type, WalkAction, ops};
//!
//! let tree = ops::count(Expr::source("people", Type::record("Person")));
//! let has_source = tree
//!     .walk(|e| match e.kind() {
//!         ExprKind::Source(_) => ControlFlow::Break(()),
//!         _ => ControlFlow::Continue(WalkAction::Advance),
//!     })
//!     .is_break();
//! assert!(has_source);
//! ```
//!
//! [`Expr::try_map_children`] rebuilds a node from transformed children and is
//! the building block of every rewrite: when no child changes, the original
//! node is returned as is, so untouched subtrees stay shared.

use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::{Expr, ExprKind, ExprVec};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into children.
    Advance,
    /// Skip the children of the current node.
    Skip,
}

impl Expr {
    /// Direct children in evaluation order: receiver, then arguments.
    pub fn children(&self) -> SmallVec<[&Expr; 4]> {
        match self.kind() {
            ExprKind::Constant(_) | ExprKind::Parameter(_) | ExprKind::Source(_) => {
                SmallVec::new()
            }
            ExprKind::Lambda { body, .. } => smallvec::smallvec![body],
            ExprKind::Member { target, .. } => smallvec::smallvec![target],
            ExprKind::New { fields, .. } => fields.iter().map(|(_, value)| value).collect(),
            ExprKind::Binary { lhs, rhs, .. } => smallvec::smallvec![lhs, rhs],
            ExprKind::Call { receiver, args, .. } => receiver.iter().chain(args.iter()).collect(),
        }
    }

    /// Walk all nodes pre-order, applying `f` to each.
    pub fn walk<B>(
        &self,
        mut f: impl FnMut(&Expr) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()> {
        walk_internal(self, &mut f)
    }

    /// Rebuild this node from children transformed by `f`.
    ///
    /// Leaves are returned unchanged. If every child comes back pointer-equal,
    /// `self` is returned without allocating.
    pub fn try_map_children<E>(
        &self,
        mut f: impl FnMut(&Expr) -> Result<Expr, E>,
    ) -> Result<Expr, E> {
        let mut changed = false;
        let mut map = |child: &Expr| -> Result<Expr, E> {
            let mapped = f(child)?;
            changed |= !mapped.ptr_eq(child);
            Ok(mapped)
        };

        let kind = match self.kind() {
            ExprKind::Constant(_) | ExprKind::Parameter(_) | ExprKind::Source(_) => {
                return Ok(self.clone());
            }
            ExprKind::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: map(body)?,
            },
            ExprKind::Member { target, member } => ExprKind::Member {
                target: map(target)?,
                member: member.clone(),
            },
            ExprKind::New { ty, fields } => ExprKind::New {
                ty: ty.clone(),
                fields: fields
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), map(value)?)))
                    .collect::<Result<_, E>>()?,
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: map(lhs)?,
                rhs: map(rhs)?,
            },
            ExprKind::Call {
                callee,
                receiver,
                args,
            } => ExprKind::Call {
                callee: callee.clone(),
                receiver: receiver.as_ref().map(&mut map).transpose()?,
                args: args.iter().map(&mut map).collect::<Result<ExprVec, E>>()?,
            },
        };

        if !changed {
            return Ok(self.clone());
        }
        Ok(Expr::new(kind, self.ty().clone()))
    }
}

fn walk_internal<B>(
    expr: &Expr,
    f: &mut dyn FnMut(&Expr) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(expr) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for child in expr.children() {
        walk_internal(child, f)?;
    }
    ControlFlow::Continue(())
}
