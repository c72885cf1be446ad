//! Common test utilities for integration tests.

use std::ops::ControlFlow;
use std::sync::Arc;

use splice::{MemoryProvider, sample};
use splice_query::Query;
use splice_tree::{Expr, ExprKind, WalkAction};

/// The seeded in-memory provider and its unwrapped `people` query.
#[allow(dead_code)]
pub fn seeded_people() -> (Arc<MemoryProvider>, Query) {
    let provider = Arc::new(MemoryProvider::new().with_table(sample::PEOPLE, sample::seed_people()));
    let people = sample::people(provider.clone());
    (provider, people)
}

/// Qualified names of every function called in `expr`, pre-order.
#[allow(dead_code)]
pub fn called_functions(expr: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    let _ = expr.walk(|node| {
        if let ExprKind::Call { callee, .. } = node.kind() {
            names.push(callee.qualified_name());
        }
        ControlFlow::<(), WalkAction>::Continue(WalkAction::Advance)
    });
    names
}
