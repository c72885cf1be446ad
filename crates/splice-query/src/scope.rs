//! Parameter substitution scopes.
//!
//! Each redirect activation gets its own [`Scope`] mapping the template's
//! formal parameters to the call-site arguments. Scopes chain to the scope
//! that was active at the call site, so a template body that forwards its
//! own parameter to another redirect resolves through every level.

use std::collections::HashMap;

use splice_tree::{Expr, Param, ParamId, Symbol};

use crate::error::RewriteError;

#[derive(Debug, Default)]
pub struct Scope<'parent> {
    parent: Option<&'parent Scope<'parent>>,
    bindings: HashMap<ParamId, (Symbol, Expr)>,
}

impl<'parent> Scope<'parent> {
    pub fn root() -> Self {
        Scope::default()
    }

    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            bindings: HashMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&'parent Scope<'parent>> {
        self.parent
    }

    /// Bind `param` to the argument expression `arg`.
    pub fn bind(&mut self, param: &Param, arg: Expr) -> Result<(), RewriteError> {
        if self.bindings.contains_key(&param.id()) {
            return Err(RewriteError::DuplicateParameter {
                name: param.name().clone(),
            });
        }
        self.bindings
            .insert(param.id(), (param.name().clone(), arg));
        Ok(())
    }

    /// Find the argument bound to `id`, along with the scope that bound it.
    pub fn resolve(&self, id: ParamId) -> Option<(&Expr, &Scope<'_>)> {
        if let Some((_, arg)) = self.bindings.get(&id) {
            return Some((arg, self));
        }
        self.parent?.resolve(id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use splice_tree::Type;

    use super::*;

    #[test]
    fn resolves_through_parents() {
        let outer_param = Param::new("a", Type::Int);
        let inner_param = Param::new("b", Type::Int);

        let mut outer = Scope::root();
        assert!(outer.is_empty());
        outer.bind(&outer_param, Expr::constant(1)).unwrap();
        let mut inner = outer.child();
        inner.bind(&inner_param, outer_param.to_expr()).unwrap();

        let (arg, owner) = inner.resolve(inner_param.id()).unwrap();
        assert_eq!(arg, &outer_param.to_expr());
        assert_eq!(owner.len(), 1);
        assert!(owner.parent().is_some());

        let (arg, owner) = inner.resolve(outer_param.id()).unwrap();
        assert_eq!(arg, &Expr::constant(1));
        assert!(owner.parent().is_none());

        assert!(inner.resolve(Param::new("c", Type::Int).id()).is_none());
    }

    #[test]
    fn duplicate_binding_is_an_error() {
        let param = Param::new("p", Type::Int);
        let mut scope = Scope::root();
        scope.bind(&param, Expr::constant(1)).unwrap();
        let err = scope.bind(&param, Expr::constant(2)).unwrap_err();
        assert!(matches!(err, RewriteError::DuplicateParameter { .. }));
        assert_eq!(
            err.to_string(),
            "parameter `p` registered twice in one substitution scope"
        );
    }

    #[test]
    fn same_name_different_identity_shadows_nothing() {
        let a = Param::new("x", Type::Int);
        let b = Param::new("x", Type::Int);
        let mut scope = Scope::root();
        scope.bind(&a, Expr::constant(1)).unwrap();
        scope.bind(&b, Expr::constant(2)).unwrap();
        assert_eq!(scope.resolve(b.id()).map(|(e, _)| e.clone()), Some(Expr::constant(2)));
    }
}
