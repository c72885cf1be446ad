//! Tag registry: which functions expand, which redirect, and how.
//!
//! The registry replaces attribute reflection with explicit registration.
//! It is built once, then shared read-only by every rewriting provider:
//!
//! ```
//! use splice_query::{ExpandArgs, TagRegistry};
//! use splice_tree::{Expr, FunctionDecl, Type};
//!
//! let adults = FunctionDecl::builder("sample", "adults")
//!     .param("people", Type::query(Type::record("Person")))
//!     .returns(Type::query(Type::record("Person")))
//!     .build();
//!
//! let registry = TagRegistry::builder()
//!     .expandable(&adults, |args: &ExpandArgs| {
//!         let people = args.query(0)?;
//!         Ok(people.filter(Expr::lambda1("p", Type::record("Person"), |p| {
//!             Expr::member(p, "Adult", Type::Bool)
//!         }))?)
//!     })
//!     .build()
//!     .unwrap();
//! assert!(registry.tag(&adults).is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use splice_tree::{Expr, ExprKind, FunctionDecl, FunctionId, Symbol, Value, WalkAction};

use crate::error::{ConstructionError, QueryResult, RegistryError};
use crate::query::Query;
use crate::tag::Tag;

/// An argument handed to an expansion function.
#[derive(Clone, Debug)]
pub enum ExpandArg {
    /// The first argument, as a query over the underlying provider.
    Query(Query),
    /// A constant argument, unwrapped.
    Value(Value),
    /// Any other argument, as its raw subtree.
    Expr(Expr),
}

/// Arguments of one expansion call site.
#[derive(Clone, Debug)]
pub struct ExpandArgs {
    args: Vec<ExpandArg>,
}

impl ExpandArgs {
    pub fn new(args: Vec<ExpandArg>) -> Self {
        ExpandArgs { args }
    }

    pub fn query(&self, index: usize) -> Result<&Query, ConstructionError> {
        match self.args.get(index) {
            Some(ExpandArg::Query(query)) => Ok(query),
            _ => Err(ConstructionError::ArgumentKind {
                index,
                expected: "a query",
            }),
        }
    }

    pub fn value(&self, index: usize) -> Result<&Value, ConstructionError> {
        match self.args.get(index) {
            Some(ExpandArg::Value(value)) => Ok(value),
            _ => Err(ConstructionError::ArgumentKind {
                index,
                expected: "a constant",
            }),
        }
    }

    /// The argument as an expression, whatever form it was passed in.
    pub fn expr(&self, index: usize) -> Result<Expr, ConstructionError> {
        match self.args.get(index) {
            Some(ExpandArg::Expr(expr)) => Ok(expr.clone()),
            Some(ExpandArg::Value(value)) => Ok(Expr::constant(value.clone())),
            Some(ExpandArg::Query(query)) => Ok(query.expr().clone()),
            None => Err(ConstructionError::ArgumentKind {
                index,
                expected: "present",
            }),
        }
    }
}

/// Produces the replacement query for an expandable call site.
pub type ExpandFn = Arc<dyn Fn(&ExpandArgs) -> QueryResult<Query> + Send + Sync>;

/// Produces a template lambda for redirected call sites.
pub type TemplateFactory = Arc<dyn Fn() -> Expr + Send + Sync>;

enum Binding {
    Expand { tag: Tag, expand: ExpandFn },
    Redirect { tag: Tag },
}

impl Binding {
    fn tag(&self) -> &Tag {
        match self {
            Binding::Expand { tag, .. } | Binding::Redirect { tag } => tag,
        }
    }
}

#[derive(Default)]
pub struct TagRegistry {
    functions: HashMap<FunctionId, Binding>,
    factories: HashMap<(Symbol, Symbol), TemplateFactory>,
}

impl TagRegistry {
    pub fn builder() -> TagRegistryBuilder {
        TagRegistryBuilder {
            registry: TagRegistry::default(),
            error: None,
        }
    }

    /// A registry with no tags: rewriting becomes the identity.
    pub fn empty() -> Arc<Self> {
        Arc::new(TagRegistry::default())
    }

    pub fn tag(&self, decl: &FunctionDecl) -> Option<&Tag> {
        self.functions.get(&decl.id()).map(Binding::tag)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub(crate) fn expander(&self, decl: &FunctionDecl) -> Option<&ExpandFn> {
        match self.functions.get(&decl.id())? {
            Binding::Expand { expand, .. } => Some(expand),
            Binding::Redirect { .. } => None,
        }
    }

    pub(crate) fn factory(&self, scope: &Symbol, name: &Symbol) -> Option<&TemplateFactory> {
        self.factories.get(&(scope.clone(), name.clone()))
    }

    /// First call node (pre-order) whose target carries a tag.
    pub fn find_tagged_call(&self, expr: &Expr) -> Option<Expr> {
        let found = expr.walk(|node| match node.kind() {
            ExprKind::Call { callee, .. } if self.tag(callee).is_some() => {
                ControlFlow::Break(node.clone())
            }
            _ => ControlFlow::Continue(WalkAction::Advance),
        });
        match found {
            ControlFlow::Break(node) => Some(node),
            ControlFlow::Continue(()) => None,
        }
    }

    pub fn contains_tagged_call(&self, expr: &Expr) -> bool {
        self.find_tagged_call(expr).is_some()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<String> = self
            .functions
            .iter()
            .map(|(id, binding)| format!("{id}: {}", binding.tag()))
            .collect();
        tags.sort();
        let mut factories: Vec<String> = self
            .factories
            .keys()
            .map(|(scope, name)| format!("{scope}::{name}"))
            .collect();
        factories.sort();
        f.debug_struct("TagRegistry")
            .field("tags", &tags)
            .field("factories", &factories)
            .finish()
    }
}

/// Collects registrations; the first invalid one is reported by [`build`].
///
/// [`build`]: TagRegistryBuilder::build
pub struct TagRegistryBuilder {
    registry: TagRegistry,
    error: Option<RegistryError>,
}

impl TagRegistryBuilder {
    /// Tag `decl` as expandable, implemented by `expand`.
    pub fn expandable<F>(self, decl: &FunctionDecl, expand: F) -> Self
    where
        F: Fn(&ExpandArgs) -> QueryResult<Query> + Send + Sync + 'static,
    {
        self.insert(
            decl,
            Binding::Expand {
                tag: Tag::Expand,
                expand: Arc::new(expand),
            },
        )
    }

    /// Tag `decl` as redirected to the factory `factory` in the same scope.
    pub fn redirect(self, decl: &FunctionDecl, factory: impl Into<Symbol>) -> Self {
        self.insert(
            decl,
            Binding::Redirect {
                tag: Tag::Redirect {
                    factory: factory.into(),
                },
            },
        )
    }

    /// Register a zero-argument template factory.
    pub fn factory<F>(mut self, scope: impl Into<Symbol>, name: impl Into<Symbol>, factory: F) -> Self
    where
        F: Fn() -> Expr + Send + Sync + 'static,
    {
        let key = (scope.into(), name.into());
        if self.registry.factories.contains_key(&key) {
            let (scope, name) = key;
            self.error
                .get_or_insert(RegistryError::DuplicateFactory { scope, name });
            return self;
        }
        self.registry.factories.insert(key, Arc::new(factory));
        self
    }

    fn insert(mut self, decl: &FunctionDecl, binding: Binding) -> Self {
        let id = decl.id();
        if self.registry.functions.contains_key(&id) {
            self.error
                .get_or_insert(RegistryError::AlreadyTagged { function: id });
            return self;
        }
        self.registry.functions.insert(id, binding);
        self
    }

    pub fn build(self) -> Result<Arc<TagRegistry>, RegistryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(Arc::new(self.registry)),
        }
    }
}

#[cfg(test)]
mod tests {
    use splice_tree::{Type, ops};

    use super::*;

    fn decl(name: &str) -> splice_tree::Callee {
        FunctionDecl::builder("sample", name)
            .param("source", Type::query(Type::Int))
            .returns(Type::query(Type::Int))
            .build()
    }

    #[test]
    fn double_tagging_is_rejected() {
        let f = decl("f");
        let err = TagRegistry::builder()
            .redirect(&f, "template")
            .expandable(&f, |args: &ExpandArgs| Ok(args.query(0)?.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyTagged { .. }));
        assert_eq!(err.to_string(), "`sample::f(Query<int>)` is already tagged");
    }

    #[test]
    fn duplicate_factory_is_rejected() {
        let err = TagRegistry::builder()
            .factory("sample", "template", || Expr::constant(1))
            .factory("sample", "template", || Expr::constant(2))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateFactory { .. }));
    }

    #[test]
    fn finds_tagged_calls_anywhere() {
        let f = decl("f");
        let g = decl("g");
        assert!(TagRegistry::empty().is_empty());
        let registry = TagRegistry::builder().redirect(&f, "template").build().unwrap();
        assert!(!registry.is_empty());

        let source = Expr::source("numbers", Type::Int);
        let untagged = Expr::call(g.clone(), [source.clone()]);
        assert!(!registry.contains_tagged_call(&untagged));

        let nested = ops::count(Expr::call(g, [Expr::call(f.clone(), [source])]));
        let found = registry.find_tagged_call(&nested).expect("tagged call");
        assert_eq!(found.as_call().map(|(callee, _, _)| callee.name.clone()), Some(f.name.clone()));
        assert_eq!(registry.tag(&f), Some(&Tag::Redirect { factory: Symbol::new("template") }));
    }

    #[test]
    fn expand_args_accessors() {
        let args = ExpandArgs::new(vec![
            ExpandArg::Value(Value::Int(3)),
            ExpandArg::Expr(Expr::constant("x")),
        ]);
        assert_eq!(args.value(0).ok(), Some(&Value::Int(3)));
        assert_eq!(args.expr(0).ok(), Some(Expr::constant(3)));
        assert!(matches!(
            args.query(0),
            Err(ConstructionError::ArgumentKind { index: 0, .. })
        ));
        assert!(args.expr(5).is_err());
    }
}
