//! The rewriting visitor.
//!
//! A single recursive pass replaces every tagged call it can handle:
//!
//! - an `Expand` call is replaced by the tree of the query its expansion
//!   function builds, which is rewritten in turn;
//! - a `Redirect` call is replaced by the body of the template its factory
//!   returns, with the template's parameters bound to the call arguments.
//!
//! Parameter references are substituted lazily. When the body of a template
//! refers to one of its parameters, the bound argument is rewritten in the
//! scope where that argument was written, so expansion and substitution
//! interleave and forwarded parameters resolve through every level.
//!
//! An argument whose parameter the template body never mentions is still
//! rewritten once, in argument order, and the result discarded. Fatal
//! errors inside it abort the rewrite; its statistics are not counted.

use std::ops::ControlFlow;
use std::sync::Arc;

use smallvec::SmallVec;
use splice_tree::{Callee, Expr, ExprKind, Param, Symbol, WalkAction};

use crate::error::{FallbackReason, QueryError, RewriteError};
use crate::options::{Fallback, RewriteOptions};
use crate::provider::Provider;
use crate::query::Query;
use crate::registry::{ExpandArg, ExpandArgs, ExpandFn, TagRegistry};
use crate::scope::Scope;
use crate::tag::Tag;

/// Result of a rewrite along with what it did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub expr: Expr,
    pub expansions: usize,
    pub redirects: usize,
    pub substitutions: usize,
}

impl RewriteOutcome {
    /// Whether the rewritten tree is the input tree itself.
    pub fn is_unchanged(&self, input: &Expr) -> bool {
        self.expr.ptr_eq(input)
    }
}

#[derive(Clone, Debug)]
pub struct Rewriter {
    registry: Arc<TagRegistry>,
    /// Provider that builds the query handed to expansion functions.
    underlying: Arc<dyn Provider>,
    options: RewriteOptions,
}

impl Rewriter {
    pub fn new(registry: Arc<TagRegistry>, underlying: Arc<dyn Provider>) -> Self {
        Rewriter {
            registry,
            underlying,
            options: RewriteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    pub fn rewrite(&self, expr: &Expr) -> Result<Expr, RewriteError> {
        self.rewrite_with_stats(expr).map(|outcome| outcome.expr)
    }

    pub fn rewrite_with_stats(&self, expr: &Expr) -> Result<RewriteOutcome, RewriteError> {
        let _span = tracing::debug_span!("rewrite").entered();
        let mut pass = Pass {
            rewriter: self,
            depth: 0,
            expansions: 0,
            redirects: 0,
            substitutions: 0,
        };
        let root = Scope::root();
        let rewritten = pass.rewrite(expr, &root)?;
        tracing::debug!(
            expansions = pass.expansions,
            redirects = pass.redirects,
            substitutions = pass.substitutions,
            "rewrite finished"
        );
        Ok(RewriteOutcome {
            expr: rewritten,
            expansions: pass.expansions,
            redirects: pass.redirects,
            substitutions: pass.substitutions,
        })
    }
}

struct Pass<'r> {
    rewriter: &'r Rewriter,
    depth: usize,
    expansions: usize,
    redirects: usize,
    substitutions: usize,
}

impl<'r> Pass<'r> {
    fn rewrite(&mut self, expr: &Expr, scope: &Scope<'_>) -> Result<Expr, RewriteError> {
        let registry: &'r TagRegistry = &self.rewriter.registry;
        match expr.kind() {
            ExprKind::Parameter(param) => self.substitute(expr, param, scope),
            ExprKind::Call {
                callee,
                receiver,
                args,
            } => {
                if let Some(expand) = registry.expander(callee) {
                    return self.expand(expr, callee, receiver.as_ref(), args, expand, scope);
                }
                if let Some(Tag::Redirect { factory }) = registry.tag(callee) {
                    return self.redirect(expr, callee, receiver.as_ref(), args, factory, scope);
                }
                self.descend(expr, scope)
            }
            _ => self.descend(expr, scope),
        }
    }

    fn descend(&mut self, expr: &Expr, scope: &Scope<'_>) -> Result<Expr, RewriteError> {
        expr.try_map_children(|child| self.rewrite(child, scope))
    }

    fn substitute(
        &mut self,
        expr: &Expr,
        param: &Param,
        scope: &Scope<'_>,
    ) -> Result<Expr, RewriteError> {
        let Some((arg, owner)) = scope.resolve(param.id()) else {
            return Ok(expr.clone());
        };
        // The argument was written where the binding scope was entered.
        let root = Scope::root();
        let authored = owner.parent().unwrap_or(&root);
        self.substitutions += 1;
        tracing::trace!(param = %param.name(), arg = %arg, "substituting parameter");
        self.nested(|pass| pass.rewrite(arg, authored))
    }

    fn expand(
        &mut self,
        expr: &Expr,
        callee: &Callee,
        receiver: Option<&Expr>,
        args: &[Expr],
        expand: &ExpandFn,
        scope: &Scope<'_>,
    ) -> Result<Expr, RewriteError> {
        if receiver.is_some() || !callee.is_static() {
            return self.fallback(expr, callee, FallbackReason::InstanceReceiver, scope);
        }

        let mut expand_args = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            expand_args.push(if index == 0 {
                ExpandArg::Query(Query::try_new(self.rewriter.underlying.clone(), arg.clone())?)
            } else if let Some(value) = arg.as_constant() {
                ExpandArg::Value(value.clone())
            } else {
                ExpandArg::Expr(arg.clone())
            });
        }

        let query = expand(&ExpandArgs::new(expand_args)).map_err(|error| match error {
            QueryError::Construction(error) => RewriteError::Construction(error),
            other => RewriteError::Expansion {
                function: callee.id(),
                source: Box::new(other),
            },
        })?;

        self.expansions += 1;
        tracing::debug!(function = %callee.id(), depth = self.depth, "expanding call");
        self.nested(|pass| pass.rewrite(query.expr(), scope))
    }

    fn redirect(
        &mut self,
        expr: &Expr,
        callee: &Callee,
        receiver: Option<&Expr>,
        args: &[Expr],
        factory: &Symbol,
        scope: &Scope<'_>,
    ) -> Result<Expr, RewriteError> {
        let registry: &'r TagRegistry = &self.rewriter.registry;
        let Some(make_template) = registry.factory(&callee.scope, factory) else {
            return Err(RewriteError::UnknownFactory {
                scope: callee.scope.clone(),
                name: factory.clone(),
            });
        };
        let template = make_template();
        let Some((params, body)) = template.as_lambda() else {
            return self.fallback(expr, callee, FallbackReason::NotATemplate, scope);
        };

        // An instance receiver is the template's first parameter.
        let actuals: SmallVec<[&Expr; 4]> = receiver.into_iter().chain(args).collect();
        if actuals.len() != params.len() {
            return Err(RewriteError::ArityMismatch {
                function: callee.id(),
                expected: params.len(),
                found: actuals.len(),
            });
        }

        let mut bindings = scope.child();
        for (param, arg) in params.iter().zip(actuals) {
            if !mentions(body, param) {
                self.check_unused(arg, scope)?;
            }
            bindings.bind(param, arg.clone())?;
        }

        self.redirects += 1;
        tracing::debug!(
            function = %callee.id(),
            factory = %factory,
            depth = self.depth,
            "redirecting call to template"
        );
        self.nested(|pass| pass.rewrite(body, &bindings))
    }

    fn check_unused(&mut self, arg: &Expr, scope: &Scope<'_>) -> Result<(), RewriteError> {
        let counts = (self.expansions, self.redirects, self.substitutions);
        self.nested(|pass| pass.rewrite(arg, scope))?;
        (self.expansions, self.redirects, self.substitutions) = counts;
        Ok(())
    }

    fn fallback(
        &mut self,
        expr: &Expr,
        callee: &Callee,
        reason: FallbackReason,
        scope: &Scope<'_>,
    ) -> Result<Expr, RewriteError> {
        match self.rewriter.options.fallback {
            Fallback::Ignore => {}
            Fallback::Warn => {
                tracing::warn!(function = %callee.id(), %reason, "leaving tagged call in place");
            }
            Fallback::Deny => {
                return Err(RewriteError::UnhandledTag {
                    function: callee.id(),
                    reason,
                });
            }
        }
        self.descend(expr, scope)
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Expr, RewriteError>,
    ) -> Result<Expr, RewriteError> {
        let limit = self.rewriter.options.max_depth;
        if self.depth >= limit {
            return Err(RewriteError::RecursionLimit { limit });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn mentions(body: &Expr, param: &Param) -> bool {
    body.walk(|node| match node.as_param() {
        Some(found) if found.id() == param.id() => ControlFlow::Break(()),
        _ => ControlFlow::Continue(WalkAction::Advance),
    })
    .is_break()
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use splice_tree::{BinaryOp, FunctionDecl, Type, ops};

    use super::*;
    use crate::registry::TagRegistryBuilder;
    use crate::test_support::NullProvider;

    fn person() -> Type {
        Type::record("Person")
    }

    fn people() -> Expr {
        Expr::source("people", person())
    }

    fn rewriter(registry: Arc<TagRegistry>) -> Rewriter {
        Rewriter::new(registry, Arc::new(NullProvider))
    }

    /// `full_name(first, last)` redirected to `|a, b| (a + b)`.
    fn concat_builder() -> (Callee, TagRegistryBuilder) {
        let full_name = FunctionDecl::builder("sample", "full_name")
            .param("first", Type::Str)
            .param("last", Type::Str)
            .returns(Type::Str)
            .build();
        let builder = TagRegistry::builder()
            .redirect(&full_name, "full_name_template")
            .factory("sample", "full_name_template", || {
                let a = Param::new("a", Type::Str);
                let b = Param::new("b", Type::Str);
                let body = Expr::binary(BinaryOp::Add, a.to_expr(), b.to_expr());
                Expr::lambda(vec![a, b], body)
            });
        (full_name, builder)
    }

    fn concat_registry() -> (Callee, Arc<TagRegistry>) {
        let (full_name, builder) = concat_builder();
        (full_name, builder.build().unwrap())
    }

    #[test]
    fn untagged_tree_is_returned_as_is() {
        let tree = ops::select(
            people(),
            Expr::lambda1("p", person(), |p| Expr::member(p, "Name", Type::Str)),
        );
        let outcome = rewriter(TagRegistry::empty())
            .rewrite_with_stats(&tree)
            .unwrap();
        assert!(outcome.is_unchanged(&tree));
        assert_eq!(outcome.expansions + outcome.redirects, 0);
    }

    #[test]
    fn redirect_binds_parameters_to_arguments() {
        let (full_name, registry) = concat_registry();
        let tree = ops::select(
            people(),
            Expr::lambda1("p", person(), |p| {
                Expr::call(
                    full_name,
                    [
                        Expr::member(p.clone(), "First", Type::Str),
                        Expr::member(p, "Last", Type::Str),
                    ],
                )
            }),
        );
        let outcome = rewriter(registry.clone()).rewrite_with_stats(&tree).unwrap();
        assert_snapshot!(outcome.expr, @"query::select(@people, |p| (p.First + p.Last))");
        assert_eq!(outcome.redirects, 1);
        assert_eq!(outcome.substitutions, 2);
        assert!(!registry.contains_tagged_call(&outcome.expr));
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let (full_name, registry) = concat_registry();
        let tree = Expr::call(full_name, [Expr::constant("Alice")]);
        let err = rewriter(registry).rewrite(&tree).unwrap_err();
        assert_snapshot!(err, @"redirect of `sample::full_name(str, str)` expects 2 argument(s) but the call site passes 1");
    }

    #[test]
    fn unused_arguments_are_still_checked() {
        let first = FunctionDecl::builder("sample", "first")
            .param("kept", Type::Str)
            .param("ignored", Type::Str)
            .returns(Type::Str)
            .build();
        let (full_name, builder) = concat_builder();
        let registry = builder
            .redirect(&first, "first_template")
            .factory("sample", "first_template", || {
                let kept = Param::new("kept", Type::Str);
                let ignored = Param::new("ignored", Type::Str);
                let body = kept.to_expr();
                Expr::lambda(vec![kept, ignored], body)
            })
            .build()
            .unwrap();

        let valid = Expr::call(
            first.clone(),
            [
                Expr::constant("Alice"),
                Expr::call(full_name.clone(), [Expr::constant("B"), Expr::constant("ob")]),
            ],
        );
        let outcome = rewriter(registry.clone()).rewrite_with_stats(&valid).unwrap();
        assert_snapshot!(outcome.expr, @r#""Alice""#);
        assert_eq!(outcome.redirects, 1);
        assert_eq!(outcome.substitutions, 1);

        let broken = Expr::call(
            first,
            [
                Expr::constant("Alice"),
                Expr::call(full_name, [Expr::constant("Bob")]),
            ],
        );
        let err = rewriter(registry).rewrite(&broken).unwrap_err();
        assert!(matches!(
            err,
            RewriteError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn unknown_factory_is_fatal() {
        let f = FunctionDecl::builder("sample", "f").param("x", Type::Int).returns(Type::Int).build();
        let registry = TagRegistry::builder().redirect(&f, "missing").build().unwrap();
        let err = rewriter(registry)
            .rewrite(&Expr::call(f, [Expr::constant(1)]))
            .unwrap_err();
        assert!(matches!(err, RewriteError::UnknownFactory { .. }));
        assert_snapshot!(err, @"template factory `sample::missing` is not registered");
    }

    #[test]
    fn repeated_template_parameter_is_fatal() {
        let f = FunctionDecl::builder("sample", "twice")
            .param("x", Type::Int)
            .param("y", Type::Int)
            .returns(Type::Int)
            .build();
        let registry = TagRegistry::builder()
            .redirect(&f, "twice_template")
            .factory("sample", "twice_template", || {
                let x = Param::new("x", Type::Int);
                let body = Expr::binary(BinaryOp::Add, x.to_expr(), x.to_expr());
                Expr::lambda(vec![x.clone(), x], body)
            })
            .build()
            .unwrap();
        let err = rewriter(registry)
            .rewrite(&Expr::call(f, [Expr::constant(1), Expr::constant(2)]))
            .unwrap_err();
        assert!(matches!(err, RewriteError::DuplicateParameter { .. }));
    }

    #[test]
    fn non_lambda_template_falls_back() {
        let f = FunctionDecl::builder("sample", "f").param("x", Type::Int).returns(Type::Int).build();
        let registry = TagRegistry::builder()
            .redirect(&f, "not_a_template")
            .factory("sample", "not_a_template", || Expr::constant(0))
            .build()
            .unwrap();
        let tree = Expr::call(f.clone(), [Expr::constant(1)]);

        let ignored = rewriter(registry.clone())
            .with_options(RewriteOptions::new().with_fallback(Fallback::Ignore))
            .rewrite(&tree)
            .unwrap();
        assert!(ignored.ptr_eq(&tree));

        let err = rewriter(registry)
            .with_options(RewriteOptions::new().with_fallback(Fallback::Deny))
            .rewrite(&tree)
            .unwrap_err();
        assert_snapshot!(err, @"tag on `sample::f(int)` cannot be applied: redirect factory did not produce a lambda template");
    }

    #[test]
    fn self_expanding_fragment_hits_the_depth_limit() {
        let forever = FunctionDecl::builder("sample", "forever")
            .param("source", Type::query(person()))
            .returns(Type::query(person()))
            .build();
        let again = forever.clone();
        let registry = TagRegistry::builder()
            .expandable(&forever, move |args: &ExpandArgs| {
                Ok(args.query(0)?.apply(&again, [])?)
            })
            .build()
            .unwrap();
        let err = rewriter(registry)
            .with_options(RewriteOptions::new().with_max_depth(8))
            .rewrite(&Expr::call(forever, [people()]))
            .unwrap_err();
        assert_snapshot!(err, @"rewrite nesting exceeded 8 levels");
    }

    #[test]
    fn expansion_receives_constants_as_values() {
        let take = FunctionDecl::builder("sample", "named")
            .param("source", Type::query(person()))
            .param("name", Type::Str)
            .returns(Type::query(person()))
            .build();
        let registry = TagRegistry::builder()
            .expandable(&take, |args: &ExpandArgs| {
                let name = args.value(1)?.clone();
                Ok(args.query(0)?.filter(Expr::lambda1("p", person(), |p| {
                    Expr::binary(BinaryOp::Eq, Expr::member(p, "Name", Type::Str), Expr::constant(name))
                }))?)
            })
            .build()
            .unwrap();
        let tree = ops::count(Expr::call(take, [people(), Expr::constant("Bob")]));
        let outcome = rewriter(registry).rewrite_with_stats(&tree).unwrap();
        assert_snapshot!(outcome.expr, @r#"query::count(query::filter(@people, |p| (p.Name == "Bob")))"#);
        assert_eq!(outcome.expansions, 1);
    }

    #[test]
    fn instance_expandable_falls_back() {
        let method = FunctionDecl::builder("sample", "friends")
            .receiver(person())
            .returns(Type::query(person()))
            .build();
        let registry = TagRegistry::builder()
            .expandable(&method, |args: &ExpandArgs| Ok(args.query(0)?.clone()))
            .build()
            .unwrap();
        let tree = Expr::lambda1("p", person(), |p| Expr::method_call(method, p, []));

        let kept = rewriter(registry.clone()).rewrite(&tree).unwrap();
        assert!(kept.ptr_eq(&tree));

        let err = rewriter(registry)
            .with_options(RewriteOptions::new().with_fallback(Fallback::Deny))
            .rewrite(&tree)
            .unwrap_err();
        assert!(matches!(
            err,
            RewriteError::UnhandledTag {
                reason: FallbackReason::InstanceReceiver,
                ..
            }
        ));
    }
}
