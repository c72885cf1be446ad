//! Expression nodes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{Callee, ExprVec, Symbol, Type, Value};

static NEXT_PARAM_ID: AtomicU32 = AtomicU32::new(0);

/// Unique identity of a lambda parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u32);

impl ParamId {
    /// Allocate a new identity. Two parameters never share one, even when
    /// they have the same name.
    pub fn fresh() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A formal parameter of a lambda.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    id: ParamId,
    name: Symbol,
    ty: Type,
}

impl Param {
    pub fn new(name: impl Into<Symbol>, ty: Type) -> Self {
        Param {
            id: ParamId::fresh(),
            name: name.into(),
            ty,
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// A reference to this parameter.
    pub fn to_expr(&self) -> Expr {
        Expr::param(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    And,
    Or,
    Add,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Constant(Value),
    /// Reference to a lambda parameter.
    Parameter(Param),
    /// A root table known to the provider.
    Source(Symbol),
    Lambda {
        params: Vec<Param>,
        body: Expr,
    },
    Member {
        target: Expr,
        member: Symbol,
    },
    /// Record construction with named fields, in declaration order.
    New {
        ty: Symbol,
        fields: Vec<(Symbol, Expr)>,
    },
    Binary {
        op: BinaryOp,
        lhs: Expr,
        rhs: Expr,
    },
    Call {
        callee: Callee,
        receiver: Option<Expr>,
        args: ExprVec,
    },
}

#[derive(PartialEq, Eq)]
struct ExprData {
    kind: ExprKind,
    ty: Type,
}

/// An immutable, shared expression node.
///
/// Cloning is cheap. Equality is structural; use [`Expr::ptr_eq`] for identity.
#[derive(Clone)]
pub struct Expr(Arc<ExprData>);

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Expr(Arc::new(ExprData { kind, ty }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.ty();
        Expr::new(ExprKind::Constant(value), ty)
    }

    pub fn param(param: &Param) -> Self {
        Expr::new(ExprKind::Parameter(param.clone()), param.ty().clone())
    }

    /// A root table producing a query of `element`.
    pub fn source(table: impl Into<Symbol>, element: Type) -> Self {
        Expr::new(ExprKind::Source(table.into()), Type::query(element))
    }

    pub fn lambda(params: Vec<Param>, body: Expr) -> Self {
        let ty = Type::function(
            params.iter().map(|p| p.ty().clone()).collect(),
            body.ty().clone(),
        );
        Expr::new(ExprKind::Lambda { params, body }, ty)
    }

    /// Single-parameter lambda; `body` receives a reference to the parameter.
    pub fn lambda1(name: impl Into<Symbol>, ty: Type, body: impl FnOnce(Expr) -> Expr) -> Self {
        let param = Param::new(name, ty);
        let body = body(param.to_expr());
        Expr::lambda(vec![param], body)
    }

    pub fn member(target: Expr, member: impl Into<Symbol>, ty: Type) -> Self {
        Expr::new(
            ExprKind::Member {
                target,
                member: member.into(),
            },
            ty,
        )
    }

    pub fn new_record<N: Into<Symbol>>(
        ty: impl Into<Symbol>,
        fields: impl IntoIterator<Item = (N, Expr)>,
    ) -> Self {
        let ty = ty.into();
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Expr::new(
            ExprKind::New {
                ty: ty.clone(),
                fields,
            },
            Type::Record(ty),
        )
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let ty = match op {
            BinaryOp::Add => lhs.ty().clone(),
            _ => Type::Bool,
        };
        Expr::new(ExprKind::Binary { op, lhs, rhs }, ty)
    }

    /// Static call typed by the callee's declared return type.
    pub fn call(callee: Callee, args: impl IntoIterator<Item = Expr>) -> Self {
        let ty = callee.ret.clone();
        Expr::call_typed(callee, args, ty)
    }

    /// Static call with an explicit result type, for generic callees.
    pub fn call_typed(callee: Callee, args: impl IntoIterator<Item = Expr>, ty: Type) -> Self {
        Expr::new(
            ExprKind::Call {
                callee,
                receiver: None,
                args: args.into_iter().collect(),
            },
            ty,
        )
    }

    pub fn method_call(callee: Callee, receiver: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        let ty = callee.ret.clone();
        Expr::new(
            ExprKind::Call {
                callee,
                receiver: Some(receiver),
                args: args.into_iter().collect(),
            },
            ty,
        )
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self.kind() {
            ExprKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<&Param> {
        match self.kind() {
            ExprKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<(&[Param], &Expr)> {
        match self.kind() {
            ExprKind::Lambda { params, body } => Some((params, body)),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<(&Callee, Option<&Expr>, &[Expr])> {
        match self.kind() {
            ExprKind::Call {
                callee,
                receiver,
                args,
            } => Some((callee, receiver.as_ref(), args)),
            _ => None,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Expr {}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("ty", self.ty())
            .field("kind", self.kind())
            .finish()
    }
}
