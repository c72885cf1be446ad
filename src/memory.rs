//! An in-memory execution provider.
//!
//! [`MemoryProvider`] evaluates trees built from primitive node kinds over
//! tables of records. Like a provider translating to a remote store, it has
//! no way to run arbitrary functions: a call to anything other than a
//! built-in query operator is rejected with [`ExecutionError::UnsupportedCall`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use derive_more::{Display, Error};
use splice_query::{Provider, QueryError, QueryResult};
use splice_tree::ops::{self, Builtin};
use splice_tree::{BinaryOp, Expr, ExprKind, FunctionId, ParamId, Record, Symbol, Value};

#[derive(Debug, Display, Error)]
pub enum ExecutionError {
    #[display("unknown table `{table}`")]
    UnknownTable { table: Symbol },

    #[display("`{function}` has no translation and cannot be executed")]
    UnsupportedCall { function: FunctionId },

    #[display("parameter `{name}` is not in scope")]
    UnboundParameter { name: Symbol },

    #[display("`{value}` has no member `{member}`")]
    MissingMember { value: String, member: Symbol },

    #[display("expected {expected}, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[display("a lambda is not a value")]
    BareLambda,
}

impl From<ExecutionError> for QueryError {
    fn from(error: ExecutionError) -> Self {
        QueryError::execution(error)
    }
}

type Result<T, E = ExecutionError> = std::result::Result<T, E>;

#[derive(Debug, Default)]
pub struct MemoryProvider {
    tables: HashMap<Symbol, Vec<Value>>,
    executed: Mutex<Vec<Expr>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<Symbol>, rows: Vec<Value>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    /// Every tree this provider was asked to execute, oldest first.
    pub fn executed(&self) -> Vec<Expr> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, expr: &Expr) {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(expr.clone());
    }

    fn eval(&self, env: &Env<'_>, expr: &Expr) -> Result<Value> {
        Ok(match expr.kind() {
            ExprKind::Constant(value) => value.clone(),
            ExprKind::Parameter(param) => env
                .lookup(param.id())
                .cloned()
                .ok_or_else(|| ExecutionError::UnboundParameter {
                    name: param.name().clone(),
                })?,
            ExprKind::Source(table) => {
                let rows = self
                    .tables
                    .get(table)
                    .ok_or_else(|| ExecutionError::UnknownTable {
                        table: table.clone(),
                    })?;
                Value::List(rows.clone())
            }
            ExprKind::Lambda { .. } => return Err(ExecutionError::BareLambda),
            ExprKind::Member { target, member } => {
                let target = self.eval(env, target)?;
                target
                    .field(member.as_str())
                    .cloned()
                    .ok_or_else(|| ExecutionError::MissingMember {
                        value: target.to_string(),
                        member: member.clone(),
                    })?
            }
            ExprKind::New { ty, fields } => {
                let mut record = Record::new(ty.clone());
                for (name, value) in fields {
                    record = record.with(name.clone(), self.eval(env, value)?);
                }
                Value::Record(record)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                binary(*op, self.eval(env, lhs)?, self.eval(env, rhs)?)?
            }
            ExprKind::Call {
                callee,
                receiver,
                args,
            } => {
                let builtin = match (receiver, ops::builtin(callee)) {
                    (None, Some(builtin)) => builtin,
                    _ => {
                        return Err(ExecutionError::UnsupportedCall {
                            function: callee.id(),
                        });
                    }
                };
                self.call(env, builtin, args)?
            }
        })
    }

    fn call(&self, env: &Env<'_>, builtin: Builtin, args: &[Expr]) -> Result<Value> {
        let [source, rest @ ..] = args else {
            return Err(ExecutionError::TypeMismatch {
                expected: "a source argument",
                found: "nothing".to_owned(),
            });
        };
        let items = list(self.eval(env, source)?)?;
        Ok(match (builtin, rest) {
            (Builtin::Select, [selector]) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.apply(env, selector, item))
                    .collect::<Result<_>>()?,
            ),
            (Builtin::Filter, [predicate]) => {
                let mut kept = Vec::new();
                for item in items {
                    if truthy(self.apply(env, predicate, item.clone())?)? {
                        kept.push(item);
                    }
                }
                Value::List(kept)
            }
            (Builtin::Count, []) => Value::Int(items.len() as i64),
            (Builtin::AsQueryable, []) => Value::List(items),
            (builtin, _) => {
                return Err(ExecutionError::TypeMismatch {
                    expected: "the operator's declared arguments",
                    found: format!("{} argument(s) to `{}`", args.len(), builtin.name()),
                });
            }
        })
    }

    fn apply(&self, env: &Env<'_>, lambda: &Expr, arg: Value) -> Result<Value> {
        let Some(([param], body)) = lambda.as_lambda() else {
            return Err(ExecutionError::TypeMismatch {
                expected: "a one-parameter lambda",
                found: lambda.to_string(),
            });
        };
        let env = env.child(param.id(), arg);
        self.eval(&env, body)
    }
}

impl Provider for MemoryProvider {
    fn execute(&self, expr: &Expr) -> QueryResult<Vec<Value>> {
        self.record(expr);
        tracing::debug!(tree = %expr, "executing in memory");
        Ok(list(self.eval(&Env::default(), expr)?)?)
    }

    fn execute_scalar(&self, expr: &Expr) -> QueryResult<Value> {
        self.record(expr);
        tracing::debug!(tree = %expr, "evaluating in memory");
        Ok(self.eval(&Env::default(), expr)?)
    }
}

#[derive(Default)]
struct Env<'parent> {
    parent: Option<&'parent Env<'parent>>,
    bindings: HashMap<ParamId, Value>,
}

impl Env<'_> {
    fn lookup(&self, id: ParamId) -> Option<&Value> {
        match self.bindings.get(&id) {
            Some(value) => Some(value),
            None => self.parent?.lookup(id),
        }
    }

    fn child(&self, id: ParamId, value: Value) -> Env<'_> {
        Env {
            parent: Some(self),
            bindings: HashMap::from([(id, value)]),
        }
    }
}

fn list(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(ExecutionError::TypeMismatch {
            expected: "a sequence",
            found: other.to_string(),
        }),
    }
}

fn truthy(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(ExecutionError::TypeMismatch {
            expected: "a boolean",
            found: other.to_string(),
        }),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    Ok(match (op, lhs, rhs) {
        (BinaryOp::Eq, lhs, rhs) => Value::Bool(lhs == rhs),
        (BinaryOp::Ne, lhs, rhs) => Value::Bool(lhs != rhs),
        (BinaryOp::Lt, Value::Int(a), Value::Int(b)) => Value::Bool(a < b),
        (BinaryOp::Gt, Value::Int(a), Value::Int(b)) => Value::Bool(a > b),
        (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Value::Bool(a && b),
        (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Value::Bool(a || b),
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Value::Int(a + b),
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
        (op, lhs, rhs) => {
            return Err(ExecutionError::TypeMismatch {
                expected: "operands of matching type",
                found: format!("{lhs} {} {rhs}", op.symbol()),
            });
        }
    })
}
