//! Textual form of expression trees.
//!
//! The format is compact and single-line:
//!
//! - sources print as `@table`, parameters by name, constants as values
//! - lambdas as `|a, b| body`
//! - calls as `scope::name(args)`, instance calls as `receiver.name(args)`
//! - record construction as `Type { field: value }`

use std::fmt;

use crate::{Expr, ExprKind};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Constant(value) => write!(f, "{value}"),
            ExprKind::Parameter(param) => write!(f, "{}", param.name()),
            ExprKind::Source(table) => write!(f, "@{table}"),
            ExprKind::Lambda { params, body } => {
                f.write_str("|")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param.name())?;
                }
                write!(f, "| {body}")
            }
            ExprKind::Member { target, member } => write!(f, "{target}.{member}"),
            ExprKind::New { ty, fields } => {
                if fields.is_empty() {
                    return write!(f, "{ty} {{}}");
                }
                write!(f, "{ty} {{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExprKind::Call {
                callee,
                receiver,
                args,
            } => {
                match receiver {
                    Some(receiver) => write!(f, "{receiver}.{}(", callee.name)?,
                    None => write!(f, "{}::{}(", callee.scope, callee.name)?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::{BinaryOp, Expr, FunctionDecl, Type, ops};

    #[test]
    fn prints_query_chain() {
        let person = Type::record("Person");
        let tree = ops::select(
            ops::filter(
                Expr::source("people", person.clone()),
                Expr::lambda1("p", person.clone(), |p| {
                    Expr::binary(
                        BinaryOp::Ne,
                        Expr::member(p, "Name", Type::Str),
                        Expr::constant("Bob"),
                    )
                }),
            ),
            Expr::lambda1("p", person, |p| {
                Expr::new_record(
                    "Summary",
                    [
                        ("Name", Expr::member(p.clone(), "Name", Type::Str)),
                        ("Friends", Expr::member(p, "Friends", Type::seq(Type::Any))),
                    ],
                )
            }),
        );

        assert_snapshot!(tree, @r#"query::select(query::filter(@people, |p| (p.Name != "Bob")), |p| Summary { Name: p.Name, Friends: p.Friends })"#);
    }

    #[test]
    fn prints_instance_calls() {
        let method = FunctionDecl::builder("sample", "greet")
            .receiver(Type::record("Profile"))
            .param("greeting", Type::Str)
            .returns(Type::Str)
            .build();
        let tree = Expr::lambda1("x", Type::record("Profile"), |x| {
            Expr::method_call(method, x, [Expr::constant("hi")])
        });
        assert_snapshot!(tree, @r#"|x| x.greet("hi")"#);
    }
}
