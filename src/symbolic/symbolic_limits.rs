//! Symbolic limit evaluation for the difference quotient.
//!
//! The only limit this service ever takes is `h -> 0` over a quotient that
//! has already been factored and cancelled, so the evaluation strategy is
//! substitute-then-simplify: replace the variable by its approach value and
//! check that the result is a well-defined expression. When it is not (a
//! `0/0` form survived cancellation, a division by zero appeared, a logarithm
//! collapsed onto a non-positive constant), the limit is *unresolved* and a
//! residual [`Expr::Lim`] node is returned in its place.
//!
//! Unresolved is not an error: the derivation builder detects the residual
//! node and falls back to direct differentiation, so a limit that refuses to
//! close degrades the narrative, never the request.

use crate::symbolic::symbolic_engine::Expr;

/// Evaluates `lim_{var -> to} expr`, returning either the closed value or a
/// residual limit node when the form does not resolve.
pub fn limit(expr: &Expr, var: &str, to: &Expr) -> Expr {
    let candidate = expr.substitute_variable(var, to).simplify();
    if is_defined(&candidate) {
        candidate
    } else {
        Expr::Lim(
            expr.clone().boxed(),
            var.to_string(),
            to.clone().boxed(),
        )
    }
}

/// A candidate value is accepted only when no undefined form survives in it.
fn is_defined(expr: &Expr) -> bool {
    match expr {
        Expr::Const(value) => value.is_finite(),
        Expr::Var(_) => true,
        Expr::Div(num, den) => {
            is_defined(num)
                && is_defined(den)
                && !matches!(den.as_ref(), Expr::Const(v) if *v == 0.0)
        }
        Expr::Pow(base, exp) => {
            is_defined(base)
                && is_defined(exp)
                && !matches!(
                    (base.as_ref(), exp.as_ref()),
                    (Expr::Const(b), Expr::Const(e)) if *b == 0.0 && *e < 0.0
                )
        }
        Expr::Ln(inner) => {
            is_defined(inner) && !matches!(inner.as_ref(), Expr::Const(v) if *v <= 0.0)
        }
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
            is_defined(lhs) && is_defined(rhs)
        }
        Expr::Exp(inner)
        | Expr::sin(inner)
        | Expr::cos(inner)
        | Expr::tg(inner)
        | Expr::ctg(inner)
        | Expr::arcsin(inner)
        | Expr::arccos(inner)
        | Expr::arctg(inner)
        | Expr::arcctg(inner) => is_defined(inner),
        Expr::Lim(_, _, _) => false,
    }
}
