//! # Symbolic Simplification Module
//!
//! Algebraic simplification for [`Expr`], in two layers:
//!
//! 1. **Constant folding** (`simplify_numbers`): evaluates arithmetic between
//!    numerical constants, leaving everything else untouched.
//! 2. **Identity rewriting** (`simplify`): folds constants and applies the
//!    classic identities (`x + 0 = x`, `x * 1 = x`, `x - x = 0`, `x^1 = x`,
//!    special values of the transcendental functions, ...) bottom-up until a
//!    fixed point.
//!
//! On top of these, `cancel` normalizes an expression into a ratio of
//! multivariate polynomials and divides out common powers of a chosen
//! variable. That is exactly the "factor and cancel" a difference quotient
//! needs: its numerator vanishes at `h = 0`, so for polynomial and rational
//! inputs the increment divides out and the limit becomes a plain
//! substitution. Expressions with transcendental parts fall outside the
//! rational form and are returned as None, leaving the quotient intact.

use std::collections::BTreeMap;

use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// Simplifies expressions by evaluating constant arithmetic operations.
    ///
    /// Performs constant folding only: no algebraic identities, no term
    /// collection. Division by a zero constant is left as written.
    pub fn simplify_numbers(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                match (lhs.simplify_numbers(), rhs.simplify_numbers()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                    (lhs, rhs) => Expr::Add(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Sub(lhs, rhs) => {
                match (lhs.simplify_numbers(), rhs.simplify_numbers()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                    (lhs, rhs) => Expr::Sub(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Mul(lhs, rhs) => {
                match (lhs.simplify_numbers(), rhs.simplify_numbers()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                    (lhs, rhs) => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Div(lhs, rhs) => {
                match (lhs.simplify_numbers(), rhs.simplify_numbers()) {
                    (Expr::Const(a), Expr::Const(b)) if b != 0.0 => Expr::Const(a / b),
                    (lhs, rhs) => Expr::Div(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Pow(base, exp) => {
                match (base.simplify_numbers(), exp.simplify_numbers()) {
                    (Expr::Const(b), Expr::Const(e)) if constant_power_is_exact(b, e) => {
                        Expr::Const(b.powf(e))
                    }
                    (base, exp) => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Lim(inner, var, to) => Expr::Lim(
                Box::new(inner.simplify_numbers()),
                var.clone(),
                Box::new(to.simplify_numbers()),
            ),
            other => match other.unary_arg_cloned() {
                Some(arg) => other.rebuild_unary(arg.simplify_numbers()),
                None => other.clone(),
            },
        }
    }

    // small helper so the folding passes can recurse through function nodes
    // without naming all of them again
    fn unary_arg_cloned(&self) -> Option<Expr> {
        match self {
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::ctg(e)
            | Expr::arcsin(e)
            | Expr::arccos(e)
            | Expr::arctg(e)
            | Expr::arcctg(e) => Some((**e).clone()),
            _ => None,
        }
    }

    /// Comprehensive algebraic simplification using mathematical identities.
    ///
    /// Repeats the rewriting pass until the tree stops changing (bounded, the
    /// rule set strictly shrinks trees in practice).
    pub fn simplify(&self) -> Expr {
        let mut current = self.clone();
        for _ in 0..16 {
            let next = current.simplify_once();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn simplify_once(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                match (lhs.simplify_once(), rhs.simplify_once()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                    (Expr::Const(z), other) if z == 0.0 => other,
                    (other, Expr::Const(z)) if z == 0.0 => other,
                    (lhs, rhs) => Expr::Add(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Sub(lhs, rhs) => {
                match (lhs.simplify_once(), rhs.simplify_once()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                    (other, Expr::Const(z)) if z == 0.0 => other,
                    (lhs, rhs) if lhs == rhs => Expr::Const(0.0),
                    (Expr::Const(z), other) if z == 0.0 => {
                        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other))
                    }
                    (lhs, rhs) => Expr::Sub(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Mul(lhs, rhs) => {
                match (lhs.simplify_once(), rhs.simplify_once()) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                    (Expr::Const(z), _) if z == 0.0 => Expr::Const(0.0),
                    (_, Expr::Const(z)) if z == 0.0 => Expr::Const(0.0),
                    (Expr::Const(o), other) if o == 1.0 => other,
                    (other, Expr::Const(o)) if o == 1.0 => other,
                    // collect constants of nested products, constant first
                    (Expr::Const(a), Expr::Mul(inner_lhs, inner_rhs)) => {
                        if let Expr::Const(b) = inner_lhs.as_ref() {
                            Expr::Mul(Box::new(Expr::Const(a * b)), inner_rhs)
                        } else {
                            Expr::Mul(
                                Box::new(Expr::Const(a)),
                                Box::new(Expr::Mul(inner_lhs, inner_rhs)),
                            )
                        }
                    }
                    (other, constant @ Expr::Const(_)) => {
                        Expr::Mul(Box::new(constant), Box::new(other))
                    }
                    (lhs, rhs) => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Div(lhs, rhs) => {
                match (lhs.simplify_once(), rhs.simplify_once()) {
                    (Expr::Const(a), Expr::Const(b)) if b != 0.0 => Expr::Const(a / b),
                    // 0/0 and x/0 stay as written; limit evaluation inspects them
                    (lhs @ Expr::Const(_), rhs @ Expr::Const(_)) => {
                        Expr::Div(Box::new(lhs), Box::new(rhs))
                    }
                    (Expr::Const(z), _) if z == 0.0 => Expr::Const(0.0),
                    (other, Expr::Const(o)) if o == 1.0 => other,
                    (lhs, rhs) if lhs == rhs && lhs != Expr::Const(0.0) => Expr::Const(1.0),
                    (lhs, rhs) => Expr::Div(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Pow(base, exp) => {
                match (base.simplify_once(), exp.simplify_once()) {
                    (_, Expr::Const(z)) if z == 0.0 => Expr::Const(1.0),
                    (base, Expr::Const(o)) if o == 1.0 => base,
                    (Expr::Const(o), _) if o == 1.0 => Expr::Const(1.0),
                    (Expr::Const(b), Expr::Const(e)) if constant_power_is_exact(b, e) => {
                        Expr::Const(b.powf(e))
                    }
                    (base, exp) => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Exp(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(1.0),
                Expr::Ln(arg) => *arg,
                inner => Expr::Exp(Box::new(inner)),
            },
            Expr::Ln(inner) => match inner.simplify_once() {
                Expr::Const(o) if o == 1.0 => Expr::Const(0.0),
                Expr::Var(name) if name == "e" => Expr::Const(1.0),
                Expr::Exp(arg) => *arg,
                inner => Expr::Ln(Box::new(inner)),
            },
            Expr::sin(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(0.0),
                Expr::Var(name) if name == "pi" => Expr::Const(0.0),
                inner => Expr::sin(Box::new(inner)),
            },
            Expr::cos(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(1.0),
                Expr::Var(name) if name == "pi" => Expr::Const(-1.0),
                inner => Expr::cos(Box::new(inner)),
            },
            Expr::tg(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(0.0),
                inner => Expr::tg(Box::new(inner)),
            },
            Expr::arcsin(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(0.0),
                inner => Expr::arcsin(Box::new(inner)),
            },
            Expr::arccos(inner) => match inner.simplify_once() {
                Expr::Const(o) if o == 1.0 => Expr::Const(0.0),
                inner => Expr::arccos(Box::new(inner)),
            },
            Expr::arctg(inner) => match inner.simplify_once() {
                Expr::Const(z) if z == 0.0 => Expr::Const(0.0),
                inner => Expr::arctg(Box::new(inner)),
            },
            Expr::Lim(inner, var, to) => Expr::Lim(
                Box::new(inner.simplify_once()),
                var.clone(),
                Box::new(to.simplify_once()),
            ),
            other => match other.unary_arg_cloned() {
                Some(arg) => other.rebuild_unary(arg.simplify_once()),
                None => other.clone(),
            },
        }
    }

    /// Normalizes the expression into a ratio of polynomials and divides out
    /// the highest common power of `var`, the increment variable of the
    /// difference quotient. Returns None when the expression has parts
    /// outside the rational form (trig, logarithms, fractional powers) or an
    /// identically zero denominator.
    pub fn cancel(&self, var: &str) -> Option<Expr> {
        let (num, den) = to_rational(self)?;
        if den.is_zero() {
            return None;
        }
        if num.is_zero() {
            return Some(Expr::Const(0.0));
        }
        let k = num.min_degree_in(var).min(den.min_degree_in(var));
        let num = num.shift_down(var, k);
        let den = den.shift_down(var, k);
        match den.as_constant() {
            Some(c) if c != 0.0 => Some(num.scale(1.0 / c).to_expr(var)),
            Some(_) => None,
            None => Some(Expr::Div(
                num.to_expr(var).boxed(),
                den.to_expr(var).boxed(),
            )),
        }
    }
}

/// b^e folds to a constant only when the result is a well-defined real.
fn constant_power_is_exact(base: f64, exp: f64) -> bool {
    if base < 0.0 && exp.fract() != 0.0 {
        return false;
    }
    if base == 0.0 && exp < 0.0 {
        return false;
    }
    true
}

// ---------------------------------------------------------------------------
// rational normal form
// ---------------------------------------------------------------------------

/// A monomial maps variable names to positive exponents.
type Monomial = BTreeMap<String, u32>;

/// Sparse multivariate polynomial with f64 coefficients.
#[derive(Debug, Clone, PartialEq)]
struct Poly {
    terms: BTreeMap<Monomial, f64>,
}

impl Poly {
    fn zero() -> Self {
        Poly {
            terms: BTreeMap::new(),
        }
    }

    fn constant(value: f64) -> Self {
        let mut poly = Poly::zero();
        poly.accumulate(Monomial::new(), value);
        poly
    }

    fn var(name: &str) -> Self {
        let mut monomial = Monomial::new();
        monomial.insert(name.to_string(), 1);
        let mut poly = Poly::zero();
        poly.accumulate(monomial, 1.0);
        poly
    }

    fn accumulate(&mut self, monomial: Monomial, coeff: f64) {
        if coeff == 0.0 {
            return;
        }
        let total = {
            let entry = self.terms.entry(monomial.clone()).or_insert(0.0);
            *entry += coeff;
            *entry
        };
        if total == 0.0 {
            self.terms.remove(&monomial);
        }
    }

    fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (monomial, coeff) in &other.terms {
            out.accumulate(monomial.clone(), *coeff);
        }
        out
    }

    fn sub(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (monomial, coeff) in &other.terms {
            out.accumulate(monomial.clone(), -coeff);
        }
        out
    }

    fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let mut monomial = ma.clone();
                for (name, exp) in mb {
                    *monomial.entry(name.clone()).or_insert(0) += exp;
                }
                out.accumulate(monomial, ca * cb);
            }
        }
        out
    }

    fn pow(&self, n: u32) -> Poly {
        let mut out = Poly::constant(1.0);
        for _ in 0..n {
            out = out.mul(self);
        }
        out
    }

    fn scale(&self, factor: f64) -> Poly {
        let mut out = Poly::zero();
        for (monomial, coeff) in &self.terms {
            out.accumulate(monomial.clone(), coeff * factor);
        }
        out
    }

    fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    fn as_constant(&self) -> Option<f64> {
        if self.terms.is_empty() {
            return Some(0.0);
        }
        if self.terms.len() == 1 {
            if let Some(coeff) = self.terms.get(&Monomial::new()) {
                return Some(*coeff);
            }
        }
        None
    }

    fn min_degree_in(&self, var: &str) -> u32 {
        self.terms
            .keys()
            .map(|monomial| monomial.get(var).copied().unwrap_or(0))
            .min()
            .unwrap_or(0)
    }

    /// Divides every term by var^k; callers guarantee divisibility.
    fn shift_down(&self, var: &str, k: u32) -> Poly {
        if k == 0 {
            return self.clone();
        }
        let mut out = Poly::zero();
        for (monomial, coeff) in &self.terms {
            let mut reduced = monomial.clone();
            let degree = reduced.get(var).copied().unwrap_or(0);
            let remaining = degree.saturating_sub(k);
            if remaining == 0 {
                reduced.remove(var);
            } else {
                reduced.insert(var.to_string(), remaining);
            }
            out.accumulate(reduced, *coeff);
        }
        out
    }

    /// Rebuilds an expression tree. Terms free of the increment variable come
    /// first so a cancelled quotient reads `2x + h` rather than `h + 2x`.
    fn to_expr(&self, increment: &str) -> Expr {
        let mut ordered: Vec<(&Monomial, f64)> =
            self.terms.iter().map(|(m, c)| (m, *c)).collect();
        ordered.sort_by(|a, b| {
            let da = a.0.get(increment).copied().unwrap_or(0);
            let db = b.0.get(increment).copied().unwrap_or(0);
            da.cmp(&db).then_with(|| a.0.cmp(b.0))
        });
        let mut acc: Option<Expr> = None;
        for (monomial, coeff) in ordered {
            let term = term_to_expr(monomial, coeff);
            acc = Some(match acc {
                None => term,
                Some(sum) => sum + term,
            });
        }
        acc.unwrap_or(Expr::Const(0.0))
    }
}

fn term_to_expr(monomial: &Monomial, coeff: f64) -> Expr {
    let mut product: Option<Expr> = None;
    for (name, exp) in monomial {
        let base = Expr::Var(name.clone());
        let factor = if *exp == 1 {
            base
        } else {
            Expr::Pow(base.boxed(), Expr::Const(f64::from(*exp)).boxed())
        };
        product = Some(match product {
            None => factor,
            Some(acc) => acc * factor,
        });
    }
    match product {
        None => Expr::Const(coeff),
        Some(product) if coeff == 1.0 => product,
        Some(product) => Expr::Const(coeff) * product,
    }
}

/// Expression → (numerator, denominator) polynomials, or None outside the
/// rational fragment.
fn to_rational(expr: &Expr) -> Option<(Poly, Poly)> {
    match expr {
        Expr::Var(name) => Some((Poly::var(name), Poly::constant(1.0))),
        Expr::Const(value) => Some((Poly::constant(*value), Poly::constant(1.0))),
        Expr::Add(lhs, rhs) => {
            let (an, ad) = to_rational(lhs)?;
            let (bn, bd) = to_rational(rhs)?;
            Some((an.mul(&bd).add(&bn.mul(&ad)), ad.mul(&bd)))
        }
        Expr::Sub(lhs, rhs) => {
            let (an, ad) = to_rational(lhs)?;
            let (bn, bd) = to_rational(rhs)?;
            Some((an.mul(&bd).sub(&bn.mul(&ad)), ad.mul(&bd)))
        }
        Expr::Mul(lhs, rhs) => {
            let (an, ad) = to_rational(lhs)?;
            let (bn, bd) = to_rational(rhs)?;
            Some((an.mul(&bn), ad.mul(&bd)))
        }
        Expr::Div(lhs, rhs) => {
            let (an, ad) = to_rational(lhs)?;
            let (bn, bd) = to_rational(rhs)?;
            if bn.is_zero() {
                return None;
            }
            Some((an.mul(&bd), ad.mul(&bn)))
        }
        Expr::Pow(base, exp) => {
            let Expr::Const(n) = exp.as_ref() else {
                return None;
            };
            if n.fract() != 0.0 || n.abs() > 64.0 {
                return None;
            }
            let (bn, bd) = to_rational(base)?;
            let k = n.abs() as u32;
            if *n >= 0.0 {
                Some((bn.pow(k), bd.pow(k)))
            } else {
                if bn.is_zero() {
                    return None;
                }
                Some((bd.pow(k), bn.pow(k)))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_math;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    #[test]
    fn test_simplify_additive_identities() {
        let expr = var("x") + Expr::Const(0.0);
        assert_eq!(expr.simplify(), var("x"));
        let expr = var("x") - var("x");
        assert_eq!(expr.simplify(), Expr::Const(0.0));
    }

    #[test]
    fn test_simplify_multiplicative_identities() {
        let expr = Expr::Const(1.0) * var("x");
        assert_eq!(expr.simplify(), var("x"));
        let expr = Expr::Const(0.0) * var("x");
        assert_eq!(expr.simplify(), Expr::Const(0.0));
    }

    #[test]
    fn test_simplify_collects_nested_constants() {
        // 2 * (3 * x) -> 6 * x
        let expr = Expr::Const(2.0) * (Expr::Const(3.0) * var("x"));
        assert_eq!(expr.simplify(), Expr::Const(6.0) * var("x"));
        // (x * 2) * 3 -> 6 * x after constant-first normalization
        let expr = (var("x") * Expr::Const(2.0)) * Expr::Const(3.0);
        assert_eq!(expr.simplify(), Expr::Const(6.0) * var("x"));
    }

    #[test]
    fn test_simplify_power_rules() {
        let expr = Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(1.0)));
        assert_eq!(expr.simplify(), var("x"));
        let expr = Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(0.0)));
        assert_eq!(expr.simplify(), Expr::Const(1.0));
    }

    #[test]
    fn test_simplify_special_function_values() {
        assert_eq!(
            Expr::sin(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(0.0)
        );
        assert_eq!(
            Expr::cos(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(1.0)
        );
        assert_eq!(
            Expr::Ln(Box::new(var("e"))).simplify(),
            Expr::Const(1.0)
        );
        assert_eq!(
            Expr::Exp(Box::new(Expr::Const(0.0))).simplify(),
            Expr::Const(1.0)
        );
    }

    #[test]
    fn test_simplify_leaves_zero_division_alone() {
        let expr = Expr::Div(Box::new(Expr::Const(0.0)), Box::new(Expr::Const(0.0)));
        assert_eq!(expr.simplify(), expr);
    }

    #[test]
    fn test_cancel_difference_quotient_of_square() {
        // ((x+h)^2 - x^2) / h -> 2x + h
        let quotient = parse_math("((x+h)^2 - x^2) / h", true).unwrap();
        let cancelled = quotient.cancel("h").unwrap();
        assert_eq!(cancelled, Expr::Const(2.0) * var("x") + var("h"));
    }

    #[test]
    fn test_cancel_difference_quotient_of_cube() {
        // ((x+h)^3 - x^3) / h at h = 0 leaves 3x^2
        let quotient = parse_math("((x+h)^3 - x^3) / h", true).unwrap();
        let cancelled = quotient.cancel("h").unwrap();
        let at_zero = cancelled
            .substitute_variable("h", &Expr::Const(0.0))
            .simplify();
        assert_eq!(
            at_zero,
            Expr::Const(3.0) * Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(2.0)))
        );
    }

    #[test]
    fn test_cancel_rational_function() {
        // (1/(x+h) - 1/x) / h -> -1 / (x^2 + h x)
        let quotient = parse_math("(1/(x+h) - 1/x) / h", true).unwrap();
        let cancelled = quotient.cancel("h").unwrap();
        let at_zero = cancelled
            .substitute_variable("h", &Expr::Const(0.0))
            .simplify();
        assert_eq!(
            at_zero,
            Expr::Div(
                Box::new(Expr::Const(-1.0)),
                Box::new(Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(2.0))))
            )
        );
    }

    #[test]
    fn test_cancel_zero_numerator() {
        let quotient = parse_math("(x - x) / h", true).unwrap();
        assert_eq!(quotient.cancel("h").unwrap(), Expr::Const(0.0));
    }

    #[test]
    fn test_cancel_rejects_transcendental_quotients() {
        let quotient = parse_math("(sin(x+h) - sin(x)) / h", true).unwrap();
        assert!(quotient.cancel("h").is_none());
    }

    #[test]
    fn test_cancel_orders_increment_last() {
        // (2xh + h^2) / h -> 2x + h, with the increment-free term first
        let quotient = parse_math("(2*x*h + h^2) / h", true).unwrap();
        let cancelled = quotient.cancel("h").unwrap();
        assert_eq!(cancelled, Expr::Const(2.0) * var("x") + var("h"));
    }
}
