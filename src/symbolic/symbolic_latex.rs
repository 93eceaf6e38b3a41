//! # LaTeX Rendering Module
//!
//! Turns an [`Expr`] into LaTeX for MathJax, with optional per-symbol name
//! overrides: the derivation builder renders the internal increment variable
//! `h` as `\Delta x` this way. Rendering conventions:
//!
//! - fractions as `\frac{..}{..}`, powers with braced exponents
//! - `\sqrt{..}` for the 1/2 power, `e^{..}` for the exponential node
//! - reserved names `pi` and `oo` as `\pi` and `\infty`
//! - names with an underscore as subscripts (`x_0` -> `x_{0}`)
//! - a product of a negative constant on the right of a sum renders as
//!   subtraction, and `-1` coefficients as a bare sign
//!
//! The module also hosts the increment-disambiguation post-processor: two
//! independent string-level passes over the rendered formula that wrap the
//! increment symbol in parentheses where MathJax output would otherwise read
//! ambiguously. Both passes are idempotent and deliberately live outside the
//! renderer so they can be tested on raw strings.

use std::collections::HashMap;

use regex::Regex;

use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// Renders the expression with default symbol names.
    pub fn to_latex(&self) -> String {
        self.to_latex_with(&HashMap::new())
    }

    /// Renders the expression, drawing symbol spellings from `symbol_names`
    /// where present.
    pub fn to_latex_with(&self, symbol_names: &HashMap<String, String>) -> String {
        latex_of(self, symbol_names)
    }
}

fn latex_of(expr: &Expr, names: &HashMap<String, String>) -> String {
    match expr {
        Expr::Var(name) => symbol_latex(name, names),
        Expr::Const(value) => const_latex(*value),
        Expr::Add(lhs, rhs) => {
            let left = latex_of(lhs, names);
            match negated_term(rhs) {
                Some(positive) => format!("{} - {}", left, latex_of(&positive, names)),
                None => format!("{} + {}", left, latex_of(rhs, names)),
            }
        }
        Expr::Sub(lhs, rhs) => {
            let left = latex_of(lhs, names);
            let right = match rhs.as_ref() {
                Expr::Add(_, _) | Expr::Sub(_, _) => {
                    format!("\\left({}\\right)", latex_of(rhs, names))
                }
                _ => latex_of(rhs, names),
            };
            format!("{} - {}", left, right)
        }
        Expr::Mul(lhs, rhs) => {
            if let Expr::Const(c) = lhs.as_ref() {
                if *c == -1.0 {
                    return format!("-{}", mul_operand(rhs, names));
                }
            }
            format!("{} {}", mul_operand(lhs, names), mul_operand(rhs, names))
        }
        Expr::Div(num, den) => format!(
            "\\frac{{{}}}{{{}}}",
            latex_of(num, names),
            latex_of(den, names)
        ),
        Expr::Pow(base, exp) => {
            if matches!(exp.as_ref(), Expr::Const(e) if *e == 0.5) {
                return format!("\\sqrt{{{}}}", latex_of(base, names));
            }
            let base_needs_parens = matches!(
                base.as_ref(),
                Expr::Add(_, _)
                    | Expr::Sub(_, _)
                    | Expr::Mul(_, _)
                    | Expr::Div(_, _)
                    | Expr::Pow(_, _)
                    | Expr::Lim(_, _, _)
            ) || matches!(base.as_ref(), Expr::Const(c) if *c < 0.0);
            let base_str = if base_needs_parens {
                format!("\\left({}\\right)", latex_of(base, names))
            } else {
                latex_of(base, names)
            };
            format!("{}^{{{}}}", base_str, latex_of(exp, names))
        }
        Expr::Exp(inner) => format!("e^{{{}}}", latex_of(inner, names)),
        Expr::Ln(inner) => format!("\\ln\\left({}\\right)", latex_of(inner, names)),
        Expr::sin(inner) => format!("\\sin\\left({}\\right)", latex_of(inner, names)),
        Expr::cos(inner) => format!("\\cos\\left({}\\right)", latex_of(inner, names)),
        Expr::tg(inner) => format!("\\tan\\left({}\\right)", latex_of(inner, names)),
        Expr::ctg(inner) => format!("\\cot\\left({}\\right)", latex_of(inner, names)),
        Expr::arcsin(inner) => format!("\\arcsin\\left({}\\right)", latex_of(inner, names)),
        Expr::arccos(inner) => format!("\\arccos\\left({}\\right)", latex_of(inner, names)),
        Expr::arctg(inner) => format!("\\arctan\\left({}\\right)", latex_of(inner, names)),
        Expr::arcctg(inner) => format!(
            "\\operatorname{{arccot}}\\left({}\\right)",
            latex_of(inner, names)
        ),
        Expr::Lim(inner, var, to) => format!(
            "\\lim_{{{} \\to {}}} {}",
            symbol_latex(var, names),
            latex_of(to, names),
            latex_of(inner, names)
        ),
    }
}

fn symbol_latex(name: &str, names: &HashMap<String, String>) -> String {
    if let Some(spelled) = names.get(name) {
        return spelled.clone();
    }
    match name {
        "pi" => "\\pi".to_string(),
        "oo" => "\\infty".to_string(),
        _ => match name.split_once('_') {
            Some((base, subscript)) => format!("{}_{{{}}}", base, subscript),
            None => name.to_string(),
        },
    }
}

fn const_latex(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// A multiplication operand keeps sums parenthesized.
fn mul_operand(expr: &Expr, names: &HashMap<String, String>) -> String {
    match expr {
        Expr::Add(_, _) | Expr::Sub(_, _) => format!("\\left({}\\right)", latex_of(expr, names)),
        _ => latex_of(expr, names),
    }
}

/// The positive counterpart of a term that renders with a leading sign, used
/// by the Add arm to print `a - b` instead of `a + -b`.
fn negated_term(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Const(c) if *c < 0.0 => Some(Expr::Const(-c)),
        Expr::Mul(lhs, rhs) => match lhs.as_ref() {
            Expr::Const(c) if *c == -1.0 => Some((**rhs).clone()),
            Expr::Const(c) if *c < 0.0 => {
                Some(Expr::Mul(Box::new(Expr::Const(-c)), rhs.clone()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Wraps the increment symbol in parentheses wherever the rendered formula
/// would otherwise read ambiguously. Two passes, applied in order:
///
/// 1. `(\Delta v)^n` instead of `\Delta v^n`
/// 2. `(\Delta v) v` or `(\Delta v) v^n` instead of `\Delta v v` etc.,
///    skipping occurrences that are already parenthesized
///
/// Reapplying the transformation to its own output is a no-op.
pub fn disambiguate_delta_terms(
    latex_text: &str,
    delta_latex: &str,
    variable_latex: &str,
) -> String {
    // Case 1: an exponent follows the increment symbol directly
    let exponent_marker = format!("{}^{{", delta_latex);
    let wrapped_exponent = format!("\\left({}\\right)^{{", delta_latex);
    let formatted = latex_text.replace(&exponent_marker, &wrapped_exponent);

    // Case 2: the increment symbol sits immediately before the variable
    let suffix = Regex::new(&format!(
        r"^\s+{}(\^\{{[^}}]*\}})?",
        regex::escape(variable_latex)
    ))
    .unwrap();
    let already_parenthesized = "\\left(";
    let wrapped = format!("\\left({}\\right)", delta_latex);

    let mut result = String::with_capacity(formatted.len());
    let mut position = 0;
    while let Some(offset) = formatted[position..].find(delta_latex) {
        let start = position + offset;
        let end = start + delta_latex.len();
        result.push_str(&formatted[position..start]);
        let preceded = formatted[..start].ends_with(already_parenthesized);
        let followed = suffix.is_match(&formatted[end..]);
        if !preceded && followed {
            result.push_str(&wrapped);
        } else {
            result.push_str(&formatted[start..end]);
        }
        position = end;
    }
    result.push_str(&formatted[position..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_math;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    #[test]
    fn test_latex_basic_forms() {
        assert_eq!(var("x").to_latex(), "x");
        assert_eq!(Expr::Const(3.0).to_latex(), "3");
        assert_eq!(Expr::Const(0.5).to_latex(), "0.5");
        assert_eq!((var("x") + Expr::Const(1.0)).to_latex(), "x + 1");
        assert_eq!(
            (var("x") / var("y")).to_latex(),
            "\\frac{x}{y}"
        );
    }

    #[test]
    fn test_latex_products_use_spaces() {
        let expr = Expr::Const(2.0) * var("x");
        assert_eq!(expr.to_latex(), "2 x");
    }

    #[test]
    fn test_latex_negative_coefficient_renders_as_subtraction() {
        // x + (-2)*y -> x - 2 y
        let expr = var("x") + Expr::Const(-2.0) * var("y");
        assert_eq!(expr.to_latex(), "x - 2 y");
        // x + (-1)*y -> x - y
        let expr = var("x") + Expr::Const(-1.0) * var("y");
        assert_eq!(expr.to_latex(), "x - y");
    }

    #[test]
    fn test_latex_power_parenthesizes_composite_base() {
        let expr = Expr::Pow(
            Box::new(var("x") + var("h")),
            Box::new(Expr::Const(2.0)),
        );
        assert_eq!(expr.to_latex(), "\\left(x + h\\right)^{2}");
        let expr = Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(2.0)));
        assert_eq!(expr.to_latex(), "x^{2}");
    }

    #[test]
    fn test_latex_sqrt_and_exp() {
        assert_eq!(
            parse_math("sqrt(x)", false).unwrap().to_latex(),
            "\\sqrt{x}"
        );
        assert_eq!(
            parse_math("exp(x)", false).unwrap().to_latex(),
            "e^{x}"
        );
    }

    #[test]
    fn test_latex_reserved_symbols() {
        assert_eq!(var("pi").to_latex(), "\\pi");
        assert_eq!(var("oo").to_latex(), "\\infty");
        assert_eq!(var("e").to_latex(), "e");
    }

    #[test]
    fn test_latex_subscripted_name() {
        assert_eq!(var("x_0").to_latex(), "x_{0}");
    }

    #[test]
    fn test_latex_symbol_override() {
        let mut names = HashMap::new();
        names.insert("h".to_string(), "\\Delta x".to_string());
        let expr = Expr::Const(2.0) * var("x") + var("h");
        assert_eq!(expr.to_latex_with(&names), "2 x + \\Delta x");
    }

    #[test]
    fn test_latex_residual_limit() {
        let mut names = HashMap::new();
        names.insert("h".to_string(), "\\Delta x".to_string());
        let residual = Expr::Lim(
            Box::new(var("h") + Expr::Const(2.0)),
            "h".to_string(),
            Box::new(Expr::Const(0.0)),
        );
        assert_eq!(
            residual.to_latex_with(&names),
            "\\lim_{\\Delta x \\to 0} \\Delta x + 2"
        );
    }

    #[test]
    fn test_disambiguate_exponent_case() {
        let out = disambiguate_delta_terms("\\Delta x^{2}", "\\Delta x", "x");
        assert_eq!(out, "\\left(\\Delta x\\right)^{2}");
    }

    #[test]
    fn test_disambiguate_adjacent_variable_case() {
        let out = disambiguate_delta_terms("2 \\Delta x x", "\\Delta x", "x");
        assert_eq!(out, "2 \\left(\\Delta x\\right) x");
        let out = disambiguate_delta_terms("\\Delta x x^{2}", "\\Delta x", "x");
        assert_eq!(out, "\\left(\\Delta x\\right) x^{2}");
    }

    #[test]
    fn test_disambiguate_leaves_unambiguous_text_alone() {
        let text = "2 x + \\Delta x";
        assert_eq!(disambiguate_delta_terms(text, "\\Delta x", "x"), text);
    }

    #[test]
    fn test_disambiguate_is_idempotent() {
        let once = disambiguate_delta_terms("\\Delta x^{2} + \\Delta x x", "\\Delta x", "x");
        let twice = disambiguate_delta_terms(&once, "\\Delta x", "x");
        assert_eq!(once, twice);
        assert_eq!(
            once,
            "\\left(\\Delta x\\right)^{2} + \\left(\\Delta x\\right) x"
        );
    }
}
