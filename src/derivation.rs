//! # Derivation Builder Module
//!
//! The narrative core of the service: given a parsed function, a
//! differentiation variable and an optional evaluation point, builds the
//! ordered list of steps that walk from the definition of the derivative to
//! the evaluated limit, exactly the way the page presents them.
//!
//! Two computations run side by side:
//!
//! - the *general* difference quotient in the variable itself, whose limit
//!   (or, when that limit does not resolve, the direct analytic derivative)
//!   becomes the derivative function reported back;
//! - the *anchored* difference quotient at the supplied point (or at the
//!   variable when no point was given), which produces the step-by-step
//!   narrative and, with a point, the derivative value at that point.
//!
//! An unresolved limit is never a failure here: the residual limit node
//! simply appears in the rendered step, and the closed-form answers fall
//! back to direct differentiation.

use std::collections::HashMap;

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::error::{DeriveError, DeriveResult};
use crate::symbolic::parse_expr::parse_math;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_latex::disambiguate_delta_terms;
use crate::symbolic::symbolic_limits::limit;

/// Internal name of the increment variable of the difference quotient; it is
/// rendered as `\Delta <variable>` everywhere the user sees it.
pub const DELTA: &str = "h";

/// One rendered derivation step.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub title: String,
    pub latex: String,
}

/// Everything the endpoint needs from a finished derivation.
#[derive(Debug)]
pub struct Derivation {
    pub steps: Vec<Step>,
    pub derivative_function: Expr,
    pub derivative_at_point_latex: Option<String>,
    pub point_latex: Option<String>,
    pub point_symbol_latex: Option<String>,
}

/// Validates the user-supplied variable, or infers one from the expression:
/// the alphabetically first free symbol, with `x` as the placeholder for
/// expressions without free symbols. The flag reports whether the variable
/// was inferred.
pub fn choose_variable(expr: &Expr, raw_variable: Option<&str>) -> DeriveResult<(String, bool)> {
    let variable_text = raw_variable.unwrap_or("").trim();
    if !variable_text.is_empty() {
        let valid_symbol = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
        if !valid_symbol.is_match(variable_text) {
            return Err(DeriveError::Validation(
                "La variable independiente debe ser un símbolo válido, por ejemplo x o t."
                    .to_string(),
            ));
        }
        return Ok((variable_text.to_string(), false));
    }

    let symbols = expr.free_symbols();
    match symbols.into_iter().next() {
        Some(name) => Ok((name, true)),
        None => Ok(("x".to_string(), true)),
    }
}

fn delta_increment_latex(variable: &str) -> String {
    format!("\\Delta {}", Expr::Var(variable.to_string()).to_latex())
}

fn point_symbol(variable: &str) -> String {
    format!("{}_0", variable)
}

/// Factor-and-cancel when the quotient is rational in the increment, plain
/// identity simplification otherwise (the quotient then keeps its shape and
/// the limit stays unresolved).
fn simplify_quotient(quotient: &Expr) -> Expr {
    quotient
        .cancel(DELTA)
        .unwrap_or_else(|| quotient.simplify())
}

/// Builds the full step list plus the closed-form answers.
pub fn build_derivation(
    expr: &Expr,
    variable: &str,
    raw_point: Option<&str>,
) -> DeriveResult<Derivation> {
    let point_text = raw_point.unwrap_or("").trim();
    let point_expr = if point_text.is_empty() {
        None
    } else {
        Some(
            parse_math(point_text, true)
                .map_err(DeriveError::Computation)?
                .simplify(),
        )
    };

    let variable_expr = Expr::Var(variable.to_string());
    let delta = Expr::Var(DELTA.to_string());

    // general difference quotient and the derivative function
    let expr_general_plus_delta = expr
        .substitute_variable(variable, &(variable_expr.clone() + delta.clone()))
        .simplify();
    let quotient_general = (expr_general_plus_delta - expr.clone()) / delta.clone();
    let quotient_general_simplified = simplify_quotient(&quotient_general);
    let limit_general = limit(&quotient_general_simplified, DELTA, &Expr::Const(0.0)).simplify();

    let derivative_by_diff = expr.diff(variable).simplify();
    let derivative_function = if limit_general.has_limit() {
        debug!("general limit unresolved, falling back to the direct derivative");
        derivative_by_diff.clone()
    } else {
        limit_general
    };

    // anchored difference quotient: the narrative runs at the point when one
    // was supplied, at the variable itself otherwise
    let point_sym = point_symbol(variable);
    let display_anchor = if point_expr.is_some() {
        Expr::Var(point_sym.clone())
    } else {
        variable_expr.clone()
    };
    let calc_anchor = point_expr.clone().unwrap_or_else(|| variable_expr.clone());

    let expr_anchor = expr.substitute_variable(variable, &calc_anchor).simplify();
    let expr_anchor_plus_delta = expr
        .substitute_variable(variable, &(calc_anchor.clone() + delta.clone()))
        .simplify();
    let quotient_raw = (expr_anchor_plus_delta.clone() - expr_anchor.clone()) / delta;
    let quotient_simplified = simplify_quotient(&quotient_raw);
    let limit_result = limit(&quotient_simplified, DELTA, &Expr::Const(0.0)).simplify();

    let delta_latex = delta_increment_latex(variable);
    let mut symbol_names = HashMap::new();
    symbol_names.insert(DELTA.to_string(), delta_latex.clone());

    let display_anchor_latex = display_anchor.to_latex();
    let calc_anchor_latex = calc_anchor.to_latex();
    let variable_latex = variable_expr.to_latex();

    let evaluated_minuend_latex = disambiguate_delta_terms(
        &expr_anchor_plus_delta.to_latex_with(&symbol_names),
        &delta_latex,
        &variable_latex,
    );
    let evaluated_subtrahend_latex = disambiguate_delta_terms(
        &expr_anchor.to_latex_with(&symbol_names),
        &delta_latex,
        &variable_latex,
    );
    let quotient_simplified_latex = disambiguate_delta_terms(
        &quotient_simplified.to_latex_with(&symbol_names),
        &delta_latex,
        &variable_latex,
    );
    let limit_result_latex = disambiguate_delta_terms(
        &limit_result.to_latex_with(&symbol_names),
        &delta_latex,
        &variable_latex,
    );

    let mut steps = vec![Step {
        title: "Definición de la derivada".to_string(),
        latex: format!(
            "f'({a}) = \\lim_{{{d} \\to 0}}\\frac{{\\Delta f}}{{{d}}} = \\lim_{{{d} \\to 0}} \\frac{{\\textcolor{{red}}{{f({a}+{d})}}\\textcolor{{black}}{{-}}\\textcolor{{blue}}{{f({a})}}}}{{{d}}}",
            a = display_anchor_latex,
            d = delta_latex,
        ),
    }];

    if point_expr.is_some() {
        steps.push(Step {
            title: "Sustitución en el cociente de incrementos".to_string(),
            latex: format!(
                "f'({a}) = \\lim_{{{d} \\to 0}}\\frac{{\\Delta f}}{{{d}}} = \\lim_{{{d} \\to 0}}\\frac{{\\textcolor{{red}}{{f({a}+{d})}}\\textcolor{{black}}{{-}}\\textcolor{{blue}}{{f({a})}}}}{{{d}}}",
                a = calc_anchor_latex,
                d = delta_latex,
            ),
        });
    }

    let quotient_evaluated_unsimplified_latex = format!(
        "\\frac{{\\left.\\color{{red}}{{{minuend}}}\\right.-\\left(\\color{{blue}}{{{subtrahend}}}\\right)}}{{{d}}}",
        minuend = evaluated_minuend_latex,
        subtrahend = evaluated_subtrahend_latex,
        d = delta_latex,
    );
    steps.push(Step {
        title: "Simplificación del cociente de incrementos".to_string(),
        latex: format!(
            "\\frac{{\\Delta f}}{{ {d} }} = {unsimplified} = {simplified}",
            d = delta_latex,
            unsimplified = quotient_evaluated_unsimplified_latex,
            simplified = quotient_simplified_latex,
        ),
    });
    steps.push(Step {
        title: "Aplicación del límite".to_string(),
        latex: format!(
            "f'({a}) = \\lim_{{{d} \\to 0}} \\left[{simplified}\\right] = {result}",
            a = calc_anchor_latex,
            d = delta_latex,
            simplified = quotient_simplified_latex,
            result = limit_result_latex,
        ),
    });

    if point_expr.is_none() {
        steps.push(Step {
            title: "Función derivada".to_string(),
            latex: format!(
                "f'({}) = {}",
                variable_latex,
                derivative_function.to_latex()
            ),
        });
    }

    let (derivative_at_point_latex, point_latex, point_symbol_latex) = match &point_expr {
        Some(point) => {
            let mut derivative_at_point = limit_result.clone();
            if derivative_at_point.has_limit() {
                derivative_at_point = derivative_by_diff
                    .substitute_variable(variable, point)
                    .simplify();
            }
            (
                Some(derivative_at_point.to_latex()),
                Some(point.to_latex()),
                Some(Expr::Var(point_sym).to_latex()),
            )
        }
        None => (None, None, None),
    };

    Ok(Derivation {
        steps,
        derivative_function,
        derivative_at_point_latex,
        point_latex,
        point_symbol_latex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    fn parsed(input: &str) -> Expr {
        parse_math(input, true).unwrap().simplify()
    }

    fn titles(derivation: &Derivation) -> Vec<&str> {
        derivation.steps.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_choose_variable_accepts_identifier() {
        let expr = parsed("x^2");
        let (variable, inferred) = choose_variable(&expr, Some("t")).unwrap();
        assert_eq!(variable, "t");
        assert!(!inferred);
    }

    #[test]
    fn test_choose_variable_rejects_bad_identifier() {
        let expr = parsed("x^2");
        assert!(choose_variable(&expr, Some("2x")).is_err());
        assert!(choose_variable(&expr, Some("x y")).is_err());
    }

    #[test]
    fn test_choose_variable_infers_alphabetically_first() {
        let expr = parsed("x*y + a");
        let (variable, inferred) = choose_variable(&expr, None).unwrap();
        assert_eq!(variable, "a");
        assert!(inferred);
    }

    #[test]
    fn test_choose_variable_placeholder_for_constant_expression() {
        let expr = parsed("3 + pi");
        let (variable, inferred) = choose_variable(&expr, Some("  ")).unwrap();
        assert_eq!(variable, "x");
        assert!(inferred);
    }

    #[test]
    fn test_square_without_point() {
        let expr = parsed("x^2");
        let derivation = build_derivation(&expr, "x", None).unwrap();

        assert_eq!(
            derivation.derivative_function,
            Expr::Const(2.0) * var("x")
        );
        assert_eq!(
            titles(&derivation),
            vec![
                "Definición de la derivada",
                "Simplificación del cociente de incrementos",
                "Aplicación del límite",
                "Función derivada",
            ]
        );
        assert!(derivation.derivative_at_point_latex.is_none());
        assert!(derivation.point_latex.is_none());
        assert!(derivation.point_symbol_latex.is_none());
    }

    #[test]
    fn test_square_with_point() {
        let expr = parsed("x^2");
        let derivation = build_derivation(&expr, "x", Some("1")).unwrap();

        assert_eq!(
            titles(&derivation),
            vec![
                "Definición de la derivada",
                "Sustitución en el cociente de incrementos",
                "Simplificación del cociente de incrementos",
                "Aplicación del límite",
            ]
        );
        assert_eq!(derivation.derivative_at_point_latex.as_deref(), Some("2"));
        assert_eq!(derivation.point_latex.as_deref(), Some("1"));
        assert_eq!(derivation.point_symbol_latex.as_deref(), Some("x_{0}"));
    }

    #[test]
    fn test_sine_alias_falls_back_to_direct_derivative() {
        let expr = parsed("sen(x)");
        let derivation = build_derivation(&expr, "x", None).unwrap();
        assert_eq!(
            derivation.derivative_function,
            Expr::cos(Box::new(var("x")))
        );
        // the limit step keeps the residual limit in view
        let limit_step = &derivation.steps[2];
        assert_eq!(limit_step.title, "Aplicación del límite");
        assert!(limit_step.latex.contains("\\lim"));
    }

    #[test]
    fn test_rational_function_resolves_through_the_definition() {
        let expr = parsed("1/x");
        let derivation = build_derivation(&expr, "x", None).unwrap();
        assert_eq!(
            derivation.derivative_function,
            Expr::Div(
                Box::new(Expr::Const(-1.0)),
                Box::new(Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(2.0))))
            )
        );
    }

    #[test]
    fn test_simplification_step_shows_both_quotient_forms() {
        let expr = parsed("x^2");
        let derivation = build_derivation(&expr, "x", None).unwrap();
        let simplification = &derivation.steps[1];
        assert_eq!(
            simplification.title,
            "Simplificación del cociente de incrementos"
        );
        // (x + Δx)^2 in the minuend, and the cancelled quotient 2x + Δx
        assert!(simplification
            .latex
            .contains("\\left(x + \\Delta x\\right)^{2}"));
        assert!(simplification.latex.contains("2 x + \\Delta x"));
    }

    #[test]
    fn test_cube_quotient_disambiguates_increment_terms() {
        // the cancelled quotient of x^3 is 3x^2 + 3hx + h^2; both rendered
        // increment ambiguities get parenthesized
        let expr = parsed("x^3");
        let derivation = build_derivation(&expr, "x", None).unwrap();
        let simplification = &derivation.steps[1];
        assert!(
            simplification
                .latex
                .contains("3 \\left(\\Delta x\\right) x + \\left(\\Delta x\\right)^{2}")
        );
        assert_eq!(
            derivation.derivative_function,
            Expr::Const(3.0)
                * Expr::Pow(Box::new(var("x")), Box::new(Expr::Const(2.0)))
        );
    }

    #[test]
    fn test_point_derivation_of_sine_uses_direct_substitution() {
        // the anchored limit of sine does not resolve, so the value at the
        // point comes from substituting into cos
        let expr = parsed("sen(x)");
        let derivation = build_derivation(&expr, "x", Some("0")).unwrap();
        assert_eq!(derivation.derivative_at_point_latex.as_deref(), Some("1"));
    }

    #[test]
    fn test_invalid_point_propagates_parse_error() {
        let expr = parsed("x^2");
        let result = build_derivation(&expr, "x", Some("1 +"));
        assert!(result.is_err());
    }
}
