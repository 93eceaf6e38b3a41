#![allow(non_camel_case_types)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use DerivadaWeb::symbolic::parse_expr::parse_math;
/// let input = "x^2 + 5*x + 6";
/// let parsed_expression = parse_math(input, true).unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the symbolic expression tree with its substitution and
///    free-symbol machinery
/// 2) differentiates expressions analytically
/// 3) simplifies, cancels and takes the limit of difference quotients
/// 4) renders expressions as LaTeX for the page
///# Example#
/// ```
/// use DerivadaWeb::symbolic::parse_expr::parse_math;
/// let f = parse_math("x^2", true).unwrap();
/// // differentiate with respect to x
/// let df_dx = f.diff("x").simplify();
/// println!("df_dx = {}", df_dx);
/// // render for MathJax
/// println!("latex: {}", df_dx.to_latex());
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
///________________________________________________________________________________________________________________________________________________
/// algebraic simplification and the rational cancellation used on
/// difference quotients
pub mod symbolic_simplify;
///________________________________________________________________________________________________________________________________________________
/// limit evaluation with the residual-limit marker
pub mod symbolic_limits;
///________________________________________________________________________________________________________________________________________________
/// LaTeX rendering and the increment-symbol disambiguation passes
pub mod symbolic_latex;
