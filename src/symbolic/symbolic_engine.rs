//! # Symbolic Engine Module
//!
//! The core symbolic expression type for the derivation assistant. Expressions
//! are immutable trees built per request, transformed by substitution,
//! differentiation and simplification, and finally rendered to LaTeX.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! The core symbolic expression type supporting:
//! - **Variables**: `Var(String)` - symbolic variables like "x", "t"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, etc. - mathematical functions
//! - **Unresolved limits**: `Lim` - a residual limit node kept in place when
//!   the limit of an expression cannot be closed
//!
//! ### Key Methods
//! - `substitute_variable()` - replace a variable by an arbitrary expression
//! - `free_symbols()` - sorted free variables, reserved names excluded
//! - `contains_variable()` - dependency test used by the derivative rules
//! - `diff()` / `simplify()` / `cancel()` / `to_latex()` - in sibling modules
//!
//! Reserved names (`pi`, `e`, `oo`) parse as ordinary variables but carry
//! special LaTeX renderings and numeric values, and are never selected as the
//! differentiation variable.

use std::fmt;

use itertools::Itertools;

/// Names that denote constants of the grammar rather than free variables:
/// the circle constant, Euler's number and infinity. Fixed at compile time,
/// read-only for the whole process lifetime.
pub const RESERVED_SYMBOLS: [&str; 3] = ["pi", "e", "oo"];

/// true for names in [`RESERVED_SYMBOLS`].
pub fn is_reserved_symbol(name: &str) -> bool {
    RESERVED_SYMBOLS.contains(&name)
}

/// Core symbolic expression enum representing mathematical expressions as an
/// abstract syntax tree. Uses Box<Expr> for recursive structures, allowing
/// arbitrarily deep expression trees.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "t", or the increment "h")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    /// Arcsine function: arcsin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: arccos(x)
    arccos(Box<Expr>),
    /// Arctangent function - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
    /// Residual limit of an expression as a variable approaches a value.
    /// Produced by limit evaluation when the limit does not resolve; its
    /// presence in a result is the "unresolved" criterion of the derivation
    /// builder.
    Lim(Box<Expr>, String, Box<Expr>),
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Converts expressions to human-readable mathematical notation with
/// parentheses for proper precedence.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::ctg(expr) => write!(f, "ctg({})", expr),
            Expr::arcsin(expr) => write!(f, "arcsin({})", expr),
            Expr::arccos(expr) => write!(f, "arccos({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
            Expr::arcctg(expr) => write!(f, "arcctg({})", expr),
            Expr::Lim(expr, var, to) => write!(f, "lim({}, {} -> {})", expr, var, to),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Argument of a one-argument function node, None for everything else.
    fn unary_arg(&self) -> Option<&Expr> {
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
            | Expr::arcctg(e) => Some(e),
            _ => None,
        }
    }

    /// Rebuilds the same one-argument function node around a new argument.
    /// Only meaningful when `unary_arg` returned Some for `self`.
    pub(crate) fn rebuild_unary(&self, inner: Expr) -> Expr {
        match self {
            Expr::Exp(_) => Expr::Exp(inner.boxed()),
            Expr::Ln(_) => Expr::Ln(inner.boxed()),
            Expr::sin(_) => Expr::sin(inner.boxed()),
            Expr::cos(_) => Expr::cos(inner.boxed()),
            Expr::tg(_) => Expr::tg(inner.boxed()),
            Expr::ctg(_) => Expr::ctg(inner.boxed()),
            Expr::arcsin(_) => Expr::arcsin(inner.boxed()),
            Expr::arccos(_) => Expr::arccos(inner.boxed()),
            Expr::arctg(_) => Expr::arctg(inner.boxed()),
            Expr::arcctg(_) => Expr::arcctg(inner.boxed()),
            other => other.clone(),
        }
    }

    /// Substitutes a variable with an arbitrary expression throughout the
    /// tree. The bound variable of a residual limit shadows the outer name.
    pub fn substitute_variable(&self, var: &str, replacement: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => replacement.clone(),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.substitute_variable(var, replacement)),
                Box::new(rhs.substitute_variable(var, replacement)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.substitute_variable(var, replacement)),
                Box::new(rhs.substitute_variable(var, replacement)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.substitute_variable(var, replacement)),
                Box::new(rhs.substitute_variable(var, replacement)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.substitute_variable(var, replacement)),
                Box::new(rhs.substitute_variable(var, replacement)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.substitute_variable(var, replacement)),
                Box::new(exp.substitute_variable(var, replacement)),
            ),
            Expr::Lim(inner, bound, to) => {
                if bound == var {
                    self.clone()
                } else {
                    Expr::Lim(
                        Box::new(inner.substitute_variable(var, replacement)),
                        bound.clone(),
                        Box::new(to.substitute_variable(var, replacement)),
                    )
                }
            }
            other => {
                // one-argument function nodes
                match other.unary_arg() {
                    Some(arg) => other.rebuild_unary(arg.substitute_variable(var, replacement)),
                    None => other.clone(),
                }
            }
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.contains_variable(var_name) || right.contains_variable(var_name)
            }
            Expr::Lim(inner, bound, to) => {
                (bound != var_name && inner.contains_variable(var_name))
                    || to.contains_variable(var_name)
            }
            other => match other.unary_arg() {
                Some(arg) => arg.contains_variable(var_name),
                None => false,
            },
        }
    }

    /// All free variable names in alphabetical order, deduplicated, with the
    /// reserved constant names filtered out. The first entry is the variable
    /// the selector infers when the caller supplied none.
    pub fn free_symbols(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_symbols(&mut names);
        names
            .into_iter()
            .filter(|name| !is_reserved_symbol(name))
            .sorted()
            .dedup()
            .collect()
    }

    fn collect_symbols(&self, names: &mut Vec<String>) {
        match self {
            Expr::Var(name) => names.push(name.clone()),
            Expr::Const(_) => {}
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.collect_symbols(names);
                right.collect_symbols(names);
            }
            Expr::Lim(inner, bound, to) => {
                let mut inner_names = Vec::new();
                inner.collect_symbols(&mut inner_names);
                names.extend(inner_names.into_iter().filter(|name| name != bound));
                to.collect_symbols(names);
            }
            other => {
                if let Some(arg) = other.unary_arg() {
                    arg.collect_symbols(names);
                }
            }
        }
    }

    /// true when the tree still carries a residual limit node anywhere.
    pub fn has_limit(&self) -> bool {
        match self {
            Expr::Var(_) | Expr::Const(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => left.has_limit() || right.has_limit(),
            Expr::Lim(_, _, _) => true,
            other => match other.unary_arg() {
                Some(arg) => arg.has_limit(),
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_variable_with_expression() {
        // x^2 with x -> x + h
        let expr = Expr::Pow(
            Box::new(Expr::Var("x".to_string())),
            Box::new(Expr::Const(2.0)),
        );
        let shifted = Expr::Var("x".to_string()) + Expr::Var("h".to_string());
        let result = expr.substitute_variable("x", &shifted);
        assert_eq!(
            result,
            Expr::Pow(
                Box::new(Expr::Add(
                    Box::new(Expr::Var("x".to_string())),
                    Box::new(Expr::Var("h".to_string()))
                )),
                Box::new(Expr::Const(2.0))
            )
        );
    }

    #[test]
    fn test_substitute_inside_function() {
        let expr = Expr::sin(Box::new(Expr::Var("x".to_string())));
        let result = expr.substitute_variable("x", &Expr::Const(0.0));
        assert_eq!(result, Expr::sin(Box::new(Expr::Const(0.0))));
    }

    #[test]
    fn test_free_symbols_sorted_and_deduplicated() {
        // y*x + x
        let expr = Expr::Var("y".to_string()) * Expr::Var("x".to_string())
            + Expr::Var("x".to_string());
        assert_eq!(expr.free_symbols(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_free_symbols_exclude_reserved_names() {
        // pi * t + e
        let expr = Expr::Var("pi".to_string()) * Expr::Var("t".to_string())
            + Expr::Var("e".to_string());
        assert_eq!(expr.free_symbols(), vec!["t".to_string()]);
    }

    #[test]
    fn test_free_symbols_empty_for_constant_expression() {
        let expr = Expr::Const(5.0) + Expr::Var("pi".to_string());
        assert!(expr.free_symbols().is_empty());
    }

    #[test]
    fn test_has_limit_detects_residual_node() {
        let residual = Expr::Lim(
            Box::new(Expr::Var("h".to_string())),
            "h".to_string(),
            Box::new(Expr::Const(0.0)),
        );
        let wrapped = Expr::Const(1.0) + residual.clone();
        assert!(residual.has_limit());
        assert!(wrapped.has_limit());
        assert!(!Expr::Var("x".to_string()).has_limit());
    }

    #[test]
    fn test_limit_bound_variable_is_shadowed() {
        let residual = Expr::Lim(
            Box::new(Expr::Var("h".to_string()) + Expr::Var("x".to_string())),
            "h".to_string(),
            Box::new(Expr::Const(0.0)),
        );
        // the bound h is not free, x is
        assert_eq!(residual.free_symbols(), vec!["x".to_string()]);
        // substituting h leaves the bound occurrence alone
        assert_eq!(residual.substitute_variable("h", &Expr::Const(3.0)), residual);
    }
}
