//! a module turns a String expression into a symbolic expression
//!
//! The grammar is the one documented on the input form: `+ - * / ^` with the
//! usual precedences, implicit multiplication (`2x`, `x y`, `2(x+1)`),
//! parentheses, decimal literals, and a fixed alias table for names:
//! `pi`, `e`/`E`, `oo`, `sen` for sine, `ln`/`log` for the natural logarithm,
//! `log10` for the decimal logarithm, `sqrt` as the 1/2 power, and the
//! tan/tg, cot/ctg, asin/arcsin, acos/arccos, atan/arctan/arctg, acot/arcctg
//! synonym pairs. `e^x` builds the exponential node directly.
//!
//! # Example
//! ```
//! use DerivadaWeb::symbolic::parse_expr::parse_math;
//! let parsed = parse_math("x^2 + 5*x + 6", true).unwrap();
//! println!("parsed expression {}", parsed);
//! ```
//!
//! Scientific-notation literals are not recognized: under implicit
//! multiplication `2e3` already means `2 * e * 3`.

use std::f64::consts::LN_10;

use crate::symbolic::symbolic_engine::{Expr, is_reserved_symbol};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                // ** is accepted as a synonym of ^
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                let mut dots = 0;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        dots += 1;
                    }
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if dots > 1 {
                    return Err(format!("invalid number literal '{}'", literal));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number literal '{}'", literal))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(name));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

/// The fixed function-name table of the grammar.
fn is_function_name(name: &str) -> bool {
    matches!(
        name,
        "exp"
            | "sqrt"
            | "ln"
            | "log"
            | "log10"
            | "sin"
            | "sen"
            | "cos"
            | "tan"
            | "tg"
            | "cot"
            | "ctg"
            | "asin"
            | "arcsin"
            | "acos"
            | "arccos"
            | "atan"
            | "arctan"
            | "arctg"
            | "acot"
            | "arcctg"
    )
}

fn apply_function(name: &str, arg: Expr) -> Expr {
    match name {
        "exp" => Expr::Exp(arg.boxed()),
        "sqrt" => Expr::Pow(arg.boxed(), Expr::Const(0.5).boxed()),
        "ln" | "log" => Expr::Ln(arg.boxed()),
        "log10" => Expr::Div(Expr::Ln(arg.boxed()).boxed(), Expr::Const(LN_10).boxed()),
        "sin" | "sen" => Expr::sin(arg.boxed()),
        "cos" => Expr::cos(arg.boxed()),
        "tan" | "tg" => Expr::tg(arg.boxed()),
        "cot" | "ctg" => Expr::ctg(arg.boxed()),
        "asin" | "arcsin" => Expr::arcsin(arg.boxed()),
        "acos" | "arccos" => Expr::arccos(arg.boxed()),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg.boxed()),
        "acot" | "arcctg" => Expr::arcctg(arg.boxed()),
        // guarded by is_function_name
        other => Expr::Var(other.to_string()),
    }
}

/// Bare identifiers: `E` is normalized onto the reserved `e`; everything
/// else, reserved names included, stays a named variable.
fn resolve_symbol(name: String) -> Expr {
    if name == "E" {
        Expr::Var("e".to_string())
    } else {
        Expr::Var(name)
    }
}

/// `e^a` is the exponential node, anything else an ordinary power.
fn make_pow(base: Expr, exponent: Expr) -> Expr {
    if base == Expr::Var("e".to_string()) {
        Expr::Exp(exponent.boxed())
    } else {
        Expr::Pow(base.boxed(), exponent.boxed())
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), String> {
        match self.bump() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(format!("expected ')' but found {:?}", other)),
            None => Err("missing closing parenthesis".to_string()),
        }
    }

    // addition and subtraction
    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut node = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    node = node + self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.bump();
                    node = node - self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    // multiplication and division; a factor-start token with no operator in
    // between is implicit multiplication at the same precedence as '*'
    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut node = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    node = node * self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.bump();
                    node = node / self.parse_unary()?;
                }
                Some(Token::Num(_)) | Some(Token::Ident(_)) | Some(Token::LParen) => {
                    // implicit multiplication: the operand carries its own
                    // exponent, so 2x^2 is 2*(x^2)
                    node = node * self.parse_power()?;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.bump();
            let inner = self.parse_unary()?;
            Ok(Expr::Const(-1.0) * inner)
        } else {
            self.parse_power()
        }
    }

    // exponentiation, right-associative; the exponent may carry a sign
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.bump();
            let exponent = self.parse_unary()?;
            Ok(make_pow(base, exponent))
        } else {
            Ok(base)
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.bump() {
            Some(Token::Num(value)) => Ok(Expr::Const(value)),
            Some(Token::Ident(name)) => {
                if is_function_name(&name) {
                    match self.peek() {
                        Some(Token::LParen) => {
                            self.bump();
                            let arg = self.parse_expr()?;
                            self.expect_rparen()?;
                            Ok(apply_function(&name, arg))
                        }
                        _ => Err(format!("function '{}' requires parentheses", name)),
                    }
                } else if matches!(self.peek(), Some(Token::LParen))
                    && name.len() > 1
                    && !is_reserved_symbol(&name)
                    && name != "E"
                {
                    // a multi-letter name applied to an argument is almost
                    // certainly a misspelled function, not multiplication
                    Err(format!("unknown function '{}'", name))
                } else {
                    Ok(resolve_symbol(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Parses a mathematical expression from its string representation.
///
/// With `evaluate` set, numeric subexpressions are folded after parsing, the
/// way the request pipeline wants them for computation; without it the tree
/// mirrors the text as written, which is what the page displays back.
///
/// # Errors
/// Returns a human-readable cause when the text is not a valid expression in
/// this grammar; the endpoint embeds the cause in its "Entrada inválida"
/// message.
pub fn parse_math(input: &str, evaluate: bool) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!(
            "unexpected token {:?} after expression",
            parser.tokens[parser.pos]
        ));
    }
    if evaluate {
        Ok(expr.simplify_numbers())
    } else {
        Ok(expr)
    }
}
