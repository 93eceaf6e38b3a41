//! # HTTP Endpoint Module
//!
//! Two routes: `GET /` serves the static page, `POST /derive` runs the
//! pipeline (parse, select variable, build derivation) and returns the JSON
//! document the page's script renders with MathJax. Every request failure is
//! an HTTP 400 with `{ "error": <message> }`; nothing here is fatal to the
//! process.
//!
//! The payload may arrive as JSON or as form data. An unreadable body
//! degrades to an empty payload, which then fails the function-required
//! validation with the usual 400.

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::derivation::{Step, build_derivation, choose_variable};
use crate::error::{DeriveError, DeriveResult};
use crate::symbolic::parse_expr::parse_math;
use crate::symbolic::symbolic_engine::Expr;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// The application router.
pub fn app() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/derive", post(derive))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DeriveRequest {
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub point: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeriveResponse {
    pub input_function_latex: String,
    pub variable: String,
    pub variable_latex: String,
    pub inferred_variable: bool,
    pub derivative_function_latex: String,
    pub derivative_at_point_latex: Option<String>,
    pub point_latex: Option<String>,
    pub point_symbol_latex: Option<String>,
    pub steps: Vec<Step>,
}

async fn derive(request: Request) -> Response {
    let payload = extract_payload(request).await;
    info!(
        "POST /derive function={:?} variable={:?} point={:?}",
        payload.function, payload.variable, payload.point
    );
    match handle_derive(&payload) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!("request rejected: {}", error);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    }
}

async fn extract_payload(request: Request) -> DeriveRequest {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false);
    if is_json {
        match Json::<DeriveRequest>::from_request(request, &()).await {
            Ok(Json(payload)) => payload,
            Err(_) => DeriveRequest::default(),
        }
    } else {
        match Form::<DeriveRequest>::from_request(request, &()).await {
            Ok(Form(payload)) => payload,
            Err(_) => DeriveRequest::default(),
        }
    }
}

/// The synchronous request pipeline behind `POST /derive`.
///
/// Validation order: missing/blank function first, then parsing, then
/// variable selection, then the derivation itself.
pub fn handle_derive(payload: &DeriveRequest) -> DeriveResult<DeriveResponse> {
    let function_text = payload.function.as_deref().unwrap_or("").trim();
    if function_text.is_empty() {
        return Err(DeriveError::MissingFunction);
    }

    let function_expr_display =
        parse_math(function_text, false).map_err(DeriveError::Computation)?;
    let function_expr = parse_math(function_text, true)
        .map_err(DeriveError::Computation)?
        .simplify();

    let (variable, inferred) = choose_variable(&function_expr, payload.variable.as_deref())?;
    let derivation = build_derivation(&function_expr, &variable, payload.point.as_deref())?;

    let variable_latex = Expr::Var(variable.clone()).to_latex();
    Ok(DeriveResponse {
        input_function_latex: function_expr_display.to_latex(),
        variable,
        variable_latex,
        inferred_variable: inferred,
        derivative_function_latex: derivation.derivative_function.to_latex(),
        derivative_at_point_latex: derivation.derivative_at_point_latex,
        point_latex: derivation.point_latex,
        point_symbol_latex: derivation.point_symbol_latex,
        steps: derivation.steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(function: Option<&str>, variable: Option<&str>, point: Option<&str>) -> DeriveRequest {
        DeriveRequest {
            function: function.map(str::to_string),
            variable: variable.map(str::to_string),
            point: point.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_function_is_rejected() {
        let error = handle_derive(&request(None, None, None)).unwrap_err();
        assert_eq!(error.to_string(), "Debes indicar una función.");
        let error = handle_derive(&request(Some("   "), None, None)).unwrap_err();
        assert_eq!(error.to_string(), "Debes indicar una función.");
    }

    #[test]
    fn test_unparseable_function_is_rejected() {
        let error = handle_derive(&request(Some("x^^2"), None, None)).unwrap_err();
        assert!(error.to_string().starts_with("Entrada inválida:"));
    }

    #[test]
    fn test_invalid_variable_is_rejected() {
        let error = handle_derive(&request(Some("x^2"), Some("2x"), None)).unwrap_err();
        assert!(error.to_string().starts_with("Entrada inválida:"));
    }

    #[test]
    fn test_square_without_point() {
        let response = handle_derive(&request(Some("x^2"), None, None)).unwrap();
        assert_eq!(response.variable, "x");
        assert!(response.inferred_variable);
        assert_eq!(response.derivative_function_latex, "2 x");
        assert!(response.derivative_at_point_latex.is_none());
        assert!(response.point_latex.is_none());
        let derivative_steps: Vec<_> = response
            .steps
            .iter()
            .filter(|step| step.title == "Función derivada")
            .collect();
        assert_eq!(derivative_steps.len(), 1);
        assert!(
            !response
                .steps
                .iter()
                .any(|step| step.title == "Sustitución en el cociente de incrementos")
        );
    }

    #[test]
    fn test_square_with_point() {
        let response = handle_derive(&request(Some("x^2"), None, Some("1"))).unwrap();
        assert_eq!(response.derivative_at_point_latex.as_deref(), Some("2"));
        assert_eq!(response.point_latex.as_deref(), Some("1"));
        assert_eq!(response.point_symbol_latex.as_deref(), Some("x_{0}"));
        assert!(
            response
                .steps
                .iter()
                .any(|step| step.title == "Sustitución en el cociente de incrementos")
        );
    }

    #[test]
    fn test_explicit_variable_is_not_inferred() {
        let response = handle_derive(&request(Some("t^3"), Some("t"), None)).unwrap();
        assert_eq!(response.variable, "t");
        assert!(!response.inferred_variable);
    }

    #[test]
    fn test_inferred_variable_is_alphabetically_first() {
        let response = handle_derive(&request(Some("x*y + a"), None, None)).unwrap();
        assert_eq!(response.variable, "a");
        assert!(response.inferred_variable);
    }

    #[test]
    fn test_constant_expression_defaults_to_x() {
        let response = handle_derive(&request(Some("7"), None, None)).unwrap();
        assert_eq!(response.variable, "x");
        assert!(response.inferred_variable);
        assert_eq!(response.derivative_function_latex, "0");
    }

    #[test]
    fn test_sine_alias_derivative() {
        let response = handle_derive(&request(Some("sen(x)"), None, None)).unwrap();
        assert_eq!(
            response.derivative_function_latex,
            "\\cos\\left(x\\right)"
        );
    }

    #[test]
    fn test_display_formula_is_unevaluated() {
        let response = handle_derive(&request(Some("2 + 3 + x"), None, None)).unwrap();
        assert_eq!(response.input_function_latex, "2 + 3 + x");
    }
}
