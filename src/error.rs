use thiserror::Error;

/// Request-level failures of the derivation endpoint. Every variant maps to
/// an HTTP 400 with its message as the error text; none is fatal to the
/// process.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("Debes indicar una función.")]
    MissingFunction,

    /// Malformed request field, e.g. a variable that is not an identifier.
    #[error("Entrada inválida: {0}")]
    Validation(String),

    /// The parser rejected the text, or a derivation step failed.
    #[error("Entrada inválida: {0}")]
    Computation(String),
}

pub type DeriveResult<T> = Result<T, DeriveError>;
