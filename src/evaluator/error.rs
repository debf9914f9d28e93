//! Expression evaluation errors

use thiserror::Error;

/// Everything that can go wrong between source text and a final address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("unexpected token `{token}` at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("invalid character `{character}` at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

pub type EvalResult<T> = Result<T, EvalError>;
