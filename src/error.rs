//! Error taxonomy for the engine.
//!
//! `UnknownEntity` is deliberately not a variant here. `predict` on an
//! unknown user/item returns `f32::NAN`, which callers are expected to
//! treat as "skip" rather than unwrap a `Result`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecomfError>;

#[derive(Debug, Error)]
pub enum RecomfError {
    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl RecomfError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        RecomfError::MalformedInput {
            line,
            message: message.into(),
        }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        RecomfError::NumericalDegeneracy(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        RecomfError::Configuration(message.into())
    }
}
