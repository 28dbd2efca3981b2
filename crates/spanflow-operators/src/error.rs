//! Operator errors.
//!
//! Two classes matter to callers: configuration errors, raised once while an
//! operator is built, and execution errors, raised from a `next()` call.

use std::fmt;

use thiserror::Error;

pub type OpResult<T> = std::result::Result<T, OpError>;

/// Which input of a binary operator a tuple came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Outer,
    Inner,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinSide::Outer => f.write_str("outer"),
            JoinSide::Inner => f.write_str("inner"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error("configuration error in '{operator}': {message}")]
    Config { operator: String, message: String },

    #[error("operator '{0}' is closed")]
    OperatorClosed(String),

    #[error("operator '{0}' has not been opened")]
    OperatorNotOpen(String),

    #[error("operator '{operator}': {side} tuple carries no span list attribute")]
    MissingSpanAttribute { operator: String, side: JoinSide },

    #[error(transparent)]
    Core(#[from] spanflow_core::error::Error),

    #[error("execution error: {0}")]
    Exec(String),
}

impl OpError {
    pub fn config(operator: impl Into<String>, message: impl Into<String>) -> Self {
        OpError::Config {
            operator: operator.into(),
            message: message.into(),
        }
    }

    /// Raised while building an operator, before any tuple flows.
    pub fn is_config(&self) -> bool {
        matches!(self, OpError::Config { .. })
    }

    /// Raised from a `next()` call.
    pub fn is_execution(&self) -> bool {
        !self.is_config()
    }
}
