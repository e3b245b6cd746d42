//! Define the policy front-end error type.

use thiserror::Error;

/// Policy parsing error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("empty policy")]
    EmptyPolicy,
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("unexpected end of policy, expected {0}")]
    UnexpectedEnd(String),
    #[error("invalid threshold gate {threshold} of {children}")]
    InvalidThreshold { threshold: usize, children: usize },
}
