//! Error types for the simulation core.

use thiserror::Error;

/// Errors raised when resolving catalog keys from external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Key does not name any attack archetype.
    #[error("Unknown attack type: {0}")]
    UnknownAttack(String),

    /// Key does not name any defense mechanism.
    #[error("Unknown defense type: {0}")]
    UnknownDefense(String),

    /// Key does not name a sophistication tier.
    #[error("Unknown sophistication: {0}")]
    UnknownSophistication(String),
}
