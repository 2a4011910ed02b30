use crate::domain::money::Currency;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonetizationError>;

/// Error taxonomy of the monetization core.
///
/// `NotFound` and `Ineligible` are expected, frequent outcomes; callers are
/// meant to render them as user-facing messages, not treat them as faults.
#[derive(Error, Debug)]
pub enum MonetizationError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ineligible: {0}")]
    Ineligible(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
