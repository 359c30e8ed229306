//! Service error type

use banker_core::LedgerError;
use thiserror::Error;

/// Errors surfaced to callers of the service operations.
///
/// Denials are never errors; they come back inside the response records.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ServiceError {
    /// Malformed input: wrong vector widths, duplicate ids, unknown tags,
    /// inconsistent initial state
    #[error("Validation error: {0}")]
    Validation(String),

    /// A ledger contract was broken by an internal caller
    #[error("Ledger contract violation: {0}")]
    ContractViolation(LedgerError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        if err.is_contract_violation() {
            ServiceError::ContractViolation(err)
        } else {
            ServiceError::Validation(err.to_string())
        }
    }
}
