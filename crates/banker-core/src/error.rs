//! Ledger errors
//!
//! Expected admission outcomes (claim exceeded, insufficient resources,
//! unsafe state) are *not* errors - see [`crate::request::DenialReason`].
//! `LedgerError` covers malformed ledgers and contract violations only.

use alloc::string::String;

use crate::types::{ProcessId, ResourceId, Units};

/// Errors raised by ledger construction and mutation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A vector does not have one entry per resource type.
    #[error("{what} has {actual} entries, expected {expected}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Two processes share an identifier.
    #[error("duplicate process id: {0}")]
    DuplicateProcess(ProcessId),

    /// Two resources share an identifier.
    #[error("duplicate resource id: {0}")]
    DuplicateResource(ResourceId),

    /// Initial allocation exceeds the process's maximum claim.
    #[error("process {pid} holds {allocated} of resource {resource}, above its claim of {max}")]
    ClaimViolation {
        pid: ProcessId,
        resource: ResourceId,
        allocated: Units,
        max: Units,
    },

    /// Initial allocations sum to more than a resource's total.
    #[error("resource {resource} is over-committed: {allocated} allocated of {total}")]
    Overcommitted {
        resource: ResourceId,
        allocated: u64,
        total: Units,
    },

    /// Referenced process is not in the ledger.
    #[error("process {0} not found")]
    ProcessNotFound(ProcessId),

    /// A mutation would break `allocated <= max_demand`, `available >= 0`
    /// or `release <= allocated`.
    #[error("out of range: process {pid}, resource {resource}: {detail}")]
    OutOfRange {
        pid: ProcessId,
        resource: ResourceId,
        detail: String,
    },

    /// Round-robin needs a quantum of at least one instance.
    #[error("round-robin quantum must be at least 1")]
    ZeroQuantum,
}

impl LedgerError {
    /// True for invariant-contract violations, which callers must treat as fatal.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, LedgerError::OutOfRange { .. })
    }
}
