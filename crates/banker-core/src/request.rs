//! Transactional single-request admission
//!
//! A request is checked against the process's remaining claim and current
//! availability, then tentatively applied and re-verified with the Banker's
//! Algorithm. The tentative state is an explicit snapshot of the allocation
//! rows and availability vector; on an unsafe verdict it is restored before
//! returning, so a denial never leaves an observable mutation behind.

use alloc::format;
use alloc::string::String;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::journal::CommitType;
use crate::ledger::Ledger;
use crate::safety::check_safety;
use crate::types::{fits_within, ProcessId, Units};

/// Why a request was not granted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// The process is not in the ledger
    NotFound(ProcessId),
    /// Request exceeds the process's remaining claim
    ClaimExceeded,
    /// Request exceeds current availability
    InsufficientResources,
    /// Granting would leave the system without a safe sequence
    UnsafeState,
    /// Round-robin gave up on the request after its iteration bound
    Starvation,
}

impl DenialReason {
    /// Short machine-readable tag
    pub fn tag(&self) -> &'static str {
        match self {
            DenialReason::NotFound(_) => "not_found",
            DenialReason::ClaimExceeded => "claim_exceeded",
            DenialReason::InsufficientResources => "insufficient_resources",
            DenialReason::UnsafeState => "unsafe_state",
            DenialReason::Starvation => "starvation",
        }
    }

    pub fn message(&self) -> String {
        match self {
            DenialReason::NotFound(pid) => format!("Process {} not found", pid),
            DenialReason::ClaimExceeded => String::from("Request exceeds maximum claim"),
            DenialReason::InsufficientResources => {
                String::from("Request exceeds available resources")
            }
            DenialReason::UnsafeState => String::from("Request would lead to unsafe state"),
            DenialReason::Starvation => {
                String::from("Request starved - round-robin iteration limit exceeded")
            }
        }
    }
}

/// Outcome of a single admission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    Granted,
    Denied(DenialReason),
}

impl RequestOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, RequestOutcome::Granted)
    }

    pub fn message(&self) -> String {
        match self {
            RequestOutcome::Granted => String::from("Request granted"),
            RequestOutcome::Denied(reason) => reason.message(),
        }
    }
}

/// Admit `request` for `pid` only if the resulting state is safe.
///
/// Checks, in order, each short-circuiting the rest:
/// 1. the process exists
/// 2. `request <= need`
/// 3. `request <= available`
/// 4. the tentatively applied state passes `check_safety`
///
/// Returns `Err` only for a request vector of the wrong length or a ledger
/// contract violation.
pub fn simulate_request(
    ledger: &mut Ledger,
    pid: &ProcessId,
    request: &[Units],
) -> Result<RequestOutcome, LedgerError> {
    ledger.check_vector("request", request)?;

    let Some(idx) = ledger.index_of(pid) else {
        return Ok(RequestOutcome::Denied(DenialReason::NotFound(pid.clone())));
    };

    if !fits_within(request, &ledger.processes()[idx].need()) {
        return Ok(RequestOutcome::Denied(DenialReason::ClaimExceeded));
    }
    if !fits_within(request, &ledger.available()) {
        return Ok(RequestOutcome::Denied(DenialReason::InsufficientResources));
    }

    let snapshot = ledger.snapshot();
    ledger.apply_allocation(idx, request)?;

    if check_safety(ledger).is_safe() {
        ledger.journal.append(CommitType::Allocated {
            pid: pid.clone(),
            amounts: request.to_vec(),
        });
        Ok(RequestOutcome::Granted)
    } else {
        ledger.restore(snapshot);
        Ok(RequestOutcome::Denied(DenialReason::UnsafeState))
    }
}
