//! Banker's Algorithm safety check
//!
//! The scan order is part of the contract: processes are examined in the
//! order they were supplied, and after every grant the scan restarts from the
//! first process. This fixes which safe sequence is returned when several
//! exist, so results are reproducible.

use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::types::{fits_within, ProcessId, Units};

/// Outcome of a safety check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyVerdict {
    /// Every process can run to completion in `order`
    Safe { order: Vec<ProcessId> },
    /// Some process can never be satisfied
    Unsafe,
}

impl SafetyVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyVerdict::Safe { .. })
    }

    /// The safe sequence, if any
    pub fn order(&self) -> Option<&[ProcessId]> {
        match self {
            SafetyVerdict::Safe { order } => Some(order),
            SafetyVerdict::Unsafe => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SafetyVerdict::Safe { .. } => "System is in safe state",
            SafetyVerdict::Unsafe => "System is not in safe state - potential deadlock",
        }
    }
}

/// Run the Banker's Algorithm over the ledger.
///
/// # Properties
///
/// 1. **Read-only**: the ledger is not touched
/// 2. **Deterministic**: first-eligible-from-the-start scan after every grant
pub fn check_safety(ledger: &Ledger) -> SafetyVerdict {
    let processes = ledger.processes();
    let needs: Vec<Vec<Units>> = processes.iter().map(|p| p.need()).collect();
    let mut work: Vec<u64> = ledger.available().into_iter().map(u64::from).collect();
    let mut finished = vec![false; processes.len()];
    let mut order = Vec::with_capacity(processes.len());

    while order.len() < processes.len() {
        let next = (0..processes.len()).find(|&i| {
            !finished[i] && needs[i].iter().zip(&work).all(|(&n, &w)| u64::from(n) <= w)
        });

        match next {
            Some(i) => {
                for (w, &held) in work.iter_mut().zip(processes[i].allocated()) {
                    *w += u64::from(held);
                }
                finished[i] = true;
                order.push(processes[i].pid.clone());
            }
            None => return SafetyVerdict::Unsafe,
        }
    }

    SafetyVerdict::Safe { order }
}

/// Check that `order` is an executable completion sequence for the ledger.
///
/// Replays the order: each process must have `need <= work` when its turn
/// comes, then returns its allocation to `work`. Every process must appear
/// exactly once.
pub fn replay_order(ledger: &Ledger, order: &[ProcessId]) -> bool {
    if order.len() != ledger.process_count() {
        return false;
    }
    let mut seen = vec![false; ledger.process_count()];
    let mut work: Vec<Units> = ledger.available();

    for pid in order {
        let Some(idx) = ledger.index_of(pid) else {
            return false;
        };
        if seen[idx] {
            return false;
        }
        let process = &ledger.processes()[idx];
        if !fits_within(&process.need(), &work) {
            return false;
        }
        for (w, &held) in work.iter_mut().zip(process.allocated()) {
            *w = w.saturating_add(held);
        }
        seen[idx] = true;
    }
    true
}
