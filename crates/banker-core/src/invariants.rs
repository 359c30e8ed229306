//! Ledger invariants
//!
//! Runtime-checkable invariants that must hold at every observable point.
//! Used for assertion checking in tests and by callers that want to audit a
//! ledger after a sequence of operations.
//!
//! # Invariants
//!
//! 1. **Shape Consistency**: every process vector has one entry per resource
//! 2. **Need Non-Negativity**: `allocated[i] <= max_demand[i]` for every process
//! 3. **Conservation**: `available[i] + sum(allocated[i]) == total[i]`
//! 4. **Unique IDs**: no two processes (or resources) share an identifier

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::ledger::Ledger;

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all ledger invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(ledger: &Ledger) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_shape_consistency(ledger));
    // The remaining checks index by resource; skip them on malformed shapes
    if violations.is_empty() {
        violations.extend(check_need_non_negative(ledger));
        violations.extend(check_conservation(ledger));
    }
    violations.extend(check_unique_ids(ledger));

    violations
}

/// Panic if any invariant is violated.
pub fn assert_invariants(ledger: &Ledger) {
    let violations = check_all_invariants(ledger);
    if !violations.is_empty() {
        panic!("Invariant violated: {:?}", violations);
    }
}

/// Invariant 1: every process vector has one entry per resource
fn check_shape_consistency(ledger: &Ledger) -> Vec<InvariantViolation> {
    let width = ledger.resources.len();
    let mut violations = Vec::new();

    for p in &ledger.processes {
        if p.max_demand.len() != width || p.allocated.len() != width {
            violations.push(InvariantViolation {
                invariant: "shape_consistency",
                description: format!(
                    "Process {} has max_demand/allocated of length {}/{}, expected {}",
                    p.pid,
                    p.max_demand.len(),
                    p.allocated.len(),
                    width
                ),
            });
        }
    }

    violations
}

/// Invariant 2: need stays non-negative
fn check_need_non_negative(ledger: &Ledger) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for p in &ledger.processes {
        for (i, (&held, &max)) in p.allocated.iter().zip(&p.max_demand).enumerate() {
            if held > max {
                violations.push(InvariantViolation {
                    invariant: "need_non_negative",
                    description: format!(
                        "Process {} holds {} of resource {} with a claim of {}",
                        p.pid, held, ledger.resources[i].rid, max
                    ),
                });
            }
        }
    }

    violations
}

/// Invariant 3: every instance is either available or held
fn check_conservation(ledger: &Ledger) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (i, r) in ledger.resources.iter().enumerate() {
        let held: u64 = ledger
            .processes
            .iter()
            .map(|p| u64::from(p.allocated[i]))
            .sum();
        let accounted = held + u64::from(r.available_instances);
        if accounted != u64::from(r.total_instances) {
            violations.push(InvariantViolation {
                invariant: "conservation",
                description: format!(
                    "Resource {}: {} available + {} allocated != {} total",
                    r.rid, r.available_instances, held, r.total_instances
                ),
            });
        }
    }

    violations
}

/// Invariant 4: identifiers are unique
fn check_unique_ids(ledger: &Ledger) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut pids = BTreeSet::new();
    for p in &ledger.processes {
        if !pids.insert(&p.pid) {
            violations.push(InvariantViolation {
                invariant: "unique_ids",
                description: format!("Process id {} appears more than once", p.pid),
            });
        }
    }

    let mut rids = BTreeSet::new();
    for r in &ledger.resources {
        if !rids.insert(&r.rid) {
            violations.push(InvariantViolation {
                invariant: "unique_ids",
                description: format!("Resource id {} appears more than once", r.rid),
            });
        }
    }

    violations
}
