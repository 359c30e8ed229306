//! Batch allocation policies
//!
//! Every policy admits a batch of `(process, request)` pairs against one
//! ledger and goes through the ledger's validated mutations, so the
//! bookkeeping invariants hold after any policy run. Requests are checked
//! against the owning process's remaining claim before availability; a
//! request above the claim is denied rather than allowed to break
//! `allocated <= max_demand`.
//!
//! | Policy       | Order                              | Admission rule             |
//! |--------------|------------------------------------|----------------------------|
//! | `Fcfs`       | owner arrival time, then input     | `request <= available`     |
//! | `Priority`   | owner priority (high first), input | `request <= available`     |
//! | `RoundRobin` | FIFO with re-queue                 | quantum-capped partial     |
//! | `FairShare`  | n/a (batch ignored)                | even split, capped at max  |
//! | `Bankers`    | input                              | `simulate_request`         |

use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Reverse;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::request::{simulate_request, DenialReason, RequestOutcome};
use crate::types::{fits_within, ProcessId, Units};

/// Admission policy for a batch of requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// First come, first served by arrival time
    Fcfs,
    /// Highest process priority first
    Priority,
    /// FIFO queue, at most `quantum` instances per dimension per turn
    RoundRobin { quantum: Units },
    /// Even split of every resource, overwriting current allocations
    FairShare,
    /// Each request gated by the Banker's safety check
    Bankers,
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Fcfs => "fcfs",
            Policy::Priority => "priority",
            Policy::RoundRobin { .. } => "round_robin",
            Policy::FairShare => "fair_share",
            Policy::Bankers => "bankers",
        }
    }
}

/// A pending request in a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub pid: ProcessId,
    pub amounts: Vec<Units>,
}

impl Request {
    pub fn new(pid: impl Into<ProcessId>, amounts: Vec<Units>) -> Self {
        Self {
            pid: pid.into(),
            amounts,
        }
    }
}

/// What happened to one request (or one round-robin turn of it)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// `amounts` were allocated and nothing is left pending
    Granted { amounts: Vec<Units> },
    /// `amounts` were allocated; the process was re-queued for `remaining`
    PartiallyGranted {
        amounts: Vec<Units>,
        remaining: Vec<Units>,
    },
    /// Nothing was allocated this turn
    Denied { reason: DenialReason, requeued: bool },
}

/// Admission result for one request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    /// Position of the request in the submitted batch
    pub index: usize,
    pub pid: ProcessId,
    pub decision: Decision,
    pub message: String,
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        !matches!(self.decision, Decision::Denied { .. })
    }

    pub fn denial(&self) -> Option<&DenialReason> {
        match &self.decision {
            Decision::Denied { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Result of a batch run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// One entry per admission attempt, in processing order
    Admissions(Vec<Admission>),
    /// New allocation per process, in process order
    FairShare(Vec<(ProcessId, Vec<Units>)>),
}

impl BatchOutcome {
    /// Processes reported as starved by the round-robin bound
    pub fn starved(&self) -> Vec<&ProcessId> {
        match self {
            BatchOutcome::Admissions(list) => list
                .iter()
                .filter(|a| a.denial() == Some(&DenialReason::Starvation))
                .map(|a| &a.pid)
                .collect(),
            BatchOutcome::FairShare(_) => Vec::new(),
        }
    }
}

/// Apply `policy` to `requests` against the ledger.
///
/// Request vectors are validated up front; a wrong length fails the whole
/// batch before anything is allocated.
pub fn allocate_batch(
    ledger: &mut Ledger,
    policy: Policy,
    requests: &[Request],
    config: &EngineConfig,
) -> Result<BatchOutcome, LedgerError> {
    if policy != Policy::FairShare {
        for r in requests {
            ledger.check_vector("request", &r.amounts)?;
        }
    }

    match policy {
        Policy::Fcfs => {
            let order = arrival_order(ledger, requests);
            run_direct(ledger, requests, &order, false).map(BatchOutcome::Admissions)
        }
        Policy::Priority => {
            let order = priority_order(ledger, requests);
            run_direct(ledger, requests, &order, true).map(BatchOutcome::Admissions)
        }
        Policy::RoundRobin { quantum } => {
            if quantum == 0 {
                return Err(LedgerError::ZeroQuantum);
            }
            round_robin(ledger, requests, quantum, config.round_robin_iteration_limit)
                .map(BatchOutcome::Admissions)
        }
        Policy::FairShare => fair_share(ledger).map(BatchOutcome::FairShare),
        Policy::Bankers => bankers(ledger, requests).map(BatchOutcome::Admissions),
    }
}

/// Processes whose wait time exceeds `threshold` while they still have need.
pub fn find_starved(ledger: &Ledger, threshold: u64) -> Vec<ProcessId> {
    ledger
        .processes()
        .iter()
        .filter(|p| p.wait_time > threshold && p.has_need())
        .map(|p| p.pid.clone())
        .collect()
}

// ============================================================================
// Ordering
// ============================================================================

/// Request indices by owner arrival time; stable, unknown owners last.
fn arrival_order(ledger: &Ledger, requests: &[Request]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by_key(|&i| match ledger.process(&requests[i].pid) {
        Some(p) => (0u8, p.arrival_time),
        None => (1u8, 0),
    });
    order
}

/// Request indices by owner priority, highest first; stable, unknown owners last.
fn priority_order(ledger: &Ledger, requests: &[Request]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by_key(|&i| match ledger.process(&requests[i].pid) {
        Some(p) => (0u8, Reverse(p.priority)),
        None => (1u8, Reverse(0)),
    });
    order
}

// ============================================================================
// FCFS / Priority
// ============================================================================

fn run_direct(
    ledger: &mut Ledger,
    requests: &[Request],
    order: &[usize],
    show_priority: bool,
) -> Result<Vec<Admission>, LedgerError> {
    let mut results = Vec::with_capacity(order.len());

    for &index in order {
        let Request { pid, amounts } = &requests[index];
        let Some(idx) = ledger.index_of(pid) else {
            results.push(not_found(index, pid));
            continue;
        };

        let label = if show_priority {
            format!("{} (priority {})", pid, ledger.processes()[idx].priority)
        } else {
            format!("{}", pid)
        };

        let denial = if !fits_within(amounts, &ledger.processes()[idx].need()) {
            Some(DenialReason::ClaimExceeded)
        } else if !fits_within(amounts, &ledger.available()) {
            Some(DenialReason::InsufficientResources)
        } else {
            None
        };

        match denial {
            None => {
                ledger.allocate(pid, amounts)?;
                results.push(Admission {
                    index,
                    pid: pid.clone(),
                    decision: Decision::Granted {
                        amounts: amounts.clone(),
                    },
                    message: format!("Request by {} granted", label),
                });
            }
            Some(reason) => {
                record_wait(ledger, idx);
                results.push(Admission {
                    index,
                    pid: pid.clone(),
                    message: format!("Request by {} denied - {}", label, short_reason(&reason)),
                    decision: Decision::Denied {
                        reason,
                        requeued: false,
                    },
                });
            }
        }
    }

    Ok(results)
}

// ============================================================================
// Round-robin
// ============================================================================

/// Round-robin over a FIFO queue.
///
/// The quantum caps the instances granted per resource dimension in one turn.
/// This couples a time slice to a resource quantity; it is applied literally.
/// After `limit` dequeues every request still queued is reported as starved.
fn round_robin(
    ledger: &mut Ledger,
    requests: &[Request],
    quantum: Units,
    limit: usize,
) -> Result<Vec<Admission>, LedgerError> {
    let mut queue: VecDeque<(usize, ProcessId, Vec<Units>)> = requests
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.pid.clone(), r.amounts.clone()))
        .collect();
    let mut results = Vec::new();
    let mut turns: usize = 0;

    while turns < limit {
        let Some((index, pid, amounts)) = queue.pop_front() else {
            break;
        };
        turns += 1;

        let Some(idx) = ledger.index_of(&pid) else {
            results.push(not_found(index, &pid));
            continue;
        };

        if !fits_within(&amounts, &ledger.processes()[idx].need()) {
            record_wait(ledger, idx);
            results.push(Admission {
                index,
                message: format!(
                    "Request by {} denied - {}",
                    pid,
                    short_reason(&DenialReason::ClaimExceeded)
                ),
                pid,
                decision: Decision::Denied {
                    reason: DenialReason::ClaimExceeded,
                    requeued: false,
                },
            });
            continue;
        }

        if !fits_within(&amounts, &ledger.available()) {
            record_wait(ledger, idx);
            results.push(Admission {
                index,
                pid: pid.clone(),
                decision: Decision::Denied {
                    reason: DenialReason::InsufficientResources,
                    requeued: true,
                },
                message: format!("Request by {} denied, re-queued", pid),
            });
            queue.push_back((index, pid, amounts));
            continue;
        }

        let grant: Vec<Units> = amounts.iter().map(|&a| a.min(quantum)).collect();
        ledger.allocate(&pid, &grant)?;

        if ledger.processes()[idx].has_need() {
            let remaining = ledger.processes()[idx].need();
            results.push(Admission {
                index,
                pid: pid.clone(),
                decision: Decision::PartiallyGranted {
                    amounts: grant,
                    remaining: remaining.clone(),
                },
                message: format!("Request by {} partially granted, re-queued", pid),
            });
            queue.push_back((index, pid, remaining));
        } else {
            ledger.process_at_mut(idx).finish_time = Some(turns as u64);
            results.push(Admission {
                index,
                message: format!("Request by {} completed", pid),
                pid,
                decision: Decision::Granted { amounts: grant },
            });
        }
    }

    for (index, pid, _) in queue {
        results.push(Admission {
            index,
            message: format!(
                "Request by {} starved after {} round-robin iterations",
                pid, limit
            ),
            pid,
            decision: Decision::Denied {
                reason: DenialReason::Starvation,
                requeued: false,
            },
        });
    }

    Ok(results)
}

// ============================================================================
// Fair-share
// ============================================================================

/// Split every resource evenly, remainder to the first processes, capped at
/// each process's claim. Replaces existing allocations.
fn fair_share(ledger: &mut Ledger) -> Result<Vec<(ProcessId, Vec<Units>)>, LedgerError> {
    let n = ledger.process_count() as u64;
    if n == 0 {
        return Ok(Vec::new());
    }

    let totals = ledger.totals();
    let rows: Vec<Vec<Units>> = ledger
        .processes()
        .iter()
        .enumerate()
        .map(|(j, p)| {
            totals
                .iter()
                .zip(p.max_demand())
                .map(|(&total, &max)| {
                    let total = u64::from(total);
                    let extra = u64::from((j as u64) < total % n);
                    // share <= total, so it fits in Units
                    let share = (total / n + extra) as Units;
                    share.min(max)
                })
                .collect()
        })
        .collect();

    ledger.reassign(&rows)?;

    Ok(ledger
        .processes()
        .iter()
        .map(|p| p.pid.clone())
        .zip(rows)
        .collect())
}

// ============================================================================
// Banker's-gated
// ============================================================================

fn bankers(ledger: &mut Ledger, requests: &[Request]) -> Result<Vec<Admission>, LedgerError> {
    let mut results = Vec::with_capacity(requests.len());

    for (index, Request { pid, amounts }) in requests.iter().enumerate() {
        let admission = match simulate_request(ledger, pid, amounts)? {
            RequestOutcome::Granted => Admission {
                index,
                pid: pid.clone(),
                decision: Decision::Granted {
                    amounts: amounts.clone(),
                },
                message: format!("Request by {} granted", pid),
            },
            RequestOutcome::Denied(DenialReason::NotFound(_)) => not_found(index, pid),
            RequestOutcome::Denied(reason) => {
                if let Some(idx) = ledger.index_of(pid) {
                    record_wait(ledger, idx);
                }
                Admission {
                    index,
                    pid: pid.clone(),
                    message: format!("Request by {} denied - {}", pid, short_reason(&reason)),
                    decision: Decision::Denied {
                        reason,
                        requeued: false,
                    },
                }
            }
        };
        results.push(admission);
    }

    Ok(results)
}

// ============================================================================
// Helpers
// ============================================================================

fn not_found(index: usize, pid: &ProcessId) -> Admission {
    let reason = DenialReason::NotFound(pid.clone());
    Admission {
        index,
        pid: pid.clone(),
        message: reason.message(),
        decision: Decision::Denied {
            reason,
            requeued: false,
        },
    }
}

fn record_wait(ledger: &mut Ledger, idx: usize) {
    let process = ledger.process_at_mut(idx);
    process.wait_time = process.wait_time.saturating_add(1);
}

fn short_reason(reason: &DenialReason) -> &'static str {
    match reason {
        DenialReason::NotFound(_) => "process not found",
        DenialReason::ClaimExceeded => "exceeds maximum claim",
        DenialReason::InsufficientResources => "insufficient resources",
        DenialReason::UnsafeState => "would lead to unsafe state",
        DenialReason::Starvation => "starved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::check_all_invariants;
    use crate::types::{Process, Resource};
    use alloc::vec;

    fn pid(s: &str) -> ProcessId {
        ProcessId::from(s)
    }

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    fn admissions(outcome: BatchOutcome) -> Vec<Admission> {
        match outcome {
            BatchOutcome::Admissions(list) => list,
            other => panic!("Expected admissions, got {:?}", other),
        }
    }

    fn run(ledger: &mut Ledger, policy: Policy, requests: &[Request]) -> Vec<Admission> {
        admissions(allocate_batch(ledger, policy, requests, &cfg()).unwrap())
    }

    fn single_process(total: Units, max: Units) -> Ledger {
        Ledger::new(vec![Resource::new("R0", total)], vec![Process::new("A", vec![max])]).unwrap()
    }

    // ========================================================================
    // FCFS
    // ========================================================================

    #[test]
    fn test_fcfs_serves_by_arrival_time() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 2)],
            vec![
                Process::new("Late", vec![2]).arrival_time(5),
                Process::new("Early", vec![2]).arrival_time(1),
            ],
        )
        .unwrap();
        let requests = vec![Request::new("Late", vec![2]), Request::new("Early", vec![2])];

        let list = run(&mut ledger, Policy::Fcfs, &requests);
        assert_eq!(list[0].pid, pid("Early"));
        assert_eq!(list[0].index, 1);
        assert!(list[0].is_granted());
        assert_eq!(list[0].message, "Request by Early granted");
        assert_eq!(list[1].pid, pid("Late"));
        assert_eq!(list[1].denial(), Some(&DenialReason::InsufficientResources));
        assert_eq!(list[1].message, "Request by Late denied - insufficient resources");
        assert_eq!(ledger.process(&pid("Late")).unwrap().wait_time, 1);
    }

    #[test]
    fn test_fcfs_ties_keep_input_order_and_unknown_last() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 10)],
            vec![Process::new("A", vec![5]), Process::new("B", vec![5])],
        )
        .unwrap();
        let requests = vec![
            Request::new("Ghost", vec![1]),
            Request::new("B", vec![1]),
            Request::new("A", vec![1]),
        ];

        let list = run(&mut ledger, Policy::Fcfs, &requests);
        let order: Vec<_> = list.iter().map(|a| a.pid.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "Ghost"]);
        assert_eq!(list[2].message, "Process Ghost not found");
    }

    #[test]
    fn test_fcfs_denies_request_above_claim() {
        let mut ledger = single_process(10, 2);
        let list = run(&mut ledger, Policy::Fcfs, &[Request::new("A", vec![3])]);
        assert_eq!(list[0].denial(), Some(&DenialReason::ClaimExceeded));
        assert_eq!(ledger.available(), vec![10]);
    }

    #[test]
    fn test_batch_rejects_wrong_length_before_mutating() {
        let mut ledger = single_process(10, 2);
        let requests = vec![Request::new("A", vec![1]), Request::new("A", vec![1, 1])];
        assert!(allocate_batch(&mut ledger, Policy::Fcfs, &requests, &cfg()).is_err());
        assert_eq!(ledger.available(), vec![10]);
    }

    // ========================================================================
    // Priority
    // ========================================================================

    #[test]
    fn test_priority_serves_highest_first() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 3)],
            vec![
                Process::new("Low", vec![3]).priority(1),
                Process::new("High", vec![3]).priority(9),
                Process::new("Mid", vec![3]).priority(5),
            ],
        )
        .unwrap();
        let requests = vec![
            Request::new("Low", vec![1]),
            Request::new("High", vec![2]),
            Request::new("Mid", vec![2]),
        ];

        let list = run(&mut ledger, Policy::Priority, &requests);
        let order: Vec<_> = list.iter().map(|a| a.pid.as_str()).collect();
        assert_eq!(order, vec!["High", "Mid", "Low"]);
        assert_eq!(list[0].message, "Request by High (priority 9) granted");
        assert!(!list[1].is_granted());
        assert!(list[2].is_granted());
        assert_eq!(ledger.available(), vec![0]);
    }

    // ========================================================================
    // Round-robin
    // ========================================================================

    #[test]
    fn test_round_robin_partial_grants_until_complete() {
        let mut ledger = single_process(5, 3);
        let requests = vec![Request::new("A", vec![3])];

        let list = run(&mut ledger, Policy::RoundRobin { quantum: 1 }, &requests);
        assert_eq!(list.len(), 3);
        assert_eq!(
            list[0].decision,
            Decision::PartiallyGranted {
                amounts: vec![1],
                remaining: vec![2]
            }
        );
        assert_eq!(list[1].message, "Request by A partially granted, re-queued");
        assert_eq!(list[2].decision, Decision::Granted { amounts: vec![1] });
        assert_eq!(list[2].message, "Request by A completed");
        assert_eq!(ledger.available(), vec![2]);
        assert_eq!(ledger.process(&pid("A")).unwrap().finish_time, Some(3));
    }

    #[test]
    fn test_round_robin_interleaves_processes() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 4)],
            vec![Process::new("A", vec![2]), Process::new("B", vec![2])],
        )
        .unwrap();
        let requests = vec![Request::new("A", vec![2]), Request::new("B", vec![2])];

        let list = run(&mut ledger, Policy::RoundRobin { quantum: 1 }, &requests);
        let order: Vec<_> = list.iter().map(|a| a.pid.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "A", "B"]);
        assert!(list.iter().all(Admission::is_granted));
        assert_eq!(ledger.available(), vec![0]);
    }

    #[test]
    fn test_round_robin_reports_starvation_at_limit() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 2)],
            vec![Process::with_allocation("A", vec![2], vec![2]), Process::new("B", vec![2])],
        )
        .unwrap();
        // B can never be served: A holds everything and round-robin never releases
        let config = EngineConfig {
            round_robin_iteration_limit: 4,
            ..EngineConfig::default()
        };
        let outcome = allocate_batch(
            &mut ledger,
            Policy::RoundRobin { quantum: 1 },
            &[Request::new("B", vec![1])],
            &config,
        )
        .unwrap();
        assert_eq!(outcome.starved(), vec![&pid("B")]);

        let list = admissions(outcome);
        assert_eq!(list.len(), 5);
        assert!(list[..4].iter().all(|a| matches!(
            a.decision,
            Decision::Denied {
                reason: DenialReason::InsufficientResources,
                requeued: true
            }
        )));
        assert_eq!(list[4].denial(), Some(&DenialReason::Starvation));
        assert_eq!(ledger.process(&pid("B")).unwrap().wait_time, 4);
        assert!(check_all_invariants(&ledger).is_empty());
    }

    #[test]
    fn test_round_robin_rejects_zero_quantum() {
        let mut ledger = single_process(2, 2);
        assert_eq!(
            allocate_batch(&mut ledger, Policy::RoundRobin { quantum: 0 }, &[], &cfg())
                .unwrap_err(),
            LedgerError::ZeroQuantum
        );
    }

    // ========================================================================
    // Fair-share
    // ========================================================================

    #[test]
    fn test_fair_share_caps_at_claim() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 9)],
            vec![
                Process::with_allocation("A", vec![1], vec![1]),
                Process::new("B", vec![9]),
                Process::new("C", vec![9]),
            ],
        )
        .unwrap();
        let outcome = allocate_batch(&mut ledger, Policy::FairShare, &[], &cfg()).unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::FairShare(vec![
                (pid("A"), vec![1]),
                (pid("B"), vec![3]),
                (pid("C"), vec![3]),
            ])
        );
        assert_eq!(ledger.available(), vec![2]);
        assert!(check_all_invariants(&ledger).is_empty());
    }

    #[test]
    fn test_fair_share_without_processes() {
        let mut ledger = Ledger::new(vec![Resource::new("R0", 9)], vec![]).unwrap();
        let outcome = allocate_batch(&mut ledger, Policy::FairShare, &[], &cfg()).unwrap();
        assert_eq!(outcome, BatchOutcome::FairShare(vec![]));
    }

    // ========================================================================
    // Banker's-gated
    // ========================================================================

    #[test]
    fn test_bankers_policy_denies_unsafe_request() {
        let mut ledger = Ledger::new(
            vec![Resource::new("R0", 4)],
            vec![
                Process::with_allocation("A", vec![4], vec![2]),
                Process::with_allocation("B", vec![3], vec![1]),
            ],
        )
        .unwrap();
        let list = run(&mut ledger, Policy::Bankers, &[Request::new("B", vec![1])]);
        assert_eq!(list[0].denial(), Some(&DenialReason::UnsafeState));
        assert_eq!(list[0].message, "Request by B denied - would lead to unsafe state");
        assert_eq!(ledger.available(), vec![1]);
    }

    // ========================================================================
    // Starvation check
    // ========================================================================

    #[test]
    fn test_find_starved_requires_unmet_need() {
        let ledger = Ledger::new(
            vec![Resource::new("R0", 4)],
            vec![
                Process::new("Waiting", vec![2]).wait_time(150),
                Process::with_allocation("Done", vec![2], vec![2]).wait_time(150),
                Process::new("Fresh", vec![2]).wait_time(10),
            ],
        )
        .unwrap();
        assert_eq!(find_starved(&ledger, 100), vec![pid("Waiting")]);
    }
}
