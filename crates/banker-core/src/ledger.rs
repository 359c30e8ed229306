//! Resource ledger - pure data structure holding all allocation state
//!
//! The ledger owns every Process and Resource of one simulation run. It is
//! the single place where the two bookkeeping invariants can be broken, so
//! every mutation here validates all resource dimensions before touching any
//! of them:
//!
//! - `allocated[i] <= max_demand[i]` for every process
//! - `available[i] + sum(allocated[i]) == total[i]` for every resource

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::journal::{CommitType, Journal};
use crate::types::{Process, ProcessId, Resource, ResourceId, Units};

/// The resource ledger for one simulation run.
#[derive(Clone, Debug)]
pub struct Ledger {
    /// Processes in the order they were supplied
    pub(crate) processes: Vec<Process>,
    /// Resource types, indexing every per-resource vector
    pub(crate) resources: Vec<Resource>,
    /// Committed mutations
    pub(crate) journal: Journal,
}

/// Allocation state captured before a tentative mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    allocations: Vec<Vec<Units>>,
    available: Vec<Units>,
}

/// Per-resource usage figures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub rid: ResourceId,
    pub total: Units,
    pub allocated: Units,
    pub available: Units,
    /// Fraction of instances held, 0.0 when the resource has no instances
    pub utilization: f64,
}

/// Ledger-wide usage figures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub resources: Vec<ResourceUsage>,
    pub process_count: usize,
    /// Processes whose need is not yet zero
    pub processes_with_need: usize,
    /// Processes that have retired
    pub finished_processes: usize,
}

impl Ledger {
    /// Build a ledger from resources and processes with initial allocations.
    ///
    /// Availability is derived as `total - sum(allocated)`, so the
    /// conservation invariant holds from the start.
    pub fn new(resources: Vec<Resource>, processes: Vec<Process>) -> Result<Self, LedgerError> {
        let mut rids = BTreeSet::new();
        for r in &resources {
            if !rids.insert(&r.rid) {
                return Err(LedgerError::DuplicateResource(r.rid.clone()));
            }
        }

        let width = resources.len();
        let mut pids = BTreeSet::new();
        for p in &processes {
            if !pids.insert(&p.pid) {
                return Err(LedgerError::DuplicateProcess(p.pid.clone()));
            }
            check_width(&format!("max_demand of {}", p.pid), width, &p.max_demand)?;
            check_width(&format!("allocation of {}", p.pid), width, &p.allocated)?;
            for (i, (&held, &max)) in p.allocated.iter().zip(&p.max_demand).enumerate() {
                if held > max {
                    return Err(LedgerError::ClaimViolation {
                        pid: p.pid.clone(),
                        resource: resources[i].rid.clone(),
                        allocated: held,
                        max,
                    });
                }
            }
        }

        let mut resources = resources;
        for (i, r) in resources.iter_mut().enumerate() {
            let held: u64 = processes.iter().map(|p| u64::from(p.allocated[i])).sum();
            if held > u64::from(r.total_instances) {
                return Err(LedgerError::Overcommitted {
                    resource: r.rid.clone(),
                    allocated: held,
                    total: r.total_instances,
                });
            }
            // held <= total, which fits in Units
            r.available_instances = r.total_instances - held as Units;
        }

        Ok(Self {
            processes,
            resources,
            journal: Journal::new(),
        })
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    /// Number of resource types
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Processes in supplied order
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Look up a process by ID
    pub fn process(&self, pid: &ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| &p.pid == pid)
    }

    /// Position of a process in supplied order
    pub fn index_of(&self, pid: &ProcessId) -> Option<usize> {
        self.processes.iter().position(|p| &p.pid == pid)
    }

    /// Available instances per resource type
    pub fn available(&self) -> Vec<Units> {
        self.resources.iter().map(|r| r.available_instances).collect()
    }

    /// Total instances per resource type
    pub fn totals(&self) -> Vec<Units> {
        self.resources.iter().map(|r| r.total_instances).collect()
    }

    /// Need vector of a process
    pub fn need(&self, pid: &ProcessId) -> Option<Vec<Units>> {
        self.process(pid).map(Process::need)
    }

    /// Allocation rows in process order
    pub fn allocation_matrix(&self) -> Vec<Vec<Units>> {
        self.processes.iter().map(|p| p.allocated.clone()).collect()
    }

    /// Committed mutations
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Aggregate usage statistics
    pub fn usage(&self) -> UsageStats {
        let resources = self
            .resources
            .iter()
            .map(|r| {
                let allocated = r.total_instances - r.available_instances;
                let utilization = if r.total_instances == 0 {
                    0.0
                } else {
                    f64::from(allocated) / f64::from(r.total_instances)
                };
                ResourceUsage {
                    rid: r.rid.clone(),
                    total: r.total_instances,
                    allocated,
                    available: r.available_instances,
                    utilization,
                }
            })
            .collect();

        UsageStats {
            resources,
            process_count: self.processes.len(),
            processes_with_need: self.processes.iter().filter(|p| p.has_need()).count(),
            finished_processes: self
                .processes
                .iter()
                .filter(|p| p.finish_time.is_some())
                .count(),
        }
    }

    // ========================================================================
    // Committed mutations
    // ========================================================================

    /// Add `amounts` to a process's allocation.
    ///
    /// No safety check is performed; compose with `check_safety` or use
    /// `simulate_request` when safety matters.
    pub fn allocate(&mut self, pid: &ProcessId, amounts: &[Units]) -> Result<(), LedgerError> {
        let idx = self.require(pid)?;
        self.check_vector("allocation request", amounts)?;
        self.apply_allocation(idx, amounts)?;
        self.journal.append(CommitType::Allocated {
            pid: pid.clone(),
            amounts: amounts.to_vec(),
        });
        Ok(())
    }

    /// Return `amounts` from a process to the pool.
    pub fn release(&mut self, pid: &ProcessId, amounts: &[Units]) -> Result<(), LedgerError> {
        let idx = self.require(pid)?;
        self.check_vector("release request", amounts)?;
        self.apply_release(idx, amounts)?;
        self.journal.append(CommitType::Released {
            pid: pid.clone(),
            amounts: amounts.to_vec(),
        });
        Ok(())
    }

    /// Release everything a process holds and stamp its finish time.
    ///
    /// Returns the released vector.
    pub fn retire(&mut self, pid: &ProcessId, finish_time: u64) -> Result<Vec<Units>, LedgerError> {
        let idx = self.require(pid)?;
        let held = self.processes[idx].allocated.clone();
        self.apply_release(idx, &held)?;
        self.processes[idx].finish_time = Some(finish_time);
        self.journal.append(CommitType::Retired {
            pid: pid.clone(),
            finish_time,
        });
        Ok(held)
    }

    /// Overwrite every process's allocation with `rows` (one per process, in
    /// process order) and recompute availability.
    pub(crate) fn reassign(&mut self, rows: &[Vec<Units>]) -> Result<(), LedgerError> {
        if rows.len() != self.processes.len() {
            return Err(LedgerError::ShapeMismatch {
                what: "reassignment".to_string(),
                expected: self.processes.len(),
                actual: rows.len(),
            });
        }
        for (p, row) in self.processes.iter().zip(rows) {
            check_width(&format!("reassignment of {}", p.pid), self.resources.len(), row)?;
            for (i, (&amount, &max)) in row.iter().zip(&p.max_demand).enumerate() {
                if amount > max {
                    return Err(self.out_of_range(
                        &p.pid,
                        i,
                        format!("reassigning {} exceeds claim {}", amount, max),
                    ));
                }
            }
        }
        let mut new_available = Vec::with_capacity(self.resources.len());
        for (i, r) in self.resources.iter().enumerate() {
            let held: u64 = rows.iter().map(|row| u64::from(row[i])).sum();
            if held > u64::from(r.total_instances) {
                return Err(LedgerError::OutOfRange {
                    pid: ProcessId::from("*"),
                    resource: r.rid.clone(),
                    detail: format!("reassigning {} of {} instances", held, r.total_instances),
                });
            }
            new_available.push(r.total_instances - held as Units);
        }

        for (p, row) in self.processes.iter_mut().zip(rows) {
            p.allocated.clone_from(row);
            self.journal.append(CommitType::Reassigned {
                pid: p.pid.clone(),
                allocation: row.clone(),
            });
        }
        for (r, avail) in self.resources.iter_mut().zip(new_available) {
            r.available_instances = avail;
        }
        Ok(())
    }

    // ========================================================================
    // Tentative mutation support
    // ========================================================================

    /// Capture allocation rows and availability.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            allocations: self.allocation_matrix(),
            available: self.available(),
        }
    }

    /// Put back a snapshot taken from this ledger.
    pub(crate) fn restore(&mut self, snapshot: LedgerSnapshot) {
        for (p, row) in self.processes.iter_mut().zip(snapshot.allocations) {
            p.allocated = row;
        }
        for (r, avail) in self.resources.iter_mut().zip(snapshot.available) {
            r.available_instances = avail;
        }
    }

    /// Validate every dimension, then apply. Does not journal.
    pub(crate) fn apply_allocation(
        &mut self,
        idx: usize,
        amounts: &[Units],
    ) -> Result<(), LedgerError> {
        let process = &self.processes[idx];
        for (i, &amount) in amounts.iter().enumerate() {
            let held = process.allocated[i];
            let max = process.max_demand[i];
            match held.checked_add(amount) {
                Some(new) if new <= max => {}
                _ => {
                    return Err(self.out_of_range(
                        &process.pid,
                        i,
                        format!("allocating {} to {} held exceeds claim {}", amount, held, max),
                    ))
                }
            }
            let available = self.resources[i].available_instances;
            if amount > available {
                return Err(self.out_of_range(
                    &process.pid,
                    i,
                    format!("allocating {} with only {} available", amount, available),
                ));
            }
        }

        for (i, &amount) in amounts.iter().enumerate() {
            self.processes[idx].allocated[i] += amount;
            self.resources[i].available_instances -= amount;
        }
        Ok(())
    }

    /// Validate every dimension, then apply. Does not journal.
    pub(crate) fn apply_release(
        &mut self,
        idx: usize,
        amounts: &[Units],
    ) -> Result<(), LedgerError> {
        let process = &self.processes[idx];
        for (i, &amount) in amounts.iter().enumerate() {
            let held = process.allocated[i];
            if amount > held {
                return Err(self.out_of_range(
                    &process.pid,
                    i,
                    format!("releasing {} with only {} held", amount, held),
                ));
            }
        }

        for (i, &amount) in amounts.iter().enumerate() {
            self.processes[idx].allocated[i] -= amount;
            self.resources[i].available_instances += amount;
        }
        Ok(())
    }

    pub(crate) fn process_at_mut(&mut self, idx: usize) -> &mut Process {
        &mut self.processes[idx]
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub(crate) fn require(&self, pid: &ProcessId) -> Result<usize, LedgerError> {
        self.index_of(pid)
            .ok_or_else(|| LedgerError::ProcessNotFound(pid.clone()))
    }

    pub(crate) fn check_vector(&self, what: &str, amounts: &[Units]) -> Result<(), LedgerError> {
        check_width(what, self.resources.len(), amounts)
    }

    fn out_of_range(&self, pid: &ProcessId, resource: usize, detail: String) -> LedgerError {
        LedgerError::OutOfRange {
            pid: pid.clone(),
            resource: self.resources[resource].rid.clone(),
            detail,
        }
    }
}

fn check_width(what: &str, expected: usize, v: &[Units]) -> Result<(), LedgerError> {
    if v.len() != expected {
        return Err(LedgerError::ShapeMismatch {
            what: what.to_string(),
            expected,
            actual: v.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn pid(s: &str) -> ProcessId {
        ProcessId::from(s)
    }

    fn two_by_two() -> Ledger {
        Ledger::new(
            vec![Resource::new("R0", 5), Resource::new("R1", 3)],
            vec![
                Process::with_allocation("A", vec![4, 2], vec![1, 1]),
                Process::with_allocation("B", vec![3, 3], vec![2, 0]),
            ],
        )
        .unwrap()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_new_derives_available_from_allocations() {
        let ledger = two_by_two();
        assert_eq!(ledger.available(), vec![2, 2]);
        assert_eq!(ledger.totals(), vec![5, 3]);
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let err = Ledger::new(
            vec![Resource::new("R0", 5)],
            vec![Process::with_allocation("A", vec![1, 1], vec![0, 0])],
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::ShapeMismatch { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let err = Ledger::new(
            vec![Resource::new("R0", 5)],
            vec![Process::new("A", vec![1]), Process::new("A", vec![1])],
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateProcess(pid("A")));

        let err = Ledger::new(vec![Resource::new("R0", 5), Resource::new("R0", 1)], vec![])
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateResource(ResourceId::from("R0")));
    }

    #[test]
    fn test_new_rejects_claim_violation_and_overcommit() {
        let err = Ledger::new(
            vec![Resource::new("R0", 5)],
            vec![Process::with_allocation("A", vec![1], vec![2])],
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::ClaimViolation { allocated: 2, max: 1, .. }));

        let err = Ledger::new(
            vec![Resource::new("R0", 3)],
            vec![
                Process::with_allocation("A", vec![2], vec![2]),
                Process::with_allocation("B", vec![2], vec![2]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Overcommitted { allocated: 4, total: 3, .. }));
    }

    // ========================================================================
    // Allocate / release
    // ========================================================================

    #[test]
    fn test_allocate_moves_units_and_journals() {
        let mut ledger = two_by_two();
        ledger.allocate(&pid("A"), &[2, 1]).unwrap();
        assert_eq!(ledger.available(), vec![0, 1]);
        assert_eq!(ledger.process(&pid("A")).unwrap().allocated(), &[3, 2]);
        assert_eq!(ledger.need(&pid("A")), Some(vec![1, 0]));
        assert_eq!(ledger.journal().len(), 1);
    }

    #[test]
    fn test_allocate_is_all_or_nothing() {
        let mut ledger = two_by_two();
        let before = ledger.snapshot();

        // First dimension fits, second exceeds A's claim of 2
        let err = ledger.allocate(&pid("A"), &[1, 2]).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(ledger.snapshot(), before);
        assert!(ledger.journal().is_empty());

        // Within claim but above availability
        let err = ledger.allocate(&pid("B"), &[1, 3]).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_release_rejects_more_than_held() {
        let mut ledger = two_by_two();
        let before = ledger.snapshot();
        let err = ledger.release(&pid("B"), &[1, 1]).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_allocate_then_release_round_trips() {
        let mut ledger = two_by_two();
        let before = ledger.snapshot();
        ledger.allocate(&pid("B"), &[1, 2]).unwrap();
        ledger.release(&pid("B"), &[1, 2]).unwrap();
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.journal().len(), 2);
    }

    #[test]
    fn test_unknown_process_and_bad_shape() {
        let mut ledger = two_by_two();
        assert_eq!(
            ledger.allocate(&pid("Z"), &[1, 1]).unwrap_err(),
            LedgerError::ProcessNotFound(pid("Z"))
        );
        assert!(matches!(
            ledger.release(&pid("A"), &[1]).unwrap_err(),
            LedgerError::ShapeMismatch { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn test_retire_releases_everything() {
        let mut ledger = two_by_two();
        let released = ledger.retire(&pid("A"), 42).unwrap();
        assert_eq!(released, vec![1, 1]);
        assert_eq!(ledger.available(), vec![3, 3]);
        assert_eq!(ledger.process(&pid("A")).unwrap().finish_time, Some(42));
        assert_eq!(ledger.usage().finished_processes, 1);
    }

    // ========================================================================
    // Reassign / snapshot
    // ========================================================================

    #[test]
    fn test_reassign_overwrites_allocations() {
        let mut ledger = two_by_two();
        ledger.reassign(&[vec![3, 1], vec![2, 2]]).unwrap();
        assert_eq!(ledger.allocation_matrix(), vec![vec![3, 1], vec![2, 2]]);
        assert_eq!(ledger.available(), vec![0, 0]);
    }

    #[test]
    fn test_reassign_rejects_over_claim() {
        let mut ledger = two_by_two();
        let before = ledger.snapshot();
        assert!(ledger.reassign(&[vec![5, 0], vec![0, 0]]).is_err());
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_restore_undoes_tentative_apply() {
        let mut ledger = two_by_two();
        let snap = ledger.snapshot();
        ledger.apply_allocation(0, &[2, 1]).unwrap();
        assert_ne!(ledger.snapshot(), snap);
        ledger.restore(snap.clone());
        assert_eq!(ledger.snapshot(), snap);
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_usage_stats() {
        let ledger = two_by_two();
        let usage = ledger.usage();
        assert_eq!(usage.process_count, 2);
        assert_eq!(usage.processes_with_need, 2);
        assert_eq!(usage.resources[0].allocated, 3);
        assert_eq!(usage.resources[0].available, 2);
        let diff = usage.resources[0].utilization - 0.6;
        assert!(diff < 1e-9 && diff > -1e-9);
    }
}
