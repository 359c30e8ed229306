//! Ledger integration tests
//!
//! Classic Banker's scenarios plus the bookkeeping properties every operation
//! must preserve.

use banker_core::{
    allocate_batch, assert_invariants, check_all_invariants, check_safety, replay_order,
    scan_need_vs_available, simulate_request, BatchOutcome, DenialReason, EngineConfig, Ledger,
    Policy, Process, ProcessId, Request, RequestOutcome, Resource, SafetyVerdict,
};

fn pid(s: &str) -> ProcessId {
    ProcessId::from(s)
}

fn pids(names: &[&str]) -> Vec<ProcessId> {
    names.iter().map(|&n| ProcessId::from(n)).collect()
}

/// Five processes, three resource types, totals [10, 5, 7].
fn classic_ledger() -> Ledger {
    Ledger::new(
        vec![
            Resource::new("A", 10),
            Resource::new("B", 5),
            Resource::new("C", 7),
        ],
        vec![
            Process::with_allocation("P1", vec![7, 5, 3], vec![0, 1, 0]),
            Process::with_allocation("P2", vec![3, 2, 2], vec![2, 0, 0]),
            Process::with_allocation("P3", vec![9, 0, 2], vec![3, 0, 2]),
            Process::with_allocation("P4", vec![2, 2, 2], vec![2, 1, 1]),
            Process::with_allocation("P5", vec![4, 3, 3], vec![0, 0, 2]),
        ],
    )
    .unwrap()
}

// ============================================================================
// Scenario A: classic safe state
// ============================================================================

#[test]
fn test_classic_state_is_safe() {
    let ledger = classic_ledger();
    assert_eq!(ledger.available(), vec![3, 3, 2]);

    let verdict = check_safety(&ledger);
    assert_eq!(
        verdict,
        SafetyVerdict::Safe {
            order: pids(&["P2", "P4", "P1", "P3", "P5"])
        }
    );
    assert!(replay_order(&ledger, verdict.order().unwrap()));
}

#[test]
fn test_check_safety_is_idempotent_and_deterministic() {
    let ledger = classic_ledger();
    let first = check_safety(&ledger);
    let second = check_safety(&ledger);
    assert_eq!(first, second);

    let rebuilt = classic_ledger();
    assert_eq!(check_safety(&rebuilt), first);
}

// ============================================================================
// Scenario B: request from the first process
// ============================================================================

#[test]
fn test_first_process_request_is_unsafe() {
    let mut ledger = classic_ledger();
    let before = ledger.snapshot();

    // Fits need [7,4,3] and availability [3,3,2], but leaves [2,3,0]
    // from which no process can finish.
    let outcome = simulate_request(&mut ledger, &pid("P1"), &[1, 0, 2]).unwrap();
    assert_eq!(outcome, RequestOutcome::Denied(DenialReason::UnsafeState));
    assert_eq!(outcome.message(), "Request would lead to unsafe state");

    assert_eq!(ledger.available(), vec![3, 3, 2]);
    assert_eq!(ledger.snapshot(), before);
    assert!(ledger.journal().is_empty());
}

#[test]
fn test_second_process_request_is_granted() {
    let mut ledger = classic_ledger();

    let outcome = simulate_request(&mut ledger, &pid("P2"), &[1, 0, 2]).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted);
    assert_eq!(ledger.available(), vec![2, 3, 0]);
    assert_eq!(ledger.need(&pid("P2")), Some(vec![0, 2, 0]));

    let verdict = check_safety(&ledger);
    assert_eq!(verdict.order().unwrap(), pids(&["P2", "P4", "P1", "P3", "P5"]).as_slice());
    assert_invariants(&ledger);
}

#[test]
fn test_request_beyond_availability_after_grant() {
    let mut ledger = classic_ledger();
    simulate_request(&mut ledger, &pid("P2"), &[1, 0, 2]).unwrap();

    // P5 needs [4,3,1]; only 2 instances of A remain
    let outcome = simulate_request(&mut ledger, &pid("P5"), &[3, 3, 0]).unwrap();
    assert_eq!(outcome, RequestOutcome::Denied(DenialReason::InsufficientResources));
    assert_eq!(ledger.available(), vec![2, 3, 0]);
}

// ============================================================================
// Scenario C: FCFS on a two-by-two system
// ============================================================================

#[test]
fn test_fcfs_grants_earlier_arrival_only() {
    let mut ledger = Ledger::new(
        vec![Resource::new("R0", 1), Resource::new("R1", 1)],
        vec![
            Process::new("Second", vec![1, 1]).arrival_time(2),
            Process::new("First", vec![1, 1]).arrival_time(1),
        ],
    )
    .unwrap();
    let requests = vec![
        Request::new("Second", vec![1, 1]),
        Request::new("First", vec![1, 1]),
    ];

    let outcome =
        allocate_batch(&mut ledger, Policy::Fcfs, &requests, &EngineConfig::default()).unwrap();
    let BatchOutcome::Admissions(list) = outcome else {
        panic!("Expected admissions");
    };

    assert_eq!(list[0].pid, pid("First"));
    assert!(list[0].is_granted());
    assert_eq!(list[1].pid, pid("Second"));
    assert_eq!(list[1].denial(), Some(&DenialReason::InsufficientResources));
    assert_eq!(ledger.available(), vec![0, 0]);
    assert_invariants(&ledger);
}

// ============================================================================
// Scenario D: fair-share remainder distribution
// ============================================================================

#[test]
fn test_fair_share_distributes_remainder_in_input_order() {
    let mut ledger = Ledger::new(
        vec![Resource::new("R0", 10)],
        vec![
            Process::new("X", vec![10]),
            Process::new("Y", vec![10]),
            Process::new("Z", vec![10]),
        ],
    )
    .unwrap();

    let outcome =
        allocate_batch(&mut ledger, Policy::FairShare, &[], &EngineConfig::default()).unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::FairShare(vec![
            (pid("X"), vec![4]),
            (pid("Y"), vec![3]),
            (pid("Z"), vec![3]),
        ])
    );
    assert_eq!(ledger.available(), vec![0]);
    assert_invariants(&ledger);
}

#[test]
fn test_fair_share_replaces_existing_allocations() {
    let mut ledger = classic_ledger();
    allocate_batch(&mut ledger, Policy::FairShare, &[], &EngineConfig::default()).unwrap();

    // A: 10/5 = 2 each; B: 5/5 = 1 each (P3 claims 0); C: 7/5 = 1 rem 2
    assert_eq!(
        ledger.allocation_matrix(),
        vec![
            vec![2, 1, 2],
            vec![2, 1, 2],
            vec![2, 0, 1],
            vec![2, 1, 1],
            vec![2, 1, 1],
        ]
    );
    assert_eq!(ledger.available(), vec![0, 1, 0]);
    assert_invariants(&ledger);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_allocate_release_round_trip() {
    let mut ledger = classic_ledger();
    let before = ledger.snapshot();

    ledger.allocate(&pid("P5"), &[3, 3, 1]).unwrap();
    assert_ne!(ledger.snapshot(), before);
    ledger.release(&pid("P5"), &[3, 3, 1]).unwrap();

    assert_eq!(ledger.snapshot(), before);
    assert_eq!(ledger.available(), vec![3, 3, 2]);
}

#[test]
fn test_resource_scan_reports_heuristic_result() {
    let ledger = classic_ledger();
    // Safe state, yet P1, P3 and P5 need more than is available right now
    let report = scan_need_vs_available(&ledger);
    assert_eq!(report.deadlocked, pids(&["P1", "P3", "P5"]));
    assert!(report.message().contains("heuristic"));
    assert!(check_safety(&ledger).is_safe());
}

/// Small deterministic generator so the sequence is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

#[test]
fn test_invariants_hold_across_random_operations() {
    let mut rng = Lcg(0x5eed);
    let config = EngineConfig {
        round_robin_iteration_limit: 64,
        ..EngineConfig::default()
    };

    for _ in 0..50 {
        let mut ledger = classic_ledger();
        for _ in 0..40 {
            let who = pid(&format!("P{}", rng.below(6) + 1)); // P6 does not exist
            let amounts: Vec<u32> = (0..3).map(|_| rng.below(4) as u32).collect();

            match rng.below(5) {
                0 => {
                    // Contract violations are expected here; they must not mutate
                    let before = ledger.snapshot();
                    if ledger.allocate(&who, &amounts).is_err() {
                        assert_eq!(ledger.snapshot(), before);
                    }
                }
                1 => {
                    let before = ledger.snapshot();
                    if ledger.release(&who, &amounts).is_err() {
                        assert_eq!(ledger.snapshot(), before);
                    }
                }
                2 => {
                    let before = ledger.snapshot();
                    let outcome = simulate_request(&mut ledger, &who, &amounts).unwrap();
                    if !outcome.is_granted() {
                        assert_eq!(ledger.snapshot(), before);
                    }
                }
                3 => {
                    let policy = match rng.below(3) {
                        0 => Policy::Fcfs,
                        1 => Policy::Priority,
                        _ => Policy::RoundRobin { quantum: 2 },
                    };
                    let requests = vec![Request::new(who.clone(), amounts.clone())];
                    allocate_batch(&mut ledger, policy, &requests, &config).unwrap();
                }
                _ => {
                    let first = check_safety(&ledger);
                    assert_eq!(check_safety(&ledger), first);
                    if let Some(order) = first.order() {
                        assert!(replay_order(&ledger, order));
                    }
                }
            }

            let violations = check_all_invariants(&ledger);
            assert!(violations.is_empty(), "Violations: {:?}", violations);
            for p in ledger.processes() {
                for (held, max) in p.allocated().iter().zip(p.max_demand()) {
                    assert!(held <= max);
                }
            }
        }
    }
}
