//! Caller-facing operations
//!
//! Each stateless operation validates its records, builds a fresh ledger and
//! runs one core operation against it. The `*_on` variants work on an
//! existing ledger and are shared with [`crate::SharedLedger`].

use banker_core::{
    allocate_batch as core_allocate_batch, check_safety as core_check_safety, detect_cycle,
    find_starved, scan_need_vs_available, simulate_request as core_simulate_request, Admission,
    BatchOutcome, DeadlockReport, DetectionMethod, EngineConfig, Ledger, ProcessId,
    RequestOutcome, SafetyVerdict,
};
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::error::ServiceError;
use crate::records::{
    AdmissionResponse, BatchResponse, DeadlockInput, DeadlockResponse, FairShareResponse,
    ProcessRecord, ReleaseResponse, RequestRecord, RequestResponse, ResourceRecord,
    SafetyResponse, StarvationResponse,
};
use crate::validate::{build_ledger, graph_from_map, parse_detection, parse_policy, to_requests};

// ============================================================================
// Stateless operations
// ============================================================================

/// Run the Banker's safety check on a described system.
#[instrument(skip_all, fields(processes = processes.len(), resources = resources.len()))]
pub fn check_safety(
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
) -> Result<SafetyResponse, ServiceError> {
    let ledger = build_ledger(processes, resources)?;
    Ok(safety_on(&ledger))
}

/// Decide a single request against a described system.
#[instrument(skip_all, fields(pid = %process_id))]
pub fn simulate_request(
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
    process_id: &str,
    request: &[u32],
) -> Result<RequestResponse, ServiceError> {
    let mut ledger = build_ledger(processes, resources)?;
    request_on(&mut ledger, process_id, request)
}

/// Detect deadlock with the method named in `input.method`.
#[instrument(skip_all, fields(method = %input.method))]
pub fn detect_deadlock(input: &DeadlockInput) -> Result<DeadlockResponse, ServiceError> {
    let report = match parse_detection(&input.method)? {
        DetectionMethod::WaitForGraph => {
            let map = input.wait_for_graph.as_ref().ok_or_else(|| {
                ServiceError::validation("wait_for_graph is required for this method")
            })?;
            detect_cycle(&graph_from_map(map)?)
        }
        DetectionMethod::ResourceScan => {
            let ledger = build_ledger(&input.processes, &input.resources)?;
            scan_need_vs_available(&ledger)
        }
    };
    Ok(deadlock_response(&report))
}

/// Apply a batch policy to a described system.
#[instrument(skip_all, fields(policy = %policy, requests = requests.len()))]
pub fn allocate_batch(
    policy: &str,
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
    requests: &[RequestRecord],
    quantum: Option<u32>,
    config: &EngineConfig,
) -> Result<BatchResponse, ServiceError> {
    let mut ledger = build_ledger(processes, resources)?;
    batch_on(&mut ledger, policy, requests, quantum, config)
}

/// Return held resources to the pool.
#[instrument(skip_all, fields(pid = %process_id))]
pub fn release(
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
    process_id: &str,
    amounts: &[u32],
) -> Result<ReleaseResponse, ServiceError> {
    let mut ledger = build_ledger(processes, resources)?;
    release_on(&mut ledger, process_id, amounts)
}

/// List processes that waited longer than `threshold` and still have need.
#[instrument(skip_all)]
pub fn check_starvation(
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
    threshold: Option<u64>,
    config: &EngineConfig,
) -> Result<StarvationResponse, ServiceError> {
    let ledger = build_ledger(processes, resources)?;
    Ok(starvation_on(
        &ledger,
        threshold.unwrap_or(config.starvation_threshold),
    ))
}

// ============================================================================
// Operations on an existing ledger
// ============================================================================

pub(crate) fn safety_on(ledger: &Ledger) -> SafetyResponse {
    let verdict = core_check_safety(ledger);
    match &verdict {
        SafetyVerdict::Safe { order } => info!(order = ?order, "Safe state"),
        SafetyVerdict::Unsafe => warn!("No safe sequence"),
    }
    SafetyResponse {
        safe: verdict.is_safe(),
        order: verdict
            .order()
            .map(|order| order.iter().map(ProcessId::to_string).collect()),
        message: verdict.message().to_string(),
    }
}

pub(crate) fn request_on(
    ledger: &mut Ledger,
    process_id: &str,
    request: &[u32],
) -> Result<RequestResponse, ServiceError> {
    let outcome = core_simulate_request(ledger, &ProcessId::from(process_id), request)
        .map_err(log_contract_violation)?;

    match &outcome {
        RequestOutcome::Granted => info!(pid = process_id, ?request, "Request granted"),
        RequestOutcome::Denied(reason) => {
            info!(pid = process_id, ?request, reason = reason.tag(), "Request denied")
        }
    }

    Ok(RequestResponse {
        granted: outcome.is_granted(),
        message: outcome.message(),
        reason: match outcome {
            RequestOutcome::Granted => None,
            RequestOutcome::Denied(reason) => Some(reason.tag().to_string()),
        },
    })
}

pub(crate) fn batch_on(
    ledger: &mut Ledger,
    policy: &str,
    requests: &[RequestRecord],
    quantum: Option<u32>,
    config: &EngineConfig,
) -> Result<BatchResponse, ServiceError> {
    let policy = parse_policy(policy, quantum, config)?;
    let outcome = core_allocate_batch(ledger, policy, &to_requests(requests), config)
        .map_err(log_contract_violation)?;

    let starved = outcome.starved();
    if !starved.is_empty() {
        warn!(policy = policy.name(), starved = ?starved, "Round-robin iteration limit reached");
    }

    Ok(match outcome {
        BatchOutcome::Admissions(list) => {
            info!(
                policy = policy.name(),
                granted = list.iter().filter(|a| a.is_granted()).count(),
                attempts = list.len(),
                "Batch processed"
            );
            BatchResponse::Admissions(list.into_iter().map(admission_response).collect())
        }
        BatchOutcome::FairShare(rows) => {
            info!(processes = rows.len(), "Fair share reassigned");
            BatchResponse::FairShare(fair_share_response(rows))
        }
    })
}

pub(crate) fn release_on(
    ledger: &mut Ledger,
    process_id: &str,
    amounts: &[u32],
) -> Result<ReleaseResponse, ServiceError> {
    let pid = ProcessId::from(process_id);
    let Some(process) = ledger.process(&pid) else {
        return Ok(ReleaseResponse {
            success: false,
            message: format!("Process {} not found", pid),
        });
    };
    if amounts.len() != ledger.resource_count() {
        return Err(ServiceError::validation(format!(
            "release has {} entries, expected {}",
            amounts.len(),
            ledger.resource_count()
        )));
    }
    if amounts
        .iter()
        .zip(process.allocated())
        .any(|(give, held)| give > held)
    {
        info!(pid = process_id, ?amounts, "Release refused");
        return Ok(ReleaseResponse {
            success: false,
            message: String::from("Cannot release more than allocated"),
        });
    }

    ledger.release(&pid, amounts).map_err(log_contract_violation)?;
    info!(pid = process_id, ?amounts, "Resources released");

    Ok(ReleaseResponse {
        success: true,
        message: format!("Resources released from {}", pid),
    })
}

pub(crate) fn starvation_on(ledger: &Ledger, threshold: u64) -> StarvationResponse {
    let starved = find_starved(ledger, threshold);
    if !starved.is_empty() {
        warn!(threshold, starved = ?starved, "Starved processes found");
    }
    StarvationResponse {
        starved_processes: starved.iter().map(ProcessId::to_string).collect(),
        threshold,
    }
}

pub(crate) fn deadlock_response(report: &DeadlockReport) -> DeadlockResponse {
    if report.is_deadlocked() {
        warn!(method = ?report.method, processes = ?report.deadlocked, "Deadlock detected");
    }
    DeadlockResponse {
        deadlock_detected: report.is_deadlocked(),
        deadlocked_processes: report.deadlocked.iter().map(ProcessId::to_string).collect(),
        message: report.message(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn admission_response(admission: Admission) -> AdmissionResponse {
    AdmissionResponse {
        pid: admission.pid.to_string(),
        granted: admission.is_granted(),
        reason: admission.denial().map(|r| r.tag().to_string()),
        message: admission.message,
    }
}

fn fair_share_response(rows: Vec<(ProcessId, Vec<u32>)>) -> FairShareResponse {
    let message = if rows.is_empty() {
        String::from("No processes")
    } else {
        format!("Fair share allocation completed for {} processes", rows.len())
    };
    let allocations: Map<String, Value> = rows
        .into_iter()
        .map(|(pid, row)| (pid.to_string(), Value::from(row)))
        .collect();
    FairShareResponse {
        allocations,
        message,
    }
}

fn log_contract_violation(err: banker_core::LedgerError) -> ServiceError {
    let err = ServiceError::from(err);
    if let ServiceError::ContractViolation(inner) = &err {
        error!(error = %inner, "Ledger contract violated");
    }
    err
}
