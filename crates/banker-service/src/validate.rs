//! Input validation
//!
//! Turns caller records into core types. Everything that can be rejected
//! before touching a ledger is rejected here.

use banker_core::{
    DetectionMethod, EngineConfig, Ledger, Policy, Process, ProcessId, Request, Resource,
    WaitForGraph,
};
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::records::{ProcessRecord, RequestRecord, ResourceRecord};

/// Build a ledger from caller records.
///
/// Missing `allocated_resources` means nothing is held yet. Availability is
/// derived as total minus the sum of initial allocations.
pub fn build_ledger(
    processes: &[ProcessRecord],
    resources: &[ResourceRecord],
) -> Result<Ledger, ServiceError> {
    let resources = resources
        .iter()
        .map(|r| {
            if r.rid.is_empty() {
                return Err(ServiceError::validation("resource id must not be empty"));
            }
            Ok(Resource::new(r.rid.as_str(), r.total_instances))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let processes = processes
        .iter()
        .map(|p| {
            if p.pid.is_empty() {
                return Err(ServiceError::validation("process id must not be empty"));
            }
            let allocated = p
                .allocated_resources
                .clone()
                .unwrap_or_else(|| vec![0; p.max_resources.len()]);
            Ok(
                Process::with_allocation(p.pid.as_str(), p.max_resources.clone(), allocated)
                    .priority(p.priority)
                    .arrival_time(p.arrival_time)
                    .wait_time(p.wait_time),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Ledger::new(resources, processes)?)
}

/// Map a policy tag to a core policy.
///
/// `quantum` only applies to `round_robin`; when absent the configured
/// default is used.
pub fn parse_policy(
    tag: &str,
    quantum: Option<u32>,
    config: &EngineConfig,
) -> Result<Policy, ServiceError> {
    match tag {
        "fcfs" => Ok(Policy::Fcfs),
        "priority" => Ok(Policy::Priority),
        "round_robin" => {
            let quantum = quantum.unwrap_or(config.default_quantum);
            if quantum == 0 {
                return Err(ServiceError::validation(
                    "round-robin quantum must be at least 1",
                ));
            }
            Ok(Policy::RoundRobin { quantum })
        }
        "fair_share" => Ok(Policy::FairShare),
        "bankers" => Ok(Policy::Bankers),
        other => Err(ServiceError::validation(format!(
            "Unknown policy: {}",
            other
        ))),
    }
}

/// Map a detection tag to a method. `resource_allocation` is an alias for
/// `resource_scan`.
pub fn parse_detection(tag: &str) -> Result<DetectionMethod, ServiceError> {
    match tag {
        "wait_for_graph" => Ok(DetectionMethod::WaitForGraph),
        "resource_scan" | "resource_allocation" => Ok(DetectionMethod::ResourceScan),
        other => Err(ServiceError::validation(format!(
            "Unknown detection method: {}",
            other
        ))),
    }
}

/// Convert a JSON object `{pid: [pid, ...]}` into a wait-for graph, keeping
/// key order.
pub fn graph_from_map(map: &Map<String, Value>) -> Result<WaitForGraph, ServiceError> {
    let mut graph = WaitForGraph::new();
    for (from, targets) in map {
        let Value::Array(targets) = targets else {
            return Err(ServiceError::validation(format!(
                "wait_for_graph entry for {} must be a list of process ids",
                from
            )));
        };
        let waits_on = targets
            .iter()
            .map(|t| match t {
                Value::String(s) => Ok(ProcessId::from(s.as_str())),
                _ => Err(ServiceError::validation(format!(
                    "wait_for_graph entry for {} contains a non-string id",
                    from
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        graph.insert(from.as_str(), waits_on);
    }
    Ok(graph)
}

pub fn to_requests(records: &[RequestRecord]) -> Vec<Request> {
    records
        .iter()
        .map(|r| Request::new(r.pid.as_str(), r.request.clone()))
        .collect()
}
