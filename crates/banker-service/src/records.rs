//! Wire records
//!
//! Input records mirror what callers post; output records are the closed set
//! of result shapes each operation returns.

use banker_core::{Commit, Ledger, UsageStats};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Input records
// ============================================================================

/// A process as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: String,
    pub max_resources: Vec<u32>,
    /// Defaults to all zeros when omitted
    #[serde(default)]
    pub allocated_resources: Option<Vec<u32>>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub arrival_time: u64,
    #[serde(default)]
    pub wait_time: u64,
}

impl ProcessRecord {
    pub fn new(pid: &str, max_resources: Vec<u32>, allocated_resources: Vec<u32>) -> Self {
        Self {
            pid: pid.to_string(),
            max_resources,
            allocated_resources: Some(allocated_resources),
            priority: 0,
            arrival_time: 0,
            wait_time: 0,
        }
    }
}

/// A resource type as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub rid: String,
    pub total_instances: u32,
}

impl ResourceRecord {
    pub fn new(rid: &str, total_instances: u32) -> Self {
        Self {
            rid: rid.to_string(),
            total_instances,
        }
    }
}

/// One pending request in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub pid: String,
    pub request: Vec<u32>,
}

/// Deadlock detection input. `wait_for_graph` is used by the graph mode,
/// `processes`/`resources` by the resource scan.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeadlockInput {
    pub method: String,
    #[serde(default)]
    pub wait_for_graph: Option<Map<String, Value>>,
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

// ============================================================================
// Output records
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyResponse {
    pub safe: bool,
    pub order: Option<Vec<String>>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResponse {
    pub granted: bool,
    pub message: String,
    /// Denial tag (`not_found`, `claim_exceeded`, `insufficient_resources`,
    /// `unsafe_state`, `starvation`); absent when granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockResponse {
    pub deadlock_detected: bool,
    pub deadlocked_processes: Vec<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub pid: String,
    pub granted: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FairShareResponse {
    /// pid -> new allocation, in process order
    pub allocations: Map<String, Value>,
    pub message: String,
}

/// `allocate_batch` result: a list for queueing policies, a mapping for
/// fair-share.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Admissions(Vec<AdmissionResponse>),
    FairShare(FairShareResponse),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarvationResponse {
    pub starved_processes: Vec<String>,
    pub threshold: u64,
}

/// Full view of a retained ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerView {
    pub processes: Vec<ProcessView>,
    pub resources: Vec<ResourceView>,
    pub usage: UsageStats,
    pub safe: bool,
    /// Most recent commits, newest first
    pub recent_commits: Vec<Commit>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessView {
    pub pid: String,
    pub max_resources: Vec<u32>,
    pub allocated_resources: Vec<u32>,
    pub need_resources: Vec<u32>,
    pub priority: i64,
    pub arrival_time: u64,
    pub wait_time: u64,
    pub finish_time: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceView {
    pub rid: String,
    pub total_instances: u32,
    pub available_instances: u32,
}

/// Number of commits included in a `LedgerView`.
const VIEW_RECENT_COMMITS: usize = 50;

impl LedgerView {
    pub fn of(ledger: &Ledger) -> Self {
        Self {
            processes: ledger
                .processes()
                .iter()
                .map(|p| ProcessView {
                    pid: p.pid.to_string(),
                    max_resources: p.max_demand().to_vec(),
                    allocated_resources: p.allocated().to_vec(),
                    need_resources: p.need(),
                    priority: p.priority,
                    arrival_time: p.arrival_time,
                    wait_time: p.wait_time,
                    finish_time: p.finish_time,
                })
                .collect(),
            resources: ledger
                .resources()
                .iter()
                .map(|r| ResourceView {
                    rid: r.rid.to_string(),
                    total_instances: r.total_instances(),
                    available_instances: r.available_instances(),
                })
                .collect(),
            usage: ledger.usage(),
            safe: banker_core::check_safety(ledger).is_safe(),
            recent_commits: ledger
                .journal()
                .get_recent(VIEW_RECENT_COMMITS)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}
