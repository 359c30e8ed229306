//! Core ledger types
//!
//! This module contains the value types the ledger is built from.
//! All types here are pure data - mutation of allocations happens only
//! through the `Ledger`.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Instance count of a single resource type
pub type Units = u32;

/// Process identifier
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl ProcessId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(s: &str) -> Self {
        Self(String::from(s))
    }
}

impl From<String> for ProcessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Resource type identifier
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(String::from(s))
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Process descriptor
///
/// `max_demand` is fixed at creation. `allocated` is only changed by the
/// ledger, which keeps `allocated[i] <= max_demand[i]` for every resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process ID
    pub pid: ProcessId,
    /// Maximum claim per resource type
    pub(crate) max_demand: Vec<Units>,
    /// Currently held instances per resource type
    pub(crate) allocated: Vec<Units>,
    /// Scheduling priority (higher is served first)
    pub priority: i64,
    /// Arrival time used by first-come-first-served ordering
    pub arrival_time: u64,
    /// Accumulated time spent with unmet need
    pub wait_time: u64,
    /// Set once the process has retired
    pub finish_time: Option<u64>,
}

impl Process {
    /// Create a process holding nothing.
    pub fn new(pid: impl Into<ProcessId>, max_demand: Vec<Units>) -> Self {
        let allocated = vec![0; max_demand.len()];
        Self::with_allocation(pid, max_demand, allocated)
    }

    /// Create a process with an initial allocation.
    ///
    /// Shape and bounds are checked when the process is admitted to a ledger.
    pub fn with_allocation(
        pid: impl Into<ProcessId>,
        max_demand: Vec<Units>,
        allocated: Vec<Units>,
    ) -> Self {
        Self {
            pid: pid.into(),
            max_demand,
            allocated,
            priority: 0,
            arrival_time: 0,
            wait_time: 0,
            finish_time: None,
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn arrival_time(mut self, arrival_time: u64) -> Self {
        self.arrival_time = arrival_time;
        self
    }

    pub fn wait_time(mut self, wait_time: u64) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Maximum claim per resource type
    pub fn max_demand(&self) -> &[Units] {
        &self.max_demand
    }

    /// Currently held instances per resource type
    pub fn allocated(&self) -> &[Units] {
        &self.allocated
    }

    /// Remaining claim: `max_demand - allocated`, per resource type.
    pub fn need(&self) -> Vec<Units> {
        self.max_demand
            .iter()
            .zip(&self.allocated)
            .map(|(&max, &held)| max.saturating_sub(held))
            .collect()
    }

    /// True if the process still has unmet need in some dimension.
    pub fn has_need(&self) -> bool {
        self.max_demand
            .iter()
            .zip(&self.allocated)
            .any(|(&max, &held)| held < max)
    }
}

/// Resource descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource ID
    pub rid: ResourceId,
    /// Total instances, fixed at creation
    pub(crate) total_instances: Units,
    /// Instances not held by any process
    pub(crate) available_instances: Units,
}

impl Resource {
    /// Create a resource with all instances available.
    pub fn new(rid: impl Into<ResourceId>, total_instances: Units) -> Self {
        Self {
            rid: rid.into(),
            total_instances,
            available_instances: total_instances,
        }
    }

    pub fn total_instances(&self) -> Units {
        self.total_instances
    }

    pub fn available_instances(&self) -> Units {
        self.available_instances
    }
}

// ============================================================================
// Vector helpers
// ============================================================================

/// Componentwise `lhs <= rhs`.
pub(crate) fn fits_within(lhs: &[Units], rhs: &[Units]) -> bool {
    lhs.iter().zip(rhs).all(|(l, r)| l <= r)
}

/// First dimension where `lhs > rhs`, if any.
pub(crate) fn first_excess(lhs: &[Units], rhs: &[Units]) -> Option<usize> {
    lhs.iter().zip(rhs).position(|(l, r)| l > r)
}
