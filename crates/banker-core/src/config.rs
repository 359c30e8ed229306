//! Engine tunables

use serde::{Deserialize, Serialize};

use crate::types::Units;

/// Default round-robin dequeue bound before remaining requests are reported starved.
pub const DEFAULT_ROUND_ROBIN_ITERATION_LIMIT: usize = 1024;

/// Default round-robin quantum (instances granted per dimension per turn).
pub const DEFAULT_QUANTUM: Units = 1;

/// Default wait-time threshold for the starvation check.
pub const DEFAULT_STARVATION_THRESHOLD: u64 = 100;

/// Tunables shared by the allocation policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of round-robin dequeues in one batch
    pub round_robin_iteration_limit: usize,
    /// Quantum used when a caller does not supply one
    pub default_quantum: Units,
    /// Wait time above which a process with unmet need counts as starved
    pub starvation_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_robin_iteration_limit: DEFAULT_ROUND_ROBIN_ITERATION_LIMIT,
            default_quantum: DEFAULT_QUANTUM,
            starvation_threshold: DEFAULT_STARVATION_THRESHOLD,
        }
    }
}
