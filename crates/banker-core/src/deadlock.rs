//! Deadlock detection
//!
//! Two independent modes that are *not* interchangeable:
//!
//! - [`detect_cycle`] searches an externally supplied wait-for graph for a
//!   cycle. It stops at the first cycle and reports the DFS recursion stack at
//!   that point, which may include processes leading into the cycle and does
//!   not enumerate other independent cycles.
//! - [`scan_need_vs_available`] flags every process whose need exceeds current
//!   availability in some dimension. This over-approximates: a flagged process
//!   may still finish once others release. Its report says so.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::types::{first_excess, ProcessId};

/// Wait-for graph: each process maps to the processes it is blocked on.
///
/// Insertion order is kept; it drives the DFS root order. Lookups go through
/// an id index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<(ProcessId, Vec<ProcessId>)>",
    into = "Vec<(ProcessId, Vec<ProcessId>)>"
)]
pub struct WaitForGraph {
    edges: Vec<(ProcessId, Vec<ProcessId>)>,
    index: BTreeMap<ProcessId, usize>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` waits on `to`.
    pub fn add_edge(&mut self, from: impl Into<ProcessId>, to: impl Into<ProcessId>) {
        let slot = self.slot(from.into());
        self.edges[slot].1.push(to.into());
    }

    /// Replace the wait set of `from`.
    pub fn insert(&mut self, from: impl Into<ProcessId>, waits_on: Vec<ProcessId>) {
        let slot = self.slot(from.into());
        self.edges[slot].1 = waits_on;
    }

    fn slot(&mut self, pid: ProcessId) -> usize {
        if let Some(&slot) = self.index.get(&pid) {
            return slot;
        }
        let slot = self.edges.len();
        self.index.insert(pid.clone(), slot);
        self.edges.push((pid, Vec::new()));
        slot
    }

    /// Processes that have an entry, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ProcessId> {
        self.edges.iter().map(|(p, _)| p)
    }

    /// Processes `pid` waits on; empty when it has no entry.
    pub fn waits_on(&self, pid: &ProcessId) -> &[ProcessId] {
        self.index
            .get(pid)
            .map(|&slot| self.edges[slot].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl From<Vec<(ProcessId, Vec<ProcessId>)>> for WaitForGraph {
    fn from(edges: Vec<(ProcessId, Vec<ProcessId>)>) -> Self {
        edges.into_iter().collect()
    }
}

impl From<WaitForGraph> for Vec<(ProcessId, Vec<ProcessId>)> {
    fn from(graph: WaitForGraph) -> Self {
        graph.edges
    }
}

impl FromIterator<(ProcessId, Vec<ProcessId>)> for WaitForGraph {
    fn from_iter<I: IntoIterator<Item = (ProcessId, Vec<ProcessId>)>>(iter: I) -> Self {
        let mut graph = WaitForGraph::new();
        for (from, waits_on) in iter {
            graph.insert(from, waits_on);
        }
        graph
    }
}

/// Which detector produced a report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// DFS cycle search on a wait-for graph
    WaitForGraph,
    /// Need-vs-availability heuristic over a ledger
    ResourceScan,
}

/// Result of a deadlock detection run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockReport {
    pub method: DetectionMethod,
    pub deadlocked: Vec<ProcessId>,
}

impl DeadlockReport {
    pub fn is_deadlocked(&self) -> bool {
        !self.deadlocked.is_empty()
    }

    /// Human-readable summary. Resource-scan reports are labeled as heuristic.
    pub fn message(&self) -> String {
        if self.deadlocked.is_empty() {
            return String::from("No deadlock detected");
        }
        let list = join_pids(&self.deadlocked);
        match self.method {
            DetectionMethod::WaitForGraph => {
                format!("Deadlock detected among processes: [{}]", list)
            }
            DetectionMethod::ResourceScan => format!(
                "Potential deadlock: processes [{}] cannot proceed with current availability \
                 (heuristic need-vs-available scan; may report processes that could finish \
                 after others release)",
                list
            ),
        }
    }
}

fn join_pids(pids: &[ProcessId]) -> String {
    let mut out = String::new();
    for (i, pid) in pids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(pid.as_str());
    }
    out
}

// ============================================================================
// Wait-for-graph mode
// ============================================================================

/// Find the first cycle in a wait-for graph.
///
/// Roots are tried in insertion order. On the first back-edge into the
/// recursion stack, the whole stack is reported. The DFS keeps its own frame
/// stack, so chain length is bounded by memory rather than the thread stack.
pub fn detect_cycle(graph: &WaitForGraph) -> DeadlockReport {
    let mut visited: BTreeSet<&ProcessId> = BTreeSet::new();
    let mut on_stack: BTreeSet<&ProcessId> = BTreeSet::new();
    // (node, index of the next outgoing edge to follow)
    let mut frames: Vec<(&ProcessId, usize)> = Vec::new();

    for root in graph.nodes() {
        if !visited.insert(root) {
            continue;
        }
        on_stack.insert(root);
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (node, edge) = *frame;
            frame.1 += 1;

            match graph.waits_on(node).get(edge) {
                Some(next) if on_stack.contains(next) => {
                    return DeadlockReport {
                        method: DetectionMethod::WaitForGraph,
                        deadlocked: frames.iter().map(|(p, _)| (*p).clone()).collect(),
                    };
                }
                Some(next) => {
                    if visited.insert(next) {
                        on_stack.insert(next);
                        frames.push((next, 0));
                    }
                }
                None => {
                    on_stack.remove(node);
                    frames.pop();
                }
            }
        }
    }

    DeadlockReport {
        method: DetectionMethod::WaitForGraph,
        deadlocked: Vec::new(),
    }
}

// ============================================================================
// Need-vs-availability mode
// ============================================================================

/// Flag every process with `need[i] > available[i]` for some resource.
pub fn scan_need_vs_available(ledger: &Ledger) -> DeadlockReport {
    let available = ledger.available();
    let deadlocked = ledger
        .processes()
        .iter()
        .filter(|p| first_excess(&p.need(), &available).is_some())
        .map(|p| p.pid.clone())
        .collect();

    DeadlockReport {
        method: DetectionMethod::ResourceScan,
        deadlocked,
    }
}
