//! Ledger Journal
//!
//! Records every committed ledger mutation with a monotonic sequence number.
//! Tentative allocations that are rolled back never reach the journal, so the
//! journal is exactly the history of observable state changes.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::types::{ProcessId, Units};

/// Maximum number of commits to keep in memory
const MAX_JOURNAL_COMMITS: usize = 10000;

/// Commit types - describe ledger mutations for audit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitType {
    /// Instances added to a process's allocation
    Allocated { pid: ProcessId, amounts: Vec<Units> },
    /// Instances returned by a process
    Released { pid: ProcessId, amounts: Vec<Units> },
    /// Allocation overwritten (fair-share)
    Reassigned { pid: ProcessId, allocation: Vec<Units> },
    /// Process released everything it held and finished
    Retired { pid: ProcessId, finish_time: u64 },
}

/// A commit record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Sequence number (monotonic)
    pub seq: u64,
    /// Type of mutation
    pub commit_type: CommitType,
}

/// Append-only journal of ledger commits.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    /// Commit entries (append-only)
    commits: Vec<Commit>,
    /// Next sequence number to assign
    next_seq: u64,
}

impl Journal {
    /// Create a new empty journal.
    pub fn new() -> Self {
        Self {
            commits: Vec::new(),
            next_seq: 0,
        }
    }

    /// Append a commit, returning its sequence number.
    pub fn append(&mut self, commit_type: CommitType) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.commits.push(Commit { seq, commit_type });
        self.trim_if_needed();
        seq
    }

    /// Get all retained commits.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Get commits with `start <= seq < end`.
    pub fn get_range(&self, start: u64, end: u64) -> Vec<&Commit> {
        self.commits
            .iter()
            .filter(|c| c.seq >= start && c.seq < end)
            .collect()
    }

    /// Get the most recent N commits, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&Commit> {
        self.commits.iter().rev().take(count).collect()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Sequence number the next commit will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Trim old commits if exceeding max capacity.
    fn trim_if_needed(&mut self) {
        if self.commits.len() > MAX_JOURNAL_COMMITS {
            let drain_count = self.commits.len() - MAX_JOURNAL_COMMITS;
            self.commits.drain(0..drain_count);
        }
    }
}
