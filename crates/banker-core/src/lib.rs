//! Banker Core - Pure Resource Ledger State Machine
//!
//! This crate contains the **pure, I/O-free** resource allocation ledger and
//! the algorithms that decide whether allocation decisions can deadlock.
//!
//! # Design Principles
//!
//! 1. **No I/O or side effects**: Pure state transformations only
//! 2. **Deterministic**: Same input always produces same output
//! 3. **All-or-nothing mutation**: No resource dimension is ever partially applied
//! 4. **Denials are values**: Only ledger contract violations are errors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       banker-core                           │
//! │                                                             │
//! │   ┌───────────────┐  read   ┌───────────────┐              │
//! │   │    Ledger     │────────▶│ check_safety  │              │
//! │   │  - processes  │         │ detect_cycle  │              │
//! │   │  - resources  │         │ scan_need_... │              │
//! │   │  - journal    │         └───────────────┘              │
//! │   └───────────────┘                                         │
//! │          ▲ snapshot / commit / restore                      │
//! │   ┌──────┴────────┐         ┌───────────────┐              │
//! │   │ simulate_req. │◀────────│ allocate_batch│              │
//! │   └───────────────┘         │  (policies)   │              │
//! │                             └───────────────┘              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              │ used by
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     banker-service                          │
//! │   - input validation, result records, per-ledger locking    │
//! │   - tracing                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Process, Resource and identifier types
//! - `ledger` - The Ledger: allocate, release, snapshot/restore
//! - `safety` - Banker's Algorithm safety check
//! - `deadlock` - Wait-for-graph and need-vs-availability detection
//! - `request` - Transactional single-request admission
//! - `policy` - Batch allocation policies and starvation check
//! - `invariants` - Runtime-checkable ledger invariants
//! - `journal` - Append-only record of committed mutations
//! - `config` - Engine tunables
//! - `error` - Ledger error type

#![no_std]
extern crate alloc;

pub mod config;
pub mod deadlock;
pub mod error;
pub mod invariants;
pub mod journal;
pub mod ledger;
pub mod policy;
pub mod request;
pub mod safety;
pub mod types;

// Re-export all public types for convenient access
pub use config::EngineConfig;
pub use deadlock::{
    detect_cycle, scan_need_vs_available, DeadlockReport, DetectionMethod, WaitForGraph,
};
pub use error::LedgerError;
pub use invariants::{assert_invariants, check_all_invariants, InvariantViolation};
pub use journal::{Commit, CommitType, Journal};
pub use ledger::{Ledger, LedgerSnapshot, ResourceUsage, UsageStats};
pub use policy::{allocate_batch, find_starved, Admission, BatchOutcome, Decision, Policy, Request};
pub use request::{simulate_request, DenialReason, RequestOutcome};
pub use safety::{check_safety, replay_order, SafetyVerdict};
pub use types::{Process, ProcessId, Resource, ResourceId, Units};
