//! Banker Service - caller-facing layer over `banker-core`
//!
//! Validates caller records, runs the core algorithms, and turns their
//! results into the fixed set of response records. Ledgers retained between
//! calls live behind [`SharedLedger`], which serializes every operation on
//! one ledger.
//!
//! # Operations
//!
//! | Operation          | Input                                      | Result               |
//! |--------------------|--------------------------------------------|----------------------|
//! | `check_safety`     | processes, resources                       | `SafetyResponse`     |
//! | `simulate_request` | processes, resources, pid, request         | `RequestResponse`    |
//! | `detect_deadlock`  | method tag + graph or processes/resources  | `DeadlockResponse`   |
//! | `allocate_batch`   | policy tag, processes, resources, requests | `BatchResponse`      |
//! | `release`          | processes, resources, pid, release         | `ReleaseResponse`    |
//! | `check_starvation` | processes, resources, threshold            | `StarvationResponse` |
//!
//! Denials are returned inside the records. `ServiceError` is reserved for
//! malformed input and ledger contract violations.

mod error;
mod ops;
mod records;
mod shared;
mod validate;

pub use error::ServiceError;
pub use ops::{
    allocate_batch, check_safety, check_starvation, detect_deadlock, release, simulate_request,
};
pub use records::{
    AdmissionResponse, BatchResponse, DeadlockInput, DeadlockResponse, FairShareResponse,
    LedgerView, ProcessRecord, ProcessView, ReleaseResponse, RequestRecord, RequestResponse,
    ResourceRecord, ResourceView, SafetyResponse, StarvationResponse,
};
pub use shared::SharedLedger;
pub use validate::{build_ledger, parse_detection, parse_policy};

pub use banker_core::EngineConfig;
