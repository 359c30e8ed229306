//! Retained, lock-protected ledger
//!
//! Every operation takes the ledger's lock once and holds it for the whole
//! check-then-commit sequence, so a concurrent caller never observes or
//! commits against a tentative state.

use std::sync::Arc;

use banker_core::{EngineConfig, Ledger, ProcessId};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::ServiceError;
use crate::ops::{
    batch_on, deadlock_response, release_on, request_on, safety_on, starvation_on,
};
use crate::records::{
    BatchResponse, DeadlockResponse, LedgerView, ProcessRecord, ReleaseResponse, RequestRecord,
    RequestResponse, ResourceRecord, SafetyResponse, StarvationResponse,
};
use crate::validate::build_ledger;

/// A ledger shared between callers.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
    config: EngineConfig,
}

impl SharedLedger {
    pub fn new(ledger: Ledger, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            config,
        }
    }

    /// Validate the records and wrap the resulting ledger.
    pub fn from_records(
        processes: &[ProcessRecord],
        resources: &[ResourceRecord],
        config: EngineConfig,
    ) -> Result<Self, ServiceError> {
        let ledger = build_ledger(processes, resources)?;
        info!(
            processes = ledger.process_count(),
            resources = ledger.resource_count(),
            "Ledger created"
        );
        Ok(Self::new(ledger, config))
    }

    pub fn check_safety(&self) -> SafetyResponse {
        safety_on(&self.inner.lock())
    }

    pub fn simulate_request(
        &self,
        process_id: &str,
        request: &[u32],
    ) -> Result<RequestResponse, ServiceError> {
        let mut ledger = self.inner.lock();
        request_on(&mut ledger, process_id, request)
    }

    pub fn allocate_batch(
        &self,
        policy: &str,
        requests: &[RequestRecord],
        quantum: Option<u32>,
    ) -> Result<BatchResponse, ServiceError> {
        let mut ledger = self.inner.lock();
        batch_on(&mut ledger, policy, requests, quantum, &self.config)
    }

    pub fn release(
        &self,
        process_id: &str,
        amounts: &[u32],
    ) -> Result<ReleaseResponse, ServiceError> {
        let mut ledger = self.inner.lock();
        release_on(&mut ledger, process_id, amounts)
    }

    /// Mark a process finished and return everything it holds.
    ///
    /// Returns `None` when the process is not in the ledger.
    pub fn retire(&self, process_id: &str, finish_time: u64) -> Option<Vec<u32>> {
        let mut ledger = self.inner.lock();
        let returned = ledger
            .retire(&ProcessId::from(process_id), finish_time)
            .ok()?;
        debug!(pid = process_id, ?returned, "Process retired");
        Some(returned)
    }

    /// Need-vs-availability scan over the current state.
    pub fn scan(&self) -> DeadlockResponse {
        deadlock_response(&banker_core::scan_need_vs_available(&self.inner.lock()))
    }

    pub fn starvation(&self, threshold: Option<u64>) -> StarvationResponse {
        let threshold = threshold.unwrap_or(self.config.starvation_threshold);
        starvation_on(&self.inner.lock(), threshold)
    }

    pub fn view(&self) -> LedgerView {
        LedgerView::of(&self.inner.lock())
    }

    /// Run `f` with the ledger locked.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock())
    }
}
