//! Retained ledgers addressed by session id
//!
//! The registry lock only guards the id map. Each ledger carries its own
//! lock inside [`SharedLedger`], so sessions never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use banker_service::SharedLedger;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Debug)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SharedLedger>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
        }
    }

    pub fn create(&self, ledger: SharedLedger) -> Result<Uuid, ApiError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(ApiError::SessionLimit(self.max_sessions));
        }
        let id = Uuid::new_v4();
        sessions.insert(id, ledger);
        info!(session = %id, open = sessions.len(), "Session created");
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedLedger, ApiError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound(id))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write();
        sessions.remove(&id).ok_or(ApiError::SessionNotFound(id))?;
        info!(session = %id, open = sessions.len(), "Session closed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
