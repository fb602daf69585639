//! Single-active-session admission.
//!
//! A session must hold an [`AdmissionPermit`] from the moment it starts
//! launching until its deferred cleanup has finished. The permit is handed
//! to the cleanup task, which calls [`AdmissionPermit::release`] as its
//! completion hook; that is the only place a permit goes back.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::SessionError;

/// The admission slot. Clone it into every session of the process.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    active: Arc<Mutex<Option<u64>>>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            active: Arc::new(Mutex::new(None)),
        }
    }
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other session holds the slot, then take it.
    pub async fn acquire(&self, session_id: u64) -> Result<AdmissionPermit, SessionError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SessionError::Other("admission gate closed".into()))?;

        *self.active.lock() = Some(session_id);
        debug!(session_id, "admission slot acquired");
        Ok(AdmissionPermit {
            permit,
            active: Arc::clone(&self.active),
            session_id,
        })
    }

    /// Id of the session currently holding the slot.
    pub fn active_session(&self) -> Option<u64> {
        *self.active.lock()
    }

    pub fn is_free(&self) -> bool {
        self.semaphore.available_permits() == 1
    }
}

/// Proof of admission. Not `Clone`: exactly one release per acquire.
#[derive(Debug)]
pub struct AdmissionPermit {
    permit: OwnedSemaphorePermit,
    active: Arc<Mutex<Option<u64>>>,
    session_id: u64,
}

impl AdmissionPermit {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Clear the active-session reference and hand the slot to the next
    /// waiting session.
    pub fn release(self) {
        {
            let mut active = self.active.lock();
            if *active == Some(self.session_id) {
                *active = None;
            }
        }
        debug!(session_id = self.session_id, "admission slot released");
        drop(self.permit);
    }
}
