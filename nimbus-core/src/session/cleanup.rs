//! Deferred session cleanup.
//!
//! Stopping the transport and asking the host to quit the app can take
//! seconds, so both run on a spawned task after the main-thread teardown.
//! The task is the only place the admission permit is released.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{Session, SessionShared};
use crate::admission::AdmissionPermit;
use crate::control::ControlPlane;
use crate::state::SessionPhase;
use crate::transport::StreamTransport;
use crate::ui::{SessionUi, UiEvent};

/// Completion of a session's off-thread cleanup.
#[derive(Debug)]
pub struct CleanupHandle {
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Nothing left to do in the background.
    pub(super) fn completed() -> Self {
        Self { task: None }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until the transport is stopped and the admission slot is free.
    pub async fn wait(self) {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                error!("session cleanup task failed: {e}");
            }
        }
    }
}

struct DeferredCleanup {
    session_id: u64,
    quit_app_after: bool,
    shared: Arc<SessionShared>,
    transport: Arc<dyn StreamTransport>,
    control: Arc<dyn ControlPlane>,
    ui: Arc<dyn SessionUi>,
}

impl DeferredCleanup {
    async fn run(self) {
        // Only quit the app if the session ended at the user's request.
        let unexpected = self.shared.unexpected_termination.load(Ordering::SeqCst);
        let should_quit = !unexpected && self.quit_app_after;

        if should_quit {
            self.ui.emit(UiEvent::QuitStarting);
        } else {
            self.ui.emit(UiEvent::SessionFinished);
        }

        let transport = Arc::clone(&self.transport);
        if let Err(e) = tokio::task::spawn_blocking(move || transport.stop_connection()).await {
            error!(session = self.session_id, "stopping transport failed: {e}");
        }

        if should_quit {
            match self.control.quit_app().await {
                Ok(()) => info!(session = self.session_id, "app quit on host"),
                Err(e) => warn!(session = self.session_id, "failed to quit app: {e}"),
            }
            self.ui.emit(UiEvent::SessionFinished);
        }
    }
}

impl Session {
    /// Hand the rest of shutdown to a background task, which releases
    /// `permit` and returns the phase to idle when done.
    pub(super) fn spawn_cleanup(&self, permit: AdmissionPermit) -> CleanupHandle {
        let cleanup = DeferredCleanup {
            session_id: self.id,
            quit_app_after: self.prefs.quit_app_after,
            shared: Arc::clone(&self.shared),
            transport: Arc::clone(&self.transport),
            control: Arc::clone(&self.control),
            ui: Arc::clone(&self.ui),
        };
        let phase: Arc<Mutex<SessionPhase>> = Arc::clone(&self.phase);

        let task = tokio::spawn(async move {
            let session_id = permit.session_id();
            // Nested so a panic in cleanup still frees the slot.
            if let Err(e) = tokio::spawn(cleanup.run()).await {
                error!(session = session_id, "deferred cleanup panicked: {e}");
            }
            permit.release();
            if let Err(e) = phase.lock().finish_cleanup() {
                warn!(session = session_id, "{e}");
            }
        });

        CleanupHandle { task: Some(task) }
    }
}
