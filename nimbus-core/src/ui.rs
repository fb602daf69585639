//! Signals the session raises towards the hosting UI.

use tokio::sync::mpsc;

/// Presentation-level notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    StageStarting(String),
    StageFailed { stage: String, code: i64 },
    /// Non-fatal, shown as a toast.
    LaunchWarning(String),
    /// Fatal, shown as a dialog.
    LaunchError(String),
    ConnectionStarted,
    QuitStarting,
    SessionFinished,
}

/// Receiver of [`UiEvent`]s. Called from the main thread, the transport
/// callback thread and the cleanup task.
pub trait SessionUi: Send + Sync {
    fn emit(&self, event: UiEvent);

    /// Let the UI process queued work while the session holds the main
    /// thread (pacing waits, stage callbacks).
    fn process_pending(&self) {}

    /// Periodic presence/status callbacks, run on idle event-loop ticks.
    fn presence_tick(&self) {}
}

/// [`SessionUi`] that forwards every event into a channel.
#[derive(Debug, Clone)]
pub struct ChannelUi {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelUi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionUi for ChannelUi {
    fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}
