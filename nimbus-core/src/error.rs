//! Domain-specific error types for the streaming session core.
//!
//! Every fallible operation returns `Result<T, SessionError>`. Nothing
//! escapes [`Session::exec`](crate::session::Session::exec): failures are
//! routed to teardown and reported through UI events instead.

use thiserror::Error;

/// The canonical error type for the session core.
#[derive(Debug, Error)]
pub enum SessionError {
    // ── Start-up Errors ──────────────────────────────────────────
    /// The platform video subsystem could not be initialised.
    #[error("video subsystem initialisation failed: {0}")]
    VideoSubsystem(PlatformError),

    /// The hidden window used for decoder probing could not be created.
    #[error("failed to create window for hardware decode test: {0}")]
    ProbeWindow(PlatformError),

    /// A fatal launch-validation check failed.
    #[error("launch validation failed: {0}")]
    Validation(String),

    /// The host rejected or failed the launch/resume request.
    #[error("launch failed: {0}")]
    Launch(#[from] ControlError),

    /// The streaming transport returned a non-zero start code.
    #[error("transport start failed with code {code}")]
    TransportStart { code: i32 },

    /// The stream window could not be created.
    #[error("stream window creation failed: {0}")]
    WindowCreation(PlatformError),

    // ── Runtime Errors ───────────────────────────────────────────
    /// No compiled-in decoder initialised for the requested parameters.
    #[error("no video decoder could be initialised")]
    DecoderUnavailable,

    /// A lifecycle transition was attempted from the wrong phase.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── ControlError ─────────────────────────────────────────────────

/// Failure reported by the host control-plane client.
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    /// The host answered with an error status.
    #[error("host returned error {code}: {message}")]
    HostResponse { code: i32, message: String },

    /// The request never produced a host answer.
    #[error("network error: {0}")]
    Network(String),
}

impl ControlError {
    /// Text shown to the user when a launch fails with this error.
    pub fn user_message(&self) -> String {
        match self {
            ControlError::HostResponse { message, .. } => {
                format!("Host returned error: {message}")
            }
            ControlError::Network(detail) => detail.clone(),
        }
    }
}

// ── PlatformError ────────────────────────────────────────────────

/// Window-system failure reported by a [`Platform`](crate::platform::Platform).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for SessionError {
    fn from(s: String) -> Self {
        SessionError::Other(s)
    }
}

impl From<&str> for SessionError {
    fn from(s: &str) -> Self {
        SessionError::Other(s.to_string())
    }
}
