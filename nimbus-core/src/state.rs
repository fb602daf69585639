//! Session lifecycle state machine.
//!
//! `SessionPhase` models one streaming attempt from start-up to the end of
//! its deferred cleanup, with validated transitions that return `Result`
//! instead of panicking.

use std::time::{Duration, Instant};

use crate::error::SessionError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a streaming session.
///
/// ```text
///  Idle ─► Initializing ─► Validating ─► AwaitingPriorSession ─► Launching
///   ▲           │              │                                    │
///   │           │              │                                    ▼
///   │           │              │         Active ◄─ TransportStarting
///   │           │              │           │              │
///   │           ▼              ▼           ▼              │
///   └──── CleaningUp ◄───────────── Terminating           │
///               ▲                                         │
///               └─────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Not started, or fully cleaned up.
    #[default]
    Idle,

    /// Video subsystem up; building the stream configuration.
    Initializing,

    /// Running launch checks.
    Validating,

    /// Waiting for the previous session's cleanup to release admission.
    AwaitingPriorSession,

    /// Launch/resume request in flight.
    Launching,

    /// Transport connection being started.
    TransportStarting,

    /// Streaming; the event loop is running.
    Active {
        /// When the session entered the `Active` state.
        since: Instant,
    },

    /// Quit observed; tearing down the event loop.
    Terminating,

    /// Deferred cleanup scheduled or running.
    CleaningUp,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Validating => write!(f, "Validating"),
            Self::AwaitingPriorSession => write!(f, "AwaitingPriorSession"),
            Self::Launching => write!(f, "Launching"),
            Self::TransportStarting => write!(f, "TransportStarting"),
            Self::Active { .. } => write!(f, "Active"),
            Self::Terminating => write!(f, "Terminating"),
            Self::CleaningUp => write!(f, "CleaningUp"),
        }
    }
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// How long the session has been streaming.
    ///
    /// Returns `None` for any other phase.
    pub fn active_duration(&self) -> Option<Duration> {
        match self {
            Self::Active { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    fn advance(
        &mut self,
        from: impl Fn(&Self) -> bool,
        to: Self,
        err: &'static str,
    ) -> Result<(), SessionError> {
        if from(self) {
            *self = to;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition(err))
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Idle`.
    pub fn begin_initialize(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::Idle),
            Self::Initializing,
            "cannot initialize: not in Idle state",
        )
    }

    /// Valid from: `Initializing`.
    pub fn begin_validation(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::Initializing),
            Self::Validating,
            "cannot validate: not in Initializing state",
        )
    }

    /// Valid from: `Validating`.
    pub fn await_admission(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::Validating),
            Self::AwaitingPriorSession,
            "cannot await admission: not in Validating state",
        )
    }

    /// Valid from: `AwaitingPriorSession`.
    pub fn begin_launch(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::AwaitingPriorSession),
            Self::Launching,
            "cannot launch: admission not granted",
        )
    }

    /// Valid from: `Launching`.
    pub fn begin_transport(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::Launching),
            Self::TransportStarting,
            "cannot start transport: not in Launching state",
        )
    }

    /// Valid from: `TransportStarting`.
    pub fn activate(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::TransportStarting),
            Self::Active {
                since: Instant::now(),
            },
            "cannot activate: transport not starting",
        )
    }

    /// Valid from: `Active`.
    pub fn begin_termination(&mut self) -> Result<(), SessionError> {
        self.advance(
            Self::is_active,
            Self::Terminating,
            "cannot terminate: not in Active state",
        )
    }

    /// Valid from: `Terminating`, or any pre-active phase on failure.
    pub fn begin_cleanup(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| {
                matches!(
                    p,
                    Self::Initializing
                        | Self::Validating
                        | Self::AwaitingPriorSession
                        | Self::Launching
                        | Self::TransportStarting
                        | Self::Terminating
                )
            },
            Self::CleaningUp,
            "cannot clean up: session active or idle",
        )
    }

    /// Valid from: `CleaningUp`.
    pub fn finish_cleanup(&mut self) -> Result<(), SessionError> {
        self.advance(
            |p| matches!(p, Self::CleaningUp),
            Self::Idle,
            "cannot finish cleanup: not in CleaningUp state",
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────
