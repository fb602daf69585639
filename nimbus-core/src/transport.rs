//! Streaming transport contract and the callback surface it drives.
//!
//! The transport runs its own threads. Everything in [`ConnectionListener`]
//! and [`VideoRenderer`] may be called from them; only the stage callbacks
//! are guaranteed to run on the thread that called
//! [`StreamTransport::start_connection`].

use std::sync::Arc;

use thiserror::Error;

use crate::audio::AudioBackend;
use crate::decoder::{DecodeStatus, DecodeUnit, VideoCapabilities, VideoFormat};
use crate::host::HostInfo;
use crate::stream::StreamConfiguration;

// ── Stage ────────────────────────────────────────────────────────

/// Connection start-up stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    None,
    PlatformInit,
    RtspHandshake,
    ControlStreamInit,
    VideoStreamInit,
    AudioStreamInit,
    InputStreamInit,
    ControlStreamStart,
    VideoStreamStart,
    AudioStreamStart,
    InputStreamStart,
}

impl Stage {
    const ALL: [Stage; 11] = [
        Stage::None,
        Stage::PlatformInit,
        Stage::RtspHandshake,
        Stage::ControlStreamInit,
        Stage::VideoStreamInit,
        Stage::AudioStreamInit,
        Stage::InputStreamInit,
        Stage::ControlStreamStart,
        Stage::VideoStreamStart,
        Stage::AudioStreamStart,
        Stage::InputStreamStart,
    ];

    /// Human-readable name shown while connecting.
    pub fn name(self) -> &'static str {
        match self {
            Stage::None => "none",
            Stage::PlatformInit => "platform initialization",
            Stage::RtspHandshake => "RTSP handshake",
            Stage::ControlStreamInit => "control stream initialization",
            Stage::VideoStreamInit => "video stream initialization",
            Stage::AudioStreamInit => "audio stream initialization",
            Stage::InputStreamInit => "input stream initialization",
            Stage::ControlStreamStart => "control stream establishment",
            Stage::VideoStreamStart => "video stream establishment",
            Stage::AudioStreamStart => "audio stream establishment",
            Stage::InputStreamStart => "input stream establishment",
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Link quality reported during streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Okay,
    Poor,
}

impl ConnectionStatus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Okay),
            1 => Some(Self::Poor),
            _ => None,
        }
    }
}

// ── Callback traits ──────────────────────────────────────────────

/// Connection-level notifications.
pub trait ConnectionListener: Send + Sync {
    fn stage_starting(&self, stage: Stage);
    fn stage_failed(&self, stage: Stage, error_code: i64);
    fn connection_terminated(&self, error_code: i64);
    fn log_message(&self, message: &str);
    fn rumble(&self, controller: u16, low_freq_motor: u16, high_freq_motor: u16);
    fn connection_status_update(&self, status: ConnectionStatus);
}

/// Video sink.
pub trait VideoRenderer: Send + Sync {
    /// Negotiated stream parameters, reported once before any decode unit.
    fn setup(&self, format: VideoFormat, width: u32, height: u32, frame_rate: u32);

    fn submit_decode_unit(&self, unit: &DecodeUnit) -> DecodeStatus;
}

/// Everything the transport calls back into for one session.
#[derive(Clone)]
pub struct TransportCallbacks {
    pub connection: Arc<dyn ConnectionListener>,
    pub video: Arc<dyn VideoRenderer>,
    pub video_capabilities: VideoCapabilities,
    /// `None` when audio is disabled for the session.
    pub audio: Option<Arc<dyn AudioBackend>>,
}

// ── Transport ────────────────────────────────────────────────────

/// Host details needed to open the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub address: String,
    pub app_version: String,
    /// Absent on hosts too old to report one.
    pub gfe_version: Option<String>,
}

impl From<&HostInfo> for ServerInfo {
    fn from(host: &HostInfo) -> Self {
        Self {
            address: host.active_address.clone(),
            app_version: host.app_version.clone(),
            gfe_version: (!host.gfe_version.is_empty()).then(|| host.gfe_version.clone()),
        }
    }
}

/// Non-zero start result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transport error {0}")]
pub struct TransportError(pub i32);

/// The remote streaming protocol, treated as opaque.
pub trait StreamTransport: Send + Sync {
    /// Blocks until every start-up stage has finished or one has failed.
    fn start_connection(
        &self,
        server: &ServerInfo,
        config: &StreamConfiguration,
        callbacks: TransportCallbacks,
    ) -> Result<(), TransportError>;

    /// Blocking; safe to call after a failed start.
    fn stop_connection(&self);
}
