//! # nimbus-core
//!
//! Session core for the nimbus game-streaming client.
//!
//! A [`Session`] negotiates a stream with a host, launches (or resumes) the
//! app, starts the transport, and runs the local event loop that feeds
//! decoded video to a window and local input back to the host.
//!
//! This crate contains:
//! - **Session**: `Session`, `SessionHandle`, `CleanupHandle` and the
//!   single-session `AdmissionGate`
//! - **Negotiation**: `StreamConfigBuilder`, `LaunchValidator` and the
//!   `StreamConfiguration` they produce
//! - **Decoding**: `DecoderSelector` and the lock-guarded `DecoderSlot`
//! - **Contracts**: `Platform`, `StreamTransport`, `ControlPlane`,
//!   `AudioBackend`, `InputBackend` and `SessionUi` for the outer layers
//! - **Callbacks**: `SessionCallbacks` and the C tables in [`ffi`]
//! - **State**: the `SessionPhase` lifecycle machine
//! - **Error**: `SessionError`, typed with `thiserror`

pub mod admission;
pub mod audio;
pub mod callbacks;
pub mod config;
pub mod control;
pub mod decoder;
pub mod error;
pub mod ffi;
pub mod host;
pub mod input;
pub mod logging;
pub mod overlay;
pub mod platform;
pub mod preferences;
pub mod session;
pub mod state;
pub mod stream;
pub mod transport;
pub mod ui;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use admission::{AdmissionGate, AdmissionPermit};
pub use audio::{AudioBackend, AudioConfiguration};
pub use callbacks::{SessionCallbacks, VideoStreamDescriptor};
pub use config::{ClientConfig, LoggingConfig, SessionTiming};
pub use control::ControlPlane;
pub use decoder::{
    DecodeStatus, DecodeUnit, DecoderBackend, DecoderCapabilities, DecoderInitError,
    DecoderParams, DecoderSelector, DecoderSlot, FrameType, VideoCapabilities, VideoDecoder,
    VideoFormat,
};
pub use error::{ControlError, PlatformError, SessionError};
pub use host::{AppInfo, HostDisplayMode, HostInfo, ServerCodecModes};
pub use input::{InputBackend, InputEvent, InputHandler, InputSlot};
pub use overlay::{OverlayKind, OverlayManager};
pub use platform::{
    Borders, DisplayMode, EventQueue, EventSender, FullscreenMode, Platform, PlatformEvent, Rect,
    WindowEvent, WindowGeometry, WindowHandle, WindowSpec,
};
pub use preferences::{
    AudioConfig, StreamingPreferences, VideoCodecConfig, VideoDecoderSelection, WindowMode,
};
pub use session::{CleanupHandle, Session, SessionDeps, SessionHandle};
pub use state::SessionPhase;
pub use stream::{LaunchReport, LaunchValidator, StreamConfigBuilder, StreamConfiguration};
pub use transport::{
    ConnectionListener, ConnectionStatus, ServerInfo, Stage, StreamTransport, TransportCallbacks,
    TransportError, VideoRenderer,
};
pub use ui::{ChannelUi, SessionUi, UiEvent};
