//! Video decoder contract and the session-side machinery around it.
//!
//! | Module     | Purpose                                                  |
//! |------------|----------------------------------------------------------|
//! | `selector` | Probe compiled-in backends in priority order             |
//! | `slot`     | Lock-guarded owner of the live decoder, hot-swap support |
//!
//! Concrete codec backends are supplied by the embedding application as
//! [`DecoderBackend`]s.

pub mod selector;
pub mod slot;

use std::time::Instant;

use bitflags::bitflags;
use bytes::Bytes;
use thiserror::Error;

use crate::platform::{EventSender, WindowHandle};
use crate::preferences::VideoDecoderSelection;

pub use selector::{DecoderBackend, DecoderSelector};
pub use slot::{DecodeSubmitter, DecoderSlot};

/// Most slices the host encoder is asked to produce per frame.
pub const MAX_SLICES: u32 = 4;

// ── VideoFormat ──────────────────────────────────────────────────

/// Compressed video format of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    H264,
    H265,
    /// 10-bit HEVC, used for HDR.
    H265Main10,
}

impl VideoFormat {
    /// Transport-level format constant.
    pub const fn raw(self) -> u32 {
        match self {
            VideoFormat::H264 => 0x0001,
            VideoFormat::H265 => 0x0100,
            VideoFormat::H265Main10 => 0x0200,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x0001 => Some(VideoFormat::H264),
            0x0100 => Some(VideoFormat::H265),
            0x0200 => Some(VideoFormat::H265Main10),
            _ => None,
        }
    }
}

// ── Capabilities ─────────────────────────────────────────────────

bitflags! {
    /// Optional features a decoder supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecoderCapabilities: u32 {
        /// Decode units may be submitted directly from the receive thread.
        const DIRECT_SUBMIT = 0x1;
        const REFERENCE_FRAME_INVALIDATION_AVC = 0x2;
        const REFERENCE_FRAME_INVALIDATION_HEVC = 0x4;
    }
}

/// Capabilities advertised to the transport with the video callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoCapabilities {
    pub decoder: DecoderCapabilities,
    pub slices_per_frame: u32,
}

impl VideoCapabilities {
    /// Packed transport representation: slice count in the top byte.
    pub fn raw(&self) -> u32 {
        self.decoder.bits() | ((self.slices_per_frame & 0xFF) << 24)
    }
}

// ── DecodeUnit ───────────────────────────────────────────────────

/// Frame type of a decode unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Predicted frame; needs prior context.
    PFrame,
    /// Keyframe (IDR); decoding can resume here.
    Idr,
}

/// One compressed access unit delivered by the transport.
#[derive(Debug, Clone)]
pub struct DecodeUnit {
    pub frame_number: u32,
    pub frame_type: FrameType,
    pub data: Bytes,
    pub received_at: Instant,
}

impl DecodeUnit {
    pub fn new(frame_number: u32, frame_type: FrameType, data: Bytes) -> Self {
        Self {
            frame_number,
            frame_type,
            data,
            received_at: Instant::now(),
        }
    }
}

/// Result of handing a decode unit to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Accepted (possibly discarded during a swap).
    Ok,
    /// The transport must request a keyframe.
    NeedKeyframe,
}

// ── DecoderParams ────────────────────────────────────────────────

/// Parameter block handed to [`VideoDecoder::initialize`].
#[derive(Debug, Clone)]
pub struct DecoderParams {
    pub selection: VideoDecoderSelection,
    pub window: Option<WindowHandle>,
    pub video_format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub enable_vsync: bool,
    pub enable_frame_pacing: bool,
    /// Where a decoder that renders on the main thread posts
    /// [`PlatformEvent::FrameReady`](crate::platform::PlatformEvent::FrameReady).
    /// Absent for capability probes.
    pub events: Option<EventSender>,
}

impl DecoderParams {
    /// Parameters for a capability probe: V-sync on, pacing off.
    pub fn probe(
        selection: VideoDecoderSelection,
        window: Option<WindowHandle>,
        video_format: VideoFormat,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Self {
        Self {
            selection,
            window,
            video_format,
            width,
            height,
            frame_rate,
            enable_vsync: true,
            enable_frame_pacing: false,
            events: None,
        }
    }
}

/// A backend refused to initialise.
#[derive(Debug, Clone, Error)]
#[error("decoder initialisation failed: {0}")]
pub struct DecoderInitError(pub String);

// ── VideoDecoder ─────────────────────────────────────────────────

/// A live video decoder/renderer.
///
/// Dropping the decoder releases all its rendering resources; that must
/// happen on the main thread.
pub trait VideoDecoder: Send {
    fn initialize(&mut self, params: &DecoderParams) -> Result<(), DecoderInitError>;

    /// Called from the transport thread.
    fn submit_decode_unit(&mut self, unit: &DecodeUnit) -> DecodeStatus;

    fn is_hardware_accelerated(&self) -> bool;

    fn capabilities(&self) -> DecoderCapabilities;

    /// Present the most recently decoded frame. Main thread only.
    fn render_frame_on_main_thread(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_format_raw_roundtrip() {
        for fmt in [VideoFormat::H264, VideoFormat::H265, VideoFormat::H265Main10] {
            assert_eq!(VideoFormat::from_raw(fmt.raw()), Some(fmt));
        }
        assert_eq!(VideoFormat::from_raw(0x9999), None);
    }

    #[test]
    fn capabilities_pack_slice_count() {
        let caps = VideoCapabilities {
            decoder: DecoderCapabilities::DIRECT_SUBMIT,
            slices_per_frame: 4,
        };
        assert_eq!(caps.raw(), 0x0400_0001);
    }
}
