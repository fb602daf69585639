//! User streaming preferences consumed by the session core.
//!
//! Storage of these values belongs to the hosting application; the core
//! only needs a typed, serde-friendly snapshot.

use serde::{Deserialize, Serialize};

/// Audio channel layout requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioConfig {
    #[default]
    Stereo,
    Surround51,
}

/// Codec selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodecConfig {
    /// Use HEVC when hardware decoding for it is available.
    #[default]
    Auto,
    ForceH264,
    ForceHevc,
    /// HEVC with HDR10, subject to host/app/decoder support.
    ForceHevcHdr,
}

impl VideoCodecConfig {
    /// Whether the user explicitly asked for HEVC.
    pub fn is_hevc_forced(self) -> bool {
        matches!(self, Self::ForceHevc | Self::ForceHevcHdr)
    }
}

/// Decoder selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoDecoderSelection {
    #[default]
    Auto,
    ForceHardware,
    ForceSoftware,
}

/// How the stream window is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Fullscreen,
    FullscreenDesktop,
    Windowed,
}

/// Snapshot of the user's streaming preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingPreferences {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub enable_vsync: bool,
    pub game_optimizations: bool,
    pub play_audio_on_host: bool,
    pub multi_controller: bool,
    /// Allow frame rates above 60 fps.
    pub unsupported_fps: bool,
    /// Quit the remote app when the session ends gracefully.
    pub quit_app_after: bool,
    pub mouse_acceleration: bool,
    pub start_windowed: bool,
    pub frame_pacing: bool,
    /// Show the "poor connection" overlay.
    pub connection_warnings: bool,
    pub rich_presence: bool,
    pub gamepad_mouse: bool,
    pub audio_config: AudioConfig,
    pub video_codec_config: VideoCodecConfig,
    pub video_decoder_selection: VideoDecoderSelection,
    pub window_mode: WindowMode,
}

impl Default for StreamingPreferences {
    fn default() -> Self {
        let (width, height, fps) = (1280, 720, 60);
        Self {
            width,
            height,
            fps,
            bitrate_kbps: default_bitrate(width, height, fps),
            enable_vsync: true,
            game_optimizations: true,
            play_audio_on_host: false,
            multi_controller: true,
            unsupported_fps: false,
            quit_app_after: false,
            mouse_acceleration: false,
            start_windowed: false,
            frame_pacing: false,
            connection_warnings: true,
            rich_presence: true,
            gamepad_mouse: true,
            audio_config: AudioConfig::Stereo,
            video_codec_config: VideoCodecConfig::Auto,
            video_decoder_selection: VideoDecoderSelection::Auto,
            window_mode: WindowMode::Fullscreen,
        }
    }
}

/// Default bitrate in kbps for a resolution and frame rate.
///
/// The table favours 16:10 modes: they are only slightly larger than the
/// 16:9 equivalents and stay in the same slot.
pub fn default_bitrate(width: u32, height: u32, fps: u32) -> u32 {
    let pixels = u64::from(width) * u64::from(height);
    let base = if pixels <= 1366 * 768 {
        5000.0
    } else if pixels <= 1920 * 1200 {
        10000.0
    } else if pixels <= 2560 * 1600 {
        20000.0
    } else {
        40000.0
    };
    (base * (f64::from(fps) / 30.0)) as u32
}
