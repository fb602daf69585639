//! Launch-time compatibility checks.
//!
//! The checks run in a fixed order against the freshly built
//! configuration, adjusting it as they go. Each either records a warning
//! or, for forced hardware decoding, fails the launch outright. The
//! session displays the warnings (paced) before acting on the outcome.

use tracing::{info, warn};

use crate::audio::{AudioBackend, AudioConfiguration};
use crate::decoder::{DecoderSelector, VideoFormat};
use crate::host::{AppInfo, HostInfo, ServerCodecModes};
use crate::platform::WindowHandle;
use crate::preferences::{StreamingPreferences, VideoCodecConfig, VideoDecoderSelection};
use crate::stream::StreamConfiguration;

/// Result of [`LaunchValidator::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchReport {
    /// Non-fatal notices, in check order.
    pub warnings: Vec<String>,
    /// No audio device could be opened.
    pub audio_disabled: bool,
    /// Set when the launch must not proceed.
    pub fatal: Option<String>,
}

impl LaunchReport {
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("launch warning: {text}");
        self.warnings.push(text);
    }
}

/// Inputs to the launch checks.
pub struct LaunchValidator<'a> {
    pub prefs: &'a StreamingPreferences,
    pub host: &'a HostInfo,
    pub app: &'a AppInfo,
    pub decoders: &'a DecoderSelector,
    pub audio: &'a dyn AudioBackend,
    pub probe_window: Option<WindowHandle>,
    /// Attached gamepads without an input mapping.
    pub unmapped_gamepads: &'a [String],
}

impl LaunchValidator<'_> {
    fn hardware_decode(&self, format: VideoFormat, config: &StreamConfiguration) -> bool {
        self.decoders.is_hardware_decode_available(
            self.prefs.video_decoder_selection,
            self.probe_window,
            format,
            config.width,
            config.height,
            config.fps,
        )
    }

    pub fn validate(&self, config: &mut StreamConfiguration) -> LaunchReport {
        let prefs = self.prefs;
        let mut report = LaunchReport::default();

        if prefs.video_decoder_selection == VideoDecoderSelection::ForceSoftware {
            report.warn(
                "Your settings selection to force software decoding may cause poor streaming performance.",
            );
        }

        if prefs.unsupported_fps && config.fps > 60 {
            report.warn("Using unsupported FPS options may cause stuttering or lag.");
            if prefs.enable_vsync {
                report.warn(
                    "V-sync will be disabled when streaming at a higher frame rate than the display.",
                );
            }
        }

        self.check_hevc(config, &mut report);
        self.check_hdr(config, &mut report);
        self.check_resolution(config, &mut report);
        self.check_audio(config, &mut report);

        if !self.unmapped_gamepads.is_empty() {
            info!("unmapped gamepads: {:?}", self.unmapped_gamepads);
            report.warn(
                "An attached gamepad has no mapping and won't be usable. Visit the help pages to resolve this.",
            );
        }

        if prefs.video_decoder_selection == VideoDecoderSelection::ForceHardware
            && !self.hardware_decode(config.video_format(), config)
        {
            let message = if prefs.video_codec_config == VideoCodecConfig::Auto {
                "Your selection to force hardware decoding cannot be satisfied due to missing hardware decoding support on this PC's GPU."
            } else {
                "Your codec selection and force hardware decoding setting are not compatible. This PC's GPU lacks support for decoding your chosen codec."
            };
            report.fatal = Some(message.to_string());
        }

        report
    }

    fn check_hevc(&self, config: &mut StreamConfiguration, report: &mut LaunchReport) {
        if !config.supports_hevc {
            return;
        }
        let forced = self.prefs.video_codec_config.is_hevc_forced();

        if self.prefs.video_decoder_selection == VideoDecoderSelection::Auto
            && !self.hardware_decode(VideoFormat::H265, config)
        {
            if forced {
                report.warn(
                    "Using software decoding due to your selection to force HEVC without GPU support. This may cause poor streaming performance.",
                );
            } else {
                report.warn("This PC's GPU doesn't support HEVC decoding.");
                config.supports_hevc = false;
            }
        }

        if forced && self.host.max_luma_pixels_hevc == 0 {
            report.warn(
                "Your host PC GPU doesn't support HEVC. A GeForce GTX 900-series (Maxwell) or later GPU is required for HEVC streaming.",
            );
            config.supports_hevc = false;
        }
    }

    /// HDR stays on only if the app, the host GPU and a local Main10
    /// decoder all support it.
    fn check_hdr(&self, config: &mut StreamConfiguration, report: &mut LaunchReport) {
        if !config.enable_hdr {
            return;
        }
        config.enable_hdr = false;

        if !self.app.hdr_supported {
            report.warn(format!("{} doesn't support HDR10.", self.app.name));
        } else if !self
            .host
            .server_codec_mode_support
            .contains(ServerCodecModes::HEVC_MAIN10)
        {
            report.warn(
                "Your host PC GPU doesn't support HDR streaming. A GeForce GTX 1000-series (Pascal) or later GPU is required for HDR streaming.",
            );
        } else if !self.hardware_decode(VideoFormat::H265Main10, config) {
            report.warn("This PC's GPU doesn't support HEVC Main10 decoding for HDR streaming.");
        } else {
            config.enable_hdr = true;
        }
    }

    /// 4K needs host software 3.0 or later.
    fn check_resolution(&self, config: &mut StreamConfiguration, report: &mut LaunchReport) {
        let version = &self.host.gfe_version;
        if config.width >= 3840 && (version.is_empty() || version.starts_with("2.")) {
            report.warn("GeForce Experience 3.0 or higher is required for 4K streaming.");
            config.width = 1920;
            config.height = 1080;
        }
    }

    fn check_audio(&self, config: &mut StreamConfiguration, report: &mut LaunchReport) {
        let mut passed = self.audio.test_config(config.audio_configuration);

        if !passed && config.audio_configuration == AudioConfiguration::SURROUND_51 {
            passed = self.audio.test_config(AudioConfiguration::STEREO);
            if passed {
                config.audio_configuration = AudioConfiguration::STEREO;
                report.warn("5.1 surround sound is not supported by the current audio device.");
            }
        }

        report.audio_disabled = !passed;
        if report.audio_disabled {
            report.warn(
                "Failed to open audio device. Audio will be unavailable during this session.",
            );
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
