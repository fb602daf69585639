//! Stream configuration derivation.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::audio::AudioConfiguration;
use crate::decoder::{DecoderSelector, MAX_SLICES, VideoCapabilities, VideoFormat};
use crate::host::{HostInfo, version_older_than};
use crate::platform::WindowHandle;
use crate::preferences::{StreamingPreferences, VideoCodecConfig};

/// Largest video packet the transport should send.
pub const PACKET_SIZE: u32 = 1392;

/// HEVC bitrate as a percentage of the H.264 bitrate.
pub const HEVC_BITRATE_PERCENTAGE_MULTIPLIER: u32 = 75;

/// Whether the stream crosses the internet (affects transport tuning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingRemotely {
    Local,
    Remote,
    /// Let the transport decide from the host address.
    #[default]
    Auto,
}

/// Negotiated parameters for one session attempt.
///
/// Built fresh for every attempt; the launch validator may still adjust
/// the codec, HDR, resolution and audio fields before the transport
/// starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfiguration {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub packet_size: u32,
    pub streaming_remotely: StreamingRemotely,
    pub hevc_bitrate_percentage_multiplier: u32,
    pub supports_hevc: bool,
    pub enable_hdr: bool,
    pub audio_configuration: AudioConfiguration,
    /// Remote-input encryption key.
    pub remote_input_aes_key: [u8; 16],
    /// Remote-input IV; only the first 4 bytes are populated.
    pub remote_input_aes_iv: [u8; 16],
}

impl StreamConfiguration {
    /// Format the host will encode with, before HDR is considered.
    pub fn video_format(&self) -> VideoFormat {
        if self.supports_hevc {
            VideoFormat::H265
        } else {
            VideoFormat::H264
        }
    }
}

// ── Builder ──────────────────────────────────────────────────────

/// Derives a [`StreamConfiguration`] from preferences, host data and
/// decoder probes.
pub struct StreamConfigBuilder<'a> {
    prefs: &'a StreamingPreferences,
    host: &'a HostInfo,
    decoders: &'a DecoderSelector,
    probe_window: Option<WindowHandle>,
    hevc_fixup_required: bool,
}

impl<'a> StreamConfigBuilder<'a> {
    pub fn new(
        prefs: &'a StreamingPreferences,
        host: &'a HostInfo,
        decoders: &'a DecoderSelector,
    ) -> Self {
        Self {
            prefs,
            host,
            decoders,
            probe_window: None,
            hevc_fixup_required: cfg!(target_os = "macos"),
        }
    }

    /// Hidden window decoder probes may attach to.
    pub fn probe_window(mut self, window: Option<WindowHandle>) -> Self {
        self.probe_window = window;
        self
    }

    /// Set when the local decoders need an SPS fixup that only hosts at
    /// 3.11 or later make unnecessary; HEVC is never auto-selected against
    /// older hosts.
    pub fn hevc_fixup_required(mut self, required: bool) -> Self {
        self.hevc_fixup_required = required;
        self
    }

    pub fn build(&self) -> StreamConfiguration {
        let prefs = self.prefs;

        let mut remote_input_aes_key = [0u8; 16];
        OsRng.fill_bytes(&mut remote_input_aes_key);
        let mut remote_input_aes_iv = [0u8; 16];
        OsRng.fill_bytes(&mut remote_input_aes_iv[..4]);

        let audio_configuration = AudioConfiguration::from(prefs.audio_config);
        info!("Video bitrate: {} kbps", prefs.bitrate_kbps);
        info!("Audio configuration: {audio_configuration}");

        let (supports_hevc, enable_hdr) = match prefs.video_codec_config {
            VideoCodecConfig::Auto => (self.auto_hevc(), false),
            VideoCodecConfig::ForceH264 => (false, false),
            VideoCodecConfig::ForceHevc => (true, false),
            // Only requested here; the launch validator decides.
            VideoCodecConfig::ForceHevcHdr => (true, true),
        };

        StreamConfiguration {
            width: prefs.width,
            height: prefs.height,
            fps: prefs.fps,
            bitrate_kbps: prefs.bitrate_kbps,
            packet_size: PACKET_SIZE,
            streaming_remotely: StreamingRemotely::Auto,
            hevc_bitrate_percentage_multiplier: HEVC_BITRATE_PERCENTAGE_MULTIPLIER,
            supports_hevc,
            enable_hdr,
            audio_configuration,
            remote_input_aes_key,
            remote_input_aes_iv,
        }
    }

    fn auto_hevc(&self) -> bool {
        let prefs = self.prefs;
        let available = self.decoders.is_hardware_decode_available(
            prefs.video_decoder_selection,
            self.probe_window,
            VideoFormat::H265,
            prefs.width,
            prefs.height,
            prefs.fps,
        );
        if available && self.hevc_fixup_required && version_older_than(&self.host.gfe_version, 3, 11)
        {
            warn!("Disabling HEVC due to old host software version");
            return false;
        }
        available
    }

    /// Capabilities advertised with the video callbacks: the probed
    /// decoder's bits plus one slice per core, up to [`MAX_SLICES`].
    pub fn video_capabilities(&self, config: &StreamConfiguration) -> VideoCapabilities {
        let slices_per_frame = std::thread::available_parallelism()
            .map(|n| u32::try_from(n.get()).unwrap_or(MAX_SLICES))
            .unwrap_or(1)
            .min(MAX_SLICES);
        info!("Encoder configured for {slices_per_frame} slices per frame");

        let decoder = self.decoders.decoder_capabilities(
            self.prefs.video_decoder_selection,
            self.probe_window,
            config.video_format(),
            config.width,
            config.height,
            config.fps,
        );
        VideoCapabilities {
            decoder,
            slices_per_frame,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{
        DecodeStatus, DecodeUnit, DecoderBackend, DecoderCapabilities, DecoderInitError,
        DecoderParams, VideoDecoder,
    };
    use crate::preferences::AudioConfig;

    struct HardwareOnly(&'static [VideoFormat]);

    impl VideoDecoder for HardwareOnly {
        fn initialize(&mut self, params: &DecoderParams) -> Result<(), DecoderInitError> {
            if self.0.contains(&params.video_format) {
                Ok(())
            } else {
                Err(DecoderInitError("format".into()))
            }
        }
        fn submit_decode_unit(&mut self, _unit: &DecodeUnit) -> DecodeStatus {
            DecodeStatus::Ok
        }
        fn is_hardware_accelerated(&self) -> bool {
            true
        }
        fn capabilities(&self) -> DecoderCapabilities {
            DecoderCapabilities::DIRECT_SUBMIT
        }
        fn render_frame_on_main_thread(&mut self) {}
    }

    fn selector(formats: &'static [VideoFormat]) -> DecoderSelector {
        DecoderSelector::new(vec![DecoderBackend::new("hw", move |_| {
            Box::new(HardwareOnly(formats))
        })])
    }

    fn host(gfe_version: &str) -> HostInfo {
        HostInfo {
            gfe_version: gfe_version.into(),
            ..Default::default()
        }
    }

    #[test]
    fn copies_preferences_and_constants() {
        let prefs = StreamingPreferences {
            width: 1920,
            height: 1080,
            fps: 120,
            bitrate_kbps: 40000,
            audio_config: AudioConfig::Surround51,
            ..Default::default()
        };
        let decoders = selector(&[VideoFormat::H264]);
        let host = host("3.20.1.40");
        let config = StreamConfigBuilder::new(&prefs, &host, &decoders).build();

        assert_eq!((config.width, config.height, config.fps), (1920, 1080, 120));
        assert_eq!(config.bitrate_kbps, 40000);
        assert_eq!(config.packet_size, 1392);
        assert_eq!(config.hevc_bitrate_percentage_multiplier, 75);
        assert_eq!(config.streaming_remotely, StreamingRemotely::Auto);
        assert_eq!(config.audio_configuration, AudioConfiguration::SURROUND_51);
        assert!(!config.supports_hevc);
        assert!(!config.enable_hdr);
    }

    #[test]
    fn key_material_differs_between_builds() {
        let prefs = StreamingPreferences::default();
        let decoders = selector(&[VideoFormat::H264, VideoFormat::H265]);
        let host = host("3.20.1.40");
        let builder = StreamConfigBuilder::new(&prefs, &host, &decoders);

        let a = builder.build();
        let b = builder.build();
        assert_ne!(a.remote_input_aes_key, b.remote_input_aes_key);
        assert_ne!(a.remote_input_aes_iv, b.remote_input_aes_iv);
        assert!(a.remote_input_aes_iv[4..].iter().all(|&b| b == 0));

        let strip = |c: &StreamConfiguration| StreamConfiguration {
            remote_input_aes_key: [0; 16],
            remote_input_aes_iv: [0; 16],
            ..c.clone()
        };
        assert_eq!(strip(&a), strip(&b));
    }

    #[test]
    fn auto_codec_follows_hevc_probe() {
        let prefs = StreamingPreferences::default();
        let host = host("3.20.1.40");

        let with_hevc = selector(&[VideoFormat::H264, VideoFormat::H265]);
        assert!(StreamConfigBuilder::new(&prefs, &host, &with_hevc).build().supports_hevc);

        let without = selector(&[VideoFormat::H264]);
        assert!(!StreamConfigBuilder::new(&prefs, &host, &without).build().supports_hevc);
    }

    #[test]
    fn old_host_disables_auto_hevc_when_fixup_needed() {
        let prefs = StreamingPreferences::default();
        let decoders = selector(&[VideoFormat::H264, VideoFormat::H265]);

        for version in ["", "3.10.2", "2.11.4.0", "bogus"] {
            let host = host(version);
            let config = StreamConfigBuilder::new(&prefs, &host, &decoders)
                .hevc_fixup_required(true)
                .build();
            assert!(!config.supports_hevc, "version {version:?}");
        }

        let host = host("3.11.0");
        let config = StreamConfigBuilder::new(&prefs, &host, &decoders)
            .hevc_fixup_required(true)
            .build();
        assert!(config.supports_hevc);
    }

    #[test]
    fn forced_codecs_ignore_probes() {
        let decoders = selector(&[VideoFormat::H264]);
        let host = host("");
        let mut prefs = StreamingPreferences {
            video_codec_config: VideoCodecConfig::ForceHevcHdr,
            ..Default::default()
        };
        let config = StreamConfigBuilder::new(&prefs, &host, &decoders).build();
        assert!(config.supports_hevc && config.enable_hdr);

        prefs.video_codec_config = VideoCodecConfig::ForceH264;
        let config = StreamConfigBuilder::new(&prefs, &host, &decoders).build();
        assert!(!config.supports_hevc && !config.enable_hdr);
    }

    #[test]
    fn capabilities_carry_slices_and_decoder_bits() {
        let prefs = StreamingPreferences::default();
        let decoders = selector(&[VideoFormat::H264]);
        let host = host("3.20");
        let builder = StreamConfigBuilder::new(&prefs, &host, &decoders);
        let caps = builder.video_capabilities(&builder.build());

        assert_eq!(caps.decoder, DecoderCapabilities::DIRECT_SUBMIT);
        assert!((1..=MAX_SLICES).contains(&caps.slices_per_frame));
    }
}
