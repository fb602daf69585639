//! Host and application metadata supplied by discovery.

use bitflags::bitflags;

bitflags! {
    /// Codec modes the host GPU can encode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ServerCodecModes: u32 {
        const H264 = 0x0001;
        const HEVC = 0x0100;
        /// HEVC Main10, required for HDR streaming.
        const HEVC_MAIN10 = 0x0200;
    }
}

/// A display mode the host can natively render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostDisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// The streaming host as known to the client.
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    pub name: String,
    /// Address used to reach the host.
    pub active_address: String,
    /// Host software version, dotted quad. Empty on very old hosts.
    pub gfe_version: String,
    pub app_version: String,
    pub gpu_model: String,
    /// App currently running on the host, 0 if none.
    pub current_game_id: u32,
    pub display_modes: Vec<HostDisplayMode>,
    /// 0 when the host GPU cannot encode HEVC at all.
    pub max_luma_pixels_hevc: u64,
    pub server_codec_mode_support: ServerCodecModes,
}

impl HostInfo {
    /// Parsed host software version.
    pub fn software_version(&self) -> Option<Vec<u32>> {
        parse_version_quad(&self.gfe_version)
    }

    /// Whether the host natively supports `width`×`height`.
    pub fn supports_resolution(&self, width: u32, height: u32) -> bool {
        self.display_modes
            .iter()
            .any(|m| m.width == width && m.height == height)
    }
}

/// An application that can be streamed from the host.
#[derive(Debug, Clone, Default)]
pub struct AppInfo {
    pub id: u32,
    pub name: String,
    pub hdr_supported: bool,
}

/// Parse a dotted version string such as `3.20.1.40`.
///
/// Returns `None` for empty strings or when any component is not a number.
pub fn parse_version_quad(version: &str) -> Option<Vec<u32>> {
    if version.trim().is_empty() {
        return None;
    }
    version
        .trim()
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

/// `true` if `version` is absent, unparseable or older than `major.minor`.
pub fn version_older_than(version: &str, major: u32, minor: u32) -> bool {
    match parse_version_quad(version) {
        None => true,
        Some(parts) => {
            let have_major = parts.first().copied().unwrap_or(0);
            let have_minor = parts.get(1).copied().unwrap_or(0);
            (have_major, have_minor) < (major, minor)
        }
    }
}
