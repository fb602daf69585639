//! Audio channel layouts and the audio renderer contract.

use crate::preferences::AudioConfig;

/// Transport-level audio configuration: channel mask, channel count and a
/// fixed tag byte packed into one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioConfiguration(u32);

impl AudioConfiguration {
    pub const STEREO: Self = Self::new(2, 0x3);
    pub const SURROUND_51: Self = Self::new(6, 0x3F);

    const fn new(channel_count: u32, channel_mask: u32) -> Self {
        Self((channel_mask << 16) | (channel_count << 8) | 0xCA)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn channel_count(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    pub const fn channel_mask(self) -> u32 {
        self.0 >> 16
    }
}

impl From<AudioConfig> for AudioConfiguration {
    fn from(config: AudioConfig) -> Self {
        match config {
            AudioConfig::Stereo => Self::STEREO,
            AudioConfig::Surround51 => Self::SURROUND_51,
        }
    }
}

impl std::fmt::Display for AudioConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x} ({} channels)", self.0, self.channel_count())
    }
}

/// Audio renderer backend. Passed to the transport unless audio is
/// disabled for the session.
pub trait AudioBackend: Send + Sync {
    /// Whether an output device can be opened with `config`.
    fn test_config(&self, config: AudioConfiguration) -> bool;

    /// Renderer capability bits advertised to the transport.
    fn capabilities(&self, _config: AudioConfiguration) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_constants() {
        assert_eq!(AudioConfiguration::STEREO.raw(), 0x302CA);
        assert_eq!(AudioConfiguration::SURROUND_51.raw(), 0x3F06CA);
        assert_eq!(AudioConfiguration::SURROUND_51.channel_count(), 6);
        assert_eq!(AudioConfiguration::STEREO.channel_mask(), 0x3);
    }

    #[test]
    fn from_preference() {
        assert_eq!(
            AudioConfiguration::from(AudioConfig::Surround51),
            AudioConfiguration::SURROUND_51
        );
    }
}
