//! Client configuration for the session core.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::preferences::StreamingPreferences;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Streaming preferences.
    pub preferences: StreamingPreferences,
    /// Pacing and polling intervals.
    pub timing: SessionTiming,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Pacing and polling intervals used by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTiming {
    /// Delay after each launch warning so the user can read it.
    /// Slightly longer than the 3 s toast so it can animate away.
    pub launch_warning_pacing_ms: u64,
    /// Delay between successful validation and connecting.
    pub pre_connect_delay_ms: u64,
    /// Sleep when no platform event is pending.
    pub idle_poll_ms: u64,
    /// Granularity of UI pumping while pacing.
    pub ui_pump_interval_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            launch_warning_pacing_ms: 3500,
            pre_connect_delay_ms: 1500,
            idle_poll_ms: 1,
            ui_pump_interval_ms: 5,
        }
    }
}

impl SessionTiming {
    /// Timing for severely constrained hardware, where waking every
    /// millisecond to poll input costs too much CPU.
    pub fn constrained() -> Self {
        Self {
            idle_poll_ms: 10,
            ..Self::default()
        }
    }

    /// No pacing or idle sleeps at all.
    pub fn immediate() -> Self {
        Self {
            launch_warning_pacing_ms: 0,
            pre_connect_delay_ms: 0,
            idle_poll_ms: 0,
            ui_pump_interval_ms: 0,
        }
    }

    pub fn launch_warning_pacing(&self) -> Duration {
        Duration::from_millis(self.launch_warning_pacing_ms)
    }

    pub fn pre_connect_delay(&self) -> Duration {
        Duration::from_millis(self.pre_connect_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn ui_pump_interval(&self) -> Duration {
        Duration::from_millis(self.ui_pump_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────
