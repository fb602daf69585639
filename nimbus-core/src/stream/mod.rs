//! Stream negotiation: configuration derivation and launch checks.
//!
//! | Module     | Purpose                                                |
//! |------------|--------------------------------------------------------|
//! | `config`   | Derive a [`StreamConfiguration`] from prefs and probes |
//! | `validate` | Ordered compatibility checks, warnings and fatal errors |

pub mod config;
pub mod validate;

pub use config::{StreamConfigBuilder, StreamConfiguration, StreamingRemotely};
pub use validate::{LaunchReport, LaunchValidator};
