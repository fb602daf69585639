//! Host control-plane contract (launch, resume, quit).

use async_trait::async_trait;

use crate::error::ControlError;
use crate::stream::StreamConfiguration;

/// Client for the host's app-management endpoint.
///
/// Calls are never cancelled: they run to completion or fail.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Reconnect to the app already running on the host.
    async fn resume_app(&self, config: &StreamConfiguration) -> Result<(), ControlError>;

    async fn launch_app(
        &self,
        app_id: u32,
        config: &StreamConfiguration,
        game_optimizations: bool,
        play_audio_on_host: bool,
        gamepad_mask: u16,
    ) -> Result<(), ControlError>;

    async fn quit_app(&self) -> Result<(), ControlError>;
}
