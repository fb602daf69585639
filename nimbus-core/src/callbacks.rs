//! Transport-facing callback surface, bound to one session.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{error, info};

use crate::decoder::{DecodeStatus, DecodeSubmitter, DecodeUnit, VideoFormat};
use crate::overlay::OverlayKind;
use crate::session::SessionShared;
use crate::transport::{ConnectionListener, ConnectionStatus, Stage, VideoRenderer};
use crate::ui::UiEvent;

/// Above this bitrate (kbps) a poor connection suggests lowering it.
const SLOW_CONNECTION_BITRATE_KBPS: u32 = 5000;

/// Video stream parameters as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStreamDescriptor {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// [`ConnectionListener`] + [`VideoRenderer`] for one session.
#[derive(Clone)]
pub struct SessionCallbacks {
    shared: Arc<SessionShared>,
    submitter: DecodeSubmitter,
}

impl SessionCallbacks {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        let submitter = shared.decoder.submitter();
        Self { shared, submitter }
    }
}

impl ConnectionListener for SessionCallbacks {
    // Stage callbacks run on the thread that started the connection,
    // which is the session's main thread.
    fn stage_starting(&self, stage: Stage) {
        self.shared
            .ui
            .emit(UiEvent::StageStarting(stage.name().to_string()));
        self.shared.ui.process_pending();
    }

    fn stage_failed(&self, stage: Stage, error_code: i64) {
        self.shared.ui.emit(UiEvent::StageFailed {
            stage: stage.name().to_string(),
            code: error_code,
        });
        self.shared.ui.process_pending();
    }

    fn connection_terminated(&self, error_code: i64) {
        if error_code != 0 {
            self.shared
                .unexpected_termination
                .store(true, Ordering::SeqCst);
            self.shared
                .ui
                .emit(UiEvent::LaunchError("Connection terminated".into()));
        }
        error!("Connection terminated: {error_code}");
        self.shared.events.push_quit();
    }

    fn log_message(&self, message: &str) {
        info!(target: "nimbus::transport", "{}", message.trim_end());
    }

    fn rumble(&self, controller: u16, low_freq_motor: u16, high_freq_motor: u16) {
        self.shared
            .input
            .rumble(controller, low_freq_motor, high_freq_motor);
    }

    fn connection_status_update(&self, status: ConnectionStatus) {
        info!("Connection status update: {status:?}");

        if !self.shared.connection_warnings {
            return;
        }
        // The gamepad-mouse notice owns the overlay while it is shown.
        if self.shared.mouse_emulation_refs.load(Ordering::SeqCst) > 0 {
            return;
        }

        let overlays = &self.shared.overlays;
        match status {
            ConnectionStatus::Poor => {
                let text = if self.shared.bitrate_kbps.load(Ordering::Relaxed)
                    > SLOW_CONNECTION_BITRATE_KBPS
                {
                    "Slow connection to PC\nReduce your bitrate"
                } else {
                    "Poor connection to PC"
                };
                overlays.set_text(OverlayKind::StatusUpdate, text);
                overlays.set_enabled(OverlayKind::StatusUpdate, true);
            }
            ConnectionStatus::Okay => overlays.set_enabled(OverlayKind::StatusUpdate, false),
        }
    }
}

impl VideoRenderer for SessionCallbacks {
    fn setup(&self, format: VideoFormat, width: u32, height: u32, frame_rate: u32) {
        // Decoder creation waits for the window to be shown.
        *self.shared.active_video.lock() = Some(VideoStreamDescriptor {
            format,
            width,
            height,
            frame_rate,
        });
        info!(
            "Video stream is {width}x{height}x{frame_rate} (format {:#x})",
            format.raw()
        );
    }

    fn submit_decode_unit(&self, unit: &DecodeUnit) -> DecodeStatus {
        self.submitter.submit(unit)
    }
}

// ── Tests ────────────────────────────────────────────────────────
