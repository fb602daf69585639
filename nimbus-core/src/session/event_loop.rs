//! Main-thread event loop and decoder recreation.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, error, info, warn};

use super::{ActiveStream, Session};
use crate::decoder::{DecoderParams, VideoDecoder};
use crate::error::SessionError;
use crate::platform::{PlatformEvent, WindowEvent, optimal_display_mode, window_geometry};
use crate::state::SessionPhase;
use crate::ui::UiEvent;

const DECODER_FAILURE_TEXT: &str =
    "Unable to initialize video decoder. Please check your streaming settings and try again.";

/// Tolerance (Hz) before a refresh rate below the stream rate turns off
/// V-sync.
const VSYNC_REFRESH_SLACK: u32 = 5;

/// Why the decoder is being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecreateTrigger {
    WindowShown,
    WindowResized,
    DisplayChanged,
    DeviceReset,
    TargetsReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopAction {
    Continue,
    Recreate(RecreateTrigger),
    Quit,
}

impl Session {
    pub(super) async fn run_event_loop(&mut self, stream: &mut ActiveStream) {
        // From here on a quit is a normal end of session.
        self.shared
            .unexpected_termination
            .store(false, Ordering::SeqCst);
        self.transition(SessionPhase::activate);
        info!(session = self.id, "stream active");

        loop {
            self.platform.pump_events(&self.shared.events);
            let Some(event) = self.queue.next() else {
                self.idle().await;
                continue;
            };

            match self.dispatch(stream, event) {
                LoopAction::Continue => {}
                LoopAction::Quit => {
                    info!("Quit event received");
                    break;
                }
                LoopAction::Recreate(trigger) => {
                    if let Err(e) = self.recreate_decoder(stream, trigger) {
                        error!(session = self.id, ?trigger, "failed to recreate decoder: {e}");
                        self.ui.emit(UiEvent::LaunchError(DECODER_FAILURE_TEXT.into()));
                        break;
                    }
                }
            }
        }
    }

    async fn idle(&self) {
        let poll = self.timing.idle_poll();
        if poll.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(poll).await;
        }
        self.ui.presence_tick();
    }

    fn dispatch(&mut self, stream: &mut ActiveStream, event: PlatformEvent) -> LoopAction {
        match event {
            PlatformEvent::Quit => LoopAction::Quit,
            PlatformEvent::FrameReady => {
                if !self.shared.decoder.render_frame() {
                    debug!("frame ready with no decoder");
                }
                LoopAction::Continue
            }
            PlatformEvent::ToggleFullscreen => {
                self.toggle_fullscreen(stream);
                LoopAction::Continue
            }
            PlatformEvent::Input(input) => {
                self.shared.input.with(|handler| handler.dispatch(&input));
                LoopAction::Continue
            }
            PlatformEvent::Window(window_event) => self.handle_window_event(stream, window_event),
            PlatformEvent::RenderDeviceReset => LoopAction::Recreate(RecreateTrigger::DeviceReset),
            PlatformEvent::RenderTargetsReset => {
                LoopAction::Recreate(RecreateTrigger::TargetsReset)
            }
        }
    }

    fn handle_window_event(&mut self, stream: &mut ActiveStream, event: WindowEvent) -> LoopAction {
        let trigger = match event {
            WindowEvent::Shown => RecreateTrigger::WindowShown,
            WindowEvent::SizeChanged { .. } => RecreateTrigger::WindowResized,
            other => {
                match other {
                    WindowEvent::FocusGained => {
                        if self.platform.activated_by_click(stream.window) {
                            self.shared.input.with(|h| h.set_capture_active(true));
                        }
                    }
                    WindowEvent::FocusLost => {
                        self.shared.input.with(|h| {
                            if self.platform.fullscreen_mode(stream.window).is_none() {
                                h.set_capture_active(false);
                            }
                            h.raise_all_keys();
                        });
                    }
                    _ => {}
                }

                // The window may have been dragged to another display.
                if self.platform.window_display_index(stream.window) == stream.display {
                    return LoopAction::Continue;
                }
                RecreateTrigger::DisplayChanged
            }
        };

        if stream.pending_windowed_transition {
            stream.pending_windowed_transition = false;
            let display = self.platform.window_display_index(stream.window);
            let geometry = window_geometry(
                self.platform.as_ref(),
                Some(stream.window),
                display,
                false,
                (stream.config.width, stream.config.height),
            );
            self.platform.set_window_geometry(stream.window, &geometry);
        }

        LoopAction::Recreate(trigger)
    }

    fn toggle_fullscreen(&mut self, stream: &mut ActiveStream) {
        let window = stream.window;
        if self.platform.fullscreen_mode(window).is_some() {
            self.platform.set_fullscreen(window, None);
            self.platform.set_resizable(window, true);
            // Size and position are applied once the resize lands.
            stream.pending_windowed_transition = true;
        } else {
            self.platform.set_resizable(window, false);
            self.update_optimal_display_mode(stream);
            self.platform.set_fullscreen(window, Some(self.fullscreen_flavour));
        }
    }

    /// Pick the display mode that best fits the stream. The platform
    /// applies it in exclusive full-screen only.
    pub(super) fn update_optimal_display_mode(&mut self, stream: &ActiveStream) {
        let video = self.active_video(&stream.config);
        let display = self.platform.window_display_index(stream.window);
        let Some(mode) = optimal_display_mode(
            self.platform.as_ref(),
            display,
            (video.width, video.height),
            stream.config.fps,
        ) else {
            return;
        };

        info!(
            "Chosen best display mode: {}x{}x{}",
            mode.width, mode.height, mode.refresh_rate
        );
        self.platform.set_window_display_mode(stream.window, mode);
    }

    /// Replace the decoder under the decoder lock.
    ///
    /// Window and reset events queued behind the trigger are discarded:
    /// the new decoder already reflects them.
    fn recreate_decoder(
        &mut self,
        stream: &mut ActiveStream,
        trigger: RecreateTrigger,
    ) -> Result<(), SessionError> {
        debug!(?trigger, "recreating decoder");
        let shared = Arc::clone(&self.shared);

        shared.decoder.swap(|| {
            self.platform.pump_events(&shared.events);
            let dropped = self.queue.flush(PlatformEvent::is_window);

            stream.display = self.platform.window_display_index(stream.window);
            self.update_optimal_display_mode(stream);

            self.platform.pump_events(&shared.events);
            let dropped = dropped + self.queue.flush(PlatformEvent::is_render_reset);
            if dropped > 0 {
                debug!("discarded {dropped} stale window/reset events");
            }

            self.build_decoder(stream)
        })
    }

    fn build_decoder(&self, stream: &ActiveStream) -> Result<Box<dyn VideoDecoder>, SessionError> {
        let video = self.active_video(&stream.config);

        let mut enable_vsync = self.prefs.enable_vsync;
        let refresh_rate = self.platform.refresh_rate(stream.window);
        // A refresh rate of zero means the platform could not tell.
        if enable_vsync && refresh_rate != 0 && refresh_rate + VSYNC_REFRESH_SLACK < stream.config.fps
        {
            warn!(
                "Disabling V-sync because refresh rate limit exceeded ({refresh_rate} Hz < {} FPS)",
                stream.config.fps
            );
            enable_vsync = false;
        }

        let params = DecoderParams {
            selection: self.prefs.video_decoder_selection,
            window: Some(stream.window),
            video_format: video.format,
            width: video.width,
            height: video.height,
            frame_rate: video.frame_rate,
            enable_vsync,
            enable_frame_pacing: enable_vsync && self.prefs.frame_pacing,
            events: Some(self.shared.events.clone()),
        };
        self.decoders.choose(&params, false)
    }

    /// Main-thread half of shutdown. Runs once the loop has exited.
    pub(super) fn teardown(&mut self, stream: &ActiveStream) {
        if let Some(elapsed) = self.phase.lock().active_duration() {
            info!(session = self.id, "stream ended after {elapsed:.1?}");
        }
        self.transition(SessionPhase::begin_termination);

        self.shared.input.with(|h| {
            h.set_capture_active(false);
            h.raise_all_keys();
        });
        self.platform.set_screen_saver_enabled(true);

        // Under their locks, so no transport callback sees them half-dropped.
        self.shared.input.destroy();
        self.shared.decoder.destroy();

        self.platform.destroy_window(stream.window);
        self.platform.quit_video();
    }
}
