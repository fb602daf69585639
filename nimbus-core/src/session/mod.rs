//! Streaming session lifecycle.
//!
//! [`Session::exec`] drives one attempt on the caller's (main) thread:
//!
//! 1. bring up video, build and validate the stream configuration;
//! 2. wait for admission, launch or resume the app, start the transport;
//! 3. create the stream window and run the event loop until quit;
//! 4. tear down on the main thread and hand the rest to a deferred
//!    cleanup task, which alone returns the admission permit.
//!
//! Nothing escapes `exec`: every failure is reported through
//! [`UiEvent`]s and routed to cleanup.

mod cleanup;
mod event_loop;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::admission::AdmissionGate;
use crate::audio::AudioBackend;
use crate::callbacks::{SessionCallbacks, VideoStreamDescriptor};
use crate::config::SessionTiming;
use crate::control::ControlPlane;
use crate::decoder::{DecoderSelector, DecoderSlot, VideoCapabilities, VideoFormat};
use crate::error::SessionError;
use crate::host::{AppInfo, HostInfo};
use crate::input::{InputBackend, InputSlot};
use crate::overlay::{OverlayKind, OverlayManager};
use crate::platform::{
    EventQueue, EventSender, FullscreenMode, Platform, PlatformEvent, WindowGeometry,
    WindowHandle, WindowSpec, display_at_origin, window_geometry,
};
use crate::preferences::{StreamingPreferences, WindowMode};
use crate::state::SessionPhase;
use crate::stream::{LaunchValidator, StreamConfigBuilder, StreamConfiguration};
use crate::transport::{ServerInfo, StreamTransport, TransportCallbacks};
use crate::ui::{SessionUi, UiEvent};

pub use cleanup::CleanupHandle;

const WINDOW_TITLE: &str = "Nimbus";

const MOUSE_MODE_TEXT: &str = "Gamepad mouse mode active\nLong press Start to deactivate";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ── Shared state ─────────────────────────────────────────────────

/// State reachable from the transport callback thread.
pub(crate) struct SessionShared {
    pub(crate) decoder: DecoderSlot,
    pub(crate) input: InputSlot,
    /// Starts `true`: anything ending the session before streaming is
    /// unexpected.
    pub(crate) unexpected_termination: AtomicBool,
    pub(crate) active_video: Mutex<Option<VideoStreamDescriptor>>,
    pub(crate) overlays: OverlayManager,
    pub(crate) mouse_emulation_refs: AtomicI32,
    pub(crate) connection_warnings: bool,
    pub(crate) bitrate_kbps: AtomicU32,
    pub(crate) events: EventSender,
    pub(crate) ui: Arc<dyn SessionUi>,
}

impl SessionShared {
    pub(crate) fn new(
        events: EventSender,
        ui: Arc<dyn SessionUi>,
        connection_warnings: bool,
    ) -> Self {
        Self {
            decoder: DecoderSlot::new(),
            input: InputSlot::new(),
            unexpected_termination: AtomicBool::new(true),
            active_video: Mutex::new(None),
            overlays: OverlayManager::new(),
            mouse_emulation_refs: AtomicI32::new(0),
            connection_warnings,
            bitrate_kbps: AtomicU32::new(0),
            events,
            ui,
        }
    }
}

// ── SessionHandle ────────────────────────────────────────────────

/// What input handlers and the presentation layer may do to a session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    /// Switch between full-screen and windowed on the next loop iteration.
    pub fn toggle_fullscreen(&self) {
        self.shared.events.push(PlatformEvent::ToggleFullscreen);
    }

    /// Reference-counted: each `true` must be paired with a `false`.
    pub fn notify_mouse_emulation_mode(&self, enabled: bool) {
        let delta = if enabled { 1 } else { -1 };
        let refs = self
            .shared
            .mouse_emulation_refs
            .fetch_add(delta, Ordering::SeqCst)
            + delta;
        debug_assert!(refs >= 0, "unbalanced mouse emulation notifications");

        // Shares the status overlay with connection warnings.
        let overlays = &self.shared.overlays;
        if refs > 0 {
            overlays.set_text(OverlayKind::StatusUpdate, MOUSE_MODE_TEXT);
            overlays.set_enabled(OverlayKind::StatusUpdate, true);
        } else {
            overlays.set_enabled(OverlayKind::StatusUpdate, false);
        }
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.shared.overlays
    }

    /// Post an event into the session's loop (decoders use this for
    /// [`PlatformEvent::FrameReady`]).
    pub fn events(&self) -> EventSender {
        self.shared.events.clone()
    }
}

// ── Session ──────────────────────────────────────────────────────

/// External collaborators a session drives.
pub struct SessionDeps {
    pub platform: Box<dyn Platform>,
    pub transport: Arc<dyn StreamTransport>,
    pub control: Arc<dyn ControlPlane>,
    pub audio: Arc<dyn AudioBackend>,
    pub input: Arc<dyn InputBackend>,
    pub decoders: Arc<DecoderSelector>,
    pub ui: Arc<dyn SessionUi>,
    pub admission: AdmissionGate,
}

/// Output of initialisation.
struct Negotiated {
    config: StreamConfiguration,
    video_capabilities: VideoCapabilities,
    audio_disabled: bool,
}

/// Main-thread state while the stream window exists.
struct ActiveStream {
    window: WindowHandle,
    config: StreamConfiguration,
    /// Display the decoder was last created for.
    display: usize,
    /// Re-centre the window once the resize out of full-screen lands.
    pending_windowed_transition: bool,
}

/// One streaming attempt against one app on one host.
pub struct Session {
    id: u64,
    host: HostInfo,
    app: AppInfo,
    prefs: Arc<StreamingPreferences>,
    timing: SessionTiming,
    hevc_fixup_required: bool,
    fullscreen_flavour: FullscreenMode,

    platform: Box<dyn Platform>,
    transport: Arc<dyn StreamTransport>,
    control: Arc<dyn ControlPlane>,
    audio: Arc<dyn AudioBackend>,
    input_backend: Arc<dyn InputBackend>,
    decoders: Arc<DecoderSelector>,
    ui: Arc<dyn SessionUi>,
    admission: AdmissionGate,

    shared: Arc<SessionShared>,
    queue: EventQueue,
    phase: Arc<Mutex<SessionPhase>>,
}

impl Session {
    /// `prefs` is shared with the caller when given; otherwise the session
    /// owns a default set.
    pub fn new(
        host: HostInfo,
        app: AppInfo,
        prefs: Option<Arc<StreamingPreferences>>,
        deps: SessionDeps,
    ) -> Self {
        let prefs = prefs.unwrap_or_default();
        let (events, queue) = EventQueue::new();
        let shared = Arc::new(SessionShared::new(
            events,
            Arc::clone(&deps.ui),
            prefs.connection_warnings,
        ));
        // Windowed sessions toggle into desktop full-screen.
        let fullscreen_flavour =
            FullscreenMode::for_window_mode(prefs.window_mode).unwrap_or(FullscreenMode::Desktop);

        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            host,
            app,
            prefs,
            timing: SessionTiming::default(),
            hevc_fixup_required: cfg!(target_os = "macos"),
            fullscreen_flavour,
            platform: deps.platform,
            transport: deps.transport,
            control: deps.control,
            audio: deps.audio,
            input_backend: deps.input,
            decoders: deps.decoders,
            ui: deps.ui,
            admission: deps.admission,
            shared,
            queue,
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
        }
    }

    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// See [`StreamConfigBuilder::hevc_fixup_required`].
    pub fn with_hevc_fixup_check(mut self, required: bool) -> Self {
        self.hevc_fixup_required = required;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.lock().clone()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.shared))
    }

    /// Run the session to completion on the current (main) thread.
    ///
    /// Returns once the event loop has ended and main-thread teardown is
    /// done; the transport stop and optional remote quit continue in the
    /// background behind the returned handle.
    pub async fn exec(&mut self, display_origin: (i32, i32)) -> CleanupHandle {
        let negotiated = match self.initialize().await {
            Ok(negotiated) => negotiated,
            Err(e) => return self.abandon(e),
        };

        // Leave time to read whatever is on screen before connecting.
        self.pace(self.timing.pre_connect_delay()).await;

        self.transition(SessionPhase::await_admission);
        let permit = match self.admission.acquire(self.id).await {
            Ok(permit) => permit,
            Err(e) => {
                self.platform.quit_video();
                return self.abandon(e);
            }
        };

        match self.start(&negotiated, display_origin).await {
            Ok(mut stream) => {
                self.run_event_loop(&mut stream).await;
                self.teardown(&stream);
            }
            Err(e) => {
                error!(session = self.id, "session start failed: {e}");
                self.shared.input.destroy();
                self.platform.quit_video();
            }
        }

        self.transition(SessionPhase::begin_cleanup);
        self.spawn_cleanup(permit)
    }

    /// Failure before admission: nothing to clean up off-thread.
    fn abandon(&mut self, e: SessionError) -> CleanupHandle {
        error!(session = self.id, "session initialization failed: {e}");
        self.transition(SessionPhase::begin_cleanup);
        self.transition(SessionPhase::finish_cleanup);
        self.ui.emit(UiEvent::SessionFinished);
        CleanupHandle::completed()
    }

    fn transition(&self, step: fn(&mut SessionPhase) -> Result<(), SessionError>) {
        let mut phase = self.phase.lock();
        if let Err(e) = step(&mut phase) {
            warn!(session = self.id, "{e} (phase {})", *phase);
        }
    }

    /// Wait while keeping the UI responsive.
    async fn pace(&self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        let step = self.timing.ui_pump_interval().max(Duration::from_millis(1));
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(step.min(remaining)).await;
            self.ui.process_pending();
        }
    }

    // ── Initializing / Validating ────────────────────────────────

    async fn initialize(&mut self) -> Result<Negotiated, SessionError> {
        self.transition(SessionPhase::begin_initialize);
        self.platform
            .init_video()
            .map_err(SessionError::VideoSubsystem)?;

        let probe_spec = WindowSpec {
            title: String::new(),
            geometry: WindowGeometry {
                display: 0,
                width: 1280,
                height: 720,
            },
            hidden: true,
        };
        let probe = match self.platform.create_window(&probe_spec) {
            Ok(window) => window,
            Err(e) => {
                self.platform.quit_video();
                return Err(SessionError::ProbeWindow(e));
            }
        };

        info!("Server GPU: {}", self.host.gpu_model);
        info!("Server GFE version: {}", self.host.gfe_version);

        let builder = StreamConfigBuilder::new(&self.prefs, &self.host, &self.decoders)
            .probe_window(Some(probe))
            .hevc_fixup_required(self.hevc_fixup_required);
        let mut config = builder.build();
        let video_capabilities = builder.video_capabilities(&config);

        self.transition(SessionPhase::begin_validation);
        let unmapped_gamepads = self.input_backend.unmapped_gamepads();
        let report = LaunchValidator {
            prefs: &self.prefs,
            host: &self.host,
            app: &self.app,
            decoders: &self.decoders,
            audio: self.audio.as_ref(),
            probe_window: Some(probe),
            unmapped_gamepads: &unmapped_gamepads,
        }
        .validate(&mut config);
        self.platform.destroy_window(probe);

        for warning in &report.warnings {
            self.ui.emit(UiEvent::LaunchWarning(warning.clone()));
            self.pace(self.timing.launch_warning_pacing()).await;
        }

        if let Some(message) = report.fatal {
            self.ui.emit(UiEvent::LaunchError(message.clone()));
            self.platform.quit_video();
            return Err(SessionError::Validation(message));
        }

        self.shared
            .bitrate_kbps
            .store(config.bitrate_kbps, Ordering::Relaxed);
        Ok(Negotiated {
            config,
            video_capabilities,
            audio_disabled: report.audio_disabled,
        })
    }

    // ── Launching / TransportStarting ────────────────────────────

    async fn start(
        &mut self,
        negotiated: &Negotiated,
        display_origin: (i32, i32),
    ) -> Result<ActiveStream, SessionError> {
        self.transition(SessionPhase::begin_launch);
        let config = &negotiated.config;

        let handler = self.input_backend.create(
            &self.prefs,
            &self.host,
            config.width,
            config.height,
            self.handle(),
        );
        let gamepad_mask = handler.attached_gamepad_mask();
        self.shared.input.install(handler);

        // Host-side optimizations reset unknown resolutions to 720p.
        let game_optimizations = if self.host.supports_resolution(config.width, config.height) {
            info!(
                "Found host supported resolution: {}x{}",
                config.width, config.height
            );
            self.prefs.game_optimizations
        } else {
            false
        };

        let launched = if self.host.current_game_id != 0 {
            self.control.resume_app(config).await
        } else {
            self.control
                .launch_app(
                    self.app.id,
                    config,
                    game_optimizations,
                    self.prefs.play_audio_on_host,
                    gamepad_mask,
                )
                .await
        };
        if let Err(e) = launched {
            self.ui.emit(UiEvent::LaunchError(e.user_message()));
            return Err(e.into());
        }

        self.transition(SessionPhase::begin_transport);
        let callbacks = Arc::new(SessionCallbacks::new(Arc::clone(&self.shared)));
        let transport_callbacks = TransportCallbacks {
            connection: callbacks.clone(),
            video: callbacks,
            video_capabilities: negotiated.video_capabilities,
            audio: (!negotiated.audio_disabled).then(|| Arc::clone(&self.audio)),
        };
        // A failed stage has already been reported through the callbacks.
        self.transport
            .start_connection(&ServerInfo::from(&self.host), config, transport_callbacks)
            .map_err(|e| SessionError::TransportStart { code: e.0 })?;

        self.ui.emit(UiEvent::ConnectionStarted);
        self.ui.process_pending();

        self.open_stream_window(config, display_origin)
    }

    fn open_stream_window(
        &mut self,
        config: &StreamConfiguration,
        display_origin: (i32, i32),
    ) -> Result<ActiveStream, SessionError> {
        let windowed = self.prefs.window_mode == WindowMode::Windowed;
        let stream_size = (config.width, config.height);
        let display = display_at_origin(self.platform.as_ref(), display_origin);

        let geometry = window_geometry(self.platform.as_ref(), None, display, !windowed, stream_size);
        let window = self
            .platform
            .create_window(&WindowSpec {
                title: WINDOW_TITLE.to_string(),
                geometry,
                hidden: false,
            })
            .map_err(SessionError::WindowCreation)?;

        let mut stream = ActiveStream {
            window,
            config: config.clone(),
            display,
            pending_windowed_transition: false,
        };

        if windowed {
            // Decorations are only known once the window exists.
            let geometry =
                window_geometry(self.platform.as_ref(), Some(window), display, false, stream_size);
            self.platform.set_window_geometry(window, &geometry);
            self.platform.set_resizable(window, true);
        } else {
            self.update_optimal_display_mode(&stream);
            self.platform.set_fullscreen(window, Some(self.fullscreen_flavour));

            // Release builds only, so a debugger break does not trap the
            // pointer.
            if !cfg!(debug_assertions) {
                self.shared.input.with(|h| h.set_capture_active(true));
            }
        }

        self.platform.set_screen_saver_enabled(false);
        stream.display = self.platform.window_display_index(window);
        Ok(stream)
    }

    /// Descriptor reported by the transport, or the negotiated
    /// configuration if none arrived.
    fn active_video(&self, config: &StreamConfiguration) -> VideoStreamDescriptor {
        let reported = *self.shared.active_video.lock();
        reported.unwrap_or_else(|| VideoStreamDescriptor {
            format: if config.enable_hdr {
                VideoFormat::H265Main10
            } else {
                config.video_format()
            },
            width: config.width,
            height: config.height,
            frame_rate: config.fps,
        })
    }
}
