//! Scripted fakes for driving a whole session without a window system,
//! a host or a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::ffi::c_int;
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

use nimbus_core::ffi::{
    DR_NEED_IDR, DR_OK, FRAME_TYPE_IDR, FRAME_TYPE_PFRAME, RawCallbackTables, RawDecodeUnit,
};
use nimbus_core::input::{
    ControllerAxisEvent, ControllerButtonEvent, ControllerDeviceEvent, JoystickDeviceEvent,
    KeyEvent, MouseButtonEvent, MouseMotionEvent, MouseWheelEvent, TouchFingerEvent,
};
use nimbus_core::{
    AdmissionGate, AppInfo, AudioBackend, AudioConfiguration, Borders, ChannelUi, ControlError,
    ControlPlane, DecodeStatus, DecodeUnit, DecoderBackend, DecoderCapabilities, DecoderInitError,
    DecoderParams, DecoderSelector, DisplayMode, EventSender, FrameType, FullscreenMode, HostInfo,
    InputBackend, InputHandler, LoggingConfig, Platform, PlatformError, PlatformEvent, Rect, ServerCodecModes,
    ServerInfo, Session, SessionDeps, SessionHandle, SessionTiming, Stage, StreamConfiguration,
    StreamTransport, StreamingPreferences, TransportCallbacks, TransportError, UiEvent,
    VideoDecoder, VideoFormat, WindowEvent, WindowGeometry, WindowHandle, WindowSpec,
};

// ── Script ───────────────────────────────────────────────────────

/// One `pump_events` call worth of platform activity.
pub enum Step {
    Events(Vec<PlatformEvent>),
    /// The transport reports the connection ended with this code.
    Terminate(i64),
    Rumble(u16, u16, u16),
    /// The transport delivers one decode unit.
    SubmitFrame(FrameType),
    /// The window lands on another display without any event of its own.
    MoveToDisplay(usize),
}

pub fn events(events: impl IntoIterator<Item = PlatformEvent>) -> Step {
    Step::Events(events.into_iter().collect())
}

pub fn idle() -> Step {
    Step::Events(Vec::new())
}

pub fn window(event: WindowEvent) -> PlatformEvent {
    PlatformEvent::Window(event)
}

/// `event` triggers a decoder rebuild, which pumps twice more.
pub fn recreate_on(event: PlatformEvent) -> [Step; 3] {
    [events([event]), idle(), idle()]
}

pub fn quit() -> Step {
    events([PlatformEvent::Quit])
}

// ── Platform ─────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PlatformLog {
    pub video_up: bool,
    pub quit_video_calls: usize,
    pub created: Vec<WindowSpec>,
    pub live_windows: Vec<WindowHandle>,
    pub fullscreen: Option<FullscreenMode>,
    pub resizable: bool,
    pub screen_saver_enabled: bool,
    pub geometry_set: Vec<WindowGeometry>,
    pub display_modes_set: Vec<DisplayMode>,
    pub frame_submissions: Vec<DecodeStatus>,
    pub window_display: usize,
}

impl Default for PlatformLog {
    fn default() -> Self {
        Self {
            video_up: false,
            quit_video_calls: 0,
            created: Vec::new(),
            live_windows: Vec::new(),
            fullscreen: None,
            resizable: false,
            screen_saver_enabled: true,
            geometry_set: Vec::new(),
            display_modes_set: Vec::new(),
            frame_submissions: Vec::new(),
            window_display: 0,
        }
    }
}

pub struct FakePlatform {
    log: Arc<Mutex<PlatformLog>>,
    script: VecDeque<Step>,
    transport: Arc<FakeTransport>,
    next_window: u64,
    next_frame: u32,
    refresh_rate: u32,
}

impl FakePlatform {
    const DESKTOP: DisplayMode = DisplayMode {
        width: 1920,
        height: 1080,
        refresh_rate: 60,
    };
}

impl Platform for FakePlatform {
    fn init_video(&mut self) -> Result<(), PlatformError> {
        self.log.lock().video_up = true;
        Ok(())
    }

    fn quit_video(&mut self) {
        let mut log = self.log.lock();
        log.video_up = false;
        log.quit_video_calls += 1;
    }

    fn create_window(&mut self, spec: &WindowSpec) -> Result<WindowHandle, PlatformError> {
        self.next_window += 1;
        let handle = WindowHandle(self.next_window);
        let mut log = self.log.lock();
        log.created.push(spec.clone());
        log.live_windows.push(handle);
        Ok(handle)
    }

    fn destroy_window(&mut self, window: WindowHandle) {
        self.log.lock().live_windows.retain(|w| *w != window);
    }

    fn pump_events(&mut self, sink: &EventSender) {
        match self.script.pop_front() {
            Some(Step::Events(events)) => events.into_iter().for_each(|e| sink.push(e)),
            Some(Step::Terminate(code)) => {
                self.transport.deliver(|d| d.connection_terminated(code));
            }
            Some(Step::Rumble(controller, low, high)) => {
                self.transport.deliver(|d| d.rumble(controller, low, high));
            }
            Some(Step::SubmitFrame(frame_type)) => {
                self.next_frame += 1;
                let frame_number = self.next_frame;
                let status = self
                    .transport
                    .deliver(|d| d.submit_decode_unit(frame_number, frame_type));
                self.log.lock().frame_submissions.push(status);
            }
            Some(Step::MoveToDisplay(index)) => self.log.lock().window_display = index,
            // Out of script: end the session.
            None => sink.push_quit(),
        }
    }

    fn display_count(&self) -> usize {
        2
    }

    fn display_bounds(&self, display: usize) -> Result<Rect, PlatformError> {
        match display {
            0 => Ok(Rect {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            }),
            1 => Ok(Rect {
                x: 1920,
                y: 0,
                width: 1920,
                height: 1080,
            }),
            _ => Err("no such display".into()),
        }
    }

    fn usable_display_bounds(&self, display: usize) -> Result<Rect, PlatformError> {
        let mut bounds = self.display_bounds(display)?;
        bounds.height -= 40;
        Ok(bounds)
    }

    fn window_display_index(&self, _window: WindowHandle) -> usize {
        self.log.lock().window_display
    }

    fn window_borders(&self, _window: WindowHandle) -> Option<Borders> {
        Some(Borders {
            top: 30,
            left: 1,
            bottom: 1,
            right: 1,
        })
    }

    fn fullscreen_mode(&self, _window: WindowHandle) -> Option<FullscreenMode> {
        self.log.lock().fullscreen
    }

    fn set_fullscreen(&mut self, _window: WindowHandle, mode: Option<FullscreenMode>) {
        self.log.lock().fullscreen = mode;
    }

    fn set_resizable(&mut self, _window: WindowHandle, resizable: bool) {
        self.log.lock().resizable = resizable;
    }

    fn set_window_geometry(&mut self, _window: WindowHandle, geometry: &WindowGeometry) {
        self.log.lock().geometry_set.push(*geometry);
    }

    fn desktop_display_mode(&self, _display: usize) -> Result<DisplayMode, PlatformError> {
        Ok(Self::DESKTOP)
    }

    fn native_display_mode(&self, _display: usize) -> Result<DisplayMode, PlatformError> {
        Ok(Self::DESKTOP)
    }

    fn display_modes(&self, _display: usize) -> Vec<DisplayMode> {
        vec![
            Self::DESKTOP,
            DisplayMode {
                refresh_rate: 120,
                ..Self::DESKTOP
            },
        ]
    }

    fn set_window_display_mode(&mut self, _window: WindowHandle, mode: DisplayMode) {
        self.log.lock().display_modes_set.push(mode);
    }

    fn refresh_rate(&self, _window: WindowHandle) -> u32 {
        self.refresh_rate
    }

    fn set_screen_saver_enabled(&mut self, enabled: bool) {
        self.log.lock().screen_saver_enabled = enabled;
    }
}

// ── Transport ────────────────────────────────────────────────────

const PAYLOAD: [u8; 5] = [0, 0, 0, 1, 0x65];

#[derive(Default)]
pub struct TransportState {
    pub live: usize,
    pub max_live: usize,
    pub starts: usize,
    pub stops: usize,
    pub callbacks: Option<TransportCallbacks>,
    /// Present when the transport talks through the C tables.
    pub tables: Option<RawCallbackTables>,
    pub config: Option<StreamConfiguration>,
    pub server: Option<ServerInfo>,
    pub audio_enabled: bool,
}

/// Routes transport notifications either through the Rust traits or, for a
/// native transport, through the C function pointers.
pub struct Delivery<'a> {
    callbacks: &'a TransportCallbacks,
    tables: Option<&'a RawCallbackTables>,
}

impl Delivery<'_> {
    fn stage_starting(&self, stage: Stage) {
        match self.tables {
            Some(tables) => {
                let table = *tables.connection();
                unsafe { (table.stage_starting)(table.context, stage_index(stage)) }
            }
            None => self.callbacks.connection.stage_starting(stage),
        }
    }

    fn stage_failed(&self, stage: Stage, code: i32) {
        match self.tables {
            Some(tables) => {
                let table = *tables.connection();
                unsafe { (table.stage_failed)(table.context, stage_index(stage), code) }
            }
            None => self
                .callbacks
                .connection
                .stage_failed(stage, i64::from(code)),
        }
    }

    fn setup(&self, format: VideoFormat, config: &StreamConfiguration) {
        match self.tables {
            Some(tables) => {
                let table = *tables.video();
                let status = unsafe {
                    (table.setup)(
                        table.context,
                        format.raw() as c_int,
                        config.width as c_int,
                        config.height as c_int,
                        config.fps as c_int,
                    )
                };
                assert_eq!(status, 0, "setup rejected {format:?}");
            }
            None => self
                .callbacks
                .video
                .setup(format, config.width, config.height, config.fps),
        }
    }

    pub fn connection_terminated(&self, code: i64) {
        match self.tables {
            Some(tables) => {
                let table = *tables.connection();
                unsafe { (table.connection_terminated)(table.context, code as c_int) }
            }
            None => self.callbacks.connection.connection_terminated(code),
        }
    }

    pub fn rumble(&self, controller: u16, low: u16, high: u16) {
        match self.tables {
            Some(tables) => {
                let table = *tables.connection();
                unsafe { (table.rumble)(table.context, controller, low, high) }
            }
            None => self.callbacks.connection.rumble(controller, low, high),
        }
    }

    pub fn submit_decode_unit(&self, frame_number: u32, frame_type: FrameType) -> DecodeStatus {
        match self.tables {
            Some(tables) => {
                let table = *tables.video();
                let unit = RawDecodeUnit {
                    frame_number: frame_number as c_int,
                    frame_type: match frame_type {
                        FrameType::Idr => FRAME_TYPE_IDR,
                        FrameType::PFrame => FRAME_TYPE_PFRAME,
                    },
                    data: PAYLOAD.as_ptr(),
                    length: PAYLOAD.len() as c_int,
                };
                match unsafe { (table.submit_decode_unit)(table.context, &unit) } {
                    DR_OK => DecodeStatus::Ok,
                    DR_NEED_IDR => DecodeStatus::NeedKeyframe,
                    other => panic!("unexpected decode status {other}"),
                }
            }
            None => {
                let unit = DecodeUnit::new(frame_number, frame_type, Bytes::from_static(&PAYLOAD));
                self.callbacks.video.submit_decode_unit(&unit)
            }
        }
    }
}

fn stage_index(stage: Stage) -> c_int {
    (0..=10)
        .find(|&i| Stage::from_raw(i) == Some(stage))
        .expect("every stage has an index")
}

#[derive(Default)]
pub struct FakeTransport {
    pub fail_code: Option<i32>,
    /// Drive the session through [`RawCallbackTables`] like a C library.
    pub native: bool,
    pub state: Mutex<TransportState>,
}

impl FakeTransport {
    pub fn failing(code: i32) -> Self {
        Self {
            fail_code: Some(code),
            ..Default::default()
        }
    }

    pub fn native() -> Self {
        Self {
            native: true,
            ..Default::default()
        }
    }

    /// Call back into the session from the "network thread".
    pub fn deliver<R>(&self, f: impl FnOnce(Delivery<'_>) -> R) -> R {
        let state = self.state.lock();
        let callbacks = state
            .callbacks
            .as_ref()
            .expect("script step needs a started transport");
        f(Delivery {
            callbacks,
            tables: state.tables.as_ref(),
        })
    }
}

impl StreamTransport for FakeTransport {
    fn start_connection(
        &self,
        server: &ServerInfo,
        config: &StreamConfiguration,
        callbacks: TransportCallbacks,
    ) -> Result<(), TransportError> {
        let tables = self.native.then(|| RawCallbackTables::new(&callbacks));
        {
            let mut state = self.state.lock();
            state.starts += 1;
            state.server = Some(server.clone());
            state.config = Some(config.clone());
            state.audio_enabled = callbacks.audio.is_some();
        }

        let delivery = Delivery {
            callbacks: &callbacks,
            tables: tables.as_ref(),
        };
        delivery.stage_starting(Stage::RtspHandshake);
        if let Some(code) = self.fail_code {
            delivery.stage_failed(Stage::RtspHandshake, code);
            return Err(TransportError(code));
        }

        let format = if config.enable_hdr {
            VideoFormat::H265Main10
        } else {
            config.video_format()
        };
        delivery.setup(format, config);

        let mut state = self.state.lock();
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.callbacks = Some(callbacks);
        state.tables = tables;
        Ok(())
    }

    fn stop_connection(&self) {
        let mut state = self.state.lock();
        state.stops += 1;
        state.live = state.live.saturating_sub(1);
        state.tables = None;
        state.callbacks = None;
    }
}

// ── Control plane ────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeControl {
    pub launch_error: Option<ControlError>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ControlPlane for FakeControl {
    async fn resume_app(&self, _config: &StreamConfiguration) -> Result<(), ControlError> {
        self.calls.lock().push("resume".into());
        self.launch_error.clone().map_or(Ok(()), Err)
    }

    async fn launch_app(
        &self,
        app_id: u32,
        _config: &StreamConfiguration,
        game_optimizations: bool,
        play_audio_on_host: bool,
        gamepad_mask: u16,
    ) -> Result<(), ControlError> {
        self.calls.lock().push(format!(
            "launch {app_id} sops={game_optimizations} host_audio={play_audio_on_host} gamepads={gamepad_mask:#x}"
        ));
        self.launch_error.clone().map_or(Ok(()), Err)
    }

    async fn quit_app(&self) -> Result<(), ControlError> {
        self.calls.lock().push("quit".into());
        Ok(())
    }
}

// ── Input ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InputLog {
    pub calls: Mutex<Vec<String>>,
    pub created: AtomicUsize,
    pub dropped: AtomicUsize,
}

impl InputLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

pub struct FakeInputBackend {
    pub log: Arc<InputLog>,
    pub unmapped: Vec<String>,
}

impl InputBackend for FakeInputBackend {
    fn create(
        &self,
        _prefs: &StreamingPreferences,
        _host: &HostInfo,
        _stream_width: u32,
        _stream_height: u32,
        session: SessionHandle,
    ) -> Box<dyn InputHandler> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeInputHandler {
            log: Arc::clone(&self.log),
            _session: session,
        })
    }

    fn unmapped_gamepads(&self) -> Vec<String> {
        self.unmapped.clone()
    }
}

struct FakeInputHandler {
    log: Arc<InputLog>,
    _session: SessionHandle,
}

impl Drop for FakeInputHandler {
    fn drop(&mut self) {
        self.log.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl InputHandler for FakeInputHandler {
    fn rumble(&mut self, controller: u16, low_freq_motor: u16, high_freq_motor: u16) {
        self.log
            .record(format!("rumble {controller} {low_freq_motor} {high_freq_motor}"));
    }
    fn set_capture_active(&mut self, active: bool) {
        self.log.record(format!("capture {active}"));
    }
    fn raise_all_keys(&mut self) {
        self.log.record("raise_all_keys");
    }
    fn attached_gamepad_mask(&self) -> u16 {
        0x1
    }
    fn handle_key_event(&mut self, event: &KeyEvent) {
        self.log.record(format!("key {}", event.scancode));
    }
    fn handle_mouse_button_event(&mut self, _event: &MouseButtonEvent) {
        self.log.record("mouse_button");
    }
    fn handle_mouse_motion_event(&mut self, _event: &MouseMotionEvent) {
        self.log.record("mouse_motion");
    }
    fn handle_mouse_wheel_event(&mut self, _event: &MouseWheelEvent) {
        self.log.record("mouse_wheel");
    }
    fn handle_controller_axis_event(&mut self, _event: &ControllerAxisEvent) {
        self.log.record("controller_axis");
    }
    fn handle_controller_button_event(&mut self, _event: &ControllerButtonEvent) {
        self.log.record("controller_button");
    }
    fn handle_controller_device_event(&mut self, _event: &ControllerDeviceEvent) {
        self.log.record("controller_device");
    }
    fn handle_joystick_arrival_event(&mut self, _event: &JoystickDeviceEvent) {
        self.log.record("joystick");
    }
    fn handle_touch_finger_event(&mut self, _event: &TouchFingerEvent) {
        self.log.record("touch");
    }
}

// ── Audio ────────────────────────────────────────────────────────

pub struct FakeAudio {
    pub supported: Vec<AudioConfiguration>,
}

impl AudioBackend for FakeAudio {
    fn test_config(&self, config: AudioConfiguration) -> bool {
        self.supported.contains(&config)
    }
}

// ── Decoders ─────────────────────────────────────────────────────

/// Counts only decoders built for rendering, not capability probes.
#[derive(Default)]
pub struct DecoderStats {
    pub created: AtomicUsize,
    pub live: AtomicIsize,
    pub rendered: AtomicUsize,
    pub decoded: AtomicUsize,
    pub params: Mutex<Vec<DecoderParams>>,
}

struct FakeDecoder {
    formats: Vec<VideoFormat>,
    hardware: bool,
    test_only: bool,
    fail_render: bool,
    counted: bool,
    stats: Arc<DecoderStats>,
}

impl VideoDecoder for FakeDecoder {
    fn initialize(&mut self, params: &DecoderParams) -> Result<(), DecoderInitError> {
        if !self.formats.contains(&params.video_format) {
            return Err(DecoderInitError("unsupported format".into()));
        }
        if self.test_only {
            return Ok(());
        }
        if self.fail_render {
            return Err(DecoderInitError("renderer unavailable".into()));
        }
        self.counted = true;
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        self.stats.params.lock().push(params.clone());
        Ok(())
    }

    fn submit_decode_unit(&mut self, _unit: &DecodeUnit) -> DecodeStatus {
        self.stats.decoded.fetch_add(1, Ordering::SeqCst);
        DecodeStatus::Ok
    }

    fn is_hardware_accelerated(&self) -> bool {
        self.hardware
    }

    fn capabilities(&self) -> DecoderCapabilities {
        DecoderCapabilities::DIRECT_SUBMIT
    }

    fn render_frame_on_main_thread(&mut self) {
        self.stats.rendered.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        if self.counted {
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// A hardware backend for `hw_formats` ahead of a software backend that
/// decodes everything.
fn decoder_selector(
    stats: &Arc<DecoderStats>,
    hw_formats: Vec<VideoFormat>,
    fail_render: bool,
) -> DecoderSelector {
    let backend = |name: &'static str, formats: Vec<VideoFormat>, hardware: bool| {
        let stats = Arc::clone(stats);
        DecoderBackend::new(name, move |test_only| {
            Box::new(FakeDecoder {
                formats: formats.clone(),
                hardware,
                test_only,
                fail_render,
                counted: false,
                stats: Arc::clone(&stats),
            }) as Box<dyn VideoDecoder>
        })
    };
    let all = vec![VideoFormat::H264, VideoFormat::H265, VideoFormat::H265Main10];
    DecoderSelector::new(vec![backend("hw", hw_formats, true), backend("sw", all, false)])
}

// ── Scenario ─────────────────────────────────────────────────────

pub struct Scenario {
    pub prefs: StreamingPreferences,
    pub host: HostInfo,
    pub app: AppInfo,
    pub script: Vec<Step>,
    pub hw_formats: Vec<VideoFormat>,
    pub fail_render: bool,
    pub audio: Vec<AudioConfiguration>,
    pub launch_error: Option<ControlError>,
    pub transport: Arc<FakeTransport>,
    pub unmapped_gamepads: Vec<String>,
    pub refresh_rate: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            prefs: StreamingPreferences::default(),
            host: HostInfo {
                name: "desk".into(),
                active_address: "192.168.1.20".into(),
                gfe_version: "3.20.1.40".into(),
                app_version: "7.1.431.-1".into(),
                gpu_model: "GeForce RTX 3070".into(),
                max_luma_pixels_hevc: 8_912_896,
                server_codec_mode_support: ServerCodecModes::all(),
                ..Default::default()
            },
            app: AppInfo {
                id: 42,
                name: "Desktop".into(),
                hdr_supported: true,
            },
            script: Vec::new(),
            hw_formats: vec![VideoFormat::H264, VideoFormat::H265, VideoFormat::H265Main10],
            fail_render: false,
            audio: vec![AudioConfiguration::STEREO, AudioConfiguration::SURROUND_51],
            launch_error: None,
            transport: Arc::new(FakeTransport::default()),
            unmapped_gamepads: Vec::new(),
            refresh_rate: 60,
        }
    }
}

/// Observation points into a built session's fakes.
pub struct Harness {
    pub platform: Arc<Mutex<PlatformLog>>,
    pub transport: Arc<FakeTransport>,
    pub control: Arc<FakeControl>,
    pub input: Arc<InputLog>,
    pub decoders: Arc<DecoderStats>,
    pub ui: UnboundedReceiver<UiEvent>,
}

impl Harness {
    /// Everything emitted so far, in order.
    pub fn ui_events(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.ui.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn control_calls(&self) -> Vec<String> {
        self.control.calls.lock().clone()
    }
}

impl Scenario {
    pub fn build(self, admission: &AdmissionGate) -> (Session, Harness) {
        nimbus_core::logging::init(&LoggingConfig {
            level: "debug".into(),
        });

        let platform_log = Arc::new(Mutex::new(PlatformLog::default()));
        let control = Arc::new(FakeControl {
            launch_error: self.launch_error,
            ..Default::default()
        });
        let input = Arc::new(InputLog::default());
        let decoders = Arc::new(DecoderStats::default());
        let (ui, ui_rx) = ChannelUi::new();

        let deps = SessionDeps {
            platform: Box::new(FakePlatform {
                log: Arc::clone(&platform_log),
                script: self.script.into(),
                transport: Arc::clone(&self.transport),
                next_window: 0,
                next_frame: 0,
                refresh_rate: self.refresh_rate,
            }),
            transport: self.transport.clone(),
            control: control.clone(),
            audio: Arc::new(FakeAudio {
                supported: self.audio,
            }),
            input: Arc::new(FakeInputBackend {
                log: Arc::clone(&input),
                unmapped: self.unmapped_gamepads,
            }),
            decoders: Arc::new(decoder_selector(&decoders, self.hw_formats, self.fail_render)),
            ui: Arc::new(ui),
            admission: admission.clone(),
        };

        let session = Session::new(self.host, self.app, Some(Arc::new(self.prefs)), deps)
            .with_timing(SessionTiming::immediate())
            .with_hevc_fixup_check(false);

        let harness = Harness {
            platform: platform_log,
            transport: self.transport,
            control,
            input,
            decoders,
            ui: ui_rx,
        };
        (session, harness)
    }
}

/// Run `session` to completion, including deferred cleanup.
pub async fn run(session: &mut Session) {
    session.exec((0, 0)).await.wait().await;
}
