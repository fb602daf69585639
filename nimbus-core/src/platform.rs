//! Window-system contract and the session's platform event queue.
//!
//! A [`Platform`] is the main-thread-only capability the session drives:
//! video subsystem, windows, displays, full-screen state. It is not `Send`.
//!
//! Events reach the event loop through an [`EventQueue`]. The platform
//! pushes window-system events into it from [`Platform::pump_events`];
//! other threads (transport callbacks, decoders, the input layer) post
//! through a cloned [`EventSender`].

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::PlatformError;
use crate::input::InputEvent;
use crate::preferences::WindowMode;

/// Opaque identifier of a platform window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

// ── Geometry ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Window decoration sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// Full-screen flavour used for the stream window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenMode {
    /// Exclusive mode switch.
    Exclusive,
    /// Borderless window covering the display.
    Desktop,
}

impl FullscreenMode {
    /// Flavour for a window mode preference; `None` for windowed.
    pub fn for_window_mode(mode: WindowMode) -> Option<Self> {
        match mode {
            WindowMode::Fullscreen => Some(Self::Exclusive),
            WindowMode::FullscreenDesktop => Some(Self::Desktop),
            WindowMode::Windowed => None,
        }
    }
}

/// Size of a window centred on a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub display: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub geometry: WindowGeometry,
    pub hidden: bool,
}

// ── Events ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Shown,
    Hidden,
    Moved,
    SizeChanged { width: u32, height: u32 },
    FocusGained,
    FocusLost,
    Other,
}

/// Everything the session event loop dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Quit,
    /// A decoder has a frame that must be presented on the main thread.
    FrameReady,
    Window(WindowEvent),
    RenderDeviceReset,
    RenderTargetsReset,
    /// Posted by the input layer's full-screen shortcut.
    ToggleFullscreen,
    Input(InputEvent),
}

impl PlatformEvent {
    pub fn is_window(&self) -> bool {
        matches!(self, Self::Window(_))
    }

    pub fn is_render_reset(&self) -> bool {
        matches!(self, Self::RenderDeviceReset | Self::RenderTargetsReset)
    }
}

// ── EventQueue ───────────────────────────────────────────────────

/// Thread-safe handle for posting into an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl EventSender {
    /// Post an event. Dropped silently once the loop has shut down.
    pub fn push(&self, event: PlatformEvent) {
        let _ = self.tx.send(event);
    }

    pub fn push_quit(&self) {
        self.push(PlatformEvent::Quit);
    }
}

/// Main-thread FIFO of platform events.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<PlatformEvent>,
    backlog: VecDeque<PlatformEvent>,
}

impl EventQueue {
    pub fn new() -> (EventSender, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventSender { tx },
            EventQueue {
                rx,
                backlog: VecDeque::new(),
            },
        )
    }

    /// Next pending event, without waiting.
    pub fn next(&mut self) -> Option<PlatformEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.rx.try_recv().ok()
    }

    /// Discard every pending event matching `pred`. Returns how many were
    /// dropped.
    pub fn flush(&mut self, pred: impl Fn(&PlatformEvent) -> bool) -> usize {
        while let Ok(event) = self.rx.try_recv() {
            self.backlog.push_back(event);
        }
        let before = self.backlog.len();
        self.backlog.retain(|event| !pred(event));
        before - self.backlog.len()
    }
}

// ── Platform ─────────────────────────────────────────────────────

/// Window-system capability. Every method is called on the main thread.
pub trait Platform {
    fn init_video(&mut self) -> Result<(), PlatformError>;
    fn quit_video(&mut self);

    fn create_window(&mut self, spec: &WindowSpec) -> Result<WindowHandle, PlatformError>;
    fn destroy_window(&mut self, window: WindowHandle);

    /// Move pending window-system events into `sink`.
    fn pump_events(&mut self, sink: &EventSender);

    fn display_count(&self) -> usize;
    fn display_bounds(&self, display: usize) -> Result<Rect, PlatformError>;
    /// Bounds minus task bars, docks and the like.
    fn usable_display_bounds(&self, display: usize) -> Result<Rect, PlatformError>;

    fn window_display_index(&self, window: WindowHandle) -> usize;
    fn window_borders(&self, window: WindowHandle) -> Option<Borders>;
    /// Current full-screen state, `None` when windowed.
    fn fullscreen_mode(&self, window: WindowHandle) -> Option<FullscreenMode>;
    fn set_fullscreen(&mut self, window: WindowHandle, mode: Option<FullscreenMode>);
    fn set_resizable(&mut self, window: WindowHandle, resizable: bool);
    /// Resize, then centre on `geometry.display`.
    fn set_window_geometry(&mut self, window: WindowHandle, geometry: &WindowGeometry);

    fn desktop_display_mode(&self, display: usize) -> Result<DisplayMode, PlatformError>;
    /// Unscaled panel mode.
    fn native_display_mode(&self, display: usize) -> Result<DisplayMode, PlatformError>;
    fn display_modes(&self, display: usize) -> Vec<DisplayMode>;
    fn set_window_display_mode(&mut self, window: WindowHandle, mode: DisplayMode);
    /// Refresh rate of the display the window is on.
    fn refresh_rate(&self, window: WindowHandle) -> u32;

    fn set_screen_saver_enabled(&mut self, enabled: bool);

    /// Whether the last focus gain came from a click in the client area.
    fn activated_by_click(&self, _window: WindowHandle) -> bool {
        false
    }
}

// ── Display helpers ──────────────────────────────────────────────

/// Highest-refresh mode at the desktop resolution that `fps` evenly
/// divides.
fn best_divisible_mode(desktop: DisplayMode, modes: &[DisplayMode], fps: u32) -> Option<DisplayMode> {
    if fps == 0 {
        return None;
    }
    modes
        .iter()
        .filter(|m| m.width == desktop.width && m.height == desktop.height)
        .filter(|m| m.refresh_rate != 0 && m.refresh_rate % fps == 0)
        .max_by_key(|m| m.refresh_rate)
        .copied()
}

/// [`best_divisible_mode`], or the desktop mode itself when none matches
/// (a 120 fps stream on a 60 Hz panel, say).
pub fn choose_display_mode(desktop: DisplayMode, modes: &[DisplayMode], fps: u32) -> DisplayMode {
    best_divisible_mode(desktop, modes, fps).unwrap_or_else(|| {
        warn!("no matching refresh rate found; using desktop mode");
        desktop
    })
}

/// Windowed size inside `usable`, minus decorations; shrinks to the
/// stream size when that fits 1:1.
pub fn windowed_size(usable: Rect, borders: Option<Borders>, stream: (u32, u32)) -> (u32, u32) {
    let (mut width, mut height) = (usable.width, usable.height);
    if let Some(b) = borders {
        width = width.saturating_sub(b.left + b.right);
        height = height.saturating_sub(b.top + b.bottom);
    }
    if stream.0 < width && stream.1 < height {
        (stream.0, stream.1)
    } else {
        (width, height)
    }
}

/// Display whose top-left corner is at `origin`, defaulting to 0.
pub fn display_at_origin(platform: &dyn Platform, origin: (i32, i32)) -> usize {
    info!("UI screen is at ({}, {})", origin.0, origin.1);
    for index in 0..platform.display_count() {
        match platform.display_bounds(index) {
            Ok(bounds) if (bounds.x, bounds.y) == origin => {
                info!("found matching display {index}");
                return index;
            }
            Ok(_) => {}
            Err(e) => warn!("display_bounds({index}) failed: {e}"),
        }
    }
    0
}

/// Geometry for the stream window.
///
/// Before the window exists, `display_index` and `fullscreen` come from the
/// caller; afterwards they are read back from the window itself, and
/// decorations are taken into account.
pub fn window_geometry(
    platform: &dyn Platform,
    window: Option<WindowHandle>,
    display_index: usize,
    fullscreen: bool,
    stream: (u32, u32),
) -> WindowGeometry {
    let (index, fullscreen) = match window {
        Some(w) => (
            platform.window_display_index(w),
            platform.fullscreen_mode(w).is_some(),
        ),
        None => (display_index, fullscreen),
    };

    if fullscreen {
        if let Ok(bounds) = platform.display_bounds(index) {
            return WindowGeometry {
                display: index,
                width: bounds.width,
                height: bounds.height,
            };
        }
    }

    match platform.usable_display_bounds(index) {
        Ok(usable) => {
            let (width, height) = match window {
                Some(w) => {
                    let borders = platform.window_borders(w);
                    if borders.is_none() {
                        warn!("unable to get window border size");
                    }
                    windowed_size(usable, borders, stream)
                }
                None => (usable.width, usable.height),
            };
            WindowGeometry {
                display: index,
                width,
                height,
            }
        }
        Err(e) => {
            warn!("usable_display_bounds({index}) failed: {e}");
            WindowGeometry {
                display: index,
                width: stream.0,
                height: stream.1,
            }
        }
    }
}

/// Best display mode for streaming `active` video on display `index`.
///
/// Starts from the desktop mode, or the native panel mode when the
/// desktop mode is smaller than the stream.
pub fn optimal_display_mode(
    platform: &dyn Platform,
    index: usize,
    active: (u32, u32),
    fps: u32,
) -> Option<DisplayMode> {
    let mut desktop = match platform.desktop_display_mode(index) {
        Ok(mode) => mode,
        Err(e) => {
            warn!("desktop_display_mode({index}) failed: {e}");
            return None;
        }
    };
    if desktop.width < active.0 || desktop.height < active.1 {
        desktop = platform.native_display_mode(index).ok()?;
    }

    Some(choose_display_mode(
        desktop,
        &platform.display_modes(index),
        fps,
    ))
}

// ── Tests ────────────────────────────────────────────────────────
