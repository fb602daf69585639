//! Input handler contract and the lock-guarded slot that owns it.
//!
//! The handler itself (keyboard/mouse/gamepad translation, capture) lives
//! outside the core. The session owns exactly one handler at a time in an
//! [`InputSlot`]; the rumble callback reaches it from the transport thread
//! through the same lock that main-thread destruction holds.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::host::HostInfo;
use crate::preferences::StreamingPreferences;
use crate::session::SessionHandle;

/// How long a rumble callback waits for the input lock before dropping
/// the effect. Main-thread critical sections are a single event dispatch.
const RUMBLE_LOCK_WAIT: Duration = Duration::from_millis(5);

// ── Event payloads ───────────────────────────────────────────────

/// Key down/up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scancode: u16,
    pub keycode: i32,
    pub modifiers: u16,
    pub pressed: bool,
    pub repeat: bool,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    X1,
    X2,
}

/// Mouse button pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub pressed: bool,
    pub x: i32,
    pub y: i32,
}

/// Mouse moved (window-relative and relative motion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMotionEvent {
    pub x: i32,
    pub y: i32,
    pub xrel: i32,
    pub yrel: i32,
}

/// Mouse wheel delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheelEvent {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerAxisEvent {
    pub which: i32,
    pub axis: u8,
    pub value: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerButtonEvent {
    pub which: i32,
    pub button: u8,
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerDeviceEvent {
    pub which: i32,
    pub added: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickDeviceEvent {
    pub which: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Motion,
    Up,
}

/// Touch contact, normalised to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchFingerEvent {
    pub finger_id: i64,
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

/// Every input event the event loop forwards to the handler.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    MouseButton(MouseButtonEvent),
    MouseMotion(MouseMotionEvent),
    MouseWheel(MouseWheelEvent),
    ControllerAxis(ControllerAxisEvent),
    ControllerButton(ControllerButtonEvent),
    ControllerDevice(ControllerDeviceEvent),
    JoystickAdded(JoystickDeviceEvent),
    TouchFinger(TouchFingerEvent),
}

// ── Contracts ────────────────────────────────────────────────────

/// Translates local input into host input and plays controller feedback.
pub trait InputHandler: Send {
    fn rumble(&mut self, controller: u16, low_freq_motor: u16, high_freq_motor: u16);

    fn set_capture_active(&mut self, active: bool);

    /// Release every key currently held down.
    fn raise_all_keys(&mut self);

    /// Bitmask of attached gamepads, reported to the host at launch.
    fn attached_gamepad_mask(&self) -> u16;

    fn handle_key_event(&mut self, event: &KeyEvent);
    fn handle_mouse_button_event(&mut self, event: &MouseButtonEvent);
    fn handle_mouse_motion_event(&mut self, event: &MouseMotionEvent);
    fn handle_mouse_wheel_event(&mut self, event: &MouseWheelEvent);
    fn handle_controller_axis_event(&mut self, event: &ControllerAxisEvent);
    fn handle_controller_button_event(&mut self, event: &ControllerButtonEvent);
    fn handle_controller_device_event(&mut self, event: &ControllerDeviceEvent);
    fn handle_joystick_arrival_event(&mut self, event: &JoystickDeviceEvent);
    fn handle_touch_finger_event(&mut self, event: &TouchFingerEvent);

    /// Route `event` to the matching `handle_*` method.
    fn dispatch(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Key(e) => self.handle_key_event(e),
            InputEvent::MouseButton(e) => self.handle_mouse_button_event(e),
            InputEvent::MouseMotion(e) => self.handle_mouse_motion_event(e),
            InputEvent::MouseWheel(e) => self.handle_mouse_wheel_event(e),
            InputEvent::ControllerAxis(e) => self.handle_controller_axis_event(e),
            InputEvent::ControllerButton(e) => self.handle_controller_button_event(e),
            InputEvent::ControllerDevice(e) => self.handle_controller_device_event(e),
            InputEvent::JoystickAdded(e) => self.handle_joystick_arrival_event(e),
            InputEvent::TouchFinger(e) => self.handle_touch_finger_event(e),
        }
    }
}

/// Builds input handlers and answers device queries that do not need one.
pub trait InputBackend: Send + Sync {
    fn create(
        &self,
        prefs: &StreamingPreferences,
        host: &HostInfo,
        stream_width: u32,
        stream_height: u32,
        session: SessionHandle,
    ) -> Box<dyn InputHandler>;

    /// Names of attached gamepads that have no input mapping.
    fn unmapped_gamepads(&self) -> Vec<String>;
}

// ── InputSlot ────────────────────────────────────────────────────

/// Exclusive owner of the session's input handler.
#[derive(Clone, Default)]
pub struct InputSlot {
    inner: Arc<Mutex<Option<Box<dyn InputHandler>>>>,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing (and dropping) any previous one.
    pub fn install(&self, handler: Box<dyn InputHandler>) {
        *self.inner.lock() = Some(handler);
    }

    /// Run `f` against the handler on the main thread.
    ///
    /// Returns `None` when no handler is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn InputHandler) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        guard.as_mut().map(|handler| f(&mut **handler))
    }

    /// Drop the handler while holding the lock, so no rumble callback can
    /// observe it mid-destruction.
    pub fn destroy(&self) {
        let mut guard = self.inner.lock();
        *guard = None;
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Forward a rumble effect from the transport thread.
    ///
    /// Silently discarded if the handler is gone, or if the main thread
    /// holds the lock for longer than a short bounded wait.
    pub fn rumble(&self, controller: u16, low_freq_motor: u16, high_freq_motor: u16) {
        match self.inner.try_lock_for(RUMBLE_LOCK_WAIT) {
            Some(mut guard) => {
                if let Some(handler) = guard.as_mut() {
                    handler.rumble(controller, low_freq_motor, high_freq_motor);
                }
            }
            None => debug!("input lock busy; dropping rumble for controller {controller}"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
