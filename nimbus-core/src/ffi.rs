//! C callback tables for native transport libraries.
//!
//! A native transport implements [`StreamTransport`](crate::transport::StreamTransport)
//! and, inside `start_connection`, turns the [`TransportCallbacks`] it was
//! handed into two `#[repr(C)]` tables of function pointers plus an opaque
//! context. The context owns clones of the listener and renderer and is
//! freed when [`RawCallbackTables`] drops, so the tables must outlive the
//! connection (stop it before dropping them).

use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::decoder::{DecodeStatus, DecodeUnit, FrameType, VideoFormat};
use crate::transport::{ConnectionListener, ConnectionStatus, Stage, TransportCallbacks, VideoRenderer};

/// Decode unit accepted.
pub const DR_OK: c_int = 0;
/// Decode unit dropped; the host should send a keyframe.
pub const DR_NEED_IDR: c_int = -1;

pub const FRAME_TYPE_PFRAME: c_int = 0;
pub const FRAME_TYPE_IDR: c_int = 1;

/// Decode unit as laid out by the native transport. `data` is borrowed for
/// the duration of the call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawDecodeUnit {
    pub frame_number: c_int,
    pub frame_type: c_int,
    pub data: *const u8,
    pub length: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawConnectionCallbacks {
    pub context: *mut c_void,
    pub stage_starting: unsafe extern "C" fn(*mut c_void, c_int),
    pub stage_failed: unsafe extern "C" fn(*mut c_void, c_int, c_int),
    pub connection_terminated: unsafe extern "C" fn(*mut c_void, c_int),
    /// NUL-terminated, already formatted.
    pub log_message: unsafe extern "C" fn(*mut c_void, *const c_char),
    pub rumble: unsafe extern "C" fn(*mut c_void, u16, u16, u16),
    pub connection_status_update: unsafe extern "C" fn(*mut c_void, c_int),
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawVideoCallbacks {
    pub context: *mut c_void,
    /// `(context, format, width, height, fps)`; non-zero on unknown format.
    pub setup: unsafe extern "C" fn(*mut c_void, c_int, c_int, c_int, c_int) -> c_int,
    /// Returns [`DR_OK`] or [`DR_NEED_IDR`].
    pub submit_decode_unit: unsafe extern "C" fn(*mut c_void, *const RawDecodeUnit) -> c_int,
    pub capabilities: c_int,
}

/// What the context pointer refers to.
struct CallbackContext {
    connection: Arc<dyn ConnectionListener>,
    video: Arc<dyn VideoRenderer>,
}

/// Owns the context behind a pair of callback tables.
pub struct RawCallbackTables {
    context: *mut CallbackContext,
    connection: RawConnectionCallbacks,
    video: RawVideoCallbacks,
}

// SAFETY: the context only holds `Arc`s of `Send + Sync` trait objects and
// is never mutated; the tables hold copies of that pointer and plain
// function pointers.
unsafe impl Send for RawCallbackTables {}
unsafe impl Sync for RawCallbackTables {}

impl RawCallbackTables {
    pub fn new(callbacks: &TransportCallbacks) -> Self {
        let context = Box::into_raw(Box::new(CallbackContext {
            connection: Arc::clone(&callbacks.connection),
            video: Arc::clone(&callbacks.video),
        }));
        let raw = context.cast::<c_void>();
        Self {
            context,
            connection: RawConnectionCallbacks {
                context: raw,
                stage_starting,
                stage_failed,
                connection_terminated,
                log_message,
                rumble,
                connection_status_update,
            },
            video: RawVideoCallbacks {
                context: raw,
                setup,
                submit_decode_unit,
                capabilities: callbacks.video_capabilities.raw() as c_int,
            },
        }
    }

    pub fn connection(&self) -> &RawConnectionCallbacks {
        &self.connection
    }

    pub fn video(&self) -> &RawVideoCallbacks {
        &self.video
    }
}

impl Drop for RawCallbackTables {
    fn drop(&mut self) {
        // SAFETY: `context` came from `Box::into_raw` in `new` and is
        // reclaimed exactly once.
        drop(unsafe { Box::from_raw(self.context) });
    }
}

// ── Trampolines ──────────────────────────────────────────────────

/// # Safety
/// `context` must be the pointer installed by [`RawCallbackTables::new`],
/// and the tables must still be alive.
unsafe fn listener<'a>(context: *mut c_void) -> &'a dyn ConnectionListener {
    let context = unsafe { &*context.cast_const().cast::<CallbackContext>() };
    &*context.connection
}

/// # Safety
/// As for [`listener`].
unsafe fn renderer<'a>(context: *mut c_void) -> &'a dyn VideoRenderer {
    let context = unsafe { &*context.cast_const().cast::<CallbackContext>() };
    &*context.video
}

unsafe extern "C" fn stage_starting(context: *mut c_void, stage: c_int) {
    let listener = unsafe { listener(context) };
    match Stage::from_raw(stage) {
        Some(stage) => listener.stage_starting(stage),
        None => warn!("unknown connection stage {stage}"),
    }
}

unsafe extern "C" fn stage_failed(context: *mut c_void, stage: c_int, error_code: c_int) {
    let listener = unsafe { listener(context) };
    let stage = Stage::from_raw(stage).unwrap_or(Stage::None);
    listener.stage_failed(stage, i64::from(error_code));
}

unsafe extern "C" fn connection_terminated(context: *mut c_void, error_code: c_int) {
    unsafe { listener(context) }.connection_terminated(i64::from(error_code));
}

unsafe extern "C" fn log_message(context: *mut c_void, message: *const c_char) {
    if message.is_null() {
        return;
    }
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    unsafe { listener(context) }.log_message(&message);
}

unsafe extern "C" fn rumble(
    context: *mut c_void,
    controller: u16,
    low_freq_motor: u16,
    high_freq_motor: u16,
) {
    unsafe { listener(context) }.rumble(controller, low_freq_motor, high_freq_motor);
}

unsafe extern "C" fn connection_status_update(context: *mut c_void, status: c_int) {
    match ConnectionStatus::from_raw(status) {
        Some(status) => unsafe { listener(context) }.connection_status_update(status),
        None => warn!("unknown connection status {status}"),
    }
}

unsafe extern "C" fn setup(
    context: *mut c_void,
    format: c_int,
    width: c_int,
    height: c_int,
    fps: c_int,
) -> c_int {
    let Some(format) = u32::try_from(format).ok().and_then(VideoFormat::from_raw) else {
        warn!("unsupported video format {format:#x}");
        return -1;
    };
    let dimension = |v: c_int| u32::try_from(v).unwrap_or(0);
    unsafe { renderer(context) }.setup(format, dimension(width), dimension(height), dimension(fps));
    0
}

unsafe extern "C" fn submit_decode_unit(context: *mut c_void, unit: *const RawDecodeUnit) -> c_int {
    let Some(raw) = (unsafe { unit.as_ref() }) else {
        return DR_OK;
    };

    let data = match usize::try_from(raw.length) {
        Ok(len) if len > 0 && !raw.data.is_null() => {
            Bytes::copy_from_slice(unsafe { std::slice::from_raw_parts(raw.data, len) })
        }
        _ => Bytes::new(),
    };
    let frame_type = if raw.frame_type == FRAME_TYPE_IDR {
        FrameType::Idr
    } else {
        FrameType::PFrame
    };
    let unit = DecodeUnit::new(raw.frame_number as u32, frame_type, data);

    match unsafe { renderer(context) }.submit_decode_unit(&unit) {
        DecodeStatus::Ok => DR_OK,
        DecodeStatus::NeedKeyframe => DR_NEED_IDR,
    }
}

// ── Tests ────────────────────────────────────────────────────────
