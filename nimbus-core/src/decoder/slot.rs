//! Hot-swappable decoder ownership.
//!
//! The live decoder sits behind one lock with two kinds of access:
//!
//! - [`DecodeSubmitter`] is handed to the transport thread. It only ever
//!   *tries* the lock; if the main thread holds it, the unit is dropped and
//!   reported as accepted. A keyframe is requested once the swap finishes.
//! - [`DecoderSlot`] stays on the main thread. It may block on the lock to
//!   destroy, replace or render with the decoder.
//!
//! Decode units are never queued for replay.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::decoder::{DecodeStatus, DecodeUnit, VideoDecoder};
use crate::error::SessionError;

#[derive(Default)]
struct SlotState {
    decoder: Option<Box<dyn VideoDecoder>>,
    needs_keyframe: bool,
}

// ── DecodeSubmitter ──────────────────────────────────────────────

/// Transport-thread handle: non-blocking submission only.
#[derive(Clone)]
pub struct DecodeSubmitter {
    state: Arc<Mutex<SlotState>>,
}

impl DecodeSubmitter {
    /// Hand `unit` to the live decoder, if one can be reached without
    /// waiting.
    pub fn submit(&self, unit: &DecodeUnit) -> DecodeStatus {
        let Some(mut state) = self.state.try_lock() else {
            // The decoder is being torn down or replaced.
            return DecodeStatus::Ok;
        };

        if state.needs_keyframe {
            state.needs_keyframe = false;
            return DecodeStatus::NeedKeyframe;
        }

        match state.decoder.as_mut() {
            Some(decoder) => decoder.submit_decode_unit(unit),
            // Decoder creation is deferred until the window is shown.
            None => DecodeStatus::Ok,
        }
    }
}

// ── DecoderSlot ──────────────────────────────────────────────────

/// Main-thread owner of the session's decoder.
#[derive(Default)]
pub struct DecoderSlot {
    state: Arc<Mutex<SlotState>>,
}

impl DecoderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitter(&self) -> DecodeSubmitter {
        DecodeSubmitter {
            state: Arc::clone(&self.state),
        }
    }

    /// Replace the live decoder.
    ///
    /// Holds the lock for the whole operation: the old decoder is dropped
    /// first, then `rebuild` runs (flushing stale reset notifications and
    /// constructing the replacement), and finally a keyframe is requested.
    /// On failure the slot is left empty and submissions are accepted as
    /// no-ops, with no keyframe request outstanding.
    pub fn swap<F>(&self, rebuild: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> Result<Box<dyn VideoDecoder>, SessionError>,
    {
        let mut state = self.state.lock();
        state.decoder = None;
        state.needs_keyframe = false;

        let next = rebuild()?;
        state.decoder = Some(next);
        state.needs_keyframe = true;
        debug!("decoder replaced; keyframe requested");
        Ok(())
    }

    /// Present the latest frame. Returns `false` if there is no decoder.
    pub fn render_frame(&self) -> bool {
        let mut state = self.state.lock();
        match state.decoder.as_mut() {
            Some(decoder) => {
                decoder.render_frame_on_main_thread();
                true
            }
            None => false,
        }
    }

    /// Drop the decoder under the lock.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.decoder = None;
        state.needs_keyframe = false;
    }

    pub fn has_decoder(&self) -> bool {
        self.state.lock().decoder.is_some()
    }
}

// ── Tests ────────────────────────────────────────────────────────
