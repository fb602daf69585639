//! On-screen overlay text shared with the presentation layer.

use parking_lot::Mutex;

/// Capacity of each overlay text buffer, in bytes.
pub const OVERLAY_TEXT_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Renderer statistics, written by the presentation layer.
    Debug,
    /// Connection-quality and gamepad-mouse notices.
    StatusUpdate,
}

impl OverlayKind {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        match self {
            OverlayKind::Debug => 0,
            OverlayKind::StatusUpdate => 1,
        }
    }
}

#[derive(Debug, Default)]
struct OverlaySlot {
    text: String,
    enabled: bool,
    updated: bool,
}

/// Fixed-capacity text buffers, one per [`OverlayKind`].
#[derive(Debug, Default)]
pub struct OverlayManager {
    slots: [Mutex<OverlaySlot>; OverlayKind::COUNT],
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text, truncated to [`OVERLAY_TEXT_CAPACITY`] on a char
    /// boundary, and mark it updated.
    pub fn set_text(&self, kind: OverlayKind, text: &str) {
        let mut end = text.len().min(OVERLAY_TEXT_CAPACITY);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut slot = self.slots[kind.index()].lock();
        slot.text.clear();
        slot.text.push_str(&text[..end]);
        slot.updated = true;
    }

    pub fn text(&self, kind: OverlayKind) -> String {
        self.slots[kind.index()].lock().text.clone()
    }

    pub fn set_enabled(&self, kind: OverlayKind, enabled: bool) {
        self.slots[kind.index()].lock().enabled = enabled;
    }

    pub fn is_enabled(&self, kind: OverlayKind) -> bool {
        self.slots[kind.index()].lock().enabled
    }

    /// Whether the text changed since the last call.
    pub fn take_updated(&self, kind: OverlayKind) -> bool {
        std::mem::take(&mut self.slots[kind.index()].lock().updated)
    }
}
