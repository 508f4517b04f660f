//! Edge detection of modifier keys from the host's polled bitmask.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys as reported by [`SceneHost::modifier_bits`](crate::scene::SceneHost::modifier_bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u32 {
        const SHIFT = 1;
        const CTRL = 4;
        const ALT = 8;
    }
}

/// Press and release transitions observed by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierEdges {
    /// Keys that went down since the previous poll
    pub pressed: ModifierMask,
    /// Keys that went up since the previous poll
    pub released: ModifierMask,
    /// Keys currently held
    pub held: ModifierMask,
}

impl ModifierEdges {
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }

    pub fn just_pressed(&self, key: ModifierMask) -> bool {
        self.pressed.contains(key)
    }

    pub fn just_released(&self, key: ModifierMask) -> bool {
        self.released.contains(key)
    }
}

/// Turns raw polled modifier state into press/release edges.
///
/// A key held across many polls reports a single press.
#[derive(Debug, Clone, Default)]
pub struct ModifierTracker {
    held: ModifierMask,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares the raw host bitmask with the previous poll. Unknown bits are ignored.
    pub fn poll(&mut self, bits: u32) -> ModifierEdges {
        let now = ModifierMask::from_bits_truncate(bits);
        let edges = ModifierEdges {
            pressed: now & !self.held,
            released: self.held & !now,
            held: now,
        };
        self.held = now;
        edges
    }

    pub fn held(&self) -> ModifierMask {
        self.held
    }

    /// Treats every key as released, so a key still down reports a new press.
    pub fn reset(&mut self) {
        self.held = ModifierMask::empty();
    }
}
