//! Signed saturating pedal debounce counter.
//!
//! The controller tracks each pedal as "held for N ticks" or "released for N
//! ticks". The compact encoding used in logs and by downstream consumers is a
//! signed integer: `+N` held, `−N` released. The counter never crosses zero
//! without passing through ±1, so `−1` marks exactly the tick after release
//! and `+1` exactly the tick of the press.
//!
//! # Invariants
//!
//! - **DBC-001**: magnitude saturates at [`COUNT_LIMIT`]; no wraparound.
//! - **DBC-002**: `is_release_edge()` holds for one tick per release.
//! - **DBC-003**: a fresh counter reads as long released, so drive start is
//!   never mistaken for a release edge.

/// Saturation bound for both directions (5 minutes of ticks).
pub const COUNT_LIMIT: u32 = 30_000;

/// Pedal debounce state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PedalCounter {
    /// Pressed for this many consecutive ticks (≥ 1).
    Held(u32),
    /// Released for this many consecutive ticks (≥ 1).
    Released(u32),
}

impl Default for PedalCounter {
    fn default() -> Self {
        // DBC-003
        Self::Released(COUNT_LIMIT)
    }
}

impl PedalCounter {
    /// Advance one tick with the current pedal state.
    pub fn update(&mut self, pressed: bool) {
        *self = match (*self, pressed) {
            (Self::Held(n), true) => Self::Held(n.saturating_add(1).min(COUNT_LIMIT)),
            (Self::Released(_), true) => Self::Held(1),
            (Self::Released(n), false) => Self::Released(n.saturating_add(1).min(COUNT_LIMIT)),
            (Self::Held(_), false) => Self::Released(1),
        };
    }

    /// The pedal is currently pressed.
    pub fn is_held(self) -> bool {
        matches!(self, Self::Held(_))
    }

    /// The pedal is currently released.
    pub fn is_released(self) -> bool {
        matches!(self, Self::Released(_))
    }

    /// This is the first tick after a release.
    pub fn is_release_edge(self) -> bool {
        self == Self::Released(1)
    }

    /// Consecutive pressed ticks, 0 while released.
    pub fn held_ticks(self) -> u32 {
        match self {
            Self::Held(n) => n,
            Self::Released(_) => 0,
        }
    }

    /// Compact signed view: `+N` held, `−N` released.
    pub fn as_signed(self) -> i32 {
        match self {
            Self::Held(n) => n as i32,
            Self::Released(n) => -(n as i32),
        }
    }
}
