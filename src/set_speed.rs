/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Cruise target ownership: button deltas, clipping, the speed-step ladder
//! and the eco band.
//!
//! # Invariants
//!
//! - **SSR-001**: `speed_min ≤ v_cruise_kph ≤ speed_max` after every write.
//! - **SSR-002**: `speed_max` only grows, and never beyond [`V_CRUISE_MAX`].
//! - **SSR-003**: a long press always moves to a multiple of 5 strictly beyond
//!   the current target in the press direction.
//!
//! # Eco band
//!
//! When the vehicle falls more than [`ECO_ENTRY_MARGIN_KPH`] below a target
//! above [`ECO_FLOOR_KPH`] (climbing a hill, say), the requested target is
//! latched and the applied target is held at `eco_target + eco_increment`
//! rather than chasing the full set speed. The latch follows requested
//! increases, drops on decreases and clears once the vehicle is back above
//! it.
//!
//! ```text
//!  requested ─────────────── 80
//!  applied   ──── 80.2 ─────        (latched, vehicle at 72)
//!  vehicle   72 … 78 … 81 ──► latch clears, applied = requested
//! ```

use crate::snapshot::{ButtonType, VehicleStateSnapshot};
use crate::units::{ceil, clip, floor, round, IMPERIAL_INCREMENT, MS_TO_KPH};

/// Highest set speed, kph.
pub const V_CRUISE_MAX: f32 = 145.0;

/// Set speed used when cruise becomes available, kph.
pub const V_CRUISE_INITIAL: f32 = 30.0;

/// Initial set speed in experimental mode, kph.
pub const V_CRUISE_INITIAL_EXPERIMENTAL: f32 = 105.0;

/// Set speeds above this are treated as never initialised, kph.
pub const V_CRUISE_UNSET_ABOVE: f32 = 200.0;

/// A remembered set speed at or above this is not restored, kph.
pub const V_CRUISE_RESTORE_LIMIT: f32 = 250.0;

/// Long-press snap interval, kph.
pub const LONG_PRESS_STEP_KPH: f32 = 5.0;

/// First rung of the speed-step ladder, kph.
pub const LADDER_BASE_KPH: u32 = 10;

/// Eco band engages when the vehicle is this far below the target, kph.
pub const ECO_ENTRY_MARGIN_KPH: f32 = 3.0;

/// Eco band is only used for targets above this, kph.
pub const ECO_FLOOR_KPH: f32 = 20.0;

/// Direction of a speed button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedDirection {
    /// Increase.
    Up,
    /// Decrease.
    Down,
}

/// Cruise target speeds and bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CruiseTarget {
    /// Applied (output) target, kph.
    pub v_cruise_kph: f32,
    /// Requested target before the eco band, kph.
    pub v_cruise_kph_set: f32,
    /// Lower bound, kph.
    pub speed_min: f32,
    /// Upper bound, kph.
    pub speed_max: f32,
    /// Short-press step, kph.
    pub unit_increment: f32,
}

impl Default for CruiseTarget {
    fn default() -> Self {
        Self {
            v_cruise_kph: V_CRUISE_INITIAL,
            v_cruise_kph_set: V_CRUISE_INITIAL,
            speed_min: 0.0,
            speed_max: V_CRUISE_MAX,
            unit_increment: 1.0,
        }
    }
}

impl CruiseTarget {
    /// Clip a speed into the current bounds.
    pub fn clip(&self, kph: f32) -> f32 {
        clip(kph, self.speed_min, self.speed_max)
    }
}

/// Owns the [`CruiseTarget`].
#[derive(Clone, Debug, Default)]
pub struct SetSpeedRegulator {
    target: CruiseTarget,
    eco_target: f32,
    v_cruise_kph_last: f32,
}

impl SetSpeedRegulator {
    /// Regulator at the initial set speed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current target.
    pub fn target(&self) -> &CruiseTarget {
        &self.target
    }

    /// Latched eco target, 0 when the band is inactive.
    pub fn eco_target(&self) -> f32 {
        self.eco_target
    }

    /// Applied target at the end of the previous tick.
    pub fn last_applied(&self) -> f32 {
        self.v_cruise_kph_last
    }

    /// Adopt a new lower bound and unit step, re-clipping the targets.
    pub fn configure(&mut self, speed_min: f32, is_metric: bool) {
        self.target.speed_min = clip(speed_min, 0.0, V_CRUISE_MAX);
        self.target.unit_increment = if is_metric { 1.0 } else { IMPERIAL_INCREMENT };
        self.target.v_cruise_kph = self.target.clip(self.target.v_cruise_kph);
        self.target.v_cruise_kph_set = self.target.clip(self.target.v_cruise_kph_set);
    }

    /// Remember the applied target before this tick mutates it.
    pub fn begin_tick(&mut self) {
        self.v_cruise_kph_last = self.target.v_cruise_kph;
    }

    /// Set speed after one button action, starting from `from` (kph). Clipped.
    pub fn apply_button(&self, from: f32, direction: SpeedDirection, is_long_press: bool) -> f32 {
        let next = match (direction, is_long_press) {
            (SpeedDirection::Up, false) => from + self.target.unit_increment,
            (SpeedDirection::Down, false) => from - self.target.unit_increment,
            // SSR-003
            (SpeedDirection::Up, true) => {
                (floor(from / LONG_PRESS_STEP_KPH) + 1.0) * LONG_PRESS_STEP_KPH
            }
            (SpeedDirection::Down, true) => {
                (ceil(from / LONG_PRESS_STEP_KPH) - 1.0) * LONG_PRESS_STEP_KPH
            }
        };
        self.target.clip(next)
    }

    /// Climb the speed-step ladder: the first rung of `10, 10 + unit, …`
    /// strictly above `from`, or `from` itself when no rung below `speed_max`
    /// is above it. Clipped.
    pub fn speed_up(&self, from: f32, unit_kph: u8) -> f32 {
        let unit = u32::from(unit_kph.max(1));
        let top = self.target.speed_max as u32;
        let rung = (LADDER_BASE_KPH..top)
            .step_by(unit as usize)
            .map(|s| s as f32)
            .find(|&s| from < s);
        self.target.clip(rung.unwrap_or(from))
    }

    /// Let `speed_max` follow the driver up to [`V_CRUISE_MAX`] (SSR-002).
    pub fn raise_max(&mut self, kph: f32) {
        if kph > self.target.speed_max && kph < V_CRUISE_MAX {
            self.target.speed_max = kph;
        }
    }

    /// Store the requested target (clipped) and derive the applied target
    /// through the eco band. Returns the applied target.
    pub fn commit(&mut self, requested: f32, v_ego_kph: f32, eco_increment: f32) -> f32 {
        let requested = self.target.clip(requested);
        self.target.v_cruise_kph_set = requested;
        let applied = self.apply_eco_band(requested, v_ego_kph, eco_increment);
        self.target.v_cruise_kph = self.target.clip(applied);
        self.target.v_cruise_kph
    }

    /// Eco band: displayed target for `requested` at the current speed estimate.
    pub fn apply_eco_band(&mut self, requested: f32, v_ego_kph: f32, eco_increment: f32) -> f32 {
        if eco_increment <= 0.0 {
            self.eco_target = 0.0;
            return requested;
        }

        if self.eco_target > 0.0 {
            if self.eco_target < requested {
                self.eco_target = requested;
            } else if self.eco_target > requested {
                self.eco_target = 0.0;
            }
        } else if v_ego_kph + ECO_ENTRY_MARGIN_KPH < requested && requested > ECO_FLOOR_KPH {
            self.eco_target = requested;
        }

        if self.eco_target > 0.0 {
            if v_ego_kph > self.eco_target {
                self.eco_target = 0.0;
            } else {
                return self.eco_target + eco_increment;
            }
        }
        requested
    }

    /// Seed the target when the driver engages with a button.
    ///
    /// Accel or resume restores the previous target if it was valid; any
    /// other button starts from the current speed clipped to
    /// `[initial, speed_max]`. Ignored when the snapshot has no button events.
    pub fn initialize(&mut self, snapshot: &VehicleStateSnapshot, experimental_mode: bool) {
        if snapshot.button_events.is_empty() {
            return;
        }
        let initial = if experimental_mode {
            V_CRUISE_INITIAL_EXPERIMENTAL
        } else {
            V_CRUISE_INITIAL
        };
        let resume = snapshot.button_events.iter().any(|b| {
            matches!(b.button, ButtonType::AccelCruise | ButtonType::ResumeCruise)
        });

        let v = if resume && self.v_cruise_kph_last < V_CRUISE_RESTORE_LIMIT {
            self.v_cruise_kph_last
        } else {
            round(clip(snapshot.v_ego * MS_TO_KPH, initial, self.target.speed_max))
        };
        let v = self.target.clip(v);
        self.target.v_cruise_kph = v;
        self.target.v_cruise_kph_set = v;
    }

    /// Back to the initial target when cruise becomes unavailable.
    pub fn reset(&mut self) {
        let v = self.target.clip(V_CRUISE_INITIAL);
        self.target.v_cruise_kph = v;
        self.target.v_cruise_kph_set = v;
        self.eco_target = 0.0;
    }

    /// Overwrite the requested target, e.g. from the stock cluster value.
    pub fn set_requested(&mut self, kph: f32) {
        self.target.v_cruise_kph_set = self.target.clip(kph);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
