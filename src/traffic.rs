/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Traffic-light correlation over a short detection window.
//!
//! Perception reports positional detections with a colour label and a
//! confidence. A single detection is not trusted; instead each new detection
//! is compared against every windowed detection at the same image position
//! (within [`POSITION_TOLERANCE`] on both axes):
//!
//! - every matching windowed detection adds its confidence to the sum of its
//!   own colour family;
//! - a matching detection of the *other* family also adds its confidence to
//!   the *trigger* sum of the new detection's family.
//!
//! ```text
//!  red-trigger > 0                          → RedTriggered   (11)
//!  green-trigger > 0 ∧ green-sum > red-sum  → GreenTriggered (22)
//!  red-sum > 0                              → RedContinued   (1)
//!  green-sum > 0                            → GreenContinued (2)
//!  otherwise                                → unchanged
//! ```
//!
//! The green trigger requires a green majority so that a single spurious
//! green detection cannot override a red consensus.
//!
//! # Invariants
//!
//! - **TLC-001**: the window holds only detections younger than
//!   [`WINDOW_TICKS`]; eviction is by age, checked on every observe and tick.
//! - **TLC-002**: memory is bounded by [`WINDOW_CAPACITY`]; if a burst fills
//!   the buffer before entries age out, the oldest entry is dropped and a
//!   warning is logged.
//! - **TLC-003**: unknown labels and non-positive confidences never change
//!   the state.

use heapless::Deque;

use crate::units::{abs, ticks};

/// Window duration in ticks (2.0 s).
pub const WINDOW_TICKS: u32 = ticks(2.0);

/// Ring-buffer capacity. Sized for several detections per tick over the window.
pub const WINDOW_CAPACITY: usize = 512;

/// Two detections closer than this on both axes are the same light.
pub const POSITION_TOLERANCE: f32 = 0.2;

// ─── Colours ────────────────────────────────────────────────────────────────

/// Classified light colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightColor {
    /// "Green Light".
    Green,
    /// "Left turn" arrow.
    LeftTurn,
    /// "Red Light".
    Red,
    /// "Yellow Light".
    Yellow,
    /// Anything else.
    Unknown,
}

/// Colour family used for correlation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorFamily {
    /// Go: green and left-turn.
    Go,
    /// Stop: red and yellow.
    Stop,
}

impl LightColor {
    /// Map a perception label to a colour.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Green Light" => Self::Green,
            "Left turn" => Self::LeftTurn,
            "Red Light" => Self::Red,
            "Yellow Light" => Self::Yellow,
            _ => Self::Unknown,
        }
    }

    /// Colour family, `None` for unknown colours.
    pub fn family(self) -> Option<ColorFamily> {
        match self {
            Self::Green | Self::LeftTurn => Some(ColorFamily::Go),
            Self::Red | Self::Yellow => Some(ColorFamily::Stop),
            Self::Unknown => None,
        }
    }
}

// ─── State ──────────────────────────────────────────────────────────────────

/// Debounced traffic-light state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficState {
    /// No light.
    #[default]
    Off,
    /// Red (or yellow) seen consistently.
    RedContinued,
    /// Green seen consistently.
    GreenContinued,
    /// Light just turned red.
    RedTriggered,
    /// Light just turned green with a green majority.
    GreenTriggered,
    /// Stop forced by the driver.
    Forced,
}

/// Coarse signal derived from [`TrafficState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficSignal {
    /// No light.
    #[default]
    Off,
    /// Stop.
    Red,
    /// Go.
    Green,
}

impl TrafficState {
    /// Numeric code published to the UI.
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::RedContinued => 1,
            Self::GreenContinued => 2,
            Self::RedTriggered => 11,
            Self::GreenTriggered => 22,
            Self::Forced => 33,
        }
    }

    /// Collapse into a red/green signal. A forced state reads as red.
    pub fn signal(self) -> TrafficSignal {
        match self {
            Self::Off => TrafficSignal::Off,
            Self::RedContinued | Self::RedTriggered | Self::Forced => TrafficSignal::Red,
            Self::GreenContinued | Self::GreenTriggered => TrafficSignal::Green,
        }
    }

    /// The light asks the vehicle to stop.
    pub fn is_stop(self) -> bool {
        self.signal() == TrafficSignal::Red
    }
}

// ─── Detection ──────────────────────────────────────────────────────────────

/// One windowed detection.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficDetection {
    /// Normalized image x.
    pub x: f32,
    /// Normalized image y.
    pub y: f32,
    /// Colour.
    pub color: LightColor,
    /// Confidence (> 0).
    pub confidence: f32,
    /// Tick the detection was observed on.
    pub tick: u64,
}

impl TrafficDetection {
    fn same_light(&self, x: f32, y: f32) -> bool {
        abs(x - self.x) < POSITION_TOLERANCE && abs(y - self.y) < POSITION_TOLERANCE
    }
}

/// A detection as reported by perception, before windowing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightObservation {
    /// Normalized image x.
    pub x: f32,
    /// Normalized image y.
    pub y: f32,
    /// Colour.
    pub color: LightColor,
    /// Confidence.
    pub confidence: f32,
}

impl LightObservation {
    /// Observation from a perception label.
    pub fn new(x: f32, y: f32, label: &str, confidence: f32) -> Self {
        Self { x, y, color: LightColor::from_label(label), confidence }
    }
}

/// Confidence sums accumulated over the window for one new detection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Evidence {
    red: f32,
    green: f32,
    red_trigger: f32,
    green_trigger: f32,
}

impl Evidence {
    fn resolve(&self) -> Option<TrafficState> {
        if self.red_trigger > 0.0 {
            Some(TrafficState::RedTriggered)
        } else if self.green_trigger > 0.0 && self.green > self.red {
            Some(TrafficState::GreenTriggered)
        } else if self.red > 0.0 {
            Some(TrafficState::RedContinued)
        } else if self.green > 0.0 {
            Some(TrafficState::GreenContinued)
        } else {
            None
        }
    }
}

// ─── Correlator ─────────────────────────────────────────────────────────────

/// Fuses a sliding window of detections into a [`TrafficState`].
#[derive(Debug)]
pub struct TrafficLightCorrelator {
    window: Deque<TrafficDetection, WINDOW_CAPACITY>,
    state: TrafficState,
    tick: u64,
    forced_ticks: u32,
}

impl Default for TrafficLightCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficLightCorrelator {
    /// Empty window, state `Off`.
    pub fn new() -> Self {
        Self {
            window: Deque::new(),
            state: TrafficState::Off,
            tick: 0,
            forced_ticks: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> TrafficState {
        self.state
    }

    /// Number of windowed detections.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// `true` when the window holds no detections.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Correlate one detection against the window and append it.
    pub fn observe(&mut self, x: f32, y: f32, color: LightColor, confidence: f32) -> TrafficState {
        self.evict_expired();

        let family = match color.family() {
            Some(f) if confidence.is_finite() && confidence > 0.0 && x.is_finite() && y.is_finite() => f,
            // TLC-003
            _ => return self.state,
        };

        let mut ev = Evidence::default();
        for prev in self.window.iter().filter(|p| p.same_light(x, y)) {
            let Some(prev_family) = prev.color.family() else { continue };
            match prev_family {
                ColorFamily::Go => ev.green += prev.confidence,
                ColorFamily::Stop => ev.red += prev.confidence,
            }
            if prev_family != family {
                match family {
                    ColorFamily::Go => ev.green_trigger += prev.confidence,
                    ColorFamily::Stop => ev.red_trigger += prev.confidence,
                }
            }
        }

        if self.forced_ticks == 0 {
            if let Some(next) = ev.resolve() {
                if next != self.state {
                    tracing::debug!(from = ?self.state, to = ?next, "traffic state");
                }
                self.state = next;
            }
        }

        let detection = TrafficDetection { x, y, color, confidence, tick: self.tick };
        if self.window.is_full() {
            // TLC-002
            tracing::warn!(capacity = WINDOW_CAPACITY, "traffic window full, dropping oldest");
            self.window.pop_front();
        }
        let _ = self.window.push_back(detection);

        self.state
    }

    /// Hold `state` for `ticks` ticks regardless of detections.
    pub fn force(&mut self, state: TrafficState, ticks: u32) {
        self.state = state;
        self.forced_ticks = ticks;
    }

    /// Close the current tick: advance the clock, expire old detections and
    /// decay a forced state. An expired forced state returns to `Off` even
    /// with detections still windowed; the next detection re-resolves it.
    /// With nothing forced and nothing windowed the state returns to `Off`.
    pub fn end_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.evict_expired();
        if self.forced_ticks > 0 {
            self.forced_ticks -= 1;
            if self.forced_ticks == 0 {
                self.state = TrafficState::Off;
            }
        } else if self.window.is_empty() {
            self.state = TrafficState::Off;
        }
    }

    fn evict_expired(&mut self) {
        // TLC-001
        while let Some(front) = self.window.front() {
            if self.tick.saturating_sub(front.tick) >= u64::from(WINDOW_TICKS) {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
