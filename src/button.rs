//! Cruise button edge classification.
//!
//! Raw press/release transitions become at most one [`ButtonEdge`] per tick:
//! a short press on release, or a repeating long-press tick while held.
//!
//! ```text
//! press ──► hold 1,2,3 … threshold+1 ──► LongPressTick, hold %= threshold ──► …
//!   │                                                                         │
//!   └── release before threshold ──► ShortPress        release after ──► (nothing)
//! ```
//!
//! Only one button is tracked at a time. A second press while one is held is
//! ignored, as is the release of any button other than the tracked one.

use crate::snapshot::{ButtonEvent, ButtonType};

/// Long-press threshold for accel/decel, ticks.
pub const SPEED_BUTTON_LONG_TICKS: u32 = 40;

/// Long-press threshold for cancel and gap adjust, ticks.
pub const OTHER_BUTTON_LONG_TICKS: u32 = 70;

/// Kind of edge produced by the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Released before the long-press threshold.
    ShortPress,
    /// Held past the threshold; repeats every threshold ticks while held.
    LongPressTick,
}

/// Vehicle context captured when the press started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PressContext {
    /// Stock cruise was at standstill.
    pub standstill: bool,
    /// The outer control loop was engaged.
    pub engaged: bool,
}

/// One classified button action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ButtonEdge {
    /// Button that produced the edge.
    pub button: ButtonType,
    /// Short press or long-press tick.
    pub kind: EdgeKind,
    /// Context at press start.
    pub context: PressContext,
}

impl ButtonEdge {
    /// `true` for a long-press tick.
    pub fn is_long(&self) -> bool {
        self.kind == EdgeKind::LongPressTick
    }
}

/// State of the button currently being held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonPressRecord {
    /// Held button.
    pub button: ButtonType,
    /// Ticks held since press (wraps after each long-press tick).
    pub hold_ticks: u32,
    /// Context at press start.
    pub context: PressContext,
    /// A long-press tick has already been emitted for this press.
    pub long_pressed: bool,
}

/// Long-press threshold for a tracked button, `None` for untracked buttons.
pub fn long_press_ticks(button: ButtonType) -> Option<u32> {
    match button {
        ButtonType::AccelCruise | ButtonType::DecelCruise => Some(SPEED_BUTTON_LONG_TICKS),
        ButtonType::Cancel | ButtonType::GapAdjustCruise => Some(OTHER_BUTTON_LONG_TICKS),
        _ => None,
    }
}

/// Classifies button transitions into short and long presses.
#[derive(Clone, Debug, Default)]
pub struct ButtonEdgeTracker {
    active: Option<ButtonPressRecord>,
}

impl ButtonEdgeTracker {
    /// Tracker with no button held.
    pub fn new() -> Self {
        Self::default()
    }

    /// The press currently being tracked, if any.
    pub fn active(&self) -> Option<&ButtonPressRecord> {
        self.active.as_ref()
    }

    /// Process one tick of button transitions.
    ///
    /// `standstill` and `engaged` are recorded as the press context when a
    /// new press starts in this tick.
    pub fn classify(
        &mut self,
        events: &[ButtonEvent],
        standstill: bool,
        engaged: bool,
    ) -> Option<ButtonEdge> {
        if let Some(rec) = self.active.as_mut() {
            rec.hold_ticks = rec.hold_ticks.saturating_add(1);
        }

        let mut edge = None;
        for ev in events {
            if ev.pressed {
                if self.active.is_none() && long_press_ticks(ev.button).is_some() {
                    self.active = Some(ButtonPressRecord {
                        button: ev.button,
                        hold_ticks: 1,
                        context: PressContext { standstill, engaged },
                        long_pressed: false,
                    });
                }
            } else if let Some(rec) = self.active.filter(|r| r.button == ev.button) {
                if !rec.long_pressed {
                    edge = Some(ButtonEdge {
                        button: rec.button,
                        kind: EdgeKind::ShortPress,
                        context: rec.context,
                    });
                }
                self.active = None;
            }
        }

        if let Some(rec) = self.active.as_mut() {
            let threshold = long_press_ticks(rec.button).unwrap_or(SPEED_BUTTON_LONG_TICKS);
            if rec.hold_ticks > threshold {
                rec.long_pressed = true;
                edge = Some(ButtonEdge {
                    button: rec.button,
                    kind: EdgeKind::LongPressTick,
                    context: rec.context,
                });
                if rec.button == ButtonType::Cancel {
                    // cancel does not repeat
                    self.active = None;
                } else {
                    rec.hold_ticks %= threshold;
                }
            }
        }

        edge
    }
}
