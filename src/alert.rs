//! Driver-facing alerts raised during one tick.
//!
//! The set is rebuilt from empty at the start of every tick. Plan and
//! traffic alerts are edge-triggered: they fire on the tick the planner or
//! the light changes, never while a state persists.
//!
//! # Invariants
//!
//! - **ALR-001**: an [`AlertCode`] appears at most once per tick.
//! - **ALR-002**: the set never grows past [`MAX_ALERTS`]; further pushes are
//!   dropped.

use heapless::Vec as HVec;

use crate::arbiter::SoftHold;
use crate::snapshot::PlanState;
use crate::traffic::TrafficSignal;

/// Capacity of the per-tick alert set.
pub const MAX_ALERTS: usize = 24;

/// Plan-driven stopping alert needs at least this speed, m/s.
pub const TRAFFIC_STOPPING_MIN_SPEED: f32 = 5.0;

/// Alerts the controller can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertCode {
    // ─── Cruise ─────────────────────────────────────────────────────────────
    /// The planner started stopping for a light or sign.
    TrafficStopping,
    /// The planner is ready to pull away.
    TrafficSignGreen,
    /// The light turned green while soft hold is active.
    TrafficSignChanged,
    /// Engaged from a crawl behind a close lead.
    StopStop,
    /// Short acknowledgement chime.
    AudioPrompt,

    // ─── Vehicle ────────────────────────────────────────────────────────────
    /// A door is open.
    DoorOpen,
    /// Seatbelt unlatched.
    SeatbeltNotLatched,
    /// Selector not in an allowed gear.
    WrongGear,
    /// Selector in reverse.
    ReverseGear,
    /// Cruise main switch is off.
    WrongCarMode,
    /// Stability control disabled.
    EspDisabled,
    /// Faster than the controller supports.
    SpeedTooHigh,
    /// Stock cruise is in a non-adaptive mode.
    WrongCruiseMode,
    /// Parking brake set.
    ParkBrake,
    /// Driver steering override.
    SteerOverride,
    /// Engaging while stopped with the brake released.
    PreEnableStandstill,
    /// Driver is overriding with the accelerator.
    GasPressedOverride,
    /// Engage requested from a cruise button.
    ButtonEnable,
    /// Stock cruise engaged.
    PcmEnable,
    /// Stock cruise disengaged.
    PcmDisable,
    /// Too slow for lateral control.
    BelowSteerSpeed,
    /// Too slow to engage.
    BelowEngageSpeed,
    /// Stock cruise needs a resume press.
    ResumeRequired,
    /// Vehicle needs a manual restart from a stop.
    ManualRestart,
    /// Too slow for the controller.
    SpeedTooLow,
}

/// Bounded, de-duplicated alert set for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlertSet {
    codes: HVec<AlertCode, MAX_ALERTS>,
}

impl AlertSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `code` unless it is already present (ALR-001, ALR-002).
    pub fn push(&mut self, code: AlertCode) {
        if !self.codes.contains(&code) && self.codes.push(code).is_err() {
            tracing::warn!(?code, "alert set full, dropping");
        }
    }

    /// `code` was raised this tick.
    pub fn contains(&self, code: AlertCode) -> bool {
        self.codes.contains(&code)
    }

    /// Alerts in raise order.
    pub fn as_slice(&self) -> &[AlertCode] {
        &self.codes
    }

    /// Number of alerts raised.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// No alert raised.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Drop every alert.
    pub fn clear(&mut self) {
        self.codes.clear();
    }
}

/// Inputs for plan and traffic edge detection.
#[derive(Clone, Copy, Debug)]
pub struct AlertInputs {
    /// Planner state this tick.
    pub plan: PlanState,
    /// Coarse traffic-light signal this tick.
    pub signal: TrafficSignal,
    /// The outer loop is engaged.
    pub engaged: bool,
    /// Brake and gas are both released.
    pub pedals_released: bool,
    /// Ego speed, m/s.
    pub v_ego: f32,
    /// Soft-hold state after arbitration.
    pub soft_hold: SoftHold,
}

/// Owns the alert set and the previous plan and signal used for edges.
#[derive(Clone, Debug, Default)]
pub struct AlertEmitter {
    alerts: AlertSet,
    prev_plan: PlanState,
    prev_signal: TrafficSignal,
}

impl AlertEmitter {
    /// Emitter with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tick with an empty set.
    pub fn begin_tick(&mut self) {
        self.alerts.clear();
    }

    /// Alerts raised so far this tick.
    pub fn alerts(&self) -> &AlertSet {
        &self.alerts
    }

    /// Mutable access for collaborators that raise alerts directly.
    pub fn alerts_mut(&mut self) -> &mut AlertSet {
        &mut self.alerts
    }

    /// Raise `code` this tick.
    pub fn push(&mut self, code: AlertCode) {
        self.alerts.push(code);
    }

    /// Raise the plan and traffic-light edge alerts and remember the new
    /// plan and signal for the next tick.
    pub fn observe(&mut self, input: &AlertInputs) {
        if input.plan != self.prev_plan && input.engaged && input.pedals_released {
            let leaving_stop = input.plan == PlanState::E2eCruise
                && self.prev_plan.is_stop_or_stopped();
            if input.plan == PlanState::E2eStop && input.v_ego > TRAFFIC_STOPPING_MIN_SPEED {
                self.alerts.push(AlertCode::TrafficStopping);
            } else if (input.plan == PlanState::E2ePrepare || leaving_stop)
                && input.soft_hold == SoftHold::Inactive
            {
                self.alerts.push(AlertCode::TrafficSignGreen);
            }
        }
        self.prev_plan = input.plan;

        if input.signal != self.prev_signal
            && input.signal == TrafficSignal::Green
            && input.soft_hold == SoftHold::Active
        {
            self.alerts.push(AlertCode::TrafficSignChanged);
        }
        self.prev_signal = input.signal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(plan: PlanState) -> AlertInputs {
        AlertInputs {
            plan,
            signal: TrafficSignal::Off,
            engaged: true,
            pedals_released: true,
            v_ego: 10.0,
            soft_hold: SoftHold::Inactive,
        }
    }

    #[test]
    fn test_set_deduplicates() {
        let mut set = AlertSet::new();
        set.push(AlertCode::AudioPrompt);
        set.push(AlertCode::AudioPrompt);
        set.push(AlertCode::StopStop);
        assert_eq!(set.as_slice(), &[AlertCode::AudioPrompt, AlertCode::StopStop]);
    }

    #[test]
    fn test_stopping_alert_fires_once_on_edge() {
        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&inputs(PlanState::E2eStop));
        assert!(e.alerts().contains(AlertCode::TrafficStopping));

        e.begin_tick();
        e.observe(&inputs(PlanState::E2eStop));
        assert!(e.alerts().is_empty());
    }

    #[test]
    fn test_stopping_alert_needs_speed_and_engagement() {
        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&AlertInputs { v_ego: 3.0, ..inputs(PlanState::E2eStop) });
        assert!(e.alerts().is_empty());

        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&AlertInputs { engaged: false, ..inputs(PlanState::E2eStop) });
        assert!(e.alerts().is_empty());

        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&AlertInputs { pedals_released: false, ..inputs(PlanState::E2eStop) });
        assert!(e.alerts().is_empty());
    }

    #[test]
    fn test_sign_green_on_prepare_or_leaving_stop() {
        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&inputs(PlanState::E2ePrepare));
        assert!(e.alerts().contains(AlertCode::TrafficSignGreen));

        let mut e = AlertEmitter::new();
        e.observe(&inputs(PlanState::E2eStopped));
        e.begin_tick();
        e.observe(&inputs(PlanState::E2eCruise));
        assert!(e.alerts().contains(AlertCode::TrafficSignGreen));

        // soft hold suppresses the starting alert
        let mut e = AlertEmitter::new();
        e.observe(&inputs(PlanState::E2eStopped));
        e.begin_tick();
        e.observe(&AlertInputs { soft_hold: SoftHold::Active, ..inputs(PlanState::E2eCruise) });
        assert!(e.alerts().is_empty());
    }

    #[test]
    fn test_sign_changed_needs_active_soft_hold() {
        let mut e = AlertEmitter::new();
        let held = AlertInputs {
            soft_hold: SoftHold::Active,
            signal: TrafficSignal::Red,
            ..inputs(PlanState::Lead)
        };
        e.observe(&held);
        e.begin_tick();
        e.observe(&AlertInputs { signal: TrafficSignal::Green, ..held });
        assert!(e.alerts().contains(AlertCode::TrafficSignChanged));

        let mut e = AlertEmitter::new();
        e.begin_tick();
        e.observe(&AlertInputs { signal: TrafficSignal::Green, ..inputs(PlanState::Lead) });
        assert!(!e.alerts().contains(AlertCode::TrafficSignChanged));
    }
}
