//! Per-tick inputs: the normalized vehicle snapshot and the context supplied
//! by the planning and control subsystems.
//!
//! Everything here is produced fresh each tick by the caller and is read-only
//! to the controller. Button events are carried in a fixed-capacity
//! `heapless::Vec`; a decoder that produces more events than fit in one tick
//! simply drops the excess, which the tracker treats as "no edge".

use heapless::Vec as HVec;

/// Maximum button events carried by one snapshot.
pub const MAX_BUTTON_EVENTS: usize = 8;

// ─── Buttons ────────────────────────────────────────────────────────────────

/// Steering-wheel and cruise-stalk buttons the decoder may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ButtonType {
    /// Unmapped button.
    Unknown,
    /// Speed up / resume-accel.
    AccelCruise,
    /// Speed down / set-coast.
    DecelCruise,
    /// Cancel cruise.
    Cancel,
    /// Following-gap adjust.
    GapAdjustCruise,
    /// Resume.
    ResumeCruise,
    /// Set.
    SetCruise,
    /// Cruise main switch.
    MainCruise,
}

/// A single press or release transition reported by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ButtonEvent {
    /// Which button changed.
    pub button: ButtonType,
    /// `true` on the press edge, `false` on the release edge.
    pub pressed: bool,
}

impl ButtonEvent {
    /// Press edge for `button`.
    pub const fn press(button: ButtonType) -> Self {
        Self { button, pressed: true }
    }

    /// Release edge for `button`.
    pub const fn release(button: ButtonType) -> Self {
        Self { button, pressed: false }
    }
}

// ─── Vehicle state ──────────────────────────────────────────────────────────

/// Stock cruise status as reported by the vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CruiseState {
    /// Cruise main switch is on.
    pub available: bool,
    /// Stock cruise is engaged.
    pub enabled: bool,
    /// Stock cruise is holding the vehicle at a stop.
    pub standstill: bool,
    /// Stock set speed, m/s.
    pub speed: f32,
    /// Stock set speed as shown on the cluster, m/s.
    pub speed_cluster: f32,
    /// Stock cruise is in a non-adaptive mode.
    pub non_adaptive: bool,
}

/// Transmission selector position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GearShifter {
    /// Unknown position.
    Unknown,
    /// Park.
    Park,
    /// Drive.
    #[default]
    Drive,
    /// Neutral.
    Neutral,
    /// Reverse.
    Reverse,
    /// Sport.
    Sport,
    /// Low.
    Low,
    /// Brake (regenerative "B" mode).
    Brake,
    /// Eco.
    Eco,
    /// Manual shifting mode.
    Manumatic,
}

/// Body and chassis status used by vehicle-profile events.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyStatus {
    /// Any door is open.
    pub door_open: bool,
    /// Driver seatbelt is unlatched.
    pub seatbelt_unlatched: bool,
    /// Selector position.
    pub gear: GearShifter,
    /// Parking brake is set.
    pub parking_brake: bool,
    /// Stability control is switched off.
    pub esp_disabled: bool,
    /// Driver is applying steering torque.
    pub steering_pressed: bool,
}

/// Normalized vehicle state for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleStateSnapshot {
    /// Ego speed, m/s.
    pub v_ego: f32,
    /// Ego speed as shown on the cluster, m/s.
    pub v_ego_cluster: f32,
    /// Ego longitudinal acceleration, m/s².
    pub a_ego: f32,
    /// Accelerator pedal position [0.0, 1.0].
    pub gas: f32,
    /// Accelerator pedal is pressed.
    pub gas_pressed: bool,
    /// Brake pedal is pressed.
    pub brake_pressed: bool,
    /// Vehicle is stopped.
    pub standstill: bool,
    /// Stock cruise status.
    pub cruise_state: CruiseState,
    /// Button transitions since the previous tick.
    pub button_events: HVec<ButtonEvent, MAX_BUTTON_EVENTS>,
    /// Units shown to the driver are metric.
    pub is_metric: bool,
    /// Body and chassis status.
    pub body: BodyStatus,
}

impl VehicleStateSnapshot {
    /// `true` if any button transition in this tick is a press of `button`.
    pub fn pressed(&self, button: ButtonType) -> bool {
        self.button_events
            .iter()
            .any(|b| b.button == button && b.pressed)
    }
}

// ─── Planner and control context ────────────────────────────────────────────

/// Longitudinal plan classification published by the planner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlanState {
    /// Following a lead vehicle.
    #[default]
    Lead,
    /// Plain cruise.
    Cruise,
    /// End-to-end cruise.
    E2eCruise,
    /// End-to-end stopping for a light or sign.
    E2eStop,
    /// End-to-end preparing to start.
    E2ePrepare,
    /// End-to-end stopped.
    E2eStopped,
}

impl PlanState {
    /// Decode the planner's numeric state. Unknown codes read as `Lead`,
    /// which never triggers a traffic-driven transition.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Cruise,
            2 => Self::E2eCruise,
            3 => Self::E2eStop,
            4 => Self::E2ePrepare,
            5 => Self::E2eStopped,
            _ => Self::Lead,
        }
    }

    /// The planner is bringing the vehicle to a stop.
    pub fn is_stopping(self) -> bool {
        self == Self::E2eStop
    }

    /// The planner is stopping or already stopped.
    pub fn is_stop_or_stopped(self) -> bool {
        matches!(self, Self::E2eStop | Self::E2eStopped)
    }
}

/// Nearest tracked vehicle ahead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeadInfo {
    /// Relative distance, m. Zero when there is no valid lead.
    pub d_rel: f32,
    /// Relative velocity, m/s (negative = closing).
    pub v_rel: f32,
    /// Lead absolute velocity, m/s.
    pub v_lead: f32,
}

impl LeadInfo {
    /// Build from a radar track, zeroing everything when the track is not valid.
    pub fn from_track(status: bool, d_rel: f32, v_rel: f32, v_lead: f32) -> Self {
        if status && d_rel.is_finite() && v_rel.is_finite() && v_lead.is_finite() {
            Self { d_rel, v_rel, v_lead }
        } else {
            Self::default()
        }
    }

    /// A lead is present and closer than `distance`.
    pub fn within(&self, distance: f32) -> bool {
        0.0 < self.d_rel && self.d_rel < distance
    }

    /// A lead is present at all.
    pub fn present(&self) -> bool {
        self.d_rel > 0.0
    }
}

/// Per-tick context from the planning and control stages.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickContext {
    /// The outer control loop is engaged.
    pub enabled: bool,
    /// Engagement is currently permitted.
    pub enable_available: bool,
    /// This controller commands longitudinal motion.
    pub longitudinal_control: bool,
    /// Stock cruise (PCM) owns engagement on this vehicle.
    pub pcm_cruise: bool,
    /// Experimental (end-to-end) mode is selected.
    pub experimental_mode: bool,
    /// Lead vehicle.
    pub lead: LeadInfo,
    /// Planner state.
    pub plan: PlanState,
    /// Acceleration commanded on the previous tick, m/s².
    pub accel_output: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_from_invalid_track_is_zeroed() {
        let lead = LeadInfo::from_track(false, 12.0, -1.0, 8.0);
        assert_eq!(lead, LeadInfo::default());
        assert!(!lead.present());

        let nan = LeadInfo::from_track(true, f32::NAN, 0.0, 0.0);
        assert!(!nan.present());
    }

    #[test]
    fn test_lead_within_excludes_zero_distance() {
        let lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        assert!(lead.within(5.0));
        assert!(!lead.within(4.0));
        assert!(!LeadInfo::default().within(5.0));
    }

    #[test]
    fn test_plan_state_codes() {
        assert_eq!(PlanState::from_code(3), PlanState::E2eStop);
        assert_eq!(PlanState::from_code(5), PlanState::E2eStopped);
        assert_eq!(PlanState::from_code(42), PlanState::Lead);
        assert!(PlanState::E2eStop.is_stopping());
        assert!(PlanState::E2eStopped.is_stop_or_stopped());
        assert!(!PlanState::E2ePrepare.is_stop_or_stopped());
    }

    #[test]
    fn test_snapshot_pressed() {
        let mut s = VehicleStateSnapshot::default();
        s.button_events.push(ButtonEvent::release(ButtonType::Cancel)).unwrap();
        s.button_events.push(ButtonEvent::press(ButtonType::AccelCruise)).unwrap();
        assert!(s.pressed(ButtonType::AccelCruise));
        assert!(!s.pressed(ButtonType::Cancel));
    }
}
