//! Vehicle profiles and the shared vehicle-event checks.
//!
//! Each supported make maps to a [`ProfileParams`] table; one
//! [`VehicleEventMonitor`] evaluates the common events and the
//! profile-specific low-speed and engage checks from that table.
//!
//! # Invariants
//!
//! - **VEM-001**: low-speed steer alerts use hysteresis: they set below
//!   `min_steer_speed + enter` and clear only above `min_steer_speed + exit`.
//! - **VEM-002**: one-shot alerts are shown once and stay suppressed until
//!   the triggering condition has cleared.

use crate::alert::{AlertCode, AlertSet};
use crate::set_speed::V_CRUISE_MAX;
use crate::snapshot::{ButtonType, GearShifter, VehicleStateSnapshot};
use crate::units::KPH_TO_MS;

/// Highest speed the controller supports, m/s.
pub const MAX_CTRL_SPEED: f32 = (V_CRUISE_MAX + 4.0) * KPH_TO_MS;

/// Lowest configurable minimum steer speed of the default profile, m/s.
pub const DEFAULT_MIN_STEER_SPEED: f32 = 0.4;

/// How long after an enable button a stock cruise engage is accepted, ticks.
pub const ENABLE_BUTTON_WINDOW_TICKS: u32 = 10;

/// Supported vehicle makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleProfile {
    /// Development platform without body events.
    Body,
    /// Subaru.
    Subaru,
    /// Ford.
    Ford,
    /// Nissan.
    Nissan,
    /// Mazda.
    Mazda,
    /// Chrysler.
    Chrysler,
    /// Honda.
    Honda,
    /// Toyota.
    Toyota,
    /// General Motors.
    Gm,
    /// Volkswagen.
    Volkswagen,
    /// Hyundai, Kia and Genesis.
    Hyundai,
}

/// When a stock cruise rising edge raises [`AlertCode::PcmEnable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcmEnableRule {
    /// Never; the profile handles stock cruise edges itself or not at all.
    Never,
    /// Always.
    Always,
    /// Only on vehicles where stock cruise owns engagement.
    IfPcmCruise,
    /// Only when this controller does not command longitudinal motion.
    IfNotLongitudinal,
}

/// Low-speed steer alert hysteresis band, offsets from `min_steer_speed`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowSpeedBand {
    /// Band applies only when `min_steer_speed` exceeds this.
    pub min_steer_above: f32,
    /// Alert sets below `min_steer_speed + enter`.
    pub enter: f32,
    /// Alert clears above `min_steer_speed + exit`.
    pub exit: f32,
}

/// Below-engage-speed checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngageRule {
    /// No check.
    None,
    /// Stock cruise cuts out at low speed; its edges are reported here.
    PcmSpeedLockout,
    /// Longitudinal control needs a resume press from standstill.
    StandstillResume,
    /// Longitudinal control with a small margin above the enable speed.
    EnableMargin,
    /// Plain minimum enable speed.
    MinEnable,
}

/// Profile-specific parameters for the shared event checks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProfileParams {
    /// Common body and cruise events are evaluated.
    pub common_events: bool,
    /// Gears accepted in addition to drive.
    pub extra_gears: &'static [GearShifter],
    /// Buttons whose release requests engagement on non-PCM vehicles.
    pub enable_buttons: &'static [ButtonType],
    /// Stock cruise engage edge handling.
    pub pcm_enable: PcmEnableRule,
    /// Stock cruise engage needs a recent enable button.
    pub pcm_enable_needs_button: bool,
    /// Accel press raises a button enable on non-PCM vehicles.
    pub accel_press_enable: bool,
    /// Low-speed steer hysteresis.
    pub low_speed: Option<LowSpeedBand>,
    /// Below-engage check.
    pub engage: EngageRule,
    /// Resume-required and below-steer-speed are shown once per occurrence.
    pub one_shot_alerts: bool,
}

const SPEED_BUTTONS: &[ButtonType] = &[ButtonType::AccelCruise, ButtonType::DecelCruise];

const COMMON: ProfileParams = ProfileParams {
    common_events: true,
    extra_gears: &[],
    enable_buttons: SPEED_BUTTONS,
    pcm_enable: PcmEnableRule::Always,
    pcm_enable_needs_button: false,
    accel_press_enable: false,
    low_speed: None,
    engage: EngageRule::None,
    one_shot_alerts: false,
};

impl VehicleProfile {
    /// Parameter table for this make.
    pub fn params(self) -> ProfileParams {
        match self {
            Self::Body => ProfileParams { common_events: false, ..COMMON },
            Self::Subaru | Self::Mazda => COMMON,
            Self::Ford => ProfileParams { extra_gears: &[GearShifter::Manumatic], ..COMMON },
            Self::Nissan => ProfileParams { extra_gears: &[GearShifter::Brake], ..COMMON },
            Self::Chrysler => ProfileParams {
                extra_gears: &[GearShifter::Low],
                low_speed: Some(LowSpeedBand { min_steer_above: 0.0, enter: 0.5, exit: 1.0 }),
                ..COMMON
            },
            Self::Honda => ProfileParams {
                pcm_enable: PcmEnableRule::Never,
                engage: EngageRule::PcmSpeedLockout,
                ..COMMON
            },
            Self::Toyota => ProfileParams { engage: EngageRule::StandstillResume, ..COMMON },
            Self::Gm => ProfileParams {
                extra_gears: &[
                    GearShifter::Sport,
                    GearShifter::Low,
                    GearShifter::Eco,
                    GearShifter::Manumatic,
                ],
                enable_buttons: &[ButtonType::DecelCruise],
                pcm_enable: PcmEnableRule::IfPcmCruise,
                accel_press_enable: true,
                engage: EngageRule::MinEnable,
                one_shot_alerts: true,
                ..COMMON
            },
            Self::Volkswagen => ProfileParams {
                extra_gears: &[GearShifter::Eco, GearShifter::Sport, GearShifter::Manumatic],
                enable_buttons: &[ButtonType::SetCruise, ButtonType::ResumeCruise],
                pcm_enable: PcmEnableRule::IfNotLongitudinal,
                low_speed: Some(LowSpeedBand {
                    min_steer_above: DEFAULT_MIN_STEER_SPEED + 1e-3,
                    enter: 1.0,
                    exit: 2.0,
                }),
                engage: EngageRule::EnableMargin,
                ..COMMON
            },
            Self::Hyundai => ProfileParams {
                pcm_enable: PcmEnableRule::IfPcmCruise,
                pcm_enable_needs_button: true,
                low_speed: Some(LowSpeedBand { min_steer_above: 10.0, enter: 2.0, exit: 4.0 }),
                ..COMMON
            },
        }
    }
}

/// Fixed vehicle capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleParams {
    /// Lateral control is unavailable below this speed, m/s.
    pub min_steer_speed: f32,
    /// Engagement is unavailable below this speed, m/s.
    pub min_enable_speed: f32,
    /// Stock cruise owns engagement.
    pub pcm_cruise: bool,
    /// This controller commands longitudinal motion.
    pub longitudinal_control: bool,
    /// Stock cruise resumes from standstill on its own.
    pub auto_resume_sng: bool,
}

/// Outer-loop state of the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PreviousControl {
    /// The outer loop was engaged.
    pub enabled: bool,
    /// Commanded acceleration, m/s².
    pub accel: f32,
}

/// Evaluates vehicle events for one profile.
#[derive(Clone, Debug)]
pub struct VehicleEventMonitor {
    profile: VehicleProfile,
    params: ProfileParams,
    vehicle: VehicleParams,
    prev_cruise_enabled: bool,
    low_speed_alert: bool,
    below_steer_shown: bool,
    below_steer_suppressed: bool,
    resume_shown: bool,
    resume_suppressed: bool,
    since_enable_button: u32,
}

impl VehicleEventMonitor {
    /// Monitor for `profile` on a vehicle with `vehicle` capabilities.
    pub fn new(profile: VehicleProfile, vehicle: VehicleParams) -> Self {
        Self {
            profile,
            params: profile.params(),
            vehicle,
            prev_cruise_enabled: false,
            low_speed_alert: false,
            below_steer_shown: false,
            below_steer_suppressed: false,
            resume_shown: false,
            resume_suppressed: false,
            since_enable_button: u32::MAX,
        }
    }

    /// Configured profile.
    pub fn profile(&self) -> VehicleProfile {
        self.profile
    }

    /// Evaluate one tick and add the raised events to `alerts`.
    pub fn update(&mut self, cs: &VehicleStateSnapshot, prev: PreviousControl, alerts: &mut AlertSet) {
        let p = self.params;
        let veh = self.vehicle;
        let cruise = cs.cruise_state;
        let rising = cruise.enabled && !self.prev_cruise_enabled;
        self.prev_cruise_enabled = cruise.enabled;

        let recent_button = cs.button_events.iter().any(|b| {
            matches!(
                b.button,
                ButtonType::AccelCruise
                    | ButtonType::DecelCruise
                    | ButtonType::Cancel
                    | ButtonType::MainCruise
            )
        });
        self.since_enable_button = if recent_button {
            0
        } else {
            self.since_enable_button.saturating_add(1)
        };

        if p.common_events {
            self.common_events(cs, rising, alerts);
        }

        if let Some(band) = p.low_speed {
            // VEM-001
            if veh.min_steer_speed > band.min_steer_above
                && cs.v_ego < veh.min_steer_speed + band.enter
            {
                self.low_speed_alert = true;
            } else if cs.v_ego > veh.min_steer_speed + band.exit {
                self.low_speed_alert = false;
            }
            if self.low_speed_alert {
                alerts.push(AlertCode::BelowSteerSpeed);
            }
        }

        match p.engage {
            EngageRule::None => {}
            EngageRule::PcmSpeedLockout => {
                if veh.pcm_cruise {
                    if cs.v_ego < veh.min_enable_speed {
                        alerts.push(AlertCode::BelowEngageSpeed);
                    }
                    if rising {
                        alerts.push(AlertCode::PcmEnable);
                    } else if !cruise.enabled && (prev.accel >= 0.0 || !veh.longitudinal_control) {
                        if cs.v_ego < veh.min_enable_speed + 2.0 {
                            alerts.push(AlertCode::SpeedTooLow);
                        } else {
                            alerts.push(AlertCode::PcmDisable);
                        }
                    }
                }
                if veh.min_enable_speed > 0.0 && cs.v_ego < 0.001 {
                    alerts.push(AlertCode::ManualRestart);
                }
            }
            EngageRule::StandstillResume => {
                if veh.longitudinal_control {
                    if cruise.standstill && !cs.brake_pressed {
                        alerts.push(AlertCode::ResumeRequired);
                    }
                    if cs.v_ego < veh.min_enable_speed {
                        alerts.push(AlertCode::BelowEngageSpeed);
                        if prev.accel > 0.3 {
                            alerts.push(AlertCode::SpeedTooLow);
                        }
                        if cs.v_ego < 0.001 {
                            alerts.push(AlertCode::ManualRestart);
                        }
                    }
                }
            }
            EngageRule::EnableMargin => {
                if veh.longitudinal_control {
                    if cs.v_ego < veh.min_enable_speed + 0.5 {
                        alerts.push(AlertCode::BelowEngageSpeed);
                    }
                    if prev.enabled && cs.v_ego < veh.min_enable_speed {
                        alerts.push(AlertCode::SpeedTooLow);
                    }
                }
            }
            EngageRule::MinEnable => {
                if cs.v_ego < veh.min_enable_speed {
                    alerts.push(AlertCode::BelowEngageSpeed);
                }
            }
        }

        if p.accel_press_enable && !veh.pcm_cruise && cs.pressed(ButtonType::AccelCruise) {
            alerts.push(AlertCode::ButtonEnable);
        }

        if p.one_shot_alerts {
            self.one_shot_alerts(cs, alerts);
        }
    }

    fn common_events(&mut self, cs: &VehicleStateSnapshot, rising: bool, alerts: &mut AlertSet) {
        let p = self.params;
        let veh = self.vehicle;
        let body = cs.body;

        if body.door_open {
            alerts.push(AlertCode::DoorOpen);
        }
        if body.seatbelt_unlatched {
            alerts.push(AlertCode::SeatbeltNotLatched);
        }
        if body.gear != GearShifter::Drive && !p.extra_gears.contains(&body.gear) {
            alerts.push(AlertCode::WrongGear);
        }
        if body.gear == GearShifter::Reverse {
            alerts.push(AlertCode::ReverseGear);
        }
        if !cs.cruise_state.available {
            alerts.push(AlertCode::WrongCarMode);
        }
        if body.esp_disabled {
            alerts.push(AlertCode::EspDisabled);
        }
        if cs.v_ego > MAX_CTRL_SPEED {
            alerts.push(AlertCode::SpeedTooHigh);
        }
        if cs.cruise_state.non_adaptive {
            alerts.push(AlertCode::WrongCruiseMode);
        }
        if body.parking_brake {
            alerts.push(AlertCode::ParkBrake);
        }
        if body.steering_pressed {
            alerts.push(AlertCode::SteerOverride);
        }
        if cs.brake_pressed && cs.standstill {
            alerts.push(AlertCode::PreEnableStandstill);
        }
        if cs.gas_pressed {
            alerts.push(AlertCode::GasPressedOverride);
        }

        let button_enable = cs
            .button_events
            .iter()
            .any(|b| !b.pressed && p.enable_buttons.contains(&b.button));
        if !veh.pcm_cruise && button_enable {
            alerts.push(AlertCode::ButtonEnable);
        }

        let pcm_enable = match p.pcm_enable {
            PcmEnableRule::Never => false,
            PcmEnableRule::Always => true,
            PcmEnableRule::IfPcmCruise => veh.pcm_cruise,
            PcmEnableRule::IfNotLongitudinal => !veh.longitudinal_control,
        };
        if pcm_enable {
            let allow = !p.pcm_enable_needs_button
                || self.since_enable_button < ENABLE_BUTTON_WINDOW_TICKS;
            if rising && allow {
                alerts.push(AlertCode::PcmEnable);
            } else if !cs.cruise_state.enabled {
                alerts.push(AlertCode::PcmDisable);
            }
        }
    }

    fn one_shot_alerts(&mut self, cs: &VehicleStateSnapshot, alerts: &mut AlertSet) {
        // VEM-002
        let veh = self.vehicle;
        let standstill = cs.cruise_state.standstill;
        if standstill && !(veh.auto_resume_sng || self.resume_suppressed) {
            alerts.push(AlertCode::ResumeRequired);
            self.resume_shown = true;
        }
        if self.resume_shown && !standstill {
            self.resume_suppressed = true;
        }

        if cs.v_ego < veh.min_steer_speed && !self.below_steer_suppressed {
            alerts.push(AlertCode::BelowSteerSpeed);
            self.below_steer_shown = true;
        }
        if self.below_steer_shown && cs.v_ego >= veh.min_steer_speed {
            self.below_steer_suppressed = true;
        }
    }
}
