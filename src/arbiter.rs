/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Engagement arbitration: fuses pedals, buttons, lead and traffic state
//! into an engage/disengage request and a requested set speed.
//!
//! The arbiter runs once per tick in a fixed order:
//!
//! ```text
//!  0  fail-safe reset, cooldown countdown
//!  1  uninitialised set speed → speed_min
//!  2  brake debounce, soft-hold priming
//!  3  gas debounce, peak value, tap detection
//!  4  gas-while-braking cooldown
//!  5  button edge
//!  6  auto engage / disengage (first matching branch)
//!        a gas tap   b gas release   c brake release
//!        d gas above target   e active ready   f no-pedal engage
//!  7  PCM gate
//!  8  fail-safe reset
//!  9  clip
//! ```
//!
//! # Invariants
//!
//! - **ARB-001**: with automatic cruise off, the cancel latch set or
//!   engagement unavailable, the tick ends `Idle` with soft hold `Inactive`.
//! - **ARB-002**: while `auto_cancel_timer > 0` no automatic path requests
//!   `Engage`, except a double gas tap which clears the timer first.
//! - **ARB-003**: only an accel or decel edge releases the cancel latch.
//! - **ARB-004**: the returned set speed lies within the regulator bounds.
//!
//! A request persists across ticks until a pedal, button, gate or fail-safe
//! clears it.

use crate::alert::{AlertCode, AlertSet};
use crate::button::{ButtonEdge, ButtonEdgeTracker, EdgeKind};
use crate::config::{AutoCruiseMode, ButtonMode, CruiseConfig, GasCancelMode};
use crate::debounce::PedalCounter;
use crate::set_speed::{SetSpeedRegulator, SpeedDirection, V_CRUISE_UNSET_ABOVE};
use crate::snapshot::{ButtonType, TickContext, VehicleStateSnapshot};
use crate::status::StatusLine;
use crate::traffic::{TrafficLightCorrelator, TrafficState};

// ─── State ──────────────────────────────────────────────────────────────────

/// Engagement request published to the outer control loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CruiseActivate {
    /// Disengage.
    Deny,
    /// No request.
    #[default]
    Idle,
    /// Engage.
    Engage,
}

impl CruiseActivate {
    /// Signed wire code: −1, 0, 1.
    pub fn code(self) -> i8 {
        match self {
            Self::Deny => -1,
            Self::Idle => 0,
            Self::Engage => 1,
        }
    }
}

/// Standstill hold after a long brake at a stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SoftHold {
    /// Not holding.
    #[default]
    Inactive,
    /// Brake held long enough at a stop; releasing the brake engages.
    Primed,
    /// Engaged from a primed hold; the vehicle waits for a go signal.
    Active,
}

impl SoftHold {
    /// Numeric code: 0, 1, 2.
    pub fn code(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Primed => 1,
            Self::Active => 2,
        }
    }
}

/// Externally visible arbiter state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngagementState {
    /// Current engagement request.
    pub cruise_activate: CruiseActivate,
    /// Soft-hold state.
    pub soft_hold: SoftHold,
    /// Brake pedal debounce.
    pub brake_count: PedalCounter,
    /// Gas pedal debounce.
    pub gas_count: PedalCounter,
    /// Remaining ticks during which automatic engagement is suppressed.
    pub auto_cancel_timer: u32,
    /// The driver cancelled; automatic engagement stays off until an
    /// accel or decel press.
    pub cancel_latched: bool,
    /// Engage as soon as a lead or a stop appears.
    pub active_ready: bool,
}

/// Per-tick inputs to [`EngagementArbiter::tick`].
#[derive(Clone, Copy, Debug)]
pub struct ArbiterInputs<'a> {
    /// Vehicle snapshot.
    pub snapshot: &'a VehicleStateSnapshot,
    /// Planner and control context.
    pub ctx: &'a TickContext,
    /// Cluster speed, whole kph.
    pub v_ego_kph: f32,
    /// Traffic-light state at the start of the tick.
    pub traffic: TrafficState,
}

/// Collaborators the arbiter writes to.
pub struct ArbiterEffects<'a> {
    /// Set-speed regulator.
    pub regulator: &'a mut SetSpeedRegulator,
    /// Traffic correlator, for forced states.
    pub traffic: &'a mut TrafficLightCorrelator,
    /// Alert set of this tick.
    pub alerts: &'a mut AlertSet,
    /// Status line.
    pub status: &'a mut StatusLine,
}

// ─── Arbiter ────────────────────────────────────────────────────────────────

/// Central engage/disengage state machine.
#[derive(Clone, Debug)]
pub struct EngagementArbiter {
    state: EngagementState,
    buttons: ButtonEdgeTracker,
    soft_hold_count: u32,
    gas_peak: f32,
    gas_hold_ticks: u32,
    frame: u64,
    brake_frame: Option<u64>,
    gas_tap_frame: Option<u64>,
    personality: u8,
}

impl Default for EngagementArbiter {
    fn default() -> Self {
        Self {
            state: EngagementState::default(),
            buttons: ButtonEdgeTracker::new(),
            soft_hold_count: 0,
            gas_peak: 0.0,
            gas_hold_ticks: 0,
            frame: 0,
            brake_frame: None,
            gas_tap_frame: None,
            personality: 1,
        }
    }
}

impl EngagementArbiter {
    /// Idle arbiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &EngagementState {
        &self.state
    }

    /// Driving personality index.
    pub fn personality(&self) -> u8 {
        self.personality
    }

    /// Restore a stored driving personality.
    pub fn set_personality(&mut self, personality: u8) {
        self.personality = personality;
    }

    /// Drop any pending request, e.g. when cruise becomes unavailable.
    pub fn clear_request(&mut self) {
        self.state.cruise_activate = CruiseActivate::Idle;
    }

    /// Run one tick. Returns the requested set speed, clipped.
    pub fn tick(
        &mut self,
        v_cruise_kph: f32,
        input: &ArbiterInputs<'_>,
        fx: &mut ArbiterEffects<'_>,
        config: &CruiseConfig,
    ) -> f32 {
        let before = self.state;
        let cs = input.snapshot;
        let ctx = input.ctx;
        let t = &config.tuning;
        let auto_on = config.auto_cruise != AutoCruiseMode::Off;
        let v_ego_kph = input.v_ego_kph;
        let stopping = ctx.plan.is_stopping() || input.traffic == TrafficState::RedTriggered;
        self.frame = self.frame.wrapping_add(1);

        // 0
        self.fail_safe(config, ctx);
        self.state.auto_cancel_timer = self.state.auto_cancel_timer.saturating_sub(1);

        // 1
        let mut v = v_cruise_kph;
        if v > V_CRUISE_UNSET_ABOVE {
            fx.status.show(format_args!("VCruise: speed initialize...."));
            v = fx.regulator.target().speed_min;
        }

        // 2
        self.state.brake_count.update(cs.brake_pressed);
        if cs.brake_pressed {
            self.soft_hold_count = if config.soft_hold && cs.v_ego < t.soft_hold_speed {
                self.soft_hold_count.saturating_add(1)
            } else {
                0
            };
            self.state.soft_hold =
                if self.soft_hold_count > t.soft_hold_ticks && ctx.longitudinal_control {
                    SoftHold::Primed
                } else {
                    SoftHold::Inactive
                };
        } else {
            self.soft_hold_count = 0;
        }
        if self.state.soft_hold != SoftHold::Inactive || cs.brake_pressed {
            self.brake_frame = Some(self.frame);
        }

        // 3
        let held_before = self.state.gas_count.held_ticks();
        self.state.gas_count.update(cs.gas_pressed);
        let mut gas_tap = false;
        if cs.gas_pressed {
            self.state.soft_hold = SoftHold::Inactive;
            self.gas_peak = self.gas_peak.max(cs.gas);
            self.gas_hold_ticks = self.state.gas_count.held_ticks();
        } else {
            gas_tap = 0 < held_before && held_before < t.gas_tap_ticks;
            if !self.state.gas_count.is_release_edge() {
                self.gas_peak = 0.0;
                self.gas_hold_ticks = 0;
            }
        }

        // 4
        if ctx.enabled || cs.brake_pressed || cs.gas_pressed {
            self.state.active_ready = false;
            if cs.gas_pressed && ctx.accel_output < t.brake_override_accel {
                self.state.auto_cancel_timer = t.brake_override_cooldown_ticks;
                self.state.cruise_activate = CruiseActivate::Deny;
                fx.status.show(format_args!("Cruise off (GasPressed while braking)"));
            }
        }

        // 5
        let standstill = cs.cruise_state.standstill;
        if let Some(edge) = self.buttons.classify(&cs.button_events, standstill, ctx.enabled) {
            v = self.apply_button(edge, v, input, fx, config);
        }
        if cs.v_ego > t.soft_hold_release_speed {
            self.state.soft_hold = SoftHold::Inactive;
        }
        if (cs.brake_pressed || cs.gas_pressed)
            && self.state.cruise_activate == CruiseActivate::Engage
        {
            self.state.cruise_activate = CruiseActivate::Idle;
        }

        // 6
        v = self.auto_engage(v, gas_tap, stopping, input, fx, config);

        // 7: stock cruise cannot take a request below its speed lockout
        if ctx.pcm_cruise
            && !(v_ego_kph >= t.pcm_min_speed_kph || ctx.lead.within(t.pcm_lead_distance))
        {
            self.state.cruise_activate = CruiseActivate::Idle;
        }

        // 8
        if self.fail_safe(config, ctx) && before.cruise_activate != CruiseActivate::Idle {
            fx.status.show_auto(
                auto_on,
                format_args!("Cancel auto Cruise = {}", before.cruise_activate.code()),
            );
        }

        self.log_transitions(&before);

        // 9
        fx.regulator.target().clip(v)
    }

    /// Force `Idle` and `Inactive` when automatic engagement is not allowed.
    /// Returns whether the reset applied.
    fn fail_safe(&mut self, config: &CruiseConfig, ctx: &TickContext) -> bool {
        // ARB-001
        if config.auto_cruise == AutoCruiseMode::Off
            || self.state.cancel_latched
            || !ctx.enable_available
        {
            self.state.cruise_activate = CruiseActivate::Idle;
            self.state.soft_hold = SoftHold::Inactive;
            true
        } else {
            false
        }
    }

    fn apply_button(
        &mut self,
        edge: ButtonEdge,
        mut v: f32,
        input: &ArbiterInputs<'_>,
        fx: &mut ArbiterEffects<'_>,
        config: &CruiseConfig,
    ) -> f32 {
        let ctx = input.ctx;
        let t = &config.tuning;
        let auto_on = config.auto_cruise != AutoCruiseMode::Off;
        // speed changes only for presses that started while engaged
        let adjust = edge.context.engaged;

        if ctx.enabled {
            match (edge.button, edge.kind) {
                (ButtonType::AccelCruise, EdgeKind::LongPressTick) => {
                    if adjust {
                        v = fx.regulator.apply_button(v, SpeedDirection::Up, true);
                        fx.status.show(format_args!("Button long pressed..{:.0}", v));
                    }
                }
                (ButtonType::DecelCruise, EdgeKind::LongPressTick) => {
                    if config.button_mode == ButtonMode::Traffic {
                        fx.traffic.force(TrafficState::Forced, t.forced_traffic_ticks);
                        fx.alerts.push(AlertCode::AudioPrompt);
                        fx.status.show(format_args!("Button force decel"));
                    } else if adjust {
                        v = fx.regulator.apply_button(v, SpeedDirection::Down, true);
                        fx.status.show(format_args!("Button long pressed..{:.0}", v));
                    }
                }
                (ButtonType::GapAdjustCruise, EdgeKind::LongPressTick) => {
                    fx.status.show(format_args!("Button long gap pressed .."));
                }
                (ButtonType::AccelCruise, EdgeKind::ShortPress) => {
                    if self.state.soft_hold != SoftHold::Inactive && auto_on {
                        self.state.soft_hold = SoftHold::Inactive;
                        fx.status.show(format_args!("Button softhold released .."));
                    } else if ctx.plan.is_stop_or_stopped()
                        && config.button_mode == ButtonMode::Traffic
                    {
                        fx.traffic.force(TrafficState::GreenTriggered, t.forced_traffic_ticks);
                        fx.status.show(format_args!("Button start (traffic ignore)"));
                    } else if adjust && !edge.context.standstill {
                        v = match config.button_mode {
                            ButtonMode::Direct => fx.regulator.apply_button(v, SpeedDirection::Up, false),
                            _ => fx.regulator.speed_up(v, config.speed_unit_kph),
                        };
                        fx.status.show(format_args!("Button speed up...{:.0}", v));
                    }
                }
                (ButtonType::DecelCruise, EdgeKind::ShortPress) => {
                    if !auto_on || matches!(config.button_mode, ButtonMode::Direct | ButtonMode::Step)
                    {
                        if adjust {
                            v = fx.regulator.apply_button(v, SpeedDirection::Down, false);
                            fx.status.show(format_args!("Button speed down...{:.0}", v));
                        }
                    } else if v > input.v_ego_kph {
                        v = input.v_ego_kph;
                        fx.status.show(format_args!("Button speed set...{:.0}", v));
                    } else {
                        self.state.active_ready = true;
                        self.state.cruise_activate = CruiseActivate::Deny;
                        fx.alerts.push(AlertCode::AudioPrompt);
                    }
                }
                (ButtonType::GapAdjustCruise, EdgeKind::ShortPress) => {
                    let count = config.personality_count.max(1);
                    let p = self.personality.min(count - 1);
                    self.personality = (p + count - 1) % count;
                    fx.status.show(format_args!("Button gap pressed .."));
                    tracing::debug!(personality = self.personality, "personality changed");
                }
                (ButtonType::Cancel, _) => {
                    fx.status.show(format_args!("Button cancel pressed"));
                }
                _ => {}
            }
        } else {
            self.state.cruise_activate = CruiseActivate::Idle;
        }

        match edge.button {
            ButtonType::Cancel => {
                self.state.auto_cancel_timer = 0;
                if !self.state.cancel_latched {
                    fx.status.show(format_args!("Button cancel : Cruise OFF"));
                }
                self.state.cancel_latched = true;
                fx.alerts.push(AlertCode::AudioPrompt);
            }
            ButtonType::AccelCruise | ButtonType::DecelCruise => {
                // ARB-003
                self.state.auto_cancel_timer = 0;
                self.state.cancel_latched = false;
            }
            _ => {}
        }
        v
    }

    fn auto_engage(
        &mut self,
        mut v: f32,
        gas_tap: bool,
        stopping: bool,
        input: &ArbiterInputs<'_>,
        fx: &mut ArbiterEffects<'_>,
        config: &CruiseConfig,
    ) -> f32 {
        let cs = input.snapshot;
        let ctx = input.ctx;
        let t = &config.tuning;
        let auto_on = config.auto_cruise != AutoCruiseMode::Off;
        let v_ego_kph = input.v_ego_kph;
        let gas = self.state.gas_count;
        let brake = self.state.brake_count;

        if gas_tap {
            // a
            let double_tap = self
                .gas_tap_frame
                .is_some_and(|f| self.frame.wrapping_sub(f) < u64::from(t.double_tap_ticks));
            if self.state.auto_cancel_timer == 0 || double_tap {
                self.state.auto_cancel_timer = 0;
                let recent_brake = self
                    .brake_frame
                    .is_some_and(|f| self.frame.wrapping_sub(f) < u64::from(t.recent_brake_ticks));
                if ctx.enabled {
                    if recent_brake {
                        v = v_ego_kph;
                        fx.status.show(format_args!("Gas tok speed set to current (prev. brake pressed)"));
                    } else {
                        v = fx.regulator.speed_up(v, config.speed_unit_kph);
                        fx.status.show(format_args!("Gas tok speed up...{:.0}", v));
                    }
                } else if config.auto_resume_from_gas_kph > 0.0 {
                    fx.status.show_auto(auto_on, format_args!("Cruise Activate from GasTok"));
                    self.state.cruise_activate = CruiseActivate::Engage;
                }
            }
            self.gas_tap_frame = Some(self.frame);
        } else if gas.is_release_edge() {
            // b
            v = self.gas_released(v, stopping, input, fx, config);
            if self.state.auto_cancel_timer > 0
                && self.state.cruise_activate == CruiseActivate::Engage
            {
                self.state.cruise_activate = CruiseActivate::Idle;
                self.state.active_ready = true;
            }
        } else if brake.is_release_edge() {
            // c
            if self.state.soft_hold == SoftHold::Primed && config.soft_hold {
                fx.status.show_auto(auto_on, format_args!("Cruise Activate from SoftHold"));
                self.state.soft_hold = SoftHold::Active;
                self.state.cruise_activate = CruiseActivate::Engage;
                self.state.auto_cancel_timer = 0;
            } else {
                v = self.brake_released(v, input, fx, config);
                if self.state.auto_cancel_timer > 0
                    && self.state.cruise_activate == CruiseActivate::Engage
                {
                    self.state.cruise_activate = CruiseActivate::Idle;
                }
            }
        } else if gas.is_held() && v_ego_kph > v {
            // d
            v = v_ego_kph;
            fx.regulator.raise_max(v);
        } else if self.state.active_ready && self.state.auto_cancel_timer == 0 {
            // e
            if ctx.lead.present() || stopping {
                fx.status.show_auto(auto_on, format_args!("Cruise Activate from Lead or Traffic sign stop"));
                self.state.cruise_activate = CruiseActivate::Engage;
            }
        } else if auto_on
            && !ctx.enabled
            && brake.is_released()
            && gas.is_released()
            && self.state.auto_cancel_timer == 0
        {
            // f
            let lead = ctx.lead;
            let stop_distance = cs.v_ego * cs.v_ego / (2.0 * t.stopping_decel);
            let cruise_on = crate::units::abs(config.cruise_on_distance);
            if config.auto_cruise >= AutoCruiseMode::Predictive
                && lead.v_rel < 0.0
                && lead.within(stop_distance)
            {
                fx.status.show_auto(auto_on, format_args!("Auto Cruise Activate"));
                self.state.cruise_activate = CruiseActivate::Engage;
            } else if cruise_on > 0.0 && cs.v_ego > t.cruise_on_min_speed && lead.within(cruise_on) {
                fx.alerts.push(AlertCode::StopStop);
                fx.status.show_auto(auto_on, format_args!("CruiseOnDist Activate"));
                self.state.cruise_activate = CruiseActivate::Engage;
            }
        }
        v
    }

    fn gas_released(
        &mut self,
        mut v: f32,
        stopping: bool,
        input: &ArbiterInputs<'_>,
        fx: &mut ArbiterEffects<'_>,
        config: &CruiseConfig,
    ) -> f32 {
        let t = &config.tuning;
        let auto_on = config.auto_cruise != AutoCruiseMode::Off;
        let v_ego_kph = input.v_ego_kph;
        let floor = config.auto_resume_from_gas_kph;
        let cancel_mode = config.gas_cancel_mode != GasCancelMode::Off;

        if cancel_mode && input.ctx.lead.within(input.snapshot.v_ego * t.gas_release_lead_factor) {
            self.state.cruise_activate = CruiseActivate::Deny;
            fx.status.show_auto(auto_on, format_args!("Cruise Deactivate from gas.. too close leadCar!"));
        } else if cancel_mode && v_ego_kph < floor {
            self.state.cruise_activate = CruiseActivate::Deny;
            fx.status.show_auto(auto_on, format_args!("Cruise Deactivate from gas speed:{:.0}", floor));
        } else if stopping && config.gas_cancel_mode == GasCancelMode::Strict {
            v = v_ego_kph;
            self.state.cruise_activate = CruiseActivate::Deny;
            self.state.auto_cancel_timer = t.stop_cooldown_ticks;
            fx.status.show_auto(auto_on, format_args!("Cruise Deactivate from gas pressed: traffic stopping"));
        } else if floor > 0.0 && v_ego_kph > floor {
            if self.state.cruise_activate != CruiseActivate::Engage {
                v = v_ego_kph;
                if self.gas_peak > t.firm_gas_value || self.gas_hold_ticks > t.firm_gas_ticks {
                    fx.status.show_auto(auto_on, format_args!("Cruise Activate from gas(deep/long pressed)"));
                } else {
                    fx.status.show_auto(auto_on, format_args!("Cruise Activate from gas(speed)"));
                }
            }
            self.state.cruise_activate = CruiseActivate::Engage;
        }
        v
    }

    fn brake_released(
        &mut self,
        mut v: f32,
        input: &ArbiterInputs<'_>,
        fx: &mut ArbiterEffects<'_>,
        config: &CruiseConfig,
    ) -> f32 {
        if !config.auto_resume_from_brake_release {
            return v;
        }
        let auto_on = config.auto_cruise != AutoCruiseMode::Off;
        let ctx = input.ctx;
        if config.auto_resume_from_gas_kph < input.v_ego_kph {
            v = input.v_ego_kph;
            fx.status.show_auto(auto_on, format_args!("Cruise Activate Brake Release"));
            self.state.cruise_activate = CruiseActivate::Engage;
        } else if ctx.plan.is_stop_or_stopped() || input.traffic == TrafficState::RedTriggered {
            fx.status.show_auto(auto_on, format_args!("Cruise Activate from Traffic sign stop"));
            self.state.cruise_activate = CruiseActivate::Engage;
        } else if ctx.lead.within(config.tuning.brake_release_lead_distance) {
            v = input.v_ego_kph;
            fx.status.show_auto(auto_on, format_args!("Cruise Activate from Lead Car"));
            self.state.cruise_activate = CruiseActivate::Engage;
        }
        v
    }

    fn log_transitions(&self, before: &EngagementState) {
        let now = &self.state;
        if now.cruise_activate != before.cruise_activate {
            tracing::debug!(
                from = before.cruise_activate.code(),
                to = now.cruise_activate.code(),
                "cruise activate"
            );
        }
        if now.soft_hold != before.soft_hold {
            tracing::debug!(from = before.soft_hold.code(), to = now.soft_hold.code(), "soft hold");
        }
        if now.cancel_latched != before.cancel_latched {
            tracing::debug!(latched = now.cancel_latched, "cancel latch");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ButtonEvent, LeadInfo, PlanState};

    struct Rig {
        arbiter: EngagementArbiter,
        regulator: SetSpeedRegulator,
        traffic: TrafficLightCorrelator,
        alerts: AlertSet,
        status: StatusLine,
        config: CruiseConfig,
        ctx: TickContext,
        v: f32,
    }

    impl Rig {
        fn new() -> Self {
            let mut regulator = SetSpeedRegulator::new();
            regulator.configure(0.0, true);
            regulator.commit(60.0, 60.0, 0.0);
            Self {
                arbiter: EngagementArbiter::new(),
                regulator,
                traffic: TrafficLightCorrelator::new(),
                alerts: AlertSet::new(),
                status: StatusLine::new(),
                config: CruiseConfig {
                    auto_cruise: AutoCruiseMode::On,
                    eco_increment_kph: 0.0,
                    ..CruiseConfig::default()
                },
                ctx: TickContext {
                    enable_available: true,
                    longitudinal_control: true,
                    ..TickContext::default()
                },
                v: 60.0,
            }
        }

        fn step(&mut self, snapshot: &VehicleStateSnapshot) -> EngagementState {
            self.alerts.clear();
            let input = ArbiterInputs {
                snapshot,
                ctx: &self.ctx,
                v_ego_kph: crate::units::cluster_kph(snapshot.v_ego),
                traffic: self.traffic.state(),
            };
            let mut fx = ArbiterEffects {
                regulator: &mut self.regulator,
                traffic: &mut self.traffic,
                alerts: &mut self.alerts,
                status: &mut self.status,
            };
            self.v = self.arbiter.tick(self.v, &input, &mut fx, &self.config);
            self.traffic.end_tick();
            *self.arbiter.state()
        }

        fn press_release(&mut self, button: ButtonType) -> EngagementState {
            let mut s = VehicleStateSnapshot::default();
            s.button_events.push(ButtonEvent::press(button)).unwrap();
            self.step(&s);
            let mut s = VehicleStateSnapshot::default();
            s.button_events.push(ButtonEvent::release(button)).unwrap();
            self.step(&s)
        }
    }

    fn moving(v_ego: f32) -> VehicleStateSnapshot {
        VehicleStateSnapshot { v_ego, v_ego_cluster: v_ego, ..Default::default() }
    }

    #[test]
    fn test_codes() {
        assert_eq!(CruiseActivate::Deny.code(), -1);
        assert_eq!(CruiseActivate::Idle.code(), 0);
        assert_eq!(CruiseActivate::Engage.code(), 1);
        assert_eq!(SoftHold::Active.code(), 2);
    }

    #[test]
    fn test_short_decel_lowers_by_one() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.press_release(ButtonType::DecelCruise);
        assert_eq!(rig.v, 59.0);
    }

    #[test]
    fn test_uninitialised_target_resets_to_min() {
        let mut rig = Rig::new();
        rig.v = 255.0;
        rig.step(&moving(10.0));
        assert_eq!(rig.v, 0.0);
    }

    #[test]
    fn test_held_accel_snaps_to_next_multiple_of_five() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.v = 62.0;
        let mut s = VehicleStateSnapshot::default();
        s.button_events.push(ButtonEvent::press(ButtonType::AccelCruise)).unwrap();
        rig.step(&s);
        for _ in 0..39 {
            rig.step(&VehicleStateSnapshot::default());
        }
        assert_eq!(rig.v, 62.0);
        rig.step(&VehicleStateSnapshot::default());
        assert_eq!(rig.v, 65.0);
    }

    #[test]
    fn test_soft_hold_primes_and_engages_on_release() {
        let mut rig = Rig::new();
        let braking = VehicleStateSnapshot { brake_pressed: true, ..Default::default() };
        for i in 1..=60 {
            assert_eq!(rig.step(&braking).soft_hold, SoftHold::Inactive, "tick {}", i);
        }
        assert_eq!(rig.step(&braking).soft_hold, SoftHold::Primed);

        let st = rig.step(&VehicleStateSnapshot::default());
        assert_eq!(st.soft_hold, SoftHold::Active);
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
    }

    #[test]
    fn test_soft_hold_needs_longitudinal_control() {
        let mut rig = Rig::new();
        rig.ctx.longitudinal_control = false;
        let braking = VehicleStateSnapshot { brake_pressed: true, ..Default::default() };
        for _ in 0..100 {
            assert_eq!(rig.step(&braking).soft_hold, SoftHold::Inactive);
        }
    }

    #[test]
    fn test_cancel_latches_until_speed_button() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_gas_kph = 1.0;
        let st = rig.press_release(ButtonType::Cancel);
        assert!(st.cancel_latched);
        assert_eq!(st.cruise_activate, CruiseActivate::Idle);
        assert!(rig.alerts.contains(AlertCode::AudioPrompt));

        // a lead inside cruise-on distance does not engage while latched
        rig.ctx.lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        assert_eq!(rig.step(&moving(5.0)).cruise_activate, CruiseActivate::Idle);

        // gap adjust does not unlatch
        assert!(rig.press_release(ButtonType::GapAdjustCruise).cancel_latched);

        assert!(!rig.press_release(ButtonType::AccelCruise).cancel_latched);
        assert_eq!(rig.step(&moving(5.0)).cruise_activate, CruiseActivate::Engage);
    }

    #[test]
    fn test_gas_tap_engages_without_changing_target() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_gas_kph = 1.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.2, ..Default::default() };
        for _ in 0..30 {
            rig.step(&gas);
        }
        let st = rig.step(&VehicleStateSnapshot::default());
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_gas_while_braking_starts_cooldown() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_gas_kph = 1.0;
        rig.ctx.accel_output = -1.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.2, ..Default::default() };
        let st = rig.step(&gas);
        assert_eq!(st.cruise_activate, CruiseActivate::Deny);
        assert_eq!(st.auto_cancel_timer, rig.config.tuning.brake_override_cooldown_ticks);

        // a single tap is suppressed by the cooldown
        rig.ctx.accel_output = 0.0;
        let st = rig.step(&VehicleStateSnapshot::default());
        assert_ne!(st.cruise_activate, CruiseActivate::Engage);

        // a second tap within 1 s overrides it
        rig.step(&gas);
        let st = rig.step(&VehicleStateSnapshot::default());
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(st.auto_cancel_timer, 0);
    }

    #[test]
    fn test_cooldown_counts_down() {
        let mut rig = Rig::new();
        rig.ctx.accel_output = -1.0;
        rig.step(&VehicleStateSnapshot { gas_pressed: true, ..Default::default() });
        rig.ctx.accel_output = 0.0;
        let start = rig.arbiter.state().auto_cancel_timer;
        let st = rig.step(&VehicleStateSnapshot { gas_pressed: true, ..Default::default() });
        assert_eq!(st.auto_cancel_timer, start - 1);
    }

    #[test]
    fn test_stop_and_go_lead_engages_with_alert() {
        let mut rig = Rig::new();
        rig.ctx.lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        let st = rig.step(&moving(5.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert!(rig.alerts.contains(AlertCode::StopStop));
    }

    #[test]
    fn test_predictive_engage_on_closing_lead() {
        let mut rig = Rig::new();
        rig.config.auto_cruise = AutoCruiseMode::Predictive;
        rig.config.cruise_on_distance = 0.0;
        // stopping distance at 20 m/s with 2 m/s² is 100 m
        rig.ctx.lead = LeadInfo::from_track(true, 80.0, -3.0, 17.0);
        assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Engage);

        let mut rig = Rig::new();
        rig.config.cruise_on_distance = 0.0;
        rig.ctx.lead = LeadInfo::from_track(true, 80.0, -3.0, 17.0);
        assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Idle);
    }

    #[test]
    fn test_auto_cruise_off_forces_idle() {
        let mut rig = Rig::new();
        rig.config.auto_cruise = AutoCruiseMode::Off;
        rig.ctx.lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        let st = rig.step(&moving(5.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Idle);
        assert_eq!(st.soft_hold, SoftHold::Inactive);
    }

    #[test]
    fn test_enable_unavailable_forces_idle() {
        let mut rig = Rig::new();
        rig.ctx.enable_available = false;
        rig.ctx.lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        assert_eq!(rig.step(&moving(5.0)).cruise_activate, CruiseActivate::Idle);
    }

    #[test]
    fn test_pcm_gate_blocks_slow_engage_without_lead() {
        let mut rig = Rig::new();
        rig.ctx.pcm_cruise = true;
        rig.config.auto_resume_from_gas_kph = 1.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, v_ego: 1.0, ..Default::default() };
        for _ in 0..10 {
            rig.step(&gas);
        }
        let st = rig.step(&moving(1.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Idle);
    }

    #[test]
    fn test_gas_release_too_close_denies() {
        let mut rig = Rig::new();
        rig.config.gas_cancel_mode = GasCancelMode::Cancel;
        rig.config.auto_resume_from_gas_kph = 30.0;
        rig.ctx.lead = LeadInfo::from_track(true, 10.0, 0.0, 15.0);
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.3, ..moving(15.0) };
        for _ in 0..100 {
            rig.step(&gas);
        }
        assert_eq!(rig.step(&moving(15.0)).cruise_activate, CruiseActivate::Deny);
    }

    #[test]
    fn test_gas_release_above_floor_engages_at_current_speed() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_gas_kph = 30.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.8, ..moving(20.0) };
        for _ in 0..100 {
            rig.step(&gas);
        }
        let st = rig.step(&moving(20.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(rig.v, 72.0);
    }

    #[test]
    fn test_gas_above_target_raises_target() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.step(&VehicleStateSnapshot { gas_pressed: true, ..moving(25.0) });
        assert_eq!(rig.v, 90.0);
    }

    #[test]
    fn test_short_decel_in_adaptive_mode_snaps_or_denies() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.config.button_mode = ButtonMode::StepAdaptive;

        let mut press = moving(10.0);
        press.button_events.push(ButtonEvent::press(ButtonType::DecelCruise)).unwrap();
        rig.step(&press);
        let mut release = moving(10.0);
        release.button_events.push(ButtonEvent::release(ButtonType::DecelCruise)).unwrap();
        rig.step(&release);
        assert_eq!(rig.v, 36.0);

        rig.step(&press);
        let st = rig.step(&release);
        assert_eq!(st.cruise_activate, CruiseActivate::Deny);
        assert!(st.active_ready);
        assert!(rig.alerts.contains(AlertCode::AudioPrompt));
    }

    #[test]
    fn test_step_mode_accel_climbs_ladder() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.config.button_mode = ButtonMode::Step;
        rig.v = 62.0;
        rig.press_release(ButtonType::AccelCruise);
        assert_eq!(rig.v, 65.0);
    }

    #[test]
    fn test_press_started_while_disengaged_does_not_adjust() {
        let mut rig = Rig::new();
        let mut s = VehicleStateSnapshot::default();
        s.button_events.push(ButtonEvent::press(ButtonType::DecelCruise)).unwrap();
        rig.step(&s);
        rig.ctx.enabled = true;
        let mut s = VehicleStateSnapshot::default();
        s.button_events.push(ButtonEvent::release(ButtonType::DecelCruise)).unwrap();
        rig.step(&s);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_traffic_mode_long_decel_forces_stop() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.config.button_mode = ButtonMode::Traffic;
        let mut s = VehicleStateSnapshot::default();
        s.button_events.push(ButtonEvent::press(ButtonType::DecelCruise)).unwrap();
        rig.step(&s);
        for _ in 0..40 {
            rig.step(&VehicleStateSnapshot::default());
        }
        assert_eq!(rig.traffic.state(), TrafficState::Forced);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_traffic_mode_short_accel_ignores_stop() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        rig.ctx.plan = PlanState::E2eStopped;
        rig.config.button_mode = ButtonMode::Traffic;
        rig.press_release(ButtonType::AccelCruise);
        assert_eq!(rig.traffic.state(), TrafficState::GreenTriggered);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_gap_cycles_personality_downwards() {
        let mut rig = Rig::new();
        rig.ctx.enabled = true;
        assert_eq!(rig.arbiter.personality(), 1);
        rig.press_release(ButtonType::GapAdjustCruise);
        assert_eq!(rig.arbiter.personality(), 0);
        rig.press_release(ButtonType::GapAdjustCruise);
        assert_eq!(rig.arbiter.personality(), 2);
    }

    #[test]
    fn test_brake_release_resumes_behind_close_lead() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_brake_release = true;
        rig.config.auto_resume_from_gas_kph = 30.0;
        rig.config.cruise_on_distance = 0.0;
        rig.ctx.lead = LeadInfo::from_track(true, 15.0, 0.0, 4.0);
        rig.step(&VehicleStateSnapshot { brake_pressed: true, ..moving(4.0) });
        let st = rig.step(&moving(4.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(rig.v, 14.0);
    }

    #[test]
    fn test_pedal_press_clears_pending_engage() {
        let mut rig = Rig::new();
        rig.ctx.lead = LeadInfo::from_track(true, 4.0, -0.5, 3.0);
        assert_eq!(rig.step(&moving(5.0)).cruise_activate, CruiseActivate::Engage);
        let braking = VehicleStateSnapshot { brake_pressed: true, ..moving(5.0) };
        assert_eq!(rig.step(&braking).cruise_activate, CruiseActivate::Idle);
    }

    #[test]
    fn test_pcm_gate_drops_any_request_below_lockout() {
        let mut rig = Rig::new();
        rig.ctx.pcm_cruise = true;
        rig.ctx.accel_output = -1.0;
        let st = rig.step(&VehicleStateSnapshot { gas_pressed: true, ..moving(1.0) });
        assert_eq!(st.cruise_activate, CruiseActivate::Idle);
        assert_eq!(st.auto_cancel_timer, rig.config.tuning.brake_override_cooldown_ticks);

        let st = rig.step(&VehicleStateSnapshot { gas_pressed: true, ..moving(20.0) });
        assert_eq!(st.cruise_activate, CruiseActivate::Deny);
    }

    #[test]
    fn test_gas_release_below_floor_denies() {
        let mut rig = Rig::new();
        rig.config.gas_cancel_mode = GasCancelMode::Cancel;
        rig.config.auto_resume_from_gas_kph = 30.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.3, ..moving(5.0) };
        for _ in 0..100 {
            rig.step(&gas);
        }
        let st = rig.step(&moving(5.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Deny);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_strict_gas_release_while_stopping_denies_with_cooldown() {
        let mut rig = Rig::new();
        rig.config.gas_cancel_mode = GasCancelMode::Strict;
        rig.ctx.plan = PlanState::E2eStop;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.3, ..moving(10.0) };
        for _ in 0..100 {
            rig.step(&gas);
        }
        let st = rig.step(&moving(10.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Deny);
        assert_eq!(st.auto_cancel_timer, rig.config.tuning.stop_cooldown_ticks);
        assert_eq!(rig.v, 36.0);
    }

    #[test]
    fn test_brake_release_engages_for_planned_stop() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_brake_release = true;
        rig.config.auto_resume_from_gas_kph = 30.0;
        rig.ctx.plan = PlanState::E2eStopped;
        rig.step(&VehicleStateSnapshot { brake_pressed: true, ..moving(0.0) });
        let st = rig.step(&moving(0.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(rig.v, 60.0);
    }

    #[test]
    fn test_brake_release_engages_at_red_light() {
        let mut rig = Rig::new();
        rig.config.auto_resume_from_brake_release = true;
        rig.config.auto_resume_from_gas_kph = 30.0;
        rig.traffic.force(TrafficState::RedTriggered, 50);
        rig.step(&VehicleStateSnapshot { brake_pressed: true, ..moving(0.0) });
        let st = rig.step(&moving(0.0));
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
        assert_eq!(rig.v, 60.0);
    }

    /// Firm gas held through a gas-while-braking cooldown, then released.
    fn release_firm_gas_during_cooldown(rig: &mut Rig) -> EngagementState {
        rig.config.auto_resume_from_gas_kph = 30.0;
        rig.ctx.accel_output = -1.0;
        let gas = VehicleStateSnapshot { gas_pressed: true, gas: 0.8, ..moving(20.0) };
        for _ in 0..100 {
            rig.step(&gas);
        }
        rig.ctx.accel_output = 0.0;
        rig.step(&moving(20.0))
    }

    #[test]
    fn test_firm_gas_release_keeps_cooldown() {
        let mut rig = Rig::new();
        let st = release_firm_gas_during_cooldown(&mut rig);
        assert_eq!(st.cruise_activate, CruiseActivate::Idle);
        assert!(st.active_ready);
        assert_eq!(st.auto_cancel_timer, rig.config.tuning.brake_override_cooldown_ticks - 1);
        assert_eq!(rig.v, 72.0);
    }

    #[test]
    fn test_active_ready_engages_behind_lead_after_cooldown() {
        let mut rig = Rig::new();
        let st = release_firm_gas_during_cooldown(&mut rig);
        rig.ctx.lead = LeadInfo::from_track(true, 50.0, 0.0, 20.0);
        for _ in 1..st.auto_cancel_timer {
            assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Idle);
        }
        let st = rig.step(&moving(20.0));
        assert_eq!(st.auto_cancel_timer, 0);
        assert_eq!(st.cruise_activate, CruiseActivate::Engage);
    }

    #[test]
    fn test_active_ready_engages_for_planned_stop_after_cooldown() {
        let mut rig = Rig::new();
        let st = release_firm_gas_during_cooldown(&mut rig);
        rig.ctx.plan = PlanState::E2eStop;
        for _ in 1..st.auto_cancel_timer {
            assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Idle);
        }
        assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Engage);
    }

    #[test]
    fn test_active_ready_waits_without_lead_or_stop() {
        let mut rig = Rig::new();
        release_firm_gas_during_cooldown(&mut rig);
        for _ in 0..600 {
            assert_eq!(rig.step(&moving(20.0)).cruise_activate, CruiseActivate::Idle);
        }
        assert!(rig.arbiter.state().active_ready);
    }
}
