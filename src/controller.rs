/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Per-tick orchestration.
//!
//! [`CruiseController::update`] is the only entry point the control loop
//! needs. One call per tick:
//!
//! ```text
//!  detections ──► TrafficLightCorrelator
//!  snapshot ────► EngagementArbiter ──► SetSpeedRegulator (eco band)
//!                        │                      │
//!                        ▼                      ▼
//!                  AlertEmitter ◄── VehicleEventMonitor
//!                        │
//!                        ▼
//!                   TickOutput
//! ```
//!
//! When stock cruise is unavailable the target returns to its initial value
//! and any pending engagement request is dropped.

use crate::alert::{AlertEmitter, AlertInputs, AlertSet};
use crate::arbiter::{ArbiterEffects, ArbiterInputs, CruiseActivate, EngagementArbiter, SoftHold};
use crate::config::CruiseConfig;
use crate::profile::{PreviousControl, VehicleEventMonitor, VehicleParams, VehicleProfile};
use crate::set_speed::{CruiseTarget, SetSpeedRegulator};
use crate::snapshot::{TickContext, VehicleStateSnapshot};
use crate::status::StatusLine;
use crate::traffic::{LightObservation, TrafficLightCorrelator, TrafficState};
use crate::units::{cluster_kph, MS_TO_KPH};

/// Everything the control loop consumes after one tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TickOutput {
    /// Applied target after the eco band, kph.
    pub v_cruise_kph: f32,
    /// Requested target, kph.
    pub v_cruise_kph_set: f32,
    /// Target shown on the cluster, kph.
    pub v_cruise_cluster_kph: f32,
    /// Engagement request.
    pub cruise_activate: CruiseActivate,
    /// Soft-hold state.
    pub soft_hold: SoftHold,
    /// Traffic-light state.
    pub traffic_state: TrafficState,
    /// Driving personality index.
    pub personality: u8,
    /// Alerts raised this tick.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub alerts: AlertSet,
}

/// Owns all per-drive cruise state.
#[derive(Debug)]
pub struct CruiseController {
    regulator: SetSpeedRegulator,
    arbiter: EngagementArbiter,
    traffic: TrafficLightCorrelator,
    alerts: AlertEmitter,
    status: StatusLine,
    events: Option<VehicleEventMonitor>,
    prev_control: PreviousControl,
    v_cruise_cluster_kph: f32,
}

impl Default for CruiseController {
    fn default() -> Self {
        Self::new()
    }
}

impl CruiseController {
    /// Controller without vehicle-profile events.
    pub fn new() -> Self {
        let regulator = SetSpeedRegulator::new();
        let v_cruise_cluster_kph = regulator.target().v_cruise_kph;
        Self {
            regulator,
            arbiter: EngagementArbiter::new(),
            traffic: TrafficLightCorrelator::new(),
            alerts: AlertEmitter::new(),
            status: StatusLine::new(),
            events: None,
            prev_control: PreviousControl::default(),
            v_cruise_cluster_kph,
        }
    }

    /// Controller that also raises the vehicle events of `profile`.
    pub fn with_profile(profile: VehicleProfile, vehicle: VehicleParams) -> Self {
        Self {
            events: Some(VehicleEventMonitor::new(profile, vehicle)),
            ..Self::new()
        }
    }

    /// Current target.
    pub fn target(&self) -> &CruiseTarget {
        self.regulator.target()
    }

    /// Current status text.
    pub fn status_text(&self) -> &str {
        self.status.text()
    }

    /// Restore a stored driving personality.
    pub fn set_personality(&mut self, personality: u8) {
        self.arbiter.set_personality(personality);
    }

    /// Seed the target when the outer loop engages from a button.
    pub fn initialize(&mut self, snapshot: &VehicleStateSnapshot, experimental_mode: bool) {
        self.regulator.initialize(snapshot, experimental_mode);
        self.v_cruise_cluster_kph = self.regulator.target().v_cruise_kph;
    }

    /// Run one control tick.
    pub fn update(
        &mut self,
        snapshot: &VehicleStateSnapshot,
        ctx: &TickContext,
        lights: &[LightObservation],
        config: &CruiseConfig,
    ) -> TickOutput {
        self.alerts.begin_tick();
        self.status.begin_tick();
        self.regulator.begin_tick();
        self.regulator.configure(config.speed_min_kph, snapshot.is_metric);

        for l in lights {
            self.traffic.observe(l.x, l.y, l.color, l.confidence);
        }

        if snapshot.cruise_state.available {
            let from_pcm = ctx.pcm_cruise && config.speed_from_pcm;
            if from_pcm {
                self.regulator
                    .set_requested(snapshot.cruise_state.speed_cluster * MS_TO_KPH);
            }

            let v_ego_kph = cluster_kph(snapshot.v_ego_cluster);
            let input = ArbiterInputs {
                snapshot,
                ctx,
                v_ego_kph,
                traffic: self.traffic.state(),
            };
            let requested = self.regulator.target().v_cruise_kph_set;
            let mut fx = ArbiterEffects {
                regulator: &mut self.regulator,
                traffic: &mut self.traffic,
                alerts: self.alerts.alerts_mut(),
                status: &mut self.status,
            };
            let requested = self.arbiter.tick(requested, &input, &mut fx, config);
            self.regulator
                .commit(requested, v_ego_kph, config.eco_increment_kph);
            self.v_cruise_cluster_kph = self.regulator.target().v_cruise_kph;

            if !from_pcm {
                let st = self.arbiter.state();
                self.alerts.observe(&AlertInputs {
                    plan: ctx.plan,
                    signal: self.traffic.state().signal(),
                    engaged: ctx.enabled,
                    pedals_released: st.brake_count.is_released() && st.gas_count.is_released(),
                    v_ego: snapshot.v_ego,
                    soft_hold: st.soft_hold,
                });
            }
        } else {
            self.regulator.reset();
            self.arbiter.clear_request();
            self.v_cruise_cluster_kph = self.regulator.target().v_cruise_kph;
        }

        if let Some(events) = self.events.as_mut() {
            events.update(snapshot, self.prev_control, self.alerts.alerts_mut());
        }

        self.traffic.end_tick();
        self.prev_control = PreviousControl {
            enabled: ctx.enabled,
            accel: ctx.accel_output,
        };

        let target = self.regulator.target();
        let st = self.arbiter.state();
        TickOutput {
            v_cruise_kph: target.v_cruise_kph,
            v_cruise_kph_set: target.v_cruise_kph_set,
            v_cruise_cluster_kph: self.v_cruise_cluster_kph,
            cruise_activate: st.cruise_activate,
            soft_hold: st.soft_hold,
            traffic_state: self.traffic.state(),
            personality: self.arbiter.personality(),
            alerts: self.alerts.alerts().clone(),
        }
    }
}
