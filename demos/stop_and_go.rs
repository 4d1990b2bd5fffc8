//! # Stop-and-go drive
//!
//! Drives a scripted 40 s commute through `CruiseController` at 100 Hz:
//! creeping behind a lead, a red light, a braked stop with soft hold, the
//! light turning green, and a gas tap that resumes cruise.
//!
//! The outer loop here is a toy: it engages whenever the controller requests
//! `Engage` and drops out on brake or `Deny`.
//!
//! ```text
//! cargo run --example stop_and_go --features std
//! ```

use cruise_core::config::{AutoCruiseMode, CruiseConfig, GasCancelMode};
use cruise_core::snapshot::{CruiseState, LeadInfo, PlanState, TickContext, VehicleStateSnapshot};
use cruise_core::traffic::LightObservation;
use cruise_core::{CruiseActivate, CruiseController, TickOutput};

// ── Script ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct Phase {
    name: &'static str,
    seconds: f32,
    v_ego: f32,
    brake: bool,
    gas: f32,
    lead: Option<(f32, f32)>,
    light: Option<&'static str>,
    plan: PlanState,
}

const PHASES: [Phase; 6] = [
    Phase {
        name: "creeping behind lead",
        seconds: 5.0,
        v_ego: 4.0,
        brake: false,
        gas: 0.0,
        lead: Some((4.5, 3.8)),
        light: None,
        plan: PlanState::Cruise,
    },
    Phase {
        name: "light turns red ahead",
        seconds: 5.0,
        v_ego: 8.0,
        brake: false,
        gas: 0.0,
        lead: None,
        light: Some("Red Light"),
        plan: PlanState::E2eStop,
    },
    Phase {
        name: "braked to a stop",
        seconds: 10.0,
        v_ego: 0.0,
        brake: true,
        gas: 0.0,
        lead: None,
        light: Some("Red Light"),
        plan: PlanState::E2eStopped,
    },
    Phase {
        name: "brake released at the light",
        seconds: 5.0,
        v_ego: 0.0,
        brake: false,
        gas: 0.0,
        lead: None,
        light: Some("Green Light"),
        plan: PlanState::E2eStopped,
    },
    Phase {
        name: "pulling away",
        seconds: 5.0,
        v_ego: 6.0,
        brake: false,
        gas: 0.0,
        lead: None,
        light: None,
        plan: PlanState::Cruise,
    },
    Phase {
        name: "gas tap",
        seconds: 0.2,
        v_ego: 9.0,
        brake: false,
        gas: 0.3,
        lead: None,
        light: None,
        plan: PlanState::Cruise,
    },
];

// ── Helpers ──────────────────────────────────────────────────────────────────

fn snapshot(p: &Phase) -> VehicleStateSnapshot {
    VehicleStateSnapshot {
        v_ego: p.v_ego,
        v_ego_cluster: p.v_ego,
        gas: p.gas,
        gas_pressed: p.gas > 0.0,
        brake_pressed: p.brake,
        standstill: p.v_ego < 0.01,
        is_metric: true,
        cruise_state: CruiseState { available: true, ..Default::default() },
        ..Default::default()
    }
}

fn activate_name(a: CruiseActivate) -> &'static str {
    match a {
        CruiseActivate::Deny => "deny",
        CruiseActivate::Idle => "idle",
        CruiseActivate::Engage => "ENGAGE",
    }
}

fn row(t: f32, engaged: bool, out: &TickOutput) {
    println!(
        "  {:6.2}s  {:8}  {:6}  set {:5.1}  applied {:5.1}  hold {:?}  light {:2}  alerts {:?}",
        t,
        if engaged { "engaged" } else { "-" },
        activate_name(out.cruise_activate),
        out.v_cruise_kph_set,
        out.v_cruise_kph,
        out.soft_hold,
        out.traffic_state.code(),
        out.alerts.as_slice(),
    );
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║  Stop-and-go drive: auto cruise, soft hold and traffic lights        ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝\n");

    let config = CruiseConfig {
        auto_cruise: AutoCruiseMode::On,
        auto_resume_from_gas_kph: 1.0,
        auto_resume_from_brake_release: true,
        gas_cancel_mode: GasCancelMode::Cancel,
        ..CruiseConfig::default()
    };
    let mut controller = CruiseController::new();
    let mut ctx = TickContext {
        enable_available: true,
        longitudinal_control: true,
        ..TickContext::default()
    };

    let mut tick = 0u32;
    for phase in PHASES.iter() {
        println!("▶  {}\n", phase.name);
        let n = (phase.seconds * 100.0) as u32;
        let snap = snapshot(phase);
        ctx.plan = phase.plan;
        ctx.lead = match phase.lead {
            Some((d, v_lead)) => LeadInfo::from_track(true, d, v_lead - phase.v_ego, v_lead),
            None => LeadInfo::default(),
        };

        for i in 0..n {
            // perception reports the light every tenth frame
            let lights = match phase.light {
                Some(label) if tick % 10 == 0 => [LightObservation::new(0.5, 0.3, label, 0.8)],
                _ => [LightObservation::new(0.0, 0.0, "none", 0.0)],
            };
            let out = controller.update(&snap, &ctx, &lights, &config);

            match out.cruise_activate {
                CruiseActivate::Engage => ctx.enabled = true,
                CruiseActivate::Deny => ctx.enabled = false,
                CruiseActivate::Idle => {}
            }
            if phase.brake {
                ctx.enabled = false;
            }

            if i % 100 == 0 || i + 1 == n || !out.alerts.is_empty() {
                row(tick as f32 / 100.0, ctx.enabled, &out);
            }
            tick += 1;
        }
        println!();
    }

    println!("Final target: {:.1} kph", controller.target().v_cruise_kph);
    if !controller.status_text().is_empty() {
        println!("Status: {}", controller.status_text());
    }
}
