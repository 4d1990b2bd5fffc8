//! # cruise-core
//!
//! Cruise engagement and set-speed state machine for driver-assistance
//! controllers.
//!
//! ---
//!
//! ## What it decides
//!
//! Once per control tick the crate turns raw driver inputs (cruise buttons,
//! pedals), stock cruise status and perception signals (lead vehicle,
//! planner state, traffic-light detections) into:
//!
//! - a **set speed**, maintained across the drive and clipped to the
//!   configured bounds;
//! - an **engagement request**: `Engage`, `Idle` or `Deny`;
//! - a de-duplicated set of **driver alerts** raised on this tick.
//!
//! Engagement is arbitrated, not commanded: the outer control loop owns
//! actuation and decides whether to follow the request.
//!
//! ## The pipeline
//!
//! ```text
//! VehicleStateSnapshot ─► ButtonEdgeTracker ─► EngagementArbiter ─► SetSpeedRegulator
//!                                                   ↑        │            (eco band)
//! LightObservation ─► TrafficLightCorrelator ───────┘        ▼
//!                                                      AlertEmitter ─► TickOutput
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`controller`] | [`CruiseController`], [`TickOutput`] | Per-tick orchestration; the entry point |
//! | [`arbiter`] | [`EngagementArbiter`], [`CruiseActivate`], [`SoftHold`] | Engage/disengage state machine |
//! | [`set_speed`] | [`SetSpeedRegulator`], [`CruiseTarget`] | Button deltas, step ladder, clipping, eco band |
//! | [`button`] | [`ButtonEdgeTracker`], [`ButtonEdge`] | Short press / repeating long press |
//! | [`debounce`] | [`PedalCounter`] | Saturating held/released pedal counter |
//! | [`traffic`] | [`TrafficLightCorrelator`], [`TrafficState`] | 2 s detection window → debounced light state |
//! | [`alert`] | [`AlertEmitter`], [`AlertSet`], [`AlertCode`] | Edge-triggered per-tick alerts |
//! | [`profile`] | [`VehicleProfile`], [`VehicleEventMonitor`] | Vehicle events per make |
//! | [`status`] | [`StatusLine`] | Tick-held status text |
//! | [`config`] | [`CruiseConfig`], [`ParamRefresher`] | Tunables and staggered parameter refresh |
//! | [`snapshot`] | [`VehicleStateSnapshot`], [`TickContext`] | Per-tick inputs |
//! | [`units`] | | Tick and unit conversions, `no_std` float helpers |
//!
//! ## Quick start
//!
//! ```
//! use cruise_core::{CruiseConfig, CruiseController, TickContext, VehicleStateSnapshot};
//!
//! let mut controller = CruiseController::new();
//! let config = CruiseConfig::default();
//! let mut snapshot = VehicleStateSnapshot::default();
//! snapshot.cruise_state.available = true;
//!
//! let out = controller.update(&snapshot, &TickContext::default(), &[], &config);
//! assert_eq!(out.v_cruise_kph_set, 30.0);
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default and allocation-free: every buffer
//! is a fixed-capacity `heapless` container. Enable the `serde` feature for
//! serialisation of configuration and state. Logging goes through `tracing`;
//! install a subscriber to see it.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod units;
pub mod snapshot;
pub mod debounce;
pub mod button;
pub mod traffic;
pub mod set_speed;
pub mod config;
pub mod status;
pub mod alert;
pub mod arbiter;
pub mod profile;
pub mod controller;

pub use alert::{AlertCode, AlertEmitter, AlertSet};
pub use arbiter::{CruiseActivate, EngagementArbiter, EngagementState, SoftHold};
pub use button::{ButtonEdge, ButtonEdgeTracker};
pub use config::{ConfigError, CruiseConfig, ParamRefresher, ParamSource};
pub use controller::{CruiseController, TickOutput};
pub use debounce::PedalCounter;
pub use profile::{VehicleEventMonitor, VehicleProfile};
pub use set_speed::{CruiseTarget, SetSpeedRegulator};
pub use snapshot::{TickContext, VehicleStateSnapshot};
pub use status::StatusLine;
pub use traffic::{TrafficLightCorrelator, TrafficState};
