/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Tunable parameters and the staggered parameter refresh.
//!
//! - [`CruiseConfig`]: the explicit configuration snapshot passed into every tick.
//! - [`ArbiterTuning`]: thresholds without a documented derivation, kept as named
//!   fields so they can be overridden per vehicle.
//! - [`ParamRefresher`]: reads one key group per slot from a [`ParamSource`],
//!   keeping the last known value when a read fails.
//!
//! # Invariants
//!
//! - **CFG-001**: a failed or out-of-range read never changes the snapshot.
//! - **CFG-002**: defaults are conservative: every automatic engage path is
//!   disabled until the caller opts in.

use thiserror::Error;

use crate::units::ticks;

// ─── Modes ──────────────────────────────────────────────────────────────────

/// How releasing the gas pedal may cancel automatic engagement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GasCancelMode {
    /// Gas release never cancels.
    #[default]
    Off,
    /// Cancel when the lead is too close or speed is below the resume floor.
    Cancel,
    /// As `Cancel`, and also cancel (with cooldown) while the plan is stopping.
    Strict,
}

/// Automatic cruise engagement level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AutoCruiseMode {
    /// No automatic engagement; the fail-safe reset holds the arbiter idle.
    #[default]
    Off,
    /// Pedal- and distance-driven automatic engagement.
    On,
    /// `On` plus the closing-lead stopping-distance heuristic.
    Predictive,
}

/// What the accel/decel buttons do while engaged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ButtonMode {
    /// Short press moves the target by one unit.
    #[default]
    Direct,
    /// Short accel climbs the speed-step ladder.
    Step,
    /// `Step`, and short decel snaps to current speed or denies.
    StepAdaptive,
    /// `StepAdaptive`, and buttons can override traffic-light stops.
    Traffic,
}

impl ButtonMode {
    /// Decode the stored numeric mode; unknown values read as `Direct`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Step,
            2 => Self::StepAdaptive,
            3 => Self::Traffic,
            _ => Self::Direct,
        }
    }
}

// ─── Tuning ─────────────────────────────────────────────────────────────────

/// Arbiter thresholds. Distances in metres, speeds as noted, durations in ticks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArbiterTuning {
    /// Pedal value above which a gas press counts as firm. Default 0.6.
    pub firm_gas_value: f32,
    /// Hold length above which a gas press counts as long. Default 3 s.
    pub firm_gas_ticks: u32,
    /// A gas press shorter than this is a tap. Default 0.4 s.
    pub gas_tap_ticks: u32,
    /// Second tap inside this window overrides the cooldown. Default 1 s.
    pub double_tap_ticks: u32,
    /// A tap within this long after braking sets the target to current speed. Default 3 s.
    pub recent_brake_ticks: u32,
    /// Brake hold at standstill needed to prime soft hold. Default 60.
    pub soft_hold_ticks: u32,
    /// Below this speed (m/s) the vehicle counts as stopped for soft hold. Default 0.1.
    pub soft_hold_speed: f32,
    /// Above this speed (m/s) soft hold is released. Default 1.0.
    pub soft_hold_release_speed: f32,
    /// Lead closer than `factor × v_ego` cancels on gas release. Default 0.8.
    pub gas_release_lead_factor: f32,
    /// Cooldown after a gas release while the plan is stopping. Default 3 s.
    pub stop_cooldown_ticks: u32,
    /// Cooldown after pressing gas while the controller was braking. Default 5 s.
    pub brake_override_cooldown_ticks: u32,
    /// Commanded accel below which gas counts as overriding a brake. Default −0.5.
    pub brake_override_accel: f32,
    /// Lead distance that allows resume on brake release. Default 20.
    pub brake_release_lead_distance: f32,
    /// Deceleration used in the stopping-distance estimate, m/s². Default 2.0.
    pub stopping_decel: f32,
    /// Minimum ego speed (m/s) for the cruise-on-distance trigger. Default 0.02.
    pub cruise_on_min_speed: f32,
    /// PCM vehicles: engage needs this speed (kph)... Default 10.
    pub pcm_min_speed_kph: f32,
    /// ...or a lead closer than this. Default 140.
    pub pcm_lead_distance: f32,
    /// Duration of a button-forced traffic state. Default 0.5 s.
    pub forced_traffic_ticks: u32,
}

impl Default for ArbiterTuning {
    fn default() -> Self {
        Self {
            firm_gas_value: 0.6,
            firm_gas_ticks: ticks(3.0),
            gas_tap_ticks: ticks(0.4),
            double_tap_ticks: ticks(1.0),
            recent_brake_ticks: ticks(3.0),
            soft_hold_ticks: 60,
            soft_hold_speed: 0.1,
            soft_hold_release_speed: 1.0,
            gas_release_lead_factor: 0.8,
            stop_cooldown_ticks: ticks(3.0),
            brake_override_cooldown_ticks: ticks(5.0),
            brake_override_accel: -0.5,
            brake_release_lead_distance: 20.0,
            stopping_decel: 2.0,
            cruise_on_min_speed: 0.02,
            pcm_min_speed_kph: 10.0,
            pcm_lead_distance: 140.0,
            forced_traffic_ticks: ticks(0.5),
        }
    }
}

// ─── CruiseConfig ───────────────────────────────────────────────────────────

/// Configuration snapshot read by every tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CruiseConfig {
    /// Automatic engagement level.
    pub auto_cruise: AutoCruiseMode,
    /// Resume floor (kph) for gas/brake driven engagement. 0 disables resume-from-gas.
    pub auto_resume_from_gas_kph: f32,
    /// Gas release cancel behaviour.
    pub gas_cancel_mode: GasCancelMode,
    /// Brake release may resume cruise.
    pub auto_resume_from_brake_release: bool,
    /// Button behaviour while engaged.
    pub button_mode: ButtonMode,
    /// Lead distance (m) that engages from a crawl. 0 disables.
    pub cruise_on_distance: f32,
    /// Soft hold at standstill is enabled.
    pub soft_hold: bool,
    /// Lowest target speed, kph.
    pub speed_min_kph: f32,
    /// Rung spacing of the speed-step ladder, kph.
    pub speed_unit_kph: u8,
    /// Eco band offset above the latched target, kph. 0 disables the band.
    pub eco_increment_kph: f32,
    /// Take the set speed from the stock cruise cluster value.
    pub speed_from_pcm: bool,
    /// Number of driving personalities the gap button cycles through.
    pub personality_count: u8,
    /// Thresholds.
    pub tuning: ArbiterTuning,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            auto_cruise: AutoCruiseMode::Off,
            auto_resume_from_gas_kph: 0.0,
            gas_cancel_mode: GasCancelMode::Off,
            auto_resume_from_brake_release: false,
            button_mode: ButtonMode::Direct,
            cruise_on_distance: 5.0,
            soft_hold: true,
            speed_min_kph: 0.0,
            speed_unit_kph: 5,
            eco_increment_kph: 0.2,
            speed_from_pcm: false,
            personality_count: 3,
            tuning: ArbiterTuning::default(),
        }
    }
}

impl CruiseConfig {
    /// Check that the snapshot is internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..crate::set_speed::V_CRUISE_MAX).contains(&self.speed_min_kph) {
            return Err(ConfigError::OutOfRange {
                key: ParamKey::CruiseSpeedMin,
                value: self.speed_min_kph,
            });
        }
        if self.speed_unit_kph == 0 {
            return Err(ConfigError::OutOfRange {
                key: ParamKey::CruiseSpeedUnit,
                value: 0.0,
            });
        }
        if !(0.0..=10.0).contains(&self.eco_increment_kph) {
            return Err(ConfigError::OutOfRange {
                key: ParamKey::CruiseEcoControl,
                value: self.eco_increment_kph,
            });
        }
        if self.personality_count == 0 {
            return Err(ConfigError::OutOfRange {
                key: ParamKey::LongitudinalPersonalityMax,
                value: 0.0,
            });
        }
        Ok(())
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Parameter store and validation failures. Never surfaced by the tick path.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The store could not be read.
    #[error("parameter {0:?} is unavailable")]
    Unavailable(ParamKey),
    /// The stored value has the wrong type.
    #[error("parameter {0:?} has an unexpected type")]
    TypeMismatch(ParamKey),
    /// The stored value is outside its accepted range.
    #[error("parameter {key:?} value {value} is out of range")]
    OutOfRange {
        /// Offending key.
        key: ParamKey,
        /// Rejected value.
        value: f32,
    },
}

// ─── Parameter source ───────────────────────────────────────────────────────

/// Keys read from the parameter store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKey {
    /// Resume floor, kph.
    AutoResumeFromGasSpeed,
    /// [`GasCancelMode`] as 0/1/2.
    AutoCancelFromGasMode,
    /// Brake-release resume flag.
    AutoResumeFromBrakeReleaseTrafficSign,
    /// [`AutoCruiseMode`] as 0/1/2.
    AutoCruiseControl,
    /// [`ButtonMode`] as 0..=3.
    CruiseButtonMode,
    /// Cruise-on distance, m.
    CruiseOnDist,
    /// Soft hold flag.
    SoftHoldMode,
    /// Lowest target speed, kph.
    CruiseSpeedMin,
    /// Ladder rung spacing, kph.
    CruiseSpeedUnit,
    /// Eco increment in tenths of a kph.
    CruiseEcoControl,
    /// Take set speed from stock cruise.
    SpeedFromPCM,
    /// Personality count.
    LongitudinalPersonalityMax,
}

/// A raw value read from the store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f32),
    /// Boolean flag.
    Bool(bool),
}

impl ParamValue {
    fn as_f32(self, key: ParamKey) -> Result<f32, ConfigError> {
        match self {
            Self::Int(v) => Ok(v as f32),
            Self::Float(v) if v.is_finite() => Ok(v),
            Self::Float(v) => Err(ConfigError::OutOfRange { key, value: v }),
            Self::Bool(_) => Err(ConfigError::TypeMismatch(key)),
        }
    }

    fn as_int(self, key: ParamKey) -> Result<i64, ConfigError> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Bool(b) => Ok(b as i64),
            Self::Float(_) => Err(ConfigError::TypeMismatch(key)),
        }
    }

    fn as_bool(self, key: ParamKey) -> Result<bool, ConfigError> {
        match self {
            Self::Bool(b) => Ok(b),
            Self::Int(v) => Ok(v != 0),
            Self::Float(_) => Err(ConfigError::TypeMismatch(key)),
        }
    }
}

/// Read access to the parameter store. Implemented by the surrounding process.
pub trait ParamSource {
    /// Read one key.
    fn read(&self, key: ParamKey) -> Result<ParamValue, ConfigError>;
}

/// Apply one stored value to `config`, leaving it untouched on error (CFG-001).
pub fn apply_param(
    config: &mut CruiseConfig,
    key: ParamKey,
    value: ParamValue,
) -> Result<(), ConfigError> {
    let out_of_range = |value: f32| ConfigError::OutOfRange { key, value };
    match key {
        ParamKey::AutoResumeFromGasSpeed => {
            let v = value.as_f32(key)?;
            if !(0.0..=crate::set_speed::V_CRUISE_MAX).contains(&v) {
                return Err(out_of_range(v));
            }
            config.auto_resume_from_gas_kph = v;
        }
        ParamKey::AutoCancelFromGasMode => {
            config.gas_cancel_mode = match value.as_int(key)? {
                0 => GasCancelMode::Off,
                1 => GasCancelMode::Cancel,
                2 => GasCancelMode::Strict,
                other => return Err(out_of_range(other as f32)),
            };
        }
        ParamKey::AutoResumeFromBrakeReleaseTrafficSign => {
            config.auto_resume_from_brake_release = value.as_bool(key)?;
        }
        ParamKey::AutoCruiseControl => {
            config.auto_cruise = match value.as_int(key)? {
                0 => AutoCruiseMode::Off,
                1 => AutoCruiseMode::On,
                v if v >= 2 => AutoCruiseMode::Predictive,
                other => return Err(out_of_range(other as f32)),
            };
        }
        ParamKey::CruiseButtonMode => {
            config.button_mode = ButtonMode::from_code(value.as_int(key)?);
        }
        ParamKey::CruiseOnDist => {
            // Stored signed; the sign only toggles a UI hint upstream.
            config.cruise_on_distance = crate::units::abs(value.as_f32(key)?);
        }
        ParamKey::SoftHoldMode => {
            config.soft_hold = value.as_bool(key)?;
        }
        ParamKey::CruiseSpeedMin => {
            let v = value.as_f32(key)?;
            if !(0.0..crate::set_speed::V_CRUISE_MAX).contains(&v) {
                return Err(out_of_range(v));
            }
            config.speed_min_kph = v;
        }
        ParamKey::CruiseSpeedUnit => {
            let v = value.as_int(key)?;
            if !(1..=50).contains(&v) {
                return Err(out_of_range(v as f32));
            }
            config.speed_unit_kph = v as u8;
        }
        ParamKey::CruiseEcoControl => {
            let v = value.as_f32(key)? / 10.0;
            if !(0.0..=10.0).contains(&v) {
                return Err(out_of_range(v));
            }
            config.eco_increment_kph = v;
        }
        ParamKey::SpeedFromPCM => {
            config.speed_from_pcm = value.as_bool(key)?;
        }
        ParamKey::LongitudinalPersonalityMax => {
            let v = value.as_int(key)?;
            if !(1..=8).contains(&v) {
                return Err(out_of_range(v as f32));
            }
            config.personality_count = v as u8;
        }
    }
    Ok(())
}

// ─── ParamRefresher ─────────────────────────────────────────────────────────

/// Ticks between refresh slots.
pub const REFRESH_SLOT_TICKS: u32 = 10;

/// Slots per full refresh cycle.
pub const REFRESH_CYCLE_SLOTS: u32 = 10;

/// Key groups read in consecutive slots. Slots without a group are idle so
/// the store is touched at most once per [`REFRESH_SLOT_TICKS`].
const REFRESH_GROUPS: [&[ParamKey]; 5] = [
    &[
        ParamKey::AutoResumeFromGasSpeed,
        ParamKey::AutoCancelFromGasMode,
        ParamKey::AutoResumeFromBrakeReleaseTrafficSign,
        ParamKey::AutoCruiseControl,
        ParamKey::CruiseButtonMode,
        ParamKey::CruiseOnDist,
        ParamKey::SoftHoldMode,
        ParamKey::CruiseSpeedMin,
    ],
    &[ParamKey::CruiseSpeedUnit],
    &[ParamKey::CruiseEcoControl],
    &[ParamKey::LongitudinalPersonalityMax],
    &[ParamKey::SpeedFromPCM],
];

/// Staggered refresh of a [`CruiseConfig`] from a [`ParamSource`].
///
/// Call [`ParamRefresher::tick`] once per control tick; it reads at most one
/// key group every [`REFRESH_SLOT_TICKS`] ticks so the store is never on the
/// hot path.
#[derive(Clone, Debug, Default)]
pub struct ParamRefresher {
    counter: u32,
    failures: u32,
}

impl ParamRefresher {
    /// Fresh refresher; the first group is read on tick [`REFRESH_SLOT_TICKS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick, reading the due key group (if any) into `config`.
    ///
    /// Returns the number of keys that failed in this tick.
    pub fn tick<S: ParamSource>(&mut self, source: &S, config: &mut CruiseConfig) -> u32 {
        self.counter = (self.counter + 1) % (REFRESH_SLOT_TICKS * REFRESH_CYCLE_SLOTS);
        if self.counter % REFRESH_SLOT_TICKS != 0 {
            return 0;
        }
        let slot = (self.counter / REFRESH_SLOT_TICKS) as usize;
        // slot 0 is the cycle wrap; groups start at slot 1
        match slot.checked_sub(1).and_then(|i| REFRESH_GROUPS.get(i)) {
            Some(keys) => self.refresh_keys(source, config, keys),
            None => 0,
        }
    }

    /// Read every key immediately. Used at drive start.
    pub fn refresh_all<S: ParamSource>(&mut self, source: &S, config: &mut CruiseConfig) -> u32 {
        REFRESH_GROUPS
            .iter()
            .map(|keys| self.refresh_keys(source, config, keys))
            .sum()
    }

    /// Total failed reads since construction.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn refresh_keys<S: ParamSource>(
        &mut self,
        source: &S,
        config: &mut CruiseConfig,
        keys: &[ParamKey],
    ) -> u32 {
        let mut failed = 0;
        for &key in keys {
            let result = source.read(key).and_then(|v| apply_param(config, key, v));
            if let Err(err) = result {
                tracing::warn!(?key, %err, "parameter refresh failed, keeping last value");
                failed += 1;
            }
        }
        self.failures = self.failures.saturating_add(failed);
        failed
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
