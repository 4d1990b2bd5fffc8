//! Configuration loading: JSON snapshots (with `serde`) and the staggered
//! parameter-store refresh.

use core::cell::Cell;

use cruise_core::config::{
    AutoCruiseMode, ButtonMode, ConfigError, CruiseConfig, GasCancelMode, ParamKey,
    ParamRefresher, ParamSource, ParamValue, REFRESH_CYCLE_SLOTS, REFRESH_SLOT_TICKS,
};

// ─── staggered refresh ───────────────────────────────────────────────────────

/// Counts reads and serves a fixed store.
struct CountingSource {
    reads: Cell<u32>,
}

impl ParamSource for CountingSource {
    fn read(&self, key: ParamKey) -> Result<ParamValue, ConfigError> {
        self.reads.set(self.reads.get() + 1);
        match key {
            ParamKey::CruiseSpeedUnit => Ok(ParamValue::Int(10)),
            ParamKey::CruiseEcoControl => Ok(ParamValue::Float(f32::NAN)),
            ParamKey::AutoCruiseControl => Ok(ParamValue::Int(1)),
            _ => Err(ConfigError::Unavailable(key)),
        }
    }
}

#[test]
fn test_refresh_touches_store_only_on_slot_boundaries() {
    let source = CountingSource { reads: Cell::new(0) };
    let mut cfg = CruiseConfig::default();
    let mut r = ParamRefresher::new();
    for _ in 0..REFRESH_SLOT_TICKS - 1 {
        r.tick(&source, &mut cfg);
    }
    assert_eq!(source.reads.get(), 0);

    // first slot reads the eight-key group
    r.tick(&source, &mut cfg);
    assert_eq!(source.reads.get(), 8);
    assert_eq!(cfg.auto_cruise, AutoCruiseMode::On);
}

#[test]
fn test_full_cycle_reads_every_key_once() {
    let source = CountingSource { reads: Cell::new(0) };
    let mut cfg = CruiseConfig::default();
    let mut r = ParamRefresher::new();
    for _ in 0..REFRESH_SLOT_TICKS * REFRESH_CYCLE_SLOTS {
        r.tick(&source, &mut cfg);
    }
    assert_eq!(source.reads.get(), 12);
    assert_eq!(cfg.speed_unit_kph, 10);
}

#[test]
fn test_failed_reads_keep_last_value() {
    let source = CountingSource { reads: Cell::new(0) };
    let mut cfg = CruiseConfig { soft_hold: false, eco_increment_kph: 0.5, ..Default::default() };
    let failed = ParamRefresher::new().refresh_all(&source, &mut cfg);
    // 12 keys, three served, one of those is NaN
    assert_eq!(failed, 10);
    assert!(!cfg.soft_hold);
    assert_eq!(cfg.eco_increment_kph, 0.5);
}

#[test]
fn test_error_messages() {
    let err = ConfigError::OutOfRange { key: ParamKey::CruiseSpeedMin, value: 500.0 };
    assert_eq!(err.to_string(), "parameter CruiseSpeedMin value 500 is out of range");
    assert_eq!(
        ConfigError::Unavailable(ParamKey::SoftHoldMode).to_string(),
        "parameter SoftHoldMode is unavailable"
    );
}

// ─── serde ───────────────────────────────────────────────────────────────────

#[cfg(feature = "serde")]
#[test]
fn test_partial_json_fills_defaults() {
    let json = r#"{
        "auto_cruise": "Predictive",
        "button_mode": "StepAdaptive",
        "speed_min_kph": 20.0,
        "tuning": { "soft_hold_ticks": 80 }
    }"#;
    let cfg: CruiseConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.auto_cruise, AutoCruiseMode::Predictive);
    assert_eq!(cfg.button_mode, ButtonMode::StepAdaptive);
    assert_eq!(cfg.speed_min_kph, 20.0);
    assert_eq!(cfg.gas_cancel_mode, GasCancelMode::Off);
    assert_eq!(cfg.tuning.soft_hold_ticks, 80);
    assert_eq!(cfg.tuning.gas_tap_ticks, 40);
    assert!(cfg.validate().is_ok());
}

#[cfg(feature = "serde")]
#[test]
fn test_config_json_round_trip() {
    let cfg = CruiseConfig {
        auto_cruise: AutoCruiseMode::On,
        gas_cancel_mode: GasCancelMode::Strict,
        auto_resume_from_gas_kph: 30.0,
        ..CruiseConfig::default()
    };
    let text = serde_json::to_string(&cfg).unwrap();
    let back: CruiseConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, cfg);
}

#[cfg(feature = "serde")]
#[test]
fn test_unknown_mode_is_rejected() {
    let json = r#"{ "auto_cruise": "Always" }"#;
    assert!(serde_json::from_str::<CruiseConfig>(json).is_err());
}
