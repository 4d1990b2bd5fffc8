//! Unit conversions, tick timing and `no_std` float helpers.
//!
//! `core` does not provide `floor`, `ceil` or `round` for `f32` on stable, so
//! the set-speed arithmetic uses the small helpers below. They are exact for
//! every value the controller produces (speeds well under 2²³).

/// Control loop period in seconds.
pub const DT_CTRL: f32 = 0.01;

/// Metres per second → kilometres per hour.
pub const MS_TO_KPH: f32 = 3.6;

/// Kilometres per hour → metres per second.
pub const KPH_TO_MS: f32 = 1.0 / MS_TO_KPH;

/// Miles per hour → kilometres per hour.
pub const MPH_TO_KPH: f32 = 1.609_344;

/// One imperial set-speed step in kph, rounded to 0.1 so repeated steps do
/// not accumulate rounding error.
pub const IMPERIAL_INCREMENT: f32 = 1.6;

/// Number of control ticks in `seconds`, rounded to the nearest tick.
pub const fn ticks(seconds: f32) -> u32 {
    (seconds / DT_CTRL + 0.5) as u32
}

/// Largest magnitude below which `f32` may still carry a fractional part.
const FRACTION_LIMIT: f32 = 8_388_608.0; // 2^23

/// Absolute value.
#[inline]
pub fn abs(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

/// Truncate toward zero.
#[inline]
pub fn trunc(x: f32) -> f32 {
    if !x.is_finite() || abs(x) >= FRACTION_LIMIT {
        return x;
    }
    (x as i64) as f32
}

/// Largest integer value not greater than `x`.
#[inline]
pub fn floor(x: f32) -> f32 {
    let t = trunc(x);
    if t > x { t - 1.0 } else { t }
}

/// Smallest integer value not less than `x`.
#[inline]
pub fn ceil(x: f32) -> f32 {
    let t = trunc(x);
    if t < x { t + 1.0 } else { t }
}

/// Round half away from zero.
#[inline]
pub fn round(x: f32) -> f32 {
    if x >= 0.0 { floor(x + 0.5) } else { ceil(x - 0.5) }
}

/// Clip `x` into `[lo, hi]`. Unlike `f32::clamp` this never panics when the
/// bounds are inverted; the lower bound wins.
#[inline]
pub fn clip(x: f32, lo: f32, hi: f32) -> f32 {
    let v = if x > hi { hi } else { x };
    if v < lo { lo } else { v }
}

/// Displayed speed in whole kph, the way the instrument cluster rounds it.
#[inline]
pub fn cluster_kph(v_ego_cluster_ms: f32) -> f32 {
    trunc(v_ego_cluster_ms * MS_TO_KPH + 0.5)
}
