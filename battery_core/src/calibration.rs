//! Fixed calibration for the reference battery front end.
//!
//! Voltage: the cell voltage reaches the converter through a 1:2 divider and a
//! transistor with ~200 mV Vce, and the reading must be corrected for the drop
//! across the 0.05 Ω shunt in series with the pack (amplified ×15).
//!
//! Current: shunt drop ×15 gain, so `I = counts / 15 / 0.05 Ω`.
//!
//! All divisions truncate toward zero, matching the hardware calibration
//! tables bit for bit. Intermediates are 64-bit and results saturate into
//! `i32`, which only matters for inputs far outside the converter's range.

/// µV per millivolt of divided input (×2 divider, mV → µV).
pub const VOLTAGE_GAIN_UV: i64 = 2000;
/// Vce of the sense transistor, in µV.
pub const VOLTAGE_OFFSET_UV: i64 = 200_000;
pub const SHUNT_NUMERATOR: i64 = 1000;
pub const SHUNT_DENOMINATOR: i64 = 15;
pub const CURRENT_NUMERATOR: i64 = 20_000;
pub const CURRENT_DENOMINATOR: i64 = 15;

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Battery voltage in µV from a voltage-channel count and the current-channel
/// count used for shunt-drop correction.
#[inline]
pub fn voltage_from_raw(v_raw: i32, i_raw_adjust: i32) -> i32 {
    let base = i64::from(v_raw) * VOLTAGE_GAIN_UV + VOLTAGE_OFFSET_UV;
    let shunt = i64::from(i_raw_adjust) * SHUNT_NUMERATOR / SHUNT_DENOMINATOR;
    saturate(base + shunt)
}

/// Battery current in µA from a current-channel count.
#[inline]
pub fn current_from_raw(i_raw: i32) -> i32 {
    saturate(i64::from(i_raw) * CURRENT_NUMERATOR / CURRENT_DENOMINATOR)
}
