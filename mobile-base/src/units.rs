//! Unit conversion and bound checks shared by the command paths.
//!
//! The wire protocol carries angles in radians while the public surface uses
//! degrees. Every value handed back to a caller is rounded to a fixed number
//! of decimals so that snapshots do not carry floating-point jitter.

use crate::error::{Error, Result};

/// Decimals kept for lengths (m) and angles (deg).
pub const LENGTH_DECIMALS: i32 = 3;
/// Decimals kept for the battery voltage (V).
pub const VOLTAGE_DECIMALS: i32 = 1;

pub fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Fails with [`Error::OutOfRange`] if `|value| > limit`.
///
/// NaN never passes.
///
/// # Example
///
/// ```
/// use mobile_base::validate_magnitude;
///
/// assert!(validate_magnitude(0.5, 0.5, "x_vel").is_ok());
/// assert!(validate_magnitude(-0.6, 0.5, "x_vel").is_err());
/// ```
pub fn validate_magnitude(value: f64, limit: f64, name: &str) -> Result<()> {
    if value.abs() <= limit {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            name: name.to_owned(),
            value,
            limit,
        })
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

pub(crate) fn round_length(value: f64) -> f64 {
    round_to(value, LENGTH_DECIMALS)
}
