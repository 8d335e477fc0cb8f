//! Wave-sample records and their generator.
//!
//! [`next_wave`] is a pure function mapping (timestamp, interval, multiplier,
//! order) to a fixed-shape record of phase angle and six trigonometric and
//! hyperbolic values. The phase is the position of the timestamp's time of day
//! within a repeating interval whose length is the interval argument's time of
//! day in milliseconds since midnight.

use crate::error::StoreError;
use crate::schema::{EventType, TypeCode, TypeProperty};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A single wave event. `order` is the caller-assigned sequence key; all other
/// fields are derived from the phase angle.
///
/// Serialized property names are PascalCase to match the stored schema, and
/// every field defaults to zero when absent from the input, so partial records
/// parse without reflection tricks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WaveData {
    pub order: i32,
    pub tau: f64,
    pub radians: f64,
    pub sin: f64,
    pub cos: f64,
    pub tan: f64,
    pub sinh: f64,
    pub cosh: f64,
    pub tanh: f64,
}

// Fixed print order; replaces the original's reflected property enumeration.
impl fmt::Display for WaveData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order: {}, Radians: {}, Sin: {}, Cos: {}, Tan: {}, Sinh: {}, Cosh: {}, Tanh: {}, Tau: {}",
            self.order,
            self.radians,
            self.sin,
            self.cos,
            self.tan,
            self.sinh,
            self.cosh,
            self.tanh,
            self.tau
        )
    }
}

/// Wave event under the renamed target shape produced by the automatic view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WaveDataTarget {
    pub order_target: i32,
    pub tau_target: f64,
    pub radians_target: f64,
    pub sin_target: f64,
    pub cos_target: f64,
    pub tan_target: f64,
    pub sinh_target: f64,
    pub cosh_target: f64,
    pub tanh_target: f64,
}

/// Integer-valued wave event produced by the explicit-property view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WaveDataInteger {
    pub order_target: i32,
    pub sin_int: i32,
    pub cos_int: i32,
    pub tan_int: i32,
}

/// Event type for [`WaveData`]; `Order` is the key.
pub fn wave_data_type(type_id: &str) -> EventType {
    EventType::new(
        type_id,
        "WaveDataSample",
        "A type for storing WaveData events",
        vec![
            TypeProperty::key("Order", TypeCode::Int32),
            TypeProperty::new("Tau", TypeCode::Double),
            TypeProperty::new("Radians", TypeCode::Double),
            TypeProperty::new("Sin", TypeCode::Double),
            TypeProperty::new("Cos", TypeCode::Double),
            TypeProperty::new("Tan", TypeCode::Double),
            TypeProperty::new("Sinh", TypeCode::Double),
            TypeProperty::new("Cosh", TypeCode::Double),
            TypeProperty::new("Tanh", TypeCode::Double),
        ],
    )
}

/// Event type for [`WaveDataTarget`]: the same shape as [`wave_data_type`] with
/// renamed properties, exercising automatic view mapping.
pub fn wave_data_target_type(type_id: &str) -> EventType {
    EventType::new(
        type_id,
        "WaveDataTargetSample",
        "A type for storing WaveDataTarget events",
        vec![
            TypeProperty::key("OrderTarget", TypeCode::Int32),
            TypeProperty::new("TauTarget", TypeCode::Double),
            TypeProperty::new("RadiansTarget", TypeCode::Double),
            TypeProperty::new("SinTarget", TypeCode::Double),
            TypeProperty::new("CosTarget", TypeCode::Double),
            TypeProperty::new("TanTarget", TypeCode::Double),
            TypeProperty::new("SinhTarget", TypeCode::Double),
            TypeProperty::new("CoshTarget", TypeCode::Double),
            TypeProperty::new("TanhTarget", TypeCode::Double),
        ],
    )
}

/// Event type for [`WaveDataInteger`], the target of the explicit-property view.
pub fn wave_data_integer_type(type_id: &str) -> EventType {
    EventType::new(
        type_id,
        "WaveDataIntegerSample",
        "A type for storing WaveDataInteger events",
        vec![
            TypeProperty::key("OrderTarget", TypeCode::Int32),
            TypeProperty::new("SinInt", TypeCode::Int32),
            TypeProperty::new("CosInt", TypeCode::Int32),
            TypeProperty::new("TanInt", TypeCode::Int32),
        ],
    )
}

/// Milliseconds since midnight of the value's time-of-day component, including
/// the fractional part.
fn ms_of_day<T: Timelike>(t: &T) -> f64 {
    f64::from(t.num_seconds_from_midnight()) * 1_000.0 + f64::from(t.nanosecond()) / 1_000_000.0
}

/// Generates the wave event for `now` within the repeating interval.
///
/// The interval length is `interval`'s time of day in milliseconds since
/// midnight; the phase angle is the position of `now`'s time of day within
/// that interval, scaled to `[0, 2π)`. All trigonometric and hyperbolic fields
/// are scaled by `multiplier`.
///
/// # Errors
/// Returns [`StoreError::InvalidArgument`] when `multiplier` is not finite or
/// when the interval's time of day is zero (midnight), which would make the
/// phase undefined.
pub fn next_wave(
    now: DateTime<Utc>,
    interval: NaiveTime,
    multiplier: f64,
    order: i32,
) -> Result<WaveData, StoreError> {
    if !multiplier.is_finite() {
        return Err(StoreError::InvalidArgument(format!(
            "multiplier must be finite, got {}",
            multiplier
        )));
    }

    let interval_ms = ms_of_day(&interval);
    if interval_ms <= 0.0 {
        return Err(StoreError::InvalidArgument(
            "interval time of day must be non-zero".to_string(),
        ));
    }

    let total_ms = ms_of_day(&now);
    let radians = ((total_ms % interval_ms) / interval_ms) * 2.0 * PI;

    Ok(WaveData {
        order,
        radians,
        tau: radians / (2.0 * PI),
        sin: multiplier * radians.sin(),
        cos: multiplier * radians.cos(),
        tan: multiplier * radians.tan(),
        sinh: multiplier * radians.sinh(),
        cosh: multiplier * radians.cosh(),
        tanh: multiplier * radians.tanh(),
    })
}
