//! Validation of incoming sensor readings.
//!
//! A reading is accepted only when it is complete, every value lies in its
//! plausible physical range, and its timestamp is newer than everything the
//! flock has accepted so far. Validation never mutates state; the flock
//! writer applies the accepted reading afterwards.

use chrono::{DateTime, Utc};

use crate::config::PlausibleRanges;
use crate::error::RejectedReason;
use crate::models::{Metric, RawReading, SensorReading};

fn range_for(ranges: &PlausibleRanges, metric: Metric) -> (f64, f64) {
    // ---
    match metric {
        Metric::WaterConsumption => ranges.water_consumption,
        Metric::ActivityLevel => ranges.activity_level,
        Metric::Temperature => ranges.temperature,
    }
}

fn check_value(
    ranges: &PlausibleRanges,
    metric: Metric,
    value: Option<f64>,
) -> Result<f64, RejectedReason> {
    // ---
    let value = value.ok_or(RejectedReason::Partial { missing: metric })?;
    let (min, max) = range_for(ranges, metric);
    if !value.is_finite() || value < min || value > max {
        return Err(RejectedReason::OutOfRange { metric, value });
    }
    Ok(value)
}

/// Validate `raw` for `flock_id`.
///
/// `last_accepted` is the newest timestamp the flock has accepted and
/// `is_accepted` reports whether an older timestamp is already on record.
pub fn validate<F>(
    flock_id: &str,
    raw: &RawReading,
    last_accepted: Option<DateTime<Utc>>,
    is_accepted: F,
    ranges: &PlausibleRanges,
) -> Result<SensorReading, RejectedReason>
where
    F: Fn(DateTime<Utc>) -> bool,
{
    // ---
    // Completeness first so a partial reading is reported as such even
    // when the values it does carry are out of range.
    for (metric, value) in [
        (Metric::WaterConsumption, raw.water_consumption),
        (Metric::ActivityLevel, raw.activity_level),
        (Metric::Temperature, raw.temperature),
    ] {
        if value.is_none() {
            return Err(RejectedReason::Partial { missing: metric });
        }
    }

    let water_consumption = check_value(ranges, Metric::WaterConsumption, raw.water_consumption)?;
    let activity_level = check_value(ranges, Metric::ActivityLevel, raw.activity_level)?;
    let temperature = check_value(ranges, Metric::Temperature, raw.temperature)?;

    if let Some(last) = last_accepted {
        if raw.timestamp == last || (raw.timestamp < last && is_accepted(raw.timestamp)) {
            return Err(RejectedReason::Duplicate(raw.timestamp));
        }
        if raw.timestamp < last {
            return Err(RejectedReason::OutOfOrder {
                last,
                got: raw.timestamp,
            });
        }
    }

    Ok(SensorReading {
        flock_id: flock_id.to_string(),
        timestamp: raw.timestamp,
        water_consumption,
        activity_level,
        temperature,
    })
}
