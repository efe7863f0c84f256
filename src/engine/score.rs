//! Composite health score calculation.
//!
//! Each metric's deviation from its baseline is normalized by the baseline
//! standard deviation and clipped, so a single broken sensor cannot drive the
//! score on its own. Deviations inside one standard deviation are treated as
//! ordinary noise. The remaining excess is weighted by clinical relevance:
//!
//! - 50% water consumption (a drop is the earliest outbreak indicator)
//! - 30% temperature (environmental stress, either direction)
//! - 20% activity (corroborating signal)
//!
//! Rises in water or activity count half as much as drops. The weighted
//! signal `S` is mapped to `100·(1 - tanh(S/2)/tanh(S_max/2))`, which is 100
//! for a baseline-consistent reading, falls monotonically and saturates at 0.

use std::collections::BTreeMap;

use crate::models::{Baseline, HealthScore, Metric, SensorReading};

/// Normalized deviations are clipped to `[-MAX_DEVIATION, MAX_DEVIATION]`.
pub const MAX_DEVIATION: f64 = 5.0;

/// Deviations up to this many standard deviations carry no penalty.
pub const NOISE_BAND: f64 = 1.0;

const SATURATION_SCALE: f64 = 2.0;

/// Largest possible weighted signal: full excess on every metric.
const MAX_SIGNAL: f64 = MAX_DEVIATION - NOISE_BAND;

pub fn weight(metric: Metric) -> f64 {
    // ---
    match metric {
        Metric::WaterConsumption => 0.5,
        Metric::Temperature => 0.3,
        Metric::ActivityLevel => 0.2,
    }
}

/// Floor for the baseline standard deviation, in the metric's own unit.
pub fn min_stddev(metric: Metric) -> f64 {
    // ---
    match metric {
        Metric::WaterConsumption => 5.0,
        Metric::ActivityLevel => 1.0,
        Metric::Temperature => 0.1,
    }
}

fn direction_factor(metric: Metric, deviation: f64) -> f64 {
    // ---
    match metric {
        Metric::Temperature => 1.0,
        Metric::WaterConsumption | Metric::ActivityLevel if deviation < 0.0 => 1.0,
        Metric::WaterConsumption | Metric::ActivityLevel => 0.5,
    }
}

/// Clipped z-score of `value` against `baseline`.
pub fn normalized_deviation(value: f64, baseline: &Baseline) -> f64 {
    // ---
    let stddev = baseline.expected_stddev().max(min_stddev(baseline.metric));
    let d = (value - baseline.expected_value) / stddev;
    if d.is_nan() {
        return 0.0;
    }
    d.clamp(-MAX_DEVIATION, MAX_DEVIATION)
}

/// Map a weighted deviation signal onto the 0-100 score scale.
pub fn signal_to_score(signal: f64) -> f64 {
    // ---
    let s = signal.clamp(0.0, MAX_SIGNAL);
    let ceiling = (MAX_SIGNAL / SATURATION_SCALE).tanh();
    let score = 100.0 * (1.0 - (s / SATURATION_SCALE).tanh() / ceiling);
    score.clamp(0.0, 100.0)
}

/// Score `reading` against the baselines as they stood before it arrived.
///
/// `baselines` must hold one entry per metric; a metric without a baseline
/// contributes no deviation.
pub fn score(reading: &SensorReading, baselines: &[Baseline]) -> HealthScore {
    // ---
    let mut deviations = BTreeMap::new();
    let mut signal = 0.0;

    for metric in Metric::ALL {
        let d = baselines
            .iter()
            .find(|b| b.metric == metric)
            .map(|b| normalized_deviation(reading.value(metric), b))
            .unwrap_or(0.0);

        let excess = (d.abs() - NOISE_BAND).max(0.0);
        signal += weight(metric) * direction_factor(metric, d) * excess;
        deviations.insert(metric, d);
    }

    HealthScore {
        flock_id: reading.flock_id.clone(),
        timestamp: reading.timestamp,
        score: signal_to_score(signal),
        contributing_deviations: deviations,
        warming_up: false,
    }
}

/// Placeholder score recorded while baselines are still being seeded.
pub fn warming_up(reading: &SensorReading) -> HealthScore {
    // ---
    HealthScore {
        flock_id: reading.flock_id.clone(),
        timestamp: reading.timestamp,
        score: 100.0,
        contributing_deviations: Metric::ALL.iter().map(|m| (*m, 0.0)).collect(),
        warming_up: true,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn baseline(metric: Metric, expected: f64, variance: f64) -> Baseline {
        // ---
        Baseline {
            flock_id: "F1".to_string(),
            metric,
            expected_value: expected,
            expected_variance: variance,
            last_updated: None,
            samples: 20,
        }
    }

    fn baselines() -> Vec<Baseline> {
        // ---
        vec![
            baseline(Metric::WaterConsumption, 500.0, 100.0),
            baseline(Metric::ActivityLevel, 70.0, 16.0),
            baseline(Metric::Temperature, 22.0, 0.25),
        ]
    }

    fn reading(water: f64, activity: f64, temperature: f64) -> SensorReading {
        // ---
        SensorReading {
            flock_id: "F1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 12, 0, 0).unwrap(),
            water_consumption: water,
            activity_level: activity,
            temperature,
        }
    }

    #[test]
    fn test_baseline_consistent_reading_is_fully_healthy() {
        // ---
        let s = score(&reading(500.0, 70.0, 22.0), &baselines());
        assert_eq!(s.score, 100.0);
        assert!(s.contributing_deviations.values().all(|d| *d == 0.0));
        assert!(!s.warming_up);
    }

    fn arb_baselines() -> impl Strategy<Value = Vec<Baseline>> {
        (
            (100.0..1500.0f64, 0.0..2500.0f64),
            (10.0..90.0f64, 0.0..100.0f64),
            (15.0..35.0f64, 0.0..4.0f64),
        )
            .prop_map(|(w, a, t)| {
                vec![
                    baseline(Metric::WaterConsumption, w.0, w.1),
                    baseline(Metric::ActivityLevel, a.0, a.1),
                    baseline(Metric::Temperature, t.0, t.1),
                ]
            })
    }

    fn arb_metric() -> impl Strategy<Value = Metric> {
        prop_oneof![
            Just(Metric::WaterConsumption),
            Just(Metric::ActivityLevel),
            Just(Metric::Temperature),
        ]
    }

    /// Reading sitting exactly on every baseline, with `metric` shifted by
    /// `sigmas` effective standard deviations.
    fn shifted(baselines: &[Baseline], metric: Metric, sigmas: f64) -> SensorReading {
        // ---
        let value = |m: Metric| {
            let b = baselines.iter().find(|b| b.metric == m).unwrap();
            let sd = b.expected_stddev().max(min_stddev(m));
            let shift = if m == metric { sigmas * sd } else { 0.0 };
            b.expected_value + shift
        };
        reading(
            value(Metric::WaterConsumption),
            value(Metric::ActivityLevel),
            value(Metric::Temperature),
        )
    }

    #[test]
    fn test_three_sigma_drop_scores_strictly_lower() {
        // ---
        let normal = score(&reading(500.0, 70.0, 22.0), &baselines());
        // water stddev is 10, so 470 is three standard deviations below
        let anomalous = score(&reading(470.0, 70.0, 22.0), &baselines());

        assert!(anomalous.score < normal.score);
        let water = anomalous.contributing_deviations[&Metric::WaterConsumption];
        assert!((water + 3.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn three_sigma_drop_always_scores_lower(
            baselines in arb_baselines(),
            metric in arb_metric(),
        ) {
            let normal = score(&shifted(&baselines, metric, 0.0), &baselines);
            let anomalous = score(&shifted(&baselines, metric, -3.0), &baselines);

            prop_assert_eq!(normal.score, 100.0);
            prop_assert!(
                anomalous.score < normal.score,
                "{} drop scored {} vs {}",
                metric,
                anomalous.score,
                normal.score
            );
            prop_assert!((anomalous.contributing_deviations[&metric] + 3.0).abs() < 1e-6);
        }

        #[test]
        fn larger_drop_never_scores_higher(
            baselines in arb_baselines(),
            metric in arb_metric(),
            small in 0.0..5.0f64,
            extra in 0.0..5.0f64,
        ) {
            let mild = score(&shifted(&baselines, metric, -small), &baselines);
            let severe = score(&shifted(&baselines, metric, -(small + extra)), &baselines);
            prop_assert!(severe.score <= mild.score + 1e-9);
        }

        #[test]
        fn score_is_bounded_for_any_reading(
            baselines in arb_baselines(),
            water in 0.0..=2000.0f64,
            activity in 0.0..=100.0f64,
            temperature in 0.0..=45.0f64,
        ) {
            let s = score(&reading(water, activity, temperature), &baselines);
            prop_assert!((0.0..=100.0).contains(&s.score));
            for d in s.contributing_deviations.values() {
                prop_assert!(d.abs() <= MAX_DEVIATION);
            }
        }
    }

    #[test]
    fn test_score_saturates_under_extreme_deviation() {
        // ---
        let worst = score(&reading(0.0, 0.0, 45.0), &baselines());
        assert!(worst.score >= 0.0 && worst.score < 1.0);
        for d in worst.contributing_deviations.values() {
            assert!(d.abs() <= MAX_DEVIATION);
        }

        let degenerate = vec![
            baseline(Metric::WaterConsumption, 500.0, 0.0),
            baseline(Metric::ActivityLevel, 70.0, 0.0),
            baseline(Metric::Temperature, 22.0, 0.0),
        ];
        let s = score(&reading(2000.0, 100.0, 0.0), &degenerate);
        assert!((0.0..=100.0).contains(&s.score));
    }

    #[test]
    fn test_water_drop_dominates() {
        // ---
        let b = baselines();
        // four standard deviations on each metric in turn
        let water = score(&reading(460.0, 70.0, 22.0), &b);
        let activity = score(&reading(500.0, 54.0, 22.0), &b);
        let temperature = score(&reading(500.0, 70.0, 24.0), &b);

        assert!(water.score < temperature.score);
        assert!(temperature.score < activity.score);
    }

    #[test]
    fn test_drop_weighs_more_than_rise() {
        // ---
        let b = baselines();
        let drop = score(&reading(460.0, 70.0, 22.0), &b);
        let rise = score(&reading(540.0, 70.0, 22.0), &b);
        assert!(drop.score < rise.score);
    }

    #[test]
    fn test_noise_band_has_no_penalty() {
        // ---
        let s = score(&reading(505.0, 72.0, 22.2), &baselines());
        assert_eq!(s.score, 100.0);
    }

    #[test]
    fn test_signal_mapping_is_monotonic_and_bounded() {
        // ---
        assert_eq!(signal_to_score(0.0), 100.0);
        assert!(signal_to_score(MAX_SIGNAL) < 1e-9);
        assert!(signal_to_score(1e9) < 1e-9);

        let mut prev = signal_to_score(0.0);
        for i in 1..=40 {
            let next = signal_to_score(f64::from(i) * 0.1);
            assert!(next < prev);
            prev = next;
        }
    }

    #[test]
    fn test_deterministic() {
        // ---
        let r = reading(430.0, 61.0, 23.1);
        assert_eq!(score(&r, &baselines()), score(&r, &baselines()));
    }
}
