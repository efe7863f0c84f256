//! Rolling per-metric baselines for one flock.
//!
//! A baseline starts in warm-up: the first readings are averaged directly
//! (running mean and sample variance) so that the very first value does not
//! become the reference. Once warm-up completes the baseline switches to
//! exponential smoothing of both the mean and the variance, with a smoothing
//! factor per metric:
//!
//! ```text
//! diff      = x - mean
//! mean'     = mean + α·diff            (= α·x + (1-α)·mean)
//! variance' = (1-α)·(variance + α·diff²)
//! ```
//!
//! Temperature moves slowly and gets a small α; activity is noisy and gets
//! the largest.
//!
//! A seeded baseline adapts only slowly to readings that are already far off
//! (|z| ≥ [`ANOMALY_GATE`]): the mean moves at a tenth of α and the variance
//! is left alone. A sustained outbreak signal therefore stays visible for the
//! whole onset window, while a genuine level shift is still absorbed
//! eventually.

use chrono::{DateTime, Utc};

use super::score::normalized_deviation;
use crate::models::{Baseline, FlockId, Metric};

/// Normalized deviation at or beyond which adaptation is slowed down.
pub const ANOMALY_GATE: f64 = 3.0;

const GATED_ALPHA_FACTOR: f64 = 0.1;

/// Smoothing factor used once a metric's baseline is seeded.
pub fn smoothing_factor(metric: Metric) -> f64 {
    // ---
    match metric {
        Metric::WaterConsumption => 0.10,
        Metric::ActivityLevel => 0.20,
        Metric::Temperature => 0.05,
    }
}

#[derive(Debug, Clone, Default)]
struct MetricState {
    // ---
    mean: f64,
    variance: f64,
    /// Sum of squared differences from the mean, used only during warm-up.
    m2: f64,
    samples: u32,
    last_updated: Option<DateTime<Utc>>,
}

/// Baselines of all metrics of one flock.
///
/// Owned by the flock's writer; callers only ever receive [`Baseline`]
/// snapshots.
#[derive(Debug, Clone)]
pub struct BaselineModel {
    // ---
    flock_id: FlockId,
    warmup_readings: u32,
    metrics: [MetricState; 3],
}

impl BaselineModel {
    pub fn new(flock_id: impl Into<FlockId>, warmup_readings: u32) -> Self {
        // ---
        Self {
            flock_id: flock_id.into(),
            warmup_readings: warmup_readings.max(1),
            metrics: Default::default(),
        }
    }

    /// Fold `value` into the metric's baseline and return the new snapshot.
    ///
    /// Non-finite values are ignored; ingest never forwards them.
    pub fn update(&mut self, metric: Metric, value: f64, timestamp: DateTime<Utc>) -> Baseline {
        // ---
        if !value.is_finite() {
            tracing::warn!(
                flock_id = %self.flock_id,
                %metric,
                value,
                "Ignoring non-finite value in baseline update"
            );
            return self.snapshot(metric);
        }

        let warmup = self.warmup_readings;
        let gated = self.is_seeded(metric)
            && normalized_deviation(value, &self.snapshot(metric)).abs() >= ANOMALY_GATE;
        let state = &mut self.metrics[metric.index()];

        if state.samples < warmup {
            // Welford running mean/variance
            state.samples += 1;
            let delta = value - state.mean;
            state.mean += delta / f64::from(state.samples);
            state.m2 += delta * (value - state.mean);
            state.variance = if state.samples > 1 {
                state.m2 / f64::from(state.samples - 1)
            } else {
                0.0
            };

            if state.samples == warmup {
                tracing::debug!(
                    flock_id = %self.flock_id,
                    %metric,
                    mean = state.mean,
                    variance = state.variance,
                    "Baseline seeded"
                );
            }
        } else if gated {
            let alpha = smoothing_factor(metric) * GATED_ALPHA_FACTOR;
            state.mean += alpha * (value - state.mean);
            state.samples = state.samples.saturating_add(1);
        } else {
            let alpha = smoothing_factor(metric);
            let diff = value - state.mean;
            let incr = alpha * diff;
            state.mean += incr;
            state.variance = (1.0 - alpha) * (state.variance + diff * incr);
            state.samples = state.samples.saturating_add(1);
        }

        state.last_updated = Some(timestamp);
        self.snapshot(metric)
    }

    pub fn snapshot(&self, metric: Metric) -> Baseline {
        // ---
        let state = &self.metrics[metric.index()];
        Baseline {
            flock_id: self.flock_id.clone(),
            metric,
            expected_value: state.mean,
            expected_variance: state.variance,
            last_updated: state.last_updated,
            samples: state.samples,
        }
    }

    pub fn snapshots(&self) -> Vec<Baseline> {
        Metric::ALL.iter().map(|m| self.snapshot(*m)).collect()
    }

    /// True once the metric's warm-up window has been filled.
    pub fn is_seeded(&self, metric: Metric) -> bool {
        self.metrics[metric.index()].samples >= self.warmup_readings
    }

    pub fn all_seeded(&self) -> bool {
        Metric::ALL.iter().all(|m| self.is_seeded(*m))
    }
}
