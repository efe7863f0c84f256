//! Scoring and alerting engine.
//!
//! [`Engine`] is the single entry point used by the HTTP routes (and any
//! other presentation layer). It owns one [`flock::FlockCell`] per flock;
//! flocks never share mutable state, so different flocks ingest in parallel
//! while readings of one flock are applied strictly in sequence.
//!
//! Submodules follow the write path: `ingest` validates, `score` compares the
//! reading to the baselines kept by `baseline`, `alerts` drives the state
//! machine. `onset` and `trend` are read-only queries over committed history.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::error::{InvalidConfig, NotFound, RejectedReason};
use crate::models::{
    Accepted, Alert, AlertConfig, AlertLevel, Baseline, FlockId, FlockSummary, HealthScore,
    MetricStatus, RawReading, SensorReading, Sensitivity, TimeWindow, Trend,
};

pub mod alerts;
pub mod baseline;
mod flock;
pub mod ingest;
pub mod onset;
pub mod score;
pub mod trend;

use flock::{read, write, FlockCell};

// ---

pub struct Engine {
    // ---
    settings: EngineSettings,
    flocks: RwLock<HashMap<FlockId, Arc<FlockCell>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        // ---
        Self {
            settings,
            flocks: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn flock(&self, flock_id: &str) -> Option<Arc<FlockCell>> {
        read(&self.flocks).get(flock_id).cloned()
    }

    fn flock_or_create(&self, flock_id: &str) -> Arc<FlockCell> {
        // ---
        if let Some(cell) = self.flock(flock_id) {
            return cell;
        }

        let mut flocks = write(&self.flocks);
        flocks
            .entry(flock_id.to_string())
            .or_insert_with(|| {
                tracing::info!(flock_id, "Registering new flock");
                Arc::new(FlockCell::new(flock_id.to_string(), &self.settings))
            })
            .clone()
    }

    // --- write path

    /// Validate and apply one reading for `flock_id`.
    ///
    /// Unknown flocks are registered on their first reading with the default
    /// configuration. Rejections leave all flock state untouched.
    pub fn ingest_reading(
        &self,
        flock_id: &str,
        timestamp: DateTime<Utc>,
        water_consumption: Option<f64>,
        activity_level: Option<f64>,
        temperature: Option<f64>,
    ) -> Result<Accepted, RejectedReason> {
        // ---
        let raw = RawReading {
            timestamp,
            water_consumption,
            activity_level,
            temperature,
        };
        self.ingest_raw(flock_id, &raw)
    }

    pub fn ingest_raw(&self, flock_id: &str, raw: &RawReading) -> Result<Accepted, RejectedReason> {
        // ---
        let cell = self.flock_or_create(flock_id);

        match cell.ingest(raw, &self.settings) {
            Ok(accepted) => {
                tracing::debug!(
                    flock_id,
                    timestamp = %accepted.score.timestamp,
                    score = accepted.score.score,
                    warming_up = accepted.score.warming_up,
                    "Reading accepted"
                );
                Ok(accepted)
            }
            Err(reason) => {
                tracing::warn!(
                    flock_id,
                    timestamp = %raw.timestamp,
                    reason = reason.code(),
                    "Reading rejected: {}",
                    reason
                );
                Err(reason)
            }
        }
    }

    /// Set flock size and sensitivity, registering the flock if needed.
    pub fn set_config(
        &self,
        flock_id: &str,
        flock_size: i64,
        sensitivity: &str,
    ) -> Result<AlertConfig, InvalidConfig> {
        // ---
        if flock_size <= 0 {
            return Err(InvalidConfig::FlockSize(flock_size));
        }
        let sensitivity: Sensitivity = sensitivity.parse()?;

        let config = AlertConfig {
            flock_id: flock_id.to_string(),
            flock_size: flock_size.unsigned_abs(),
            sensitivity,
        };
        self.flock_or_create(flock_id).set_config(config.clone());

        tracing::info!(flock_id, flock_size, %sensitivity, "Alert configuration updated");
        Ok(config)
    }

    /// Mark an alert as acknowledged. The flock's alert level is unchanged.
    pub fn acknowledge_alert(&self, alert_id: Uuid) -> Result<Alert, NotFound> {
        // ---
        let cells: Vec<Arc<FlockCell>> = read(&self.flocks).values().cloned().collect();
        for cell in cells {
            if let Some(alert) = cell.acknowledge(alert_id) {
                tracing::info!(flock_id = %alert.flock_id, %alert_id, "Alert acknowledged");
                return Ok(alert);
            }
        }
        Err(NotFound::Alert(alert_id))
    }

    /// Stop monitoring a flock, dropping its history and alerts.
    pub fn retire_flock(&self, flock_id: &str) -> Result<(), NotFound> {
        // ---
        match write(&self.flocks).remove(flock_id) {
            Some(_) => {
                tracing::info!(flock_id, "Flock retired");
                Ok(())
            }
            None => Err(NotFound::Flock(flock_id.to_string())),
        }
    }

    // --- read path

    pub fn flock_ids(&self) -> Vec<FlockId> {
        // ---
        let mut ids: Vec<FlockId> = read(&self.flocks).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get_current_score(&self, flock_id: &str) -> Result<HealthScore, NotFound> {
        // ---
        let cell = self
            .flock(flock_id)
            .ok_or_else(|| NotFound::Flock(flock_id.to_string()))?;
        let latest = cell.committed().scores.last().cloned();
        latest.ok_or_else(|| NotFound::Score(flock_id.to_string()))
    }

    /// Scores with `from <= timestamp <= to`, in time order.
    pub fn get_score_history(
        &self,
        flock_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<HealthScore> {
        // ---
        let window = TimeWindow { from, to };
        self.flock(flock_id)
            .map(|cell| {
                cell.committed()
                    .scores
                    .iter()
                    .filter(|s| window.contains(s.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Accepted readings with `from <= timestamp <= to`, in time order.
    pub fn get_readings(
        &self,
        flock_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<SensorReading> {
        // ---
        let window = TimeWindow { from, to };
        self.flock(flock_id)
            .map(|cell| {
                cell.committed()
                    .readings
                    .iter()
                    .filter(|r| window.contains(r.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Start of the earliest sustained deviation inside `window`.
    pub fn get_onset(&self, flock_id: &str, window: &TimeWindow) -> Option<DateTime<Utc>> {
        // ---
        let cell = self.flock(flock_id)?;
        let committed = cell.committed();
        onset::find_onset(
            &committed.scores,
            window,
            self.settings.onset_threshold,
            self.settings.onset_min_run,
        )
    }

    pub fn get_trend(&self, flock_id: &str, window: &TimeWindow) -> Option<Trend> {
        // ---
        let cell = self.flock(flock_id)?;
        let committed = cell.committed();
        let in_window = committed
            .scores
            .iter()
            .filter(|s| window.contains(s.timestamp));
        trend::trend(in_window)
    }

    /// Unacknowledged alerts in the order they were raised.
    pub fn get_active_alerts(&self, flock_id: &str) -> Vec<Alert> {
        // ---
        self.get_alert_log(flock_id)
            .into_iter()
            .filter(|a| !a.acknowledged)
            .collect()
    }

    /// Every alert raised for the flock, acknowledged or not.
    pub fn get_alert_log(&self, flock_id: &str) -> Vec<Alert> {
        // ---
        self.flock(flock_id)
            .map(|cell| cell.committed().alerts.clone())
            .unwrap_or_default()
    }

    pub fn get_alert_state(&self, flock_id: &str) -> Result<AlertLevel, NotFound> {
        // ---
        self.flock(flock_id)
            .map(|cell| cell.committed().level)
            .ok_or_else(|| NotFound::Flock(flock_id.to_string()))
    }

    pub fn get_config(&self, flock_id: &str) -> Result<AlertConfig, NotFound> {
        // ---
        self.flock(flock_id)
            .map(|cell| cell.config())
            .ok_or_else(|| NotFound::Flock(flock_id.to_string()))
    }

    pub fn get_baselines(&self, flock_id: &str) -> Result<Vec<Baseline>, NotFound> {
        // ---
        self.flock(flock_id)
            .map(|cell| cell.committed().baselines.clone())
            .ok_or_else(|| NotFound::Flock(flock_id.to_string()))
    }

    /// Latest reading, score and per-metric change from baseline.
    ///
    /// Expected values are the baselines the latest score was computed
    /// against, so each row agrees with its deviation. The baselines after
    /// absorbing that reading are available from [`Engine::get_baselines`].
    pub fn get_summary(&self, flock_id: &str) -> Result<FlockSummary, NotFound> {
        // ---
        let cell = self
            .flock(flock_id)
            .ok_or_else(|| NotFound::Flock(flock_id.to_string()))?;
        let config = cell.config();
        let committed = cell.committed();

        let (reading, score) = match (committed.readings.last(), committed.scores.last()) {
            (Some(reading), Some(score)) => (reading, score),
            _ => return Err(NotFound::Score(flock_id.to_string())),
        };

        let metrics = committed
            .scored_against
            .iter()
            .map(|b| {
                let current = reading.value(b.metric);
                let percent_from_baseline = (b.expected_value.abs() > f64::EPSILON)
                    .then(|| (current - b.expected_value) / b.expected_value * 100.0);
                MetricStatus {
                    metric: b.metric,
                    current,
                    expected: b.expected_value,
                    percent_from_baseline,
                    deviation: score
                        .contributing_deviations
                        .get(&b.metric)
                        .copied()
                        .unwrap_or(0.0),
                }
            })
            .collect();

        Ok(FlockSummary {
            flock_id: flock_id.to_string(),
            flock_size: config.flock_size,
            sensitivity: config.sensitivity,
            alert_level: committed.level,
            score: score.clone(),
            metrics,
            active_alerts: committed.alerts.iter().filter(|a| !a.acknowledged).count(),
        })
    }
}
