//! Per-flock state and its serialization point.
//!
//! Each flock owns one writer mutex guarding everything the write path
//! mutates (baselines, alert state machine, last accepted timestamp). The
//! whole ingest pipeline runs under it, so readings of one flock are applied
//! strictly in sequence. Results are published into a separate `committed`
//! lock that writers hold only for the final push; readers never wait on
//! scoring work and only ever see fully-applied readings.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::error::RejectedReason;
use crate::models::{
    Accepted, Alert, AlertConfig, AlertLevel, Baseline, FlockId, HealthScore, Metric, RawReading,
    SensorReading,
};

use super::alerts::AlertStateMachine;
use super::baseline::BaselineModel;
use super::{ingest, score, trend};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State only the write path touches.
struct FlockWriter {
    // ---
    baselines: BaselineModel,
    machine: AlertStateMachine,
    last_accepted: Option<DateTime<Utc>>,
}

/// Append-only results visible to readers.
#[derive(Debug, Clone)]
pub(crate) struct Committed {
    // ---
    pub readings: Vec<SensorReading>,
    pub scores: Vec<HealthScore>,
    pub alerts: Vec<Alert>,
    pub level: AlertLevel,
    pub baselines: Vec<Baseline>,
    /// Baselines the latest score was computed against.
    pub scored_against: Vec<Baseline>,
}

pub(crate) struct FlockCell {
    // ---
    id: FlockId,
    writer: Mutex<FlockWriter>,
    committed: RwLock<Committed>,
    config: RwLock<AlertConfig>,
}

impl FlockCell {
    pub fn new(id: FlockId, settings: &EngineSettings) -> Self {
        // ---
        let baselines = BaselineModel::new(id.clone(), settings.warmup_readings);
        let committed = Committed {
            readings: Vec::new(),
            scores: Vec::new(),
            alerts: Vec::new(),
            level: AlertLevel::Normal,
            baselines: baselines.snapshots(),
            scored_against: baselines.snapshots(),
        };
        let config = AlertConfig {
            flock_id: id.clone(),
            flock_size: settings.default_flock_size,
            sensitivity: settings.default_sensitivity,
        };

        Self {
            writer: Mutex::new(FlockWriter {
                baselines,
                machine: AlertStateMachine::new(settings.hysteresis_readings),
                last_accepted: None,
            }),
            committed: RwLock::new(committed),
            config: RwLock::new(config),
            id,
        }
    }

    /// Run one reading through validation, scoring, baseline update and
    /// alert evaluation, then publish the results.
    pub fn ingest(
        &self,
        raw: &RawReading,
        settings: &EngineSettings,
    ) -> Result<Accepted, RejectedReason> {
        // ---
        let mut w = lock(&self.writer);

        let reading = ingest::validate(
            &self.id,
            raw,
            w.last_accepted,
            |ts| self.has_reading_at(ts),
            &settings.ranges,
        )?;

        // Score against the baselines as they stood before this reading.
        let prior = w.baselines.snapshots();
        let health = if w.baselines.all_seeded() {
            score::score(&reading, &prior)
        } else {
            score::warming_up(&reading)
        };

        for metric in Metric::ALL {
            w.baselines.update(metric, reading.value(metric), reading.timestamp);
        }
        w.last_accepted = Some(reading.timestamp);

        let trend_per_hour = {
            let committed = read(&self.committed);
            let keep = settings.trend_readings.saturating_sub(1);
            let start = committed.scores.len().saturating_sub(keep);
            let recent = committed.scores[start..].iter().chain(std::iter::once(&health));
            trend::trend(recent).map(|t| t.slope_per_hour)
        };

        let config = read(&self.config).clone();
        let alert = w.machine.evaluate(&health, &config, trend_per_hour);

        {
            let mut committed = write(&self.committed);
            committed.readings.push(reading.clone());
            committed.scores.push(health.clone());
            if let Some(alert) = &alert {
                committed.alerts.push(alert.clone());
            }
            committed.level = w.machine.level();
            committed.baselines = w.baselines.snapshots();
            committed.scored_against = prior;
        }

        Ok(Accepted {
            reading,
            score: health,
            alert,
        })
    }

    fn has_reading_at(&self, ts: DateTime<Utc>) -> bool {
        // ---
        read(&self.committed)
            .readings
            .binary_search_by_key(&ts, |r| r.timestamp)
            .is_ok()
    }

    pub fn committed(&self) -> RwLockReadGuard<'_, Committed> {
        read(&self.committed)
    }

    pub fn config(&self) -> AlertConfig {
        read(&self.config).clone()
    }

    pub fn set_config(&self, config: AlertConfig) {
        *write(&self.config) = config;
    }

    /// Flip the acknowledged flag of `alert_id`, if this flock owns it.
    pub fn acknowledge(&self, alert_id: Uuid) -> Option<Alert> {
        // ---
        let mut committed = write(&self.committed);
        let alert = committed.alerts.iter_mut().find(|a| a.id == alert_id)?;
        alert.acknowledged = true;
        Some(alert.clone())
    }
}
