//! Data models for the flock health engine.
//!
//! Everything here is plain data: readings as accepted by ingest, baseline
//! snapshots, composite scores, alert configuration and the alerts
//! themselves. All types derive `Serialize` so the HTTP layer can hand them
//! to the dashboard unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvalidConfig;

/// Identifier of a monitored flock.
pub type FlockId = String;

// ---

/// One of the three sensor streams tracked per flock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WaterConsumption,
    ActivityLevel,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::WaterConsumption,
        Metric::ActivityLevel,
        Metric::Temperature,
    ];

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Metric::WaterConsumption => "water_consumption",
            Metric::ActivityLevel => "activity_level",
            Metric::Temperature => "temperature",
        }
    }

    pub(crate) fn index(&self) -> usize {
        // ---
        match self {
            Metric::WaterConsumption => 0,
            Metric::ActivityLevel => 1,
            Metric::Temperature => 2,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete, validated sensor reading.
///
/// Water consumption is in mL per bird per day, activity is a 0-100 index
/// and temperature is the house temperature in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    // ---
    pub flock_id: FlockId,
    pub timestamp: DateTime<Utc>,
    pub water_consumption: f64,
    pub activity_level: f64,
    pub temperature: f64,
}

impl SensorReading {
    pub fn value(&self, metric: Metric) -> f64 {
        // ---
        match metric {
            Metric::WaterConsumption => self.water_consumption,
            Metric::ActivityLevel => self.activity_level,
            Metric::Temperature => self.temperature,
        }
    }
}

/// Reading as delivered by the sensor feed, before validation.
///
/// Any metric may be missing; ingest rejects such readings as partial.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub water_consumption: Option<f64>,
    pub activity_level: Option<f64>,
    pub temperature: Option<f64>,
}

/// Snapshot of the expected value and variance for one metric of one flock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    // ---
    pub flock_id: FlockId,
    pub metric: Metric,
    pub expected_value: f64,
    pub expected_variance: f64,
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of readings folded into this baseline so far.
    pub samples: u32,
}

impl Baseline {
    pub fn expected_stddev(&self) -> f64 {
        self.expected_variance.max(0.0).sqrt()
    }
}

/// Composite health score for one accepted reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
    // ---
    pub flock_id: FlockId,
    pub timestamp: DateTime<Utc>,
    /// 100 is fully baseline-consistent, 0 is maximal deviation.
    pub score: f64,
    /// Clipped, normalized deviation per metric (negative = below baseline).
    pub contributing_deviations: BTreeMap<Metric, f64>,
    /// Set while baselines are still being seeded; such scores never alert.
    pub warming_up: bool,
}

// ---

/// Operator-selected alert sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

/// Score thresholds below which a flock enters the corresponding level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub watch: f64,
    pub warning: f64,
    pub critical: f64,
}

impl Sensitivity {
    /// Higher sensitivity raises every threshold so that smaller deviations
    /// already trip an alert.
    pub fn thresholds(&self) -> Thresholds {
        // ---
        match self {
            Sensitivity::Low => Thresholds {
                watch: 60.0,
                warning: 40.0,
                critical: 20.0,
            },
            Sensitivity::Medium => Thresholds {
                watch: 70.0,
                warning: 50.0,
                critical: 30.0,
            },
            Sensitivity::High => Thresholds {
                watch: 80.0,
                warning: 60.0,
                critical: 40.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = InvalidConfig;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high" => Ok(Sensitivity::High),
            _ => Err(InvalidConfig::Sensitivity(s.to_string())),
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-flock alerting configuration, owned by farm operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertConfig {
    // ---
    pub flock_id: FlockId,
    pub flock_size: u64,
    pub sensitivity: Sensitivity,
}

// ---

/// State of a flock's alert state machine, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Watch,
    Warning,
    Critical,
}

impl AlertLevel {
    /// Level implied by a single score under the given thresholds.
    pub fn classify(score: f64, thresholds: &Thresholds) -> AlertLevel {
        // ---
        if score < thresholds.critical {
            AlertLevel::Critical
        } else if score < thresholds.warning {
            AlertLevel::Warning
        } else if score < thresholds.watch {
            AlertLevel::Watch
        } else {
            AlertLevel::Normal
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        // ---
        match self {
            AlertLevel::Normal => None,
            AlertLevel::Watch => Some(Severity::Watch),
            AlertLevel::Warning => Some(Severity::Warning),
            AlertLevel::Critical => Some(Severity::Critical),
        }
    }
}

/// Severity carried by an emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Watch,
    Warning,
    Critical,
}

/// Early-warning alert raised on escalation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    // ---
    pub id: Uuid,
    pub flock_id: FlockId,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub triggering_score: f64,
    pub recommended_action: String,
    /// Score slope in points per hour over the recent history, if known.
    pub trend_per_hour: Option<f64>,
    pub acknowledged: bool,
}

/// Outcome of a successfully ingested reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accepted {
    // ---
    pub reading: SensorReading,
    pub score: HealthScore,
    /// Alert raised by this reading, if it escalated the flock.
    pub alert: Option<Alert>,
}

// ---

/// Inclusive time range; a missing end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        // ---
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        // ---
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Least-squares trend of the score over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    // ---
    pub slope_per_hour: f64,
    pub samples: usize,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Per-metric line of the dashboard summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStatus {
    // ---
    pub metric: Metric,
    pub current: f64,
    pub expected: f64,
    /// Percent change of the current value relative to the baseline.
    pub percent_from_baseline: Option<f64>,
    pub deviation: f64,
}

/// Everything the live dashboard shows for one flock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlockSummary {
    // ---
    pub flock_id: FlockId,
    pub flock_size: u64,
    pub sensitivity: Sensitivity,
    pub alert_level: AlertLevel,
    pub score: HealthScore,
    pub metrics: Vec<MetricStatus>,
    pub active_alerts: usize,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sensitivity_parsing() {
        // ---
        assert_eq!("low".parse::<Sensitivity>().unwrap(), Sensitivity::Low);
        assert_eq!(" Medium ".parse::<Sensitivity>().unwrap(), Sensitivity::Medium);
        assert_eq!("HIGH".parse::<Sensitivity>().unwrap(), Sensitivity::High);
        assert!(matches!(
            "extreme".parse::<Sensitivity>(),
            Err(InvalidConfig::Sensitivity(_))
        ));
    }

    #[test]
    fn test_higher_sensitivity_raises_thresholds() {
        // ---
        let low = Sensitivity::Low.thresholds();
        let medium = Sensitivity::Medium.thresholds();
        let high = Sensitivity::High.thresholds();

        assert!(low.watch < medium.watch && medium.watch < high.watch);
        assert!(low.warning < medium.warning && medium.warning < high.warning);
        assert!(low.critical < medium.critical && medium.critical < high.critical);
    }

    #[test]
    fn test_classify_levels() {
        // ---
        let t = Sensitivity::Medium.thresholds();
        assert_eq!(AlertLevel::classify(95.0, &t), AlertLevel::Normal);
        assert_eq!(AlertLevel::classify(70.0, &t), AlertLevel::Normal);
        assert_eq!(AlertLevel::classify(69.9, &t), AlertLevel::Watch);
        assert_eq!(AlertLevel::classify(45.0, &t), AlertLevel::Warning);
        assert_eq!(AlertLevel::classify(10.0, &t), AlertLevel::Critical);
    }

    #[test]
    fn test_time_window_bounds_are_inclusive() {
        // ---
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let window = TimeWindow::between(from, to);

        assert!(window.contains(from));
        assert!(window.contains(to));
        assert!(!window.contains(to + chrono::Duration::seconds(1)));
        assert!(TimeWindow::all().contains(from));
    }

    #[test]
    fn test_metric_serializes_snake_case() {
        // ---
        let json = serde_json::to_string(&Metric::WaterConsumption).unwrap();
        assert_eq!(json, "\"water_consumption\"");
    }
}
