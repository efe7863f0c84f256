//! Configuration loader for the `aegis-flockhealth` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Values are read through a lookup function so the
//! same parsing is exercised by unit tests without touching the process
//! environment.
use std::env;

use anyhow::{anyhow, Result};

use crate::models::Sensitivity;

/// Parse an optional environment variable into `$ty`, falling back to a default.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Plausible physical range of each metric; readings outside are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct PlausibleRanges {
    // ---
    /// mL per bird per day.
    pub water_consumption: (f64, f64),
    /// Activity index, 0-100.
    pub activity_level: (f64, f64),
    /// House temperature in °C.
    pub temperature: (f64, f64),
}

impl Default for PlausibleRanges {
    fn default() -> Self {
        // ---
        Self {
            water_consumption: (0.0, 2000.0),
            activity_level: (0.0, 100.0),
            temperature: (0.0, 45.0),
        }
    }
}

/// Tunables of the scoring and alerting engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    // ---
    /// Readings averaged directly to seed a baseline.
    pub warmup_readings: u32,

    /// Consecutive recovering readings required before de-escalating.
    pub hysteresis_readings: u32,

    /// Score below which a reading counts towards a sustained deviation.
    pub onset_threshold: f64,

    /// Minimum consecutive low scores that make a sustained deviation.
    pub onset_min_run: usize,

    /// Number of most recent scores used for the trend attached to alerts.
    pub trend_readings: usize,

    /// Flock size assumed for flocks that ingest before being configured.
    pub default_flock_size: u64,

    /// Sensitivity assumed for flocks that ingest before being configured.
    pub default_sensitivity: Sensitivity,

    pub ranges: PlausibleRanges,
}

impl Default for EngineSettings {
    fn default() -> Self {
        // ---
        Self {
            warmup_readings: 20,
            hysteresis_readings: 3,
            onset_threshold: 55.0,
            onset_min_run: 10,
            trend_readings: 12,
            default_flock_size: 5000,
            default_sensitivity: Sensitivity::Medium,
            ranges: PlausibleRanges::default(),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Port the HTTP surface listens on.
    pub http_port: u16,

    pub engine: EngineSettings,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `HTTP_PORT` – listen port (default: 8080)
/// - `WARMUP_READINGS` – baseline warm-up length (default: 20)
/// - `HYSTERESIS_READINGS` – de-escalation streak (default: 3)
/// - `ONSET_THRESHOLD` – sustained-deviation score threshold (default: 55)
/// - `ONSET_MIN_RUN` – sustained-deviation length in readings (default: 10)
/// - `TREND_READINGS` – readings in the alert trend (default: 12)
/// - `DEFAULT_FLOCK_SIZE` – flock size before configuration (default: 5000)
/// - `DEFAULT_SENSITIVITY` – `low`, `medium` or `high` (default: medium)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    load_from_lookup(|name| env::var(name).ok())
}

/// Same as [`load_from_env`] but reading values through `lookup`.
pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let defaults = EngineSettings::default();

    let http_port = parse_env!(lookup, "HTTP_PORT", u16, 8080);
    let warmup_readings = parse_env!(lookup, "WARMUP_READINGS", u32, defaults.warmup_readings);
    let hysteresis_readings = parse_env!(
        lookup,
        "HYSTERESIS_READINGS",
        u32,
        defaults.hysteresis_readings
    );
    let onset_threshold = parse_env!(lookup, "ONSET_THRESHOLD", f64, defaults.onset_threshold);
    let onset_min_run = parse_env!(lookup, "ONSET_MIN_RUN", usize, defaults.onset_min_run);
    let trend_readings = parse_env!(lookup, "TREND_READINGS", usize, defaults.trend_readings);
    let default_flock_size = parse_env!(
        lookup,
        "DEFAULT_FLOCK_SIZE",
        u64,
        defaults.default_flock_size
    );
    let default_sensitivity = parse_env!(
        lookup,
        "DEFAULT_SENSITIVITY",
        Sensitivity,
        defaults.default_sensitivity
    );

    if warmup_readings == 0 {
        return Err(anyhow!("WARMUP_READINGS must be at least 1"));
    }
    if hysteresis_readings == 0 {
        return Err(anyhow!("HYSTERESIS_READINGS must be at least 1"));
    }
    if onset_min_run == 0 {
        return Err(anyhow!("ONSET_MIN_RUN must be at least 1"));
    }
    if default_flock_size == 0 {
        return Err(anyhow!("DEFAULT_FLOCK_SIZE must be positive"));
    }
    // onset must stay below every watch threshold
    let lowest_watch = Sensitivity::Low.thresholds().watch;
    if !(0.0..lowest_watch).contains(&onset_threshold) {
        return Err(anyhow!(
            "ONSET_THRESHOLD must be at least 0 and below {}",
            lowest_watch
        ));
    }

    Ok(Config {
        http_port,
        engine: EngineSettings {
            warmup_readings,
            hysteresis_readings,
            onset_threshold,
            onset_min_run,
            trend_readings,
            default_flock_size,
            default_sensitivity,
            ranges: defaults.ranges,
        },
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let e = &self.engine;
        tracing::info!("Configuration loaded:");
        tracing::info!("  HTTP_PORT           : {}", self.http_port);
        tracing::info!("  WARMUP_READINGS     : {}", e.warmup_readings);
        tracing::info!("  HYSTERESIS_READINGS : {}", e.hysteresis_readings);
        tracing::info!("  ONSET_THRESHOLD     : {}", e.onset_threshold);
        tracing::info!("  ONSET_MIN_RUN       : {}", e.onset_min_run);
        tracing::info!("  TREND_READINGS      : {}", e.trend_readings);
        tracing::info!("  DEFAULT_FLOCK_SIZE  : {}", e.default_flock_size);
        tracing::info!("  DEFAULT_SENSITIVITY : {}", e.default_sensitivity);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        // ---
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        // ---
        let cfg = load_from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.engine, EngineSettings::default());
    }

    #[test]
    fn test_overrides_are_parsed() {
        // ---
        let cfg = load_from_lookup(lookup_from(&[
            ("HTTP_PORT", "9090"),
            ("WARMUP_READINGS", "5"),
            ("ONSET_THRESHOLD", "42.5"),
            ("DEFAULT_SENSITIVITY", "High"),
        ]))
        .unwrap();

        assert_eq!(cfg.http_port, 9090);
        assert_eq!(cfg.engine.warmup_readings, 5);
        assert_eq!(cfg.engine.onset_threshold, 42.5);
        assert_eq!(cfg.engine.default_sensitivity, Sensitivity::High);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        // ---
        assert!(load_from_lookup(lookup_from(&[("HTTP_PORT", "eighty")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("DEFAULT_SENSITIVITY", "max")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("WARMUP_READINGS", "0")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("ONSET_THRESHOLD", "120")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("HYSTERESIS_READINGS", "0")])).is_err());
    }

    #[test]
    fn test_onset_threshold_must_stay_below_watch() {
        // ---
        let lowest_watch = Sensitivity::Low.thresholds().watch;
        assert!(load_from_lookup(lookup_from(&[("ONSET_THRESHOLD", "95")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("ONSET_THRESHOLD", "60")])).is_err());
        assert!(load_from_lookup(lookup_from(&[("ONSET_THRESHOLD", "-1")])).is_err());

        let cfg = load_from_lookup(lookup_from(&[("ONSET_THRESHOLD", "59.5")])).unwrap();
        assert!(cfg.engine.onset_threshold < lowest_watch);
    }
}
