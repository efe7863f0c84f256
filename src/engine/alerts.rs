//! Per-flock alert state machine.
//!
//! States are [`AlertLevel`]s, starting at `Normal`, with no terminal state.
//! Every non-warming-up score is classified against the thresholds of the
//! flock's current sensitivity:
//!
//! - more severe than the current level: escalate at once (levels may be
//!   skipped) and emit an [`Alert`] carrying the recommended action
//! - less severe: count it towards a recovery streak; after
//!   `hysteresis_readings` consecutive recovering scores, drop to the most
//!   severe level seen during the streak
//! - equal: the streak is broken
//!
//! De-escalation never emits or clears alerts. Acknowledging an alert happens
//! on the alert record and never reaches this machine.

use uuid::Uuid;

use crate::models::{Alert, AlertConfig, AlertLevel, HealthScore, Severity};

/// Action text shown with an alert of `severity` for a flock of `flock_size` birds.
pub fn recommended_action(severity: Severity, flock_size: u64) -> String {
    // ---
    match severity {
        Severity::Watch => {
            "Monitor closely: check water supply lines and increase monitoring frequency"
                .to_string()
        }
        Severity::Warning => format!(
            "Inspect at least {} of {} birds for symptoms, check water supply lines \
             and feeders, and increase monitoring frequency",
            inspection_sample(flock_size),
            flock_size
        ),
        Severity::Critical => format!(
            "Isolate flock of {} birds, notify veterinarian for inspection, \
             and check water supply lines",
            flock_size
        ),
    }
}

/// Birds to inspect by hand: 5% of the flock, at least 30, at most the flock.
fn inspection_sample(flock_size: u64) -> u64 {
    // ---
    flock_size.div_ceil(20).max(30).min(flock_size)
}

#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    // ---
    level: AlertLevel,
    hysteresis_readings: u32,
    recovery_streak: u32,
    /// Most severe level classified during the current recovery streak.
    recovery_ceiling: AlertLevel,
}

impl AlertStateMachine {
    pub fn new(hysteresis_readings: u32) -> Self {
        // ---
        Self {
            level: AlertLevel::Normal,
            hysteresis_readings,
            recovery_streak: 0,
            recovery_ceiling: AlertLevel::Normal,
        }
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    /// Advance the machine with `score`, returning an alert on escalation.
    ///
    /// `trend_per_hour` is copied into the emitted alert.
    pub fn evaluate(
        &mut self,
        score: &HealthScore,
        config: &AlertConfig,
        trend_per_hour: Option<f64>,
    ) -> Option<Alert> {
        // ---
        if score.warming_up {
            return None;
        }

        let target = AlertLevel::classify(score.score, &config.sensitivity.thresholds());

        if target > self.level {
            let previous = self.level;
            self.level = target;
            self.reset_streak();

            let severity = target.severity()?;
            tracing::warn!(
                flock_id = %score.flock_id,
                ?previous,
                level = ?target,
                score = score.score,
                sensitivity = %config.sensitivity,
                "Alert level escalated"
            );

            return Some(Alert {
                id: Uuid::new_v4(),
                flock_id: score.flock_id.clone(),
                timestamp: score.timestamp,
                severity,
                triggering_score: score.score,
                recommended_action: recommended_action(severity, config.flock_size),
                trend_per_hour,
                acknowledged: false,
            });
        }

        if target == self.level {
            self.reset_streak();
            return None;
        }

        self.recovery_streak += 1;
        self.recovery_ceiling = self.recovery_ceiling.max(target);

        if self.recovery_streak >= self.hysteresis_readings {
            let previous = self.level;
            self.level = self.recovery_ceiling;
            self.reset_streak();
            tracing::info!(
                flock_id = %score.flock_id,
                ?previous,
                level = ?self.level,
                at = %score.timestamp,
                "Alert level de-escalated"
            );
        }

        None
    }

    fn reset_streak(&mut self) {
        // ---
        self.recovery_streak = 0;
        self.recovery_ceiling = AlertLevel::Normal;
    }
}
