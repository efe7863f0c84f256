//! Error types surfaced by the flock health engine.
//!
//! None of these are fatal: a rejected reading or a bad operator setting is
//! reported to the caller and the engine keeps running.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Metric;

/// Why ingest refused a reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectedReason {
    /// Timestamp earlier than the last accepted reading for the flock.
    #[error("reading at {got} is older than last accepted reading at {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    /// Value outside the physically plausible range for the metric.
    #[error("{metric} value {value} is outside the plausible range")]
    OutOfRange { metric: Metric, value: f64 },

    /// A reading with this timestamp was already accepted.
    #[error("a reading at {0} was already accepted")]
    Duplicate(DateTime<Utc>),

    /// One or more metrics missing from the reading.
    #[error("reading is missing {missing}")]
    Partial { missing: Metric },
}

impl RejectedReason {
    /// Short machine-readable code for logs and API bodies.
    pub fn code(&self) -> &'static str {
        // ---
        match self {
            RejectedReason::OutOfOrder { .. } => "out_of_order",
            RejectedReason::OutOfRange { .. } => "out_of_range",
            RejectedReason::Duplicate(_) => "duplicate",
            RejectedReason::Partial { .. } => "partial",
        }
    }
}

/// Malformed operator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("flock size must be positive, got {0}")]
    FlockSize(i64),

    #[error("unrecognized sensitivity '{0}', expected low, medium or high")]
    Sensitivity(String),
}

/// Lookup of something the engine does not know about.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("flock '{0}' not found")]
    Flock(String),

    #[error("flock '{0}' has no scores yet")]
    Score(String),

    #[error("alert {0} not found")]
    Alert(Uuid),
}
