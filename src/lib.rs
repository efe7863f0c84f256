//! Flock health scoring and early-warning engine.
//!
//! Sensor readings (water consumption, activity, temperature) are scored
//! against adaptive per-flock baselines into a 0-100 composite health score.
//! Falling scores drive a per-flock alert state machine; the stored score
//! history can be queried for trend and the onset of a sustained deviation.
//!
//! Layout follows the Explicit Module Boundary Pattern (EMBP): `engine` is the
//! only gateway to scoring state, `routes` the only gateway to HTTP, and
//! `config`, `models` and `error` are shared leaves.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;

pub use config::{Config, EngineSettings};
pub use engine::Engine;
pub use error::{InvalidConfig, NotFound, RejectedReason};
