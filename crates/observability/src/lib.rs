// crates/observability/src/lib.rs
//! Process-level observability setup.
//!
//! Libraries in this workspace only emit through `tracing` and `metrics`;
//! binaries call into this crate once at startup to decide where that goes.

pub mod logging;
pub mod prometheus;

pub use logging::{init_tracing, LogFormat};
pub use prometheus::{init_metrics, render_metrics, MetricsExporter};
