// crates/observability/src/prometheus.rs
//! Prometheus export of the LLM usage metrics.
//!
//! [`MetricsExporter`] owns the render side of a Prometheus recorder. It can
//! either own the process-wide `metrics` slot or stay private to the callers
//! that pass its recorder through `TelemetryContext::with_recorder`.

use std::sync::{Arc, OnceLock};

use ghcp_bridge_core::telemetry::describe_metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

static GLOBAL_EXPORTER: OnceLock<MetricsExporter> = OnceLock::new();

/// Renders whatever its recorder has collected in Prometheus text format.
#[derive(Clone)]
pub struct MetricsExporter {
    handle: PrometheusHandle,
}

impl MetricsExporter {
    /// Install a fresh recorder as the global `metrics` recorder.
    ///
    /// `None` when some other recorder already owns the slot.
    pub fn install_global() -> Option<Self> {
        let recorder = PrometheusBuilder::new().build_recorder();
        let exporter = Self {
            handle: recorder.handle(),
        };
        if let Err(e) = metrics::set_global_recorder(recorder) {
            tracing::warn!(error = %e, "metrics: global recorder already installed");
            return None;
        }
        describe_metrics();
        Some(exporter)
    }

    /// A recorder that is never installed globally. Hand the returned
    /// recorder to `TelemetryContext::with_recorder` to route a call's
    /// metrics into this exporter only.
    pub fn scoped() -> (Self, Arc<PrometheusRecorder>) {
        let recorder = Arc::new(PrometheusBuilder::new().build_recorder());
        metrics::with_local_recorder(recorder.as_ref(), describe_metrics);
        let exporter = Self {
            handle: recorder.handle(),
        };
        (exporter, recorder)
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global exporter once at startup.
///
/// Returns `false` when it was already installed or the slot was taken.
pub fn init_metrics() -> bool {
    if GLOBAL_EXPORTER.get().is_some() {
        return false;
    }
    let Some(exporter) = MetricsExporter::install_global() else {
        return false;
    };
    let installed = GLOBAL_EXPORTER.set(exporter).is_ok();
    if installed {
        tracing::info!("metrics: prometheus exporter installed");
    }
    installed
}

/// Text exposition of the global exporter, `None` before [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    GLOBAL_EXPORTER.get().map(MetricsExporter::render)
}
