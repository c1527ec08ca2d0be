//! Prometheus metrics.
//!
//! Search counters and histograms are emitted through the `metrics` facade in
//! [`crate::service`]; this module installs the exporter and renders it.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

use crate::config::MetricsConfig;

/// One recorder per process. Later services share the first handle.
static RECORDER: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

fn install() -> Option<PrometheusHandle> {
    RECORDER
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        })
        .clone()
}

/// Owns the Prometheus handle used by `/metrics`.
#[derive(Clone)]
pub struct MetricsService {
    handle: Option<PrometheusHandle>,
}

impl MetricsService {
    pub fn new(config: MetricsConfig) -> Self {
        let handle = if config.enabled { install() } else { None };
        Self { handle }
    }

    /// A service that records nothing.
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Prometheus text exposition, or `None` when disabled.
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(|h| h.render())
    }
}
