//! Metrics collection for the API service.

use ipn_relay_core::{IpnError, PipelineOutcome};
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Service metrics for observability
///
/// Metrics live in a registry owned by this instance, so several instances
/// (one per router in tests) never collide.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub requests_total: IntCounterVec,
    pub processing_duration: Histogram,
    pub signature_failures: IntCounter,
    pub upsert_failures: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("ipn_requests_total", "IPN requests by terminal outcome"),
            &["outcome"],
        )?;
        let processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ipn_processing_duration_seconds",
                "IPN processing time including the provider call",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        )?;
        let signature_failures = IntCounter::new(
            "ipn_signature_failures_total",
            "IPN requests rejected for an invalid signature",
        )?;
        let upsert_failures = IntCounter::new(
            "ipn_upsert_failures_total",
            "Failed contact upserts at the provider",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;
        registry.register(Box::new(signature_failures.clone()))?;
        registry.register(Box::new(upsert_failures.clone()))?;

        Ok(Arc::new(Self {
            registry,
            requests_total,
            processing_duration,
            signature_failures,
            upsert_failures,
        }))
    }

    /// Record the terminal state of one request.
    pub fn record_outcome(&self, result: &Result<PipelineOutcome, IpnError>, duration: Duration) {
        let label = match result {
            Ok(PipelineOutcome::Dispatched { .. }) => "dispatched",
            Ok(PipelineOutcome::Acknowledged { .. }) => "acknowledged",
            Err(e) => e.outcome_label(),
        };

        self.requests_total.with_label_values(&[label]).inc();
        self.processing_duration.observe(duration.as_secs_f64());

        match result {
            Err(IpnError::SignatureInvalid(_)) => self.signature_failures.inc(),
            Err(e) if e.is_dispatch_failure() => self.upsert_failures.inc(),
            _ => {}
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
