//! # Prometheus Metrics
//!
//! Call and lifecycle counters for the node, served at `/metrics` on the
//! metrics port. Everything lives in a dedicated registry with the `fns`
//! prefix.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Signed calls received on `/calls`.
    pub calls_total: IntCounter,
    /// Rejected calls, labelled by error class.
    pub failed_calls_total: IntCounterVec,
    pub registrations_total: IntCounter,
    pub renewals_total: IntCounter,
    pub commitments_total: IntCounter,
    pub withdrawals_total: IntCounter,
    /// Events in the persisted log.
    pub events_logged: IntGauge,
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("fns".into()), None).expect("metric registry");

        let calls_total = IntCounter::new("calls_total", "Signed calls received")
            .expect("metric creation");
        registry
            .register(Box::new(calls_total.clone()))
            .expect("metric registration");

        let failed_calls_total = IntCounterVec::new(
            Opts::new("failed_calls_total", "Signed calls rejected, by error class"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(failed_calls_total.clone()))
            .expect("metric registration");

        let registrations_total = IntCounter::new("registrations_total", "Names registered")
            .expect("metric creation");
        registry
            .register(Box::new(registrations_total.clone()))
            .expect("metric registration");

        let renewals_total =
            IntCounter::new("renewals_total", "Names renewed").expect("metric creation");
        registry
            .register(Box::new(renewals_total.clone()))
            .expect("metric registration");

        let commitments_total = IntCounter::new("commitments_total", "Commitments accepted")
            .expect("metric creation");
        registry
            .register(Box::new(commitments_total.clone()))
            .expect("metric registration");

        let withdrawals_total = IntCounter::new("withdrawals_total", "Treasury withdrawals")
            .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let events_logged = IntGauge::new("events_logged", "Events in the persisted event log")
            .expect("metric creation");
        registry
            .register(Box::new(events_logged.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "Signed call execution latency in seconds, persistence included",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            calls_total,
            failed_calls_total,
            registrations_total,
            renewals_total,
            commitments_total,
            withdrawals_total,
            events_logged,
            call_latency_seconds,
        }
    }

    /// Bumps the lifecycle counter matching a successful call.
    pub fn record_success(&self, method: &str) {
        match method {
            "register" => self.registrations_total.inc(),
            "renew" => self.renewals_total.inc(),
            "commit" => self.commitments_total.inc(),
            "withdraw" => self.withdrawals_total.inc(),
            _ => {}
        }
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
