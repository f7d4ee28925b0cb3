//! Controller metrics
//!
//! Reconciliation timings, reported listener errors and admission decisions.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Gateway reconciliation duration
    static ref GATEWAY_RECONCILIATION_DURATION: HistogramVec = {
        let opts = HistogramOpts::new(
            "gateway_reconciliation_duration_seconds",
            "Gateway reconciliation duration in seconds",
        );
        let histogram = HistogramVec::new(opts, &["gateway", "namespace"])
            .expect("Failed to create histogram");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("Failed to register histogram");
        histogram
    };

    /// Gateway reconciliations total
    static ref GATEWAY_RECONCILIATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "gateway_reconciliations_total",
            "Total number of gateway reconciliations",
        );
        let counter = IntCounterVec::new(opts, &["gateway", "namespace", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Listener errors reported in Gateway status
    static ref GATEWAY_LISTENER_ERRORS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "gateway_listener_errors_total",
            "Total number of listener errors reported in gateway status",
        );
        let counter = IntCounterVec::new(opts, &["gateway", "namespace", "reason"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// GatewayClass reconciliations total
    static ref GATEWAYCLASS_RECONCILIATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "gatewayclass_reconciliations_total",
            "Total number of gatewayclass reconciliations",
        );
        let counter = IntCounterVec::new(opts, &["gatewayclass", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Admission reviews total
    static ref ADMISSION_REVIEWS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "gateway_admission_reviews_total",
            "Total number of gateway admission reviews",
        );
        let counter = IntCounterVec::new(opts, &["operation", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };
}

/// Record Gateway reconciliation
pub fn record_gateway_reconciliation(
    gateway: &str,
    namespace: &str,
    duration_secs: f64,
    result: &str,
) {
    GATEWAY_RECONCILIATION_DURATION
        .with_label_values(&[gateway, namespace])
        .observe(duration_secs);

    GATEWAY_RECONCILIATIONS_TOTAL
        .with_label_values(&[gateway, namespace, result])
        .inc();
}

/// Record listener errors found in one reconciliation pass
pub fn record_listener_errors(gateway: &str, namespace: &str, reason: &str, count: usize) {
    GATEWAY_LISTENER_ERRORS_TOTAL
        .with_label_values(&[gateway, namespace, reason])
        .inc_by(count as u64);
}

/// Record GatewayClass reconciliation
pub fn record_gatewayclass_reconciliation(gatewayclass: &str, result: &str) {
    GATEWAYCLASS_RECONCILIATIONS_TOTAL
        .with_label_values(&[gatewayclass, result])
        .inc();
}

/// Record an admission decision ("allowed", "denied" or "invalid")
pub fn record_admission_review(operation: &str, result: &str) {
    ADMISSION_REVIEWS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Gather controller metrics
pub fn gather_controller_metrics() -> Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = CONTROLLER_METRICS_REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert to UTF-8: {}", e))
}
