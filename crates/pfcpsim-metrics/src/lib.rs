use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PFCP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pfcp_requests_total", "PFCP requests sent, by message type"),
        &["message_type"]
    ).expect("valid metric definition");

    pub static ref PFCP_RETRANSMISSIONS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("pfcp_retransmissions_total", "PFCP request retransmissions")
    ).expect("valid metric definition");

    pub static ref PFCP_TIMEOUTS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("pfcp_timeouts_total", "PFCP requests that exhausted their retries")
    ).expect("valid metric definition");

    pub static ref PFCP_REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pfcp_rejections_total", "PFCP responses with a rejecting cause"),
        &["message_type"]
    ).expect("valid metric definition");

    pub static ref HEARTBEAT_MISSES_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("pfcp_heartbeat_misses_total", "Heartbeat requests left unanswered")
    ).expect("valid metric definition");

    pub static ref ACTIVE_SESSIONS: IntGauge = IntGauge::with_opts(
        Opts::new("pfcp_active_sessions", "Established PFCP sessions")
    ).expect("valid metric definition");

    pub static ref RESPONSE_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("pfcp_response_latency_seconds", "Time from first send to response")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).expect("valid metric definition");
}

/// Register all metrics with the global registry. Calling it twice is harmless.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PFCP_REQUESTS_TOTAL.clone()),
        Box::new(PFCP_RETRANSMISSIONS_TOTAL.clone()),
        Box::new(PFCP_TIMEOUTS_TOTAL.clone()),
        Box::new(PFCP_REJECTIONS_TOTAL.clone()),
        Box::new(HEARTBEAT_MISSES_TOTAL.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
        Box::new(RESPONSE_LATENCY_SECONDS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Gather metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        register_metrics().unwrap();
        register_metrics().unwrap();

        PFCP_REQUESTS_TOTAL
            .with_label_values(&["Session Establishment Request"])
            .inc();
        PFCP_RETRANSMISSIONS_TOTAL.inc();
        ACTIVE_SESSIONS.set(10);
        RESPONSE_LATENCY_SECONDS.observe(0.5);

        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("pfcp_requests_total"));
        assert!(metrics.contains("pfcp_response_latency_seconds"));
        assert!(metrics.contains("pfcp_active_sessions"));
    }
}
