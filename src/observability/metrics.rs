use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub transition_latency_seconds: HistogramVec,
    pub notification_failures_total: IntCounter,
    pub location_reports_total: IntCounter,
    pub packages_total: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Package transitions by event and outcome"),
            &["event", "outcome"],
        )
        .expect("valid transitions_total metric");

        let transition_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "transition_latency_seconds",
                "Latency of package transitions in seconds",
            ),
            &["event"],
        )
        .expect("valid transition_latency_seconds metric");

        let notification_failures_total = IntCounter::new(
            "notification_failures_total",
            "Notifications that failed or timed out",
        )
        .expect("valid notification_failures_total metric");

        let location_reports_total =
            IntCounter::new("location_reports_total", "Accepted vehicle location reports")
                .expect("valid location_reports_total metric");

        let packages_total = IntGauge::new("packages_total", "Packages currently in the ledger")
            .expect("valid packages_total metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(transition_latency_seconds.clone()))
            .expect("register transition_latency_seconds");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("register notification_failures_total");
        registry
            .register(Box::new(location_reports_total.clone()))
            .expect("register location_reports_total");
        registry
            .register(Box::new(packages_total.clone()))
            .expect("register packages_total");

        Self {
            registry,
            transitions_total,
            transition_latency_seconds,
            notification_failures_total,
            location_reports_total,
            packages_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
