//! Prometheus-backed stream message counters.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use callgrid_core::{StreamCallCollector, StreamCounter};

const ACTIVE_LABELS: &[&str] = &[
    "passive_service",
    "passive_method",
    "method_type",
    "protocol",
    "status",
];
const PASSIVE_LABELS: &[&str] = &[
    "active_service",
    "passive_method",
    "method_type",
    "protocol",
    "status",
];

/// [`StreamCallCollector`] backed by four Prometheus counter vectors:
/// sent/received per direction. Every message is counted; stream counters
/// are never sampled.
#[derive(Clone)]
pub struct StreamBackend {
    active_sent: IntCounterVec,
    active_received: IntCounterVec,
    passive_sent: IntCounterVec,
    passive_received: IntCounterVec,
}

impl StreamBackend {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            active_sent: IntCounterVec::new(
                Opts::new(
                    "active_stream_sent_total",
                    "Total stream messages sent by the client.",
                ),
                ACTIVE_LABELS,
            )?,
            active_received: IntCounterVec::new(
                Opts::new(
                    "active_stream_received_total",
                    "Total stream messages received by the client.",
                ),
                ACTIVE_LABELS,
            )?,
            passive_sent: IntCounterVec::new(
                Opts::new(
                    "passive_stream_sent_total",
                    "Total stream messages sent by the server.",
                ),
                PASSIVE_LABELS,
            )?,
            passive_received: IntCounterVec::new(
                Opts::new(
                    "passive_stream_received_total",
                    "Total stream messages received on the server.",
                ),
                PASSIVE_LABELS,
            )?,
        })
    }

    /// Register all four counter vectors for exposition.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.active_sent.clone()))?;
        registry.register(Box::new(self.active_received.clone()))?;
        registry.register(Box::new(self.passive_sent.clone()))?;
        registry.register(Box::new(self.passive_received.clone()))
    }
}

/// A sent/received counter pair bound to one label tuple.
struct PrometheusStreamCounter {
    sent: IntCounter,
    received: IntCounter,
}

impl StreamCounter for PrometheusStreamCounter {
    fn inc_sent(&self) {
        self.sent.inc();
    }
    fn inc_received(&self) {
        self.received.inc();
    }
}

impl StreamCallCollector for StreamBackend {
    fn active_stream_counter(
        &self,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
        status: &str,
    ) -> Box<dyn StreamCounter> {
        let labels = [passive_service, passive_method, method_type, protocol, status];
        Box::new(PrometheusStreamCounter {
            sent: self.active_sent.with_label_values(&labels),
            received: self.active_received.with_label_values(&labels),
        })
    }

    fn passive_stream_counter(
        &self,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
        status: &str,
    ) -> Box<dyn StreamCounter> {
        let labels = [active_service, passive_method, method_type, protocol, status];
        Box::new(PrometheusStreamCounter {
            sent: self.passive_sent.with_label_values(&labels),
            received: self.passive_received.with_label_values(&labels),
        })
    }
}
