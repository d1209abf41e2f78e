//! Counter-based call recording.
//!
//! Cheaper than the histogram backend: counts calls per label tuple and
//! discards the duration. Useful where call volume matters but latency
//! distributions are collected elsewhere.

use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};

use callgrid_core::{
    AlwaysSampler, MetricsBackend, RatioSampler, Sampler, SamplerOptions, ServerInfo,
};

const ACTIVE_LABELS: &[&str] = &[
    "passive_service",
    "passive_method",
    "method_type",
    "status",
    "protocol",
];
const PASSIVE_LABELS: &[&str] = &[
    "active_service",
    "passive_method",
    "method_type",
    "status",
    "protocol",
];

/// [`MetricsBackend`] counting calls per label tuple, one counter vector
/// per direction. Durations are ignored.
#[derive(Clone)]
pub struct CounterBackend {
    active: IntCounterVec,
    passive: IntCounterVec,
    server_info: ServerInfo,
    sampler_opts: SamplerOptions,
}

impl CounterBackend {
    pub fn new(
        server_info: ServerInfo,
        sampler_opts: SamplerOptions,
    ) -> Result<Self, prometheus::Error> {
        let active = IntCounterVec::new(
            Opts::new("active_requests_total", "Counter of active requests."),
            ACTIVE_LABELS,
        )?;
        let passive = IntCounterVec::new(
            Opts::new("passive_handled_total", "Counter of passive responses."),
            PASSIVE_LABELS,
        )?;
        Ok(Self {
            active,
            passive,
            server_info,
            sampler_opts,
        })
    }

    /// Register both counter vectors for exposition.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.active.clone()))?;
        registry.register(Box::new(self.passive.clone()))
    }
}

impl MetricsBackend for CounterBackend {
    fn record_active(
        &self,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        _duration_secs: f64,
    ) {
        self.active
            .with_label_values(&[passive_service, passive_method, method_type, status, protocol])
            .inc();
    }

    fn record_passive(
        &self,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        _duration_secs: f64,
    ) {
        self.passive
            .with_label_values(&[active_service, passive_method, method_type, status, protocol])
            .inc();
    }

    fn sampler(&self, class: &str) -> Arc<dyn Sampler> {
        match self.sampler_opts.ratios.get(class) {
            Some(&pct) => Arc::new(RatioSampler::new(
                self.sampler_opts.threshold_secs,
                pct,
                self.sampler_opts.on_error_sampled,
            )),
            None => Arc::new(AlwaysSampler),
        }
    }

    fn server_info(&self) -> ServerInfo {
        self.server_info.clone()
    }
}
