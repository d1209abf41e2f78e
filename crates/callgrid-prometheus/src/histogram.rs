//! Histogram-based call recording.

use std::sync::Arc;

use prometheus::{HistogramOpts, HistogramVec, Registry};

use callgrid_core::{
    AlwaysSampler, MetricsBackend, RatioSampler, Sampler, SamplerOptions, ServerInfo,
};

/// Default latency buckets in seconds.
pub const DEFAULT_BUCKETS: &[f64] = &[0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0];

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

/// [`MetricsBackend`] recording call durations into a pair of Prometheus
/// histogram vectors, one per direction.
#[derive(Clone)]
pub struct HistogramBackend {
    active: HistogramVec,
    passive: HistogramVec,
    server_info: ServerInfo,
    sampler_opts: SamplerOptions,
}

impl HistogramBackend {
    /// Build a backend with [`DEFAULT_BUCKETS`].
    pub fn new(
        server_info: ServerInfo,
        sampler_opts: SamplerOptions,
    ) -> Result<Self, prometheus::Error> {
        Self::with_buckets(server_info, sampler_opts, DEFAULT_BUCKETS.to_vec())
    }

    /// Build a backend with custom latency buckets.
    pub fn with_buckets(
        server_info: ServerInfo,
        sampler_opts: SamplerOptions,
        buckets: Vec<f64>,
    ) -> Result<Self, prometheus::Error> {
        let active = HistogramVec::new(
            HistogramOpts::new(
                "active_requests_duration_seconds",
                "Histogram of request latency (seconds) of active calls.",
            )
            .buckets(buckets.clone()),
            ACTIVE_LABELS,
        )?;
        let passive = HistogramVec::new(
            HistogramOpts::new(
                "passive_handled_duration_seconds",
                "Histogram of response latency (seconds) of passive calls.",
            )
            .buckets(buckets),
            PASSIVE_LABELS,
        )?;
        Ok(Self {
            active,
            passive,
            server_info,
            sampler_opts,
        })
    }

    /// Register both histogram vectors for exposition.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.active.clone()))?;
        registry.register(Box::new(self.passive.clone()))
    }
}

impl MetricsBackend for HistogramBackend {
    fn record_active(
        &self,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        duration_secs: f64,
    ) {
        self.active
            .with_label_values(&[passive_service, passive_method, method_type, status, protocol])
            .observe(duration_secs);
    }

    fn record_passive(
        &self,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        duration_secs: f64,
    ) {
        self.passive
            .with_label_values(&[active_service, passive_method, method_type, status, protocol])
            .observe(duration_secs);
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
