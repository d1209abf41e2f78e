//! callgrid-prometheus — Prometheus backends for the CallGrid core.
//!
//! # Components
//!
//! - **`histogram`** — latency histograms per call label tuple (the default)
//! - **`counter`** — plain call counters where volume is all that matters
//! - **`stream`** — sent/received message counters for streaming calls
//! - the process-wide default collector, built lazily from the environment
//!   and injectable for tests
//!
//! Backends are registered with the global Prometheus registry by the
//! factory; exposition (the `/metrics` endpoint) is the host application's
//! concern.

pub mod counter;
pub mod histogram;
pub mod stream;

pub use counter::CounterBackend;
pub use histogram::{DEFAULT_BUCKETS, HistogramBackend};
pub use stream::StreamBackend;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::debug;

use callgrid_core::{
    BackendKind, CallCollector, ConfigError, MetricsBackend, MetricsOptions, NoopBackend,
    NoopStreamCallCollector, StreamCallCollector,
};

/// Errors raised while building a collector. Both variants are fatal at
/// startup: no collector exists if construction fails.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("metrics configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics registry error: {0}")]
    Registry(#[from] prometheus::Error),
}

/// Build a [`CallCollector`] for the configured backend kind, registering
/// Prometheus backends with the global default registry.
pub fn new_call_collector(opts: &MetricsOptions) -> Result<Arc<CallCollector>, BackendError> {
    let backend: Arc<dyn MetricsBackend> = match opts.backend {
        BackendKind::Noop => Arc::new(NoopBackend),
        BackendKind::PrometheusCounter => {
            let backend = CounterBackend::new(opts.server_info.clone(), opts.sampler.clone())?;
            backend.register(prometheus::default_registry())?;
            Arc::new(backend)
        }
        BackendKind::PrometheusHistogram => {
            let backend = HistogramBackend::new(opts.server_info.clone(), opts.sampler.clone())?;
            backend.register(prometheus::default_registry())?;
            Arc::new(backend)
        }
    };
    debug!(backend = opts.backend.as_str(), "built call collector");
    Ok(Arc::new(CallCollector::new(backend, opts.sampler.clone())))
}

/// Build a [`StreamCallCollector`] for the configured backend kind.
pub fn new_stream_collector(
    opts: &MetricsOptions,
) -> Result<Arc<dyn StreamCallCollector>, BackendError> {
    match opts.backend {
        BackendKind::Noop => Ok(Arc::new(NoopStreamCallCollector)),
        _ => {
            let backend = StreamBackend::new()?;
            backend.register(prometheus::default_registry())?;
            Ok(Arc::new(backend))
        }
    }
}

static DEFAULT_COLLECTOR: OnceCell<Arc<CallCollector>> = OnceCell::new();
static DEFAULT_STREAM_COLLECTOR: OnceCell<Arc<dyn StreamCallCollector>> = OnceCell::new();

/// The process-wide default collector, built from the environment on first
/// use. Configuration errors surface here instead of being deferred.
///
/// Prefer passing a collector explicitly; reach for the default only at
/// the outermost integration boundary.
pub fn default_collector() -> Result<Arc<CallCollector>, BackendError> {
    DEFAULT_COLLECTOR
        .get_or_try_init(|| new_call_collector(&MetricsOptions::from_env()?))
        .map(Arc::clone)
}

/// Install the process-wide default collector before first use, e.g. to
/// inject a noop or test collector. Fails if a default already exists.
pub fn set_default_collector(collector: Arc<CallCollector>) -> Result<(), Arc<CallCollector>> {
    DEFAULT_COLLECTOR.set(collector)
}

/// The process-wide default stream collector, built from the environment
/// on first use.
pub fn default_stream_collector() -> Result<Arc<dyn StreamCallCollector>, BackendError> {
    DEFAULT_STREAM_COLLECTOR
        .get_or_try_init(|| new_stream_collector(&MetricsOptions::from_env()?))
        .map(Arc::clone)
}

/// Install the process-wide default stream collector before first use.
pub fn set_default_stream_collector(
    collector: Arc<dyn StreamCallCollector>,
) -> Result<(), Arc<dyn StreamCallCollector>> {
    DEFAULT_STREAM_COLLECTOR.set(collector)
}
