//! The call collector — the timing/recording protocol every transport
//! adapter goes through.
//!
//! A [`CallCollector`] binds a [`MetricsBackend`] to one sampler per call
//! class. The class → sampler table is built once at construction and read
//! concurrently without locking afterwards. Recording is synchronous and
//! fire-and-forget: either the sampler keeps the observation and the
//! backend receives exactly one recording call, or the observation is
//! dropped without a trace.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::SamplerOptions;
use crate::reporter::{ActiveReporter, PassiveReporter};
use crate::sampler::{AlwaysSampler, CallError, NeverSampler, RatioSampler, Sampler};
use crate::server_info::ServerInfo;

/// Pluggable metrics sink.
///
/// Label values are caller-supplied strings; the backend does not bound
/// their cardinality. Callers must keep label domains finite (route
/// templates, not raw URLs).
pub trait MetricsBackend: Send + Sync {
    /// Record one outbound-call observation.
    fn record_active(
        &self,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        duration_secs: f64,
    );

    /// Record one inbound-call observation.
    fn record_passive(
        &self,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        status: &str,
        protocol: &str,
        duration_secs: f64,
    );

    /// The backend's own sampler for a call class, for deployments where
    /// sampling config lives with the backend.
    fn sampler(&self, class: &str) -> Arc<dyn Sampler>;

    /// Identity of the running process.
    fn server_info(&self) -> ServerInfo;
}

/// Backend that records nothing and samples nothing. Used to disable
/// metrics entirely; instrumented call sites pay only an interface call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

impl MetricsBackend for NoopBackend {
    fn record_active(&self, _: &str, _: &str, _: &str, _: &str, _: &str, _: f64) {}

    fn record_passive(&self, _: &str, _: &str, _: &str, _: &str, _: &str, _: f64) {}

    fn sampler(&self, _class: &str) -> Arc<dyn Sampler> {
        Arc::new(NeverSampler)
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo::default()
    }
}

/// One completed call, assembled just before the sampling decision and
/// discarded right after recording. `service` is the remote service on
/// active calls and the caller's identity on passive ones.
#[derive(Debug, Clone, Copy)]
pub struct CallRecord<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub method_type: &'a str,
    pub status: &'a str,
    pub protocol: &'a str,
    pub duration_secs: f64,
    pub error: Option<&'a CallError>,
}

/// Binds a backend to per-call-class samplers and times call invocations.
///
/// Shared freely across threads: all state is immutable after construction.
pub struct CallCollector {
    backend: Arc<dyn MetricsBackend>,
    samplers: HashMap<String, Arc<dyn Sampler>>,
    default_sampler: Arc<dyn Sampler>,
}

impl std::fmt::Debug for CallCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCollector").finish_non_exhaustive()
    }
}

impl CallCollector {
    /// Build a collector with one [`RatioSampler`] per ratio-table entry.
    /// Classes absent from the table fall back to a shared always-sampler.
    pub fn new(backend: Arc<dyn MetricsBackend>, opts: SamplerOptions) -> Self {
        let samplers: HashMap<String, Arc<dyn Sampler>> = opts
            .ratios
            .iter()
            .map(|(class, &pct)| {
                let sampler =
                    RatioSampler::new(opts.threshold_secs, pct, opts.on_error_sampled);
                (class.clone(), Arc::new(sampler) as Arc<dyn Sampler>)
            })
            .collect();

        info!(
            classes = samplers.len(),
            threshold_secs = opts.threshold_secs,
            on_error_sampled = opts.on_error_sampled,
            "call collector ready"
        );

        Self {
            backend,
            samplers,
            default_sampler: Arc::new(AlwaysSampler),
        }
    }

    /// The sampler for a call class. Unknown classes get the default
    /// always-sampler; this never fails.
    pub fn sampler(&self, class: &str) -> Arc<dyn Sampler> {
        self.samplers
            .get(class)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_sampler))
    }

    /// Identity of the running process, from the backend.
    pub fn server_info(&self) -> ServerInfo {
        self.backend.server_info()
    }

    /// Record one already-timed outbound observation, subject to the
    /// class's sampler. For adapters that manage their own clocks.
    pub fn record_active(&self, class: &str, record: &CallRecord<'_>) {
        if self
            .sampler(class)
            .should_sample(record.duration_secs, record.error)
        {
            self.backend.record_active(
                record.service,
                record.method,
                record.method_type,
                record.status,
                record.protocol,
                record.duration_secs,
            );
        }
    }

    /// Record one already-timed inbound observation, subject to the
    /// class's sampler.
    pub fn record_passive(&self, class: &str, record: &CallRecord<'_>) {
        if self
            .sampler(class)
            .should_sample(record.duration_secs, record.error)
        {
            self.backend.record_passive(
                record.service,
                record.method,
                record.method_type,
                record.status,
                record.protocol,
                record.duration_secs,
            );
        }
    }

    /// Time `invoke` around an outbound call and conditionally record it.
    ///
    /// The call runs exactly once, synchronously, on the calling thread.
    /// The reporter is returned untouched — the collector never intercepts
    /// the call's own outcome, it only observes it.
    pub fn record_active_and_next<R, F>(&self, class: &str, protocol: &str, invoke: F) -> R
    where
        R: ActiveReporter,
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let reporter = invoke();
        let duration_secs = start.elapsed().as_secs_f64();
        self.record_active(
            class,
            &CallRecord {
                service: reporter.passive_service(),
                method: reporter.mapping(),
                method_type: reporter.method(),
                status: reporter.status(),
                protocol,
                duration_secs,
                error: reporter.error(),
            },
        );
        reporter
    }

    /// Time `invoke` around an inbound call and conditionally record it.
    /// Symmetric to [`Self::record_active_and_next`].
    pub fn record_passive_and_next<R, F>(&self, class: &str, protocol: &str, invoke: F) -> R
    where
        R: PassiveReporter,
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let reporter = invoke();
        let duration_secs = start.elapsed().as_secs_f64();
        self.record_passive(
            class,
            &CallRecord {
                service: reporter.active_service(),
                method: reporter.mapping(),
                method_type: reporter.method(),
                status: reporter.status(),
                protocol,
                duration_secs,
                error: reporter.error(),
            },
        );
        reporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CallReport;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Observed {
        service: String,
        method: String,
        method_type: String,
        status: String,
        protocol: String,
        duration_secs: f64,
    }

    /// In-memory backend capturing every recorded observation.
    #[derive(Default)]
    struct RecordingBackend {
        active: Mutex<Vec<Observed>>,
        passive: Mutex<Vec<Observed>>,
    }

    impl RecordingBackend {
        fn observe(
            service: &str,
            method: &str,
            method_type: &str,
            status: &str,
            protocol: &str,
            duration_secs: f64,
        ) -> Observed {
            Observed {
                service: service.into(),
                method: method.into(),
                method_type: method_type.into(),
                status: status.into(),
                protocol: protocol.into(),
                duration_secs,
            }
        }
    }

    impl MetricsBackend for RecordingBackend {
        fn record_active(
            &self,
            passive_service: &str,
            passive_method: &str,
            method_type: &str,
            status: &str,
            protocol: &str,
            duration_secs: f64,
        ) {
            self.active.lock().unwrap().push(Self::observe(
                passive_service,
                passive_method,
                method_type,
                status,
                protocol,
                duration_secs,
            ));
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
            self.passive.lock().unwrap().push(Self::observe(
                active_service,
                passive_method,
                method_type,
                status,
                protocol,
                duration_secs,
            ));
        }

        fn sampler(&self, _class: &str) -> Arc<dyn Sampler> {
            Arc::new(AlwaysSampler)
        }

        fn server_info(&self) -> ServerInfo {
            ServerInfo::new("test-svc", "test-svc-0")
        }
    }

    fn ratios(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries
            .iter()
            .map(|&(k, v)| (k.to_string(), v))
            .collect()
    }

    fn ok_report() -> CallReport {
        CallReport {
            method: "GET".into(),
            status: "200".into(),
            mapping: "/orders/{id}".into(),
            service: "orders".into(),
            error: None,
        }
    }

    fn failed_report() -> CallReport {
        CallReport {
            status: "502".into(),
            error: Some(Box::new(std::io::Error::other("upstream down"))),
            ..ok_report()
        }
    }

    #[test]
    fn unknown_class_gets_default_always_sampler() {
        let collector = CallCollector::new(
            Arc::new(RecordingBackend::default()),
            SamplerOptions {
                ratios: ratios(&[("http_client", 0)]),
                ..SamplerOptions::default()
            },
        );
        assert!(collector.sampler("grpc_server").should_sample(0.0, None));
        assert!(!collector.sampler("http_client").should_sample(0.0, None));
    }

    #[test]
    fn ratio_zero_drops_fast_clean_calls_but_keeps_failures() {
        // Scenario A: ratio 0 for http_client, threshold 1s, errors sampled.
        let backend = Arc::new(RecordingBackend::default());
        let collector = CallCollector::new(
            backend.clone(),
            SamplerOptions {
                threshold_secs: 1.0,
                on_error_sampled: true,
                ratios: ratios(&[("http_client", 0)]),
            },
        );

        collector.record_active(
            "http_client",
            &CallRecord {
                service: "orders",
                method: "/orders/{id}",
                method_type: "GET",
                status: "200",
                protocol: "http",
                duration_secs: 0.2,
                error: None,
            },
        );
        assert!(backend.active.lock().unwrap().is_empty());

        let err = std::io::Error::other("upstream down");
        collector.record_active(
            "http_client",
            &CallRecord {
                service: "orders",
                method: "/orders/{id}",
                method_type: "GET",
                status: "502",
                protocol: "http",
                duration_secs: 0.2,
                error: Some(&err),
            },
        );

        let active = backend.active.lock().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].service, "orders");
        assert_eq!(active[0].status, "502");
    }

    #[test]
    fn slow_calls_recorded_regardless_of_ratio() {
        // Scenario B: empty ratio table, threshold 0.5s, 0.6s call.
        let backend = Arc::new(RecordingBackend::default());
        let collector = CallCollector::new(
            backend.clone(),
            SamplerOptions {
                threshold_secs: 0.5,
                ..SamplerOptions::default()
            },
        );

        collector.record_passive(
            "http_server",
            &CallRecord {
                service: "gateway",
                method: "/checkout",
                method_type: "POST",
                status: "200",
                protocol: "http",
                duration_secs: 0.6,
                error: None,
            },
        );

        let passive = backend.passive.lock().unwrap();
        assert_eq!(passive.len(), 1);
        assert_eq!(passive[0].service, "gateway");
        assert_eq!(passive[0].duration_secs, 0.6);
    }

    #[test]
    fn record_and_next_times_the_call_and_returns_the_reporter() {
        let backend = Arc::new(RecordingBackend::default());
        let collector =
            CallCollector::new(backend.clone(), SamplerOptions::default());

        let reporter = collector.record_active_and_next("http_client", "http", || {
            std::thread::sleep(std::time::Duration::from_millis(2));
            ok_report()
        });
        assert_eq!(ActiveReporter::status(&reporter), "200");

        let active = backend.active.lock().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].method_type, "GET");
        assert_eq!(active[0].method, "/orders/{id}");
        assert_eq!(active[0].protocol, "http");
        assert!(active[0].duration_secs > 0.0);
    }

    #[test]
    fn failed_call_error_passes_through_untouched() {
        let backend = Arc::new(RecordingBackend::default());
        let collector = CallCollector::new(
            backend.clone(),
            SamplerOptions {
                ratios: ratios(&[("grpc_server", 0)]),
                ..SamplerOptions::default()
            },
        );

        let reporter =
            collector.record_passive_and_next("grpc_server", "grpc", failed_report);
        // The caller still sees the failure even though recording was the
        // collector's concern.
        assert!(PassiveReporter::error(&reporter).is_some());
        // on_error_sampled defaults to true: the failure was recorded
        // despite the zero ratio.
        assert_eq!(backend.passive.lock().unwrap().len(), 1);
    }

    #[test]
    fn repeated_observations_are_not_deduplicated() {
        let backend = Arc::new(RecordingBackend::default());
        let collector =
            CallCollector::new(backend.clone(), SamplerOptions::default());

        for _ in 0..2 {
            collector.record_active_and_next("http_client", "http", ok_report);
        }
        assert_eq!(backend.active.lock().unwrap().len(), 2);
    }

    #[test]
    fn noop_backend_disables_everything() {
        let backend = NoopBackend;
        assert!(!backend.sampler("anything").should_sample(f64::INFINITY, None));
        assert_eq!(backend.server_info(), ServerInfo::default());
    }

    #[test]
    fn server_info_comes_from_backend() {
        let collector = CallCollector::new(
            Arc::new(RecordingBackend::default()),
            SamplerOptions::default(),
        );
        assert_eq!(collector.server_info().service_name, "test-svc");
    }
}
