//! Message counters for long-lived streaming calls.
//!
//! Streams are not measured as one duration observation: the adapter
//! obtains counters before the stream begins and increments them on every
//! message for the stream's lifetime. No sampling applies here — counter
//! increments are cheap; sampling is reserved for duration histograms.
//!
//! A counter pair is owned exclusively by the stream wrapper that created
//! it. Sends and receives are serialized per stream by HTTP/gRPC semantics,
//! so the pair is never incremented concurrently.

/// Status label for messages on a healthy stream.
pub const STREAM_STATUS_OK: &str = "OK";
/// Status label for messages tied to a stream error. End-of-stream on
/// receive is not an error.
pub const STREAM_STATUS_ERROR: &str = "ERROR";

/// A sent/received counter pair bound to one fixed label tuple.
pub trait StreamCounter: Send {
    fn inc_sent(&self);
    fn inc_received(&self);
}

/// Produces per-stream counter pairs for active (client) and passive
/// (server) streams.
pub trait StreamCallCollector: Send + Sync {
    /// Counters for an outbound stream, labeled with the remote service.
    fn active_stream_counter(
        &self,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
        status: &str,
    ) -> Box<dyn StreamCounter>;

    /// Counters for an inbound stream, labeled with the caller's identity.
    fn passive_stream_counter(
        &self,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
        status: &str,
    ) -> Box<dyn StreamCounter>;
}

/// The pair of counter pairs a stream wrapper holds: one for messages on
/// the success path, one for messages tied to errors.
pub struct OutcomeCounters {
    pub ok: Box<dyn StreamCounter>,
    pub err: Box<dyn StreamCounter>,
}

impl OutcomeCounters {
    /// Obtain OK/ERROR counter pairs for an outbound stream.
    pub fn active(
        collector: &dyn StreamCallCollector,
        passive_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
    ) -> Self {
        Self {
            ok: collector.active_stream_counter(
                passive_service,
                passive_method,
                method_type,
                protocol,
                STREAM_STATUS_OK,
            ),
            err: collector.active_stream_counter(
                passive_service,
                passive_method,
                method_type,
                protocol,
                STREAM_STATUS_ERROR,
            ),
        }
    }

    /// Obtain OK/ERROR counter pairs for an inbound stream.
    pub fn passive(
        collector: &dyn StreamCallCollector,
        active_service: &str,
        passive_method: &str,
        method_type: &str,
        protocol: &str,
    ) -> Self {
        Self {
            ok: collector.passive_stream_counter(
                active_service,
                passive_method,
                method_type,
                protocol,
                STREAM_STATUS_OK,
            ),
            err: collector.passive_stream_counter(
                active_service,
                passive_method,
                method_type,
                protocol,
                STREAM_STATUS_ERROR,
            ),
        }
    }
}

/// Stream collector that counts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStreamCallCollector;

impl StreamCallCollector for NoopStreamCallCollector {
    fn active_stream_counter(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
    ) -> Box<dyn StreamCounter> {
        Box::new(NoopStreamCounter)
    }

    fn passive_stream_counter(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
    ) -> Box<dyn StreamCounter> {
        Box::new(NoopStreamCounter)
    }
}

/// Counter pair that ignores every increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStreamCounter;

impl StreamCounter for NoopStreamCounter {
    fn inc_sent(&self) {}
    fn inc_received(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingPair {
        sent: AtomicU64,
        received: AtomicU64,
    }

    struct TestPair(Arc<CountingPair>);

    impl StreamCounter for TestPair {
        fn inc_sent(&self) {
            self.0.sent.fetch_add(1, Ordering::Relaxed);
        }
        fn inc_received(&self) {
            self.0.received.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stream collector handing out shared pairs keyed by (direction, status).
    #[derive(Default)]
    struct TestStreamCollector {
        pairs: Mutex<HashMap<String, Arc<CountingPair>>>,
    }

    impl TestStreamCollector {
        fn pair(&self, key: String) -> Box<dyn StreamCounter> {
            let pair = Arc::clone(
                self.pairs
                    .lock()
                    .unwrap()
                    .entry(key)
                    .or_default(),
            );
            Box::new(TestPair(pair))
        }

        fn counts(&self, key: &str) -> (u64, u64) {
            let pairs = self.pairs.lock().unwrap();
            let pair = pairs.get(key).expect("pair never created");
            (
                pair.sent.load(Ordering::Relaxed),
                pair.received.load(Ordering::Relaxed),
            )
        }
    }

    impl StreamCallCollector for TestStreamCollector {
        fn active_stream_counter(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
            status: &str,
        ) -> Box<dyn StreamCounter> {
            self.pair(format!("active/{status}"))
        }

        fn passive_stream_counter(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
            status: &str,
        ) -> Box<dyn StreamCounter> {
            self.pair(format!("passive/{status}"))
        }
    }

    #[test]
    fn bidi_stream_counts_by_outcome() {
        // Scenario: 3 successful sends, 1 failed receive.
        let collector = TestStreamCollector::default();
        let counters =
            OutcomeCounters::active(&collector, "orders", "/orders.Watch", "bidi_stream", "grpc");

        for _ in 0..3 {
            counters.ok.inc_sent();
        }
        counters.err.inc_received();

        assert_eq!(collector.counts("active/OK"), (3, 0));
        assert_eq!(collector.counts("active/ERROR"), (0, 1));
    }

    #[test]
    fn passive_counters_use_passive_labels() {
        let collector = TestStreamCollector::default();
        let counters =
            OutcomeCounters::passive(&collector, "gateway", "/orders.Watch", "server_stream", "grpc");
        counters.ok.inc_received();

        assert_eq!(collector.counts("passive/OK"), (0, 1));
    }

    #[test]
    fn noop_counters_accept_increments() {
        let counters = OutcomeCounters::active(
            &NoopStreamCallCollector,
            "orders",
            "/orders.Watch",
            "client_stream",
            "grpc",
        );
        counters.ok.inc_sent();
        counters.err.inc_received();
    }
}
