//! callgrid-core — call metrics collection with adaptive sampling.
//!
//! Instruments inbound ("passive") and outbound ("active") calls of a
//! networked service and turns each completed call into at most one
//! recorded observation, gated by a per-call-class sampler so high-volume
//! deployments do not pay full recording cost on every call.
//!
//! # Architecture
//!
//! ```text
//! CallCollector
//!   ├── record_active_and_next() ← wraps one outbound call
//!   ├── record_passive_and_next() ← wraps one inbound call
//!   ├── sampler(class) → per-class RatioSampler (AlwaysSampler default)
//!   └── MetricsBackend ← pluggable sink (Prometheus, noop, …)
//!
//! StreamCallCollector
//!   └── per-stream sent/received counter pairs, never sampled
//! ```
//!
//! Transport adapters (HTTP clients, gRPC interceptors, …) live outside
//! this crate; they supply a [`reporter`] describing each finished call and
//! otherwise never touch the recording path. Everything here is immutable
//! after construction and safe for concurrent use without locking.

pub mod collector;
pub mod config;
pub mod error;
pub mod reporter;
pub mod sampler;
pub mod server_info;
pub mod stream;

pub use collector::{CallCollector, CallRecord, MetricsBackend, NoopBackend};
pub use config::{BackendKind, MetricsOptions, SamplerOptions};
pub use error::{ConfigError, ConfigResult};
pub use reporter::{
    ACTIVE_SERVICE_HEADER, ActiveReporter, CallReport, MethodType, PassiveReporter, Rewrite,
};
pub use sampler::{AlwaysSampler, CallError, NeverSampler, RatioSampler, Sampler};
pub use server_info::ServerInfo;
pub use stream::{
    NoopStreamCallCollector, NoopStreamCounter, OutcomeCounters, STREAM_STATUS_ERROR,
    STREAM_STATUS_OK, StreamCallCollector, StreamCounter,
};
