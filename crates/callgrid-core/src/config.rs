//! Construction-time collector configuration.
//!
//! Options are loaded once at startup, typically from the environment, and
//! handed to the collector constructors. Malformed values are hard errors:
//! a collector is never built from configuration that failed to parse.
//!
//! Environment surface:
//!
//! - `METRICS_COLLECTOR_TYPE` — `noop`, `prometheus_histogram` (default),
//!   or `prometheus_counter`
//! - `METRICS_SAMPLER_THRESHOLD_SEC` — slow-call threshold, default `1`
//! - `METRICS_SAMPLER_ONERROR_SAMPLED` — default `true`
//! - `METRICS_SAMPLER_RATIO_MAP` — `class=percent` pairs, e.g.
//!   `http_client=20,sql=10`
//! - `METRICS_SERVICE_NAME` / `METRICS_SERVICE_INSTANCE` — identity
//!   overrides on top of pod-environment discovery

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::server_info::ServerInfo;

pub const ENV_COLLECTOR_TYPE: &str = "METRICS_COLLECTOR_TYPE";
pub const ENV_THRESHOLD_SEC: &str = "METRICS_SAMPLER_THRESHOLD_SEC";
pub const ENV_ONERROR_SAMPLED: &str = "METRICS_SAMPLER_ONERROR_SAMPLED";
pub const ENV_RATIO_MAP: &str = "METRICS_SAMPLER_RATIO_MAP";
pub const ENV_SERVICE_NAME: &str = "METRICS_SERVICE_NAME";
pub const ENV_SERVICE_INSTANCE: &str = "METRICS_SERVICE_INSTANCE";

/// Which concrete backend the factory should build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Noop,
    #[default]
    PrometheusHistogram,
    PrometheusCounter,
}

impl BackendKind {
    /// Parse a backend name; unknown values fall back to the histogram
    /// default rather than failing.
    pub fn parse(s: &str) -> Self {
        match s {
            "noop" => BackendKind::Noop,
            "prometheus_counter" => BackendKind::PrometheusCounter,
            _ => BackendKind::PrometheusHistogram,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Noop => "noop",
            BackendKind::PrometheusHistogram => "prometheus_histogram",
            BackendKind::PrometheusCounter => "prometheus_counter",
        }
    }
}

/// Sampling policy shared by every per-class sampler plus the per-class
/// ratio table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerOptions {
    /// Calls slower than this are always recorded.
    pub threshold_secs: f64,
    /// Failed calls are always recorded.
    pub on_error_sampled: bool,
    /// Call class → sampling percentage in `[0, 100]`. Classes absent from
    /// the table get an always-sampler.
    pub ratios: HashMap<String, i64>,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            threshold_secs: 1.0,
            on_error_sampled: true,
            ratios: HashMap::new(),
        }
    }
}

/// Everything needed to construct a collector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsOptions {
    pub sampler: SamplerOptions,
    pub server_info: ServerInfo,
    pub backend: BackendKind,
}

impl MetricsOptions {
    /// Load options from the process environment.
    ///
    /// Identity discovery starts from the pod environment; the
    /// `METRICS_SERVICE_NAME` / `METRICS_SERVICE_INSTANCE` variables
    /// override individual fields.
    pub fn from_env() -> ConfigResult<Self> {
        let backend = match env::var(ENV_COLLECTOR_TYPE) {
            Ok(s) if !s.is_empty() => BackendKind::parse(&s),
            _ => BackendKind::default(),
        };

        let threshold_secs = match env::var(ENV_THRESHOLD_SEC) {
            Ok(s) if !s.is_empty() => parse_threshold(&s)?,
            _ => SamplerOptions::default().threshold_secs,
        };

        let on_error_sampled = match env::var(ENV_ONERROR_SAMPLED) {
            Ok(s) if !s.is_empty() => parse_flag(&s)?,
            _ => true,
        };

        let ratios = match env::var(ENV_RATIO_MAP) {
            Ok(s) => parse_ratio_map(&s)?,
            _ => HashMap::new(),
        };

        let mut server_info = ServerInfo::from_k8s_env();
        if let Ok(name) = env::var(ENV_SERVICE_NAME) {
            if !name.is_empty() {
                server_info.service_name = name;
            }
        }
        if let Ok(instance) = env::var(ENV_SERVICE_INSTANCE) {
            if !instance.is_empty() {
                server_info.service_instance = instance;
            }
        }

        debug!(
            backend = backend.as_str(),
            threshold_secs,
            on_error_sampled,
            classes = ratios.len(),
            "loaded metrics options from environment"
        );

        Ok(Self {
            sampler: SamplerOptions {
                threshold_secs,
                on_error_sampled,
                ratios,
            },
            server_info,
            backend,
        })
    }
}

/// Parse the slow-call threshold. Negative values clamp to zero, which
/// makes every positive duration count as slow.
fn parse_threshold(s: &str) -> ConfigResult<f64> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidThreshold {
            value: s.to_string(),
        })?;
    Ok(secs.max(0.0))
}

fn parse_flag(s: &str) -> ConfigResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            value: s.to_string(),
        }),
    }
}

/// Parse a `class=percent,class=percent` ratio table. Empty segments are
/// skipped; percent values outside `[0, 100]` are accepted here and clamped
/// at sampler construction.
fn parse_ratio_map(s: &str) -> ConfigResult<HashMap<String, i64>> {
    let mut ratios = HashMap::new();
    for entry in s.split(',') {
        if entry.trim().is_empty() {
            continue;
        }
        let Some((class, pct)) = entry.split_once('=') else {
            return Err(ConfigError::MalformedRatioEntry {
                entry: entry.to_string(),
            });
        };
        let pct: i64 = pct.trim().parse().map_err(|_| ConfigError::InvalidRatio {
            class: class.trim().to_string(),
            value: pct.trim().to_string(),
        })?;
        ratios.insert(class.trim().to_string(), pct);
    }
    Ok(ratios)
}
