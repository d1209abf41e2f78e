//! Sampling decision functions.
//!
//! A [`Sampler`] decides whether one completed call's observation is
//! forwarded to the metrics backend. The decision is pure and side-effect
//! free; samplers are built once per call class and shared read-only across
//! arbitrarily many call sites.

use rand::Rng;

/// Error view handed to the sampling decision.
///
/// The core never owns the wrapped call's error; it only inspects whether
/// one occurred.
pub type CallError = dyn std::error::Error + Send + Sync;

/// Decides whether a completed call's metrics should be recorded.
pub trait Sampler: Send + Sync {
    /// Returns `true` if the observation should be forwarded to the backend.
    fn should_sample(&self, duration_secs: f64, error: Option<&CallError>) -> bool;
}

/// The general-purpose ratio/threshold sampler.
///
/// Decision order, first match wins:
///
/// 1. The call failed and `on_error_sampled` is set → sample. Failures are
///    never dropped by ratio sampling when error sampling is enabled.
/// 2. The call took longer than `threshold_secs` → sample. Latency outliers
///    are never lost to the random draw.
/// 3. Ratio draw: a uniform integer in `[0, 100]`, sampled iff the draw is
///    at most the configured ratio. Ratio 0 short-circuits to `false` and
///    ratio 100 to `true` without drawing.
///
/// A threshold of zero or below makes every positive duration pass gate 2,
/// turning the sampler into an always-sampler.
#[derive(Debug, Clone)]
pub struct RatioSampler {
    threshold_secs: f64,
    on_error_sampled: bool,
    ratio: u8,
}

impl RatioSampler {
    /// Create a sampler. `ratio` is a percentage and is clamped into
    /// `[0, 100]`; out-of-range values are not an error.
    pub fn new(threshold_secs: f64, ratio: i64, on_error_sampled: bool) -> Self {
        Self {
            threshold_secs,
            on_error_sampled,
            ratio: ratio.clamp(0, 100) as u8,
        }
    }

    /// The clamped sampling ratio in percent.
    pub fn ratio(&self) -> u8 {
        self.ratio
    }
}

impl Sampler for RatioSampler {
    fn should_sample(&self, duration_secs: f64, error: Option<&CallError>) -> bool {
        if error.is_some() && self.on_error_sampled {
            return true;
        }
        if duration_secs > self.threshold_secs {
            return true;
        }
        match self.ratio {
            0 => false,
            100 => true,
            // thread-local generator: no shared lock on the hot path
            ratio => rand::thread_rng().gen_range(0..=100u8) <= ratio,
        }
    }
}

/// Samples every observation. Used as the default when a call class has no
/// configured ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSampler;

impl Sampler for AlwaysSampler {
    fn should_sample(&self, _duration_secs: f64, _error: Option<&CallError>) -> bool {
        true
    }
}

/// Samples nothing. Returned by disabled backends so instrumented call
/// sites pay only an interface call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSampler;

impl Sampler for NeverSampler {
    fn should_sample(&self, _duration_secs: f64, _error: Option<&CallError>) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boom() -> std::io::Error {
        std::io::Error::other("boom")
    }

    #[test]
    fn ratio_zero_never_samples_fast_clean_calls() {
        let s = RatioSampler::new(1.0, 0, false);
        for _ in 0..1000 {
            assert!(!s.should_sample(0.5, None));
        }
    }

    #[test]
    fn slow_calls_always_sampled() {
        let s = RatioSampler::new(0.5, 0, false);
        let err = boom();
        for _ in 0..1000 {
            assert!(s.should_sample(0.6, None));
            assert!(s.should_sample(0.6, Some(&err)));
        }
    }

    #[test]
    fn errors_always_sampled_when_enabled() {
        let s = RatioSampler::new(10.0, 0, true);
        let err = boom();
        for _ in 0..1000 {
            assert!(s.should_sample(0.0, Some(&err)));
        }
    }

    #[test]
    fn errors_follow_ratio_when_disabled() {
        // error sampling off, ratio 0, fast call: the error alone must not
        // force a sample.
        let s = RatioSampler::new(10.0, 0, false);
        let err = boom();
        assert!(!s.should_sample(0.1, Some(&err)));
    }

    #[test]
    fn ratio_clamps_above_and_below() {
        let high = RatioSampler::new(10.0, 150, false);
        assert_eq!(high.ratio(), 100);
        for _ in 0..1000 {
            assert!(high.should_sample(0.1, None));
        }

        let low = RatioSampler::new(10.0, -5, false);
        assert_eq!(low.ratio(), 0);
        for _ in 0..1000 {
            assert!(!low.should_sample(0.1, None));
        }
    }

    #[test]
    fn zero_threshold_samples_every_positive_duration() {
        let s = RatioSampler::new(0.0, 0, false);
        assert!(s.should_sample(0.000001, None));
    }

    #[test]
    fn partial_ratio_samples_some_but_not_all() {
        let s = RatioSampler::new(10.0, 50, false);
        let sampled = (0..10_000)
            .filter(|_| s.should_sample(0.1, None))
            .count();
        // 50% ratio: statistically impossible to hit 0 or 10000.
        assert!(sampled > 0 && sampled < 10_000, "sampled {sampled}");
    }

    #[test]
    fn always_sampler_fixed_point() {
        let err = boom();
        assert!(AlwaysSampler.should_sample(0.0, None));
        assert!(AlwaysSampler.should_sample(f64::INFINITY, Some(&err)));
    }

    #[test]
    fn never_sampler_fixed_point() {
        let err = boom();
        assert!(!NeverSampler.should_sample(0.0, None));
        assert!(!NeverSampler.should_sample(f64::INFINITY, Some(&err)));
    }
}
