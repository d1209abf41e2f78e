//! Error types for CallGrid configuration loading.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading collector configuration.
///
/// These are startup errors: a collector must never be constructed from a
/// configuration that failed to parse.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid sampling threshold {value:?}: expected seconds as a number")]
    InvalidThreshold { value: String },

    #[error("invalid on-error-sampled flag {value:?}: expected a boolean")]
    InvalidFlag { value: String },

    #[error("malformed ratio table entry {entry:?}: expected key=percent")]
    MalformedRatioEntry { entry: String },

    #[error("invalid ratio percent {value:?} for class {class:?}: expected an integer")]
    InvalidRatio { class: String, value: String },
}
