//! Drop and configuration error taxonomy.
//!
//! A shaper admission failure is an expected, traced event in a lossy
//! network, not a process error — see [`DropReason`]. Genuine
//! programming/config errors (e.g. an out-of-range `headroom`) use
//! [`ConfigError`] instead.

use thiserror::Error;

/// Which AQM discipline produced a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqmKind {
    Pie,
    CoDel,
}

/// Why an interest admission failed at a shaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("interest queue full")]
    QueueFull,
    #[error("AQM early drop ({0:?})")]
    AqmDrop(AqmKind),
    #[error("malformed packet header")]
    MalformedHeader,
}

/// A configuration value outside its valid range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
