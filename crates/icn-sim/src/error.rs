//! Harness-level error types. Config parsing/resolution errors are typed
//! (mirroring `icn_core::error::ConfigError`); everything above the
//! scenario-run boundary is collapsed into `anyhow::Error` in `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessConfigError {
    #[error("topology must declare at least one producer")]
    NoProducers,
    #[error(transparent)]
    Shaper(#[from] icn_core::error::ConfigError),
    #[error("invalid scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
