//! Typed configuration for the shaper and consumer, resolved from an
//! all-optional `serde`-deserialized input twin against component
//! defaults — the same input/resolve split used throughout this
//! workspace's own configuration layer.

use serde::Deserialize;

use crate::error::ConfigError;

/// Active queue management discipline selecting which admission policy
/// `Shaper::admit` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AqmModeInput {
    #[default]
    DropTail,
    Pie,
    CoDel,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShaperConfigInput {
    pub max_interest: Option<usize>,
    pub headroom: Option<f64>,
    pub update_interval_s: Option<f64>,
    pub queue_mode: Option<AqmModeInput>,
    pub delay_target_s: Option<f64>,
    pub max_burst_s: Option<f64>,
    pub delay_observe_interval_s: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsumerConfigInput {
    pub probe_factor: Option<f64>,
    pub initial_frequency_hz: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaperConfig {
    pub max_interest: usize,
    pub headroom: f64,
    pub update_interval_s: f64,
    pub queue_mode: AqmModeInput,
    pub delay_target_s: f64,
    pub max_burst_s: f64,
    pub delay_observe_interval_s: f64,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            max_interest: 100,
            headroom: 0.98,
            update_interval_s: 0.1,
            queue_mode: AqmModeInput::DropTail,
            delay_target_s: 0.02,
            max_burst_s: 0.1,
            delay_observe_interval_s: 0.1,
        }
    }
}

impl ShaperConfigInput {
    pub fn resolve(self) -> Result<ShaperConfig, ConfigError> {
        let defaults = ShaperConfig::default();
        let headroom = self.headroom.unwrap_or(defaults.headroom);
        if !(0.0..=1.0).contains(&headroom) {
            return Err(ConfigError::OutOfRange {
                field: "headroom",
                range: "[0.0, 1.0]",
                value: headroom,
            });
        }
        Ok(ShaperConfig {
            max_interest: self.max_interest.unwrap_or(defaults.max_interest).max(1),
            headroom,
            update_interval_s: self
                .update_interval_s
                .unwrap_or(defaults.update_interval_s),
            queue_mode: self.queue_mode.unwrap_or(defaults.queue_mode),
            delay_target_s: self.delay_target_s.unwrap_or(defaults.delay_target_s),
            max_burst_s: self.max_burst_s.unwrap_or(defaults.max_burst_s),
            delay_observe_interval_s: self
                .delay_observe_interval_s
                .unwrap_or(defaults.delay_observe_interval_s),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    pub probe_factor: f64,
    pub initial_frequency_hz: f64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            probe_factor: 10.0,
            initial_frequency_hz: 1.0,
        }
    }
}

impl ConsumerConfigInput {
    pub fn resolve(self) -> ConsumerConfig {
        let defaults = ConsumerConfig::default();
        ConsumerConfig {
            probe_factor: self.probe_factor.unwrap_or(defaults.probe_factor),
            initial_frequency_hz: self
                .initial_frequency_hz
                .unwrap_or(defaults.initial_frequency_hz)
                .max(0.001),
        }
    }
}

impl ShaperConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(ShaperConfig::default());
        }
        let parsed: ShaperConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_resolves_to_defaults() {
        let cfg = ShaperConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ShaperConfig::default());
    }

    #[test]
    fn parses_partial_overrides() {
        let toml = r#"
            max_interest = 50
            queue_mode = "pie"
            delay_target_s = 0.03
        "#;
        let cfg = ShaperConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.max_interest, 50);
        assert_eq!(cfg.queue_mode, AqmModeInput::Pie);
        assert_eq!(cfg.delay_target_s, 0.03);
        assert_eq!(cfg.headroom, ShaperConfig::default().headroom);
    }

    #[test]
    fn rejects_out_of_range_headroom() {
        let toml = "headroom = 1.5";
        let err = ShaperConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "headroom", .. }));
    }

    #[test]
    fn consumer_defaults() {
        let cfg = ConsumerConfigInput::default().resolve();
        assert_eq!(cfg.probe_factor, 10.0);
        assert_eq!(cfg.initial_frequency_hz, 1.0);
    }
}
