//! Scenario configuration: the same all-optional input/resolve split
//! `icn_core::config` uses, one level up — a whole topology plus run
//! duration instead of a single component.

use std::time::Duration;

use icn_core::config::{ConsumerConfigInput, ShaperConfigInput};
use serde::Deserialize;

use crate::error::HarnessConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProducerLinkConfigInput {
    pub out_mbps: Option<f64>,
    pub in_mbps: Option<f64>,
    pub content_bytes: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ProducerLinkConfig {
    pub out_bps: f64,
    pub in_bps: f64,
    pub content_bytes: u32,
}

impl ProducerLinkConfigInput {
    fn resolve(self) -> ProducerLinkConfig {
        ProducerLinkConfig {
            out_bps: self.out_mbps.unwrap_or(10.0) * 1e6,
            in_bps: self.in_mbps.unwrap_or(10.0) * 1e6,
            content_bytes: self.content_bytes.unwrap_or(1100),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopologyConfigInput {
    pub seed: Option<u64>,
    pub consumer_to_forwarder_mbps: Option<f64>,
    pub link_delay_ms: Option<f64>,
    pub duration_s: Option<f64>,
    pub name_prefix: Option<String>,
    pub producers: Option<Vec<ProducerLinkConfigInput>>,
    pub shaper: Option<ShaperConfigInput>,
    pub consumer: Option<ConsumerConfigInput>,
}

#[derive(Debug, Clone)]
pub struct TopologyConfig {
    pub seed: u64,
    pub consumer_to_forwarder_bps: f64,
    pub link_delay: Duration,
    pub duration: Duration,
    pub name_prefix: Vec<u8>,
    pub producers: Vec<ProducerLinkConfig>,
    pub shaper: icn_core::config::ShaperConfig,
    pub consumer: icn_core::config::ConsumerConfig,
}

impl TopologyConfigInput {
    pub fn resolve(self) -> Result<TopologyConfig, HarnessConfigError> {
        let producers = self
            .producers
            .unwrap_or_else(|| vec![ProducerLinkConfigInput::default()])
            .into_iter()
            .map(ProducerLinkConfigInput::resolve)
            .collect::<Vec<_>>();
        if producers.is_empty() {
            return Err(HarnessConfigError::NoProducers);
        }
        Ok(TopologyConfig {
            seed: self.seed.unwrap_or(1),
            consumer_to_forwarder_bps: self.consumer_to_forwarder_mbps.unwrap_or(10.0) * 1e6,
            link_delay: Duration::from_secs_f64(self.link_delay_ms.unwrap_or(10.0) / 1000.0),
            duration: Duration::from_secs_f64(self.duration_s.unwrap_or(10.0)),
            name_prefix: self.name_prefix.unwrap_or_else(|| "/icn/content".to_string()).into_bytes(),
            producers,
            shaper: self.shaper.unwrap_or_default().resolve()?,
            consumer: self.consumer.unwrap_or_default().resolve(),
        })
    }
}

impl TopologyConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, HarnessConfigError> {
        if input.trim().is_empty() {
            return TopologyConfigInput::default().resolve();
        }
        let parsed: TopologyConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_resolves_with_one_default_producer() {
        let cfg = TopologyConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.producers.len(), 1);
        assert_eq!(cfg.seed, 1);
    }

    #[test]
    fn parses_multiple_producers() {
        let toml = r#"
            seed = 42
            [[producers]]
            out_mbps = 5.0
            [[producers]]
            out_mbps = 1.0
            content_bytes = 500
        "#;
        let cfg = TopologyConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.producers.len(), 2);
        assert_eq!(cfg.producers[0].out_bps, 5.0e6);
        assert_eq!(cfg.producers[1].content_bytes, 500);
    }

    #[test]
    fn rejects_empty_producer_list() {
        let toml = "producers = []";
        let err = TopologyConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, HarnessConfigError::NoProducers));
    }
}
