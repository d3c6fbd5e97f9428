//! The six built-in scenarios from the testable-properties table, each
//! deterministic via a fixed RNG seed — this harness's equivalent of a
//! `scenario_is_deterministic_for_seed` fixture set.

use std::time::Duration;

use icn_core::config::{AqmModeInput, ConsumerConfig, ShaperConfig};
use icn_core::face::FaceId;

use crate::topology::{Simulation, TopologyPlan};

/// Names accepted by the CLI's `run` subcommand, in the order they
/// appear in the testable-properties table.
pub const NAMES: &[&str] = &[
    "single-link-idle",
    "asymmetric-reverse-congestion",
    "pie-under-overload",
    "codel-control",
    "congestion-aware-rerouting",
    "rate-feedback-slow-start",
];

pub fn build(name: &str, seed: u64) -> Option<Simulation> {
    match name {
        "single-link-idle" => Some(single_link_idle(seed)),
        "asymmetric-reverse-congestion" => Some(asymmetric_reverse_congestion(seed)),
        "pie-under-overload" => Some(pie_under_overload(seed)),
        "codel-control" => Some(codel_control(seed)),
        "congestion-aware-rerouting" => Some(congestion_aware_rerouting(seed)),
        "rate-feedback-slow-start" => Some(rate_feedback_slow_start(seed)),
        _ => None,
    }
}

/// One 1 Mbps link, one consumer at 1 interest/s, a 1000-byte producer.
/// Below the shaping rate: the shaper stays `OPEN` and gaps go
/// unenforced.
pub fn single_link_idle(seed: u64) -> Simulation {
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 1_000_000.0,
        forwarder_out_rates: &[(1_000_000.0, 1_000_000.0)],
        producer_content_bytes: &[1000],
        link_delay: Duration::from_millis(5),
        shaper_cfg: ShaperConfig::default(),
        forwarder_out_shaper_cfg: &[],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 1.0,
        },
        name_prefix: b"/icn/idle",
    })
}

/// `C_out = 10 Mbps`, `C_in = 1 Mbps`, a heavy one-way consumer. The
/// bandwidth-balance formula should keep emitted interests at or below
/// `R_max = C_in / r1` within `headroom`.
pub fn asymmetric_reverse_congestion(seed: u64) -> Simulation {
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 10_000_000.0,
        forwarder_out_rates: &[(10_000_000.0, 1_000_000.0)],
        producer_content_bytes: &[1000],
        link_delay: Duration::from_millis(5),
        shaper_cfg: ShaperConfig::default(),
        forwarder_out_shaper_cfg: &[],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 1000.0,
        },
        name_prefix: b"/icn/asym",
    })
}

/// Offered load held at roughly 2x `R_max` with `queueMode = PIE,
/// delayTarget = 20ms`; steady-state queueing delay should settle near
/// the target with `dropProb > 0`.
pub fn pie_under_overload(seed: u64) -> Simulation {
    let shaper_cfg = ShaperConfig {
        queue_mode: AqmModeInput::Pie,
        delay_target_s: 0.02,
        max_interest: 200,
        ..ShaperConfig::default()
    };
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 1_000_000.0,
        forwarder_out_rates: &[(1_000_000.0, 1_000_000.0)],
        producer_content_bytes: &[1000],
        link_delay: Duration::from_millis(5),
        shaper_cfg,
        forwarder_out_shaper_cfg: &[],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 2000.0,
        },
        name_prefix: b"/icn/pie",
    })
}

/// Same offered load as [`pie_under_overload`], with `queueMode = CoDel`.
pub fn codel_control(seed: u64) -> Simulation {
    let shaper_cfg = ShaperConfig {
        queue_mode: AqmModeInput::CoDel,
        delay_target_s: 0.02,
        delay_observe_interval_s: 0.1,
        max_interest: 200,
        ..ShaperConfig::default()
    };
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 1_000_000.0,
        forwarder_out_rates: &[(1_000_000.0, 1_000_000.0)],
        producer_content_bytes: &[1000],
        link_delay: Duration::from_millis(5),
        shaper_cfg,
        forwarder_out_shaper_cfg: &[],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 2000.0,
        },
        name_prefix: b"/icn/codel",
    })
}

/// Two equal-rank FIB faces; face A is bottlenecked to a one-packet
/// queue so it saturates almost immediately. The strategy should bump
/// A's `cngLevel` on each blocked attempt and settle on B.
pub fn congestion_aware_rerouting(seed: u64) -> Simulation {
    let healthy = ShaperConfig::default();
    let bottlenecked = ShaperConfig {
        max_interest: 1,
        ..ShaperConfig::default()
    };
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 10_000_000.0,
        forwarder_out_rates: &[(1_000.0, 1_000.0), (10_000_000.0, 10_000_000.0)],
        producer_content_bytes: &[1000, 1000],
        link_delay: Duration::from_millis(5),
        shaper_cfg: healthy.clone(),
        forwarder_out_shaper_cfg: &[Some(bottlenecked), Some(healthy)],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 50.0,
        },
        name_prefix: b"/icn/reroute",
    })
}

/// Producer serving at a steady 100 content/s; the consumer starts at 1
/// Hz and should roughly double each observation until it catches the
/// producer's rate, then settle at `incomingDataFrequency + probeFactor`.
pub fn rate_feedback_slow_start(seed: u64) -> Simulation {
    Simulation::new(TopologyPlan {
        seed,
        consumer_to_forwarder_bps: 10_000_000.0,
        forwarder_out_rates: &[(10_000_000.0, 10_000_000.0)],
        producer_content_bytes: &[1000],
        link_delay: Duration::from_millis(1),
        shaper_cfg: ShaperConfig::default(),
        forwarder_out_shaper_cfg: &[],
        consumer_cfg: ConsumerConfig {
            probe_factor: 10.0,
            initial_frequency_hz: 1.0,
        },
        name_prefix: b"/icn/slowstart",
    })
}

/// Face B's id in [`congestion_aware_rerouting`]'s FIB — the face the
/// strategy is expected to settle on.
pub fn rerouting_healthy_face() -> FaceId {
    FaceId::new(4)
}
