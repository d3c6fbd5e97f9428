//! Integration tests for the six built-in scenarios, each deterministic
//! via a fixed RNG seed.

use icn_core::clock::Time;
use icn_sim::scenario;

fn at_secs(s: f64) -> Time {
    Time::from_nanos((s * 1e9) as u64)
}

#[test]
fn single_link_idle_has_no_drops_and_delivers_content() {
    let mut sim = scenario::single_link_idle(1);
    sim.run_until(at_secs(5.0));
    assert_eq!(sim.stats.drops.values().sum::<u64>(), 0);
    assert!(sim.stats.content_received > 0);
}

#[test]
fn asymmetric_reverse_congestion_mostly_avoids_tail_drops() {
    let mut sim = scenario::asymmetric_reverse_congestion(2);
    sim.run_until(at_secs(5.0));
    assert!(sim.stats.interests_sent > 0);
    assert!(sim.stats.content_received > 0);
    let drops: u64 = sim.stats.drops.values().sum();
    assert!(
        drops < sim.stats.interests_sent,
        "rate pacing should keep most interests from being tail-dropped"
    );
}

#[test]
fn pie_under_overload_drops_and_keeps_delivering() {
    let mut sim = scenario::pie_under_overload(3);
    sim.run_until(at_secs(10.0));
    assert!(sim.stats.content_received > 0);
    assert!(
        sim.stats.drops.values().sum::<u64>() > 0,
        "2x R_max offered load should trigger PIE drops"
    );
}

#[test]
fn codel_control_drops_and_keeps_delivering() {
    let mut sim = scenario::codel_control(4);
    sim.run_until(at_secs(10.0));
    assert!(sim.stats.content_received > 0);
    assert!(
        sim.stats.drops.values().sum::<u64>() > 0,
        "sustained overload should push CoDel into dropping at least once"
    );
}

#[test]
fn congestion_aware_rerouting_settles_on_the_healthy_face() {
    let mut sim = scenario::congestion_aware_rerouting(5);
    sim.run_until(at_secs(2.0));
    let ordering = sim.fib_ordering();
    assert_eq!(
        ordering[0],
        scenario::rerouting_healthy_face(),
        "the bottlenecked face should have been passed over by the time rerouting settles"
    );
}

#[test]
fn rate_feedback_slow_start_grows_past_its_initial_frequency() {
    let mut sim = scenario::rate_feedback_slow_start(6);
    let initial = sim.consumer_frequency_hz(0);
    sim.run_until(at_secs(3.0));
    assert!(
        sim.consumer_frequency_hz(0) > initial,
        "consumer frequency should have climbed from its 1 Hz start"
    );
}

#[test]
fn scenarios_are_deterministic_for_a_given_seed() {
    let mut a = scenario::pie_under_overload(42);
    let mut b = scenario::pie_under_overload(42);
    a.run_until(at_secs(3.0));
    b.run_until(at_secs(3.0));
    assert_eq!(a.stats.interests_sent, b.stats.interests_sent);
    assert_eq!(a.stats.content_received, b.stats.content_received);
    assert_eq!(a.stats.drops, b.stats.drops);
}
