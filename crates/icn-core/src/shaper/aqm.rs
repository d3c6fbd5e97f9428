//! Active queue management disciplines: DropTail (no state), PIE, and
//! CoDel. Each exposes an admission check and a dequeue-time update,
//! mirroring the two call sites in `Shaper::enqueue`/`Shaper::dequeue`.

use std::time::Duration;

use rand::Rng;

use crate::clock::Time;

/// PIE controller state (RFC 8033-style proportional-integral drop
/// probability), recomputed on a 30ms periodic tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PieState {
    pub old_delay_s: f64,
    pub drop_prob: f64,
    dq_count: i64,
    avg_dq_rate: f64,
    pub burst_allowance_s: f64,
    dq_start: Time,
}

impl PieState {
    pub fn new(max_burst_s: f64) -> Self {
        Self {
            old_delay_s: 0.0,
            drop_prob: 0.0,
            dq_count: -1,
            avg_dq_rate: 0.0,
            burst_allowance_s: max_burst_s,
            dq_start: Time::ZERO,
        }
    }

    /// `burstAllowance <= 0 AND NOT (oldDelay < target/2 AND dropProb < 0.2)`
    /// gates a coin flip against `drop_prob`; otherwise admission is free.
    pub fn should_admit(&self, rng: &mut impl Rng, delay_target_s: f64) -> bool {
        let exempt = self.old_delay_s < delay_target_s / 2.0 && self.drop_prob < 0.2;
        if self.burst_allowance_s <= 0.0 && !exempt {
            let u: f64 = rng.random();
            u >= self.drop_prob
        } else {
            true
        }
    }

    /// Drives the `avg_dq_rate` measurement cycle: a window of 10
    /// dequeues samples the instantaneous dequeue rate and folds it into
    /// the smoothed estimate with weight 0.9/0.1.
    pub fn on_dequeue(&mut self, now: Time, queue_len: usize) {
        if self.dq_count == -1 {
            if queue_len >= 10 {
                self.dq_start = now;
                self.dq_count = 0;
            }
        }
        if self.dq_count == -1 {
            return;
        }
        self.dq_count += 1;
        if self.dq_count < 10 {
            return;
        }
        let elapsed = now.saturating_sub(self.dq_start).as_secs_f64();
        let sample = if elapsed > 0.0 { 10.0 / elapsed } else { 0.0 };
        self.avg_dq_rate = if self.avg_dq_rate == 0.0 {
            sample
        } else {
            0.9 * self.avg_dq_rate + 0.1 * sample
        };
        self.burst_allowance_s = (self.burst_allowance_s - elapsed).max(0.0);
        if queue_len >= 10 {
            self.dq_start = now;
            self.dq_count = 0;
        } else {
            self.dq_count = -1;
        }
    }

    /// The 30ms periodic drop-probability recompute.
    pub fn periodic_update(&mut self, queue_len: usize, delay_target_s: f64, max_burst_s: f64) {
        let qdelay = if self.avg_dq_rate == 0.0 {
            0.0
        } else {
            queue_len as f64 / self.avg_dq_rate
        };
        let mut tmp = 0.125 * (qdelay - delay_target_s) + 1.25 * (qdelay - self.old_delay_s);
        if self.drop_prob < 0.01 {
            tmp /= 8.0;
        } else if self.drop_prob < 0.1 {
            tmp /= 2.0;
        }
        self.drop_prob = (self.drop_prob + tmp).clamp(0.0, 1.0);
        if qdelay < delay_target_s / 2.0
            && self.old_delay_s < delay_target_s / 2.0
            && self.drop_prob == 0.0
        {
            self.dq_count = -1;
            self.avg_dq_rate = 0.0;
            self.burst_allowance_s = max_burst_s;
        }
        self.old_delay_s = qdelay;
    }
}

/// CoDel controller state (sojourn-time-based dropping state machine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodelState {
    first_above_time: Option<Time>,
    drop_next: Time,
    drop_count: u32,
    pub dropping: bool,
}

impl CodelState {
    pub fn new() -> Self {
        Self {
            first_above_time: None,
            drop_next: Time::ZERO,
            drop_count: 0,
            dropping: false,
        }
    }

    /// `dropping && now >= drop_next` drops and schedules the next
    /// candidate drop at `observe_interval / sqrt(drop_count)`.
    pub fn should_admit(&mut self, now: Time, observe_interval_s: f64) -> bool {
        if self.dropping && now >= self.drop_next {
            self.drop_count += 1;
            let delay = observe_interval_s / (self.drop_count as f64).sqrt();
            self.drop_next = self.drop_next + Duration::from_secs_f64(delay);
            false
        } else {
            true
        }
    }

    /// Sojourn-time transition on dequeue.
    pub fn on_dequeue(&mut self, now: Time, sojourn_s: f64, delay_target_s: f64, observe_interval_s: f64) {
        if self.dropping && sojourn_s < delay_target_s {
            self.dropping = false;
            self.first_above_time = None;
            return;
        }
        if self.dropping || sojourn_s < delay_target_s {
            return;
        }
        match self.first_above_time {
            None => {
                self.first_above_time = Some(now + Duration::from_secs_f64(observe_interval_s));
            }
            Some(fat) if now >= fat => {
                let recent = now.saturating_sub(self.drop_next).as_secs_f64() < observe_interval_s;
                let long_gap = now.saturating_sub(fat).as_secs_f64() >= observe_interval_s;
                if recent || long_gap {
                    self.dropping = true;
                    self.drop_count = if recent { self.drop_count.saturating_sub(2) } else { 0 };
                    self.drop_next = now;
                }
            }
            Some(_) => {}
        }
    }

    /// Queue drained while blocked or open; CoDel exits `dropping`.
    pub fn on_queue_drained(&mut self) {
        self.dropping = false;
        self.first_above_time = None;
    }
}

impl Default for CodelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn pie_probability_stays_in_unit_interval() {
        let mut pie = PieState::new(0.1);
        pie.burst_allowance_s = 0.0;
        for _ in 0..200 {
            pie.periodic_update(50, 0.02, 0.1);
            assert!((0.0..=1.0).contains(&pie.drop_prob));
        }
    }

    #[test]
    fn pie_exempts_admission_during_burst_allowance() {
        let pie = PieState::new(0.1);
        let mut rng = SmallRng::seed_from_u64(1);
        // burst_allowance_s starts at 0.1 (> 0), so admission is exempt
        // regardless of drop_prob.
        assert!(pie.should_admit(&mut rng, 0.02));
    }

    #[test]
    fn pie_measurement_cycle_samples_rate() {
        let mut pie = PieState::new(0.1);
        let mut t = Time::ZERO;
        for _ in 0..10 {
            t = t + Duration::from_millis(1);
            pie.on_dequeue(t, 12);
        }
        assert!(pie.avg_dq_rate > 0.0);
    }

    #[test]
    fn codel_drop_next_spacing_matches_inverse_sqrt() {
        let mut codel = CodelState::new();
        codel.dropping = true;
        codel.drop_next = Time::ZERO;
        let mut now = Time::ZERO;
        let mut prev_next = Time::ZERO;
        for k in 1..=4u32 {
            assert!(!codel.should_admit(now, 0.1));
            let expected_gap = 0.1 / (k as f64).sqrt();
            let actual_gap = codel.drop_next.saturating_sub(prev_next).as_secs_f64();
            assert!((actual_gap - expected_gap).abs() < 1e-9);
            prev_next = codel.drop_next;
            now = codel.drop_next;
        }
    }

    #[test]
    fn codel_enters_dropping_after_sustained_overload() {
        let mut codel = CodelState::new();
        let mut t = Time::ZERO;
        codel.on_dequeue(t, 0.05, 0.02, 0.1);
        assert!(!codel.dropping);
        t = t + Duration::from_millis(150);
        codel.on_dequeue(t, 0.05, 0.02, 0.1);
        assert!(codel.dropping);
    }

    #[test]
    fn codel_exits_dropping_below_target() {
        let mut codel = CodelState::new();
        codel.dropping = true;
        codel.on_dequeue(Time::ZERO, 0.005, 0.02, 0.1);
        assert!(!codel.dropping);
    }

    #[test]
    fn codel_exits_dropping_on_queue_drain() {
        let mut codel = CodelState::new();
        codel.dropping = true;
        codel.on_queue_drained();
        assert!(!codel.dropping);
    }
}
