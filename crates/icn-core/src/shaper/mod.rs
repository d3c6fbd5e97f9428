//! Per-face interest shaping: a FIFO admission queue gated by an AQM
//! discipline, and a bandwidth-balance pacing formula that computes the
//! inter-departure gap for the head-of-queue interest.

pub mod aqm;
pub mod ewma;

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use crate::clock::{Scheduler, Time, TimerEvent};
use crate::config::{AqmModeInput, ShaperConfig};
use crate::error::{AqmKind, DropReason};
use crate::face::FaceId;
use crate::packet::{Packet, PacketKind, SojournTag};

use aqm::{CodelState, PieState};
use ewma::Ewma;

/// `OPEN` admits the next head-of-queue interest immediately; `BLOCKED`
/// means a `ShaperOpen` timer is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenState {
    Open,
    Blocked,
}

/// AQM-specific substate; `DropTail` carries none.
#[derive(Debug, Clone)]
enum AqmState {
    DropTail,
    Pie(PieState),
    CoDel(CodelState),
}

/// Per-face interest shaper. Owned by a [`crate::face::Face`].
#[derive(Debug)]
pub struct Shaper {
    cfg: ShaperConfig,
    queue: VecDeque<Packet>,
    state: OpenState,
    aqm: AqmState,

    out_interest_size: Ewma,
    in_interest_size: Ewma,
    out_content_size: Ewma,
    in_content_size: Ewma,

    observed_in_interest_bit_rate: f64,
    window_bytes: u64,
    window_start: Time,
}

impl Shaper {
    pub fn new(cfg: ShaperConfig) -> Self {
        let aqm = match cfg.queue_mode {
            AqmModeInput::DropTail => AqmState::DropTail,
            AqmModeInput::Pie => AqmState::Pie(PieState::new(cfg.max_burst_s)),
            AqmModeInput::CoDel => AqmState::CoDel(CodelState::new()),
        };
        Shaper {
            cfg,
            queue: VecDeque::new(),
            state: OpenState::Open,
            aqm,
            out_interest_size: Ewma::with_seed(40.0),
            in_interest_size: Ewma::with_seed(40.0),
            out_content_size: Ewma::with_seed(1100.0),
            in_content_size: Ewma::with_seed(1100.0),
            observed_in_interest_bit_rate: 0.0,
            window_bytes: 0,
            window_start: Time::ZERO,
        }
    }

    /// Schedules the first PIE periodic update 30ms after construction, so
    /// the very first admitted interest sees `drop_prob == 0`. No-op for
    /// other AQM modes.
    pub fn arm_pie_timer(&self, face: FaceId, scheduler: &mut dyn Scheduler) {
        if matches!(self.aqm, AqmState::Pie(_)) {
            scheduler.schedule(Duration::from_millis(30), TimerEvent::PieUpdate(face));
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_open(&self) -> bool {
        self.state == OpenState::Open
    }

    /// Content packets bypass shaping entirely but still feed the
    /// `outContentSize` EWMA used by the rate formula's `r2` term.
    pub fn record_out_content(&mut self, size_bytes: u32) {
        self.out_content_size.update(size_bytes as f64);
    }

    /// Admission path for an outbound Interest (§4.C). Returns `Ok(())` if
    /// the interest was enqueued (and possibly dequeued immediately),
    /// `Err(reason)` if it was dropped.
    pub fn enqueue(
        &mut self,
        packet: Packet,
        now: Time,
        face: FaceId,
        c_out: f64,
        c_in: f64,
        rng: &mut impl Rng,
        scheduler: &mut dyn Scheduler,
        link: &mut dyn FnMut(Packet),
    ) -> Result<(), DropReason> {
        debug_assert!(matches!(packet.kind, PacketKind::Interest));

        if self.queue.len() >= self.cfg.max_interest {
            tracing::trace!(?face, "shaper: tail-drop, queue full");
            return Err(DropReason::QueueFull);
        }

        let mut packet = packet;
        match &mut self.aqm {
            AqmState::DropTail => {}
            AqmState::Pie(pie) => {
                if !pie.should_admit(rng, self.cfg.delay_target_s) {
                    tracing::trace!(?face, "shaper: PIE early drop");
                    return Err(DropReason::AqmDrop(AqmKind::Pie));
                }
            }
            AqmState::CoDel(codel) => {
                packet.sojourn_tag = Some(SojournTag(now));
                if !codel.should_admit(now, self.cfg.delay_observe_interval_s) {
                    tracing::trace!(?face, "shaper: CoDel early drop");
                    return Err(DropReason::AqmDrop(AqmKind::CoDel));
                }
            }
        }

        self.queue.push_back(packet);
        if self.state == OpenState::Open {
            self.dequeue(now, face, c_out, c_in, scheduler, link);
        }
        Ok(())
    }

    /// Service path (§4.C `ShaperDequeue`): pop the head, update the
    /// `outInterestSize` EWMA, compute the pacing gap, and re-arm
    /// `ShaperOpen`. The timer is scheduled *before* the packet is handed
    /// to the link, per the re-entrancy design note — a synchronous
    /// upstream re-entry must never observe a second pending open.
    fn dequeue(
        &mut self,
        now: Time,
        face: FaceId,
        c_out: f64,
        c_in: f64,
        scheduler: &mut dyn Scheduler,
        link: &mut dyn FnMut(Packet),
    ) {
        let Some(packet) = self.queue.pop_front() else {
            return;
        };

        if let AqmState::Pie(pie) = &mut self.aqm {
            pie.on_dequeue(now, self.queue.len());
        }
        if let AqmState::CoDel(codel) = &mut self.aqm {
            if let Some(SojournTag(ts)) = packet.sojourn_tag {
                let sojourn_s = now.saturating_sub(ts).as_secs_f64();
                codel.on_dequeue(now, sojourn_s, self.cfg.delay_target_s, self.cfg.delay_observe_interval_s);
            }
        }

        self.out_interest_size.update(packet.size_bytes as f64);
        self.state = OpenState::Blocked;

        let gap = self.compute_gap(c_out, c_in, packet.size_bytes);
        scheduler.schedule(gap, TimerEvent::ShaperOpen(face));
        tracing::trace!(?face, gap_ms = gap.as_secs_f64() * 1000.0, "shaper: dequeued interest");
        link(packet);
    }

    /// Fires when the `ShaperOpen` gap elapses. If the queue is
    /// non-empty, immediately dequeues the next interest; otherwise marks
    /// the shaper `OPEN`. CoDel additionally exits `dropping` once the
    /// queue has drained.
    pub fn shaper_open(
        &mut self,
        now: Time,
        face: FaceId,
        c_out: f64,
        c_in: f64,
        scheduler: &mut dyn Scheduler,
        link: &mut dyn FnMut(Packet),
    ) {
        if self.queue.is_empty() {
            self.state = OpenState::Open;
            if let AqmState::CoDel(codel) = &mut self.aqm {
                codel.on_queue_drained();
            }
            return;
        }
        self.dequeue(now, face, c_out, c_in, scheduler, link);
    }

    /// The 30ms periodic PIE drop-probability recompute. No-op for other
    /// AQM modes (the harness should not have armed this timer for them).
    pub fn pie_periodic_update(&mut self) {
        if let AqmState::Pie(pie) = &mut self.aqm {
            pie.periodic_update(self.queue.len(), self.cfg.delay_target_s, self.cfg.max_burst_s);
        }
    }

    pub fn should_have_pie_timer(&self) -> bool {
        matches!(self.aqm, AqmState::Pie(_))
    }

    /// Inbound interest byte accounting for the `observedInInterestBitRate`
    /// windowed counter (§4.C.2); call once per inbound interest, then
    /// [`Shaper::roll_observed_rate_window`] at the `updateInterval`
    /// boundary.
    pub fn record_in_interest(&mut self, size_bytes: u32) {
        self.in_interest_size.update(size_bytes as f64);
        self.window_bytes += size_bytes as u64 * 8;
    }

    pub fn record_in_content(&mut self, size_bytes: u32) {
        self.in_content_size.update(size_bytes as f64);
    }

    /// Resets the observed-rate window, returning the new observed bit
    /// rate. Distinct from the EWMA-smoothed size fields: this is a
    /// windowed rate, never blended across windows.
    pub fn roll_observed_rate_window(&mut self, now: Time) -> f64 {
        let elapsed = now.saturating_sub(self.window_start).as_secs_f64();
        self.observed_in_interest_bit_rate = if elapsed > 0.0 {
            self.window_bytes as f64 / elapsed
        } else {
            0.0
        };
        self.window_bytes = 0;
        self.window_start = now;
        self.observed_in_interest_bit_rate
    }

    /// The bandwidth-balance rate formula (§4.C). `c_out`/`c_in` are the
    /// owning face's link bit-rates in bps.
    fn compute_shaping_bit_rate(&self, c_out: f64, c_in: f64) -> f64 {
        let r1 = (self.in_content_size.value() / self.out_interest_size.value()).max(f64::MIN_POSITIVE);
        let r2 = (self.out_content_size.value() / self.in_interest_size.value()).max(f64::MIN_POSITIVE);
        let rho = c_out / c_in;

        let r_max = c_in / r1;
        let (r_min, e) = if rho < 2.0 * r2 / (r1 * r2 + 1.0) {
            (c_out / 2.0, c_out / (2.0 * r2))
        } else if rho > (r1 * r2 + 1.0) / (2.0 * r1) {
            (c_in / (2.0 * r1), c_in / 2.0)
        } else {
            (
                (r2 * c_in - c_out) / (r1 * r2 - 1.0),
                (r1 * c_out - c_in) / (r1 * r2 - 1.0),
            )
        };
        let e = e * self.cfg.headroom;

        let obs = self.observed_in_interest_bit_rate;
        let r = if obs >= e {
            r_min
        } else {
            r_min + (r_max - r_min) * (1.0 - obs / e).powi(2)
        };
        r * self.cfg.headroom
    }

    /// `Δ = packetBytes * 8 / R`.
    fn compute_gap(&self, c_out: f64, c_in: f64, packet_bytes: u32) -> Duration {
        let r = self.compute_shaping_bit_rate(c_out, c_in).max(1.0);
        Duration::from_secs_f64(packet_bytes as f64 * 8.0 / r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::RecordingScheduler;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn face_id() -> FaceId {
        FaceId::new(0)
    }

    #[test]
    fn queue_never_exceeds_max_interest() {
        let mut cfg = ShaperConfig::default();
        cfg.max_interest = 3;
        let mut shaper = Shaper::new(cfg);
        let mut sched = RecordingScheduler::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut sent = Vec::new();
        // keep the shaper BLOCKED by never letting a gap elapse: admit one
        // (which dequeues immediately since it starts OPEN), then fill the
        // queue while blocked.
        let first = Packet::interest(b"/a".to_vec(), 40);
        shaper
            .enqueue(first, Time::ZERO, face_id(), 1_000_000.0, 1_000_000.0, &mut rng, &mut sched, &mut |p| sent.push(p))
            .unwrap();
        for _ in 0..5 {
            let p = Packet::interest(b"/a".to_vec(), 40);
            let _ = shaper.enqueue(p, Time::ZERO, face_id(), 1_000_000.0, 1_000_000.0, &mut rng, &mut sched, &mut |p| sent.push(p));
            assert!(shaper.queue_len() <= 3);
        }
    }

    #[test]
    fn rate_balance_symmetric_links_converge_to_c_over_r() {
        let cfg = ShaperConfig {
            headroom: 1.0,
            ..ShaperConfig::default()
        };
        let mut shaper = Shaper::new(cfg);
        let c = 1_000_000.0;
        let r = 5.0;
        shaper.out_interest_size = Ewma::with_seed(40.0);
        shaper.out_interest_size.update(40.0);
        shaper.in_content_size = Ewma::with_seed(200.0);
        shaper.in_content_size.update(40.0 * r);
        shaper.in_interest_size = Ewma::with_seed(40.0);
        shaper.in_interest_size.update(40.0);
        shaper.out_content_size = Ewma::with_seed(200.0);
        shaper.out_content_size.update(40.0 * r);
        shaper.observed_in_interest_bit_rate = 0.0;

        let rate = shaper.compute_shaping_bit_rate(c, c);
        assert!((rate - c / r).abs() / (c / r) < 1e-6);
    }

    #[test]
    fn pacing_gap_matches_bytes_times_eight_over_rate() {
        let cfg = ShaperConfig::default();
        let mut shaper = Shaper::new(cfg);
        shaper.out_interest_size.update(40.0);
        shaper.in_content_size.update(1000.0);
        shaper.in_interest_size.update(40.0);
        shaper.out_content_size.update(1000.0);

        let c_out = 1_000_000.0;
        let c_in = 1_000_000.0;
        let rate = shaper.compute_shaping_bit_rate(c_out, c_in);
        let gap = shaper.compute_gap(c_out, c_in, 40);
        let expected = Duration::from_secs_f64(40.0 * 8.0 / rate.max(1.0));
        assert!((gap.as_secs_f64() - expected.as_secs_f64()).abs() < 1e-12);
    }

    #[test]
    fn droptail_admits_until_full_then_drops() {
        let mut cfg = ShaperConfig::default();
        cfg.max_interest = 1;
        let mut shaper = Shaper::new(cfg);
        let mut sched = RecordingScheduler { now: Time::ZERO, ..Default::default() };
        let mut rng = SmallRng::seed_from_u64(1);
        let mut sent = Vec::new();
        shaper
            .enqueue(Packet::interest(b"/a".to_vec(), 40), Time::ZERO, face_id(), 1_000_000.0, 1_000_000.0, &mut rng, &mut sched, &mut |p| sent.push(p))
            .unwrap();
        assert_eq!(sent.len(), 1); // started OPEN, dequeued immediately
        assert_eq!(shaper.queue_len(), 0);
    }
}
