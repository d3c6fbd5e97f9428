//! Topology construction and the simulation driver.
//!
//! A deliberately small topology shape: a single consumer, a forwarder
//! node holding the FIB/PIT and running the congestion-aware strategy,
//! and one or more producers. Every hop is a [`Face`] pair joined by a
//! fixed propagation delay; producers are faces that answer every
//! inbound interest with a fixed-size content packet instead of
//! forwarding it onward.

use std::collections::HashMap;
use std::time::Duration;

use icn_core::clock::{Scheduler, Time, TimerEvent};
use icn_core::config::{ConsumerConfig, ShaperConfig};
use icn_core::consumer::{ConsumerId, RateFeedbackConsumer};
use icn_core::face::{Face, FaceId};
use icn_core::packet::{NackCode, Packet, PacketKind};
use icn_core::strategy::{CongestionAware, FibEntry, ForwardingStrategy, SendOutcome};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::event::{EventLoop, HarnessEvent};
use crate::pit_fib::{FibEntryImpl, PitTable};

const PIT_LIFETIME: Duration = Duration::from_secs(2);

/// What role a face plays in this topology, so the event loop knows how
/// to route whatever arrives on it.
#[derive(Debug, Clone)]
enum FaceRole {
    /// Faces the forwarder; content arriving here is delivered to the
    /// named consumer's rate-feedback logic.
    ConsumerSide(ConsumerId),
    /// The forwarder's single inbound face from all consumers.
    ForwarderIn,
    /// One of the forwarder's outbound faces toward a producer.
    ForwarderOut,
    /// Faces the forwarder; answers every interest with fixed-size
    /// content instead of forwarding it.
    ProducerSide { content_size_bytes: u32 },
}

/// Running counters a scenario test can assert on.
#[derive(Debug, Default, Clone)]
pub struct SimStats {
    pub interests_sent: u64,
    pub content_received: u64,
    pub drops: HashMap<u32, u64>,
    pub nacks_give_up_pit: u64,
    pub pit_retransmissions: u64,
}

pub struct Simulation {
    loop_: EventLoop,
    faces: Vec<Face>,
    roles: Vec<FaceRole>,
    peer: Vec<FaceId>,
    link_delay: Vec<Duration>,
    rng: SmallRng,

    consumers: Vec<RateFeedbackConsumer>,
    consumer_face: HashMap<u32, FaceId>,
    consumer_name: HashMap<u32, Vec<u8>>,

    fib: FibEntryImpl,
    pit: PitTable,
    strategy: CongestionAware,

    update_interval: Duration,
    pub stats: SimStats,
}

/// Everything needed to build a one-consumer topology with a fan of
/// producers behind a single congestion-aware forwarder.
pub struct TopologyPlan<'a> {
    pub seed: u64,
    pub consumer_to_forwarder_bps: f64,
    /// `(c_out, c_in)` toward each producer, in FIB rank order.
    pub forwarder_out_rates: &'a [(f64, f64)],
    pub producer_content_bytes: &'a [u32],
    pub link_delay: Duration,
    pub shaper_cfg: ShaperConfig,
    /// Per-outbound-face shaper override, same length as
    /// `forwarder_out_rates`; `None` entries fall back to `shaper_cfg`.
    /// Lets a scenario bottleneck one producer path without affecting
    /// the others.
    pub forwarder_out_shaper_cfg: &'a [Option<ShaperConfig>],
    pub consumer_cfg: ConsumerConfig,
    pub name_prefix: &'a [u8],
}

impl Simulation {
    /// Builds a one-consumer topology from a resolved scenario config.
    pub fn from_config(cfg: &crate::config::TopologyConfig) -> Self {
        let out_rates: Vec<(f64, f64)> = cfg.producers.iter().map(|p| (p.out_bps, p.in_bps)).collect();
        let content_bytes: Vec<u32> = cfg.producers.iter().map(|p| p.content_bytes).collect();
        Simulation::new(TopologyPlan {
            seed: cfg.seed,
            consumer_to_forwarder_bps: cfg.consumer_to_forwarder_bps,
            forwarder_out_rates: &out_rates,
            producer_content_bytes: &content_bytes,
            link_delay: cfg.link_delay,
            shaper_cfg: cfg.shaper.clone(),
            forwarder_out_shaper_cfg: &[],
            consumer_cfg: cfg.consumer.clone(),
            name_prefix: &cfg.name_prefix,
        })
    }

    pub fn new(plan: TopologyPlan<'_>) -> Self {
        assert_eq!(
            plan.forwarder_out_rates.len(),
            plan.producer_content_bytes.len(),
            "one content size per producer face"
        );

        let mut faces: Vec<Face> = Vec::new();
        let mut roles: Vec<FaceRole> = Vec::new();
        let mut peer: Vec<FaceId> = Vec::new();
        let mut delays: Vec<Duration> = Vec::new();

        // Consumer <-> forwarder-in.
        let consumer_face_id = FaceId::new(faces.len() as u32);
        faces.push(Face::new(consumer_face_id, plan.consumer_to_forwarder_bps, plan.shaper_cfg.clone()));
        roles.push(FaceRole::ConsumerSide(ConsumerId::new(0)));

        let forwarder_in_id = FaceId::new(faces.len() as u32);
        faces.push(Face::new(forwarder_in_id, plan.consumer_to_forwarder_bps, plan.shaper_cfg.clone()));
        roles.push(FaceRole::ForwarderIn);

        peer.push(forwarder_in_id);
        peer.push(consumer_face_id);
        delays.push(plan.link_delay);
        delays.push(plan.link_delay);

        let mut fib_faces = Vec::new();
        for (i, &(c_out, c_in)) in plan.forwarder_out_rates.iter().enumerate() {
            let out_id = FaceId::new(faces.len() as u32);
            let out_shaper_cfg = plan
                .forwarder_out_shaper_cfg
                .get(i)
                .and_then(|o| o.clone())
                .unwrap_or_else(|| plan.shaper_cfg.clone());
            let mut out_face = Face::new(out_id, c_out, out_shaper_cfg);
            out_face.set_in_rate(c_in);
            faces.push(out_face);
            roles.push(FaceRole::ForwarderOut);

            let prod_id = FaceId::new(faces.len() as u32);
            faces.push(Face::new(prod_id, c_in, ShaperConfig::default()));
            roles.push(FaceRole::ProducerSide {
                content_size_bytes: plan.producer_content_bytes[i],
            });

            peer.push(prod_id);
            peer.push(out_id);
            delays.push(plan.link_delay);
            delays.push(plan.link_delay);
            fib_faces.push(out_id);
        }

        let mut consumer_face = HashMap::new();
        consumer_face.insert(0, consumer_face_id);
        let mut consumer_name = HashMap::new();
        consumer_name.insert(0, plan.name_prefix.to_vec());

        let consumers = vec![RateFeedbackConsumer::new(ConsumerId::new(0), plan.consumer_cfg)];

        let mut sim = Simulation {
            loop_: EventLoop::new(),
            faces,
            roles,
            peer,
            link_delay: delays,
            rng: SmallRng::seed_from_u64(plan.seed),
            consumers,
            consumer_face,
            consumer_name,
            fib: FibEntryImpl::new(&fib_faces),
            pit: PitTable::default(),
            strategy: CongestionAware,
            update_interval: Duration::from_millis(100),
            stats: SimStats::default(),
        };
        sim.arm_initial_timers();
        sim
    }

    fn arm_initial_timers(&mut self) {
        for face in &self.faces {
            face.arm_pie_timer(&mut self.loop_);
        }
        for consumer in &self.consumers {
            consumer.arm_initial_send(&mut self.loop_);
        }
        for idx in 0..self.faces.len() {
            self.loop_.schedule_harness(
                self.update_interval,
                HarnessEvent::RateWindowRoll(FaceId::new(idx as u32)),
            );
        }
    }

    pub fn now(&self) -> Time {
        self.loop_.now()
    }

    /// Runs until simulated time `until` is reached or the event queue
    /// drains, whichever comes first.
    pub fn run_until(&mut self, until: Time) {
        while let Some(next) = self.loop_.peek_time() {
            if next > until {
                break;
            }
            self.step();
        }
    }

    fn step(&mut self) {
        let Some((now, event)) = self.loop_.pop() else {
            return;
        };
        match event {
            HarnessEvent::Core(TimerEvent::ShaperOpen(fid)) => self.on_shaper_open(now, fid),
            HarnessEvent::Core(TimerEvent::PieUpdate(fid)) => self.on_pie_update(fid),
            HarnessEvent::Core(TimerEvent::ConsumerSend(cid)) => self.on_consumer_send(now, cid),
            HarnessEvent::LinkArrival { to, packet } => self.on_link_arrival(now, to, packet),
            HarnessEvent::RateWindowRoll(fid) => self.on_rate_window_roll(now, fid),
            HarnessEvent::PitExpire(pit_id) => self.on_pit_expire(now, pit_id),
        }
    }

    fn on_shaper_open(&mut self, now: Time, fid: FaceId) {
        let peer = self.peer[fid.get() as usize];
        let delay = self.link_delay[fid.get() as usize];
        let mut outgoing = None;
        self.faces[fid.get() as usize].on_shaper_open(now, &mut self.loop_, &mut |p| outgoing = Some(p));
        if let Some(packet) = outgoing {
            self.loop_
                .schedule_harness(delay, HarnessEvent::LinkArrival { to: peer, packet });
        }
    }

    fn on_pie_update(&mut self, fid: FaceId) {
        self.faces[fid.get() as usize].on_pie_update();
        if self.faces[fid.get() as usize].shaper().should_have_pie_timer() {
            self.loop_.schedule(Duration::from_millis(30), TimerEvent::PieUpdate(fid));
        }
    }

    fn on_rate_window_roll(&mut self, now: Time, fid: FaceId) {
        self.faces[fid.get() as usize].on_rate_window_roll(now);
        self.loop_
            .schedule_harness(self.update_interval, HarnessEvent::RateWindowRoll(fid));
    }

    fn on_consumer_send(&mut self, now: Time, cid: ConsumerId) {
        let idx = cid.get();
        let name = self.consumer_name.get(&idx).cloned().unwrap_or_default();
        let face_id = *self.consumer_face.get(&idx).expect("consumer has a face");
        let mut to_send = None;
        self.consumers[idx as usize].on_send_timer(&mut self.loop_, &mut || {
            to_send = Some(Packet::interest(name.clone(), 40));
        });
        if let Some(packet) = to_send {
            self.stats.interests_sent += 1;
            self.send_from(now, face_id, packet);
        }
    }

    fn send_from(&mut self, now: Time, face_id: FaceId, packet: Packet) {
        let peer = self.peer[face_id.get() as usize];
        let delay = self.link_delay[face_id.get() as usize];
        let mut outgoing = None;
        let result = self.faces[face_id.get() as usize].send(packet, now, &mut self.rng, &mut self.loop_, &mut |p| {
            outgoing = Some(p)
        });
        if let Err(reason) = result {
            *self.stats.drops.entry(face_id.get()).or_insert(0) += 1;
            tracing::trace!(?face_id, ?reason, "simulation: interest dropped at shaper");
            return;
        }
        if let Some(p) = outgoing {
            self.loop_
                .schedule_harness(delay, HarnessEvent::LinkArrival { to: peer, packet: p });
        }
    }

    fn on_link_arrival(&mut self, now: Time, to: FaceId, packet: Packet) {
        let role = self.roles[to.get() as usize].clone();
        let mut delivered = None;
        self.faces[to.get() as usize].recv(packet, &mut |p| delivered = Some(p));
        let Some(packet) = delivered else { return };

        match role {
            FaceRole::ConsumerSide(cid) => {
                if packet.is_content() {
                    self.stats.content_received += 1;
                    self.consumers[cid.get() as usize].on_content_received(now);
                }
            }
            FaceRole::ForwarderIn => self.on_forwarder_receive(now, to, packet),
            FaceRole::ForwarderOut => {
                if packet.is_content() || packet.is_nack() {
                    self.on_forwarder_reverse(now, to, packet);
                }
            }
            FaceRole::ProducerSide { content_size_bytes } => {
                if packet.is_interest() {
                    let content = Packet::content(packet.name.clone(), content_size_bytes);
                    self.send_from(now, to, content);
                }
            }
        }
    }

    /// An interest arrived at the forwarder's inbound face: open a PIT
    /// entry and run the congestion-aware strategy over the FIB.
    fn on_forwarder_receive(&mut self, now: Time, in_face: FaceId, packet: Packet) {
        if !packet.is_interest() {
            return;
        }
        let expires_at = now + PIT_LIFETIME;
        let pit_id = self.pit.insert(packet.name.clone(), in_face, expires_at);
        self.try_propagate(now, pit_id);
    }

    /// Tries to forward the interest held by `pit_id` out the FIB's
    /// best-ranked face that hasn't already been tried for this entry
    /// (loop prevention via `outgoing_faces`). On success, arms the PIT
    /// entry's next expiry so a stalled attempt gets retransmitted out a
    /// different face; on exhaustion, gives up and NACKs the consumer.
    fn try_propagate(&mut self, now: Time, pit_id: u64) {
        let Some(entry) = self.pit.get(pit_id) else {
            return;
        };
        let name = entry.name.clone();
        let in_face = entry.incoming_face;
        let already_tried = entry.outgoing_faces.clone();

        let Simulation {
            faces,
            loop_,
            rng,
            link_delay,
            peer,
            fib,
            strategy,
            stats,
            ..
        } = self;

        let mut sent_face = None;
        let propagated = strategy.propagate_interest(fib, &mut |face| {
            if already_tried.contains(&face) {
                return SendOutcome::ForbiddenByPolicy;
            }
            let out = Packet::interest(name.clone(), 40);
            let mut outgoing = None;
            let result = faces[face.get() as usize].send(out, now, rng, loop_, &mut |p| outgoing = Some(p));
            match result {
                Ok(()) => {
                    if let Some(p) = outgoing {
                        loop_.schedule_harness(
                            link_delay[face.get() as usize],
                            HarnessEvent::LinkArrival { to: peer[face.get() as usize], packet: p },
                        );
                    }
                    sent_face = Some(face);
                    SendOutcome::Sent
                }
                Err(_) => {
                    *stats.drops.entry(face.get()).or_insert(0) += 1;
                    SendOutcome::BlockedByShaper
                }
            }
        });

        if propagated > 0 {
            if let Some(entry) = self.pit.get_mut(pit_id) {
                if let Some(face) = sent_face {
                    entry.outgoing_faces.push(face);
                }
                entry.expires_at = now + PIT_LIFETIME;
            }
            self.loop_.schedule_harness(PIT_LIFETIME, HarnessEvent::PitExpire(pit_id));
        } else {
            self.stats.nacks_give_up_pit += 1;
            let nack = Packet::nack(name, NackCode::GiveUpPit);
            self.send_from(now, in_face, nack);
            self.pit.remove(pit_id);
        }
    }

    /// A PIT entry's lifetime elapsed. A no-op if it already resolved
    /// (satisfied or given up); otherwise this is the protocol's
    /// retransmission mechanism (§7): retry propagation, skipping faces
    /// already tried for this entry.
    fn on_pit_expire(&mut self, now: Time, pit_id: u64) {
        if self.pit.get(pit_id).is_none() {
            return;
        }
        self.stats.pit_retransmissions += 1;
        tracing::debug!(pit_id, "pit entry timed out, retransmitting");
        self.try_propagate(now, pit_id);
    }

    /// Content or NACK arrived back at one of the forwarder's outbound
    /// (producer-facing) faces. `arrival_face` is the face it came in
    /// on — the congestion signal applies to that face, not to whatever
    /// face the original interest arrived on from the consumer side.
    fn on_forwarder_reverse(&mut self, now: Time, arrival_face: FaceId, packet: Packet) {
        let Some(pit_id) = self.pit.find_by_name(&packet.name) else {
            return;
        };
        let Some(entry) = self.pit.get(pit_id).cloned() else {
            return;
        };
        match &packet.kind {
            PacketKind::Content => {
                self.strategy.will_satisfy_pending_interest(&mut self.fib, arrival_face);
                self.send_from(now, entry.incoming_face, packet);
                self.pit.remove(pit_id);
            }
            PacketKind::Nack(code) => {
                self.strategy.did_receive_valid_nack(&mut self.fib, arrival_face, *code);
            }
            PacketKind::Interest => {}
        }
    }

    pub fn fib_ordering(&self) -> Vec<FaceId> {
        self.fib.ordered_faces()
    }

    pub fn consumer_frequency_hz(&self, idx: u32) -> f64 {
        self.consumers[idx as usize].frequency_hz()
    }

    pub fn consumer_in_slow_start(&self, idx: u32) -> bool {
        self.consumers[idx as usize].in_slow_start()
    }
}
