//! A bi-directional link endpoint (§3 "Face", §4.B).
//!
//! Owns the link's outbound/inbound bit-rates and an embedded [`Shaper`].
//! Outbound interests are routed through the shaper; content and NACK
//! packets bypass it and go straight to the link. Inbound packets update
//! the reverse-direction EWMAs before being handed to the owning node.

use rand::Rng;

use crate::clock::{Scheduler, Time};
use crate::config::ShaperConfig;
use crate::error::DropReason;
use crate::packet::{Packet, PacketKind};
use crate::shaper::Shaper;

/// Stable id for a face, used by the scheduler's [`crate::clock::TimerEvent`]
/// variants instead of a borrowed or reference-counted handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceId(u32);

impl FaceId {
    pub fn new(id: u32) -> Self {
        FaceId(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// A face belongs to exactly one node and one link; created at topology
/// build and lives for the simulation (no dynamic teardown modeled here).
#[derive(Debug)]
pub struct Face {
    id: FaceId,
    c_out: f64,
    c_in: f64,
    shaper: Shaper,
}

impl Face {
    pub fn new(id: FaceId, c_out_bps: f64, shaper_cfg: ShaperConfig) -> Self {
        Face {
            id,
            c_out: c_out_bps,
            c_in: c_out_bps,
            shaper: Shaper::new(shaper_cfg),
        }
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn set_in_rate(&mut self, bps: f64) {
        self.c_in = bps;
    }

    pub fn c_out(&self) -> f64 {
        self.c_out
    }

    pub fn c_in(&self) -> f64 {
        self.c_in
    }

    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    pub fn shaper_mut(&mut self) -> &mut Shaper {
        &mut self.shaper
    }

    /// Arms the PIE periodic update timer if this face's shaper runs PIE.
    /// Call once after construction.
    pub fn arm_pie_timer(&self, scheduler: &mut dyn Scheduler) {
        self.shaper.arm_pie_timer(self.id, scheduler);
    }

    /// `send(packet) -> bool` from §4.B: `false` means dropped. Content
    /// and NACK bypass shaping; Interest is admitted through the shaper.
    pub fn send(
        &mut self,
        packet: Packet,
        now: Time,
        rng: &mut impl Rng,
        scheduler: &mut dyn Scheduler,
        link: &mut dyn FnMut(Packet),
    ) -> Result<(), DropReason> {
        match &packet.kind {
            PacketKind::Content => {
                self.shaper.record_out_content(packet.size_bytes);
                link(packet);
                Ok(())
            }
            PacketKind::Nack(_) => {
                link(packet);
                Ok(())
            }
            PacketKind::Interest => self.shaper.enqueue(
                packet,
                now,
                self.id,
                self.c_out,
                self.c_in,
                rng,
                scheduler,
                link,
            ),
        }
    }

    /// Receive hook invoked by the link medium. Updates the reverse-path
    /// EWMAs before handing the packet to `deliver`.
    pub fn recv(&mut self, packet: Packet, deliver: &mut dyn FnMut(Packet)) {
        match &packet.kind {
            PacketKind::Interest => self.shaper.record_in_interest(packet.size_bytes),
            PacketKind::Content => self.shaper.record_in_content(packet.size_bytes),
            PacketKind::Nack(_) => {}
        }
        deliver(packet);
    }

    /// Fires on `TimerEvent::ShaperOpen(self.id)`.
    pub fn on_shaper_open(&mut self, now: Time, scheduler: &mut dyn Scheduler, link: &mut dyn FnMut(Packet)) {
        self.shaper
            .shaper_open(now, self.id, self.c_out, self.c_in, scheduler, link);
    }

    /// Fires on `TimerEvent::PieUpdate(self.id)`. The caller is
    /// responsible for re-arming the next 30ms tick; this core never
    /// cancels the PIE periodic timer for the life of the face.
    pub fn on_pie_update(&mut self) {
        self.shaper.pie_periodic_update();
    }

    /// Fires every `updateInterval` to roll the observed inbound-interest
    /// rate window (§4.C.2).
    pub fn on_rate_window_roll(&mut self, now: Time) -> f64 {
        self.shaper.roll_observed_rate_window(now)
    }
}
