//! Congestion-aware forwarding strategy (§4.D).
//!
//! Extends a base "NACKs-enabled" strategy with a single hook: on each
//! incoming interest, walk the FIB entry's faces in `i_nth` order, try
//! each in turn, and stop at the first success (single-path propagation
//! — "do only once"). A face that refused only because of shaper
//! back-pressure (not PIT/FIB policy) gets its `cngLevel` bumped; a face
//! that successfully carried the content back gets it decremented.
//!
//! A trait object is used rather than an enum even though only one
//! concrete strategy is specified here, per the design note: the harness
//! crate is the natural place to add further strategies later, and the
//! original source models this as a subclassable hook.

use crate::face::FaceId;
use crate::packet::NackCode;

/// The result of attempting to send an interest out a single face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The interest was handed to the face successfully.
    Sent,
    /// `CanSendOutInterest` would have permitted it, but the face's
    /// shaper refused admission (queue full or AQM drop) — a congestion
    /// signal.
    BlockedByShaper,
    /// PIT/FIB policy forbade trying this face at all (e.g. it is the
    /// incoming face, or a loop would result); not a congestion signal.
    ForbiddenByPolicy,
}

/// What the forwarding strategy needs from a FIB entry: an ordering over
/// candidate outgoing faces, and a way to adjust the per-face congestion
/// counter that determines that ordering for subsequent interests.
pub trait FibEntry {
    /// Outgoing faces for this name prefix, in their current `i_nth`
    /// ordering (lowest `cngLevel` first — the harness is responsible for
    /// keeping this sorted; the strategy only reads it).
    fn ordered_faces(&self) -> Vec<FaceId>;

    /// `increment=true` is a congestion signal (saturating add); `false`
    /// is decongestion (saturating sub, floors at zero).
    fn update_cng_level(&mut self, face: FaceId, increment: bool);
}

/// The two hooks a forwarding strategy must implement, carried as a trait
/// object rather than a class hierarchy (§9 design note).
pub trait ForwardingStrategy {
    /// Returns the number of faces the interest was actually propagated
    /// to (0 or 1 for the congestion-aware strategy, since it stops at
    /// the first success). The caller emits `NACK_GIVEUP_PIT` if this is
    /// zero.
    fn propagate_interest(&mut self, fib: &mut dyn FibEntry, try_send: &mut dyn FnMut(FaceId) -> SendOutcome) -> usize;

    /// Content is about to satisfy a pending interest that arrived on
    /// `in_face` — decongestion signal.
    fn will_satisfy_pending_interest(&mut self, fib: &mut dyn FibEntry, in_face: FaceId);

    /// A valid NACK arrived on `in_face`. Only `NACK_CONGESTION` and
    /// `NACK_GIVEUP_PIT` are congestion signals; other codes are ignored
    /// by this core.
    fn did_receive_valid_nack(&mut self, fib: &mut dyn FibEntry, in_face: FaceId, code: NackCode);
}

/// The one concrete strategy this core implements.
#[derive(Debug, Default)]
pub struct CongestionAware;

impl ForwardingStrategy for CongestionAware {
    fn propagate_interest(&mut self, fib: &mut dyn FibEntry, try_send: &mut dyn FnMut(FaceId) -> SendOutcome) -> usize {
        for face in fib.ordered_faces() {
            match try_send(face) {
                SendOutcome::Sent => {
                    tracing::trace!(?face, "strategy: propagated interest");
                    return 1;
                }
                SendOutcome::BlockedByShaper => {
                    tracing::debug!(?face, "strategy: shaper back-pressure, bumping cngLevel");
                    fib.update_cng_level(face, true);
                }
                SendOutcome::ForbiddenByPolicy => {}
            }
        }
        0
    }

    fn will_satisfy_pending_interest(&mut self, fib: &mut dyn FibEntry, in_face: FaceId) {
        fib.update_cng_level(in_face, false);
    }

    fn did_receive_valid_nack(&mut self, fib: &mut dyn FibEntry, in_face: FaceId, code: NackCode) {
        if matches!(code, NackCode::Congestion | NackCode::GiveUpPit) {
            fib.update_cng_level(in_face, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestFib {
        faces: Vec<FaceId>,
        cng_level: HashMap<FaceId, u32>,
    }

    impl FibEntry for TestFib {
        fn ordered_faces(&self) -> Vec<FaceId> {
            self.faces.clone()
        }

        fn update_cng_level(&mut self, face: FaceId, increment: bool) {
            let entry = self.cng_level.entry(face).or_insert(0);
            if increment {
                *entry = entry.saturating_add(1);
            } else {
                *entry = entry.saturating_sub(1);
            }
        }
    }

    #[test]
    fn stops_at_first_success_single_path() {
        let mut fib = TestFib {
            faces: vec![FaceId::new(0), FaceId::new(1)],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        let mut attempted = Vec::new();
        let count = strategy.propagate_interest(&mut fib, &mut |f| {
            attempted.push(f);
            SendOutcome::Sent
        });
        assert_eq!(count, 1);
        assert_eq!(attempted, vec![FaceId::new(0)]);
    }

    #[test]
    fn shaper_back_pressure_bumps_cng_level_and_tries_next_face() {
        let mut fib = TestFib {
            faces: vec![FaceId::new(0), FaceId::new(1)],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        let count = strategy.propagate_interest(&mut fib, &mut |f| {
            if f == FaceId::new(0) {
                SendOutcome::BlockedByShaper
            } else {
                SendOutcome::Sent
            }
        });
        assert_eq!(count, 1);
        assert_eq!(*fib.cng_level.get(&FaceId::new(0)).unwrap(), 1);
        assert!(!fib.cng_level.contains_key(&FaceId::new(1)));
    }

    #[test]
    fn zero_faces_propagated_when_all_blocked() {
        let mut fib = TestFib {
            faces: vec![FaceId::new(0)],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        let count = strategy.propagate_interest(&mut fib, &mut |_| SendOutcome::BlockedByShaper);
        assert_eq!(count, 0);
    }

    #[test]
    fn forbidden_by_policy_does_not_signal_congestion() {
        let mut fib = TestFib {
            faces: vec![FaceId::new(0), FaceId::new(1)],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        let count = strategy.propagate_interest(&mut fib, &mut |f| {
            if f == FaceId::new(0) {
                SendOutcome::ForbiddenByPolicy
            } else {
                SendOutcome::Sent
            }
        });
        assert_eq!(count, 1);
        assert!(!fib.cng_level.contains_key(&FaceId::new(0)));
    }

    #[test]
    fn decongestion_floors_at_zero() {
        let mut fib = TestFib {
            faces: vec![],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        strategy.will_satisfy_pending_interest(&mut fib, FaceId::new(0));
        assert_eq!(*fib.cng_level.get(&FaceId::new(0)).unwrap(), 0);
    }

    #[test]
    fn only_congestion_and_give_up_pit_nack_codes_signal() {
        let mut fib = TestFib {
            faces: vec![],
            cng_level: HashMap::new(),
        };
        let mut strategy = CongestionAware;
        strategy.did_receive_valid_nack(&mut fib, FaceId::new(0), NackCode::Other(9));
        assert!(!fib.cng_level.contains_key(&FaceId::new(0)));
        strategy.did_receive_valid_nack(&mut fib, FaceId::new(0), NackCode::GiveUpPit);
        assert_eq!(*fib.cng_level.get(&FaceId::new(0)).unwrap(), 1);
    }
}
