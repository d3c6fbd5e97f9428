//! Minimal concrete PIT/FIB (§3.1): arena-indexed by stable ids, never by
//! raw pointer, per the "raw shared pointers to PIT/FIB entries" design
//! note. Thin on purpose — this is the external collaborator the core
//! crate treats as out of scope, not a second simulator.

use std::collections::HashMap;

use icn_core::clock::Time;
use icn_core::face::FaceId;
use icn_core::strategy::FibEntry;

/// One (prefix, outgoing-face) record: an ordering rank and the
/// congestion counter the forwarding strategy mutates.
#[derive(Debug, Clone, Copy)]
struct FaceMetric {
    face: FaceId,
    i_nth: u32,
    cng_level: u32,
}

/// A single FIB entry (one name prefix's set of candidate outgoing
/// faces). Re-sorted by ascending `cngLevel` whenever a congestion
/// signal changes it, stable on ties by the original `i_nth`.
#[derive(Debug, Default)]
pub struct FibEntryImpl {
    faces: Vec<FaceMetric>,
}

impl FibEntryImpl {
    pub fn new(faces_in_rank_order: &[FaceId]) -> Self {
        let faces = faces_in_rank_order
            .iter()
            .enumerate()
            .map(|(i_nth, &face)| FaceMetric {
                face,
                i_nth: i_nth as u32,
                cng_level: 0,
            })
            .collect();
        FibEntryImpl { faces }
    }

    pub fn cng_level(&self, face: FaceId) -> u32 {
        self.faces
            .iter()
            .find(|fm| fm.face == face)
            .map(|fm| fm.cng_level)
            .unwrap_or(0)
    }
}

impl FibEntry for FibEntryImpl {
    fn ordered_faces(&self) -> Vec<FaceId> {
        let mut faces = self.faces.clone();
        faces.sort_by_key(|fm| (fm.cng_level, fm.i_nth));
        faces.into_iter().map(|fm| fm.face).collect()
    }

    fn update_cng_level(&mut self, face: FaceId, increment: bool) {
        if let Some(fm) = self.faces.iter_mut().find(|fm| fm.face == face) {
            fm.cng_level = if increment {
                fm.cng_level.saturating_add(1)
            } else {
                fm.cng_level.saturating_sub(1)
            };
        }
    }
}

/// A PIT entry: a name, the face an interest arrived on, and the faces
/// it has already been forwarded to — enough for the strategy's
/// single-path bookkeeping plus `WillSatisfyPendingInterest`.
#[derive(Debug, Clone)]
pub struct PitEntry {
    pub name: Vec<u8>,
    pub incoming_face: FaceId,
    pub outgoing_faces: Vec<FaceId>,
    pub expires_at: Time,
}

/// Arena-indexed PIT, keyed by a stable generational id rather than a raw
/// alias to the entry.
#[derive(Debug, Default)]
pub struct PitTable {
    entries: HashMap<u64, PitEntry>,
    next_id: u64,
}

impl PitTable {
    pub fn insert(&mut self, name: Vec<u8>, incoming_face: FaceId, expires_at: Time) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            PitEntry {
                name,
                incoming_face,
                outgoing_faces: Vec::new(),
                expires_at,
            },
        );
        id
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut PitEntry> {
        self.entries.get_mut(&id)
    }

    pub fn get(&self, id: u64) -> Option<&PitEntry> {
        self.entries.get(&id)
    }

    /// Satisfied or given up; the PIT lifetime-driven retransmission
    /// mechanism (§7) means a caller never needs to keep a stale entry
    /// around once it resolves.
    pub fn remove(&mut self, id: u64) -> Option<PitEntry> {
        self.entries.remove(&id)
    }

    pub fn find_by_name(&self, name: &[u8]) -> Option<u64> {
        self.entries
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }
}
