//! Packet representation and header discrimination.
//!
//! A NACK is not a distinct wire type: it is an Interest carrying a
//! non-zero `nack` code, matching the distilled header layout — a 2-bit
//! type tag plus a 1-bit NACK flag and an 8-bit code when the flag is set.

use crate::clock::Time;

/// Congestion/PIT-exhaustion codes this core produces and consumes.
/// Additional codes (e.g. `NACK_NO_ROUTE`) may be used by layers outside
/// this core; they are opaque to the shaper and strategy here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NackCode {
    Congestion,
    GiveUpPit,
    Other(u8),
}

/// The wire-visible discriminant of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Interest,
    Content,
    Nack(NackCode),
}

/// A sojourn timestamp tag attached at shaper admission (CoDel only) and
/// read back at dequeue. Never serialized onto the wire; purely
/// simulation-internal metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SojournTag(pub Time);

/// A single packet flowing through a face.
#[derive(Debug, Clone)]
pub struct Packet {
    pub kind: PacketKind,
    /// Opaque routing key; not interpreted by this core beyond its length
    /// for EWMA/rate accounting (`name.len()` contributes to `size_bytes`
    /// for callers that fold name length into the wire size themselves).
    pub name: Vec<u8>,
    pub size_bytes: u32,
    pub sojourn_tag: Option<SojournTag>,
}

impl Packet {
    pub fn interest(name: impl Into<Vec<u8>>, size_bytes: u32) -> Self {
        Packet {
            kind: PacketKind::Interest,
            name: name.into(),
            size_bytes,
            sojourn_tag: None,
        }
    }

    pub fn content(name: impl Into<Vec<u8>>, size_bytes: u32) -> Self {
        Packet {
            kind: PacketKind::Content,
            name: name.into(),
            size_bytes,
            sojourn_tag: None,
        }
    }

    pub fn nack(name: impl Into<Vec<u8>>, code: NackCode) -> Self {
        Packet {
            kind: PacketKind::Nack(code),
            name: name.into(),
            size_bytes: 0,
            sojourn_tag: None,
        }
    }

    pub fn is_interest(&self) -> bool {
        matches!(self.kind, PacketKind::Interest)
    }

    pub fn is_content(&self) -> bool {
        matches!(self.kind, PacketKind::Content)
    }

    pub fn is_nack(&self) -> bool {
        matches!(self.kind, PacketKind::Nack(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nack_is_not_plain_interest() {
        let p = Packet::nack(b"/a/b".to_vec(), NackCode::Congestion);
        assert!(p.is_nack());
        assert!(!p.is_interest());
    }

    #[test]
    fn constructors_tag_kind_correctly() {
        assert!(Packet::interest(b"/x".to_vec(), 40).is_interest());
        assert!(Packet::content(b"/x".to_vec(), 1100).is_content());
    }
}
