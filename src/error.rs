//! Error taxonomy for parsing, decoding, and serializing FDT blobs.

/// Which sub-arena was exhausted during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaKind {
    /// The node slab ran out of reserved capacity.
    Node,
    /// The property slab ran out of reserved capacity.
    Prop,
}

impl core::fmt::Display for ArenaKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArenaKind::Node => write!(f, "node"),
            ArenaKind::Prop => write!(f, "property"),
        }
    }
}

/// Errors that can occur while parsing, decoding, or serializing an FDT.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FdtError {
    /// The blob's header magic number didn't match `FDT_MAGIC`.
    #[error("invalid magic number {0:#x}, expected {:#x}", crate::define::FDT_MAGIC)]
    InvalidMagic(u32),

    /// The slice passed in is too small to hold the header, or the
    /// header's declared `totalsize` doesn't fit in the given slice.
    #[error("buffer too small: need at least {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// The node or property arena ran out of reserved capacity.
    #[error("{kind} arena exhausted (reserved {capacity} slots)")]
    ArenaExhausted {
        /// Which arena.
        kind: ArenaKind,
        /// The reserved capacity that was exceeded.
        capacity: usize,
    },

    /// A mutation call would have introduced two siblings with the same name.
    #[error("a sibling named {0:?} already exists")]
    DuplicateName(String),

    /// A buffer passed to the serializer was not 4-byte aligned.
    #[error("output buffer must be 4-byte aligned")]
    Misaligned,

    /// The serializer ran out of space mid-emission despite the sizing
    /// pass reporting enough room (indicates a sizing/emission mismatch).
    #[error("serializer write exceeded the sized buffer bounds")]
    EmissionOverflow,

    /// A mutation call was made on a `Dtb` parsed with
    /// `InitConfig { writable: false, .. }`.
    #[error("mutation requires a Dtb parsed with InitConfig {{ writable: true, .. }}")]
    NotWritable,
}
