//! Navigation, lookup, and the public [`Property`] view type.
//!
//! Everything here operates on a borrowed [`Arena`] plus a root list;
//! [`crate::dtb::Dtb`] is a thin facade that owns the arena and exposes
//! these as methods.

use crate::arena::{Arena, NodeId, PropId};
use crate::decode::{self, Pair, PairLayout, Quad, QuadLayout, Triplet, TripletLayout};

/// A read-only view of one property, borrowed from the [`crate::Dtb`]
/// that produced it.
///
/// The borrow is tied to the `Dtb`, not to the original blob: a
/// property created through the mutation API owns its bytes, and a
/// `Property` handed out for it borrows from that owned storage
/// instead.
#[derive(Debug, Clone, Copy)]
pub struct Property<'d> {
    name: &'d str,
    payload: &'d [u8],
}

impl<'d> Property<'d> {
    pub(crate) fn new(name: &'d str, payload: &'d [u8]) -> Self {
        Property { name, payload }
    }

    /// The property's name, e.g. `"compatible"`.
    pub fn name(&self) -> &'d str {
        self.name
    }

    /// The raw, still-big-endian payload bytes.
    pub fn raw(&self) -> &'d [u8] {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Decodes the payload as a single NUL-terminated string.
    pub fn as_str(&self) -> Option<&'d str> {
        decode::read_prop_string(self.payload, 0)
    }

    /// Decodes the payload as a list of NUL-terminated strings, as for
    /// a `compatible` property with multiple entries.
    pub fn as_strings(&self) -> Vec<&'d str> {
        let mut out = Vec::new();
        let mut i = 0;
        while let Some(s) = decode::read_prop_string(self.payload, i) {
            out.push(s);
            i += 1;
        }
        out
    }

    /// Decodes a single 32-bit cell, e.g. `#address-cells`.
    pub fn as_u32(&self) -> Option<u32> {
        if self.payload.len() != 4 {
            return None;
        }
        Some(u32::from_be_bytes(self.payload.try_into().unwrap()))
    }

    /// Decodes a single 64-bit (two-cell) value.
    pub fn as_u64(&self) -> Option<u64> {
        if self.payload.len() != 8 {
            return None;
        }
        Some(u64::from_be_bytes(self.payload.try_into().unwrap()))
    }

    /// Decodes the payload as a flat list of `cells_per_value`-wide values.
    pub fn values(&self, cells_per_value: usize) -> Vec<u128> {
        decode::read_prop_values(self.payload, cells_per_value)
    }

    /// Decodes the payload as a list of [`Pair`]s under `layout`.
    pub fn pairs(&self, layout: PairLayout) -> Vec<Pair> {
        decode::read_prop_pairs(self.payload, layout)
    }

    /// Decodes the payload as a list of [`Triplet`]s under `layout`.
    pub fn triplets(&self, layout: TripletLayout) -> Vec<Triplet> {
        decode::read_prop_triplets(self.payload, layout)
    }

    /// Decodes the payload as a list of [`Quad`]s under `layout`.
    pub fn quads(&self, layout: QuadLayout) -> Vec<Quad> {
        decode::read_prop_quads(self.payload, layout)
    }
}

/// Summary counts for a node, as returned by [`crate::Dtb::stat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStat {
    /// Number of direct children.
    pub child_count: usize,
    /// Number of properties directly on this node.
    pub prop_count: usize,
    /// Whether this node has a `phandle`/`linux,phandle` property
    /// registered in the phandle index.
    pub has_phandle: bool,
}

pub(crate) fn children(arena: &Arena<'_>, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cursor = arena.node(node).first_child;
    while let Some(id) = cursor {
        out.push(id);
        cursor = arena.node(id).next_sibling;
    }
    out
}

pub(crate) fn props(arena: &Arena<'_>, node: NodeId) -> Vec<PropId> {
    let mut out = Vec::new();
    let mut cursor = arena.node(node).first_prop;
    while let Some(id) = cursor {
        out.push(id);
        cursor = arena.prop(id).next;
    }
    out
}

/// Looks up a direct child of `node` by name. A child's `@unit-address`
/// suffix, if any, is stripped before comparing, so `name` may be given
/// either with or without it (`"uart"` and `"uart@1000"` both match a
/// child literally named `"uart@1000"`).
pub(crate) fn find_child_by_name<'a>(
    arena: &Arena<'a>,
    node: NodeId,
    name: &str,
) -> Option<NodeId> {
    let mut cursor = arena.node(node).first_child;
    while let Some(id) = cursor {
        let child_name = arena.node(id).name.as_ref();
        let base = child_name.split_once('@').map_or(child_name, |(base, _)| base);
        if child_name == name || base == name {
            return Some(id);
        }
        cursor = arena.node(id).next_sibling;
    }
    None
}

pub(crate) fn find_prop_by_name<'a>(arena: &Arena<'a>, node: NodeId, name: &str) -> Option<PropId> {
    let mut cursor = arena.node(node).first_prop;
    while let Some(id) = cursor {
        if arena.prop(id).name.as_ref() == name {
            return Some(id);
        }
        cursor = arena.prop(id).next;
    }
    None
}

pub(crate) fn prop_at(arena: &Arena<'_>, node: NodeId, index: usize) -> Option<PropId> {
    props(arena, node).into_iter().nth(index)
}

/// Resolves a `/`-separated absolute path (e.g. `/soc/uart@1000`)
/// starting from `roots`. An empty path segment list (just `/`)
/// returns the first root.
pub(crate) fn find_path(arena: &Arena<'_>, roots: &[NodeId], path: &str) -> Option<NodeId> {
    let path = path.strip_prefix('/')?;
    let mut current = *roots.first()?;
    if path.is_empty() {
        return Some(current);
    }
    for segment in path.split('/') {
        current = find_child_by_name(arena, current, segment)?;
    }
    Some(current)
}

/// Linearly scans all allocated nodes in arena order, beginning just
/// after `start` (or at the very first node when `start` is `None`),
/// for the first whose `compatible` property contains `needle` as one
/// of its entries. Passing the previous hit as `start` resumes the scan
/// without re-matching it, so repeated calls enumerate every match
/// exactly once.
pub(crate) fn find_compatible(arena: &Arena<'_>, start: Option<NodeId>, needle: &str) -> Option<NodeId> {
    let begin = start.map_or(0, |id| id.0 as usize + 1);
    for idx in begin..arena.node_count() {
        let node = NodeId(idx as u32);
        if let Some(prop_id) = find_prop_by_name(arena, node, "compatible") {
            let payload = arena.prop(prop_id).payload.as_bytes();
            let mut i = 0;
            while let Some(entry) = decode::read_prop_string(payload, i) {
                if entry == needle {
                    return Some(node);
                }
                i += 1;
            }
        }
    }
    None
}

pub(crate) fn stat(arena: &Arena<'_>, node: NodeId) -> NodeStat {
    NodeStat {
        child_count: children(arena, node).len(),
        prop_count: props(arena, node).len(),
        has_phandle: arena.phandle_of(node).is_some(),
    }
}
