//! The mutation API: building and extending a tree programmatically.
//!
//! Enabled only when a [`Dtb`](crate::Dtb) was parsed with
//! `InitConfig { writable: true, .. }`. All writes go through here so
//! the duplicate-name check (full string equality, not a
//! prefix-bounded comparison) is applied uniformly.

use std::borrow::Cow;

use crate::arena::{Arena, Node, NodeId, Payload, Prop, PropId};
use crate::decode::{PairLayout, QuadLayout, TripletLayout};
use crate::error::FdtError;
use crate::query;

fn check_duplicate_sibling(arena: &Arena<'_>, parent: NodeId, name: &str) -> Result<(), FdtError> {
    if query::find_child_by_name(arena, parent, name).is_some() {
        return Err(FdtError::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Creates a new child node named `name` under `parent`.
///
/// Rejects a name already used by one of `parent`'s existing children,
/// comparing the full name rather than a length-bounded prefix.
pub(crate) fn create_child(
    arena: &mut Arena<'_>,
    parent: NodeId,
    name: String,
) -> Result<NodeId, FdtError> {
    check_duplicate_sibling(arena, parent, &name)?;
    let node = Node {
        name: Cow::Owned(name),
        parent: Some(parent),
        first_child: None,
        next_sibling: None,
        first_prop: None,
    };
    let id = arena.alloc_node(node)?;
    arena.append_child(parent, id);
    Ok(id)
}

/// Creates a new sibling named `name`, appended after `after`'s last
/// existing sibling under their shared parent.
///
/// `after` must not be a root node: the mutation API only extends
/// trees under an existing parent.
pub(crate) fn create_sibling(
    arena: &mut Arena<'_>,
    after: NodeId,
    name: String,
) -> Result<NodeId, FdtError> {
    let parent = arena.node(after).parent.ok_or(FdtError::Misaligned)?;
    create_child(arena, parent, name)
}

/// Creates a property named `name` with an already-encoded `payload`
/// on `node`. Typed `write_prop_*` helpers build `payload` for you.
pub(crate) fn create_prop(
    arena: &mut Arena<'_>,
    node: NodeId,
    name: String,
    payload: Vec<u8>,
) -> Result<PropId, FdtError> {
    if query::find_prop_by_name(arena, node, &name).is_some() {
        return Err(FdtError::DuplicateName(name));
    }
    let prop = Prop {
        name: Cow::Owned(name),
        payload: Payload::Owned(payload),
        next: None,
    };
    let id = arena.alloc_prop(prop)?;
    arena.append_prop(node, id);
    Ok(id)
}

fn encode_cells(value: u128, cells: usize, out: &mut Vec<u8>) {
    for i in (0..cells).rev() {
        let cell = ((value >> (i * 32)) & 0xffff_ffff) as u32;
        out.extend_from_slice(&cell.to_be_bytes());
    }
}

/// Encodes a flat list of `cells_per_value`-wide values, big-endian.
pub(crate) fn write_prop_values(values: &[u128], cells_per_value: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * cells_per_value * 4);
    for &v in values {
        encode_cells(v, cells_per_value, &mut out);
    }
    out
}

pub(crate) fn write_prop_pairs(values: &[(u128, u128)], layout: PairLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * (layout.a + layout.b) * 4);
    for &(a, b) in values {
        encode_cells(a, layout.a, &mut out);
        encode_cells(b, layout.b, &mut out);
    }
    out
}

pub(crate) fn write_prop_triplets(values: &[(u128, u128, u128)], layout: TripletLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * (layout.a + layout.b + layout.c) * 4);
    for &(a, b, c) in values {
        encode_cells(a, layout.a, &mut out);
        encode_cells(b, layout.b, &mut out);
        encode_cells(c, layout.c, &mut out);
    }
    out
}

pub(crate) fn write_prop_quads(values: &[(u128, u128, u128, u128)], layout: QuadLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * (layout.a + layout.b + layout.c + layout.d) * 4);
    for &(a, b, c, d) in values {
        encode_cells(a, layout.a, &mut out);
        encode_cells(b, layout.b, &mut out);
        encode_cells(c, layout.c, &mut out);
        encode_cells(d, layout.d, &mut out);
    }
    out
}

/// Encodes a single NUL-terminated string as a property payload.
pub(crate) fn write_prop_string(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 1);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    out
}

/// Encodes a list of strings as consecutive NUL-terminated entries, as
/// for a multi-entry `compatible` property.
pub(crate) fn write_prop_strings(values: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        out.extend_from_slice(v.as_bytes());
        out.push(0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_root_arena() -> (Arena<'static>, NodeId) {
        let mut arena = Arena::with_capacity(4, 4);
        let root = arena
            .alloc_node(Node {
                name: Cow::Borrowed(""),
                parent: None,
                first_child: None,
                next_sibling: None,
                first_prop: None,
            })
            .unwrap();
        (arena, root)
    }

    #[test]
    fn create_child_rejects_duplicate_name() {
        let (mut arena, root) = single_root_arena();
        create_child(&mut arena, root, "uart".to_string()).unwrap();
        let err = create_child(&mut arena, root, "uart".to_string()).unwrap_err();
        assert!(matches!(err, FdtError::DuplicateName(_)));
    }

    #[test]
    fn create_child_allows_prefix_distinct_names() {
        // a length-bounded prefix comparison would have confused these;
        // full string equality must not.
        let (mut arena, root) = single_root_arena();
        create_child(&mut arena, root, "uart".to_string()).unwrap();
        create_child(&mut arena, root, "uart0".to_string()).unwrap();
        assert_eq!(query::children(&arena, root).len(), 2);
    }

    #[test]
    fn write_and_read_pair_round_trips() {
        let layout = PairLayout { a: 1, b: 1 };
        let bytes = write_prop_pairs(&[(0x1000, 0x10)], layout);
        let decoded = crate::decode::read_prop_pairs(&bytes, layout);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].a, 0x1000);
        assert_eq!(decoded[0].b, 0x10);
    }
}
