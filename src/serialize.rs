//! The serializer: a sizing pass that computes how large the emitted
//! blob will be, followed by an emission pass that actually writes it.
//!
//! Mirrors the original two-pass C design (`init_finalise_data` /
//! `print_node` / `print_prop`) but reports a sizing mismatch as
//! [`FdtError::EmissionOverflow`] instead of silently truncating.

use std::collections::HashMap;

use crate::arena::{Arena, NodeId};
use crate::define::{
    MemoryReservation, FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_LAST_COMP_VERSION, FDT_MAGIC,
    FDT_PROP, FDT_VERSION,
};
use crate::error::FdtError;
use crate::header::HEADER_SIZE;
use crate::query;

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}

/// Walks every node reachable from `roots` and assigns each distinct
/// property name a byte offset into a freshly built strings blob,
/// first-seen order, each entry appearing exactly once regardless of
/// how many properties reuse it.
fn build_string_table<'a>(arena: &Arena<'a>, roots: &[NodeId]) -> (Vec<u8>, HashMap<String, u32>) {
    let mut blob = Vec::new();
    let mut offsets = HashMap::new();
    let mut stack: Vec<NodeId> = roots.to_vec();
    stack.reverse();
    while let Some(node) = stack.pop() {
        for prop_id in query::props(arena, node) {
            let name = arena.prop(prop_id).name.as_ref();
            if !offsets.contains_key(name) {
                let offset = blob.len() as u32;
                blob.extend_from_slice(name.as_bytes());
                blob.push(0);
                offsets.insert(name.to_string(), offset);
            }
        }
        let mut kids = query::children(arena, node);
        kids.reverse();
        stack.extend(kids);
    }
    (blob, offsets)
}

/// Computes the byte size of the structure block that would be
/// produced for the subtree rooted at each of `roots`, plus the
/// trailing `FDT_END` token.
fn structure_size(arena: &Arena<'_>, roots: &[NodeId]) -> usize {
    fn node_size(arena: &Arena<'_>, node: NodeId) -> usize {
        let mut size = 4; // BEGIN_NODE
        size += align4(arena.node(node).name.as_bytes().len() + 1);
        for prop_id in query::props(arena, node) {
            size += 4 + 4 + 4; // PROP token, len, nameoff
            size += align4(arena.prop(prop_id).payload.as_bytes().len());
        }
        for child in query::children(arena, node) {
            size += node_size(arena, child);
        }
        size += 4; // END_NODE
        size
    }

    let mut total = 0;
    for &root in roots {
        total += node_size(arena, root);
    }
    total + 4 // FDT_END
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<(), FdtError> {
    buf.get_mut(offset..offset + 4)
        .ok_or(FdtError::EmissionOverflow)?
        .copy_from_slice(&value.to_be_bytes());
    Ok(())
}

fn write_bytes(buf: &mut [u8], offset: usize, data: &[u8]) -> Result<(), FdtError> {
    buf.get_mut(offset..offset + data.len())
        .ok_or(FdtError::EmissionOverflow)?
        .copy_from_slice(data);
    Ok(())
}

fn emit_node(
    arena: &Arena<'_>,
    node: NodeId,
    names: &HashMap<String, u32>,
    buf: &mut [u8],
    cursor: &mut usize,
) -> Result<(), FdtError> {
    write_u32(buf, *cursor, FDT_BEGIN_NODE)?;
    *cursor += 4;
    let name = arena.node(node).name.as_bytes();
    write_bytes(buf, *cursor, name)?;
    write_bytes(buf, *cursor + name.len(), &[0])?;
    *cursor += align4(name.len() + 1);

    for prop_id in query::props(arena, node) {
        let prop = arena.prop(prop_id);
        let payload = prop.payload.as_bytes();
        let nameoff = *names
            .get(prop.name.as_ref())
            .ok_or(FdtError::EmissionOverflow)?;

        write_u32(buf, *cursor, FDT_PROP)?;
        *cursor += 4;
        write_u32(buf, *cursor, payload.len() as u32)?;
        *cursor += 4;
        write_u32(buf, *cursor, nameoff)?;
        *cursor += 4;
        write_bytes(buf, *cursor, payload)?;
        *cursor += align4(payload.len());
    }

    for child in query::children(arena, node) {
        emit_node(arena, child, names, buf, cursor)?;
    }

    write_u32(buf, *cursor, FDT_END_NODE)?;
    *cursor += 4;
    Ok(())
}

/// Serializes the tree rooted at `roots` into `buf`, which must be
/// 4-byte aligned and large enough to hold the emitted blob (the
/// caller typically sizes it via [`encode_to_vec`] or a prior dry-run).
///
/// Returns the number of bytes actually written.
pub(crate) fn finalise_to_buffer(
    arena: &Arena<'_>,
    roots: &[NodeId],
    mem_reservations: &[MemoryReservation],
    boot_cpu_id: u32,
    buf: &mut [u8],
) -> Result<usize, FdtError> {
    if buf.as_ptr() as usize % 4 != 0 {
        return Err(FdtError::Misaligned);
    }

    let (strings_blob, names) = build_string_table(arena, roots);

    let mem_rsvmap_offset = align8(HEADER_SIZE);
    let mem_rsvmap_size = (mem_reservations.len() + 1) * 16;
    let struct_offset = align4(mem_rsvmap_offset + mem_rsvmap_size);
    let struct_size = structure_size(arena, roots);
    let strings_offset = struct_offset + struct_size;
    let total_size = strings_offset + strings_blob.len();

    if buf.len() < total_size {
        return Err(FdtError::BufferTooSmall {
            needed: total_size,
            got: buf.len(),
        });
    }

    write_u32(buf, 0, FDT_MAGIC)?;
    write_u32(buf, 4, total_size as u32)?;
    write_u32(buf, 8, struct_offset as u32)?;
    write_u32(buf, 12, strings_offset as u32)?;
    write_u32(buf, 16, mem_rsvmap_offset as u32)?;
    write_u32(buf, 20, FDT_VERSION)?;
    write_u32(buf, 24, FDT_LAST_COMP_VERSION)?;
    write_u32(buf, 28, boot_cpu_id)?;
    write_u32(buf, 32, strings_blob.len() as u32)?;
    write_u32(buf, 36, struct_size as u32)?;

    let mut cursor = mem_rsvmap_offset;
    for rsv in mem_reservations {
        write_bytes(buf, cursor, &rsv.address.to_be_bytes())?;
        write_bytes(buf, cursor + 8, &rsv.size.to_be_bytes())?;
        cursor += 16;
    }
    write_bytes(buf, cursor, &0u64.to_be_bytes())?;
    write_bytes(buf, cursor + 8, &0u64.to_be_bytes())?;

    let mut cursor = struct_offset;
    for &root in roots {
        emit_node(arena, root, &names, buf, &mut cursor)?;
    }
    write_u32(buf, cursor, FDT_END)?;
    cursor += 4;
    if cursor != struct_offset + struct_size {
        return Err(FdtError::EmissionOverflow);
    }

    write_bytes(buf, strings_offset, &strings_blob)?;

    Ok(total_size)
}

/// Convenience wrapper allocating a fresh, correctly-sized `Vec<u8>`.
pub(crate) fn encode_to_vec(
    arena: &Arena<'_>,
    roots: &[NodeId],
    mem_reservations: &[MemoryReservation],
    boot_cpu_id: u32,
) -> Result<Vec<u8>, FdtError> {
    let (strings_blob, _names) = build_string_table(arena, roots);
    let mem_rsvmap_offset = align8(HEADER_SIZE);
    let mem_rsvmap_size = (mem_reservations.len() + 1) * 16;
    let struct_offset = align4(mem_rsvmap_offset + mem_rsvmap_size);
    let struct_size = structure_size(arena, roots);
    let strings_offset = struct_offset + struct_size;
    let total_size = strings_offset + strings_blob.len();

    let mut buf = vec![0u8; total_size];
    let written = finalise_to_buffer(arena, roots, mem_reservations, boot_cpu_id, &mut buf)?;
    buf.truncate(written);
    Ok(buf)
}
