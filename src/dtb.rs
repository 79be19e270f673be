//! The public facade: [`Dtb`] owns the arena and ties together
//! parsing, lookup, decoding, mutation, and serialization.

use crate::arena::{Arena, NodeId};
use crate::decode::{PairLayout, QuadLayout, TripletLayout};
use crate::define::{MemoryReservation, Phandle};
use crate::error::FdtError;
use crate::header::Header;
use crate::mutate;
use crate::ops::{DtbOps, InitConfig, LogOps};
use crate::parser;
use crate::query::{self, NodeStat, Property};

/// A parsed (and, if configured writable, mutable) device tree.
///
/// Borrows its backing blob for the lifetime `'a`: nodes and
/// properties produced by parsing point directly into `blob` rather
/// than copying out of it. Nodes and properties added through the
/// mutation API own their own storage instead, and live as long as the
/// `Dtb` itself.
pub struct Dtb<'a> {
    arena: Arena<'a>,
    roots: Vec<NodeId>,
    mem_reservations: Vec<MemoryReservation>,
    boot_cpuid_phys: u32,
    config: InitConfig,
    ops: Box<dyn DtbOps>,
}

fn parse_mem_reservations(blob: &[u8], header: &Header) -> Result<Vec<MemoryReservation>, FdtError> {
    let mut offset = header.off_mem_rsvmap as usize;
    let mut out = Vec::new();
    loop {
        let entry = blob
            .get(offset..offset + 16)
            .ok_or(FdtError::BufferTooSmall {
                needed: offset + 16,
                got: blob.len(),
            })?;
        let address = u64::from_be_bytes(entry[0..8].try_into().unwrap());
        let size = u64::from_be_bytes(entry[8..16].try_into().unwrap());
        offset += 16;
        if address == 0 && size == 0 {
            break;
        }
        out.push(MemoryReservation { address, size });
    }
    Ok(out)
}

impl<'a> Dtb<'a> {
    /// Parses `blob` with default options: read-only, diagnostics
    /// routed through the `log` facade.
    pub fn parse(blob: &'a [u8]) -> Result<Self, FdtError> {
        Self::parse_with(blob, InitConfig::default(), Box::new(LogOps))
    }

    /// Parses `blob` with caller-supplied options.
    pub fn parse_with_config(blob: &'a [u8], config: InitConfig) -> Result<Self, FdtError> {
        Self::parse_with(blob, config, Box::new(LogOps))
    }

    /// Parses `blob` with caller-supplied options and diagnostics sink.
    pub fn parse_with(
        blob: &'a [u8],
        config: InitConfig,
        ops: Box<dyn DtbOps>,
    ) -> Result<Self, FdtError> {
        let config = config.sanitised();
        let header = Header::from_bytes(blob)?;
        if (header.totalsize as usize) > blob.len() {
            return Err(FdtError::BufferTooSmall {
                needed: header.totalsize as usize,
                got: blob.len(),
            });
        }

        let struct_start = header.off_dt_struct as usize;
        let struct_end = struct_start + header.size_dt_struct as usize;
        let strings_start = header.off_dt_strings as usize;
        let strings_end = strings_start + header.size_dt_strings as usize;

        let structure =
            blob.get(struct_start..struct_end)
                .ok_or(FdtError::BufferTooSmall {
                    needed: struct_end,
                    got: blob.len(),
                })?;
        let strings = blob
            .get(strings_start..strings_end)
            .ok_or(FdtError::BufferTooSmall {
                needed: strings_end,
                got: blob.len(),
            })?;

        let (node_cap, prop_cap) = parser::prescan(structure)?;
        let arena = Arena::with_capacity(node_cap, prop_cap);
        let outcome = parser::parse(structure, strings, arena, ops.as_ref())?;

        let mem_reservations = parse_mem_reservations(blob, &header)?;

        Ok(Dtb {
            arena: outcome.arena,
            roots: outcome.roots,
            mem_reservations,
            boot_cpuid_phys: header.boot_cpuid_phys,
            config,
            ops,
        })
    }

    /// The tree's root node (`/`). Panics if the arena somehow has no
    /// root, which cannot happen for a `Dtb` produced by [`Dtb::parse`].
    pub fn root(&self) -> NodeId {
        self.roots[0]
    }

    /// The memory reservation block entries, in on-disk order.
    pub fn mem_reservations(&self) -> &[MemoryReservation] {
        &self.mem_reservations
    }

    /// This tree's `boot_cpuid_phys` header field.
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.boot_cpuid_phys
    }

    /// Resolves an absolute, `/`-separated path to a node.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        query::find_path(&self.arena, &self.roots, path)
    }

    /// Looks up a direct child of `node` by name.
    pub fn find_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        query::find_child_by_name(&self.arena, node, name)
    }

    /// Scans all nodes for one whose `compatible` property lists
    /// `compatible` as one of its entries, beginning just after `start`
    /// (or from the first node when `start` is `None`). Passing the
    /// previous hit back as `start` resumes the scan past it, so
    /// repeated calls enumerate every match exactly once.
    pub fn find_compatible(&self, start: Option<NodeId>, compatible: &str) -> Option<NodeId> {
        query::find_compatible(&self.arena, start, compatible)
    }

    /// Looks up the node registered under `phandle` (via its
    /// `phandle`/`linux,phandle` property).
    pub fn find_phandle(&self, phandle: impl Into<Phandle>) -> Option<NodeId> {
        self.arena.phandle_lookup(phandle.into().raw())
    }

    /// Looks up a property on `node` by name.
    pub fn find_prop(&self, node: NodeId, name: &str) -> Option<Property<'_>> {
        let prop_id = query::find_prop_by_name(&self.arena, node, name)?;
        let prop = self.arena.prop(prop_id);
        Some(Property::new(prop.name.as_ref(), prop.payload.as_bytes()))
    }

    /// The `index`-th property directly on `node`, in on-disk order.
    pub fn prop_at(&self, node: NodeId, index: usize) -> Option<Property<'_>> {
        let prop_id = query::prop_at(&self.arena, node, index)?;
        let prop = self.arena.prop(prop_id);
        Some(Property::new(prop.name.as_ref(), prop.payload.as_bytes()))
    }

    /// `node`'s direct children, in on-disk order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        query::children(&self.arena, node)
    }

    /// `node`'s first child, or `None` for a childless node.
    pub fn child(&self, node: NodeId) -> Option<NodeId> {
        self.arena.node(node).first_child
    }

    /// `node`'s parent, or `None` for a root node.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.node(node).parent
    }

    /// `node`'s next sibling under the same parent, in on-disk order.
    pub fn sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.node(node).next_sibling
    }

    /// `node`'s name, e.g. `"uart@1000"` (the root node's name is `""`).
    pub fn name(&self, node: NodeId) -> &str {
        self.arena.node(node).name.as_ref()
    }

    /// Summary counts for `node`.
    pub fn stat(&self, node: NodeId) -> NodeStat {
        query::stat(&self.arena, node)
    }

    fn require_writable(&self) -> Result<(), FdtError> {
        if self.config.writable {
            Ok(())
        } else {
            self.ops.on_error("mutation attempted on a read-only Dtb");
            Err(FdtError::NotWritable)
        }
    }

    /// Creates a new child node named `name` under `parent`.
    ///
    /// Requires a `Dtb` parsed with `InitConfig { writable: true, .. }`.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, FdtError> {
        self.require_writable()?;
        mutate::create_child(&mut self.arena, parent, name.into()).inspect_err(|e| {
            self.ops.on_error(&e.to_string());
        })
    }

    /// Creates a new sibling of `after`, appended to the end of their
    /// shared parent's child list.
    ///
    /// Requires a `Dtb` parsed with `InitConfig { writable: true, .. }`.
    pub fn create_sibling(
        &mut self,
        after: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, FdtError> {
        self.require_writable()?;
        mutate::create_sibling(&mut self.arena, after, name.into()).inspect_err(|e| {
            self.ops.on_error(&e.to_string());
        })
    }

    fn create_prop_raw(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<(), FdtError> {
        self.require_writable()?;
        mutate::create_prop(&mut self.arena, node, name.into(), payload).inspect_err(|e| {
            self.ops.on_error(&e.to_string());
        })?;
        Ok(())
    }

    /// Creates a string-valued property.
    pub fn write_prop_string(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: &str,
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_string(value))
    }

    /// Creates a multi-entry string-list property (e.g. `compatible`).
    pub fn write_prop_strings(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        values: &[&str],
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_strings(values))
    }

    /// Creates a property holding a flat list of `cells_per_value`-wide
    /// big-endian values.
    pub fn write_prop_values(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        values: &[u128],
        cells_per_value: usize,
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_values(values, cells_per_value))
    }

    /// Creates a property holding a list of [`crate::Pair`]-shaped cell
    /// tuples under `layout`.
    pub fn write_prop_pairs(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        values: &[(u128, u128)],
        layout: PairLayout,
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_pairs(values, layout))
    }

    /// Creates a property holding a list of [`crate::Triplet`]-shaped
    /// cell tuples under `layout` (e.g. a `reg` property under
    /// `#address-cells = 2, #size-cells = 1`).
    pub fn write_prop_triplets(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        values: &[(u128, u128, u128)],
        layout: TripletLayout,
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_triplets(values, layout))
    }

    /// Creates a property holding a list of [`crate::Quad`]-shaped cell
    /// tuples under `layout`.
    pub fn write_prop_quads(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        values: &[(u128, u128, u128, u128)],
        layout: QuadLayout,
    ) -> Result<(), FdtError> {
        self.create_prop_raw(node, name, mutate::write_prop_quads(values, layout))
    }

    /// Serializes the current tree into `buf`, which must be 4-byte
    /// aligned and large enough to hold the result. Returns the number
    /// of bytes written.
    pub fn finalise_to_buffer(&self, buf: &mut [u8]) -> Result<usize, FdtError> {
        crate::serialize::finalise_to_buffer(
            &self.arena,
            &self.roots,
            &self.mem_reservations,
            self.boot_cpuid_phys,
            buf,
        )
    }

    /// Serializes the current tree into a freshly allocated, correctly
    /// sized buffer.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, FdtError> {
        crate::serialize::encode_to_vec(
            &self.arena,
            &self.roots,
            &self.mem_reservations,
            self.boot_cpuid_phys,
        )
    }
}
