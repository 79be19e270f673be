//! The arena: bump-allocated node and property slabs plus the phandle
//! index, all owned by one [`Arena`] value.
//!
//! `parent`/`child`/`sibling`/`next` links are indices into the node and
//! property slabs (`NodeId`/`PropId`) rather than raw pointers — the
//! arena-plus-indices realization of a parent-linked tree that Rust's
//! ownership model pushes you toward.

use std::borrow::Cow;

use crate::error::{ArenaKind, FdtError};

/// Index of a node within its owning [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// Index of a property within its owning [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropId(pub(crate) u32);

/// A property's payload: borrowed straight out of the source blob for
/// anything produced by parsing, or owned when a mutation API wrote it.
#[derive(Debug, Clone)]
pub(crate) enum Payload<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> Payload<'a> {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Borrowed(b) => b,
            Payload::Owned(v) => v,
        }
    }
}

/// One device-tree node.
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    pub name: Cow<'a, str>,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_prop: Option<PropId>,
}

/// One property, value stored as a contiguous big-endian byte payload.
#[derive(Debug, Clone)]
pub(crate) struct Prop<'a> {
    pub name: Cow<'a, str>,
    pub payload: Payload<'a>,
    pub next: Option<PropId>,
}

/// Owning storage for every node and property in a parsed (or
/// programmatically built) tree, plus the phandle → node index.
pub(crate) struct Arena<'a> {
    pub nodes: Vec<Node<'a>>,
    pub props: Vec<Prop<'a>>,
    /// Dense phandle → node table, sized to the node count at parse time.
    pub phandle_index: Vec<Option<NodeId>>,
    node_cap: usize,
    prop_cap: usize,
}

impl<'a> Arena<'a> {
    /// Reserves slabs sized from a pre-scan of the structure block:
    /// `node_cap` nodes, `prop_cap` properties, and a phandle table with
    /// one slot per node (the worst case, every node has a phandle).
    pub fn with_capacity(node_cap: usize, prop_cap: usize) -> Self {
        Arena {
            nodes: Vec::with_capacity(node_cap),
            props: Vec::with_capacity(prop_cap),
            phandle_index: vec![None; node_cap],
            node_cap,
            prop_cap,
        }
    }

    /// Allocates a new node, or reports arena exhaustion if the
    /// pre-scanned capacity has been used up.
    pub fn alloc_node(&mut self, node: Node<'a>) -> Result<NodeId, FdtError> {
        if self.nodes.len() >= self.node_cap {
            return Err(FdtError::ArenaExhausted {
                kind: ArenaKind::Node,
                capacity: self.node_cap,
            });
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        // A node created after parsing (mutation) may push past the
        // phandle table sized for the original node count; grow it
        // lazily so `phandle_index[handle]` stays safely indexable by
        // node count, not node id.
        if self.phandle_index.len() < self.nodes.len() {
            self.phandle_index.push(None);
        }
        Ok(id)
    }

    /// Allocates a new property, or reports arena exhaustion.
    pub fn alloc_prop(&mut self, prop: Prop<'a>) -> Result<PropId, FdtError> {
        if self.props.len() >= self.prop_cap {
            return Err(FdtError::ArenaExhausted {
                kind: ArenaKind::Prop,
                capacity: self.prop_cap,
            });
        }
        let id = PropId(self.props.len() as u32);
        self.props.push(prop);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> &Node<'a> {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<'a> {
        &mut self.nodes[id.0 as usize]
    }

    pub fn prop(&self, id: PropId) -> &Prop<'a> {
        &self.props[id.0 as usize]
    }

    /// Number of nodes actually allocated so far (the `N_nodes` pre-scan
    /// count once parsing is complete).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node count the arena was originally reserved for, i.e.
    /// `N_nodes` from the structure-block pre-scan. Used by the parser
    /// to tell a phandle discovered during parsing (which must fall
    /// below this bound, or be silently ignored) apart from one
    /// registered later for a mutation-created node (which may not).
    pub fn node_cap(&self) -> usize {
        self.node_cap
    }

    /// Records `node` as the target of `phandle`, growing the dense
    /// table if the value exceeds the original node-count reservation.
    /// Callers that must honor "values at or above N_nodes are silently
    /// ignored" (i.e. the parser, for phandles discovered in the blob)
    /// are responsible for checking `handle < node_cap()` themselves
    /// before calling this; mutation-created nodes are free to register
    /// phandles past that bound, which is what grows the table here.
    pub fn set_phandle(&mut self, handle: u32, node: NodeId) {
        let idx = handle as usize;
        if idx >= self.phandle_index.len() {
            self.phandle_index.resize(idx + 1, None);
        }
        self.phandle_index[idx] = Some(node);
    }

    /// Appends `child` to the end of `parent`'s child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match self.node(parent).first_child {
            None => self.node_mut(parent).first_child = Some(child),
            Some(first) => {
                let mut cursor = first;
                loop {
                    match self.node(cursor).next_sibling {
                        Some(next) => cursor = next,
                        None => {
                            self.node_mut(cursor).next_sibling = Some(child);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Appends `prop` to the end of `node`'s property list.
    pub fn append_prop(&mut self, node: NodeId, prop: PropId) {
        match self.node(node).first_prop {
            None => self.node_mut(node).first_prop = Some(prop),
            Some(first) => {
                let mut cursor = first;
                loop {
                    match self.prop(cursor).next {
                        Some(next) => cursor = next,
                        None => {
                            self.props[cursor.0 as usize].next = Some(prop);
                            break;
                        }
                    }
                }
            }
        }
    }

    pub fn phandle_lookup(&self, handle: u32) -> Option<NodeId> {
        self.phandle_index.get(handle as usize).copied().flatten()
    }

    /// Reverse lookup: does any phandle value map to `node`? Linear in
    /// the phandle table; used only for diagnostics ([`crate::query::stat`]),
    /// not on any parsing or lookup hot path.
    pub fn phandle_of(&self, node: NodeId) -> Option<u32> {
        self.phandle_index
            .iter()
            .position(|slot| *slot == Some(node))
            .map(|idx| idx as u32)
    }
}
