//! Slab-backed storage for [`HnswNode`] records.
//!
//! Wraps a [`BlockManager`] sized for the fixed 16-byte `HnswNode` layout so
//! the graph's node table lives in the same slab-allocator world as its
//! neighbor pool, rather than a plain growable `Vec`.

use super::graph::HnswNode;
use crate::block::BlockManager;
use bytemuck::{bytes_of, from_bytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NODE_RECORD_SIZE: usize = std::mem::size_of::<HnswNode>();

/// Append-only, index-addressed store of `HnswNode` records.
pub struct NodeStore {
    blocks: BlockManager,
    len: usize,
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: BlockManager::new(NODE_RECORD_SIZE),
            len: 0,
        }
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no records have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `node` and returns its index.
    pub fn push(&mut self, node: HnswNode) -> usize {
        let idx = self.len;
        self.blocks.push(bytes_of(&node));
        self.len += 1;
        idx
    }

    /// Returns the node at `idx`, if within bounds.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&HnswNode> {
        if idx >= self.len {
            return None;
        }
        let handle = self.blocks.handle_for_index(idx);
        Some(from_bytes(self.blocks.get(handle)))
    }

    /// Reads the node at `idx`, applies `f`, and writes it back.
    ///
    /// No-op if `idx` is out of bounds.
    pub fn update(&mut self, idx: usize, f: impl FnOnce(&mut HnswNode)) {
        if idx >= self.len {
            return;
        }
        let handle = self.blocks.handle_for_index(idx);
        let mut node: HnswNode = *from_bytes(self.blocks.get(handle));
        f(&mut node);
        self.blocks.write(handle, bytes_of(&node));
    }

    /// Iterates over all nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HnswNode> + '_ {
        (0..self.len).map(move |i| self.get(i).expect("index within len"))
    }

    /// Total bytes reserved by the backing slab.
    #[must_use]
    pub fn memory_reserved(&self) -> usize {
        self.blocks.memory_reserved()
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

// BlockManager has no bulk-copy path, so cloning re-pushes every record into
// a fresh slab.
impl Clone for NodeStore {
    fn clone(&self) -> Self {
        let mut store = Self::new();
        for node in self.iter() {
            store.push(*node);
        }
        store
    }
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore").field("len", &self.len).finish()
    }
}

impl Serialize for NodeStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nodes: Vec<HnswNode> = self.iter().copied().collect();
        nodes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = Vec::<HnswNode>::deserialize(deserializer)?;
        let mut store = Self::new();
        for node in nodes {
            store.push(node);
        }
        Ok(store)
    }
}
