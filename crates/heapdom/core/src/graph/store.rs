// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Immutable heap graph
//!
//! Nodes live in a dense table indexed by [`NodeIndex`]; outgoing references
//! are stored in compressed sparse row form (one offsets array, one targets
//! array), so the graph holds no owning pointers between nodes and cycles
//! cost nothing special.

use super::types::{HeapId, NodeId, NodeIndex, NodeKind, RootKind};
use crate::config::GraphConfig;
use std::collections::HashMap;

/// A heap object or class in the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Intrinsic (shallow) size in bytes
    pub size: u64,
    pub heap: HeapId,
}

impl Node {
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Class { name } => Some(name),
            _ => None,
        }
    }
}

/// Named heap partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heap {
    pub id: HeapId,
    pub name: String,
}

/// A GC root entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root {
    pub node: NodeIndex,
    pub kind: RootKind,
}

/// Closed, immutable reference graph of one heap snapshot
#[derive(Debug, Clone)]
pub struct HeapGraph {
    pub(crate) config: GraphConfig,
    pub(crate) nodes: Vec<Node>,
    pub(crate) index: HashMap<NodeId, NodeIndex>,
    /// `edge_offsets[i]..edge_offsets[i + 1]` spans the references of node `i`
    pub(crate) edge_offsets: Vec<usize>,
    pub(crate) edge_targets: Vec<NodeIndex>,
    pub(crate) heaps: Vec<Heap>,
    pub(crate) roots: Vec<Root>,
}

impl HeapGraph {
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_targets.len()
    }

    /// Node at a dense index
    ///
    /// # Panics
    ///
    /// Panics if the index was not produced by this graph.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|index| self.node(index))
    }

    /// All nodes in dense index order
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = (NodeIndex, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeIndex(i as u32), node))
    }

    /// Outgoing references of a node, in the order the loader recorded them
    pub fn references(&self, index: NodeIndex) -> &[NodeIndex] {
        let i = index.index();
        &self.edge_targets[self.edge_offsets[i]..self.edge_offsets[i + 1]]
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    /// Distinct root nodes, in order of first appearance
    pub fn root_indices(&self) -> Vec<NodeIndex> {
        let mut seen = vec![false; self.nodes.len()];
        self.roots
            .iter()
            .filter_map(|root| {
                let slot = &mut seen[root.node.index()];
                if *slot {
                    None
                } else {
                    *slot = true;
                    Some(root.node)
                }
            })
            .collect()
    }

    pub fn heaps(&self) -> &[Heap] {
        &self.heaps
    }

    pub fn heap(&self, id: HeapId) -> Option<&Heap> {
        self.heaps.get(id.index())
    }

    pub fn heap_by_name(&self, name: &str) -> Option<&Heap> {
        self.heaps.iter().find(|heap| heap.name == name)
    }

    /// Class object with the given name
    pub fn find_class(&self, name: &str) -> Option<NodeIndex> {
        self.nodes().find(|(_, node)| node.class_name() == Some(name)).map(|(index, _)| index)
    }

    /// Sum of the intrinsic sizes of every node, reachable or not
    pub fn total_size(&self) -> u64 {
        self.nodes.iter().fold(0u64, |acc, node| acc.saturating_add(node.size))
    }
}
