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

//! Construction of [`HeapGraph`] from loader output

use super::store::{Heap, HeapGraph, Node, Root};
use super::types::{Footprint, HeapId, NodeId, NodeIndex, NodeKind, RootKind, Type};
use crate::config::GraphConfig;
use crate::error::{DanglingReference, GraphError, GraphResult};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Largest node count; one index above it is reserved for the sentinel root
pub const MAX_NODES: usize = u32::MAX as usize - 1;

/// Largest number of heap partitions
pub const MAX_HEAPS: usize = u16::MAX as usize + 1;

/// Collects nodes, references and roots, then validates them into a closed graph
///
/// References and roots may name ids that are added later; everything is
/// resolved in [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
    nodes: Vec<Node>,
    index: HashMap<NodeId, NodeIndex>,
    duplicate: Option<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
    roots: Vec<(NodeId, RootKind)>,
    heaps: Vec<Heap>,
    too_many_heaps: bool,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config, ..Default::default() }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Id of the heap partition with this name, registering it on first use
    pub fn heap(&mut self, name: &str) -> HeapId {
        if let Some(heap) = self.heaps.iter().find(|heap| heap.name == name) {
            return heap.id;
        }
        if self.heaps.len() >= MAX_HEAPS {
            self.too_many_heaps = true;
            return HeapId(u16::MAX);
        }
        let id = HeapId(self.heaps.len() as u16);
        self.heaps.push(Heap { id, name: name.to_string() });
        id
    }

    /// Add a node; its size is resolved from the footprint with the configured id width
    pub fn add_node(&mut self, id: NodeId, heap: HeapId, kind: NodeKind, footprint: Footprint) -> &mut Self {
        if self.index.contains_key(&id) {
            self.duplicate.get_or_insert(id);
            return self;
        }
        let size = footprint.resolve(self.config.id_size);
        self.index.insert(id, NodeIndex(self.nodes.len().min(u32::MAX as usize) as u32));
        self.nodes.push(Node { id, kind, size, heap });
        self
    }

    pub fn add_instance(&mut self, id: NodeId, heap: HeapId, size: u64) -> &mut Self {
        self.add_node(id, heap, NodeKind::Instance { class: None }, Footprint::Bytes(size))
    }

    pub fn add_class(&mut self, id: NodeId, heap: HeapId, name: &str, size: u64) -> &mut Self {
        self.add_node(id, heap, NodeKind::Class { name: name.to_string() }, Footprint::Bytes(size))
    }

    pub fn add_array(&mut self, id: NodeId, heap: HeapId, element: Type, length: u64) -> &mut Self {
        self.add_node(id, heap, NodeKind::Array { element, length }, Footprint::Array { element, length })
    }

    pub fn add_reference(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    pub fn add_references(&mut self, from: NodeId, targets: impl IntoIterator<Item = NodeId>) -> &mut Self {
        self.edges.extend(targets.into_iter().map(|to| (from, to)));
        self
    }

    pub fn add_root(&mut self, id: NodeId, kind: RootKind) -> &mut Self {
        self.roots.push((id, kind));
        self
    }

    /// Validate and freeze the graph
    ///
    /// Every dangling reference is collected before failing, so a partially
    /// loaded dump reports all of its holes at once.
    #[instrument(skip(self), fields(nodes = self.nodes.len(), edges = self.edges.len(), roots = self.roots.len()))]
    pub fn build(self) -> GraphResult<HeapGraph> {
        if self.nodes.len() > MAX_NODES {
            return Err(GraphError::TooManyNodes { maximum: MAX_NODES });
        }
        if self.too_many_heaps {
            return Err(GraphError::TooManyHeaps { maximum: MAX_HEAPS });
        }
        if let Some(id) = self.duplicate {
            return Err(GraphError::DuplicateNode(id));
        }
        if let Some(node) = self.nodes.iter().find(|node| node.heap.index() >= self.heaps.len()) {
            return Err(GraphError::UnknownHeap(node.heap));
        }

        let mut dangling = BTreeSet::new();
        let mut resolved = Vec::with_capacity(self.edges.len());
        for &(from, to) in &self.edges {
            match (self.index.get(&from), self.index.get(&to)) {
                (Some(&source), Some(&target)) => resolved.push((source, target)),
                (None, _) => {
                    dangling.insert(DanglingReference::Source { from });
                }
                (Some(_), None) => {
                    dangling.insert(DanglingReference::Target { from, to });
                }
            }
        }

        let mut roots = Vec::with_capacity(self.roots.len());
        for &(id, kind) in &self.roots {
            match self.index.get(&id) {
                Some(&node) => roots.push(Root { node, kind }),
                None => {
                    dangling.insert(DanglingReference::Root { id, kind });
                }
            }
        }

        if !dangling.is_empty() {
            return Err(GraphError::MalformedGraph { dangling: dangling.into_iter().collect() });
        }

        // Counting sort by source keeps each node's references in insertion order.
        let mut edge_offsets = vec![0usize; self.nodes.len() + 1];
        for &(source, _) in &resolved {
            edge_offsets[source.index() + 1] += 1;
        }
        for i in 0..self.nodes.len() {
            edge_offsets[i + 1] += edge_offsets[i];
        }
        let mut cursor = edge_offsets.clone();
        let mut edge_targets = vec![NodeIndex(0); resolved.len()];
        for &(source, target) in &resolved {
            let slot = &mut cursor[source.index()];
            edge_targets[*slot] = target;
            *slot += 1;
        }

        debug!(nodes = self.nodes.len(), edges = edge_targets.len(), heaps = self.heaps.len(), "built heap graph");

        Ok(HeapGraph {
            config: self.config,
            nodes: self.nodes,
            index: self.index,
            edge_offsets,
            edge_targets,
            heaps: self.heaps,
            roots,
        })
    }
}
