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

#![allow(dead_code)]

use heapdom_core::{Dominator, DominatorMap, GraphBuilder, GraphConfig, HeapGraph, HeapId, NodeId, RootKind};

/// Builds small test snapshots whose nodes are numbered `1..=count`
pub struct SnapshotBuilder {
    builder: GraphBuilder,
    heap: HeapId,
}

impl SnapshotBuilder {
    /// `count` nodes of 1 byte each in a single "app" heap
    pub fn new(count: u64) -> Self {
        Self::with_sizes(count, |_| 1)
    }

    pub fn with_sizes(count: u64, size: impl Fn(u64) -> u64) -> Self {
        let mut builder = GraphBuilder::new(GraphConfig::default());
        let heap = builder.heap("app");
        for id in 1..=count {
            builder.add_instance(NodeId(id), heap, size(id));
        }
        Self { builder, heap }
    }

    pub fn heap(&self) -> HeapId {
        self.heap
    }

    pub fn add_references(mut self, from: u64, targets: &[u64]) -> Self {
        self.builder.add_references(NodeId(from), targets.iter().map(|&to| NodeId(to)));
        self
    }

    pub fn add_root(mut self, id: u64) -> Self {
        self.builder.add_root(NodeId(id), RootKind::Unknown);
        self
    }

    pub fn build(self) -> HeapGraph {
        self.builder.build().expect("test snapshot should be closed")
    }
}

/// Dominator of `id` by external id
pub fn dominator(map: &DominatorMap, graph: &HeapGraph, id: u64) -> Option<Dominator<NodeId>> {
    map.get_by_id(graph, NodeId(id))
}

/// Asserts that `a` is the immediate dominator of `b`
pub fn assert_dominates(map: &DominatorMap, graph: &HeapGraph, a: u64, b: u64) {
    assert_eq!(dominator(map, graph, b), Some(Dominator::Node(NodeId(a))), "expected {a} to immediately dominate {b}");
}
