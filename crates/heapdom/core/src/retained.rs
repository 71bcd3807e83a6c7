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

//! Retained size accumulation over the dominator tree
//!
//! Nodes are folded in postorder, so every node is complete before its
//! dominator absorbs it. Totals are kept per heap partition in one column per
//! heap; columns are independent and can be accumulated in parallel.

use crate::config::RetainedConfig;
use crate::dominators::{Dominator, DominatorMap};
use crate::graph::{HeapGraph, HeapId, NodeId, NodeIndex};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Retained bytes per node and heap partition
///
/// Each column has one slot per graph node plus a final slot for the
/// sentinel. Unreachable nodes retain nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedSizes {
    columns: Vec<Vec<u64>>,
}

impl RetainedSizes {
    fn sentinel_slot(&self) -> usize {
        self.columns.first().map_or(0, |column| column.len() - 1)
    }

    /// Bytes of `heap` kept alive only through `node`, the node itself included
    pub fn retained_size(&self, node: NodeIndex, heap: HeapId) -> u64 {
        if node.index() >= self.sentinel_slot() {
            return 0;
        }
        self.columns.get(heap.index()).map_or(0, |column| column[node.index()])
    }

    /// Retained bytes of a node summed over all heaps
    pub fn total(&self, node: NodeIndex) -> u64 {
        if node.index() >= self.sentinel_slot() {
            return 0;
        }
        self.columns.iter().map(|column| column[node.index()]).sum()
    }

    /// Non-zero retained bytes of a node, per heap
    pub fn by_heap(&self, node: NodeIndex) -> Vec<(HeapId, u64)> {
        (0..self.columns.len())
            .map(|heap| HeapId(heap as u16))
            .map(|heap| (heap, self.retained_size(node, heap)))
            .filter(|&(_, bytes)| bytes > 0)
            .collect()
    }

    /// Reachable bytes of a heap, which is what the sentinel retains
    pub fn sentinel(&self, heap: HeapId) -> u64 {
        let slot = self.sentinel_slot();
        self.columns.get(heap.index()).map_or(0, |column| column[slot])
    }

    /// Reachable bytes over all heaps
    pub fn sentinel_total(&self) -> u64 {
        let slot = self.sentinel_slot();
        self.columns.iter().map(|column| column[slot]).sum()
    }

    /// The `limit` nodes retaining the most bytes of `heap`, largest first
    ///
    /// Ties are broken by dense index so the result is stable.
    pub fn largest(&self, heap: HeapId, limit: usize) -> Vec<(NodeIndex, u64)> {
        let Some(column) = self.columns.get(heap.index()) else {
            return Vec::new();
        };
        let mut ranked: Vec<(NodeIndex, u64)> =
            column[..self.sentinel_slot()].iter().enumerate().filter(|&(_, &bytes)| bytes > 0).map(|(i, &bytes)| (NodeIndex(i as u32), bytes)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Retained sizes keyed by external id and heap name, reachable nodes only
    pub fn to_id_map(&self, graph: &HeapGraph, dominators: &DominatorMap) -> BTreeMap<NodeId, BTreeMap<String, u64>> {
        dominators
            .iter()
            .map(|(node, _)| {
                let per_heap = graph.heaps().iter().map(|heap| (heap.name.clone(), self.retained_size(node, heap.id))).collect();
                (graph.node(node).id, per_heap)
            })
            .collect()
    }
}

/// Accumulate one heap partition's column
fn accumulate_column(graph: &HeapGraph, dominators: &DominatorMap, heap: HeapId) -> Vec<u64> {
    let sentinel = graph.len();
    let mut column = vec![0u64; sentinel + 1];
    for node in dominators.postorder() {
        let own = graph.node(node);
        if own.heap == heap {
            column[node.index()] = column[node.index()].saturating_add(own.size);
        }
        let parent = match dominators.get(node) {
            Some(Dominator::Node(parent)) => parent.index(),
            _ => sentinel,
        };
        column[parent] = column[parent].saturating_add(column[node.index()]);
    }
    column
}

/// Compute retained sizes for every reachable node and heap partition
#[instrument(skip_all, fields(nodes = graph.len(), heaps = graph.heaps().len(), parallel = config.parallel))]
pub fn compute_retained_sizes_with(graph: &HeapGraph, dominators: &DominatorMap, config: RetainedConfig) -> RetainedSizes {
    let heaps: Vec<HeapId> = graph.heaps().iter().map(|heap| heap.id).collect();
    let columns: Vec<Vec<u64>> = if config.parallel {
        heaps.par_iter().map(|&heap| accumulate_column(graph, dominators, heap)).collect()
    } else {
        heaps.iter().map(|&heap| accumulate_column(graph, dominators, heap)).collect()
    };
    let sizes = RetainedSizes { columns };
    debug!(reachable_bytes = sizes.sentinel_total(), "accumulated retained sizes");
    sizes
}

/// Compute retained sizes sequentially
pub fn compute_retained_sizes(graph: &HeapGraph, dominators: &DominatorMap) -> RetainedSizes {
    compute_retained_sizes_with(graph, dominators, RetainedConfig::default())
}
