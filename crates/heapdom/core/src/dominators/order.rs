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

//! Depth-first numbering and predecessor lists of the sentinel-rooted graph
//!
//! Slots `0..n` are the graph's nodes and slot `n` is the sentinel, whose
//! successors are the distinct root nodes.

use crate::graph::{HeapGraph, NodeIndex};

/// Marker for slots that are not reachable, or not yet assigned
pub(crate) const UNDEFINED: u32 = u32::MAX;

/// Successors of a slot; the sentinel points at every root
fn successors<'g>(graph: &'g HeapGraph, roots: &'g [NodeIndex], slot: usize) -> &'g [NodeIndex] {
    if slot == graph.len() { roots } else { graph.references(NodeIndex(slot as u32)) }
}

/// Depth-first traversal from the sentinel
#[derive(Debug)]
pub(crate) struct Traversal {
    /// Reachable slots in reverse postorder; the sentinel comes first
    pub order: Vec<u32>,
    /// Postorder number per slot, `UNDEFINED` when unreachable
    pub postorder: Vec<u32>,
}

impl Traversal {
    /// Iterative DFS, so deep reference chains cannot overflow the call stack
    pub fn new(graph: &HeapGraph, roots: &[NodeIndex]) -> Self {
        let sentinel = graph.len();
        let mut visited = vec![false; sentinel + 1];
        let mut postorder = vec![UNDEFINED; sentinel + 1];
        let mut finished: Vec<u32> = Vec::new();
        let mut stack: Vec<(usize, usize)> = vec![(sentinel, 0)];
        visited[sentinel] = true;

        while let Some(top) = stack.last_mut() {
            let (slot, cursor) = *top;
            let next = successors(graph, roots, slot);
            if cursor < next.len() {
                top.1 += 1;
                let target = next[cursor].index();
                if !visited[target] {
                    visited[target] = true;
                    stack.push((target, 0));
                }
            } else {
                postorder[slot] = finished.len() as u32;
                finished.push(slot as u32);
                stack.pop();
            }
        }

        finished.reverse();
        Self { order: finished, postorder }
    }

    pub fn reachable(&self) -> usize {
        self.order.len() - 1
    }
}

/// Incoming edges between reachable slots, in compressed sparse row form
#[derive(Debug)]
pub(crate) struct Predecessors {
    offsets: Vec<usize>,
    sources: Vec<u32>,
}

impl Predecessors {
    pub fn new(graph: &HeapGraph, roots: &[NodeIndex], traversal: &Traversal) -> Self {
        let sentinel = graph.len();
        let edges = move || {
            traversal
                .order
                .iter()
                .flat_map(move |&source| successors(graph, roots, source as usize).iter().map(move |target| (source, target.index())))
        };

        let mut offsets = vec![0usize; sentinel + 2];
        for (_, target) in edges() {
            offsets[target + 1] += 1;
        }
        for slot in 0..=sentinel {
            offsets[slot + 1] += offsets[slot];
        }
        let mut cursor = offsets.clone();
        let mut sources = vec![0u32; offsets[sentinel + 1]];
        for (source, target) in edges() {
            sources[cursor[target]] = source;
            cursor[target] += 1;
        }

        Self { offsets, sources }
    }

    pub fn of(&self, slot: usize) -> &[u32] {
        &self.sources[self.offsets[slot]..self.offsets[slot + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::{GraphBuilder, NodeId, RootKind};

    fn chain_with_island() -> HeapGraph {
        let mut builder = GraphBuilder::new(GraphConfig::new());
        let heap = builder.heap("app");
        for id in 1..=5 {
            builder.add_instance(NodeId(id), heap, 1);
        }
        builder
            .add_reference(NodeId(1), NodeId(2))
            .add_reference(NodeId(2), NodeId(3))
            .add_reference(NodeId(3), NodeId(1))
            .add_reference(NodeId(4), NodeId(5))
            .add_reference(NodeId(5), NodeId(4))
            .add_root(NodeId(1), RootKind::Unknown);
        builder.build().unwrap()
    }

    #[test]
    fn test_unreachable_cycle_is_not_numbered() {
        let graph = chain_with_island();
        let roots = graph.root_indices();
        let traversal = Traversal::new(&graph, &roots);

        assert_eq!(traversal.reachable(), 3);
        assert_eq!(traversal.order[0] as usize, graph.len());
        assert_eq!(traversal.postorder[graph.index_of(NodeId(4)).unwrap().index()], UNDEFINED);
        // The sentinel finishes last
        assert_eq!(traversal.postorder[graph.len()], 3);
    }

    #[test]
    fn test_predecessors_include_back_edges_and_sentinel() {
        let graph = chain_with_island();
        let roots = graph.root_indices();
        let traversal = Traversal::new(&graph, &roots);
        let predecessors = Predecessors::new(&graph, &roots, &traversal);

        let first = graph.index_of(NodeId(1)).unwrap().index();
        let third = graph.index_of(NodeId(3)).unwrap().index() as u32;
        let mut incoming = predecessors.of(first).to_vec();
        incoming.sort_unstable();
        assert_eq!(incoming, vec![third, graph.len() as u32]);

        // Edges out of the unreachable island are not recorded
        let fourth = graph.index_of(NodeId(4)).unwrap().index();
        assert!(predecessors.of(fourth).is_empty());
    }
}
