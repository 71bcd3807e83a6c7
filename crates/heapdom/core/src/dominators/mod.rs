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

//! Dominator analysis over the heap reachability graph
//!
//! A synthetic sentinel root points at every real root, giving the graph a
//! single entry. Every reachable node ends up with exactly one immediate
//! dominator, which is either a real node or [`Dominator::Sentinel`]. The
//! sentinel is the answer whenever no single real node lies on every path
//! to a node: GC roots themselves, and objects kept alive through two or more
//! independent roots.

mod engine;
mod order;

pub use engine::{CancellationToken, DominatorEngine, compute_dominators};

use crate::error::AnalysisWarning;
use crate::graph::{HeapGraph, NodeId, NodeIndex};
use order::UNDEFINED;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Immediate dominator of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dominator<N> {
    /// The synthetic root above all GC roots
    Sentinel,
    Node(N),
}

impl<N> Dominator<N> {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Dominator::Sentinel)
    }

    pub fn node(self) -> Option<N> {
        match self {
            Dominator::Sentinel => None,
            Dominator::Node(node) => Some(node),
        }
    }

    pub fn map<M>(self, f: impl FnOnce(N) -> M) -> Dominator<M> {
        match self {
            Dominator::Sentinel => Dominator::Sentinel,
            Dominator::Node(node) => Dominator::Node(f(node)),
        }
    }
}

impl<N: fmt::Display> fmt::Display for Dominator<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dominator::Sentinel => f.write_str("<sentinel>"),
            Dominator::Node(node) => node.fmt(f),
        }
    }
}

/// Immediate dominators of every node reachable from the roots
///
/// Slots `0..n` mirror the graph's dense indices and slot `n` is the
/// sentinel. The map only makes sense together with the graph it was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorMap {
    pub(crate) idom: Vec<u32>,
    /// Reachable nodes in reverse postorder, sentinel excluded
    pub(crate) order: Vec<u32>,
    pub(crate) passes: usize,
    pub(crate) warnings: Vec<AnalysisWarning>,
}

impl DominatorMap {
    fn sentinel(&self) -> u32 {
        (self.idom.len() - 1) as u32
    }

    fn decode(&self, slot: u32) -> Dominator<NodeIndex> {
        if slot == self.sentinel() { Dominator::Sentinel } else { Dominator::Node(NodeIndex(slot)) }
    }

    /// Number of reachable nodes, i.e. entries in the map
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fixed-point passes run, including the final pass that confirmed convergence
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    /// Immediate dominator of a node, `None` when it is unreachable
    pub fn get(&self, node: NodeIndex) -> Option<Dominator<NodeIndex>> {
        if node.0 >= self.sentinel() {
            return None;
        }
        match self.idom[node.index()] {
            UNDEFINED => None,
            slot => Some(self.decode(slot)),
        }
    }

    /// Immediate dominator of a node looked up by its external id
    pub fn get_by_id(&self, graph: &HeapGraph, id: NodeId) -> Option<Dominator<NodeId>> {
        let index = graph.index_of(id)?;
        self.get(index).map(|dominator| dominator.map(|node| graph.node(node).id))
    }

    pub fn is_reachable(&self, node: NodeIndex) -> bool {
        self.get(node).is_some()
    }

    /// Reachable nodes with their dominators, dominators always before the nodes they dominate
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, Dominator<NodeIndex>)> + '_ {
        self.order.iter().map(|&slot| (NodeIndex(slot), self.decode(self.idom[slot as usize])))
    }

    /// Reachable nodes, every node before its dominator
    pub(crate) fn postorder(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.order.iter().rev().map(|&slot| NodeIndex(slot))
    }

    /// Whether every path from the roots to `node` passes through `dominator`
    ///
    /// A reachable node dominates itself.
    pub fn dominates(&self, dominator: NodeIndex, node: NodeIndex) -> bool {
        if !self.is_reachable(node) {
            return false;
        }
        let mut current = Dominator::Node(node);
        while let Dominator::Node(index) = current {
            if index == dominator {
                return true;
            }
            current = self.decode(self.idom[index.index()]);
        }
        false
    }

    /// Dominators of a node from the immediate one up to the sentinel
    pub fn dominator_chain(&self, node: NodeIndex) -> Vec<Dominator<NodeIndex>> {
        let mut chain = Vec::new();
        let mut current = self.get(node);
        while let Some(dominator) = current {
            chain.push(dominator);
            current = match dominator {
                Dominator::Sentinel => None,
                Dominator::Node(index) => self.get(index),
            };
        }
        chain
    }

    /// Nodes immediately dominated by `parent`, in reverse postorder
    ///
    /// Linear in the number of reachable nodes.
    pub fn children_of(&self, parent: Dominator<NodeIndex>) -> Vec<NodeIndex> {
        let slot = match parent {
            Dominator::Sentinel => self.sentinel(),
            Dominator::Node(index) => index.0,
        };
        self.order.iter().filter(|&&child| self.idom[child as usize] == slot).map(|&child| NodeIndex(child)).collect()
    }

    /// The map keyed by external ids; the sentinel only ever appears as a value
    pub fn to_id_map(&self, graph: &HeapGraph) -> BTreeMap<NodeId, Dominator<NodeId>> {
        self.iter().map(|(node, dominator)| (graph.node(node).id, dominator.map(|index| graph.node(index).id))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::{GraphBuilder, RootKind};

    /// 1 -> 2 -> 3, 1 -> 3, 3 -> 4, root 1
    fn diamond() -> HeapGraph {
        let mut builder = GraphBuilder::new(GraphConfig::new());
        let heap = builder.heap("app");
        for id in 1..=4 {
            builder.add_instance(NodeId(id), heap, 1);
        }
        builder
            .add_references(NodeId(1), [NodeId(2), NodeId(3)])
            .add_reference(NodeId(2), NodeId(3))
            .add_reference(NodeId(3), NodeId(4))
            .add_root(NodeId(1), RootKind::StickyClass);
        builder.build().unwrap()
    }

    #[test]
    fn test_dominates_and_chain() {
        let graph = diamond();
        let map = compute_dominators(&graph).unwrap();
        let idx = |id| graph.index_of(NodeId(id)).unwrap();

        assert!(map.dominates(idx(1), idx(4)));
        assert!(map.dominates(idx(3), idx(4)));
        assert!(map.dominates(idx(4), idx(4)));
        assert!(!map.dominates(idx(2), idx(3)));
        assert_eq!(map.dominator_chain(idx(4)), vec![Dominator::Node(idx(3)), Dominator::Node(idx(1)), Dominator::Sentinel]);
        assert_eq!(map.dominator_chain(idx(1)), vec![Dominator::Sentinel]);
    }

    #[test]
    fn test_children_of() {
        let graph = diamond();
        let map = compute_dominators(&graph).unwrap();
        let idx = |id| graph.index_of(NodeId(id)).unwrap();

        assert_eq!(map.children_of(Dominator::Sentinel), vec![idx(1)]);
        let mut children = map.children_of(Dominator::Node(idx(1)));
        children.sort();
        assert_eq!(children, vec![idx(2), idx(3)]);
        assert!(map.children_of(Dominator::Node(idx(4))).is_empty());
    }

    #[test]
    fn test_iteration_puts_dominators_first() {
        let graph = diamond();
        let map = compute_dominators(&graph).unwrap();
        let mut seen = vec![false; graph.len()];
        for (node, dominator) in map.iter() {
            if let Dominator::Node(parent) = dominator {
                assert!(seen[parent.index()]);
            }
            seen[node.index()] = true;
        }
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_dominator_display() {
        assert_eq!(Dominator::<NodeId>::Sentinel.to_string(), "<sentinel>");
        assert_eq!(Dominator::Node(NodeId(0x2a)).to_string(), "0x2a");
    }
}
