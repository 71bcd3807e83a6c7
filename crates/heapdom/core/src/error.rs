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

use crate::graph::{HeapId, NodeId, RootKind};
use std::fmt;
use thiserror::Error;

/// A reference recorded by the loader that does not resolve to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DanglingReference {
    /// Edge whose target was never added
    Target { from: NodeId, to: NodeId },
    /// Edges recorded for an id that was never added
    Source { from: NodeId },
    /// Root naming an absent node
    Root { id: NodeId, kind: RootKind },
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReference::Target { from, to } => write!(f, "{from} -> {to}"),
            DanglingReference::Source { from } => write!(f, "{from} (references recorded for an absent node)"),
            DanglingReference::Root { id, kind } => write!(f, "{kind} root -> {id}"),
        }
    }
}

fn format_dangling(dangling: &[DanglingReference]) -> String {
    dangling.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Malformed graph: {} dangling reference(s): {}", dangling.len(), format_dangling(dangling))]
    MalformedGraph { dangling: Vec<DanglingReference> },

    #[error("Node {0} added more than once")]
    DuplicateNode(NodeId),

    #[error("Unknown heap partition: {0:?}")]
    UnknownHeap(HeapId),

    #[error("Too many nodes: at most {maximum} are supported")]
    TooManyNodes { maximum: usize },

    #[error("Too many heap partitions: at most {maximum} are supported")]
    TooManyHeaps { maximum: usize },
}

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DominatorError {
    #[error("Dominator computation did not converge after {passes} passes")]
    NonConvergence { passes: usize },

    #[error("Dominator chain broken at node index {node} during intersection")]
    BrokenChain { node: usize },

    #[error("Dominator computation cancelled after {passes} passes")]
    Cancelled { passes: usize },
}

pub type DominatorResult<T> = Result<T, DominatorError>;

/// Non-fatal conditions observed while computing dominators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisWarning {
    /// No roots were supplied; every node is unreachable
    EmptyRootSet,
    /// Some nodes are not reachable from any root and were left out
    UnreachableNodes { count: usize },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::EmptyRootSet => f.write_str("empty root set"),
            AnalysisWarning::UnreachableNodes { count } => write!(f, "{count} node(s) unreachable from any root"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_graph_lists_every_reference() {
        let err = GraphError::MalformedGraph {
            dangling: vec![
                DanglingReference::Target { from: NodeId(1), to: NodeId(9) },
                DanglingReference::Root { id: NodeId(7), kind: RootKind::JniGlobal },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 dangling reference(s)"));
        assert!(message.contains("0x1 -> 0x9"));
        assert!(message.contains("jni global root -> 0x7"));
    }
}
