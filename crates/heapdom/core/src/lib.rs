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

//! Heap dominator and retained size engine
//!
//! Given a heap snapshot that an external loader has already decoded into
//! objects, classes, heap partitions and GC roots, this crate computes the
//! immediate dominator of every reachable object and, from the dominator
//! tree, how many bytes of each heap partition every object keeps alive.
//!
//! ## Components
//!
//! - [`graph`]: the immutable graph store, built once through [`GraphBuilder`]
//! - [`dominators`]: iterative fixed-point dominator computation with a
//!   synthetic sentinel root above all GC roots
//! - [`retained`]: per-partition retained size accumulation over the
//!   dominator tree
//! - [`analysis`]: a session that caches both derived artifacts
//!
//! ## Usage
//!
//! ```rust
//! use heapdom_core::{Dominator, GraphBuilder, GraphConfig, NodeId, RootKind};
//! use heapdom_core::{compute_dominators, compute_retained_sizes};
//!
//! let mut builder = GraphBuilder::new(GraphConfig::default());
//! let app = builder.heap("app");
//! builder
//!     .add_instance(NodeId(1), app, 16)
//!     .add_instance(NodeId(2), app, 24)
//!     .add_reference(NodeId(1), NodeId(2))
//!     .add_root(NodeId(1), RootKind::JniGlobal);
//! let graph = builder.build().unwrap();
//!
//! let dominators = compute_dominators(&graph).unwrap();
//! assert_eq!(dominators.get_by_id(&graph, NodeId(2)), Some(Dominator::Node(NodeId(1))));
//! assert_eq!(dominators.get_by_id(&graph, NodeId(1)), Some(Dominator::Sentinel));
//!
//! let retained = compute_retained_sizes(&graph, &dominators);
//! assert_eq!(retained.retained_size(graph.index_of(NodeId(1)).unwrap(), app), 40);
//! ```

pub mod analysis;
pub mod config;
pub mod dominators;
pub mod error;
pub mod graph;
pub mod retained;

pub use analysis::{HeapAnalysis, SnapshotReport, analyze_all};
pub use config::{AnalysisConfig, DominatorConfig, GraphConfig, RetainedConfig};
pub use dominators::{CancellationToken, Dominator, DominatorEngine, DominatorMap, compute_dominators};
pub use error::{AnalysisWarning, DanglingReference, DominatorError, DominatorResult, GraphError, GraphResult};
pub use graph::{Footprint, GraphBuilder, Heap, HeapGraph, HeapId, IdSize, Node, NodeId, NodeIndex, NodeKind, Root, RootKind, Type};
pub use retained::{RetainedSizes, compute_retained_sizes, compute_retained_sizes_with};
