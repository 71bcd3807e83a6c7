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

//! Analysis session over one snapshot
//!
//! [`HeapAnalysis`] owns a shared, immutable graph and lazily derives the
//! dominator map and the retained size table from it. Both artifacts are
//! cached for the lifetime of the session; a failed or cancelled computation
//! leaves the cache empty so the next call starts from scratch. A cancelled
//! run also retires its token, so the restart is not cancelled again.

use crate::config::AnalysisConfig;
use crate::dominators::{CancellationToken, Dominator, DominatorEngine, DominatorMap};
use crate::error::{DominatorError, DominatorResult};
use crate::graph::{HeapGraph, NodeId};
use crate::retained::{RetainedSizes, compute_retained_sizes_with};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct HeapAnalysis {
    graph: Arc<HeapGraph>,
    config: AnalysisConfig,
    cancellation: Mutex<CancellationToken>,
    dominators: RwLock<Option<Arc<DominatorMap>>>,
    retained: RwLock<Option<Arc<RetainedSizes>>>,
}

impl HeapAnalysis {
    pub fn new(graph: Arc<HeapGraph>) -> Self {
        Self::with_config(graph, AnalysisConfig::default())
    }

    pub fn with_config(graph: Arc<HeapGraph>, config: AnalysisConfig) -> Self {
        Self {
            graph,
            config,
            cancellation: Mutex::new(CancellationToken::new()),
            dominators: RwLock::new(None),
            retained: RwLock::new(None),
        }
    }

    pub fn graph(&self) -> &Arc<HeapGraph> {
        &self.graph
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Token that aborts the current or next dominator computation between passes
    ///
    /// A token is spent once a run observes it; fetch a new one for the next run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.lock().clone()
    }

    /// Dominator map, computed on first use
    pub fn dominators(&self) -> DominatorResult<Arc<DominatorMap>> {
        if let Some(map) = self.dominators.read().as_ref() {
            return Ok(Arc::clone(map));
        }

        let mut slot = self.dominators.write();
        if let Some(map) = slot.as_ref() {
            return Ok(Arc::clone(map));
        }
        let token = self.cancellation_token();
        let result = DominatorEngine::new(&self.graph).with_config(self.config.dominators).with_cancellation(token).run();
        let map = match result {
            Ok(map) => Arc::new(map),
            Err(err @ DominatorError::Cancelled { .. }) => {
                warn!("discarding cancelled dominator run");
                *self.cancellation.lock() = CancellationToken::new();
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        *slot = Some(Arc::clone(&map));
        Ok(map)
    }

    /// Retained size table, computed on first use together with the dominators it needs
    pub fn retained_sizes(&self) -> DominatorResult<Arc<RetainedSizes>> {
        if let Some(sizes) = self.retained.read().as_ref() {
            return Ok(Arc::clone(sizes));
        }

        let dominators = self.dominators()?;
        let mut slot = self.retained.write();
        if let Some(sizes) = slot.as_ref() {
            return Ok(Arc::clone(sizes));
        }
        let sizes = Arc::new(compute_retained_sizes_with(&self.graph, &dominators, self.config.retained));
        *slot = Some(Arc::clone(&sizes));
        Ok(sizes)
    }

    /// Immediate dominator of a node by external id; `None` for unknown or unreachable nodes
    pub fn dominator_of(&self, id: NodeId) -> DominatorResult<Option<Dominator<NodeId>>> {
        Ok(self.dominators()?.get_by_id(&self.graph, id))
    }

    /// Dominators of a node from the immediate one up to the sentinel
    pub fn dominator_path(&self, id: NodeId) -> DominatorResult<Vec<Dominator<NodeId>>> {
        let Some(index) = self.graph.index_of(id) else {
            return Ok(Vec::new());
        };
        let dominators = self.dominators()?;
        Ok(dominators.dominator_chain(index).into_iter().map(|dominator| dominator.map(|node| self.graph.node(node).id)).collect())
    }

    /// Bytes of the named heap retained by a node; `None` for unknown nodes or heaps
    pub fn retained_size(&self, id: NodeId, heap: &str) -> DominatorResult<Option<u64>> {
        let (Some(index), Some(heap)) = (self.graph.index_of(id), self.graph.heap_by_name(heap)) else {
            return Ok(None);
        };
        Ok(Some(self.retained_sizes()?.retained_size(index, heap.id)))
    }
}

/// Results of analyzing one snapshot in a batch
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub dominators: Arc<DominatorMap>,
    pub retained: Arc<RetainedSizes>,
}

/// Analyze independent snapshots in parallel
///
/// Snapshots share no mutable state, so each runs its full pipeline on the
/// rayon pool. Results come back in input order.
pub fn analyze_all(graphs: &[Arc<HeapGraph>], config: &AnalysisConfig) -> Vec<DominatorResult<SnapshotReport>> {
    info!(snapshots = graphs.len(), "analyzing snapshots");
    graphs
        .par_iter()
        .map(|graph| {
            let analysis = HeapAnalysis::with_config(Arc::clone(graph), *config);
            let retained = analysis.retained_sizes()?;
            let dominators = analysis.dominators()?;
            debug!(nodes = graph.len(), reachable = dominators.len(), "snapshot analyzed");
            Ok(SnapshotReport { dominators, retained })
        })
        .collect()
}
