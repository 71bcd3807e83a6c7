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

//! Iterative fixed-point dominator computation
//!
//! This is the Cooper-Harvey-Kennedy formulation: nodes are visited in
//! reverse postorder and each node's dominator becomes the meeting point of
//! its processed predecessors' dominator chains. Passes repeat until nothing
//! changes. Cycles need no preprocessing, and a node whose predecessors only
//! meet at the sentinel is dominated by the sentinel.

use super::order::{Predecessors, Traversal, UNDEFINED};
use super::DominatorMap;
use crate::config::DominatorConfig;
use crate::error::{AnalysisWarning, DominatorError, DominatorResult};
use crate::graph::HeapGraph;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Shared flag that lets a caller abandon a running computation between passes
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Dominator computation over one graph
#[derive(Debug)]
pub struct DominatorEngine<'g> {
    graph: &'g HeapGraph,
    config: DominatorConfig,
    cancellation: Option<CancellationToken>,
    /// Fires the cancellation token once this many passes have finished
    #[cfg(test)]
    cancel_after: Option<usize>,
}

impl<'g> DominatorEngine<'g> {
    pub fn new(graph: &'g HeapGraph) -> Self {
        Self {
            graph,
            config: DominatorConfig::default(),
            cancellation: None,
            #[cfg(test)]
            cancel_after: None,
        }
    }

    pub fn with_config(mut self, config: DominatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Compute the immediate dominator of every node reachable from the roots
    ///
    /// An empty root set yields an empty map with an
    /// [`AnalysisWarning::EmptyRootSet`] warning. Errors are fatal and no
    /// partial map is ever returned.
    #[instrument(skip_all, fields(nodes = self.graph.len(), roots = self.graph.roots().len()))]
    pub fn run(&self) -> DominatorResult<DominatorMap> {
        let graph = self.graph;
        let sentinel = graph.len();
        let roots = graph.root_indices();

        if roots.is_empty() {
            warn!("no roots supplied, every node is unreachable");
            return Ok(DominatorMap {
                idom: vec![UNDEFINED; sentinel + 1],
                order: Vec::new(),
                passes: 0,
                warnings: vec![AnalysisWarning::EmptyRootSet],
            });
        }

        let traversal = Traversal::new(graph, &roots);
        let predecessors = Predecessors::new(graph, &roots, &traversal);
        let reachable = traversal.reachable();
        let limit = self.config.pass_limit(reachable);
        debug!(reachable, limit, "numbered reachable nodes");

        let mut idom = vec![UNDEFINED; sentinel + 1];
        idom[sentinel] = sentinel as u32;

        let mut passes = 0;
        loop {
            if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
                warn!(passes, "dominator computation cancelled");
                return Err(DominatorError::Cancelled { passes });
            }
            if passes >= limit {
                return Err(DominatorError::NonConvergence { passes });
            }
            passes += 1;

            let mut changed = false;
            for &slot in &traversal.order[1..] {
                let mut candidate = UNDEFINED;
                for &pred in predecessors.of(slot as usize) {
                    // Predecessors without a dominator yet are picked up on a later pass.
                    if idom[pred as usize] == UNDEFINED {
                        continue;
                    }
                    candidate = if candidate == UNDEFINED { pred } else { intersect(pred, candidate, &idom, &traversal.postorder)? };
                }
                if candidate != UNDEFINED && idom[slot as usize] != candidate {
                    idom[slot as usize] = candidate;
                    changed = true;
                }
            }

            debug!(pass = passes, changed, "dominator pass finished");
            self.after_pass(passes);
            if !changed {
                break;
            }
        }

        let mut warnings = Vec::new();
        if reachable < graph.len() {
            let count = graph.len() - reachable;
            debug!(count, "nodes unreachable from any root");
            warnings.push(AnalysisWarning::UnreachableNodes { count });
        }

        info!(reachable, passes, "computed dominators");
        Ok(DominatorMap {
            idom,
            order: traversal.order[1..].to_vec(),
            passes,
            warnings,
        })
    }
}

impl DominatorEngine<'_> {
    #[cfg(test)]
    fn after_pass(&self, passes: usize) {
        if self.cancel_after == Some(passes) {
            if let Some(token) = &self.cancellation {
                token.cancel();
            }
        }
    }

    #[cfg(not(test))]
    fn after_pass(&self, _passes: usize) {}
}

/// Walk two dominator chains upward until they meet
///
/// The finger with the smaller postorder number is always the deeper one, so
/// it is the one advanced.
fn intersect(mut left: u32, mut right: u32, idom: &[u32], postorder: &[u32]) -> DominatorResult<u32> {
    let step = |slot: u32| -> DominatorResult<u32> {
        match idom[slot as usize] {
            UNDEFINED => Err(DominatorError::BrokenChain { node: slot as usize }),
            parent => Ok(parent),
        }
    };

    while left != right {
        while postorder[left as usize] < postorder[right as usize] {
            left = step(left)?;
        }
        while postorder[right as usize] < postorder[left as usize] {
            right = step(right)?;
        }
    }
    Ok(left)
}

/// Compute the dominator map of a graph with default settings
pub fn compute_dominators(graph: &HeapGraph) -> DominatorResult<DominatorMap> {
    DominatorEngine::new(graph).run()
}
