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

//! Configuration for graph construction and analysis
//!
//! Every setting is passed explicitly into the component that needs it, so
//! snapshots taken with different identifier widths or limits can be analyzed
//! side by side.

use crate::graph::IdSize;
use serde::{Deserialize, Serialize};

/// Settings fixed when a graph is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Identifier width of the dump, used to size reference fields
    pub id_size: IdSize,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_size(mut self, id_size: IdSize) -> Self {
        self.id_size = id_size;
        self
    }
}

/// Settings for the fixed-point dominator computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DominatorConfig {
    /// Upper bound on fixed-point passes; derived from the reachable node count when unset
    pub max_passes: Option<usize>,
}

impl DominatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = Some(passes);
        self
    }

    /// Pass limit for a graph with `reachable` nodes, sentinel excluded
    pub fn pass_limit(&self, reachable: usize) -> usize {
        self.max_passes.unwrap_or(reachable.saturating_add(2))
    }
}

/// Settings for retained size accumulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetainedConfig {
    /// Accumulate heap partitions on the rayon thread pool
    pub parallel: bool,
}

impl RetainedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Configuration for a whole analysis session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub graph: GraphConfig,
    pub dominators: DominatorConfig,
    pub retained: RetainedConfig,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(mut self, graph: GraphConfig) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_dominators(mut self, dominators: DominatorConfig) -> Self {
        self.dominators = dominators;
        self
    }

    pub fn with_retained(mut self, retained: RetainedConfig) -> Self {
        self.retained = retained;
        self
    }
}
