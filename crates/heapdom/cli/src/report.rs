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

//! Text and JSON rendering of analysis results

use anyhow::{Context, Result};
use heapdom_core::{Dominator, HeapAnalysis, HeapGraph, NodeId, NodeIndex, NodeKind, RetainedSizes};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// One row of the retained size ranking
#[derive(Debug, Serialize)]
pub struct RetainedEntry {
    pub id: NodeId,
    pub label: String,
    pub retained: BTreeMap<String, u64>,
}

/// Short human description of a node
pub fn label(graph: &HeapGraph, index: NodeIndex) -> String {
    match &graph.node(index).kind {
        NodeKind::Class { name } => format!("class {name}"),
        NodeKind::Instance { class } => class
            .and_then(|class| graph.find(class))
            .and_then(|class| class.class_name())
            .map_or_else(|| "instance".to_string(), |name| format!("{name} instance")),
        NodeKind::Array { element, length } => format!("{element:?}[{length}]").to_lowercase(),
    }
}

pub fn summary(analysis: &HeapAnalysis) -> Result<String> {
    let graph = analysis.graph();
    let dominators = analysis.dominators()?;
    let retained = analysis.retained_sizes()?;

    let mut out = String::new();
    writeln!(out, "nodes:      {}", graph.len())?;
    writeln!(out, "references: {}", graph.edge_count())?;
    writeln!(out, "roots:      {} ({} distinct)", graph.roots().len(), graph.root_indices().len())?;
    writeln!(out, "reachable:  {}", dominators.len())?;
    writeln!(out, "passes:     {}", dominators.passes())?;
    writeln!(out, "heaps:")?;
    for heap in graph.heaps() {
        writeln!(out, "  {:<12} {:>12} bytes reachable", heap.name, retained.sentinel(heap.id))?;
    }
    writeln!(out, "total:      {} of {} bytes reachable", retained.sentinel_total(), graph.total_size())?;
    for warning in dominators.warnings() {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(out)
}

pub fn dominators(analysis: &HeapAnalysis, json: bool) -> Result<String> {
    let graph = analysis.graph();
    let map = analysis.dominators()?.to_id_map(graph);
    if json {
        return Ok(serde_json::to_string_pretty(&map)?);
    }

    let mut out = String::new();
    for (id, dominator) in map {
        writeln!(out, "{id} <- {dominator}")?;
    }
    Ok(out)
}

/// Nodes retaining the most bytes, of one heap or of all heaps together
pub fn ranking(graph: &HeapGraph, sizes: &RetainedSizes, reachable: impl Iterator<Item = NodeIndex>, heap: Option<&str>, top: usize) -> Result<Vec<RetainedEntry>> {
    let ranked: Vec<NodeIndex> = match heap {
        Some(name) => {
            let heap = graph.heap_by_name(name).with_context(|| format!("unknown heap {name:?}"))?;
            sizes.largest(heap.id, top).into_iter().map(|(node, _)| node).collect()
        }
        None => {
            let mut all: Vec<(NodeIndex, u64)> = reachable.map(|node| (node, sizes.total(node))).collect();
            all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            all.into_iter().take(top).map(|(node, _)| node).collect()
        }
    };

    Ok(ranked
        .into_iter()
        .map(|node| RetainedEntry {
            id: graph.node(node).id,
            label: label(graph, node),
            retained: graph.heaps().iter().map(|heap| (heap.name.clone(), sizes.retained_size(node, heap.id))).collect(),
        })
        .collect())
}

pub fn retained(analysis: &HeapAnalysis, heap: Option<&str>, top: usize, json: bool) -> Result<String> {
    let graph = analysis.graph();
    let dominators = analysis.dominators()?;
    let sizes = analysis.retained_sizes()?;
    let entries = ranking(graph, &sizes, dominators.iter().map(|(node, _)| node), heap, top)?;
    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }

    let mut out = String::new();
    for entry in &entries {
        let bytes: u64 = match heap {
            Some(name) => entry.retained.get(name).copied().unwrap_or(0),
            None => entry.retained.values().sum(),
        };
        write!(out, "{:>12}  {:<18} {}", bytes, entry.id.to_string(), entry.label)?;
        let per_heap: Vec<String> = entry.retained.iter().filter(|(_, bytes)| **bytes > 0).map(|(name, bytes)| format!("{name}={bytes}")).collect();
        writeln!(out, "  [{}]", per_heap.join(", "))?;
    }
    Ok(out)
}

pub fn path(analysis: &HeapAnalysis, id: NodeId) -> Result<String> {
    let graph = analysis.graph();
    let index = graph.index_of(id).with_context(|| format!("no node with id {id}"))?;
    let chain = analysis.dominator_path(id)?;
    if chain.is_empty() {
        return Ok(format!("{id} is unreachable from every root\n"));
    }

    let mut out = String::new();
    writeln!(out, "{id} {}", label(graph, index))?;
    for dominator in chain {
        match dominator {
            Dominator::Sentinel => writeln!(out, "  <- <sentinel>")?,
            Dominator::Node(node) => {
                let label = graph.index_of(node).map(|index| label(graph, index)).unwrap_or_default();
                writeln!(out, "  <- {node} {label}")?;
            }
        }
    }
    Ok(out)
}
