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

//! JSON snapshot documents
//!
//! A snapshot document is what an external dump loader hands over: every
//! object already decoded, with its heap, its size (given directly or as a
//! field/array layout), and the ids it references.

use anyhow::{Context, Result, bail};
use heapdom_core::{Footprint, GraphBuilder, GraphConfig, HeapGraph, IdSize, NodeId, NodeKind, RootKind, Type};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct SnapshotDocument {
    /// Identifier width in bytes; overrides the configured width when present
    #[serde(default)]
    pub id_size: Option<u64>,
    /// Heap partitions in display order; heaps named only by nodes are appended
    #[serde(default)]
    pub heaps: Vec<String>,
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub roots: Vec<RootDocument>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDocument {
    pub id: NodeId,
    pub heap: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub fields: Option<Vec<Type>>,
    #[serde(default)]
    pub array: Option<ArrayDocument>,
    /// Class object of an instance
    #[serde(default)]
    pub class: Option<NodeId>,
    /// Set on class objects only
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub references: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ArrayDocument {
    pub element: Type,
    pub length: u64,
}

#[derive(Debug, Deserialize)]
pub struct RootDocument {
    pub id: NodeId,
    #[serde(default)]
    pub kind: RootKind,
}

impl NodeDocument {
    fn kind(&self) -> NodeKind {
        match (&self.class_name, self.array) {
            (Some(name), _) => NodeKind::Class { name: name.clone() },
            (None, Some(array)) => NodeKind::Array { element: array.element, length: array.length },
            (None, None) => NodeKind::Instance { class: self.class },
        }
    }

    fn footprint(&self) -> Result<Footprint> {
        match (self.size, &self.fields, self.array) {
            (Some(bytes), _, _) => Ok(Footprint::Bytes(bytes)),
            (None, Some(fields), _) => Ok(Footprint::Fields(fields.clone())),
            (None, None, Some(array)) => Ok(Footprint::Array { element: array.element, length: array.length }),
            (None, None, None) => bail!("node {} has neither a size, fields nor an array layout", self.id),
        }
    }
}

impl SnapshotDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let document: Self = serde_json::from_str(&content).with_context(|| format!("failed to parse snapshot {}", path.display()))?;
        info!(nodes = document.nodes.len(), roots = document.roots.len(), "loaded snapshot document");
        Ok(document)
    }

    /// Identifier width to build with, the document's own width taking precedence
    pub fn graph_config(&self, configured: GraphConfig) -> Result<GraphConfig> {
        match self.id_size {
            None => Ok(configured),
            Some(bytes) => {
                let id_size = IdSize::from_bytes(bytes).with_context(|| format!("unsupported identifier width {bytes}"))?;
                Ok(configured.with_id_size(id_size))
            }
        }
    }

    pub fn into_graph(self, configured: GraphConfig) -> Result<HeapGraph> {
        let mut builder = GraphBuilder::new(self.graph_config(configured)?);
        for name in &self.heaps {
            builder.heap(name);
        }
        for node in &self.nodes {
            let heap = builder.heap(&node.heap);
            builder.add_node(node.id, heap, node.kind(), node.footprint()?);
            builder.add_references(node.id, node.references.iter().copied());
        }
        for root in &self.roots {
            builder.add_root(root.id, root.kind);
        }
        debug!(id_size = builder.config().id_size.bytes(), "building heap graph");
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapdom_core::GraphError;

    const SNAPSHOT: &str = r#"{
        "id_size": 8,
        "heaps": ["zygote", "app"],
        "nodes": [
            { "id": 1, "heap": "zygote", "size": 24, "class_name": "com.example.Cache", "references": [2] },
            { "id": 2, "heap": "app", "fields": ["object", "int"], "class": 1, "references": [3] },
            { "id": 3, "heap": "app", "array": { "element": "char", "length": 5 } }
        ],
        "roots": [{ "id": 1, "kind": "sticky_class" }, { "id": 2 }]
    }"#;

    #[test]
    fn test_document_builds_graph() {
        let document: SnapshotDocument = serde_json::from_str(SNAPSHOT).unwrap();
        let graph = document.into_graph(GraphConfig::default()).unwrap();

        assert_eq!(graph.config().id_size, IdSize::Eight);
        assert_eq!(graph.heaps().iter().map(|heap| heap.name.as_str()).collect::<Vec<_>>(), vec!["zygote", "app"]);
        assert_eq!(graph.find(NodeId(2)).unwrap().size, 12);
        assert_eq!(graph.find(NodeId(3)).unwrap().size, 10);
        assert_eq!(graph.find_class("com.example.Cache"), graph.index_of(NodeId(1)));
        assert_eq!(graph.roots()[0].kind, RootKind::StickyClass);
        assert_eq!(graph.roots()[1].kind, RootKind::Unknown);
    }

    #[test]
    fn test_missing_size_is_rejected() {
        let document: SnapshotDocument = serde_json::from_str(r#"{ "nodes": [{ "id": 7, "heap": "app" }] }"#).unwrap();
        let err = document.into_graph(GraphConfig::default()).unwrap_err();
        assert!(err.to_string().contains("0x7"));
    }

    #[test]
    fn test_unsupported_id_width_is_rejected() {
        let document: SnapshotDocument = serde_json::from_str(r#"{ "id_size": 2, "nodes": [] }"#).unwrap();
        assert!(document.into_graph(GraphConfig::default()).is_err());
    }

    #[test]
    fn test_dangling_reference_surfaces_graph_error() {
        let document: SnapshotDocument = serde_json::from_str(r#"{ "nodes": [{ "id": 1, "heap": "app", "size": 4, "references": [9] }] }"#).unwrap();
        let err = document.into_graph(GraphConfig::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<GraphError>(), Some(GraphError::MalformedGraph { .. })));
    }
}
