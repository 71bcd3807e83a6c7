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

mod common;

use common::SnapshotBuilder;
use heapdom_core::{
    AnalysisConfig, Dominator, Footprint, GraphBuilder, GraphConfig, HeapAnalysis, HeapGraph, IdSize, NodeId, NodeKind, RetainedConfig, RootKind, Type, compute_dominators,
    compute_retained_sizes,
};
use std::sync::Arc;

#[test]
fn test_simple_graph_retained_sizes() {
    let builder = SnapshotBuilder::with_sizes(6, |id| id * 10);
    let heap = builder.heap();
    let graph = builder
        .add_references(1, &[2, 3])
        .add_references(2, &[4, 6])
        .add_references(3, &[4, 5])
        .add_references(4, &[6])
        .add_root(1)
        .build();

    let dominators = compute_dominators(&graph).unwrap();
    let sizes = compute_retained_sizes(&graph, &dominators);
    let retained = |id| sizes.retained_size(graph.index_of(NodeId(id)).unwrap(), heap);

    assert_eq!(retained(1), 210);
    assert_eq!(retained(3), 80);
    assert_eq!(retained(2), 20);
    assert_eq!(retained(4), 40);
    assert_eq!(retained(5), 50);
    assert_eq!(retained(6), 60);
    assert_eq!(sizes.sentinel(heap), 210);
}

#[test]
fn test_shared_node_is_retained_by_sentinel_only() {
    let builder = SnapshotBuilder::with_sizes(6, |_| 8);
    let heap = builder.heap();
    let graph = builder
        .add_references(1, &[3])
        .add_references(2, &[4])
        .add_references(3, &[5])
        .add_references(4, &[5])
        .add_references(5, &[6])
        .add_root(1)
        .add_root(2)
        .build();

    let dominators = compute_dominators(&graph).unwrap();
    let sizes = compute_retained_sizes(&graph, &dominators);
    let retained = |id| sizes.retained_size(graph.index_of(NodeId(id)).unwrap(), heap);

    assert_eq!(retained(1), 16);
    assert_eq!(retained(2), 16);
    assert_eq!(retained(5), 16);
    assert_eq!(sizes.sentinel_total(), 48);
}

#[test]
fn test_class_retains_across_heaps() {
    let mut builder = GraphBuilder::new(GraphConfig::default());
    let zygote = builder.heap("zygote");
    let app = builder.heap("app");
    builder
        .add_class(NodeId(0x100), zygote, "android.app.ActivityThread", 12)
        .add_node(NodeId(0x200), app, NodeKind::Instance { class: Some(NodeId(0x100)) }, Footprint::Fields(vec![Type::Object, Type::Object, Type::Int]))
        .add_array(NodeId(0x300), app, Type::Char, 64)
        .add_instance(NodeId(0x400), zygote, 40)
        .add_references(NodeId(0x100), [NodeId(0x200), NodeId(0x400)])
        .add_reference(NodeId(0x200), NodeId(0x300))
        .add_root(NodeId(0x100), RootKind::StickyClass);
    let graph = Arc::new(builder.build().unwrap());

    let analysis = HeapAnalysis::new(Arc::clone(&graph));
    let class = graph.find_class("android.app.ActivityThread").unwrap();
    let sizes = analysis.retained_sizes().unwrap();

    assert_eq!(sizes.retained_size(class, zygote), 52);
    assert_eq!(sizes.retained_size(class, app), 12 + 128);
    assert_eq!(analysis.retained_size(NodeId(0x200), "app").unwrap(), Some(140));
    assert_eq!(analysis.retained_size(NodeId(0x200), "zygote").unwrap(), Some(0));
    assert_eq!(sizes.sentinel_total(), graph.total_size());
}

#[test]
fn test_id_width_changes_retained_sizes() {
    let build = |id_size: IdSize| {
        let mut builder = GraphBuilder::new(GraphConfig::new().with_id_size(id_size));
        let heap = builder.heap("app");
        builder
            .add_array(NodeId(1), heap, Type::Object, 4)
            .add_node(NodeId(2), heap, NodeKind::Instance { class: None }, Footprint::Fields(vec![Type::Object, Type::Long]))
            .add_reference(NodeId(1), NodeId(2))
            .add_root(NodeId(1), RootKind::JavaFrame);
        builder.build().unwrap()
    };
    let narrow = build(IdSize::Four);
    let wide = build(IdSize::Eight);

    let total = |graph: &HeapGraph| {
        let dominators = compute_dominators(graph).unwrap();
        compute_retained_sizes(graph, &dominators).sentinel_total()
    };
    assert_eq!(total(&narrow), 16 + 12);
    assert_eq!(total(&wide), 32 + 16);
}

#[test]
fn test_leaf_retains_own_size_and_tree_is_monotonic() {
    let builder = SnapshotBuilder::with_sizes(8, |id| id);
    let heap = builder.heap();
    let graph = builder
        .add_references(1, &[2, 3])
        .add_references(2, &[4])
        .add_references(3, &[4, 5])
        .add_references(5, &[6, 7])
        .add_references(7, &[5, 8])
        .add_root(1)
        .build();

    let dominators = compute_dominators(&graph).unwrap();
    let sizes = compute_retained_sizes(&graph, &dominators);

    for (node, _) in dominators.iter() {
        let children = dominators.children_of(Dominator::Node(node));
        let below: u64 = children.iter().map(|&child| sizes.retained_size(child, heap)).sum();
        assert_eq!(sizes.retained_size(node, heap), below + graph.node(node).size);
        if children.is_empty() {
            assert_eq!(sizes.retained_size(node, heap), graph.node(node).size);
        }
    }
}

#[test]
fn test_parallel_session_matches_sequential() {
    let mut builder = GraphBuilder::new(GraphConfig::default());
    let heaps = ["image", "zygote", "app"].map(|name| builder.heap(name));
    for id in 1..=30u64 {
        builder.add_instance(NodeId(id), heaps[(id % 3) as usize], id * 4);
        if id > 1 {
            builder.add_reference(NodeId(id / 2), NodeId(id));
        }
        if id % 5 == 0 {
            builder.add_reference(NodeId(id), NodeId(id - 3));
        }
    }
    builder.add_root(NodeId(1), RootKind::VmInternal).add_root(NodeId(7), RootKind::Finalizing);
    let graph = Arc::new(builder.build().unwrap());

    let sequential = HeapAnalysis::new(Arc::clone(&graph)).retained_sizes().unwrap();
    let config = AnalysisConfig::new().with_retained(RetainedConfig::new().with_parallel(true));
    let parallel = HeapAnalysis::with_config(Arc::clone(&graph), config).retained_sizes().unwrap();
    assert_eq!(*sequential, *parallel);
}
