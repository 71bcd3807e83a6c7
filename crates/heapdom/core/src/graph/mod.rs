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

//! Graph store
//!
//! The loader feeds nodes, references and roots into a [`GraphBuilder`];
//! [`GraphBuilder::build`] checks that the graph is closed and produces an
//! immutable [`HeapGraph`] over dense indices that can be shared across
//! threads without locking.

pub mod builder;
pub mod store;
pub mod types;

pub use builder::{GraphBuilder, MAX_HEAPS, MAX_NODES};
pub use store::{Heap, HeapGraph, Node, Root};
pub use types::{Footprint, HeapId, IdSize, NodeId, NodeIndex, NodeKind, RootKind, Type};
