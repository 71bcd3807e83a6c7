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

//! Identifiers, value types and sizing rules shared by the graph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// External, address-like identifier of a heap object as assigned by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

/// Dense index of a node inside one [`HeapGraph`](super::HeapGraph)
///
/// Indices are assigned in insertion order and are only meaningful for the
/// graph that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) u32);

impl NodeIndex {
    /// Position of the node in the graph's dense node table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a heap partition in the graph's heap table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeapId(pub(crate) u16);

impl HeapId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Width of an object identifier in the dump, which is also the size of a reference field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSize {
    #[default]
    Four,
    Eight,
}

impl IdSize {
    pub fn bytes(self) -> u64 {
        match self {
            IdSize::Four => 4,
            IdSize::Eight => 8,
        }
    }

    /// Map a raw identifier width to an `IdSize`, if supported
    pub fn from_bytes(bytes: u64) -> Option<Self> {
        match bytes {
            4 => Some(IdSize::Four),
            8 => Some(IdSize::Eight),
            _ => None,
        }
    }
}

/// Field and array element types, tagged with their hprof basic type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Object,
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl Type {
    pub const ALL: [Type; 9] = [Type::Object, Type::Boolean, Type::Char, Type::Float, Type::Double, Type::Byte, Type::Short, Type::Int, Type::Long];

    /// Basic type tag as written in the dump
    pub fn tag(self) -> u8 {
        match self {
            Type::Object => 2,
            Type::Boolean => 4,
            Type::Char => 5,
            Type::Float => 6,
            Type::Double => 7,
            Type::Byte => 8,
            Type::Short => 9,
            Type::Int => 10,
            Type::Long => 11,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.tag() == tag)
    }

    /// Size in bytes of a value of this type; references take the identifier width
    pub fn size(self, id_size: IdSize) -> u64 {
        match self {
            Type::Object => id_size.bytes(),
            Type::Boolean | Type::Byte => 1,
            Type::Char | Type::Short => 2,
            Type::Float | Type::Int => 4,
            Type::Double | Type::Long => 8,
        }
    }
}

/// How the intrinsic size of a node is derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Footprint {
    /// Size already known to the loader
    Bytes(u64),
    /// Instance laid out as the given field types
    Fields(Vec<Type>),
    /// Array of `length` elements
    Array { element: Type, length: u64 },
}

impl Footprint {
    /// Resolve the footprint to a byte count using the dump's identifier width
    pub fn resolve(&self, id_size: IdSize) -> u64 {
        match self {
            Footprint::Bytes(bytes) => *bytes,
            Footprint::Fields(fields) => fields.iter().fold(0u64, |acc, ty| acc.saturating_add(ty.size(id_size))),
            Footprint::Array { element, length } => length.saturating_mul(element.size(id_size)),
        }
    }
}

/// What a node represents in the dumped heap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Instance { class: Option<NodeId> },
    Class { name: String },
    Array { element: Type, length: u64 },
}

/// Kind of GC root holding a node, kept for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    #[default]
    Unknown,
    JniGlobal,
    JniLocal,
    JavaFrame,
    NativeStack,
    StickyClass,
    ThreadBlock,
    MonitorUsed,
    ThreadObject,
    InternedString,
    Finalizing,
    Debugger,
    ReferenceCleanup,
    VmInternal,
    JniMonitor,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RootKind::Unknown => "unknown",
            RootKind::JniGlobal => "jni global",
            RootKind::JniLocal => "jni local",
            RootKind::JavaFrame => "java frame",
            RootKind::NativeStack => "native stack",
            RootKind::StickyClass => "sticky class",
            RootKind::ThreadBlock => "thread block",
            RootKind::MonitorUsed => "monitor used",
            RootKind::ThreadObject => "thread object",
            RootKind::InternedString => "interned string",
            RootKind::Finalizing => "finalizing",
            RootKind::Debugger => "debugger",
            RootKind::ReferenceCleanup => "reference cleanup",
            RootKind::VmInternal => "vm internal",
            RootKind::JniMonitor => "jni monitor",
        };
        f.write_str(name)
    }
}
