//! Topological entity kinds, handles, and the adjacency arena.
//!
//! This module provides the closed nine-kind entity enumeration, the
//! dense handle and snapshot-id newtypes, and `GeomMaps` — the up/down
//! adjacency tables that encode the whole topology as handle-indexed
//! rows rather than an object graph.

pub mod ent;
pub mod geom_maps;

pub use ent::{EntIdx, EntSets, EntType, Ssid};
pub use geom_maps::GeomMaps;
