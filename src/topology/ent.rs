//! Entity kinds, handles, and snapshot ids.
//!
//! Every entity in the kernel is addressed by a dense, per-kind integer
//! handle ([`EntIdx`]). Handles are allocated monotonically and never
//! reused while a model lives: deletion only removes a handle from a
//! snapshot's visibility set, and only an explicit purge renumbers.
//!
//! The nine kinds form a strict hierarchy along two axes: the
//! topological axis (`Posi` → `Vert` → `Edge` → `Wire`, with `Tri` as a
//! derived facet) and the object axis built on top of it (`Point`,
//! `Pline`, `Pgon`, `Coll`). The enum ordering encodes distance from the
//! bottom of the hierarchy; the navigator relies on it to decide whether
//! a traversal walks up- or down-adjacency.

use std::collections::HashSet;
use std::fmt;

/// The closed set of entity kinds, ordered by distance from the bottom
/// of the hierarchy.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum EntType {
    /// A location in space. Carries no topology of its own; its `xyz`
    /// coordinate lives in the attribute store.
    Posi,
    /// One use of a position by an edge chain or a point object.
    Vert,
    /// One triangle of a polygon's cached triangulation.
    Tri,
    /// A directed segment between two vertices.
    Edge,
    /// An ordered, contiguous chain of edges, open or closed.
    Wire,
    /// Object wrapping a single vertex.
    Point,
    /// Object wrapping a single wire.
    Pline,
    /// Object wrapping one outer wire, optional hole wires, and derived
    /// triangles.
    Pgon,
    /// A grouping of points/polylines/polygons and other collections.
    Coll,
}

impl EntType {
    /// All nine kinds, in hierarchy order.
    pub const ALL: [EntType; 9] = [
        EntType::Posi,
        EntType::Vert,
        EntType::Tri,
        EntType::Edge,
        EntType::Wire,
        EntType::Point,
        EntType::Pline,
        EntType::Pgon,
        EntType::Coll,
    ];

    /// Short tag used in diagnostics and the serialized document.
    pub const fn tag(self) -> &'static str {
        match self {
            EntType::Posi => "ps",
            EntType::Vert => "_v",
            EntType::Tri => "_t",
            EntType::Edge => "_e",
            EntType::Wire => "_w",
            EntType::Point => "pt",
            EntType::Pline => "pl",
            EntType::Pgon => "pg",
            EntType::Coll => "co",
        }
    }

    /// True for the five kinds that carry their own snapshot visibility
    /// set (positions and the four object kinds).
    pub const fn is_object(self) -> bool {
        matches!(
            self,
            EntType::Posi | EntType::Point | EntType::Pline | EntType::Pgon | EntType::Coll
        )
    }

    /// True for the purely structural kinds, whose visibility is derived
    /// from the object that owns them.
    pub const fn is_topo(self) -> bool {
        !self.is_object()
    }
}

impl fmt::Display for EntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Dense integer handle for an entity, unique within its kind.
///
/// `repr(transparent)` over a `u32`: handles serialize as bare integers
/// so they can key maps in the serialized document. Zero is a valid
/// handle — allocation is dense from 0.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct EntIdx(u32);

impl EntIdx {
    /// Wrap a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        EntIdx(raw)
    }

    /// The raw index value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntIdx").field(&self.0).finish()
    }
}

impl fmt::Display for EntIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a snapshot: one point/branch in a procedural timeline.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct Ssid(u32);

impl Ssid {
    /// Wrap a raw snapshot id.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Ssid(raw)
    }

    /// The raw id value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ssid").field(&self.0).finish()
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-kind handle sets for the five object kinds.
///
/// Doubles as a snapshot's visibility record and as the selection
/// argument of bulk delete operations. `obj_posis` only matters for
/// deletion: positions listed there are removed only if orphaned, while
/// positions in `posis` are removed unconditionally.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntSets {
    /// Position handles.
    pub posis: HashSet<EntIdx>,
    /// Point handles.
    pub points: HashSet<EntIdx>,
    /// Polyline handles.
    pub plines: HashSet<EntIdx>,
    /// Polygon handles.
    pub pgons: HashSet<EntIdx>,
    /// Collection handles.
    pub colls: HashSet<EntIdx>,
    /// Positions to delete only when no visible vertex references them.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub obj_posis: HashSet<EntIdx>,
}

impl EntSets {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The visibility set for an object kind, or `None` for topological
    /// kinds.
    pub fn set(&self, ent_type: EntType) -> Option<&HashSet<EntIdx>> {
        match ent_type {
            EntType::Posi => Some(&self.posis),
            EntType::Point => Some(&self.points),
            EntType::Pline => Some(&self.plines),
            EntType::Pgon => Some(&self.pgons),
            EntType::Coll => Some(&self.colls),
            _ => None,
        }
    }

    /// Mutable access to the visibility set for an object kind.
    pub fn set_mut(&mut self, ent_type: EntType) -> Option<&mut HashSet<EntIdx>> {
        match ent_type {
            EntType::Posi => Some(&mut self.posis),
            EntType::Point => Some(&mut self.points),
            EntType::Pline => Some(&mut self.plines),
            EntType::Pgon => Some(&mut self.pgons),
            EntType::Coll => Some(&mut self.colls),
            _ => None,
        }
    }

    /// Insert a handle into the set for `ent_type`. Returns false for
    /// topological kinds.
    pub fn insert(&mut self, ent_type: EntType, ent: EntIdx) -> bool {
        match self.set_mut(ent_type) {
            Some(set) => {
                set.insert(ent);
                true
            }
            None => false,
        }
    }

    /// Union another selection into this one, set by set.
    pub fn union_with(&mut self, other: &EntSets) {
        self.posis.extend(&other.posis);
        self.points.extend(&other.points);
        self.plines.extend(&other.plines);
        self.pgons.extend(&other.pgons);
        self.colls.extend(&other.colls);
        self.obj_posis.extend(&other.obj_posis);
    }

    /// True when every set is empty.
    pub fn is_empty(&self) -> bool {
        self.posis.is_empty()
            && self.points.is_empty()
            && self.plines.is_empty()
            && self.pgons.is_empty()
            && self.colls.is_empty()
            && self.obj_posis.is_empty()
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    // repr(transparent) guarantee: same ABI as the raw index.
    assert_eq_size!(EntIdx, u32);

    #[test]
    fn alignment_matches_u32() {
        assert_eq_align!(EntIdx, u32);
        assert_eq_size!(Ssid, u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ordering_follows_hierarchy() {
        assert!(EntType::Posi < EntType::Vert);
        assert!(EntType::Vert < EntType::Edge);
        assert!(EntType::Wire < EntType::Pline);
        assert!(EntType::Pgon < EntType::Coll);
    }

    #[test]
    fn object_and_topo_partition_the_kinds() {
        let objects: Vec<_> = EntType::ALL.iter().filter(|k| k.is_object()).collect();
        let topo: Vec<_> = EntType::ALL.iter().filter(|k| k.is_topo()).collect();
        assert_eq!(objects.len(), 5);
        assert_eq!(topo.len(), 4);
    }

    #[test]
    fn debug_and_display() {
        let e = EntIdx::new(7);
        assert_eq!(format!("{e:?}"), "EntIdx(7)");
        assert_eq!(format!("{e}"), "7");
        assert_eq!(format!("{}", EntType::Pgon), "pg");
    }

    #[test]
    fn ent_sets_insert_rejects_topo_kinds() {
        let mut sets = EntSets::new();
        assert!(sets.insert(EntType::Posi, EntIdx::new(0)));
        assert!(!sets.insert(EntType::Vert, EntIdx::new(0)));
        assert_eq!(sets.posis.len(), 1);
    }
}

#[cfg(test)]
mod serde_tests {
    use super::*;

    #[test]
    fn ent_idx_json_roundtrip() {
        let e = EntIdx::new(123);
        let s = serde_json::to_string(&e).unwrap();
        assert_eq!(s, "123");
        let e2: EntIdx = serde_json::from_str(&s).unwrap();
        assert_eq!(e2, e);
    }

    #[test]
    fn ent_idx_bincode_roundtrip() {
        let e = EntIdx::new(456);
        let bytes = bincode::serialize(&e).unwrap();
        let e2: EntIdx = bincode::deserialize(&bytes).unwrap();
        assert_eq!(e2, e);
    }
}
