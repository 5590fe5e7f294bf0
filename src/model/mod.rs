//! `GeoModel`: the facade over counters, adjacency, snapshots, and
//! attributes.
//!
//! A model is one value: handle counters per kind, the adjacency arena,
//! the per-snapshot visibility sets, and the attribute store. Every
//! operation takes the snapshot id it acts under — there is no ambient
//! "current" snapshot, so two timelines can be driven from one model
//! without hidden state.
//!
//! The facade splits across submodules by concern: construction
//! ([`add`]), traversal ([`nav`]), structural queries ([`query`]),
//! snapshot lifecycle and deletion ([`snapshot`]), merge/purge
//! ([`merge`]), and the advisory consistency scan ([`check`]).

pub mod add;
pub mod check;
pub mod merge;
pub mod nav;
pub mod query;
pub mod snapshot;

pub use snapshot::SnapshotSets;

use crate::attribs::store::AttribStore;
use crate::attribs::value::{AttribValue, Vec3};
use crate::kernel_error::KernelError;
use crate::topology::ent::{EntIdx, EntType, Ssid};
use crate::topology::geom_maps::GeomMaps;

/// Monotonic handle counters, one per kind.
///
/// Handles are never reused while the model lives; the counter for a
/// kind equals the number of handles ever allocated for it, not the
/// number currently visible anywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntCounters {
    posis: u32,
    verts: u32,
    tris: u32,
    edges: u32,
    wires: u32,
    points: u32,
    plines: u32,
    pgons: u32,
    colls: u32,
}

impl EntCounters {
    fn slot_mut(&mut self, ent_type: EntType) -> &mut u32 {
        match ent_type {
            EntType::Posi => &mut self.posis,
            EntType::Vert => &mut self.verts,
            EntType::Tri => &mut self.tris,
            EntType::Edge => &mut self.edges,
            EntType::Wire => &mut self.wires,
            EntType::Point => &mut self.points,
            EntType::Pline => &mut self.plines,
            EntType::Pgon => &mut self.pgons,
            EntType::Coll => &mut self.colls,
        }
    }

    /// Allocate the next handle for `ent_type`.
    pub(crate) fn next(&mut self, ent_type: EntType) -> EntIdx {
        let slot = self.slot_mut(ent_type);
        let idx = *slot;
        *slot += 1;
        EntIdx::new(idx)
    }

    /// Number of handles ever allocated for `ent_type`.
    pub fn count(&self, ent_type: EntType) -> u32 {
        match ent_type {
            EntType::Posi => self.posis,
            EntType::Vert => self.verts,
            EntType::Tri => self.tris,
            EntType::Edge => self.edges,
            EntType::Wire => self.wires,
            EntType::Point => self.points,
            EntType::Pline => self.plines,
            EntType::Pgon => self.pgons,
            EntType::Coll => self.colls,
        }
    }

    /// Record that `count` handles of `ent_type` exist (merge/purge).
    pub(crate) fn set_count(&mut self, ent_type: EntType, count: u32) {
        *self.slot_mut(ent_type) = count;
    }
}

/// A snapshot-versioned geometric model.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GeoModel {
    pub(crate) counters: EntCounters,
    pub(crate) maps: GeomMaps,
    pub(crate) snapshots: SnapshotSets,
    pub(crate) attribs: AttribStore,
}

impl Default for GeoModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoModel {
    /// An empty model with snapshot 0 already created.
    pub fn new() -> Self {
        let mut snapshots = SnapshotSets::default();
        snapshots.insert(Ssid::new(0), Default::default());
        let mut attribs = AttribStore::new();
        attribs.seed_snapshot(Ssid::new(0));
        GeoModel {
            counters: EntCounters::default(),
            maps: GeomMaps::new(),
            snapshots,
            attribs,
        }
    }

    /// The adjacency arena (read-only).
    pub fn maps(&self) -> &GeomMaps {
        &self.maps
    }

    /// The attribute store (read-only).
    pub fn attribs(&self) -> &AttribStore {
        &self.attribs
    }

    /// The handle counters (read-only).
    pub fn counters(&self) -> &EntCounters {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Document serialization
    // ------------------------------------------------------------------

    /// Serialize the whole model (arena, snapshots, attributes,
    /// counters) to a JSON document.
    ///
    /// # Errors
    /// `Document` when encoding fails.
    pub fn to_json_str(&self) -> Result<String, KernelError> {
        serde_json::to_string(self).map_err(|err| KernelError::Document(err.to_string()))
    }

    /// Parse a model from its JSON document.
    ///
    /// # Errors
    /// `Document` when the input is not a valid model document.
    pub fn from_json_str(json: &str) -> Result<Self, KernelError> {
        serde_json::from_str(json).map_err(|err| KernelError::Document(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Attribute facade
    // ------------------------------------------------------------------

    /// The coordinate of a position.
    pub fn get_posi_coords(&self, ssid: Ssid, posi: EntIdx) -> Result<Vec3, KernelError> {
        self.require_ent(EntType::Posi, posi)?;
        self.attribs.posi_coords(ssid, posi)
    }

    /// Set the coordinate of a position.
    pub fn set_posi_coords(
        &mut self,
        ssid: Ssid,
        posi: EntIdx,
        xyz: Vec3,
    ) -> Result<(), KernelError> {
        self.require_ent(EntType::Posi, posi)?;
        self.attribs.set_posi_coords(ssid, posi, xyz)
    }

    /// Set an entity attribute, creating the column on first write.
    pub fn set_attrib(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
        val: AttribValue,
    ) -> Result<(), KernelError> {
        self.require_ent(ent_type, ent)?;
        self.attribs.set(ssid, ent_type, ent, name, val)
    }

    /// An entity attribute, or `None` when unset.
    pub fn get_attrib(
        &self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
    ) -> Result<Option<&AttribValue>, KernelError> {
        self.attribs.get(ssid, ent_type, ent, name)
    }

    /// Remove an entity attribute.
    pub fn unset_attrib(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
    ) -> Result<Option<AttribValue>, KernelError> {
        self.attribs.unset(ssid, ent_type, ent, name)
    }

    /// Set a whole-model attribute.
    pub fn set_model_attrib(
        &mut self,
        ssid: Ssid,
        name: &str,
        val: AttribValue,
    ) -> Result<(), KernelError> {
        self.attribs.set_model(ssid, name, val)
    }

    /// A whole-model attribute, or `None` when unset.
    pub fn get_model_attrib(
        &self,
        ssid: Ssid,
        name: &str,
    ) -> Result<Option<&AttribValue>, KernelError> {
        self.attribs.get_model(ssid, name)
    }

    // ------------------------------------------------------------------
    // Collection facade
    // ------------------------------------------------------------------

    /// Re-parent a collection (or detach it with `None`).
    pub fn set_coll_parent(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        parent: Option<EntIdx>,
    ) -> Result<(), KernelError> {
        self.require_ent(EntType::Coll, coll)?;
        if let Some(parent) = parent {
            self.require_ent(EntType::Coll, parent)?;
        }
        self.attribs.set_coll_parent(ssid, coll, parent)
    }

    /// The parent of a collection, or `None` at the root.
    pub fn coll_parent(&self, ssid: Ssid, coll: EntIdx) -> Result<Option<EntIdx>, KernelError> {
        self.attribs.coll_parent(ssid, coll)
    }

    /// The direct children of a collection.
    pub fn coll_children(&self, ssid: Ssid, coll: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        self.attribs.coll_children(ssid, coll)
    }

    /// Add object members to a collection, ignoring duplicates.
    pub fn add_coll_ents(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
        ents: &[EntIdx],
    ) -> Result<(), KernelError> {
        self.require_ent(EntType::Coll, coll)?;
        for &ent in ents {
            self.require_ent(member_type, ent)?;
        }
        self.attribs.add_coll_ents(ssid, coll, member_type, ents)
    }

    /// Remove object members from a collection.
    pub fn del_coll_ents(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
        ents: &[EntIdx],
    ) -> Result<(), KernelError> {
        self.attribs.del_coll_ents(ssid, coll, member_type, ents)
    }

    /// The members of a collection of one object kind.
    pub fn coll_ents(
        &self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.attribs.coll_ents(ssid, coll, member_type)
    }

    // ------------------------------------------------------------------

    pub(crate) fn require_ent(&self, ent_type: EntType, ent: EntIdx) -> Result<(), KernelError> {
        if self.maps.contains(ent_type, ent) {
            Ok(())
        } else {
            Err(KernelError::EntNotFound { ent_type, ent })
        }
    }

    pub(crate) fn require_ssid(&self, ssid: Ssid) -> Result<(), KernelError> {
        if self.snapshots.contains(ssid) {
            Ok(())
        } else {
            Err(KernelError::SsidNotFound(ssid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic_per_kind() {
        let mut counters = EntCounters::default();
        assert_eq!(counters.next(EntType::Posi), EntIdx::new(0));
        assert_eq!(counters.next(EntType::Posi), EntIdx::new(1));
        assert_eq!(counters.next(EntType::Pgon), EntIdx::new(0));
        assert_eq!(counters.count(EntType::Posi), 2);
        assert_eq!(counters.count(EntType::Vert), 0);
    }

    #[test]
    fn new_model_has_snapshot_zero() {
        let model = GeoModel::new();
        assert!(model.snapshots.contains(Ssid::new(0)));
        assert!(model.attribs.contains(Ssid::new(0)));
    }

    #[test]
    fn attrib_writes_require_a_live_handle() {
        let mut model = GeoModel::new();
        let err = model
            .set_posi_coords(Ssid::new(0), EntIdx::new(0), [0.0; 3])
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::EntNotFound {
                ent_type: EntType::Posi,
                ent: EntIdx::new(0)
            }
        );
    }
}
