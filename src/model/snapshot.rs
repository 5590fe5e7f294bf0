//! Snapshots: visibility sets and the deletion cascade.
//!
//! A snapshot is a visibility record, not a copy: every snapshot
//! references entities in the one shared arena through five handle
//! sets (positions and the four object kinds). Topological entities
//! are visible exactly when their owning object is. Deleting removes
//! handles from one snapshot's sets and touches no rows, so other
//! snapshots are unaffected and a purge can reclaim rows later.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::kernel_error::KernelError;
use crate::model::GeoModel;
use crate::topology::ent::{EntIdx, EntSets, EntType, Ssid};

/// Visibility sets per snapshot id.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SnapshotSets {
    sets: HashMap<Ssid, EntSets>,
}

impl SnapshotSets {
    /// True when `ssid` has been created.
    pub fn contains(&self, ssid: Ssid) -> bool {
        self.sets.contains_key(&ssid)
    }

    /// The visibility sets of a snapshot.
    pub fn get(&self, ssid: Ssid) -> Option<&EntSets> {
        self.sets.get(&ssid)
    }

    pub(crate) fn get_mut(&mut self, ssid: Ssid) -> Option<&mut EntSets> {
        self.sets.get_mut(&ssid)
    }

    pub(crate) fn insert(&mut self, ssid: Ssid, sets: EntSets) {
        self.sets.insert(ssid, sets);
    }

    pub(crate) fn remove(&mut self, ssid: Ssid) {
        self.sets.remove(&ssid);
    }

    /// Iterate over all snapshots.
    pub fn iter(&self) -> impl Iterator<Item = (Ssid, &EntSets)> + '_ {
        self.sets.iter().map(|(&ssid, sets)| (ssid, sets))
    }
}

impl GeoModel {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a snapshot as the union of the `include`d snapshots'
    /// visibility (empty when `include` is). Attribute values of the
    /// included snapshots are copied in, later ones winning collisions.
    ///
    /// # Errors
    /// `SsidNotFound` when an included snapshot does not exist.
    pub fn ss_init(&mut self, ssid: Ssid, include: &[Ssid]) -> Result<(), KernelError> {
        for &prior in include {
            self.require_ssid(prior)?;
        }
        let mut sets = EntSets::new();
        for &prior in include {
            if let Some(prev) = self.snapshots.get(prior) {
                sets.union_with(prev);
            }
        }
        // obj_posis is a deletion-selection field, never visibility
        sets.obj_posis.clear();
        self.snapshots.insert(ssid, sets);
        self.attribs.add_snapshot(ssid, include)?;
        debug!("initialized snapshot {ssid} from {} prior(s)", include.len());
        Ok(())
    }

    /// Drop a snapshot's visibility sets and attributes. Arena rows are
    /// untouched; a later purge reclaims whatever became unreachable.
    pub fn ss_drop(&mut self, ssid: Ssid) {
        self.snapshots.remove(ssid);
        self.attribs.drop_snapshot(ssid);
    }

    // ------------------------------------------------------------------
    // Visibility queries
    // ------------------------------------------------------------------

    /// True when `ent` is visible under `ssid`. Object kinds are looked
    /// up in the visibility sets; topological kinds are visible exactly
    /// when their owning object is. An unknown snapshot or a dangling
    /// handle is simply not visible.
    pub fn has_ent(&self, ssid: Ssid, ent_type: EntType, ent: EntIdx) -> bool {
        let Some(sets) = self.snapshots.get(ssid) else {
            return false;
        };
        match sets.set(ent_type) {
            Some(set) => set.contains(&ent),
            None => self
                .topo_obj(ent_type, ent)
                .is_some_and(|(obj_type, obj)| self.has_ent(ssid, obj_type, obj)),
        }
    }

    /// Retain only the entities visible under `ssid`, preserving order.
    pub fn filter_ents(&self, ssid: Ssid, ent_type: EntType, ents: &[EntIdx]) -> Vec<EntIdx> {
        ents.iter()
            .copied()
            .filter(|&ent| self.has_ent(ssid, ent_type, ent))
            .collect()
    }

    /// All entities of one kind visible under `ssid`, sorted by handle.
    /// Topological kinds are derived from the visible objects.
    pub fn get_ents(&self, ssid: Ssid, ent_type: EntType) -> Result<Vec<EntIdx>, KernelError> {
        let sets = self
            .snapshots
            .get(ssid)
            .ok_or(KernelError::SsidNotFound(ssid))?;
        let mut ents: Vec<EntIdx> = match sets.set(ent_type) {
            Some(set) => set.iter().copied().collect(),
            None => {
                let mut ents = Vec::new();
                for kind in [EntType::Point, EntType::Pline, EntType::Pgon] {
                    let Some(objs) = sets.set(kind) else { continue };
                    for &obj in objs {
                        ents.extend(self.nav_any_to_any(ssid, kind, ent_type, obj)?);
                    }
                }
                ents
            }
        };
        ents.sort_unstable();
        ents.dedup();
        Ok(ents)
    }

    /// Number of entities of one kind visible under `ssid`.
    pub fn num_ents(&self, ssid: Ssid, ent_type: EntType) -> Result<usize, KernelError> {
        let sets = self
            .snapshots
            .get(ssid)
            .ok_or(KernelError::SsidNotFound(ssid))?;
        match sets.set(ent_type) {
            Some(set) => Ok(set.len()),
            None => Ok(self.get_ents(ssid, ent_type)?.len()),
        }
    }

    /// Make existing objects visible under `ssid` (cross-snapshot
    /// sharing).
    ///
    /// # Errors
    /// `NotAnObjectKind` for topological kinds, `EntNotFound` for a
    /// dangling handle.
    pub fn add_ents(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ents: &[EntIdx],
    ) -> Result<(), KernelError> {
        self.require_ssid(ssid)?;
        if ent_type.is_topo() {
            return Err(KernelError::NotAnObjectKind { ent_type });
        }
        for &ent in ents {
            self.require_ent(ent_type, ent)?;
        }
        for &ent in ents {
            self.ss_register(ssid, ent_type, ent)?;
        }
        Ok(())
    }

    /// Remove handles of one object kind from `ssid`'s visibility (or,
    /// with `invert`, every handle of that kind except the listed
    /// ones). No cascade; positions under the removed objects keep
    /// their visibility. See [`GeoModel::delete`] for the cascading
    /// form.
    pub fn del_ents(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ents: &[EntIdx],
        invert: bool,
    ) -> Result<(), KernelError> {
        self.require_ssid(ssid)?;
        if ent_type.is_topo() {
            return Err(KernelError::NotAnObjectKind { ent_type });
        }
        let Some(set) = self
            .snapshots
            .get_mut(ssid)
            .and_then(|sets| sets.set_mut(ent_type))
        else {
            return Ok(());
        };
        if invert {
            set.retain(|ent| ents.contains(ent));
        } else {
            for ent in ents {
                set.remove(ent);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete a selection of objects from one snapshot's visibility.
    ///
    /// With `invert`, everything visible *except* the selection is
    /// deleted, and the positions kept out of the selection are removed
    /// only where no surviving vertex stands on them.
    ///
    /// Positions in the selection's `posis` set are removed
    /// unconditionally; positions in `obj_posis` (and positions under
    /// deleted objects) are removed only when orphaned. Deleted objects
    /// are also struck from the member lists of surviving collections.
    pub fn delete(&mut self, ssid: Ssid, sel: &EntSets, invert: bool) -> Result<(), KernelError> {
        self.require_ssid(ssid)?;
        let target = if invert {
            self.invert_selection(ssid, sel)
        } else {
            sel.clone()
        };

        // posis under the deleted objects become orphan candidates
        let mut orphan_candidates: HashSet<EntIdx> = target.obj_posis.clone();
        for kind in [EntType::Point, EntType::Pline, EntType::Pgon] {
            if let Some(objs) = target.set(kind) {
                for &obj in objs {
                    if self.ent_exists(kind, obj) {
                        orphan_candidates.extend(self.nav_any_to_posi(ssid, kind, obj)?);
                    }
                }
            }
        }

        for kind in [EntType::Coll, EntType::Pgon, EntType::Pline, EntType::Point] {
            let Some(objs) = target.set(kind) else { continue };
            let objs: Vec<EntIdx> = objs.iter().copied().collect();
            if let Some(visible) = self
                .snapshots
                .get_mut(ssid)
                .and_then(|sets| sets.set_mut(kind))
            {
                for obj in &objs {
                    visible.remove(obj);
                }
            }
            // strike deleted objects from surviving member lists
            if kind != EntType::Coll {
                for obj in objs {
                    for coll in self.attribs.ent_colls(ssid, kind, obj)? {
                        self.attribs.del_coll_ents(ssid, coll, kind, &[obj])?;
                    }
                }
            }
        }

        if let Some(visible) = self
            .snapshots
            .get_mut(ssid)
            .and_then(|sets| sets.set_mut(EntType::Posi))
        {
            for posi in &target.posis {
                visible.remove(posi);
            }
        }
        self.del_unused_posis(ssid, &orphan_candidates);
        debug!("deleted selection from snapshot {ssid} (invert: {invert})");
        Ok(())
    }

    /// Remove the candidate positions that no visible vertex stands on.
    fn del_unused_posis(&mut self, ssid: Ssid, candidates: &HashSet<EntIdx>) {
        let orphaned: Vec<EntIdx> = candidates
            .iter()
            .copied()
            .filter(|posi| {
                self.maps
                    .up_posis_verts
                    .get(posi)
                    .is_none_or(|verts| !verts.iter().any(|&v| self.has_ent(ssid, EntType::Vert, v)))
            })
            .collect();
        if let Some(visible) = self
            .snapshots
            .get_mut(ssid)
            .and_then(|sets| sets.set_mut(EntType::Posi))
        {
            for posi in orphaned {
                visible.remove(&posi);
            }
        }
    }

    /// The complement of a selection against a snapshot's visibility.
    /// Complement positions are orphan-checked, never force-deleted.
    fn invert_selection(&self, ssid: Ssid, sel: &EntSets) -> EntSets {
        let Some(visible) = self.snapshots.get(ssid) else {
            return EntSets::new();
        };
        let mut out = EntSets::new();
        out.points = visible.points.difference(&sel.points).copied().collect();
        out.plines = visible.plines.difference(&sel.plines).copied().collect();
        out.pgons = visible.pgons.difference(&sel.pgons).copied().collect();
        out.colls = visible.colls.difference(&sel.colls).copied().collect();
        out.obj_posis = visible
            .posis
            .iter()
            .copied()
            .filter(|posi| !sel.posis.contains(posi) && !sel.obj_posis.contains(posi))
            .collect();
        out
    }

    /// Snapshot-scoped navigation: like `nav_any_to_any`, but results
    /// are filtered to visible entities when the traversal starts or
    /// ends at positions or collections (the two kinds whose arena rows
    /// outlive their visibility).
    pub fn nav_any_to_any_ss(
        &self,
        ssid: Ssid,
        from: EntType,
        to: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ssid(ssid)?;
        let found = self.nav_any_to_any(ssid, from, to, ent)?;
        let needs_filter = matches!(from, EntType::Posi | EntType::Coll)
            || matches!(to, EntType::Posi | EntType::Coll);
        if needs_filter {
            Ok(self.filter_ents(ssid, to, &found))
        } else {
            Ok(found)
        }
    }

    // ------------------------------------------------------------------

    pub(crate) fn ss_register(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
    ) -> Result<(), KernelError> {
        let sets = self
            .snapshots
            .get_mut(ssid)
            .ok_or(KernelError::SsidNotFound(ssid))?;
        sets.insert(ent_type, ent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulate::FanTriangulator;

    const SS0: Ssid = Ssid::new(0);
    const SS1: Ssid = Ssid::new(1);

    fn triangle(model: &mut GeoModel, ssid: Ssid) -> (Vec<EntIdx>, EntIdx) {
        let posis: Vec<EntIdx> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .map(|&xyz| {
                let posi = model.add_posi(ssid).unwrap();
                model.set_posi_coords(ssid, posi, xyz).unwrap();
                posi
            })
            .collect();
        let pgon = model.add_pgon(ssid, &posis, &[], &FanTriangulator).unwrap();
        (posis, pgon)
    }

    #[test]
    fn snapshots_are_isolated_after_branching() {
        let mut model = GeoModel::new();
        let (_, pgon) = triangle(&mut model, SS0);
        model.ss_init(SS1, &[SS0]).unwrap();
        assert!(model.has_ent(SS1, EntType::Pgon, pgon));

        let mut sel = EntSets::new();
        sel.pgons.insert(pgon);
        model.delete(SS1, &sel, false).unwrap();
        assert!(!model.has_ent(SS1, EntType::Pgon, pgon));
        assert!(model.has_ent(SS0, EntType::Pgon, pgon));
    }

    #[test]
    fn deleting_an_object_orphans_its_positions() {
        let mut model = GeoModel::new();
        let (posis, pgon) = triangle(&mut model, SS0);
        let mut sel = EntSets::new();
        sel.pgons.insert(pgon);
        model.delete(SS0, &sel, false).unwrap();
        for posi in &posis {
            assert!(!model.has_ent(SS0, EntType::Posi, *posi));
        }
        // arena rows survive; only visibility changed
        assert!(model.ent_exists(EntType::Pgon, pgon));
    }

    #[test]
    fn shared_positions_survive_deletion_of_one_user() {
        let mut model = GeoModel::new();
        let (posis, pgon) = triangle(&mut model, SS0);
        let point = model.add_point(SS0, posis[0]).unwrap();
        let mut sel = EntSets::new();
        sel.pgons.insert(pgon);
        model.delete(SS0, &sel, false).unwrap();
        assert!(model.has_ent(SS0, EntType::Posi, posis[0]));
        assert!(!model.has_ent(SS0, EntType::Posi, posis[1]));
        assert!(model.has_ent(SS0, EntType::Point, point));
    }

    #[test]
    fn invert_deletes_the_complement() {
        let mut model = GeoModel::new();
        let (_, keep) = triangle(&mut model, SS0);
        let (_, drop) = triangle(&mut model, SS0);
        let mut sel = EntSets::new();
        sel.pgons.insert(keep);
        model.delete(SS0, &sel, true).unwrap();
        assert!(model.has_ent(SS0, EntType::Pgon, keep));
        assert!(!model.has_ent(SS0, EntType::Pgon, drop));
        assert_eq!(model.num_ents(SS0, EntType::Posi).unwrap(), 3);
    }

    #[test]
    fn del_ents_is_plain_set_removal() {
        let mut model = GeoModel::new();
        let (posis, a) = triangle(&mut model, SS0);
        let (_, b) = triangle(&mut model, SS0);
        model.del_ents(SS0, EntType::Pgon, &[a], true).unwrap();
        assert!(model.has_ent(SS0, EntType::Pgon, a));
        assert!(!model.has_ent(SS0, EntType::Pgon, b));
        // no cascade: even b's positions stay visible
        assert_eq!(model.num_ents(SS0, EntType::Posi).unwrap(), 6);
        assert!(model.has_ent(SS0, EntType::Posi, posis[0]));

        let err = model
            .del_ents(SS0, EntType::Vert, &[], false)
            .unwrap_err();
        assert!(matches!(err, KernelError::NotAnObjectKind { .. }));
    }

    #[test]
    fn deleted_objects_leave_collection_member_lists() {
        let mut model = GeoModel::new();
        let (_, pgon) = triangle(&mut model, SS0);
        let coll = model.add_coll(SS0).unwrap();
        model.add_coll_ents(SS0, coll, EntType::Pgon, &[pgon]).unwrap();
        let mut sel = EntSets::new();
        sel.pgons.insert(pgon);
        model.delete(SS0, &sel, false).unwrap();
        assert!(model.coll_ents(SS0, coll, EntType::Pgon).unwrap().is_empty());
    }

    #[test]
    fn derived_topo_counts_follow_visibility() {
        let mut model = GeoModel::new();
        let (_, pgon) = triangle(&mut model, SS0);
        assert_eq!(model.num_ents(SS0, EntType::Vert).unwrap(), 3);
        assert_eq!(model.num_ents(SS0, EntType::Tri).unwrap(), 1);
        let mut sel = EntSets::new();
        sel.pgons.insert(pgon);
        model.delete(SS0, &sel, false).unwrap();
        assert_eq!(model.num_ents(SS0, EntType::Vert).unwrap(), 0);
        assert_eq!(model.num_ents(SS0, EntType::Edge).unwrap(), 0);
    }
}
