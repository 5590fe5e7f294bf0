//! `AttribStore`: per-snapshot, per-kind attribute columns plus
//! whole-model attributes.
//!
//! Each snapshot id owns its own family of columns; initializing a
//! snapshot from prior ones copies their values in (so timelines can
//! diverge without aliasing). The store knows nothing about topology —
//! it is read and written by entity handle — except for the collection
//! bookkeeping helpers, which interpret the reserved `_coll_*` columns.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::attribs::attrib_map::AttribMap;
use crate::attribs::value::{AttribDataType, AttribValue, Vec3};
use crate::attribs::{
    ATTR_COLL_CHILDS, ATTR_COLL_PARENT, ATTR_COLL_PGONS, ATTR_COLL_PLINES, ATTR_COLL_POINTS,
    ATTR_COLOR, ATTR_COORDS, ATTR_NORMAL, ATTR_TIMESTAMP,
};
use crate::kernel_error::KernelError;
use crate::topology::ent::{EntIdx, EntType, Ssid};

/// One snapshot's attribute maps: per-kind named columns plus
/// whole-model attributes (no per-entity keying).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AttribsMaps {
    pub(crate) ents: HashMap<EntType, BTreeMap<String, AttribMap>>,
    pub(crate) model: BTreeMap<String, AttribValue>,
}

impl AttribsMaps {
    /// The named columns for one kind, if any exist.
    pub fn kind(&self, ent_type: EntType) -> Option<&BTreeMap<String, AttribMap>> {
        self.ents.get(&ent_type)
    }

    /// The whole-model attributes.
    pub fn model(&self) -> &BTreeMap<String, AttribValue> {
        &self.model
    }
}

/// Attribute storage for every snapshot of one model.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AttribStore {
    snapshots: HashMap<Ssid, AttribsMaps>,
}

impl AttribStore {
    /// An empty store with no snapshots.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `ssid` has attribute maps.
    pub fn contains(&self, ssid: Ssid) -> bool {
        self.snapshots.contains_key(&ssid)
    }

    /// Create the attribute maps for a new snapshot, seeding the builtin
    /// columns and merging in the values of every `include`d snapshot.
    ///
    /// # Errors
    /// `SsidNotFound` when an included snapshot was never created.
    pub fn add_snapshot(&mut self, ssid: Ssid, include: &[Ssid]) -> Result<(), KernelError> {
        for &prior in include {
            if !self.snapshots.contains_key(&prior) {
                return Err(KernelError::SsidNotFound(prior));
            }
        }
        self.seed_snapshot(ssid);
        for &prior in include {
            let prior_maps = self.snapshots[&prior].clone();
            self.merge_maps(ssid, &prior_maps)?;
        }
        Ok(())
    }

    /// Create a snapshot's maps with the builtin columns and nothing
    /// else. Cannot fail; `add_snapshot` builds on this.
    pub(crate) fn seed_snapshot(&mut self, ssid: Ssid) {
        let mut maps = AttribsMaps::default();
        for (ent_type, name, data_type) in builtin_columns() {
            maps.ents
                .entry(ent_type)
                .or_default()
                .insert(name.to_string(), AttribMap::new(name, ent_type, data_type));
        }
        self.snapshots.insert(ssid, maps);
    }

    /// Drop a snapshot's attribute maps.
    pub fn drop_snapshot(&mut self, ssid: Ssid) {
        self.snapshots.remove(&ssid);
    }

    /// Iterate over all snapshots.
    pub fn iter_snapshots(&self) -> impl Iterator<Item = (Ssid, &AttribsMaps)> + '_ {
        self.snapshots.iter().map(|(&ssid, maps)| (ssid, maps))
    }

    fn maps(&self, ssid: Ssid) -> Result<&AttribsMaps, KernelError> {
        self.snapshots
            .get(&ssid)
            .ok_or(KernelError::SsidNotFound(ssid))
    }

    fn maps_mut(&mut self, ssid: Ssid) -> Result<&mut AttribsMaps, KernelError> {
        self.snapshots
            .get_mut(&ssid)
            .ok_or(KernelError::SsidNotFound(ssid))
    }

    // ------------------------------------------------------------------
    // Entity attributes
    // ------------------------------------------------------------------

    /// Set an attribute value, creating the column on first write.
    pub fn set(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
        val: AttribValue,
    ) -> Result<(), KernelError> {
        let maps = self.maps_mut(ssid)?;
        let col = maps
            .ents
            .entry(ent_type)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| AttribMap::new(name, ent_type, val.data_type()));
        col.set(ent, val)
    }

    /// The attribute value for an entity, or `None` when unset.
    pub fn get(
        &self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
    ) -> Result<Option<&AttribValue>, KernelError> {
        Ok(self
            .maps(ssid)?
            .ents
            .get(&ent_type)
            .and_then(|cols| cols.get(name))
            .and_then(|col| col.get(ent)))
    }

    /// Remove an attribute value. Absence is not an error.
    pub fn unset(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        ent: EntIdx,
        name: &str,
    ) -> Result<Option<AttribValue>, KernelError> {
        Ok(self
            .maps_mut(ssid)?
            .ents
            .get_mut(&ent_type)
            .and_then(|cols| cols.get_mut(name))
            .and_then(|col| col.unset(ent)))
    }

    /// Names of the columns attached to a kind, in sorted order.
    pub fn names(&self, ssid: Ssid, ent_type: EntType) -> Result<Vec<String>, KernelError> {
        Ok(self
            .maps(ssid)?
            .ents
            .get(&ent_type)
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Copy every attribute value from `from` to `to`, skipping the
    /// listed names.
    pub fn copy_ent_vals(
        &mut self,
        ssid: Ssid,
        ent_type: EntType,
        from: EntIdx,
        to: EntIdx,
        skip: &[&str],
    ) -> Result<(), KernelError> {
        let vals: Vec<(String, AttribValue)> = self
            .maps(ssid)?
            .ents
            .get(&ent_type)
            .map(|cols| {
                cols.iter()
                    .filter(|(name, _)| !skip.contains(&name.as_str()))
                    .filter_map(|(name, col)| col.get(from).map(|v| (name.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        for (name, val) in vals {
            self.set(ssid, ent_type, to, &name, val)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whole-model attributes
    // ------------------------------------------------------------------

    /// Set a whole-model attribute.
    pub fn set_model(&mut self, ssid: Ssid, name: &str, val: AttribValue) -> Result<(), KernelError> {
        self.maps_mut(ssid)?.model.insert(name.to_string(), val);
        Ok(())
    }

    /// A whole-model attribute, or `None` when unset.
    pub fn get_model(&self, ssid: Ssid, name: &str) -> Result<Option<&AttribValue>, KernelError> {
        Ok(self.maps(ssid)?.model.get(name))
    }

    // ------------------------------------------------------------------
    // Builtin attribute helpers
    // ------------------------------------------------------------------

    /// The coordinate of a position.
    ///
    /// # Errors
    /// `MissingCoord` when the position has no `xyz` value (or one of
    /// the wrong shape).
    pub fn posi_coords(&self, ssid: Ssid, posi: EntIdx) -> Result<Vec3, KernelError> {
        self.get(ssid, EntType::Posi, posi, ATTR_COORDS)?
            .and_then(AttribValue::as_vec3)
            .ok_or(KernelError::MissingCoord { posi })
    }

    /// Set the coordinate of a position.
    pub fn set_posi_coords(&mut self, ssid: Ssid, posi: EntIdx, xyz: Vec3) -> Result<(), KernelError> {
        self.set(ssid, EntType::Posi, posi, ATTR_COORDS, AttribValue::from_vec3(xyz))
    }

    /// Stamp the creation timestamp of an object (the snapshot id it was
    /// created under).
    pub fn set_ts(&mut self, ssid: Ssid, ent_type: EntType, ent: EntIdx) -> Result<(), KernelError> {
        self.set(
            ssid,
            ent_type,
            ent,
            ATTR_TIMESTAMP,
            AttribValue::Num(f64::from(ssid.get())),
        )
    }

    // ------------------------------------------------------------------
    // Collection bookkeeping
    // ------------------------------------------------------------------

    /// The parent of a collection, or `None` at the root.
    pub fn coll_parent(&self, ssid: Ssid, coll: EntIdx) -> Result<Option<EntIdx>, KernelError> {
        Ok(self
            .get(ssid, EntType::Coll, coll, ATTR_COLL_PARENT)?
            .and_then(AttribValue::as_idx))
    }

    /// Re-parent a collection, updating both the parent reference and
    /// the child lists of the old and new parents.
    ///
    /// # Errors
    /// `CollCycle` when the prospective parent is the collection itself
    /// or one of its descendants.
    pub fn set_coll_parent(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        parent: Option<EntIdx>,
    ) -> Result<(), KernelError> {
        if let Some(parent) = parent {
            if parent == coll || self.coll_descendents(ssid, coll)?.contains(&parent) {
                return Err(KernelError::CollCycle { coll, parent });
            }
        }
        if let Some(old) = self.coll_parent(ssid, coll)? {
            let mut childs = self.coll_children(ssid, old)?;
            childs.retain(|&c| c != coll);
            self.set(
                ssid,
                EntType::Coll,
                old,
                ATTR_COLL_CHILDS,
                AttribValue::from_idx_list(childs),
            )?;
        }
        match parent {
            Some(parent) => {
                let mut childs = self.coll_children(ssid, parent)?;
                if !childs.contains(&coll) {
                    childs.push(coll);
                }
                self.set(
                    ssid,
                    EntType::Coll,
                    parent,
                    ATTR_COLL_CHILDS,
                    AttribValue::from_idx_list(childs),
                )?;
                self.set(
                    ssid,
                    EntType::Coll,
                    coll,
                    ATTR_COLL_PARENT,
                    AttribValue::from_idx(parent),
                )?;
            }
            None => {
                self.unset(ssid, EntType::Coll, coll, ATTR_COLL_PARENT)?;
            }
        }
        Ok(())
    }

    /// The direct children of a collection.
    pub fn coll_children(&self, ssid: Ssid, coll: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        Ok(self
            .get(ssid, EntType::Coll, coll, ATTR_COLL_CHILDS)?
            .and_then(AttribValue::as_idx_list)
            .unwrap_or_default())
    }

    /// All descendants of a collection (children, grandchildren, ...),
    /// excluding the collection itself. Cycle-safe.
    pub fn coll_descendents(&self, ssid: Ssid, coll: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        let mut seen: HashSet<EntIdx> = HashSet::new();
        let mut stack = self.coll_children(ssid, coll)?;
        let mut out = Vec::new();
        while let Some(child) = stack.pop() {
            if child == coll || !seen.insert(child) {
                continue;
            }
            out.push(child);
            stack.extend(self.coll_children(ssid, child)?);
        }
        Ok(out)
    }

    /// The members of a collection of one object kind.
    ///
    /// # Errors
    /// `NotAnObjectKind` unless `member_type` is Point, Pline, or Pgon.
    pub fn coll_ents(
        &self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
    ) -> Result<Vec<EntIdx>, KernelError> {
        let name = coll_member_attr(member_type)?;
        Ok(self
            .get(ssid, EntType::Coll, coll, name)?
            .and_then(AttribValue::as_idx_list)
            .unwrap_or_default())
    }

    /// Add members to a collection, ignoring duplicates.
    pub fn add_coll_ents(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
        ents: &[EntIdx],
    ) -> Result<(), KernelError> {
        let name = coll_member_attr(member_type)?;
        let mut members = self.coll_ents(ssid, coll, member_type)?;
        for &ent in ents {
            if !members.contains(&ent) {
                members.push(ent);
            }
        }
        self.set(
            ssid,
            EntType::Coll,
            coll,
            name,
            AttribValue::from_idx_list(members),
        )
    }

    /// Remove members from a collection.
    pub fn del_coll_ents(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
        ents: &[EntIdx],
    ) -> Result<(), KernelError> {
        let name = coll_member_attr(member_type)?;
        let mut members = self.coll_ents(ssid, coll, member_type)?;
        members.retain(|m| !ents.contains(m));
        self.set(
            ssid,
            EntType::Coll,
            coll,
            name,
            AttribValue::from_idx_list(members),
        )
    }

    /// Every collection whose member list of `member_type` contains
    /// `ent`.
    pub fn ent_colls(
        &self,
        ssid: Ssid,
        member_type: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        let name = coll_member_attr(member_type)?;
        let Some(col) = self
            .maps(ssid)?
            .ents
            .get(&EntType::Coll)
            .and_then(|cols| cols.get(name))
        else {
            return Ok(Vec::new());
        };
        let mut colls: Vec<EntIdx> = col
            .iter()
            .filter(|(_, val)| {
                val.as_idx_list()
                    .is_some_and(|members| members.contains(&ent))
            })
            .map(|(coll, _)| coll)
            .collect();
        colls.sort_unstable();
        Ok(colls)
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// Merge another store's snapshots into this one (model merge).
    /// Missing snapshots are created; colliding values are overwritten.
    pub fn merge_from(&mut self, other: &AttribStore) -> Result<(), KernelError> {
        for (ssid, maps) in &other.snapshots {
            if !self.snapshots.contains_key(ssid) {
                self.snapshots.insert(*ssid, maps.clone());
                continue;
            }
            self.merge_maps(*ssid, maps)?;
        }
        Ok(())
    }

    fn merge_maps(&mut self, ssid: Ssid, from: &AttribsMaps) -> Result<(), KernelError> {
        let into = self.maps_mut(ssid)?;
        for (&ent_type, cols) in &from.ents {
            let into_cols = into.ents.entry(ent_type).or_default();
            for (name, col) in cols {
                match into_cols.get_mut(name) {
                    Some(existing) => existing.merge_from(col)?,
                    None => {
                        into_cols.insert(name.clone(), col.clone());
                    }
                }
            }
        }
        for (name, val) in &from.model {
            into.model.insert(name.clone(), val.clone());
        }
        Ok(())
    }

    /// Rebuild the store with remapped handles (purge). Rows whose
    /// handle is not in the remap table for its kind are dropped, and
    /// handle-valued collection bookkeeping values are remapped too.
    pub(crate) fn rebuilt(
        &self,
        remap: &HashMap<EntType, HashMap<EntIdx, EntIdx>>,
    ) -> Result<AttribStore, KernelError> {
        let empty: HashMap<EntIdx, EntIdx> = HashMap::new();
        let mut out = AttribStore::new();
        for (&ssid, maps) in &self.snapshots {
            let mut new_maps = AttribsMaps {
                ents: HashMap::new(),
                model: maps.model.clone(),
            };
            for (&ent_type, cols) in &maps.ents {
                let kind_map = remap.get(&ent_type).unwrap_or(&empty);
                let new_cols = new_maps.ents.entry(ent_type).or_default();
                for (name, col) in cols {
                    let value_kind = handle_valued_column(ent_type, name);
                    let rebuilt = col.rebuilt(
                        |ent| kind_map.get(&ent).copied(),
                        |val| match value_kind {
                            Some(member_type) => {
                                let member_map = remap.get(&member_type).unwrap_or(&empty);
                                remap_handle_value(val, member_map)
                            }
                            None => Some(val.clone()),
                        },
                    )?;
                    new_cols.insert(name.clone(), rebuilt);
                }
            }
            out.snapshots.insert(ssid, new_maps);
        }
        Ok(out)
    }
}

/// The builtin columns seeded into every new snapshot.
fn builtin_columns() -> Vec<(EntType, &'static str, AttribDataType)> {
    vec![
        (EntType::Posi, ATTR_COORDS, AttribDataType::List),
        (EntType::Vert, ATTR_COLOR, AttribDataType::List),
        (EntType::Vert, ATTR_NORMAL, AttribDataType::List),
        (EntType::Point, ATTR_TIMESTAMP, AttribDataType::Num),
        (EntType::Pline, ATTR_TIMESTAMP, AttribDataType::Num),
        (EntType::Pgon, ATTR_TIMESTAMP, AttribDataType::Num),
        (EntType::Coll, ATTR_TIMESTAMP, AttribDataType::Num),
        (EntType::Coll, ATTR_COLL_PARENT, AttribDataType::Num),
        (EntType::Coll, ATTR_COLL_CHILDS, AttribDataType::List),
        (EntType::Coll, ATTR_COLL_POINTS, AttribDataType::List),
        (EntType::Coll, ATTR_COLL_PLINES, AttribDataType::List),
        (EntType::Coll, ATTR_COLL_PGONS, AttribDataType::List),
    ]
}

/// The member-list column name for an object kind.
fn coll_member_attr(member_type: EntType) -> Result<&'static str, KernelError> {
    match member_type {
        EntType::Point => Ok(ATTR_COLL_POINTS),
        EntType::Pline => Ok(ATTR_COLL_PLINES),
        EntType::Pgon => Ok(ATTR_COLL_PGONS),
        other => Err(KernelError::NotAnObjectKind { ent_type: other }),
    }
}

/// Which kind of handles a reserved collection column stores, if any.
fn handle_valued_column(ent_type: EntType, name: &str) -> Option<EntType> {
    if ent_type != EntType::Coll {
        return None;
    }
    match name {
        ATTR_COLL_PARENT | ATTR_COLL_CHILDS => Some(EntType::Coll),
        ATTR_COLL_POINTS => Some(EntType::Point),
        ATTR_COLL_PLINES => Some(EntType::Pline),
        ATTR_COLL_PGONS => Some(EntType::Pgon),
        _ => None,
    }
}

/// Remap a handle-valued attribute through an old->new table. Single
/// handles disappear when unmapped; lists retain only mapped members.
fn remap_handle_value(val: &AttribValue, map: &HashMap<EntIdx, EntIdx>) -> Option<AttribValue> {
    match val {
        AttribValue::Num(_) => val.as_idx().and_then(|old| map.get(&old).copied()).map(AttribValue::from_idx),
        AttribValue::List(_) => {
            let members = val.as_idx_list()?;
            Some(AttribValue::from_idx_list(
                members.into_iter().filter_map(|old| map.get(&old).copied()),
            ))
        }
        _ => Some(val.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u32) -> EntIdx {
        EntIdx::new(i)
    }

    fn store_with_ss0() -> AttribStore {
        let mut store = AttribStore::new();
        store.add_snapshot(Ssid::new(0), &[]).unwrap();
        store
    }

    #[test]
    fn builtins_are_seeded() {
        let store = store_with_ss0();
        let names = store.names(Ssid::new(0), EntType::Coll).unwrap();
        assert!(names.contains(&ATTR_COLL_PARENT.to_string()));
        assert!(names.contains(&ATTR_COLL_PGONS.to_string()));
    }

    #[test]
    fn include_copies_values_without_aliasing() {
        let mut store = store_with_ss0();
        let (s0, s1) = (Ssid::new(0), Ssid::new(1));
        store.set_posi_coords(s0, e(0), [1.0, 2.0, 3.0]).unwrap();
        store.add_snapshot(s1, &[s0]).unwrap();
        assert_eq!(store.posi_coords(s1, e(0)).unwrap(), [1.0, 2.0, 3.0]);
        store.set_posi_coords(s1, e(0), [9.0, 9.0, 9.0]).unwrap();
        assert_eq!(store.posi_coords(s0, e(0)).unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn include_of_unknown_snapshot_fails() {
        let mut store = store_with_ss0();
        let err = store.add_snapshot(Ssid::new(2), &[Ssid::new(7)]).unwrap_err();
        assert_eq!(err, KernelError::SsidNotFound(Ssid::new(7)));
    }

    #[test]
    fn coll_parenting_maintains_child_lists() {
        let mut store = store_with_ss0();
        let s0 = Ssid::new(0);
        store.set_coll_parent(s0, e(1), Some(e(0))).unwrap();
        store.set_coll_parent(s0, e(2), Some(e(0))).unwrap();
        assert_eq!(store.coll_children(s0, e(0)).unwrap(), vec![e(1), e(2)]);
        store.set_coll_parent(s0, e(2), Some(e(1))).unwrap();
        assert_eq!(store.coll_children(s0, e(0)).unwrap(), vec![e(1)]);
        assert_eq!(store.coll_descendents(s0, e(0)).unwrap(), vec![e(1), e(2)]);
    }

    #[test]
    fn coll_cycles_are_rejected() {
        let mut store = store_with_ss0();
        let s0 = Ssid::new(0);
        store.set_coll_parent(s0, e(1), Some(e(0))).unwrap();
        store.set_coll_parent(s0, e(2), Some(e(1))).unwrap();
        let err = store.set_coll_parent(s0, e(0), Some(e(2))).unwrap_err();
        assert_eq!(err, KernelError::CollCycle { coll: e(0), parent: e(2) });
        let err = store.set_coll_parent(s0, e(0), Some(e(0))).unwrap_err();
        assert!(matches!(err, KernelError::CollCycle { .. }));
    }

    #[test]
    fn member_lists_and_reverse_lookup() {
        let mut store = store_with_ss0();
        let s0 = Ssid::new(0);
        store.add_coll_ents(s0, e(0), EntType::Pgon, &[e(3), e(4)]).unwrap();
        store.add_coll_ents(s0, e(1), EntType::Pgon, &[e(4)]).unwrap();
        assert_eq!(store.coll_ents(s0, e(0), EntType::Pgon).unwrap(), vec![e(3), e(4)]);
        assert_eq!(store.ent_colls(s0, EntType::Pgon, e(4)).unwrap(), vec![e(0), e(1)]);
        store.del_coll_ents(s0, e(0), EntType::Pgon, &[e(4)]).unwrap();
        assert_eq!(store.ent_colls(s0, EntType::Pgon, e(4)).unwrap(), vec![e(1)]);
    }
}
