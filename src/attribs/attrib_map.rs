//! `AttribMap`: one typed, interned attribute column.
//!
//! A column maps entity handles of a single kind to values of a single
//! type. Values are interned: equal values share one slot in `vals`,
//! found through their JSON encoding in `keys` and kept alive by a
//! reference count. Interning matters for bulk geometry where thousands
//! of entities share a coordinate or color; it is transparent to
//! callers.
//!
//! # Invariants
//!
//! - `vals`, `refs` have equal length; `keys` maps onto live slots only.
//! - Every slot referenced from `ents` has `refs > 0`.
//! - Slots whose count drops to zero become tombstones; they are
//!   reclaimed when the column is rebuilt (purge).

use std::collections::HashMap;

use crate::attribs::value::{AttribDataType, AttribValue};
use crate::kernel_error::KernelError;
use crate::topology::ent::{EntIdx, EntType};

/// A typed attribute column over one entity kind.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AttribMap {
    name: String,
    ent_type: EntType,
    data_type: AttribDataType,
    /// Interned value storage; slots may be tombstoned (refs 0).
    vals: Vec<AttribValue>,
    /// Reference count per slot.
    refs: Vec<usize>,
    /// JSON encoding of each live value -> slot.
    keys: HashMap<String, usize>,
    /// Entity handle -> slot.
    ents: HashMap<EntIdx, usize>,
}

impl AttribMap {
    /// Create an empty column.
    pub fn new(name: impl Into<String>, ent_type: EntType, data_type: AttribDataType) -> Self {
        AttribMap {
            name: name.into(),
            ent_type,
            data_type,
            vals: Vec::new(),
            refs: Vec::new(),
            keys: HashMap::new(),
            ents: HashMap::new(),
        }
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity kind this column is attached to.
    pub fn ent_type(&self) -> EntType {
        self.ent_type
    }

    /// The declared value type.
    pub fn data_type(&self) -> AttribDataType {
        self.data_type
    }

    /// Number of entities with a value set.
    pub fn len(&self) -> usize {
        self.ents.len()
    }

    /// True when no entity has a value.
    pub fn is_empty(&self) -> bool {
        self.ents.is_empty()
    }

    /// Set the value for `ent`, replacing any previous value.
    ///
    /// # Errors
    /// `AttribTypeMismatch` when the value's type differs from the
    /// column's declared type.
    pub fn set(&mut self, ent: EntIdx, val: AttribValue) -> Result<(), KernelError> {
        if val.data_type() != self.data_type {
            return Err(KernelError::AttribTypeMismatch {
                ent_type: self.ent_type,
                name: self.name.clone(),
                expected: self.data_type,
                found: val.data_type(),
            });
        }
        let key = encode_key(&val)?;
        let slot = match self.keys.get(&key) {
            Some(&slot) => {
                self.refs[slot] += 1;
                slot
            }
            None => {
                let slot = self.vals.len();
                self.vals.push(val);
                self.refs.push(1);
                self.keys.insert(key, slot);
                slot
            }
        };
        if let Some(old) = self.ents.insert(ent, slot) {
            self.release(old);
        }
        Ok(())
    }

    /// The value for `ent`, or `None` when unset.
    pub fn get(&self, ent: EntIdx) -> Option<&AttribValue> {
        self.ents.get(&ent).map(|&slot| &self.vals[slot])
    }

    /// Remove the value for `ent`. Returns the removed value.
    pub fn unset(&mut self, ent: EntIdx) -> Option<AttribValue> {
        let slot = self.ents.remove(&ent)?;
        let val = self.vals[slot].clone();
        self.release(slot);
        Some(val)
    }

    /// The interned slot index for `ent`'s value. Two entities sharing a
    /// slot share one stored value.
    pub fn value_slot(&self, ent: EntIdx) -> Option<usize> {
        self.ents.get(&ent).copied()
    }

    /// Iterate over `(handle, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (EntIdx, &AttribValue)> + '_ {
        self.ents.iter().map(|(&ent, &slot)| (ent, &self.vals[slot]))
    }

    /// Handles with a value set, in arbitrary order.
    pub fn ents(&self) -> impl Iterator<Item = EntIdx> + '_ {
        self.ents.keys().copied()
    }

    /// Copy every value of `other` into this column, overwriting
    /// collisions. Types must match.
    pub fn merge_from(&mut self, other: &AttribMap) -> Result<(), KernelError> {
        for (ent, val) in other.iter() {
            self.set(ent, val.clone())?;
        }
        Ok(())
    }

    /// Rebuild the column with remapped handles, dropping rows whose
    /// handle maps to `None` and compacting tombstoned value slots.
    pub(crate) fn rebuilt(
        &self,
        remap_ent: impl Fn(EntIdx) -> Option<EntIdx>,
        remap_val: impl Fn(&AttribValue) -> Option<AttribValue>,
    ) -> Result<AttribMap, KernelError> {
        let mut out = AttribMap::new(self.name.clone(), self.ent_type, self.data_type);
        for (ent, val) in self.iter() {
            let Some(new_ent) = remap_ent(ent) else { continue };
            let Some(new_val) = remap_val(val) else { continue };
            out.set(new_ent, new_val)?;
        }
        Ok(out)
    }

    fn release(&mut self, slot: usize) {
        self.refs[slot] -= 1;
        if self.refs[slot] == 0 {
            // tombstone: keep the slot, drop its lookup key
            if let Ok(key) = encode_key(&self.vals[slot]) {
                self.keys.remove(&key);
            }
        }
    }
}

/// Intern key: the value's JSON encoding. Equal values of one type have
/// equal encodings.
fn encode_key(val: &AttribValue) -> Result<String, KernelError> {
    serde_json::to_string(val).map_err(|err| KernelError::Document(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u32) -> EntIdx {
        EntIdx::new(i)
    }

    #[test]
    fn equal_values_share_a_slot() {
        let mut col = AttribMap::new("xyz", EntType::Posi, AttribDataType::List);
        col.set(e(0), AttribValue::from_vec3([1.0, 2.0, 3.0])).unwrap();
        col.set(e(1), AttribValue::from_vec3([1.0, 2.0, 3.0])).unwrap();
        col.set(e(2), AttribValue::from_vec3([9.0, 9.0, 9.0])).unwrap();
        assert_eq!(col.value_slot(e(0)), col.value_slot(e(1)));
        assert_ne!(col.value_slot(e(0)), col.value_slot(e(2)));
        assert_eq!(col.len(), 3);
    }

    #[test]
    fn unset_is_absence_not_sentinel() {
        let mut col = AttribMap::new("w", EntType::Pgon, AttribDataType::Num);
        col.set(e(0), 5.0.into()).unwrap();
        assert_eq!(col.unset(e(0)), Some(AttribValue::Num(5.0)));
        assert_eq!(col.get(e(0)), None);
        assert_eq!(col.unset(e(0)), None);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut col = AttribMap::new("name", EntType::Coll, AttribDataType::Str);
        let err = col.set(e(0), AttribValue::Num(1.0)).unwrap_err();
        assert!(matches!(err, KernelError::AttribTypeMismatch { .. }));
    }

    #[test]
    fn overwrite_releases_the_old_slot() {
        let mut col = AttribMap::new("rgb", EntType::Vert, AttribDataType::List);
        col.set(e(0), AttribValue::from_vec3([1.0, 0.0, 0.0])).unwrap();
        col.set(e(0), AttribValue::from_vec3([0.0, 1.0, 0.0])).unwrap();
        assert_eq!(col.get(e(0)), Some(&AttribValue::from_vec3([0.0, 1.0, 0.0])));
        // old slot is tombstoned: a fresh write of the old value must
        // not resurrect the stale key
        col.set(e(1), AttribValue::from_vec3([1.0, 0.0, 0.0])).unwrap();
        assert_ne!(col.value_slot(e(0)), col.value_slot(e(1)));
    }

    #[test]
    fn rebuilt_drops_unmapped_rows() {
        let mut col = AttribMap::new("_ts", EntType::Point, AttribDataType::Num);
        col.set(e(0), 0.0.into()).unwrap();
        col.set(e(5), 1.0.into()).unwrap();
        let out = col
            .rebuilt(
                |ent| (ent == e(5)).then_some(e(1)),
                |val| Some(val.clone()),
            )
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(e(1)), Some(&AttribValue::Num(1.0)));
    }
}
