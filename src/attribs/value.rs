//! Attribute values and their type tags.
//!
//! Columns in the attribute store are typed: every value in one column
//! shares one [`AttribDataType`]. Values serialize untagged so the
//! document format stays plain JSON scalars and arrays.

use std::fmt;

use crate::topology::ent::EntIdx;

/// A 3D coordinate, the value of the builtin `xyz` position attribute.
pub type Vec3 = [f64; 3];

/// Type tag of an attribute column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttribDataType {
    /// Numeric values.
    Num,
    /// String values.
    Str,
    /// Boolean values.
    Bool,
    /// List values (nested lists allowed).
    List,
}

impl fmt::Display for AttribDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttribDataType::Num => "number",
            AttribDataType::Str => "string",
            AttribDataType::Bool => "boolean",
            AttribDataType::List => "list",
        };
        f.write_str(name)
    }
}

/// One attribute value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AttribValue {
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Num(f64),
    /// String value.
    Str(String),
    /// List value.
    List(Vec<AttribValue>),
}

impl AttribValue {
    /// The type tag of this value.
    pub fn data_type(&self) -> AttribDataType {
        match self {
            AttribValue::Bool(_) => AttribDataType::Bool,
            AttribValue::Num(_) => AttribDataType::Num,
            AttribValue::Str(_) => AttribDataType::Str,
            AttribValue::List(_) => AttribDataType::List,
        }
    }

    /// Numeric payload, if this is a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            AttribValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Interpret a numeric value as an entity handle.
    pub fn as_idx(&self) -> Option<EntIdx> {
        self.as_num().map(|n| EntIdx::new(n as u32))
    }

    /// Interpret a list of numbers as a coordinate triple.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            AttribValue::List(items) if items.len() == 3 => {
                let x = items[0].as_num()?;
                let y = items[1].as_num()?;
                let z = items[2].as_num()?;
                Some([x, y, z])
            }
            _ => None,
        }
    }

    /// Interpret a list of numbers as a handle list.
    pub fn as_idx_list(&self) -> Option<Vec<EntIdx>> {
        match self {
            AttribValue::List(items) => items.iter().map(AttribValue::as_idx).collect(),
            _ => None,
        }
    }

    /// Build a coordinate-triple value.
    pub fn from_vec3(xyz: Vec3) -> Self {
        AttribValue::List(xyz.iter().map(|&c| AttribValue::Num(c)).collect())
    }

    /// Build a handle-list value.
    pub fn from_idx_list<I: IntoIterator<Item = EntIdx>>(ents: I) -> Self {
        AttribValue::List(
            ents.into_iter()
                .map(|ent| AttribValue::Num(f64::from(ent.get())))
                .collect(),
        )
    }

    /// Build a handle value.
    pub fn from_idx(ent: EntIdx) -> Self {
        AttribValue::Num(f64::from(ent.get()))
    }
}

impl From<f64> for AttribValue {
    fn from(n: f64) -> Self {
        AttribValue::Num(n)
    }
}

impl From<bool> for AttribValue {
    fn from(b: bool) -> Self {
        AttribValue::Bool(b)
    }
}

impl From<&str> for AttribValue {
    fn from(s: &str) -> Self {
        AttribValue::Str(s.to_string())
    }
}

impl From<String> for AttribValue {
    fn from(s: String) -> Self {
        AttribValue::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_roundtrip() {
        let v = AttribValue::from_vec3([1.0, 2.5, -3.0]);
        assert_eq!(v.data_type(), AttribDataType::List);
        assert_eq!(v.as_vec3(), Some([1.0, 2.5, -3.0]));
    }

    #[test]
    fn idx_list_roundtrip() {
        let ids = vec![EntIdx::new(0), EntIdx::new(4), EntIdx::new(2)];
        let v = AttribValue::from_idx_list(ids.clone());
        assert_eq!(v.as_idx_list(), Some(ids));
    }

    #[test]
    fn untagged_json_shapes() {
        assert_eq!(serde_json::to_string(&AttribValue::Num(2.0)).unwrap(), "2.0");
        assert_eq!(
            serde_json::to_string(&AttribValue::Str("a".into())).unwrap(),
            "\"a\""
        );
        let parsed: AttribValue = serde_json::from_str("[1.0,2.0,3.0]").unwrap();
        assert_eq!(parsed.as_vec3(), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn non_vec3_shapes_are_none() {
        assert_eq!(AttribValue::Num(1.0).as_vec3(), None);
        assert_eq!(AttribValue::from_idx_list(vec![EntIdx::new(1)]).as_vec3(), None);
    }
}
