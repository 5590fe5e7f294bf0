//! Typed, per-entity attribute storage.
//!
//! Attributes are columns keyed by entity handle, grouped per entity
//! kind and per snapshot. A handful of reserved names carry builtin
//! semantics consumed by the builder and navigator: coordinates on
//! positions, color/normal on vertices, creation timestamps on the
//! object kinds, and the collection bookkeeping columns. Collections
//! are "schema-defined via attributes" — parent, children, and member
//! lists live here rather than in adjacency tables, keeping group
//! mutation cheap.

pub mod attrib_map;
pub mod store;
pub mod value;

pub use attrib_map::AttribMap;
pub use store::AttribStore;
pub use value::{AttribDataType, AttribValue, Vec3};

/// Coordinate of a position.
pub const ATTR_COORDS: &str = "xyz";
/// Color of a vertex.
pub const ATTR_COLOR: &str = "rgb";
/// Normal of a vertex.
pub const ATTR_NORMAL: &str = "normal";
/// Creation timestamp (the snapshot id an object was created under).
pub const ATTR_TIMESTAMP: &str = "_ts";
/// Handle of a collection's parent collection.
pub const ATTR_COLL_PARENT: &str = "_coll_parent";
/// Handles of a collection's child collections.
pub const ATTR_COLL_CHILDS: &str = "_coll_childs";
/// Handles of a collection's point members.
pub const ATTR_COLL_POINTS: &str = "_coll_points";
/// Handles of a collection's polyline members.
pub const ATTR_COLL_PLINES: &str = "_coll_plines";
/// Handles of a collection's polygon members.
pub const ATTR_COLL_PGONS: &str = "_coll_pgons";
