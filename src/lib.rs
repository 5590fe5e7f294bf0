//! geo-kernel: a snapshot-versioned topology kernel for parametric
//! modeling hosts.
//!
//! The kernel stores geometry as a handle-indexed arena of nine entity
//! kinds (positions, vertices, triangles, edges, wires, points,
//! polylines, polygons, collections) with explicit up/down adjacency
//! tables, a typed per-snapshot attribute store, and visibility-set
//! snapshots that let many procedural timelines share one arena.
//! Deletion is a visibility change; handles stay stable until an
//! explicit purge compacts the arena.
//!
//! [`model::GeoModel`] is the facade: builders, navigation, snapshot
//! lifecycle, merge/purge, and JSON (de)serialization of the whole
//! model. Geometric triangulation is delegated to a caller-supplied
//! [`triangulate::Triangulator`].
//!
//! ```
//! use geo_kernel::prelude::*;
//!
//! let mut model = GeoModel::new();
//! let ss0 = Ssid::new(0);
//! let posis: Vec<EntIdx> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
//!     .iter()
//!     .map(|&xyz| {
//!         let posi = model.add_posi(ss0).unwrap();
//!         model.set_posi_coords(ss0, posi, xyz).unwrap();
//!         posi
//!     })
//!     .collect();
//! let pgon = model.add_pgon(ss0, &posis, &[], &FanTriangulator).unwrap();
//! assert_eq!(model.nav_any_to_posi(ss0, EntType::Pgon, pgon).unwrap(), posis);
//! ```

pub mod attribs;
pub mod kernel_error;
pub mod model;
pub mod topology;
pub mod triangulate;

/// Common imports for hosts of the kernel.
pub mod prelude {
    pub use crate::attribs::{AttribDataType, AttribValue, Vec3};
    pub use crate::kernel_error::KernelError;
    pub use crate::model::GeoModel;
    pub use crate::topology::{EntIdx, EntSets, EntType, Ssid};
    pub use crate::triangulate::{FanTriangulator, Triangulator};
}

pub use kernel_error::KernelError;
pub use model::GeoModel;
