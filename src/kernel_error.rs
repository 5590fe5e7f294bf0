//! `KernelError`: unified error type for geo-kernel public APIs.
//!
//! Errors here are *invariant violations* — they indicate a caller bug
//! (a dangling handle, a third edge on a vertex, a reference to a
//! snapshot that was never created), not an expected runtime condition.
//! Absence conditions (an unset attribute, a navigation with zero
//! results, a position with no remaining vertices) are represented as
//! `Option`/empty collections, never as errors.

use thiserror::Error;

use crate::attribs::value::AttribDataType;
use crate::topology::ent::{EntIdx, EntType, Ssid};

/// Unified error type for geo-kernel operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    /// A vertex already carries an incoming and an outgoing edge; wiring a
    /// third is a topology violation (only open/closed chains are modeled).
    #[error("vertex {vert} already has two incident edges")]
    VertexEdgeOverflow {
        /// The vertex that would exceed the two-edge limit.
        vert: EntIdx,
    },
    /// A handle was passed for an entity that has no row in the arena.
    #[error("{ent_type} {ent} does not exist in the geometry maps")]
    EntNotFound {
        /// Kind of the missing entity.
        ent_type: EntType,
        /// The dangling handle.
        ent: EntIdx,
    },
    /// A snapshot id was referenced before `ss_init` created it.
    #[error("snapshot {0} does not exist")]
    SsidNotFound(Ssid),
    /// A polyline or polygon loop was given too few positions.
    #[error("too few positions for {ent_type}: {found} given, at least {min} required")]
    TooFewPositions {
        /// Kind being constructed (`Pline` or `Pgon`).
        ent_type: EntType,
        /// Number of positions supplied.
        found: usize,
        /// Minimum required for this construction.
        min: usize,
    },
    /// A value of the wrong type was written into a typed attribute column.
    #[error("attribute `{name}` on {ent_type} holds {expected} values, got {found}")]
    AttribTypeMismatch {
        /// Kind the column is attached to.
        ent_type: EntType,
        /// Attribute name.
        name: String,
        /// Declared column type.
        expected: AttribDataType,
        /// Type of the rejected value.
        found: AttribDataType,
    },
    /// Only the five object kinds have snapshot visibility sets.
    #[error("{ent_type} entities have no snapshot visibility set")]
    NotAnObjectKind {
        /// The purely topological kind that was passed.
        ent_type: EntType,
    },
    /// Re-parenting a collection under itself or one of its descendants.
    #[error("collection {coll} cannot be parented under {parent}: would create a cycle")]
    CollCycle {
        /// Collection being re-parented.
        coll: EntIdx,
        /// The rejected parent.
        parent: EntIdx,
    },
    /// A position is missing its `xyz` coordinate attribute.
    #[error("position {posi} has no coordinate attribute")]
    MissingCoord {
        /// The coordinate-less position.
        posi: EntIdx,
    },
    /// The external triangulator returned an index outside the loops it
    /// was given.
    #[error("triangulator returned corner index {found}, but only {len} loop vertices exist")]
    TriangulatorIndex {
        /// The out-of-range index.
        found: usize,
        /// Total number of loop vertices passed to the triangulator.
        len: usize,
    },
    /// The serialized model document could not be produced or parsed.
    #[error("model document malformed: {0}")]
    Document(String),
}
