//! `GeomMaps`: the entity arena's up/down adjacency tables.
//!
//! Each table maps a handle to its constituent children (down) or its
//! owning parent(s) (up). Tables are keyed by handle rather than holding
//! object references so that snapshots can share entity data by index,
//! the whole arena serializes directly, and the consistency scan can
//! cross-check both directions. Rows are appended by the builder and
//! removed only by a purge; deletion is a visibility change elsewhere.
//!
//! The only validated invariant at this level is the two-edges-per-vertex
//! rule: a vertex participates in at most one incoming and one outgoing
//! edge, because the model supports open/closed chains and loops, never
//! branching graphs at the vertex level.

use std::collections::{HashMap, HashSet};

use crate::kernel_error::KernelError;
use crate::topology::ent::{EntIdx, EntType};

/// Up/down adjacency tables for every kind.
///
/// Down tables reference constituents; up tables reference owners. Kinds
/// with a 1:1 up-link (`Vert`→`Point`, `Edge`→`Wire`, `Wire`→`Pline`,
/// `Wire`→`Pgon`, `Tri`→`Pgon`) store a single handle; 1:many up-links
/// (`Posi`→`Vert`, `Vert`→`Edge`, `Vert`→`Tri`) store ordered lists.
/// Collections have no adjacency: their membership lives in the
/// attribute store, so the arena only tracks their allocation.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct GeomMaps {
    // down
    pub(crate) dn_verts_posis: HashMap<EntIdx, EntIdx>,
    pub(crate) dn_tris_verts: HashMap<EntIdx, [EntIdx; 3]>,
    pub(crate) dn_edges_verts: HashMap<EntIdx, [EntIdx; 2]>,
    pub(crate) dn_wires_edges: HashMap<EntIdx, Vec<EntIdx>>,
    pub(crate) dn_points_verts: HashMap<EntIdx, EntIdx>,
    pub(crate) dn_plines_wires: HashMap<EntIdx, EntIdx>,
    pub(crate) dn_pgons_wires: HashMap<EntIdx, Vec<EntIdx>>,
    pub(crate) dn_pgons_tris: HashMap<EntIdx, Vec<EntIdx>>,
    // up
    pub(crate) up_posis_verts: HashMap<EntIdx, Vec<EntIdx>>,
    /// `[incoming, outgoing]`; length 1 when the vertex ends a chain.
    pub(crate) up_verts_edges: HashMap<EntIdx, Vec<EntIdx>>,
    pub(crate) up_verts_tris: HashMap<EntIdx, Vec<EntIdx>>,
    pub(crate) up_verts_points: HashMap<EntIdx, EntIdx>,
    pub(crate) up_edges_wires: HashMap<EntIdx, EntIdx>,
    pub(crate) up_wires_plines: HashMap<EntIdx, EntIdx>,
    pub(crate) up_wires_pgons: HashMap<EntIdx, EntIdx>,
    pub(crate) up_tris_pgons: HashMap<EntIdx, EntIdx>,
    // colls
    pub(crate) colls: HashSet<EntIdx>,
}

impl GeomMaps {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a row exists for `ent` of kind `ent_type`.
    ///
    /// Existence is judged against the kind's primary table: the up
    /// table for positions (the bottom of the hierarchy has no down
    /// table), the down table for everything else, and the allocation
    /// set for collections.
    pub fn contains(&self, ent_type: EntType, ent: EntIdx) -> bool {
        match ent_type {
            EntType::Posi => self.up_posis_verts.contains_key(&ent),
            EntType::Vert => self.dn_verts_posis.contains_key(&ent),
            EntType::Tri => self.dn_tris_verts.contains_key(&ent),
            EntType::Edge => self.dn_edges_verts.contains_key(&ent),
            EntType::Wire => self.dn_wires_edges.contains_key(&ent),
            EntType::Point => self.dn_points_verts.contains_key(&ent),
            EntType::Pline => self.dn_plines_wires.contains_key(&ent),
            EntType::Pgon => self.dn_pgons_wires.contains_key(&ent),
            EntType::Coll => self.colls.contains(&ent),
        }
    }

    /// Number of rows stored for `ent_type`.
    pub fn num_rows(&self, ent_type: EntType) -> usize {
        match ent_type {
            EntType::Posi => self.up_posis_verts.len(),
            EntType::Vert => self.dn_verts_posis.len(),
            EntType::Tri => self.dn_tris_verts.len(),
            EntType::Edge => self.dn_edges_verts.len(),
            EntType::Wire => self.dn_wires_edges.len(),
            EntType::Point => self.dn_points_verts.len(),
            EntType::Pline => self.dn_plines_wires.len(),
            EntType::Pgon => self.dn_pgons_wires.len(),
            EntType::Coll => self.colls.len(),
        }
    }

    /// Number of edges currently incident on `vert` (0, 1, or 2).
    pub fn vertex_degree(&self, vert: EntIdx) -> usize {
        self.up_verts_edges.get(&vert).map_or(0, Vec::len)
    }

    // ------------------------------------------------------------------
    // Row insertion (called by the builder; handles come from the model
    // counters and are assumed fresh)
    // ------------------------------------------------------------------

    /// Register a new position with an empty vertex up-list.
    pub(crate) fn add_posi_row(&mut self, posi: EntIdx) {
        self.up_posis_verts.insert(posi, Vec::new());
    }

    /// Register a new vertex bound to `posi`.
    pub(crate) fn add_vert_row(&mut self, vert: EntIdx, posi: EntIdx) -> Result<(), KernelError> {
        let up = self
            .up_posis_verts
            .get_mut(&posi)
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Posi,
                ent: posi,
            })?;
        up.push(vert);
        self.dn_verts_posis.insert(vert, posi);
        Ok(())
    }

    /// Register a new edge from `v1` to `v2`, enforcing the two-edge
    /// invariant on both endpoints.
    ///
    /// The up-list of each vertex is kept ordered `[incoming, outgoing]`:
    /// the new edge is outgoing for `v1` (appended) and incoming for `v2`
    /// (prepended).
    pub(crate) fn add_edge_row(
        &mut self,
        edge: EntIdx,
        v1: EntIdx,
        v2: EntIdx,
    ) -> Result<(), KernelError> {
        if self.vertex_degree(v1) >= 2 {
            return Err(KernelError::VertexEdgeOverflow { vert: v1 });
        }
        if self.vertex_degree(v2) >= 2 {
            return Err(KernelError::VertexEdgeOverflow { vert: v2 });
        }
        self.dn_edges_verts.insert(edge, [v1, v2]);
        self.up_verts_edges.entry(v1).or_default().push(edge);
        self.up_verts_edges.entry(v2).or_default().insert(0, edge);
        Ok(())
    }

    /// Register a new wire over an ordered edge chain.
    pub(crate) fn add_wire_row(&mut self, wire: EntIdx, edges: Vec<EntIdx>) {
        for &edge in &edges {
            self.up_edges_wires.insert(edge, wire);
        }
        self.dn_wires_edges.insert(wire, edges);
    }

    /// Register a new triangle over three vertices.
    pub(crate) fn add_tri_row(&mut self, tri: EntIdx, verts: [EntIdx; 3]) {
        for &vert in &verts {
            self.up_verts_tris.entry(vert).or_default().push(tri);
        }
        self.dn_tris_verts.insert(tri, verts);
    }

    /// Register a new point wrapping `vert`.
    pub(crate) fn add_point_row(&mut self, point: EntIdx, vert: EntIdx) {
        self.dn_points_verts.insert(point, vert);
        self.up_verts_points.insert(vert, point);
    }

    /// Register a new polyline wrapping `wire`.
    pub(crate) fn add_pline_row(&mut self, pline: EntIdx, wire: EntIdx) {
        self.dn_plines_wires.insert(pline, wire);
        self.up_wires_plines.insert(wire, pline);
    }

    /// Register a new polygon over its wires (outer first, then holes)
    /// and cached triangles.
    pub(crate) fn add_pgon_row(&mut self, pgon: EntIdx, wires: Vec<EntIdx>, tris: Vec<EntIdx>) {
        for &wire in &wires {
            self.up_wires_pgons.insert(wire, pgon);
        }
        for &tri in &tris {
            self.up_tris_pgons.insert(tri, pgon);
        }
        self.dn_pgons_wires.insert(pgon, wires);
        self.dn_pgons_tris.insert(pgon, tris);
    }

    /// Register a new collection.
    pub(crate) fn add_coll_row(&mut self, coll: EntIdx) {
        self.colls.insert(coll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u32) -> EntIdx {
        EntIdx::new(i)
    }

    fn maps_with_verts(n: u32) -> GeomMaps {
        let mut maps = GeomMaps::new();
        for i in 0..n {
            maps.add_posi_row(e(i));
            maps.add_vert_row(e(i), e(i)).unwrap();
        }
        maps
    }

    #[test]
    fn third_edge_on_a_vertex_fails() {
        let mut maps = maps_with_verts(4);
        maps.add_edge_row(e(0), e(0), e(1)).unwrap();
        maps.add_edge_row(e(1), e(1), e(2)).unwrap();
        // vertex 1 now has an incoming and an outgoing edge
        let err = maps.add_edge_row(e(2), e(1), e(3)).unwrap_err();
        assert_eq!(err, KernelError::VertexEdgeOverflow { vert: e(1) });
    }

    #[test]
    fn edge_up_lists_are_incoming_then_outgoing() {
        let mut maps = maps_with_verts(3);
        maps.add_edge_row(e(0), e(0), e(1)).unwrap();
        maps.add_edge_row(e(1), e(1), e(2)).unwrap();
        assert_eq!(maps.up_verts_edges[&e(1)], vec![e(0), e(1)]);
        assert_eq!(maps.vertex_degree(e(1)), 2);
        assert_eq!(maps.vertex_degree(e(0)), 1);
    }

    #[test]
    fn vert_row_needs_its_position() {
        let mut maps = GeomMaps::new();
        let err = maps.add_vert_row(e(0), e(9)).unwrap_err();
        assert!(matches!(err, KernelError::EntNotFound { ent_type: EntType::Posi, .. }));
    }

    #[test]
    fn wire_row_links_both_directions() {
        let mut maps = maps_with_verts(3);
        maps.add_edge_row(e(0), e(0), e(1)).unwrap();
        maps.add_edge_row(e(1), e(1), e(2)).unwrap();
        maps.add_wire_row(e(0), vec![e(0), e(1)]);
        assert_eq!(maps.up_edges_wires[&e(1)], e(0));
        assert_eq!(maps.dn_wires_edges[&e(0)], vec![e(0), e(1)]);
        assert!(maps.contains(EntType::Wire, e(0)));
    }
}
