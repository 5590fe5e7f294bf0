//! Structural queries that read the arena without navigating kinds.

use crate::kernel_error::KernelError;
use crate::model::GeoModel;
use crate::topology::ent::{EntIdx, EntType};

impl GeoModel {
    /// True when a row exists for `ent` of kind `ent_type`, in any
    /// snapshot. Existence is arena membership, not visibility.
    pub fn ent_exists(&self, ent_type: EntType, ent: EntIdx) -> bool {
        self.maps.contains(ent_type, ent)
    }

    /// The vertices of a wire in chain order. A closed wire repeats no
    /// vertex; an open wire ends on the final edge's end vertex.
    pub fn wire_verts(&self, wire: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        let edges = self
            .maps
            .dn_wires_edges
            .get(&wire)
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Wire,
                ent: wire,
            })?;
        let edge_verts = |edge: EntIdx| {
            self.maps
                .dn_edges_verts
                .get(&edge)
                .copied()
                .ok_or(KernelError::EntNotFound {
                    ent_type: EntType::Edge,
                    ent: edge,
                })
        };
        let mut verts = Vec::with_capacity(edges.len() + 1);
        for &edge in edges {
            verts.push(edge_verts(edge)?[0]);
        }
        if !self.is_wire_closed(wire)? {
            if let Some(&last) = edges.last() {
                verts.push(edge_verts(last)?[1]);
            }
        }
        Ok(verts)
    }

    /// True when the wire's last edge ends where its first edge starts.
    pub fn is_wire_closed(&self, wire: EntIdx) -> Result<bool, KernelError> {
        let edges = self
            .maps
            .dn_wires_edges
            .get(&wire)
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Wire,
                ent: wire,
            })?;
        let (Some(first), Some(last)) = (
            edges.first().and_then(|e| self.maps.dn_edges_verts.get(e)),
            edges.last().and_then(|e| self.maps.dn_edges_verts.get(e)),
        ) else {
            return Ok(false);
        };
        Ok(last[1] == first[0])
    }

    /// The object that owns a topological entity, walking up-adjacency.
    ///
    /// Object kinds own themselves. Returns `None` for a dangling
    /// handle or a topological entity with no owner (which only a
    /// corrupted arena can produce).
    pub fn topo_obj(&self, ent_type: EntType, ent: EntIdx) -> Option<(EntType, EntIdx)> {
        if !self.maps.contains(ent_type, ent) {
            return None;
        }
        match ent_type {
            EntType::Posi | EntType::Point | EntType::Pline | EntType::Pgon | EntType::Coll => {
                Some((ent_type, ent))
            }
            EntType::Vert => {
                if let Some(&point) = self.maps.up_verts_points.get(&ent) {
                    return Some((EntType::Point, point));
                }
                let edge = *self.maps.up_verts_edges.get(&ent)?.first()?;
                self.topo_obj(EntType::Edge, edge)
            }
            EntType::Edge => {
                let wire = *self.maps.up_edges_wires.get(&ent)?;
                self.topo_obj(EntType::Wire, wire)
            }
            EntType::Wire => {
                if let Some(&pline) = self.maps.up_wires_plines.get(&ent) {
                    return Some((EntType::Pline, pline));
                }
                self.maps
                    .up_wires_pgons
                    .get(&ent)
                    .map(|&pgon| (EntType::Pgon, pgon))
            }
            EntType::Tri => self
                .maps
                .up_tris_pgons
                .get(&ent)
                .map(|&pgon| (EntType::Pgon, pgon)),
        }
    }

    /// Number of edges incident on a vertex (0, 1, or 2).
    pub fn vertex_degree(&self, vert: EntIdx) -> usize {
        self.maps.vertex_degree(vert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::ent::Ssid;

    const SS0: Ssid = Ssid::new(0);

    fn line_posis(model: &mut GeoModel, n: u32) -> Vec<EntIdx> {
        (0..n)
            .map(|i| {
                let posi = model.add_posi(SS0).unwrap();
                model
                    .set_posi_coords(SS0, posi, [f64::from(i), 0.0, 0.0])
                    .unwrap();
                posi
            })
            .collect()
    }

    #[test]
    fn open_and_closed_wire_verts() {
        let mut model = GeoModel::new();
        let posis = line_posis(&mut model, 3);
        let open = model.add_pline(SS0, &posis, false).unwrap();
        let closed = model.add_pline(SS0, &posis, true).unwrap();

        let open_wire = model.nav_pline_to_wire(open).unwrap();
        assert!(!model.is_wire_closed(open_wire).unwrap());
        assert_eq!(model.wire_verts(open_wire).unwrap().len(), 3);

        let closed_wire = model.nav_pline_to_wire(closed).unwrap();
        assert!(model.is_wire_closed(closed_wire).unwrap());
        assert_eq!(model.wire_verts(closed_wire).unwrap().len(), 3);
    }

    #[test]
    fn topo_obj_walks_up_to_the_owner() {
        let mut model = GeoModel::new();
        let posis = line_posis(&mut model, 3);
        let pline = model.add_pline(SS0, &posis, false).unwrap();
        let wire = model.nav_pline_to_wire(pline).unwrap();
        let verts = model.wire_verts(wire).unwrap();
        assert_eq!(model.topo_obj(EntType::Vert, verts[1]), Some((EntType::Pline, pline)));
        assert_eq!(model.topo_obj(EntType::Wire, wire), Some((EntType::Pline, pline)));
        assert_eq!(model.topo_obj(EntType::Pline, pline), Some((EntType::Pline, pline)));
    }

    #[test]
    fn dangling_handles_have_no_owner() {
        let model = GeoModel::new();
        assert_eq!(model.topo_obj(EntType::Vert, EntIdx::new(9)), None);
    }
}
