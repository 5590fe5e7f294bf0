//! Navigation: traversing the adjacency tables between kinds.
//!
//! Pairwise hops mirror the tables directly (`nav_vert_to_posi` reads
//! one row). The `nav_any_to_*` family composes hops so a caller can
//! jump between any two kinds in one call; fan-out hops deduplicate
//! while preserving first-encounter order, so traversal results are
//! deterministic for a given arena.
//!
//! Downward hops need no snapshot id — constituents are intrinsic to
//! the entity. Upward hops from positions and every hop through
//! collections are snapshot-scoped, because "which vertices use this
//! position" and collection membership are visibility questions.

use itertools::Itertools;

use crate::kernel_error::KernelError;
use crate::model::GeoModel;
use crate::topology::ent::{EntIdx, EntType, Ssid};

impl GeoModel {
    // ------------------------------------------------------------------
    // Pairwise hops, down
    // ------------------------------------------------------------------

    /// The position a vertex stands on.
    pub fn nav_vert_to_posi(&self, vert: EntIdx) -> Result<EntIdx, KernelError> {
        self.maps
            .dn_verts_posis
            .get(&vert)
            .copied()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Vert,
                ent: vert,
            })
    }

    /// An edge's `[start, end]` vertices.
    pub fn nav_edge_to_verts(&self, edge: EntIdx) -> Result<[EntIdx; 2], KernelError> {
        self.maps
            .dn_edges_verts
            .get(&edge)
            .copied()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Edge,
                ent: edge,
            })
    }

    /// A wire's edges in chain order.
    pub fn nav_wire_to_edges(&self, wire: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        self.maps
            .dn_wires_edges
            .get(&wire)
            .cloned()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Wire,
                ent: wire,
            })
    }

    /// A triangle's three vertices.
    pub fn nav_tri_to_verts(&self, tri: EntIdx) -> Result<[EntIdx; 3], KernelError> {
        self.maps
            .dn_tris_verts
            .get(&tri)
            .copied()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Tri,
                ent: tri,
            })
    }

    /// A point's single vertex.
    pub fn nav_point_to_vert(&self, point: EntIdx) -> Result<EntIdx, KernelError> {
        self.maps
            .dn_points_verts
            .get(&point)
            .copied()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Point,
                ent: point,
            })
    }

    /// A polyline's single wire.
    pub fn nav_pline_to_wire(&self, pline: EntIdx) -> Result<EntIdx, KernelError> {
        self.maps
            .dn_plines_wires
            .get(&pline)
            .copied()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Pline,
                ent: pline,
            })
    }

    /// A polygon's wires, outer first.
    pub fn nav_pgon_to_wire(&self, pgon: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        self.maps
            .dn_pgons_wires
            .get(&pgon)
            .cloned()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Pgon,
                ent: pgon,
            })
    }

    /// A polygon's cached triangles.
    pub fn nav_pgon_to_tri(&self, pgon: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        self.maps
            .dn_pgons_tris
            .get(&pgon)
            .cloned()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Pgon,
                ent: pgon,
            })
    }

    // ------------------------------------------------------------------
    // Pairwise hops, up
    // ------------------------------------------------------------------

    /// The vertices standing on a position that are visible under
    /// `ssid`.
    pub fn nav_posi_to_vert(&self, ssid: Ssid, posi: EntIdx) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ssid(ssid)?;
        let verts = self
            .maps
            .up_posis_verts
            .get(&posi)
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Posi,
                ent: posi,
            })?;
        Ok(verts
            .iter()
            .copied()
            .filter(|&vert| self.has_ent(ssid, EntType::Vert, vert))
            .collect())
    }

    /// A vertex's incident edges, `[incoming, outgoing]`.
    pub fn nav_vert_to_edges(&self, vert: EntIdx) -> Vec<EntIdx> {
        self.maps
            .up_verts_edges
            .get(&vert)
            .cloned()
            .unwrap_or_default()
    }

    /// The wire an edge belongs to.
    pub fn nav_edge_to_wire(&self, edge: EntIdx) -> Option<EntIdx> {
        self.maps.up_edges_wires.get(&edge).copied()
    }

    /// The point wrapping a vertex, when the vertex belongs to one.
    pub fn nav_vert_to_point(&self, vert: EntIdx) -> Option<EntIdx> {
        self.maps.up_verts_points.get(&vert).copied()
    }

    /// The polyline wrapping a wire, when the wire belongs to one.
    pub fn nav_wire_to_pline(&self, wire: EntIdx) -> Option<EntIdx> {
        self.maps.up_wires_plines.get(&wire).copied()
    }

    /// The polygon owning a wire, when the wire belongs to one.
    pub fn nav_wire_to_pgon(&self, wire: EntIdx) -> Option<EntIdx> {
        self.maps.up_wires_pgons.get(&wire).copied()
    }

    /// The polygon owning a triangle.
    pub fn nav_tri_to_pgon(&self, tri: EntIdx) -> Option<EntIdx> {
        self.maps.up_tris_pgons.get(&tri).copied()
    }

    // ------------------------------------------------------------------
    // Collection hops
    // ------------------------------------------------------------------

    /// The object members of a collection and all its descendants.
    pub fn nav_coll_to_members(
        &self,
        ssid: Ssid,
        coll: EntIdx,
        member_type: EntType,
    ) -> Result<Vec<EntIdx>, KernelError> {
        let mut members = self.attribs.coll_ents(ssid, coll, member_type)?;
        for child in self.attribs.coll_descendents(ssid, coll)? {
            members.extend(self.attribs.coll_ents(ssid, child, member_type)?);
        }
        Ok(members.into_iter().unique().collect())
    }

    /// Every collection containing an object, directly.
    pub fn nav_obj_to_colls(
        &self,
        ssid: Ssid,
        member_type: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.attribs.ent_colls(ssid, member_type, ent)
    }

    // ------------------------------------------------------------------
    // Any-to-kind traversals
    // ------------------------------------------------------------------

    /// All positions under an entity of any kind.
    pub fn nav_any_to_posi(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let posis = match from {
            EntType::Posi => vec![ent],
            EntType::Vert => vec![self.nav_vert_to_posi(ent)?],
            EntType::Tri => self
                .nav_tri_to_verts(ent)?
                .iter()
                .map(|&vert| self.nav_vert_to_posi(vert))
                .collect::<Result<_, _>>()?,
            EntType::Edge => self
                .nav_edge_to_verts(ent)?
                .iter()
                .map(|&vert| self.nav_vert_to_posi(vert))
                .collect::<Result<_, _>>()?,
            EntType::Wire | EntType::Point | EntType::Pline | EntType::Pgon | EntType::Coll => {
                let mut posis = Vec::new();
                for vert in self.nav_any_to_vert(ssid, from, ent)? {
                    posis.push(self.nav_vert_to_posi(vert)?);
                }
                posis
            }
        };
        Ok(posis.into_iter().unique().collect())
    }

    /// All vertices under an entity of any kind (for positions: the
    /// visible vertices above it).
    pub fn nav_any_to_vert(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let verts = match from {
            EntType::Posi => self.nav_posi_to_vert(ssid, ent)?,
            EntType::Vert => vec![ent],
            EntType::Tri => self.nav_tri_to_verts(ent)?.to_vec(),
            EntType::Edge => self.nav_edge_to_verts(ent)?.to_vec(),
            EntType::Wire => self.wire_verts(ent)?,
            EntType::Point => vec![self.nav_point_to_vert(ent)?],
            EntType::Pline => self.wire_verts(self.nav_pline_to_wire(ent)?)?,
            EntType::Pgon => {
                let mut verts = Vec::new();
                for wire in self.nav_pgon_to_wire(ent)? {
                    verts.extend(self.wire_verts(wire)?);
                }
                verts
            }
            EntType::Coll => self.coll_fan_out(ssid, ent, |model, kind, member| {
                model.nav_any_to_vert(ssid, kind, member)
            })?,
        };
        Ok(verts.into_iter().unique().collect())
    }

    /// All edges under an entity of any kind. Points and triangles have
    /// none.
    pub fn nav_any_to_edge(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let edges = match from {
            EntType::Posi => {
                let mut edges = Vec::new();
                for vert in self.nav_posi_to_vert(ssid, ent)? {
                    edges.extend(self.nav_vert_to_edges(vert));
                }
                edges
            }
            EntType::Vert => self.nav_vert_to_edges(ent),
            EntType::Tri | EntType::Point => Vec::new(),
            EntType::Edge => vec![ent],
            EntType::Wire => self.nav_wire_to_edges(ent)?,
            EntType::Pline => self.nav_wire_to_edges(self.nav_pline_to_wire(ent)?)?,
            EntType::Pgon => {
                let mut edges = Vec::new();
                for wire in self.nav_pgon_to_wire(ent)? {
                    edges.extend(self.nav_wire_to_edges(wire)?);
                }
                edges
            }
            EntType::Coll => self.coll_fan_out(ssid, ent, |model, kind, member| {
                model.nav_any_to_edge(ssid, kind, member)
            })?,
        };
        Ok(edges.into_iter().unique().collect())
    }

    /// All wires under an entity of any kind.
    pub fn nav_any_to_wire(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let wires = match from {
            EntType::Posi => {
                let mut wires = Vec::new();
                for vert in self.nav_posi_to_vert(ssid, ent)? {
                    wires.extend(self.vert_wire(vert));
                }
                wires
            }
            EntType::Vert => self.vert_wire(ent).into_iter().collect(),
            EntType::Tri => match self.nav_tri_to_pgon(ent) {
                Some(pgon) => self.nav_pgon_to_wire(pgon)?,
                None => Vec::new(),
            },
            EntType::Edge => self.nav_edge_to_wire(ent).into_iter().collect(),
            EntType::Wire => vec![ent],
            EntType::Point => Vec::new(),
            EntType::Pline => vec![self.nav_pline_to_wire(ent)?],
            EntType::Pgon => self.nav_pgon_to_wire(ent)?,
            EntType::Coll => self.coll_fan_out(ssid, ent, |model, kind, member| {
                model.nav_any_to_wire(ssid, kind, member)
            })?,
        };
        Ok(wires.into_iter().unique().collect())
    }

    /// All triangles under an entity of any kind. Only polygons (and
    /// what reaches them) have any.
    pub fn nav_any_to_tri(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let tris = match from {
            EntType::Posi => {
                let mut tris = Vec::new();
                for vert in self.nav_posi_to_vert(ssid, ent)? {
                    tris.extend(
                        self.maps
                            .up_verts_tris
                            .get(&vert)
                            .cloned()
                            .unwrap_or_default(),
                    );
                }
                tris
            }
            EntType::Vert => self
                .maps
                .up_verts_tris
                .get(&ent)
                .cloned()
                .unwrap_or_default(),
            EntType::Tri => vec![ent],
            EntType::Edge | EntType::Point | EntType::Pline => Vec::new(),
            EntType::Wire => match self.nav_wire_to_pgon(ent) {
                Some(pgon) => self.nav_pgon_to_tri(pgon)?,
                None => Vec::new(),
            },
            EntType::Pgon => self.nav_pgon_to_tri(ent)?,
            EntType::Coll => self.coll_fan_out(ssid, ent, |model, kind, member| {
                model.nav_any_to_tri(ssid, kind, member)
            })?,
        };
        Ok(tris.into_iter().unique().collect())
    }

    /// All points reachable from an entity of any kind.
    pub fn nav_any_to_point(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let points = match from {
            EntType::Posi => {
                let mut points = Vec::new();
                for vert in self.nav_posi_to_vert(ssid, ent)? {
                    points.extend(self.nav_vert_to_point(vert));
                }
                points
            }
            EntType::Vert => self.nav_vert_to_point(ent).into_iter().collect(),
            EntType::Point => vec![ent],
            EntType::Tri | EntType::Edge | EntType::Wire | EntType::Pline | EntType::Pgon => {
                Vec::new()
            }
            EntType::Coll => self.nav_coll_to_members(ssid, ent, EntType::Point)?,
        };
        Ok(points.into_iter().unique().collect())
    }

    /// All polylines reachable from an entity of any kind.
    pub fn nav_any_to_pline(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let plines = match from {
            EntType::Posi | EntType::Vert | EntType::Edge | EntType::Wire => self
                .nav_any_to_wire(ssid, from, ent)?
                .into_iter()
                .filter_map(|wire| self.nav_wire_to_pline(wire))
                .collect(),
            EntType::Pline => vec![ent],
            EntType::Tri | EntType::Point | EntType::Pgon => Vec::new(),
            EntType::Coll => self.nav_coll_to_members(ssid, ent, EntType::Pline)?,
        };
        Ok(plines.into_iter().unique().collect())
    }

    /// All polygons reachable from an entity of any kind.
    pub fn nav_any_to_pgon(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let pgons = match from {
            EntType::Posi | EntType::Vert | EntType::Edge | EntType::Wire => self
                .nav_any_to_wire(ssid, from, ent)?
                .into_iter()
                .filter_map(|wire| self.nav_wire_to_pgon(wire))
                .collect(),
            EntType::Tri => self.nav_tri_to_pgon(ent).into_iter().collect(),
            EntType::Pgon => vec![ent],
            EntType::Point | EntType::Pline => Vec::new(),
            EntType::Coll => self.nav_coll_to_members(ssid, ent, EntType::Pgon)?,
        };
        Ok(pgons.into_iter().unique().collect())
    }

    /// All collections containing an entity of any kind: for objects,
    /// direct membership; for positions and topology, membership of any
    /// owning object; for collections, the direct children.
    pub fn nav_any_to_coll(
        &self,
        ssid: Ssid,
        from: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        self.require_ent(from, ent)?;
        let mut colls = match from {
            EntType::Coll => self.attribs.coll_children(ssid, ent)?,
            EntType::Point | EntType::Pline | EntType::Pgon => {
                self.attribs.ent_colls(ssid, from, ent)?
            }
            EntType::Posi | EntType::Vert | EntType::Tri | EntType::Edge | EntType::Wire => {
                let mut colls = Vec::new();
                for member_type in [EntType::Point, EntType::Pline, EntType::Pgon] {
                    let owners = match member_type {
                        EntType::Point => self.nav_any_to_point(ssid, from, ent)?,
                        EntType::Pline => self.nav_any_to_pline(ssid, from, ent)?,
                        _ => self.nav_any_to_pgon(ssid, from, ent)?,
                    };
                    for owner in owners {
                        colls.extend(self.attribs.ent_colls(ssid, member_type, owner)?);
                    }
                }
                colls
            }
        };
        colls = colls.into_iter().unique().collect();
        colls.sort_unstable();
        Ok(colls)
    }

    /// Navigate from any kind to any kind.
    ///
    /// Same-kind navigation is the identity, except `Coll` → `Coll`,
    /// which returns the direct children.
    pub fn nav_any_to_any(
        &self,
        ssid: Ssid,
        from: EntType,
        to: EntType,
        ent: EntIdx,
    ) -> Result<Vec<EntIdx>, KernelError> {
        if from == to && from != EntType::Coll {
            self.require_ent(from, ent)?;
            return Ok(vec![ent]);
        }
        match to {
            EntType::Posi => self.nav_any_to_posi(ssid, from, ent),
            EntType::Vert => self.nav_any_to_vert(ssid, from, ent),
            EntType::Tri => self.nav_any_to_tri(ssid, from, ent),
            EntType::Edge => self.nav_any_to_edge(ssid, from, ent),
            EntType::Wire => self.nav_any_to_wire(ssid, from, ent),
            EntType::Point => self.nav_any_to_point(ssid, from, ent),
            EntType::Pline => self.nav_any_to_pline(ssid, from, ent),
            EntType::Pgon => self.nav_any_to_pgon(ssid, from, ent),
            EntType::Coll => self.nav_any_to_coll(ssid, from, ent),
        }
    }

    // ------------------------------------------------------------------

    /// The wire a vertex's edges belong to, if any.
    fn vert_wire(&self, vert: EntIdx) -> Option<EntIdx> {
        let edge = *self.maps.up_verts_edges.get(&vert)?.first()?;
        self.nav_edge_to_wire(edge)
    }

    /// Fan a traversal out over a collection's members (including
    /// descendants' members) and flatten the results.
    fn coll_fan_out(
        &self,
        ssid: Ssid,
        coll: EntIdx,
        hop: impl Fn(&Self, EntType, EntIdx) -> Result<Vec<EntIdx>, KernelError>,
    ) -> Result<Vec<EntIdx>, KernelError> {
        let mut out = Vec::new();
        for member_type in [EntType::Point, EntType::Pline, EntType::Pgon] {
            for member in self.nav_coll_to_members(ssid, coll, member_type)? {
                out.extend(hop(self, member_type, member)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulate::FanTriangulator;

    const SS0: Ssid = Ssid::new(0);

    fn posi_at(model: &mut GeoModel, xyz: [f64; 3]) -> EntIdx {
        let posi = model.add_posi(SS0).unwrap();
        model.set_posi_coords(SS0, posi, xyz).unwrap();
        posi
    }

    fn triangle_pgon(model: &mut GeoModel) -> (Vec<EntIdx>, EntIdx) {
        let posis: Vec<EntIdx> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .map(|&xyz| posi_at(model, xyz))
            .collect();
        let pgon = model.add_pgon(SS0, &posis, &[], &FanTriangulator).unwrap();
        (posis, pgon)
    }

    #[test]
    fn pgon_down_traversals() {
        let mut model = GeoModel::new();
        let (posis, pgon) = triangle_pgon(&mut model);
        assert_eq!(
            model.nav_any_to_posi(SS0, EntType::Pgon, pgon).unwrap(),
            posis
        );
        assert_eq!(model.nav_any_to_edge(SS0, EntType::Pgon, pgon).unwrap().len(), 3);
        assert_eq!(model.nav_any_to_tri(SS0, EntType::Pgon, pgon).unwrap().len(), 1);
        assert_eq!(model.nav_any_to_wire(SS0, EntType::Pgon, pgon).unwrap().len(), 1);
    }

    #[test]
    fn posi_up_traversal_reaches_the_pgon() {
        let mut model = GeoModel::new();
        let (posis, pgon) = triangle_pgon(&mut model);
        assert_eq!(
            model.nav_any_to_pgon(SS0, EntType::Posi, posis[0]).unwrap(),
            vec![pgon]
        );
        assert_eq!(model.nav_any_to_pline(SS0, EntType::Posi, posis[0]).unwrap(), vec![]);
    }

    #[test]
    fn same_kind_navigation_is_identity_except_colls() {
        let mut model = GeoModel::new();
        let (_, pgon) = triangle_pgon(&mut model);
        assert_eq!(
            model.nav_any_to_any(SS0, EntType::Pgon, EntType::Pgon, pgon).unwrap(),
            vec![pgon]
        );
        let parent = model.add_coll(SS0).unwrap();
        let child = model.add_coll(SS0).unwrap();
        model.set_coll_parent(SS0, child, Some(parent)).unwrap();
        assert_eq!(
            model.nav_any_to_any(SS0, EntType::Coll, EntType::Coll, parent).unwrap(),
            vec![child]
        );
    }

    #[test]
    fn coll_traversal_includes_descendant_members() {
        let mut model = GeoModel::new();
        let (_, pgon) = triangle_pgon(&mut model);
        let parent = model.add_coll(SS0).unwrap();
        let child = model.add_coll(SS0).unwrap();
        model.set_coll_parent(SS0, child, Some(parent)).unwrap();
        model.add_coll_ents(SS0, child, EntType::Pgon, &[pgon]).unwrap();
        assert_eq!(
            model.nav_any_to_pgon(SS0, EntType::Coll, parent).unwrap(),
            vec![pgon]
        );
        assert_eq!(
            model.nav_any_to_coll(SS0, EntType::Pgon, pgon).unwrap(),
            vec![child]
        );
    }

    #[test]
    fn shared_posi_fans_out_to_both_objects() {
        let mut model = GeoModel::new();
        let shared = posi_at(&mut model, [0.0; 3]);
        let p1 = posi_at(&mut model, [1.0, 0.0, 0.0]);
        let p2 = posi_at(&mut model, [0.0, 1.0, 0.0]);
        let pline = model.add_pline(SS0, &[shared, p1], false).unwrap();
        let point = model.add_point(SS0, shared).unwrap();
        let pgon = model
            .add_pgon(SS0, &[shared, p1, p2], &[], &FanTriangulator)
            .unwrap();
        assert_eq!(model.nav_any_to_pline(SS0, EntType::Posi, shared).unwrap(), vec![pline]);
        assert_eq!(model.nav_any_to_point(SS0, EntType::Posi, shared).unwrap(), vec![point]);
        assert_eq!(model.nav_any_to_pgon(SS0, EntType::Posi, shared).unwrap(), vec![pgon]);
        assert_eq!(model.nav_posi_to_vert(SS0, shared).unwrap().len(), 3);
    }
}
