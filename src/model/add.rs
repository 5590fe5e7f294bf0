//! Builder operations: creating and copying entities.
//!
//! All construction happens bottom-up through the arena's row
//! inserters. Every public operation takes the snapshot id the new
//! object becomes visible under; the purely topological entities it
//! creates along the way (vertices, edges, wires, triangles) have no
//! visibility of their own. Object creation stamps the builtin `_ts`
//! attribute with the creating snapshot id.
//!
//! Copies share positions with their source unless stated otherwise:
//! copying a polyline makes new vertices/edges/wires over the *same*
//! positions, which is what makes "move the copy" a per-position
//! attribute edit rather than a topology change.

use crate::attribs::value::Vec3;
use crate::attribs::ATTR_TIMESTAMP;
use crate::kernel_error::KernelError;
use crate::model::GeoModel;
use crate::topology::ent::{EntIdx, EntType, Ssid};
use crate::triangulate::Triangulator;

impl GeoModel {
    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a new position, visible under `ssid`. No coordinate is
    /// attached; callers write the `xyz` attribute separately
    /// ([`GeoModel::set_posi_coords`]).
    pub fn add_posi(&mut self, ssid: Ssid) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let posi = self.counters.next(EntType::Posi);
        self.maps.add_posi_row(posi);
        self.ss_register(ssid, EntType::Posi, posi)?;
        Ok(posi)
    }

    /// Create a new point wrapping `posi`, visible under `ssid`.
    pub fn add_point(&mut self, ssid: Ssid, posi: EntIdx) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        self.require_ent(EntType::Posi, posi)?;
        let vert = self.add_vert(posi)?;
        let point = self.counters.next(EntType::Point);
        self.maps.add_point_row(point, vert);
        self.ss_register(ssid, EntType::Point, point)?;
        self.attribs.set_ts(ssid, EntType::Point, point)?;
        Ok(point)
    }

    /// Create a new polyline over `posis`, visible under `ssid`.
    ///
    /// An open polyline needs at least 2 positions, a closed one at
    /// least 3.
    ///
    /// # Errors
    /// `TooFewPositions` when the chain is too short.
    pub fn add_pline(
        &mut self,
        ssid: Ssid,
        posis: &[EntIdx],
        closed: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let min = if closed { 3 } else { 2 };
        if posis.len() < min {
            return Err(KernelError::TooFewPositions {
                ent_type: EntType::Pline,
                found: posis.len(),
                min,
            });
        }
        for &posi in posis {
            self.require_ent(EntType::Posi, posi)?;
        }
        let (wire, _verts) = self.add_wire_over(posis, closed)?;
        let pline = self.counters.next(EntType::Pline);
        self.maps.add_pline_row(pline, wire);
        self.ss_register(ssid, EntType::Pline, pline)?;
        self.attribs.set_ts(ssid, EntType::Pline, pline)?;
        Ok(pline)
    }

    /// Create a new polygon from an outer loop and hole loops, visible
    /// under `ssid`.
    ///
    /// Each loop becomes a closed wire over fresh vertices; the
    /// triangulator is handed the loop coordinates and its triangles
    /// are cached as `Tri` entities. Every loop needs at least 3
    /// positions.
    ///
    /// # Errors
    /// `TooFewPositions` for a short loop, `MissingCoord` when a
    /// position has no coordinate, `TriangulatorIndex` when the
    /// triangulator references a corner outside the loops.
    pub fn add_pgon(
        &mut self,
        ssid: Ssid,
        outer: &[EntIdx],
        holes: &[Vec<EntIdx>],
        triangulator: &dyn Triangulator,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        for loop_posis in std::iter::once(outer).chain(holes.iter().map(Vec::as_slice)) {
            if loop_posis.len() < 3 {
                return Err(KernelError::TooFewPositions {
                    ent_type: EntType::Pgon,
                    found: loop_posis.len(),
                    min: 3,
                });
            }
            for &posi in loop_posis {
                self.require_ent(EntType::Posi, posi)?;
            }
        }
        // loop coordinates first: a coordinate-less position must fail
        // before any rows are inserted
        let outer_coords = self.loop_coords(ssid, outer)?;
        let hole_coords = holes
            .iter()
            .map(|hole| self.loop_coords(ssid, hole))
            .collect::<Result<Vec<_>, _>>()?;

        let mut wires = Vec::with_capacity(1 + holes.len());
        let mut all_verts: Vec<EntIdx> = Vec::new();
        for loop_posis in std::iter::once(outer).chain(holes.iter().map(Vec::as_slice)) {
            let (wire, verts) = self.add_wire_over(loop_posis, true)?;
            wires.push(wire);
            all_verts.extend(verts);
        }

        let corners = triangulator.triangulate(&outer_coords, &hole_coords);
        let mut tris = Vec::with_capacity(corners.len());
        for corner in corners {
            let verts = self.tri_verts(&all_verts, corner)?;
            let tri = self.counters.next(EntType::Tri);
            self.maps.add_tri_row(tri, verts);
            tris.push(tri);
        }

        let pgon = self.counters.next(EntType::Pgon);
        self.maps.add_pgon_row(pgon, wires, tris);
        self.ss_register(ssid, EntType::Pgon, pgon)?;
        self.attribs.set_ts(ssid, EntType::Pgon, pgon)?;
        Ok(pgon)
    }

    /// Create a new, empty collection visible under `ssid`.
    pub fn add_coll(&mut self, ssid: Ssid) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let coll = self.counters.next(EntType::Coll);
        self.maps.add_coll_row(coll);
        self.ss_register(ssid, EntType::Coll, coll)?;
        self.attribs.set_ts(ssid, EntType::Coll, coll)?;
        Ok(coll)
    }

    // ------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------

    /// Copy a position. The coordinate always carries over; the other
    /// attributes only when `copy_attribs`.
    pub fn copy_posi(
        &mut self,
        ssid: Ssid,
        posi: EntIdx,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        self.require_ent(EntType::Posi, posi)?;
        let copy = self.counters.next(EntType::Posi);
        self.maps.add_posi_row(copy);
        self.ss_register(ssid, EntType::Posi, copy)?;
        if copy_attribs {
            self.attribs.copy_ent_vals(ssid, EntType::Posi, posi, copy, &[])?;
        } else if let Some(xyz) = self
            .attribs
            .get(ssid, EntType::Posi, posi, crate::attribs::ATTR_COORDS)?
            .and_then(crate::attribs::AttribValue::as_vec3)
        {
            self.attribs.set_posi_coords(ssid, copy, xyz)?;
        }
        Ok(copy)
    }

    /// Copy a position translated by `offset`, for transforms that must
    /// not move shared positions in place.
    ///
    /// # Errors
    /// `MissingCoord` when the source has no coordinate to translate.
    pub fn copy_move_posi(
        &mut self,
        ssid: Ssid,
        posi: EntIdx,
        offset: Vec3,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        self.require_ent(EntType::Posi, posi)?;
        let xyz = self.attribs.posi_coords(ssid, posi)?;
        let moved = [xyz[0] + offset[0], xyz[1] + offset[1], xyz[2] + offset[2]];
        let copy = self.counters.next(EntType::Posi);
        self.maps.add_posi_row(copy);
        self.ss_register(ssid, EntType::Posi, copy)?;
        if copy_attribs {
            self.attribs
                .copy_ent_vals(ssid, EntType::Posi, posi, copy, &[crate::attribs::ATTR_COORDS])?;
        }
        self.attribs.set_posi_coords(ssid, copy, moved)?;
        Ok(copy)
    }

    /// Copy a point. The copy shares the source's position.
    pub fn copy_point(
        &mut self,
        ssid: Ssid,
        point: EntIdx,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let vert = self.nav_point_to_vert(point)?;
        let posi = self.nav_vert_to_posi(vert)?;
        let copy = self.add_point(ssid, posi)?;
        if copy_attribs {
            let copy_vert = self.nav_point_to_vert(copy)?;
            self.attribs.copy_ent_vals(ssid, EntType::Vert, vert, copy_vert, &[])?;
            self.attribs
                .copy_ent_vals(ssid, EntType::Point, point, copy, &[ATTR_TIMESTAMP])?;
            self.attribs.set_ts(ssid, EntType::Point, copy)?;
        }
        Ok(copy)
    }

    /// Copy a polyline. The copy shares the source's positions but gets
    /// fresh vertices, edges, and a fresh wire.
    pub fn copy_pline(
        &mut self,
        ssid: Ssid,
        pline: EntIdx,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let wire = self.nav_pline_to_wire(pline)?;
        let closed = self.is_wire_closed(wire)?;
        let verts = self.wire_verts(wire)?;
        let posis = verts
            .iter()
            .map(|&vert| self.nav_vert_to_posi(vert))
            .collect::<Result<Vec<_>, _>>()?;
        let copy = self.add_pline(ssid, &posis, closed)?;
        if copy_attribs {
            let copy_verts = self.wire_verts(self.nav_pline_to_wire(copy)?)?;
            for (&old, &new) in verts.iter().zip(&copy_verts) {
                self.attribs.copy_ent_vals(ssid, EntType::Vert, old, new, &[])?;
            }
            self.attribs
                .copy_ent_vals(ssid, EntType::Pline, pline, copy, &[ATTR_TIMESTAMP])?;
            self.attribs.set_ts(ssid, EntType::Pline, copy)?;
        }
        Ok(copy)
    }

    /// Copy a polygon, re-triangulating the copy. Shares the source's
    /// positions.
    pub fn copy_pgon(
        &mut self,
        ssid: Ssid,
        pgon: EntIdx,
        triangulator: &dyn Triangulator,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        let wires = self.nav_pgon_to_wire(pgon)?;
        let mut loops: Vec<Vec<EntIdx>> = Vec::with_capacity(wires.len());
        let mut old_verts: Vec<EntIdx> = Vec::new();
        for &wire in &wires {
            let verts = self.wire_verts(wire)?;
            let posis = verts
                .iter()
                .map(|&vert| self.nav_vert_to_posi(vert))
                .collect::<Result<Vec<_>, _>>()?;
            old_verts.extend(verts);
            loops.push(posis);
        }
        let (outer, holes) = loops
            .split_first()
            .ok_or(KernelError::EntNotFound {
                ent_type: EntType::Pgon,
                ent: pgon,
            })?;
        let copy = self.add_pgon(ssid, outer, holes, triangulator)?;
        if copy_attribs {
            let mut copy_verts: Vec<EntIdx> = Vec::new();
            for wire in self.nav_pgon_to_wire(copy)? {
                copy_verts.extend(self.wire_verts(wire)?);
            }
            for (&old, &new) in old_verts.iter().zip(&copy_verts) {
                self.attribs.copy_ent_vals(ssid, EntType::Vert, old, new, &[])?;
            }
            self.attribs
                .copy_ent_vals(ssid, EntType::Pgon, pgon, copy, &[ATTR_TIMESTAMP])?;
            self.attribs.set_ts(ssid, EntType::Pgon, copy)?;
        }
        Ok(copy)
    }

    /// Copy a collection: same members, no parent.
    ///
    /// Shallow: members are shared, not copied, and the hierarchy
    /// bookkeeping (`_coll_parent`/`_coll_childs`) is not carried over.
    pub fn copy_coll(
        &mut self,
        ssid: Ssid,
        coll: EntIdx,
        copy_attribs: bool,
    ) -> Result<EntIdx, KernelError> {
        self.require_ssid(ssid)?;
        self.require_ent(EntType::Coll, coll)?;
        let copy = self.add_coll(ssid)?;
        if copy_attribs {
            self.attribs.copy_ent_vals(
                ssid,
                EntType::Coll,
                coll,
                copy,
                &[
                    ATTR_TIMESTAMP,
                    crate::attribs::ATTR_COLL_PARENT,
                    crate::attribs::ATTR_COLL_CHILDS,
                    crate::attribs::ATTR_COLL_POINTS,
                    crate::attribs::ATTR_COLL_PLINES,
                    crate::attribs::ATTR_COLL_PGONS,
                ],
            )?;
            self.attribs.set_ts(ssid, EntType::Coll, copy)?;
        }
        for member_type in [EntType::Point, EntType::Pline, EntType::Pgon] {
            let members = self.attribs.coll_ents(ssid, coll, member_type)?;
            if !members.is_empty() {
                self.attribs.add_coll_ents(ssid, copy, member_type, &members)?;
            }
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Internal topology helpers
    // ------------------------------------------------------------------

    /// Create a vertex over `posi`.
    pub(crate) fn add_vert(&mut self, posi: EntIdx) -> Result<EntIdx, KernelError> {
        let vert = self.counters.next(EntType::Vert);
        self.maps.add_vert_row(vert, posi)?;
        Ok(vert)
    }

    /// Create a wire over fresh vertices on `posis`, chaining edges in
    /// order (and closing the loop when `closed`). Returns the wire and
    /// its vertices in chain order.
    fn add_wire_over(
        &mut self,
        posis: &[EntIdx],
        closed: bool,
    ) -> Result<(EntIdx, Vec<EntIdx>), KernelError> {
        let verts = posis
            .iter()
            .map(|&posi| self.add_vert(posi))
            .collect::<Result<Vec<_>, _>>()?;
        let mut edges = Vec::with_capacity(verts.len());
        for pair in verts.windows(2) {
            edges.push(self.add_edge(pair[0], pair[1])?);
        }
        if closed {
            edges.push(self.add_edge(verts[verts.len() - 1], verts[0])?);
        }
        let wire = self.counters.next(EntType::Wire);
        self.maps.add_wire_row(wire, edges);
        Ok((wire, verts))
    }

    fn add_edge(&mut self, v1: EntIdx, v2: EntIdx) -> Result<EntIdx, KernelError> {
        let edge = self.counters.next(EntType::Edge);
        self.maps.add_edge_row(edge, v1, v2)?;
        Ok(edge)
    }

    fn loop_coords(&self, ssid: Ssid, posis: &[EntIdx]) -> Result<Vec<Vec3>, KernelError> {
        posis
            .iter()
            .map(|&posi| self.attribs.posi_coords(ssid, posi))
            .collect()
    }

    fn tri_verts(
        &self,
        all_verts: &[EntIdx],
        corner: [usize; 3],
    ) -> Result<[EntIdx; 3], KernelError> {
        let pick = |i: usize| {
            all_verts
                .get(i)
                .copied()
                .ok_or(KernelError::TriangulatorIndex {
                    found: i,
                    len: all_verts.len(),
                })
        };
        Ok([pick(corner[0])?, pick(corner[1])?, pick(corner[2])?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulate::FanTriangulator;

    const SS0: Ssid = Ssid::new(0);

    fn posi_at(model: &mut GeoModel, xyz: Vec3) -> EntIdx {
        let posi = model.add_posi(SS0).unwrap();
        model.set_posi_coords(SS0, posi, xyz).unwrap();
        posi
    }

    fn square_posis(model: &mut GeoModel) -> Vec<EntIdx> {
        [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]
        .iter()
        .map(|&xyz| posi_at(model, xyz))
        .collect()
    }

    #[test]
    fn open_pline_needs_two_posis() {
        let mut model = GeoModel::new();
        let p0 = model.add_posi(SS0).unwrap();
        let err = model.add_pline(SS0, &[p0], false).unwrap_err();
        assert_eq!(
            err,
            KernelError::TooFewPositions {
                ent_type: EntType::Pline,
                found: 1,
                min: 2
            }
        );
    }

    #[test]
    fn closed_pline_needs_three_posis() {
        let mut model = GeoModel::new();
        let p0 = model.add_posi(SS0).unwrap();
        let p1 = model.add_posi(SS0).unwrap();
        let err = model.add_pline(SS0, &[p0, p1], true).unwrap_err();
        assert!(matches!(err, KernelError::TooFewPositions { min: 3, .. }));
    }

    #[test]
    fn pgon_needs_coordinates_on_every_loop_posi() {
        let mut model = GeoModel::new();
        let posis = square_posis(&mut model);
        let bare = model.add_posi(SS0).unwrap();
        let err = model
            .add_pgon(SS0, &[posis[0], posis[1], bare], &[], &FanTriangulator)
            .unwrap_err();
        assert_eq!(err, KernelError::MissingCoord { posi: bare });
    }

    #[test]
    fn pgon_rejects_short_hole_loops() {
        let mut model = GeoModel::new();
        let posis = square_posis(&mut model);
        let err = model
            .add_pgon(SS0, &posis, &[vec![posis[0], posis[1]]], &FanTriangulator)
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::TooFewPositions {
                ent_type: EntType::Pgon,
                found: 2,
                min: 3
            }
        ));
    }

    #[test]
    fn out_of_range_triangulator_output_is_caught() {
        let mut model = GeoModel::new();
        let posis = square_posis(&mut model);
        let bogus = |_: &[Vec3], _: &[Vec<Vec3>]| vec![[0usize, 1, 99]];
        let err = model.add_pgon(SS0, &posis, &[], &bogus).unwrap_err();
        assert_eq!(err, KernelError::TriangulatorIndex { found: 99, len: 4 });
    }

    #[test]
    fn copy_point_shares_the_position() {
        let mut model = GeoModel::new();
        let posi = posi_at(&mut model, [2.0, 0.0, 0.0]);
        let point = model.add_point(SS0, posi).unwrap();
        let copy = model.copy_point(SS0, point, true).unwrap();
        assert_ne!(point, copy);
        let copy_posi = model
            .nav_vert_to_posi(model.nav_point_to_vert(copy).unwrap())
            .unwrap();
        assert_eq!(copy_posi, posi);
    }

    #[test]
    fn copy_move_posi_translates_and_keeps_other_attribs() {
        let mut model = GeoModel::new();
        let posi = posi_at(&mut model, [1.0, 1.0, 1.0]);
        model
            .set_attrib(SS0, EntType::Posi, posi, "weight", 4.0.into())
            .unwrap();
        let copy = model
            .copy_move_posi(SS0, posi, [4.0, 4.0, 4.0], true)
            .unwrap();
        assert_eq!(model.get_posi_coords(SS0, copy).unwrap(), [5.0, 5.0, 5.0]);
        assert_eq!(
            model.get_attrib(SS0, EntType::Posi, copy, "weight").unwrap(),
            Some(&4.0.into())
        );
        assert_eq!(model.get_posi_coords(SS0, posi).unwrap(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn copy_without_attribs_still_carries_the_coordinate() {
        let mut model = GeoModel::new();
        let posi = posi_at(&mut model, [3.0, 0.0, 0.0]);
        model
            .set_attrib(SS0, EntType::Posi, posi, "weight", 4.0.into())
            .unwrap();
        let copy = model.copy_posi(SS0, posi, false).unwrap();
        assert_eq!(model.get_posi_coords(SS0, copy).unwrap(), [3.0, 0.0, 0.0]);
        assert_eq!(model.get_attrib(SS0, EntType::Posi, copy, "weight").unwrap(), None);
    }
}
