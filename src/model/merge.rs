//! Merging models and purging unreachable rows.
//!
//! Merge folds another model's arena, snapshots, and attributes into
//! this one; handles are assumed to come from a shared allocation
//! history (a branched copy of the same model), so identical handles
//! denote identical entities and the tables simply union.
//!
//! Purge is the one operation that renumbers: it drops every arena row
//! unreachable from any snapshot's visibility and compacts the
//! surviving handles densely per kind. All tables, visibility sets,
//! and handle-valued attributes are rewritten consistently.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::kernel_error::KernelError;
use crate::model::{GeoModel, SnapshotSets};
use crate::topology::ent::{EntIdx, EntSets, EntType};
use crate::topology::geom_maps::GeomMaps;

impl GeoModel {
    /// Merge another model into this one. Counters take the per-kind
    /// maximum, tables union row-wise, snapshot sets union per id, and
    /// the other model's attribute values win collisions.
    pub fn merge(&mut self, other: &GeoModel) -> Result<(), KernelError> {
        for ent_type in EntType::ALL {
            let count = self
                .counters
                .count(ent_type)
                .max(other.counters.count(ent_type));
            self.counters.set_count(ent_type, count);
        }

        let maps = &mut self.maps;
        let theirs = &other.maps;
        maps.dn_verts_posis.extend(&theirs.dn_verts_posis);
        maps.dn_tris_verts.extend(&theirs.dn_tris_verts);
        maps.dn_edges_verts.extend(&theirs.dn_edges_verts);
        maps.dn_points_verts.extend(&theirs.dn_points_verts);
        maps.dn_plines_wires.extend(&theirs.dn_plines_wires);
        for (table, other_table) in [
            (&mut maps.dn_wires_edges, &theirs.dn_wires_edges),
            (&mut maps.dn_pgons_wires, &theirs.dn_pgons_wires),
            (&mut maps.dn_pgons_tris, &theirs.dn_pgons_tris),
            (&mut maps.up_posis_verts, &theirs.up_posis_verts),
            (&mut maps.up_verts_edges, &theirs.up_verts_edges),
            (&mut maps.up_verts_tris, &theirs.up_verts_tris),
        ] {
            for (ent, row) in other_table {
                table.insert(*ent, row.clone());
            }
        }
        maps.up_verts_points.extend(&theirs.up_verts_points);
        maps.up_edges_wires.extend(&theirs.up_edges_wires);
        maps.up_wires_plines.extend(&theirs.up_wires_plines);
        maps.up_wires_pgons.extend(&theirs.up_wires_pgons);
        maps.up_tris_pgons.extend(&theirs.up_tris_pgons);
        maps.colls.extend(&theirs.colls);

        for (ssid, sets) in other.snapshots.iter() {
            match self.snapshots.get_mut(ssid) {
                Some(mine) => mine.union_with(sets),
                None => self.snapshots.insert(ssid, sets.clone()),
            }
        }
        self.attribs.merge_from(&other.attribs)?;
        debug!(
            "merged model: now {} posis, {} pgons across kinds",
            self.counters.count(EntType::Posi),
            self.counters.count(EntType::Pgon)
        );
        Ok(())
    }

    /// Drop every arena row unreachable from any snapshot and renumber
    /// the survivors densely per kind. The only operation that breaks
    /// handle stability; callers must treat all previously held handles
    /// as invalid afterwards.
    pub fn purge(&mut self) -> Result<(), KernelError> {
        let keep = self.reachable_ents();
        let mut remap: HashMap<EntType, HashMap<EntIdx, EntIdx>> = HashMap::new();
        let mut olds: HashMap<EntType, Vec<EntIdx>> = HashMap::new();
        for ent_type in EntType::ALL {
            let mut kept: Vec<EntIdx> = keep[&ent_type].iter().copied().collect();
            kept.sort_unstable();
            let table = kept
                .iter()
                .enumerate()
                .map(|(new, &old)| (old, EntIdx::new(new as u32)))
                .collect();
            remap.insert(ent_type, table);
            olds.insert(ent_type, kept);
        }

        let dropped: usize = EntType::ALL
            .iter()
            .map(|&k| self.maps.num_rows(k).saturating_sub(olds[&k].len()))
            .sum();
        self.maps = self.rebuild_maps(&remap, &olds)?;
        for ent_type in EntType::ALL {
            self.counters.set_count(ent_type, olds[&ent_type].len() as u32);
        }

        let mut snapshots = SnapshotSets::default();
        for (ssid, sets) in self.snapshots.iter() {
            let mut new_sets = EntSets::new();
            for ent_type in EntType::ALL {
                let Some(old_set) = sets.set(ent_type) else { continue };
                for old in old_set {
                    if let Some(&new) = remap[&ent_type].get(old) {
                        new_sets.insert(ent_type, new);
                    }
                }
            }
            snapshots.insert(ssid, new_sets);
        }
        self.snapshots = snapshots;
        self.attribs = self.attribs.rebuilt(&remap)?;
        debug!("purged {dropped} unreachable arena rows");
        Ok(())
    }

    /// Everything reachable from some snapshot's visibility: the
    /// visible objects, their topology, and the positions under every
    /// kept vertex (which may outlive their own visibility).
    fn reachable_ents(&self) -> HashMap<EntType, HashSet<EntIdx>> {
        let mut keep: HashMap<EntType, HashSet<EntIdx>> = EntType::ALL
            .iter()
            .map(|&ent_type| (ent_type, HashSet::new()))
            .collect();
        for (_, sets) in self.snapshots.iter() {
            for ent_type in EntType::ALL {
                if let Some(set) = sets.set(ent_type) {
                    if let Some(kept) = keep.get_mut(&ent_type) {
                        kept.extend(set);
                    }
                }
            }
        }

        let mut verts: HashSet<EntIdx> = HashSet::new();
        let mut edges: HashSet<EntIdx> = HashSet::new();
        let mut wires: HashSet<EntIdx> = HashSet::new();
        let mut tris: HashSet<EntIdx> = HashSet::new();
        for &point in &keep[&EntType::Point] {
            verts.extend(self.maps.dn_points_verts.get(&point));
        }
        for &pline in &keep[&EntType::Pline] {
            wires.extend(self.maps.dn_plines_wires.get(&pline));
        }
        for &pgon in &keep[&EntType::Pgon] {
            if let Some(pgon_wires) = self.maps.dn_pgons_wires.get(&pgon) {
                wires.extend(pgon_wires);
            }
            if let Some(pgon_tris) = self.maps.dn_pgons_tris.get(&pgon) {
                tris.extend(pgon_tris);
            }
        }
        for wire in &wires {
            if let Some(wire_edges) = self.maps.dn_wires_edges.get(wire) {
                edges.extend(wire_edges);
            }
        }
        for edge in &edges {
            if let Some(&[v1, v2]) = self.maps.dn_edges_verts.get(edge) {
                verts.insert(v1);
                verts.insert(v2);
            }
        }
        for vert in &verts {
            if let Some(&posi) = self.maps.dn_verts_posis.get(vert) {
                if let Some(kept) = keep.get_mut(&EntType::Posi) {
                    kept.insert(posi);
                }
            }
        }
        keep.insert(EntType::Vert, verts);
        keep.insert(EntType::Edge, edges);
        keep.insert(EntType::Wire, wires);
        keep.insert(EntType::Tri, tris);
        keep
    }

    /// Rebuild the arena through the row inserters in new-handle order,
    /// which regenerates every up table (including the
    /// incoming/outgoing vertex-edge ordering) from the kept down rows.
    fn rebuild_maps(
        &self,
        remap: &HashMap<EntType, HashMap<EntIdx, EntIdx>>,
        olds: &HashMap<EntType, Vec<EntIdx>>,
    ) -> Result<GeomMaps, KernelError> {
        let r = |ent_type: EntType, ent: EntIdx| -> Result<EntIdx, KernelError> {
            remap
                .get(&ent_type)
                .and_then(|table| table.get(&ent))
                .copied()
                .ok_or(KernelError::EntNotFound { ent_type, ent })
        };
        let row = |ent_type: EntType, ent: EntIdx| KernelError::EntNotFound { ent_type, ent };

        let mut maps = GeomMaps::new();
        for &old in &olds[&EntType::Posi] {
            maps.add_posi_row(r(EntType::Posi, old)?);
        }
        for &old in &olds[&EntType::Vert] {
            let posi = *self
                .maps
                .dn_verts_posis
                .get(&old)
                .ok_or_else(|| row(EntType::Vert, old))?;
            maps.add_vert_row(r(EntType::Vert, old)?, r(EntType::Posi, posi)?)?;
        }
        for &old in &olds[&EntType::Edge] {
            let [v1, v2] = *self
                .maps
                .dn_edges_verts
                .get(&old)
                .ok_or_else(|| row(EntType::Edge, old))?;
            maps.add_edge_row(
                r(EntType::Edge, old)?,
                r(EntType::Vert, v1)?,
                r(EntType::Vert, v2)?,
            )?;
        }
        for &old in &olds[&EntType::Wire] {
            let edges = self
                .maps
                .dn_wires_edges
                .get(&old)
                .ok_or_else(|| row(EntType::Wire, old))?
                .iter()
                .map(|&edge| r(EntType::Edge, edge))
                .collect::<Result<Vec<_>, _>>()?;
            maps.add_wire_row(r(EntType::Wire, old)?, edges);
        }
        for &old in &olds[&EntType::Tri] {
            let [a, b, c] = *self
                .maps
                .dn_tris_verts
                .get(&old)
                .ok_or_else(|| row(EntType::Tri, old))?;
            maps.add_tri_row(
                r(EntType::Tri, old)?,
                [r(EntType::Vert, a)?, r(EntType::Vert, b)?, r(EntType::Vert, c)?],
            );
        }
        for &old in &olds[&EntType::Point] {
            let vert = *self
                .maps
                .dn_points_verts
                .get(&old)
                .ok_or_else(|| row(EntType::Point, old))?;
            maps.add_point_row(r(EntType::Point, old)?, r(EntType::Vert, vert)?);
        }
        for &old in &olds[&EntType::Pline] {
            let wire = *self
                .maps
                .dn_plines_wires
                .get(&old)
                .ok_or_else(|| row(EntType::Pline, old))?;
            maps.add_pline_row(r(EntType::Pline, old)?, r(EntType::Wire, wire)?);
        }
        for &old in &olds[&EntType::Pgon] {
            let wires = self
                .maps
                .dn_pgons_wires
                .get(&old)
                .ok_or_else(|| row(EntType::Pgon, old))?
                .iter()
                .map(|&wire| r(EntType::Wire, wire))
                .collect::<Result<Vec<_>, _>>()?;
            let tris = self
                .maps
                .dn_pgons_tris
                .get(&old)
                .ok_or_else(|| row(EntType::Pgon, old))?
                .iter()
                .map(|&tri| r(EntType::Tri, tri))
                .collect::<Result<Vec<_>, _>>()?;
            maps.add_pgon_row(r(EntType::Pgon, old)?, wires, tris);
        }
        for &old in &olds[&EntType::Coll] {
            maps.add_coll_row(r(EntType::Coll, old)?);
        }
        Ok(maps)
    }
}
