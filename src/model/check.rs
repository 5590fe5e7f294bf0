//! Advisory consistency scan over the arena, snapshots, and attributes.
//!
//! `check` never mutates and never fails: it walks every table looking
//! for cross-reference breakage a buggy caller (or a hand-edited
//! document) could introduce, logs each finding at warn level, and
//! returns the findings so hosts can surface them. A clean model
//! returns an empty list.

use std::collections::HashSet;

use log::warn;

use crate::model::GeoModel;
use crate::topology::ent::{EntIdx, EntType};

impl GeoModel {
    /// Scan the model for internal inconsistencies. Returns one message
    /// per finding; empty means consistent.
    pub fn check(&self) -> Vec<String> {
        let mut findings = Vec::new();
        self.check_down_refs(&mut findings);
        self.check_up_down_symmetry(&mut findings);
        self.check_vertex_degrees(&mut findings);
        self.check_wire_contiguity(&mut findings);
        self.check_snapshot_members(&mut findings);
        self.check_attrib_handles(&mut findings);
        self.check_coll_hierarchy(&mut findings);
        for finding in &findings {
            warn!("{finding}");
        }
        findings
    }

    fn check_down_refs(&self, findings: &mut Vec<String>) {
        for (&vert, &posi) in &self.maps.dn_verts_posis {
            if !self.maps.contains(EntType::Posi, posi) {
                findings.push(format!("vertex {vert} references missing position {posi}"));
            }
        }
        for (&edge, verts) in &self.maps.dn_edges_verts {
            for &vert in verts {
                if !self.maps.contains(EntType::Vert, vert) {
                    findings.push(format!("edge {edge} references missing vertex {vert}"));
                }
            }
        }
        for (&wire, edges) in &self.maps.dn_wires_edges {
            for &edge in edges {
                if !self.maps.contains(EntType::Edge, edge) {
                    findings.push(format!("wire {wire} references missing edge {edge}"));
                }
            }
        }
        for (&tri, verts) in &self.maps.dn_tris_verts {
            for &vert in verts {
                if !self.maps.contains(EntType::Vert, vert) {
                    findings.push(format!("triangle {tri} references missing vertex {vert}"));
                }
            }
        }
        for (&point, &vert) in &self.maps.dn_points_verts {
            if !self.maps.contains(EntType::Vert, vert) {
                findings.push(format!("point {point} references missing vertex {vert}"));
            }
        }
        for (&pline, &wire) in &self.maps.dn_plines_wires {
            if !self.maps.contains(EntType::Wire, wire) {
                findings.push(format!("polyline {pline} references missing wire {wire}"));
            }
        }
        for (&pgon, wires) in &self.maps.dn_pgons_wires {
            for &wire in wires {
                if !self.maps.contains(EntType::Wire, wire) {
                    findings.push(format!("polygon {pgon} references missing wire {wire}"));
                }
            }
        }
        for (&pgon, tris) in &self.maps.dn_pgons_tris {
            for &tri in tris {
                if !self.maps.contains(EntType::Tri, tri) {
                    findings.push(format!("polygon {pgon} references missing triangle {tri}"));
                }
            }
        }
    }

    fn check_up_down_symmetry(&self, findings: &mut Vec<String>) {
        for (&vert, &posi) in &self.maps.dn_verts_posis {
            let backlinked = self
                .maps
                .up_posis_verts
                .get(&posi)
                .is_some_and(|verts| verts.contains(&vert));
            if !backlinked {
                findings.push(format!(
                    "vertex {vert} on position {posi} missing from its up list"
                ));
            }
        }
        for (&edge, verts) in &self.maps.dn_edges_verts {
            for &vert in verts {
                let backlinked = self
                    .maps
                    .up_verts_edges
                    .get(&vert)
                    .is_some_and(|edges| edges.contains(&edge));
                if !backlinked {
                    findings.push(format!(
                        "edge {edge} over vertex {vert} missing from its up list"
                    ));
                }
            }
        }
        for (&wire, edges) in &self.maps.dn_wires_edges {
            for &edge in edges {
                if self.maps.up_edges_wires.get(&edge) != Some(&wire) {
                    findings.push(format!("edge {edge} does not link back to wire {wire}"));
                }
            }
        }
        for (&pgon, wires) in &self.maps.dn_pgons_wires {
            for &wire in wires {
                if self.maps.up_wires_pgons.get(&wire) != Some(&pgon) {
                    findings.push(format!("wire {wire} does not link back to polygon {pgon}"));
                }
            }
        }
    }

    fn check_vertex_degrees(&self, findings: &mut Vec<String>) {
        for (&vert, edges) in &self.maps.up_verts_edges {
            if edges.len() > 2 {
                findings.push(format!(
                    "vertex {vert} has {} incident edges (2 allowed)",
                    edges.len()
                ));
            }
        }
    }

    fn check_wire_contiguity(&self, findings: &mut Vec<String>) {
        for (&wire, edges) in &self.maps.dn_wires_edges {
            for pair in edges.windows(2) {
                let (Some(a), Some(b)) = (
                    self.maps.dn_edges_verts.get(&pair[0]),
                    self.maps.dn_edges_verts.get(&pair[1]),
                ) else {
                    continue;
                };
                if a[1] != b[0] {
                    findings.push(format!(
                        "wire {wire} breaks between edges {} and {}",
                        pair[0], pair[1]
                    ));
                }
            }
        }
    }

    fn check_snapshot_members(&self, findings: &mut Vec<String>) {
        for (ssid, sets) in self.snapshots.iter() {
            for ent_type in EntType::ALL {
                let Some(set) = sets.set(ent_type) else { continue };
                for &ent in set {
                    if !self.maps.contains(ent_type, ent) {
                        findings.push(format!(
                            "snapshot {ssid} lists {ent_type} {ent} with no arena row"
                        ));
                    }
                }
            }
        }
    }

    fn check_attrib_handles(&self, findings: &mut Vec<String>) {
        for (ssid, maps) in self.attribs.iter_snapshots() {
            for (&ent_type, cols) in &maps.ents {
                for col in cols.values() {
                    for ent in col.ents() {
                        if !self.maps.contains(ent_type, ent) {
                            findings.push(format!(
                                "snapshot {ssid} attribute `{}` set on missing {ent_type} {ent}",
                                col.name()
                            ));
                        }
                    }
                }
            }
        }
    }

    fn check_coll_hierarchy(&self, findings: &mut Vec<String>) {
        for (ssid, _) in self.attribs.iter_snapshots() {
            for &coll in &self.maps.colls {
                let Ok(Some(parent)) = self.attribs.coll_parent(ssid, coll) else {
                    continue;
                };
                if !self.maps.contains(EntType::Coll, parent) {
                    findings.push(format!(
                        "collection {coll} has dangling parent {parent} in snapshot {ssid}"
                    ));
                    continue;
                }
                // walk the parent chain looking for a loop
                let mut seen: HashSet<EntIdx> = HashSet::from([coll]);
                let mut cursor = Some(parent);
                while let Some(current) = cursor {
                    if !seen.insert(current) {
                        findings.push(format!(
                            "collection {coll} sits in a parent cycle in snapshot {ssid}"
                        ));
                        break;
                    }
                    cursor = self.attribs.coll_parent(ssid, current).ok().flatten();
                }
            }
        }
    }
}
