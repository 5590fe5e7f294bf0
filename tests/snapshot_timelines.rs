//! Snapshot lifecycle: branching, union initialization, deletion, and
//! scoped navigation across timelines.

use geo_kernel::prelude::*;

const SS0: Ssid = Ssid::new(0);
const SS1: Ssid = Ssid::new(1);
const SS2: Ssid = Ssid::new(2);

fn triangle(model: &mut GeoModel, ssid: Ssid, offset: f64) -> (Vec<EntIdx>, EntIdx) {
    let posis: Vec<EntIdx> = [
        [offset, 0.0, 0.0],
        [offset + 1.0, 0.0, 0.0],
        [offset, 1.0, 0.0],
    ]
    .iter()
    .map(|&xyz| {
        let posi = model.add_posi(ssid).unwrap();
        model.set_posi_coords(ssid, posi, xyz).unwrap();
        posi
    })
    .collect();
    let pgon = model.add_pgon(ssid, &posis, &[], &FanTriangulator).unwrap();
    (posis, pgon)
}

#[test]
fn init_union_of_two_timelines() {
    let mut model = GeoModel::new();
    let (_, a) = triangle(&mut model, SS0, 0.0);
    model.ss_init(SS1, &[]).unwrap();
    let (_, b) = triangle(&mut model, SS1, 5.0);

    // neither timeline sees the other's polygon
    assert!(!model.has_ent(SS0, EntType::Pgon, b));
    assert!(!model.has_ent(SS1, EntType::Pgon, a));

    model.ss_init(SS2, &[SS0, SS1]).unwrap();
    assert!(model.has_ent(SS2, EntType::Pgon, a));
    assert!(model.has_ent(SS2, EntType::Pgon, b));
    assert_eq!(model.num_ents(SS2, EntType::Posi).unwrap(), 6);
}

#[test]
fn referencing_an_unknown_snapshot_fails() {
    let mut model = GeoModel::new();
    let missing = Ssid::new(9);
    assert_eq!(
        model.add_posi(missing).unwrap_err(),
        KernelError::SsidNotFound(missing)
    );
    assert_eq!(
        model.ss_init(SS1, &[missing]).unwrap_err(),
        KernelError::SsidNotFound(missing)
    );
}

#[test]
fn attribute_edits_stay_inside_their_snapshot() {
    let mut model = GeoModel::new();
    let (posis, pgon) = triangle(&mut model, SS0, 0.0);
    model
        .set_attrib(SS0, EntType::Pgon, pgon, "area", 0.5.into())
        .unwrap();
    model.ss_init(SS1, &[SS0]).unwrap();

    model.set_posi_coords(SS1, posis[0], [8.0, 8.0, 0.0]).unwrap();
    model
        .set_attrib(SS1, EntType::Pgon, pgon, "area", 4.0.into())
        .unwrap();

    assert_eq!(model.get_posi_coords(SS0, posis[0]).unwrap(), [0.0, 0.0, 0.0]);
    assert_eq!(
        model.get_attrib(SS0, EntType::Pgon, pgon, "area").unwrap(),
        Some(&0.5.into())
    );
    assert_eq!(model.get_posi_coords(SS1, posis[0]).unwrap(), [8.0, 8.0, 0.0]);
}

#[test]
fn dropping_a_snapshot_leaves_others_intact() {
    let mut model = GeoModel::new();
    let (_, pgon) = triangle(&mut model, SS0, 0.0);
    model.ss_init(SS1, &[SS0]).unwrap();
    model.ss_drop(SS0);
    assert!(!model.has_ent(SS0, EntType::Pgon, pgon));
    assert!(model.has_ent(SS1, EntType::Pgon, pgon));
    assert!(model.ent_exists(EntType::Pgon, pgon));
}

#[test]
fn scoped_navigation_hides_invisible_positions() {
    let mut model = GeoModel::new();
    let (posis, pgon) = triangle(&mut model, SS0, 0.0);
    // force one position out of visibility; its arena row survives
    let mut sel = EntSets::new();
    sel.posis.insert(posis[2]);
    model.delete(SS0, &sel, false).unwrap();

    let seen = model
        .nav_any_to_any_ss(SS0, EntType::Pgon, EntType::Posi, pgon)
        .unwrap();
    assert_eq!(seen, vec![posis[0], posis[1]]);
    // the unscoped navigator still reports the full topology
    let all = model.nav_any_to_posi(SS0, EntType::Pgon, pgon).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn timestamps_record_the_creating_snapshot() {
    let mut model = GeoModel::new();
    model.ss_init(SS1, &[SS0]).unwrap();
    let p = model.add_posi(SS1).unwrap();
    model.set_posi_coords(SS1, p, [0.0; 3]).unwrap();
    let point = model.add_point(SS1, p).unwrap();
    let ts = model
        .get_attrib(SS1, EntType::Point, point, "_ts")
        .unwrap()
        .and_then(AttribValue::as_num);
    assert_eq!(ts, Some(1.0));
}

#[test]
fn collections_follow_their_members_across_branches() {
    let mut model = GeoModel::new();
    let (_, pgon) = triangle(&mut model, SS0, 0.0);
    let coll = model.add_coll(SS0).unwrap();
    model.add_coll_ents(SS0, coll, EntType::Pgon, &[pgon]).unwrap();
    model.ss_init(SS1, &[SS0]).unwrap();

    // removing the member in the branch leaves the original timeline alone
    model.del_coll_ents(SS1, coll, EntType::Pgon, &[pgon]).unwrap();
    assert!(model.coll_ents(SS1, coll, EntType::Pgon).unwrap().is_empty());
    assert_eq!(model.coll_ents(SS0, coll, EntType::Pgon).unwrap(), vec![pgon]);
}
