//! End-to-end extraction scenarios
use nalgebra::{Vector2, Vector3};
use polygonize::{get_contour, get_mesh, Mesh, Triangle};
use std::collections::BTreeMap;

fn sphere(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt() - 1.0
}

fn cube(x: f64, y: f64, z: f64) -> f64 {
    x.abs().max(y.abs()).max(z.abs()) - 1.0
}

fn box3(v: f64) -> Vector3<f64> {
    Vector3::new(v, v, v)
}

/// Every directed triangle edge must be matched by its reverse in some
/// other triangle; anything unpaired is a crack or an orientation flip
fn check_edge_matching(mesh: &Mesh) -> Result<(), String> {
    let mut ids: BTreeMap<[u64; 3], usize> = BTreeMap::new();
    let mut id = |v: &Vector3<f64>| {
        let k = [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        let next = ids.len();
        *ids.entry(k).or_insert(next)
    };
    let mut edges: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for t in &mesh.triangles {
        let v = [id(&t[0]), id(&t[1]), id(&t[2])];
        if v[0] == v[1] || v[1] == v[2] || v[0] == v[2] {
            return Err(format!("degenerate triangle {t:?}"));
        }
        for e in [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])] {
            *edges.entry(e).or_default() += 1;
        }
    }
    for (&(a, b), &n) in &edges {
        if n != 1 {
            return Err(format!("edge ({a}, {b}) appears {n} times"));
        }
        if !edges.contains_key(&(b, a)) {
            return Err(format!("edge ({a}, {b}) is unpaired"));
        }
    }
    Ok(())
}

fn area(t: &Triangle) -> f64 {
    (t[1] - t[0]).cross(&(t[2] - t[0])).norm() / 2.0
}

#[test]
fn sphere_mesh() {
    let mesh =
        get_mesh(box3(-1.5), box3(1.5), box3(0.5), &sphere).unwrap();
    assert!(
        (48..=400).contains(&mesh.triangles.len()),
        "unexpected triangle count {}",
        mesh.triangles.len()
    );
    for t in &mesh.triangles {
        for v in t {
            let r = v.norm();
            assert!(
                (0.87..=1.15).contains(&r),
                "vertex {v:?} at radius {r}"
            );
        }
        // Outward orientation: the normal should point away from the
        // origin for a sphere centered there
        let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
        let c = (t[0] + t[1] + t[2]) / 3.0;
        assert!(n.dot(&c) > 0.0, "inward-facing triangle at {c:?}");
    }
    // Total area should approximate the sphere's 4*pi
    let total: f64 = mesh.triangles.iter().map(area).sum();
    assert!(
        (total - 4.0 * std::f64::consts::PI).abs() < 1.5,
        "surface area {total}"
    );
}

#[test]
fn sphere_mesh_is_watertight() {
    let mesh =
        get_mesh(box3(-1.5), box3(1.5), box3(0.5), &sphere).unwrap();
    if let Err(e) = check_edge_matching(&mesh) {
        panic!("sphere mesh has {e}");
    }
}

#[test]
fn cube_mesh_merges_to_twelve_triangles() {
    let mesh = get_mesh(box3(-1.5), box3(1.5), box3(0.5), &cube).unwrap();
    assert_eq!(
        mesh.triangles.len(),
        12,
        "cube faces did not merge into single rectangles"
    );
    if let Err(e) = check_edge_matching(&mesh) {
        panic!("cube mesh has {e}");
    }
    // Two triangles per face, each of area 2x2 / 2
    let total: f64 = mesh.triangles.iter().map(area).sum();
    assert!((total - 24.0).abs() < 1e-9);
    for t in &mesh.triangles {
        let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
        let c = (t[0] + t[1] + t[2]) / 3.0;
        assert!(n.dot(&c) > 0.0, "inward-facing triangle at {c:?}");
        for v in t {
            assert_eq!(v.x.abs().max(v.y.abs()).max(v.z.abs()), 1.0);
        }
    }
}

#[test]
fn uniform_fields_mesh_empty() {
    // All-outside and all-inside fields both have no boundary in the box
    for v in [1.0, -1.0] {
        let f = move |_: f64, _: f64, _: f64| v;
        let mesh = get_mesh(box3(-2.0), box3(2.0), box3(0.5), &f).unwrap();
        assert!(mesh.triangles.is_empty());
    }
}

#[test]
fn empty_box_mesh() {
    let mesh = get_mesh(box3(1.0), box3(-1.0), box3(0.5), &sphere).unwrap();
    assert!(mesh.triangles.is_empty());
}

#[test]
fn mesh_vertices_stay_in_bounds() {
    let p1 = box3(-1.5);
    let p2 = box3(1.5);
    let mesh = get_mesh(p1, p2, Vector3::new(0.4, 0.5, 0.6), &sphere)
        .unwrap();
    assert!(!mesh.triangles.is_empty());
    for t in &mesh.triangles {
        for v in t {
            for a in 0..3 {
                assert!(
                    v[a] >= p1[a] && v[a] <= p2[a],
                    "vertex {v:?} escaped the box"
                );
            }
        }
    }
}

#[test]
fn mesh_determinism() {
    let run = || {
        get_mesh(box3(-1.5), box3(1.5), box3(0.3), &sphere).unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a, b, "mesh output depends on thread scheduling");
}

#[test]
fn finer_resolution_tracks_surface_better() {
    // Hausdorff-style check: the worst vertex error must not grow as the
    // grid is refined
    let worst = |step: f64| -> f64 {
        let mesh =
            get_mesh(box3(-1.5), box3(1.5), box3(step), &sphere).unwrap();
        mesh.triangles
            .iter()
            .flatten()
            .map(|v| (v.norm() - 1.0).abs())
            .fold(0.0, f64::max)
    };
    let coarse = worst(0.5);
    let fine = worst(0.25);
    assert!(
        fine <= coarse + 1e-12,
        "refining res made things worse: {coarse} -> {fine}"
    );
}

#[test]
fn clipped_sphere_rim_lies_on_the_box() {
    // The box cuts the sphere in half; the mesh stops at the cut, so the
    // only unpaired triangle edges must lie on the box surface
    let p1 = Vector3::new(-1.5, -1.5, 0.0);
    let p2 = Vector3::new(1.5, 1.5, 1.5);
    let mesh = get_mesh(p1, p2, box3(0.5), &sphere).unwrap();
    assert!(!mesh.triangles.is_empty());

    let mut edges: BTreeMap<([u64; 3], [u64; 3]), usize> = BTreeMap::new();
    let key = |v: &Vector3<f64>| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
    for t in &mesh.triangles {
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            *edges.entry((key(&t[a]), key(&t[b]))).or_default() += 1;
        }
    }
    let on_box = |k: &[u64; 3]| {
        let v = Vector3::new(
            f64::from_bits(k[0]),
            f64::from_bits(k[1]),
            f64::from_bits(k[2]),
        );
        (0..3).any(|a| v[a] == p1[a] || v[a] == p2[a])
    };
    for (&(a, b), &n) in &edges {
        assert_eq!(n, 1, "duplicated edge");
        if !edges.contains_key(&(b, a)) {
            assert!(
                on_box(&a) && on_box(&b),
                "unpaired edge off the box surface"
            );
        }
    }
}

#[test]
fn contour_circle() {
    let loops = get_contour(
        Vector2::new(-1.2, -1.2),
        Vector2::new(1.2, 1.2),
        Vector2::new(0.1, 0.1),
        &|x: f64, y: f64| (x * x + y * y).sqrt() - 1.0,
    )
    .unwrap();
    assert_eq!(loops.len(), 1);
    assert!(loops[0].is_closed());
    for p in &loops[0].points {
        assert!((p.norm() - 1.0).abs() < 0.05);
    }
}

#[test]
fn contour_two_rings() {
    let rings = |x: f64, y: f64| {
        let r2 = x * x + y * y;
        (r2 - 1.0) * (r2 - 0.25)
    };
    let loops = get_contour(
        Vector2::new(-1.2, -1.2),
        Vector2::new(1.2, 1.2),
        Vector2::new(0.05, 0.05),
        &rings,
    )
    .unwrap();
    assert_eq!(loops.len(), 2);
    let mut areas: Vec<f64> =
        loops.iter().map(|l| l.signed_area()).collect();
    areas.sort_by(f64::total_cmp);
    assert!(areas[0] < 0.0, "inner ring should wind clockwise");
    assert!(areas[1] > 0.0, "outer ring should wind counterclockwise");
}
