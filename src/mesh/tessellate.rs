//! Loop tessellation
//!
//! Each closed loop on a cell boundary becomes triangles, except for the
//! common flat case: a four-point loop forming an axis-aligned rectangle
//! is kept as a [`Quad`] so the merge pass can coalesce it with its
//! neighbors before triangulation. Everything else is ear-clipped in the
//! loop's plane.

use super::Triangle;
use nalgebra::{Vector2, Vector3};

/// An axis-aligned rectangle awaiting the merge pass
///
/// In-plane coordinates are cyclic: `u` is axis `(axis + 1) % 3` and `v`
/// is axis `(axis + 2) % 3`, so `u x v` points along `+axis`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Quad {
    /// Axis the rectangle's normal is parallel to (0, 1, or 2)
    pub axis: usize,
    /// Coordinate of the rectangle's plane along `axis`
    pub level: f64,
    /// In-plane lower corner
    pub lo: Vector2<f64>,
    /// In-plane upper corner
    pub hi: Vector2<f64>,
    /// Set when the outward normal points along `-axis`
    pub flip: bool,
}

impl Quad {
    /// Embeds an in-plane point back into 3D
    pub fn embed(&self, u: f64, v: f64) -> Vector3<f64> {
        let mut p = Vector3::zeros();
        p[self.axis] = self.level;
        p[(self.axis + 1) % 3] = u;
        p[(self.axis + 2) % 3] = v;
        p
    }
}

/// Newell's method; the result's direction encodes the loop's winding
fn newell(pts: &[Vector3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for i in 0..pts.len() {
        let p = pts[i];
        let q = pts[(i + 1) % pts.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

/// Tessellates one closed loop (first point == last) into triangles,
/// routing axis-aligned rectangles to `quads` instead
///
/// `tol` is the planarity/rectangle tolerance, a fraction of the minimum
/// grid step.
pub(crate) fn tessellate_loop(
    pts: &[Vector3<f64>],
    tol: f64,
    tris: &mut Vec<Triangle>,
    quads: &mut Vec<Quad>,
) {
    debug_assert!(pts.first() == pts.last());
    let mut ring: Vec<Vector3<f64>> = pts[..pts.len() - 1].to_vec();
    ring.dedup();
    while ring.len() > 1 && ring.last() == ring.first() {
        ring.pop();
    }

    // Drop colinear midpoints so slivers don't confuse the ear test
    let mut i = 0;
    while ring.len() >= 3 && i < ring.len() {
        let n = ring.len();
        let a = ring[(i + n - 1) % n];
        let b = ring[i];
        let c = ring[(i + 1) % n];
        if (b - a).cross(&(c - a)).norm_squared() <= tol * tol * 1e-12 {
            ring.remove(i);
        } else {
            i += 1;
        }
    }
    if ring.len() < 3 {
        return;
    }

    if ring.len() == 3 {
        tris.push([ring[0], ring[1], ring[2]]);
        return;
    }
    if let Some(q) = as_rectangle(&ring, tol) {
        quads.push(q);
        return;
    }
    ear_clip(&ring, tris);
}

/// Recognizes a four-point loop as an axis-aligned rectangle
fn as_rectangle(ring: &[Vector3<f64>], tol: f64) -> Option<Quad> {
    if ring.len() != 4 {
        return None;
    }
    'axis: for axis in 0..3 {
        let level = ring[0][axis];
        for p in &ring[1..] {
            if (p[axis] - level).abs() > tol {
                continue 'axis;
            }
        }
        let ua = (axis + 1) % 3;
        let va = (axis + 2) % 3;
        let us: Vec<f64> = ring.iter().map(|p| p[ua]).collect();
        let vs: Vec<f64> = ring.iter().map(|p| p[va]).collect();
        let (u0, u1) = (
            us.iter().cloned().fold(f64::INFINITY, f64::min),
            us.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        );
        let (v0, v1) = (
            vs.iter().cloned().fold(f64::INFINITY, f64::min),
            vs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        );
        // Each in-plane coordinate must sit on one of the two extremes,
        // and consecutive corners must differ in exactly one coordinate
        let on_edge = |x: f64, a: f64, b: f64| {
            (x - a).abs() <= tol || (x - b).abs() <= tol
        };
        if !us.iter().all(|u| on_edge(*u, u0, u1))
            || !vs.iter().all(|v| on_edge(*v, v0, v1))
        {
            continue;
        }
        for i in 0..4 {
            let du = (us[i] - us[(i + 1) % 4]).abs() > tol;
            let dv = (vs[i] - vs[(i + 1) % 4]).abs() > tol;
            if du == dv {
                continue 'axis;
            }
        }
        return Some(Quad {
            axis,
            level,
            lo: Vector2::new(u0, v0),
            hi: Vector2::new(u1, v1),
            flip: newell(ring)[axis] < 0.0,
        });
    }
    None
}

/// Ear clipping in the loop's plane
///
/// The loop is projected onto the plane of its Newell normal; winding
/// about that normal is positive by construction, so emitted triangles
/// inherit the loop's orientation.
fn ear_clip(ring: &[Vector3<f64>], tris: &mut Vec<Triangle>) {
    let n = newell(ring).normalize();
    // Build an in-plane basis from the least-aligned coordinate axis
    let mut seed = Vector3::zeros();
    seed[n.iamin()] = 1.0;
    let e1 = n.cross(&seed).normalize();
    let e2 = n.cross(&e1);

    let mut idx: Vec<usize> = (0..ring.len()).collect();
    let flat: Vec<Vector2<f64>> = ring
        .iter()
        .map(|p| Vector2::new(p.dot(&e1), p.dot(&e2)))
        .collect();
    let cross2 = |a: Vector2<f64>, b: Vector2<f64>| a.x * b.y - a.y * b.x;

    while idx.len() > 3 {
        let m = idx.len();
        let mut clipped = false;
        for i in 0..m {
            let (pa, pb, pc) =
                (flat[idx[(i + m - 1) % m]], flat[idx[i]], flat[idx[(i + 1) % m]]);
            if cross2(pb - pa, pc - pa) <= 0.0 {
                continue; // reflex corner
            }
            // No other vertex may sit inside the candidate ear
            let blocked = (0..m)
                .filter(|j| {
                    *j != i && *j != (i + m - 1) % m && *j != (i + 1) % m
                })
                .any(|j| {
                    let p = flat[idx[j]];
                    cross2(pb - pa, p - pa) > 0.0
                        && cross2(pc - pb, p - pb) > 0.0
                        && cross2(pa - pc, p - pc) > 0.0
                });
            if blocked {
                continue;
            }
            tris.push([
                ring[idx[(i + m - 1) % m]],
                ring[idx[i]],
                ring[idx[(i + 1) % m]],
            ]);
            idx.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            // Numerically degenerate remainder: fan it and stop
            for i in 1..m - 1 {
                tris.push([ring[idx[0]], ring[idx[i]], ring[idx[i + 1]]]);
            }
            return;
        }
    }
    tris.push([ring[idx[0]], ring[idx[1]], ring[idx[2]]]);
}
