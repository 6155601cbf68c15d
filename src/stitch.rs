//! Stitching oriented segments into closed loops
//!
//! Segments arrive as a bag of short oriented polylines; every closed
//! boundary appears as a chain of them, with each polyline's tail matching
//! the next one's head. Chains are recovered by indexing heads in a hash
//! map keyed on quantized coordinates and walking successors until the
//! start point comes back around.
//!
//! A chain that dead-ends indicates an upstream inconsistency (or a field
//! that violates the intermediate-value theorem on a cell edge); it is
//! dropped with a diagnostic rather than emitted as an open loop.

use nalgebra::SVector;
use std::collections::HashMap;

/// Quantized endpoint key; the tolerance is far below one grid step, so
/// distinct crossings never collide while identical crossings always do
fn key<const D: usize>(p: &SVector<f64, D>, inv_eps: f64) -> [i64; D] {
    let mut out = [0; D];
    for i in 0..D {
        out[i] = (p[i] * inv_eps).round() as i64;
    }
    out
}

/// Joins oriented polylines into closed loops
///
/// Every input is consumed exactly once; the returned loops have their
/// first point repeated at the end. Inputs that cannot be chained into a
/// closed loop are discarded.
pub(crate) fn stitch_loops<const D: usize>(
    mut segs: Vec<Vec<SVector<f64, D>>>,
    eps: f64,
) -> Vec<Vec<SVector<f64, D>>> {
    let inv_eps = 1.0 / eps;
    let mut heads: HashMap<[i64; D], Vec<usize>> = HashMap::new();
    for (i, s) in segs.iter().enumerate() {
        debug_assert!(s.len() >= 2);
        heads.entry(key(&s[0], inv_eps)).or_default().push(i);
    }

    let mut used = vec![false; segs.len()];
    let mut loops = vec![];
    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut path = std::mem::take(&mut segs[i]);
        let start = key(&path[0], inv_eps);
        loop {
            let tail = key(path.last().unwrap(), inv_eps);
            if tail == start {
                // Snap the duplicated endpoint so first == last exactly
                *path.last_mut().unwrap() = path[0];
                loops.push(path);
                break;
            }
            let next = heads
                .get(&tail)
                .and_then(|c| c.iter().find(|j| !used[**j]))
                .copied();
            let Some(j) = next else {
                log::warn!(
                    "dropping unclosed boundary chain of {} points",
                    path.len()
                );
                break;
            };
            used[j] = true;
            // The successor's head duplicates our tail
            path.extend(segs[j].drain(..).skip(1));
        }
    }
    loops
}
