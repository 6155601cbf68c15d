//! Coalescing coplanar quads
//!
//! Flat axis-aligned regions of the surface arrive as one cell-sized
//! rectangle per cell. This pass repeatedly unions pairs of rectangles
//! that share a full edge in the same plane, then splits whatever remains
//! into triangle pairs with a consistent diagonal.

use super::{tessellate::Quad, Triangle};
use std::collections::BTreeMap;

/// Groups quads by plane, merges each group to a fixed point, and
/// triangulates the result
///
/// `eps` is the coordinate-matching tolerance, far below one grid step.
pub(crate) fn merge_quads(quads: Vec<Quad>, eps: f64) -> Vec<Triangle> {
    // BTreeMap keeps plane iteration order independent of hash state, so
    // the final mesh is deterministic
    let mut planes: BTreeMap<(usize, bool, i64), Vec<Quad>> = BTreeMap::new();
    for q in quads {
        let key = (q.axis, q.flip, (q.level / eps).round() as i64);
        planes.entry(key).or_default().push(q);
    }

    let mut out = vec![];
    for (_, mut group) in planes {
        loop {
            let mut merged = None;
            'search: for a in 0..group.len() {
                for b in a + 1..group.len() {
                    if let Some(u) = union_rect(&group[a], &group[b], eps) {
                        merged = Some((a, b, u));
                        break 'search;
                    }
                }
            }
            let Some((a, b, u)) = merged else { break };
            group[a] = u;
            group.remove(b);
        }
        for q in &group {
            emit(q, &mut out);
        }
    }
    out
}

/// Unions two rectangles that share a full edge, if they do
fn union_rect(a: &Quad, b: &Quad, eps: f64) -> Option<Quad> {
    let same = |x: f64, y: f64| (x - y).abs() <= eps;
    let mut u = *a;
    if same(a.lo.y, b.lo.y) && same(a.hi.y, b.hi.y) {
        // Adjacent along u
        if same(a.hi.x, b.lo.x) {
            u.hi.x = b.hi.x;
            return Some(u);
        }
        if same(b.hi.x, a.lo.x) {
            u.lo.x = b.lo.x;
            return Some(u);
        }
    }
    if same(a.lo.x, b.lo.x) && same(a.hi.x, b.hi.x) {
        // Adjacent along v
        if same(a.hi.y, b.lo.y) {
            u.hi.y = b.hi.y;
            return Some(u);
        }
        if same(b.hi.y, a.lo.y) {
            u.lo.y = b.lo.y;
            return Some(u);
        }
    }
    None
}

/// Splits a rectangle into two triangles along its lo-hi diagonal
fn emit(q: &Quad, out: &mut Vec<Triangle>) {
    let a = q.embed(q.lo.x, q.lo.y);
    let b = q.embed(q.hi.x, q.lo.y);
    let c = q.embed(q.hi.x, q.hi.y);
    let d = q.embed(q.lo.x, q.hi.y);
    if q.flip {
        out.push([a, d, c]);
        out.push([a, c, b]);
    } else {
        out.push([a, b, c]);
        out.push([a, c, d]);
    }
}
