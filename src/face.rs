//! Per-face boundary segments
//!
//! A face is one 2D cell of the sampling grid: four signed corner values
//! plus the four edge crossings computed by the interpolator. The sixteen
//! corner sign patterns collapse to the marching-squares cases, each
//! emitting zero, one, or two oriented segments whose endpoints are the
//! edge crossings. Orientation puts the object interior on the left of
//! every segment.
//!
//! The two saddle patterns (corners alternating in sign) are ambiguous
//! from corner data alone; they are disambiguated by sampling the field at
//! the face center.
//!
//! Emitted segments are then refined: if the field deviates from zero at a
//! segment's midpoint, the midpoint is pulled onto the level-set along the
//! segment's in-plane normal and both halves recurse, bounded by depth and
//! by a tolerance proportional to the grid step.

use arrayvec::ArrayVec;
use nalgebra::Vector2;

/// Corner values of one face, in `(c00, c10, c01, c11)` order
///
/// `c00` is the corner at `(u0, v0)`, `c10` at `(u1, v0)`, and so on.
pub(crate) type Corners = [f64; 4];

/// Edge-crossing coordinates of one face
///
/// Entries are meaningless (and unread) on edges without a sign change.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Crossings {
    /// Crossing along `u` on the `v = v0` edge
    pub bot: f64,
    /// Crossing along `u` on the `v = v1` edge
    pub top: f64,
    /// Crossing along `v` on the `u = u0` edge
    pub left: f64,
    /// Crossing along `v` on the `u = u1` edge
    pub right: f64,
}

/// An oriented boundary piece on one face: two or more points, interior on
/// the left of traversal
pub(crate) type FaceSeg = Vec<Vector2<f64>>;

/// Emits the oriented boundary segments of one face
///
/// `g` is the field restricted to the face's plane; `res` scales the
/// refinement tolerance and is normally the smaller in-plane step.
pub(crate) fn face_segments(
    (u0, v0): (f64, f64),
    (u1, v1): (f64, f64),
    g: &impl Fn(f64, f64) -> f64,
    c: Corners,
    m: Crossings,
    res: f64,
) -> ArrayVec<FaceSeg, 2> {
    let bot = Vector2::new(m.bot, v0);
    let top = Vector2::new(m.top, v1);
    let left = Vector2::new(u0, m.left);
    let right = Vector2::new(u1, m.right);

    let inside = |v: f64| v <= 0.0;
    let mask = (
        inside(c[0]), // c00
        inside(c[1]), // c10
        inside(c[2]), // c01
        inside(c[3]), // c11
    );

    let mut pairs: ArrayVec<[Vector2<f64>; 2], 2> = ArrayVec::new();
    match mask {
        (false, false, false, false) | (true, true, true, true) => (),
        // Single corners
        (true, false, false, false) => pairs.push([bot, left]),
        (false, true, false, false) => pairs.push([right, bot]),
        (false, false, true, false) => pairs.push([left, top]),
        (false, false, false, true) => pairs.push([top, right]),
        // Half faces
        (true, true, false, false) => pairs.push([right, left]),
        (false, false, true, true) => pairs.push([left, right]),
        (true, false, true, false) => pairs.push([bot, top]),
        (false, true, false, true) => pairs.push([top, bot]),
        // Single outside corners
        (false, true, true, true) => pairs.push([left, bot]),
        (true, false, true, true) => pairs.push([bot, right]),
        (true, true, false, true) => pairs.push([top, left]),
        (true, true, true, false) => pairs.push([right, top]),
        // Saddles: the center sample decides which diagonal pair of
        // corners the boundary separates
        (false, true, true, false) => {
            if inside(g((u0 + u1) / 2.0, (v0 + v1) / 2.0)) {
                pairs.push([left, bot]);
                pairs.push([right, top]);
            } else {
                pairs.push([right, bot]);
                pairs.push([left, top]);
            }
        }
        (true, false, false, true) => {
            if inside(g((u0 + u1) / 2.0, (v0 + v1) / 2.0)) {
                pairs.push([bot, right]);
                pairs.push([top, left]);
            } else {
                pairs.push([bot, left]);
                pairs.push([top, right]);
            }
        }
    }

    let mut out = ArrayVec::new();
    for [p, q] in pairs {
        // Tangent contact collapses both crossings onto one point
        if p == q {
            continue;
        }
        out.push(refine_segment(res, g, (u0, v0), (u1, v1), p, q));
    }
    out
}

/// Maximum number of nested splits when subdividing a segment
const REFINE_DEPTH: u32 = 2;

/// Subdivides `p -> q` where the field deviates from zero at its midpoint
///
/// The corrected midpoint is the midpoint pushed along the segment's
/// in-plane normal by the sampled field value (one Newton step under a
/// unit-gradient assumption), clamped to the face rectangle.
fn refine_segment(
    res: f64,
    g: &impl Fn(f64, f64) -> f64,
    lo: (f64, f64),
    hi: (f64, f64),
    p: Vector2<f64>,
    q: Vector2<f64>,
) -> FaceSeg {
    let mut pts = vec![p];
    subdivide(0, res, g, lo, hi, p, q, &mut pts);
    pts.push(q);
    pts
}

#[allow(clippy::too_many_arguments)]
fn subdivide(
    n: u32,
    res: f64,
    g: &impl Fn(f64, f64) -> f64,
    lo: (f64, f64),
    hi: (f64, f64),
    p: Vector2<f64>,
    q: Vector2<f64>,
    out: &mut Vec<Vector2<f64>>,
) {
    if n >= REFINE_DEPTH {
        return;
    }
    let d = q - p;
    if d.norm_squared() <= res * res / 200.0 {
        return;
    }
    let mid = (p + q) / 2.0;
    let v = g(mid.x, mid.y);
    if v.abs() < res / 40.0 {
        return;
    }
    // The field is positive on the right of p -> q, so walking against the
    // right-hand normal by `v` heads toward the level-set either way
    let t = d.normalize();
    let mid = mid - Vector2::new(t.y, -t.x) * v;
    let mid = Vector2::new(
        mid.x.clamp(lo.0, hi.0),
        mid.y.clamp(lo.1, hi.1),
    );
    subdivide(n + 1, res, g, lo, hi, p, mid, out);
    out.push(mid);
    subdivide(n + 1, res, g, lo, hi, mid, q, out);
}
