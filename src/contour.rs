//! 2D contour extraction
//!
//! [`get_contour`] samples the field over a uniform grid, locates the zero
//! crossing on every grid edge, emits oriented boundary segments per cell,
//! and stitches them into closed polylines. The object interior lies on
//! the left of every returned polyline, so outer boundaries wind
//! counterclockwise and holes wind clockwise.

use crate::{
    face::{face_segments, Crossings},
    grid::{check_resolution, GridAxis, SLICE_CHUNK},
    interp::zero_crossing,
    stitch::stitch_loops,
    Error, Field2,
};
use nalgebra::Vector2;
use rayon::prelude::*;

/// An ordered sequence of 2D points; closed iff first equals last
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    /// Vertex positions, in traversal order
    pub points: Vec<Vector2<f64>>,
}

impl Polyline {
    /// Checks whether the polyline's first point equals its last
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 2 && self.points.first() == self.points.last()
    }

    /// Shoelace area: positive for counterclockwise traversal
    pub fn signed_area(&self) -> f64 {
        let p = &self.points;
        let mut sum = 0.0;
        for i in 1..p.len() {
            sum += p[i - 1].x * p[i].y - p[i].x * p[i - 1].y;
        }
        sum / 2.0
    }
}

/// Extracts the boundary of `{(x, y) : field(x, y) <= 0}` within the box
/// `[p1, p2]` as a set of closed polylines
///
/// `res` is the desired step size per axis; the actual step is shrunk so
/// the box divides evenly. Returns an empty list when the box is empty and
/// [`Error::InvalidResolution`] when `res` is not positive and finite.
pub fn get_contour(
    p1: Vector2<f64>,
    p2: Vector2<f64>,
    res: Vector2<f64>,
    field: &impl Field2,
) -> Result<Vec<Polyline>, Error> {
    check_resolution(&[res.x, res.y])?;
    let (Some(ax), Some(ay)) = (
        GridAxis::new(p1.x, p2.x, res.x),
        GridAxis::new(p1.y, p2.y, res.y),
    ) else {
        return Ok(vec![]);
    };
    log::trace!(
        "contour sweep over {} x {} cells",
        ax.cells,
        ay.cells
    );

    let xs = ax.coords();
    let ys = ay.coords();
    let w = ax.samples();
    let h = ay.samples();

    // Corner value cache, row-major, built once and then read-only
    let mut corners = vec![0.0; w * h];
    corners
        .par_chunks_mut(w)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(j, row)| {
            for (i, v) in row.iter_mut().enumerate() {
                *v = field.eval(xs[i], ys[j]);
            }
        });
    let corners = corners;

    // Edge crossing caches; adjacent cells read the same entry, which is
    // what keeps the stitched contour free of gaps
    let mut mid_x = vec![0.0; w * h];
    mid_x
        .par_chunks_mut(w)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(j, row)| {
            let y = ys[j];
            for i in 0..w - 1 {
                row[i] = zero_crossing(
                    (xs[i], corners[j * w + i]),
                    (xs[i + 1], corners[j * w + i + 1]),
                    |x| field.eval(x, y),
                );
            }
        });
    let mid_x = mid_x;

    let mut mid_y = vec![0.0; w * h];
    mid_y
        .par_chunks_mut(w)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(j, row)| {
            if j + 1 == h {
                return;
            }
            for (i, m) in row.iter_mut().enumerate() {
                *m = zero_crossing(
                    (ys[j], corners[j * w + i]),
                    (ys[j + 1], corners[(j + 1) * w + i]),
                    |y| field.eval(xs[i], y),
                );
            }
        });
    let mid_y = mid_y;

    let min_step = ax.step.min(ay.step);
    let g = |x: f64, y: f64| field.eval(x, y);

    // One work item per cell row; rows are independent and collected in
    // row order, so the output is deterministic under work stealing
    let segs: Vec<Vec<Vector2<f64>>> = (0..ay.cells)
        .into_par_iter()
        .with_min_len(SLICE_CHUNK)
        .map(|j| {
            let mut row_segs = vec![];
            for i in 0..ax.cells {
                let c = [
                    corners[j * w + i],
                    corners[j * w + i + 1],
                    corners[(j + 1) * w + i],
                    corners[(j + 1) * w + i + 1],
                ];
                let m = Crossings {
                    bot: mid_x[j * w + i],
                    top: mid_x[(j + 1) * w + i],
                    left: mid_y[j * w + i],
                    right: mid_y[j * w + i + 1],
                };
                row_segs.extend(face_segments(
                    (xs[i], ys[j]),
                    (xs[i + 1], ys[j + 1]),
                    &g,
                    c,
                    m,
                    min_step,
                ));
            }
            row_segs
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    let loops = stitch_loops(segs, min_step * 1e-6);
    Ok(loops
        .into_iter()
        .filter_map(|l| clean_loop(l, min_step, field))
        .collect())
}

/// Collapses colinear runs, drops degenerate loops, and repairs the
/// winding so the interior stays on the left of traversal
fn clean_loop(
    mut pts: Vec<Vector2<f64>>,
    min_step: f64,
    field: &impl Field2,
) -> Option<Polyline> {
    // Work on the open ring; the closing duplicate is restored at the end
    pts.pop();
    pts.dedup();

    let area_tol = min_step * min_step * 1e-9;
    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < pts.len() && pts.len() >= 3 {
            let n = pts.len();
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            let a = pts[i] - prev;
            let b = next - prev;
            if (a.x * b.y - a.y * b.x).abs() <= area_tol {
                pts.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    if pts.len() < 3 {
        return None;
    }

    // Probe just left of the longest edge; the interior must be there
    let n = pts.len();
    let longest = (0..n)
        .max_by(|a, b| {
            let la = (pts[(a + 1) % n] - pts[*a]).norm_squared();
            let lb = (pts[(b + 1) % n] - pts[*b]).norm_squared();
            la.total_cmp(&lb)
        })
        .unwrap();
    let p = pts[longest];
    let d = (pts[(longest + 1) % n] - p).normalize();
    let probe = (p + pts[(longest + 1) % n]) / 2.0
        + Vector2::new(-d.y, d.x) * (min_step * 0.01);
    if field.eval(probe.x, probe.y) > 0.0 {
        pts.reverse();
    }

    let first = pts[0];
    pts.push(first);
    Some(Polyline { points: pts })
}
