//! The 3D grid sweep
//!
//! Corner values and edge crossings are cached up front (each entry
//! written by exactly one parallel task, then read-only), so the two cells
//! adjacent to a grid edge always see the same crossing point. That shared
//! view is what keeps the final mesh free of cracks.
//!
//! Cells are then processed one Z-slice per work item: each cell gathers
//! oriented segments from its six faces, stitches them into closed loops,
//! and tessellates. Slice outputs are reassembled in slice order before
//! the global quad merge, so the result is deterministic regardless of how
//! the thread pool schedules the slices.

use super::{
    merge::merge_quads,
    tessellate::{tessellate_loop, Quad},
    Mesh, Triangle,
};
use crate::{
    face::{face_segments, Crossings},
    grid::{check_resolution, GridAxis, SLICE_CHUNK},
    interp::zero_crossing,
    stitch::stitch_loops,
    Error, Field3,
};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

/// Extracts the boundary of `{p : field(p) <= 0}` within the box
/// `[p1, p2]` as a triangle mesh
///
/// `res` is the desired step size per axis; the actual step is shrunk so
/// the box divides evenly. Triangles are wound counterclockwise seen from
/// outside the object. Returns an empty mesh when the box is empty and
/// [`Error::InvalidResolution`] when `res` is not positive and finite.
pub fn get_mesh(
    p1: Vector3<f64>,
    p2: Vector3<f64>,
    res: Vector3<f64>,
    field: &impl Field3,
) -> Result<Mesh, Error> {
    check_resolution(&[res.x, res.y, res.z])?;
    let (Some(ax), Some(ay), Some(az)) = (
        GridAxis::new(p1.x, p2.x, res.x),
        GridAxis::new(p1.y, p2.y, res.y),
        GridAxis::new(p1.z, p2.z, res.z),
    ) else {
        return Ok(Mesh::new());
    };
    log::trace!(
        "mesh sweep over {} x {} x {} cells",
        ax.cells,
        ay.cells,
        az.cells
    );

    let xs = ax.coords();
    let ys = ay.coords();
    let zs = az.coords();
    let (w, h, d) = (ax.samples(), ay.samples(), az.samples());
    let slab = w * h;
    let at = |i: usize, j: usize, k: usize| (k * h + j) * w + i;

    // Corner value cache, built once and then read-only
    let mut corners = vec![0.0; slab * d];
    corners
        .par_chunks_mut(slab)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..h {
                for i in 0..w {
                    slice[j * w + i] = field.eval(xs[i], ys[j], zs[k]);
                }
            }
        });
    let corners = corners;

    // Edge crossing caches, one per axis; entries on edges without a sign
    // change hold the lower endpoint and are never read
    let mut mid_x = vec![0.0; slab * d];
    mid_x
        .par_chunks_mut(slab)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..h {
                for i in 0..w - 1 {
                    slice[j * w + i] = zero_crossing(
                        (xs[i], corners[at(i, j, k)]),
                        (xs[i + 1], corners[at(i + 1, j, k)]),
                        |x| field.eval(x, ys[j], zs[k]),
                    );
                }
            }
        });
    let mid_x = mid_x;

    let mut mid_y = vec![0.0; slab * d];
    mid_y
        .par_chunks_mut(slab)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..h - 1 {
                for i in 0..w {
                    slice[j * w + i] = zero_crossing(
                        (ys[j], corners[at(i, j, k)]),
                        (ys[j + 1], corners[at(i, j + 1, k)]),
                        |y| field.eval(xs[i], y, zs[k]),
                    );
                }
            }
        });
    let mid_y = mid_y;

    let mut mid_z = vec![0.0; slab * d];
    mid_z
        .par_chunks_mut(slab)
        .with_min_len(SLICE_CHUNK)
        .enumerate()
        .for_each(|(k, slice)| {
            if k + 1 == d {
                return;
            }
            for j in 0..h {
                for i in 0..w {
                    slice[j * w + i] = zero_crossing(
                        (zs[k], corners[at(i, j, k)]),
                        (zs[k + 1], corners[at(i, j, k + 1)]),
                        |z| field.eval(xs[i], ys[j], z),
                    );
                }
            }
        });
    let mid_z = mid_z;

    let minres = ax.step.min(ay.step).min(az.step);
    let eps = minres * 1e-6;
    let rect_tol = minres / 100.0;

    // One work item per Z-slice of cells, reassembled in slice order
    let slices: Vec<(Vec<Triangle>, Vec<Quad>)> = (0..az.cells)
        .into_par_iter()
        .with_min_len(SLICE_CHUNK)
        .map(|k| {
            let mut tris = vec![];
            let mut quads = vec![];
            for j in 0..ay.cells {
                for i in 0..ax.cells {
                    // Cells whose corners are all on one side can't hold
                    // boundary; skipping them early avoids building the
                    // per-face machinery for the (vast) empty majority
                    let mut any_in = false;
                    let mut any_out = false;
                    for (di, dj, dk) in CELL_CORNERS {
                        if corners[at(i + di, j + dj, k + dk)] <= 0.0 {
                            any_in = true;
                        } else {
                            any_out = true;
                        }
                    }
                    if !(any_in && any_out) {
                        continue;
                    }

                    let segs = cell_segments(
                        field,
                        (&xs, &ys, &zs),
                        (&corners, &mid_x, &mid_y, &mid_z),
                        (w, h),
                        (i, j, k),
                        minres,
                    );
                    for lp in stitch_loops(segs, eps) {
                        tessellate_loop(&lp, rect_tol, &mut tris, &mut quads);
                    }
                }
            }
            (tris, quads)
        })
        .collect();

    let mut mesh = Mesh::new();
    let mut quads = vec![];
    for (tris, qs) in slices {
        mesh.triangles.extend(tris);
        quads.extend(qs);
    }
    mesh.triangles.extend(merge_quads(quads, eps));
    Ok(mesh)
}

/// Corner offsets of one cell
const CELL_CORNERS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (1, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (0, 1, 1),
    (1, 1, 1),
];

type Caches<'a> = (&'a [f64], &'a [f64], &'a [f64], &'a [f64]);

/// Collects the oriented boundary segments of one cell's six faces,
/// embedded into 3D
///
/// Each face runs marching squares in a right-handed in-plane frame whose
/// `u x v` product points along `+axis` (cyclic: Z uses `(x, y)`, X uses
/// `(y, z)`, Y uses `(z, x)`). In that frame, interior-on-the-left matches
/// the orientation induced by the surface's outward normal on the cell's
/// *lower* face; segments on the *upper* face are reversed. Opposite cells
/// see the same face with opposite reversal, which is what lets per-cell
/// loops chain across the shared boundary without seams.
fn cell_segments(
    field: &impl Field3,
    (xs, ys, zs): (&[f64], &[f64], &[f64]),
    (corners, mid_x, mid_y, mid_z): Caches,
    (w, h): (usize, usize),
    (i, j, k): (usize, usize, usize),
    minres: f64,
) -> Vec<Vec<Vector3<f64>>> {
    let at = |i: usize, j: usize, k: usize| (k * h + j) * w + i;
    let mut out = vec![];
    let mut add = |segs: arrayvec::ArrayVec<Vec<Vector2<f64>>, 2>,
                   embed: &dyn Fn(Vector2<f64>) -> Vector3<f64>,
                   upper: bool| {
        for s in segs {
            let mut s3: Vec<Vector3<f64>> =
                s.into_iter().map(embed).collect();
            if upper {
                s3.reverse();
            }
            out.push(s3);
        }
    };

    // Z faces: u = x, v = y
    for (kk, upper) in [(k, false), (k + 1, true)] {
        let zc = zs[kk];
        let g = |u: f64, v: f64| field.eval(u, v, zc);
        let segs = face_segments(
            (xs[i], ys[j]),
            (xs[i + 1], ys[j + 1]),
            &g,
            [
                corners[at(i, j, kk)],
                corners[at(i + 1, j, kk)],
                corners[at(i, j + 1, kk)],
                corners[at(i + 1, j + 1, kk)],
            ],
            Crossings {
                bot: mid_x[at(i, j, kk)],
                top: mid_x[at(i, j + 1, kk)],
                left: mid_y[at(i, j, kk)],
                right: mid_y[at(i + 1, j, kk)],
            },
            minres,
        );
        add(segs, &|p| Vector3::new(p.x, p.y, zc), upper);
    }

    // X faces: u = y, v = z
    for (ii, upper) in [(i, false), (i + 1, true)] {
        let xc = xs[ii];
        let g = |u: f64, v: f64| field.eval(xc, u, v);
        let segs = face_segments(
            (ys[j], zs[k]),
            (ys[j + 1], zs[k + 1]),
            &g,
            [
                corners[at(ii, j, k)],
                corners[at(ii, j + 1, k)],
                corners[at(ii, j, k + 1)],
                corners[at(ii, j + 1, k + 1)],
            ],
            Crossings {
                bot: mid_y[at(ii, j, k)],
                top: mid_y[at(ii, j, k + 1)],
                left: mid_z[at(ii, j, k)],
                right: mid_z[at(ii, j + 1, k)],
            },
            minres,
        );
        add(segs, &|p| Vector3::new(xc, p.x, p.y), upper);
    }

    // Y faces: u = z, v = x
    for (jj, upper) in [(j, false), (j + 1, true)] {
        let yc = ys[jj];
        let g = |u: f64, v: f64| field.eval(v, yc, u);
        let segs = face_segments(
            (zs[k], xs[i]),
            (zs[k + 1], xs[i + 1]),
            &g,
            [
                corners[at(i, jj, k)],
                corners[at(i, jj, k + 1)],
                corners[at(i + 1, jj, k)],
                corners[at(i + 1, jj, k + 1)],
            ],
            Crossings {
                bot: mid_z[at(i, jj, k)],
                top: mid_z[at(i + 1, jj, k)],
                left: mid_x[at(i, jj, k)],
                right: mid_x[at(i, jj, k + 1)],
            },
            minres,
        );
        add(segs, &|p| Vector3::new(p.y, yc, p.x), upper);
    }

    out
}
