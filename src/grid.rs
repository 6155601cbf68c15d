//! Uniform grid discretization
//!
//! Both sweeps sample the field on a regular lattice. Each axis is
//! discretized independently: the step count is chosen so the actual step
//! never exceeds the requested resolution, and one extra corner sample is
//! allocated past the upper bound so neighboring-cell lookups stay in
//! bounds without per-access checks.

use crate::Error;

/// One axis of a uniform sampling grid
#[derive(Copy, Clone, Debug)]
pub(crate) struct GridAxis {
    /// Lower bound of the axis
    pub lo: f64,
    /// Actual step size, `(hi - lo) / cells`
    pub step: f64,
    /// Number of cells along the axis
    pub cells: usize,
}

impl GridAxis {
    /// Discretizes `[lo, hi]` at the requested resolution
    ///
    /// Returns `None` when the interval is empty, which callers treat as an
    /// empty output rather than an error.
    pub fn new(lo: f64, hi: f64, res: f64) -> Option<Self> {
        if !(hi > lo) {
            return None;
        }
        let cells = ((hi - lo) / res).ceil().max(1.0) as usize;
        Some(GridAxis {
            lo,
            step: (hi - lo) / cells as f64,
            cells,
        })
    }

    /// Position of corner `i`, valid for `i` in `0..self.samples()`
    pub fn coord(&self, i: usize) -> f64 {
        self.lo + self.step * i as f64
    }

    /// Number of corner samples, including the padding entry past `hi`
    pub fn samples(&self) -> usize {
        self.cells + 2
    }

    /// Collects every corner coordinate (padding included)
    pub fn coords(&self) -> Vec<f64> {
        (0..self.samples()).map(|i| self.coord(i)).collect()
    }
}

/// Validates a caller-supplied resolution vector
pub(crate) fn check_resolution(res: &[f64]) -> Result<(), Error> {
    if res.iter().all(|r| r.is_finite() && *r > 0.0) {
        Ok(())
    } else {
        Err(Error::InvalidResolution)
    }
}

/// Number of cell slices grouped into one parallel work item
///
/// Slices are cheap near the bounding box surface, so scheduling them
/// one-by-one wastes more time on coordination than on work.
pub(crate) const SLICE_CHUNK: usize = 32;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn axis_steps() {
        let ax = GridAxis::new(-1.5, 1.5, 0.5).unwrap();
        assert_eq!(ax.cells, 6);
        assert_eq!(ax.step, 0.5);
        assert_eq!(ax.samples(), 8);
        assert_eq!(ax.coord(0), -1.5);
        assert_eq!(ax.coord(6), 1.5);

        // A resolution that doesn't divide the span rounds the cell count
        // up, shrinking the actual step
        let ax = GridAxis::new(0.0, 1.0, 0.3).unwrap();
        assert_eq!(ax.cells, 4);
        assert!(ax.step <= 0.3);

        assert!(GridAxis::new(1.0, 1.0, 0.1).is_none());
        assert!(GridAxis::new(2.0, 1.0, 0.1).is_none());
    }

    #[test]
    fn resolution_validation() {
        assert!(check_resolution(&[0.1, 0.2]).is_ok());
        assert!(check_resolution(&[0.1, 0.0]).is_err());
        assert!(check_resolution(&[-1.0, 0.2]).is_err());
        assert!(check_resolution(&[f64::NAN, 0.2]).is_err());
        assert!(check_resolution(&[f64::INFINITY, 0.2]).is_err());
    }
}
