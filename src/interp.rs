//! Zero-crossing location along a single grid edge
//!
//! Given the field values at the two ends of a grid edge, [`zero_crossing`]
//! finds the point where the field changes sign, using secant steps while
//! they make progress and falling back to bisection when they stall.
//!
//! Pure secant fails badly when the field is near-tangent to the edge at
//! one end: the surface barely dips below zero, successive estimates crawl
//! toward the crossing, and the bracket never shrinks. Progress is measured
//! by how much the replaced bracketing value shrinks; stagnation switches
//! to guaranteed-halving bisection. The total field evaluation count is
//! bounded by 9 per edge (4 secant probes plus 5 halvings).

/// How much a secant probe must shrink the bracketing value to count as
/// progress
const SECANT_PROGRESS: f64 = 0.3;

/// Locates the zero crossing of `g` between `a` and `b`
///
/// `fa` and `fb` are the (already computed) field values at the endpoints.
/// If the values do not bracket a sign change, `a` is returned unchanged
/// and the caller is expected to ignore it. The result always lies within
/// `[min(a, b), max(a, b)]`.
pub(crate) fn zero_crossing(
    (a, fa): (f64, f64),
    (b, fb): (f64, f64),
    g: impl Fn(f64) -> f64,
) -> f64 {
    if fa * fb > 0.0 {
        // No crossing on this edge
        return a;
    }
    if fa == 0.0 {
        return a;
    }
    if fb == 0.0 {
        return b;
    }
    // Orient the bracket so the positive value comes first
    if fa > fb {
        secant(1, (a, fa), (b, fb), &g)
    } else {
        secant(1, (b, fb), (a, fa), &g)
    }
}

/// Regula-falsi steps, taken while the bracketing value keeps shrinking
///
/// Invariant: `fa > 0 > fb`
fn secant(
    n: u32,
    (a, fa): (f64, f64),
    (b, fb): (f64, f64),
    g: &impl Fn(f64) -> f64,
) -> f64 {
    let mid = a + (b - a) * fa / (fa - fb);
    let v = g(mid);
    if v == 0.0 {
        mid
    } else if v > 0.0 {
        // The probe replaces the positive end of the bracket
        if v / fa < SECANT_PROGRESS && n < 4 {
            secant(n + 1, (mid, v), (b, fb), g)
        } else {
            bisect(0, (mid, v), (b, fb), g)
        }
    } else if v / fb < SECANT_PROGRESS && n < 4 {
        secant(n + 1, (a, fa), (mid, v), g)
    } else {
        bisect(0, (a, fa), (mid, v), g)
    }
}

/// Guaranteed-progress fallback for near-tangent incidences
///
/// Invariant: `fa > 0 > fb`. On exhaustion, returns whichever endpoint has
/// the smaller field magnitude.
fn bisect(
    n: u32,
    (a, fa): (f64, f64),
    (b, fb): (f64, f64),
    g: &impl Fn(f64) -> f64,
) -> f64 {
    if n >= 5 {
        return if fa.abs() < fb.abs() { a } else { b };
    }
    let mid = (a + b) / 2.0;
    let v = g(mid);
    if v == 0.0 {
        mid
    } else if v > 0.0 {
        bisect(n + 1, (mid, v), (b, fb), g)
    } else {
        bisect(n + 1, (a, fa), (mid, v), g)
    }
}
