//! Delaunay triangulation via Bowyer-Watson
//!
//! Points are inserted one at a time into a triangulation seeded with a
//! super-triangle that strictly contains them. Each insertion removes every
//! triangle whose circumcircle contains the new point and re-triangulates the
//! resulting cavity by fanning its boundary edges to the new point. Triangles
//! that still touch a super-triangle vertex are discarded at the end.
//!
//! All triangles are stored counter-clockwise, so the in-circumcircle
//! determinant is positive exactly when a point lies inside.

use glam::DVec2;
use std::collections::HashMap;

use crate::error::{MapGenError, Result};

/// Super-triangle size relative to the point set's extent
const SUPER_TRIANGLE_SCALE: f64 = 100.0;

/// Twice the signed area of triangle `(a, b, c)`; positive when counter-clockwise
#[inline]
pub fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// In-circumcircle determinant for the counter-clockwise triangle `(a, b, c)`
///
/// Coordinates are taken relative to `d` before the 3x3 determinant is
/// expanded, which keeps the magnitudes small and limits cancellation.
/// Positive means `d` lies strictly inside the circumcircle.
#[inline]
pub fn in_circumcircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    let a = a - d;
    let b = b - d;
    let c = c - d;
    let a2 = a.length_squared();
    let b2 = b.length_squared();
    let c2 = c.length_squared();
    a.x * (b.y * c2 - b2 * c.y) - a.y * (b.x * c2 - b2 * c.x) + a2 * (b.x * c.y - b.y * c.x)
}

/// Compute the Delaunay triangulation of `points`
///
/// # Arguments
///
/// * `points` - Point positions; triangle indices refer into this slice
///
/// # Returns
///
/// Counter-clockwise index triples covering the convex hull of the points
///
/// # Errors
///
/// Returns `InsufficientPoints` if fewer than three points are supplied
///
/// # Example
///
/// ```rust
/// use glam::DVec2;
/// use rust_polygon_board::generation::triangulate;
///
/// let square = [
///     DVec2::new(0.0, 0.0),
///     DVec2::new(1.0, 0.0),
///     DVec2::new(1.0, 1.1),
///     DVec2::new(0.0, 1.0),
/// ];
/// let triangles = triangulate(&square).unwrap();
/// assert_eq!(triangles.len(), 2);
/// ```
pub fn triangulate(points: &[DVec2]) -> Result<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return Err(MapGenError::InsufficientPoints { found: n });
    }

    let (min, max) = points.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(lo, hi), &p| (lo.min(p), hi.max(p)),
    );
    let center = (min + max) * 0.5;
    let extent = (max - min).max_element().max(1e-9);
    let reach = extent * SUPER_TRIANGLE_SCALE;

    // Working vertex list: input points followed by the super-triangle
    let mut vertices: Vec<DVec2> = points.to_vec();
    vertices.push(center + DVec2::new(-reach, -reach));
    vertices.push(center + DVec2::new(reach, -reach));
    vertices.push(center + DVec2::new(0.0, reach));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    for (index, &point) in points.iter().enumerate() {
        let (bad, kept): (Vec<[usize; 3]>, Vec<[usize; 3]>) =
            triangles.into_iter().partition(|t| {
                in_circumcircle(vertices[t[0]], vertices[t[1]], vertices[t[2]], point) > 0.0
            });
        triangles = kept;

        // Cavity boundary: directed edges of bad triangles with no reverse twin
        let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
        for t in &bad {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        for t in &bad {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                if edge_count[&(a.min(b), a.max(b))] == 1 {
                    triangles.push(ccw(&vertices, [a, b, index]));
                }
            }
        }
    }

    triangles.retain(|t| t.iter().all(|&v| v < n));
    triangles.sort_unstable();

    tracing::trace!("Triangulated {} points into {} triangles", n, triangles.len());
    Ok(triangles)
}

/// Reorder a triangle counter-clockwise
fn ccw(vertices: &[DVec2], t: [usize; 3]) -> [usize; 3] {
    if orient(vertices[t[0]], vertices[t[1]], vertices[t[2]]) < 0.0 {
        [t[0], t[2], t[1]]
    } else {
        t
    }
}
