//! Lloyd's Relaxation for uniform tile shapes
//!
//! Lloyd's Relaxation iteratively improves tile uniformity by moving each
//! seed point to the area-weighted centroid of its tile polygon.

use glam::DVec2;
use std::time::Instant;

use super::dual::{DualGraph, DualOptions};
use super::points::{Bounds, SeedPoint};

/// Polygons with less absolute area than this fall back to the vertex mean
const DEGENERATE_AREA: f64 = 1e-12;

/// Options for Lloyd's relaxation algorithm
#[derive(Debug, Clone, Copy)]
pub struct LloydOptions {
    /// Maximum number of iterations to run
    pub max_iterations: usize,
    /// Convergence threshold - stop when max displacement < this value
    /// Set to 0.0 to disable early termination
    pub convergence_threshold: f64,
}

impl Default for LloydOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            convergence_threshold: 0.01,
        }
    }
}

/// Signed polygon area via the shoelace formula; positive when counter-clockwise
pub fn polygon_area(vertices: &[DVec2]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum::<f64>()
        * 0.5
}

/// Area-weighted polygon centroid
///
/// Uses the standard signed-area formula; polygons with (near) zero area
/// fall back to the mean of their vertices. Returns `None` for fewer than
/// three vertices.
pub fn polygon_centroid(vertices: &[DVec2]) -> Option<DVec2> {
    if vertices.len() < 3 {
        return None;
    }
    let n = vertices.len();
    let area = polygon_area(vertices);
    if area.abs() < DEGENERATE_AREA {
        let sum: DVec2 = vertices.iter().copied().sum();
        return Some(sum / n as f64);
    }

    let mut weighted = DVec2::ZERO;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        weighted += (a + b) * a.perp_dot(b);
    }
    Some(weighted / (6.0 * area))
}

/// Move each target point to its tile centroid, clamped to `bounds`
///
/// Targets whose tile is not interior (edge or ineligible tiles) keep their
/// position so the outer boundary stays stable.
///
/// # Returns
///
/// Maximum displacement of any moved point
pub fn relax_points(
    points: &mut [SeedPoint],
    graph: &DualGraph,
    targets: &[usize],
    bounds: &Bounds,
) -> f64 {
    let mut max_displacement: f64 = 0.0;

    for &index in targets {
        if !graph.is_interior(index) {
            continue;
        }
        let Some(centroid) = graph.tile_centroid(index) else {
            continue;
        };
        let new_position = bounds.clamp(centroid);
        let displacement = points[index].position.distance(new_position);
        max_displacement = max_displacement.max(displacement);
        points[index].position = new_position;
    }

    max_displacement
}

/// Apply plain Lloyd's Relaxation to every interior point
///
/// # Algorithm
///
/// For each iteration:
/// 1. Triangulate the current points and build the dual graph
/// 2. Move every interior point to the centroid of its tile polygon
/// 3. Stop early once the largest displacement drops below
///    `convergence_threshold * scale`
///
/// A failed triangulation ends relaxation with the points as they are.
///
/// # Arguments
///
/// * `points` - Initial point distribution
/// * `bounds` - Sampling rectangle points are clamped to
/// * `scale` - Typical tile spacing, the unit of the convergence threshold
/// * `dual` - Dual graph construction options
/// * `options` - Relaxation options (max iterations, convergence threshold)
pub fn lloyd_relaxation_with_options(
    mut points: Vec<SeedPoint>,
    bounds: &Bounds,
    scale: f64,
    dual: &DualOptions,
    options: LloydOptions,
) -> Vec<SeedPoint> {
    let convergence_threshold = options.convergence_threshold * scale;
    let total_start = Instant::now();

    tracing::debug!(
        "[Lloyd] Starting: {} points, max {} iterations, threshold {:.4} (abs: {:.4})",
        points.len(),
        options.max_iterations,
        options.convergence_threshold,
        convergence_threshold
    );

    let mut iterations_run = 0;
    let mut converged = false;

    for iteration in 0..options.max_iterations {
        let iter_start = Instant::now();

        let positions: Vec<DVec2> = points.iter().map(|p| p.position).collect();
        let graph = match DualGraph::build(&positions, dual) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::warn!("[Lloyd] Iter {}: {}, keeping current points", iteration + 1, err);
                break;
            }
        };

        let targets: Vec<usize> = (0..points.len()).collect();
        let max_displacement = relax_points(&mut points, &graph, &targets, bounds);
        iterations_run = iteration + 1;

        tracing::debug!(
            "[Lloyd] Iter {}: total={:?}, max_disp={:.4}",
            iteration + 1,
            iter_start.elapsed(),
            max_displacement
        );

        if convergence_threshold > 0.0 && max_displacement < convergence_threshold {
            converged = true;
            tracing::debug!(
                "[Lloyd] Converged at iteration {} (max_disp {:.4} < threshold {:.4})",
                iteration + 1,
                max_displacement,
                convergence_threshold
            );
            break;
        }
    }

    tracing::debug!(
        "[Lloyd] Finished: {} iterations (of max {}), converged={}, total={:?}",
        iterations_run,
        options.max_iterations,
        converged,
        total_start.elapsed()
    );

    points
}
