//! Tile shape regularization
//!
//! Bounds shape irregularity before the landmass is carved. Each round:
//!
//! 1. Interior tiles with exactly four Voronoi neighbours are merged with
//!    their nearest neighbour; the pair is replaced by a single point at the
//!    midpoint.
//! 2. Interior tiles whose area falls outside 75%..125% of the median interior
//!    area are flagged, together with their immediate neighbours.
//! 3. Points within two Voronoi steps of a merge and the flagged points are
//!    moved to their tile centroid (Lloyd step).
//!
//! The triangulation and dual graph are rebuilt from scratch after every
//! change. A round whose rebuild fails is abandoned and the last good graph
//! is returned.

use glam::DVec2;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::dual::{DualGraph, DualOptions};
use super::lloyd::relax_points;
use super::points::{Bounds, SeedPoint};
use crate::config::MAX_REGULARIZATION_ITERATIONS;
use crate::error::{MapGenError, Result};

/// Options for the regularizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularizerOptions {
    /// Maximum number of rounds
    pub max_iterations: usize,
    /// Tiles below this fraction of the median area are outliers
    pub area_low: f64,
    /// Tiles above this fraction of the median area are outliers
    pub area_high: f64,
    /// Voronoi steps around a merged point that get relaxed
    pub merge_relax_hops: usize,
}

impl Default for RegularizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: MAX_REGULARIZATION_ITERATIONS,
            area_low: 0.75,
            area_high: 1.25,
            merge_relax_hops: 2,
        }
    }
}

/// Result of regularization
#[derive(Debug, Clone)]
pub struct Regularized {
    /// Final seed points
    pub points: Vec<SeedPoint>,
    /// Dual graph built from `points`
    pub graph: DualGraph,
    /// Rounds that completed
    pub iterations: usize,
    /// Point pairs merged over all rounds
    pub merges: usize,
}

/// Eligible tiles with exactly four Voronoi neighbours
///
/// Edge tiles count as long as they are not ineligible. Open hull tiles are
/// skipped since their neighbour count says nothing about their shape.
pub fn four_sided_tiles(graph: &DualGraph) -> Vec<usize> {
    (0..graph.len())
        .filter(|&i| {
            let tile = &graph.tiles[i];
            !tile.ineligible && !tile.is_degenerate() && tile.voronoi_neighbors.len() == 4
        })
        .collect()
}

/// Pair each four-sided tile with its nearest Voronoi neighbour
///
/// Targets are visited in index order; a point already claimed by an earlier
/// pair is not merged again this round.
pub fn merge_pairs(graph: &DualGraph) -> Vec<(usize, usize)> {
    let mut used: HashSet<usize> = HashSet::new();
    let mut pairs = Vec::new();

    for target in four_sided_tiles(graph) {
        if used.contains(&target) {
            continue;
        }
        let Some(partner) = graph.nearest_voronoi_neighbor(target) else {
            continue;
        };
        if used.contains(&partner) {
            continue;
        }
        used.insert(target);
        used.insert(partner);
        pairs.push((target, partner));
    }

    pairs
}

/// Run one merge round over `points`, whose dual graph is `graph`
///
/// Each pair collapses into the target point, moved to the pair's midpoint;
/// the partner is removed. Surviving points keep their relative order.
///
/// # Returns
///
/// Ids of the points that absorbed a partner
pub fn merge_four_sided(points: &mut Vec<SeedPoint>, graph: &DualGraph) -> Vec<usize> {
    let pairs = merge_pairs(graph);
    if pairs.is_empty() {
        return Vec::new();
    }

    let mut removed: HashSet<usize> = HashSet::new();
    let mut merged_ids = Vec::with_capacity(pairs.len());
    for &(target, partner) in &pairs {
        let midpoint = (points[target].position + points[partner].position) * 0.5;
        tracing::trace!(
            "Merging point {} into {} at ({:.4}, {:.4})",
            points[partner].id,
            points[target].id,
            midpoint.x,
            midpoint.y
        );
        points[target].position = midpoint;
        merged_ids.push(points[target].id);
        removed.insert(partner);
    }

    let mut index = 0;
    points.retain(|_| {
        let keep = !removed.contains(&index);
        index += 1;
        keep
    });

    merged_ids
}

/// Interior tiles whose area lies outside the `[low, high]` band around the
/// median interior area, plus their Voronoi neighbours
pub fn area_outliers(graph: &DualGraph, low: f64, high: f64) -> Vec<usize> {
    let areas: Vec<(usize, f64)> = (0..graph.len())
        .filter(|&i| graph.is_interior(i))
        .map(|i| (i, graph.tile_area(i)))
        .collect();
    if areas.is_empty() {
        return Vec::new();
    }

    let median = median(areas.iter().map(|&(_, a)| a).collect());
    let outliers: Vec<usize> = areas
        .iter()
        .filter(|&&(_, area)| area > median * high || area < median * low)
        .map(|&(i, _)| i)
        .collect();

    graph.voronoi_within(&outliers, 1)
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}

/// Triangulate `points` and build the dual graph, treating an empty result
/// as a collapse of round `iteration`
fn rebuild(points: &[SeedPoint], dual: &DualOptions, iteration: usize) -> Result<DualGraph> {
    let positions: Vec<DVec2> = points.iter().map(|p| p.position).collect();
    let graph = DualGraph::build(&positions, dual)?;
    if graph.valid_triangle_count() == 0 {
        return Err(MapGenError::TriangulationCollapsed { iteration });
    }
    Ok(graph)
}

/// Regularize the tiling of `points`
///
/// # Errors
///
/// Only the initial build can fail (`InsufficientPoints`,
/// `TriangulationCollapsed`); later failures end regularization early with
/// the last good graph.
pub fn regularize(
    points: Vec<SeedPoint>,
    bounds: &Bounds,
    dual: &DualOptions,
    options: &RegularizerOptions,
) -> Result<Regularized> {
    let start = Instant::now();
    let mut graph = rebuild(&points, dual, 0)?;
    let mut points = points;
    let mut iterations = 0;
    let mut merges = 0;

    for iteration in 0..options.max_iterations {
        let four_sided = four_sided_tiles(&graph);
        let outliers = area_outliers(&graph, options.area_low, options.area_high);
        tracing::debug!(
            "[Regularize] Round {}: {} four-sided tiles, {} area targets",
            iteration + 1,
            four_sided.len(),
            outliers.len()
        );
        if four_sided.is_empty() && outliers.is_empty() {
            break;
        }

        let outlier_ids: Vec<usize> = outliers.iter().map(|&i| points[i].id).collect();
        let mut candidate = points.clone();
        let merged_ids = merge_four_sided(&mut candidate, &graph);

        let merged_graph = if merged_ids.is_empty() {
            None
        } else {
            match rebuild(&candidate, dual, iteration) {
                Ok(g) => Some(g),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(
                        "[Regularize] Round {} abandoned after merge: {}",
                        iteration + 1,
                        err
                    );
                    break;
                }
                Err(err) => return Err(err),
            }
        };
        let relax_graph = merged_graph.as_ref().unwrap_or(&graph);

        let index_of: HashMap<usize, usize> = candidate
            .iter()
            .enumerate()
            .map(|(index, p)| (p.id, index))
            .collect();
        let merged_indices: Vec<usize> = merged_ids
            .iter()
            .filter_map(|id| index_of.get(id).copied())
            .collect();
        let mut targets = relax_graph.voronoi_within(&merged_indices, options.merge_relax_hops);
        targets.extend(outlier_ids.iter().filter_map(|id| index_of.get(id).copied()));
        targets.sort_unstable();
        targets.dedup();

        relax_points(&mut candidate, relax_graph, &targets, bounds);

        match rebuild(&candidate, dual, iteration) {
            Ok(g) => {
                graph = g;
                points = candidate;
            }
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    "[Regularize] Round {} abandoned after relaxation: {}",
                    iteration + 1,
                    err
                );
                break;
            }
            Err(err) => return Err(err),
        }

        iterations = iteration + 1;
        merges += merged_ids.len();

        if four_sided.is_empty() {
            break;
        }
    }

    tracing::debug!(
        "[Regularize] Finished: {} rounds, {} merges, {} points, total={:?}",
        iterations,
        merges,
        points.len(),
        start.elapsed()
    );

    Ok(Regularized {
        points,
        graph,
        iterations,
        merges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::points::{generate_hex_points, generate_poisson_points};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    /// A centre point with exactly four neighbours, the nearest at (0.9, 0),
    /// inside a ring of eight hull points
    fn four_sided_fixture() -> Vec<SeedPoint> {
        let mut positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.9, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(-1.0, 0.0),
            DVec2::new(0.0, -1.0),
        ];
        for k in 0..8 {
            let angle = PI / 8.0 + k as f64 * PI / 4.0;
            positions.push(DVec2::new(angle.cos(), angle.sin()) * 3.0);
        }
        positions
            .into_iter()
            .enumerate()
            .map(|(id, p)| SeedPoint::new(id, p))
            .collect()
    }

    fn build(points: &[SeedPoint]) -> DualGraph {
        let positions: Vec<DVec2> = points.iter().map(|p| p.position).collect();
        DualGraph::build(&positions, &DualOptions::default()).unwrap()
    }

    #[test]
    fn test_fixture_has_four_sided_centre() {
        let points = four_sided_fixture();
        let graph = build(&points);
        assert!(graph.is_interior(0));
        assert_eq!(graph.tiles[0].voronoi_neighbors, vec![1, 2, 3, 4]);
        assert!(four_sided_tiles(&graph).contains(&0));
        assert_eq!(graph.nearest_voronoi_neighbor(0), Some(1));
    }

    #[test]
    fn test_merge_collapses_to_midpoint() {
        let mut points = four_sided_fixture();
        let graph = build(&points);
        let merged = merge_four_sided(&mut points, &graph);

        assert!(merged.contains(&0));
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|p| p.id != 1), "partner should be removed");

        let survivor = points.iter().find(|p| p.id == 0).unwrap();
        assert_relative_eq!(survivor.position.x, 0.45, epsilon = 1e-12);
        assert_relative_eq!(survivor.position.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_four_sided_includes_edge_tiles() {
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let points = generate_poisson_points(150, &Bounds::square(6.0), &mut rng);
            let graph = build(&points);
            let four_sided = four_sided_tiles(&graph);

            for i in 0..graph.len() {
                let tile = &graph.tiles[i];
                let expected = !tile.ineligible && tile.voronoi_neighbors.len() == 4;
                assert_eq!(four_sided.contains(&i), expected, "seed {} tile {}", seed, i);
            }
        }
    }

    #[test]
    fn test_each_point_merges_once_per_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let points = generate_poisson_points(150, &Bounds::square(6.0), &mut rng);
        let graph = build(&points);
        let pairs = merge_pairs(&graph);

        let mut seen = HashSet::new();
        for (a, b) in pairs {
            assert!(seen.insert(a), "point {} merged twice", a);
            assert!(seen.insert(b), "point {} merged twice", b);
            assert!(graph.tiles[a].voronoi_neighbors.contains(&b));
        }
    }

    #[test]
    fn test_regular_grid_has_no_violations() {
        let points = generate_hex_points(5, 1.0);
        let graph = build(&points);
        assert!(four_sided_tiles(&graph).is_empty());
        assert!(area_outliers(&graph, 0.75, 1.25).is_empty());

        let result = regularize(
            points,
            &Bounds::square(10.0),
            &DualOptions::default(),
            &RegularizerOptions::default(),
        )
        .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.merges, 0);
        assert_eq!(result.points.len(), 91);
    }

    #[test]
    fn test_area_outliers_flag_enlarged_tile_and_neighbors() {
        // Spread ring 1 outward so the centre tile grows past the band
        let mut points = generate_hex_points(4, 1.0);
        for p in &mut points[1..7] {
            p.position *= 1.3;
        }
        let graph = build(&points);
        let targets = area_outliers(&graph, 0.75, 1.25);
        assert!(targets.contains(&0));
        for n in &graph.tiles[0].voronoi_neighbors {
            assert!(targets.contains(n));
        }
    }

    #[test]
    fn test_regularize_keeps_graph_in_sync() {
        let bounds = Bounds::square(7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let points = generate_poisson_points(160, &bounds, &mut rng);
        let before = points.len();
        let result = regularize(
            points,
            &bounds,
            &DualOptions::default(),
            &RegularizerOptions::default(),
        )
        .unwrap();

        assert!(result.iterations <= MAX_REGULARIZATION_ITERATIONS);
        assert_eq!(result.points.len(), before - result.merges);
        assert_eq!(result.graph.len(), result.points.len());
        for (p, &q) in result.points.iter().zip(result.graph.positions.iter()) {
            assert_eq!(p.position, q);
            assert!(bounds.contains(q));
        }

        // Ids stay unique through merges
        let ids: HashSet<usize> = result.points.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), result.points.len());
    }

    #[test]
    fn test_regularize_determinism() {
        let bounds = Bounds::square(7.0);
        let run = || {
            let mut rng = ChaCha8Rng::seed_from_u64(77);
            let points = generate_poisson_points(120, &bounds, &mut rng);
            regularize(points, &bounds, &DualOptions::default(), &RegularizerOptions::default())
                .unwrap()
                .points
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_regularize_insufficient_points() {
        let points = vec![SeedPoint::new(0, DVec2::ZERO), SeedPoint::new(1, DVec2::X)];
        let result = regularize(
            points,
            &Bounds::square(1.0),
            &DualOptions::default(),
            &RegularizerOptions::default(),
        );
        assert!(matches!(result, Err(MapGenError::InsufficientPoints { found: 2 })));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
