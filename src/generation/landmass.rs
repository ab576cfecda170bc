//! Landmass selection and coastline shaping
//!
//! Picks a connected set of eligible tiles as land, roughens its coastline,
//! derives the surrounding water ring and repairs coast tiles whose water
//! neighbours are split into several runs.

use glam::DVec2;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, VecDeque};

use super::dual::{order_by_angle, DualGraph};

/// Maximum passes of the isolated-tile repair
const REPAIR_PASSES: usize = 3;

/// How land grows from the seed tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Seed plus every eligible tile within this many Voronoi rings
    Rings(usize),
    /// Random frontier expansion up to the target tile count
    Frontier(usize),
}

/// Options for landmass shaping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmassOptions {
    /// Growth strategy
    pub growth: Growth,
    /// Coastline erosion/accretion rounds
    pub erosion_rounds: usize,
}

/// Land and water partition of the tile candidates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Landmass {
    /// Tile the land grew from
    pub seed: Option<usize>,
    /// Land tile indices
    pub land: BTreeSet<usize>,
    /// Water tile indices (eligible tiles bordering land)
    pub water: BTreeSet<usize>,
}

/// Shape the landmass on `graph` around `center`
///
/// # Arguments
///
/// * `graph` - Regularized dual graph
/// * `center` - Centre of the sampling region
/// * `options` - Growth strategy and erosion rounds
/// * `rng` - Random source for frontier and erosion choices
pub fn shape_landmass(
    graph: &DualGraph,
    center: DVec2,
    options: &LandmassOptions,
    rng: &mut ChaCha8Rng,
) -> Landmass {
    let Some(seed) = select_seed(graph, center) else {
        tracing::warn!("No eligible tile for the landmass seed");
        return Landmass::default();
    };

    let mut land = match options.growth {
        Growth::Rings(rings) => grow_rings(graph, seed, rings),
        Growth::Frontier(target) => grow_frontier(graph, seed, target, rng),
    };
    let grown = land.len();

    for _ in 0..options.erosion_rounds {
        erode_round(graph, seed, &mut land, rng);
    }

    for _ in 0..REPAIR_PASSES {
        if !repair_coast(graph, &mut land) {
            break;
        }
    }

    let water = derive_water(graph, &land);

    tracing::debug!(
        "Landmass: seed {}, grown {} tiles, final {} land, {} water",
        seed,
        grown,
        land.len(),
        water.len()
    );

    Landmass {
        seed: Some(seed),
        land,
        water,
    }
}

/// The land-eligible tile nearest `center`
pub fn select_seed(graph: &DualGraph, center: DVec2) -> Option<usize> {
    (0..graph.len())
        .filter(|&i| graph.can_be_land(i))
        .min_by(|&a, &b| {
            graph.positions[a]
                .distance_squared(center)
                .total_cmp(&graph.positions[b].distance_squared(center))
                .then(a.cmp(&b))
        })
}

/// Seed plus every land-eligible tile reachable within `rings` Voronoi steps
/// through land-eligible tiles
pub fn grow_rings(graph: &DualGraph, seed: usize, rings: usize) -> BTreeSet<usize> {
    let mut land = BTreeSet::from([seed]);
    let mut queue = VecDeque::from([(seed, 0usize)]);

    while let Some((tile, depth)) = queue.pop_front() {
        if depth == rings {
            continue;
        }
        for &n in &graph.tiles[tile].voronoi_neighbors {
            if graph.can_be_land(n) && land.insert(n) {
                queue.push_back((n, depth + 1));
            }
        }
    }

    land
}

/// Random frontier expansion from `seed` up to `target` tiles
///
/// Repeatedly picks a random frontier tile and adds its shuffled
/// land-eligible neighbours until the target is reached or the frontier is
/// exhausted.
pub fn grow_frontier(
    graph: &DualGraph,
    seed: usize,
    target: usize,
    rng: &mut ChaCha8Rng,
) -> BTreeSet<usize> {
    let mut land = BTreeSet::from([seed]);
    let mut frontier = vec![seed];

    while land.len() < target && !frontier.is_empty() {
        let slot = rng.gen_range(0..frontier.len());
        let tile = frontier[slot];

        let mut candidates: Vec<usize> = graph.tiles[tile]
            .voronoi_neighbors
            .iter()
            .copied()
            .filter(|&n| graph.can_be_land(n) && !land.contains(&n))
            .collect();
        if candidates.is_empty() {
            frontier.swap_remove(slot);
            continue;
        }
        candidates.shuffle(rng);

        for n in candidates {
            if land.len() >= target {
                break;
            }
            land.insert(n);
            frontier.push(n);
        }
    }

    if land.len() < target {
        tracing::debug!("Frontier exhausted at {} of {} tiles", land.len(), target);
    }

    land
}

/// Land tiles with at least one non-land Voronoi neighbour
pub fn shore_tiles(graph: &DualGraph, land: &BTreeSet<usize>) -> Vec<usize> {
    land.iter()
        .copied()
        .filter(|&t| graph.tiles[t].voronoi_neighbors.iter().any(|n| !land.contains(n)))
        .collect()
}

/// Whether `land` forms one Voronoi-connected component
pub fn is_connected(graph: &DualGraph, land: &BTreeSet<usize>) -> bool {
    let Some(&start) = land.iter().next() else {
        return true;
    };
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(tile) = queue.pop_front() {
        for &n in &graph.tiles[tile].voronoi_neighbors {
            if land.contains(&n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    seen.len() == land.len()
}

/// One erosion/accretion round
///
/// Removes the shore tile closest to the seed (never the seed itself, and
/// only if the land stays connected), then adds a random land-eligible
/// neighbour of the shore tile farthest from the seed. If nothing can be
/// added the removed tile is restored.
///
/// # Returns
///
/// Whether the coastline changed
pub fn erode_round(
    graph: &DualGraph,
    seed: usize,
    land: &mut BTreeSet<usize>,
    rng: &mut ChaCha8Rng,
) -> bool {
    let origin = graph.positions[seed];
    let by_distance = |tiles: &mut Vec<usize>| {
        tiles.sort_by(|&a, &b| {
            graph.positions[a]
                .distance_squared(origin)
                .total_cmp(&graph.positions[b].distance_squared(origin))
                .then(a.cmp(&b))
        });
    };

    let mut shore: Vec<usize> = shore_tiles(graph, land)
        .into_iter()
        .filter(|&t| t != seed)
        .collect();
    by_distance(&mut shore);

    let mut removed = None;
    for tile in shore {
        land.remove(&tile);
        if is_connected(graph, land) {
            removed = Some(tile);
            break;
        }
        land.insert(tile);
    }
    let Some(removed) = removed else {
        return false;
    };

    let mut shore = shore_tiles(graph, land);
    by_distance(&mut shore);

    for &tile in shore.iter().rev() {
        let options: Vec<usize> = graph.tiles[tile]
            .voronoi_neighbors
            .iter()
            .copied()
            .filter(|&n| n != removed && !land.contains(&n) && graph.can_be_land(n))
            .collect();
        if let Some(&added) = options.choose(rng) {
            land.insert(added);
            tracing::trace!("Erosion: removed tile {}, added tile {}", removed, added);
            return true;
        }
    }

    land.insert(removed);
    false
}

/// Eligible non-land tiles bordering land
pub fn derive_water(graph: &DualGraph, land: &BTreeSet<usize>) -> BTreeSet<usize> {
    land.iter()
        .flat_map(|&t| graph.tiles[t].voronoi_neighbors.iter().copied())
        .filter(|n| !land.contains(n) && graph.can_be_water(*n))
        .collect()
}

/// Runs of consecutive `true` values in a cyclic sequence, as (start, length)
fn cyclic_runs(flags: &[bool]) -> Vec<(usize, usize)> {
    let n = flags.len();
    if n == 0 {
        return Vec::new();
    }
    if flags.iter().all(|&f| f) {
        return vec![(0, n)];
    }

    // Start scanning just after a `false` so no run wraps past the start
    let offset = flags.iter().position(|&f| !f).unwrap_or(0) + 1;
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    for step in 0..n {
        let i = (offset + step) % n;
        if flags[i] {
            match current.as_mut() {
                Some((_, len)) => *len += 1,
                None => current = Some((i, 1)),
            }
        } else if let Some(run) = current.take() {
            runs.push(run);
        }
    }
    if let Some(run) = current {
        runs.push(run);
    }
    runs
}

/// One pass of coast repair
///
/// For each land tile, its non-land neighbours are read around its
/// perimeter. A tile surrounded entirely by non-land becomes water. A tile
/// whose non-land neighbours form two or more separate runs keeps the
/// longest run as water and turns the other runs into land, so every coast
/// tile touches the sea along one contiguous stretch. Finally, a non-land
/// tile ringed entirely by land becomes land when it is eligible, so no
/// single-tile lake is left inside the landmass.
///
/// # Returns
///
/// Whether any tile changed
pub fn repair_coast(graph: &DualGraph, land: &mut BTreeSet<usize>) -> bool {
    let mut changed = false;
    let tiles: Vec<usize> = land.iter().copied().collect();

    for tile in tiles {
        if !land.contains(&tile) {
            continue;
        }
        let mut neighbors = graph.tiles[tile].voronoi_neighbors.clone();
        order_by_angle(&mut neighbors, graph.positions[tile], |n| graph.positions[n]);
        let open: Vec<bool> = neighbors.iter().map(|n| !land.contains(n)).collect();
        let runs = cyclic_runs(&open);

        if runs.len() == 1 && runs[0].1 == neighbors.len() {
            if land.len() > 1 {
                land.remove(&tile);
                changed = true;
                tracing::trace!("Repair: isolated tile {} becomes water", tile);
            }
            continue;
        }
        if runs.len() < 2 {
            continue;
        }

        let longest = runs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .1.cmp(&b.1 .1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        for (r, &(start, len)) in runs.iter().enumerate() {
            if r == longest {
                continue;
            }
            for k in 0..len {
                let n = neighbors[(start + k) % neighbors.len()];
                if graph.can_be_land(n) && land.insert(n) {
                    changed = true;
                    tracing::trace!("Repair: tile {} fills a gap beside {}", n, tile);
                }
            }
        }
    }

    let enclosed: Vec<usize> = land
        .iter()
        .flat_map(|&t| graph.tiles[t].voronoi_neighbors.iter().copied())
        .filter(|n| !land.contains(n))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|&n| graph.can_be_land(n))
        .filter(|&n| graph.tiles[n].voronoi_neighbors.iter().all(|m| land.contains(m)))
        .collect();
    for tile in enclosed {
        land.insert(tile);
        changed = true;
        tracing::trace!("Repair: enclosed tile {} becomes land", tile);
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::dual::DualOptions;
    use crate::generation::points::generate_hex_points;
    use rand::SeedableRng;

    fn hex_graph(rings: usize) -> DualGraph {
        let positions: Vec<DVec2> = generate_hex_points(rings, 1.0)
            .iter()
            .map(|p| p.position)
            .collect();
        DualGraph::build(&positions, &DualOptions::default()).unwrap()
    }

    #[test]
    fn test_seed_is_centre_tile() {
        let graph = hex_graph(7);
        assert_eq!(select_seed(&graph, DVec2::ZERO), Some(0));
    }

    #[test]
    fn test_standard_rings_give_nineteen_tiles() {
        let graph = hex_graph(7);
        let options = LandmassOptions {
            growth: Growth::Rings(2),
            erosion_rounds: 0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let landmass = shape_landmass(&graph, DVec2::ZERO, &options, &mut rng);

        assert_eq!(landmass.seed, Some(0));
        assert_eq!(landmass.land, (0..19).collect::<BTreeSet<_>>());
        assert_eq!(landmass.water, (19..37).collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_frontier_reaches_target_connected() {
        let graph = hex_graph(8);
        let mut rng = ChaCha8Rng::seed_from_u64(12345);
        let land = grow_frontier(&graph, 0, 30, &mut rng);

        assert_eq!(land.len(), 30);
        assert!(land.contains(&0));
        assert!(is_connected(&graph, &land));
        assert!(land.iter().all(|&t| graph.can_be_land(t)));
    }

    #[test]
    fn test_frontier_determinism() {
        let graph = hex_graph(8);
        let a = grow_frontier(&graph, 0, 30, &mut ChaCha8Rng::seed_from_u64(9));
        let b = grow_frontier(&graph, 0, 30, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_frontier_exhausts_on_small_graph() {
        let graph = hex_graph(5);
        // Only rings 0..=2 are land-eligible in a 5-ring patch
        let land = grow_frontier(&graph, 0, 40, &mut ChaCha8Rng::seed_from_u64(2));
        assert_eq!(land.len(), 19);
    }

    #[test]
    fn test_erosion_keeps_size_and_connectivity() {
        let graph = hex_graph(8);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut land = grow_frontier(&graph, 0, 30, &mut rng);

        for _ in 0..5 {
            erode_round(&graph, 0, &mut land, &mut rng);
            assert_eq!(land.len(), 30);
            assert!(land.contains(&0));
            assert!(is_connected(&graph, &land));
        }
    }

    #[test]
    fn test_erosion_without_room_is_noop() {
        // Every eligible tile is already land, so nothing can be added
        let graph = hex_graph(5);
        let mut land = grow_rings(&graph, 0, 2);
        let before = land.clone();
        let changed = erode_round(&graph, 0, &mut land, &mut ChaCha8Rng::seed_from_u64(3));
        assert!(!changed);
        assert_eq!(land, before);
    }

    #[test]
    fn test_water_surrounds_land() {
        let graph = hex_graph(7);
        let land = grow_rings(&graph, 0, 1);
        let water = derive_water(&graph, &land);
        assert_eq!(water.len(), 12);
        assert!(water.is_disjoint(&land));
    }

    #[test]
    fn test_cyclic_runs() {
        assert!(cyclic_runs(&[]).is_empty());
        assert_eq!(cyclic_runs(&[true, true]), vec![(0, 2)]);
        assert!(cyclic_runs(&[false, false]).is_empty());
        // Wrapping run counts once
        assert_eq!(cyclic_runs(&[true, false, false, true]), vec![(3, 2)]);
        assert_eq!(cyclic_runs(&[true, false, true, false]).len(), 2);
    }

    #[test]
    fn test_repair_fills_split_coast() {
        let graph = hex_graph(7);
        // A straight bar of three tiles through the centre: the middle tile
        // has water on both sides
        let mut neighbors = graph.tiles[0].voronoi_neighbors.clone();
        order_by_angle(&mut neighbors, graph.positions[0], |n| graph.positions[n]);
        let mut land = BTreeSet::from([0, neighbors[0], neighbors[3]]);

        assert!(repair_coast(&graph, &mut land));
        assert!(land.len() > 3);
        assert!(is_connected(&graph, &land));

        // Centre now has a single water run
        let open: Vec<bool> = neighbors.iter().map(|n| !land.contains(n)).collect();
        assert!(cyclic_runs(&open).len() <= 1);
    }

    #[test]
    fn test_repair_leaves_convex_land_alone() {
        let graph = hex_graph(7);
        let mut land = grow_rings(&graph, 0, 2);
        assert!(!repair_coast(&graph, &mut land));
        assert_eq!(land.len(), 19);
    }

    #[test]
    fn test_repair_fills_enclosed_tile() {
        let graph = hex_graph(7);
        // Rings 1 and 2 around an empty centre
        let mut land: BTreeSet<usize> = (1..19).collect();

        assert!(repair_coast(&graph, &mut land));
        assert!(land.contains(&0));
        assert_eq!(land.len(), 19);
        assert!(!derive_water(&graph, &land).contains(&0));
    }

    #[test]
    fn test_repair_drops_isolated_tile() {
        let graph = hex_graph(7);
        // Any ring 3 tile is cut off from a landmass of rings 0 and 1
        let mut land = grow_rings(&graph, 0, 1);
        let stray = (19..37)
            .find(|&t| graph.tiles[t].voronoi_neighbors.iter().all(|n| !land.contains(n)))
            .unwrap();
        land.insert(stray);

        assert!(repair_coast(&graph, &mut land));
        assert!(!land.contains(&stray));
        assert_eq!(land, grow_rings(&graph, 0, 1));
    }

    #[test]
    fn test_repair_keeps_lone_tile() {
        let graph = hex_graph(7);
        let mut land = BTreeSet::from([0]);

        assert!(!repair_coast(&graph, &mut land));
        assert_eq!(land, BTreeSet::from([0]));
    }
}
