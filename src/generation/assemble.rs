//! Board graph assembly
//!
//! Turns the land tiles of a dual graph into `Tile`, `Node` and `Edge`
//! records with consistent cross references.

use glam::DVec2;
use std::collections::{BTreeSet, HashMap};

use super::dual::{DualEdge, DualGraph};
use super::lloyd::polygon_area;
use crate::tile::{Edge, Node, Resource, Tile};
use crate::validate::{MAX_NODE_TILES, TILE_SHAPES};

/// Node positions closer than this are merged into one node
pub const POSITION_TOLERANCE: f64 = 1e-6;

/// Assembled board graph
#[derive(Debug, Clone, Default)]
pub struct BoardGraph {
    pub tiles: Vec<Tile>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Dual graph tile index each output tile was built from
    pub sources: Vec<usize>,
}

/// Rounded position used as the node deduplication key
#[inline]
fn position_key(p: DVec2) -> (i64, i64) {
    (
        (p.x / POSITION_TOLERANCE).round() as i64,
        (p.y / POSITION_TOLERANCE).round() as i64,
    )
}

/// Build board records for the `land` tiles of `graph`
///
/// # Algorithm
///
/// 1. Each distinct dual-vertex position becomes a node
/// 2. Nodes shared by more than three tiles are dropped
/// 3. Each tile perimeter is re-walked along dual edges and wound
///    counter-clockwise
/// 4. One edge per unordered node pair; the first tile to claim it is
///    `tile_left`, the second `tile_right`
pub fn assemble(graph: &DualGraph, land: &BTreeSet<usize>) -> BoardGraph {
    let sources: Vec<usize> = land.iter().copied().collect();

    // Step 1: nodes, deduplicated by position
    let mut node_index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut locations: Vec<DVec2> = Vec::new();
    let mut node_tiles: Vec<Vec<usize>> = Vec::new();
    let mut tile_nodes: Vec<Vec<usize>> = Vec::with_capacity(sources.len());
    let mut tile_links: Vec<Vec<(usize, usize)>> = Vec::with_capacity(sources.len());

    for (tile_id, &candidate) in sources.iter().enumerate() {
        let polygon = &graph.tiles[candidate].polygon;
        let mut ids: Vec<usize> = Vec::with_capacity(polygon.len());
        let mut triangle_node: Vec<(usize, usize)> = Vec::with_capacity(polygon.len());

        for &t in polygon {
            let position = graph.dual_vertex(t);
            let id = *node_index.entry(position_key(position)).or_insert_with(|| {
                locations.push(position);
                node_tiles.push(Vec::new());
                locations.len() - 1
            });
            if !ids.contains(&id) {
                ids.push(id);
                node_tiles[id].push(tile_id);
            }
            triangle_node.push((t, id));
        }

        // Dual edges among this polygon's triangles are its sides
        let mut links = Vec::new();
        for (i, &(ta, na)) in triangle_node.iter().enumerate() {
            for &(tb, nb) in &triangle_node[i + 1..] {
                let dual = DualEdge {
                    a: ta.min(tb),
                    b: ta.max(tb),
                };
                if na != nb && graph.dual_edges.binary_search(&dual).is_ok() {
                    links.push((na, nb));
                }
            }
        }

        tile_nodes.push(ids);
        tile_links.push(links);
    }

    // Step 2: drop overfull nodes
    let keep: Vec<bool> = node_tiles.iter().map(|t| t.len() <= MAX_NODE_TILES).collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        tracing::warn!("Dropping {} node(s) shared by more than {} tiles", dropped, MAX_NODE_TILES);
    }

    // Step 3: perimeter walk
    let perimeters: Vec<Vec<usize>> = tile_nodes
        .iter()
        .zip(&tile_links)
        .map(|(ids, links)| {
            let ids: Vec<usize> = ids.iter().copied().filter(|&n| keep[n]).collect();
            let links: Vec<(usize, usize)> =
                links.iter().copied().filter(|&(a, b)| keep[a] && keep[b]).collect();
            let mut walked = walk_perimeter(&ids, &links);
            let outline: Vec<DVec2> = walked.iter().map(|&n| locations[n]).collect();
            if polygon_area(&outline) < 0.0 {
                walked.reverse();
            }
            walked
        })
        .collect();

    // Compact node ids to those still referenced, in first-use order
    let mut remap: Vec<Option<usize>> = vec![None; locations.len()];
    let mut nodes: Vec<Node> = Vec::new();
    for (tile_id, perimeter) in perimeters.iter().enumerate() {
        for &n in perimeter {
            let id = *remap[n].get_or_insert_with(|| {
                nodes.push(Node {
                    id: nodes.len(),
                    location: locations[n],
                    tiles: Vec::new(),
                });
                nodes.len() - 1
            });
            nodes[id].tiles.push(tile_id);
        }
    }
    let perimeters: Vec<Vec<usize>> = perimeters
        .iter()
        .map(|p| p.iter().filter_map(|&n| remap[n]).collect())
        .collect();

    // Step 4: edges
    let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut tile_edges: Vec<Vec<usize>> = Vec::with_capacity(perimeters.len());

    for (tile_id, perimeter) in perimeters.iter().enumerate() {
        let k = perimeter.len();
        let sides = if k > 2 { k } else { k.saturating_sub(1) };
        let mut ids = Vec::with_capacity(sides);

        for i in 0..sides {
            let (a, b) = (perimeter[i], perimeter[(i + 1) % k]);
            let key = (a.min(b), a.max(b));
            let id = *edge_index.entry(key).or_insert_with(|| {
                edges.push(Edge {
                    id: edges.len(),
                    node_a: a,
                    node_b: b,
                    tile_left: None,
                    tile_right: None,
                });
                edges.len() - 1
            });

            let edge = &mut edges[id];
            if edge.tile_left.is_none() {
                edge.tile_left = Some(tile_id);
            } else if edge.tile_left != Some(tile_id) && edge.tile_right.is_none() {
                edge.tile_right = Some(tile_id);
            } else if edge.tile_left != Some(tile_id) && edge.tile_right != Some(tile_id) {
                tracing::warn!("Edge {} already has two tiles, ignoring tile {}", id, tile_id);
            }
            ids.push(id);
        }
        tile_edges.push(ids);
    }

    // Step 5: tiles
    let tiles: Vec<Tile> = perimeters
        .into_iter()
        .zip(tile_edges)
        .enumerate()
        .map(|(id, (tile_nodes, tile_edges))| {
            let is_boundary = tile_nodes.iter().any(|&n| nodes[n].is_boundary())
                || tile_edges.iter().any(|&e| edges[e].is_boundary());
            let shape = tile_nodes.len().clamp(TILE_SHAPES[0], TILE_SHAPES[TILE_SHAPES.len() - 1]);
            Tile {
                id,
                shape,
                resource: Resource::default(),
                dice_number: None,
                robber_present: false,
                nodes: tile_nodes,
                edges: tile_edges,
                is_boundary,
                center: graph.positions[sources[id]],
            }
        })
        .collect();

    tracing::debug!(
        "Assembled board: {} tiles, {} nodes, {} edges",
        tiles.len(),
        nodes.len(),
        edges.len()
    );

    BoardGraph {
        tiles,
        nodes,
        edges,
        sources,
    }
}

/// Order `ids` by walking `links` from node to adjacent unvisited node
///
/// `ids` is the angular order; it decides where the walk starts (a chain
/// end if the links form an open chain) and which way it turns first.
/// Nodes the walk cannot reach are visited next in angular order.
pub fn walk_perimeter(ids: &[usize], links: &[(usize, usize)]) -> Vec<usize> {
    if ids.len() < 3 {
        return ids.to_vec();
    }

    let position = |n: usize| ids.iter().position(|&m| m == n).unwrap_or(usize::MAX);
    let neighbors = |n: usize| -> Vec<usize> {
        let mut adjacent: Vec<usize> = links
            .iter()
            .filter_map(|&(a, b)| {
                if a == n {
                    Some(b)
                } else if b == n {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        adjacent.sort_by_key(|&m| position(m));
        adjacent.dedup();
        adjacent
    };

    let mut visited: Vec<bool> = vec![false; ids.len()];
    let mut walked: Vec<usize> = Vec::with_capacity(ids.len());

    let mut next_start = ids
        .iter()
        .copied()
        .find(|&n| neighbors(n).len() < 2)
        .or_else(|| ids.first().copied());

    while let Some(start) = next_start {
        let mut current = start;
        loop {
            let slot = position(current);
            if slot == usize::MAX || visited[slot] {
                break;
            }
            visited[slot] = true;
            walked.push(current);

            // Prefer the neighbour that follows in angular order
            let candidates: Vec<usize> = neighbors(current)
                .into_iter()
                .filter(|&m| position(m) != usize::MAX && !visited[position(m)])
                .collect();
            let following = ids[(slot + 1) % ids.len()];
            match candidates.iter().find(|&&m| m == following).or(candidates.first()) {
                Some(&m) => current = m,
                None => break,
            }
        }

        // Resume with the first unvisited node after the last one walked
        let last = walked.last().map(|&n| position(n)).unwrap_or(0);
        next_start = (1..=ids.len())
            .map(|step| (last + step) % ids.len())
            .find(|&i| !visited[i])
            .map(|i| ids[i]);
    }

    walked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::dual::DualOptions;
    use crate::generation::points::generate_hex_points;
    use crate::validate::validate;
    use std::collections::HashSet;

    fn hex_graph(rings: usize) -> DualGraph {
        let positions: Vec<DVec2> = generate_hex_points(rings, 1.0)
            .iter()
            .map(|p| p.position)
            .collect();
        DualGraph::build(&positions, &DualOptions::default()).unwrap()
    }

    fn standard_board() -> BoardGraph {
        let graph = hex_graph(7);
        let land: BTreeSet<usize> = (0..19).collect();
        assemble(&graph, &land)
    }

    #[test]
    fn test_standard_board_counts() {
        let board = standard_board();
        assert_eq!(board.tiles.len(), 19);
        assert_eq!(board.nodes.len(), 54);
        assert_eq!(board.edges.len(), 72);
    }

    #[test]
    fn test_standard_board_is_valid() {
        let board = standard_board();
        let report = validate(&board.tiles, &board.nodes, &board.edges);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_hexagons_and_boundary_flags() {
        let board = standard_board();
        for tile in &board.tiles {
            assert_eq!(tile.shape, 6);
            assert_eq!(tile.nodes.len(), 6);
            assert_eq!(tile.edges.len(), 6);
        }
        // Centre and first ring are surrounded by land
        for tile in &board.tiles[..7] {
            assert!(!tile.is_boundary, "tile {} should be interior", tile.id);
        }
        for tile in &board.tiles[7..] {
            assert!(tile.is_boundary, "tile {} should be boundary", tile.id);
        }
    }

    #[test]
    fn test_perimeters_are_counter_clockwise() {
        let board = standard_board();
        for tile in &board.tiles {
            let outline: Vec<DVec2> = tile.nodes.iter().map(|&n| board.nodes[n].location).collect();
            assert!(polygon_area(&outline) > 0.0);
        }
    }

    #[test]
    fn test_edges_follow_tile_perimeter() {
        let board = standard_board();
        for tile in &board.tiles {
            let k = tile.nodes.len();
            for (i, &e) in tile.edges.iter().enumerate() {
                let edge = &board.edges[e];
                assert!(edge.touches(tile.nodes[i]));
                assert!(edge.touches(tile.nodes[(i + 1) % k]));
                assert!(edge.tiles().any(|t| t == tile.id));
            }
        }

        let pairs: HashSet<(usize, usize)> = board.edges.iter().map(|e| e.key()).collect();
        assert_eq!(pairs.len(), board.edges.len());
    }

    #[test]
    fn test_shared_edges_have_two_tiles() {
        let board = standard_board();
        let inner = board.edges.iter().filter(|e| !e.is_boundary()).count();
        // 19 hexagons have 114 sides; 30 boundary edges are counted once
        assert_eq!(inner, 42);
        assert_eq!(board.edges.len() - inner, 30);
    }

    #[test]
    fn test_node_degrees() {
        let board = standard_board();
        assert!(board.nodes.iter().all(|n| (1..=3).contains(&n.tiles.len())));
        // The centre tile's corners are all interior
        for &n in &board.tiles[0].nodes {
            assert_eq!(board.nodes[n].tiles.len(), 3);
        }
    }

    #[test]
    fn test_sources_and_centers() {
        let graph = hex_graph(7);
        let land: BTreeSet<usize> = [0, 1, 2].into_iter().collect();
        let board = assemble(&graph, &land);
        assert_eq!(board.sources, vec![0, 1, 2]);
        assert_eq!(board.tiles[1].center, graph.positions[1]);
        assert!(board.tiles.iter().all(|t| t.is_boundary));
    }

    #[test]
    fn test_walk_closed_cycle() {
        let ids = [10, 11, 12, 13];
        let links = [(10, 11), (12, 11), (13, 12), (10, 13)];
        assert_eq!(walk_perimeter(&ids, &links), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_walk_open_chain_starts_at_end() {
        // 12 is missing a link to 13, so the walk starts at a chain end
        let ids = [10, 11, 12, 13];
        let links = [(10, 11), (11, 12), (13, 10)];
        assert_eq!(walk_perimeter(&ids, &links), vec![12, 11, 10, 13]);
    }

    #[test]
    fn test_walk_disjoint_pieces() {
        let ids = [1, 2, 3, 4, 5];
        let links = [(1, 2), (4, 5)];
        let walked = walk_perimeter(&ids, &links);
        assert_eq!(walked.len(), 5);
        let unique: HashSet<usize> = walked.iter().copied().collect();
        assert_eq!(unique.len(), 5);
    }
}
