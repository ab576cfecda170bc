//! Structural validation of the board graph
//!
//! Every check runs to completion and all violations are collected, so a
//! failing board reports its full list of problems at once.

use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tile::{Edge, Node, Tile};

/// Allowed nominal tile side counts
pub const TILE_SHAPES: [usize; 3] = [5, 6, 7];

/// Maximum tiles meeting at a node
pub const MAX_NODE_TILES: usize = 3;

/// A single structural invariant violation
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("board has no tiles")]
    EmptyBoard,

    #[error("tile id {0} is used more than once")]
    DuplicateTileId(usize),

    #[error("node id {0} is used more than once")]
    DuplicateNodeId(usize),

    #[error("edge id {0} is used more than once")]
    DuplicateEdgeId(usize),

    #[error("node {node} touches {count} tiles (allowed 1..=3)")]
    NodeTileCount { node: usize, count: usize },

    #[error("node {node} references missing tile {tile}")]
    NodeMissingTile { node: usize, tile: usize },

    #[error("tile {tile} has shape {shape}, expected 5, 6 or 7")]
    InvalidShape { tile: usize, shape: usize },

    #[error("interior tile {tile} has {nodes} nodes but shape {shape}")]
    ShapeNodeMismatch { tile: usize, shape: usize, nodes: usize },

    #[error("interior tile {tile} has {edges} edges but shape {shape}")]
    ShapeEdgeMismatch { tile: usize, shape: usize, edges: usize },

    #[error("boundary tile {tile} has only {nodes} nodes")]
    TooFewNodes { tile: usize, nodes: usize },

    #[error("boundary tile {tile} has only {edges} edges")]
    TooFewEdges { tile: usize, edges: usize },

    #[error("tile {tile} references missing node {node}")]
    TileMissingNode { tile: usize, node: usize },

    #[error("tile {tile} references missing edge {edge}")]
    TileMissingEdge { tile: usize, edge: usize },

    #[error("tile {tile} lists node {node}, but the node does not list the tile")]
    NodeLacksTile { tile: usize, node: usize },

    #[error("node {node} lists tile {tile}, but the tile does not list the node")]
    TileLacksNode { node: usize, tile: usize },

    #[error("edge {edge} joins node {node} to itself")]
    DegenerateEdge { edge: usize, node: usize },

    #[error("edge {edge} references missing node {node}")]
    EdgeMissingNode { edge: usize, node: usize },

    #[error("edge {edge} references missing tile {tile}")]
    EdgeMissingTile { edge: usize, tile: usize },

    #[error("tiles are disconnected: reached {reached} of {total}")]
    Disconnected { reached: usize, total: usize },

    #[error("edges {first} and {second} join the same node pair")]
    DuplicateEdge { first: usize, second: usize },

    #[error("landmass has {found} tiles, expected {minimum}..={maximum}")]
    LandmassSize { found: usize, minimum: usize, maximum: usize },
}

/// Outcome of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// No violations were found
    pub valid: bool,
    /// Every violation, in check order
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Convert into a result, failing with `ValidationFailed` on any violation
    pub fn into_result(self) -> crate::Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(crate::MapGenError::ValidationFailed(self.errors))
        }
    }
}

/// Check every structural invariant of a board graph
///
/// Checks, in order: id uniqueness, node tile counts, tile node/edge counts
/// against shape, tile/node back-references, edge endpoints and tiles,
/// tile connectivity through shared nodes, and duplicate edges.
///
/// # Example
///
/// ```rust
/// use rust_polygon_board::validate::{validate, ValidationIssue};
///
/// let report = validate(&[], &[], &[]);
/// assert!(!report.valid);
/// assert_eq!(report.errors, vec![ValidationIssue::EmptyBoard]);
/// ```
pub fn validate(tiles: &[Tile], nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    let mut errors = Vec::new();

    if tiles.is_empty() {
        errors.push(ValidationIssue::EmptyBoard);
        return ValidationReport::from_errors(errors);
    }

    let tile_by_id = index_by_id(
        tiles.iter().map(|t| t.id),
        &mut errors,
        ValidationIssue::DuplicateTileId,
    );
    let node_by_id = index_by_id(
        nodes.iter().map(|n| n.id),
        &mut errors,
        ValidationIssue::DuplicateNodeId,
    );
    let edge_by_id = index_by_id(
        edges.iter().map(|e| e.id),
        &mut errors,
        ValidationIssue::DuplicateEdgeId,
    );

    for node in nodes {
        if node.tiles.is_empty() || node.tiles.len() > MAX_NODE_TILES {
            errors.push(ValidationIssue::NodeTileCount {
                node: node.id,
                count: node.tiles.len(),
            });
        }
        for &tile in &node.tiles {
            if !tile_by_id.contains_key(&tile) {
                errors.push(ValidationIssue::NodeMissingTile { node: node.id, tile });
            }
        }
    }

    for tile in tiles {
        check_tile_shape(tile, &mut errors);
        for &node in &tile.nodes {
            if !node_by_id.contains_key(&node) {
                errors.push(ValidationIssue::TileMissingNode { tile: tile.id, node });
            }
        }
        for &edge in &tile.edges {
            if !edge_by_id.contains_key(&edge) {
                errors.push(ValidationIssue::TileMissingEdge { tile: tile.id, edge });
            }
        }
    }

    for tile in tiles {
        for &node in &tile.nodes {
            if let Some(&n) = node_by_id.get(&node) {
                if !nodes[n].tiles.contains(&tile.id) {
                    errors.push(ValidationIssue::NodeLacksTile { tile: tile.id, node });
                }
            }
        }
    }
    for node in nodes {
        for &tile in &node.tiles {
            if let Some(&t) = tile_by_id.get(&tile) {
                if !tiles[t].nodes.contains(&node.id) {
                    errors.push(ValidationIssue::TileLacksNode { node: node.id, tile });
                }
            }
        }
    }

    for edge in edges {
        if edge.node_a == edge.node_b {
            errors.push(ValidationIssue::DegenerateEdge {
                edge: edge.id,
                node: edge.node_a,
            });
        }
        for node in [edge.node_a, edge.node_b] {
            if !node_by_id.contains_key(&node) {
                errors.push(ValidationIssue::EdgeMissingNode { edge: edge.id, node });
            }
        }
        for tile in edge.tiles() {
            if !tile_by_id.contains_key(&tile) {
                errors.push(ValidationIssue::EdgeMissingTile { edge: edge.id, tile });
            }
        }
    }

    let reached = reachable_tiles(tiles, nodes, &tile_by_id, &node_by_id);
    if reached < tiles.len() {
        errors.push(ValidationIssue::Disconnected {
            reached,
            total: tiles.len(),
        });
    }

    let mut seen_pairs: HashMap<(usize, usize), usize> = HashMap::new();
    for edge in edges {
        if let Some(&first) = seen_pairs.get(&edge.key()) {
            errors.push(ValidationIssue::DuplicateEdge {
                first,
                second: edge.id,
            });
        } else {
            seen_pairs.insert(edge.key(), edge.id);
        }
    }

    if !errors.is_empty() {
        tracing::debug!("Validation found {} issue(s)", errors.len());
    }
    ValidationReport::from_errors(errors)
}

/// Map ids to slice positions, reporting duplicates
fn index_by_id<I, F>(
    ids: I,
    errors: &mut Vec<ValidationIssue>,
    duplicate: F,
) -> HashMap<usize, usize>
where
    I: Iterator<Item = usize>,
    F: Fn(usize) -> ValidationIssue,
{
    let mut index = HashMap::new();
    for (position, id) in ids.enumerate() {
        if index.insert(id, position).is_some() {
            errors.push(duplicate(id));
        }
    }
    index
}

fn check_tile_shape(tile: &Tile, errors: &mut Vec<ValidationIssue>) {
    if !TILE_SHAPES.contains(&tile.shape) {
        errors.push(ValidationIssue::InvalidShape {
            tile: tile.id,
            shape: tile.shape,
        });
    }

    if tile.is_boundary {
        if tile.nodes.len() < 3 {
            errors.push(ValidationIssue::TooFewNodes {
                tile: tile.id,
                nodes: tile.nodes.len(),
            });
        }
        if tile.edges.len() < 3 {
            errors.push(ValidationIssue::TooFewEdges {
                tile: tile.id,
                edges: tile.edges.len(),
            });
        }
    } else {
        if tile.nodes.len() != tile.shape {
            errors.push(ValidationIssue::ShapeNodeMismatch {
                tile: tile.id,
                shape: tile.shape,
                nodes: tile.nodes.len(),
            });
        }
        if tile.edges.len() != tile.shape {
            errors.push(ValidationIssue::ShapeEdgeMismatch {
                tile: tile.id,
                shape: tile.shape,
                edges: tile.edges.len(),
            });
        }
    }
}

/// Breadth-first count of tiles reachable from the first tile through shared nodes
fn reachable_tiles(
    tiles: &[Tile],
    nodes: &[Node],
    tile_by_id: &HashMap<usize, usize>,
    node_by_id: &HashMap<usize, usize>,
) -> usize {
    let mut visited: HashSet<usize> = HashSet::from([0]);
    let mut queue = VecDeque::from([0usize]);

    while let Some(t) = queue.pop_front() {
        for node in &tiles[t].nodes {
            let Some(&n) = node_by_id.get(node) else {
                continue;
            };
            for tile in &nodes[n].tiles {
                if let Some(&next) = tile_by_id.get(tile) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    visited.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    /// Two pentagons sharing the edge between nodes 0 and 1
    fn two_pentagons() -> (Vec<Tile>, Vec<Node>, Vec<Edge>) {
        let tile = |id: usize, nodes: Vec<usize>, edges: Vec<usize>| Tile {
            id,
            shape: 5,
            resource: Default::default(),
            dice_number: None,
            robber_present: false,
            nodes,
            edges,
            is_boundary: true,
            center: DVec2::ZERO,
        };
        let tiles = vec![
            tile(0, vec![0, 1, 2, 3, 4], vec![0, 1, 2, 3, 4]),
            tile(1, vec![1, 0, 5, 6, 7], vec![0, 5, 6, 7, 8]),
        ];

        let node_tiles = [
            vec![0, 1],
            vec![0, 1],
            vec![0],
            vec![0],
            vec![0],
            vec![1],
            vec![1],
            vec![1],
        ];
        let nodes = node_tiles
            .iter()
            .enumerate()
            .map(|(id, tiles)| Node {
                id,
                location: DVec2::new(id as f64, 0.0),
                tiles: tiles.clone(),
            })
            .collect();

        let pairs = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (0, 5), (5, 6), (6, 7), (7, 1)];
        let edges = pairs
            .iter()
            .enumerate()
            .map(|(id, &(a, b))| Edge {
                id,
                node_a: a,
                node_b: b,
                tile_left: Some(if id < 5 { 0 } else { 1 }),
                tile_right: if id == 0 { Some(1) } else { None },
            })
            .collect();

        (tiles, nodes, edges)
    }

    #[test]
    fn test_valid_board_passes() {
        let (tiles, nodes, edges) = two_pentagons();
        let report = validate(&tiles, &nodes, &edges);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_empty_board() {
        let report = validate(&[], &[], &[]);
        assert_eq!(report.errors, vec![ValidationIssue::EmptyBoard]);
    }

    #[test]
    fn test_reports_every_violation() {
        let (mut tiles, mut nodes, mut edges) = two_pentagons();
        nodes[2].tiles.clear();
        edges[3].node_b = edges[3].node_a;
        edges.push(Edge {
            id: 9,
            node_a: 1,
            node_b: 0,
            tile_left: None,
            tile_right: None,
        });
        tiles[1].shape = 4;

        let report = validate(&tiles, &nodes, &edges);
        assert!(!report.valid);
        assert!(report.errors.contains(&ValidationIssue::NodeTileCount { node: 2, count: 0 }));
        assert!(report.errors.contains(&ValidationIssue::NodeLacksTile { tile: 0, node: 2 }));
        assert!(report.errors.contains(&ValidationIssue::DegenerateEdge { edge: 3, node: 3 }));
        assert!(report.errors.contains(&ValidationIssue::InvalidShape { tile: 1, shape: 4 }));
        assert!(report.errors.contains(&ValidationIssue::DuplicateEdge { first: 0, second: 9 }));
    }

    #[test]
    fn test_duplicate_ids() {
        let (mut tiles, mut nodes, edges) = two_pentagons();
        tiles[1].id = 0;
        nodes[7].id = 6;
        let report = validate(&tiles, &nodes, &edges);
        assert!(report.errors.contains(&ValidationIssue::DuplicateTileId(0)));
        assert!(report.errors.contains(&ValidationIssue::DuplicateNodeId(6)));
    }

    #[test]
    fn test_interior_shape_must_match_nodes() {
        let (mut tiles, nodes, edges) = two_pentagons();
        tiles[0].is_boundary = false;
        tiles[0].shape = 6;
        let report = validate(&tiles, &nodes, &edges);
        assert!(report.errors.contains(&ValidationIssue::ShapeNodeMismatch {
            tile: 0,
            shape: 6,
            nodes: 5
        }));
        assert!(report.errors.contains(&ValidationIssue::ShapeEdgeMismatch {
            tile: 0,
            shape: 6,
            edges: 5
        }));
    }

    #[test]
    fn test_disconnected_tiles() {
        let (mut tiles, mut nodes, edges) = two_pentagons();
        // Detach tile 1 from the shared nodes on both sides
        tiles[1].nodes = vec![5, 6, 7, 5, 6];
        nodes[0].tiles = vec![0];
        nodes[1].tiles = vec![0];

        let report = validate(&tiles, &nodes, &edges);
        assert!(report.errors.contains(&ValidationIssue::Disconnected { reached: 1, total: 2 }));
    }

    #[test]
    fn test_missing_references() {
        let (mut tiles, mut nodes, mut edges) = two_pentagons();
        tiles[0].edges[0] = 42;
        nodes[3].tiles.push(9);
        edges[1].tile_right = Some(7);

        let report = validate(&tiles, &nodes, &edges);
        assert!(report.errors.contains(&ValidationIssue::TileMissingEdge { tile: 0, edge: 42 }));
        assert!(report.errors.contains(&ValidationIssue::NodeMissingTile { node: 3, tile: 9 }));
        assert!(report.errors.contains(&ValidationIssue::EdgeMissingTile { edge: 1, tile: 7 }));
    }
}
