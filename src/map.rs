//! MapData main structure

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashSet};

use crate::config::{MapConfig, MapType};
use crate::error::Result;
use crate::generation::generate_board;
use crate::resources::{ResourceAssigner, StandardResourceAssigner};
use crate::tile::{Edge, Node, Tile};

#[cfg(feature = "spatial-index")]
use crate::spatial::SpatialIndex;
#[cfg(feature = "spatial-index")]
use glam::DVec2;

/// A complete, validated board
///
/// Holds the tiles, nodes and edges produced by one generation call, with
/// resources and dice numbers assigned.
///
/// # Examples
///
/// ```
/// use rust_polygon_board::*;
///
/// let config = MapConfigBuilder::new()
///     .seed(12345u64)
///     .map_type(MapType::Standard)
///     .build()
///     .unwrap();
///
/// let map = MapData::generate(config).unwrap();
/// assert_eq!(map.tile_count(), 19);
/// assert_eq!(map.desert_tiles().len(), 1);
/// ```
#[derive(Clone)]
pub struct MapData {
    /// Configuration used to generate this board
    config: MapConfig,

    /// Generator that produced the graph
    map_type: MapType,

    /// Irregular generation failed and the hex fallback was used
    used_fallback: bool,

    /// Tiles, indexed by id
    tiles: Vec<Tile>,

    /// Nodes, indexed by id
    nodes: Vec<Node>,

    /// Edges, indexed by id
    edges: Vec<Edge>,

    /// Spatial index over tile centres (requires spatial-index feature)
    #[cfg(feature = "spatial-index")]
    spatial_index: SpatialIndex,
}

impl MapData {
    /// Generate a board with the standard resource distribution
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if a hex board fails validation, or
    /// `GenerationExhausted` if an irregular board and its hex fallback
    /// both fail.
    pub fn generate(config: MapConfig) -> Result<Self> {
        Self::generate_with_assigner(config, &StandardResourceAssigner)
    }

    /// Generate a board with a custom resource assigner
    ///
    /// The assigner runs on the validated tiles with a random source seeded
    /// from `config.resource_seed`.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_polygon_board::*;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// struct AllWheat;
    ///
    /// impl ResourceAssigner for AllWheat {
    ///     fn assign(&self, tiles: &mut [Tile], _rng: &mut ChaCha8Rng) {
    ///         for tile in tiles {
    ///             tile.resource = Resource::Wheat;
    ///             tile.dice_number = Some(8);
    ///         }
    ///     }
    /// }
    ///
    /// let map = MapData::generate_with_assigner(MapConfig::default(), &AllWheat).unwrap();
    /// assert!(map.tiles().iter().all(|t| t.resource == Resource::Wheat));
    /// ```
    pub fn generate_with_assigner<A>(config: MapConfig, assigner: &A) -> Result<Self>
    where
        A: ResourceAssigner + ?Sized,
    {
        let generated = generate_board(&config)?;
        let mut board = generated.board;

        let mut rng = ChaCha8Rng::seed_from_u64(config.resource_seed);
        assigner.assign(&mut board.tiles, &mut rng);

        #[cfg(feature = "spatial-index")]
        let spatial_index = {
            let centers: Vec<DVec2> = board.tiles.iter().map(|t| t.center).collect();
            SpatialIndex::new(&centers)
        };

        Ok(Self {
            config,
            map_type: generated.map_type,
            used_fallback: generated.used_fallback,
            tiles: board.tiles,
            nodes: board.nodes,
            edges: board.edges,
            #[cfg(feature = "spatial-index")]
            spatial_index,
        })
    }

    /// Get the configuration used to generate this board
    #[inline]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Generator that actually produced the board
    ///
    /// Differs from `config().map_type` when the hex fallback was used.
    #[inline]
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Whether the hex fallback replaced the requested irregular generator
    #[inline]
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// Get the number of tiles
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Get the number of nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get all tiles as a slice
    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Get all nodes as a slice
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Get all edges as a slice
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Get a tile by ID
    ///
    /// Returns `None` if the tile ID is out of bounds.
    #[inline]
    pub fn get_tile(&self, id: usize) -> Option<&Tile> {
        self.tiles.get(id)
    }

    /// Get a node by ID
    #[inline]
    pub fn get_node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get an edge by ID
    #[inline]
    pub fn get_edge(&self, id: usize) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Tiles sharing at least one node with `tile_id`, sorted
    ///
    /// Returns an empty vec if the tile ID is invalid.
    pub fn tile_neighbors(&self, tile_id: usize) -> Vec<usize> {
        let Some(tile) = self.tiles.get(tile_id) else {
            return vec![];
        };
        let neighbors: BTreeSet<usize> = tile
            .nodes
            .iter()
            .filter_map(|&n| self.nodes.get(n))
            .flat_map(|node| node.tiles.iter().copied())
            .filter(|&t| t != tile_id)
            .collect();
        neighbors.into_iter().collect()
    }

    /// Find tiles within a given hop count from a center tile (BFS)
    ///
    /// # Arguments
    ///
    /// * `center_id` - Starting tile ID
    /// * `hops` - Maximum number of tile hops (0 = just the center tile)
    ///
    /// # Returns
    ///
    /// Sorted tile IDs within radius, including the center tile.
    /// Returns empty vec if center_id is invalid.
    pub fn find_tiles_within_radius(&self, center_id: usize, hops: usize) -> Vec<usize> {
        if center_id >= self.tiles.len() {
            return vec![];
        }

        let mut visited = HashSet::new();
        let mut current = vec![center_id];
        visited.insert(center_id);

        for _ in 0..hops {
            let mut next = Vec::new();
            for &tile_id in &current {
                for neighbor in self.tile_neighbors(tile_id) {
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                    }
                }
            }
            current = next;
        }

        let mut within: Vec<usize> = visited.into_iter().collect();
        within.sort_unstable();
        within
    }

    /// IDs of the desert tiles
    pub fn desert_tiles(&self) -> Vec<usize> {
        self.tiles.iter().filter(|t| t.is_desert()).map(|t| t.id).collect()
    }

    /// The tile the robber starts on, if any
    pub fn robber_tile(&self) -> Option<usize> {
        self.tiles.iter().find(|t| t.robber_present).map(|t| t.id)
    }

    /// Edges bordered by a single tile (the coastline)
    pub fn boundary_edges(&self) -> Vec<usize> {
        self.edges.iter().filter(|e| e.is_boundary()).map(|e| e.id).collect()
    }

    /// Find the tile nearest a board position (requires spatial-index feature)
    #[cfg(feature = "spatial-index")]
    pub fn find_tile_at(&self, position: DVec2) -> usize {
        self.spatial_index.find_nearest(position)
    }
}
