//! Board output records
//!
//! Tiles, nodes (tile corners) and edges (tile sides) handed to the game
//! state. References between records are by id, and ids equal the record's
//! index in its list.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resource produced by a land tile
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
    /// Produces nothing and starts with the robber
    #[default]
    Desert,
}

impl Resource {
    /// All producing resources, in bag order
    pub const PRODUCING: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];

    /// Tiles of this resource in one base-game set of 19
    pub fn base_count(self) -> usize {
        match self {
            Resource::Wood | Resource::Sheep | Resource::Wheat => 4,
            Resource::Brick | Resource::Ore => 3,
            Resource::Desert => 1,
        }
    }

    /// Get a human-readable name for this resource
    pub fn name(self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Brick => "brick",
            Resource::Sheep => "sheep",
            Resource::Wheat => "wheat",
            Resource::Ore => "ore",
            Resource::Desert => "desert",
        }
    }
}

/// A single land tile
///
/// # Design Notes
///
/// `shape` is the tile's nominal side count (5, 6 or 7). Interior tiles
/// have exactly `shape` nodes and edges; boundary tiles may have fewer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Unique identifier (0 to tile_count-1)
    pub id: usize,

    /// Nominal side count, one of 5, 6, 7
    pub shape: usize,

    /// Produced resource, assigned after assembly
    pub resource: Resource,

    /// Dice number that activates production; `None` for deserts
    pub dice_number: Option<u8>,

    /// Whether the robber starts on this tile
    pub robber_present: bool,

    /// Corner node ids in counter-clockwise order
    pub nodes: Vec<usize>,

    /// Side edge ids; `edges[i]` joins `nodes[i]` and `nodes[i + 1]`
    pub edges: Vec<usize>,

    /// Whether the tile lies on the coastline of the board graph
    pub is_boundary: bool,

    /// Seed point of the tile
    pub center: DVec2,
}

impl Tile {
    /// Number of corner nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `node` is a corner of this tile
    #[inline]
    pub fn has_node(&self, node: usize) -> bool {
        self.nodes.contains(&node)
    }

    /// Whether this is a desert tile
    #[inline]
    pub fn is_desert(&self) -> bool {
        self.resource == Resource::Desert
    }
}

/// A tile corner where up to three tiles meet
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier
    pub id: usize,

    /// Position in world units
    pub location: DVec2,

    /// Ids of the tiles meeting at this node, 1 to 3 of them
    pub tiles: Vec<usize>,
}

impl Node {
    /// Fewer than three tiles meet here
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.tiles.len() < 3
    }
}

/// A tile side between two nodes
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique identifier
    pub id: usize,

    /// First endpoint
    pub node_a: usize,

    /// Second endpoint, distinct from `node_a`
    pub node_b: usize,

    /// Tile that first claimed this edge
    pub tile_left: Option<usize>,

    /// Tile on the other side, if any
    pub tile_right: Option<usize>,
}

impl Edge {
    /// Only one tile borders this edge
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.tile_left.is_none() || self.tile_right.is_none()
    }

    /// Whether `node` is an endpoint
    #[inline]
    pub fn touches(&self, node: usize) -> bool {
        self.node_a == node || self.node_b == node
    }

    /// Endpoints as an ordered pair, smaller id first
    #[inline]
    pub fn key(&self) -> (usize, usize) {
        (self.node_a.min(self.node_b), self.node_a.max(self.node_b))
    }

    /// Bordering tiles
    pub fn tiles(&self) -> impl Iterator<Item = usize> {
        self.tile_left.into_iter().chain(self.tile_right)
    }
}
