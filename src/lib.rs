//! Polygon board generation
//!
//! A standalone library for generating settler-style game boards: a connected
//! landmass of five-, six- and seven-sided tiles with the nodes (corners) and
//! edges (sides) between them, ready for a rules engine to place
//! settlements and roads on.
//!
//! # Quick Start
//!
//! ```rust
//! use rust_polygon_board::*;
//!
//! // Generate an irregular board; falls back to a hex board if needed
//! let config = MapConfigBuilder::new()
//!     .seed("first game")
//!     .map_type(MapType::ExpandedDelaunay)
//!     .target_tile_count(30).unwrap()
//!     .build().unwrap();
//!
//! let map = MapData::generate(config).unwrap();
//! println!(
//!     "{} tiles, {} nodes, {} edges ({})",
//!     map.tile_count(),
//!     map.node_count(),
//!     map.edge_count(),
//!     map.map_type().name()
//! );
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): Enables O(log n) position-to-tile lookups using KD-tree
//! - `serde`: Enables serialization support for configuration and board records

// Modules
pub mod error;
pub mod config;
pub mod tile;
pub mod generation;
pub mod validate;
pub mod resources;
pub mod map;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{MapGenError, Result};
pub use config::{MapConfig, MapConfigBuilder, MapSeed, MapType};
pub use tile::{Edge, Node, Resource, Tile};
pub use map::MapData;
pub use resources::{ResourceAssigner, StandardResourceAssigner};
pub use validate::{validate, ValidationIssue, ValidationReport};
pub use generation::{LloydOptions, RegularizerOptions};

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

// Re-export glam::DVec2 for convenience
pub use glam::DVec2;
