//! Board Configuration and Builder
//!
//! This module provides configuration types for deterministic board generation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MapGenError, Result};

/// Upper bound on regularization rounds.
pub const MAX_REGULARIZATION_ITERATIONS: usize = 20;

/// Upper bound on plain Lloyd smoothing rounds.
pub const MAX_SMOOTHING_ITERATIONS: usize = 20;

/// Number of tiles on the standard board (seed tile plus two rings).
pub const STANDARD_TILE_COUNT: usize = 19;

/// Extra hex rings generated around the land disc so that the outer
/// (ineligible) ring and its water buffer never touch land.
const MARGIN_RINGS: usize = 5;

/// Board layout selector
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapType {
    /// Fixed 19-tile hexagonal board
    #[default]
    Standard,
    /// Hex grid with a randomly grown, eroded coastline
    ExpandedHex,
    /// Irregular Delaunay-centroid polygons with a randomly grown coastline
    ExpandedDelaunay,
}

impl MapType {
    /// Get a human-readable name for this map type
    pub fn name(self) -> &'static str {
        match self {
            MapType::Standard => "standard",
            MapType::ExpandedHex => "expanded-hex",
            MapType::ExpandedDelaunay => "expanded-delaunay",
        }
    }

    /// Whether this map type is laid out on a regular hex grid
    pub fn is_hex(self) -> bool {
        !matches!(self, MapType::ExpandedDelaunay)
    }
}

impl std::str::FromStr for MapType {
    type Err = MapGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(MapType::Standard),
            "expanded-hex" => Ok(MapType::ExpandedHex),
            "expanded-delaunay" => Ok(MapType::ExpandedDelaunay),
            other => Err(MapGenError::InvalidConfig(format!(
                "unknown map type '{}'",
                other
            ))),
        }
    }
}

/// A generation seed given either as a number or as free text
///
/// Text seeds hash to a stable 64-bit value (FNV-1a), so the same string
/// yields the same board on every platform and toolchain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSeed {
    /// Numeric seed, used as-is
    Number(u64),
    /// Text seed, hashed
    Text(String),
}

impl MapSeed {
    /// Resolve the seed to the 64-bit value fed to the random sources
    pub fn to_u64(&self) -> u64 {
        match self {
            MapSeed::Number(n) => *n,
            MapSeed::Text(text) => fnv1a(text.as_bytes()),
        }
    }
}

impl From<u64> for MapSeed {
    fn from(n: u64) -> Self {
        MapSeed::Number(n)
    }
}

impl From<u32> for MapSeed {
    fn from(n: u32) -> Self {
        MapSeed::Number(n as u64)
    }
}

impl From<i32> for MapSeed {
    fn from(n: i32) -> Self {
        MapSeed::Number(n as u64)
    }
}

impl From<&str> for MapSeed {
    fn from(text: &str) -> Self {
        MapSeed::Text(text.to_owned())
    }
}

impl From<String> for MapSeed {
    fn from(text: String) -> Self {
        MapSeed::Text(text)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Smallest ring count `r` such that a hexagon of `r` rings around a centre
/// tile holds at least `count` tiles.
pub fn rings_for(count: usize) -> usize {
    let mut rings = 0;
    while hex_tile_count(rings) < count {
        rings += 1;
    }
    rings
}

/// Number of tiles in a hexagon with `rings` rings around a centre tile.
#[inline]
pub fn hex_tile_count(rings: usize) -> usize {
    1 + 3 * rings * (rings + 1)
}

/// Configuration for deterministic board generation
///
/// The same configuration always produces the identical board.
///
/// # Example
///
/// ```rust
/// use rust_polygon_board::*;
///
/// let config = MapConfigBuilder::new()
///     .seed("catan night")
///     .map_type(MapType::ExpandedDelaunay)
///     .target_tile_count(30)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.target_tile_count, 30);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Resolved random seed for point placement, growth and erosion
    pub seed: u64,

    /// Board layout
    pub map_type: MapType,

    /// Requested number of land tiles (the standard board always has 19)
    pub target_tile_count: usize,

    /// Random displacement of irregular seed points, relative to tile spacing (0-1)
    pub irregularity: f64,

    /// Centre-to-centre spacing of neighbouring tiles in world units
    pub tile_size: f64,

    /// Override for the half-extent of the square sampling region
    pub radius_override: Option<f64>,

    /// Plain Lloyd smoothing rounds run before regularization (irregular mode)
    pub smoothing_iterations: usize,

    /// Convergence threshold for plain smoothing (fraction of tile size)
    pub smoothing_convergence: f64,

    /// Maximum regularization rounds (irregular mode)
    pub regularization_iterations: usize,

    /// Coastline erosion/accretion rounds (expanded modes)
    pub erosion_rounds: usize,

    /// Minimum interior angle, in degrees, for a triangle to enter the dual graph
    pub min_triangle_angle: f64,

    /// Delaunay rings around an ineligible tile that may only hold water
    pub water_buffer_rings: usize,

    /// Random seed for resource and dice assignment (separate from layout seed)
    pub resource_seed: u64,
}

impl MapConfig {
    /// Number of hex rings the land is expected to span
    pub fn land_rings(&self) -> usize {
        match self.map_type {
            MapType::Standard => 2,
            _ => rings_for(self.target_tile_count),
        }
    }

    /// Number of rings in the generated point lattice, land plus margin
    pub fn lattice_rings(&self) -> usize {
        self.land_rings() + MARGIN_RINGS
    }

    /// Number of seed points sampled
    pub fn point_count(&self) -> usize {
        hex_tile_count(self.lattice_rings())
    }

    /// Target number of land tiles after shaping
    pub fn land_target(&self) -> usize {
        match self.map_type {
            MapType::Standard => STANDARD_TILE_COUNT,
            _ => self.target_tile_count,
        }
    }

    /// Half-extent of the square sampling region
    ///
    /// Returns the radius_override if set, otherwise a size derived from the
    /// lattice ring count and tile size.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius_override
            .unwrap_or_else(|| self.tile_size * (self.lattice_rings() as f64 + 1.0))
    }

    /// Equivalent hex-grid configuration used when irregular generation fails
    pub fn fallback(&self) -> MapConfig {
        MapConfig {
            map_type: MapType::ExpandedHex,
            ..self.clone()
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfigBuilder::new().seed(0u64).build_unchecked()
    }
}

/// Builder for creating MapConfig with validation
///
/// # Example
///
/// ```rust
/// use rust_polygon_board::*;
///
/// let config = MapConfigBuilder::new()
///     .seed(12345u64)
///     .map_type(MapType::Standard)
///     .build()
///     .unwrap();
/// assert_eq!(config.land_target(), 19);
/// ```
#[derive(Debug, Clone)]
pub struct MapConfigBuilder {
    seed: Option<MapSeed>,
    map_type: MapType,
    target_tile_count: usize,
    irregularity: f64,
    tile_size: f64,
    radius_override: Option<f64>,
    smoothing_iterations: usize,
    smoothing_convergence: f64,
    regularization_iterations: usize,
    erosion_rounds: usize,
    min_triangle_angle: f64,
    water_buffer_rings: usize,
    resource_seed: Option<u64>,
}

impl MapConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - seed: Random (generated from thread_rng)
    /// - map_type: Standard
    /// - target_tile_count: 19
    /// - irregularity: 0.5
    /// - tile_size: 1.0
    /// - smoothing_iterations: 2
    /// - smoothing_convergence: 0.01
    /// - regularization_iterations: 20
    /// - erosion_rounds: 3
    /// - min_triangle_angle: 20 degrees
    /// - water_buffer_rings: 2
    /// - resource_seed: Same as seed
    pub fn new() -> Self {
        Self {
            seed: None,
            map_type: MapType::default(),
            target_tile_count: STANDARD_TILE_COUNT,
            irregularity: 0.5,
            tile_size: 1.0,
            radius_override: None,
            smoothing_iterations: 2,
            smoothing_convergence: 0.01,
            regularization_iterations: MAX_REGULARIZATION_ITERATIONS,
            erosion_rounds: 3,
            min_triangle_angle: 20.0,
            water_buffer_rings: 2,
            resource_seed: None,
        }
    }

    /// Set the seed, either numeric or text
    pub fn seed(mut self, seed: impl Into<MapSeed>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Set the board layout
    pub fn map_type(mut self, map_type: MapType) -> Self {
        self.map_type = map_type;
        self
    }

    /// Set the requested number of land tiles
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the count is below 7 or above 500
    pub fn target_tile_count(mut self, count: usize) -> Result<Self> {
        if !(7..=500).contains(&count) {
            return Err(MapGenError::InvalidConfig(format!(
                "target tile count must be in 7..=500 (got {})",
                count
            )));
        }
        self.target_tile_count = count;
        Ok(self)
    }

    /// Set the irregular point displacement, relative to tile spacing
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if outside 0.0..=1.0
    pub fn irregularity(mut self, irregularity: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&irregularity) {
            return Err(MapGenError::InvalidConfig(format!(
                "irregularity must be in 0..=1 (got {})",
                irregularity
            )));
        }
        self.irregularity = irregularity;
        Ok(self)
    }

    /// Set the centre-to-centre tile spacing
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if size <= 0.0
    pub fn tile_size(mut self, size: f64) -> Result<Self> {
        if !(size > 0.0) {
            return Err(MapGenError::InvalidConfig(format!(
                "tile size must be positive (got {})",
                size
            )));
        }
        self.tile_size = size;
        Ok(self)
    }

    /// Override the half-extent of the sampling region
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if radius <= 0.0
    pub fn radius_override(mut self, radius: f64) -> Result<Self> {
        if !(radius > 0.0) {
            return Err(MapGenError::InvalidConfig(format!(
                "radius override must be positive (got {})",
                radius
            )));
        }
        self.radius_override = Some(radius);
        Ok(self)
    }

    /// Set the number of plain Lloyd smoothing rounds
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if iterations > 20
    pub fn smoothing_iterations(mut self, iterations: usize) -> Result<Self> {
        if iterations > MAX_SMOOTHING_ITERATIONS {
            return Err(MapGenError::InvalidConfig(format!(
                "smoothing iterations must be <= {} (got {})",
                MAX_SMOOTHING_ITERATIONS, iterations
            )));
        }
        self.smoothing_iterations = iterations;
        Ok(self)
    }

    /// Set the convergence threshold for plain smoothing
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if threshold is negative
    pub fn smoothing_convergence(mut self, threshold: f64) -> Result<Self> {
        if threshold < 0.0 || threshold.is_nan() {
            return Err(MapGenError::InvalidConfig(format!(
                "smoothing convergence threshold must be >= 0 (got {})",
                threshold
            )));
        }
        self.smoothing_convergence = threshold;
        Ok(self)
    }

    /// Set the maximum number of regularization rounds
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if iterations > 20
    pub fn regularization_iterations(mut self, iterations: usize) -> Result<Self> {
        if iterations > MAX_REGULARIZATION_ITERATIONS {
            return Err(MapGenError::InvalidConfig(format!(
                "regularization iterations must be <= {} (got {})",
                MAX_REGULARIZATION_ITERATIONS, iterations
            )));
        }
        self.regularization_iterations = iterations;
        Ok(self)
    }

    /// Set the number of coastline erosion rounds
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if rounds > 50
    pub fn erosion_rounds(mut self, rounds: usize) -> Result<Self> {
        if rounds > 50 {
            return Err(MapGenError::InvalidConfig(format!(
                "erosion rounds must be <= 50 (got {})",
                rounds
            )));
        }
        self.erosion_rounds = rounds;
        Ok(self)
    }

    /// Set the minimum interior angle for triangles entering the dual graph
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless 0 < degrees < 60
    pub fn min_triangle_angle(mut self, degrees: f64) -> Result<Self> {
        if !(degrees > 0.0 && degrees < 60.0) {
            return Err(MapGenError::InvalidConfig(format!(
                "minimum triangle angle must be in (0, 60) degrees (got {})",
                degrees
            )));
        }
        self.min_triangle_angle = degrees;
        Ok(self)
    }

    /// Set how many Delaunay rings around an ineligible tile stay water-only
    pub fn water_buffer_rings(mut self, rings: usize) -> Self {
        self.water_buffer_rings = rings;
        self
    }

    /// Set a separate resource seed
    ///
    /// If not set, the resource seed matches the layout seed.
    pub fn resource_seed(mut self, seed: u64) -> Self {
        self.resource_seed = Some(seed);
        self
    }

    /// Build the configuration
    ///
    /// If no seed was provided, generates a random seed using thread_rng.
    pub fn build(self) -> Result<MapConfig> {
        if self.map_type == MapType::Standard && self.target_tile_count != STANDARD_TILE_COUNT {
            tracing::warn!(
                "standard board always has {} tiles, ignoring target of {}",
                STANDARD_TILE_COUNT,
                self.target_tile_count
            );
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> MapConfig {
        let seed = self
            .seed
            .map(|s| s.to_u64())
            .unwrap_or_else(|| rand::random());
        let resource_seed = self.resource_seed.unwrap_or(seed);

        MapConfig {
            seed,
            map_type: self.map_type,
            target_tile_count: self.target_tile_count,
            irregularity: self.irregularity,
            tile_size: self.tile_size,
            radius_override: self.radius_override,
            smoothing_iterations: self.smoothing_iterations,
            smoothing_convergence: self.smoothing_convergence,
            regularization_iterations: self.regularization_iterations,
            erosion_rounds: self.erosion_rounds,
            min_triangle_angle: self.min_triangle_angle,
            water_buffer_rings: self.water_buffer_rings,
            resource_seed,
        }
    }
}

impl Default for MapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
