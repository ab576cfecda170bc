//! Board generation pipelines
//!
//! Two pipelines share the same stages:
//!
//! - **Hex**: hex-grid points → dual graph → landmass → assembly → validation
//! - **Irregular**: Poisson-disc points → jitter → Lloyd smoothing →
//!   regularization → landmass → assembly → validation
//!
//! All working state lives in a [`GenerationContext`] owned by the call, so
//! boards can be generated concurrently. If the irregular pipeline fails with
//! a recoverable error, generation falls back to the hex pipeline with the
//! same parameters.

mod assemble;
mod delaunay;
mod dual;
mod landmass;
mod lloyd;
mod points;
mod regularize;

pub use assemble::{assemble, walk_perimeter, BoardGraph, POSITION_TOLERANCE};
pub use delaunay::{in_circumcircle, orient, triangulate};
pub use dual::{min_interior_angle, DualEdge, DualGraph, DualOptions, TileCandidate, Triangle};
pub use landmass::{shape_landmass, Growth, Landmass, LandmassOptions};
pub use lloyd::{lloyd_relaxation_with_options, polygon_area, polygon_centroid, LloydOptions};
pub use points::{
    generate_hex_points, generate_poisson_points, jitter_points, poisson_separation, Bounds,
    SeedPoint, POISSON_ATTEMPTS,
};
pub use regularize::{regularize, Regularized, RegularizerOptions};

use glam::DVec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use crate::config::{hex_tile_count, MapConfig, MapType};
use crate::error::{MapGenError, Result};
use crate::validate::{validate, ValidationIssue};

/// Land count floor, as a fraction of the target
const MIN_LAND_FRACTION: f64 = 0.85;

/// Working state of one generation call
///
/// Stages run as methods in pipeline order; each reads what the previous
/// stage left behind. Nothing outlives the call.
#[derive(Debug)]
pub struct GenerationContext<'a> {
    /// Parameters of this run
    pub config: &'a MapConfig,
    /// Random source shared by every stage, seeded from `config.seed`
    pub rng: ChaCha8Rng,
    /// Sampling rectangle
    pub bounds: Bounds,
    /// Dual graph construction options
    pub dual: DualOptions,
    /// Current seed points
    pub points: Vec<SeedPoint>,
    /// Dual graph of `points`, once built
    pub graph: Option<DualGraph>,
    /// Land and water partition, once shaped
    pub landmass: Landmass,
}

impl<'a> GenerationContext<'a> {
    /// Fresh context for `config`
    pub fn new(config: &'a MapConfig) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            bounds: Bounds::square(config.radius()),
            dual: DualOptions {
                min_angle_degrees: config.min_triangle_angle,
                water_buffer_rings: config.water_buffer_rings,
                ..DualOptions::default()
            },
            points: Vec::new(),
            graph: None,
            landmass: Landmass::default(),
        }
    }

    /// Place seed points on a hex grid
    pub fn sample_hex(&mut self) {
        self.points = generate_hex_points(self.config.lattice_rings(), self.config.tile_size);
        self.graph = None;
    }

    /// Place Poisson-disc seed points and jitter them by the configured irregularity
    pub fn sample_poisson(&mut self) {
        let count = self.config.point_count();
        self.points = generate_poisson_points(count, &self.bounds, &mut self.rng);
        let separation = poisson_separation(count, &self.bounds);
        jitter_points(
            &mut self.points,
            self.config.irregularity,
            separation,
            &self.bounds,
            &mut self.rng,
        );
        self.graph = None;
        tracing::debug!("Sampled {} of {} Poisson points", self.points.len(), count);
    }

    /// Plain Lloyd smoothing of every interior point
    pub fn smooth(&mut self) {
        if self.config.smoothing_iterations == 0 {
            return;
        }
        let options = LloydOptions {
            max_iterations: self.config.smoothing_iterations,
            convergence_threshold: self.config.smoothing_convergence,
        };
        let points = std::mem::take(&mut self.points);
        self.points = lloyd_relaxation_with_options(
            points,
            &self.bounds,
            self.config.tile_size,
            &self.dual,
            options,
        );
        self.graph = None;
    }

    /// Build the dual graph of the current points
    pub fn build_graph(&mut self) -> Result<()> {
        let positions: Vec<DVec2> = self.points.iter().map(|p| p.position).collect();
        self.graph = Some(DualGraph::build(&positions, &self.dual)?);
        Ok(())
    }

    /// Regularize the current points, leaving the final graph in place
    pub fn regularize(&mut self) -> Result<()> {
        let options = RegularizerOptions {
            max_iterations: self.config.regularization_iterations,
            ..RegularizerOptions::default()
        };
        let points = std::mem::take(&mut self.points);
        let result = regularize(points, &self.bounds, &self.dual, &options)?;
        self.points = result.points;
        self.graph = Some(result.graph);
        Ok(())
    }

    /// Grow and shape the landmass on the current graph
    pub fn shape_land(&mut self, growth: Growth, erosion_rounds: usize) -> Result<()> {
        let options = LandmassOptions {
            growth,
            erosion_rounds,
        };
        let graph = self.graph.as_ref().ok_or(MapGenError::InsufficientPoints {
            found: self.points.len(),
        })?;
        self.landmass = shape_landmass(graph, self.bounds.center(), &options, &mut self.rng);
        Ok(())
    }

    /// Reject a landmass far from the requested size
    pub fn check_land_size(&self) -> Result<()> {
        let target = self.config.land_target();
        let minimum = (target as f64 * MIN_LAND_FRACTION).ceil() as usize;
        let maximum = hex_tile_count(self.config.land_rings()).max(target);
        let found = self.landmass.land.len();
        if found < minimum || found > maximum {
            return Err(MapGenError::ValidationFailed(vec![ValidationIssue::LandmassSize {
                found,
                minimum,
                maximum,
            }]));
        }
        Ok(())
    }

    /// Assemble and validate the board records
    pub fn assemble(&self) -> Result<BoardGraph> {
        let graph = self.graph()?;
        let board = assemble(graph, &self.landmass.land);
        validate(&board.tiles, &board.nodes, &board.edges).into_result()?;
        Ok(board)
    }

    fn graph(&self) -> Result<&DualGraph> {
        self.graph.as_ref().ok_or(MapGenError::InsufficientPoints {
            found: self.points.len(),
        })
    }
}

/// A validated board and the generator that produced it
#[derive(Debug, Clone)]
pub struct GeneratedBoard {
    /// Tiles, nodes and edges
    pub board: BoardGraph,
    /// Generator that actually produced the board
    pub map_type: MapType,
    /// The requested generator failed and the hex fallback was used
    pub used_fallback: bool,
}

/// Run the hex-grid pipeline
///
/// The standard board is the seed tile plus two rings and skips erosion;
/// the expanded variant grows a random frontier and erodes its coastline.
pub fn generate_hex(config: &MapConfig) -> Result<BoardGraph> {
    let start = Instant::now();
    let mut ctx = GenerationContext::new(config);

    ctx.sample_hex();
    ctx.build_graph()?;
    match config.map_type {
        MapType::Standard => ctx.shape_land(Growth::Rings(2), 0)?,
        _ => ctx.shape_land(Growth::Frontier(config.land_target()), config.erosion_rounds)?,
    }
    ctx.check_land_size()?;
    let board = ctx.assemble()?;

    tracing::info!(
        "Hex board ({}): {} tiles in {:?}",
        config.map_type.name(),
        board.tiles.len(),
        start.elapsed()
    );
    Ok(board)
}

/// Run the irregular Delaunay-centroid pipeline
pub fn generate_irregular(config: &MapConfig) -> Result<BoardGraph> {
    let start = Instant::now();
    let mut ctx = GenerationContext::new(config);

    ctx.sample_poisson();
    ctx.smooth();
    ctx.regularize()?;
    ctx.shape_land(Growth::Frontier(config.land_target()), config.erosion_rounds)?;
    ctx.check_land_size()?;
    let board = ctx.assemble()?;

    tracing::info!(
        "Irregular board: {} tiles from {} points in {:?}",
        board.tiles.len(),
        ctx.points.len(),
        start.elapsed()
    );
    Ok(board)
}

/// Run `primary`; on a recoverable failure run `fallback` instead
///
/// # Returns
///
/// The produced value and whether the fallback was used
///
/// # Errors
///
/// Non-recoverable primary errors are returned unchanged. If the fallback
/// also fails, both errors are returned as `GenerationExhausted`.
pub fn or_fallback<T, P, F>(primary: P, fallback: F) -> Result<(T, bool)>
where
    P: FnOnce() -> Result<T>,
    F: FnOnce() -> Result<T>,
{
    match primary() {
        Ok(value) => Ok((value, false)),
        Err(err) if err.is_recoverable() => {
            tracing::warn!("Primary generator failed, falling back: {}", err);
            match fallback() {
                Ok(value) => Ok((value, true)),
                Err(fallback_err) => Err(MapGenError::GenerationExhausted {
                    primary: Box::new(err),
                    fallback: Box::new(fallback_err),
                }),
            }
        }
        Err(err) => Err(err),
    }
}

/// Generate a validated board for `config`
///
/// Hex map types run the hex pipeline directly; a failure there is final.
/// The irregular map type falls back to the hex pipeline once.
pub fn generate_board(config: &MapConfig) -> Result<GeneratedBoard> {
    if config.map_type.is_hex() {
        let board = generate_hex(config)?;
        return Ok(GeneratedBoard {
            board,
            map_type: config.map_type,
            used_fallback: false,
        });
    }

    let fallback = config.fallback();
    let (board, used_fallback) =
        or_fallback(|| generate_irregular(config), || generate_hex(&fallback))?;
    Ok(GeneratedBoard {
        board,
        map_type: if used_fallback { fallback.map_type } else { config.map_type },
        used_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfigBuilder;

    fn config(map_type: MapType, seed: u64, target: usize) -> MapConfig {
        MapConfigBuilder::new()
            .seed(seed)
            .map_type(map_type)
            .target_tile_count(target)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_standard_pipeline() {
        let board = generate_hex(&config(MapType::Standard, 12345, 19)).unwrap();
        assert_eq!(board.tiles.len(), 19);
        assert_eq!(board.nodes.len(), 54);
        assert_eq!(board.edges.len(), 72);
    }

    #[test]
    fn test_expanded_hex_pipeline() {
        let board = generate_hex(&config(MapType::ExpandedHex, 7, 30)).unwrap();
        assert!((24..=37).contains(&board.tiles.len()), "got {}", board.tiles.len());
        assert!(board.tiles.iter().all(|t| t.nodes.len() == 6));
    }

    #[test]
    fn test_generate_board_never_returns_invalid() {
        for seed in [1u64, 2, 3] {
            let generated = generate_board(&config(MapType::ExpandedDelaunay, seed, 30)).unwrap();
            let board = &generated.board;
            assert!(validate(&board.tiles, &board.nodes, &board.edges).valid);
            assert_eq!(generated.used_fallback, generated.map_type == MapType::ExpandedHex);
        }
    }

    #[test]
    fn test_or_fallback_paths() {
        let ok: Result<(u32, bool)> = or_fallback(|| Ok(1), || Ok(2));
        assert_eq!(ok.unwrap(), (1, false));

        let fell_back = or_fallback(|| Err(MapGenError::InsufficientPoints { found: 0 }), || Ok(2));
        assert_eq!(fell_back.unwrap(), (2, true));

        let fatal: Result<(u32, bool)> =
            or_fallback(|| Err(MapGenError::InvalidConfig("x".into())), || Ok(2));
        assert!(matches!(fatal, Err(MapGenError::InvalidConfig(_))));

        let exhausted: Result<(u32, bool)> = or_fallback(
            || Err(MapGenError::TriangulationCollapsed { iteration: 0 }),
            || Err(MapGenError::ValidationFailed(vec![ValidationIssue::EmptyBoard])),
        );
        assert!(matches!(exhausted, Err(MapGenError::GenerationExhausted { .. })));
    }

    #[test]
    fn test_context_requires_graph() {
        let config = config(MapType::Standard, 1, 19);
        let ctx = GenerationContext::new(&config);
        assert!(matches!(ctx.assemble(), Err(MapGenError::InsufficientPoints { found: 0 })));
    }

    #[test]
    fn test_land_size_check() {
        let config = config(MapType::ExpandedHex, 1, 30);
        let mut ctx = GenerationContext::new(&config);
        ctx.landmass.land = (0..10).collect();
        let err = ctx.check_land_size().unwrap_err();
        assert_eq!(
            err.validation_issues(),
            &[ValidationIssue::LandmassSize {
                found: 10,
                minimum: 26,
                maximum: 37
            }]
        );
    }

    #[test]
    fn test_contexts_are_independent() {
        let config = config(MapType::ExpandedDelaunay, 99, 30);
        let mut a = GenerationContext::new(&config);
        let mut b = GenerationContext::new(&config);
        a.sample_poisson();
        b.sample_poisson();
        assert_eq!(a.points, b.points);
    }
}
