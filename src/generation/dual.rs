//! Dual tile graph construction from a Delaunay triangulation
//!
//! Every valid triangle contributes one dual vertex at its centroid. The tile
//! around a seed point is the polygon of dual vertices of the valid triangles
//! that contain it, ordered by polar angle about the point.
//!
//! Two tiles are Voronoi neighbours when they share a dual edge, i.e. both
//! triangles on their common Delaunay edge are valid. Sharing only one valid
//! triangle means the tiles merely touch at a corner or across the hull.

use glam::DVec2;
use std::collections::{HashMap, VecDeque};

use super::delaunay::triangulate;
use super::lloyd::{polygon_area, polygon_centroid};
use crate::error::Result;

/// Type alias for the undirected Delaunay edge -> triangles map
type EdgeTriangleMap = HashMap<(usize, usize), Vec<usize>>;

/// Tunables for dual graph construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualOptions {
    /// Minimum interior angle (degrees) for a triangle to be valid
    pub min_angle_degrees: f64,
    /// Neighbour deficiency at which a tile becomes ineligible
    pub ineligible_deficiency: usize,
    /// Delaunay rings around an ineligible tile that are water-only
    pub water_buffer_rings: usize,
}

impl Default for DualOptions {
    fn default() -> Self {
        Self {
            min_angle_degrees: 20.0,
            ineligible_deficiency: 2,
            water_buffer_rings: 2,
        }
    }
}

/// A Delaunay triangle with its dual vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Point indices, counter-clockwise
    pub vertices: [usize; 3],
    /// Centroid, the position of this triangle's dual vertex
    pub centroid: DVec2,
    /// All interior angles meet the minimum-angle threshold
    pub valid: bool,
}

impl Triangle {
    /// Whether this triangle references point `p`
    #[inline]
    pub fn contains(&self, p: usize) -> bool {
        self.vertices.contains(&p)
    }
}

/// Undirected link between the dual vertices of two valid triangles that
/// share a Delaunay edge; `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DualEdge {
    /// Lower triangle index
    pub a: usize,
    /// Higher triangle index
    pub b: usize,
}

/// Per-point tile candidate
#[derive(Debug, Clone, Default)]
pub struct TileCandidate {
    /// Valid triangle indices (dual vertices) sorted by polar angle about the point
    pub polygon: Vec<usize>,
    /// Points sharing a Delaunay edge with this one
    pub delaunay_neighbors: Vec<usize>,
    /// Points sharing a dual edge (two valid triangles) with this one
    pub voronoi_neighbors: Vec<usize>,
    /// Fewer Voronoi than Delaunay neighbours
    pub edge: bool,
    /// Deficiency at or above the ineligibility bound, or a degenerate polygon
    pub ineligible: bool,
    /// Within the water buffer of an ineligible tile
    pub water_only: bool,
}

impl TileCandidate {
    /// Delaunay neighbours that are not Voronoi neighbours
    #[inline]
    pub fn deficiency(&self) -> usize {
        self.delaunay_neighbors.len() - self.voronoi_neighbors.len()
    }

    /// Fewer than three valid triangles surround the point
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.polygon.len() < 3
    }
}

/// The triangulation, its dual vertices and edges, and one tile candidate per point
///
/// Rebuilt from scratch whenever points move.
#[derive(Debug, Clone)]
pub struct DualGraph {
    /// Point positions the graph was built from
    pub positions: Vec<DVec2>,
    /// All Delaunay triangles, valid or not
    pub triangles: Vec<Triangle>,
    /// Dual edges, sorted
    pub dual_edges: Vec<DualEdge>,
    /// Tile candidate per point, same indexing as `positions`
    pub tiles: Vec<TileCandidate>,
}

impl DualGraph {
    /// Triangulate `positions` and build the dual graph
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPoints` if fewer than three points are supplied
    ///
    /// # Example
    ///
    /// ```rust
    /// use rust_polygon_board::generation::{generate_hex_points, DualGraph, DualOptions};
    ///
    /// let positions: Vec<_> = generate_hex_points(4, 1.0).iter().map(|p| p.position).collect();
    /// let graph = DualGraph::build(&positions, &DualOptions::default()).unwrap();
    /// // The centre of a hex patch is a closed hexagon
    /// assert_eq!(graph.tiles[0].polygon.len(), 6);
    /// ```
    pub fn build(positions: &[DVec2], options: &DualOptions) -> Result<Self> {
        let triangles = triangulate(positions)?;
        Ok(Self::from_triangulation(positions, &triangles, options))
    }

    /// Build the dual graph from an existing triangulation
    pub fn from_triangulation(
        positions: &[DVec2],
        triangle_indices: &[[usize; 3]],
        options: &DualOptions,
    ) -> Self {
        let min_angle = options.min_angle_degrees.to_radians();

        let triangles: Vec<Triangle> = triangle_indices
            .iter()
            .map(|&vertices| {
                let [a, b, c] = vertices.map(|v| positions[v]);
                Triangle {
                    vertices,
                    centroid: (a + b + c) / 3.0,
                    valid: min_interior_angle(a, b, c) >= min_angle,
                }
            })
            .collect();

        let edge_map = build_edge_triangle_map(&triangles);

        let mut dual_edges: Vec<DualEdge> = edge_map
            .values()
            .filter(|tris| tris.len() == 2 && tris.iter().all(|&t| triangles[t].valid))
            .map(|tris| DualEdge {
                a: tris[0].min(tris[1]),
                b: tris[0].max(tris[1]),
            })
            .collect();
        dual_edges.sort_unstable();

        let mut tiles: Vec<TileCandidate> = vec![TileCandidate::default(); positions.len()];

        // Neighbour relations, keyed by Delaunay edge
        let mut edges: Vec<(&(usize, usize), &Vec<usize>)> = edge_map.iter().collect();
        edges.sort_unstable_by_key(|(key, _)| **key);
        for (&(p, q), tris) in edges {
            tiles[p].delaunay_neighbors.push(q);
            tiles[q].delaunay_neighbors.push(p);
            if tris.len() == 2 && tris.iter().all(|&t| triangles[t].valid) {
                tiles[p].voronoi_neighbors.push(q);
                tiles[q].voronoi_neighbors.push(p);
            }
        }

        // Polygons from valid triangles, ordered by angle about the point
        for (t, triangle) in triangles.iter().enumerate() {
            if triangle.valid {
                for &v in &triangle.vertices {
                    tiles[v].polygon.push(t);
                }
            }
        }
        for (p, tile) in tiles.iter_mut().enumerate() {
            tile.delaunay_neighbors.sort_unstable();
            tile.voronoi_neighbors.sort_unstable();
            order_by_angle(&mut tile.polygon, positions[p], |t| triangles[t].centroid);

            let deficiency = tile.deficiency();
            tile.edge = deficiency > 0;
            tile.ineligible = deficiency >= options.ineligible_deficiency || tile.is_degenerate();
        }

        mark_water_buffer(&mut tiles, options.water_buffer_rings);

        let graph = Self {
            positions: positions.to_vec(),
            triangles,
            dual_edges,
            tiles,
        };

        tracing::debug!(
            "Dual graph: {} points, {} triangles ({} valid), {} dual edges, {} ineligible tiles",
            graph.positions.len(),
            graph.triangles.len(),
            graph.valid_triangle_count(),
            graph.dual_edges.len(),
            graph.tiles.iter().filter(|t| t.ineligible).count()
        );

        graph
    }

    /// Number of points (tile candidates)
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the graph has no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of triangles that passed the minimum-angle test
    pub fn valid_triangle_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.valid).count()
    }

    /// Position of the dual vertex of triangle `t`
    #[inline]
    pub fn dual_vertex(&self, t: usize) -> DVec2 {
        self.triangles[t].centroid
    }

    /// Dual-vertex positions of a tile's polygon, in angular order
    pub fn polygon_positions(&self, tile: usize) -> Vec<DVec2> {
        self.tiles[tile]
            .polygon
            .iter()
            .map(|&t| self.dual_vertex(t))
            .collect()
    }

    /// Tile has a closed polygon with every Delaunay neighbour also a Voronoi neighbour
    #[inline]
    pub fn is_interior(&self, tile: usize) -> bool {
        let candidate = &self.tiles[tile];
        !candidate.edge && !candidate.ineligible && !candidate.is_degenerate()
    }

    /// Tile may be placed as land
    #[inline]
    pub fn can_be_land(&self, tile: usize) -> bool {
        let candidate = &self.tiles[tile];
        !candidate.ineligible && !candidate.water_only && !candidate.is_degenerate()
    }

    /// Tile may be classified as water
    #[inline]
    pub fn can_be_water(&self, tile: usize) -> bool {
        let candidate = &self.tiles[tile];
        !candidate.ineligible && !candidate.is_degenerate()
    }

    /// Area of the tile polygon (shoelace formula)
    pub fn tile_area(&self, tile: usize) -> f64 {
        polygon_area(&self.polygon_positions(tile)).abs()
    }

    /// Area-weighted centroid of the tile polygon
    pub fn tile_centroid(&self, tile: usize) -> Option<DVec2> {
        polygon_centroid(&self.polygon_positions(tile))
    }

    /// Voronoi neighbour of `tile` nearest to it by Euclidean distance
    pub fn nearest_voronoi_neighbor(&self, tile: usize) -> Option<usize> {
        let origin = self.positions[tile];
        self.tiles[tile]
            .voronoi_neighbors
            .iter()
            .copied()
            .min_by(|&a, &b| {
                origin
                    .distance_squared(self.positions[a])
                    .total_cmp(&origin.distance_squared(self.positions[b]))
            })
    }

    /// Tiles within `hops` Voronoi steps of any tile in `starts` (including the starts)
    pub fn voronoi_within(&self, starts: &[usize], hops: usize) -> Vec<usize> {
        let distances = hop_distances(&self.tiles, starts, hops, |t| &t.voronoi_neighbors);
        distances
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|_| i))
            .collect()
    }
}

/// Smallest interior angle of triangle `(a, b, c)`, in radians
pub fn min_interior_angle(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    let angle = |apex: DVec2, p: DVec2, q: DVec2| {
        let u = p - apex;
        let v = q - apex;
        u.perp_dot(v).abs().atan2(u.dot(v))
    };
    angle(a, b, c).min(angle(b, c, a)).min(angle(c, a, b))
}

/// Sort `items` counter-clockwise by the polar angle of their position about `center`
pub fn order_by_angle<F>(items: &mut [usize], center: DVec2, position: F)
where
    F: Fn(usize) -> DVec2,
{
    items.sort_by(|&a, &b| {
        let da = position(a) - center;
        let db = position(b) - center;
        da.y.atan2(da.x).total_cmp(&db.y.atan2(db.x)).then(a.cmp(&b))
    });
}

/// Build map from undirected Delaunay edge to the triangles bordering it
fn build_edge_triangle_map(triangles: &[Triangle]) -> EdgeTriangleMap {
    let mut map: EdgeTriangleMap = HashMap::new();

    for (t, triangle) in triangles.iter().enumerate() {
        for k in 0..3 {
            let p = triangle.vertices[k];
            let q = triangle.vertices[(k + 1) % 3];
            map.entry((p.min(q), p.max(q))).or_default().push(t);
        }
    }

    map
}

/// Mark every tile within `rings` Delaunay steps of an ineligible tile as water-only
fn mark_water_buffer(tiles: &mut [TileCandidate], rings: usize) {
    let ineligible: Vec<usize> = tiles
        .iter()
        .enumerate()
        .filter(|(_, t)| t.ineligible)
        .map(|(i, _)| i)
        .collect();

    let distances = hop_distances(tiles, &ineligible, rings, |t| &t.delaunay_neighbors);
    for (tile, distance) in tiles.iter_mut().zip(distances) {
        if matches!(distance, Some(d) if d > 0) {
            tile.water_only = true;
        }
    }
}

/// Multi-source BFS hop distances, cut off after `hops` steps
fn hop_distances<F>(
    tiles: &[TileCandidate],
    starts: &[usize],
    hops: usize,
    neighbors: F,
) -> Vec<Option<usize>>
where
    F: Fn(&TileCandidate) -> &Vec<usize>,
{
    let mut distance: Vec<Option<usize>> = vec![None; tiles.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for &s in starts {
        if distance[s].is_none() {
            distance[s] = Some(0);
            queue.push_back(s);
        }
    }

    while let Some(current) = queue.pop_front() {
        let d = distance[current].unwrap_or(0);
        if d >= hops {
            continue;
        }
        for &n in neighbors(&tiles[current]) {
            if distance[n].is_none() {
                distance[n] = Some(d + 1);
                queue.push_back(n);
            }
        }
    }

    distance
}
