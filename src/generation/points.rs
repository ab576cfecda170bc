//! Seed point sampling
//!
//! Two strategies place the seed points every tile grows from:
//!
//! - **Poisson-disc** (Bridson's algorithm) for organic, irregular boards.
//!   Points keep a minimum pairwise separation proportional to
//!   `sqrt(area / n)`; each active point gets a bounded number of placement
//!   attempts before it is retired.
//! - **Hex grid** for the standard board and the expanded hex variant. Points
//!   form a hexagonal patch of `rings` rings in axial coordinates, so the
//!   Delaunay-centroid dual of the patch is a field of regular hexagons.
//!
//! # References
//!
//! - [Fast Poisson Disk Sampling in Arbitrary Dimensions (Bridson, 2007)](https://www.cs.ubc.ca/~rbridson/docs/bridson-siggraph07-poissondisk.pdf)

use glam::DVec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

/// Placement attempts per active point before it is retired
pub const POISSON_ATTEMPTS: usize = 30;

/// Poisson separation as a fraction of `sqrt(area / n)`
const SEPARATION_FACTOR: f64 = 0.8;

/// Maximum jitter as a fraction of the Poisson separation, at irregularity 1.0
const JITTER_STRENGTH: f64 = 0.25;

/// A seed location with a stable identity
///
/// The position moves during regularization; the id never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedPoint {
    /// Identity, stable across regularization rounds
    pub id: usize,
    /// Current position
    pub position: DVec2,
}

impl SeedPoint {
    /// Create a new seed point
    pub fn new(id: usize, position: DVec2) -> Self {
        Self { id, position }
    }
}

/// Axis-aligned sampling rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower-left corner
    pub min: DVec2,
    /// Upper-right corner
    pub max: DVec2,
}

impl Bounds {
    /// Square of half-extent `radius` centred on the origin
    pub fn square(radius: f64) -> Self {
        Self {
            min: DVec2::splat(-radius),
            max: DVec2::splat(radius),
        }
    }

    /// Centre of the rectangle
    #[inline]
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    /// Area of the rectangle
    #[inline]
    pub fn area(&self) -> f64 {
        let size = self.max - self.min;
        size.x * size.y
    }

    /// Whether `p` lies inside or on the rectangle
    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Clamp `p` into the rectangle
    #[inline]
    pub fn clamp(&self, p: DVec2) -> DVec2 {
        p.clamp(self.min, self.max)
    }
}

/// Minimum separation used when sampling `count` points inside `bounds`
pub fn poisson_separation(count: usize, bounds: &Bounds) -> f64 {
    SEPARATION_FACTOR * (bounds.area() / count.max(1) as f64).sqrt()
}

/// Sample up to `count` Poisson-disc points inside `bounds`
///
/// Sampling starts at the centre of the rectangle and grows outward. Fewer
/// than `count` points are returned if the rectangle saturates first.
///
/// # Arguments
///
/// * `count` - Target number of points
/// * `bounds` - Sampling rectangle
/// * `rng` - Random source, threaded through for determinism
///
/// # Example
///
/// ```rust
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use rust_polygon_board::generation::{generate_poisson_points, Bounds};
///
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let points = generate_poisson_points(100, &Bounds::square(10.0), &mut rng);
/// assert!(points.len() <= 100);
/// ```
pub fn generate_poisson_points(
    count: usize,
    bounds: &Bounds,
    rng: &mut ChaCha8Rng,
) -> Vec<SeedPoint> {
    if count == 0 {
        return Vec::new();
    }

    let separation = poisson_separation(count, bounds);
    let cell = separation / std::f64::consts::SQRT_2;
    let size = bounds.max - bounds.min;
    let cols = (size.x / cell).ceil().max(1.0) as usize;
    let rows = (size.y / cell).ceil().max(1.0) as usize;
    let mut grid: Vec<Option<usize>> = vec![None; cols * rows];

    let cell_of = |p: DVec2| -> (usize, usize) {
        let local = (p - bounds.min) / cell;
        (
            (local.x as usize).min(cols - 1),
            (local.y as usize).min(rows - 1),
        )
    };

    let mut points: Vec<DVec2> = Vec::with_capacity(count);
    let mut active: Vec<usize> = Vec::new();

    let first = bounds.center();
    let (cx, cy) = cell_of(first);
    grid[cy * cols + cx] = Some(0);
    points.push(first);
    active.push(0);

    while !active.is_empty() && points.len() < count {
        let slot = rng.gen_range(0..active.len());
        let origin = points[active[slot]];
        let mut placed = false;

        for _ in 0..POISSON_ATTEMPTS {
            let angle: f64 = rng.gen_range(0.0..2.0 * PI);
            let distance: f64 = rng.gen_range(separation..2.0 * separation);
            let candidate = origin + DVec2::new(angle.cos(), angle.sin()) * distance;
            if !bounds.contains(candidate) {
                continue;
            }

            let (gx, gy) = cell_of(candidate);
            let too_close = (gy.saturating_sub(2)..(gy + 3).min(rows)).any(|y| {
                (gx.saturating_sub(2)..(gx + 3).min(cols)).any(|x| {
                    grid[y * cols + x]
                        .map(|i| points[i].distance_squared(candidate) < separation * separation)
                        .unwrap_or(false)
                })
            });
            if too_close {
                continue;
            }

            let index = points.len();
            grid[gy * cols + gx] = Some(index);
            points.push(candidate);
            active.push(index);
            placed = true;
            break;
        }

        if !placed {
            active.swap_remove(slot);
        }
    }

    if points.len() < count {
        tracing::debug!(
            "Poisson sampling saturated at {} of {} points (separation {:.4})",
            points.len(),
            count,
            separation
        );
    }

    points
        .into_iter()
        .enumerate()
        .map(|(id, position)| SeedPoint::new(id, position))
        .collect()
}

/// Displace each point by a random offset of up to
/// `irregularity * JITTER_STRENGTH * separation`, clamped to `bounds`
pub fn jitter_points(
    points: &mut [SeedPoint],
    irregularity: f64,
    separation: f64,
    bounds: &Bounds,
    rng: &mut ChaCha8Rng,
) {
    let amount = irregularity * JITTER_STRENGTH * separation;
    if amount <= 0.0 {
        return;
    }

    for point in points.iter_mut() {
        let angle: f64 = rng.gen_range(0.0..2.0 * PI);
        let magnitude: f64 = rng.gen_range(0.0..amount);
        let offset = DVec2::new(angle.cos(), angle.sin()) * magnitude;
        point.position = bounds.clamp(point.position + offset);
    }
}

/// Generate a hexagonal patch of points with `rings` rings around the origin
///
/// Neighbouring points are `spacing` apart. Points are emitted ring by ring,
/// centre first, so ids grow outward.
///
/// # Example
///
/// ```rust
/// use rust_polygon_board::generation::generate_hex_points;
///
/// let points = generate_hex_points(2, 1.0);
/// assert_eq!(points.len(), 19);
/// ```
pub fn generate_hex_points(rings: usize, spacing: f64) -> Vec<SeedPoint> {
    let rings = rings as i64;
    let mut axial: Vec<(i64, i64)> = Vec::new();
    for q in -rings..=rings {
        for r in (-rings).max(-q - rings)..=rings.min(-q + rings) {
            axial.push((q, r));
        }
    }
    axial.sort_by_key(|&(q, r)| {
        let ring = q.abs().max(r.abs()).max((q + r).abs());
        (ring, r, q)
    });

    let row_height = spacing * 3f64.sqrt() / 2.0;
    axial
        .into_iter()
        .enumerate()
        .map(|(id, (q, r))| {
            let position = DVec2::new(spacing * (q as f64 + r as f64 / 2.0), row_height * r as f64);
            SeedPoint::new(id, position)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_poisson_point_count() {
        let bounds = Bounds::square(10.0);
        for count in [10, 50, 150] {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let points = generate_poisson_points(count, &bounds, &mut rng);
            assert!(points.len() <= count);
            assert!(points.len() > count / 2, "sampled only {} of {}", points.len(), count);
        }
    }

    #[test]
    fn test_poisson_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(generate_poisson_points(0, &Bounds::square(10.0), &mut rng).is_empty());
    }

    #[test]
    fn test_poisson_separation_and_bounds() {
        let bounds = Bounds::square(8.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let points = generate_poisson_points(120, &bounds, &mut rng);
        let separation = poisson_separation(120, &bounds);

        for (i, a) in points.iter().enumerate() {
            assert!(bounds.contains(a.position));
            assert_eq!(a.id, i);
            for b in &points[i + 1..] {
                assert!(
                    a.position.distance(b.position) >= separation - 1e-9,
                    "points {} and {} closer than {}",
                    a.id,
                    b.id,
                    separation
                );
            }
        }
    }

    #[test]
    fn test_poisson_determinism() {
        let bounds = Bounds::square(10.0);
        let points1 = generate_poisson_points(100, &bounds, &mut ChaCha8Rng::seed_from_u64(12345));
        let points2 = generate_poisson_points(100, &bounds, &mut ChaCha8Rng::seed_from_u64(12345));
        assert_eq!(points1, points2);
    }

    #[test]
    fn test_poisson_different_seeds() {
        let bounds = Bounds::square(10.0);
        let points1 = generate_poisson_points(100, &bounds, &mut ChaCha8Rng::seed_from_u64(1));
        let points2 = generate_poisson_points(100, &bounds, &mut ChaCha8Rng::seed_from_u64(2));
        let any_different = points1
            .iter()
            .zip(points2.iter())
            .any(|(a, b)| a.position.distance(b.position) > 0.01);
        assert!(any_different, "Different seeds should produce different points");
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let bounds = Bounds::square(3.0);
        let mut points = generate_hex_points(3, 1.0);
        let original = points.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        jitter_points(&mut points, 1.0, 1.0, &bounds, &mut rng);

        for (before, after) in original.iter().zip(points.iter()) {
            assert_eq!(before.id, after.id);
            assert!(bounds.contains(after.position));
            assert!(before.position.distance(after.position) <= JITTER_STRENGTH + 1e-9);
        }
    }

    #[test]
    fn test_zero_irregularity_is_noop() {
        let bounds = Bounds::square(3.0);
        let mut points = generate_hex_points(2, 1.0);
        let original = points.clone();
        jitter_points(&mut points, 0.0, 1.0, &bounds, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(points, original);
    }

    #[test]
    fn test_hex_point_counts() {
        assert_eq!(generate_hex_points(0, 1.0).len(), 1);
        assert_eq!(generate_hex_points(1, 1.0).len(), 7);
        assert_eq!(generate_hex_points(2, 1.0).len(), 19);
        assert_eq!(generate_hex_points(5, 1.0).len(), 91);
    }

    #[test]
    fn test_hex_points_spacing() {
        let points = generate_hex_points(2, 2.0);
        assert_eq!(points[0].position, DVec2::ZERO);

        // The first ring sits exactly one spacing from the centre
        for p in &points[1..7] {
            assert!((p.position.length() - 2.0).abs() < 1e-9);
        }

        // No two points are closer than the spacing
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.position.distance(b.position) >= 2.0 - 1e-9);
            }
        }
    }
}
