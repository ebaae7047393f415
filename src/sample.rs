//! Rejection sampling of dot positions.
//!
//! Each point gets up to [`MAX_ATTEMPTS`] uniform draws inside the margin-inset region. A draw
//! is accepted when it keeps `min_separation` from every point accepted so far. When all draws
//! fail the point is pinned to a square grid spanning the same region. Grid placement does
//! not re-check separation, so a set containing grid points may violate the spacing bound.

use rand::Rng;

use crate::foundation::core::Point;

pub const MAX_ATTEMPTS: usize = 100;

/// How a point ended up where it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Placement {
    Random,
    Grid,
}

/// Sampled points in sample order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PointSet {
    points: Vec<Point>,
    placements: Vec<Placement>,
}

impl PointSet {
    /// Build a set from explicit positions, all marked as random placements.
    pub fn from_points(points: Vec<Point>) -> Self {
        let placements = vec![Placement::Random; points.len()];
        Self { points, placements }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn grid_fallbacks(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| **p == Placement::Grid)
            .count()
    }
}

/// Region and spacing constraints for one sampling call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleBounds {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub min_separation: f64,
}

impl SampleBounds {
    fn axis_range(dim: u32, margin: u32) -> (i32, i32) {
        let lo = margin as i32;
        let hi = (dim as i32 - margin as i32).max(lo);
        (lo, hi)
    }
}

/// Sample exactly `count` points. Never fails.
pub fn sample_points<R: Rng + ?Sized>(
    count: usize,
    bounds: SampleBounds,
    rng: &mut R,
) -> PointSet {
    let (x_lo, x_hi) = SampleBounds::axis_range(bounds.width, bounds.margin);
    let (y_lo, y_hi) = SampleBounds::axis_range(bounds.height, bounds.margin);
    let min_sq = bounds.min_separation * bounds.min_separation;

    let mut points = Vec::with_capacity(count);
    let mut placements = Vec::with_capacity(count);

    for _ in 0..count {
        let mut accepted = None;
        for _ in 0..MAX_ATTEMPTS {
            let x = rng.random_range(x_lo..=x_hi);
            let y = rng.random_range(y_lo..=y_hi);
            let candidate = Point::new(x, y);
            let clear = points
                .iter()
                .all(|p: &Point| (p.distance_sq(candidate) as f64) >= min_sq);
            if clear {
                accepted = Some(candidate);
                break;
            }
        }

        match accepted {
            Some(p) => {
                points.push(p);
                placements.push(Placement::Random);
            }
            None => {
                let p = grid_position(points.len(), count, bounds);
                tracing::debug!(
                    index = points.len(),
                    x = p.x,
                    y = p.y,
                    "random placement exhausted, using grid fallback"
                );
                points.push(p);
                placements.push(Placement::Grid);
            }
        }
    }

    PointSet { points, placements }
}

/// Deterministic grid slot for the `index`-th point of a `count`-point set.
pub fn grid_position(index: usize, count: usize, bounds: SampleBounds) -> Point {
    let grid = (count as f64).sqrt().ceil() as usize;
    let row = index / grid.max(1);
    let col = index % grid.max(1);

    let axis = |dim: u32, slot: usize| -> i32 {
        if grid > 1 {
            let span = f64::from(dim) - 2.0 * f64::from(bounds.margin);
            (f64::from(bounds.margin) + span * slot as f64 / (grid - 1) as f64) as i32
        } else {
            (dim / 2) as i32
        }
    };

    Point::new(axis(bounds.width, col), axis(bounds.height, row))
}
