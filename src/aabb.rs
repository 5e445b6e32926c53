use nalgebra::Vector2;

use crate::gravity::AREA_PADDING;

/// Index of a child quadrant, in insertion order.
pub const NORTH_WEST: usize = 0;
pub const NORTH_EAST: usize = 1;
pub const SOUTH_WEST: usize = 2;
pub const SOUTH_EAST: usize = 3;

/// Axis-aligned square region. North is +y.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub center: Vector2<f32>,
    pub half_dimension: f32,
}

impl Aabb {
    #[must_use]
    pub fn new(center: Vector2<f32>, half_dimension: f32) -> Self {
        Self {
            center,
            half_dimension,
        }
    }

    /// Square region covering a `width` x `height` display area whose origin
    /// is at the corner, padded by [`AREA_PADDING`].
    #[must_use]
    pub fn from_visual_area(width: f32, height: f32) -> Self {
        Self::new(
            Vector2::new(width / 2., height / 2.),
            (width / 2.).max(height / 2.) + AREA_PADDING,
        )
    }

    /// Containment test, inclusive on all four edges.
    #[must_use]
    pub fn contains_point(&self, point: &Vector2<f32>) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Regions touching at an edge intersect.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(other.min_x() > self.max_x()
            || other.max_x() < self.min_x()
            || other.min_y() > self.max_y()
            || other.max_y() < self.min_y())
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        2. * self.half_dimension
    }

    #[must_use]
    pub fn min_x(&self) -> f32 {
        self.center.x - self.half_dimension
    }

    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.center.x + self.half_dimension
    }

    #[must_use]
    pub fn min_y(&self) -> f32 {
        self.center.y - self.half_dimension
    }

    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.center.y + self.half_dimension
    }

    /// Region of the child quadrant `i`.
    ///
    /// # Panics
    /// If `i` is not one of [`NORTH_WEST`], [`NORTH_EAST`], [`SOUTH_WEST`] or [`SOUTH_EAST`].
    #[must_use]
    pub fn quadrant(&self, i: usize) -> Aabb {
        assert!(i < 4, "a square has four quadrants, got index {i}");

        let step_size = self.half_dimension / 2.;
        let offset = match i {
            NORTH_WEST => Vector2::new(-step_size, step_size),
            NORTH_EAST => Vector2::new(step_size, step_size),
            SOUTH_WEST => Vector2::new(-step_size, -step_size),
            SOUTH_EAST => Vector2::new(step_size, -step_size),
            _ => unreachable!(),
        };

        Aabb::new(self.center + offset, step_size)
    }

    /// First quadrant in NW, NE, SW, SE order whose region holds `point`.
    ///
    /// Decided against the center only, so points on a shared edge go to
    /// the earlier quadrant and rounding in the child bounds never matters.
    #[must_use]
    pub fn choose_quadrant(&self, point: &Vector2<f32>) -> usize {
        let west = point.x <= self.center.x;
        let north = point.y >= self.center.y;
        match (north, west) {
            (true, true) => NORTH_WEST,
            (true, false) => NORTH_EAST,
            (false, true) => SOUTH_WEST,
            (false, false) => SOUTH_EAST,
        }
    }
}
