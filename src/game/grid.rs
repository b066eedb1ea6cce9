//! Board geometry on the integer lattice

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Board is TILE_COUNT x TILE_COUNT cells
pub const TILE_COUNT: i32 = 20;

/// A lattice cell (or a direction vector, when used as velocity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True if the cell lies inside `[0, TILE_COUNT)` on both axes
    pub fn in_bounds(&self) -> bool {
        (0..TILE_COUNT).contains(&self.x) && (0..TILE_COUNT).contains(&self.y)
    }

    /// One of the four unit directions
    pub fn is_unit_direction(&self) -> bool {
        matches!((self.x, self.y), (1, 0) | (-1, 0) | (0, 1) | (0, -1))
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// `other` points exactly opposite to `self`
    pub fn is_reverse_of(&self, other: Point) -> bool {
        !self.is_zero() && self.x + other.x == 0 && self.y + other.y == 0
    }

    pub fn offset(&self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

/// Uniformly random on-board cell
pub fn random_cell<R: Rng + ?Sized>(rng: &mut R) -> Point {
    Point::new(rng.gen_range(0..TILE_COUNT), rng.gen_range(0..TILE_COUNT))
}

/// True if `cell` is any segment of `body`
pub fn occupies(body: &[Point], cell: Point) -> bool {
    body.iter().any(|seg| *seg == cell)
}
