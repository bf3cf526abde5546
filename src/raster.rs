//! 2D raster grid used by every generation layer.
//!
//! A `Raster<T>` is a bounded, row-major grid with fixed dimensions. A
//! kingdom map has hard edges on all four sides: neighbour lookups clip
//! instead of wrapping.

use serde::{Deserialize, Serialize};

/// Map dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// True if (x, y) lies inside the map.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }
}

/// A cell position on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance to another position (1 for all 8 neighbours).
    pub fn chebyshev_distance(&self, other: Position) -> usize {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

/// Offsets of the 8 neighbours, clockwise from north.
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
];

/// A 2D grid of cells, addressed by (x, y), with immutable dimensions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Raster<T> {
    dimensions: Dimensions,
    data: Vec<T>,
}

impl<T: Clone + Default> Raster<T> {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            data: vec![T::default(); dimensions.area()],
        }
    }
}

impl<T: Clone> Raster<T> {
    pub fn new_with(dimensions: Dimensions, value: T) -> Self {
        Self {
            dimensions,
            data: vec![value; dimensions.area()],
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> usize {
        self.dimensions.width
    }

    pub fn height(&self) -> usize {
        self.dimensions.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.dimensions.width && y < self.dimensions.height);
        y * self.dimensions.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_pos(&self, pos: Position) -> &T {
        self.get(pos.x, pos.y)
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn set_pos(&mut self, pos: Position, value: T) {
        self.set(pos.x, pos.y, value);
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.dimensions.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.dimensions.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// In-bounds 8-neighbours of a cell, clockwise from north.
    /// Edges clip: corner cells return 3 neighbours, edge cells 5.
    pub fn neighbours_8(&self, x: usize, y: usize) -> Vec<Position> {
        let mut result = Vec::with_capacity(8);
        for &(dx, dy) in NEIGHBOUR_OFFSETS.iter() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if self.dimensions.contains(nx, ny) {
                result.push(Position::new(nx as usize, ny as usize));
            }
        }
        result
    }
}

impl Raster<f32> {
    /// Rescale values so min maps to 0.0 and max to 1.0.
    /// A constant raster (max == min) becomes all zeros.
    pub fn normalize(&mut self) {
        let min = self.data.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if max > min {
            let range = max - min;
            for v in &mut self.data {
                *v = (*v - min) / range;
            }
        } else {
            for v in &mut self.data {
                *v = 0.0;
            }
        }
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }
}
