//! Terrain queries: ground height, water and cliffs.
//!
//! The map is a uniform grid of square cells. Each cell has a height
//! (defaulting to the base height) and may be flagged as a cliff. Water is
//! a list of axis-aligned areas with a surface level.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::Coord3;

/// Rectangular body of water.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterArea {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    /// Surface height.
    pub level: f32,
}

impl WaterArea {
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Clone, Debug)]
pub struct Terrain {
    cell_size: f32,
    base_height: f32,
    heights: FxHashMap<(i32, i32), f32>,
    cliffs: FxHashSet<(i32, i32)>,
    water: Vec<WaterArea>,
}

impl Default for Terrain {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

impl Terrain {
    pub const DEFAULT_CELL_SIZE: f32 = 10.0;

    /// Dry, cliff-free terrain at a constant height.
    #[must_use]
    pub fn flat(height: f32) -> Self {
        Self {
            cell_size: Self::DEFAULT_CELL_SIZE,
            base_height: height,
            heights: FxHashMap::default(),
            cliffs: FxHashSet::default(),
            water: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size.max(f32::EPSILON);
        self
    }

    #[must_use]
    pub fn with_cell_height(mut self, cell: (i32, i32), height: f32) -> Self {
        self.heights.insert(cell, height);
        self
    }

    #[must_use]
    pub fn with_cliff(mut self, cell: (i32, i32)) -> Self {
        self.cliffs.insert(cell);
        self
    }

    #[must_use]
    pub fn with_water(mut self, area: WaterArea) -> Self {
        self.water.push(area);
        self
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Grid cell containing a world position.
    #[must_use]
    pub fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        ((x / self.cell_size).floor() as i32, (y / self.cell_size).floor() as i32)
    }

    #[must_use]
    pub fn ground_height(&self, x: f32, y: f32) -> f32 {
        self.heights
            .get(&self.cell_of(x, y))
            .copied()
            .unwrap_or(self.base_height)
    }

    /// Highest water surface covering a position.
    #[must_use]
    pub fn water_level(&self, x: f32, y: f32) -> Option<f32> {
        self.water
            .iter()
            .filter(|w| w.contains(x, y))
            .map(|w| w.level)
            .reduce(f32::max)
    }

    /// Is the ground at this position below a water surface?
    #[must_use]
    pub fn is_underwater(&self, x: f32, y: f32) -> bool {
        self.water_level(x, y)
            .is_some_and(|level| level > self.ground_height(x, y))
    }

    #[must_use]
    pub fn is_cliff(&self, x: f32, y: f32) -> bool {
        self.cliffs.contains(&self.cell_of(x, y))
    }

    /// `pos` moved onto the ground.
    #[must_use]
    pub fn on_ground(&self, pos: Coord3) -> Coord3 {
        Coord3::new(pos.x, pos.y, self.ground_height(pos.x, pos.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_terrain() {
        let t = Terrain::flat(5.0);
        assert_eq!(t.ground_height(-100.0, 37.0), 5.0);
        assert!(!t.is_underwater(0.0, 0.0));
        assert!(!t.is_cliff(0.0, 0.0));
    }

    #[test]
    fn test_cells_and_cliffs() {
        let t = Terrain::flat(0.0).with_cliff((1, 0)).with_cell_height((0, 0), 3.0);
        assert_eq!(t.cell_of(15.0, 5.0), (1, 0));
        assert_eq!(t.cell_of(-0.5, 5.0), (-1, 0));
        assert!(t.is_cliff(12.0, 9.9));
        assert!(!t.is_cliff(9.9, 9.9));
        assert_eq!(t.ground_height(5.0, 5.0), 3.0);
        assert_eq!(t.on_ground(Coord3::new(5.0, 5.0, 40.0)).z, 3.0);
    }

    #[test]
    fn test_water() {
        let t = Terrain::flat(0.0)
            .with_cell_height((5, 5), 10.0)
            .with_water(WaterArea {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                level: 2.0,
            });
        assert!(t.is_underwater(20.0, 20.0));
        // raised island cell pokes out of the water
        assert!(!t.is_underwater(55.0, 55.0));
        assert!(!t.is_underwater(150.0, 20.0));
    }
}
