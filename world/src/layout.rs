//! Declarative terrain tables that describe a city.

use cityroute_core::{BlockCoord, LatticeCoord, Point, GRID_COLUMNS, GRID_ROWS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of block columns or rows a layout may declare.
pub const MAX_GRID_DIMENSION: u32 = 512;

/// Inclusive rectangle of blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRegion {
    first: BlockCoord,
    last: BlockCoord,
}

impl BlockRegion {
    /// Creates a region spanning `first` to `last`, both inclusive.
    #[must_use]
    pub const fn new(first: BlockCoord, last: BlockCoord) -> Self {
        Self { first, last }
    }

    /// Upper-left block of the region.
    #[must_use]
    pub const fn first(&self) -> BlockCoord {
        self.first
    }

    /// Lower-right block of the region.
    #[must_use]
    pub const fn last(&self) -> BlockCoord {
        self.last
    }

    /// Reports whether the block lies inside the region.
    #[must_use]
    pub const fn contains(&self, block: BlockCoord) -> bool {
        block.column() >= self.first.column()
            && block.column() <= self.last.column()
            && block.row() >= self.first.row()
            && block.row() <= self.last.row()
    }

    /// Blocks inside the region in row-major order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockCoord> {
        let first = self.first();
        let last = self.last();
        (first.row()..=last.row()).flat_map(move |row| {
            (first.column()..=last.column()).map(move |column| BlockCoord::new(column, row))
        })
    }
}

/// Terrain tables for a whole city.
///
/// `CityLayout::default()` describes the built-in 15×10 city. Custom layouts
/// can be deserialised from configuration files and are validated when a
/// terrain model is built from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CityLayout {
    /// Number of block columns.
    pub columns: u32,
    /// Number of block rows.
    pub rows: u32,
    /// Rectangles of open water.
    #[serde(default)]
    pub water: Vec<BlockRegion>,
    /// Piers that override water.
    #[serde(default)]
    pub docks: Vec<BlockCoord>,
    /// Shores that override water.
    #[serde(default)]
    pub beaches: Vec<BlockCoord>,
    /// Sheltered blocks that override water.
    #[serde(default)]
    pub safe_havens: Vec<BlockCoord>,
    /// Rectangles of public park.
    #[serde(default)]
    pub parks: Vec<BlockRegion>,
    /// Street midpoints that stay walkable over water.
    #[serde(default)]
    pub bridges: Vec<Point>,
    /// Street midpoints that are never walkable.
    #[serde(default)]
    pub blocked_segments: Vec<Point>,
}

impl Default for CityLayout {
    fn default() -> Self {
        let region = |first: (u32, u32), last: (u32, u32)| {
            BlockRegion::new(
                BlockCoord::new(first.0, first.1),
                BlockCoord::new(last.0, last.1),
            )
        };

        Self {
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            water: vec![
                // bay
                region((13, 0), (14, 9)),
                // river mouth
                region((0, 9), (2, 9)),
                // channel
                region((7, 0), (7, 9)),
            ],
            docks: vec![BlockCoord::new(13, 4)],
            beaches: vec![
                BlockCoord::new(13, 0),
                BlockCoord::new(13, 1),
                BlockCoord::new(2, 9),
            ],
            safe_havens: vec![BlockCoord::new(13, 6)],
            parks: vec![region((2, 6), (4, 7)), region((9, 1), (11, 2))],
            bridges: vec![Point::new(7.5, 5.0)],
            blocked_segments: vec![Point::new(4.0, 2.5), Point::new(10.5, 6.0)],
        }
    }
}

impl CityLayout {
    /// A layout of the given size with no water, parks, or special segments.
    #[must_use]
    pub fn open(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            water: Vec::new(),
            docks: Vec::new(),
            beaches: Vec::new(),
            safe_havens: Vec::new(),
            parks: Vec::new(),
            bridges: Vec::new(),
            blocked_segments: Vec::new(),
        }
    }

    /// Checks that every table entry fits the grid.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(LayoutError::EmptyGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }

        if self.columns > MAX_GRID_DIMENSION || self.rows > MAX_GRID_DIMENSION {
            return Err(LayoutError::GridTooLarge {
                columns: self.columns,
                rows: self.rows,
            });
        }

        for region in self.water.iter().chain(&self.parks) {
            let (first, last) = (region.first(), region.last());
            if first.column() > last.column() || first.row() > last.row() {
                return Err(LayoutError::InvertedRegion { region: *region });
            }
            self.check_block(last)?;
        }

        for &block in self.docks.iter().chain(&self.beaches).chain(&self.safe_havens) {
            self.check_block(block)?;
        }

        for &point in self.bridges.iter().chain(&self.blocked_segments) {
            let node = LatticeCoord::from_point(point);
            if !node.to_point().approx_eq(point) || !node.kind().is_midpoint() {
                return Err(LayoutError::NotAMidpoint { point });
            }
            let max_x = i64::from(self.columns) * 2;
            let max_y = i64::from(self.rows) * 2;
            let inside = (0..=max_x).contains(&i64::from(node.x()))
                && (0..=max_y).contains(&i64::from(node.y()));
            if !inside {
                return Err(LayoutError::MidpointOutOfBounds { point });
            }
        }

        Ok(())
    }

    fn check_block(&self, block: BlockCoord) -> Result<(), LayoutError> {
        if block.column() >= self.columns || block.row() >= self.rows {
            return Err(LayoutError::BlockOutOfBounds { block });
        }
        Ok(())
    }

    pub(crate) fn midpoints(points: &[Point]) -> Vec<LatticeCoord> {
        points
            .iter()
            .map(|&point| LatticeCoord::from_point(point))
            .collect()
    }
}

/// Reasons a city layout may be refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LayoutError {
    /// The grid has no blocks.
    #[error("city grid must have at least one block, got {columns}x{rows}")]
    EmptyGrid {
        /// Configured columns.
        columns: u32,
        /// Configured rows.
        rows: u32,
    },
    /// The grid exceeds [`MAX_GRID_DIMENSION`] along either axis.
    #[error("city grid {columns}x{rows} exceeds the {MAX_GRID_DIMENSION} block limit per axis")]
    GridTooLarge {
        /// Configured columns.
        columns: u32,
        /// Configured rows.
        rows: u32,
    },
    /// A region's first block lies after its last block.
    #[error("region {region:?} has its corners swapped")]
    InvertedRegion {
        /// Offending region.
        region: BlockRegion,
    },
    /// A block lies outside the grid.
    #[error("block ({}, {}) lies outside the grid", .block.column(), .block.row())]
    BlockOutOfBounds {
        /// Offending block.
        block: BlockCoord,
    },
    /// A bridge or blocked segment is not a street midpoint.
    #[error("({}, {}) is not a street midpoint", .point.x(), .point.y())]
    NotAMidpoint {
        /// Offending point.
        point: Point,
    },
    /// A bridge or blocked segment lies outside the grid.
    #[error("street midpoint ({}, {}) lies outside the grid", .point.x(), .point.y())]
    MidpointOutOfBounds {
        /// Offending point.
        point: Point,
    },
}
