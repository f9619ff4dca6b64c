//! Pure terrain classification of city blocks.

use std::collections::BTreeSet;

use cityroute_core::{BlockCoord, LatticeCoord, Point, TerrainKind};

use crate::layout::{BlockRegion, CityLayout, LayoutError};

/// Classifies each block of the city as water, beach, dock, park, or land.
///
/// Every query is a pure function of the block address, so the model can be
/// shared freely between threads.
#[derive(Clone, Debug)]
pub struct TerrainModel {
    columns: u32,
    rows: u32,
    water: Vec<BlockRegion>,
    docks: BTreeSet<BlockCoord>,
    beaches: BTreeSet<BlockCoord>,
    safe_havens: BTreeSet<BlockCoord>,
    parks: BTreeSet<BlockCoord>,
}

impl TerrainModel {
    /// Builds a terrain model after validating the layout.
    pub fn from_layout(layout: &CityLayout) -> Result<Self, LayoutError> {
        layout.validate()?;
        Ok(Self::from_valid_layout(layout))
    }

    pub(crate) fn from_valid_layout(layout: &CityLayout) -> Self {
        Self {
            columns: layout.columns,
            rows: layout.rows,
            water: layout.water.clone(),
            docks: layout.docks.iter().copied().collect(),
            beaches: layout.beaches.iter().copied().collect(),
            safe_havens: layout.safe_havens.iter().copied().collect(),
            parks: layout.parks.iter().flat_map(BlockRegion::blocks).collect(),
        }
    }

    /// Number of block columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of block rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the block lies inside the grid.
    #[must_use]
    pub const fn contains(&self, block: BlockCoord) -> bool {
        block.column() < self.columns && block.row() < self.rows
    }

    /// Reports whether the block is open water.
    ///
    /// Docks, safe havens and beaches override the water regions.
    #[must_use]
    pub fn is_water(&self, block: BlockCoord) -> bool {
        if self.is_dock(block) || self.safe_havens.contains(&block) || self.is_beach(block) {
            return false;
        }
        self.water.iter().any(|region| region.contains(block))
    }

    /// Reports whether the block is a beach.
    #[must_use]
    pub fn is_beach(&self, block: BlockCoord) -> bool {
        self.beaches.contains(&block)
    }

    /// Reports whether the block is a dock.
    #[must_use]
    pub fn is_dock(&self, block: BlockCoord) -> bool {
        self.docks.contains(&block)
    }

    /// Reports whether the block belongs to a park.
    #[must_use]
    pub fn is_park_block(&self, block: BlockCoord) -> bool {
        self.parks.contains(&block)
    }

    /// Reports whether the point is the center of a park block.
    #[must_use]
    pub fn is_park(&self, point: Point) -> bool {
        let node = LatticeCoord::from_point(point);
        node.to_point().approx_eq(point) && self.is_park_node(node)
    }

    pub(crate) fn is_park_node(&self, node: LatticeCoord) -> bool {
        node.block().is_some_and(|block| self.is_park_block(block))
    }

    /// Reports whether a walker may stand on the block.
    #[must_use]
    pub fn is_land_passable(&self, block: BlockCoord) -> bool {
        self.contains(block) && self.kind(block).is_land_passable()
    }

    /// Terrain classification of the block.
    #[must_use]
    pub fn kind(&self, block: BlockCoord) -> TerrainKind {
        if self.is_dock(block) {
            TerrainKind::Dock
        } else if self.is_beach(block) {
            TerrainKind::Beach
        } else if self.is_park_block(block) {
            TerrainKind::Park
        } else if self.is_water(block) {
            TerrainKind::Water
        } else {
            TerrainKind::Land
        }
    }
}

impl Default for TerrainModel {
    fn default() -> Self {
        Self::from_valid_layout(&CityLayout::default())
    }
}
