//! Walkable graph over intersections, street midpoints and block centers.

use std::collections::BTreeSet;

use cityroute_core::{BlockCoord, ExclusionSet, LatticeCoord, NodeKind, Point};

use crate::layout::{CityLayout, LayoutError};
use crate::terrain::TerrainModel;

/// Lattice steps toward north, east, south and west, in enumeration order.
const CARDINAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Lattice steps from an intersection toward the four surrounding block centers.
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// Defines which lattice nodes are walkable and how they connect.
///
/// The topology owns its terrain model together with the fixed bridge and
/// blocked-segment tables. Exclusions are never stored: they are supplied to
/// every validity query by the caller.
#[derive(Clone, Debug)]
pub struct Topology {
    terrain: TerrainModel,
    bridges: BTreeSet<LatticeCoord>,
    blocked_segments: BTreeSet<LatticeCoord>,
}

impl Topology {
    /// Builds the topology described by the layout.
    pub fn from_layout(layout: &CityLayout) -> Result<Self, LayoutError> {
        let terrain = TerrainModel::from_layout(layout)?;
        Ok(Self::with_terrain(terrain, layout))
    }

    fn with_terrain(terrain: TerrainModel, layout: &CityLayout) -> Self {
        Self {
            terrain,
            bridges: CityLayout::midpoints(&layout.bridges).into_iter().collect(),
            blocked_segments: CityLayout::midpoints(&layout.blocked_segments)
                .into_iter()
                .collect(),
        }
    }

    /// Terrain classification backing the topology.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainModel {
        &self.terrain
    }

    /// Number of lattice nodes along the horizontal axis.
    #[must_use]
    pub const fn lattice_width(&self) -> u32 {
        self.terrain.columns() * 2 + 1
    }

    /// Number of lattice nodes along the vertical axis.
    #[must_use]
    pub const fn lattice_height(&self) -> u32 {
        self.terrain.rows() * 2 + 1
    }

    /// Total number of lattice nodes, valid or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let width = usize::try_from(self.lattice_width()).unwrap_or(0);
        let height = usize::try_from(self.lattice_height()).unwrap_or(0);
        width.saturating_mul(height)
    }

    /// Reports whether the node lies on the grid's lattice.
    #[must_use]
    pub fn contains_node(&self, node: LatticeCoord) -> bool {
        u32::try_from(node.x()).is_ok_and(|x| x < self.lattice_width())
            && u32::try_from(node.y()).is_ok_and(|y| y < self.lattice_height())
    }

    /// Dense row-major index of the node, if it lies on the lattice.
    #[must_use]
    pub fn index(&self, node: LatticeCoord) -> Option<usize> {
        if !self.contains_node(node) {
            return None;
        }
        let width = usize::try_from(self.lattice_width()).ok()?;
        let column = usize::try_from(node.x()).ok()?;
        let row = usize::try_from(node.y()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Reports whether a walker may stand on the point.
    ///
    /// Points that do not sit exactly on the lattice are never valid.
    #[must_use]
    pub fn is_valid_node(&self, point: Point, exclusions: &ExclusionSet) -> bool {
        let node = LatticeCoord::from_point(point);
        node.to_point().approx_eq(point) && self.is_valid(node, exclusions)
    }

    /// Lattice form of [`Topology::is_valid_node`].
    #[must_use]
    pub fn is_valid(&self, node: LatticeCoord, exclusions: &ExclusionSet) -> bool {
        if !self.contains_node(node) {
            return false;
        }
        if self.blocked_segments.contains(&node) {
            return false;
        }
        if self.bridges.contains(&node) {
            return true;
        }

        match node.kind() {
            NodeKind::BlockCenter => self.block_of(node).is_some_and(|block| {
                !exclusions.contains(block) && !self.terrain.is_water(block)
            }),
            NodeKind::Intersection => DIAGONAL
                .iter()
                .any(|&(dx, dy)| self.is_land_center(node.offset(dx, dy))),
            NodeKind::VerticalMidpoint => {
                self.is_street_open(node.offset(-1, 0), node.offset(1, 0), exclusions)
            }
            NodeKind::HorizontalMidpoint => {
                self.is_street_open(node.offset(0, -1), node.offset(0, 1), exclusions)
            }
        }
    }

    /// Neighbors of the point, before validity filtering.
    ///
    /// `start` and `end` feed the building rule: a non-park block center is
    /// only offered when it is one of them.
    #[must_use]
    pub fn neighbors(&self, point: Point, start: Point, end: Point) -> Vec<Point> {
        let mut buf = Vec::with_capacity(8);
        self.neighbors_into(
            LatticeCoord::from_point(point),
            LatticeCoord::from_point(start),
            LatticeCoord::from_point(end),
            &mut buf,
        );
        buf.into_iter().map(LatticeCoord::to_point).collect()
    }

    /// Appends the neighbors of `node` into `buf` in a fixed order.
    pub fn neighbors_into(
        &self,
        node: LatticeCoord,
        start: LatticeCoord,
        end: LatticeCoord,
        buf: &mut Vec<LatticeCoord>,
    ) {
        match node.kind() {
            NodeKind::Intersection => {
                for (dx, dy) in CARDINAL {
                    self.push_node(node.offset(dx, dy), buf);
                }
            }
            NodeKind::BlockCenter => {
                if self.terrain.is_park_node(node) {
                    for (dx, dy) in CARDINAL {
                        let next = node.offset(dx * 2, dy * 2);
                        if self.block_of(next).is_some() && self.terrain.is_park_node(next) {
                            buf.push(next);
                        }
                    }
                }
                for (dx, dy) in CARDINAL {
                    self.push_node(node.offset(dx, dy), buf);
                }
            }
            NodeKind::VerticalMidpoint => {
                self.push_node(node.offset(0, -1), buf);
                self.push_node(node.offset(0, 1), buf);
                for dx in [-1, 1] {
                    self.push_center(node.offset(dx, 0), start, end, buf);
                }
            }
            NodeKind::HorizontalMidpoint => {
                self.push_node(node.offset(-1, 0), buf);
                self.push_node(node.offset(1, 0), buf);
                for dy in [-1, 1] {
                    self.push_center(node.offset(0, dy), start, end, buf);
                }
            }
        }
    }

    /// Reports whether a walker may step into the block at `center`.
    ///
    /// Buildings are only entered at the start or end of a walk; parks are
    /// always open.
    #[must_use]
    pub fn can_enter_building(&self, center: Point, start: Point, end: Point) -> bool {
        self.can_enter(
            LatticeCoord::from_point(center),
            LatticeCoord::from_point(start),
            LatticeCoord::from_point(end),
        )
    }

    fn can_enter(&self, center: LatticeCoord, start: LatticeCoord, end: LatticeCoord) -> bool {
        center == start || center == end || self.terrain.is_park_node(center)
    }

    fn push_node(&self, node: LatticeCoord, buf: &mut Vec<LatticeCoord>) {
        if self.contains_node(node) {
            buf.push(node);
        }
    }

    fn push_center(
        &self,
        center: LatticeCoord,
        start: LatticeCoord,
        end: LatticeCoord,
        buf: &mut Vec<LatticeCoord>,
    ) {
        if self.block_of(center).is_some() && self.can_enter(center, start, end) {
            buf.push(center);
        }
    }

    fn block_of(&self, center: LatticeCoord) -> Option<BlockCoord> {
        center
            .block()
            .filter(|&block| self.terrain.contains(block))
    }

    fn is_land_center(&self, center: LatticeCoord) -> bool {
        self.block_of(center)
            .is_some_and(|block| self.terrain.is_land_passable(block))
    }

    fn is_street_open(
        &self,
        left: LatticeCoord,
        right: LatticeCoord,
        exclusions: &ExclusionSet,
    ) -> bool {
        let excluded = |center: LatticeCoord| {
            self.block_of(center)
                .is_some_and(|block| exclusions.contains(block))
        };
        if excluded(left) && excluded(right) {
            return false;
        }
        self.is_land_center(left) || self.is_land_center(right)
    }
}

impl Default for Topology {
    fn default() -> Self {
        let layout = CityLayout::default();
        Self::with_terrain(TerrainModel::from_valid_layout(&layout), &layout)
    }
}
