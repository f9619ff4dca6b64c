#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the city route engine.
//!
//! This crate defines the vocabulary that connects the terrain model, the
//! walkable topology, the path finder, and the movement simulator. Positions
//! on the city plane are expressed as [`Point`] values measured in block
//! units; the search itself runs over [`LatticeCoord`] values, which double
//! every coordinate so intersections, street midpoints and block centers all
//! land on integer positions. Callers describe the blocks an agent must avoid
//! with an [`ExclusionSet`] passed into every query, and observe movement via
//! [`MovementSnapshot`] and [`MovementEvent`] values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of block columns in the built-in city.
pub const GRID_COLUMNS: u32 = 15;

/// Number of block rows in the built-in city.
pub const GRID_ROWS: u32 = 10;

/// Tolerance used when comparing real-valued points.
pub const POINT_TOLERANCE: f64 = 1e-6;

/// Position on the city plane measured in block units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Center of the provided block.
    #[must_use]
    pub fn block_center(block: BlockCoord) -> Self {
        Self::new(f64::from(block.column()) + 0.5, f64::from(block.row()) + 0.5)
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Reports whether both coordinates agree within [`POINT_TOLERANCE`].
    #[must_use]
    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() <= POINT_TOLERANCE && (self.y - other.y).abs() <= POINT_TOLERANCE
    }

    /// Reports whether neither coordinate is NaN or infinite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation toward `other` by the provided fraction.
    #[must_use]
    pub fn lerp(self, other: Point, fraction: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * fraction,
            self.y + (other.y - self.y) * fraction,
        )
    }
}

/// Integer address of a city block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoord {
    column: u32,
    row: u32,
}

impl BlockCoord {
    /// Creates a new block address.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column of the block.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row of the block.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Classification of a graph node by the parity of its coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Both coordinates are integers: the corner of four blocks.
    Intersection,
    /// Integer `x`, half-integer `y`: a point on a north-south street.
    VerticalMidpoint,
    /// Half-integer `x`, integer `y`: a point on an east-west street.
    HorizontalMidpoint,
    /// Both coordinates are half-integers: the interior of a block.
    BlockCenter,
}

impl NodeKind {
    /// Reports whether the node lies on a street between two intersections.
    #[must_use]
    pub const fn is_midpoint(self) -> bool {
        matches!(self, Self::VerticalMidpoint | Self::HorizontalMidpoint)
    }
}

/// Node identity on the half-unit lattice: each coordinate is doubled.
///
/// Rounding a [`Point`] to its lattice coordinate is what the search uses as
/// node identity, so two points within half a lattice step of one another
/// collapse onto the same node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatticeCoord {
    x: i32,
    y: i32,
}

impl LatticeCoord {
    /// Creates a lattice coordinate from doubled components.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snaps a point to the nearest lattice node.
    #[must_use]
    pub fn from_point(point: Point) -> Self {
        Self::new(snap(point.x()), snap(point.y()))
    }

    /// Lattice node at the center of the provided block.
    #[must_use]
    pub fn block_center(block: BlockCoord) -> Self {
        Self::new(doubled(block.column()) + 1, doubled(block.row()) + 1)
    }

    /// Doubled horizontal component.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Doubled vertical component.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Converts the node back to a point on the city plane.
    #[must_use]
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x) / 2.0, f64::from(self.y) / 2.0)
    }

    /// Parity class of the node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match (self.x.rem_euclid(2) == 1, self.y.rem_euclid(2) == 1) {
            (false, false) => NodeKind::Intersection,
            (false, true) => NodeKind::VerticalMidpoint,
            (true, false) => NodeKind::HorizontalMidpoint,
            (true, true) => NodeKind::BlockCenter,
        }
    }

    /// Node displaced by the provided number of lattice steps.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Block addressed by a block-center node.
    #[must_use]
    pub fn block(self) -> Option<BlockCoord> {
        if self.kind() != NodeKind::BlockCenter {
            return None;
        }
        let column = u32::try_from((self.x - 1) / 2).ok()?;
        let row = u32::try_from((self.y - 1) / 2).ok()?;
        Some(BlockCoord::new(column, row))
    }

    /// Euclidean distance between two nodes measured in block units.
    #[must_use]
    pub fn distance(self, other: LatticeCoord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy) / 2.0
    }

    /// Manhattan distance between two nodes measured in block units.
    #[must_use]
    pub fn manhattan_distance(self, other: LatticeCoord) -> f64 {
        f64::from(self.x.abs_diff(other.x) + self.y.abs_diff(other.y)) / 2.0
    }
}

fn snap(value: f64) -> i32 {
    let doubled = (value * 2.0).round();
    if doubled >= f64::from(i32::MAX) {
        i32::MAX
    } else if doubled <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        doubled as i32
    }
}

fn doubled(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX / 2).saturating_mul(2)
}

/// Terrain classification of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open water that cannot be walked on.
    Water,
    /// Sandy shore that overrides water.
    Beach,
    /// Pier that overrides water.
    Dock,
    /// Public park; its interior is always open to walkers.
    Park,
    /// Ordinary built-up land.
    Land,
}

impl TerrainKind {
    /// Reports whether a walker may stand on the terrain.
    #[must_use]
    pub const fn is_land_passable(self) -> bool {
        !matches!(self, Self::Water)
    }
}

/// Caller-owned set of blocks the agent must avoid.
///
/// The set is ordered so iteration is deterministic. The engine only ever
/// reads it; mutation belongs to the surrounding game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    blocks: BTreeSet<BlockCoord>,
}

impl ExclusionSet {
    /// Creates an empty exclusion set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the block as a no-go zone. Returns `true` if it was newly added.
    pub fn insert(&mut self, block: BlockCoord) -> bool {
        self.blocks.insert(block)
    }

    /// Reports whether the block is excluded.
    #[must_use]
    pub fn contains(&self, block: BlockCoord) -> bool {
        self.blocks.contains(&block)
    }

    /// Number of excluded blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Reports whether no block is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Excluded blocks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = BlockCoord> + '_ {
        self.blocks.iter().copied()
    }
}

impl FromIterator<BlockCoord> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = BlockCoord>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

/// Ordered walk from a start point (exclusive) to a goal (inclusive).
///
/// An empty route signals that the goal is unreachable, or that start and goal
/// coincide.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<Point>,
}

impl Route {
    /// Wraps the provided waypoints.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// The empty route.
    #[must_use]
    pub const fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Reports whether the route carries no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Final waypoint, if any.
    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Reports whether the route visits the point.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.points.iter().any(|waypoint| waypoint.approx_eq(point))
    }

    /// Sum of Euclidean segment lengths when walked from `start`.
    #[must_use]
    pub fn length_from(&self, start: Point) -> f64 {
        let mut previous = start;
        let mut total = 0.0;
        for &point in &self.points {
            total += previous.distance(point);
            previous = point;
        }
        total
    }

    /// Consumes the route, yielding its waypoints.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

/// Phase of the movement state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// No movement in flight.
    #[default]
    Idle,
    /// Travelling along a route.
    Moving,
    /// Destination reached; the grace period is running.
    Arriving,
    /// The last movement request was refused.
    Rejected,
}

/// Identifier of a single started movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MovementHandle(u64);

impl MovementHandle {
    /// Creates a new handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Immutable view of the agent handed to renderers each frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementSnapshot {
    /// Current interpolated position.
    pub position: Point,
    /// Current phase of the state machine.
    pub phase: MovementPhase,
    /// Waypoints visited so far during the latest movement.
    pub trail: Vec<Point>,
    /// Energy left once the distance covered so far is paid for.
    pub energy_remaining: f64,
}

/// Outcome of cancelling a movement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergySettled {
    /// Energy left after paying for the distance covered.
    pub energy_remaining: f64,
    /// Distance travelled before the movement stopped.
    pub distance_covered: f64,
    /// Position at which the agent stopped.
    pub position: Point,
}

/// Reasons a movement request may be refused.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum MovementError {
    /// The destination block is marked as a no-go zone.
    #[error("block ({}, {}) is marked as a no-go zone", .block.column(), .block.row())]
    NoGoZone {
        /// Requested destination.
        block: BlockCoord,
    },
    /// No route exists under the current terrain and exclusions.
    #[error("block ({}, {}) cannot be reached", .block.column(), .block.row())]
    Unreachable {
        /// Requested destination.
        block: BlockCoord,
    },
    /// A route exists but costs more energy than is available.
    #[error("route needs {required:.3} energy but only {available:.3} is available")]
    InsufficientEnergy {
        /// Energy the route would consume.
        required: f64,
        /// Energy the agent holds.
        available: f64,
    },
    /// The starting position is not a finite point.
    #[error("starting position ({}, {}) is not a finite point", .position.x(), .position.y())]
    InvalidPosition {
        /// Position supplied by the caller.
        position: Point,
    },
    /// The energy budget is negative or not a finite number.
    #[error("energy budget {energy} must be a finite, non-negative number")]
    InvalidEnergy {
        /// Energy supplied by the caller.
        energy: f64,
    },
    /// The handle does not address the movement currently in flight.
    #[error("movement {} is not in flight", .handle.get())]
    UnknownHandle {
        /// Handle supplied by the caller.
        handle: MovementHandle,
    },
}

/// Notifications emitted by the movement simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MovementEvent {
    /// A movement was accepted and began.
    Started {
        /// Handle assigned to the movement.
        handle: MovementHandle,
        /// Total length of the planned walk.
        route_distance: f64,
    },
    /// The agent passed an intermediate waypoint.
    WaypointReached {
        /// Movement that produced the crossing.
        handle: MovementHandle,
        /// Waypoint that was passed.
        waypoint: Point,
    },
    /// The agent reached its destination.
    Arrived {
        /// Movement that completed.
        handle: MovementHandle,
        /// Final position.
        position: Point,
        /// Energy left after paying for the whole route.
        energy_remaining: f64,
    },
    /// A movement was stopped before arrival.
    Cancelled {
        /// Movement that was stopped.
        handle: MovementHandle,
        /// Distance travelled before stopping.
        distance_covered: f64,
        /// Energy left after paying for the partial walk.
        energy_remaining: f64,
    },
    /// A movement request was refused.
    Rejected {
        /// Reason for the refusal.
        reason: MovementError,
    },
}
