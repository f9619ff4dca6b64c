#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static description of the city an agent walks through.
//!
//! The [`TerrainModel`] classifies blocks, and the [`Topology`] turns that
//! classification into a walkable graph over intersections, street midpoints
//! and block centers. Both are immutable once built; the exclusion set that
//! shapes every query is owned by the caller and passed in per call.

pub mod layout;
pub mod terrain;
pub mod topology;

pub use layout::{BlockRegion, CityLayout, LayoutError, MAX_GRID_DIMENSION};
pub use terrain::TerrainModel;
pub use topology::Topology;
