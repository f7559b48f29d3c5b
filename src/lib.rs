//! Terrain and river generation over a planar dual mesh
//!
//! Re-exports modules for use by the binary and tests.

pub mod constraints;
pub mod drainage;
pub mod export;
pub mod heightfield;
pub mod map;
pub mod mesh;
pub mod params;
pub mod seeds;
pub mod timing;
pub mod worker;
