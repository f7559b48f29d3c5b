//! River drainage over the dual mesh.
//!
//! Routing happens in two passes:
//! 1. [`biased_search`] grows a forest of downslope pointers outward from the
//!    sea, visiting low triangles roughly before high ones
//! 2. [`assign_flow`] walks that forest leaves-first, accumulating discharge
//!    and lowering any parent that sits above its child
//!
//! The forest is stored as one [`Downslope`] per triangle: the side that leads
//! to its parent, or `Root` for the sea triangles it was grown from.

pub mod flow;
pub mod paths;
pub mod search;

pub use flow::{assign_flow, FlowSummary};
pub use paths::{trace_river_paths, RiverPath, RiverPoint};
pub use search::biased_search;

use crate::mesh::Mesh;

/// Position of a triangle in the drainage forest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Downslope {
    /// Not reached by the search (only seen mid-search or on failure)
    #[default]
    Unvisited,
    /// A sea triangle the forest was grown from
    Root,
    /// Flows across this side into the triangle on its far side
    PointsTo(usize),
}

impl Downslope {
    pub fn side(&self) -> Option<usize> {
        match self {
            Downslope::PointsTo(s) => Some(*s),
            _ => None,
        }
    }

    /// Wire encoding: `-1` for roots, `-999` for unvisited, otherwise the side id.
    pub fn to_wire(&self) -> i64 {
        match self {
            Downslope::Unvisited => -999,
            Downslope::Root => -1,
            Downslope::PointsTo(s) => *s as i64,
        }
    }
}

/// Errors that abort routing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrainageError {
    /// No low ghost triangle exists to drain into
    NoDrainageRoots,
    /// A seed id is not a triangle of the mesh
    InvalidSeed { triangle: usize },
    /// The search finished without reaching this triangle
    Unreachable { triangle: usize },
    /// An input or output array does not match the mesh size
    LengthMismatch { name: &'static str, expected: usize, actual: usize },
}

impl std::fmt::Display for DrainageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrainageError::NoDrainageRoots => write!(f, "no drainage roots: no ghost triangle is below sea level"),
            DrainageError::InvalidSeed { triangle } => write!(f, "seed {} is not a triangle of the mesh", triangle),
            DrainageError::Unreachable { triangle } => {
                write!(f, "triangle {} is not connected to any drainage root", triangle)
            }
            DrainageError::LengthMismatch { name, expected, actual } => {
                write!(f, "{} has {} entries, mesh needs {}", name, actual, expected)
            }
        }
    }
}

impl std::error::Error for DrainageError {}

pub(crate) fn check_len(name: &'static str, expected: usize, actual: usize) -> Result<(), DrainageError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DrainageError::LengthMismatch { name, expected, actual })
    }
}

/// A broken drainage forest invariant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForestViolation {
    /// `order` repeats a triangle or names one that does not exist
    NotPermutation { triangle: usize },
    Unvisited { triangle: usize },
    /// The parent is listed after the child in `order`
    ParentAfterChild { triangle: usize },
    RootNotSeed { triangle: usize },
    SeedNotRoot { triangle: usize },
    /// `downslope` does not hold one entry per triangle
    LengthMismatch { expected: usize, actual: usize },
    /// The stored side id is not a side of the mesh
    SideOutOfRange { triangle: usize, side: usize },
}

/// Check that `downslope` is a forest rooted exactly at `seeds` and that
/// `order` is a pre-order of it. A pre-order with every parent strictly
/// earlier also rules out cycles.
pub fn validate_forest<M: Mesh>(
    mesh: &M,
    seeds: &[usize],
    downslope: &[Downslope],
    order: &[usize],
) -> Result<(), ForestViolation> {
    let n = mesh.num_triangles();
    if downslope.len() != n {
        return Err(ForestViolation::LengthMismatch { expected: n, actual: downslope.len() });
    }
    let mut position = vec![usize::MAX; n];
    for (i, &t) in order.iter().enumerate() {
        if t >= n || position[t] != usize::MAX {
            return Err(ForestViolation::NotPermutation { triangle: t });
        }
        position[t] = i;
    }
    if order.len() != n {
        let missing = position.iter().position(|&p| p == usize::MAX).unwrap_or(n);
        return Err(ForestViolation::NotPermutation { triangle: missing });
    }

    let mut is_seed = vec![false; n];
    for &t in seeds {
        if t < n {
            is_seed[t] = true;
        }
    }

    for t in 0..n {
        match downslope[t] {
            Downslope::Unvisited => return Err(ForestViolation::Unvisited { triangle: t }),
            Downslope::Root => {
                if !is_seed[t] {
                    return Err(ForestViolation::RootNotSeed { triangle: t });
                }
            }
            Downslope::PointsTo(s) => {
                if is_seed[t] {
                    return Err(ForestViolation::SeedNotRoot { triangle: t });
                }
                if s >= mesh.num_sides() {
                    return Err(ForestViolation::SideOutOfRange { triangle: t, side: s });
                }
                let parent = mesh.s_outer_t(s);
                if mesh.s_inner_t(s) != t || position[parent] >= position[t] {
                    return Err(ForestViolation::ParentAfterChild { triangle: t });
                }
            }
        }
    }
    Ok(())
}
