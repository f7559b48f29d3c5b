//! Jittered lattice meshes.
//!
//! A stand-in for a real Delaunay triangulator: points sit on a square lattice
//! with random jitter (boundary points stay on the boundary), and every cell is
//! split into two triangles. The result is a valid planar triangulation with a
//! convex hull, which is all river routing needs.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{s_next_s, DualMesh, MeshError};

impl DualMesh {
    /// Build a jittered lattice over `[0, size]²` with roughly `spacing`
    /// between points. `jitter` is the maximum offset as a fraction of half
    /// the spacing and is clamped to `[0, 0.9]` so cells stay convex.
    pub fn jittered_grid(size: f64, spacing: f64, jitter: f64, seed: u64) -> Result<Self, MeshError> {
        if !(size > 0.0) || !(spacing > 0.0) || spacing > size {
            return Err(MeshError::InvalidGrid(format!(
                "size {} and spacing {} must be positive with spacing <= size",
                size, spacing
            )));
        }
        let cells = (size / spacing).round().max(1.0) as usize;
        let step = size / cells as f64;
        let max_offset = 0.5 * step * jitter.clamp(0.0, 0.9);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let stride = cells + 1;
        let mut points = Vec::with_capacity(stride * stride);
        for j in 0..stride {
            for i in 0..stride {
                let mut x = i as f64 * step;
                let mut y = j as f64 * step;
                // Draw both offsets for every point so the sequence is stable
                let ox = rng.gen_range(-1.0..=1.0) * max_offset;
                let oy = rng.gen_range(-1.0..=1.0) * max_offset;
                if i != 0 && i != cells {
                    x += ox;
                }
                if j != 0 && j != cells {
                    y += oy;
                }
                points.push([x, y]);
            }
        }

        let mut triangles = Vec::with_capacity(6 * cells * cells);
        for j in 0..cells {
            for i in 0..cells {
                let a = j * stride + i;
                let b = a + 1;
                let c = a + stride + 1;
                let d = a + stride;
                triangles.extend([a, b, c]);
                triangles.extend([a, c, d]);
            }
        }

        let halfedges = pair_halfedges(&triangles);
        DualMesh::from_triangulation(points, triangles, halfedges)
    }
}

/// Pair every side with the side running the other way between the same two
/// regions; sides without a partner are hull sides.
pub fn pair_halfedges(triangles: &[usize]) -> Vec<Option<usize>> {
    let mut by_endpoints: HashMap<(usize, usize), usize> = HashMap::with_capacity(triangles.len());
    for s in 0..triangles.len() {
        by_endpoints.insert((triangles[s], triangles[s_next_s(s)]), s);
    }
    (0..triangles.len())
        .map(|s| by_endpoints.get(&(triangles[s_next_s(s)], triangles[s])).copied())
        .collect()
}
