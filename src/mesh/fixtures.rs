//! Small meshes shared by unit tests.

use super::grid::pair_halfedges;
use super::DualMesh;

/// Hexagonal fan: one centre region surrounded by six solid triangles,
/// closed by six ghosts. Region 7 is the ghost region.
pub(crate) fn hexagon_fan() -> DualMesh {
    let mut points = vec![[500.0, 500.0]];
    for i in 0..6 {
        let a = std::f64::consts::PI / 3.0 * i as f64;
        points.push([500.0 + 100.0 * a.cos(), 500.0 + 100.0 * a.sin()]);
    }
    let mut triangles = Vec::new();
    for i in 0..6 {
        triangles.extend([0, 1 + i, 1 + (i + 1) % 6]);
    }
    let halfedges = pair_halfedges(&triangles);
    DualMesh::from_triangulation(points, triangles, halfedges).unwrap()
}
