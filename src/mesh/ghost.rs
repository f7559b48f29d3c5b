//! Ghost closure of the convex hull.
//!
//! For every hull side `a -> b` a ghost triangle `(b, a, ghost)` is appended,
//! where `ghost` is one extra region shared by all of them. Consecutive ghost
//! triangles around the hull are paired along their `ghost -> b` / `b -> ghost`
//! sides, so the closed mesh has no unpaired sides at all.

use super::{s_next_s, MeshError};

/// Distance (world units) between a hull side and its ghost triangle's center.
const GHOST_OFFSET: f64 = 10.0;

pub(crate) struct ClosedMesh {
    pub r_vertex: Vec<[f64; 2]>,
    pub s_start_r: Vec<usize>,
    pub s_opposite_s: Vec<usize>,
}

pub(crate) fn close_hull(
    points: &[[f64; 2]],
    triangles: &[usize],
    halfedges: &[Option<usize>],
) -> Result<ClosedMesh, MeshError> {
    let num_solid_sides = triangles.len();

    // Each hull region has exactly one outgoing hull side on a simple hull
    let mut unpaired_from_r: Vec<Option<usize>> = vec![None; points.len()];
    let mut first_unpaired = None;
    let mut num_unpaired = 0;
    for s in 0..num_solid_sides {
        if halfedges[s].is_none() {
            let r = triangles[s];
            if unpaired_from_r[r].is_some() {
                return Err(MeshError::NonSimpleHull);
            }
            unpaired_from_r[r] = Some(s);
            first_unpaired.get_or_insert(s);
            num_unpaired += 1;
        }
    }

    let mut r_vertex = points.to_vec();
    let mut s_start_r = triangles.to_vec();
    let mut s_opposite_s: Vec<usize> = halfedges.iter().map(|h| h.unwrap_or(usize::MAX)).collect();

    let Some(first) = first_unpaired else {
        return Ok(ClosedMesh { r_vertex, s_start_r, s_opposite_s });
    };

    // Walk the hull ring so ghost triangles are numbered in ring order
    let mut ring = Vec::with_capacity(num_unpaired);
    let mut s = first;
    loop {
        ring.push(s);
        if ring.len() > num_unpaired {
            return Err(MeshError::NonSimpleHull);
        }
        let end_r = triangles[s_next_s(s)];
        s = unpaired_from_r[end_r].ok_or(MeshError::NonSimpleHull)?;
        if s == first {
            break;
        }
    }
    if ring.len() != num_unpaired {
        return Err(MeshError::NonSimpleHull);
    }

    let n = points.len() as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let r_ghost = r_vertex.len();
    r_vertex.push([cx, cy]);

    let total = num_solid_sides + 3 * num_unpaired;
    s_start_r.resize(total, 0);
    s_opposite_s.resize(total, usize::MAX);

    for (i, &s) in ring.iter().enumerate() {
        let s_ghost = num_solid_sides + 3 * i;
        s_opposite_s[s] = s_ghost;
        s_opposite_s[s_ghost] = s;
        s_start_r[s_ghost] = triangles[s_next_s(s)];
        s_start_r[s_ghost + 1] = triangles[s];
        s_start_r[s_ghost + 2] = r_ghost;
        let k = num_solid_sides + (3 * i + 4) % (3 * num_unpaired);
        s_opposite_s[s_ghost + 2] = k;
        s_opposite_s[k] = s_ghost + 2;
    }

    Ok(ClosedMesh { r_vertex, s_start_r, s_opposite_s })
}

/// Center of a ghost triangle: just outside the midpoint of its hull side
/// `a`-`b`, on the opposite side from the solid triangle's centroid.
pub(crate) fn ghost_center(a: [f64; 2], b: [f64; 2], solid: [f64; 2]) -> [f64; 2] {
    let mid = [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1])];
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
    let mut nx = dy / len;
    let mut ny = -dx / len;
    if nx * (mid[0] - solid[0]) + ny * (mid[1] - solid[1]) < 0.0 {
        nx = -nx;
        ny = -ny;
    }
    [mid[0] + GHOST_OFFSET * nx, mid[1] + GHOST_OFFSET * ny]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ghost_center_points_away_from_solid() {
        let c = ghost_center([0.0, 0.0], [10.0, 0.0], [5.0, 3.0]);
        assert!((c[0] - 5.0).abs() < 1e-9);
        assert!((c[1] + GHOST_OFFSET).abs() < 1e-9);
    }

    #[test]
    fn test_two_outgoing_hull_sides_rejected() {
        // Two triangles touching only at region 0 (a bow tie)
        let points = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [-1.0, 0.0], [-1.0, -1.0]];
        let triangles = vec![0, 1, 2, 0, 3, 4];
        let halfedges = vec![None; 6];
        assert!(matches!(
            close_hull(&points, &triangles, &halfedges),
            Err(MeshError::NonSimpleHull)
        ));
    }
}
