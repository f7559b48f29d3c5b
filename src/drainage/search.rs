//! Biased multi-source search that builds the drainage forest.
//!
//! This is a breadth-first expansion from every sea triangle at once, with one
//! twist: before each expansion a handful of pending entries are compared
//! against the front of the queue and the lower ones swapped forward. That gives
//! a rough lowest-first order without a priority queue. The imprecision is
//! useful, since rivers grown this way meander instead of tracking the single
//! steepest descent.

use super::{check_len, Downslope, DrainageError};
use crate::mesh::Mesh;

/// Number of pivots compared per expansion is about this many.
const PIVOT_DIVISOR: usize = 5;

/// Grow the drainage forest from `seeds`.
///
/// On success every triangle is either `Root` (the seeds) or points across a
/// side to its parent, and `order` lists each parent before its children.
/// Lower `priority` values are expanded earlier.
pub fn biased_search<M: Mesh>(
    mesh: &M,
    seeds: &[usize],
    priority: &[f32],
    downslope: &mut [Downslope],
    order: &mut [usize],
) -> Result<(), DrainageError> {
    let n = mesh.num_triangles();
    check_len("priority", n, priority.len())?;
    check_len("downslope", n, downslope.len())?;
    check_len("order", n, order.len())?;
    if seeds.is_empty() {
        return Err(DrainageError::NoDrainageRoots);
    }

    downslope.fill(Downslope::Unvisited);
    let mut queue_in = 0;
    for &t in seeds {
        if t >= n {
            return Err(DrainageError::InvalidSeed { triangle: t });
        }
        if downslope[t] == Downslope::Root {
            continue;
        }
        downslope[t] = Downslope::Root;
        order[queue_in] = t;
        queue_in += 1;
    }
    let num_roots = queue_in;

    let mut out_s = Vec::with_capacity(3);
    for queue_out in 0..n {
        if queue_out >= queue_in {
            // Queue drained early: the rest of the mesh is cut off from the sea
            let triangle = downslope
                .iter()
                .position(|d| *d == Downslope::Unvisited)
                .unwrap_or(queue_out);
            return Err(DrainageError::Unreachable { triangle });
        }

        if queue_out >= num_roots {
            // Promote lower entries from the pending tail towards the front
            let pivot_step = (queue_in - queue_out).div_ceil(PIVOT_DIVISOR);
            let mut pivot = queue_in - 1;
            while pivot > queue_out {
                if priority[order[pivot]] < priority[order[queue_out]] {
                    order.swap(pivot, queue_out);
                }
                if pivot <= queue_out + pivot_step {
                    break;
                }
                pivot -= pivot_step;
            }
        }

        let current_t = order[queue_out];
        mesh.t_circulate_s(&mut out_s, current_t);
        for &s in &out_s {
            // Uphill from current_t
            let neighbor_t = mesh.s_outer_t(s);
            if downslope[neighbor_t] == Downslope::Unvisited {
                downslope[neighbor_t] = Downslope::PointsTo(mesh.s_opposite_s(s));
                order[queue_in] = neighbor_t;
                queue_in += 1;
            }
        }
    }

    log::debug!("biased search: {} roots, {} triangles", num_roots, n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drainage::validate_forest;
    use crate::mesh::DualMesh;

    fn grid() -> DualMesh {
        DualMesh::jittered_grid(1000.0, 100.0, 0.4, 11).unwrap()
    }

    /// Ghosts along the bottom edge are sea, everything else rises to the north.
    fn sloped(mesh: &DualMesh) -> (Vec<f32>, Vec<usize>) {
        let mut elevation = Vec::new();
        let mut seeds = Vec::new();
        for t in 0..mesh.num_triangles() {
            let (_, y) = mesh.t_centroid(t);
            let e = if mesh.t_ghost(t) && y < 0.0 { -0.2 } else { (y as f32 / 1000.0).max(0.01) };
            if e < 0.0 {
                seeds.push(t);
            }
            elevation.push(e);
        }
        (elevation, seeds)
    }

    #[test]
    fn test_search_builds_valid_forest() {
        let mesh = grid();
        let (elevation, seeds) = sloped(&mesh);
        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];

        biased_search(&mesh, &seeds, &elevation, &mut downslope, &mut order).unwrap();

        assert!(downslope.iter().all(|d| *d != Downslope::Unvisited));
        assert_eq!(&order[..seeds.len()], &seeds[..]);
        validate_forest(&mesh, &seeds, &downslope, &order).unwrap();
    }

    #[test]
    fn test_pointer_side_leads_back_to_parent() {
        let mesh = grid();
        let (elevation, seeds) = sloped(&mesh);
        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        biased_search(&mesh, &seeds, &elevation, &mut downslope, &mut order).unwrap();

        for t in 0..n {
            if let Downslope::PointsTo(s) = downslope[t] {
                assert_eq!(mesh.s_inner_t(s), t);
            }
        }
    }

    #[test]
    fn test_empty_seeds_fail_fast() {
        let mesh = grid();
        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        let err = biased_search(&mesh, &[], &vec![0.0; n], &mut downslope, &mut order);
        assert_eq!(err, Err(DrainageError::NoDrainageRoots));
    }

    #[test]
    fn test_invalid_seed_and_length_checks() {
        let mesh = grid();
        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        let err = biased_search(&mesh, &[n + 3], &vec![0.0; n], &mut downslope, &mut order);
        assert_eq!(err, Err(DrainageError::InvalidSeed { triangle: n + 3 }));

        let err = biased_search(&mesh, &[0], &vec![0.0; n - 1], &mut downslope, &mut order);
        assert!(matches!(err, Err(DrainageError::LengthMismatch { name: "priority", .. })));
    }

    #[test]
    fn test_duplicate_seeds_are_counted_once() {
        let mesh = grid();
        let (elevation, seeds) = sloped(&mesh);
        let mut doubled = seeds.clone();
        doubled.extend(seeds.iter().copied());
        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        biased_search(&mesh, &doubled, &elevation, &mut downslope, &mut order).unwrap();
        validate_forest(&mesh, &seeds, &downslope, &order).unwrap();
    }

    #[test]
    fn test_disconnected_mesh_is_unreachable() {
        // Two separate triangles glued into one mesh without shared sides
        let points = vec![
            [0.0, 0.0], [10.0, 0.0], [0.0, 10.0],
            [100.0, 100.0], [110.0, 100.0], [100.0, 110.0],
        ];
        let triangles = vec![0, 1, 2, 3, 4, 5];
        let halfedges = vec![None; 6];
        // The hull of two islands is not a single ring
        assert!(DualMesh::from_triangulation(points, triangles, halfedges).is_err());

        // A stub mesh with an isolated triangle exercises the search directly
        struct Islands;
        impl Mesh for Islands {
            fn num_triangles(&self) -> usize { 2 }
            fn num_solid_triangles(&self) -> usize { 2 }
            fn num_regions(&self) -> usize { 0 }
            fn num_sides(&self) -> usize { 6 }
            fn t_centroid(&self, _t: usize) -> (f64, f64) { (0.0, 0.0) }
            fn t_ghost(&self, _t: usize) -> bool { false }
            // Every side faces its own triangle
            fn s_opposite_s(&self, s: usize) -> usize { s }
            fn s_begin_r(&self, _s: usize) -> usize { 0 }
            fn s_end_r(&self, _s: usize) -> usize { 0 }
            fn s_inner_t(&self, s: usize) -> usize { s / 3 }
            fn t_circulate_s(&self, out: &mut Vec<usize>, t: usize) {
                out.clear();
                out.extend([3 * t, 3 * t + 1, 3 * t + 2]);
            }
            fn r_circulate_t(&self, out: &mut Vec<usize>, _r: usize) { out.clear(); }
        }
        let mut downslope = vec![Downslope::Unvisited; 2];
        let mut order = vec![0; 2];
        let err = biased_search(&Islands, &[0], &[0.0, 0.0], &mut downslope, &mut order);
        assert_eq!(err, Err(DrainageError::Unreachable { triangle: 1 }));
    }

    #[test]
    fn test_lower_pending_triangle_is_expanded_first() {
        let mesh = grid();
        let n = mesh.num_triangles();
        let (mut elevation, seeds) = sloped(&mesh);

        // Replay the seed expansion to find the last triangle it queues
        let mut seen = vec![false; n];
        for &t in &seeds {
            seen[t] = true;
        }
        let mut pending = Vec::new();
        let mut out = Vec::new();
        for &t in &seeds {
            mesh.t_circulate_s(&mut out, t);
            for &s in &out {
                let neighbor = mesh.s_outer_t(s);
                if !seen[neighbor] {
                    seen[neighbor] = true;
                    pending.push(neighbor);
                }
            }
        }
        let last = *pending.last().unwrap();
        elevation[last] = -0.5;

        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        biased_search(&mesh, &seeds, &elevation, &mut downslope, &mut order).unwrap();
        // Queued last, but the lowest pending entry so it is expanded first
        assert_eq!(order[seeds.len()], last);
    }
}
