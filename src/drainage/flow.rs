//! Flow accumulation and elevation repair over the drainage forest.

use super::{check_len, Downslope, DrainageError};
use crate::mesh::Mesh;

/// Totals from one accumulation pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowSummary {
    /// Triangles above sea level when the pass started; each is one unit of source flow
    pub land_triangles: usize,
    /// Flow handed over to water triangles, summed over every such side
    pub discharge: f32,
    /// Parents lowered to match a child
    pub repaired: usize,
}

/// Accumulate flow from the leaves of the forest towards the sea.
///
/// Every land triangle contributes one unit. Walking `order` backwards visits
/// children before parents: a child's flow is added to the side it drains
/// across, and also to its parent if the parent is land. Water parents absorb
/// the flow. A land parent higher than its child is lowered to the child's
/// elevation, so elevation never rises along a path to the sea.
pub fn assign_flow<M: Mesh>(
    mesh: &M,
    order: &[usize],
    elevation: &mut [f32],
    downslope: &[Downslope],
    t_flow: &mut [f32],
    s_flow: &mut [f32],
) -> Result<FlowSummary, DrainageError> {
    let n = mesh.num_triangles();
    check_len("order", n, order.len())?;
    check_len("elevation", n, elevation.len())?;
    check_len("downslope", n, downslope.len())?;
    check_len("t_flow", n, t_flow.len())?;
    check_len("s_flow", mesh.num_sides(), s_flow.len())?;

    let mut summary = FlowSummary::default();
    s_flow.fill(0.0);
    for t in 0..n {
        if elevation[t] > 0.0 {
            t_flow[t] = 1.0;
            summary.land_triangles += 1;
        } else {
            t_flow[t] = 0.0;
        }
    }

    // t1 is the tributary and t2 is the trunk
    for &t1 in order.iter().rev() {
        let Downslope::PointsTo(s) = downslope[t1] else { continue };
        let t2 = mesh.s_outer_t(s);
        s_flow[s] += t_flow[t1];
        if elevation[t2] > 0.0 {
            t_flow[t2] += t_flow[t1];
            if elevation[t2] > elevation[t1] {
                elevation[t2] = elevation[t1];
                summary.repaired += 1;
            }
        } else {
            summary.discharge += t_flow[t1];
        }
    }

    log::debug!(
        "flow: {} land triangles, discharge {}, {} parents lowered",
        summary.land_triangles,
        summary.discharge,
        summary.repaired
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drainage::biased_search;
    use crate::mesh::fixtures::hexagon_fan;
    use crate::mesh::DualMesh;

    struct Routed {
        mesh: DualMesh,
        seeds: Vec<usize>,
        before: Vec<f32>,
        elevation: Vec<f32>,
        downslope: Vec<Downslope>,
        order: Vec<usize>,
        t_flow: Vec<f32>,
        s_flow: Vec<f32>,
        summary: FlowSummary,
    }

    /// Two ghosts are sea; every other triangle is land.
    fn route_fan() -> Routed {
        let mesh = hexagon_fan();
        let solid = [0.3, 0.5, 0.1, 0.2, 0.4, 0.25];
        let mut elevation = vec![0.05f32; mesh.num_triangles()];
        elevation[..6].copy_from_slice(&solid);
        let seeds = vec![6, 9];
        for &t in &seeds {
            elevation[t] = -0.2;
        }
        let before = elevation.clone();

        let n = mesh.num_triangles();
        let mut downslope = vec![Downslope::Unvisited; n];
        let mut order = vec![0; n];
        biased_search(&mesh, &seeds, &elevation, &mut downslope, &mut order).unwrap();

        let mut t_flow = vec![0.0; n];
        let mut s_flow = vec![0.0; mesh.num_sides()];
        let summary = assign_flow(&mesh, &order, &mut elevation, &downslope, &mut t_flow, &mut s_flow).unwrap();
        Routed { mesh, seeds, before, elevation, downslope, order, t_flow, s_flow, summary }
    }

    #[test]
    fn test_fan_order_starts_with_seeds() {
        let r = route_fan();
        let mut head = r.order[..2].to_vec();
        head.sort();
        assert_eq!(head, r.seeds);
        assert_eq!(r.downslope[6], Downslope::Root);
        assert_eq!(r.downslope[9], Downslope::Root);
    }

    #[test]
    fn test_fan_flow_counts_upstream_land() {
        let r = route_fan();
        let n = r.mesh.num_triangles();

        // Expected flow: one unit per land triangle in the subtree
        let mut expected = vec![0.0f32; n];
        for &t in r.order.iter().rev() {
            if r.before[t] > 0.0 {
                expected[t] += 1.0;
            }
            if let Downslope::PointsTo(s) = r.downslope[t] {
                let parent = r.mesh.s_outer_t(s);
                if r.before[parent] > 0.0 {
                    expected[parent] += expected[t];
                }
            }
        }
        assert_eq!(r.t_flow, expected);

        // Everything ends up in one of the two seeds
        assert_eq!(r.summary.land_triangles, 10);
        assert_eq!(r.summary.discharge, 10.0);
    }

    #[test]
    fn test_side_flow_matches_child_flow() {
        let r = route_fan();
        for t in 0..r.mesh.num_triangles() {
            if let Downslope::PointsTo(s) = r.downslope[t] {
                assert_eq!(r.s_flow[s], r.t_flow[t]);
            }
        }
    }

    #[test]
    fn test_repair_makes_paths_non_increasing() {
        let r = route_fan();
        for t in 0..r.mesh.num_triangles() {
            if let Downslope::PointsTo(s) = r.downslope[t] {
                let parent = r.mesh.s_outer_t(s);
                if r.before[parent] > 0.0 {
                    assert!(r.elevation[parent] <= r.elevation[t]);
                }
            }
            // Repair only ever lowers
            assert!(r.elevation[t] <= r.before[t]);
        }
    }

    #[test]
    fn test_assign_flow_is_repeatable() {
        let mut r = route_fan();
        let first_flow = r.t_flow.clone();
        let first_side = r.s_flow.clone();
        let first_elevation = r.elevation.clone();
        let summary = assign_flow(
            &r.mesh,
            &r.order,
            &mut r.elevation,
            &r.downslope,
            &mut r.t_flow,
            &mut r.s_flow,
        )
        .unwrap();
        assert_eq!(r.t_flow, first_flow);
        assert_eq!(r.s_flow, first_side);
        assert_eq!(r.elevation, first_elevation);
        // Already repaired, nothing left to lower
        assert_eq!(summary.repaired, 0);
    }
}
