//! River polylines traced along downslope pointers.

use super::Downslope;
use crate::mesh::Mesh;

/// A point along a traced river
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverPoint {
    pub triangle: usize,
    pub x: f64,
    pub y: f64,
    /// Flow leaving this point downstream (0 at the mouth)
    pub flow: f32,
}

/// One river from its head to a confluence or the sea.
#[derive(Clone, Debug, Default)]
pub struct RiverPath {
    pub points: Vec<RiverPoint>,
}

impl RiverPath {
    pub fn head(&self) -> Option<&RiverPoint> {
        self.points.first()
    }

    pub fn mouth(&self) -> Option<&RiverPoint> {
        self.points.last()
    }

    pub fn max_flow(&self) -> f32 {
        self.points.iter().map(|p| p.flow).fold(0.0, f32::max)
    }
}

/// Trace every river whose sides carry at least `min_flow`.
///
/// A river starts at a land triangle whose outgoing side qualifies but which
/// has no qualifying tributary, and follows downslope pointers until it meets
/// water, a root, or a triangle already claimed by an earlier river. The last
/// point is that terminating triangle, so tributaries end on their trunk.
pub fn trace_river_paths<M: Mesh>(
    mesh: &M,
    downslope: &[Downslope],
    elevation: &[f32],
    s_flow: &[f32],
    min_flow: f32,
) -> Vec<RiverPath> {
    let n = mesh.num_triangles();
    let carries = |t: usize| match downslope[t] {
        Downslope::PointsTo(s) => elevation[t] > 0.0 && s_flow[s] >= min_flow,
        _ => false,
    };

    let mut has_tributary = vec![false; n];
    for t in 0..n {
        if let (true, Downslope::PointsTo(s)) = (carries(t), downslope[t]) {
            has_tributary[mesh.s_outer_t(s)] = true;
        }
    }

    // Highest outgoing flow first; ties broken by id
    let mut heads: Vec<usize> = (0..n).filter(|&t| carries(t) && !has_tributary[t]).collect();
    heads.sort_by(|&a, &b| {
        let fa = downslope[a].side().map_or(0.0, |s| s_flow[s]);
        let fb = downslope[b].side().map_or(0.0, |s| s_flow[s]);
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });

    let mut claimed = vec![false; n];
    let mut paths = Vec::with_capacity(heads.len());
    for head in heads {
        let mut path = RiverPath::default();
        let mut t = head;
        loop {
            let (x, y) = mesh.t_centroid(t);
            match downslope[t] {
                Downslope::PointsTo(s) if !claimed[t] && elevation[t] > 0.0 => {
                    path.points.push(RiverPoint { triangle: t, x, y, flow: s_flow[s] });
                    claimed[t] = true;
                    t = mesh.s_outer_t(s);
                }
                _ => {
                    path.points.push(RiverPoint { triangle: t, x, y, flow: 0.0 });
                    break;
                }
            }
        }
        if path.points.len() >= 2 {
            paths.push(path);
        }
    }
    paths
}
