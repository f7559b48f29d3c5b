//! Planar dual mesh: Delaunay triangles paired with their Voronoi-like regions.
//!
//! The drainage code only talks to the [`Mesh`] trait. [`DualMesh`] is the
//! concrete half-edge implementation: sides are directed half-edges stored
//! three per triangle, so side `s` belongs to triangle `s / 3`. The convex hull
//! is closed with "ghost" triangles that all share one extra ghost region, which
//! means every side has an opposite and boundary triangles can route into the
//! sea like any other neighbour.

pub mod ghost;
pub mod grid;
#[cfg(test)]
pub(crate) mod fixtures;

use std::path::Path;

use serde::Deserialize;

/// Side length of the square world the mesh lives in.
pub const WORLD_SIZE: f64 = 1000.0;

/// Read-only view of a dual mesh, as consumed by elevation and river routing.
pub trait Mesh {
    fn num_triangles(&self) -> usize;
    /// Triangles that are not ghosts. Ghosts are always numbered after these.
    fn num_solid_triangles(&self) -> usize;
    fn num_regions(&self) -> usize;
    fn num_sides(&self) -> usize;

    /// Representative point of a triangle (centroid for solid triangles).
    fn t_centroid(&self, t: usize) -> (f64, f64);
    fn t_ghost(&self, t: usize) -> bool;

    fn s_opposite_s(&self, s: usize) -> usize;
    fn s_begin_r(&self, s: usize) -> usize;
    fn s_end_r(&self, s: usize) -> usize;
    fn s_inner_t(&self, s: usize) -> usize;

    /// Triangle on the far side of `s`, away from `s_inner_t(s)`.
    fn s_outer_t(&self, s: usize) -> usize {
        self.s_inner_t(self.s_opposite_s(s))
    }

    /// Sides bounding triangle `t`, written into `out` (cleared first).
    fn t_circulate_s(&self, out: &mut Vec<usize>, t: usize);
    /// Triangles around region `r` in circulation order, written into `out`.
    fn r_circulate_t(&self, out: &mut Vec<usize>, r: usize);
}

#[inline]
pub fn s_next_s(s: usize) -> usize {
    if s % 3 == 2 { s - 2 } else { s + 1 }
}

#[inline]
pub fn s_prev_s(s: usize) -> usize {
    if s % 3 == 0 { s + 2 } else { s - 1 }
}

/// Half-edge dual mesh with ghost closure.
#[derive(Clone, Debug)]
pub struct DualMesh {
    r_vertex: Vec<[f64; 2]>,
    t_vertex: Vec<[f64; 2]>,
    s_start_r: Vec<usize>,
    s_opposite_s: Vec<usize>,
    /// One incoming side per region, the starting point for circulation.
    r_in_s: Vec<usize>,
    num_solid_sides: usize,
}

impl DualMesh {
    /// Build a mesh from Delaunator-style flat arrays.
    ///
    /// `triangles[s]` is the region a side starts at; `halfedges[s]` is the
    /// paired side, or `None` on the convex hull. Hull sides get ghost
    /// triangles attached before the mesh is returned.
    pub fn from_triangulation(
        points: Vec<[f64; 2]>,
        triangles: Vec<usize>,
        halfedges: Vec<Option<usize>>,
    ) -> Result<Self, MeshError> {
        validate_triangulation(&points, &triangles, &halfedges)?;

        let num_solid_sides = triangles.len();
        let closed = ghost::close_hull(&points, &triangles, &halfedges)?;

        let num_regions = closed.r_vertex.len();
        let mut r_in_s = vec![usize::MAX; num_regions];
        for s in 0..closed.s_start_r.len() {
            let endpoint = closed.s_start_r[s_next_s(s)];
            r_in_s[endpoint] = s;
        }

        let num_triangles = closed.s_start_r.len() / 3;
        let mut t_vertex = Vec::with_capacity(num_triangles);
        for t in 0..num_triangles {
            let s = 3 * t;
            let a = closed.r_vertex[closed.s_start_r[s]];
            let b = closed.r_vertex[closed.s_start_r[s + 1]];
            let c = closed.r_vertex[closed.s_start_r[s + 2]];
            if s >= num_solid_sides {
                // Side `s` of a ghost triangle is the mirrored hull side
                let solid_t = closed.s_opposite_s[s] / 3;
                t_vertex.push(ghost::ghost_center(a, b, centroid(&closed, solid_t)));
            } else {
                t_vertex.push([(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0]);
            }
        }

        let mesh = Self {
            r_vertex: closed.r_vertex,
            t_vertex,
            s_start_r: closed.s_start_r,
            s_opposite_s: closed.s_opposite_s,
            r_in_s,
            num_solid_sides,
        };
        log::debug!(
            "dual mesh: {} regions, {} triangles ({} solid), {} sides",
            mesh.num_regions(),
            mesh.num_triangles(),
            mesh.num_solid_triangles(),
            mesh.num_sides()
        );
        Ok(mesh)
    }

    /// Load a triangulation from JSON: `{"points": [[x, y], ...],
    /// "triangles": [...], "halfedges": [...]}` with `-1` marking hull sides.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, MeshError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, MeshError> {
        let raw: RawTriangulation =
            serde_json::from_str(text).map_err(|e| MeshError::Parse(e.to_string()))?;
        let halfedges = raw
            .halfedges
            .iter()
            .map(|&h| if h < 0 { None } else { Some(h as usize) })
            .collect();
        Self::from_triangulation(raw.points, raw.triangles, halfedges)
    }

    pub fn r_vertex(&self, r: usize) -> (f64, f64) {
        let [x, y] = self.r_vertex[r];
        (x, y)
    }

    pub fn num_solid_sides(&self) -> usize {
        self.num_solid_sides
    }

    /// The single region every ghost triangle touches, if the hull was closed.
    pub fn ghost_region(&self) -> Option<usize> {
        if self.num_solid_sides < self.s_start_r.len() {
            Some(self.r_vertex.len() - 1)
        } else {
            None
        }
    }
}

fn centroid(closed: &ghost::ClosedMesh, t: usize) -> [f64; 2] {
    let s = 3 * t;
    let mut x = 0.0;
    let mut y = 0.0;
    for i in 0..3 {
        let [px, py] = closed.r_vertex[closed.s_start_r[s + i]];
        x += px;
        y += py;
    }
    [x / 3.0, y / 3.0]
}

impl Mesh for DualMesh {
    fn num_triangles(&self) -> usize {
        self.s_start_r.len() / 3
    }

    fn num_solid_triangles(&self) -> usize {
        self.num_solid_sides / 3
    }

    fn num_regions(&self) -> usize {
        self.r_vertex.len()
    }

    fn num_sides(&self) -> usize {
        self.s_start_r.len()
    }

    fn t_centroid(&self, t: usize) -> (f64, f64) {
        let [x, y] = self.t_vertex[t];
        (x, y)
    }

    fn t_ghost(&self, t: usize) -> bool {
        3 * t >= self.num_solid_sides
    }

    fn s_opposite_s(&self, s: usize) -> usize {
        self.s_opposite_s[s]
    }

    fn s_begin_r(&self, s: usize) -> usize {
        self.s_start_r[s]
    }

    fn s_end_r(&self, s: usize) -> usize {
        self.s_start_r[s_next_s(s)]
    }

    fn s_inner_t(&self, s: usize) -> usize {
        s / 3
    }

    fn t_circulate_s(&self, out: &mut Vec<usize>, t: usize) {
        out.clear();
        out.extend([3 * t, 3 * t + 1, 3 * t + 2]);
    }

    fn r_circulate_t(&self, out: &mut Vec<usize>, r: usize) {
        out.clear();
        let s0 = self.r_in_s[r];
        if s0 == usize::MAX {
            return;
        }
        let mut incoming = s0;
        loop {
            out.push(self.s_inner_t(incoming));
            let outgoing = s_next_s(incoming);
            incoming = self.s_opposite_s[outgoing];
            if incoming == s0 {
                break;
            }
        }
    }
}

#[derive(Deserialize)]
struct RawTriangulation {
    points: Vec<[f64; 2]>,
    triangles: Vec<usize>,
    halfedges: Vec<i64>,
}

fn validate_triangulation(
    points: &[[f64; 2]],
    triangles: &[usize],
    halfedges: &[Option<usize>],
) -> Result<(), MeshError> {
    if points.len() < 3 {
        return Err(MeshError::TooFewPoints(points.len()));
    }
    if triangles.is_empty() || triangles.len() % 3 != 0 {
        return Err(MeshError::MalformedTriangles(triangles.len()));
    }
    if halfedges.len() != triangles.len() {
        return Err(MeshError::LengthMismatch {
            triangles: triangles.len(),
            halfedges: halfedges.len(),
        });
    }
    for (s, &r) in triangles.iter().enumerate() {
        if r >= points.len() {
            return Err(MeshError::RegionOutOfRange { side: s, region: r });
        }
    }
    for (s, &h) in halfedges.iter().enumerate() {
        let Some(o) = h else { continue };
        let paired = o < halfedges.len()
            && halfedges[o] == Some(s)
            && triangles[o] == triangles[s_next_s(s)]
            && triangles[s_next_s(o)] == triangles[s];
        if !paired {
            return Err(MeshError::UnpairedSide(s));
        }
    }
    Ok(())
}

/// Errors raised while building or loading a mesh
#[derive(Debug)]
pub enum MeshError {
    /// Fewer than three input points
    TooFewPoints(usize),
    /// Triangle array empty or not a multiple of three
    MalformedTriangles(usize),
    /// Triangle and half-edge arrays differ in length
    LengthMismatch { triangles: usize, halfedges: usize },
    /// A side starts at a region that does not exist
    RegionOutOfRange { side: usize, region: usize },
    /// A side's opposite does not point back at it
    UnpairedSide(usize),
    /// Hull sides do not form a single closed ring
    NonSimpleHull,
    /// Grid builder arguments that cannot produce a mesh
    InvalidGrid(String),
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::TooFewPoints(n) => write!(f, "need at least 3 points, got {}", n),
            MeshError::MalformedTriangles(n) => {
                write!(f, "triangle array length {} is not a positive multiple of 3", n)
            }
            MeshError::LengthMismatch { triangles, halfedges } => write!(
                f,
                "triangles has {} entries but halfedges has {}",
                triangles, halfedges
            ),
            MeshError::RegionOutOfRange { side, region } => {
                write!(f, "side {} starts at unknown region {}", side, region)
            }
            MeshError::UnpairedSide(s) => write!(f, "side {} has an inconsistent opposite", s),
            MeshError::NonSimpleHull => write!(f, "hull sides do not form a single ring"),
            MeshError::InvalidGrid(msg) => write!(f, "invalid grid: {}", msg),
            MeshError::Io(e) => write!(f, "IO error: {}", e),
            MeshError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for MeshError {}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        MeshError::Io(e)
    }
}
