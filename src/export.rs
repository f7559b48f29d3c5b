//! PNG preview and JSON snapshot of a generated map.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::Serialize;

use crate::map::TerrainMap;
use crate::mesh::{DualMesh, Mesh, WORLD_SIZE};

const DEEP_WATER: [u8; 3] = [20, 40, 90];
const SHALLOW_WATER: [u8; 3] = [70, 120, 175];
const LOWLAND: [u8; 3] = [80, 130, 60];
const HIGHLAND: [u8; 3] = [140, 125, 90];
const PEAK: [u8; 3] = [240, 240, 245];
const RIVER: [u8; 3] = [40, 90, 200];

/// Errors from writing export files
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Image(image::ImageError),
    Json(serde_json::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "IO error: {}", e),
            ExportError::Image(e) => write!(f, "image error: {}", e),
            ExportError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Image(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

/// Render the map to a `size`×`size` image: triangles filled by elevation,
/// rivers drawn centroid to centroid wherever side flow reaches `min_flow`.
pub fn render_map(mesh: &DualMesh, map: &TerrainMap, min_flow: f32, size: u32) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(size, size, Rgb(DEEP_WATER));
    let scale = size as f64 / WORLD_SIZE;
    let mut out_s = Vec::with_capacity(3);

    for t in 0..mesh.num_solid_triangles() {
        mesh.t_circulate_s(&mut out_s, t);
        let mut corners = [(0.0, 0.0); 3];
        for (corner, &s) in corners.iter_mut().zip(&out_s) {
            let (x, y) = mesh.r_vertex(mesh.s_begin_r(s));
            *corner = (x * scale, y * scale);
        }
        fill_triangle(&mut img, corners, Rgb(elevation_color(map.t_elevation[t])));
    }

    for path in map.river_paths(mesh, min_flow) {
        for pair in path.points.windows(2) {
            let radius = 0.5 + 0.15 * (pair[0].flow.max(0.0) as f64).sqrt() * scale;
            draw_segment(
                &mut img,
                (pair[0].x * scale, pair[0].y * scale),
                (pair[1].x * scale, pair[1].y * scale),
                radius,
                Rgb(RIVER),
            );
        }
    }
    img
}

/// Render and save as PNG.
pub fn render_png<P: AsRef<Path>>(
    mesh: &DualMesh,
    map: &TerrainMap,
    min_flow: f32,
    size: u32,
    path: P,
) -> Result<(), ExportError> {
    let img = render_map(mesh, map, min_flow, size);
    img.save(path.as_ref())?;
    log::info!("wrote {}x{} preview to {}", size, size, path.as_ref().display());
    Ok(())
}

#[derive(Serialize)]
struct Snapshot<'a> {
    num_triangles: usize,
    num_solid_triangles: usize,
    num_regions: usize,
    num_sides: usize,
    seeds_t: &'a [usize],
    order_t: &'a [usize],
    t_elevation: &'a [f32],
    r_elevation: &'a [f32],
    r_moisture: &'a [f32],
    r_water: &'a [bool],
    t_flow: &'a [f32],
    s_flow: &'a [f32],
    /// Side id, -1 for roots
    t_downslope_s: Vec<i64>,
}

/// Write every produced array as one JSON object.
pub fn write_snapshot<M: Mesh, P: AsRef<Path>>(mesh: &M, map: &TerrainMap, path: P) -> Result<(), ExportError> {
    let snapshot = Snapshot {
        num_triangles: mesh.num_triangles(),
        num_solid_triangles: mesh.num_solid_triangles(),
        num_regions: mesh.num_regions(),
        num_sides: mesh.num_sides(),
        seeds_t: &map.seeds_t,
        order_t: &map.order_t,
        t_elevation: &map.t_elevation,
        r_elevation: &map.r_elevation,
        r_moisture: &map.r_moisture,
        r_water: &map.r_water,
        t_flow: &map.t_flow,
        s_flow: &map.s_flow,
        t_downslope_s: map.t_downslope_s.iter().map(|d| d.to_wire()).collect(),
    };

    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, &snapshot)?;
    log::info!("wrote snapshot to {}", path.as_ref().display());
    Ok(())
}

/// Blue below sea level, green through brown to white above.
fn elevation_color(e: f32) -> [u8; 3] {
    if e < 0.0 {
        lerp_color(DEEP_WATER, SHALLOW_WATER, 1.0 + e)
    } else if e < 0.5 {
        lerp_color(LOWLAND, HIGHLAND, e / 0.5)
    } else {
        lerp_color(HIGHLAND, PEAK, (e - 0.5) / 0.5)
    }
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t) as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t) as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t) as u8,
    ]
}

/// Pixel range covered by `[lo, hi]`, clipped to `[0, limit)`.
fn pixel_span(lo: f64, hi: f64, limit: u32) -> std::ops::Range<u32> {
    let start = lo.floor().clamp(0.0, limit as f64) as u32;
    let end = (hi.ceil() + 1.0).clamp(0.0, limit as f64) as u32;
    start..end
}

fn fill_triangle(img: &mut RgbImage, p: [(f64, f64); 3], color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let edge = |a: (f64, f64), b: (f64, f64), x: f64, y: f64| (b.0 - a.0) * (y - a.1) - (b.1 - a.1) * (x - a.0);
    let xs = pixel_span(p[0].0.min(p[1].0).min(p[2].0), p[0].0.max(p[1].0).max(p[2].0), w);
    let ys = pixel_span(p[0].1.min(p[1].1).min(p[2].1), p[0].1.max(p[1].1).max(p[2].1), h);

    for py in ys {
        for px in xs.clone() {
            let (x, y) = (px as f64 + 0.5, py as f64 + 0.5);
            let e0 = edge(p[0], p[1], x, y);
            let e1 = edge(p[1], p[2], x, y);
            let e2 = edge(p[2], p[0], x, y);
            // Either winding
            let inside = (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0);
            if inside {
                img.put_pixel(px, py, color);
            }
        }
    }
}

fn draw_segment(img: &mut RgbImage, a: (f64, f64), b: (f64, f64), radius: f64, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
    let steps = (length * 2.0).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let f = i as f64 / steps as f64;
        let cx = a.0 + (b.0 - a.0) * f;
        let cy = a.1 + (b.1 - a.1) * f;
        for py in pixel_span(cy - radius, cy + radius, h) {
            for px in pixel_span(cx - radius, cx + radius, w) {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }
}
