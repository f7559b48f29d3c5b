//! End-to-end regeneration over a jittered grid with an island mask.

use image::{DynamicImage, Rgb, RgbImage};

use mapgen_rivers::constraints::{ElevationSource, LandMask};
use mapgen_rivers::drainage::{validate_forest, Downslope, DrainageError};
use mapgen_rivers::map::{GenerationContext, GenerationError, TerrainMap};
use mapgen_rivers::mesh::{DualMesh, Mesh};
use mapgen_rivers::params::GenerationParams;

/// Round island in the middle of the world, water along every edge.
fn island_mask() -> LandMask {
    let img = RgbImage::from_fn(64, 64, |x, y| {
        let dx = x as f64 - 31.5;
        let dy = y as f64 - 31.5;
        if (dx * dx + dy * dy).sqrt() < 22.0 {
            Rgb([60, 200, 40])
        } else {
            Rgb([10, 40, 180])
        }
    });
    LandMask::from_image(DynamicImage::ImageRgb8(img)).unwrap()
}

fn setup() -> (DualMesh, GenerationContext) {
    let mesh = DualMesh::jittered_grid(1000.0, 20.0, 0.4, 9).unwrap();
    let params = GenerationParams { seed: 1234, ..GenerationParams::default() };
    let ctx = GenerationContext::new(params, ElevationSource::mask(island_mask()));
    (mesh, ctx)
}

#[test]
fn test_forest_is_valid_after_regeneration() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    let report = map.regenerate(&mesh, &ctx).unwrap();

    assert!(report.seeds > 0);
    assert!(report.land_triangles > 0);
    assert!(map.t_downslope_s.iter().all(|d| *d != Downslope::Unvisited));
    validate_forest(&mesh, &map.seeds_t, &map.t_downslope_s, &map.order_t).unwrap();
    for &t in &map.seeds_t {
        assert!(mesh.t_ghost(t));
    }
}

#[test]
fn test_elevation_never_rises_towards_the_sea() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    map.regenerate(&mesh, &ctx).unwrap();

    for t in 0..mesh.num_triangles() {
        if let Downslope::PointsTo(s) = map.t_downslope_s[t] {
            let parent = mesh.s_outer_t(s);
            if map.t_elevation[parent] > 0.0 {
                assert!(
                    map.t_elevation[parent] <= map.t_elevation[t],
                    "triangle {} drains uphill into {}",
                    t,
                    parent
                );
            }
        }
    }
}

#[test]
fn test_discharge_equals_land_count() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    let report = map.regenerate(&mesh, &ctx).unwrap();
    assert_eq!(report.discharge, report.land_triangles as f32);

    // Flow handed to each root across its sides
    let mut into_water = 0.0f32;
    for t in 0..mesh.num_triangles() {
        if let Downslope::PointsTo(s) = map.t_downslope_s[t] {
            if map.t_elevation[mesh.s_outer_t(s)] <= 0.0 {
                into_water += map.s_flow[s];
            }
        }
    }
    assert!(into_water >= report.discharge);
}

#[test]
fn test_regeneration_is_bit_identical() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    map.regenerate(&mesh, &ctx).unwrap();
    let first = map.clone();
    map.regenerate(&mesh, &ctx).unwrap();

    assert_eq!(map.t_elevation, first.t_elevation);
    assert_eq!(map.r_elevation, first.r_elevation);
    assert_eq!(map.t_downslope_s, first.t_downslope_s);
    assert_eq!(map.order_t, first.order_t);
    assert_eq!(map.t_flow, first.t_flow);
    assert_eq!(map.s_flow, first.s_flow);

    // A fresh map and context give the same result
    let (_, ctx2) = setup();
    let mut other = TerrainMap::new(&mesh);
    other.regenerate(&mesh, &ctx2).unwrap();
    assert_eq!(other.t_elevation, first.t_elevation);
    assert_eq!(other.order_t, first.order_t);
}

#[test]
fn test_water_regions_follow_triangles() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    map.regenerate(&mesh, &ctx).unwrap();
    for r in 0..mesh.num_regions() {
        assert_eq!(map.r_water[r], map.r_elevation[r] < 0.0);
    }
    let land = map.r_water.iter().filter(|w| !**w).count();
    assert!(land > 0 && land < mesh.num_regions());
}

#[test]
fn test_rivers_end_in_water_or_on_a_trunk() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    map.regenerate(&mesh, &ctx).unwrap();

    let paths = map.river_paths(&mesh, ctx.params.river_min_flow);
    assert!(!paths.is_empty());
    let mut seen = vec![false; mesh.num_triangles()];
    for path in &paths {
        let mouth = path.mouth().unwrap().triangle;
        assert!(map.t_elevation[mouth] <= 0.0 || seen[mouth]);
        for p in &path.points[..path.points.len() - 1] {
            seen[p.triangle] = true;
        }
    }
}

#[test]
fn test_all_land_world_fails_without_touching_the_map() {
    let (mesh, ctx) = setup();
    let mut map = TerrainMap::new(&mesh);
    map.regenerate(&mesh, &ctx).unwrap();
    let before = map.clone();

    let green = RgbImage::from_pixel(8, 8, Rgb([0, 220, 0]));
    let source = ElevationSource::mask(LandMask::from_image(DynamicImage::ImageRgb8(green)).unwrap());
    let dry = GenerationContext::new(GenerationParams::default(), source);
    let err = map.regenerate(&mesh, &dry).unwrap_err();
    assert_eq!(err, GenerationError::Drainage(DrainageError::NoDrainageRoots));

    assert_eq!(map.t_elevation, before.t_elevation);
    assert_eq!(map.r_elevation, before.r_elevation);
    assert_eq!(map.r_moisture, before.r_moisture);
    assert_eq!(map.r_water, before.r_water);
    assert_eq!(map.seeds_t, before.seeds_t);
    assert_eq!(map.t_downslope_s, before.t_downslope_s);
    assert_eq!(map.order_t, before.order_t);
    assert_eq!(map.t_flow, before.t_flow);
    assert_eq!(map.s_flow, before.s_flow);

    // The kept forest still drains downhill over the kept elevation
    validate_forest(&mesh, &map.seeds_t, &map.t_downslope_s, &map.order_t).unwrap();
    for t in 0..mesh.num_triangles() {
        if let Downslope::PointsTo(s) = map.t_downslope_s[t] {
            let parent = mesh.s_outer_t(s);
            if map.t_elevation[parent] > 0.0 {
                assert!(map.t_elevation[parent] <= map.t_elevation[t]);
            }
        }
    }
}

#[test]
fn test_all_land_world_on_fresh_map_has_no_drainage_roots() {
    let mesh = DualMesh::jittered_grid(1000.0, 50.0, 0.4, 2).unwrap();
    let green = RgbImage::from_pixel(8, 8, Rgb([0, 220, 0]));
    let source = ElevationSource::mask(LandMask::from_image(DynamicImage::ImageRgb8(green)).unwrap());
    let ctx = GenerationContext::new(GenerationParams::default(), source);
    let mut map = TerrainMap::new(&mesh);

    let err = map.regenerate(&mesh, &ctx).unwrap_err();
    assert_eq!(err, GenerationError::Drainage(DrainageError::NoDrainageRoots));
    assert!(map.seeds_t.is_empty());
    assert!(map.t_elevation.iter().all(|&e| e == 0.0));
    assert!(map.t_downslope_s.iter().all(|d| *d == Downslope::Unvisited));
}
