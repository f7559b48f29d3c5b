use std::path::PathBuf;

use clap::Parser;

use mapgen_rivers::constraints::{ElevationSource, LandMask};
use mapgen_rivers::export;
use mapgen_rivers::map::{GenerationContext, GenerationReport, TerrainMap};
use mapgen_rivers::mesh::{DualMesh, Mesh, WORLD_SIZE};
use mapgen_rivers::params::GenerationParams;
use mapgen_rivers::worker::MapWorker;

#[derive(Parser, Debug)]
#[command(name = "mapgen_rivers")]
#[command(about = "Generate terrain elevation and river drainage over a dual mesh")]
struct Args {
    /// Random seed (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Seed for the mesh jitter alone, keeping the terrain seeds derived from --seed
    #[arg(long)]
    mesh_seed: Option<u64>,

    /// Mesh point spacing in world units (overrides the config file)
    #[arg(long)]
    spacing: Option<f64>,

    /// JSON file with generation parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Land/water mask image replacing the noise coastline
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Triangulation JSON ({"points", "triangles", "halfedges"}) instead of a jittered grid
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Write a PNG preview
    #[arg(long)]
    png: Option<PathBuf>,

    /// Write a JSON snapshot of every generated array
    #[arg(long)]
    json: Option<PathBuf>,

    /// Preview size in pixels
    #[arg(long, default_value = "1024")]
    size: u32,

    /// Run the generation on the background worker
    #[arg(long)]
    threaded: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut params = match &args.config {
        Some(path) => GenerationParams::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => GenerationParams::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(seed) = args.mesh_seed {
        params.mesh_seed = Some(seed);
    }
    if let Some(spacing) = args.spacing {
        params.spacing = spacing;
    }
    if let Err(e) = params.validate() {
        eprintln!("Invalid parameters: {}", e);
        std::process::exit(1);
    }
    let seeds = params.world_seeds();
    println!("Generating map with {}", seeds);

    let source = match &args.mask {
        Some(path) => match LandMask::from_image_path(path) {
            Ok(mask) => {
                println!("Land mask: {:.1}% land", 100.0 * mask.land_fraction());
                ElevationSource::mask(mask)
            }
            Err(e) => {
                eprintln!("Failed to load mask {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ElevationSource::Noise,
    };

    let mesh = match &args.mesh {
        Some(path) => DualMesh::from_json_file(path),
        None => DualMesh::jittered_grid(WORLD_SIZE, params.spacing, params.jitter, seeds.mesh),
    };
    let mesh = mesh.unwrap_or_else(|e| {
        eprintln!("Failed to build mesh: {}", e);
        std::process::exit(1);
    });
    println!(
        "Mesh: {} regions, {} triangles ({} solid), {} sides",
        mesh.num_regions(),
        mesh.num_triangles(),
        mesh.num_solid_triangles(),
        mesh.num_sides()
    );

    // The worker owns its own copy of the mesh; exports read this one
    let (map, report) = if args.threaded {
        run_threaded(mesh.clone(), &params, source)
    } else {
        run_direct(&mesh, &params, source)
    };

    println!(
        "Land: {:.1}% of solid triangles, {} drainage roots",
        100.0 * map.land_fraction(&mesh),
        report.seeds
    );
    println!(
        "Rivers: {} triangles carry flow >= {} ({} parents lowered)",
        report.river_triangles, params.river_min_flow, report.repaired
    );
    println!("Generated in {:.3?} ({})", report.elapsed, report.phases);

    if let Some(path) = &args.png {
        match export::render_png(&mesh, &map, params.river_min_flow, args.size, path) {
            Ok(()) => println!("Saved preview to {}", path.display()),
            Err(e) => eprintln!("Failed to export preview: {}", e),
        }
    }
    if let Some(path) = &args.json {
        match export::write_snapshot(&mesh, &map, path) {
            Ok(()) => println!("Saved snapshot to {}", path.display()),
            Err(e) => eprintln!("Failed to export snapshot: {}", e),
        }
    }
}

fn run_direct(mesh: &DualMesh, params: &GenerationParams, source: ElevationSource) -> (TerrainMap, GenerationReport) {
    let ctx = GenerationContext::new(params.clone(), source);
    let mut map = TerrainMap::new(mesh);
    match map.regenerate(mesh, &ctx) {
        Ok(report) => (map, report),
        Err(e) => {
            eprintln!("Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_threaded(mesh: DualMesh, params: &GenerationParams, source: ElevationSource) -> (TerrainMap, GenerationReport) {
    let mut map = TerrainMap::new(&mesh);
    let mut host = MapWorker::spawn(mesh, source);
    if !host.request(params.clone()) {
        eprintln!("Map worker refused the request");
        std::process::exit(1);
    }
    let report = host.wait().unwrap_or_else(|e| {
        eprintln!("Generation failed: {}", e);
        std::process::exit(1);
    });
    if let Some(buffers) = host.buffers() {
        buffers.apply_to(&mut map);
    }
    (map, report)
}
