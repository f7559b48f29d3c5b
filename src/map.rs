//! Per-mesh terrain state and the regeneration entry point.
//!
//! A [`TerrainMap`] owns every array derived from one mesh. The arrays are
//! sized once in [`TerrainMap::new`] and overwritten in place on each
//! regeneration; nothing carries over between runs, so regenerating twice with
//! the same mesh and context gives bit-identical results.

use std::time::Duration;

use rayon::prelude::*;

use crate::constraints::ElevationSource;
use crate::drainage::{
    assign_flow, biased_search, trace_river_paths, Downslope, DrainageError, FlowSummary, RiverPath,
};
use crate::heightfield::HeightField;
use crate::mesh::Mesh;
use crate::params::GenerationParams;
use crate::seeds::WorldSeeds;
use crate::timing::{Phase, PhaseClock, PhaseTimings};

/// Everything one regeneration reads besides the mesh.
pub struct GenerationContext {
    pub params: GenerationParams,
    pub seeds: WorldSeeds,
    pub field: HeightField,
}

impl GenerationContext {
    pub fn new(params: GenerationParams, source: ElevationSource) -> Self {
        let seeds = params.world_seeds();
        let field = HeightField::from_seeds(&seeds, params.peak_spacing, source);
        log::debug!("generation context: {}, {} peaks", seeds, field.peaks().len());
        Self { params, seeds, field }
    }
}

/// Summary of a finished regeneration
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationReport {
    /// Sum of `phases`
    pub elapsed: Duration,
    pub phases: PhaseTimings,
    pub seeds: usize,
    pub land_triangles: usize,
    pub river_triangles: usize,
    pub discharge: f32,
    pub repaired: usize,
}

/// Elevation, water and drainage arrays for one mesh.
#[derive(Clone, Debug)]
pub struct TerrainMap {
    pub t_elevation: Vec<f32>,
    pub r_elevation: Vec<f32>,
    pub r_moisture: Vec<f32>,
    pub r_water: Vec<bool>,
    /// Mirrors `r_water`; telling lakes from ocean is left to a flood fill
    pub r_ocean: Vec<bool>,
    pub t_downslope_s: Vec<Downslope>,
    pub order_t: Vec<usize>,
    pub t_flow: Vec<f32>,
    pub s_flow: Vec<f32>,
    /// Low ghost triangles: the roots of the drainage forest
    pub seeds_t: Vec<usize>,
    // Written first and swapped in once routing succeeds
    scratch_elevation: Vec<f32>,
    scratch_seeds: Vec<usize>,
    scratch_downslope: Vec<Downslope>,
    scratch_order: Vec<usize>,
}

impl TerrainMap {
    pub fn new<M: Mesh>(mesh: &M) -> Self {
        let nt = mesh.num_triangles();
        let nr = mesh.num_regions();
        Self {
            t_elevation: vec![0.0; nt],
            r_elevation: vec![0.0; nr],
            r_moisture: vec![0.0; nr],
            r_water: vec![false; nr],
            r_ocean: vec![false; nr],
            t_downslope_s: vec![Downslope::Unvisited; nt],
            order_t: vec![0; nt],
            t_flow: vec![0.0; nt],
            s_flow: vec![0.0; mesh.num_sides()],
            seeds_t: Vec::new(),
            scratch_elevation: vec![0.0; nt],
            scratch_seeds: Vec::new(),
            scratch_downslope: vec![Downslope::Unvisited; nt],
            scratch_order: vec![0; nt],
        }
    }

    /// Run elevation and river assignment once.
    ///
    /// Nothing visible changes unless the whole run succeeds: triangle
    /// elevation, seeds and the forest are built in scratch arrays and only
    /// swapped in after the search finds a complete forest.
    pub fn regenerate<M: Mesh + Sync>(
        &mut self,
        mesh: &M,
        ctx: &GenerationContext,
    ) -> Result<GenerationReport, GenerationError> {
        self.check_mesh(mesh)?;
        let mut clock = PhaseClock::start();

        sample_triangles(mesh, &ctx.field, &mut self.scratch_elevation, &mut self.scratch_seeds);
        clock.lap(Phase::Elevation);

        biased_search(
            mesh,
            &self.scratch_seeds,
            &self.scratch_elevation,
            &mut self.scratch_downslope,
            &mut self.scratch_order,
        )?;
        clock.lap(Phase::Routing);

        std::mem::swap(&mut self.t_elevation, &mut self.scratch_elevation);
        std::mem::swap(&mut self.seeds_t, &mut self.scratch_seeds);
        std::mem::swap(&mut self.t_downslope_s, &mut self.scratch_downslope);
        std::mem::swap(&mut self.order_t, &mut self.scratch_order);

        // Regions read the sampled elevation, before flow lowers any parent
        self.assign_region_elevation(mesh, ctx.params.water_epsilon, ctx.params.moisture_base);
        clock.lap(Phase::Regions);

        let flow = self.accumulate_flow(mesh)?;
        clock.lap(Phase::Flow);

        let phases = clock.finish();
        let report = GenerationReport {
            elapsed: phases.total(),
            phases,
            seeds: self.seeds_t.len(),
            land_triangles: flow.land_triangles,
            river_triangles: self.river_triangle_count(mesh, ctx.params.river_min_flow),
            discharge: flow.discharge,
            repaired: flow.repaired,
        };
        log::info!(
            "{} seeds, {} land, {} river triangles in {:.3?} ({})",
            report.seeds,
            report.land_triangles,
            report.river_triangles,
            report.elapsed,
            report.phases
        );
        Ok(report)
    }

    /// Evaluate the height field on every triangle, then derive region values.
    pub fn assign_elevation<M: Mesh + Sync>(&mut self, mesh: &M, ctx: &GenerationContext) {
        self.assign_triangle_elevation(mesh, &ctx.field);
        self.assign_region_elevation(mesh, ctx.params.water_epsilon, ctx.params.moisture_base);
    }

    /// Triangle elevations and the seed set (ghost triangles below sea level).
    pub fn assign_triangle_elevation<M: Mesh + Sync>(&mut self, mesh: &M, field: &HeightField) {
        sample_triangles(mesh, field, &mut self.t_elevation, &mut self.seeds_t);
    }

    /// Region elevation is the mean of its triangles, except that a region
    /// touching any underwater triangle is never dry: a non-negative mean is
    /// replaced by `water_epsilon`.
    pub fn assign_region_elevation<M: Mesh>(&mut self, mesh: &M, water_epsilon: f32, moisture_base: f32) {
        let mut out_t = Vec::new();
        for r in 0..mesh.num_regions() {
            mesh.r_circulate_t(&mut out_t, r);
            let mut e = 0.0f32;
            let mut water = false;
            for &t in &out_t {
                e += self.t_elevation[t];
                water = water || self.t_elevation[t] < 0.0;
            }
            if !out_t.is_empty() {
                e /= out_t.len() as f32;
            }
            if water && e >= 0.0 {
                e = water_epsilon;
            }
            self.r_elevation[r] = e;
            self.r_moisture[r] = moisture_base - e.abs().sqrt();
            self.r_water[r] = e < 0.0;
            self.r_ocean[r] = e < 0.0;
        }
    }

    /// Build the drainage forest from the current elevation and seeds, then
    /// accumulate flow. On error the previous forest and flow arrays are left
    /// untouched.
    pub fn assign_rivers<M: Mesh>(&mut self, mesh: &M) -> Result<FlowSummary, DrainageError> {
        biased_search(
            mesh,
            &self.seeds_t,
            &self.t_elevation,
            &mut self.scratch_downslope,
            &mut self.scratch_order,
        )?;
        std::mem::swap(&mut self.t_downslope_s, &mut self.scratch_downslope);
        std::mem::swap(&mut self.order_t, &mut self.scratch_order);
        self.accumulate_flow(mesh)
    }

    fn accumulate_flow<M: Mesh>(&mut self, mesh: &M) -> Result<FlowSummary, DrainageError> {
        assign_flow(
            mesh,
            &self.order_t,
            &mut self.t_elevation,
            &self.t_downslope_s,
            &mut self.t_flow,
            &mut self.s_flow,
        )
    }

    /// Solid land triangles whose outgoing side carries at least `min_flow`.
    pub fn river_triangle_count<M: Mesh>(&self, mesh: &M, min_flow: f32) -> usize {
        (0..mesh.num_solid_triangles())
            .filter(|&t| self.t_elevation[t] > 0.0)
            .filter(|&t| self.t_downslope_s[t].side().is_some_and(|s| self.s_flow[s] >= min_flow))
            .count()
    }

    pub fn river_paths<M: Mesh>(&self, mesh: &M, min_flow: f32) -> Vec<RiverPath> {
        trace_river_paths(mesh, &self.t_downslope_s, &self.t_elevation, &self.s_flow, min_flow)
    }

    /// Share of solid triangles above sea level.
    pub fn land_fraction<M: Mesh>(&self, mesh: &M) -> f64 {
        let solid = mesh.num_solid_triangles();
        let land = self.t_elevation[..solid].iter().filter(|&&e| e > 0.0).count();
        land as f64 / solid.max(1) as f64
    }

    /// Every array `regenerate` writes after the commit point must fit `mesh`.
    fn check_mesh<M: Mesh>(&self, mesh: &M) -> Result<(), DrainageError> {
        use crate::drainage::check_len;
        let (nt, nr) = (mesh.num_triangles(), mesh.num_regions());
        check_len("t_elevation", nt, self.t_elevation.len())?;
        check_len("t_downslope_s", nt, self.t_downslope_s.len())?;
        check_len("order_t", nt, self.order_t.len())?;
        check_len("t_flow", nt, self.t_flow.len())?;
        check_len("r_elevation", nr, self.r_elevation.len())?;
        check_len("r_moisture", nr, self.r_moisture.len())?;
        check_len("r_water", nr, self.r_water.len())?;
        check_len("r_ocean", nr, self.r_ocean.len())?;
        check_len("s_flow", mesh.num_sides(), self.s_flow.len())
    }
}

/// Sample `field` at every triangle centroid into `elevation` and collect
/// the ghost triangles below sea level into `seeds`.
fn sample_triangles<M: Mesh + Sync>(mesh: &M, field: &HeightField, elevation: &mut [f32], seeds: &mut Vec<usize>) {
    elevation.par_iter_mut().enumerate().for_each(|(t, e)| {
        let (x, y) = mesh.t_centroid(t);
        *e = field.elevation(x, y) as f32;
    });

    seeds.clear();
    seeds.extend((0..elevation.len()).filter(|&t| elevation[t] < 0.0 && mesh.t_ghost(t)));
}

/// Errors that abandon a regeneration
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationError {
    Drainage(DrainageError),
    /// The background worker has shut down
    WorkerGone,
    /// `wait` was called with no request outstanding
    NothingInFlight,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Drainage(e) => write!(f, "drainage failed: {}", e),
            GenerationError::WorkerGone => write!(f, "map worker is no longer running"),
            GenerationError::NothingInFlight => write!(f, "no generation request is in flight"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Drainage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DrainageError> for GenerationError {
    fn from(e: DrainageError) -> Self {
        GenerationError::Drainage(e)
    }
}
