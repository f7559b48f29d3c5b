//! Background regeneration with a single request slot.
//!
//! The worker thread owns the mesh and a [`TerrainMap`]. The host owns one set
//! of [`OutputBuffers`] and lends it to the worker with each request; the
//! buffers travel back inside the response. While a request is in flight the
//! host holds no buffers, and further requests are dropped rather than queued.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::constraints::ElevationSource;
use crate::drainage::Downslope;
use crate::map::{GenerationContext, GenerationError, GenerationReport, TerrainMap};
use crate::mesh::Mesh;
use crate::params::GenerationParams;

/// The arrays a renderer reads after each regeneration.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputBuffers {
    pub t_elevation: Vec<f32>,
    pub r_elevation: Vec<f32>,
    pub r_moisture: Vec<f32>,
    pub t_flow: Vec<f32>,
    pub s_flow: Vec<f32>,
    pub t_downslope_s: Vec<Downslope>,
    pub order_t: Vec<usize>,
    pub seeds_t: Vec<usize>,
}

impl OutputBuffers {
    pub fn for_mesh<M: Mesh>(mesh: &M) -> Self {
        let nt = mesh.num_triangles();
        let nr = mesh.num_regions();
        Self {
            t_elevation: vec![0.0; nt],
            r_elevation: vec![0.0; nr],
            r_moisture: vec![0.0; nr],
            t_flow: vec![0.0; nt],
            s_flow: vec![0.0; mesh.num_sides()],
            t_downslope_s: vec![Downslope::Unvisited; nt],
            order_t: vec![0; nt],
            seeds_t: Vec::new(),
        }
    }

    /// Overwrite with the current map contents, reusing the allocations.
    pub fn copy_from(&mut self, map: &TerrainMap) {
        self.t_elevation.clone_from(&map.t_elevation);
        self.r_elevation.clone_from(&map.r_elevation);
        self.r_moisture.clone_from(&map.r_moisture);
        self.t_flow.clone_from(&map.t_flow);
        self.s_flow.clone_from(&map.s_flow);
        self.t_downslope_s.clone_from(&map.t_downslope_s);
        self.order_t.clone_from(&map.order_t);
        self.seeds_t.clone_from(&map.seeds_t);
    }

    /// Load these results into a host-side map, deriving the water flags.
    pub fn apply_to(&self, map: &mut TerrainMap) {
        map.t_elevation.clone_from(&self.t_elevation);
        map.r_elevation.clone_from(&self.r_elevation);
        map.r_moisture.clone_from(&self.r_moisture);
        map.t_flow.clone_from(&self.t_flow);
        map.s_flow.clone_from(&self.s_flow);
        map.t_downslope_s.clone_from(&self.t_downslope_s);
        map.order_t.clone_from(&self.order_t);
        map.seeds_t.clone_from(&self.seeds_t);
        map.r_water = self.r_elevation.iter().map(|&e| e < 0.0).collect();
        map.r_ocean.clone_from(&map.r_water);
    }
}

pub struct GenerationRequest {
    pub params: GenerationParams,
    pub buffers: OutputBuffers,
}

pub struct GenerationResponse {
    pub outcome: Result<GenerationReport, GenerationError>,
    /// Filled on success, returned as sent on failure
    pub buffers: OutputBuffers,
}

impl GenerationResponse {
    pub fn elapsed(&self) -> Option<Duration> {
        self.outcome.as_ref().ok().map(|r| r.elapsed)
    }

    pub fn river_triangles(&self) -> Option<usize> {
        self.outcome.as_ref().ok().map(|r| r.river_triangles)
    }
}

/// State living on the worker thread.
pub struct MapWorker<M: Mesh> {
    mesh: M,
    map: TerrainMap,
    source: ElevationSource,
    context: Option<GenerationContext>,
}

impl<M: Mesh + Send + Sync + 'static> MapWorker<M> {
    /// Move `mesh` onto a new worker thread and return the host side.
    pub fn spawn(mesh: M, source: ElevationSource) -> MapHost {
        let buffers = OutputBuffers::for_mesh(&mesh);
        let (request_tx, request_rx) = mpsc::sync_channel::<GenerationRequest>(1);
        let (response_tx, response_rx) = mpsc::channel::<GenerationResponse>();

        let worker = MapWorker {
            map: TerrainMap::new(&mesh),
            mesh,
            source,
            context: None,
        };
        let handle = std::thread::spawn(move || worker.run(request_rx, response_tx));

        MapHost {
            requests: Some(request_tx),
            responses: response_rx,
            buffers: Some(buffers),
            working: false,
            handle: Some(handle),
        }
    }

    fn run(mut self, requests: Receiver<GenerationRequest>, responses: mpsc::Sender<GenerationResponse>) {
        log::debug!("map worker started");
        while let Ok(GenerationRequest { params, mut buffers }) = requests.recv() {
            let outcome = self.generate(params);
            if outcome.is_ok() {
                buffers.copy_from(&self.map);
            }
            if responses.send(GenerationResponse { outcome, buffers }).is_err() {
                break;
            }
        }
        log::debug!("map worker stopped");
    }

    fn generate(&mut self, params: GenerationParams) -> Result<GenerationReport, GenerationError> {
        // The peak lattice only depends on the params, so keep it while they hold
        if self.context.as_ref().is_some_and(|ctx| ctx.params != params) {
            self.context = None;
        }
        let source = &self.source;
        let ctx = self
            .context
            .get_or_insert_with(|| GenerationContext::new(params, source.clone()));
        self.map.regenerate(&self.mesh, ctx)
    }
}

/// Host side of the worker: one request in flight at most.
pub struct MapHost {
    requests: Option<SyncSender<GenerationRequest>>,
    responses: Receiver<GenerationResponse>,
    buffers: Option<OutputBuffers>,
    working: bool,
    handle: Option<JoinHandle<()>>,
}

impl MapHost {
    /// Start a regeneration. Returns `false` and drops the request if one is
    /// already in flight.
    pub fn request(&mut self, params: GenerationParams) -> bool {
        if self.working {
            log::debug!("generation in flight, request dropped");
            return false;
        }
        let Some(sender) = &self.requests else {
            return false;
        };
        let Some(buffers) = self.buffers.take() else {
            return false;
        };
        match sender.try_send(GenerationRequest { params, buffers }) {
            Ok(()) => {
                self.working = true;
                true
            }
            Err(TrySendError::Full(request)) | Err(TrySendError::Disconnected(request)) => {
                self.buffers = Some(request.buffers);
                false
            }
        }
    }

    /// Take the response if it has arrived.
    pub fn poll(&mut self) -> Option<Result<GenerationReport, GenerationError>> {
        if !self.working {
            return None;
        }
        match self.responses.try_recv() {
            Ok(response) => Some(self.land(response)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.working = false;
                Some(Err(GenerationError::WorkerGone))
            }
        }
    }

    /// Block until the in-flight request finishes.
    pub fn wait(&mut self) -> Result<GenerationReport, GenerationError> {
        if !self.working {
            return Err(GenerationError::NothingInFlight);
        }
        match self.responses.recv() {
            Ok(response) => self.land(response),
            Err(_) => {
                self.working = false;
                Err(GenerationError::WorkerGone)
            }
        }
    }

    pub fn is_working(&self) -> bool {
        self.working
    }

    /// Latest results; `None` while the worker holds the buffers.
    pub fn buffers(&self) -> Option<&OutputBuffers> {
        self.buffers.as_ref()
    }

    fn land(&mut self, response: GenerationResponse) -> Result<GenerationReport, GenerationError> {
        self.working = false;
        self.buffers = Some(response.buffers);
        if let Err(e) = &response.outcome {
            log::warn!("generation abandoned, keeping previous map: {}", e);
        }
        response.outcome
    }
}

impl Drop for MapHost {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("map worker panicked");
            }
        }
    }
}
