use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use strata_geom::Vec2;
use strata_world::{GenSettings, MapData, TerrainGenerator};

use crate::dispatch::{Dispatch, MeshResult, run_map_job, run_mesh_job};
use crate::queue::{PendingResult, ResultQueue};

struct MapJob<K> {
    key: K,
    center: Vec2,
    settings: Arc<GenSettings>,
}

struct MeshJob<K> {
    key: K,
    map: Arc<MapData>,
    lod: u32,
    settings: Arc<GenSettings>,
}

#[derive(Debug)]
pub enum RuntimeError {
    Pool(ThreadPoolBuildError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Pool(e) => write!(f, "worker pool failed to start: {}", e),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Pool(e) => Some(e),
        }
    }
}

impl From<ThreadPoolBuildError> for RuntimeError {
    fn from(e: ThreadPoolBuildError) -> Self {
        RuntimeError::Pool(e)
    }
}

#[derive(Clone)]
struct Counters {
    q_map: Arc<AtomicUsize>,
    q_mesh: Arc<AtomicUsize>,
    inflight_map: Arc<AtomicUsize>,
    inflight_mesh: Arc<AtomicUsize>,
}

impl Counters {
    fn new() -> Self {
        Self {
            q_map: Arc::new(AtomicUsize::new(0)),
            q_mesh: Arc::new(AtomicUsize::new(0)),
            inflight_map: Arc::new(AtomicUsize::new(0)),
            inflight_mesh: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Fixed-size worker pool serving a map lane and a mesh lane.
///
/// Each request captures the generator snapshot current at submission. Dropping
/// the runtime closes both lanes; workers finish the job in hand and exit.
pub struct Runtime<K> {
    map_tx: Sender<MapJob<K>>,
    mesh_tx: Sender<MeshJob<K>>,
    generator: Arc<TerrainGenerator>,
    maps: Arc<ResultQueue<K, Arc<MapData>>>,
    meshes: Arc<ResultQueue<K, MeshResult>>,
    counters: Counters,
    _pool: ThreadPool,
    workers: usize,
}

fn worker_loop<K>(
    map_rx: Receiver<MapJob<K>>,
    mesh_rx: Receiver<MeshJob<K>>,
    generator: Arc<TerrainGenerator>,
    maps: Arc<ResultQueue<K, Arc<MapData>>>,
    meshes: Arc<ResultQueue<K, MeshResult>>,
    counters: Counters,
) {
    loop {
        select! {
            recv(map_rx) -> res => match res {
                Ok(job) => {
                    counters.inflight_map.fetch_add(1, Ordering::SeqCst);
                    counters.q_map.fetch_sub(1, Ordering::SeqCst);
                    let map = run_map_job(&generator, &job.settings, job.center);
                    maps.push(job.key, map);
                    counters.inflight_map.fetch_sub(1, Ordering::SeqCst);
                }
                Err(_) => break,
            },
            recv(mesh_rx) -> res => match res {
                Ok(job) => {
                    counters.inflight_mesh.fetch_add(1, Ordering::SeqCst);
                    counters.q_mesh.fetch_sub(1, Ordering::SeqCst);
                    let mesh = run_mesh_job(&job.settings, &job.map, job.lod);
                    meshes.push(job.key, mesh);
                    counters.inflight_mesh.fetch_sub(1, Ordering::SeqCst);
                }
                Err(_) => break,
            },
        }
    }
}

impl<K: Send + 'static> Runtime<K> {
    /// `workers == 0` sizes the pool from available parallelism.
    pub fn new(generator: Arc<TerrainGenerator>, workers: usize) -> Result<Self, RuntimeError> {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let (map_tx, map_rx) = unbounded::<MapJob<K>>();
        let (mesh_tx, mesh_rx) = unbounded::<MeshJob<K>>();
        let maps = Arc::new(ResultQueue::new());
        let meshes = Arc::new(ResultQueue::new());
        let counters = Counters::new();

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("strata-gen-{i}"))
            .build()?;
        for _ in 0..workers {
            let map_rx = map_rx.clone();
            let mesh_rx = mesh_rx.clone();
            let generator = Arc::clone(&generator);
            let maps = Arc::clone(&maps);
            let meshes = Arc::clone(&meshes);
            let counters = counters.clone();
            pool.spawn(move || worker_loop(map_rx, mesh_rx, generator, maps, meshes, counters));
        }
        log::info!("generation pool started with {} worker(s)", workers);

        Ok(Self {
            map_tx,
            mesh_tx,
            generator,
            maps,
            meshes,
            counters,
            _pool: pool,
            workers,
        })
    }

    #[inline]
    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    /// Worker threads actually started, after resolving `0`.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `(queued maps, running maps, queued meshes, running meshes)`.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.counters.q_map.load(Ordering::SeqCst),
            self.counters.inflight_map.load(Ordering::SeqCst),
            self.counters.q_mesh.load(Ordering::SeqCst),
            self.counters.inflight_mesh.load(Ordering::SeqCst),
        )
    }

    /// Nothing queued, nothing running, and nothing waiting to be drained.
    pub fn is_idle(&self) -> bool {
        let (qm, im, qs, is) = self.queue_debug_counts();
        qm + im + qs + is == 0 && self.maps.is_empty() && self.meshes.is_empty()
    }
}

impl<K: Send + 'static> Dispatch<K> for Runtime<K> {
    fn request_map(&self, key: K, center: Vec2) {
        let job = MapJob {
            key,
            center,
            settings: self.generator.snapshot(),
        };
        self.counters.q_map.fetch_add(1, Ordering::SeqCst);
        if self.map_tx.send(job).is_err() {
            self.counters.q_map.fetch_sub(1, Ordering::SeqCst);
        }
        log::trace!("map requested at ({}, {})", center.x, center.y);
    }

    fn request_mesh(&self, key: K, map: Arc<MapData>, lod: u32) {
        let job = MeshJob {
            key,
            map,
            lod,
            settings: self.generator.snapshot(),
        };
        self.counters.q_mesh.fetch_add(1, Ordering::SeqCst);
        if self.mesh_tx.send(job).is_err() {
            self.counters.q_mesh.fetch_sub(1, Ordering::SeqCst);
        }
        log::trace!("mesh requested at lod {}", lod);
    }

    fn drain_maps(&self) -> Vec<PendingResult<K, Arc<MapData>>> {
        self.maps.drain()
    }

    fn drain_meshes(&self) -> Vec<PendingResult<K, MeshResult>> {
        self.meshes.drain()
    }
}
