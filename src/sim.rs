use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strata_geom::Vec3;
use strata_mesh::MeshData;
use strata_runtime::Runtime;
use strata_stream::{ChunkSink, ChunkStreamingManager, ChunkTicket};
use strata_world::{ChunkCoord, GenSettings, MapData, StrataConfig, TerrainGenerator};

use crate::cli::StreamArgs;
use crate::watch::ConfigReloader;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Headless sink: tallies what a renderer would have been asked to do.
#[derive(Default, Debug)]
pub struct CountingSink {
    pub placed: usize,
    pub meshes: usize,
    pub colliders: usize,
    pub textures: usize,
    pub removed: usize,
    pub vertices: usize,
    pub height_range: Option<(f32, f32)>,
}

impl ChunkSink for CountingSink {
    fn place_chunk(&mut self, _coord: ChunkCoord, _origin: Vec3, _scale: f32) {
        self.placed += 1;
    }

    fn set_height_range(&mut self, min: f32, max: f32) {
        self.height_range = Some((min, max));
    }

    fn install_mesh(&mut self, coord: ChunkCoord, lod_index: usize, mesh: &Arc<MeshData>) {
        self.meshes += 1;
        self.vertices += mesh.vertex_count();
        log::trace!("chunk {:?} shows lod index {}", coord, lod_index);
    }

    fn install_collider(&mut self, _coord: ChunkCoord, _mesh: &Arc<MeshData>) {
        self.colliders += 1;
    }

    fn install_texture(&mut self, _coord: ChunkCoord, _map: &Arc<MapData>) {
        self.textures += 1;
    }

    fn remove_chunk(&mut self, _coord: ChunkCoord) {
        self.removed += 1;
    }
}

type Stream = ChunkStreamingManager<Runtime<ChunkTicket>, CountingSink>;

fn report(stream: &Stream, tick: u32) {
    let s = stream.stats();
    let (qm, im, qs, is) = stream.dispatch().queue_debug_counts();
    log::info!(
        "tick {}: {} chunks, {} visible, maps {} meshes {}, queued {}/{} running {}/{}, stale {}, failed {}",
        tick,
        s.chunks,
        s.visible,
        s.maps_requested,
        s.meshes_requested,
        qm,
        qs,
        im,
        is,
        s.stale_dropped,
        s.mesh_failures
    );
}

/// Moves a viewer along +x for `args.ticks` updates, then waits for the pool to drain.
pub fn run(
    config: StrataConfig,
    generator: Arc<TerrainGenerator>,
    args: &StreamArgs,
    mut reloader: Option<ConfigReloader>,
) -> Result<(), Box<dyn Error>> {
    let workers = args.workers.unwrap_or(config.streaming.workers);
    let runtime = Runtime::new(Arc::clone(&generator), workers)?;
    let mut stream = ChunkStreamingManager::new(
        Arc::clone(&generator),
        &config.streaming,
        runtime,
        CountingSink::default(),
    )?;
    let events = reloader.as_ref().map(|r| r.notifier().subscribe());

    let tick_time = Duration::from_millis(args.tick_ms);
    let every = args.report_every.max(1);
    let mut viewer = Vec3::ZERO;
    for tick in 0..args.ticks {
        if let Some(r) = reloader.as_mut() {
            r.poll();
        }
        if let (Some(rx), Some(r)) = (events.as_ref(), reloader.as_ref()) {
            if rx.try_iter().count() > 0 {
                let cfg = r.config();
                let settings = GenSettings::from_config(cfg);
                if let Err(e) = stream.apply_settings(settings, &cfg.streaming) {
                    log::error!("new streaming config rejected: {}", e);
                }
            }
        }

        stream.tick(viewer);
        viewer.x += args.speed;
        if tick % every == 0 {
            report(&stream, tick);
        }
        thread::sleep(tick_time);
    }

    let start = Instant::now();
    while !stream.dispatch().is_idle() && start.elapsed() < SETTLE_TIMEOUT {
        stream.tick(viewer);
        thread::sleep(tick_time);
    }
    stream.tick(viewer);
    report(&stream, args.ticks);
    let sink = stream.sink();
    if let Some((lo, hi)) = sink.height_range {
        log::info!("mesh heights span {:.1}..{:.1}", lo, hi);
    }
    log::info!(
        "done: {} placed, {} meshes ({} vertices), {} colliders, {} textures, {} removed",
        sink.placed,
        sink.meshes,
        sink.vertices,
        sink.colliders,
        sink.textures,
        sink.removed
    );
    Ok(())
}
