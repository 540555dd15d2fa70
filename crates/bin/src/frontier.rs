//! Frontier - headless canvas driver
//!
//! Runs the canvas core on a frame clock with simulated local and remote
//! painters, cycling the viewport through every render mode.

use std::sync::Arc;
use std::time::Duration;

use canvas::config::SimulationConfig;
use canvas::{
    Canvas, CanvasStore, Config, LocalCoord, MemoryStore, Pixel, RecordingSurface, SectorCoord, ViewportChange,
    WriteOrigin,
};
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Scales visited in turn, one per `FRAMES_PER_SCALE` frames.
const SCALE_TOUR: [f64; 4] = [4.0, 1.0, 0.25, 0.05];
const FRAMES_PER_SCALE: u64 = 120;
const REPORT_EVERY: u64 = 60;

/// Sectors around the origin that remote painters write into.
const REMOTE_RADIUS: i64 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Frontier - pixel canvas core v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load("frontier.toml")?;
    info!("Loaded configuration");
    info!(
        "  Expansion: threshold {} (min {} px)",
        config.sector.expansion_threshold, config.sector.min_expand_pixels
    );
    info!("  LOD cache: {} entries, {:?} encoding", config.lod.cache_capacity, config.lod.offload);
    info!(
        "  Canvas: {}x{} at scale {}",
        config.viewport.canvas_width, config.viewport.canvas_height, config.viewport.initial_scale
    );

    let store = Arc::new(Mutex::new(MemoryStore::new()));
    let mut canvas = Canvas::new(config.clone());
    let mut remote_rx = store.lock().await.subscribe();

    {
        let store = store.lock().await;
        canvas.load_sector_states(&*store);
        let rect = canvas.visible_bounds().sectors;
        let loaded = canvas.load_region(&*store, &rect);
        info!("Loaded {} stored pixels", loaded);
        info!("Warmed {} bytes of LOD data", canvas.warm_visible());
    }

    let painter = tokio::spawn(run_remote_painter(Arc::clone(&store), config.simulation.clone()));
    run_frame_loop(&mut canvas, &store, &mut remote_rx, &config.simulation).await;
    painter.abort();

    let registry = canvas.registry();
    let stats = canvas.lod().stats();
    info!(
        "Finished: {} active sectors, {} resident grids, LOD hits {} misses {} evictions {}",
        registry.active_len(),
        canvas.pixels().len(),
        stats.hits,
        stats.misses,
        stats.evictions
    );

    Ok(())
}

/// Drive the canvas at the configured frame rate.
async fn run_frame_loop(
    canvas: &mut Canvas,
    store: &Arc<Mutex<MemoryStore>>,
    remote_rx: &mut mpsc::UnboundedReceiver<Pixel>,
    sim: &SimulationConfig,
) {
    let period = Duration::from_millis(sim.frame_interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    // Dropped frames are skipped, not replayed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut rng = StdRng::seed_from_u64(sim.seed);
    let mut surface = RecordingSurface::new();
    let mut frame = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping after {} frames", frame);
                break;
            }
        }
        frame += 1;

        let remote = canvas.drain_remote(remote_rx);
        let local = paint_locally(canvas, store, &mut rng, sim.local_writes_per_frame).await;

        if frame % FRAMES_PER_SCALE == 1 {
            let scale = SCALE_TOUR[((frame / FRAMES_PER_SCALE) as usize) % SCALE_TOUR.len()];
            center_on_origin(canvas, scale);
        } else {
            let dx = rng.random_range(-2.0..=2.0);
            let dy = rng.random_range(-2.0..=2.0);
            if let Err(err) = canvas.apply_viewport_change(ViewportChange::Pan { dx, dy }) {
                debug!("Pan rejected: {}", err);
            }
        }
        if let Ok(expanded) = canvas.request_expansion_check(std::time::Instant::now()) {
            if expanded > 0 {
                debug!("Viewport check expanded {} sectors", expanded);
            }
        }

        let stats = canvas.render_frame(&mut surface);
        surface.take();

        if frame % REPORT_EVERY == 0 {
            info!(
                "Frame {}: {} mode, {} rects ({} culled){}, {} local + {} remote writes, {} active sectors, {} pending encodes, {} checks dropped",
                frame,
                stats.mode,
                stats.rects_drawn,
                stats.rects_culled,
                if stats.truncated { " truncated" } else { "" },
                local,
                remote,
                canvas.registry().active_len(),
                canvas.pending_encodes(),
                canvas.expansion_guard().dropped()
            );
        }

        if sim.frames != 0 && frame >= sim.frames {
            break;
        }
    }
}

/// Write random pixels into random active sectors and persist them.
async fn paint_locally(canvas: &mut Canvas, store: &Arc<Mutex<MemoryStore>>, rng: &mut StdRng, writes: u32) -> u32 {
    let active = canvas.registry().active_sectors();
    if active.is_empty() {
        return 0;
    }
    let colors = canvas.palette().len() as u8;

    let mut applied = 0;
    let mut store = store.lock().await;
    for _ in 0..writes {
        let sector = active[rng.random_range(0..active.len())];
        let Some(local) = LocalCoord::new(rng.random_range(0..256), rng.random_range(0..256)) else {
            continue;
        };
        let pixel = Pixel::new(sector, local, rng.random_range(1..colors.max(2)));
        match canvas.record_pixel_write(pixel, WriteOrigin::Local) {
            Ok(outcome) => {
                store.insert(pixel);
                applied += 1;
                if outcome.expanded {
                    debug!("Local write at {} opened new sectors", pixel.key());
                }
            }
            Err(err) => debug!("Local write rejected: {}", err),
        }
    }
    applied
}

fn center_on_origin(canvas: &mut Canvas, scale: f64) {
    let viewport = *canvas.viewport();
    let center = viewport.canvas_size() / 2.0;
    let offset = center - DVec2::splat(128.0) * scale * viewport.pixel_size;
    if canvas.apply_viewport_change(ViewportChange::Set { scale, offset }).is_ok() {
        info!("Viewport scale set to {}", scale);
    }
}

/// Remote clients painting around the origin, delivered through the store.
async fn run_remote_painter(store: Arc<Mutex<MemoryStore>>, sim: SimulationConfig) {
    let period = Duration::from_millis(sim.frame_interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rng = StdRng::seed_from_u64(sim.seed.wrapping_add(1));

    loop {
        ticker.tick().await;
        let mut store = store.lock().await;
        for _ in 0..sim.remote_writes_per_frame {
            let sector = SectorCoord::new(
                rng.random_range(-REMOTE_RADIUS..=REMOTE_RADIUS),
                rng.random_range(-REMOTE_RADIUS..=REMOTE_RADIUS),
            );
            let Some(local) = LocalCoord::new(rng.random_range(0..256), rng.random_range(0..256)) else {
                continue;
            };
            store.put_pixel(Pixel::new(sector, local, rng.random_range(1..16)));
        }
    }
}
