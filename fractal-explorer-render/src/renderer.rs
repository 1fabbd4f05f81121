use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use fractal_explorer_core::CoordinateMapper;

use crate::error::RenderError;
use crate::image::Image;
use crate::request::RenderRequest;
use crate::settings::RenderSettings;
use crate::tile::Tile;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Tracks the current render generation for cancellation and progress.
///
/// Incrementing the generation signals all in-flight tiles to stop early.
/// The progress counters let callers display a progress bar.
#[derive(Debug)]
pub struct RenderCancel {
    generation: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Cancel the current render by advancing the generation.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Read the current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Reset progress for a new render with `total` tiles.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    /// Increment completed tiles by one.
    pub fn inc_progress(&self) {
        self.progress_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current progress as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }

    /// Completed share of the current render, `0..=100`.
    pub fn percent(&self) -> u8 {
        let (done, total) = self.progress();
        if total == 0 {
            return 0;
        }
        (done.min(total) * 100 / total) as u8
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Why a render stopped before producing an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// [`RenderCancel::cancel`] was called while tiles were in flight.
    Requested,
    /// The render ran past [`RenderSettings::timeout_ms`].
    TimedOut,
}

/// A completed full-frame render.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: Image,
    pub elapsed: Duration,
    pub tiles: usize,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Finished(RenderResult),
    Cancelled(CancelReason),
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Tiled, multithreaded renderer backed by its own bounded Rayon pool.
#[derive(Debug)]
pub struct Renderer {
    pool: rayon::ThreadPool,
    settings: RenderSettings,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> crate::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.worker_count())
            .thread_name(|i| format!("render-{i}"))
            .build()?;
        debug!(workers = pool.current_num_threads(), "Render pool ready");
        Ok(Self { pool, settings })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render a full frame.
    ///
    /// Tiles are computed in parallel into tile-local buffers and only
    /// assembled once every tile has finished, so a cancelled or timed-out
    /// render never yields a partial image. The `cancel` handle can be used
    /// from another thread to abort the render.
    pub fn render(
        &self,
        request: &RenderRequest,
        cancel: &RenderCancel,
    ) -> crate::Result<RenderOutcome> {
        self.render_generation(request, cancel, cancel.generation())
    }

    /// Render a full frame on behalf of cancellation generation `gen`.
    ///
    /// If `cancel` has already moved past `gen` (the render was cancelled
    /// after being queued) no pixels are computed and the outcome is
    /// [`CancelReason::Requested`].
    pub fn render_generation(
        &self,
        request: &RenderRequest,
        cancel: &RenderCancel,
        gen: u64,
    ) -> crate::Result<RenderOutcome> {
        let start = Instant::now();
        let deadline = self.settings.timeout().map(|t| start + t);
        let mapper = request.mapper()?;

        let tiles = self.settings.partition.tiles(request.width, request.height);
        let tile_count = tiles.len();
        debug!(
            tile_count,
            width = request.width,
            height = request.height,
            algorithm = request.algorithm.kind().name(),
            "Starting tiled render"
        );
        cancel.reset_progress(tile_count);

        let should_stop = || {
            cancel.generation() != gen || deadline.is_some_and(|d| Instant::now() >= d)
        };

        if cancel.generation() != gen {
            debug!(gen, "Render cancelled before it started");
            return Ok(RenderOutcome::Cancelled(CancelReason::Requested));
        }

        let tile_data = self.run_tiles(&tiles, |tile| {
            let data = render_tile(request, &mapper, tile, &should_stop)?;
            cancel.inc_progress();
            Some(data)
        })?;

        if cancel.generation() != gen {
            debug!(elapsed_ms = start.elapsed().as_millis(), "Render cancelled");
            return Ok(RenderOutcome::Cancelled(CancelReason::Requested));
        }
        if tile_data.iter().any(Option::is_none) {
            warn!(
                timeout_ms = self.settings.timeout_ms,
                done = cancel.progress().0,
                tile_count,
                "Render timed out"
            );
            return Ok(RenderOutcome::Cancelled(CancelReason::TimedOut));
        }

        let mut image = Image::new(request.width, request.height);
        for (tile, data) in tiles.iter().zip(tile_data.iter().flatten()) {
            image.blit_tile(tile, data);
        }

        let elapsed = start.elapsed();
        info!(elapsed_ms = elapsed.as_millis(), tile_count, "Render complete");
        Ok(RenderOutcome::Finished(RenderResult {
            image,
            elapsed,
            tiles: tile_count,
        }))
    }

    /// Run `f` over every tile on the pool. A panic in any worker becomes
    /// [`RenderError::WorkerPanicked`].
    fn run_tiles<F>(&self, tiles: &[Tile], f: F) -> crate::Result<Vec<Option<Vec<u8>>>>
    where
        F: Fn(&Tile) -> Option<Vec<u8>> + Sync,
    {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool
                .install(|| tiles.par_iter().map(&f).collect::<Vec<_>>())
        }))
        .map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(%message, "Render worker panicked");
            RenderError::WorkerPanicked(message)
        })
    }
}

/// Pixels computed between two polls of the stop condition.
const STOP_CHECK_INTERVAL: u32 = 16;

/// Compute one tile's RGBA pixels, or `None` if the render was stopped.
fn render_tile(
    request: &RenderRequest,
    mapper: &CoordinateMapper,
    tile: &Tile,
    should_stop: &impl Fn() -> bool,
) -> Option<Vec<u8>> {
    let mut data = Vec::with_capacity(tile.pixel_count() * 4);
    for py in tile.y..tile.y + tile.height {
        for px in tile.x..tile.x + tile.width {
            if (px - tile.x) % STOP_CHECK_INTERVAL == 0 && should_stop() {
                return None;
            }
            let ratio = request.algorithm.evaluate(mapper.pixel_to_complex(px, py));
            data.extend_from_slice(&request.scheme.calculate_colour(ratio).to_rgba());
        }
    }
    Some(data)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
