use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use fractal_explorer_core::{AlgorithmConfig, Complex, Viewport};

use crate::cache::{RenderCache, RenderTicket};
use crate::colour::ColourScheme;
use crate::error::RenderError;
use crate::image::Image;
use crate::renderer::{CancelReason, RenderCancel, RenderOutcome, Renderer};
use crate::request::RenderRequest;
use crate::settings::RenderSettings;

/// Identifies one submitted render. Ids increase monotonically per service.
pub type RenderId = u64;

/// Sent by the render thread when a submitted render settles.
#[derive(Debug)]
pub enum RenderEvent {
    /// The image is in the cache and available from [`RenderService::image`].
    Completed { id: RenderId, elapsed: Duration },
    Cancelled { id: RenderId, reason: CancelReason },
    Failed { id: RenderId, error: RenderError },
}

struct Job {
    id: RenderId,
    ticket: RenderTicket,
    /// Cancellation generation current when the job was submitted.
    generation: u64,
    request: RenderRequest,
}

/// Owns the active request, the render cache and one dedicated render thread.
///
/// At most one render is in flight: submitting cancels the previous render
/// first, the worker only picks up the newest queued job, and the cache
/// refuses images from superseded tickets.
pub struct RenderService {
    request: Option<RenderRequest>,
    cache: Arc<RenderCache>,
    cancel: Arc<RenderCancel>,
    tx: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    last_id: RenderId,
    settled_id: Arc<AtomicU64>,
}

impl RenderService {
    /// Start the render thread. Events arrive on the returned receiver.
    pub fn spawn(settings: RenderSettings) -> crate::Result<(Self, mpsc::Receiver<RenderEvent>)> {
        let renderer = Renderer::new(settings)?;
        let cache = Arc::new(RenderCache::new());
        let cancel = Arc::new(RenderCancel::new());
        let settled_id = Arc::new(AtomicU64::new(0));

        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::channel::<RenderEvent>();

        let worker = {
            let cache = Arc::clone(&cache);
            let cancel = Arc::clone(&cancel);
            let settled_id = Arc::clone(&settled_id);
            std::thread::Builder::new()
                .name("render-service".into())
                .spawn(move || {
                    render_worker(renderer, job_rx, event_tx, &cache, &cancel, &settled_id)
                })?
        };

        let service = Self {
            request: None,
            cache,
            cancel,
            tx: Some(job_tx),
            worker: Some(worker),
            last_id: 0,
            settled_id,
        };
        Ok((service, event_rx))
    }

    /// Replace the active request. Nothing is rendered until
    /// [`request_render`](Self::request_render) is called.
    pub fn configure(
        &mut self,
        algorithm: AlgorithmConfig,
        scheme: ColourScheme,
        viewport: Viewport,
        width: u32,
        height: u32,
    ) -> crate::Result<()> {
        self.request = Some(RenderRequest::new(algorithm, scheme, viewport, width, height)?);
        Ok(())
    }

    pub fn request(&self) -> Option<&RenderRequest> {
        self.request.as_ref()
    }

    /// Submit the active request if it differs from what was last rendered.
    ///
    /// Returns the id of the submitted render, or `None` when nothing needed
    /// rendering (or no request is configured).
    pub fn request_render(&mut self) -> Option<RenderId> {
        let request = self.request.as_ref()?;
        if !self.cache.is_dirty(request) {
            return None;
        }

        self.cancel.cancel();
        let generation = self.cancel.generation();
        let ticket = self.cache.begin_render();
        self.last_id += 1;
        let id = self.last_id;
        debug!(
            id,
            algorithm = request.algorithm.kind().name(),
            max_iter = request.algorithm.max_iterations(),
            width = request.width,
            height = request.height,
            "Requesting render"
        );

        let job = Job {
            id,
            ticket,
            generation,
            request: request.clone(),
        };
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            warn!(id, "Render thread is gone; request dropped");
            self.cache.abandon(ticket);
            self.settled_id.fetch_max(id, Ordering::SeqCst);
            return None;
        }
        Some(id)
    }

    /// Re-render the active request even if it has not changed.
    pub fn force_render(&mut self) -> Option<RenderId> {
        self.cache.invalidate();
        self.request_render()
    }

    /// Progress of the current render in percent.
    pub fn progress(&self) -> u8 {
        self.cancel.percent()
    }

    /// Abort the in-flight render, if any, including one that is still
    /// queued. The cached image is kept.
    pub fn cancel_current_render(&self) {
        self.cancel.cancel();
    }

    /// Complex-plane coordinate under pixel `(x, y)` of the active request.
    pub fn pixel_to_complex(&self, x: u32, y: u32) -> crate::Result<Complex> {
        let request = self.request.as_ref().ok_or(RenderError::NotConfigured)?;
        Ok(request.mapper()?.pixel_to_complex(x, y))
    }

    /// The last completed image.
    pub fn image(&self) -> Option<Arc<Image>> {
        self.cache.image()
    }

    /// Whether a submitted render has not yet settled.
    pub fn is_rendering(&self) -> bool {
        self.settled_id.load(Ordering::SeqCst) < self.last_id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.cancel.cancel();
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Render thread panicked");
            }
        }
    }
}

fn drain_latest(initial: Job, rx: &mpsc::Receiver<Job>) -> Job {
    let mut job = initial;
    while let Ok(newer) = rx.try_recv() {
        debug!(id = job.id, "Skipping superseded render request");
        job = newer;
    }
    job
}

fn render_worker(
    renderer: Renderer,
    rx: mpsc::Receiver<Job>,
    tx: mpsc::Sender<RenderEvent>,
    cache: &RenderCache,
    cancel: &RenderCancel,
    settled_id: &AtomicU64,
) {
    debug!("Render thread started");
    while let Ok(initial) = rx.recv() {
        let job = drain_latest(initial, &rx);
        let id = job.id;

        let event = match renderer.render_generation(&job.request, cancel, job.generation) {
            Ok(RenderOutcome::Finished(result)) => {
                let elapsed = result.elapsed;
                if cache.complete(job.ticket, result.image) {
                    Some(RenderEvent::Completed { id, elapsed })
                } else {
                    None
                }
            }
            Ok(RenderOutcome::Cancelled(reason)) => {
                cache.abandon(job.ticket);
                Some(RenderEvent::Cancelled { id, reason })
            }
            Err(error) => {
                warn!(id, %error, "Render failed");
                cache.abandon(job.ticket);
                Some(RenderEvent::Failed { id, error })
            }
        };

        settled_id.fetch_max(id, Ordering::SeqCst);
        if let Some(event) = event {
            let _ = tx.send(event);
        }
    }
    debug!("Render thread stopped");
}
