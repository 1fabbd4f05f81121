use thiserror::Error;

/// Errors originating from the rendering pipeline.
///
/// Cancellation and timeouts are not errors; they are reported through
/// [`RenderOutcome::Cancelled`](crate::RenderOutcome::Cancelled).
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid colour stop: {0} is not a ratio in [0, 1]")]
    InvalidColourStop(f64),

    #[error("colour scheme needs at least 2 stops, got {0}")]
    TooFewColourStops(usize),

    #[error("unknown colour scheme: {0:?}")]
    UnknownScheme(String),

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to start render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("render worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("render service has stopped")]
    ServiceStopped,

    #[error("render service has no request configured")]
    NotConfigured,

    #[error(transparent)]
    Core(#[from] fractal_explorer_core::CoreError),
}
