use thiserror::Error;

/// Errors originating from the core fractal engine.
///
/// All of these are configuration errors: they are raised when a value is
/// constructed, never from inside the iteration loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid escape radius: {0} (must be > 0.0)")]
    InvalidEscapeRadius(f64),

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },

    #[error("invalid output dimensions: {width}×{height} (surface not sized yet?)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("unknown formula: {0:?}")]
    UnknownFormula(String),
}
