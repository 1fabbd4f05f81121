pub mod algorithm;
pub mod complex;
pub mod error;
pub mod viewport;

// Re-export primary types for convenience.
pub use algorithm::{AlgorithmConfig, AlgorithmKind, Escape, Formula};
pub use complex::Complex;
pub use error::CoreError;
pub use viewport::{CoordinateMapper, Viewport};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
