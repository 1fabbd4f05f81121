pub mod cache;
pub mod colour;
pub mod error;
pub mod image;
pub mod renderer;
pub mod request;
pub mod service;
pub mod settings;
pub mod tile;

pub use cache::{RenderCache, RenderTicket};
pub use colour::{builtin_schemes, ColourScheme, ColourStop, Rgb};
pub use error::RenderError;
pub use image::Image;
pub use renderer::{CancelReason, RenderCancel, RenderOutcome, RenderResult, Renderer};
pub use request::{Fingerprint, RenderRequest};
pub use service::{RenderEvent, RenderId, RenderService};
pub use settings::RenderSettings;
pub use tile::{Partition, Tile, MAX_TILE_AREA, TILE_SIZE};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
