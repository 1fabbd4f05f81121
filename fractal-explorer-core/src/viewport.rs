use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;

/// The rectangular region of the complex plane mapped onto the output image.
///
/// Bounds are expected to satisfy `min < max` on both axes. [`Viewport::new`]
/// checks this; code that edits the public fields directly is responsible
/// for keeping them ordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub real_min: f64,
    pub real_max: f64,
    pub imaginary_min: f64,
    pub imaginary_max: f64,
}

impl Viewport {
    pub const DEFAULT_REAL_MIN: f64 = -2.0;
    pub const DEFAULT_REAL_MAX: f64 = 2.0;
    pub const DEFAULT_IMAGINARY_MIN: f64 = -1.6;
    pub const DEFAULT_IMAGINARY_MAX: f64 = 1.6;

    /// Create a viewport with explicit bounds.
    pub fn new(
        real_min: f64,
        real_max: f64,
        imaginary_min: f64,
        imaginary_max: f64,
    ) -> crate::Result<Self> {
        if let Some(reason) = bounds_error(real_min, real_max, imaginary_min, imaginary_max) {
            debug!(%reason, "Rejected viewport");
            return Err(CoreError::InvalidViewport { reason });
        }
        Ok(Self {
            real_min,
            real_max,
            imaginary_min,
            imaginary_max,
        })
    }

    /// Build a viewport from any two opposite corners.
    pub fn from_corners(a: Complex, b: Complex) -> crate::Result<Self> {
        Self::new(
            a.re.min(b.re),
            a.re.max(b.re),
            a.im.min(b.im),
            a.im.max(b.im),
        )
    }

    /// Default view: `[-2, 2] × [-1.6, 1.6]`, the whole Mandelbrot set.
    pub const fn default_mandelbrot() -> Self {
        Self {
            real_min: Self::DEFAULT_REAL_MIN,
            real_max: Self::DEFAULT_REAL_MAX,
            imaginary_min: Self::DEFAULT_IMAGINARY_MIN,
            imaginary_max: Self::DEFAULT_IMAGINARY_MAX,
        }
    }

    pub fn real_span(&self) -> f64 {
        self.real_max - self.real_min
    }

    pub fn imaginary_span(&self) -> f64 {
        self.imaginary_max - self.imaginary_min
    }

    /// Midpoint of the viewport.
    pub fn center(&self) -> Complex {
        Complex::new(
            (self.real_min + self.real_max) / 2.0,
            (self.imaginary_min + self.imaginary_max) / 2.0,
        )
    }

    /// Same spans, moved so that `center` is the midpoint.
    pub fn centred_on(&self, center: Complex) -> Self {
        let half_re = self.real_span() / 2.0;
        let half_im = self.imaginary_span() / 2.0;
        Self {
            real_min: center.re - half_re,
            real_max: center.re + half_re,
            imaginary_min: center.im - half_im,
            imaginary_max: center.im + half_im,
        }
    }

    /// Shrink both spans by `factor` around the midpoint (`factor > 1` zooms in).
    pub fn zoomed(&self, factor: f64) -> crate::Result<Self> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(CoreError::InvalidViewport {
                reason: format!("zoom factor must be positive and finite, got {factor}"),
            });
        }
        let c = self.center();
        let half_re = self.real_span() / (2.0 * factor);
        let half_im = self.imaginary_span() / (2.0 * factor);
        Self::new(c.re - half_re, c.re + half_re, c.im - half_im, c.im + half_im)
    }
}

fn bounds_error(
    real_min: f64,
    real_max: f64,
    imaginary_min: f64,
    imaginary_max: f64,
) -> Option<String> {
    let bounds = [real_min, real_max, imaginary_min, imaginary_max];
    if bounds.iter().any(|b| !b.is_finite()) {
        Some(format!("bounds must be finite, got {bounds:?}"))
    } else if real_min >= real_max {
        Some(format!("real_min ({real_min}) must be below real_max ({real_max})"))
    } else if imaginary_min >= imaginary_max {
        Some(format!(
            "imaginary_min ({imaginary_min}) must be below imaginary_max ({imaginary_max})"
        ))
    } else {
        None
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::default_mandelbrot()
    }
}

// ---------------------------------------------------------------------------
// Coordinate mapper
// ---------------------------------------------------------------------------

/// Maps pixel coordinates of a sized output surface onto a [`Viewport`].
///
/// `(0, 0)` is the top-left pixel. The y-axis is flipped so that increasing
/// pixel-y moves downward (decreasing imaginary part).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    viewport: Viewport,
    width: u32,
    height: u32,
    center: Complex,
    /// Complex-plane units per pixel, per axis.
    scale_re: f64,
    scale_im: f64,
}

impl CoordinateMapper {
    pub fn new(viewport: Viewport, width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            viewport,
            width,
            height,
            center: viewport.center(),
            scale_re: viewport.real_span() / width as f64,
            scale_im: viewport.imaginary_span() / height as f64,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Map a pixel coordinate to a point on the complex plane.
    #[inline]
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        self.subpixel_to_complex(px as f64, py as f64)
    }

    /// Like [`pixel_to_complex`](Self::pixel_to_complex) but accepts
    /// fractional coordinates.
    #[inline]
    pub fn subpixel_to_complex(&self, px: f64, py: f64) -> Complex {
        let half_w = self.width as f64 / 2.0;
        let half_h = self.height as f64 / 2.0;
        Complex::new(
            self.center.re + (px - half_w) * self.scale_re,
            self.center.im - (py - half_h) * self.scale_im,
        )
    }

    /// Inverse of [`subpixel_to_complex`](Self::subpixel_to_complex).
    pub fn complex_to_pixel(&self, point: Complex) -> (f64, f64) {
        let half_w = self.width as f64 / 2.0;
        let half_h = self.height as f64 / 2.0;
        let offset = point - self.center;
        (
            offset.re / self.scale_re + half_w,
            half_h - offset.im / self.scale_im,
        )
    }

    /// Translate a dragged pixel rectangle into the viewport it covers.
    pub fn select(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> crate::Result<Viewport> {
        Viewport::from_corners(
            self.subpixel_to_complex(x0, y0),
            self.subpixel_to_complex(x1, y1),
        )
    }
}
