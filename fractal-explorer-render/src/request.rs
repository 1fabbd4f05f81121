use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fractal_explorer_core::{AlgorithmConfig, AlgorithmKind, CoordinateMapper, CoreError, Viewport};

use crate::colour::ColourScheme;

/// Everything needed to produce one image. Built fresh for each render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub algorithm: AlgorithmConfig,
    pub scheme: ColourScheme,
    pub viewport: Viewport,
    pub width: u32,
    pub height: u32,
}

/// Digest of the pixel-affecting state of a [`RenderRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl RenderRequest {
    pub fn new(
        algorithm: AlgorithmConfig,
        scheme: ColourScheme,
        viewport: Viewport,
        width: u32,
        height: u32,
    ) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height }.into());
        }
        Ok(Self {
            algorithm,
            scheme,
            viewport,
            width,
            height,
        })
    }

    pub fn mapper(&self) -> crate::Result<CoordinateMapper> {
        Ok(CoordinateMapper::new(self.viewport, self.width, self.height)?)
    }

    /// Two requests with equal fingerprints render to the same pixels.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = DefaultHasher::new();

        let kind = self.algorithm.kind();
        kind.formula().hash(&mut h);
        match kind {
            AlgorithmKind::Julia { seed, .. } => {
                1u8.hash(&mut h);
                seed.re.to_bits().hash(&mut h);
                seed.im.to_bits().hash(&mut h);
            }
            _ => 0u8.hash(&mut h),
        }
        self.algorithm.max_iterations().hash(&mut h);
        self.algorithm.escape_radius().to_bits().hash(&mut h);

        self.scheme.hash_pixels(&mut h);

        let vp = &self.viewport;
        for bound in [vp.real_min, vp.real_max, vp.imaginary_min, vp.imaginary_max] {
            bound.to_bits().hash(&mut h);
        }
        self.width.hash(&mut h);
        self.height.hash(&mut h);

        Fingerprint(h.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::Rgb;
    use fractal_explorer_core::{Complex, Formula};

    fn request() -> RenderRequest {
        RenderRequest::new(
            AlgorithmConfig::default(),
            ColourScheme::default(),
            Viewport::default(),
            120,
            80,
        )
        .unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        let r = request();
        assert!(RenderRequest::new(r.algorithm, r.scheme.clone(), r.viewport, 0, 80).is_err());
        assert!(RenderRequest::new(r.algorithm, r.scheme, r.viewport, 120, 0).is_err());
    }

    #[test]
    fn identical_requests_share_a_fingerprint() {
        assert_eq!(request().fingerprint(), request().fingerprint());
    }

    #[test]
    fn scheme_name_does_not_affect_fingerprint() {
        let a = request();
        let mut b = request();
        let stops = a.scheme.stops().iter().map(|s| (s.progress, s.colour));
        b.scheme = ColourScheme::from_stops("Renamed", stops).unwrap();
        b.scheme.set_gridline(a.scheme.gridline());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn every_pixel_affecting_field_changes_fingerprint() {
        let base = request();
        let fp = base.fingerprint();

        let mut r = base.clone();
        r.algorithm = r.algorithm.with_kind(AlgorithmKind::Tricorn);
        assert_ne!(r.fingerprint(), fp);

        let mut r = base.clone();
        r.algorithm = r.algorithm.with_max_iterations(101).unwrap();
        assert_ne!(r.fingerprint(), fp);

        let mut r = base.clone();
        r.algorithm = r.algorithm.with_escape_radius(4.0).unwrap();
        assert_ne!(r.fingerprint(), fp);

        let julia = |seed| {
            let mut r = base.clone();
            r.algorithm = r.algorithm.with_kind(AlgorithmKind::julia(Formula::Mandelbrot, seed));
            r.fingerprint()
        };
        assert_ne!(julia(Complex::new(0.1, 0.2)), julia(Complex::new(0.1, 0.3)));
        assert_ne!(julia(Complex::ZERO), fp);

        let mut r = base.clone();
        r.scheme.add_colour_stop(0.42, Rgb::new(1, 2, 3)).unwrap();
        assert_ne!(r.fingerprint(), fp);

        let mut r = base.clone();
        r.scheme.set_gridline(Some(Rgb::new(9, 9, 9)));
        assert_ne!(r.fingerprint(), fp);

        let mut r = base.clone();
        r.viewport.imaginary_max = 1.7;
        assert_ne!(r.fingerprint(), fp);

        let mut r = base.clone();
        r.width = 121;
        assert_ne!(r.fingerprint(), fp);

        let mut r = base;
        r.height = 81;
        assert_ne!(r.fingerprint(), fp);
    }
}
