use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Formula
// ---------------------------------------------------------------------------

/// The per-iteration update rule `z ← f(z) + seed` shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// `f(z) = z²`
    Mandelbrot,
    /// `f(z) = (|Re z|, |Im z|)²`
    BurningShip,
    /// `f(z) = conj(z)²`
    Tricorn,
}

impl Formula {
    pub const ALL: [Formula; 3] = [Self::Mandelbrot, Self::BurningShip, Self::Tricorn];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::BurningShip => "Burning Ship",
            Self::Tricorn => "Tricorn",
        }
    }

    /// Look a formula up by display name, ignoring case, spaces, `-` and `_`.
    pub fn from_name(name: &str) -> crate::Result<Self> {
        let wanted = normalise_name(name);
        Self::ALL
            .into_iter()
            .find(|f| normalise_name(f.name()) == wanted)
            .ok_or_else(|| CoreError::UnknownFormula(name.to_string()))
    }

    #[inline]
    pub fn step(self, z: Complex, seed: Complex) -> Complex {
        match self {
            Self::Mandelbrot => z.square() + seed,
            Self::BurningShip => z.abs_components().square() + seed,
            Self::Tricorn => z.conjugate().square() + seed,
        }
    }
}

fn normalise_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Algorithm kind
// ---------------------------------------------------------------------------

/// Which escape-time set to draw.
///
/// The plain variants use the evaluated point both as the starting value and
/// as the additive seed. `Julia` reuses a base formula's update rule but keeps
/// the seed fixed, so only the starting value varies across the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmKind {
    Mandelbrot,
    BurningShip,
    Tricorn,
    Julia { base: Formula, seed: Complex },
}

impl AlgorithmKind {
    /// A visually interesting default: `c = -0.7 + 0.27015i`.
    pub const DEFAULT_JULIA_SEED: Complex = Complex::new(-0.7, 0.27015);

    pub fn julia(base: Formula, seed: Complex) -> Self {
        Self::Julia { base, seed }
    }

    /// The update rule this kind iterates.
    #[inline]
    pub fn formula(&self) -> Formula {
        match *self {
            Self::Mandelbrot => Formula::Mandelbrot,
            Self::BurningShip => Formula::BurningShip,
            Self::Tricorn => Formula::Tricorn,
            Self::Julia { base, .. } => base,
        }
    }

    /// The fixed Julia seed, if any.
    pub fn seed(&self) -> Option<Complex> {
        match *self {
            Self::Julia { seed, .. } => Some(seed),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::BurningShip => "Burning Ship",
            Self::Tricorn => "Tricorn",
            Self::Julia { .. } => "Julia",
        }
    }
}

impl From<Formula> for AlgorithmKind {
    fn from(formula: Formula) -> Self {
        match formula {
            Formula::Mandelbrot => Self::Mandelbrot,
            Formula::BurningShip => Self::BurningShip,
            Formula::Tricorn => Self::Tricorn,
        }
    }
}

// ---------------------------------------------------------------------------
// Iteration result
// ---------------------------------------------------------------------------

/// The raw outcome of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Escape {
    /// The orbit value when iteration stopped.
    pub z: Complex,
    /// Number of update steps performed before stopping.
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Algorithm config
// ---------------------------------------------------------------------------

/// A fully validated escape-time algorithm: the set to draw plus its
/// iteration budget and bailout radius.
///
/// The cached `escape_radius_sq` field is recomputed on deserialization so
/// persisted favourites always stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlgorithmConfig {
    kind: AlgorithmKind,

    /// Maximum number of iterations before declaring a point bounded.
    max_iterations: u32,

    /// Bailout radius: once `|z| ≥ escape_radius` the orbit has diverged.
    escape_radius: f64,

    #[serde(skip)]
    escape_radius_sq: f64,
}

/// Validates and recomputes the cached square on load.
impl<'de> Deserialize<'de> for AlgorithmConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            kind: AlgorithmKind,
            max_iterations: u32,
            escape_radius: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.kind, raw.max_iterations, raw.escape_radius)
            .map_err(serde::de::Error::custom)
    }
}

impl AlgorithmConfig {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
    pub const DEFAULT_ESCAPE_RADIUS: f64 = 2.0;

    pub fn new(kind: AlgorithmKind, max_iterations: u32, escape_radius: f64) -> crate::Result<Self> {
        if max_iterations < 1 {
            debug!(max_iterations, "Rejected iteration budget");
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        if escape_radius <= 0.0 || !escape_radius.is_finite() {
            debug!(escape_radius, "Rejected escape radius");
            return Err(CoreError::InvalidEscapeRadius(escape_radius));
        }
        Ok(Self {
            kind,
            max_iterations,
            escape_radius,
            escape_radius_sq: escape_radius * escape_radius,
        })
    }

    #[inline]
    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    #[inline]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    #[inline]
    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// Pre-computed squared escape radius for the inner loop.
    #[inline]
    pub fn escape_radius_sq(&self) -> f64 {
        self.escape_radius_sq
    }

    /// Return a copy drawing a different set with the same parameters.
    pub fn with_kind(self, kind: AlgorithmKind) -> Self {
        Self { kind, ..self }
    }

    /// Return a copy with a different iteration budget.
    pub fn with_max_iterations(self, max_iterations: u32) -> crate::Result<Self> {
        Self::new(self.kind, max_iterations, self.escape_radius)
    }

    /// Return a copy with a different bailout radius.
    pub fn with_escape_radius(self, escape_radius: f64) -> crate::Result<Self> {
        Self::new(self.kind, self.max_iterations, escape_radius)
    }

    /// Iterate `point` until it diverges or the budget runs out.
    pub fn iterate(&self, point: Complex) -> Escape {
        let seed = self.kind.seed().unwrap_or(point);
        let formula = self.kind.formula();

        let mut z = point;
        let mut n = 0;
        while z.modulus_squared() < self.escape_radius_sq && n < self.max_iterations {
            z = formula.step(z, seed);
            n += 1;
        }

        Escape { z, iterations: n }
    }

    /// Iterate `point` and return its normalized divergence ratio.
    ///
    /// `0.0` means the point was already outside the escape radius, `1.0`
    /// means it never diverged within `max_iterations`.
    #[inline]
    pub fn evaluate(&self, point: Complex) -> f64 {
        self.normalise(self.iterate(point))
    }

    /// Smooth (normalized) iteration count, scaled into `[0, 1]`:
    ///
    ///   ratio = (n − ln(ln|z|²) / ln 2) / max_iterations
    ///
    /// `ln(ln x)` is undefined for `x ≤ 1`; such results are treated as the
    /// maximum-iteration case so no `NaN` reaches the colour mapper.
    pub fn normalise(&self, escape: Escape) -> f64 {
        let max = self.max_iterations;
        if escape.iterations >= max {
            return 1.0;
        }
        if escape.iterations == 0 {
            return 0.0;
        }

        let log_term = escape.z.modulus_squared().ln().ln() / LN_2;
        if !log_term.is_finite() {
            return 1.0;
        }
        ((escape.iterations as f64 - log_term) / max as f64).clamp(0.0, 1.0)
    }
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            kind: AlgorithmKind::Mandelbrot,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius: Self::DEFAULT_ESCAPE_RADIUS,
            escape_radius_sq: Self::DEFAULT_ESCAPE_RADIUS * Self::DEFAULT_ESCAPE_RADIUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: AlgorithmKind) -> AlgorithmConfig {
        AlgorithmConfig::new(kind, 100, 2.0).unwrap()
    }

    const PLAIN: [AlgorithmKind; 3] = [
        AlgorithmKind::Mandelbrot,
        AlgorithmKind::BurningShip,
        AlgorithmKind::Tricorn,
    ];

    #[test]
    fn default_config() {
        let c = AlgorithmConfig::default();
        assert_eq!(c.kind(), AlgorithmKind::Mandelbrot);
        assert_eq!(c.max_iterations(), 100);
        assert!((c.escape_radius_sq() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_max_iterations() {
        assert_eq!(
            AlgorithmConfig::new(AlgorithmKind::Mandelbrot, 0, 2.0),
            Err(CoreError::InvalidMaxIterations(0))
        );
    }

    #[test]
    fn invalid_escape_radius() {
        for r in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(AlgorithmConfig::new(AlgorithmKind::Mandelbrot, 100, r).is_err());
        }
    }

    #[test]
    fn bounded_points_return_exactly_one() {
        for kind in PLAIN {
            let c = config(kind);
            assert_eq!(c.evaluate(Complex::ZERO), 1.0, "{}", kind.name());
            assert_eq!(c.evaluate(Complex::new(-1.0, 0.0)), 1.0, "{}", kind.name());
        }
    }

    #[test]
    fn escaping_points_stay_below_one() {
        for kind in PLAIN {
            let c = config(kind);
            let escape = c.iterate(Complex::new(1.0, 0.0));
            // 1 → 1² + 1 = 2, which reaches the radius after one step.
            assert_eq!(escape.iterations, 1, "{}", kind.name());
            let ratio = c.normalise(escape);
            assert!(ratio > 0.0 && ratio < 1.0, "{}: {ratio}", kind.name());
        }
    }

    #[test]
    fn point_outside_radius_is_zero() {
        for kind in PLAIN {
            let c = config(kind);
            let escape = c.iterate(Complex::new(2.0, 2.0));
            assert_eq!(escape.iterations, 0);
            assert_eq!(c.normalise(escape), 0.0);
        }
    }

    #[test]
    fn small_escape_radius_never_yields_nan() {
        // With r < 1 the escaped |z|² can be ≤ 1, where ln(ln x) is undefined.
        let c = AlgorithmConfig::new(AlgorithmKind::Mandelbrot, 50, 0.5).unwrap();
        let escape = Escape {
            z: Complex::new(0.6, 0.0),
            iterations: 3,
        };
        assert_eq!(c.normalise(escape), 1.0);

        for i in 0..20 {
            let p = Complex::new(-0.6 + i as f64 * 0.05, 0.1);
            let ratio = c.evaluate(p);
            assert!((0.0..=1.0).contains(&ratio), "ratio {ratio} at {p}");
        }
    }

    #[test]
    fn overflowing_orbit_maps_to_maximum() {
        let c = config(AlgorithmKind::Mandelbrot);
        let escape = Escape {
            z: Complex::new(f64::INFINITY, 0.0),
            iterations: 5,
        };
        assert_eq!(c.normalise(escape), 1.0);
    }

    #[test]
    fn burning_ship_differs_from_mandelbrot() {
        let p = Complex::new(-1.75, -0.03);
        let m = config(AlgorithmKind::Mandelbrot).iterate(p);
        let b = config(AlgorithmKind::BurningShip).iterate(p);
        assert_ne!(m, b);
    }

    #[test]
    fn julia_at_its_own_seed_matches_the_base_formula() {
        let points = [
            Complex::new(0.3, 0.5),
            Complex::new(-0.75, 0.1),
            Complex::new(-1.9, 0.0),
        ];
        for formula in Formula::ALL {
            let base = config(formula.into());
            for p in points {
                let julia = config(AlgorithmKind::julia(formula, p));
                assert_eq!(julia.iterate(p), base.iterate(p));
            }
        }
    }

    #[test]
    fn julia_with_zero_seed_is_the_unit_disk() {
        let j = config(AlgorithmKind::julia(Formula::Mandelbrot, Complex::ZERO));
        assert_eq!(j.evaluate(Complex::new(0.5, 0.5)), 1.0);
        assert!(j.evaluate(Complex::new(1.1, 0.0)) < 1.0);
    }

    #[test]
    fn names_are_fixed_per_variant() {
        assert_eq!(AlgorithmKind::BurningShip.name(), "Burning Ship");
        assert_eq!(
            AlgorithmKind::julia(Formula::Tricorn, Complex::ZERO).name(),
            "Julia"
        );
        assert_eq!(Formula::from_name("burning-ship"), Ok(Formula::BurningShip));
        assert_eq!(Formula::from_name("TRICORN"), Ok(Formula::Tricorn));
        assert!(Formula::from_name("newton").is_err());
    }

    #[test]
    fn deserialization_recomputes_cached_square() {
        let json = r#"{"kind":{"type":"julia","base":"tricorn","seed":{"re":0.1,"im":-0.2}},
                       "max_iterations":64,"escape_radius":3.0}"#;
        let c: AlgorithmConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.max_iterations(), 64);
        assert!((c.escape_radius_sq() - 9.0).abs() < f64::EPSILON);
        assert_eq!(c.kind().seed(), Some(Complex::new(0.1, -0.2)));
    }

    #[test]
    fn deserialization_rejects_invalid_parameters() {
        let json = r#"{"kind":{"type":"mandelbrot"},"max_iterations":0,"escape_radius":2.0}"#;
        assert!(serde_json::from_str::<AlgorithmConfig>(json).is_err());
    }
}
