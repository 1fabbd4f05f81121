use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// An opaque 8-bit-per-channel colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    /// Per-channel linear interpolation, rounding half up.
    #[inline]
    fn lerp(self, other: Self, t: f64) -> Self {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

// ---------------------------------------------------------------------------
// Colour scheme
// ---------------------------------------------------------------------------

/// A gradient anchor: `progress` in `[0, 1]` mapped to `colour`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColourStop {
    pub progress: f64,
    pub colour: Rgb,
}

/// An ordered mapping from divergence ratio to colour.
///
/// Stops are kept sorted by progress and a scheme always holds at least two
/// of them, so [`calculate_colour`](Self::calculate_colour) never has to
/// guess. Progress `0.0` is conventionally the background (fast escape) and
/// `1.0` the foreground (never escapes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScheme")]
pub struct ColourScheme {
    name: String,
    stops: Vec<ColourStop>,
    /// Overlay colour for crosshairs and selection; not part of the gradient.
    gridline: Option<Rgb>,
}

#[derive(Deserialize)]
struct RawScheme {
    name: String,
    stops: Vec<ColourStop>,
    #[serde(default)]
    gridline: Option<Rgb>,
}

impl TryFrom<RawScheme> for ColourScheme {
    type Error = RenderError;

    fn try_from(raw: RawScheme) -> Result<Self, Self::Error> {
        let mut scheme =
            Self::from_stops(raw.name, raw.stops.into_iter().map(|s| (s.progress, s.colour)))?;
        scheme.gridline = raw.gridline;
        Ok(scheme)
    }
}

impl ColourScheme {
    /// A two-stop gradient from `background` (0.0) to `foreground` (1.0).
    pub fn new(name: impl Into<String>, background: Rgb, foreground: Rgb) -> Self {
        Self {
            name: name.into(),
            stops: vec![
                ColourStop {
                    progress: 0.0,
                    colour: background,
                },
                ColourStop {
                    progress: 1.0,
                    colour: foreground,
                },
            ],
            gridline: None,
        }
    }

    /// Build a scheme from arbitrary `(progress, colour)` pairs.
    ///
    /// Later duplicates overwrite earlier ones; fewer than two distinct stops
    /// is an error.
    pub fn from_stops(
        name: impl Into<String>,
        stops: impl IntoIterator<Item = (f64, Rgb)>,
    ) -> crate::Result<Self> {
        let mut scheme = Self {
            name: name.into(),
            stops: Vec::new(),
            gridline: None,
        };
        for (progress, colour) in stops {
            scheme.add_colour_stop(progress, colour)?;
        }
        if scheme.stops.len() < 2 {
            return Err(RenderError::TooFewColourStops(scheme.stops.len()));
        }
        Ok(scheme)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stops(&self) -> &[ColourStop] {
        &self.stops
    }

    /// Add (or overwrite) the stop at `progress`.
    pub fn add_colour_stop(&mut self, progress: f64, colour: Rgb) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(RenderError::InvalidColourStop(progress));
        }
        // Fold -0.0 into 0.0 so both address the background stop.
        let progress = progress + 0.0;
        match self
            .stops
            .binary_search_by(|s| s.progress.total_cmp(&progress))
        {
            Ok(i) => self.stops[i].colour = colour,
            Err(i) => self.stops.insert(i, ColourStop { progress, colour }),
        }
        Ok(())
    }

    /// Remove the stop at exactly `progress`, returning its colour.
    ///
    /// Refuses to leave the scheme with fewer than two stops.
    pub fn remove_colour_stop(&mut self, progress: f64) -> crate::Result<Option<Rgb>> {
        let Some(i) = self.stops.iter().position(|s| s.progress == progress) else {
            return Ok(None);
        };
        if self.stops.len() <= 2 {
            return Err(RenderError::TooFewColourStops(self.stops.len() - 1));
        }
        Ok(Some(self.stops.remove(i).colour))
    }

    /// The explicit stop at `progress`, if any.
    pub fn colour_stop(&self, progress: f64) -> Option<Rgb> {
        self.stops
            .iter()
            .find(|s| s.progress == progress)
            .map(|s| s.colour)
    }

    pub fn background(&self) -> Option<Rgb> {
        self.colour_stop(0.0)
    }

    pub fn set_background(&mut self, colour: Rgb) {
        self.upsert(0.0, colour);
    }

    pub fn foreground(&self) -> Option<Rgb> {
        self.colour_stop(1.0)
    }

    pub fn set_foreground(&mut self, colour: Rgb) {
        self.upsert(1.0, colour);
    }

    pub fn gridline(&self) -> Option<Rgb> {
        self.gridline
    }

    pub fn set_gridline(&mut self, colour: Option<Rgb>) {
        self.gridline = colour;
    }

    fn upsert(&mut self, progress: f64, colour: Rgb) {
        // Callers only pass constants in [0, 1].
        let _ = self.add_colour_stop(progress, colour);
    }

    /// Map a divergence ratio to a colour.
    ///
    /// Below the lowest stop and above the highest the end colours are
    /// extended flat; in between, the two bracketing stops are linearly
    /// interpolated. `NaN` is treated as "never escaped" (highest stop).
    pub fn calculate_colour(&self, progress: f64) -> Rgb {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];

        if progress.is_nan() || progress >= last.progress {
            return last.colour;
        }
        if progress <= first.progress {
            return first.colour;
        }

        // first.progress < progress < last.progress, so 1 <= hi < len.
        let hi = self.stops.partition_point(|s| s.progress < progress);
        let upper = self.stops[hi];
        if upper.progress == progress {
            return upper.colour;
        }
        let lower = self.stops[hi - 1];
        let t = (progress - lower.progress) / (upper.progress - lower.progress);
        lower.colour.lerp(upper.colour, t)
    }

    /// Feed every field that affects rendered pixels into `state`.
    /// The display name is not part of it.
    pub(crate) fn hash_pixels<H: Hasher>(&self, state: &mut H) {
        self.stops.len().hash(state);
        for stop in &self.stops {
            stop.progress.to_bits().hash(state);
            stop.colour.hash(state);
        }
        self.gridline.hash(state);
    }

    // -----------------------------------------------------------------------
    // Builtin schemes
    // -----------------------------------------------------------------------

    pub fn sea_of_gold() -> Self {
        let dark_blue = Rgb::new(0, 0, 40);
        let light_blue = Rgb::new(20, 70, 165);
        let gold = Rgb::new(210, 130, 0);
        builtin(
            "Sea of Gold",
            &[
                (0.0, dark_blue),
                (0.05, light_blue),
                (0.1, Rgb::WHITE),
                (0.15, gold),
                (0.25, dark_blue),
                (0.4, light_blue),
                (0.6, Rgb::WHITE),
                (0.8, gold),
                (1.0, Rgb::BLACK),
            ],
        )
    }

    pub fn blue_sky() -> Self {
        builtin(
            "Blue Sky",
            &[
                (0.0, Rgb::new(7, 29, 64)),
                (0.1, Rgb::new(24, 102, 120)),
                (0.3, Rgb::WHITE),
                (1.0, Rgb::BLACK),
            ],
        )
    }

    pub fn red_sky() -> Self {
        builtin(
            "Red Sky",
            &[
                (0.0, Rgb::new(3, 46, 79)),
                (0.2, Rgb::new(255, 84, 16)),
                (0.3, Rgb::new(255, 195, 16)),
                (0.4, Rgb::WHITE),
                (1.0, Rgb::BLACK),
            ],
        )
    }

    pub fn greyscale() -> Self {
        let mut scheme = Self::new("Greyscale", Rgb::BLACK, Rgb::WHITE);
        scheme.gridline = Some(Rgb::new(255, 0, 0));
        scheme
    }

    /// Look up a builtin scheme by name, ignoring case.
    pub fn builtin(name: &str) -> crate::Result<Self> {
        builtin_schemes()
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| RenderError::UnknownScheme(name.to_string()))
    }
}

impl Default for ColourScheme {
    fn default() -> Self {
        Self::sea_of_gold()
    }
}

fn builtin(name: &str, stops: &[(f64, Rgb)]) -> ColourScheme {
    let mut scheme = ColourScheme::new(name, stops[0].1, stops[stops.len() - 1].1);
    for &(progress, colour) in stops {
        scheme.upsert(progress, colour);
    }
    scheme.gridline = Some(Rgb::WHITE);
    scheme
}

pub fn builtin_schemes() -> Vec<ColourScheme> {
    vec![
        ColourScheme::sea_of_gold(),
        ColourScheme::blue_sky(),
        ColourScheme::red_sky(),
        ColourScheme::greyscale(),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
