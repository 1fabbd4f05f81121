use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use fractal_explorer_core::{AlgorithmConfig, AlgorithmKind, Complex, Formula, Viewport};
use fractal_explorer_render::{ColourScheme, Partition, RenderRequest, RenderSettings};

use crate::favourites::Favourite;
use crate::preferences::Preferences;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 640;
const DEFAULT_OUTPUT: &str = "fractal.png";

#[derive(Parser, Debug)]
#[command(
    name = "fractal-explorer",
    version,
    about = "Render Mandelbrot, Burning Ship, Tricorn and Julia sets to PNG"
)]
pub struct Cli {
    /// Preferences file (defaults to the per-user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a view to a PNG file.
    Render(RenderArgs),
    /// Print the complex coordinate under a pixel.
    Probe(ProbeArgs),
    /// Manage saved views.
    #[command(subcommand)]
    Favourite(FavouriteCommand),
    /// List the built-in colour schemes.
    Schemes,
    /// Show the effective preferences, optionally writing them out.
    Config {
        /// Write the effective preferences to the config file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavouriteCommand {
    /// Save the described view under NAME.
    Save {
        name: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// List saved views, sorted by name.
    List,
    /// Delete the saved view called NAME.
    Remove { name: String },
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(short, long, value_name = "PNG", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Overlay the real and imaginary axes in the scheme's gridline colour.
    #[arg(long, default_value_t = false)]
    pub gridlines: bool,

    /// Render threads; 0 uses every core.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Split the image into recursive quadrants instead of a tile grid.
    #[arg(long, default_value_t = false)]
    pub quadtree: bool,

    /// Give up after this many milliseconds; 0 disables the limit.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl RenderArgs {
    pub fn settings(&self, prefs: &Preferences) -> RenderSettings {
        let mut settings = prefs.render;
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if self.quadtree {
            settings.partition = Partition::Quadtree {
                max_tile_area: fractal_explorer_render::MAX_TILE_AREA,
            };
        }
        settings
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    pub x: u32,
    pub y: u32,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Mandelbrot,
    BurningShip,
    Tricorn,
    Julia,
}

/// Flags describing what to draw. Unset flags fall back to the favourite
/// named by `--favourite`, then to the preferences.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Start from a saved favourite; other flags override its fields.
    #[arg(long, value_name = "NAME")]
    pub favourite: Option<String>,

    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Update rule for Julia sets.
    #[arg(long, value_name = "FORMULA", value_parser = parse_formula)]
    pub julia_base: Option<Formula>,

    /// Julia seed.
    #[arg(long, value_name = "RE,IM", value_parser = parse_complex, allow_hyphen_values = true)]
    pub seed: Option<Complex>,

    #[arg(long)]
    pub iterations: Option<u32>,

    #[arg(long)]
    pub escape_radius: Option<f64>,

    #[arg(
        long,
        value_name = "RMIN,RMAX,IMIN,IMAX",
        value_parser = parse_viewport,
        allow_hyphen_values = true
    )]
    pub viewport: Option<Viewport>,

    /// Move the viewport so this point is in the middle, keeping its size.
    #[arg(long, value_name = "RE,IM", value_parser = parse_complex, allow_hyphen_values = true)]
    pub center: Option<Complex>,

    #[arg(long, value_name = "NAME")]
    pub scheme: Option<String>,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,
}

impl ViewArgs {
    /// Build the request these flags describe on top of `base`.
    pub fn resolve(&self, prefs: &Preferences, base: Option<&Favourite>) -> Result<RenderRequest> {
        let mut algorithm = match base {
            Some(fav) => fav.algorithm,
            None => AlgorithmConfig::default()
                .with_max_iterations(prefs.default_iterations)
                .context("invalid default_iterations in preferences")?,
        };
        algorithm = algorithm.with_kind(self.kind(algorithm.kind())?);
        if let Some(iterations) = self.iterations {
            algorithm = algorithm.with_max_iterations(iterations)?;
        }
        if let Some(radius) = self.escape_radius {
            algorithm = algorithm.with_escape_radius(radius)?;
        }

        let scheme = match (&self.scheme, base) {
            (Some(name), _) => ColourScheme::builtin(name)?,
            (None, Some(fav)) => fav.scheme.clone(),
            (None, None) => ColourScheme::builtin(&prefs.default_scheme)
                .context("invalid default_scheme in preferences")?,
        };
        let viewport = self
            .viewport
            .or(base.map(|f| f.viewport))
            .unwrap_or_default();
        let viewport = match self.center {
            Some(center) => viewport.centred_on(center),
            None => viewport,
        };

        Ok(RenderRequest::new(
            algorithm,
            scheme,
            viewport,
            self.width,
            self.height,
        )?)
    }

    fn kind(&self, current: AlgorithmKind) -> Result<AlgorithmKind> {
        let julia = |current: AlgorithmKind| {
            AlgorithmKind::julia(
                self.julia_base.unwrap_or(current.formula()),
                self.seed
                    .or(current.seed())
                    .unwrap_or(AlgorithmKind::DEFAULT_JULIA_SEED),
            )
        };
        let kind = match self.algorithm {
            Some(AlgorithmArg::Mandelbrot) => AlgorithmKind::Mandelbrot,
            Some(AlgorithmArg::BurningShip) => AlgorithmKind::BurningShip,
            Some(AlgorithmArg::Tricorn) => AlgorithmKind::Tricorn,
            Some(AlgorithmArg::Julia) => julia(current),
            None if current.seed().is_some() => julia(current),
            None => current,
        };
        if kind.seed().is_none() && (self.seed.is_some() || self.julia_base.is_some()) {
            bail!("--seed and --julia-base only apply to --algorithm julia");
        }
        Ok(kind)
    }
}

fn parse_formula(s: &str) -> Result<Formula, String> {
    Formula::from_name(s).map_err(|e| e.to_string())
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got {:?}", s));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|e| format!("{part:?} is not a number: {e}"))?;
    }
    Ok(out)
}

fn parse_complex(s: &str) -> Result<Complex, String> {
    let [re, im] = parse_numbers::<2>(s)?;
    Ok(Complex::new(re, im))
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let [real_min, real_max, imaginary_min, imaginary_max] = parse_numbers::<4>(s)?;
    Viewport::new(real_min, real_max, imaginary_min, imaginary_max).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fractal-explorer").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn render_view(args: &[&str]) -> ViewArgs {
        let mut full = vec!["render"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Command::Render(render) => render.view,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_come_from_preferences() {
        let prefs = Preferences {
            default_iterations: 321,
            default_scheme: "red sky".into(),
            ..Preferences::default()
        };
        let request = render_view(&[]).resolve(&prefs, None).unwrap();
        assert_eq!(request.algorithm.kind(), AlgorithmKind::Mandelbrot);
        assert_eq!(request.algorithm.max_iterations(), 321);
        assert_eq!(request.scheme.name(), "Red Sky");
        assert_eq!(request.viewport, Viewport::default());
        assert_eq!((request.width, request.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
    }

    #[test]
    fn hyphenated_values_parse() {
        let view = render_view(&[
            "--algorithm",
            "julia",
            "--julia-base",
            "burning ship",
            "--seed",
            "-0.8,0.156",
            "--viewport",
            "-1.5,1.5,-1,1",
        ]);
        let request = view.resolve(&Preferences::default(), None).unwrap();
        assert_eq!(
            request.algorithm.kind(),
            AlgorithmKind::julia(Formula::BurningShip, Complex::new(-0.8, 0.156))
        );
        assert_eq!(request.viewport, Viewport::new(-1.5, 1.5, -1.0, 1.0).unwrap());
    }

    #[test]
    fn julia_without_seed_uses_default() {
        let view = render_view(&["--algorithm", "julia"]);
        let kind = view.resolve(&Preferences::default(), None).unwrap().algorithm.kind();
        assert_eq!(kind.seed(), Some(AlgorithmKind::DEFAULT_JULIA_SEED));
        assert_eq!(kind.formula(), Formula::Mandelbrot);
    }

    #[test]
    fn seed_without_julia_is_rejected() {
        let view = render_view(&["--algorithm", "tricorn", "--seed", "0,0"]);
        assert!(view.resolve(&Preferences::default(), None).is_err());
    }

    #[test]
    fn flags_override_favourite() {
        let base_request = RenderRequest::new(
            AlgorithmConfig::new(
                AlgorithmKind::julia(Formula::Tricorn, Complex::new(0.1, 0.2)),
                500,
                3.0,
            )
            .unwrap(),
            ColourScheme::blue_sky(),
            Viewport::new(-1.0, 1.0, -1.0, 1.0).unwrap(),
            10,
            10,
        )
        .unwrap();
        let fav = Favourite::from_request("fav", &base_request);

        let view = render_view(&["--seed", "0.3,-0.4", "--iterations", "50"]);
        let request = view.resolve(&Preferences::default(), Some(&fav)).unwrap();
        assert_eq!(
            request.algorithm.kind(),
            AlgorithmKind::julia(Formula::Tricorn, Complex::new(0.3, -0.4))
        );
        assert_eq!(request.algorithm.max_iterations(), 50);
        assert_eq!(request.algorithm.escape_radius(), 3.0);
        assert_eq!(request.scheme.name(), "Blue Sky");
        assert_eq!(request.viewport, fav.viewport);
    }

    #[test]
    fn center_moves_viewport_without_resizing() {
        let view = render_view(&["--viewport", "-2,2,-1,1", "--center", "-0.75,0.5"]);
        let vp = view.resolve(&Preferences::default(), None).unwrap().viewport;
        assert_eq!(vp.center(), Complex::new(-0.75, 0.5));
        assert_eq!((vp.real_span(), vp.imaginary_span()), (4.0, 2.0));
    }

    #[test]
    fn bad_values_are_rejected_at_parse_time() {
        let base = ["fractal-explorer", "render"];
        for bad in [
            &["--viewport", "1,2,3"][..],
            &["--viewport", "2,1,0,1"],
            &["--seed", "x,1"],
            &["--julia-base", "newton"],
        ] {
            let args = base.iter().chain(bad.iter()).copied();
            assert!(Cli::try_parse_from(args).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn probe_and_favourite_commands_parse() {
        assert!(matches!(
            parse(&["probe", "10", "20", "--width", "300"]).command,
            Command::Probe(ProbeArgs { x: 10, y: 20, .. })
        ));
        assert!(matches!(
            parse(&["favourite", "remove", "spiral"]).command,
            Command::Favourite(FavouriteCommand::Remove { name }) if name == "spiral"
        ));
        let cli = parse(&["--config", "prefs.json", "schemes"]);
        assert_eq!(cli.config, Some(PathBuf::from("prefs.json")));
    }

    #[test]
    fn render_flags_adjust_settings() {
        let cli = parse(&["render", "--workers", "3", "--quadtree", "--timeout-ms", "0"]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        let settings = args.settings(&Preferences::default());
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.timeout_ms, 0);
        assert!(matches!(settings.partition, Partition::Quadtree { .. }));
    }
}
