mod cli;
mod error;
mod export;
mod favourites;
mod preferences;

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use fractal_explorer_render::{
    builtin_schemes, Image, RenderError, RenderEvent, RenderRequest, RenderService,
};

use cli::{Cli, Command, FavouriteCommand, ProbeArgs, RenderArgs, ViewArgs};
use error::AppError;
use export::{draw_axes, export_png, ExportMetadata};
use favourites::{Favourite, FavouriteStore};
use preferences::Preferences;

/// How often progress is logged while waiting for a render.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(preferences::default_config_path);
    let prefs = Preferences::load(&config_path);

    match cli.command {
        Command::Render(args) => render(&prefs, &args),
        Command::Probe(args) => probe(&prefs, &args),
        Command::Favourite(cmd) => favourite(&prefs, cmd),
        Command::Schemes => {
            for scheme in builtin_schemes() {
                println!("{} ({} stops)", scheme.name(), scheme.stops().len());
            }
            Ok(())
        }
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&prefs)?);
            if write {
                prefs.save(&config_path)?;
                info!("Wrote preferences to {}", config_path.display());
            }
            Ok(())
        }
    }
}

/// Resolve `view` against its `--favourite`, if one was named.
fn resolve_view(prefs: &Preferences, view: &ViewArgs) -> Result<RenderRequest> {
    let Some(name) = &view.favourite else {
        return view.resolve(prefs, None);
    };
    let store = FavouriteStore::load(prefs.favourites_path())?;
    let fav = store
        .get(name)
        .ok_or_else(|| AppError::FavouriteNotFound(name.clone()))?;
    debug!(favourite = %fav.name, "Rendering from favourite");
    view.resolve(prefs, Some(fav))
}

fn render(prefs: &Preferences, args: &RenderArgs) -> Result<()> {
    let request = resolve_view(prefs, &args.view)?;
    let (mut service, events) = RenderService::spawn(args.settings(prefs))?;
    service.configure(
        request.algorithm,
        request.scheme.clone(),
        request.viewport,
        request.width,
        request.height,
    )?;

    info!(
        algorithm = request.algorithm.kind().name(),
        width = request.width,
        height = request.height,
        scheme = request.scheme.name(),
        "Rendering"
    );
    let Some(id) = service.request_render() else {
        bail!("render service refused the request");
    };

    loop {
        match events.recv_timeout(PROGRESS_INTERVAL) {
            Ok(RenderEvent::Completed { id: done, elapsed }) if done == id => {
                info!(elapsed_ms = elapsed.as_millis(), "Render finished");
                break;
            }
            Ok(RenderEvent::Cancelled { id: done, reason }) if done == id => {
                bail!("render stopped early: {reason:?}");
            }
            Ok(RenderEvent::Failed { id: done, error }) if done == id => {
                return Err(error.into());
            }
            Ok(other) => debug!(?other, "Ignoring event for an older render"),
            Err(RecvTimeoutError::Timeout) => {
                info!(progress = service.progress(), "Rendering");
            }
            Err(RecvTimeoutError::Disconnected) => return Err(RenderError::ServiceStopped.into()),
        }
    }

    let mut image = Image::clone(&*service.image().ok_or(RenderError::ServiceStopped)?);
    if args.gridlines {
        match request.scheme.gridline() {
            Some(colour) => draw_axes(&mut image, &request.mapper()?, colour),
            None => warn!(scheme = request.scheme.name(), "Scheme has no gridline colour"),
        }
    }

    export_png(&image, &args.output, &ExportMetadata::from_request(&request))
        .with_context(|| format!("export {}", args.output.display()))?;
    info!("Saved {}", args.output.display());
    Ok(())
}

fn probe(prefs: &Preferences, args: &ProbeArgs) -> Result<()> {
    let request = resolve_view(prefs, &args.view)?;
    if args.x >= request.width || args.y >= request.height {
        bail!(
            "pixel ({}, {}) is outside the {}x{} surface",
            args.x,
            args.y,
            request.width,
            request.height
        );
    }
    let (mut service, _events) = RenderService::spawn(prefs.render)?;
    service.configure(
        request.algorithm,
        request.scheme,
        request.viewport,
        request.width,
        request.height,
    )?;
    let point = service.pixel_to_complex(args.x, args.y)?;
    println!("{}", point.round(3));
    Ok(())
}

fn favourite(prefs: &Preferences, cmd: FavouriteCommand) -> Result<()> {
    let mut store = FavouriteStore::load(prefs.favourites_path())?;
    match cmd {
        FavouriteCommand::Save { name, view } => {
            let base = view.favourite.as_deref().and_then(|n| store.get(n)).cloned();
            if let (Some(wanted), None) = (&view.favourite, &base) {
                bail!(AppError::FavouriteNotFound(wanted.clone()));
            }
            let request = view.resolve(prefs, base.as_ref())?;
            store.upsert(Favourite::from_request(name, &request));
            store.save()?;
            info!("Saved favourites to {}", store.path().display());
        }
        FavouriteCommand::List => {
            if store.favourites().is_empty() {
                println!("No favourites saved.");
            }
            for fav in store.favourites() {
                println!("{}: {}", fav.name, fav.summary());
            }
        }
        FavouriteCommand::Remove { name } => {
            store.remove(&name)?;
            store.save()?;
        }
    }
    Ok(())
}
