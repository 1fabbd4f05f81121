use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fractal_explorer_core::{AlgorithmConfig, Complex, Viewport};
use fractal_explorer_render::{ColourScheme, RenderRequest};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Favourite
// ---------------------------------------------------------------------------

/// A saved view: everything needed to render it again except the output size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favourite {
    pub name: String,
    pub algorithm: AlgorithmConfig,
    /// The point picked when the favourite was saved. For Julia views this
    /// is the seed.
    pub selected: Complex,
    pub viewport: Viewport,
    pub scheme: ColourScheme,
}

impl Favourite {
    pub fn from_request(name: impl Into<String>, request: &RenderRequest) -> Self {
        let selected = request
            .algorithm
            .kind()
            .seed()
            .unwrap_or_else(|| request.viewport.center());
        Self {
            name: name.into(),
            algorithm: request.algorithm,
            selected,
            viewport: request.viewport,
            scheme: request.scheme.clone(),
        }
    }

    pub fn summary(&self) -> String {
        let vp = &self.viewport;
        format!(
            "{} ({} iterations) at [{}, {}] x [{}, {}], selected {}, scheme {}",
            self.algorithm.kind().name(),
            self.algorithm.max_iterations(),
            vp.real_min,
            vp.real_max,
            vp.imaginary_min,
            vp.imaginary_max,
            self.selected.round(3),
            self.scheme.name(),
        )
    }
}

// ---------------------------------------------------------------------------
// Favourite store  (one JSON array per file)
// ---------------------------------------------------------------------------

/// Favourites kept sorted by name, persisted as a single JSON array.
#[derive(Debug)]
pub struct FavouriteStore {
    favourites: Vec<Favourite>,
    path: PathBuf,
}

impl FavouriteStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let mut favourites = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| AppError::io(&path, e))?;
            serde_json::from_str::<Vec<Favourite>>(&json).map_err(|e| AppError::json(&path, e))?
        } else {
            debug!("No favourites file at {}", path.display());
            Vec::new()
        };
        sort_by_name(&mut favourites);
        info!("Loaded {} favourites from {}", favourites.len(), path.display());
        Ok(Self { favourites, path })
    }

    pub fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.favourites)
            .map_err(|e| AppError::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| AppError::io(&self.path, e))?;
        debug!("Saved {} favourites", self.favourites.len());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn favourites(&self) -> &[Favourite] {
        &self.favourites
    }

    pub fn get(&self, name: &str) -> Option<&Favourite> {
        self.favourites.iter().find(|f| f.name == name)
    }

    /// Add `favourite`, replacing any existing one with the same name.
    /// Returns `true` if one was replaced.
    pub fn upsert(&mut self, favourite: Favourite) -> bool {
        let replaced = match self.favourites.iter().position(|f| f.name == favourite.name) {
            Some(pos) => {
                info!("Replacing favourite: {}", favourite.name);
                self.favourites[pos] = favourite;
                true
            }
            None => {
                info!("Adding favourite: {}", favourite.name);
                self.favourites.push(favourite);
                false
            }
        };
        sort_by_name(&mut self.favourites);
        replaced
    }

    pub fn remove(&mut self, name: &str) -> Result<Favourite, AppError> {
        let pos = self
            .favourites
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| AppError::FavouriteNotFound(name.to_string()))?;
        info!("Removing favourite: {name}");
        Ok(self.favourites.remove(pos))
    }
}

fn sort_by_name(favourites: &mut [Favourite]) {
    favourites.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}
