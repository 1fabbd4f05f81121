use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use fractal_explorer_render::RenderSettings;

use crate::error::AppError;

const APP_NAME: &str = "FractalExplorer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub render: RenderSettings,
    /// Colour scheme used when none is given on the command line.
    #[serde(default = "default_scheme")]
    pub default_scheme: String,
    #[serde(default = "default_iterations")]
    pub default_iterations: u32,
    /// Custom favourites file. When unset, `favourites.json` in the config
    /// directory is used.
    #[serde(default)]
    pub favourites_file: Option<PathBuf>,
}

fn default_scheme() -> String {
    "Sea of Gold".to_string()
}
fn default_iterations() -> u32 {
    100
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            default_scheme: default_scheme(),
            default_iterations: default_iterations(),
            favourites_file: None,
        }
    }
}

impl Preferences {
    /// Load preferences from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(json) => match serde_json::from_str::<Preferences>(&json) {
                    Ok(prefs) => {
                        info!("Loaded preferences from {}", path.display());
                        return prefs;
                    }
                    Err(e) => {
                        error!("Failed to parse preferences: {e}");
                    }
                },
                Err(e) => {
                    error!("Failed to read preferences file: {e}");
                }
            }
        } else {
            debug!("No preferences file at {}", path.display());
        }
        Self::default()
    }

    /// Persist preferences to `path`, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| AppError::json(path, e))?;
        fs::write(path, json).map_err(|e| AppError::io(path, e))?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    pub fn favourites_path(&self) -> PathBuf {
        self.favourites_file
            .clone()
            .unwrap_or_else(|| config_dir().join("favourites.json"))
    }
}

fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where preferences live unless `--config` says otherwise.
pub fn default_config_path() -> PathBuf {
    config_dir().join("preferences.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal_explorer_render::Partition;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fractal_explorer_prefs_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir.join("preferences.json")
    }

    #[test]
    fn missing_fields_use_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"default_iterations": 250}"#).unwrap();
        assert_eq!(prefs.default_iterations, 250);
        assert_eq!(prefs.default_scheme, "Sea of Gold");
        assert_eq!(prefs.render, RenderSettings::default());
        assert!(prefs.favourites_file.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = temp_path("missing");
        assert_eq!(Preferences::load(&path), Preferences::default());
    }

    #[test]
    fn unparsable_file_gives_defaults() {
        let path = temp_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Preferences::load(&path), Preferences::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("round_trip");
        let prefs = Preferences {
            render: RenderSettings {
                workers: 2,
                partition: Partition::Quadtree { max_tile_area: 900 },
                timeout_ms: 5_000,
            },
            default_scheme: "Blue Sky".into(),
            default_iterations: 400,
            favourites_file: Some(PathBuf::from("/tmp/favs.json")),
        };
        prefs.save(&path).unwrap();
        assert_eq!(Preferences::load(&path), prefs);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn custom_favourites_file_wins() {
        let prefs = Preferences {
            favourites_file: Some(PathBuf::from("elsewhere.json")),
            ..Preferences::default()
        };
        assert_eq!(prefs.favourites_path(), PathBuf::from("elsewhere.json"));
        assert!(Preferences::default()
            .favourites_path()
            .ends_with("favourites.json"));
    }
}
