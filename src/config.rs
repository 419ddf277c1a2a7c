use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::catalog::Catalog;

/// Application configuration loaded from a TOML file.
/// All fields have defaults, so the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Port for `soundmap serve`.
    pub port: Option<u16>,
    /// Table store path (overrides the default in the working directory).
    pub db_path: Option<PathBuf>,
    /// Root of the `<group>/<name>.wav` audio tree.
    pub sound_dir: Option<PathBuf>,
    /// Use the full library category list instead of the production subset.
    pub use_all_sounds: bool,
    /// Explicit catalog; wins over `use_all_sounds`.
    pub catalog: Option<Catalog>,
    pub view: ViewSettings,
    pub pipeline: PipelineSettings,
}

/// Fixed drawing constants for the sound map.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewSettings {
    /// A cluster glyph is drawn only when its member count is strictly above this.
    pub genre_min_members: usize,
    pub genre_size_scale: f64,
    pub genre_opacity: f64,
    pub highlight_color: String,
    pub highlight_size: f64,
    /// Both axes span `[-axis_range, axis_range]`.
    pub axis_range: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            genre_min_members: 10,
            genre_size_scale: 1.5,
            genre_opacity: 0.2,
            highlight_color: "red".to_string(),
            highlight_size: 15.0,
            axis_range: 1.1,
        }
    }
}

/// Parameters of the offline feature pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub perplexity: f64,
    pub iterations: usize,
    pub clusters: usize,
    pub seed: u64,
    /// Parallel workers. 0 = rayon default.
    pub workers: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            iterations: 1000,
            clusters: 20,
            seed: 0,
            workers: 0,
        }
    }
}

pub const DEFAULT_PORT: u16 = 1238;
pub const DEFAULT_DB_PATH: &str = "soundmap.db";
pub const DEFAULT_SOUND_DIR: &str = "sound";
const LOCAL_CONFIG: &str = "soundmap.toml";

impl AppConfig {
    /// Load config from `explicit`, else `./soundmap.toml`, else
    /// `~/.config/soundmap/config.toml`.
    /// Returns default config if no file exists.
    /// Logs a warning if a file exists but can't be parsed.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let local = PathBuf::from(LOCAL_CONFIG);
                if local.exists() { Some(local) } else { Self::config_path() }
            }
        };

        match path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Some(path) if explicit.is_some() => {
                log::warn!("Config file {} does not exist. Using defaults.", path.display());
                Self::default()
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve the catalog: explicit table > full library > production subset.
    pub fn catalog(&self) -> Catalog {
        match &self.catalog {
            Some(catalog) => catalog.clone(),
            None if self.use_all_sounds => Catalog::full_library(),
            None => Catalog::production(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    pub fn sound_dir(&self) -> PathBuf {
        self.sound_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SOUND_DIR))
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
