//! Session configuration and per-build requests.

use crate::class_id::GameType;
use crate::errors::Result;
use crate::export::ExportFormat;
use crate::filter::Filters;
use crate::signal::CompletionSignal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MAPS_DIR_ENV: &str = "ASSETMAP_MAPS_DIR";
const DEFAULT_MAPS_ROOT: &str = "Maps";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<name>.bin` location maps.
    pub maps_root: PathBuf,
    /// Leave low-value entry kinds out of catalogs.
    pub minimal: bool,
    pub game: GameType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maps_root: PathBuf::from(DEFAULT_MAPS_ROOT),
            minimal: true,
            game: GameType::Normal,
        }
    }
}

impl Config {
    /// Defaults, with the maps root taken from `ASSETMAP_MAPS_DIR` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Reads a JSON config file; missing keys keep their defaults and the
    /// environment still overrides the maps root.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Config from `path` when given, otherwise defaults plus environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::from_env()),
        }
    }

    fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(MAPS_DIR_ENV).filter(|d| !d.is_empty()) {
            self.maps_root = PathBuf::from(dir);
        }
    }

    pub fn map_path(&self, map_name: &str) -> PathBuf {
        self.maps_root.join(format!("{map_name}.bin"))
    }
}

/// Where and how a catalog build exports its result.
#[derive(Debug, Clone)]
pub struct CatalogRequest {
    pub save_path: PathBuf,
    pub format: ExportFormat,
    pub filters: Filters,
    pub completion: Option<Arc<CompletionSignal>>,
}

impl CatalogRequest {
    pub fn new(save_path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            save_path: save_path.into(),
            format,
            filters: Filters::default(),
            completion: None,
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_completion(mut self, signal: Arc<CompletionSignal>) -> Self {
        self.completion = Some(signal);
        self
    }
}
