//! Settings loaded from `config.toml`.
//!
//! ```toml
//! rows = 20
//! columns = 8
//! decimal_places = 3
//! max_exponent = 500
//! seed = 42
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use gridcalc_core::GridOptions;
use gridcalc_engine::engine::{DEFAULT_MAX_EXPONENT, MAX_DECIMALS};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 65_536;
pub const MAX_ROWS: usize = 100_000;
/// Three letters of columns, `A` through `ZZZ`.
pub const MAX_COLUMNS: usize = 18_278;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    pub rows: usize,
    pub columns: usize,
    pub decimal_places: usize,
    pub max_exponent: f64,
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        let options = GridOptions::default();
        Settings {
            rows: options.rows,
            columns: options.columns,
            decimal_places: options.decimal_places,
            max_exponent: DEFAULT_MAX_EXPONENT,
            seed: None,
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str, path: &Path) -> Result<Settings> {
        let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows > MAX_ROWS {
            return Err(ConfigError::Invalid {
                field: "rows",
                expected: "at most 100000",
                value: self.rows.to_string(),
            });
        }
        if self.columns > MAX_COLUMNS {
            return Err(ConfigError::Invalid {
                field: "columns",
                expected: "at most 18278",
                value: self.columns.to_string(),
            });
        }
        if self.decimal_places > MAX_DECIMALS {
            return Err(ConfigError::Invalid {
                field: "decimal_places",
                expected: "at most 12",
                value: self.decimal_places.to_string(),
            });
        }
        if !self.max_exponent.is_finite() || self.max_exponent < 0.0 {
            return Err(ConfigError::Invalid {
                field: "max_exponent",
                expected: "a finite, non-negative number",
                value: self.max_exponent.to_string(),
            });
        }
        Ok(())
    }

    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            rows: self.rows,
            columns: self.columns,
            decimal_places: self.decimal_places,
            max_exponent: self.max_exponent,
            seed: self.seed,
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("me", "shoryuken", "gridcalc")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// Load settings from `explicit`, or from the user config file if present.
/// A missing user config file means defaults; a missing explicit one is an
/// error.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => match user_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(Settings::default()),
        },
    };

    let io_error = |source: std::io::Error| ConfigError::Io {
        path: path.clone(),
        source,
    };
    let size = std::fs::metadata(&path).map_err(io_error)?.len();
    if size > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.clone(),
            size,
            max: MAX_CONFIG_FILE_BYTES,
        });
    }
    let content = std::fs::read_to_string(&path).map_err(io_error)?;
    let settings = Settings::from_toml(&content, &path)?;
    debug!(path = %path.display(), ?settings, "loaded settings");
    Ok(settings)
}
