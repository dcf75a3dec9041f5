use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "minesweep", about = "Text-based Minesweeper", version)]
pub struct Args {
    /// Number of rows
    #[arg(long)]
    pub rows: Option<usize>,

    /// Number of columns
    #[arg(long)]
    pub cols: Option<usize>,

    /// Number of mines
    #[arg(long)]
    pub mines: Option<usize>,

    /// Seed for mine placement (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file with `rows`, `cols` and `mines`
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Size of the field and number of mines for a game
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 5,
            mines: 3,
        }
    }
}

impl Settings {
    /// Resolve the game settings: defaults, then the settings file, then explicit flags
    pub fn from_args(args: &Args) -> Result<Self, SettingsError> {
        let settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        Ok(settings.with_overrides(args))
    }

    /// Read settings from a JSON file; missing keys keep their default value
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Self = serde_json::from_str(&text).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("loaded {:?} from {}", settings, path.display());

        Ok(settings)
    }

    fn with_overrides(self, args: &Args) -> Self {
        Self {
            rows: args.rows.unwrap_or(self.rows),
            cols: args.cols.unwrap_or(self.cols),
            mines: args.mines.unwrap_or(self.mines),
        }
    }
}
