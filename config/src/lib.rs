//! Settings for the STCA simulator.
//!
//! Read from `~/.stca/config.toml`. Every key is optional and falls back to its default;
//! a missing file means all defaults.
//!
//! ```toml
//! [grid]
//! x_cells = 30
//! y_cells = 23
//! states = 2
//!
//! [simulation]
//! automaton = "2011 - Lee, Huang, Zhu"
//! speed_ms = 1
//! seed = 245435
//!
//! [verifier]
//! max_stalls = 100000
//! repeat = false
//!
//! [storage]
//! dir = "."
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stca_utils::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, atomic_write_with_options,
};
use thiserror::Error;
use toml::de::Error as TomlParseError;
use toml_edit::{DocumentMut, Item, Table, value};
use tracing::{debug, warn};

pub const DEFAULT_AUTOMATON: &str = "2011 - Lee, Huang, Zhu";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: TomlParseError,
    },
    #[error("failed to edit config at {}: {source}", path.display())]
    Edit {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("failed to write config at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("could not determine home directory for the config file")]
    NoHome,
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Edit { path, .. }
            | ConfigError::Write { path, .. } => Some(path),
            ConfigError::Invalid { .. } | ConfigError::NoHome => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Columns of a newly created blank configuration.
    pub x_cells: usize,
    /// Rows of a newly created blank configuration.
    pub y_cells: usize,
    /// Number of subcell states; values run from 0 to `states - 1`.
    pub states: u8,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            x_cells: 30,
            y_cells: 23,
            states: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Catalog name or index of the default automaton.
    pub automaton: String,
    /// Delay between simulator attempts.
    pub speed_ms: u64,
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            automaton: DEFAULT_AUTOMATON.to_string(),
            speed_ms: 1,
            seed: 245_435,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierSettings {
    pub max_stalls: u64,
    pub repeat: bool,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            max_stalls: 100_000,
            repeat: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding saved `.con` configurations.
    pub dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub simulation: SimulationSettings,
    pub verifier: VerifierSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load from the default location. A missing file (or no home directory) yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read config at {}: {}", path.display(), err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let settings: Settings = match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Failed to parse config at {}: {}", path.display(), err);
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.x_cells == 0 || self.grid.y_cells == 0 {
            return Err(ConfigError::Invalid {
                key: "grid",
                reason: format!(
                    "dimensions must be non-zero (got {}x{})",
                    self.grid.x_cells, self.grid.y_cells
                ),
            });
        }
        if self.grid.states == 0 {
            return Err(ConfigError::Invalid {
                key: "grid.states",
                reason: "at least one state is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Persist the default automaton to the config file at `path`.
///
/// Uses `toml_edit` so comments and unrelated settings survive. Creates the file and its
/// parent directory if needed.
pub fn persist_automaton(path: &Path, automaton: &str) -> Result<(), ConfigError> {
    let write_err = |source: io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<DocumentMut>()
        .map_err(|source| ConfigError::Edit {
            path: path.to_path_buf(),
            source,
        })?;

    if !doc.contains_key("simulation") {
        doc["simulation"] = Item::Table(Table::new());
    }
    doc["simulation"]["automaton"] = value(automaton);

    let serialized = doc.to_string();
    atomic_write_with_options(
        path,
        serialized.as_bytes(),
        AtomicWriteOptions {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SyncBestEffort,
        },
    )
    .map_err(write_err)?;
    debug!(path = %path.display(), automaton, "persisted default automaton");
    Ok(())
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".stca").join("config.toml"))
}

/// Resolve the settings path: an explicit override, else the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config_path().ok_or(ConfigError::NoHome),
    }
}
