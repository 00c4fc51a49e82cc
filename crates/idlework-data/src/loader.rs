//! Data directory loading: format detection, file discovery, and
//! deserialization of catalog lists and balance configuration.
//!
//! A data directory holds:
//!
//! - `resources.{ron,toml,json}` (required)
//! - `structures.{ron,toml,json}` (optional)
//! - `economy.toml` (optional; defaults apply when absent)
//!
//! TOML catalogs keep their list under a top-level `resources` or
//! `structures` key. RON catalogs may write optional fields without `Some(..)`.

use idlework_core::catalog::{ResourceEntry, StructureEntry};
use idlework_core::config::{ConfigError, EconomyConfig};
use idlework_core::engine::{Game, GameBuilder};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ===========================================================================
// Errors
// ===========================================================================

/// Failure to find, read or parse catalog data.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// No file with a supported extension exists for a required base name.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The extension is not RON, TOML or JSON.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The economy config parsed but failed validation.
    #[error("invalid configuration in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Pick a format from a file extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`. More than one match
/// is an error.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Parse a list from text in the given format. TOML lists are read from
/// the array under `toml_key`.
pub fn parse_list<T: DeserializeOwned>(
    content: &str,
    format: Format,
    toml_key: &str,
    path: &Path,
) -> Result<Vec<T>, DataLoadError> {
    match format {
        Format::Ron => ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(content)
            .map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| parse_error(path, e))?;
            let Some(array) = table.get(toml_key) else {
                return Err(parse_error(
                    path,
                    format!("missing key '{toml_key}' in TOML file"),
                ));
            };
            array
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

/// Read a file and parse it as a list, detecting the format from its
/// extension.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_list(&content, format, toml_key, path)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Everything read from one data directory.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub config: EconomyConfig,
    pub resources: Vec<ResourceEntry>,
    pub structures: Vec<StructureEntry>,
}

impl Catalog {
    /// A game builder preloaded with this catalog. Time source and timestamp
    /// store are left to the caller.
    pub fn into_builder(self) -> GameBuilder {
        Game::builder(self.config)
            .resources(self.resources)
            .structures(self.structures)
    }
}

/// Base name of the resource list.
pub const RESOURCES_FILE: &str = "resources";
pub const STRUCTURES_FILE: &str = "structures";
/// Economy settings; always TOML.
pub const CONFIG_FILE: &str = "economy.toml";

/// Load a data directory.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let resources_path = require_data_file(dir, RESOURCES_FILE)?;
    let resources: Vec<ResourceEntry> = deserialize_list(&resources_path, "resources")?;
    debug!(file = %resources_path.display(), count = resources.len(), "read resources");

    let structures = match find_data_file(dir, STRUCTURES_FILE)? {
        Some(path) => {
            let list: Vec<StructureEntry> = deserialize_list(&path, "structures")?;
            debug!(file = %path.display(), count = list.len(), "read structures");
            list
        }
        None => Vec::new(),
    };

    let config_path = dir.join(CONFIG_FILE);
    let config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        EconomyConfig::from_toml_str(&content).map_err(|source| DataLoadError::Config {
            file: config_path.clone(),
            source,
        })?
    } else {
        EconomyConfig::default()
    };

    info!(
        dir = %dir.display(),
        resources = resources.len(),
        structures = structures.len(),
        "catalog loaded"
    );
    Ok(Catalog {
        config,
        resources,
        structures,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
