// Loadboard settings
// Loaded from loadboard.toml (working directory first, then ~/.config/loadboard/)

use std::fs;
use std::path::{Path, PathBuf};

use loadboard_core::search::{SearchField, DEFAULT_SEARCH_FIELDS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "loadboard.toml";

/// Number of header hints the spreadsheet detector scores against.
pub const MAX_HEADER_SCORE: usize = 10;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadboardConfig {
    pub sources: SourcesConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub search: SearchConfig,

    /// Directory relative source locations resolve against.
    /// The config file's directory, or the working directory for defaults.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Snapshot slot name (one file per key in the snapshot dir).
    pub snapshot_key: String,
    /// JSON resource: path or http(s) URL. Unset skips the attempt.
    pub json: Option<String>,
    /// Spreadsheet resource (xlsx/xls/xlsb/ods/csv): path or http(s) URL.
    pub spreadsheet: Option<String>,
    /// Per-request timeout for http(s) sources.
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            snapshot_key: "shipments".to_string(),
            json: Some("data/shipments.json".to_string()),
            spreadsheet: Some("data/shipments.xlsx".to_string()),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpreadsheetConfig {
    /// Rows scanned from the top of the sheet when looking for the header.
    pub header_scan_rows: usize,
    /// Header hints a row must contain to count as the header.
    pub min_header_score: usize,
    /// Country stamped on origin/destination (the sheet carries none).
    pub default_country: String,
    /// Carrier stamped on every row (the sheet carries none).
    pub default_carrier: String,
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: 50,
            min_header_score: 5,
            default_country: "ES".to_string(),
            default_carrier: "Europillow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub fields: Vec<SearchField>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fields: DEFAULT_SEARCH_FIELDS.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// User-level config file path.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadboard")
        .join(CONFIG_FILE_NAME)
}

/// Directory holding snapshot slots.
pub fn snapshot_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadboard")
        .join("snapshots")
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LoadboardConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: LoadboardConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = &self.sources.snapshot_key;
        if key.trim().is_empty() {
            return Err(ConfigError::Validation("sources.snapshot_key must not be empty".into()));
        }
        if key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(ConfigError::Validation(format!(
                "sources.snapshot_key '{key}' must be a plain name, not a path"
            )));
        }

        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::Validation("sources.timeout_secs must be at least 1".into()));
        }

        if self.spreadsheet.header_scan_rows == 0 {
            return Err(ConfigError::Validation(
                "spreadsheet.header_scan_rows must be at least 1".into(),
            ));
        }

        let score = self.spreadsheet.min_header_score;
        if score == 0 || score > MAX_HEADER_SCORE {
            return Err(ConfigError::Validation(format!(
                "spreadsheet.min_header_score must be between 1 and {MAX_HEADER_SCORE}, got {score}"
            )));
        }

        if self.search.fields.is_empty() {
            return Err(ConfigError::Validation("search.fields must list at least one field".into()));
        }

        Ok(())
    }

    /// Read and validate a config file; relative sources resolve against its directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Explicit path if given, else `./loadboard.toml`, else the user config,
    /// else built-in defaults rooted at the working directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        for candidate in [local, config_path()] {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "loading config");
                return Self::from_file(&candidate);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ..Self::default()
        })
    }

    /// Absolute path (or URL) for a configured source location.
    pub fn resolve_location(&self, location: &str) -> String {
        if is_url(location) || Path::new(location).is_absolute() {
            location.to_string()
        } else {
            self.base_dir.join(location).to_string_lossy().into_owned()
        }
    }

    pub fn json_location(&self) -> Option<String> {
        self.sources.json.as_deref().map(|l| self.resolve_location(l))
    }

    pub fn spreadsheet_location(&self) -> Option<String> {
        self.sources.spreadsheet.as_deref().map(|l| self.resolve_location(l))
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
