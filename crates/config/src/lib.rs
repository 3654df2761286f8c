// Configuration loading
// Loaded from ./loadboard.toml or ~/.config/loadboard/loadboard.toml

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    config_path, snapshot_dir, LoadboardConfig, SearchConfig, SourcesConfig, SpreadsheetConfig,
    CONFIG_FILE_NAME, MAX_HEADER_SCORE,
};
