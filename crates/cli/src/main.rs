// lboard - shipment loadboard on the command line

mod exit_codes;
mod logging;
mod render;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use loadboard_config::{config_path, ConfigError, LoadboardConfig, CONFIG_FILE_NAME};
use loadboard_core::{BoardQuery, BoardView, Loadboard, PaymentSummary, ShipmentStats, ShipmentStatus, SortDirection, SortField};
use loadboard_io::json::to_json;
use loadboard_io::spreadsheet::parse_spreadsheet;
use loadboard_io::{
    parse_paste, AutoLoader, FileSnapshotStore, PasteError, Resolution, Resolver, ResourceLoader,
    SnapshotStore, SourceError, SourceKind,
};
use serde::Serialize;
use tracing::debug;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_IO, EXIT_PASTE, EXIT_SUCCESS, EXIT_USAGE};

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ncore:    loadboard-core ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

#[derive(Parser)]
#[command(name = "lboard")]
#[command(about = "Shipment loadboard: search, sort and summarize shipment records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./loadboard.toml, then the user config dir)
    #[arg(long, global = true, env = "LOADBOARD_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve shipments and print the board
    #[command(after_help = "\
Sources are tried in order: local snapshot, JSON resource, spreadsheet.

Examples:
  lboard show
  lboard show --search valencia
  lboard show --status delivered --sort total --desc
  lboard show --json | jq '.rows[].id'")]
    Show {
        /// Case-insensitive text search (id, cities, carrier, remitter, consignee)
        #[arg(long, short)]
        search: Option<String>,

        /// Only shipments with this status (e.g. delivered, in-transit, out-for-delivery)
        #[arg(long)]
        status: Option<String>,

        /// Sort column (e.g. id, total, weight_kg, eta, last_seen)
        #[arg(long, value_name = "FIELD")]
        sort: Option<SortField>,

        /// Sort descending (requires --sort)
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print only the summary cards and the paid/due/totals header
    Summary {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Load shipments from pasted JSON instead of the configured sources
    #[command(after_help = "\
Accepts a JSON array of shipments, or an object with a `data` array.

Examples:
  lboard paste shipments.json
  pbpaste | lboard paste --save
  lboard paste - --json < shipments.json")]
    Paste {
        /// JSON file (omit or `-` for stdin)
        input: Option<PathBuf>,

        /// Also store the pasted records in the local snapshot
        #[arg(long)]
        save: bool,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Convert a spreadsheet (xlsx/xls/ods/csv) into a raw shipment JSON array
    #[command(after_help = "\
Examples:
  lboard import albaranes.xlsx
  lboard import albaranes.xlsx -o data/shipments.json
  lboard import https://example.com/albaranes.xlsx")]
    Import {
        /// Spreadsheet path or http(s) URL
        spreadsheet: String,

        /// Output file (omit for stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage the local snapshot slot
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// Validate JSON and store it in the snapshot slot
    Save {
        /// JSON file (omit or `-` for stdin)
        input: Option<PathBuf>,
    },
    /// Remove the snapshot slot
    Clear,
    /// Print the stored snapshot
    Show,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print which config file is in use
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_arg = cli.config.as_deref();
    let result = match cli.command {
        None => {
            eprintln!("Usage: lboard <command> [options]");
            eprintln!("       lboard --help for more information");
            Ok(())
        }
        Some(Commands::Show {
            search,
            status,
            sort,
            desc,
            json,
        }) => cmd_show(config_arg, search, status, sort, desc, json),
        Some(Commands::Summary { json }) => cmd_summary(config_arg, json),
        Some(Commands::Paste { input, save, json }) => cmd_paste(config_arg, input, save, json),
        Some(Commands::Import {
            spreadsheet,
            output,
        }) => cmd_import(config_arg, spreadsheet, output),
        Some(Commands::Snapshot(snapshot_cmd)) => match snapshot_cmd {
            SnapshotCommands::Save { input } => cmd_snapshot_save(config_arg, input),
            SnapshotCommands::Clear => cmd_snapshot_clear(config_arg),
            SnapshotCommands::Show => cmd_snapshot_show(config_arg),
        },
        Some(Commands::Config(config_cmd)) => match config_cmd {
            ConfigCommands::Show => cmd_config_show(config_arg),
            ConfigCommands::Path => cmd_config_path(config_arg),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Read { .. } => Some("check the --config path".to_string()),
            ConfigError::Parse(_) | ConfigError::Validation(_) => {
                Some(format!("fix {CONFIG_FILE_NAME}; every section and key is optional"))
            }
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }
}

impl From<PasteError> for CliError {
    fn from(err: PasteError) -> Self {
        Self {
            code: EXIT_PASTE,
            message: err.to_string(),
            hint: Some("paste a JSON array of shipments, or {\"data\": [...]}".to_string()),
        }
    }
}

impl From<SourceError> for CliError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Io { .. } | SourceError::Http { .. } | SourceError::Status { .. } => {
                Self::io(err.to_string())
            }
            SourceError::NoHeader { .. } => Self::general(err.to_string())
                .with_hint("the header row needs column names like Fecha, Albarán, Remitente, Kg, Portes, IVA, Total"),
            _ => Self::general(err.to_string()),
        }
    }
}

// ============================================================================
// Shared plumbing
// ============================================================================

struct Context {
    config: LoadboardConfig,
    store: FileSnapshotStore,
}

impl Context {
    fn load(config_arg: Option<&Path>) -> Result<Self, CliError> {
        let config = LoadboardConfig::load(config_arg)?;
        let store = FileSnapshotStore::default_location();
        debug!(
            base_dir = %config.base_dir.display(),
            snapshots = %store.dir().display(),
            "context ready"
        );
        Ok(Self { config, store })
    }

    fn key(&self) -> &str {
        &self.config.sources.snapshot_key
    }

    fn loader(&self, base_dir: &Path) -> AutoLoader {
        AutoLoader::new(base_dir, Duration::from_secs(self.config.sources.timeout_secs))
    }

    fn resolve(&self) -> Resolution {
        let loader = self.loader(&self.config.base_dir);
        Resolver::new(&self.config, &self.store, &loader).resolve()
    }

    fn board(&self, resolution: &Resolution) -> Loadboard {
        Loadboard::from_raw(&resolution.records).with_search_fields(self.config.search.fields.clone())
    }
}

/// File contents, or stdin for `None` / `-`.
fn read_input(input: Option<&Path>) -> Result<String, CliError> {
    match input {
        None => read_stdin(),
        Some(path) if path.as_os_str() == "-" => read_stdin(),
        Some(path) => fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e))),
    }
}

fn read_stdin() -> Result<String, CliError> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| CliError::io(format!("cannot read stdin: {}", e)))?;
    Ok(text)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("cannot serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

#[derive(Serialize)]
struct BoardOutput<'a> {
    source: SourceKind,
    description: &'a str,
    #[serde(flatten)]
    view: BoardView<'a>,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    source: SourceKind,
    description: &'a str,
    stats: ShipmentStats,
    payments: PaymentSummary,
}

fn print_board(
    resolution: &Resolution,
    board: &Loadboard,
    query: &BoardQuery,
    json: bool,
) -> Result<(), CliError> {
    let view = board.view(query);
    if json {
        return print_json(&BoardOutput {
            source: resolution.source,
            description: &resolution.description,
            view,
        });
    }
    if resolution.is_empty() {
        println!("{}", resolution.description);
        return Ok(());
    }
    print!("{}", render::board(&resolution.description, &view));
    Ok(())
}

// ============================================================================
// show / summary
// ============================================================================

fn cmd_show(
    config_arg: Option<&Path>,
    search: Option<String>,
    status: Option<String>,
    sort: Option<SortField>,
    desc: bool,
    json: bool,
) -> Result<(), CliError> {
    let ctx = Context::load(config_arg)?;

    let status = match status.as_deref().map(str::trim) {
        Some("") => return Err(CliError::args("--status needs a value")),
        Some(s) => Some(ShipmentStatus::parse_loose(s)),
        None => None,
    };
    let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
    let query = BoardQuery {
        search: search.unwrap_or_default(),
        status,
        sort: sort.map(|field| (field, direction)),
    };

    let resolution = ctx.resolve();
    let board = ctx.board(&resolution);
    print_board(&resolution, &board, &query, json)
}

fn cmd_summary(config_arg: Option<&Path>, json: bool) -> Result<(), CliError> {
    let ctx = Context::load(config_arg)?;
    let resolution = ctx.resolve();
    let board = ctx.board(&resolution);

    if json {
        return print_json(&SummaryOutput {
            source: resolution.source,
            description: &resolution.description,
            stats: board.stats(),
            payments: board.payments(),
        });
    }
    print!("{}", render::summary(&resolution.description, &board.stats(), &board.payments()));
    Ok(())
}

// ============================================================================
// paste / import
// ============================================================================

fn cmd_paste(
    config_arg: Option<&Path>,
    input: Option<PathBuf>,
    save: bool,
    json: bool,
) -> Result<(), CliError> {
    let mut ctx = Context::load(config_arg)?;
    let text = read_input(input.as_deref())?;
    let records = parse_paste(&text)?;
    let resolution = Resolution::from_paste(records);

    if save {
        let key = ctx.key().to_string();
        ctx.store.set(&key, &to_json(&resolution.records, false))?;
        eprintln!("saved {} records to snapshot '{}'", resolution.records.len(), key);
    }

    let board = ctx.board(&resolution);
    print_board(&resolution, &board, &BoardQuery::default(), json)
}

fn cmd_import(
    config_arg: Option<&Path>,
    spreadsheet: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let ctx = Context::load(config_arg)?;
    // Arguments are relative to the working directory, not the config file.
    let loader = ctx.loader(Path::new("."));
    let bytes = loader.fetch(&spreadsheet)?;
    let records = parse_spreadsheet(&bytes, &spreadsheet, &ctx.config.spreadsheet, Utc::now())?;
    let text = to_json(&records, true);

    match output {
        Some(path) => {
            fs::write(&path, format!("{text}\n"))
                .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
            eprintln!("imported {} records to {}", records.len(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

// ============================================================================
// snapshot
// ============================================================================

fn cmd_snapshot_save(config_arg: Option<&Path>, input: Option<PathBuf>) -> Result<(), CliError> {
    let mut ctx = Context::load(config_arg)?;
    let text = read_input(input.as_deref())?;
    let records = parse_paste(&text)?;

    let key = ctx.key().to_string();
    ctx.store.set(&key, &to_json(&records, false))?;
    eprintln!(
        "saved {} records to snapshot '{}' ({})",
        records.len(),
        key,
        ctx.store.slot_path(&key).display()
    );
    Ok(())
}

fn cmd_snapshot_clear(config_arg: Option<&Path>) -> Result<(), CliError> {
    let mut ctx = Context::load(config_arg)?;
    let key = ctx.key().to_string();
    ctx.store.clear(&key)?;
    eprintln!("cleared snapshot '{}'", key);
    Ok(())
}

fn cmd_snapshot_show(config_arg: Option<&Path>) -> Result<(), CliError> {
    let ctx = Context::load(config_arg)?;
    match ctx.store.get(ctx.key())? {
        Some(text) => println!("{}", text),
        None => eprintln!("snapshot '{}' is empty", ctx.key()),
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_show(config_arg: Option<&Path>) -> Result<(), CliError> {
    let config = LoadboardConfig::load(config_arg)?;
    print!("{}", config.to_toml_string());
    Ok(())
}

/// The file `LoadboardConfig::load` would read, or a note that none exists.
fn cmd_config_path(config_arg: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = config_arg {
        println!("{}", path.display());
        return Ok(());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        let absolute = std::env::current_dir()
            .map(|dir| dir.join(&local))
            .unwrap_or(local);
        println!("{}", absolute.display());
        return Ok(());
    }

    let user = config_path();
    println!("{}", user.display());
    if !user.is_file() {
        eprintln!("note: no config file found; built-in defaults are in use");
    }
    Ok(())
}
