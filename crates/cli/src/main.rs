// livegrid CLI - replay feed scripts against a headless grid

mod exit_codes;
mod replay;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use livegrid_config::{GridSettings, SettingsError};
use livegrid_engine::{GridSnapshot, SubscriptionMode};

use exit_codes::{EXIT_ENGINE, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};
use replay::{ReplayError, ReplayOptions};

#[derive(Parser)]
#[command(name = "lgrid")]
#[command(about = "Replay live feed scripts against a headless grid")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines feed script and print the resulting grid
    #[command(after_help = "\
Examples:
  lgrid replay quotes.jsonl --rows 5
  lgrid replay trades.jsonl --rows 3 --mode distinct --add-on-top
  lgrid replay book.jsonl --rows 10 --mode command --sort price --numeric --descending
  lgrid replay quotes.jsonl --rows 5 --fields name,price --json")]
    Replay {
        /// Path to the script (one JSON operation per line)
        script: PathBuf,

        /// Number of bound rows
        #[arg(long, default_value_t = 10)]
        rows: usize,

        /// Subscription mode of the replayed feed
        #[arg(long, value_enum, default_value_t = Mode::Merge)]
        mode: Mode,

        /// Bound fields, comma-separated (default: every field the script updates)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Keep rows sorted by this field
        #[arg(long, value_name = "FIELD")]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        descending: bool,

        /// Compare sort values as numbers
        #[arg(long, requires = "sort")]
        numeric: bool,

        /// Numbers use ',' as the decimal separator
        #[arg(long, requires = "numeric")]
        comma_decimal: bool,

        /// New rows enter at the top (ignored while sorting)
        #[arg(long)]
        add_on_top: bool,

        /// Print the grid snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Quiet mode - only print errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Show the effective grid settings
    Settings {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Merge,
    Raw,
    Distinct,
    Command,
}

impl From<Mode> for SubscriptionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Merge => SubscriptionMode::Merge,
            Mode::Raw => SubscriptionMode::Raw,
            Mode::Distinct => SubscriptionMode::Distinct,
            Mode::Command => SubscriptionMode::Command,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: lgrid <command> [options]");
            eprintln!("       lgrid --help for more information");
            Ok(())
        }
        Some(Commands::Replay {
            script,
            rows,
            mode,
            fields,
            sort,
            descending,
            numeric,
            comma_decimal,
            add_on_top,
            json,
            quiet,
        }) => {
            let options = ReplayOptions {
                rows,
                mode: mode.into(),
                fields,
                sort,
                descending,
                numeric,
                comma_decimal,
                add_on_top,
            };
            cmd_replay(script, options, cli.config, json, quiet)
        }
        Some(Commands::Settings { json }) => cmd_settings(cli.config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ENGINE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReplayError> for CliError {
    fn from(err: ReplayError) -> Self {
        let message = err.to_string();
        match err {
            ReplayError::Read { .. } => CliError::io(message),
            ReplayError::Parse { .. } => CliError::parse(message)
                .with_hint("each line must be an object with \"op\": update, clear, remove or advance"),
            ReplayError::Engine { .. } => CliError::engine(message),
            ReplayError::Setup(_) => CliError::args(message),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        let message = err.to_string();
        match err {
            SettingsError::Read { .. } => CliError::io(message),
            SettingsError::Parse { .. } | SettingsError::Invalid { .. } => CliError::args(message),
        }
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<GridSettings, CliError> {
    match config {
        Some(path) => Ok(GridSettings::load_from(&path)?),
        None => Ok(GridSettings::load()),
    }
}

fn cmd_replay(
    script: PathBuf,
    options: ReplayOptions,
    config: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    if options.rows == 0 {
        return Err(CliError::args("--rows must be at least 1"));
    }
    let settings = load_settings(config)?;
    let lines = replay::load_script(&script)?;
    let result = replay::run(&lines, &options, settings)?;

    let snapshot = result.grid.snapshot();
    if json {
        let text = snapshot
            .to_json()
            .map_err(|e| CliError::engine(format!("cannot serialize grid: {}", e)))?;
        println!("{}", text);
    } else {
        print!("{}", render_table(&snapshot, &result.fields));
    }

    if !quiet {
        eprintln!(
            "Replayed {} operations, {} rows ({} bound)",
            result.operations,
            result.grid.row_count(),
            result.grid.max_row()
        );
    }
    Ok(())
}

fn cmd_settings(config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let path = config.clone().unwrap_or_else(GridSettings::config_path);
    let settings = load_settings(config)?;

    if json {
        let text = serde_json::to_string_pretty(&settings)
            .map_err(|e| CliError::engine(format!("cannot serialize settings: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("file: {}{}", path.display(), if path.exists() { "" } else { " (missing, defaults)" });
    println!("fifo.maxHoles                {}", settings.fifo_max_holes);
    println!("model.cleanOnFirstSubscribe  {}", settings.clean_on_first_subscribe);
    println!("model.cleanOnLastUnsubscribe {}", settings.clean_on_last_unsubscribe);
    println!("visual.hotTimeMs             {}", settings.hot_time_ms);
    println!("visual.coldToHotTimeMs       {}", settings.cold_to_hot_time_ms);
    println!("visual.hotToColdTimeMs       {}", settings.hot_to_cold_time_ms);
    println!("visual.fadeIntervalMs        {}", settings.fade_interval_ms);
    Ok(())
}

/// Aligned text table: row, key, then what each bound field shows.
fn render_table(snapshot: &GridSnapshot, fields: &[String]) -> String {
    let mut header = vec!["row".to_string(), "key".to_string()];
    header.extend(fields.iter().cloned());

    let body: Vec<Vec<String>> = snapshot
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut cells = vec![(idx + 1).to_string(), row.key.clone()];
            cells.extend(fields.iter().map(|field| {
                row.cells
                    .get(field)
                    .map(|cell| cell.content.clone())
                    .unwrap_or_default()
            }));
            cells
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for cells in std::iter::once(&header).chain(body.iter()) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
