//! Feed replay: run a JSON-lines script of feed events against a grid.
//!
//! Usage: lgrid replay feed.jsonl --rows 5 [--mode command] [--sort price --numeric]
//!
//! ## Script format
//!
//! One JSON object per line, tagged by `op`:
//!
//! ```text
//! {"op":"update","item":"IBM","fields":{"price":"10.5","qty":3}}
//! {"op":"update","item":"IBM","fields":{"price":"10.6"},"unchanged":{"qty":3}}
//! {"op":"clear","item":"portfolio"}
//! {"op":"remove","key":"IBM"}
//! {"op":"advance","ms":500}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Non-string field
//! values are stored by their JSON text; `null` clears the field.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use livegrid_config::GridSettings;
use livegrid_engine::{CellDescriptor, FeedInfo, GridError, ItemUpdate, StaticGrid, SubscriptionMode};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: {source}")]
    Engine {
        line: usize,
        #[source]
        source: GridError,
    },
    #[error("{0}")]
    Setup(GridError),
}

/// One script operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ScriptOp {
    Update {
        item: String,
        #[serde(default)]
        fields: BTreeMap<String, Value>,
        #[serde(default)]
        unchanged: BTreeMap<String, Value>,
    },
    Clear {
        item: String,
    },
    Remove {
        key: String,
    },
    Advance {
        ms: u64,
    },
}

/// A parsed script line and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub op: ScriptOp,
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub rows: usize,
    pub mode: SubscriptionMode,
    /// Bound fields; derived from the script when empty.
    pub fields: Vec<String>,
    pub sort: Option<String>,
    pub descending: bool,
    pub numeric: bool,
    pub comma_decimal: bool,
    pub add_on_top: bool,
}

pub struct ReplayResult {
    pub grid: StaticGrid,
    pub operations: usize,
    pub fields: Vec<String>,
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptLine>, ReplayError> {
    let text = fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&text)
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, ReplayError> {
    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let op = serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse { line: idx + 1, source })?;
        lines.push(ScriptLine { line: idx + 1, op });
    }
    Ok(lines)
}

/// Every field an update of the script mentions, sorted.
pub fn script_fields(script: &[ScriptLine]) -> Vec<String> {
    let names: BTreeSet<&String> = script
        .iter()
        .filter_map(|line| match &line.op {
            ScriptOp::Update { fields, unchanged, .. } => Some(fields.keys().chain(unchanged.keys())),
            _ => None,
        })
        .flatten()
        .collect();
    names.into_iter().cloned().collect()
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn item_update(item: &str, fields: &BTreeMap<String, Value>, unchanged: &BTreeMap<String, Value>) -> ItemUpdate {
    let mut update = ItemUpdate::new(item);
    for (name, value) in fields {
        update = update.field(name.as_str(), field_text(value).as_deref());
    }
    for (name, value) in unchanged {
        update = update.unchanged(name.as_str(), field_text(value).as_deref());
    }
    update
}

/// Bind the grid, replay every line, then let all timed transitions finish.
pub fn run(script: &[ScriptLine], options: &ReplayOptions, settings: GridSettings) -> Result<ReplayResult, ReplayError> {
    let fields = if options.fields.is_empty() {
        script_fields(script)
    } else {
        options.fields.clone()
    };

    let mut grid = StaticGrid::with_settings("replay", settings);
    let mut element = 0u64;
    let mut cells = Vec::with_capacity(options.rows * fields.len());
    for row in 1..=options.rows {
        for field in &fields {
            element += 1;
            cells.push(CellDescriptor::row(element, row, field.as_str()));
        }
    }
    grid.bind_cells(cells).map_err(ReplayError::Setup)?;
    if let Some(field) = options.sort.as_deref() {
        grid.set_sort(Some(field), options.descending, options.numeric, options.comma_decimal);
    }
    grid.set_add_on_top(options.add_on_top);
    grid.on_listen_start(FeedInfo::new(options.mode).subscribed())
        .map_err(ReplayError::Setup)?;

    let mut operations = 0;
    for ScriptLine { line, op } in script {
        let result = match op {
            ScriptOp::Update { item, fields, unchanged } => grid.on_item_update(&item_update(item, fields, unchanged)),
            ScriptOp::Clear { item } => grid.on_clear_snapshot(item),
            ScriptOp::Remove { key } => grid.apply_removal(key),
            ScriptOp::Advance { ms } => {
                grid.advance(*ms);
                Ok(())
            }
        };
        result.map_err(|source| ReplayError::Engine { line: *line, source })?;
        operations += 1;
    }
    grid.flush();
    log::info!("replayed {} operations, {} rows placed", operations, grid.row_count());

    Ok(ReplayResult {
        grid,
        operations,
        fields,
    })
}
