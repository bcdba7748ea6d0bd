//! Result rendering
//!
//! - stdout = table, JSON or template output only
//! - stderr = prompts, progress, logs and errors

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::OnceLock;

use anyhow::anyhow;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::framework::error::{CliError, CliResult};

/// Gap between table columns.
const COLUMN_GAP: &str = "    ";

/// One displayable column: the key used by `--format` and templates, and its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
}

/// Every column a displayer knows, plus the ones shown without `--format`.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSet {
    pub all: &'static [Column],
    pub default: &'static [&'static str],
}

impl ColumnSet {
    pub fn keys(&self) -> Vec<&'static str> {
        self.all.iter().map(|c| c.key).collect()
    }

    /// Columns named in a comma separated `--format`, or the defaults when empty.
    pub fn select(&self, format: &str) -> CliResult<Vec<Column>> {
        let wanted: Vec<&str> = if format.trim().is_empty() {
            self.default.to_vec()
        } else {
            format.split(',').map(str::trim).filter(|k| !k.is_empty()).collect()
        };
        wanted
            .into_iter()
            .map(|key| {
                self.all.iter().copied().find(|c| c.key == key).ok_or_else(|| {
                    CliError::invalid_arg(format!(
                        "unknown column {key:?}; valid columns: {}",
                        self.keys().join(", ")
                    ))
                })
            })
            .collect()
    }
}

/// Cells keyed by column key.
pub type Row = BTreeMap<&'static str, Value>;

/// A result that can be rendered by [`Output`].
pub trait Displayable {
    fn columns(&self) -> &ColumnSet;

    fn rows(&self) -> Vec<Row>;

    /// The native JSON form, when the result has one.
    fn json(&self) -> Option<Value> {
        None
    }

    /// Whether JSON cells keep their natural type; strings otherwise.
    fn typed_cells(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Template,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> CliResult<Self> {
        match raw {
            "" | "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "template" => Ok(Self::Template),
            other => Err(CliError::invalid_arg(format!(
                "unknown output format {other:?}; valid formats: table, json, template"
            ))),
        }
    }
}

/// Output handler for one invocation.
#[derive(Debug, Clone)]
pub struct Output {
    pub format: OutputFormat,
    /// Column list for tables, template body for templates.
    pub spec: String,
    pub no_header: bool,
}

impl Output {
    pub fn display(&self, w: &mut dyn Write, item: &dyn Displayable) -> CliResult<()> {
        match self.format {
            OutputFormat::Table => {
                let columns = item.columns().select(&self.spec)?;
                write_table(w, &columns, &item.rows(), !self.no_header)?;
            }
            OutputFormat::Json => write_json(w, item)?,
            OutputFormat::Template => {
                if self.spec.trim().is_empty() {
                    return Err(CliError::invalid_arg("template output requires a --format template"));
                }
                for row in item.rows() {
                    writeln!(w, "{}", expand(&self.spec, &row))?;
                }
            }
        }
        Ok(())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

fn write_table(w: &mut dyn Write, columns: &[Column], rows: &[Row], header: bool) -> CliResult<()> {
    let mut lines: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    if header {
        lines.push(columns.iter().map(|c| c.header.to_string()).collect());
    }
    for row in rows {
        lines.push(
            columns
                .iter()
                .map(|c| row.get(c.key).map(cell_text).unwrap_or_default())
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| lines.iter().map(|l| l[i].chars().count()).max().unwrap_or(0))
        .collect();

    for line in &lines {
        let mut text = String::new();
        for (i, cell) in line.iter().enumerate() {
            if i + 1 == line.len() {
                text.push_str(cell);
            } else {
                text.push_str(cell);
                text.extend(std::iter::repeat(' ').take(widths[i] - cell.chars().count()));
                text.push_str(COLUMN_GAP);
            }
        }
        writeln!(w, "{text}")?;
    }
    Ok(())
}

fn write_json(w: &mut dyn Write, item: &dyn Displayable) -> CliResult<()> {
    let value = match item.json() {
        Some(value) => value,
        None => {
            let typed = item.typed_cells();
            let keys = item.columns().keys();
            Value::Array(
                item.rows()
                    .into_iter()
                    .map(|row| {
                        let mut obj = Map::new();
                        for key in &keys {
                            let cell = row.get(key).cloned().unwrap_or(Value::Null);
                            let cell = if typed { cell } else { Value::String(cell_text(&cell)) };
                            obj.insert((*key).to_string(), cell);
                        }
                        Value::Object(obj)
                    })
                    .collect(),
            )
        }
    };
    let text = serde_json::to_string_pretty(&value)
        .map_err(|err| CliError::internal(anyhow!(err).context("Failed to encode JSON output")))?;
    writeln!(w, "{text}")?;
    Ok(())
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z0-9_]+)\s*\}\}").unwrap_or_else(|err| panic!("placeholder pattern: {err}"))
    })
}

/// Expand `{{.Column}}` placeholders; undefined columns render empty.
fn expand(template: &str, row: &Row) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            row.get(&caps[1]).map(cell_text).unwrap_or_default()
        })
        .into_owned()
}
