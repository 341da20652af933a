use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use rowmap::Value;
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
}

/// Global CLI options that affect output
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub no_color: bool,
}

/// Data that can be rendered as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.success)
        } else {
            format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
        };
        println!("{output}");
    }

    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    pub fn heading(&self, text: &str) {
        let output = if self.options.no_color {
            format!("{text}\n{}", "=".repeat(text.len()))
        } else {
            text.color(THEME.primary).bold().to_string()
        };
        println!("{output}");
    }

    /// Print raw text, bypassing any decoration
    pub fn plain(&self, text: &str) {
        println!("{text}");
    }
}

/// Create a themed table with a bold header row
pub fn create_table(options: &GlobalOptions, headers: &[&str]) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| {
            let cell = Cell::new(h).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect();
    table.set_header(header_cells);
    table
}

/// Result of `rowmap compile`
#[derive(Debug, Serialize)]
pub struct CompileReport {
    pub sql: String,
    pub args: Vec<Value>,
}

impl TableDisplay for CompileReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options, &["#", "type", "value"]);
        if self.args.is_empty() {
            table.add_row(vec![Cell::new("-"), Cell::new("-"), Cell::new("no arguments")]);
            return table;
        }
        for (i, arg) in self.args.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(value_kind(arg)),
                Cell::new(display_value(arg)),
            ]);
        }
        table
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Default => "default",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Numeric(_) => "numeric",
        Value::Text(_) => "text",
        Value::Bytes(_) => "bytes",
        Value::Timestamp(_) => "timestamp",
        Value::Uuid(_) => "uuid",
        Value::Json(_) => "json",
        Value::Array(_) => "array",
    }
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Default => "DEFAULT".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Numeric(n) => n.clone(),
        Value::Text(s) => format!("{s:?}"),
        Value::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        Value::Timestamp(ts) => ts.to_rfc3339(),
        Value::Uuid(id) => id.to_string(),
        Value::Json(json) => json.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", inner.join(", "))
        }
    }
}
