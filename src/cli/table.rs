//! Table formatting for CLI list commands
//!
//! Commands build [`TableRow`]s of typed cells; the formatter renders them
//! as an aligned terminal table, CSV, Markdown or a bare ID list.

use chrono::{DateTime, Local, Utc};
use console::style;

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::entity::Priority;
use crate::core::identity::EntityId;
use crate::core::shortid::ShortIdIndex;
use crate::entities::check::QualityState;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after table (e.g., "5 check(s) found")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl TableConfig {
    /// No summary line (for `--quiet` and piping)
    pub fn for_pipe() -> Self {
        Self {
            show_summary: false,
        }
    }
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Plain text, truncated to the column
    Text(String),
    /// Check decision with color coding
    State(QualityState),
    /// Alert stage key; done stages are shown dim
    Stage { key: String, done: bool },
    Priority(Priority),
    /// Enumerated kind (test type, frequency)
    Type(String),
    /// Optional measured value
    Measure(Option<f64>),
    /// Active/archived flag
    Active(bool),
    /// DateTime displayed with time
    DateTime(DateTime<Utc>),
    Number(i64),
    Empty,
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Text)
    }
}

impl CellValue {
    /// Format for terminal output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Text(s) | CellValue::Type(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            CellValue::State(state) => {
                let s = state.to_string();
                let styled = match state {
                    QualityState::Pass => style(s).green(),
                    QualityState::Fail => style(s).red().bold(),
                    QualityState::None => style(s).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Stage { key, done } => {
                let styled = if *done {
                    style(key.clone()).dim()
                } else {
                    style(key.clone()).yellow()
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Priority(priority) => {
                let s = priority.to_string();
                let styled = match priority {
                    Priority::Low => style(s).dim(),
                    Priority::Normal => style(s).white(),
                    Priority::High => style(s).yellow(),
                    Priority::Urgent => style(s).red().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Active(active) => {
                let styled = if *active {
                    style("active").green()
                } else {
                    style("archived").dim()
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Measure(_) | CellValue::Number(_) => {
                format!("{:>width$}", self.raw(), width = width)
            }
            CellValue::DateTime(_) | CellValue::Empty => {
                let raw = self.raw();
                let shown = if raw.is_empty() { "-".to_string() } else { raw };
                format!("{:<width$}", shown, width = width)
            }
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = self.raw();
        if raw.is_empty() {
            "-".to_string()
        } else {
            raw.replace('|', "\\|")
        }
    }

    /// Raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) | CellValue::Type(s) => s.clone(),
            CellValue::State(state) => state.to_string(),
            CellValue::Stage { key, .. } => key.clone(),
            CellValue::Priority(priority) => priority.to_string(),
            CellValue::Measure(value) => value.map(|v| v.to_string()).unwrap_or_default(),
            CellValue::Active(true) => "active".to_string(),
            CellValue::Active(false) => "archived".to_string(),
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d %H:%M").to_string()
            }
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        self.raw().chars().count().max(1)
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub short_id: String,
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: &EntityId, short_ids: &ShortIdIndex) -> Self {
        let short_id = short_ids
            .get_short_id(id)
            .map(|n| format!("{}@{}", id.prefix(), n))
            .unwrap_or_default();
        Self {
            short_id,
            full_id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    entity_prefix: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str, entity_prefix: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            entity_prefix,
            config: TableConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the specified format
    pub fn output(&self, rows: Vec<TableRow>, format: OutputFormat) {
        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.full_id);
                }
            }
            _ => self.output_tsv(&rows),
        }
    }

    /// Dynamic column widths, capped at each column's declared width
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let short_width = rows
            .iter()
            .map(|r| r.short_id.len())
            .max()
            .unwrap_or(0)
            .max(5);

        std::iter::once(short_width)
            .chain(self.columns.iter().map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header.len().max(max_content + 2).min(col.width)
            }))
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let mut header = vec![format!("{:<width$}", style("SHORT").bold().dim(), width = widths[0])];
        for (col, width) in self.columns.iter().zip(&widths[1..]) {
            header.push(format!("{:<width$}", style(col.header).bold(), width = *width));
        }
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let mut parts = vec![format!("{:<width$}", style(&row.short_id).cyan(), width = widths[0])];
            for (col, width) in self.columns.iter().zip(&widths[1..]) {
                match row.get(col.key) {
                    Some(value) => parts.push(value.format_tsv(*width)),
                    None => parts.push(format!("{:<width$}", "-", width = *width)),
                }
            }
            println!("{}", parts.join(" "));
        }

        if self.config.show_summary {
            println!();
            println!(
                "{} {}(s) found. Use {} to reference by short ID.",
                style(rows.len()).cyan(),
                self.entity_name,
                style(format!("{}@N", self.entity_prefix)).cyan()
            );
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut headers = vec!["short_id".to_string(), "id".to_string()];
        headers.extend(self.columns.iter().map(|c| c.key.to_string()));
        println!("{}", headers.join(","));

        for row in rows {
            let mut values = vec![escape_csv(&row.short_id), escape_csv(&row.full_id)];
            for col in self.columns {
                values.push(row.get(col.key).map(CellValue::format_csv).unwrap_or_default());
            }
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut headers = vec!["Short".to_string(), "ID".to_string()];
        headers.extend(self.columns.iter().map(|c| c.header.to_string()));
        println!("| {} |", headers.join(" | "));

        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));

        for row in rows {
            let mut values = vec![row.short_id.clone(), row.full_id.clone()];
            for col in self.columns {
                values.push(
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            println!("| {} |", values.join(" | "));
        }
    }
}
