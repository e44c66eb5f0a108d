//! `qct import` command - Import quality points from CSV files
//!
//! Rows are validated and staged in memory; files are written only once
//! the whole import succeeded (or, with `--skip-errors`, for the rows that
//! did).

use clap::Subcommand;
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::helpers::{ok_mark, truncate_str, Session};
use crate::cli::GlobalOpts;
use crate::entities::point::{CheckKind, Frequency, MeasureNorm, PeriodUnit, QualityPoint, TestType};

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Import quality points
    Points(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: Option<PathBuf>,

    /// Print a CSV template instead of importing
    #[arg(long)]
    pub template: bool,

    /// Validate CSV without creating files
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,
}

const HEADERS: &[&str] = &[
    "title",
    "product",
    "operation_types",
    "test_type",
    "frequency",
    "percent",
    "interval",
    "unit",
    "norm",
    "tolerance_min",
    "tolerance_max",
    "unit_of_measure",
    "instructions",
    "failure_message",
    "team",
    "sequence",
    "tags",
];

const EXAMPLE: &[&str] = &[
    "\"Shaft diameter\"",
    "SHAFT-10",
    "\"receipts;manufacturing\"",
    "measure",
    "periodical",
    "",
    "1",
    "week",
    "10.0",
    "9.95",
    "10.05",
    "mm",
    "\"Measure with the calibrated micrometer\"",
    "\"Quarantine the lot\"",
    "incoming",
    "10",
    "\"dimensional,critical\"",
];

/// Import statistics
#[derive(Default)]
struct ImportStats {
    rows_processed: usize,
    created: usize,
    errors: usize,
}

pub fn run(cmd: ImportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ImportCommands::Points(args) => run_points(args, global),
    }
}

fn run_points(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        println!("{}", HEADERS.join(","));
        println!("{}", EXAMPLE.join(","));
        eprintln!();
        eprintln!(
            "{} Template generated. Redirect to file: qct import points --template > points.csv",
            style("→").blue()
        );
        return Ok(());
    }

    let file_path = args
        .file
        .clone()
        .ok_or_else(|| miette::miette!("CSV file required. Usage: qct import points points.csv"))?;
    if !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    let mut session = Session::open(global)?;
    let ctx = session.ctx.clone();

    println!(
        "{} Importing quality points from {}{}",
        style("→").blue(),
        style(file_path.display()).yellow(),
        if args.dry_run {
            style(" (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );
    println!();

    let file = File::open(&file_path).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("title") {
        return Err(miette::miette!("CSV has no 'title' column"));
    }

    let mut stats = ImportStats::default();
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        stats.rows_processed += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {}", e))
            .and_then(|record| point_from_record(&record, &header_map, &ctx.user))
            .and_then(|point| {
                let title = point.title.clone();
                let created = if args.dry_run {
                    point.validate().map(|_| None)
                } else {
                    session.service.create_point(point, &ctx).map(Some)
                };
                created.map(|id| (id, title)).map_err(|e| e.to_string())
            });

        match outcome {
            Ok((id, title)) => {
                stats.created += 1;
                match id.and_then(|id| session.store().point(&id).map(|p| p.reference.clone())) {
                    Some(reference) => println!(
                        "{} Row {}: Created {} - {}",
                        ok_mark(),
                        row_num,
                        style(reference).cyan(),
                        truncate_str(&title, 40)
                    ),
                    None => println!(
                        "{} Row {}: Would create {}",
                        style("○").dim(),
                        row_num,
                        truncate_str(&title, 40)
                    ),
                }
            }
            Err(message) => {
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, message);
                stats.errors += 1;
                if !args.skip_errors {
                    return Err(miette::miette!(
                        "Import aborted at row {}: {} (nothing was written)",
                        row_num,
                        message
                    ));
                }
            }
        }
    }

    if !args.dry_run {
        session.commit()?;
    }
    tracing::info!(
        file = %file_path.display(),
        rows = stats.rows_processed,
        created = stats.created,
        errors = stats.errors,
        dry_run = args.dry_run,
        "point import finished"
    );

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed: {}", style(stats.rows_processed).cyan());
    println!(
        "  {}  {}",
        if args.dry_run { "Would create:" } else { "Created:     " },
        style(stats.created).green()
    );
    if stats.errors > 0 {
        println!("  Errors:         {}", style(stats.errors).red());
    }
    if args.dry_run {
        println!();
        println!("{}", style("Dry run complete. No files were created.").yellow());
    }

    Ok(())
}

/// Build one point from a CSV row
fn point_from_record(
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
    author: &str,
) -> std::result::Result<QualityPoint, String> {
    let field = |name: &str| get_field(record, header_map, name);
    let number = |name: &str| -> std::result::Result<Option<f64>, String> {
        field(name)
            .map(|v| v.parse::<f64>().map_err(|_| format!("'{}' is not a number in column '{}'", v, name)))
            .transpose()
    };

    let title = field("title").ok_or_else(|| "Missing required field 'title'".to_string())?;

    let test_type = field("test_type")
        .map(|t| t.parse::<TestType>())
        .transpose()?
        .unwrap_or(TestType::PassFail);
    let norm = match (number("norm")?, number("tolerance_min")?, number("tolerance_max")?) {
        (Some(norm), Some(min), Some(max)) => {
            let mut norm = MeasureNorm::new(norm, min, max);
            norm.unit = field("unit_of_measure");
            Some(norm)
        }
        _ => None,
    };
    let test = CheckKind::from_test_type(test_type, norm).map_err(|e| e.to_string())?;

    let interval = field("interval")
        .map(|v| v.parse::<u32>().map_err(|_| format!("'{}' is not a valid interval", v)))
        .transpose()?;
    let unit = field("unit").map(|u| u.parse::<PeriodUnit>()).transpose()?;
    let frequency = Frequency::from_parts(
        field("frequency").as_deref().unwrap_or("all"),
        number("percent")?,
        interval,
        unit,
    )
    .map_err(|e| e.to_string())?;

    let mut point = QualityPoint::new(title, test, author.to_string());
    point.product = field("product");
    point.operation_types = split_list(field("operation_types"));
    point.frequency = frequency;
    point.instructions = field("instructions");
    point.failure_message = field("failure_message");
    point.team = field("team");
    point.tags = split_list(field("tags"));
    if let Some(sequence) = field("sequence") {
        point.sequence = sequence
            .parse()
            .map_err(|_| format!("'{}' is not a valid sequence", sequence))?;
    }
    Ok(point)
}

/// Split a `a;b` or `a,b` cell into trimmed items
fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split([',', ';'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build a map of header names to column indices
fn build_header_map(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().to_string(), i))
        .collect()
}

/// Get a field value from a CSV record
fn get_field(record: &csv::StringRecord, header_map: &HashMap<String, usize>, field: &str) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv_text: &str) -> Vec<std::result::Result<QualityPoint, String>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_text.as_bytes());
        let header_map = build_header_map(&rdr.headers().unwrap().clone());
        rdr.records()
            .map(|r| point_from_record(&r.unwrap(), &header_map, "qa"))
            .collect()
    }

    #[test]
    fn test_template_columns_line_up() {
        assert_eq!(HEADERS.len(), EXAMPLE.len());
    }

    #[test]
    fn test_measure_point_from_row() {
        let rows = parse(
            "title,product,operation_types,test_type,frequency,interval,unit,norm,tolerance_min,tolerance_max,unit_of_measure\n\
             Shaft diameter,SHAFT-10,receipts;manufacturing,measure,periodical,2,weeks,10,9.9,10.1,mm\n",
        );
        let point = rows[0].as_ref().unwrap();
        assert_eq!(point.title, "Shaft diameter");
        assert_eq!(point.product.as_deref(), Some("SHAFT-10"));
        assert_eq!(point.operation_types, vec!["receipts", "manufacturing"]);
        assert_eq!(point.test_type(), TestType::Measure);
        assert_eq!(point.test.norm().unwrap().unit.as_deref(), Some("mm"));
        assert_eq!(
            point.frequency,
            Frequency::Periodical {
                interval: 2,
                unit: PeriodUnit::Week
            }
        );
    }

    #[test]
    fn test_defaults_for_sparse_row() {
        let rows = parse("title\nVisual inspection\n");
        let point = rows[0].as_ref().unwrap();
        assert_eq!(point.test_type(), TestType::PassFail);
        assert_eq!(point.frequency, Frequency::All);
        assert!(point.product.is_none());
        assert!(point.operation_types.is_empty());
    }

    #[test]
    fn test_row_errors() {
        let rows = parse(
            "title,test_type,percent,frequency\n\
             ,pass_fail,,\n\
             Bore,measure,,\n\
             Scratch,pass_fail,abc,random\n\
             Colour,x-ray,,\n",
        );
        assert!(rows[0].as_ref().unwrap_err().contains("title"));
        assert!(rows[1].as_ref().unwrap_err().contains("norm"));
        assert!(rows[2].as_ref().unwrap_err().contains("not a number"));
        assert!(rows[3].as_ref().unwrap_err().contains("Invalid test type"));
    }
}
