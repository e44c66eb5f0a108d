//! `qct run` command - Process an operation against the quality points
//!
//! # Usage
//!
//! ```bash
//! # Receipt of two products, one of them lot-tracked
//! qct run WH/IN/00042 --type receipts --line SHAFT-10:LOT-7 --line BEARING-6204
//!
//! # What would be created, without writing anything
//! qct run WH/IN/00043 --line SHAFT-10 --dry-run
//! ```

use console::style;
use miette::{IntoDiagnostic, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cli::helpers::{effective_format, ok_mark, opt_str, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::service::{Operation, OperationLine, PlannedCheck};

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Operation reference (e.g. WH/IN/00042)
    pub reference: String,

    /// Operation type (e.g. receipts, delivery, manufacturing)
    #[arg(long = "type", short = 't')]
    pub operation_type: Option<String>,

    /// Product line as PRODUCT or PRODUCT:LOT (repeatable)
    #[arg(long = "line", short = 'l', required = true, value_parser = parse_line)]
    pub lines: Vec<OperationLine>,

    /// Show the checks that would be created without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Seed for random frequency sampling (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parse `PRODUCT[:LOT]`
fn parse_line(s: &str) -> std::result::Result<OperationLine, String> {
    let (product, lot) = match s.split_once(':') {
        Some((product, lot)) => (product.trim(), Some(lot.trim())),
        None => (s.trim(), None),
    };
    if product.is_empty() {
        return Err(format!("Invalid line '{}': product is required", s));
    }
    Ok(OperationLine {
        product: product.to_string(),
        lot: lot.filter(|l| !l.is_empty()).map(str::to_string),
    })
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let operation = Operation {
        reference: args.reference,
        operation_type: args.operation_type,
        lines: args.lines,
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let ctx = session.ctx.clone();
    let planned = session
        .service
        .process_operation(&operation, &ctx, &mut rng, args.dry_run)
        .map_err(|e| miette::miette!("{}", e))?;

    if !args.dry_run {
        session.commit()?;
    }

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = planned.iter().map(|p| planned_json(&session, p)).collect();
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let rows: Vec<serde_json::Value> = planned.iter().map(|p| planned_json(&session, p)).collect();
            print!("{}", serde_yml::to_string(&rows).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for id in planned.iter().filter_map(|p| p.check.as_ref()) {
                println!("{}", id);
            }
        }
        _ => print_summary(&session, &operation, &planned, args.dry_run),
    }

    Ok(())
}

fn check_reference(session: &Session, planned: &PlannedCheck) -> String {
    planned
        .check
        .as_ref()
        .and_then(|id| session.store().check(id))
        .map(|c| c.reference.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn planned_json(session: &Session, planned: &PlannedCheck) -> serde_json::Value {
    serde_json::json!({
        "check": planned.check.as_ref().map(|id| id.to_string()),
        "reference": planned.check.as_ref().map(|_| check_reference(session, planned)),
        "point": planned.point.to_string(),
        "point_ref": planned.point_ref,
        "title": planned.title,
        "product": planned.product,
        "lot": planned.lot,
    })
}

fn print_summary(session: &Session, operation: &Operation, planned: &[PlannedCheck], dry_run: bool) {
    if planned.is_empty() {
        println!(
            "No quality checks needed for operation {}",
            style(&operation.reference).cyan()
        );
        return;
    }

    if dry_run {
        println!(
            "{} Would create {} check(s) for operation {}",
            style("→").blue(),
            style(planned.len()).cyan(),
            style(&operation.reference).cyan()
        );
    } else {
        println!(
            "{} Created {} check(s) for operation {}",
            ok_mark(),
            style(planned.len()).cyan(),
            style(&operation.reference).cyan()
        );
    }

    for p in planned {
        println!(
            "   {:<10} {:<10} {:<30} {:<14} {}",
            style(check_reference(session, p)).cyan(),
            p.point_ref,
            p.title,
            opt_str(&p.product),
            opt_str(&p.lot)
        );
    }
}
