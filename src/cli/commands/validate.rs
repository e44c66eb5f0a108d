//! `qct validate` command - Check that every record file parses and links up

use console::style;
use miette::Result;
use std::collections::BTreeSet;
use std::path::Path;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader::read_record;
use crate::core::project::Project;
use crate::core::store::QualityStore;
use crate::entities::alert::QualityAlert;
use crate::entities::check::QualityCheck;
use crate::entities::point::{CheckKind, QualityPoint};
use crate::entities::stage::StagePipeline;
use crate::yaml::RecordFileError;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Show summary only, don't show individual files
    #[arg(long)]
    pub summary: bool,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    errors: usize,
    warnings: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut stats = ValidationStats::default();

    let total: usize = EntityPrefix::all()
        .iter()
        .map(|p| project.iter_entity_files(*p).count())
        .sum();
    println!("{} Validating {} file(s)...\n", style("→").blue(), total);

    let stages = match QualityStore::load_stages(&project) {
        Ok(stages) => stages,
        Err(e) => {
            stats.errors += 1;
            println!(
                "{} {} - {}",
                style("✗").red(),
                project.stages_path().display(),
                e
            );
            StagePipeline::default()
        }
    };

    let points: Vec<QualityPoint> = parse_all(&project, &args, &mut stats);
    let checks: Vec<QualityCheck> = parse_all(&project, &args, &mut stats);
    let alerts: Vec<QualityAlert> = parse_all(&project, &args, &mut stats);

    let point_ids: BTreeSet<&EntityId> = points.iter().map(|p| &p.id).collect();
    let check_ids: BTreeSet<&EntityId> = checks.iter().map(|c| &c.id).collect();
    let mut issues: Vec<(String, String, bool)> = Vec::new();

    for point in &points {
        if let Err(e) = point.validate() {
            issues.push((point.display_ref(), e.to_string(), true));
        }
    }
    for check in &checks {
        if let CheckKind::Measure(norm) = &check.test {
            if let Err(e) = norm.validate() {
                issues.push((check.display_ref(), e.to_string(), true));
            }
        }
        if let Some(point) = &check.point {
            if !point_ids.contains(point) {
                issues.push((check.display_ref(), format!("links to missing point {}", point), false));
            }
        }
    }
    for alert in &alerts {
        if stages.get(&alert.stage).is_none() {
            issues.push((alert.display_ref(), format!("unknown stage '{}'", alert.stage), true));
        }
        if let Some(check) = &alert.check {
            if !check_ids.contains(check) {
                issues.push((alert.display_ref(), format!("links to missing check {}", check), false));
            }
        }
    }

    for (record, message, is_error) in &issues {
        if *is_error || args.strict {
            stats.errors += 1;
            if !args.summary {
                println!("{} {} - {}", style("✗").red(), record, message);
            }
        } else {
            stats.warnings += 1;
            if !args.summary {
                println!("{} {} - {}", style("!").yellow(), record, message);
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Points:         {}", points.len());
    println!("  Checks:         {}", checks.len());
    println!("  Alerts:         {}", alerts.len());
    println!("  Errors:         {}", style(stats.errors).red());
    if stats.warnings > 0 {
        println!("  Warnings:       {}", style(stats.warnings).yellow());
    }
    println!();

    tracing::debug!(
        files = stats.files_checked,
        errors = stats.errors,
        warnings = stats.warnings,
        "validation finished"
    );

    if stats.errors > 0 {
        Err(miette::miette!(
            "Validation failed: {} error(s)",
            stats.errors
        ))
    } else {
        println!("{} All files passed validation!", style("✓").green().bold());
        Ok(())
    }
}

/// Parse every file of one record type, reporting each failure
fn parse_all<T: Entity>(project: &Project, args: &ValidateArgs, stats: &mut ValidationStats) -> Vec<T> {
    let mut records = Vec::new();
    for path in project.iter_entity_files(T::PREFIX) {
        stats.files_checked += 1;
        match read_record::<T>(&path) {
            Ok(record) => {
                if !args.summary {
                    println!("{} {}", style("✓").green(), relative(project, &path));
                }
                records.push(record);
            }
            Err(e) => {
                stats.errors += 1;
                if !args.summary {
                    println!("{} {}", style("✗").red(), relative(project, &path));
                    match e {
                        RecordFileError::Syntax(e) => println!("{:?}", miette::Report::new(e)),
                        RecordFileError::Io(e) => println!("    {}", style(e).red()),
                    }
                }
            }
        }
    }
    records
}

fn relative(project: &Project, path: &Path) -> String {
    path.strip_prefix(project.root())
        .unwrap_or(path)
        .display()
        .to_string()
}
