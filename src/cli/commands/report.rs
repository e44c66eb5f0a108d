//! `qct report` command - Markdown quality report

use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_date_local, opt_str, truncate_str, Session};
use crate::cli::GlobalOpts;
use crate::core::stats::all_products;
use crate::entities::alert::QualityAlert;
use crate::entities::check::{QualityCheck, QualityState};

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Number of recent failures to list
    #[arg(long, default_value_t = 10)]
    pub failures: usize,
}

pub fn run(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let store = session.store();
    let stages = store.stages();

    let checks: Vec<&QualityCheck> = store.checks().collect();
    let passed = checks.iter().filter(|c| c.quality_state == QualityState::Pass).count();
    let failed = checks.iter().filter(|c| c.quality_state == QualityState::Fail).count();
    let pending = checks.len() - passed - failed;
    let active_points = store.points().filter(|p| p.active).count();

    let mut open_alerts: Vec<&QualityAlert> = store.alerts().filter(|a| !a.is_closed(stages)).collect();
    open_alerts.sort_by(|a, b| {
        let seq = |alert: &QualityAlert| stages.get(&alert.stage).map(|s| s.sequence);
        seq(a).cmp(&seq(b)).then(a.created.cmp(&b.created))
    });

    let mut failures: Vec<&QualityCheck> = checks
        .iter()
        .copied()
        .filter(|c| c.quality_state == QualityState::Fail)
        .collect();
    failures.sort_by(|a, b| b.control_date.cmp(&a.control_date));
    failures.truncate(args.failures);

    let mut output = String::new();
    output.push_str("# Quality Control Report\n\n");

    output.push_str("## Summary\n\n");
    let mut summary = Builder::default();
    summary.push_record(["Metric", "Count"]);
    summary.push_record(["Active Quality Points", &active_points.to_string()]);
    summary.push_record(["Checks", &checks.len().to_string()]);
    summary.push_record(["Passed", &passed.to_string()]);
    summary.push_record(["Failed", &failed.to_string()]);
    summary.push_record(["Pending", &pending.to_string()]);
    summary.push_record(["Open Alerts", &open_alerts.len().to_string()]);
    if passed + failed > 0 {
        let rate = passed as f64 / (passed + failed) as f64 * 100.0;
        summary.push_record(["Pass Rate", &format!("{:.1}%", rate)]);
    }
    output.push_str(&summary.build().with(Style::markdown()).to_string());

    let products = all_products(store);
    if !products.is_empty() {
        output.push_str("\n\n## By Product\n\n");
        let mut table = Builder::default();
        table.push_record(["Product", "Points", "Pass", "Fail", "Pending", "Open Alerts"]);
        for s in &products {
            table.push_record([
                s.product.clone(),
                s.control_point_qty.to_string(),
                s.pass_qty.to_string(),
                s.fail_qty.to_string(),
                s.pending_qty.to_string(),
                s.open_alerts.to_string(),
            ]);
        }
        output.push_str(&table.build().with(Style::markdown()).to_string());
    }

    if !open_alerts.is_empty() {
        output.push_str("\n\n## Open Alerts\n\n");
        let mut table = Builder::default();
        table.push_record(["Alert", "Title", "Stage", "Priority", "Responsible", "Created"]);
        for alert in &open_alerts {
            table.push_record([
                alert.reference.clone(),
                truncate_str(&alert.title, 40),
                alert.stage.clone(),
                alert.priority.to_string(),
                opt_str(&alert.responsible).to_string(),
                format_date_local(&alert.created),
            ]);
        }
        output.push_str(&table.build().with(Style::markdown()).to_string());
    }

    if !failures.is_empty() {
        output.push_str("\n\n## Recent Failures\n\n");
        let mut table = Builder::default();
        table.push_record(["Check", "Title", "Product", "Lot", "Decided"]);
        for check in &failures {
            table.push_record([
                check.reference.clone(),
                truncate_str(&check.title, 40),
                opt_str(&check.product).to_string(),
                opt_str(&check.lot).to_string(),
                check
                    .control_date
                    .as_ref()
                    .map(format_date_local)
                    .unwrap_or_else(|| "-".to_string()),
            ]);
        }
        output.push_str(&table.build().with(Style::markdown()).to_string());
    }
    output.push('\n');

    write_output(&output, args.output)
}

fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
