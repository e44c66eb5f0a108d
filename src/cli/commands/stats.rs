//! `qct stats` command - Quality figures per product

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, escape_csv, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::stats::{all_products, product_stats, ProductQualityStats};

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Product to report on (default: every known product)
    pub product: Option<String>,
}

pub fn run(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let stats = match &args.product {
        Some(product) => vec![product_stats(session.store(), product)],
        None => all_products(session.store()),
    };

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&stats).into_diagnostic()?),
        OutputFormat::Csv => {
            println!("product,control_point_qty,pass_qty,fail_qty,pending_qty,open_alerts");
            for s in &stats {
                println!(
                    "{},{},{},{},{},{}",
                    escape_csv(&s.product),
                    s.control_point_qty,
                    s.pass_qty,
                    s.fail_qty,
                    s.pending_qty,
                    s.open_alerts
                );
            }
        }
        _ => print_table(&stats, global.quiet),
    }
    Ok(())
}

fn pass_rate(stats: &ProductQualityStats) -> String {
    stats
        .pass_rate()
        .map(|r| format!("{:.1}%", r))
        .unwrap_or_else(|| "-".to_string())
}

fn print_table(stats: &[ProductQualityStats], quiet: bool) {
    if stats.is_empty() {
        println!("No products found.");
        return;
    }

    println!(
        "{:<20} {:>7} {:>6} {:>6} {:>8} {:>7} {:>8}",
        style("PRODUCT").bold(),
        style("POINTS").bold(),
        style("PASS").bold(),
        style("FAIL").bold(),
        style("PENDING").bold(),
        style("ALERTS").bold(),
        style("RATE").bold()
    );
    println!("{}", "-".repeat(68));
    for s in stats {
        let fail = if s.fail_qty > 0 {
            style(s.fail_qty).red()
        } else {
            style(s.fail_qty).dim()
        };
        let alerts = if s.open_alerts > 0 {
            style(s.open_alerts).yellow()
        } else {
            style(s.open_alerts).dim()
        };
        println!(
            "{:<20} {:>7} {:>6} {:>6} {:>8} {:>7} {:>8}",
            style(&s.product).cyan(),
            s.control_point_qty,
            style(s.pass_qty).green(),
            fail,
            s.pending_qty,
            alerts,
            pass_rate(s)
        );
    }

    if !quiet {
        println!();
        println!("{} product(s).", style(stats.len()).cyan());
    }
}
