//! `qct stage` command - Alert stage pipeline

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, Session};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum StageCommands {
    /// List alert stages in pipeline order, with alert counts
    List,
}

pub fn run(cmd: StageCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StageCommands::List => run_list(global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let stages = session.store().stages();

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stages).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(stages).into_diagnostic()?),
        OutputFormat::Id => {
            for stage in &stages.stages {
                println!("{}", stage.key);
            }
        }
        _ => {
            println!(
                "{:<4} {:<18} {:<20} {:<6} {}",
                style("SEQ").bold(),
                style("KEY").bold(),
                style("NAME").bold(),
                style("DONE").bold(),
                style("ALERTS").bold()
            );
            println!("{}", "-".repeat(58));
            for stage in &stages.stages {
                let count = session
                    .store()
                    .alerts()
                    .filter(|a| a.stage == stage.key)
                    .count();
                let done = if stage.done {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                println!(
                    "{:<4} {:<18} {:<20} {:<6} {}",
                    stage.sequence,
                    style(&stage.key).cyan(),
                    stage.name,
                    done,
                    count
                );
            }
        }
    }
    Ok(())
}
