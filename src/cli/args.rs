//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    alert::AlertCommands, check::CheckCommands, completions::CompletionsArgs,
    import::ImportCommands, init::InitArgs, point::PointCommands, report::ReportArgs,
    run::RunArgs, stage::StageCommands, stats::StatsArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "qct")]
#[command(author, version, about = "Quality Control Toolkit")]
#[command(long_about = "A Unix-style toolkit for quality control points, checks and alerts kept as plain text files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .qct/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new QCT project
    Init(InitArgs),

    /// Quality control points (what to inspect and how often)
    #[command(subcommand)]
    Point(PointCommands),

    /// Quality checks (inspections and their decisions)
    #[command(subcommand)]
    Check(CheckCommands),

    /// Quality alerts (escalations through the stage pipeline)
    #[command(subcommand)]
    Alert(AlertCommands),

    /// Alert stage pipeline
    #[command(subcommand)]
    Stage(StageCommands),

    /// Process an operation and create the checks it calls for
    Run(RunArgs),

    /// Quality figures per product
    Stats(StatsArgs),

    /// Markdown quality report
    Report(ReportArgs),

    /// Import records from CSV
    #[command(subcommand)]
    Import(ImportCommands),

    /// Check that every record file parses
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|_| format!("Invalid output format: {}. Use auto, yaml, tsv, json, csv, md, or id", s))
    }
}
