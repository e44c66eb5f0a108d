//! `qct init` command - Initialize a new QCT project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::ok_mark;
use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rewrite config and stages even if .qct/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!("{} Created directory {}", ok_mark(), style(path.display()).cyan());
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            tracing::info!(root = %project.root().display(), "project initialized");
            println!(
                "{} Initialized QCT project at {}",
                ok_mark(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!("  {} Define a quality point", style("qct point new").yellow());
            println!("  {} Process an operation", style("qct run <REF> --line PRODUCT").yellow());
            println!("  {} List pending checks", style("qct check list --state none").yellow());
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} QCT project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("qct init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let mut entries = vec![
        ".qct/".to_string(),
        ".qct/config.yaml".to_string(),
        ".qct/stages.yaml".to_string(),
    ];
    entries.extend(
        EntityPrefix::all()
            .iter()
            .map(|p| format!("{}/", Project::entity_directory(*p))),
    );

    for entry in entries {
        if root.join(&entry).exists() {
            println!("  {}", style(entry).dim());
        }
    }
}
