//! `qct point` command - Quality control point management

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, ok_mark, Session};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::entities::point::{CheckKind, Frequency, MeasureNorm, PeriodUnit, QualityPoint, TestType};

#[derive(Subcommand, Debug)]
pub enum PointCommands {
    /// List quality points with filtering
    List(ListArgs),

    /// Create a new quality point
    New(NewArgs),

    /// Show a point's details
    Show(ShowArgs),

    /// Edit a point in your editor
    Edit(EditArgs),

    /// Archive a point so it stops generating checks
    Archive(IdArgs),

    /// Restore an archived point
    Restore(IdArgs),

    /// Delete a point that no check references
    Delete(IdArgs),
}

/// Active/archived filter
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ActiveFilter {
    Active,
    Archived,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    Reference,
    Title,
    Sequence,
    Created,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by product
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Filter by test type (instructions, pass_fail, measure, picture)
    #[arg(long, short = 'T')]
    pub test: Option<TestType>,

    /// Filter by archive status
    #[arg(long, default_value = "active")]
    pub status: ActiveFilter,

    /// Search in title and instructions
    #[arg(long)]
    pub search: Option<String>,

    /// Sort by field
    #[arg(long, default_value = "sequence")]
    pub sort: SortField,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Point title (required unless interactive)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Product the point applies to (default: every product)
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Operation types the point applies to (repeatable; default: every operation)
    #[arg(long = "operation-type", short = 'o')]
    pub operation_types: Vec<String>,

    /// Test type
    #[arg(long, short = 'T', default_value = "pass_fail")]
    pub test: TestType,

    /// Target value for measure tests
    #[arg(long)]
    pub norm: Option<f64>,

    /// Lowest acceptable measurement
    #[arg(long)]
    pub min: Option<f64>,

    /// Highest acceptable measurement
    #[arg(long)]
    pub max: Option<f64>,

    /// Unit of measure (e.g. mm)
    #[arg(long)]
    pub unit: Option<String>,

    /// Frequency policy (all, random, periodical)
    #[arg(long, default_value = "all")]
    pub frequency: String,

    /// Percentage of operations checked (random frequency)
    #[arg(long)]
    pub percent: Option<f64>,

    /// Window length (periodical frequency)
    #[arg(long)]
    pub interval: Option<u32>,

    /// Window unit (periodical frequency)
    #[arg(long)]
    pub period: Option<PeriodUnit>,

    /// Instructions shown to the operator
    #[arg(long)]
    pub instructions: Option<String>,

    /// Message shown when the check fails
    #[arg(long)]
    pub failure_message: Option<String>,

    /// Quality team in charge
    #[arg(long)]
    pub team: Option<String>,

    /// Ordering among points of an operation
    #[arg(long, default_value_t = 10)]
    pub sequence: u32,

    /// Tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Point ID, reference (QCP00001) or short ID (QCP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Point ID, reference (QCP00001) or short ID (QCP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Point ID, reference (QCP00001) or short ID (QCP@N)
    pub id: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("reference", "REF", 10),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("product", "PRODUCT", 16),
    ColumnDef::new("test", "TEST", 14),
    ColumnDef::new("frequency", "FREQUENCY", 18),
    ColumnDef::new("sequence", "SEQ", 5),
    ColumnDef::new("status", "STATUS", 10),
];

/// Run a point subcommand
pub fn run(cmd: PointCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PointCommands::List(args) => run_list(args, global),
        PointCommands::New(args) => run_new(args, global),
        PointCommands::Show(args) => run_show(args, global),
        PointCommands::Edit(args) => run_edit(args, global),
        PointCommands::Archive(args) => run_archive(args, global, true),
        PointCommands::Restore(args) => run_archive(args, global, false),
        PointCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;

    let mut points: Vec<QualityPoint> = session
        .store()
        .points()
        .filter(|p| match args.status {
            ActiveFilter::Active => p.active,
            ActiveFilter::Archived => !p.active,
            ActiveFilter::All => true,
        })
        .filter(|p| {
            args.product
                .as_deref()
                .map_or(true, |product| p.product.as_deref().map_or(true, |pp| pp == product))
        })
        .filter(|p| args.test.map_or(true, |t| p.test_type() == t))
        .filter(|p| {
            args.search.as_ref().map_or(true, |search| {
                let search = search.to_lowercase();
                p.title.to_lowercase().contains(&search)
                    || p.instructions
                        .as_ref()
                        .is_some_and(|i| i.to_lowercase().contains(&search))
            })
        })
        .cloned()
        .collect();

    match args.sort {
        SortField::Reference => points.sort_by(|a, b| a.reference.cmp(&b.reference)),
        SortField::Title => points.sort_by(|a, b| a.title.cmp(&b.title)),
        SortField::Sequence => {
            points.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.reference.cmp(&b.reference)))
        }
        SortField::Created => points.sort_by(|a, b| a.created.cmp(&b.created)),
    }
    if args.reverse {
        points.reverse();
    }
    if let Some(limit) = args.limit {
        points.truncate(limit);
    }

    if args.count {
        println!("{}", points.len());
        return Ok(());
    }
    if points.is_empty() {
        println!("No quality points found.");
        return Ok(());
    }

    session.remember_listing(EntityPrefix::Qcp, points.iter().map(|p| p.id.clone()).collect());

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&points).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&points).into_diagnostic()?);
        }
        format => {
            let rows = points
                .iter()
                .map(|p| {
                    TableRow::new(&p.id, &session.short_ids)
                        .cell("reference", CellValue::Text(p.reference.clone()))
                        .cell("title", CellValue::Text(p.title.clone()))
                        .cell("product", CellValue::from(p.product.clone()))
                        .cell("test", CellValue::Type(p.test_type().to_string()))
                        .cell("frequency", CellValue::Type(p.frequency.to_string()))
                        .cell("sequence", CellValue::Number(i64::from(p.sequence)))
                        .cell("status", CellValue::Active(p.active))
                })
                .collect();
            let config = if global.quiet {
                TableConfig::for_pipe()
            } else {
                TableConfig::default()
            };
            TableFormatter::new(COLUMNS, "quality point", "QCP")
                .with_config(config)
                .output(rows, format);
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;

    let (title, test_type) = if args.interactive || args.title.is_none() {
        use dialoguer::{Input, Select};

        let title: String = Input::new()
            .with_prompt("Point title")
            .interact_text()
            .into_diagnostic()?;

        let options = ["pass_fail", "measure", "instructions", "picture"];
        let idx = Select::new()
            .with_prompt("Test type")
            .items(&options)
            .default(0)
            .interact()
            .into_diagnostic()?;
        let test_type = options[idx]
            .parse::<TestType>()
            .map_err(|e| miette::miette!("{}", e))?;
        (title, test_type)
    } else {
        let title = args
            .title
            .clone()
            .ok_or_else(|| miette::miette!("Title is required (use --title or -t)"))?;
        (title, args.test)
    };

    let norm = match (args.norm, args.min, args.max) {
        (Some(norm), Some(min), Some(max)) => {
            let mut norm = MeasureNorm::new(norm, min, max);
            norm.unit = args.unit.clone();
            Some(norm)
        }
        (None, None, None) => None,
        _ => {
            return Err(miette::miette!(
                "Measure tests need all of --norm, --min and --max"
            ))
        }
    };
    let test = CheckKind::from_test_type(test_type, norm).map_err(|e| miette::miette!("{}", e))?;
    let frequency = Frequency::from_parts(&args.frequency, args.percent, args.interval, args.period)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut point = QualityPoint::new(title, test, session.ctx.user.clone());
    point.product = args.product;
    point.operation_types = args.operation_types;
    point.frequency = frequency;
    point.instructions = args.instructions;
    point.failure_message = args.failure_message;
    point.team = args.team;
    point.sequence = args.sequence;
    point.tags = args.tag;

    let ctx = session.ctx.clone();
    let id = session
        .service
        .create_point(point, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    let point = session
        .store()
        .point(&id)
        .ok_or_else(|| miette::miette!("Point {} vanished after creation", id))?;
    let file_path = session.project.entity_path(&id);

    println!(
        "{} Created quality point {}",
        ok_mark(),
        style(&point.reference).cyan()
    );
    if !global.quiet {
        println!("   {}", style(file_path.display()).dim());
        println!(
            "   {} | {} | {}",
            style(point.test_type()).yellow(),
            style(&point.frequency).yellow(),
            style(&point.title).white()
        );
    }

    if args.edit {
        println!();
        println!("Opening in {}...", style(session.config.editor()).yellow());
        session.config.run_editor(&file_path).into_diagnostic()?;
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qcp, &args.id)?;
    let point = session
        .store()
        .point(&id)
        .ok_or_else(|| miette::miette!("No quality point found matching '{}'", args.id))?;

    match effective_format(global, &session.config, OutputFormat::Yaml) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(point).into_diagnostic()?),
        OutputFormat::Id => println!("{}", point.id),
        _ => print!("{}", serde_yml::to_string(point).into_diagnostic()?),
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qcp, &args.id)?;
    let path = session.project.entity_path(&id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(session.config.editor()).yellow()
    );
    session.config.run_editor(&path).into_diagnostic()?;
    Ok(())
}

fn run_archive(args: IdArgs, global: &GlobalOpts, archive: bool) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qcp, &args.id)?;
    let ctx = session.ctx.clone();

    let result = if archive {
        session.service.archive_point(&id, &ctx)
    } else {
        session.service.restore_point(&id, &ctx)
    };
    result.map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    let reference = session.display_id(&id, &args.id);
    println!(
        "{} {} quality point {}",
        ok_mark(),
        if archive { "Archived" } else { "Restored" },
        style(reference).cyan()
    );
    Ok(())
}

fn run_delete(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qcp, &args.id)?;
    let ctx = session.ctx.clone();

    let point = session
        .service
        .delete_point(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    println!(
        "{} Deleted quality point {} ({})",
        ok_mark(),
        style(&point.reference).cyan(),
        point.title
    );
    Ok(())
}
