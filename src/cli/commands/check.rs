//! `qct check` command - Quality check inspection and decisions

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, ok_mark, opt_str, print_action, Session};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::service::NewCheck;
use crate::entities::check::{MeasureSuccess, QualityCheck, QualityState};
use crate::entities::point::{CheckKind, TestType};

#[derive(Subcommand, Debug)]
pub enum CheckCommands {
    /// List quality checks with filtering
    List(ListArgs),

    /// Create a check by hand (from a point or standalone)
    New(NewArgs),

    /// Show a check's details
    Show(IdArgs),

    /// Mark a check as passed
    Pass(PassArgs),

    /// Mark a check as failed
    Fail(IdArgs),

    /// Record a measurement and decide the check from the tolerances
    Measure(MeasureArgs),

    /// Raise a quality alert from a failed check
    Alert(IdArgs),

    /// List alerts raised from a check
    Alerts(IdArgs),

    /// Put a decided check back to pending (administrators only)
    Reset(ResetArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by decision state (none, pass, fail)
    #[arg(long, short = 's')]
    pub state: Option<QualityState>,

    /// Filter by product
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Filter by operation reference
    #[arg(long, short = 'o')]
    pub operation: Option<String>,

    /// Filter by point (ID, reference or short ID)
    #[arg(long)]
    pub point: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Point to instantiate (ID, reference or short ID)
    #[arg(long)]
    pub point: Option<String>,

    /// Check title (defaults to the point's title)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Test type override
    #[arg(long, short = 'T')]
    pub test: Option<TestType>,

    /// Product inspected
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Lot or serial number
    #[arg(long)]
    pub lot: Option<String>,

    /// Operation reference
    #[arg(long, short = 'o')]
    pub operation: Option<String>,

    /// Free-form note
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Check ID, reference (QC00001) or short ID (QC@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct PassArgs {
    /// Check ID, reference (QC00001) or short ID (QC@N)
    pub id: String,

    /// Picture to attach as evidence (required for picture checks)
    #[arg(long)]
    pub picture: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct MeasureArgs {
    /// Check ID, reference (QC00001) or short ID (QC@N)
    pub id: String,

    /// Measured value
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
}

#[derive(clap::Args, Debug)]
pub struct ResetArgs {
    /// Check ID, reference (QC00001) or short ID (QC@N)
    pub id: String,

    /// Why the decision is being undone
    #[arg(long)]
    pub reason: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("reference", "REF", 10),
    ColumnDef::new("title", "TITLE", 28),
    ColumnDef::new("product", "PRODUCT", 14),
    ColumnDef::new("lot", "LOT", 10),
    ColumnDef::new("operation", "OPERATION", 16),
    ColumnDef::new("test", "TEST", 12),
    ColumnDef::new("measure", "MEASURE", 9),
    ColumnDef::new("state", "STATE", 6),
];

/// Run a check subcommand
pub fn run(cmd: CheckCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CheckCommands::List(args) => run_list(args, global),
        CheckCommands::New(args) => run_new(args, global),
        CheckCommands::Show(args) => run_show(args, global),
        CheckCommands::Pass(args) => run_pass(args, global),
        CheckCommands::Fail(args) => run_fail(args, global),
        CheckCommands::Measure(args) => run_measure(args, global),
        CheckCommands::Alert(args) => run_alert(args, global),
        CheckCommands::Alerts(args) => run_alerts(args, global),
        CheckCommands::Reset(args) => run_reset(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let point = args
        .point
        .as_deref()
        .map(|p| session.resolve(EntityPrefix::Qcp, p))
        .transpose()?;

    let mut checks: Vec<QualityCheck> = session
        .store()
        .checks()
        .filter(|c| args.state.map_or(true, |s| c.quality_state == s))
        .filter(|c| {
            args.product
                .as_deref()
                .map_or(true, |p| c.product.as_deref() == Some(p))
        })
        .filter(|c| {
            args.operation
                .as_deref()
                .map_or(true, |o| c.operation.as_deref() == Some(o))
        })
        .filter(|c| point.as_ref().map_or(true, |p| c.point.as_ref() == Some(p)))
        .cloned()
        .collect();

    checks.sort_by(|a, b| {
        a.operation
            .cmp(&b.operation)
            .then(a.sequence.cmp(&b.sequence))
            .then(a.created.cmp(&b.created))
            .then(a.reference.cmp(&b.reference))
    });
    if let Some(limit) = args.limit {
        checks.truncate(limit);
    }

    if args.count {
        println!("{}", checks.len());
        return Ok(());
    }
    if checks.is_empty() {
        println!("No quality checks found.");
        return Ok(());
    }

    session.remember_listing(EntityPrefix::Qc, checks.iter().map(|c| c.id.clone()).collect());

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&checks).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&checks).into_diagnostic()?);
        }
        format => {
            let rows = checks
                .iter()
                .map(|c| {
                    TableRow::new(&c.id, &session.short_ids)
                        .cell("reference", CellValue::Text(c.reference.clone()))
                        .cell("title", CellValue::Text(c.title.clone()))
                        .cell("product", CellValue::from(c.product.clone()))
                        .cell("lot", CellValue::from(c.lot.clone()))
                        .cell("operation", CellValue::from(c.operation.clone()))
                        .cell("test", CellValue::Type(c.test_type().to_string()))
                        .cell("measure", CellValue::Measure(c.measure))
                        .cell("state", CellValue::State(c.quality_state))
                })
                .collect();
            let config = if global.quiet {
                TableConfig::for_pipe()
            } else {
                TableConfig::default()
            };
            TableFormatter::new(COLUMNS, "check", "QC")
                .with_config(config)
                .output(rows, format);
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let point = args
        .point
        .as_deref()
        .map(|p| session.resolve(EntityPrefix::Qcp, p))
        .transpose()?;

    // A measure override has no norm to carry, so only the point can supply one
    let test = match args.test {
        Some(TestType::Measure) => {
            let norm = point
                .as_ref()
                .and_then(|p| session.store().point(p))
                .and_then(|p| p.test.norm().cloned());
            Some(CheckKind::from_test_type(TestType::Measure, norm).map_err(|e| miette::miette!("{}", e))?)
        }
        Some(t) => Some(CheckKind::from_test_type(t, None).map_err(|e| miette::miette!("{}", e))?),
        None => None,
    };

    let new = NewCheck {
        title: args.title,
        point,
        test,
        product: args.product,
        lot: args.lot,
        operation: args.operation,
        operation_type: None,
        note: args.note,
    };
    let ctx = session.ctx.clone();
    let id = session
        .service
        .create_check(new, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    if let Some(check) = session.store().check(&id) {
        println!(
            "{} Created quality check {}",
            ok_mark(),
            style(&check.reference).cyan()
        );
        if !global.quiet {
            println!(
                "   {} | {}",
                style(check.test_type()).yellow(),
                style(&check.title).white()
            );
        }
    }
    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let check = session
        .store()
        .check(&id)
        .ok_or_else(|| miette::miette!("No quality check found matching '{}'", args.id))?;

    match effective_format(global, &session.config, OutputFormat::Yaml) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(check).into_diagnostic()?),
        OutputFormat::Id => println!("{}", check.id),
        _ => print!("{}", serde_yml::to_string(check).into_diagnostic()?),
    }
    Ok(())
}

fn run_pass(args: PassArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let ctx = session.ctx.clone();

    if let Some(picture) = args.picture {
        session
            .service
            .attach_picture(&id, picture)
            .map_err(|e| miette::miette!("{}", e))?;
    }
    let action = session
        .service
        .pass(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    print_decision(&session, &id, QualityState::Pass);
    print_action(&session, &action);
    Ok(())
}

fn run_fail(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let ctx = session.ctx.clone();

    let action = session
        .service
        .fail(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    print_decision(&session, &id, QualityState::Fail);
    if let Some(message) = session.store().check(&id).and_then(|c| c.failure_message.as_ref()) {
        println!("   {}", style(message).red());
    }
    print_action(&session, &action);
    Ok(())
}

fn run_measure(args: MeasureArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let ctx = session.ctx.clone();

    let success = session
        .service
        .record_measure(&id, args.value)
        .map_err(|e| miette::miette!("{}", e))?;
    tracing::debug!(check = %id, value = args.value, %success, "measurement recorded");

    let (state, action) = session
        .service
        .measure(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    if let Some(check) = session.store().check(&id) {
        if let Some(norm) = check.test.norm() {
            let within = if success == MeasureSuccess::Pass {
                style("within").green()
            } else {
                style("outside").red()
            };
            println!(
                "   {} {} tolerance [{}, {}]{}",
                args.value,
                within,
                norm.tolerance_min,
                norm.tolerance_max,
                norm.unit.as_deref().map(|u| format!(" {}", u)).unwrap_or_default()
            );
        }
    }
    print_decision(&session, &id, state);
    print_action(&session, &action);
    Ok(())
}

fn run_alert(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let ctx = session.ctx.clone();

    let action = session
        .service
        .do_alert(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    let reference = session
        .store()
        .check(&id)
        .map(|c| c.reference.clone())
        .unwrap_or_default();
    println!(
        "{} Raised quality alert from check {}",
        ok_mark(),
        style(reference).cyan()
    );
    print_action(&session, &action);
    Ok(())
}

fn run_alerts(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let action = session
        .service
        .see_alerts(&id)
        .map_err(|e| miette::miette!("{}", e))?;
    print_action(&session, &action);
    Ok(())
}

fn run_reset(args: ResetArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qc, &args.id)?;
    let ctx = session.ctx.clone();

    session
        .service
        .reset_check(&id, &ctx, args.reason)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    print_decision(&session, &id, QualityState::None);
    Ok(())
}

fn print_decision(session: &Session, id: &EntityId, state: QualityState) {
    let Some(check) = session.store().check(id) else {
        return;
    };
    let verdict = match state {
        QualityState::Pass => style("pass").green().bold(),
        QualityState::Fail => style("fail").red().bold(),
        QualityState::None => style("none").dim(),
    };
    println!(
        "{} Check {} is now {} ({})",
        ok_mark(),
        style(&check.reference).cyan(),
        verdict,
        opt_str(&check.responsible)
    );
}
