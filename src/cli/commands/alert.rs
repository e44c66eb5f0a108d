//! `qct alert` command - Quality alert management

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{effective_format, ok_mark, opt_str, Session};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Priority;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::alert::QualityAlert;

#[derive(Subcommand, Debug)]
pub enum AlertCommands {
    /// List quality alerts with filtering
    List(ListArgs),

    /// Create an alert by hand
    New(NewArgs),

    /// Show an alert's details
    Show(IdArgs),

    /// Edit an alert in your editor
    Edit(IdArgs),

    /// Move an alert forward to a stage
    #[command(alias = "stage")]
    Move(MoveArgs),

    /// Advance an alert to the next stage
    Advance(IdArgs),

    /// Close an alert (first done stage)
    Close(IdArgs),

    /// Reopen an alert (back to the first stage)
    Reopen(IdArgs),

    /// Assign an alert to someone
    Assign(AssignArgs),

    /// Record the root cause of an alert
    Cause(CauseArgs),
}

/// Open/closed filter
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StatusFilter {
    Open,
    Closed,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by stage key or name
    #[arg(long, short = 's')]
    pub stage: Option<String>,

    /// Filter by open/closed
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,

    /// Filter by product
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Filter by priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Filter by responsible
    #[arg(long)]
    pub responsible: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Alert title (required unless interactive)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Priority (normal, low, high, urgent)
    #[arg(long, default_value = "normal")]
    pub priority: Priority,

    /// Description of the problem
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Product concerned
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Lot or serial number concerned
    #[arg(long)]
    pub lot: Option<String>,

    /// Quality team in charge
    #[arg(long)]
    pub team: Option<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Alert ID, reference (QA00001) or short ID (QA@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    /// Alert ID, reference (QA00001) or short ID (QA@N)
    pub id: String,

    /// Target stage key or name
    pub stage: String,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Alert ID, reference (QA00001) or short ID (QA@N)
    pub id: String,

    /// Person in charge (defaults to the acting user)
    pub user: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CauseArgs {
    /// Alert ID, reference (QA00001) or short ID (QA@N)
    pub id: String,

    /// Root cause; omit to pick from the configured reasons
    pub reason: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("reference", "REF", 10),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("product", "PRODUCT", 14),
    ColumnDef::new("stage", "STAGE", 16),
    ColumnDef::new("priority", "PRIORITY", 9),
    ColumnDef::new("responsible", "RESPONSIBLE", 14),
    ColumnDef::new("created", "CREATED", 17),
];

/// Run an alert subcommand
pub fn run(cmd: AlertCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AlertCommands::List(args) => run_list(args, global),
        AlertCommands::New(args) => run_new(args, global),
        AlertCommands::Show(args) => run_show(args, global),
        AlertCommands::Edit(args) => run_edit(args, global),
        AlertCommands::Move(args) => run_move(args, global),
        AlertCommands::Advance(args) => run_advance(args, global),
        AlertCommands::Close(args) => run_close(args, global),
        AlertCommands::Reopen(args) => run_reopen(args, global),
        AlertCommands::Assign(args) => run_assign(args, global),
        AlertCommands::Cause(args) => run_cause(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let stages = session.store().stages().clone();
    let stage = args
        .stage
        .as_deref()
        .map(|s| stages.resolve(s).map(|st| st.key.clone()))
        .transpose()
        .map_err(|e| miette::miette!("{}", e))?;

    let mut alerts: Vec<QualityAlert> = session
        .store()
        .alerts()
        .filter(|a| stage.as_ref().map_or(true, |s| &a.stage == s))
        .filter(|a| match args.status {
            StatusFilter::Open => !a.is_closed(&stages),
            StatusFilter::Closed => a.is_closed(&stages),
            StatusFilter::All => true,
        })
        .filter(|a| {
            args.product
                .as_deref()
                .map_or(true, |p| a.product.as_deref() == Some(p))
        })
        .filter(|a| args.priority.map_or(true, |p| a.priority == p))
        .filter(|a| {
            args.responsible
                .as_deref()
                .map_or(true, |r| a.responsible.as_deref() == Some(r))
        })
        .cloned()
        .collect();

    // Kanban order: stage sequence, then most urgent first
    alerts.sort_by(|a, b| {
        let seq = |alert: &QualityAlert| stages.get(&alert.stage).map(|s| s.sequence);
        seq(a)
            .cmp(&seq(b))
            .then(urgency(b.priority).cmp(&urgency(a.priority)))
            .then(a.created.cmp(&b.created))
    });
    if let Some(limit) = args.limit {
        alerts.truncate(limit);
    }

    if args.count {
        println!("{}", alerts.len());
        return Ok(());
    }
    if alerts.is_empty() {
        println!("No quality alerts found.");
        return Ok(());
    }

    session.remember_listing(EntityPrefix::Qa, alerts.iter().map(|a| a.id.clone()).collect());

    match effective_format(global, &session.config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alerts).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&alerts).into_diagnostic()?);
        }
        format => {
            let rows = alerts
                .iter()
                .map(|a| {
                    TableRow::new(&a.id, &session.short_ids)
                        .cell("reference", CellValue::Text(a.reference.clone()))
                        .cell("title", CellValue::Text(a.title.clone()))
                        .cell("product", CellValue::from(a.product.clone()))
                        .cell(
                            "stage",
                            CellValue::Stage {
                                key: a.stage.clone(),
                                done: stages.is_done(&a.stage),
                            },
                        )
                        .cell("priority", CellValue::Priority(a.priority))
                        .cell("responsible", CellValue::from(a.responsible.clone()))
                        .cell("created", CellValue::DateTime(a.created))
                })
                .collect();
            let config = if global.quiet {
                TableConfig::for_pipe()
            } else {
                TableConfig::default()
            };
            TableFormatter::new(COLUMNS, "alert", "QA")
                .with_config(config)
                .output(rows, format);
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;

    let (title, priority) = if args.interactive || args.title.is_none() {
        use dialoguer::{Input, Select};

        let title: String = Input::new()
            .with_prompt("Alert title")
            .interact_text()
            .into_diagnostic()?;

        let priorities = [Priority::Normal, Priority::Low, Priority::High, Priority::Urgent];
        let labels: Vec<String> = priorities.iter().map(|p| p.to_string()).collect();
        let idx = Select::new()
            .with_prompt("Priority")
            .items(&labels)
            .default(0)
            .interact()
            .into_diagnostic()?;
        (title, priorities[idx])
    } else {
        let title = args
            .title
            .clone()
            .ok_or_else(|| miette::miette!("Title is required (use --title or -t)"))?;
        (title, args.priority)
    };

    let ctx = session.ctx.clone();
    let mut alert = QualityAlert::new(title, session.store().stages(), &ctx);
    alert.priority = priority;
    alert.description = args.description;
    alert.product = args.product;
    alert.lot = args.lot;
    alert.team = args.team;

    let id = session
        .service
        .create_alert(alert, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    let file_path = session.project.entity_path(&id);
    if let Some(alert) = session.store().alert(&id) {
        println!(
            "{} Created quality alert {}",
            ok_mark(),
            style(&alert.reference).cyan()
        );
        if !global.quiet {
            println!("   {}", style(file_path.display()).dim());
            println!(
                "   {} | {} | {}",
                style(&alert.stage).yellow(),
                style(alert.priority).yellow(),
                style(&alert.title).white()
            );
        }
    }

    if args.edit {
        println!();
        println!("Opening in {}...", style(session.config.editor()).yellow());
        session.config.run_editor(&file_path).into_diagnostic()?;
    }

    Ok(())
}

fn run_show(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let alert = session
        .store()
        .alert(&id)
        .ok_or_else(|| miette::miette!("No quality alert found matching '{}'", args.id))?;

    match effective_format(global, &session.config, OutputFormat::Yaml) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(alert).into_diagnostic()?),
        OutputFormat::Id => println!("{}", alert.id),
        _ => print!("{}", serde_yml::to_string(alert).into_diagnostic()?),
    }
    Ok(())
}

fn run_edit(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let path = session.project.entity_path(&id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(session.config.editor()).yellow()
    );
    session.config.run_editor(&path).into_diagnostic()?;
    Ok(())
}

fn run_move(args: MoveArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let ctx = session.ctx.clone();

    session
        .service
        .move_alert(&id, &args.stage, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;
    print_stage(&session, &id);
    Ok(())
}

fn run_advance(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let ctx = session.ctx.clone();

    session
        .service
        .advance_alert(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;
    print_stage(&session, &id);
    Ok(())
}

fn run_close(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let ctx = session.ctx.clone();

    session
        .service
        .close_alert(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;
    print_stage(&session, &id);
    Ok(())
}

fn run_reopen(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let ctx = session.ctx.clone();

    session
        .service
        .reopen_alert(&id, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;
    print_stage(&session, &id);
    Ok(())
}

fn run_assign(args: AssignArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;
    let ctx = session.ctx.clone();
    let user = args.user.unwrap_or_else(|| ctx.user.clone());

    session
        .service
        .assign_alert(&id, &user, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    let reference = session
        .store()
        .alert(&id)
        .map(|a| a.reference.clone())
        .unwrap_or_default();
    println!(
        "{} Assigned alert {} to {}",
        ok_mark(),
        style(reference).cyan(),
        style(user).yellow()
    );
    Ok(())
}

fn run_cause(args: CauseArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let id = session.resolve(EntityPrefix::Qa, &args.id)?;

    let reason = match args.reason {
        Some(reason) => reason,
        None => {
            let reasons = session.service.reasons().to_vec();
            let idx = dialoguer::Select::new()
                .with_prompt("Root cause")
                .items(&reasons)
                .default(0)
                .interact()
                .into_diagnostic()?;
            reasons[idx].clone()
        }
    };

    session
        .service
        .set_alert_cause(&id, &reason)
        .map_err(|e| miette::miette!("{}", e))?;
    session.commit()?;

    if let Some(alert) = session.store().alert(&id) {
        println!(
            "{} Root cause of alert {} set to {}",
            ok_mark(),
            style(&alert.reference).cyan(),
            style(opt_str(&alert.root_cause)).yellow()
        );
    }
    Ok(())
}

fn urgency(priority: Priority) -> u8 {
    match priority {
        Priority::Low => 0,
        Priority::Normal => 1,
        Priority::High => 2,
        Priority::Urgent => 3,
    }
}

fn print_stage(session: &Session, id: &EntityId) {
    let Some(alert) = session.store().alert(id) else {
        return;
    };
    let stages = session.store().stages();
    let stage = if stages.is_done(&alert.stage) {
        style(alert.stage.as_str()).dim()
    } else {
        style(alert.stage.as_str()).yellow()
    };
    println!(
        "{} Alert {} is in stage {}",
        ok_mark(),
        style(&alert.reference).cyan(),
        stage
    );
}
