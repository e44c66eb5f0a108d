//! Shared helper functions for CLI commands
//!
//! Project/service loading, ID resolution and output formatting used by
//! every command module.

use chrono::{DateTime, Local, Utc};
use console::style;
use miette::Result;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::action::Action;
use crate::core::config::Config;
use crate::core::context::Context;
use crate::core::error::QualityError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::service::QualityService;
use crate::core::shortid::ShortIdIndex;
use crate::core::store::QualityStore;

/// Everything a command needs to act on a project
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub ctx: Context,
    pub service: QualityService,
    pub short_ids: ShortIdIndex,
}

impl Session {
    /// Open the project named by `--project` or found from the working directory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = open_project(global)?;
        let config = Config::load_for(Some(&project));
        let ctx = Context::from_config(&config);
        let service = QualityService::open(&project, &config).map_err(load_error)?;
        let short_ids = ShortIdIndex::load(&project);
        Ok(Self {
            project,
            config,
            ctx,
            service,
            short_ids,
        })
    }

    pub fn store(&self) -> &QualityStore {
        self.service.store()
    }

    /// Resolve a user reference (short ID, sequence reference or ID)
    pub fn resolve(&self, prefix: EntityPrefix, reference: &str) -> Result<EntityId> {
        let resolved = self
            .short_ids
            .resolve(prefix, reference)
            .ok_or_else(|| miette::miette!("No {} with short ID '{}'", prefix.label(), reference))?;
        self.store()
            .resolve(prefix, &resolved)
            .map_err(|e| miette::miette!("{}", e))
    }

    /// Write pending changes to disk
    pub fn commit(&mut self) -> Result<()> {
        self.service.commit().map_err(|e| miette::miette!("{}", e))
    }

    /// Number the listed records so `@N` works in the next command
    pub fn remember_listing(&mut self, prefix: EntityPrefix, ids: Vec<EntityId>) {
        self.short_ids
            .rebuild(prefix, ids.into_iter().map(|id| id.to_string()));
        if let Err(e) = self.short_ids.save(&self.project) {
            tracing::warn!(error = %e, "could not save short ID index");
        }
    }

    /// Short alias (e.g. `QC@3`) or the sequence reference
    pub fn display_id(&self, id: &EntityId, reference: &str) -> String {
        match self.short_ids.get_short_id(id) {
            Some(n) => format!("{}@{}", id.prefix(), n),
            None if !reference.is_empty() => reference.to_string(),
            None => format_short_id(id),
        }
    }
}

/// Report a failed load, keeping the source snippet of a broken record file
fn load_error(err: QualityError) -> miette::Report {
    match err {
        QualityError::Syntax { source, .. } => miette::Report::new(*source),
        other => miette::miette!("{}", other),
    }
}

pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    match &global.project {
        Some(root) => Project::open(root),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))
}

/// Resolve `auto` against the configured default, then the command's default
pub fn effective_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    match config
        .default_format
        .as_deref()
        .and_then(|f| f.parse::<OutputFormat>().ok())
    {
        Some(OutputFormat::Auto) | None => fallback,
        Some(format) => format,
    }
}

/// Print what the user should look at next
pub fn print_action(session: &Session, action: &Action) {
    match action {
        Action::Close => println!("   {}", style("No more checks to do in this operation").dim()),
        Action::OpenCheck(id) => {
            if let Some(check) = session.store().check(id) {
                println!(
                    "   Next: {} {}",
                    style(&check.reference).cyan(),
                    check.title
                );
            }
        }
        Action::OpenAlert(id) => {
            if let Some(alert) = session.store().alert(id) {
                println!(
                    "   Alert: {} {} [{}]",
                    style(&alert.reference).cyan(),
                    alert.title,
                    style(&alert.stage).yellow()
                );
            }
        }
        Action::ListAlerts(ids) if ids.is_empty() => println!("   No alerts."),
        Action::ListAlerts(ids) => {
            for id in ids {
                if let Some(alert) = session.store().alert(id) {
                    println!(
                        "   {} {} [{}]",
                        style(&alert.reference).cyan(),
                        alert.title,
                        style(&alert.stage).yellow()
                    );
                }
            }
        }
    }
}

/// Check mark prefix for success lines
pub fn ok_mark() -> console::StyledObject<&'static str> {
    style("✓").green()
}

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Local date for table cells
pub fn format_date_local(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn opt_str(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}
