//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Root causes offered for alerts when the project does not configure any
pub const DEFAULT_REASONS: &[&str] = &[
    "Workcenter Failure",
    "Parts Quality",
    "Work Operation",
    "Others",
];

/// QCT configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Acting user for checks and alerts
    pub user: Option<String>,

    /// Company the project belongs to
    pub company: Option<String>,

    /// Editor command for `qct ... edit`
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Users allowed to perform administrative overrides
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub admins: Vec<String>,

    /// Root cause reasons selectable on alerts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_for(project.as_ref())
    }

    /// Load configuration for a known project (or none)
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/qct/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 2. Project config (.qct/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.qct_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 3. Environment variables
        if let Ok(user) = std::env::var("QCT_USER") {
            config.user = Some(user);
        }
        if let Ok(company) = std::env::var("QCT_COMPANY") {
            config.company = Some(company);
        }
        if let Ok(editor) = std::env::var("QCT_EDITOR") {
            config.editor = Some(editor);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qct")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.company.is_some() {
            self.company = other.company;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if !other.admins.is_empty() {
            self.admins = other.admins;
        }
        if !other.reasons.is_empty() {
            self.reasons = other.reasons;
        }
    }

    /// Get the acting user, falling back to git config or username
    pub fn user(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Root cause reasons, falling back to the built-in list
    pub fn reasons(&self) -> Vec<String> {
        if self.reasons.is_empty() {
            DEFAULT_REASONS.iter().map(|r| r.to_string()).collect()
        } else {
            self.reasons.clone()
        }
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let mut parts = editor.split_whitespace();

        let Some(cmd) = parts.next() else {
            return std::process::Command::new("vi").arg(file_path).status();
        };

        std::process::Command::new(cmd)
            .args(parts)
            .arg(file_path)
            .status()
    }
}
