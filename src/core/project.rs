//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::stage::StagePipeline;

/// Extension used for every record file
pub const RECORD_EXTENSION: &str = ".qct.yaml";

/// Represents a QCT project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .qct/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".qct").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open a project at an explicit root (e.g. `--project`)
    pub fn open(root: &Path) -> Result<Self, ProjectError> {
        let root = root
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        if !root.join(".qct").is_dir() {
            return Err(ProjectError::NotFound {
                searched_from: root,
            });
        }
        Ok(Self { root })
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".qct").exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root)
    }

    /// Force initialization even if .qct/ exists
    ///
    /// Existing records are left untouched; config and stages are reset.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let qct_dir = root.join(".qct");
        std::fs::create_dir_all(&qct_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(qct_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let stages = serde_yml::to_string(&StagePipeline::default())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(qct_dir.join("stages.yaml"), stages)
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(Self::entity_directory(*prefix)))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# QCT Project Configuration

# Acting user for checks and alerts (default: git user.name, then $USER)
# user: ""

# Company the project belongs to
# company: ""

# Users allowed to reset decided checks
# admins: []

# Root causes offered on alerts
# reasons:
#   - Workcenter Failure
#   - Parts Quality
#   - Work Operation
#   - Others

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .qct configuration directory
    pub fn qct_dir(&self) -> PathBuf {
        self.root.join(".qct")
    }

    /// Path to the alert stage pipeline
    pub fn stages_path(&self) -> PathBuf {
        self.qct_dir().join("stages.yaml")
    }

    /// Path to the sequence counters
    pub fn sequences_path(&self) -> PathBuf {
        self.qct_dir().join("sequences.yaml")
    }

    /// Get the path for a record file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.root
            .join(Self::entity_directory(id.prefix()))
            .join(format!("{}{}", id, RECORD_EXTENSION))
    }

    /// Get the directory for a given record prefix
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Qcp => "quality/points",
            EntityPrefix::Qc => "quality/checks",
            EntityPrefix::Qa => "quality/alerts",
        }
    }

    /// Iterate all record files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        let dir = self.root.join(Self::entity_directory(prefix));
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(RECORD_EXTENSION))
            .map(|e| e.path().to_path_buf())
    }
}

/// Write a file by renaming a sibling temp file over it
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a QCT project (searched from {searched_from:?}). Run 'qct init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("QCT project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.qct_dir().join("config.yaml").exists());
        assert!(project.stages_path().exists());
        assert!(project.root().join("quality/points").is_dir());
        assert!(project.root().join("quality/checks").is_dir());
        assert!(project.root().join("quality/alerts").is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_discover_finds_qct_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_qct_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_entity_path_uses_prefix_directory() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Qa);

        let path = project.entity_path(&id);
        assert!(path.starts_with(project.root().join("quality/alerts")));
        assert!(path.to_string_lossy().ends_with(".qct.yaml"));
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/file.yaml");

        write_atomic(&path, "a: 1\n").unwrap();
        write_atomic(&path, "a: 2\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 2\n");
        assert!(!tmp.path().join("nested/file.yaml.tmp").exists());
    }
}
