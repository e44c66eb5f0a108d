//! Record loading and saving
//!
//! Generic helpers over [`Entity`] so the store and the commands never
//! repeat the read/parse/write dance per record type.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::entity::Entity;
use crate::core::error::{QualityError, QualityResult};
use crate::core::project::{write_atomic, Project};
use crate::yaml::{RecordFileError, RecordSyntaxError};

/// Read and parse one record file, with a located diagnostic on failure
pub fn read_record<T: Entity>(path: &Path) -> Result<T, RecordFileError> {
    let content = fs::read_to_string(path)?;
    serde_yml::from_str::<T>(&content).map_err(|e| {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        RecordSyntaxError::from_serde_error(&e, &content, &filename).into()
    })
}

/// Load every record of type T in the project
///
/// Any unreadable file aborts the load: counts and frequency decisions
/// must not silently ignore records.
pub fn load_all<T: Entity>(project: &Project) -> QualityResult<Vec<(PathBuf, T)>> {
    let mut records = Vec::new();
    for path in project.iter_entity_files(T::PREFIX) {
        match read_record::<T>(&path) {
            Ok(record) => records.push((path, record)),
            Err(RecordFileError::Io(e)) => return Err(QualityError::Io(e)),
            Err(RecordFileError::Syntax(e)) => {
                return Err(QualityError::Syntax {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
    tracing::debug!(kind = T::PREFIX.label(), count = records.len(), "loaded records");
    Ok(records)
}

/// Serialize a record to its canonical file
pub fn save_record<T: Entity>(project: &Project, record: &T) -> QualityResult<PathBuf> {
    let path = project.entity_path(record.id());
    let yaml = serde_yml::to_string(record).map_err(|e| QualityError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    write_atomic(&path, &yaml)?;
    tracing::debug!(id = %record.id(), path = %path.display(), "saved record");
    Ok(path)
}
