//! Record file diagnostics with source-located error messages

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A record file that failed to parse, pointing at the offending line
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(qct::record::syntax))]
pub struct RecordSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl RecordSyntaxError {
    /// Build from a serde_yml error and the text it was parsing
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors reading a record file
#[derive(Debug, Error, Diagnostic)]
pub enum RecordFileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] RecordSyntaxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let col_offset = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len().saturating_sub(1));
            return line_start + col_offset;
        }
        line_start += text.len();
    }
    source.len().saturating_sub(1)
}

/// Suggest a fix for the most common hand-editing mistakes
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("unknown variant") {
        if msg_lower.contains("none") || msg_lower.contains("pass") || msg_lower.contains("fail") {
            return Some("quality_state must be one of: none, pass, fail".to_string());
        }
        return Some(
            "Check the spelling of enumerated values (test type, frequency policy, priority)."
                .to_string(),
        );
    }

    if msg_lower.contains("missing field") {
        return Some("A required field is missing; compare with a record created by `qct`.".to_string());
    }

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("invalid record prefix") || msg_lower.contains("invalid ulid") {
        return Some("Record links must be full IDs such as QC-01HQ3K4N5M6P7R8S9T0UVWXYZA.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("quality_state: unknown variant `maybe`, expected one of `none`, `pass`, `fail`").is_some());
        assert!(generate_help("missing field `created`").is_some());
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_from_serde_error_keeps_message() {
        let source = "id: QC-01HQ3K4N5M6P7R8S9T0UVWXYZA\nquality_state: maybe\n";
        let err = serde_yml::from_str::<crate::entities::check::QualityCheck>(source).unwrap_err();
        let diag = RecordSyntaxError::from_serde_error(&err, source, "QC.qct.yaml");
        assert!(!diag.message().is_empty());
    }
}
