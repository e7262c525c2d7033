//! Error types for the load / persist pipeline.

use crate::diagnostics::Diagnostic;
use thiserror::Error;

/// Failures of the Dataset Loader and the Persistence Sync.
///
/// Row-level parse failures are not errors: they null a field (or drop a row
/// when the price is unusable) and surface as warning diagnostics instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required field missing, source empty or unreadable. No table is produced.
    #[error("Structural error: {}", summarize(.diagnostics))]
    Structural { diagnostics: Vec<Diagnostic> },

    /// The durable store is unreachable or rejected the write.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Attempt to replace the stored table with nothing.
    #[error("Refusing to replace the stored table with an empty table")]
    GuardRejection,
}

impl PipelineError {
    /// Create a structural error from a single message
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            diagnostics: vec![Diagnostic::error(message)],
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Diagnostics the caller should render for this failure.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Structural { diagnostics } => diagnostics.clone(),
            Self::Persistence { message } => vec![Diagnostic::error(format!(
                "Could not access the data store: {}",
                message
            ))],
            Self::GuardRejection => vec![Diagnostic::warning(
                "No data to save: the stored table was left unchanged",
            )],
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    #[test]
    fn test_structural_display_lists_error_messages_only() {
        let err = PipelineError::Structural {
            diagnostics: vec![
                Diagnostic::error("missing category"),
                Diagnostic::info("found: price"),
            ],
        };
        assert_eq!(err.to_string(), "Structural error: missing category");
        assert!(err.is_structural());
    }

    #[test]
    fn test_guard_rejection_is_a_warning() {
        let diagnostics = PipelineError::GuardRejection.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_rusqlite_error_maps_to_persistence() {
        let err: PipelineError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }
}
