//! Persistence Sync: full-table replace and read-back with one-time bootstrap.

use super::SalesDatabase;
use crate::cache::CacheKey;
use crate::dataset::{DatasetLoader, SalesTable};
use crate::diagnostics::Diagnostic;
use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Acknowledgement of a successful `replace_all`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    /// Short message suitable for a transient notification
    pub message: String,
    pub rows_written: usize,
    /// Cache entry made stale by this write
    pub invalidates: CacheKey,
}

/// Result of `read_all`
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub table: SalesTable,
    pub diagnostics: Vec<Diagnostic>,
    /// True when this read created the table from the default source
    pub bootstrapped: bool,
}

/// Keeps the durable sales table in step with cleaned tables
pub struct PersistenceSync {
    db: SalesDatabase,
    loader: DatasetLoader,
    default_source: PathBuf,
}

impl PersistenceSync {
    pub fn new(db: SalesDatabase, loader: DatasetLoader, default_source: impl Into<PathBuf>) -> Self {
        Self {
            db,
            loader,
            default_source: default_source.into(),
        }
    }

    pub fn database(&self) -> &SalesDatabase {
        &self.db
    }

    pub fn default_source(&self) -> &PathBuf {
        &self.default_source
    }

    /// Cache key under which reads of this store are memoized
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::Store(self.db.table_name().to_string())
    }

    /// Replace the durable table with `table`. Empty tables are refused before any mutation.
    pub fn replace_all(&mut self, table: &SalesTable) -> PipelineResult<WriteAck> {
        if table.is_empty() {
            warn!(table = self.db.table_name(), "Refused to replace stored table with an empty table");
            return Err(PipelineError::GuardRejection);
        }

        let rows_written = self.db.replace_rows(table)?;
        Ok(WriteAck {
            message: format!("Saved {} rows to '{}'", rows_written, self.db.table_name()),
            rows_written,
            invalidates: self.cache_key(),
        })
    }

    /// Read the durable table, bootstrapping it from the default source on first use.
    pub fn read_all(&mut self) -> PipelineResult<ReadOutcome> {
        let mut diagnostics = Vec::new();
        let mut bootstrapped = false;

        let table = match self.db.fetch_rows()? {
            Some(table) => table,
            None => {
                diagnostics.extend(self.bootstrap()?);
                bootstrapped = true;
                self.db.fetch_rows()?.ok_or_else(|| {
                    PipelineError::persistence("Table still missing after bootstrap")
                })?
            }
        };

        if table.is_empty() {
            diagnostics.push(Diagnostic::warning(format!(
                "The table '{}' exists but holds no rows",
                self.db.table_name()
            )));
        }

        Ok(ReadOutcome {
            table,
            diagnostics,
            bootstrapped,
        })
    }

    /// Load the default source and write it as the initial table contents
    fn bootstrap(&mut self) -> PipelineResult<Vec<Diagnostic>> {
        info!(
            table = self.db.table_name(),
            source = %self.default_source.display(),
            "Sales table missing, bootstrapping from default source"
        );

        let outcome = self.loader.load_path(&self.default_source)?;
        if outcome.table.is_empty() {
            warn!(
                source = %self.default_source.display(),
                "Default source yielded no valid rows"
            );
            let mut diagnostics = outcome.diagnostics;
            diagnostics.push(Diagnostic::error(format!(
                "The default source '{}' yielded no valid rows; the table was not created",
                self.default_source.display()
            )));
            return Err(PipelineError::Structural { diagnostics });
        }
        let ack = self.replace_all(&outcome.table)?;

        let mut diagnostics = outcome.diagnostics;
        diagnostics.push(Diagnostic::info(format!(
            "Initialized from '{}': {}",
            self.default_source.display(),
            ack.message
        )));
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CleanRecord;
    use crate::database::DEFAULT_TABLE_NAME;
    use crate::diagnostics::Severity;
    use std::io::Write;

    fn sync_with_source(content: &str) -> (PersistenceSync, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let db = SalesDatabase::new_in_memory(DEFAULT_TABLE_NAME).unwrap();
        (PersistenceSync::new(db, DatasetLoader::new(), file.path()), file)
    }

    const SOURCE: &str = "product_name,category,discounted_price,rating\n\
                          Cable,Electronics|Cables,₹199,4.2\n\
                          Novel,Books,₹350,3.1\n";

    #[test]
    fn test_read_all_bootstraps_missing_table() {
        let (mut sync, _file) = sync_with_source(SOURCE);
        let outcome = sync.read_all().unwrap();

        assert!(outcome.bootstrapped);
        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.diagnostics.iter().any(|d| d.message.starts_with("Initialized from")));

        let again = sync.read_all().unwrap();
        assert!(!again.bootstrapped);
        assert_eq!(again.table, outcome.table);
    }

    #[test]
    fn test_failed_bootstrap_propagates_diagnostics() {
        let (mut sync, _file) = sync_with_source("product_name,discounted_price\nCable,₹199\n");
        let err = sync.read_all().unwrap_err();

        assert!(err.is_structural());
        assert!(err.diagnostics()[0].message.contains("category"));
        assert!(!sync.database().table_exists().unwrap());
    }

    #[test]
    fn test_bootstrap_without_valid_rows_keeps_row_warnings() {
        let (mut sync, _file) = sync_with_source(
            "product_name,category,discounted_price\nA,Books,free\nB,Books,call us\n",
        );
        let err = sync.read_all().unwrap_err();

        assert!(err.is_structural());
        let diagnostics = err.diagnostics();
        assert!(diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning
                && d.message.starts_with("2 row(s) dropped: price")));
        assert!(diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("no valid rows")));
        assert!(!matches!(err, PipelineError::GuardRejection));
        assert!(!sync.database().table_exists().unwrap());
    }

    #[test]
    fn test_empty_table_is_a_warning() {
        let (mut sync, _file) = sync_with_source(SOURCE);
        sync.replace_all(&SalesTable::new(vec![CleanRecord::new("A", "B", 1.0)]))
            .unwrap();
        sync.database()
            .connection
            .execute("DELETE FROM sales", [])
            .unwrap();

        let outcome = sync.read_all().unwrap();
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_replace_all_ack_names_cache_entry() {
        let (mut sync, _file) = sync_with_source(SOURCE);
        let ack = sync
            .replace_all(&SalesTable::new(vec![CleanRecord::new("A", "B", 1.0)]))
            .unwrap();

        assert_eq!(ack.rows_written, 1);
        assert_eq!(ack.message, "Saved 1 rows to 'sales'");
        assert_eq!(ack.invalidates, CacheKey::Store("sales".to_string()));
    }

    #[test]
    fn test_guard_rejection_keeps_prior_content() {
        let (mut sync, _file) = sync_with_source(SOURCE);
        let before = sync.read_all().unwrap().table;

        let err = sync.replace_all(&SalesTable::default()).unwrap_err();
        assert!(matches!(err, PipelineError::GuardRejection));
        assert_eq!(sync.read_all().unwrap().table, before);
    }
}
