//! Dashboard service: store, loader and table cache behind one handle.

use crate::cache::{CacheKey, TableCache};
use crate::config::AppConfig;
use crate::database::{PersistenceSync, SalesDatabase, WriteAck};
use crate::dataset::{source, DatasetLoader, SalesTable, SourceFingerprint};
use crate::diagnostics::Diagnostic;
use crate::error::{PipelineError, PipelineResult};
use anyhow::Context;
use std::path::Path;
use tracing::info;

/// A table handed to the view layer
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub key: CacheKey,
    pub table: SalesTable,
    /// Diagnostics of the load that produced the table; empty on a cache hit
    pub diagnostics: Vec<Diagnostic>,
    pub from_cache: bool,
}

/// Result of `import`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub view: TableView,
    pub ack: WriteAck,
}

pub struct DashboardService {
    sync: PersistenceSync,
    loader: DatasetLoader,
    cache: TableCache,
}

impl DashboardService {
    pub fn new(sync: PersistenceSync, loader: DatasetLoader) -> Self {
        Self {
            sync,
            loader,
            cache: TableCache::new(),
        }
    }

    /// Open the configured database and wire everything up
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let loader = DatasetLoader::new().with_delimiter(config.data.delimiter_byte()?);
        let db_path = config.database_path()?;
        let db = SalesDatabase::new(&db_path, &config.store.table_name)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        let sync = PersistenceSync::new(db, loader.clone(), &config.data.default_source);

        info!(
            database = %db_path.display(),
            table = %config.store.table_name,
            "Dashboard service ready"
        );
        Ok(Self::new(sync, loader))
    }

    pub fn sync(&self) -> &PersistenceSync {
        &self.sync
    }

    /// (hits, misses) of the table cache
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// The stored table, read at most once until a write invalidates it
    pub fn current_table(&mut self) -> PipelineResult<TableView> {
        let key = self.sync.cache_key();
        let sync = &mut self.sync;
        let mut diagnostics = Vec::new();
        let mut from_cache = true;

        let table = self
            .cache
            .get_or_try_insert_with(key.clone(), || {
                from_cache = false;
                let outcome = sync.read_all()?;
                diagnostics = outcome.diagnostics;
                Ok::<_, PipelineError>(outcome.table)
            })?
            .clone();

        Ok(TableView {
            key,
            table,
            diagnostics,
            from_cache,
        })
    }

    /// Load a source file; unchanged content is served from the cache
    pub fn load_source(&mut self, path: &Path) -> PipelineResult<TableView> {
        let bytes = source::read_bytes(path)?;
        let key = CacheKey::Source(SourceFingerprint::of_bytes(&bytes));
        let loader = &self.loader;
        let mut diagnostics = Vec::new();
        let mut from_cache = true;

        let table = self
            .cache
            .get_or_try_insert_with(key.clone(), || {
                from_cache = false;
                let outcome = loader.load_bytes(&bytes, path)?;
                diagnostics = outcome.diagnostics;
                Ok::<_, PipelineError>(outcome.table)
            })?
            .clone();

        Ok(TableView {
            key,
            table,
            diagnostics,
            from_cache,
        })
    }

    /// Load a source file and make it the stored table.
    /// Once stored, the source entry is dropped; the store entry takes over.
    pub fn import(&mut self, path: &Path) -> PipelineResult<ImportOutcome> {
        let view = self.load_source(path)?;
        let ack = self.save(&view.table)?;
        self.cache.invalidate(&view.key);
        Ok(ImportOutcome { view, ack })
    }

    /// Number of cached tables
    pub fn cached_tables(&self) -> usize {
        self.cache.len()
    }

    /// Replace the stored table and drop the cache entry the write made stale
    pub fn save(&mut self, table: &SalesTable) -> PipelineResult<WriteAck> {
        let ack = self.sync.replace_all(table)?;
        self.cache.apply(&ack);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CleanRecord;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "category,discounted_price,product_name,rating\n\
        Electronics|Cables,\"₹1,099\",USB Cable,4.2\n\
        Books|Fiction,₹350,Novel,3.1\n";

    fn service(dir: &TempDir) -> DashboardService {
        let source = dir.path().join("sales.csv");
        fs::write(&source, SOURCE).unwrap();
        let db = SalesDatabase::new_in_memory("sales").unwrap();
        let sync = PersistenceSync::new(db, DatasetLoader::new(), source);
        DashboardService::new(sync, DatasetLoader::new())
    }

    #[test]
    fn test_current_table_bootstraps_then_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);

        let first = service.current_table().unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.table.len(), 2);
        assert!(first
            .diagnostics
            .iter()
            .any(|d| d.message.starts_with("Initialized from")));

        let second = service.current_table().unwrap();
        assert!(second.from_cache);
        assert!(second.diagnostics.is_empty());
        assert_eq!(second.table, first.table);
        assert_eq!(service.cache_stats(), (1, 1));
    }

    #[test]
    fn test_save_invalidates_store_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);
        service.current_table().unwrap();

        let replacement = SalesTable::new(vec![CleanRecord::new("Toys", "Kite", 120.0)]);
        let ack = service.save(&replacement).unwrap();
        assert_eq!(ack.rows_written, 1);

        let view = service.current_table().unwrap();
        assert!(!view.from_cache);
        assert_eq!(view.table, replacement);
    }

    #[test]
    fn test_rejected_save_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);
        let before = service.current_table().unwrap();

        let err = service.save(&SalesTable::default()).unwrap_err();
        assert!(matches!(err, PipelineError::GuardRejection));

        let after = service.current_table().unwrap();
        assert!(after.from_cache);
        assert_eq!(after.table, before.table);
    }

    #[test]
    fn test_load_source_keyed_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);
        let path = dir.path().join("upload.csv");
        fs::write(&path, SOURCE).unwrap();

        let first = service.load_source(&path).unwrap();
        let again = service.load_source(&path).unwrap();
        assert!(!first.from_cache);
        assert!(again.from_cache);
        assert_eq!(first.key, again.key);

        fs::write(&path, format!("{}Toys|Outdoor,₹99,Kite,5.0\n", SOURCE)).unwrap();
        let changed = service.load_source(&path).unwrap();
        assert!(!changed.from_cache);
        assert_ne!(changed.key, first.key);
        assert_eq!(changed.table.len(), 3);
    }

    #[test]
    fn test_import_replaces_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);
        service.current_table().unwrap();

        let path = dir.path().join("upload.csv");
        fs::write(&path, "category,discounted_price,product_name\nToys,₹99,Kite\n").unwrap();
        let outcome = service.import(&path).unwrap();
        assert_eq!(outcome.ack.rows_written, 1);

        let view = service.current_table().unwrap();
        assert!(!view.from_cache);
        assert_eq!(view.table.len(), 1);
        assert_eq!(view.table.records[0].product_name, "Kite");
    }

    #[test]
    fn test_import_releases_source_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);

        for i in 0..5 {
            let path = dir.path().join(format!("upload{}.csv", i));
            fs::write(
                &path,
                format!("category,discounted_price,product_name\nToys,₹{},Kite\n", 90 + i),
            )
            .unwrap();
            let outcome = service.import(&path).unwrap();
            assert!(service.cache.get(&outcome.view.key).is_none());
        }
        assert_eq!(service.cached_tables(), 0);

        service.current_table().unwrap();
        assert_eq!(service.cached_tables(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service(&dir);
        let path = dir.path().join("bad.csv");
        fs::write(&path, "category,product_name\nToys,Kite\n").unwrap();

        assert!(service.load_source(&path).unwrap_err().is_structural());
        assert!(service.load_source(&path).is_err());
        assert_eq!(service.cache_stats(), (0, 2));
    }
}
