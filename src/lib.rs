pub mod analytics;
pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod service;

// Re-export the main error types for convenience
pub use auth::AuthError;
pub use error::{PipelineError, PipelineResult};

// Re-export dataset types
pub use dataset::{CleanRecord, DatasetLoader, LoadOutcome, SalesTable, Sentiment};
pub use diagnostics::{Diagnostic, Severity};

// Re-export persistence and caching
pub use cache::{CacheKey, TableCache};
pub use database::{PersistenceSync, ReadOutcome, SalesDatabase, WriteAck};
pub use service::{DashboardService, ImportOutcome, TableView};

// Re-export analytics modules
pub use analytics::{SalesFilter, SalesSummary};
