pub mod crud;
pub mod sync;

pub use sync::{PersistenceSync, ReadOutcome, WriteAck};

use crate::error::{PipelineError, PipelineResult};
use anyhow::Result;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::path::PathBuf;

/// Default name of the durable sales table
pub const DEFAULT_TABLE_NAME: &str = "sales";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// salesboard用データベース接続管理
///
/// The sales table is created lazily by the first `replace_all`, so a fresh
/// database reports `table_exists() == false` until something is written.
pub struct SalesDatabase {
    pub connection: rusqlite::Connection,
    table_name: String,
}

impl SalesDatabase {
    /// 新しいデータベース接続を作成
    pub fn new<P: AsRef<Path>>(db_path: P, table_name: &str) -> PipelineResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::persistence(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let connection = rusqlite::Connection::open(path)?;
        tracing::debug!("Database connection opened: {:?}", path);
        Self::with_connection(connection, table_name)
    }

    /// インメモリデータベースを作成（テスト用）
    pub fn new_in_memory(table_name: &str) -> PipelineResult<Self> {
        let connection = rusqlite::Connection::open_in_memory()?;
        Self::with_connection(connection, table_name)
    }

    fn with_connection(connection: rusqlite::Connection, table_name: &str) -> PipelineResult<Self> {
        if !IDENTIFIER.is_match(table_name) {
            return Err(PipelineError::persistence(format!(
                "Invalid table name '{}': use letters, digits and underscores only",
                table_name
            )));
        }
        Ok(Self {
            connection,
            table_name: table_name.to_string(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Table name as a quoted SQL identifier, safe for keywords like `select`
    fn quoted_table_name(&self) -> String {
        format!("\"{}\"", self.table_name)
    }

    /// Schema DDL for this database's table
    fn schema_sql(&self) -> String {
        include_str!("schema.sql").replace("{table}", &self.quoted_table_name())
    }
}

/// XDGデータディレクトリからデータベースパスを取得
pub fn get_database_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("dev", "salesboard", "salesboard")
        .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;

    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("salesboard.db"))
}
