//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use crate::database::DEFAULT_TABLE_NAME;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// データソース設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Source used to create the sales table the first time it is read
    pub default_source: PathBuf,
    /// Field delimiter of source files
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            default_source: PathBuf::from("data/sales.csv"),
            delimiter: ',',
        }
    }
}

impl DataConfig {
    /// Delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!(
                "Invalid delimiter '{}': the source delimiter must be a single ASCII character",
                self.delimiter
            );
        }
        Ok(self.delimiter as u8)
    }
}

/// 永続化設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Noneの場合はXDGデフォルト使用
    pub database_path: Option<PathBuf>,
    pub table_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeAccount {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub can_see_details: bool,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerAccount {
    pub username: String,
    pub password: String,
}

/// 初期アカウント
///
/// A section that is present replaces the defaults entirely; only a missing
/// `[credentials]` section falls back to the built-in accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub employees: Vec<EmployeeAccount>,
    #[serde(default)]
    pub managers: Vec<ManagerAccount>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            employees: vec![
                EmployeeAccount {
                    username: "func1".to_string(),
                    password: "senha123".to_string(),
                    can_see_details: true,
                    active: true,
                },
                EmployeeAccount {
                    username: "ana.vendas".to_string(),
                    password: "vendas234".to_string(),
                    can_see_details: false,
                    active: true,
                },
            ],
            managers: vec![
                ManagerAccount {
                    username: "admin".to_string(),
                    password: "admin".to_string(),
                },
                ManagerAccount {
                    username: "boss".to_string(),
                    password: "boss1337".to_string(),
                },
            ],
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::with_path(config_path)
    }

    /// Use an explicit config file location
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        // 設定ディレクトリを作成（存在しない場合）
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self { config_path })
    }

    /// XDGディレクトリに基づく設定ファイルパスを取得
    fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "salesboard", "salesboard")
            .context("Failed to get project directories")?;

        let config_file = project_dirs.config_dir().join("config.toml");
        debug!("Config file path: {}", config_file.display());

        Ok(config_file)
    }

    /// 設定を読み込み
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;
        config.validate().with_context(|| {
            format!("Invalid config file: {}", self.config_path.display())
        })?;

        info!("Configuration loaded from: {}", self.config_path.display());
        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("Configuration saved to: {}", self.config_path.display());
        Ok(())
    }

    /// 設定ファイルパスを取得
    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }

    /// 設定ファイルが存在するかチェック
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

impl AppConfig {
    /// Reject settings that would otherwise be silently reinterpreted
    pub fn validate(&self) -> Result<()> {
        self.data.delimiter_byte()?;
        Ok(())
    }

    /// Database location: configured path or the XDG data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.store.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::get_database_path(),
        }
    }
}
