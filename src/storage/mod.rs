pub mod prompt_history;

use crate::db::connection::DatabaseConnection;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use prompt_history::{PromptHistory, PromptHistoryEntry};

pub struct StorageManager {
    settings: Mutex<Option<AppSettings>>,
    data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Direct Postgres credentials, preferred over the REST endpoint
    #[serde(default)]
    pub database: Option<DatabaseConnection>,
    #[serde(default)]
    pub use_live_data: bool,
    #[serde(default = "default_delay_ms")]
    pub sql_delay_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub chart_delay_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_history_limit() -> usize {
    prompt_history::DEFAULT_HISTORY_LIMIT
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            database: None,
            use_live_data: false,
            sql_delay_ms: default_delay_ms(),
            chart_delay_ms: default_delay_ms(),
            history_limit: default_history_limit(),
        }
    }
}

impl AppSettings {
    /// Overlay environment variables (and `.env`, if any) on these settings
    pub fn with_env(self) -> AppResult<Self> {
        dotenvy::dotenv().ok();
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from `lookup`; unset keys leave the field untouched
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
        if let Some(live) = get("KLINIKA_LIVE_DATA") {
            self.use_live_data = parse_flag("KLINIKA_LIVE_DATA", &live)?;
        }
        if let Some(delay) = get("KLINIKA_SQL_DELAY_MS") {
            self.sql_delay_ms = parse_number("KLINIKA_SQL_DELAY_MS", &delay)?;
        }
        if let Some(delay) = get("KLINIKA_CHART_DELAY_MS") {
            self.chart_delay_ms = parse_number("KLINIKA_CHART_DELAY_MS", &delay)?;
        }
        if let Some(limit) = get("KLINIKA_HISTORY_LIMIT") {
            self.history_limit = parse_number("KLINIKA_HISTORY_LIMIT", &limit)?;
        }

        if let Some(host) = get("KLINIKA_DATABASE_HOST") {
            let port = match get("KLINIKA_DATABASE_PORT") {
                Some(port) => parse_number("KLINIKA_DATABASE_PORT", &port)?,
                None => 5432,
            };
            self.database = Some(DatabaseConnection {
                host,
                port,
                username: get("KLINIKA_DATABASE_USER").unwrap_or_else(|| "postgres".to_string()),
                password: get("KLINIKA_DATABASE_PASSWORD").unwrap_or_default(),
                database: get("KLINIKA_DATABASE_NAME").unwrap_or_else(|| "postgres".to_string()),
                ssl_mode: get("KLINIKA_DATABASE_SSLMODE").unwrap_or_else(|| "require".to_string()),
            });
        }

        Ok(self)
    }
}

fn parse_flag(key: &str, value: &str) -> AppResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::ConfigError(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::ConfigError(format!("{} must be a number, got '{}'", key, value)))
}

impl StorageManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let data_dir = data_dir.into();

        // Ensure the directory exists
        fs::create_dir_all(&data_dir)
            .map_err(|e| AppError::StorageError(format!("Failed to create data dir: {}", e)))?;

        Ok(Self {
            settings: Mutex::new(None),
            data_dir,
        })
    }

    /// `$KLINIKA_DATA_DIR`, else `.klinika` under the working directory
    pub fn default_data_dir() -> PathBuf {
        env::var("KLINIKA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".klinika"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn save_settings(&self, settings: AppSettings) -> AppResult<()> {
        let mut guard = self.settings.lock().map_err(|e| {
            AppError::StorageError(format!("Failed to lock settings: {}", e))
        })?;
        *guard = Some(settings.clone());

        let settings_path = self.data_dir.join("settings.json");
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| AppError::StorageError(format!("Failed to serialize settings: {}", e)))?;
        fs::write(settings_path, json)
            .map_err(|e| AppError::StorageError(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<Option<AppSettings>> {
        let guard = self.settings.lock().map_err(|e| {
            AppError::StorageError(format!("Failed to lock settings: {}", e))
        })?;

        if guard.is_some() {
            return Ok(guard.clone());
        }

        drop(guard);
        self.load_settings()
    }

    pub fn load_settings(&self) -> AppResult<Option<AppSettings>> {
        let settings_path = self.data_dir.join("settings.json");

        if !settings_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(settings_path)
            .map_err(|e| AppError::StorageError(format!("Failed to read settings file: {}", e)))?;
        let settings: AppSettings = serde_json::from_str(&json)
            .map_err(|e| AppError::StorageError(format!("Failed to parse settings: {}", e)))?;

        let mut guard = self.settings.lock().map_err(|e| {
            AppError::StorageError(format!("Failed to lock settings: {}", e))
        })?;
        *guard = Some(settings.clone());

        Ok(Some(settings))
    }

    /// Persisted settings (or defaults) with the environment applied on top
    pub fn effective_settings(&self) -> AppResult<AppSettings> {
        self.get_settings()?.unwrap_or_default().with_env()
    }

    pub fn prompt_history(&self, limit: usize) -> PromptHistory {
        PromptHistory::new(&self.data_dir, limit)
    }
}
