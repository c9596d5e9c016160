use crate::ai::types::{ChartOrigin, QueryCategory};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptHistoryEntry {
    pub id: String,
    pub prompt: String,
    pub category: QueryCategory,
    pub matched: bool,
    pub origin: ChartOrigin,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PromptHistoryFile {
    entries: Vec<PromptHistoryEntry>,
}

/// Submitted prompts, newest first, persisted as JSON
pub struct PromptHistory {
    path: PathBuf,
    limit: usize,
    lock: Mutex<()>,
}

impl PromptHistory {
    pub fn new(data_dir: &Path, limit: usize) -> Self {
        Self {
            path: data_dir.join("prompt_history.json"),
            limit: limit.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a prompt at the front of the history
    pub fn add(
        &self,
        prompt: &str,
        category: QueryCategory,
        matched: bool,
        origin: ChartOrigin,
    ) -> AppResult<PromptHistoryEntry> {
        let _guard = self.guard()?;
        let mut history = self.load()?;

        let entry = PromptHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            category,
            matched,
            origin,
            submitted_at: Utc::now(),
        };

        history.entries.insert(0, entry.clone());
        history.entries.truncate(self.limit);

        self.save(&history)?;
        Ok(entry)
    }

    /// All entries, or only those of one category
    pub fn list(&self, category: Option<QueryCategory>) -> AppResult<Vec<PromptHistoryEntry>> {
        let _guard = self.guard()?;
        let history = self.load()?;

        Ok(match category {
            Some(category) => history
                .entries
                .into_iter()
                .filter(|entry| entry.category == category)
                .collect(),
            None => history.entries,
        })
    }

    pub fn delete(&self, id: &str) -> AppResult<()> {
        let _guard = self.guard()?;
        let mut history = self.load()?;
        history.entries.retain(|entry| entry.id != id);
        self.save(&history)
    }

    pub fn clear(&self) -> AppResult<()> {
        let _guard = self.guard()?;
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| AppError::StorageError(format!("Failed to delete prompt history: {}", e)))?;
        }
        Ok(())
    }

    fn guard(&self) -> AppResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| AppError::StorageError(format!("Failed to lock prompt history: {}", e)))
    }

    fn load(&self) -> AppResult<PromptHistoryFile> {
        if !self.path.exists() {
            return Ok(PromptHistoryFile::default());
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| AppError::StorageError(format!("Failed to read prompt history: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::StorageError(format!("Failed to parse prompt history: {}", e)))
    }

    fn save(&self, history: &PromptHistoryFile) -> AppResult<()> {
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| AppError::StorageError(format!("Failed to serialize prompt history: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| AppError::StorageError(format!("Failed to write prompt history: {}", e)))?;
        Ok(())
    }
}
