use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REST_PATH: &str = "rest/v1";

/// Row-oriented client for the hosted PostgREST endpoint
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();

        if base_url.is_empty() || api_key.is_empty() {
            return Err(AppError::ConfigError(
                "Supabase URL and anon key are required".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Start a query against `table`
    pub fn from<'a>(&'a self, table: &str) -> TableQuery<'a> {
        TableQuery {
            client: self,
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }
}

/// PostgREST query under construction
pub struct TableQuery<'a> {
    client: &'a SupabaseClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> TableQuery<'a> {
    /// Columns (and embedded relations) to return
    pub fn select(mut self, columns: &str) -> Self {
        let compact: String = columns.split_whitespace().collect();
        self.params.push(("select".to_string(), compact));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params.push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.params.push((column.to_string(), format!("gte.{}", value.to_string())));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.params.push((column.to_string(), "is.null".to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params.push(("order".to_string(), format!("{}.{}", column, direction)));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Execute and decode every returned row as `T`
    pub async fn fetch<T: DeserializeOwned>(self) -> AppResult<Vec<T>> {
        let url = self.client.table_url(&self.table);
        tracing::debug!(table = %self.table, params = ?self.params, "PostgREST select");

        let response = self
            .client
            .client
            .get(&url)
            .query(&self.params)
            .header("apikey", &self.client.api_key)
            .header("Authorization", format!("Bearer {}", self.client.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("Request to {} failed: {}", self.table, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::BackendError(format!(
                "{} returned {}: {}",
                self.table, status, error_text
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| AppError::BackendError(format!("Parse error for {}: {}", self.table, e)))
    }
}
