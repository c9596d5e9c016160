use crate::error::{AppError, AppResult};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Mutex;
use std::time::Duration;

/// Direct Postgres credentials for the hosted hospital database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

fn default_ssl_mode() -> String {
    "require".to_string()
}

impl DatabaseConnection {
    /// Build a properly encoded connection URL.
    /// Handles special characters in username, password, and database name.
    pub fn connection_url(&self) -> String {
        let username = utf8_percent_encode(&self.username, NON_ALPHANUMERIC).to_string();
        let password = utf8_percent_encode(&self.password, NON_ALPHANUMERIC).to_string();
        let database = utf8_percent_encode(&self.database, NON_ALPHANUMERIC).to_string();

        format!(
            "postgresql://{}:{}@{}:{}/{}?sslmode={}",
            username, password, self.host, self.port, database, self.ssl_mode
        )
    }
}

/// Lazily created pool for the configured database
pub struct ConnectionManager {
    connection: DatabaseConnection,
    pool: Mutex<Option<Pool<Postgres>>>,
}

impl ConnectionManager {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            pool: Mutex::new(None),
        }
    }

    pub async fn get_pool(&self) -> AppResult<Pool<Postgres>> {
        // Fast path: check if pool already exists
        {
            let guard = self.pool.lock().map_err(|e| {
                AppError::ConnectionError(format!("Failed to lock postgres pool: {}", e))
            })?;

            if let Some(pool) = guard.as_ref() {
                return Ok(pool.clone());
            }
        }

        // Connect outside of lock to avoid blocking other operations
        tracing::debug!(host = %self.connection.host, "Opening postgres pool");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&self.connection.connection_url())
            .await?;

        // If another task created the pool while we were connecting,
        // keep theirs and drop ours
        let mut guard = self.pool.lock().map_err(|e| {
            AppError::ConnectionError(format!("Failed to lock postgres pool: {}", e))
        })?;

        Ok(guard.get_or_insert(pool).clone())
    }

    pub async fn close(&self) -> AppResult<()> {
        let pool = {
            let mut guard = self.pool.lock().map_err(|e| {
                AppError::ConnectionError(format!("Failed to lock postgres pool: {}", e))
            })?;
            guard.take()
        };

        if let Some(pool) = pool {
            pool.close().await;
        }
        Ok(())
    }
}
