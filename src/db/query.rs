use crate::ai::sanitizer::validate_template_sql;
use crate::db::connection::ConnectionManager;
use crate::error::AppResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::Instant;

/// Rows returned by a live backend, one JSON object per row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, Value>>,
    pub row_count: usize,
    pub execution_time_ms: u128,
}

impl QueryResult {
    /// Wrap already aggregated rows, taking column order from `columns`
    pub fn from_rows(columns: &[&str], rows: Vec<serde_json::Map<String, Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            row_count: rows.len(),
            rows,
            execution_time_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Validate and run a canned template against the hospital database
pub async fn execute_template(manager: &ConnectionManager, sql: &str) -> AppResult<QueryResult> {
    let sanitized = validate_template_sql(sql)?;
    let pool = manager.get_pool().await?;
    let start = Instant::now();

    let rows = sqlx::query(&sanitized).fetch_all(&pool).await?;

    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut result_rows = Vec::with_capacity(rows.len());
    for row in &rows {
        result_rows.push(row_to_json(row)?);
    }

    let execution_time_ms = start.elapsed().as_millis();
    tracing::debug!(
        rows = result_rows.len(),
        execution_time_ms = execution_time_ms as u64,
        "Template query executed"
    );

    Ok(QueryResult {
        columns,
        row_count: result_rows.len(),
        rows: result_rows,
        execution_time_ms,
    })
}

fn row_to_json(row: &PgRow) -> AppResult<serde_json::Map<String, Value>> {
    let mut row_map = serde_json::Map::new();

    for (idx, column) in row.columns().iter().enumerate() {
        let col_name = column.name().to_string();
        let col_type = column.type_info().name();

        let raw_value = row.try_get_raw(idx)?;
        if raw_value.is_null() {
            row_map.insert(col_name, Value::Null);
            continue;
        }

        let value = match col_type {
            "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool).unwrap_or(Value::Null),
            "INT2" => row.try_get::<i16, _>(idx).map(|v| Value::Number(v.into())).unwrap_or(Value::Null),
            "INT4" => row.try_get::<i32, _>(idx).map(|v| Value::Number(v.into())).unwrap_or(Value::Null),
            // COUNT(*)
            "INT8" => row.try_get::<i64, _>(idx).map(|v| Value::Number(v.into())).unwrap_or(Value::Null),
            "FLOAT4" | "FLOAT8" => row
                .try_get::<f64, _>(idx)
                .or_else(|_| row.try_get::<f32, _>(idx).map(f64::from))
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            // ROUND/AVG results: charts need numbers, not strings
            "NUMERIC" => row
                .try_get::<Decimal, _>(idx)
                .ok()
                .and_then(|d| d.to_f64())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            "DATE" => row
                .try_get::<NaiveDate, _>(idx)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(idx)
                .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S").to_string()))
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(idx)
                .map(|v| Value::String(v.to_rfc3339()))
                .unwrap_or(Value::Null),
            // estado, unidad, STRING_AGG
            _ => row
                .try_get::<String, _>(idx)
                .map(Value::String)
                .unwrap_or_else(|_| Value::String(format!("<unsupported: {}>", col_type))),
        };

        row_map.insert(col_name, value);
    }

    Ok(row_map)
}
