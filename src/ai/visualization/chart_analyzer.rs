use crate::ai::types::{ChartShape, QueryCategory};
use crate::ai::visualization::chart::{palette_color, CellValue, ChartRow, ChartSpec};
use crate::ai::visualization::synthesizer::occupancy_color;
use crate::db::query::QueryResult;
use crate::error::{AppError, AppResult};
use serde_json::Value;

/// Build chart datasets from rows fetched from the hospital database.
///
/// Line and area charts run along the first date column when there is one;
/// otherwise the first non-numeric column is the category axis. Every numeric
/// column becomes a series. Rows are reduced to those keys so all rows share one key
/// set, with missing numbers reported as 0.
pub fn build_charts(
    data: &QueryResult,
    category: QueryCategory,
    shape: ChartShape,
) -> AppResult<Vec<ChartSpec>> {
    if data.row_count == 0 || data.rows.is_empty() {
        return Err(AppError::VisualizationError(
            "Cannot generate chart from empty result set".into(),
        ));
    }

    if data.columns.is_empty() {
        return Err(AppError::VisualizationError("No columns in result".into()));
    }

    let numeric_cols = detect_numeric_columns(&data.columns, &data.rows);
    if numeric_cols.is_empty() {
        return Err(AppError::VisualizationError("No numeric column found".into()));
    }

    let shape = category.resolve_shape(shape);
    let temporal_cols = detect_temporal_columns(&data.columns, &data.rows);
    let label_cols: Vec<&String> = data
        .columns
        .iter()
        .filter(|c| !numeric_cols.contains(c))
        .collect();

    // Trends run along time when the rows carry a date
    let trend_col = match shape {
        ChartShape::Line | ChartShape::Area => {
            label_cols.iter().copied().find(|c| temporal_cols.contains(*c))
        }
        _ => None,
    };
    let x_col = trend_col
        .or_else(|| label_cols.first().copied())
        .ok_or_else(|| AppError::VisualizationError("No categorical column found".into()))?;

    let mut rows: Vec<&serde_json::Map<String, Value>> = data.rows.iter().collect();
    if temporal_cols.contains(x_col) {
        // Chronological order for trends
        rows.sort_by(|a, b| label_of(a.get(x_col)).cmp(&label_of(b.get(x_col))));
    }

    let title = live_title(category);

    let spec = match shape {
        ChartShape::Pie => {
            let value_col = pie_value_column(&numeric_cols);
            let data = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let value = number_of(row.get(value_col));
                    let color = match category {
                        QueryCategory::BedOccupancy if value_col.contains("porcentaje") => {
                            occupancy_color(value)
                        }
                        _ => palette_color(i),
                    };
                    ChartRow::slice(label_of(row.get(x_col)), value, color)
                })
                .collect();
            ChartSpec::new(ChartShape::Pie, title, data)
        }
        _ => {
            let data = rows
                .iter()
                .map(|row| {
                    let mut record = ChartRow::new().label(x_col, label_of(row.get(x_col)));
                    for col in &numeric_cols {
                        record.set(col, CellValue::Number(number_of(row.get(col))));
                    }
                    record
                })
                .collect();
            ChartSpec::new(shape, title, data).with_axes(x_col, &numeric_cols[0])
        }
    };

    Ok(vec![spec])
}

/// Title for charts built from live rows
pub fn live_title(category: QueryCategory) -> &'static str {
    match category {
        QueryCategory::BedOccupancy => "Ocupación de Camas por Unidad",
        QueryCategory::PatientSeverity => "Pacientes por Nivel de Gravedad",
        QueryCategory::Emergency => "Emergencias por Prioridad (Últimos 7 Días)",
        QueryCategory::Surgery => "Estado de Quirófanos y Cirugías",
        QueryCategory::Staff => "Personal Médico Activo por Especialidad",
        QueryCategory::History => "Histórico de Ocupación de Camas",
    }
}

/// Percentage columns make the best slices; otherwise the first series
fn pie_value_column(numeric_cols: &[String]) -> &str {
    numeric_cols
        .iter()
        .find(|c| c.contains("porcentaje"))
        .unwrap_or(&numeric_cols[0])
}

fn label_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Sin dato".to_string(),
        Some(other) => other.to_string(),
    }
}

fn number_of(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Detect temporal/date columns
fn detect_temporal_columns(columns: &[String], rows: &[serde_json::Map<String, Value>]) -> Vec<String> {
    let mut temporal = Vec::new();

    for col in columns {
        let col_lower = col.to_lowercase();

        // Check column name
        if col_lower.contains("fecha")
            || col_lower.contains("date")
            || col_lower.contains("created")
            || col_lower.contains("updated")
            || col_lower == "dia"
            || col_lower == "semana"
            || col_lower == "hora"
        {
            temporal.push(col.clone());
            continue;
        }

        // Check data type by sampling first row
        if let Some(first_row) = rows.first() {
            if let Some(value) = first_row.get(col) {
                if let Some(s) = value.as_str() {
                    if is_date_like(s) {
                        temporal.push(col.clone());
                    }
                }
            }
        }
    }

    temporal
}

/// Detect numeric columns
fn detect_numeric_columns(
    columns: &[String],
    rows: &[serde_json::Map<String, Value>],
) -> Vec<String> {
    let mut numeric = Vec::new();

    for col in columns {
        // Skip if it's clearly an ID column
        let col_lower = col.to_lowercase();
        if col_lower == "id" || col_lower.ends_with("_id") || col_lower.starts_with("id_") {
            continue;
        }

        // Numeric if any row holds a number; NULL aggregates are common
        if rows
            .iter()
            .any(|row| row.get(col).map(Value::is_number).unwrap_or(false))
        {
            numeric.push(col.clone());
        }
    }

    numeric
}

/// Simple date string detection
fn is_date_like(s: &str) -> bool {
    s.contains('-') && s.len() >= 8 && s.chars().filter(|c| c.is_numeric()).count() >= 4
}
