use crate::ai::types::{ChartOrigin, ChartShape};
use crate::ai::visualization::chart::{ChartRow, ChartSpec, AMBER, GREEN, ORANGE, RED};
use crate::db::backend::{LiveBackend, OverviewRows};
use crate::db::hospital::number;
use crate::db::query::QueryResult;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use serde_json::Value;

pub const BEDS_TITLE: &str = "Ocupación de Camas por Unidad";
pub const FLOW_TITLE: &str = "Flujo de Pacientes Semanal";
pub const GRAVITY_TITLE: &str = "Distribución de Pacientes por Gravedad";

const SEVERITY_SLICES: [(&str, &str, &str); 4] = [
    ("leve", "Leve", GREEN),
    ("moderado", "Moderado", AMBER),
    ("grave", "Grave", ORANGE),
    ("critico", "Crítico", RED),
];

/// The static dashboard panel shown above the prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewPanel {
    pub beds: ChartSpec,
    pub flow: ChartSpec,
    pub gravity: ChartSpec,
    pub origin: ChartOrigin,
}

impl OverviewPanel {
    pub fn charts(&self) -> [&ChartSpec; 3] {
        [&self.beds, &self.flow, &self.gravity]
    }
}

/// Overview from the live backend, or the sample panel when there is none or
/// any of the three fetches fails.
///
/// Flow rows are bucketed by UTC day, so `today` must be the UTC date too.
pub async fn fetch_overview(backend: Option<&LiveBackend>, today: NaiveDate) -> OverviewPanel {
    let Some(backend) = backend else {
        return sample_overview(ChartOrigin::Synthetic);
    };

    match backend.fetch_overview().await {
        Ok(rows) => build_overview(&rows, today),
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "Overview fetch failed, using sample panel");
            sample_overview(ChartOrigin::Fallback)
        }
    }
}

/// Charts from rows fetched by either backend
pub fn build_overview(rows: &OverviewRows, today: NaiveDate) -> OverviewPanel {
    OverviewPanel {
        beds: beds_chart(&rows.beds),
        flow: flow_chart(&rows.flow, today),
        gravity: gravity_chart(&rows.severity),
        origin: ChartOrigin::Live,
    }
}

/// Fixed sample values for demos and outages
pub fn sample_overview(origin: ChartOrigin) -> OverviewPanel {
    let beds = [
        ("UCI", 18.0, 24.0, 12.0),
        ("Cardiología", 28.0, 35.0, 8.0),
        ("Neurología", 22.0, 30.0, 15.0),
        ("Traumatología", 32.0, 40.0, 5.0),
    ]
    .iter()
    .map(|(name, ocupadas, totales, criticos)| bed_row(name, *ocupadas, *totales, *criticos))
    .collect();

    let flow = [("Lun", 45.0, 38.0), ("Mar", 52.0, 41.0), ("Mie", 48.0, 45.0), ("Jue", 61.0, 49.0)]
        .iter()
        .map(|(name, ingresos, altas)| flow_row(name, *ingresos, *altas))
        .collect();

    let gravity = SEVERITY_SLICES
        .iter()
        .zip([45.0, 28.0, 18.0, 9.0])
        .map(|((_, label, color), value)| ChartRow::slice(*label, value, *color))
        .collect();

    OverviewPanel {
        beds: ChartSpec::new(ChartShape::Bar, BEDS_TITLE, beds).with_axes("name", "camas_ocupadas"),
        flow: ChartSpec::new(ChartShape::Line, FLOW_TITLE, flow).with_axes("name", "ingresos"),
        gravity: ChartSpec::new(ChartShape::Pie, GRAVITY_TITLE, gravity),
        origin,
    }
}

fn beds_chart(rows: &QueryResult) -> ChartSpec {
    let data = rows
        .rows
        .iter()
        .map(|row| {
            let name = row.get("name").and_then(Value::as_str).unwrap_or("Sin dato");
            bed_row(
                name,
                number(row, "camas_ocupadas"),
                number(row, "camas_totales"),
                number(row, "pacientes_criticos"),
            )
        })
        .collect();
    ChartSpec::new(ChartShape::Bar, BEDS_TITLE, data).with_axes("name", "camas_ocupadas")
}

/// Seven days ending today; days without admissions count zero
fn flow_chart(rows: &QueryResult, today: NaiveDate) -> ChartSpec {
    let data = (0..7)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            let key = day.to_string();
            let row = rows
                .rows
                .iter()
                .find(|r| r.get("dia").and_then(Value::as_str).map(|d| d.starts_with(&key)) == Some(true));
            let (ingresos, altas) = row
                .map(|r| (number(r, "ingresos"), number(r, "altas")))
                .unwrap_or((0.0, 0.0));
            flow_row(weekday_label(day.weekday()), ingresos, altas)
        })
        .collect();
    ChartSpec::new(ChartShape::Line, FLOW_TITLE, data).with_axes("name", "ingresos")
}

/// Whole-number share of hospitalized patients per severity
fn gravity_chart(rows: &QueryResult) -> ChartSpec {
    let count = |severity: &str| {
        rows.rows
            .iter()
            .filter(|r| r.get("estado_gravedad").and_then(Value::as_str) == Some(severity))
            .map(|r| number(r, "total"))
            .sum::<f64>()
    };
    let total: f64 = rows.rows.iter().map(|r| number(r, "total")).sum();

    let data = SEVERITY_SLICES
        .iter()
        .map(|(key, label, color)| {
            let share = if total > 0.0 {
                (count(key) * 100.0 / total).round()
            } else {
                0.0
            };
            ChartRow::slice(*label, share, *color)
        })
        .collect();
    ChartSpec::new(ChartShape::Pie, GRAVITY_TITLE, data)
}

fn bed_row(name: &str, ocupadas: f64, totales: f64, criticos: f64) -> ChartRow {
    ChartRow::new()
        .label("name", name)
        .number("camas_ocupadas", ocupadas)
        .number("camas_totales", totales)
        .number("pacientes_criticos", criticos)
}

fn flow_row(name: &str, ingresos: f64, altas: f64) -> ChartRow {
    ChartRow::new()
        .label("name", name)
        .number("ingresos", ingresos)
        .number("altas", altas)
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Lun",
        Weekday::Tue => "Mar",
        Weekday::Wed => "Mié",
        Weekday::Thu => "Jue",
        Weekday::Fri => "Vie",
        Weekday::Sat => "Sáb",
        Weekday::Sun => "Dom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::hospital::{DAILY_FLOW_COLUMNS, OVERVIEW_BED_COLUMNS, SEVERITY_COUNT_COLUMNS};
    use crate::db::hospital::{daily_flow, record};
    use crate::db::schema::EmergencyRow;
    use crate::ai::visualization::chart::CellValue;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn rows() -> OverviewRows {
        OverviewRows {
            beds: QueryResult::from_rows(
                &OVERVIEW_BED_COLUMNS,
                vec![record(json!({"name": "UCI", "camas_ocupadas": 20, "camas_totales": 24, "pacientes_criticos": 9}))],
            ),
            severity: QueryResult::from_rows(
                &SEVERITY_COUNT_COLUMNS,
                vec![
                    record(json!({"estado_gravedad": "leve", "total": 3})),
                    record(json!({"estado_gravedad": "critico", "total": 1})),
                ],
            ),
            flow: QueryResult::from_rows(
                &DAILY_FLOW_COLUMNS,
                vec![record(json!({"dia": "2024-03-15", "ingresos": 12, "altas": 7}))],
            ),
        }
    }

    #[tokio::test]
    async fn test_without_backend_uses_sample() {
        let panel = fetch_overview(None, today()).await;
        assert_eq!(panel.origin, ChartOrigin::Synthetic);
        assert_eq!(panel.beds.data.len(), 4);
        assert_eq!(panel.gravity.value_total(), 100.0);
    }

    #[test]
    fn test_build_from_rows() {
        let panel = build_overview(&rows(), today());
        assert_eq!(panel.origin, ChartOrigin::Live);
        assert_eq!(panel.beds.data[0].get("camas_totales"), Some(&CellValue::Number(24.0)));

        // 2024-03-15 is a Friday
        assert_eq!(panel.flow.data.len(), 7);
        let last = panel.flow.data.last().unwrap();
        assert_eq!(last.get("name").and_then(CellValue::as_label), Some("Vie"));
        assert_eq!(last.get("ingresos"), Some(&CellValue::Number(12.0)));
        assert_eq!(panel.flow.data[0].get("ingresos"), Some(&CellValue::Number(0.0)));
        assert_eq!(panel.flow.data[0].get("name").and_then(CellValue::as_label), Some("Sáb"));

        let shares: Vec<f64> = panel
            .gravity
            .data
            .iter()
            .map(|r| r.get("value").and_then(CellValue::as_number).unwrap())
            .collect();
        assert_eq!(shares, vec![75.0, 0.0, 0.0, 25.0]);
    }

    #[test]
    fn test_flow_buckets_offset_timestamps_by_utc_day() {
        let emergencies = vec![EmergencyRow {
            fecha_ingreso: Some("2024-03-16T00:30:00+02:00".into()),
            estado: Some("atendido".into()),
            ..Default::default()
        }];
        let mut rows = rows();
        rows.flow = daily_flow(&emergencies);

        let panel = build_overview(&rows, today());
        let last = panel.flow.data.last().unwrap();
        assert_eq!(last.get("ingresos"), Some(&CellValue::Number(1.0)));
        assert_eq!(last.get("altas"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_no_patients_gives_zero_slices() {
        let mut rows = rows();
        rows.severity = QueryResult::from_rows(&SEVERITY_COUNT_COLUMNS, vec![]);
        let panel = build_overview(&rows, today());
        assert_eq!(panel.gravity.value_total(), 0.0);
        assert_eq!(panel.gravity.data.len(), 4);
    }

    #[test]
    fn test_sample_charts_are_uniform() {
        let panel = sample_overview(ChartOrigin::Fallback);
        for chart in panel.charts() {
            assert!(chart.has_uniform_rows(), "{}", chart.title);
        }
        assert_eq!(panel.gravity.data[3].color(), Some(RED));
    }
}
