use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Projections of the hospital tables as returned by PostgREST. Only the
// columns the aggregations select are present; all are optional because the
// hosted schema allows NULL almost everywhere.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BedRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    /// Patients currently assigned, present when the select embeds them
    #[serde(default)]
    pub pacientes: Vec<PatientRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnitRow {
    pub nombre_unidad: String,
    #[serde(default)]
    pub tipo_unidad: Option<String>,
    #[serde(default)]
    pub capacidad_total: Option<i64>,
    #[serde(default)]
    pub camas: Vec<BedRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientRow {
    #[serde(default)]
    pub estado_gravedad: Option<String>,
    #[serde(default)]
    pub fecha_ingreso: Option<String>,
    #[serde(default)]
    pub fecha_alta: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmergencyRow {
    #[serde(default)]
    pub prioridad: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub tiempo_atencion_minutos: Option<f64>,
    #[serde(default)]
    pub fecha_ingreso: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SurgeryRow {
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub fecha_cirugia: Option<String>,
    #[serde(default)]
    pub tipo_cirugia: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatingRoomRow {
    pub numero_quirofano: String,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub activo: Option<bool>,
    #[serde(default)]
    pub cirugias: Vec<SurgeryRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StaffRow {
    #[serde(default)]
    pub especialidad: Option<String>,
    #[serde(default)]
    pub turno_actual: Option<String>,
    #[serde(default)]
    pub disponible_emergencias: Option<bool>,
    #[serde(default, rename = "años_experiencia")]
    pub anos_experiencia: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OccupancyHistoryRow {
    #[serde(default)]
    pub cama_id: Option<String>,
    #[serde(default)]
    pub estado_durante_ocupacion: Option<String>,
    #[serde(default)]
    pub fecha_ocupacion: Option<String>,
    #[serde(default)]
    pub fecha_liberacion: Option<String>,
}

/// UTC calendar day of a PostgREST date or timestamp value. Values without an
/// offset are already UTC.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc().date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.date());
    }
    value
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Timestamp of a PostgREST value, naive dates are taken at midnight
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    parse_day(value).and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_row_reads_accented_column() {
        let row: StaffRow = serde_json::from_str(
            r#"{"especialidad":"Cardiología","turno_actual":"activo","disponible_emergencias":true,"años_experiencia":12}"#,
        )
        .unwrap();
        assert_eq!(row.anos_experiencia, Some(12.0));
        assert_eq!(row.disponible_emergencias, Some(true));
    }

    #[test]
    fn test_unit_row_with_embedded_beds() {
        let row: UnitRow = serde_json::from_str(
            r#"{"nombre_unidad":"UCI","tipo_unidad":"critica","capacidad_total":24,
                "camas":[{"estado":"ocupada","pacientes":[{"estado_gravedad":"critico"}]},{"estado":"disponible"}]}"#,
        )
        .unwrap();
        assert_eq!(row.camas.len(), 2);
        assert_eq!(row.camas[0].pacientes[0].estado_gravedad.as_deref(), Some("critico"));
        assert!(row.camas[1].pacientes.is_empty());
    }

    #[test]
    fn test_parse_day_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_day("2024-03-15"), Some(expected));
        assert_eq!(parse_day("2024-03-15T08:30:00+00:00"), Some(expected));
        assert_eq!(parse_day("2024-03-15T08:30:00.123"), Some(expected));
        assert_eq!(parse_day("2024-03-15 08:30:00"), Some(expected));
        assert_eq!(parse_day("ayer"), None);
    }

    #[test]
    fn test_parse_day_uses_utc() {
        assert_eq!(
            parse_day("2024-03-15T23:30:00-02:00"),
            NaiveDate::from_ymd_opt(2024, 3, 16)
        );
        assert_eq!(
            parse_day("2024-03-16T01:00:00+02:00"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_parse_timestamp_of_plain_date() {
        let ts = parse_timestamp("2024-03-15").unwrap();
        assert_eq!(ts.to_string(), "2024-03-15 00:00:00");
    }
}
