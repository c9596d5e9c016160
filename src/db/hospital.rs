use crate::db::query::QueryResult;
use crate::db::schema::{
    parse_day, parse_timestamp, EmergencyRow, OccupancyHistoryRow, OperatingRoomRow, PatientRow,
    StaffRow, UnitRow,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

// Row-level aggregations for the hosted REST backend. Each produces the same
// columns, in the same order, as the matching SQL template so charts do not
// depend on which backend answered.

pub const BED_COLUMNS: [&str; 7] = [
    "nombre_unidad",
    "tipo_unidad",
    "total_camas",
    "camas_ocupadas",
    "camas_libres",
    "camas_mantenimiento",
    "porcentaje_ocupacion",
];

pub const PATIENT_COLUMNS: [&str; 6] = [
    "estado_gravedad",
    "total_pacientes",
    "pacientes_hospitalizados",
    "promedio_dias_estancia",
    "primer_ingreso",
    "ultimo_ingreso",
];

pub const EMERGENCY_COLUMNS: [&str; 7] = [
    "prioridad",
    "total_emergencias",
    "tiempo_promedio_atencion",
    "tiempo_minimo",
    "tiempo_maximo",
    "emergencias_resueltas",
    "emergencias_derivadas",
];

pub const SURGERY_COLUMNS: [&str; 7] = [
    "numero_quirofano",
    "estado_quirofano",
    "cirugias_programadas_hoy",
    "cirugias_completadas",
    "cirugias_en_proceso",
    "cirugias_pendientes",
    "tipos_cirugia_hoy",
];

pub const STAFF_COLUMNS: [&str; 5] = [
    "especialidad",
    "total_personal",
    "personal_activo",
    "disponible_emergencias",
    "experiencia_promedio",
];

pub const HISTORY_COLUMNS: [&str; 6] = [
    "fecha",
    "camas_ocupadas_dia",
    "pacientes_criticos",
    "pacientes_graves",
    "pacientes_moderados",
    "altas_mismo_dia",
];

/// Days covered by the history and patient windows
pub const WINDOW_DAYS: i64 = 30;
/// Days covered by the emergency window
pub const EMERGENCY_WINDOW_DAYS: i64 = 7;

const SEVERITY_ORDER: [&str; 4] = ["critico", "grave", "moderado", "leve"];
const PRIORITY_ORDER: [&str; 4] = ["roja", "amarilla", "verde", "azul"];

/// Bed counts and occupancy per unit, busiest first
pub fn aggregate_beds(units: &[UnitRow]) -> QueryResult {
    let mut rows: Vec<Map<String, Value>> = units
        .iter()
        .map(|unit| {
            let count = |estado: &str| {
                unit.camas
                    .iter()
                    .filter(|c| c.estado.as_deref() == Some(estado))
                    .count()
            };
            let total = unit.camas.len();
            let ocupadas = count("ocupada");
            record(json!({
                "nombre_unidad": unit.nombre_unidad,
                "tipo_unidad": unit.tipo_unidad,
                "total_camas": total,
                "camas_ocupadas": ocupadas,
                "camas_libres": count("disponible"),
                "camas_mantenimiento": count("mantenimiento"),
                "porcentaje_ocupacion": ratio_percent(ocupadas, total),
            }))
        })
        .collect();

    rows.sort_by(|a, b| cmp_desc(number(a, "porcentaje_ocupacion"), number(b, "porcentaje_ocupacion")));
    QueryResult::from_rows(&BED_COLUMNS, rows)
}

/// Patients admitted in the window, grouped by severity
pub fn aggregate_patients(patients: &[PatientRow], now: NaiveDateTime) -> QueryResult {
    let groups = group_by(patients, |p| {
        p.estado_gravedad.clone().unwrap_or_else(|| "sin_clasificar".to_string())
    });

    let mut rows: Vec<(String, Map<String, Value>)> = groups
        .into_iter()
        .map(|(severity, members)| {
            let hospitalizados = members.iter().filter(|p| p.fecha_alta.is_none()).count();
            let admissions: Vec<NaiveDateTime> = members
                .iter()
                .filter_map(|p| p.fecha_ingreso.as_deref().and_then(parse_timestamp))
                .collect();
            let stays: Vec<f64> = admissions
                .iter()
                .map(|ingreso| (now - *ingreso).num_days() as f64)
                .collect();

            let row = record(json!({
                "estado_gravedad": severity,
                "total_pacientes": members.len(),
                "pacientes_hospitalizados": hospitalizados,
                "promedio_dias_estancia": mean(&stays).map(round1),
                "primer_ingreso": admissions.iter().min().map(|d| d.to_string()),
                "ultimo_ingreso": admissions.iter().max().map(|d| d.to_string()),
            }));
            (severity, row)
        })
        .collect();

    rows.sort_by_key(|(severity, _)| rank(&SEVERITY_ORDER, severity));
    QueryResult::from_rows(&PATIENT_COLUMNS, rows.into_iter().map(|(_, r)| r).collect())
}

/// Emergencies of the window grouped by triage priority
pub fn aggregate_emergencies(emergencies: &[EmergencyRow]) -> QueryResult {
    let groups = group_by(emergencies, |e| {
        e.prioridad.clone().unwrap_or_else(|| "sin_clasificar".to_string())
    });

    let mut rows: Vec<(String, Map<String, Value>)> = groups
        .into_iter()
        .map(|(priority, members)| {
            let times: Vec<f64> = members
                .iter()
                .filter_map(|e| e.tiempo_atencion_minutos)
                .collect();
            let with_state = |estado: &str| {
                members
                    .iter()
                    .filter(|e| e.estado.as_deref() == Some(estado))
                    .count()
            };

            let row = record(json!({
                "prioridad": priority,
                "total_emergencias": members.len(),
                "tiempo_promedio_atencion": mean(&times).map(round1),
                "tiempo_minimo": times.iter().copied().reduce(f64::min),
                "tiempo_maximo": times.iter().copied().reduce(f64::max),
                "emergencias_resueltas": with_state("atendido"),
                "emergencias_derivadas": with_state("derivado"),
            }));
            (priority, row)
        })
        .collect();

    rows.sort_by_key(|(priority, _)| rank(&PRIORITY_ORDER, priority));
    QueryResult::from_rows(&EMERGENCY_COLUMNS, rows.into_iter().map(|(_, r)| r).collect())
}

/// Active operating rooms with today's surgeries by state
pub fn aggregate_operating_rooms(rooms: &[OperatingRoomRow], today: NaiveDate) -> QueryResult {
    let mut active: Vec<&OperatingRoomRow> = rooms
        .iter()
        .filter(|room| room.activo.unwrap_or(false))
        .collect();
    active.sort_by(|a, b| a.numero_quirofano.cmp(&b.numero_quirofano));

    let rows = active
        .into_iter()
        .map(|room| {
            let todays: Vec<_> = room
                .cirugias
                .iter()
                .filter(|c| c.fecha_cirugia.as_deref().and_then(parse_day) == Some(today))
                .collect();
            let with_state = |estado: &str| {
                todays
                    .iter()
                    .filter(|c| c.estado.as_deref() == Some(estado))
                    .count()
            };
            let kinds: BTreeSet<&str> = todays
                .iter()
                .filter_map(|c| c.tipo_cirugia.as_deref())
                .collect();
            let kinds = (!kinds.is_empty()).then(|| kinds.into_iter().collect::<Vec<_>>().join(", "));

            record(json!({
                "numero_quirofano": room.numero_quirofano,
                "estado_quirofano": room.estado,
                "cirugias_programadas_hoy": todays.len(),
                "cirugias_completadas": with_state("completada"),
                "cirugias_en_proceso": with_state("en_proceso"),
                "cirugias_pendientes": with_state("programada"),
                "tipos_cirugia_hoy": kinds,
            }))
        })
        .collect();

    QueryResult::from_rows(&SURGERY_COLUMNS, rows)
}

/// Active staff per speciality, most on shift first
pub fn aggregate_staff(staff: &[StaffRow]) -> QueryResult {
    let groups = group_by(staff, |s| {
        s.especialidad.clone().unwrap_or_else(|| "sin_especialidad".to_string())
    });

    let mut rows: Vec<Map<String, Value>> = groups
        .into_iter()
        .map(|(speciality, members)| {
            let on_shift = |s: &StaffRow| s.turno_actual.as_deref() == Some("activo");
            let experience: Vec<f64> = members.iter().filter_map(|s| s.anos_experiencia).collect();

            record(json!({
                "especialidad": speciality,
                "total_personal": members.len(),
                "personal_activo": members.iter().filter(|s| on_shift(s)).count(),
                "disponible_emergencias": members
                    .iter()
                    .filter(|s| on_shift(s) && s.disponible_emergencias.unwrap_or(false))
                    .count(),
                "experiencia_promedio": mean(&experience).map(round1),
            }))
        })
        .collect();

    rows.sort_by(|a, b| {
        cmp_desc(number(a, "personal_activo"), number(b, "personal_activo"))
            .then_with(|| cmp_desc(number(a, "total_personal"), number(b, "total_personal")))
    });
    QueryResult::from_rows(&STAFF_COLUMNS, rows)
}

/// Daily bed occupancy, newest day first, at most [`WINDOW_DAYS`] days
pub fn aggregate_history(history: &[OccupancyHistoryRow]) -> QueryResult {
    let dated: Vec<(NaiveDate, &OccupancyHistoryRow)> = history
        .iter()
        .filter_map(|h| {
            h.fecha_ocupacion
                .as_deref()
                .and_then(parse_day)
                .map(|day| (day, h))
        })
        .collect();

    let mut days: Vec<NaiveDate> = dated.iter().map(|(d, _)| *d).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    days.truncate(WINDOW_DAYS as usize);

    let rows = days
        .into_iter()
        .map(|day| {
            let entries: Vec<&OccupancyHistoryRow> = dated
                .iter()
                .filter(|(d, _)| *d == day)
                .map(|(_, h)| *h)
                .collect();
            let beds: HashSet<&str> = entries.iter().filter_map(|h| h.cama_id.as_deref()).collect();
            let with_state = |estado: &str| {
                entries
                    .iter()
                    .filter(|h| h.estado_durante_ocupacion.as_deref() == Some(estado))
                    .count()
            };
            let same_day = entries
                .iter()
                .filter(|h| h.fecha_liberacion.as_deref().and_then(parse_day) == Some(day))
                .count();

            record(json!({
                "fecha": day.to_string(),
                "camas_ocupadas_dia": beds.len(),
                "pacientes_criticos": with_state("critico"),
                "pacientes_graves": with_state("grave"),
                "pacientes_moderados": with_state("moderado"),
                "altas_mismo_dia": same_day,
            }))
        })
        .collect();

    QueryResult::from_rows(&HISTORY_COLUMNS, rows)
}

pub const OVERVIEW_BED_COLUMNS: [&str; 4] =
    ["name", "camas_ocupadas", "camas_totales", "pacientes_criticos"];
pub const SEVERITY_COUNT_COLUMNS: [&str; 2] = ["estado_gravedad", "total"];
pub const DAILY_FLOW_COLUMNS: [&str; 3] = ["dia", "ingresos", "altas"];

/// Occupied beds, capacity and critical patients per unit for the overview
pub fn overview_beds(units: &[UnitRow]) -> QueryResult {
    let rows = units
        .iter()
        .map(|unit| {
            let name = unit
                .nombre_unidad
                .split(" - ")
                .next()
                .filter(|n| !n.is_empty())
                .unwrap_or(&unit.nombre_unidad);
            let ocupadas = unit
                .camas
                .iter()
                .filter(|c| c.estado.as_deref() == Some("ocupada"))
                .count();
            let criticos = unit
                .camas
                .iter()
                .filter(|c| {
                    c.pacientes
                        .iter()
                        .any(|p| p.fecha_alta.is_none() && p.estado_gravedad.as_deref() == Some("critico"))
                })
                .count();

            record(json!({
                "name": name,
                "camas_ocupadas": ocupadas,
                "camas_totales": unit.capacidad_total.unwrap_or(unit.camas.len() as i64),
                "pacientes_criticos": criticos,
            }))
        })
        .collect();

    QueryResult::from_rows(&OVERVIEW_BED_COLUMNS, rows)
}

/// Patient count per severity
pub fn severity_counts(patients: &[PatientRow]) -> QueryResult {
    let rows = group_by(patients, |p| {
        p.estado_gravedad.clone().unwrap_or_else(|| "sin_clasificar".to_string())
    })
    .into_iter()
    .map(|(severity, members)| {
        record(json!({
            "estado_gravedad": severity,
            "total": members.len(),
        }))
    })
    .collect();

    QueryResult::from_rows(&SEVERITY_COUNT_COLUMNS, rows)
}

/// Emergency admissions and attended cases per calendar day, oldest first
pub fn daily_flow(emergencies: &[EmergencyRow]) -> QueryResult {
    let dated: Vec<(NaiveDate, &EmergencyRow)> = emergencies
        .iter()
        .filter_map(|e| e.fecha_ingreso.as_deref().and_then(parse_day).map(|d| (d, e)))
        .collect();

    let days: BTreeSet<NaiveDate> = dated.iter().map(|(d, _)| *d).collect();
    let rows = days
        .into_iter()
        .map(|day| {
            let entries: Vec<&EmergencyRow> = dated
                .iter()
                .filter(|(d, _)| *d == day)
                .map(|(_, e)| *e)
                .collect();
            record(json!({
                "dia": day.to_string(),
                "ingresos": entries.len(),
                "altas": entries
                    .iter()
                    .filter(|e| e.estado.as_deref() == Some("atendido"))
                    .count(),
            }))
        })
        .collect();

    QueryResult::from_rows(&DAILY_FLOW_COLUMNS, rows)
}

/// Group rows by key, keeping the order in which keys first appear
pub(crate) fn group_by<'a, T>(
    rows: &'a [T],
    key: impl Fn(&T) -> String,
) -> Vec<(String, Vec<&'a T>)> {
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();
    for row in rows {
        let k = key(row);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(row),
            None => groups.push((k, vec![row])),
        }
    }
    groups
}

pub(crate) fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub(crate) fn number(row: &Map<String, Value>, key: &str) -> f64 {
    row.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn rank(order: &[&str], key: &str) -> usize {
    order.iter().position(|k| *k == key).unwrap_or(order.len())
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ratio_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 * 100.0 / whole as f64).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{BedRow, SurgeryRow};

    fn bed(estado: &str) -> BedRow {
        BedRow {
            estado: Some(estado.to_string()),
            ..Default::default()
        }
    }

    fn at(value: &str) -> NaiveDateTime {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn test_beds_per_unit_sorted_by_occupancy() {
        let units = vec![
            UnitRow {
                nombre_unidad: "Pediatría".into(),
                tipo_unidad: Some("general".into()),
                capacidad_total: Some(4),
                camas: vec![bed("ocupada"), bed("disponible"), bed("disponible"), bed("mantenimiento")],
            },
            UnitRow {
                nombre_unidad: "UCI".into(),
                tipo_unidad: Some("critica".into()),
                capacidad_total: Some(3),
                camas: vec![bed("ocupada"), bed("ocupada"), bed("disponible")],
            },
        ];

        let result = aggregate_beds(&units);
        assert_eq!(result.columns, BED_COLUMNS.to_vec());
        assert_eq!(result.rows[0]["nombre_unidad"], json!("UCI"));
        assert_eq!(result.rows[0]["porcentaje_ocupacion"], json!(67.0));
        assert_eq!(result.rows[1]["camas_libres"], json!(2));
        assert_eq!(result.rows[1]["camas_mantenimiento"], json!(1));
    }

    #[test]
    fn test_unit_without_beds_is_zero_percent() {
        let units = vec![UnitRow {
            nombre_unidad: "Nueva".into(),
            ..Default::default()
        }];
        let result = aggregate_beds(&units);
        assert_eq!(result.rows[0]["porcentaje_ocupacion"], json!(0.0));
    }

    #[test]
    fn test_patients_by_severity() {
        let now = at("2024-03-15T12:00:00");
        let patient = |severity: &str, ingreso: &str, alta: Option<&str>| PatientRow {
            estado_gravedad: Some(severity.into()),
            fecha_ingreso: Some(ingreso.into()),
            fecha_alta: alta.map(String::from),
        };
        let patients = vec![
            patient("leve", "2024-03-10T12:00:00", Some("2024-03-12")),
            patient("critico", "2024-03-14T12:00:00", None),
            patient("critico", "2024-03-11T12:00:00", None),
        ];

        let result = aggregate_patients(&patients, now);
        assert_eq!(result.row_count, 2);
        let critico = &result.rows[0];
        assert_eq!(critico["estado_gravedad"], json!("critico"));
        assert_eq!(critico["total_pacientes"], json!(2));
        assert_eq!(critico["pacientes_hospitalizados"], json!(2));
        assert_eq!(critico["promedio_dias_estancia"], json!(2.5));
        assert_eq!(critico["primer_ingreso"], json!("2024-03-11 12:00:00"));
        assert_eq!(result.rows[1]["pacientes_hospitalizados"], json!(0));
    }

    #[test]
    fn test_emergencies_by_priority() {
        let emergency = |prioridad: &str, estado: &str, minutos: Option<f64>| EmergencyRow {
            prioridad: Some(prioridad.into()),
            estado: Some(estado.into()),
            tiempo_atencion_minutos: minutos,
            fecha_ingreso: None,
        };
        let rows = vec![
            emergency("verde", "atendido", Some(60.0)),
            emergency("roja", "atendido", Some(5.0)),
            emergency("roja", "derivado", Some(10.0)),
            emergency("roja", "en_espera", None),
        ];

        let result = aggregate_emergencies(&rows);
        let roja = &result.rows[0];
        assert_eq!(roja["prioridad"], json!("roja"));
        assert_eq!(roja["total_emergencias"], json!(3));
        assert_eq!(roja["tiempo_promedio_atencion"], json!(7.5));
        assert_eq!(roja["tiempo_minimo"], json!(5.0));
        assert_eq!(roja["tiempo_maximo"], json!(10.0));
        assert_eq!(roja["emergencias_resueltas"], json!(1));
        assert_eq!(roja["emergencias_derivadas"], json!(1));
        assert_eq!(result.rows[1]["prioridad"], json!("verde"));
    }

    #[test]
    fn test_operating_rooms_count_only_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let surgery = |estado: &str, fecha: &str, tipo: &str| SurgeryRow {
            estado: Some(estado.into()),
            fecha_cirugia: Some(fecha.into()),
            tipo_cirugia: Some(tipo.into()),
        };
        let rooms = vec![
            OperatingRoomRow {
                numero_quirofano: "Q-02".into(),
                estado: Some("disponible".into()),
                activo: Some(true),
                cirugias: vec![],
            },
            OperatingRoomRow {
                numero_quirofano: "Q-01".into(),
                estado: Some("ocupado".into()),
                activo: Some(true),
                cirugias: vec![
                    surgery("completada", "2024-03-15", "Cardiovascular"),
                    surgery("programada", "2024-03-15", "Cardiovascular"),
                    surgery("en_proceso", "2024-03-15", "Ortopedia"),
                    surgery("completada", "2024-03-14", "General"),
                ],
            },
            OperatingRoomRow {
                numero_quirofano: "Q-03".into(),
                activo: Some(false),
                ..Default::default()
            },
        ];

        let result = aggregate_operating_rooms(&rooms, today);
        assert_eq!(result.row_count, 2);
        let q1 = &result.rows[0];
        assert_eq!(q1["numero_quirofano"], json!("Q-01"));
        assert_eq!(q1["cirugias_programadas_hoy"], json!(3));
        assert_eq!(q1["cirugias_completadas"], json!(1));
        assert_eq!(q1["cirugias_en_proceso"], json!(1));
        assert_eq!(q1["cirugias_pendientes"], json!(1));
        assert_eq!(q1["tipos_cirugia_hoy"], json!("Cardiovascular, Ortopedia"));
        assert_eq!(result.rows[1]["tipos_cirugia_hoy"], Value::Null);
    }

    #[test]
    fn test_staff_by_speciality() {
        let member = |esp: &str, turno: &str, emerg: bool, exp: Option<f64>| StaffRow {
            especialidad: Some(esp.into()),
            turno_actual: Some(turno.into()),
            disponible_emergencias: Some(emerg),
            anos_experiencia: exp,
        };
        let staff = vec![
            member("Pediatría", "descanso", true, Some(4.0)),
            member("Cardiología", "activo", true, Some(10.0)),
            member("Cardiología", "activo", false, Some(15.0)),
            member("Cardiología", "descanso", true, None),
        ];

        let result = aggregate_staff(&staff);
        let cardio = &result.rows[0];
        assert_eq!(cardio["especialidad"], json!("Cardiología"));
        assert_eq!(cardio["total_personal"], json!(3));
        assert_eq!(cardio["personal_activo"], json!(2));
        assert_eq!(cardio["disponible_emergencias"], json!(1));
        assert_eq!(cardio["experiencia_promedio"], json!(12.5));
        assert_eq!(result.rows[1]["personal_activo"], json!(0));
    }

    #[test]
    fn test_history_newest_first_with_distinct_beds() {
        let entry = |cama: &str, estado: &str, ocupacion: &str, liberacion: Option<&str>| {
            OccupancyHistoryRow {
                cama_id: Some(cama.into()),
                estado_durante_ocupacion: Some(estado.into()),
                fecha_ocupacion: Some(ocupacion.into()),
                fecha_liberacion: liberacion.map(String::from),
            }
        };
        let history = vec![
            entry("c1", "critico", "2024-03-13T08:00:00", Some("2024-03-13T20:00:00")),
            entry("c1", "grave", "2024-03-14T08:00:00", None),
            entry("c1", "moderado", "2024-03-14T09:00:00", Some("2024-03-16T08:00:00")),
            entry("c2", "grave", "2024-03-14T10:00:00", None),
        ];

        let result = aggregate_history(&history);
        assert_eq!(result.row_count, 2);
        let newest = &result.rows[0];
        assert_eq!(newest["fecha"], json!("2024-03-14"));
        assert_eq!(newest["camas_ocupadas_dia"], json!(2));
        assert_eq!(newest["pacientes_graves"], json!(2));
        assert_eq!(newest["pacientes_moderados"], json!(1));
        assert_eq!(newest["altas_mismo_dia"], json!(0));
        assert_eq!(result.rows[1]["altas_mismo_dia"], json!(1));
    }

    #[test]
    fn test_history_capped() {
        let history: Vec<OccupancyHistoryRow> = (0..40)
            .map(|i| OccupancyHistoryRow {
                cama_id: Some(format!("c{}", i)),
                fecha_ocupacion: Some(
                    (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i)).to_string(),
                ),
                ..Default::default()
            })
            .collect();
        let result = aggregate_history(&history);
        assert_eq!(result.row_count, WINDOW_DAYS as usize);
        assert_eq!(result.rows[0]["fecha"], json!("2024-02-09"));
    }

    #[test]
    fn test_overview_beds_short_names_and_critical() {
        let mut occupied = bed("ocupada");
        occupied.pacientes = vec![PatientRow {
            estado_gravedad: Some("critico".into()),
            ..Default::default()
        }];
        let units = vec![UnitRow {
            nombre_unidad: "UCI - Planta 3".into(),
            capacidad_total: Some(24),
            camas: vec![occupied, bed("ocupada"), bed("disponible")],
            ..Default::default()
        }];

        let result = overview_beds(&units);
        let row = &result.rows[0];
        assert_eq!(row["name"], json!("UCI"));
        assert_eq!(row["camas_ocupadas"], json!(2));
        assert_eq!(row["camas_totales"], json!(24));
        assert_eq!(row["pacientes_criticos"], json!(1));
    }

    #[test]
    fn test_daily_flow_groups_by_day() {
        let emergency = |fecha: &str, estado: &str| EmergencyRow {
            fecha_ingreso: Some(fecha.into()),
            estado: Some(estado.into()),
            ..Default::default()
        };
        let rows = vec![
            emergency("2024-03-15T10:00:00+00:00", "atendido"),
            emergency("2024-03-14T23:00:00+00:00", "en_espera"),
            emergency("2024-03-15T11:00:00+00:00", "derivado"),
        ];

        let result = daily_flow(&rows);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["dia"], json!("2024-03-14"));
        assert_eq!(result.rows[1]["ingresos"], json!(2));
        assert_eq!(result.rows[1]["altas"], json!(1));
    }

    #[test]
    fn test_severity_counts() {
        let patient = |s: &str| PatientRow {
            estado_gravedad: Some(s.into()),
            ..Default::default()
        };
        let result = severity_counts(&[patient("leve"), patient("grave"), patient("leve")]);
        assert_eq!(result.rows[0]["estado_gravedad"], json!("leve"));
        assert_eq!(result.rows[0]["total"], json!(2));
    }

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let rows = ["b", "a", "b", "c"];
        let groups = group_by(&rows, |r| r.to_string());
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
