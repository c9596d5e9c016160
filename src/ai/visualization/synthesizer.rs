use crate::ai::types::{ChartShape, QueryCategory};
use crate::ai::visualization::chart::{palette_color, ChartRow, ChartSpec, AMBER, BLUE, GREEN, ORANGE, RED};
use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sample tables the synthetic charts are drawn from
struct BedUnit {
    unidad: &'static str,
    ocupadas: u32,
    totales: u32,
    disponibles: u32,
    ocupacion: u32,
}

const BED_UNITS: [BedUnit; 6] = [
    BedUnit { unidad: "UCI", ocupadas: 18, totales: 24, disponibles: 6, ocupacion: 75 },
    BedUnit { unidad: "Cardiología", ocupadas: 28, totales: 35, disponibles: 7, ocupacion: 80 },
    BedUnit { unidad: "Neurología", ocupadas: 22, totales: 30, disponibles: 8, ocupacion: 73 },
    BedUnit { unidad: "Traumatología", ocupadas: 32, totales: 40, disponibles: 8, ocupacion: 80 },
    BedUnit { unidad: "Pediatría", ocupadas: 15, totales: 25, disponibles: 10, ocupacion: 60 },
    BedUnit { unidad: "Emergencias", ocupadas: 45, totales: 50, disponibles: 5, ocupacion: 90 },
];

struct SeverityGroup {
    gravedad: &'static str,
    cantidad: u32,
    dias_promedio: f64,
    porcentaje: u32,
    color: &'static str,
}

const SEVERITY_GROUPS: [SeverityGroup; 4] = [
    SeverityGroup { gravedad: "Crítico", cantidad: 12, dias_promedio: 8.5, porcentaje: 15, color: RED },
    SeverityGroup { gravedad: "Grave", cantidad: 28, dias_promedio: 6.2, porcentaje: 35, color: ORANGE },
    SeverityGroup { gravedad: "Moderado", cantidad: 32, dias_promedio: 4.1, porcentaje: 40, color: AMBER },
    SeverityGroup { gravedad: "Leve", cantidad: 8, dias_promedio: 2.3, porcentaje: 10, color: GREEN },
];

struct PriorityGroup {
    prioridad: &'static str,
    cantidad: u32,
    tiempo_promedio: u32,
    resueltas: u32,
    color: &'static str,
}

const PRIORITY_GROUPS: [PriorityGroup; 4] = [
    PriorityGroup { prioridad: "Roja", cantidad: 15, tiempo_promedio: 8, resueltas: 14, color: RED },
    PriorityGroup { prioridad: "Amarilla", cantidad: 32, tiempo_promedio: 25, resueltas: 30, color: AMBER },
    PriorityGroup { prioridad: "Verde", cantidad: 28, tiempo_promedio: 45, resueltas: 28, color: GREEN },
    PriorityGroup { prioridad: "Azul", cantidad: 12, tiempo_promedio: 90, resueltas: 12, color: BLUE },
];

const EMERGENCY_SLOTS: [(&str, u32, u32); 4] = [
    ("00-06", 8, 15),
    ("06-12", 25, 22),
    ("12-18", 35, 28),
    ("18-24", 19, 18),
];

struct OperatingRoom {
    quirofano: &'static str,
    programadas: u32,
    completadas: u32,
    en_proceso: u32,
    disponible: bool,
}

const OPERATING_ROOMS: [OperatingRoom; 5] = [
    OperatingRoom { quirofano: "Q01", programadas: 4, completadas: 3, en_proceso: 1, disponible: true },
    OperatingRoom { quirofano: "Q02", programadas: 3, completadas: 3, en_proceso: 0, disponible: true },
    OperatingRoom { quirofano: "Q03", programadas: 5, completadas: 4, en_proceso: 1, disponible: false },
    OperatingRoom { quirofano: "Q04", programadas: 2, completadas: 2, en_proceso: 0, disponible: true },
    OperatingRoom { quirofano: "Q05", programadas: 0, completadas: 0, en_proceso: 0, disponible: false },
];

const SURGERY_TYPES: [(&str, u32, u32); 4] = [
    ("Cardiovascular", 8, 180),
    ("Neurológica", 5, 240),
    ("Traumatológica", 12, 90),
    ("General", 15, 60),
];

struct StaffGroup {
    especialidad: &'static str,
    total: u32,
    activos: u32,
    emergencias: u32,
    experiencia: f64,
}

const STAFF_GROUPS: [StaffGroup; 5] = [
    StaffGroup { especialidad: "Cardiología", total: 12, activos: 10, emergencias: 8, experiencia: 8.5 },
    StaffGroup { especialidad: "Neurología", total: 8, activos: 7, emergencias: 5, experiencia: 12.2 },
    StaffGroup { especialidad: "Traumatología", total: 15, activos: 14, emergencias: 12, experiencia: 6.8 },
    StaffGroup { especialidad: "Pediatría", total: 10, activos: 9, emergencias: 6, experiencia: 9.1 },
    StaffGroup { especialidad: "Cuidados Intensivos", total: 18, activos: 16, emergencias: 16, experiencia: 10.5 },
];

const HISTORY_DAYS: i64 = 30;

const SPANISH_MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Synthetic chart data for a query category.
///
/// Values are fixed sample tables, some perturbed with uniform jitter. The RNG
/// is owned by the synthesizer so tests can seed it; titles and key sets never
/// depend on it.
pub struct ChartSynthesizer {
    rng: StdRng,
    today: NaiveDate,
}

impl Default for ChartSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartSynthesizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            today: Local::now().date_naive(),
        }
    }

    /// Reproducible synthesizer anchored at a fixed date
    pub fn seeded(seed: u64, today: NaiveDate) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            today,
        }
    }

    /// Chart datasets for `category` drawn as `shape`.
    ///
    /// Shapes the category has no rendition for fall back to its default shape.
    pub fn synthesize(&mut self, category: QueryCategory, shape: ChartShape) -> Vec<ChartSpec> {
        let shape = category.resolve_shape(shape);
        match category {
            QueryCategory::BedOccupancy => self.bed_charts(shape),
            QueryCategory::PatientSeverity => self.patient_charts(shape),
            QueryCategory::Emergency => emergency_charts(shape),
            QueryCategory::Surgery => surgery_charts(shape),
            QueryCategory::Staff => staff_charts(shape),
            QueryCategory::History => self.history_charts(shape),
        }
    }

    fn bed_charts(&mut self, shape: ChartShape) -> Vec<ChartSpec> {
        match shape {
            ChartShape::Pie => {
                let data = BED_UNITS
                    .iter()
                    .map(|u| ChartRow::slice(u.unidad, u.ocupacion as f64, occupancy_color(u.ocupacion as f64)))
                    .collect();
                vec![ChartSpec::new(ChartShape::Pie, "Porcentaje de Ocupación por Unidad", data)]
            }
            ChartShape::Line => {
                let data = BED_UNITS
                    .iter()
                    .enumerate()
                    .map(|(i, u)| {
                        let jitter = self.rng.gen::<f64>() * 10.0 - 5.0;
                        ChartRow::new()
                            .label("dia", format!("Día {}", i + 1))
                            .number("ocupacion", u.ocupacion as f64)
                            .number("tendencia", round1(u.ocupacion as f64 + jitter))
                    })
                    .collect();
                vec![ChartSpec::new(ChartShape::Line, "Tendencia de Ocupación Semanal", data)]
            }
            _ => {
                let data = BED_UNITS
                    .iter()
                    .map(|u| {
                        ChartRow::new()
                            .label("unidad", u.unidad)
                            .number("ocupadas", u.ocupadas as f64)
                            .number("totales", u.totales as f64)
                            .number("disponibles", u.disponibles as f64)
                            .number("ocupacion", u.ocupacion as f64)
                    })
                    .collect();
                vec![ChartSpec::new(ChartShape::Bar, "Ocupación de Camas por Unidad", data)
                    .with_axes("unidad", "cantidad")]
            }
        }
    }

    fn patient_charts(&mut self, shape: ChartShape) -> Vec<ChartSpec> {
        match shape {
            ChartShape::Bar => {
                let data = SEVERITY_GROUPS
                    .iter()
                    .map(|g| {
                        ChartRow::new()
                            .label("gravedad", g.gravedad)
                            .number("cantidad", g.cantidad as f64)
                            .number("dias_promedio", g.dias_promedio)
                            .number("porcentaje", g.porcentaje as f64)
                    })
                    .collect();
                vec![ChartSpec::new(ChartShape::Bar, "Pacientes por Gravedad y Días de Estancia", data)
                    .with_axes("gravedad", "cantidad")]
            }
            ChartShape::Line => {
                let data = SEVERITY_GROUPS
                    .iter()
                    .enumerate()
                    .map(|(i, g)| {
                        let criticos = if g.gravedad == "Crítico" {
                            g.cantidad
                        } else {
                            self.rng.gen_range(8..23)
                        };
                        let graves = if g.gravedad == "Grave" {
                            g.cantidad
                        } else {
                            self.rng.gen_range(20..50)
                        };
                        ChartRow::new()
                            .label("semana", format!("Sem {}", i + 1))
                            .number("criticos", criticos as f64)
                            .number("graves", graves as f64)
                    })
                    .collect();
                vec![ChartSpec::new(ChartShape::Line, "Evolución de Pacientes Críticos y Graves", data)]
            }
            _ => {
                let data = SEVERITY_GROUPS
                    .iter()
                    .map(|g| ChartRow::slice(g.gravedad, g.porcentaje as f64, g.color))
                    .collect();
                vec![ChartSpec::new(ChartShape::Pie, "Distribución de Pacientes por Gravedad", data)]
            }
        }
    }

    fn history_charts(&mut self, shape: ChartShape) -> Vec<ChartSpec> {
        let history: Vec<ChartRow> = (0..HISTORY_DAYS)
            .map(|i| {
                let day = self.today - Duration::days(HISTORY_DAYS - 1 - i);
                ChartRow::new()
                    .label("fecha", spanish_short_date(day))
                    .number("ocupacion", self.rng.gen_range(70..90) as f64)
                    .number("ingresos", self.rng.gen_range(20..35) as f64)
                    .number("altas", self.rng.gen_range(18..33) as f64)
                    .number("criticos", self.rng.gen_range(5..13) as f64)
            })
            .collect();

        match shape {
            ChartShape::Area => vec![ChartSpec::new(
                ChartShape::Area,
                "Flujo de Ingresos y Altas - Última Semana",
                last_n(history, 7),
            )
            .with_axes("fecha", "cantidad")],
            _ => vec![ChartSpec::new(
                ChartShape::Line,
                "Tendencia de Ocupación - Últimas 2 Semanas",
                last_n(history, 14),
            )
            .with_axes("fecha", "ocupacion")],
        }
    }
}

fn emergency_charts(shape: ChartShape) -> Vec<ChartSpec> {
    match shape {
        ChartShape::Line => {
            let data = EMERGENCY_SLOTS
                .iter()
                .map(|(hora, emergencias, tiempo)| {
                    ChartRow::new()
                        .label("hora", *hora)
                        .number("emergencias", *emergencias as f64)
                        .number("tiempo_promedio", *tiempo as f64)
                })
                .collect();
            vec![ChartSpec::new(ChartShape::Line, "Flujo de Emergencias por Horario", data)
                .with_axes("hora", "emergencias")]
        }
        ChartShape::Pie => {
            let data = PRIORITY_GROUPS
                .iter()
                .map(|p| ChartRow::slice(p.prioridad, p.cantidad as f64, p.color))
                .collect();
            vec![ChartSpec::new(ChartShape::Pie, "Distribución de Emergencias por Prioridad", data)]
        }
        _ => {
            let data = PRIORITY_GROUPS
                .iter()
                .map(|p| {
                    ChartRow::new()
                        .label("prioridad", p.prioridad)
                        .number("cantidad", p.cantidad as f64)
                        .number("tiempo_promedio", p.tiempo_promedio as f64)
                        .number("resueltas", p.resueltas as f64)
                })
                .collect();
            vec![ChartSpec::new(ChartShape::Bar, "Emergencias por Prioridad y Tiempo de Atención", data)
                .with_axes("prioridad", "cantidad")]
        }
    }
}

fn surgery_charts(shape: ChartShape) -> Vec<ChartSpec> {
    match shape {
        ChartShape::Pie => {
            let data = SURGERY_TYPES
                .iter()
                .enumerate()
                .map(|(i, (tipo, cantidad, _))| ChartRow::slice(*tipo, *cantidad as f64, palette_color(i)))
                .collect();
            vec![ChartSpec::new(ChartShape::Pie, "Distribución de Cirugías por Tipo", data)]
        }
        _ => {
            let data = OPERATING_ROOMS
                .iter()
                .map(|q| {
                    ChartRow::new()
                        .label("quirofano", q.quirofano)
                        .number("programadas", q.programadas as f64)
                        .number("completadas", q.completadas as f64)
                        .number("en_proceso", q.en_proceso as f64)
                        .label("disponible", if q.disponible { "Sí" } else { "No" })
                })
                .collect();
            vec![ChartSpec::new(ChartShape::Bar, "Estado de Quirófanos y Cirugías", data)
                .with_axes("quirofano", "programadas")]
        }
    }
}

fn staff_charts(shape: ChartShape) -> Vec<ChartSpec> {
    match shape {
        ChartShape::Line => {
            let data = STAFF_GROUPS
                .iter()
                .map(|s| {
                    ChartRow::new()
                        .label("especialidad", s.especialidad)
                        .number("experiencia", s.experiencia)
                        .number("disponibilidad", percentage(s.emergencias as f64, s.total as f64))
                })
                .collect();
            vec![ChartSpec::new(ChartShape::Line, "Experiencia vs Disponibilidad por Especialidad", data)]
        }
        _ => {
            let data = STAFF_GROUPS
                .iter()
                .map(|s| {
                    ChartRow::new()
                        .label("especialidad", s.especialidad)
                        .number("total", s.total as f64)
                        .number("activos", s.activos as f64)
                        .number("emergencias", s.emergencias as f64)
                        .number("experiencia", s.experiencia)
                })
                .collect();
            vec![ChartSpec::new(ChartShape::Bar, "Personal Médico por Especialidad", data)
                .with_axes("especialidad", "cantidad")]
        }
    }
}

/// Severity colour for an occupancy percentage
pub fn occupancy_color(ocupacion: f64) -> &'static str {
    if ocupacion > 85.0 {
        RED
    } else if ocupacion > 70.0 {
        AMBER
    } else {
        GREEN
    }
}

/// `part / whole` as a whole-number percentage, 0 for an empty whole
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        (part * 100.0 / whole).round()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn last_n(rows: Vec<ChartRow>, n: usize) -> Vec<ChartRow> {
    let skip = rows.len().saturating_sub(n);
    rows.into_iter().skip(skip).collect()
}

/// "17 oct" style label
pub fn spanish_short_date(date: NaiveDate) -> String {
    format!("{} {}", date.day(), SPANISH_MONTHS[date.month0() as usize])
}
