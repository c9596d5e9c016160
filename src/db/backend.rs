use crate::ai::types::QueryCategory;
use crate::db::connection::{ConnectionManager, DatabaseConnection};
use crate::db::hospital::{
    aggregate_beds, aggregate_emergencies, aggregate_history, aggregate_operating_rooms,
    aggregate_patients, aggregate_staff, daily_flow, overview_beds, severity_counts,
    EMERGENCY_WINDOW_DAYS, WINDOW_DAYS,
};
use crate::db::query::{execute_template, QueryResult};
use crate::db::schema::{
    EmergencyRow, OccupancyHistoryRow, OperatingRoomRow, PatientRow, StaffRow, UnitRow,
};
use crate::db::supabase::SupabaseClient;
use crate::error::AppResult;
use crate::storage::AppSettings;
use chrono::{Duration, NaiveDateTime, Utc};

/// Rows behind the three overview charts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewRows {
    pub beds: QueryResult,
    pub severity: QueryResult,
    pub flow: QueryResult,
}

const OVERVIEW_BEDS_SQL: &str = "-- Ocupación y pacientes críticos por unidad
SELECT
    split_part(um.nombre_unidad, ' - ', 1) as name,
    COUNT(CASE WHEN c.estado = 'ocupada' THEN 1 END) as camas_ocupadas,
    um.capacidad_total as camas_totales,
    COUNT(CASE WHEN p.estado_gravedad = 'critico' THEN 1 END) as pacientes_criticos
FROM unidades_medicas um
LEFT JOIN camas c ON um.id = c.unidad_id
LEFT JOIN pacientes p ON p.cama_id = c.id AND p.fecha_alta IS NULL
GROUP BY um.id, um.nombre_unidad, um.capacidad_total
ORDER BY um.nombre_unidad;";

const OVERVIEW_SEVERITY_SQL: &str = "-- Pacientes hospitalizados por gravedad
SELECT
    p.estado_gravedad,
    COUNT(*) as total
FROM pacientes p
WHERE p.fecha_alta IS NULL
GROUP BY p.estado_gravedad;";

const OVERVIEW_FLOW_SQL: &str = "-- Ingresos y altas de emergencias por día
SELECT
    DATE(e.fecha_ingreso AT TIME ZONE 'UTC') as dia,
    COUNT(*) as ingresos,
    COUNT(CASE WHEN e.estado = 'atendido' THEN 1 END) as altas
FROM emergencias e
WHERE e.fecha_ingreso >= NOW() - INTERVAL '7 days'
GROUP BY DATE(e.fecha_ingreso AT TIME ZONE 'UTC')
ORDER BY dia;";

/// Direct Postgres access; runs the validated template SQL as is
pub struct PostgresBackend {
    manager: ConnectionManager,
}

impl PostgresBackend {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self {
            manager: ConnectionManager::new(connection),
        }
    }

    pub async fn fetch_template(&self, sql: &str) -> AppResult<QueryResult> {
        execute_template(&self.manager, sql).await
    }

    pub async fn fetch_overview(&self) -> AppResult<OverviewRows> {
        let (beds, severity, flow) = futures::try_join!(
            execute_template(&self.manager, OVERVIEW_BEDS_SQL),
            execute_template(&self.manager, OVERVIEW_SEVERITY_SQL),
            execute_template(&self.manager, OVERVIEW_FLOW_SQL),
        )?;
        Ok(OverviewRows {
            beds,
            severity,
            flow,
        })
    }

    pub async fn close(&self) -> AppResult<()> {
        self.manager.close().await
    }
}

/// PostgREST access; fetches raw rows and aggregates them locally
pub struct RestBackend {
    client: SupabaseClient,
}

impl RestBackend {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn fetch_category(&self, category: QueryCategory) -> AppResult<QueryResult> {
        let now = Utc::now().naive_utc();

        let result = match category {
            QueryCategory::BedOccupancy => {
                let units: Vec<UnitRow> = self
                    .client
                    .from("unidades_medicas")
                    .select("nombre_unidad, tipo_unidad, capacidad_total, camas(id, estado)")
                    .eq("activa", true)
                    .fetch()
                    .await?;
                aggregate_beds(&units)
            }
            QueryCategory::PatientSeverity => {
                let patients: Vec<PatientRow> = self
                    .client
                    .from("pacientes")
                    .select("estado_gravedad, fecha_ingreso, fecha_alta")
                    .gte("fecha_ingreso", cutoff(now, WINDOW_DAYS))
                    .fetch()
                    .await?;
                aggregate_patients(&patients, now)
            }
            QueryCategory::Emergency => {
                let emergencies: Vec<EmergencyRow> = self
                    .client
                    .from("emergencias")
                    .select("prioridad, estado, tiempo_atencion_minutos, fecha_ingreso")
                    .gte("fecha_ingreso", cutoff(now, EMERGENCY_WINDOW_DAYS))
                    .fetch()
                    .await?;
                aggregate_emergencies(&emergencies)
            }
            QueryCategory::Surgery => {
                let rooms: Vec<OperatingRoomRow> = self
                    .client
                    .from("quirofanos")
                    .select("numero_quirofano, estado, activo, cirugias(estado, fecha_cirugia, tipo_cirugia)")
                    .eq("activo", true)
                    .fetch()
                    .await?;
                aggregate_operating_rooms(&rooms, now.date())
            }
            QueryCategory::Staff => {
                let staff: Vec<StaffRow> = self
                    .client
                    .from("personal_medico")
                    .select("especialidad, turno_actual, disponible_emergencias, años_experiencia")
                    .eq("estado_laboral", "activo")
                    .fetch()
                    .await?;
                aggregate_staff(&staff)
            }
            QueryCategory::History => {
                let history: Vec<OccupancyHistoryRow> = self
                    .client
                    .from("historial_ocupacion_camas")
                    .select("cama_id, estado_durante_ocupacion, fecha_ocupacion, fecha_liberacion")
                    .gte("fecha_ocupacion", cutoff(now, WINDOW_DAYS))
                    .order("fecha_ocupacion", false)
                    .fetch()
                    .await?;
                aggregate_history(&history)
            }
        };

        Ok(result)
    }

    pub async fn fetch_overview(&self) -> AppResult<OverviewRows> {
        let now = Utc::now().naive_utc();

        let units = self
            .client
            .from("unidades_medicas")
            .select("nombre_unidad, capacidad_total, camas(estado, pacientes(estado_gravedad, fecha_alta))")
            .fetch::<UnitRow>();
        let patients = self
            .client
            .from("pacientes")
            .select("estado_gravedad")
            .is_null("fecha_alta")
            .fetch::<PatientRow>();
        let emergencies = self
            .client
            .from("emergencias")
            .select("fecha_ingreso, estado")
            .gte("fecha_ingreso", cutoff(now, EMERGENCY_WINDOW_DAYS))
            .fetch::<EmergencyRow>();

        let (units, patients, emergencies) = futures::try_join!(units, patients, emergencies)?;

        Ok(OverviewRows {
            beds: overview_beds(&units),
            severity: severity_counts(&patients),
            flow: daily_flow(&emergencies),
        })
    }
}

/// The configured live data source
pub enum LiveBackend {
    Postgres(PostgresBackend),
    Rest(RestBackend),
}

impl LiveBackend {
    /// Backend for the current settings, `None` when live data is off.
    ///
    /// Direct Postgres credentials win over the REST endpoint.
    pub fn from_settings(settings: &AppSettings) -> AppResult<Option<Self>> {
        if !settings.use_live_data {
            return Ok(None);
        }

        if let Some(connection) = &settings.database {
            tracing::info!(host = %connection.host, "Using direct Postgres backend");
            return Ok(Some(LiveBackend::Postgres(PostgresBackend::new(connection.clone()))));
        }

        match (&settings.supabase_url, &settings.supabase_anon_key) {
            (Some(url), Some(key)) => {
                tracing::info!(url = %url, "Using PostgREST backend");
                let client = SupabaseClient::new(url.clone(), key.clone())?;
                Ok(Some(LiveBackend::Rest(RestBackend::new(client))))
            }
            _ => {
                tracing::warn!("Live data enabled but no backend configured; using synthetic data");
                Ok(None)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LiveBackend::Postgres(_) => "postgres",
            LiveBackend::Rest(_) => "rest",
        }
    }

    /// Rows for a category. Postgres runs `template_sql`; REST aggregates the
    /// equivalent rows itself.
    pub async fn fetch_category(
        &self,
        category: QueryCategory,
        template_sql: &str,
    ) -> AppResult<QueryResult> {
        match self {
            LiveBackend::Postgres(backend) => backend.fetch_template(template_sql).await,
            LiveBackend::Rest(backend) => backend.fetch_category(category).await,
        }
    }

    pub async fn fetch_overview(&self) -> AppResult<OverviewRows> {
        match self {
            LiveBackend::Postgres(backend) => backend.fetch_overview().await,
            LiveBackend::Rest(backend) => backend.fetch_overview().await,
        }
    }

    pub async fn close(&self) -> AppResult<()> {
        match self {
            LiveBackend::Postgres(backend) => backend.close().await,
            LiveBackend::Rest(_) => Ok(()),
        }
    }
}

fn cutoff(now: NaiveDateTime, days: i64) -> String {
    (now - Duration::days(days))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::sanitizer::validate_template_sql;

    fn settings() -> AppSettings {
        AppSettings {
            use_live_data: true,
            ..AppSettings::default()
        }
    }

    #[test]
    fn test_overview_sql_passes_guard() {
        for sql in [OVERVIEW_BEDS_SQL, OVERVIEW_SEVERITY_SQL, OVERVIEW_FLOW_SQL] {
            let sanitized = validate_template_sql(sql);
            assert!(sanitized.is_ok(), "{:?}", sanitized);
        }
    }

    #[test]
    fn test_live_data_off() {
        let mut settings = settings();
        settings.use_live_data = false;
        settings.supabase_url = Some("https://x.supabase.co".into());
        settings.supabase_anon_key = Some("key".into());
        assert!(LiveBackend::from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn test_rest_backend_selected() {
        let mut settings = settings();
        settings.supabase_url = Some("https://x.supabase.co".into());
        settings.supabase_anon_key = Some("key".into());
        let backend = LiveBackend::from_settings(&settings).unwrap().unwrap();
        assert_eq!(backend.name(), "rest");
    }

    #[test]
    fn test_postgres_preferred() {
        let mut settings = settings();
        settings.supabase_url = Some("https://x.supabase.co".into());
        settings.supabase_anon_key = Some("key".into());
        settings.database = Some(DatabaseConnection {
            host: "localhost".into(),
            port: 5432,
            username: "postgres".into(),
            password: "postgres".into(),
            database: "klinika".into(),
            ssl_mode: "disable".into(),
        });
        let backend = LiveBackend::from_settings(&settings).unwrap().unwrap();
        assert_eq!(backend.name(), "postgres");
    }

    #[test]
    fn test_nothing_configured() {
        assert!(LiveBackend::from_settings(&settings()).unwrap().is_none());
    }

    #[test]
    fn test_cutoff_format() {
        let now = crate::db::schema::parse_timestamp("2024-03-15T12:30:00").unwrap();
        assert_eq!(cutoff(now, 7), "2024-03-08T12:30:00");
    }
}
