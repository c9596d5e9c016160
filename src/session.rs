use crate::ai::classification::classify;
use crate::ai::types::{ChartOrigin, ChartShape, ClassificationResult, QueryCategory};
use crate::ai::visualization::{build_charts, ChartSpec, ChartSynthesizer};
use crate::db::overview::{fetch_overview, OverviewPanel};
use crate::db::{LiveBackend, QueryResult};
use crate::error::{AppError, AppResult};
use crate::import_export::export::{export_charts, ExportOptions, ExportSummary};
use crate::storage::{AppSettings, PromptHistory, PromptHistoryEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    #[default]
    Idle,
    GeneratingSql,
    GeneratingCharts,
}

/// A submission accepted by [`DashboardSession::begin_submission`]
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub seq: u64,
    pub classification: ClassificationResult,
    pub shape: ChartShape,
}

/// Everything the dashboard shows for one user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSession {
    pub messages: Vec<ChatMessage>,
    pub current: Option<ClassificationResult>,
    pub selected_shape: ChartShape,
    pub charts: Vec<ChartSpec>,
    pub origin: ChartOrigin,
    pub phase: ProcessingPhase,
    pub show_sql: bool,
    /// Sequence number of the newest submission
    pub seq: u64,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            current: None,
            selected_shape: ChartShape::Bar,
            charts: Vec::new(),
            origin: ChartOrigin::default(),
            phase: ProcessingPhase::default(),
            show_sql: false,
            seq: 0,
        }
    }
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and classify a prompt. Blank prompts are ignored.
    ///
    /// Earlier submissions still in flight become stale: their results are
    /// dropped by [`reveal_sql`](Self::reveal_sql) and
    /// [`apply_charts`](Self::apply_charts).
    pub fn begin_submission(&mut self, prompt: &str) -> Option<Submission> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            text: prompt.to_string(),
            timestamp: Utc::now(),
        });

        let classification = classify(prompt);
        let shape = classification
            .recommended_charts
            .first()
            .copied()
            .unwrap_or_else(|| classification.category.default_shape());

        self.seq += 1;
        self.current = Some(classification.clone());
        self.selected_shape = shape;
        self.charts.clear();
        self.show_sql = false;
        self.phase = ProcessingPhase::GeneratingSql;

        Some(Submission {
            seq: self.seq,
            classification,
            shape,
        })
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }

    /// Show the SQL of submission `seq`; false when it has been superseded
    pub fn reveal_sql(&mut self, seq: u64) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.show_sql = true;
        self.phase = ProcessingPhase::GeneratingCharts;
        true
    }

    /// Install the charts of submission `seq`; false when it has been superseded
    pub fn apply_charts(&mut self, seq: u64, charts: Vec<ChartSpec>, origin: ChartOrigin) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.charts = charts;
        self.origin = origin;
        self.phase = ProcessingPhase::Idle;
        true
    }

    /// Redraw the current category as `shape` from fresh synthetic data.
    /// Shapes the category cannot draw resolve to its default shape.
    ///
    /// Returns false when nothing has been submitted yet.
    pub fn change_shape(&mut self, shape: ChartShape, synthesizer: &mut ChartSynthesizer) -> bool {
        let Some(category) = self.current.as_ref().map(|c| c.category) else {
            self.selected_shape = shape;
            return false;
        };
        let shape = category.resolve_shape(shape);
        self.selected_shape = shape;
        self.charts = synthesizer.synthesize(category, shape);
        self.origin = ChartOrigin::Synthetic;
        true
    }

    pub fn current_sql(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.query.as_str())
    }
}

/// Result of [`Dashboard::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The prompt was blank
    Ignored,
    /// A newer submission arrived before this one finished
    Superseded,
    Completed {
        classification: ClassificationResult,
        charts: Vec<ChartSpec>,
        origin: ChartOrigin,
    },
}

/// Shared dashboard state plus the collaborators a submission needs
pub struct Dashboard {
    session: Arc<Mutex<DashboardSession>>,
    synthesizer: Arc<Mutex<ChartSynthesizer>>,
    backend: Option<Arc<LiveBackend>>,
    history: Option<Arc<PromptHistory>>,
    sql_delay: Duration,
    chart_delay: Duration,
}

impl Dashboard {
    pub fn new(settings: &AppSettings, backend: Option<LiveBackend>, history: Option<PromptHistory>) -> Self {
        Self {
            session: Arc::new(Mutex::new(DashboardSession::new())),
            synthesizer: Arc::new(Mutex::new(ChartSynthesizer::new())),
            backend: backend.map(Arc::new),
            history: history.map(Arc::new),
            sql_delay: Duration::from_millis(settings.sql_delay_ms),
            chart_delay: Duration::from_millis(settings.chart_delay_ms),
        }
    }

    /// Replace the synthesizer, e.g. with a seeded one
    pub fn with_synthesizer(mut self, synthesizer: ChartSynthesizer) -> Self {
        self.synthesizer = Arc::new(Mutex::new(synthesizer));
        self
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_deref().map(LiveBackend::name)
    }

    /// Classify `prompt`, reveal its SQL after the SQL delay and its charts
    /// after the chart delay.
    pub async fn submit(&self, prompt: &str) -> AppResult<SubmitOutcome> {
        let Some(submission) = self.lock_session()?.begin_submission(prompt) else {
            return Ok(SubmitOutcome::Ignored);
        };
        let Submission { seq, classification, .. } = submission;
        tracing::info!(
            seq,
            category = %classification.category,
            matched = classification.matched,
            "Prompt classified"
        );

        tokio::time::sleep(self.sql_delay).await;
        if !self.lock_session()?.reveal_sql(seq) {
            tracing::debug!(seq, "Submission superseded before SQL reveal");
            return Ok(SubmitOutcome::Superseded);
        }

        tokio::time::sleep(self.chart_delay).await;
        let live = self.fetch_live(classification.category, &classification.query).await;

        let (charts, origin) = {
            let mut session = self.lock_session()?;
            if !session.is_current(seq) {
                tracing::debug!(seq, "Submission superseded before charts");
                return Ok(SubmitOutcome::Superseded);
            }
            // The shape may have been changed while rows were fetched
            let shape = session.selected_shape;
            let (charts, origin) = self.render(classification.category, shape, live)?;
            session.apply_charts(seq, charts.clone(), origin);
            (charts, origin)
        };

        if let Some(history) = &self.history {
            if let Err(e) = history.add(prompt.trim(), classification.category, classification.matched, origin) {
                tracing::warn!(seq, error = %e, "Failed to record prompt history");
            }
        }

        Ok(SubmitOutcome::Completed {
            classification,
            charts,
            origin,
        })
    }

    /// Rows from the live backend, `None` when none is configured
    async fn fetch_live(&self, category: QueryCategory, sql: &str) -> Option<AppResult<QueryResult>> {
        let backend = self.backend.as_ref()?;
        Some(backend.fetch_category(category, sql).await)
    }

    /// Live charts when the backend answered with rows, synthetic charts otherwise
    fn render(
        &self,
        category: QueryCategory,
        shape: ChartShape,
        live: Option<AppResult<QueryResult>>,
    ) -> AppResult<(Vec<ChartSpec>, ChartOrigin)> {
        let Some(live) = live else {
            return Ok((self.synthesize(category, shape)?, ChartOrigin::Synthetic));
        };

        let charts = live.and_then(|rows| {
            if rows.is_empty() {
                Err(AppError::QueryError("No rows returned".into()))
            } else {
                build_charts(&rows, category, shape)
            }
        });

        match charts {
            Ok(charts) => Ok((charts, ChartOrigin::Live)),
            Err(e) => {
                tracing::warn!(
                    backend = self.backend_name().unwrap_or_default(),
                    category = %category,
                    error = %e,
                    "Live data unavailable, using synthetic charts"
                );
                Ok((self.synthesize(category, shape)?, ChartOrigin::Fallback))
            }
        }
    }

    fn synthesize(&self, category: QueryCategory, shape: ChartShape) -> AppResult<Vec<ChartSpec>> {
        Ok(self.lock_synthesizer()?.synthesize(category, shape))
    }

    /// Redraw the current result with another shape
    pub fn change_shape(&self, shape: ChartShape) -> AppResult<Vec<ChartSpec>> {
        let mut session = self.lock_session()?;
        let mut synthesizer = self.lock_synthesizer()?;
        if !session.change_shape(shape, &mut synthesizer) {
            return Err(AppError::Other("Nothing to redraw yet".into()));
        }
        Ok(session.charts.clone())
    }

    pub fn snapshot(&self) -> AppResult<DashboardSession> {
        Ok(self.lock_session()?.clone())
    }

    pub async fn overview(&self) -> OverviewPanel {
        fetch_overview(self.backend.as_deref(), Utc::now().date_naive()).await
    }

    /// Export the charts on screen together with their SQL
    pub fn export(&self, options: &ExportOptions) -> AppResult<ExportSummary> {
        let session = self.snapshot()?;
        export_charts(&session.charts, session.current_sql(), options)
    }

    pub fn history(&self, category: Option<QueryCategory>) -> AppResult<Vec<PromptHistoryEntry>> {
        match &self.history {
            Some(history) => history.list(category),
            None => Ok(Vec::new()),
        }
    }

    pub fn delete_history(&self, id: &str) -> AppResult<()> {
        match &self.history {
            Some(history) => history.delete(id),
            None => Ok(()),
        }
    }

    pub fn clear_history(&self) -> AppResult<()> {
        match &self.history {
            Some(history) => history.clear(),
            None => Ok(()),
        }
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        if let Some(backend) = &self.backend {
            backend.close().await?;
        }
        Ok(())
    }

    fn lock_session(&self) -> AppResult<MutexGuard<'_, DashboardSession>> {
        self.session
            .lock()
            .map_err(|e| AppError::Other(format!("Failed to lock session: {}", e)))
    }

    fn lock_synthesizer(&self) -> AppResult<MutexGuard<'_, ChartSynthesizer>> {
        self.synthesizer
            .lock()
            .map_err(|e| AppError::Other(format!("Failed to lock synthesizer: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::backend::RestBackend;
    use crate::db::supabase::SupabaseClient;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn synth() -> ChartSynthesizer {
        ChartSynthesizer::seeded(11, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    fn instant_settings() -> AppSettings {
        AppSettings {
            sql_delay_ms: 0,
            chart_delay_ms: 0,
            ..AppSettings::default()
        }
    }

    #[test]
    fn test_blank_prompt_ignored() {
        let mut session = DashboardSession::new();
        assert!(session.begin_submission("   ").is_none());
        assert!(session.messages.is_empty());
        assert_eq!(session.seq, 0);
    }

    #[test]
    fn test_submission_selects_first_recommended_shape() {
        let mut session = DashboardSession::new();
        let submission = session
            .begin_submission("Distribución de pacientes por gravedad")
            .unwrap();

        assert_eq!(submission.classification.category, QueryCategory::PatientSeverity);
        assert_eq!(submission.shape, ChartShape::Pie);
        assert_eq!(session.selected_shape, ChartShape::Pie);
        assert_eq!(session.phase, ProcessingPhase::GeneratingSql);
        assert_eq!(session.messages[0].text, "Distribución de pacientes por gravedad");
        assert!(!session.show_sql);
    }

    #[test]
    fn test_stale_results_dropped() {
        let mut session = DashboardSession::new();
        let mut synth = synth();
        let first = session.begin_submission("camas libres").unwrap();
        let second = session.begin_submission("personal de turno").unwrap();

        assert!(!session.reveal_sql(first.seq));
        assert!(!session.show_sql);

        let stale = synth.synthesize(QueryCategory::BedOccupancy, ChartShape::Bar);
        assert!(!session.apply_charts(first.seq, stale, ChartOrigin::Live));
        assert!(session.charts.is_empty());

        assert!(session.reveal_sql(second.seq));
        let fresh = synth.synthesize(QueryCategory::Staff, ChartShape::Bar);
        assert!(session.apply_charts(second.seq, fresh.clone(), ChartOrigin::Synthetic));
        assert_eq!(session.charts, fresh);
        assert_eq!(session.phase, ProcessingPhase::Idle);
    }

    #[test]
    fn test_change_shape_needs_a_result() {
        let mut session = DashboardSession::new();
        let mut synth = synth();
        assert!(!session.change_shape(ChartShape::Pie, &mut synth));

        session.begin_submission("ocupación de camas").unwrap();
        assert!(session.change_shape(ChartShape::Pie, &mut synth));
        assert_eq!(session.charts[0].shape, ChartShape::Pie);
        assert_eq!(session.selected_shape, ChartShape::Pie);
    }

    #[test]
    fn test_change_shape_stores_resolved_shape() {
        let mut session = DashboardSession::new();
        let mut synth = synth();
        session.begin_submission("personal de turno").unwrap();

        assert!(session.change_shape(ChartShape::Pie, &mut synth));
        assert_eq!(session.selected_shape, ChartShape::Bar);
        assert_eq!(session.charts[0].shape, ChartShape::Bar);
    }

    #[tokio::test]
    async fn test_shape_changed_while_processing_is_kept() {
        let settings = AppSettings {
            sql_delay_ms: 50,
            chart_delay_ms: 0,
            ..AppSettings::default()
        };
        let dashboard = Dashboard::new(&settings, None, None).with_synthesizer(synth());

        let (outcome, redraw) = tokio::join!(dashboard.submit("camas libres"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.change_shape(ChartShape::Pie)
        });

        assert!(redraw.is_ok());
        match outcome.unwrap() {
            SubmitOutcome::Completed { charts, .. } => assert_eq!(charts[0].shape, ChartShape::Pie),
            other => panic!("unexpected outcome: {:?}", other),
        }
        let session = dashboard.snapshot().unwrap();
        assert_eq!(session.selected_shape, ChartShape::Pie);
        assert_eq!(session.charts[0].shape, ChartShape::Pie);
        assert_eq!(session.phase, ProcessingPhase::Idle);
    }

    #[tokio::test]
    async fn test_history_failure_still_completes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("prompt_history.json")).unwrap();
        let history = PromptHistory::new(dir.path(), 10);
        let dashboard =
            Dashboard::new(&instant_settings(), None, Some(history)).with_synthesizer(synth());

        let outcome = dashboard.submit("camas libres").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

        let session = dashboard.snapshot().unwrap();
        assert_eq!(session.phase, ProcessingPhase::Idle);
        assert!(!session.charts.is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_backend() {
        let dashboard = Dashboard::new(&instant_settings(), None, None).with_synthesizer(synth());
        let outcome = dashboard.submit("Reporte de emergencias rojas").await.unwrap();

        match outcome {
            SubmitOutcome::Completed {
                classification,
                charts,
                origin,
            } => {
                assert_eq!(classification.category, QueryCategory::Emergency);
                assert_eq!(origin, ChartOrigin::Synthetic);
                assert!(!charts.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let session = dashboard.snapshot().unwrap();
        assert!(session.show_sql);
        assert_eq!(session.phase, ProcessingPhase::Idle);
        assert_eq!(dashboard.submit("").await.unwrap(), SubmitOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_unreachable_backend_falls_back() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon").unwrap();
        let backend = LiveBackend::Rest(RestBackend::new(client));
        let dir = TempDir::new().unwrap();
        let history = PromptHistory::new(dir.path(), 10);
        let dashboard =
            Dashboard::new(&instant_settings(), Some(backend), Some(history)).with_synthesizer(synth());

        let outcome = dashboard.submit("cirugías programadas hoy").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Completed {
                origin: ChartOrigin::Fallback,
                ..
            }
        ));

        let entries = dashboard.history(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, QueryCategory::Surgery);
        assert_eq!(entries[0].origin, ChartOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_newer_submission_wins() {
        let settings = AppSettings {
            sql_delay_ms: 50,
            chart_delay_ms: 0,
            ..AppSettings::default()
        };
        let dashboard = Dashboard::new(&settings, None, None).with_synthesizer(synth());

        let (first, second) = tokio::join!(dashboard.submit("camas libres"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.submit("turnos del personal").await
        });

        assert_eq!(first.unwrap(), SubmitOutcome::Superseded);
        assert!(matches!(second.unwrap(), SubmitOutcome::Completed { .. }));
        let session = dashboard.snapshot().unwrap();
        assert_eq!(session.current.unwrap().category, QueryCategory::Staff);
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_change_shape_and_export() {
        let dashboard = Dashboard::new(&instant_settings(), None, None).with_synthesizer(synth());
        assert!(dashboard.change_shape(ChartShape::Line).is_err());

        dashboard.submit("tendencia de los últimos días").await.unwrap();
        let charts = dashboard.change_shape(ChartShape::Area).unwrap();
        assert_eq!(charts[0].shape, ChartShape::Area);

        let dir = TempDir::new().unwrap();
        let summary = dashboard
            .export(&ExportOptions {
                output_dir: dir.path().join("out"),
                create_zip: false,
            })
            .unwrap();
        assert!(summary.files.iter().any(|f| f == "consulta.sql"));
    }

    #[tokio::test]
    async fn test_history_delete_and_clear() {
        let dir = TempDir::new().unwrap();
        let history = PromptHistory::new(dir.path(), 10);
        let dashboard = Dashboard::new(&instant_settings(), None, Some(history)).with_synthesizer(synth());

        dashboard.submit("camas libres").await.unwrap();
        dashboard.submit("personal de turno").await.unwrap();
        let entries = dashboard.history(None).unwrap();
        assert_eq!(entries.len(), 2);

        dashboard.delete_history(&entries[0].id).unwrap();
        let remaining = dashboard.history(None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].category, QueryCategory::BedOccupancy);

        dashboard.clear_history().unwrap();
        assert!(dashboard.history(None).unwrap().is_empty());
    }

    #[test]
    fn test_history_commands_without_history() {
        let dashboard = Dashboard::new(&instant_settings(), None, None);
        dashboard.delete_history("missing").unwrap();
        dashboard.clear_history().unwrap();
        assert!(dashboard.history(None).unwrap().is_empty());
    }
}
