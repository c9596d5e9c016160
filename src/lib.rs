pub mod ai;
pub mod db;
pub mod error;
pub mod import_export;
pub mod logging;
pub mod session;
pub mod storage;

pub use ai::{classify, suggested_prompts, ChartOrigin, ChartShape, ChartSpec, ClassificationResult, QueryCategory};
pub use error::{AppError, AppResult};
pub use session::{Dashboard, DashboardSession, SubmitOutcome};
pub use storage::{AppSettings, StorageManager};

use db::{LiveBackend, OverviewPanel};
use import_export::ExportOptions;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Escriba una consulta en lenguaje natural, o uno de estos comandos:
  :tipo <bar|line|pie|area|scatter>   redibujar el resultado actual
  :resumen                            paneles de resumen
  :exportar <directorio> [zip]        exportar los gráficos a CSV
  :historial [categoria]              consultas anteriores
  :historial borrar [id]              borrar una consulta, o todas
  :sugerencias                        consultas de ejemplo
  :salir";

/// Console front end: reads prompts from stdin and prints SQL and chart data
pub async fn run() -> AppResult<()> {
    logging::init_logging();

    let storage = StorageManager::new(StorageManager::default_data_dir())?;
    if storage.get_settings()?.is_none() {
        storage.save_settings(AppSettings::default())?;
    }
    let settings = storage.effective_settings()?;
    let backend = LiveBackend::from_settings(&settings)?;
    let history = storage.prompt_history(settings.history_limit);
    let dashboard = Dashboard::new(&settings, backend, Some(history));

    tracing::info!(
        data_dir = %storage.data_dir().display(),
        backend = dashboard.backend_name().unwrap_or("synthetic"),
        "KlinikaAI Data Center started"
    );

    println!("KlinikaAI Data Center");
    print_overview(&dashboard.overview().await);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_line(&dashboard, line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                tracing::error!(error = %e, "Command failed");
                println!("Error: {}", e);
            }
        }
    }

    dashboard.shutdown().await
}

/// Returns false when the user asked to quit
async fn handle_line(dashboard: &Dashboard, line: &str) -> AppResult<bool> {
    let Some(command) = line.strip_prefix(':') else {
        submit_prompt(dashboard, line).await?;
        return Ok(true);
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "salir" | "quit" => return Ok(false),
        "ayuda" | "help" => println!("{}", HELP),
        "tipo" | "shape" => {
            let shape: ChartShape = parts
                .next()
                .ok_or_else(|| AppError::Other("Falta el tipo de gráfico".into()))?
                .parse()?;
            print_json(&dashboard.change_shape(shape)?)?;
        }
        "resumen" | "overview" => print_overview(&dashboard.overview().await),
        "exportar" | "export" => {
            let output_dir = parts
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| AppError::Other("Falta el directorio de salida".into()))?;
            let options = ExportOptions {
                output_dir,
                create_zip: parts.next() == Some("zip"),
            };
            let summary = dashboard.export(&options)?;
            println!("Exportado a {} ({} archivos)", summary.path, summary.files.len());
        }
        "historial" | "history" => match parts.next() {
            Some("borrar" | "delete") => match parts.next() {
                Some(id) => dashboard.delete_history(id)?,
                None => dashboard.clear_history()?,
            },
            filter => {
                let category = filter.map(str::parse::<QueryCategory>).transpose()?;
                for entry in dashboard.history(category)? {
                    println!(
                        "{}  {}  [{}/{}]  {}",
                        entry.submitted_at.format("%Y-%m-%d %H:%M"),
                        entry.id,
                        entry.category,
                        entry.origin.as_str(),
                        entry.prompt
                    );
                }
            }
        },
        "sugerencias" | "suggestions" => {
            for prompt in suggested_prompts() {
                println!("  - {}", prompt);
            }
        }
        other => println!("Comando desconocido: {}", other),
    }
    Ok(true)
}

async fn submit_prompt(dashboard: &Dashboard, prompt: &str) -> AppResult<()> {
    println!("Generando consulta SQL...");
    match dashboard.submit(prompt).await? {
        SubmitOutcome::Completed {
            classification,
            charts,
            origin,
        } => {
            println!("{}", classification.description);
            println!("{}", classification.query);
            let shapes: Vec<&str> = classification
                .recommended_charts
                .iter()
                .map(|s| s.display_label())
                .collect();
            println!("Gráficos recomendados: {}", shapes.join(", "));
            println!("Origen de los datos: {}", origin.as_str());
            print_json(&charts)?;
        }
        SubmitOutcome::Superseded => println!("Consulta reemplazada por una más reciente"),
        SubmitOutcome::Ignored => {}
    }
    Ok(())
}

fn print_overview(panel: &OverviewPanel) {
    for chart in panel.charts() {
        println!("\n{}", chart.title);
        for row in &chart.data {
            let cells: Vec<String> = row
                .fields()
                .iter()
                .filter(|(key, _)| key != "color")
                .map(|(key, value)| format!("{}={}", key, value.to_cell_string()))
                .collect();
            println!("  {}", cells.join("  "));
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
