use crate::ai::visualization::chart::ChartSpec;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub create_zip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSummary {
    /// Output directory, or the ZIP archive when one was requested
    pub path: String,
    pub files: Vec<String>,
}

/// Write each chart dataset as CSV, plus the SQL that produced it.
pub fn export_charts(
    charts: &[ChartSpec],
    sql: Option<&str>,
    options: &ExportOptions,
) -> AppResult<ExportSummary> {
    if charts.is_empty() {
        return Err(AppError::ExportError("No charts to export".into()));
    }

    let output_path = &options.output_dir;
    fs::create_dir_all(output_path).map_err(|e| {
        AppError::IoError(format!("Failed to create output directory: {}", e))
    })?;

    let mut files = Vec::with_capacity(charts.len() + 1);
    for (idx, chart) in charts.iter().enumerate() {
        let file_name = format!("{}_{}.csv", idx + 1, slugify(&chart.title));
        write_chart_csv(chart, &output_path.join(&file_name))?;
        tracing::debug!(file = %file_name, rows = chart.data.len(), "Chart exported");
        files.push(file_name);
    }

    if let Some(sql) = sql {
        let file_name = "consulta.sql".to_string();
        let mut file = File::create(output_path.join(&file_name)).map_err(|e| {
            AppError::IoError(format!("Failed to create SQL file: {}", e))
        })?;
        file.write_all(sql.as_bytes())?;
        files.push(file_name);
    }

    let path = if options.create_zip {
        let archived = create_zip_archive(output_path, &files);

        // Loose files go whether or not the archive was written
        for file in &files {
            fs::remove_file(output_path.join(file)).ok();
        }

        archived?
    } else {
        output_path.to_string_lossy().to_string()
    };

    tracing::info!(path = %path, files = files.len(), "Export completed");
    Ok(ExportSummary { path, files })
}

/// One header row with the keys of the first record, then one line per record
pub fn write_chart_csv(chart: &ChartSpec, path: &Path) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let headers: Vec<&str> = chart
        .data
        .first()
        .map(|row| row.keys().collect())
        .unwrap_or_default();
    writer.write_record(&headers)?;

    for row in &chart.data {
        let record: Vec<String> = headers
            .iter()
            .map(|key| row.get(key).map(|v| v.to_cell_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            c => c,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "grafico".to_string()
    } else {
        slug
    }
}

/// `<dir>.zip` next to the output directory, or `exportacion.zip` inside it
/// when the directory has no name of its own (`.`, `..`, `/`)
fn archive_path(output_dir: &Path) -> PathBuf {
    match output_dir.file_name() {
        Some(_) => output_dir.with_extension("zip"),
        None => output_dir.join("exportacion.zip"),
    }
}

fn create_zip_archive(source_dir: &Path, files: &[String]) -> AppResult<String> {
    use std::io::Read;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    let zip_path = archive_path(source_dir);
    let file = File::create(&zip_path).map_err(|e| {
        AppError::IoError(format!("Failed to create ZIP file: {}", e))
    })?;

    let mut zip = zip::ZipWriter::new(file);
    let options: FileOptions<()> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for file_name in files {
        zip.start_file(file_name.as_str(), options)?;

        let mut f = File::open(source_dir.join(file_name)).map_err(|e| {
            AppError::IoError(format!("Failed to open file: {}", e))
        })?;
        let mut buffer = Vec::new();
        f.read_to_end(&mut buffer)?;

        zip.write_all(&buffer).map_err(|e| {
            AppError::IoError(format!("Failed to write to ZIP: {}", e))
        })?;
    }

    zip.finish()?;

    Ok(zip_path.to_string_lossy().to_string())
}
