use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Coarse query category a prompt is classified into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueryCategory {
    #[serde(rename = "camas")]
    BedOccupancy,
    #[serde(rename = "pacientes")]
    PatientSeverity,
    #[serde(rename = "emergencias")]
    Emergency,
    #[serde(rename = "quirofanos")]
    Surgery,
    #[serde(rename = "personal")]
    Staff,
    #[serde(rename = "historial")]
    History,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 6] = [
        QueryCategory::BedOccupancy,
        QueryCategory::PatientSeverity,
        QueryCategory::Emergency,
        QueryCategory::Surgery,
        QueryCategory::Staff,
        QueryCategory::History,
    ];

    /// Wire label shared with the frontend
    pub fn label(&self) -> &'static str {
        match self {
            QueryCategory::BedOccupancy => "camas",
            QueryCategory::PatientSeverity => "pacientes",
            QueryCategory::Emergency => "emergencias",
            QueryCategory::Surgery => "quirofanos",
            QueryCategory::Staff => "personal",
            QueryCategory::History => "historial",
        }
    }

    /// Chart shapes offered in the shape selector, most relevant first
    pub fn recommended_shapes(&self) -> &'static [ChartShape] {
        match self {
            QueryCategory::BedOccupancy => &[ChartShape::Bar, ChartShape::Pie, ChartShape::Line],
            QueryCategory::PatientSeverity => &[ChartShape::Pie, ChartShape::Bar, ChartShape::Line],
            QueryCategory::Emergency => &[ChartShape::Bar, ChartShape::Line, ChartShape::Pie],
            QueryCategory::Surgery => &[ChartShape::Bar, ChartShape::Pie],
            QueryCategory::Staff => &[ChartShape::Bar, ChartShape::Line],
            QueryCategory::History => &[ChartShape::Line, ChartShape::Area],
        }
    }

    /// Shape used when a requested shape has no rendition for this category
    pub fn default_shape(&self) -> ChartShape {
        match self {
            QueryCategory::PatientSeverity => ChartShape::Pie,
            QueryCategory::History => ChartShape::Line,
            _ => ChartShape::Bar,
        }
    }

    pub fn supports(&self, shape: ChartShape) -> bool {
        self.recommended_shapes().contains(&shape)
    }

    /// Resolve a requested shape, falling back to the category default
    pub fn resolve_shape(&self, requested: ChartShape) -> ChartShape {
        if self.supports(requested) {
            requested
        } else {
            self.default_shape()
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QueryCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryCategory::ALL
            .iter()
            .copied()
            .find(|c| c.label() == s.trim())
            .ok_or_else(|| AppError::Other(format!("Unknown query category: {}", s)))
    }
}

/// Supported chart shapes:
/// - Bar: per-category comparison (beds per unit, staff per speciality)
/// - Line: trends over days, weeks or time slots
/// - Pie: part-to-whole distributions (severity mix, priorities)
/// - Area: volume over time (admissions and discharges)
/// - Scatter: accepted by the selector, never produced directly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChartShape {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
}

impl ChartShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartShape::Bar => "bar",
            ChartShape::Line => "line",
            ChartShape::Pie => "pie",
            ChartShape::Area => "area",
            ChartShape::Scatter => "scatter",
        }
    }

    /// Label shown in the shape selector
    pub fn display_label(&self) -> &'static str {
        match self {
            ChartShape::Bar => "Barras",
            ChartShape::Line => "Líneas",
            ChartShape::Pie => "Circular",
            ChartShape::Area => "Área",
            ChartShape::Scatter => "Dispersión",
        }
    }
}

impl fmt::Display for ChartShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartShape {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Ok(ChartShape::Bar),
            "line" => Ok(ChartShape::Line),
            "pie" => Ok(ChartShape::Pie),
            "area" => Ok(ChartShape::Area),
            "scatter" => Ok(ChartShape::Scatter),
            other => Err(AppError::Other(format!("Unknown chart shape: {}", other))),
        }
    }
}

/// Outcome of classifying one prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub query: String,
    pub description: String,
    #[serde(rename = "type")]
    pub category: QueryCategory,
    pub recommended_charts: Vec<ChartShape>,
    /// False when no template matched and the default was used
    pub matched: bool,
}

/// Where the rows behind a set of charts came from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartOrigin {
    #[default]
    Synthetic,
    Live,
    /// Live data was requested but unavailable
    Fallback,
}

impl ChartOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartOrigin::Synthetic => "synthetic",
            ChartOrigin::Live => "live",
            ChartOrigin::Fallback => "fallback",
        }
    }
}
