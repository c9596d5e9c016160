pub mod chart;
pub mod chart_analyzer;
pub mod synthesizer;

pub use chart::{CellValue, ChartRow, ChartSpec};
pub use chart_analyzer::build_charts;
pub use synthesizer::ChartSynthesizer;
