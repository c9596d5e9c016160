pub mod export;

pub use export::{export_charts, ExportOptions, ExportSummary};
