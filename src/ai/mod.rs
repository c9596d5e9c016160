pub mod classification;
pub mod sanitizer;
pub mod types;
pub mod visualization;

// Re-export commonly used types
pub use classification::{classify, suggested_prompts};
pub use types::{ChartOrigin, ChartShape, ClassificationResult, QueryCategory};
pub use visualization::{ChartSpec, ChartSynthesizer};
