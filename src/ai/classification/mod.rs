pub mod analyzer;
pub mod templates;

pub use analyzer::classify;
pub use templates::{suggested_prompts, template_for, SqlTemplate, SQL_TEMPLATES};
