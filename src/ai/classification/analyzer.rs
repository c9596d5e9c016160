use crate::ai::classification::templates::{SqlTemplate, DEFAULT_DESCRIPTION, SQL_TEMPLATES};
use crate::ai::types::ClassificationResult;
use regex::Regex;
use std::sync::LazyLock;

/// One case-insensitive alternation per template, in template order
static TEMPLATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SQL_TEMPLATES
        .iter()
        .map(|template| {
            let alternation = template
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("(?i)(?:{})", alternation)).unwrap()
        })
        .collect()
});

/// Classify a prompt against the canned templates.
///
/// Keywords match as plain substrings, not whole words. The earliest declared
/// template wins; a prompt that matches nothing gets the bed-occupancy query.
pub fn classify(prompt: &str) -> ClassificationResult {
    match match_template(prompt) {
        Some(template) => to_result(template, template.description, true),
        None => to_result(&SQL_TEMPLATES[0], DEFAULT_DESCRIPTION, false),
    }
}

/// First template with any keyword contained in the prompt
pub fn match_template(prompt: &str) -> Option<&'static SqlTemplate> {
    TEMPLATE_PATTERNS
        .iter()
        .position(|pattern| pattern.is_match(prompt))
        .map(|idx| &SQL_TEMPLATES[idx])
}

fn to_result(template: &SqlTemplate, description: &str, matched: bool) -> ClassificationResult {
    ClassificationResult {
        query: template.query.to_string(),
        description: description.to_string(),
        category: template.category,
        recommended_charts: template.category.recommended_shapes().to_vec(),
        matched,
    }
}
