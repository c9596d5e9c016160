use crate::error::{AppError, AppResult};
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::sync::LazyLock;

/// Maximum rows a template query may return
pub const MAX_ROWS: u32 = 100;

/// SQL injection prevention patterns
static DENY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // DML/DDL keywords
        Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|TRUNCATE|REPLACE|GRANT|REVOKE)\b").unwrap(),
        // Multiple statements
        Regex::new(r";.*;").unwrap(),
        // Comments past the header
        Regex::new(r"--").unwrap(),
        Regex::new(r"/\*").unwrap(),
        // Union-based injection
        Regex::new(r"(?i)\bUNION\b.*\bSELECT\b").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(SELECT|INSERT|UPDATE|DELETE|DROP|ALTER|CREATE)").unwrap(),
    ]
});

static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").unwrap());

/// Validate a canned template before it reaches the database.
///
/// Leading `--` header lines are dropped, the remainder must parse as exactly
/// one read-only query, and the row count is capped at [`MAX_ROWS`].
pub fn validate_template_sql(query: &str) -> AppResult<String> {
    let body = strip_header_comments(query);

    if body.is_empty() {
        return Err(AppError::SecurityError("Empty query".into()));
    }

    let normalized = body.to_uppercase();
    if !normalized.starts_with("SELECT") && !normalized.starts_with("WITH") {
        return Err(AppError::SecurityError(
            "Only SELECT queries may be executed".into(),
        ));
    }

    // Check all deny patterns
    for (idx, pattern) in DENY_PATTERNS.iter().enumerate() {
        if pattern.is_match(body.trim_end_matches(';')) {
            return Err(AppError::SecurityError(format!(
                "Forbidden SQL pattern detected (rule {}): {}",
                idx + 1,
                pattern.as_str()
            )));
        }
    }

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, &body)?;
    match statements.as_slice() {
        [Statement::Query(_)] => {}
        [_] => {
            return Err(AppError::SecurityError(
                "Statement is not a read-only query".into(),
            ))
        }
        _ => {
            return Err(AppError::SecurityError(format!(
                "Expected a single statement, found {}",
                statements.len()
            )))
        }
    }

    validate_for_postgres(&body)?;

    let mut sanitized = body;
    while sanitized.ends_with(';') {
        sanitized.pop();
        sanitized.truncate(sanitized.trim_end().len());
    }

    let existing_limit = LIMIT_RE
        .captures(&sanitized)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    match existing_limit {
        None => sanitized.push_str(&format!("\nLIMIT {}", MAX_ROWS)),
        Some(limit) if limit > MAX_ROWS as u64 => {
            sanitized = LIMIT_RE
                .replace(&sanitized, format!("LIMIT {}", MAX_ROWS).as_str())
                .to_string();
        }
        Some(_) => {}
    }

    Ok(sanitized)
}

/// Block PostgreSQL admin and crypto functions
fn validate_for_postgres(query: &str) -> AppResult<()> {
    let lower = query.to_lowercase();
    if lower.contains("pg_") || lower.contains("pgcrypto") {
        return Err(AppError::SecurityError(
            "PostgreSQL system functions not allowed".into(),
        ));
    }
    Ok(())
}

fn strip_header_comments(query: &str) -> String {
    query
        .trim()
        .lines()
        .skip_while(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::classification::SQL_TEMPLATES;

    #[test]
    fn test_every_template_is_accepted() {
        for template in SQL_TEMPLATES.iter() {
            let sanitized = validate_template_sql(template.query);
            assert!(sanitized.is_ok(), "{}: {:?}", template.description, sanitized);
            let sanitized = sanitized.unwrap();
            assert!(!sanitized.starts_with("--"));
            assert!(!sanitized.ends_with(';'));
        }
    }

    #[test]
    fn test_limit_added_or_kept() {
        assert_eq!(
            validate_template_sql("SELECT * FROM camas").unwrap(),
            "SELECT * FROM camas\nLIMIT 100"
        );
        assert_eq!(
            validate_template_sql("-- header\nSELECT * FROM camas LIMIT 30;").unwrap(),
            "SELECT * FROM camas LIMIT 30"
        );
    }

    #[test]
    fn test_limit_too_high() {
        assert_eq!(
            validate_template_sql("SELECT * FROM pacientes LIMIT 500").unwrap(),
            "SELECT * FROM pacientes LIMIT 100"
        );
    }

    #[test]
    fn test_reject_writes() {
        assert!(validate_template_sql("DELETE FROM camas").is_err());
        assert!(validate_template_sql("UPDATE camas SET estado = 'ocupada'").is_err());
        assert!(validate_template_sql("-- header\nDROP TABLE pacientes;").is_err());
    }

    #[test]
    fn test_reject_stacked_statements() {
        assert!(validate_template_sql("SELECT 1; SELECT 2;").is_err());
    }

    #[test]
    fn test_reject_inline_comment() {
        assert!(validate_template_sql("SELECT * FROM camas -- trailing").is_err());
    }

    #[test]
    fn test_reject_system_functions() {
        assert!(validate_template_sql("SELECT pg_sleep(10)").is_err());
    }

    #[test]
    fn test_reject_empty() {
        assert!(validate_template_sql("-- only a comment").is_err());
    }
}
