pub mod validator;

pub use validator::validate_template_sql;
