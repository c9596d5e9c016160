pub mod backend;
pub mod connection;
pub mod hospital;
pub mod overview;
pub mod query;
pub mod schema;
pub mod supabase;

pub use backend::LiveBackend;
pub use overview::{fetch_overview, OverviewPanel};
pub use query::QueryResult;
