//! Shared application state.

use database::postgres::DatabaseConnection;

/// Cloned into the readiness router and used once to build the pricing
/// service; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool holding `cloud_plans`
    pub db: DatabaseConnection,
    /// Shared by every provider adapter and the delegated selector
    pub http: reqwest::Client,
}
