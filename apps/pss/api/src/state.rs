//! Application state management.
//!
//! This module defines the shared application state passed to all request handlers.

/// Shared application state.
///
/// Cloned for each handler; the connection pool clone is an `Arc` clone.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: database::postgres::DatabaseConnection,
}
