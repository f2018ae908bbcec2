use axum_helpers::AdminAuthConfig;
use core_config::{AppInfo, FromEnv, app_info, env_parse_or, server::ServerConfig};
use database::postgres::PostgresConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub admin: AdminAuthConfig,
    pub environment: Environment,
    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let admin = AdminAuthConfig::from_env()?; // ADMIN_USERNAME / ADMIN_PASSWORD required
        let run_migrations = env_parse_or("RUN_MIGRATIONS", true)?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            admin,
            environment,
            run_migrations,
        })
    }
}
