//! Static admin gate for the administrative API.
//!
//! ```ignore
//! use axum_helpers::auth::{AdminAuthConfig, admin_auth_middleware};
//! use core_config::FromEnv;
//!
//! let config = std::sync::Arc::new(AdminAuthConfig::from_env()?);
//! let admin = Router::new()
//!     .route("/location", get(list_locations))
//!     .layer(axum::middleware::from_fn_with_state(config, admin_auth_middleware));
//! ```

pub mod config;
pub mod middleware;

pub use config::AdminAuthConfig;
pub use middleware::{Actor, AdminIdentity, admin_auth_middleware};
