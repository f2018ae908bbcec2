//! # Axum Helpers
//!
//! Shared web plumbing for the schedule service.
//!
//! - **[`auth`]**: static admin gate (HTTP Basic / Bearer)
//! - **[`server`]**: router assembly with API docs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: structured error responses with error codes
//! - **[`extractors`]**: integer id path and validated JSON extractors
//! - **[`audit`]**: audit log lines for admin mutations

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{Actor, AdminAuthConfig, AdminIdentity, admin_auth_middleware};

pub use server::{
    HealthCheckFuture, HealthResponse, ReadyResponse, ShutdownCoordinator,
    create_production_app, create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse, error_response};

pub use extractors::{IdPath, ValidatedJson};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers};
