use axum::Router;
use axum_helpers::{AdminAuthConfig, admin_auth_middleware};
use domain_events::{EventRepository, EventService, PgEventRepository, handlers};
use std::sync::Arc;

use crate::state::AppState;

/// Admin and public schedule routes backed by PostgreSQL
pub fn router(state: &AppState) -> Router {
    let repository = PgEventRepository::new(state.db.clone());
    let service = EventService::new(repository);

    schedule_routes(service, state.config.admin.clone())
}

/// `/admin` behind the admin gate and the open `/public` routes
pub fn schedule_routes<R: EventRepository + 'static>(
    service: EventService<R>,
    admin: AdminAuthConfig,
) -> Router {
    let admin = handlers::admin_router(service.clone()).layer(
        axum::middleware::from_fn_with_state(Arc::new(admin), admin_auth_middleware),
    );

    Router::new()
        .nest("/admin", admin)
        .nest("/public", handlers::public_router(service))
}
