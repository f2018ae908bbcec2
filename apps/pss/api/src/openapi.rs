use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::api::status::status),
    components(
        schemas(axum_helpers::ErrorResponse, crate::api::status::StatusResponse)
    ),
    info(
        title = "Party Schedule API",
        version = "0.1.0",
        description = "Events, locations and tags of party schedules: admin CRUD, CSV transfer and the public schedule"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/admin", api = domain_events::AdminApiDoc),
        (path = "/public", api = domain_events::PublicApiDoc)
    )
)]
pub struct ApiDoc;
