use axum::http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS layer for an explicit list of origins.
///
/// Allows the methods and headers the schedule API uses, and exposes
/// `Content-Disposition` so browsers can read the export filename.
/// Fails on an origin that is not a valid header value.
pub fn create_cors_layer(
    allowed_origins: &[String],
) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600)))
}
