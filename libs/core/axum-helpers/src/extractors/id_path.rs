//! Integer id path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};

/// Extracts a single `i64` identifier from the path.
///
/// Non-numeric values are rejected with `400 INVALID_ID` before the
/// handler runs.
///
/// ```ignore
/// async fn delete_tag(IdPath(id): IdPath) -> StatusCode { ... }
///
/// let app = Router::new().route("/tag/id/{id}", delete(delete_tag));
/// ```
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        raw.trim()
            .parse::<i64>()
            .map(IdPath)
            .map_err(|_| AppError::InvalidId(format!("Invalid id: {}", raw)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().route(
            "/item/{id}",
            get(|IdPath(id): IdPath| async move { id.to_string() }),
        )
    }

    async fn status(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_numeric_id_accepted() {
        assert_eq!(status("/item/42").await, StatusCode::OK);
        assert_eq!(status("/item/-1").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_numeric_id_rejected() {
        assert_eq!(status("/item/abc").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/item/4.2").await, StatusCode::BAD_REQUEST);
    }
}
