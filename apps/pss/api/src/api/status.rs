use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness body of `/api/status`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    /// Server clock in milliseconds since the Unix epoch
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

pub fn router() -> Router {
    Router::new().route("/status", get(status))
}

/// Report that the server is up, with its current time
#[utoipa::path(
    get,
    path = "/status",
    tag = "status",
    responses(
        (status = 200, description = "Server is up", body = StatusResponse)
    )
)]
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
        server_time: Utc::now().timestamp_millis(),
    })
}
