use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_helpers::{
    Actor, AuditEvent, AuditOutcome, IdPath, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
    extract_ip_from_headers,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};

use crate::csv::{self, ImportResult, RowError};
use crate::error::{EventError, EventResult};
use crate::models::{Event, Location, MergeEvent, MergeLocation, MergeTag, Tag};
use crate::repository::EventRepository;
use crate::service::{EventService, Merged};

pub const ADMIN_TAG: &str = "admin";
pub const PUBLIC_TAG: &str = "public";

/// OpenAPI documentation for the admin schedule API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_party_events,
        export_party_events,
        merge_event,
        import_events,
        delete_event,
        list_locations,
        merge_location,
        delete_location,
        list_tags,
        merge_tag,
        delete_tag,
        list_parties,
    ),
    components(
        schemas(Event, Location, Tag, MergeEvent, MergeLocation, MergeTag, ImportResult, RowError),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            ConflictResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = ADMIN_TAG, description = "Schedule administration (Basic or Bearer auth)")
    )
)]
pub struct AdminApiDoc;

/// OpenAPI documentation for the public schedule API
#[derive(OpenApi)]
#[openapi(
    paths(public_parties, public_party_events, public_party_events_with_tags),
    components(
        schemas(Event, Location, Tag),
        responses(InternalServerErrorResponse)
    ),
    tags(
        (name = PUBLIC_TAG, description = "Published schedule of public events")
    )
)]
pub struct PublicApiDoc;

/// Admin routes. The caller is responsible for putting the admin gate in front.
pub fn admin_router<R: EventRepository + 'static>(service: EventService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/event", post(merge_event))
        .route("/event/import", post(import_events))
        .route("/event/id/{id}", delete(delete_event))
        .route("/event/party/{party}", get(list_party_events))
        .route("/event/party/{party}/export", get(export_party_events))
        .route("/location", get(list_locations).post(merge_location))
        .route("/location/id/{id}", delete(delete_location))
        .route("/tag", get(list_tags).post(merge_tag))
        .route("/tag/id/{id}", delete(delete_tag))
        .route("/party", get(list_parties))
        .with_state(shared_service)
}

/// Read-only routes over public events
pub fn public_router<R: EventRepository + 'static>(service: EventService<R>) -> Router {
    Router::new()
        .route("/party", get(public_parties))
        .route("/event/party/{party}", get(public_party_events))
        .route(
            "/event/party/{party}/tag/{tags}",
            get(public_party_events_with_tags),
        )
        .with_state(Arc::new(service))
}

fn merged_response<T: serde::Serialize>(merged: Merged<T>) -> (StatusCode, Json<T>) {
    let status = if merged.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(merged.into_inner()))
}

fn audit(actor: Actor, headers: &HeaderMap, action: &str, resource: String) -> AuditEvent {
    AuditEvent::new(actor.0, action, Some(resource), AuditOutcome::Success)
        .with_ip(extract_ip_from_headers(headers))
}

/// `events_<party>.csv`, with quotes, backslashes, control and non-ASCII
/// characters replaced so the name fits a quoted header parameter.
fn export_filename(party: &str) -> String {
    let safe: String = party
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && !matches!(c, '"' | '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("events_{}.csv", safe)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImportParams {
    /// Allow moving existing events to another party
    #[serde(default)]
    pub force: bool,
}

// ===== Admin: events =====

/// All events of a party, public and non-public
#[utoipa::path(
    get,
    path = "/event/party/{party}",
    tag = ADMIN_TAG,
    params(("party" = String, Path, description = "Party label")),
    responses(
        (status = 200, description = "Events ordered by start time", body = Vec<Event>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_party_events<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    Path(party): Path<String>,
) -> EventResult<Json<Vec<Event>>> {
    let events = service.list_party_events(&party).await?;
    Ok(Json(events))
}

/// Download the events of a party as CSV
#[utoipa::path(
    get,
    path = "/event/party/{party}/export",
    tag = ADMIN_TAG,
    params(("party" = String, Path, description = "Party label")),
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn export_party_events<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    Path(party): Path<String>,
) -> EventResult<impl IntoResponse> {
    let events = service.list_party_events(&party).await?;
    let body = csv::export_events(&events)?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        export_filename(&party)
    ))
    .map_err(|e| EventError::Internal(e.to_string()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=UTF-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Create or update an event
#[utoipa::path(
    post,
    path = "/event",
    tag = ADMIN_TAG,
    request_body = MergeEvent,
    responses(
        (status = 200, description = "Existing event updated", body = Event),
        (status = 201, description = "Event created", body = Event),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn merge_event<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<MergeEvent>,
) -> EventResult<impl IntoResponse> {
    let merged = service.merge_event(input).await?;

    let event = match &merged {
        Merged::Created(event) | Merged::Updated(event) => event,
    };
    audit(actor, &headers, "event.merge", format!("event:{}", event.id))
        .with_details(json!({
            "created": merged.is_created(),
            "party": event.party,
        }))
        .log();

    Ok(merged_response(merged))
}

/// Bulk create or update events from CSV
#[utoipa::path(
    post,
    path = "/event/import",
    tag = ADMIN_TAG,
    params(ImportParams),
    request_body(content = String, content_type = "text/csv", description = "Events in the export layout"),
    responses(
        (status = 200, description = "Per-row outcome", body = ImportResult),
        (status = 400, description = "Unreadable CSV header"),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn import_events<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    Query(params): Query<ImportParams>,
    actor: Actor,
    headers: HeaderMap,
    body: Bytes,
) -> EventResult<Json<ImportResult>> {
    let result = csv::import_events(&service, &body, params.force).await?;

    audit(actor, &headers, "event.import", "event:*".to_string())
        .with_details(json!({
            "force": params.force,
            "created": result.created,
            "updated": result.updated,
            "skipped": result.skipped,
        }))
        .log();

    Ok(Json(result))
}

/// Delete an event
#[utoipa::path(
    delete,
    path = "/event/id/{id}",
    tag = ADMIN_TAG,
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 400, response = BadRequestIdResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_event<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    IdPath(id): IdPath,
) -> EventResult<StatusCode> {
    service.delete_event(id).await?;
    audit(actor, &headers, "event.delete", format!("event:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

// ===== Admin: locations =====

#[utoipa::path(
    get,
    path = "/location",
    tag = ADMIN_TAG,
    responses(
        (status = 200, description = "All locations", body = Vec<Location>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_locations<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
) -> EventResult<Json<Vec<Location>>> {
    Ok(Json(service.list_locations().await?))
}

/// Create or update a location
#[utoipa::path(
    post,
    path = "/location",
    tag = ADMIN_TAG,
    request_body = MergeLocation,
    responses(
        (status = 200, description = "Existing location updated", body = Location),
        (status = 201, description = "Location created", body = Location),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn merge_location<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<MergeLocation>,
) -> EventResult<impl IntoResponse> {
    let merged = service.merge_location(input).await?;

    let id = match &merged {
        Merged::Created(location) | Merged::Updated(location) => location.id,
    };
    audit(actor, &headers, "location.merge", format!("location:{}", id))
        .with_details(json!({ "created": merged.is_created() }))
        .log();

    Ok(merged_response(merged))
}

/// Delete a location no event takes place at
#[utoipa::path(
    delete,
    path = "/location/id/{id}",
    tag = ADMIN_TAG,
    params(("id" = i64, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 400, response = BadRequestIdResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_location<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    IdPath(id): IdPath,
) -> EventResult<StatusCode> {
    service.delete_location(id).await?;
    audit(actor, &headers, "location.delete", format!("location:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

// ===== Admin: tags =====

#[utoipa::path(
    get,
    path = "/tag",
    tag = ADMIN_TAG,
    responses(
        (status = 200, description = "All tags", body = Vec<Tag>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_tags<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
) -> EventResult<Json<Vec<Tag>>> {
    Ok(Json(service.list_tags().await?))
}

/// Create or update a tag
#[utoipa::path(
    post,
    path = "/tag",
    tag = ADMIN_TAG,
    request_body = MergeTag,
    responses(
        (status = 200, description = "Existing tag updated", body = Tag),
        (status = 201, description = "Tag created", body = Tag),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn merge_tag<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<MergeTag>,
) -> EventResult<impl IntoResponse> {
    let merged = service.merge_tag(input).await?;

    let id = match &merged {
        Merged::Created(tag) | Merged::Updated(tag) => tag.id,
    };
    audit(actor, &headers, "tag.merge", format!("tag:{}", id))
        .with_details(json!({ "created": merged.is_created() }))
        .log();

    Ok(merged_response(merged))
}

#[utoipa::path(
    delete,
    path = "/tag/id/{id}",
    tag = ADMIN_TAG,
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 400, response = BadRequestIdResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_tag<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    actor: Actor,
    headers: HeaderMap,
    IdPath(id): IdPath,
) -> EventResult<StatusCode> {
    service.delete_tag(id).await?;
    audit(actor, &headers, "tag.delete", format!("tag:{}", id)).log();
    Ok(StatusCode::NO_CONTENT)
}

// ===== Admin: parties =====

/// Distinct party labels with at least one event
#[utoipa::path(
    get,
    path = "/party",
    tag = ADMIN_TAG,
    responses(
        (status = 200, description = "Sorted party labels", body = Vec<String>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_parties<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
) -> EventResult<Json<Vec<String>>> {
    Ok(Json(service.list_parties().await?))
}

// ===== Public =====

/// Parties with at least one public event
#[utoipa::path(
    get,
    path = "/party",
    tag = PUBLIC_TAG,
    responses(
        (status = 200, description = "Sorted party labels", body = Vec<String>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn public_parties<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
) -> EventResult<Json<Vec<String>>> {
    Ok(Json(service.list_public_parties().await?))
}

/// Public events of a party
#[utoipa::path(
    get,
    path = "/event/party/{party}",
    tag = PUBLIC_TAG,
    params(("party" = String, Path, description = "Party label")),
    responses(
        (status = 200, description = "Public events ordered by start time", body = Vec<Event>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn public_party_events<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    Path(party): Path<String>,
) -> EventResult<Json<Vec<Event>>> {
    Ok(Json(service.list_public_events(&party).await?))
}

/// Public events of a party carrying all the given tags
#[utoipa::path(
    get,
    path = "/event/party/{party}/tag/{tags}",
    tag = PUBLIC_TAG,
    params(
        ("party" = String, Path, description = "Party label"),
        ("tags" = String, Path, description = "Tag names joined with '+'")
    ),
    responses(
        (status = 200, description = "Matching public events", body = Vec<Event>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn public_party_events_with_tags<R: EventRepository>(
    State(service): State<Arc<EventService<R>>>,
    Path((party, tags)): Path<(String, String)>,
) -> EventResult<Json<Vec<Event>>> {
    let names: Vec<String> = tags
        .split('+')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Json(
        service.list_public_events_with_tags(&party, &names).await?,
    ))
}
