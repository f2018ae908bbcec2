//! Handler tests for the schedule domain
//!
//! These tests drive the admin and public routers through `oneshot` with an
//! in-memory repository:
//! - Request deserialization and validation
//! - Status codes of merges and deletes
//! - CSV import/export over HTTP
//! - Public filtering

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum_helpers::{AdminAuthConfig, ErrorResponse, admin_auth_middleware};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{TimeZone, Utc};
use domain_events::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

const HEADER: &str = "id,name,description,party,public,start_time,end_time,\
                      location_id,location_name,location_description,location_url,tags";

fn setup() -> (Router, EventService<InMemoryEventRepository>) {
    let service = EventService::new(InMemoryEventRepository::new());
    (handlers::admin_router(service.clone()), service)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_csv(uri: &str, rows: &[&str]) -> Request<Body> {
    let mut csv = format!("{}\n", HEADER);
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn event_input(party: &str, hour: u32, location: MergeLocation) -> MergeEvent {
    MergeEvent {
        id: None,
        name: format!("Slot {}", hour),
        description: String::new(),
        party: party.to_string(),
        public: true,
        start_time: Utc.with_ymd_and_hms(2026, 8, 7, hour, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 8, 7, hour, 30, 0).unwrap(),
        location,
        tags: vec![],
    }
}

async fn seed_location(service: &EventService<InMemoryEventRepository>) -> Location {
    service
        .merge_location(MergeLocation {
            id: None,
            name: "Track 1".to_string(),
            description: "Main stage".to_string(),
            url: String::new(),
        })
        .await
        .unwrap()
        .into_inner()
}

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
async fn test_import_def_con_creates_one_and_updates_one() {
    let (app, service) = setup();
    let location = seed_location(&service).await;

    for hour in 0..42 {
        service
            .merge_event(event_input(
                "DEF CON",
                hour % 24,
                MergeLocation::by_id(location.id),
            ))
            .await
            .unwrap();
    }
    assert!(service.find_event(42).await.unwrap().is_some());

    let response = send(
        &app,
        post_csv(
            "/event/import",
            &[
                ",Lockpicking village,,DEF CON,true,2026-08-08T10:00:00Z,2026-08-08T18:00:00Z,1,,,,:village",
                "42,Closing ceremonies,,DEF CON,true,2026-08-09T16:00:00Z,2026-08-09T18:00:00Z,1,,,,",
            ],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let result: ImportResult = json_body(response).await;
    assert_eq!(result.created, 1);
    assert_eq!(result.updated, 1);
    assert_eq!(result.skipped, 0);
    assert!(result.errors.is_empty());

    let updated = service.find_event(42).await.unwrap().unwrap();
    assert_eq!(updated.name, "Closing ceremonies");
    assert_eq!(service.list_party_events("DEF CON").await.unwrap().len(), 43);
}

#[tokio::test]
async fn test_import_party_change_requires_force() {
    let (app, service) = setup();
    let location = seed_location(&service).await;
    let event = service
        .merge_event(event_input("Evoke", 10, MergeLocation::by_id(location.id)))
        .await
        .unwrap()
        .into_inner();

    let row = format!(
        "{},Slot 10,,Revision,true,2026-08-07T10:00:00Z,2026-08-07T10:30:00Z,{},,,,",
        event.id, location.id
    );

    let response = send(&app, post_csv("/event/import", &[row.as_str()])).await;
    let result: ImportResult = json_body(response).await;
    assert_eq!(result.updated, 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 1);
    assert!(result.errors[0].message.contains("requires force"));
    assert_eq!(
        service.find_event(event.id).await.unwrap().unwrap().party,
        "Evoke"
    );

    let response = send(&app, post_csv("/event/import?force=true", &[row.as_str()])).await;
    let result: ImportResult = json_body(response).await;
    assert_eq!(result.updated, 1);
    assert!(result.errors.is_empty());
    assert_eq!(
        service.find_event(event.id).await.unwrap().unwrap().party,
        "Revision"
    );
    assert_eq!(service.list_parties().await.unwrap(), vec!["Revision"]);
}

#[tokio::test]
async fn test_import_reports_bad_rows_and_continues() {
    let (app, service) = setup();
    seed_location(&service).await;

    let response = send(
        &app,
        post_csv(
            "/event/import",
            &[
                ",Broken,,Evoke,true,not-a-date,2026-08-07T10:30:00Z,1,,,,",
                ",Backwards,,Evoke,true,2026-08-07T11:00:00Z,2026-08-07T10:00:00Z,1,,,,",
                ",Good,,Evoke,,2026-08-07T12:00:00Z,2026-08-07T13:00:00Z,1,,,,",
                ",Nowhere,,Evoke,true,2026-08-07T12:00:00Z,2026-08-07T13:00:00Z,,,,,",
            ],
        ),
    )
    .await;

    let result: ImportResult = json_body(response).await;
    assert_eq!(result.created, 1);
    assert_eq!(result.skipped, 3);
    let rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![1, 2, 4]);

    let events = service.list_party_events("Evoke").await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].public);
}

#[tokio::test]
async fn test_export_then_import_is_stable() {
    let (app, service) = setup();
    let location = seed_location(&service).await;

    let mut input = event_input("Assembly", 18, MergeLocation::by_id(location.id));
    input.description = "Opening, with \"quotes\"".to_string();
    input.tags = vec![MergeTag::named("ceremony"), MergeTag::named("time: local")];
    service.merge_event(input).await.unwrap();

    let mut hidden = event_input("Assembly", 9, MergeLocation::by_id(location.id));
    hidden.public = false;
    service.merge_event(hidden).await.unwrap();

    let before = service.list_party_events("Assembly").await.unwrap();

    let response = send(&app, get("/event/party/Assembly/export")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let csv = body_bytes(response).await;

    let request = Request::builder()
        .method("POST")
        .uri("/event/import")
        .body(Body::from(csv))
        .unwrap();
    let result: ImportResult = json_body(send(&app, request).await).await;

    assert_eq!(result.created, 0);
    assert_eq!(result.updated, 2);
    assert!(result.errors.is_empty());

    assert_eq!(service.list_party_events("Assembly").await.unwrap(), before);
    assert_eq!(service.list_locations().await.unwrap().len(), 1);
    assert_eq!(service.list_tags().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_then_import_keeps_whitespace() {
    let (app, service) = setup();

    let mut input = event_input(
        "Assembly",
        20,
        MergeLocation {
            id: None,
            name: "  Hall B".to_string(),
            description: "Upstairs\n".to_string(),
            url: String::new(),
        },
    );
    input.name = "  Opening ".to_string();
    input.description = "Line one\nLine two\n".to_string();
    input.tags = vec![MergeTag::named(" late night ")];
    service.merge_event(input).await.unwrap();

    let before = service.list_party_events("Assembly").await.unwrap();

    let csv = body_bytes(send(&app, get("/event/party/Assembly/export")).await).await;
    let request = Request::builder()
        .method("POST")
        .uri("/event/import")
        .body(Body::from(csv))
        .unwrap();
    let result: ImportResult = json_body(send(&app, request).await).await;

    assert_eq!(result.updated, 1);
    assert!(result.errors.is_empty());

    let after = service.list_party_events("Assembly").await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after[0].name, "  Opening ");
    assert_eq!(after[0].description, "Line one\nLine two\n");
    assert_eq!(after[0].location.name, "  Hall B");
    assert_eq!(after[0].tags[0].name, " late night ");
}

#[tokio::test]
async fn test_import_rejected_row_writes_nothing() {
    let (app, service) = setup();

    let response = send(
        &app,
        post_csv(
            "/event/import",
            &[",Stage dive,,Evoke,true,2026-08-07T12:00:00Z,2026-08-07T13:00:00Z,,Tent,,,music|:"],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let result: ImportResult = json_body(response).await;
    assert_eq!(result.created, 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors[0].row, 1);

    assert!(service.list_parties().await.unwrap().is_empty());
    assert!(service.list_locations().await.unwrap().is_empty());
    assert!(service.list_tags().await.unwrap().is_empty());
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_headers() {
    let (app, _) = setup();

    let response = send(&app, get("/event/party/Revision%202026/export")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=UTF-8"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"events_Revision 2026.csv\""
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body.trim_end(), HEADER);
}

// ============================================================================
// Merges
// ============================================================================

#[tokio::test]
async fn test_merge_location_created_then_updated() {
    let (app, _) = setup();

    let response = send(
        &app,
        post_json("/location", json!({"id": 99, "name": "Hall A"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Location = json_body(response).await;
    assert_eq!(created.id, 1);

    let response = send(
        &app,
        post_json(
            "/location",
            json!({"id": created.id, "name": "Hall B", "url": "https://example.org/map"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Location = json_body(response).await;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Hall B");

    let locations: Vec<Location> = json_body(send(&app, get("/location")).await).await;
    assert_eq!(locations, vec![updated]);
}

#[tokio::test]
async fn test_merge_tag_rejects_separator() {
    let (app, _) = setup();

    let response = send(&app, post_json("/tag", json!({"name": "a|b"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, post_json("/tag", json!({"name": "demo"}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let tags: Vec<Tag> = json_body(send(&app, get("/tag")).await).await;
    assert_eq!(tags.len(), 1);
}

#[tokio::test]
async fn test_merge_event_with_new_references() {
    let (app, _) = setup();

    let response = send(
        &app,
        post_json(
            "/event",
            json!({
                "name": "Shader showdown",
                "party": "Revision",
                "start_time": "2026-04-04T20:00:00Z",
                "end_time": "2026-04-04T21:00:00Z",
                "location": {"name": "Main hall"},
                "tags": [{"name": "live"}, {"name": "coding"}]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let event: Event = json_body(response).await;
    assert_eq!(event.location.name, "Main hall");
    assert_eq!(event.tags.len(), 2);
    assert!(event.public);

    let parties: Vec<String> = json_body(send(&app, get("/party")).await).await;
    assert_eq!(parties, vec!["Revision"]);
}

#[tokio::test]
async fn test_merge_event_rejects_inverted_time_range() {
    let (app, service) = setup();

    let response = send(
        &app,
        post_json(
            "/event",
            json!({
                "name": "Time travel",
                "party": "Revision",
                "start_time": "2026-04-04T21:00:00Z",
                "end_time": "2026-04-04T20:00:00Z",
                "location": {"name": "Main hall"}
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(service.list_locations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_merge_event_invalid_tag_writes_nothing() {
    let (app, service) = setup();

    let response = send(
        &app,
        post_json(
            "/event",
            json!({
                "name": "Shader showdown",
                "party": "Revision",
                "start_time": "2026-04-04T20:00:00Z",
                "end_time": "2026-04-04T21:00:00Z",
                "location": {"name": "Main hall"},
                "tags": [{"name": "live"}, {"name": "live|coding"}]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(service.list_locations().await.unwrap().is_empty());
    assert!(service.list_tags().await.unwrap().is_empty());
    assert!(service.list_parties().await.unwrap().is_empty());
}

// ============================================================================
// Deletes
// ============================================================================

#[tokio::test]
async fn test_delete_missing_returns_404() {
    let (app, _) = setup();

    for (uri, kind) in [
        ("/event/id/99", "event"),
        ("/location/id/99", "location"),
        ("/tag/id/99", "tag"),
    ] {
        let response = send(&app, delete(uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ErrorResponse = json_body(response).await;
        assert_eq!(
            error.message,
            format!("Cannot delete {} with ID 99: it does not exist", kind)
        );
    }
}

#[tokio::test]
async fn test_delete_invalid_id_returns_400() {
    let (app, _) = setup();

    let response = send(&app, delete("/event/id/abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_location_in_use_returns_409() {
    let (app, service) = setup();
    let location = seed_location(&service).await;
    let event = service
        .merge_event(event_input("Evoke", 10, MergeLocation::by_id(location.id)))
        .await
        .unwrap()
        .into_inner();

    let response = send(&app, delete(&format!("/location/id/{}", location.id))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(service.list_locations().await.unwrap().len(), 1);

    let response = send(&app, delete(&format!("/event/id/{}", event.id))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(service.list_parties().await.unwrap().is_empty());

    let response = send(&app, delete(&format!("/location/id/{}", location.id))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ============================================================================
// Public API
// ============================================================================

#[tokio::test]
async fn test_public_routes_hide_non_public_events() {
    let service = EventService::new(InMemoryEventRepository::new());
    let public = handlers::public_router(service.clone());
    let location = seed_location(&service).await;

    let mut talk = event_input("Evoke", 14, MergeLocation::by_id(location.id));
    talk.tags = vec![MergeTag::named("talk"), MergeTag::named("tech")];
    let talk = service.merge_event(talk).await.unwrap().into_inner();

    let mut concert = event_input("Evoke", 22, MergeLocation::by_id(location.id));
    concert.tags = vec![MergeTag::named("music")];
    service.merge_event(concert).await.unwrap();

    let mut orga = event_input("Orga only", 8, MergeLocation::by_id(location.id));
    orga.public = false;
    service.merge_event(orga).await.unwrap();

    let parties: Vec<String> = json_body(send(&public, get("/party")).await).await;
    assert_eq!(parties, vec!["Evoke"]);

    let events: Vec<Event> = json_body(send(&public, get("/event/party/Orga%20only")).await).await;
    assert!(events.is_empty());

    let events: Vec<Event> = json_body(send(&public, get("/event/party/Evoke")).await).await;
    assert_eq!(events.len(), 2);

    let events: Vec<Event> =
        json_body(send(&public, get("/event/party/Evoke/tag/talk+tech")).await).await;
    assert_eq!(events, vec![talk]);

    let events: Vec<Event> =
        json_body(send(&public, get("/event/party/Evoke/tag/talk+music")).await).await;
    assert!(events.is_empty());
}

// ============================================================================
// Admin gate
// ============================================================================

#[tokio::test]
async fn test_admin_router_behind_gate() {
    let (app, _) = setup();
    let config = Arc::new(AdminAuthConfig::new("orga", "s3cret"));
    let app = app.layer(axum::middleware::from_fn_with_state(
        config,
        admin_auth_middleware,
    ));

    let response = send(&app, get("/party")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/party")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("orga:wrong")),
        )
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/party")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("orga:s3cret")),
        )
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);
}
