//! Integration tests for the schedule domain
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - Queries and joins assemble events with their location and tags
//! - Foreign keys and cascades behave as the in-memory store does
//! - Event writes with tag links are transactional
//!
//! They need Docker and are ignored by default:
//! `cargo test -p domain_events -- --ignored`

use chrono::{TimeZone, Utc};
use domain_events::*;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

fn event_input(party: &str, hour: u32, location: MergeLocation, tags: Vec<MergeTag>) -> MergeEvent {
    MergeEvent {
        id: None,
        name: format!("Slot {}", hour),
        description: "Integration".to_string(),
        party: party.to_string(),
        public: true,
        start_time: Utc.with_ymd_and_hms(2026, 8, 7, hour, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 8, 7, hour + 1, 0, 0).unwrap(),
        location,
        tags,
    }
}

fn new_location(name: String) -> MergeLocation {
    MergeLocation {
        id: None,
        name,
        ..Default::default()
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_merge_and_load_event() {
    let db = TestDatabase::new().await;
    let service = EventService::new(PgEventRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("merge_and_load");
    let party = builder.party();

    let created = service
        .merge_event(event_input(
            &party,
            10,
            new_location(builder.name("location", "hall")),
            vec![
                MergeTag::named(builder.name("tag", "b")),
                MergeTag::named(builder.name("tag", "a")),
            ],
        ))
        .await
        .unwrap();
    assert!(created.is_created());
    let created = created.into_inner();

    let loaded = assert_some(
        service.find_event(created.id).await.unwrap(),
        "event should exist",
    );
    assert_eq!(loaded, created);
    assert_eq!(loaded.tags.len(), 2);
    assert_ascending(
        &loaded.tags.iter().map(|t| t.id).collect::<Vec<_>>(),
        "event tags",
    );
    assert_eq!(loaded.start_time, Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_replaces_tag_links() {
    let db = TestDatabase::new().await;
    let service = EventService::new(PgEventRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("replace_tags");

    let event = service
        .merge_event(event_input(
            &builder.party(),
            10,
            new_location(builder.name("location", "hall")),
            vec![MergeTag::named("old")],
        ))
        .await
        .unwrap()
        .into_inner();

    let mut input = event_input(
        &builder.party(),
        11,
        MergeLocation::by_id(event.location.id),
        vec![MergeTag::named("new")],
    );
    input.id = Some(event.id);

    let updated = service.merge_event(input).await.unwrap();
    assert!(!updated.is_created());

    let updated = updated.into_inner();
    assert_eq!(updated.id, event.id);
    assert_eq!(updated.tags.len(), 1);
    assert_eq!(updated.tags[0].name, "new");
    assert_eq!(service.list_tags().await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_events_ordering_and_parties() {
    let db = TestDatabase::new().await;
    let service = EventService::new(PgEventRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("ordering");

    let location = service
        .merge_location(new_location(builder.name("location", "hall")))
        .await
        .unwrap()
        .into_inner();

    for hour in [15, 9, 12] {
        service
            .merge_event(event_input(
                "Evoke",
                hour,
                MergeLocation::by_id(location.id),
                vec![],
            ))
            .await
            .unwrap();
    }
    let mut hidden = event_input("Secret", 8, MergeLocation::by_id(location.id), vec![]);
    hidden.public = false;
    service.merge_event(hidden).await.unwrap();

    let events = service.list_party_events("Evoke").await.unwrap();
    let hours: Vec<u32> = events
        .iter()
        .map(|e| chrono::Timelike::hour(&e.start_time))
        .collect();
    assert_eq!(hours, vec![9, 12, 15]);

    assert_eq!(service.list_parties().await.unwrap(), vec!["Evoke", "Secret"]);
    assert_eq!(service.list_public_parties().await.unwrap(), vec!["Evoke"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_location_in_use_and_tag_cascade() {
    let db = TestDatabase::new().await;
    let service = EventService::new(PgEventRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("in_use");

    let event = service
        .merge_event(event_input(
            &builder.party(),
            10,
            new_location(builder.name("location", "hall")),
            vec![MergeTag::named("music")],
        ))
        .await
        .unwrap()
        .into_inner();

    let result = service.delete_location(event.location.id).await;
    assert!(matches!(result, Err(EventError::Conflict(_))));

    service.delete_tag(event.tags[0].id).await.unwrap();
    let reloaded = assert_some(service.find_event(event.id).await.unwrap(), "event");
    assert!(reloaded.tags.is_empty());

    service.delete_event(event.id).await.unwrap();
    service.delete_location(event.location.id).await.unwrap();
    assert!(service.list_parties().await.unwrap().is_empty());

    let result = service.delete_event(event.id).await;
    assert!(matches!(result, Err(EventError::DeleteMissing { kind: "event", .. })));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_csv_round_trip() {
    let db = TestDatabase::new().await;
    let service = EventService::new(PgEventRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("csv_round_trip");
    let party = builder.party();

    service
        .merge_event(event_input(
            &party,
            10,
            new_location(builder.name("location", "hall")),
            vec![MergeTag::named("ceremony"), MergeTag::named("time: local")],
        ))
        .await
        .unwrap();
    let before = service.list_party_events(&party).await.unwrap();

    let csv = domain_events::csv::export_events(&before).unwrap();
    let result = domain_events::csv::import_events(&service, csv.as_bytes(), false)
        .await
        .unwrap();

    assert_eq!(result.updated, 1);
    assert!(result.errors.is_empty());
    assert_eq!(service.list_party_events(&party).await.unwrap(), before);
    assert_eq!(service.list_tags().await.unwrap().len(), 2);
    assert_eq!(service.list_locations().await.unwrap().len(), 1);
}
