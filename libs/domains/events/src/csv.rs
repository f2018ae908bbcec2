//! CSV import and export of party events.
//!
//! One row per event. The location is referenced through `location_id`;
//! the `location_*` columns only matter when that id does not resolve.
//! Tags are a `|`-separated list of `<id>:<name>` entries, where a missing
//! id (`:<name>` or just `<name>`) asks for a new tag.

use ::csv::{ReaderBuilder, WriterBuilder};
use chrono::{DateTime, Utc};
use observability::schedule::ScheduleMetrics;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{EventError, EventResult};
use crate::models::{Event, MergeEvent, MergeLocation, MergeTag};
use crate::repository::EventRepository;
use crate::service::EventService;

pub const HEADER: [&str; 12] = [
    "id",
    "name",
    "description",
    "party",
    "public",
    "start_time",
    "end_time",
    "location_id",
    "location_name",
    "location_description",
    "location_url",
    "tags",
];

const TAG_SEPARATOR: char = '|';

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportResult {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: Vec<RowError>,
}

/// A data row that was not applied. Rows are numbered from 1, header excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventRecord {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    #[serde(default)]
    description: String,
    party: String,
    #[serde(default)]
    public: Option<bool>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    location_id: Option<i64>,
    #[serde(default)]
    location_name: String,
    #[serde(default)]
    location_description: String,
    #[serde(default)]
    location_url: String,
    #[serde(default)]
    tags: String,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            id: Some(event.id),
            name: event.name.clone(),
            description: event.description.clone(),
            party: event.party.clone(),
            public: Some(event.public),
            start_time: event.start_time,
            end_time: event.end_time,
            location_id: Some(event.location.id),
            location_name: event.location.name.clone(),
            location_description: event.location.description.clone(),
            location_url: event.location.url.clone(),
            tags: encode_tags(event),
        }
    }
}

impl From<EventRecord> for MergeEvent {
    fn from(record: EventRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            party: record.party,
            public: record.public.unwrap_or(true),
            start_time: record.start_time,
            end_time: record.end_time,
            location: MergeLocation {
                id: record.location_id,
                name: record.location_name,
                description: record.location_description,
                url: record.location_url,
            },
            tags: decode_tags(&record.tags),
        }
    }
}

fn encode_tags(event: &Event) -> String {
    event
        .tags
        .iter()
        .map(|tag| format!("{}:{}", tag.id, tag.name))
        .collect::<Vec<_>>()
        .join("|")
}

/// Parse the tag column. Only the first `:` splits id from name.
///
/// Names are taken verbatim; blank entries are dropped and the id prefix
/// may carry surrounding spaces.
pub fn decode_tags(column: &str) -> Vec<MergeTag> {
    column
        .split(TAG_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((prefix, name)) if prefix.is_empty() => MergeTag::named(name),
            Some((prefix, name)) => match prefix.trim().parse::<i64>() {
                Ok(id) => MergeTag {
                    id: Some(id),
                    name: name.to_string(),
                },
                Err(_) => MergeTag::named(entry),
            },
            None => MergeTag::named(entry),
        })
        .collect()
}

/// Serialize events in the given order. The header is always written.
#[instrument(skip(events), fields(rows = events.len()))]
pub fn export_events(events: &[Event]) -> EventResult<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for event in events {
        writer.serialize(EventRecord::from(event))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EventError::Internal(format!("Failed to flush CSV: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| EventError::Internal(format!("CSV output is not UTF-8: {}", e)))?;

    ScheduleMetrics::record_export(events.len());
    Ok(text)
}

/// Apply CSV rows in input order through [`EventService::merge_event`].
///
/// Bad rows are reported in the result and skipped; only an unreadable
/// header fails the whole import. Moving an existing event to another party
/// is refused unless `force` is set.
#[instrument(skip(service, input), fields(bytes = input.len()))]
pub async fn import_events<R: EventRepository>(
    service: &EventService<R>,
    input: &[u8],
    force: bool,
) -> EventResult<ImportResult> {
    let started = Instant::now();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input);
    reader.headers()?;

    let mut result = ImportResult::default();

    for (index, record) in reader.deserialize::<EventRecord>().enumerate() {
        let row = index + 1;

        let merge: MergeEvent = match record {
            Ok(record) => record.into(),
            Err(e) => {
                result.reject(row, format!("Malformed row: {}", e));
                continue;
            }
        };

        if let Err(e) = merge.validate() {
            result.reject(row, format!("Invalid row: {}", e));
            continue;
        }

        if let Some(id) = merge.id {
            match service.find_event(id).await {
                Ok(Some(existing)) if existing.party != merge.party && !force => {
                    result.reject(
                        row,
                        format!(
                            "Event {} belongs to party '{}'; moving it to '{}' requires force",
                            id, existing.party, merge.party
                        ),
                    );
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    result.reject(row, e.to_string());
                    continue;
                }
            }
        }

        match service.merge_event(merge).await {
            Ok(merged) if merged.is_created() => result.created += 1,
            Ok(_) => result.updated += 1,
            Err(e) => result.reject(row, e.to_string()),
        }
    }

    ScheduleMetrics::record_import(
        result.created,
        result.updated,
        result.skipped,
        started.elapsed(),
    );
    tracing::info!(
        created = result.created,
        updated = result.updated,
        skipped = result.skipped,
        "CSV import finished"
    );
    Ok(result)
}

impl ImportResult {
    fn reject(&mut self, row: usize, message: String) {
        tracing::debug!(row, %message, "Skipping CSV row");
        self.skipped += 1;
        self.errors.push(RowError { row, message });
    }
}
