use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// A place where events happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub url: String,
}

/// A free-form label attached to events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A scheduled event of a party.
///
/// `tags` are ordered by tag id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub party: String,
    pub public: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Location,
    pub tags: Vec<Tag>,
}

impl Event {
    /// True when the event carries a tag with exactly this name
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }
}

/// Location as submitted for a merge.
///
/// A resolving `id` updates that location; anything else inserts a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct MergeLocation {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Location name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 2048))]
    pub url: String,
}

impl MergeLocation {
    /// Reference to an existing location by id only
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn data(&self) -> LocationData {
        LocationData {
            name: self.name.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
        }
    }
}

/// Tag as submitted for a merge
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct MergeTag {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "Tag name must be 1-255 characters"),
        custom(function = "validate_tag_name")
    )]
    pub name: String,
}

impl MergeTag {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            name: String::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn data(&self) -> TagData {
        TagData {
            name: self.name.clone(),
        }
    }
}

/// `|` separates tags in the CSV tag column.
fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    if name.contains('|') {
        let mut err = ValidationError::new("tag_name");
        err.message = Some("Tag name must not contain '|'".into());
        return Err(err);
    }
    Ok(())
}

fn default_public() -> bool {
    true
}

/// Event as submitted for a merge, either as JSON or as a CSV row.
///
/// The embedded location and tags are references: they are only validated
/// when they have to be created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct MergeEvent {
    #[serde(default)]
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(length(min = 1, max = 255, message = "Party must be 1-255 characters"))]
    pub party: String,

    #[serde(default = "default_public")]
    pub public: bool,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub location: MergeLocation,

    #[serde(default)]
    pub tags: Vec<MergeTag>,
}

fn validate_time_range(event: &MergeEvent) -> Result<(), ValidationError> {
    if event.end_time < event.start_time {
        let mut err = ValidationError::new("time_range");
        err.message = Some("end_time must not be before start_time".into());
        return Err(err);
    }
    Ok(())
}

/// Stored fields of a location, without its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationData {
    pub name: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagData {
    pub name: String,
}

/// Stored fields of an event with resolved references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub name: String,
    pub description: String,
    pub party: String,
    pub public: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location_id: i64,
    /// Sorted and free of duplicates
    pub tag_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn merge_event(start_hour: u32, end_hour: u32) -> MergeEvent {
        MergeEvent {
            id: None,
            name: "Opening".to_string(),
            description: String::new(),
            party: "Revision 2026".to_string(),
            public: true,
            start_time: Utc.with_ymd_and_hms(2026, 4, 3, start_hour, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 4, 3, end_hour, 0, 0).unwrap(),
            location: MergeLocation::by_id(1),
            tags: vec![],
        }
    }

    #[test]
    fn test_time_range_validation() {
        assert!(merge_event(10, 11).validate().is_ok());
        assert!(merge_event(10, 10).validate().is_ok());
        assert!(merge_event(11, 10).validate().is_err());
    }

    #[test]
    fn test_embedded_references_not_validated() {
        // Location and tags without names are plain id references.
        let mut event = merge_event(10, 11);
        event.tags = vec![MergeTag::by_id(3)];
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_empty_party_rejected() {
        let mut event = merge_event(10, 11);
        event.party = String::new();
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_tag_name_rejects_separator() {
        assert!(MergeTag::named("demo|music").validate().is_err());
        assert!(MergeTag::named("demo:music").validate().is_ok());
        assert!(MergeTag::named("").validate().is_err());
    }

    #[test]
    fn test_public_defaults_to_true() {
        let json = r#"{
            "name": "Shader showdown",
            "party": "Revision 2026",
            "start_time": "2026-04-03T18:00:00Z",
            "end_time": "2026-04-03T19:00:00Z",
            "location": {"id": 1}
        }"#;
        let event: MergeEvent = serde_json::from_str(json).unwrap();
        assert!(event.public);
        assert!(event.tags.is_empty());
        assert_eq!(event.location.id, Some(1));
    }
}
