use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{EventError, EventResult};
use crate::models::{Event, EventData, Location, LocationData, Tag, TagData};

/// Persistence for the schedule: events, locations and tags.
///
/// Parties are never stored; they are derived from the `party` column of
/// events. Writes of an event and its tag links happen atomically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn get_event(&self, id: i64) -> EventResult<Option<Event>>;

    async fn get_location(&self, id: i64) -> EventResult<Option<Location>>;

    async fn get_tag(&self, id: i64) -> EventResult<Option<Tag>>;

    /// All events of a party, public or not, ordered by start time then id
    async fn list_events(&self, party: &str) -> EventResult<Vec<Event>>;

    /// All locations ordered by id
    async fn list_locations(&self) -> EventResult<Vec<Location>>;

    /// All tags ordered by id
    async fn list_tags(&self) -> EventResult<Vec<Tag>>;

    /// Distinct party labels carried by at least one event, sorted
    async fn list_parties(&self) -> EventResult<Vec<String>>;

    /// Distinct party labels carried by at least one public event, sorted
    async fn list_public_parties(&self) -> EventResult<Vec<String>>;

    async fn insert_location(&self, data: LocationData) -> EventResult<Location>;

    /// Overwrite a stored location; `NotFound` if `id` is unknown
    async fn update_location(&self, id: i64, data: LocationData) -> EventResult<Location>;

    /// Returns `false` when nothing was removed
    async fn delete_location(&self, id: i64) -> EventResult<bool>;

    async fn insert_tag(&self, data: TagData) -> EventResult<Tag>;

    async fn update_tag(&self, id: i64, data: TagData) -> EventResult<Tag>;

    async fn delete_tag(&self, id: i64) -> EventResult<bool>;

    async fn insert_event(&self, data: EventData) -> EventResult<Event>;

    async fn update_event(&self, id: i64, data: EventData) -> EventResult<Event>;

    async fn delete_event(&self, id: i64) -> EventResult<bool>;

    /// Number of events whose location is `location_id`
    async fn count_events_at_location(&self, location_id: i64) -> EventResult<u64>;
}

#[derive(Debug, Default)]
struct Store {
    locations: BTreeMap<i64, Location>,
    tags: BTreeMap<i64, Tag>,
    events: BTreeMap<i64, EventData>,
    next_location_id: i64,
    next_tag_id: i64,
    next_event_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Store {
    /// Enforces the foreign keys the database would enforce.
    fn check_references(&self, data: &EventData) -> EventResult<()> {
        if !self.locations.contains_key(&data.location_id) {
            return Err(EventError::Database(format!(
                "location {} referenced by event does not exist",
                data.location_id
            )));
        }
        if let Some(missing) = data.tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(EventError::Database(format!(
                "tag {} referenced by event does not exist",
                missing
            )));
        }
        Ok(())
    }

    fn resolve(&self, id: i64, data: &EventData) -> EventResult<Event> {
        let location = self
            .locations
            .get(&data.location_id)
            .cloned()
            .ok_or(EventError::NotFound {
                kind: "location",
                id: data.location_id,
            })?;

        let tag_ids: BTreeSet<i64> = data.tag_ids.iter().copied().collect();
        let tags = tag_ids
            .into_iter()
            .filter_map(|tag_id| self.tags.get(&tag_id).cloned())
            .collect();

        Ok(Event {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            party: data.party.clone(),
            public: data.public,
            start_time: data.start_time,
            end_time: data.end_time,
            location,
            tags,
        })
    }

    fn parties(&self, public_only: bool) -> Vec<String> {
        self.events
            .values()
            .filter(|data| !public_only || data.public)
            .map(|data| data.party.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// In-memory implementation of EventRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn get_event(&self, id: i64) -> EventResult<Option<Event>> {
        let store = self.store.read().await;
        store
            .events
            .get(&id)
            .map(|data| store.resolve(id, data))
            .transpose()
    }

    async fn get_location(&self, id: i64) -> EventResult<Option<Location>> {
        let store = self.store.read().await;
        Ok(store.locations.get(&id).cloned())
    }

    async fn get_tag(&self, id: i64) -> EventResult<Option<Tag>> {
        let store = self.store.read().await;
        Ok(store.tags.get(&id).cloned())
    }

    async fn list_events(&self, party: &str) -> EventResult<Vec<Event>> {
        let store = self.store.read().await;

        let mut events = store
            .events
            .iter()
            .filter(|(_, data)| data.party == party)
            .map(|(id, data)| store.resolve(*id, data))
            .collect::<EventResult<Vec<_>>>()?;

        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn list_locations(&self) -> EventResult<Vec<Location>> {
        let store = self.store.read().await;
        Ok(store.locations.values().cloned().collect())
    }

    async fn list_tags(&self) -> EventResult<Vec<Tag>> {
        let store = self.store.read().await;
        Ok(store.tags.values().cloned().collect())
    }

    async fn list_parties(&self) -> EventResult<Vec<String>> {
        Ok(self.store.read().await.parties(false))
    }

    async fn list_public_parties(&self) -> EventResult<Vec<String>> {
        Ok(self.store.read().await.parties(true))
    }

    async fn insert_location(&self, data: LocationData) -> EventResult<Location> {
        let mut store = self.store.write().await;
        let id = next_id(&mut store.next_location_id);

        let location = Location {
            id,
            name: data.name,
            description: data.description,
            url: data.url,
        };
        store.locations.insert(id, location.clone());

        tracing::debug!(location_id = id, "Inserted location");
        Ok(location)
    }

    async fn update_location(&self, id: i64, data: LocationData) -> EventResult<Location> {
        let mut store = self.store.write().await;
        let location = store
            .locations
            .get_mut(&id)
            .ok_or(EventError::NotFound {
                kind: "location",
                id,
            })?;

        location.name = data.name;
        location.description = data.description;
        location.url = data.url;

        tracing::debug!(location_id = id, "Updated location");
        Ok(location.clone())
    }

    async fn delete_location(&self, id: i64) -> EventResult<bool> {
        let mut store = self.store.write().await;

        if store.events.values().any(|data| data.location_id == id) {
            return Err(EventError::Database(format!(
                "location {} is still referenced by events",
                id
            )));
        }

        Ok(store.locations.remove(&id).is_some())
    }

    async fn insert_tag(&self, data: TagData) -> EventResult<Tag> {
        let mut store = self.store.write().await;
        let id = next_id(&mut store.next_tag_id);

        let tag = Tag {
            id,
            name: data.name,
        };
        store.tags.insert(id, tag.clone());

        tracing::debug!(tag_id = id, "Inserted tag");
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, data: TagData) -> EventResult<Tag> {
        let mut store = self.store.write().await;
        let tag = store
            .tags
            .get_mut(&id)
            .ok_or(EventError::NotFound { kind: "tag", id })?;

        tag.name = data.name;
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: i64) -> EventResult<bool> {
        let mut store = self.store.write().await;

        if store.tags.remove(&id).is_none() {
            return Ok(false);
        }

        // Cascade to the links, as the join table does.
        for data in store.events.values_mut() {
            data.tag_ids.retain(|tag_id| *tag_id != id);
        }
        Ok(true)
    }

    async fn insert_event(&self, data: EventData) -> EventResult<Event> {
        let mut store = self.store.write().await;
        store.check_references(&data)?;

        let id = next_id(&mut store.next_event_id);
        let event = store.resolve(id, &data)?;
        store.events.insert(id, data);

        tracing::debug!(event_id = id, "Inserted event");
        Ok(event)
    }

    async fn update_event(&self, id: i64, data: EventData) -> EventResult<Event> {
        let mut store = self.store.write().await;

        if !store.events.contains_key(&id) {
            return Err(EventError::NotFound { kind: "event", id });
        }
        store.check_references(&data)?;

        let event = store.resolve(id, &data)?;
        store.events.insert(id, data);

        tracing::debug!(event_id = id, "Updated event");
        Ok(event)
    }

    async fn delete_event(&self, id: i64) -> EventResult<bool> {
        let mut store = self.store.write().await;
        Ok(store.events.remove(&id).is_some())
    }

    async fn count_events_at_location(&self, location_id: i64) -> EventResult<u64> {
        let store = self.store.read().await;
        let count = store
            .events
            .values()
            .filter(|data| data.location_id == location_id)
            .count();
        Ok(count as u64)
    }
}
