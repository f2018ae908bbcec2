use observability::schedule::{self, ScheduleMetrics};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{EventError, EventResult};
use crate::models::{Event, EventData, Location, MergeEvent, MergeLocation, MergeTag, Tag};
use crate::repository::EventRepository;

/// What a merge will do, decided from the submitted id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Insert,
    Update(i64),
}

/// Outcome of a merge together with the persisted entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merged<T> {
    Created(T),
    Updated(T),
}

impl<T> Merged<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Merged::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Merged::Created(value) | Merged::Updated(value) => value,
        }
    }
}

/// Service layer for the party schedule
pub struct EventService<R: EventRepository> {
    repository: Arc<R>,
}

impl<R: EventRepository> Clone for EventService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: EventRepository> EventService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    // ===== Reads =====

    pub async fn find_event(&self, id: i64) -> EventResult<Option<Event>> {
        self.repository.get_event(id).await
    }

    /// All events of a party, public and non-public
    #[instrument(skip(self))]
    pub async fn list_party_events(&self, party: &str) -> EventResult<Vec<Event>> {
        self.repository.list_events(party).await
    }

    pub async fn list_locations(&self) -> EventResult<Vec<Location>> {
        self.repository.list_locations().await
    }

    pub async fn list_tags(&self) -> EventResult<Vec<Tag>> {
        self.repository.list_tags().await
    }

    pub async fn list_parties(&self) -> EventResult<Vec<String>> {
        self.repository.list_parties().await
    }

    pub async fn list_public_parties(&self) -> EventResult<Vec<String>> {
        self.repository.list_public_parties().await
    }

    #[instrument(skip(self))]
    pub async fn list_public_events(&self, party: &str) -> EventResult<Vec<Event>> {
        let events = self.repository.list_events(party).await?;
        Ok(events.into_iter().filter(|event| event.public).collect())
    }

    /// Public events of a party carrying every one of `tag_names`
    #[instrument(skip(self))]
    pub async fn list_public_events_with_tags(
        &self,
        party: &str,
        tag_names: &[String],
    ) -> EventResult<Vec<Event>> {
        let events = self.list_public_events(party).await?;
        Ok(events
            .into_iter()
            .filter(|event| tag_names.iter().all(|name| event.has_tag(name)))
            .collect())
    }

    // ===== Merges =====

    async fn location_upsert(&self, id: Option<i64>) -> EventResult<Upsert> {
        match id {
            Some(id) if self.repository.get_location(id).await?.is_some() => Ok(Upsert::Update(id)),
            _ => Ok(Upsert::Insert),
        }
    }

    async fn tag_upsert(&self, id: Option<i64>) -> EventResult<Upsert> {
        match id {
            Some(id) if self.repository.get_tag(id).await?.is_some() => Ok(Upsert::Update(id)),
            _ => Ok(Upsert::Insert),
        }
    }

    async fn event_upsert(&self, id: Option<i64>) -> EventResult<Upsert> {
        match id {
            Some(id) if self.repository.get_event(id).await?.is_some() => Ok(Upsert::Update(id)),
            _ => Ok(Upsert::Insert),
        }
    }

    /// Insert or update a location; an unknown id inserts with a fresh id.
    #[instrument(skip(self, input), fields(location_id = ?input.id))]
    pub async fn merge_location(&self, input: MergeLocation) -> EventResult<Merged<Location>> {
        input.validate()?;

        let merged = match self.location_upsert(input.id).await? {
            Upsert::Insert => Merged::Created(self.repository.insert_location(input.data()).await?),
            Upsert::Update(id) => {
                Merged::Updated(self.repository.update_location(id, input.data()).await?)
            }
        };

        ScheduleMetrics::record_merge(schedule::LOCATION, merged.is_created());
        Ok(merged)
    }

    #[instrument(skip(self, input), fields(tag_id = ?input.id))]
    pub async fn merge_tag(&self, input: MergeTag) -> EventResult<Merged<Tag>> {
        input.validate()?;

        let merged = match self.tag_upsert(input.id).await? {
            Upsert::Insert => Merged::Created(self.repository.insert_tag(input.data()).await?),
            Upsert::Update(id) => Merged::Updated(self.repository.update_tag(id, input.data()).await?),
        };

        ScheduleMetrics::record_merge(schedule::TAG, merged.is_created());
        Ok(merged)
    }

    /// Resolve an embedded location reference.
    ///
    /// A resolving id yields the stored location untouched; otherwise the
    /// supplied fields create a new one.
    pub async fn reconcile_location(&self, reference: &MergeLocation) -> EventResult<Location> {
        let stored = self.stored_location(reference).await?;
        self.finish_location(reference, stored).await
    }

    /// Resolve embedded tag references, collapsing duplicates.
    ///
    /// New tags with the same name in one list are created once. The result
    /// is ordered by tag id.
    pub async fn reconcile_tags(&self, references: &[MergeTag]) -> EventResult<Vec<Tag>> {
        let stored = self.stored_tags(references).await?;
        self.finish_tags(references, stored).await
    }

    /// Look up a location reference without writing. `None` means the
    /// reference will create a location and has passed validation.
    async fn stored_location(&self, reference: &MergeLocation) -> EventResult<Option<Location>> {
        if let Some(id) = reference.id {
            if let Some(location) = self.repository.get_location(id).await? {
                return Ok(Some(location));
            }
        }

        reference.validate()?;
        Ok(None)
    }

    async fn finish_location(
        &self,
        reference: &MergeLocation,
        stored: Option<Location>,
    ) -> EventResult<Location> {
        if let Some(location) = stored {
            return Ok(location);
        }

        let location = self.repository.insert_location(reference.data()).await?;
        ScheduleMetrics::record_merge(schedule::LOCATION, true);

        tracing::debug!(location_id = location.id, "Created location from reference");
        Ok(location)
    }

    /// Same as [`Self::stored_location`], one entry per reference.
    async fn stored_tags(&self, references: &[MergeTag]) -> EventResult<Vec<Option<Tag>>> {
        let mut stored = Vec::with_capacity(references.len());

        for reference in references {
            let tag = match reference.id {
                Some(id) => self.repository.get_tag(id).await?,
                None => None,
            };
            if tag.is_none() {
                reference.validate()?;
            }
            stored.push(tag);
        }

        Ok(stored)
    }

    async fn finish_tags(
        &self,
        references: &[MergeTag],
        stored: Vec<Option<Tag>>,
    ) -> EventResult<Vec<Tag>> {
        let mut resolved: BTreeMap<i64, Tag> = BTreeMap::new();
        let mut created: HashMap<String, i64> = HashMap::new();

        for (reference, tag) in references.iter().zip(stored) {
            if let Some(tag) = tag {
                resolved.insert(tag.id, tag);
                continue;
            }

            if created.contains_key(&reference.name) {
                continue;
            }

            let tag = self.repository.insert_tag(reference.data()).await?;
            ScheduleMetrics::record_merge(schedule::TAG, true);

            created.insert(tag.name.clone(), tag.id);
            resolved.insert(tag.id, tag);
        }

        Ok(resolved.into_values().collect())
    }

    /// Insert or update an event after reconciling its location and tags.
    ///
    /// Every reference is resolved and validated before the first write, so
    /// a rejected event leaves no new locations or tags behind.
    #[instrument(skip(self, input), fields(event_id = ?input.id, party = %input.party))]
    pub async fn merge_event(&self, input: MergeEvent) -> EventResult<Merged<Event>> {
        input.validate()?;

        let upsert = self.event_upsert(input.id).await?;
        let stored_location = self.stored_location(&input.location).await?;
        let stored_tags = self.stored_tags(&input.tags).await?;

        let location = self.finish_location(&input.location, stored_location).await?;
        let tags = self.finish_tags(&input.tags, stored_tags).await?;

        let data = EventData {
            name: input.name,
            description: input.description,
            party: input.party,
            public: input.public,
            start_time: input.start_time,
            end_time: input.end_time,
            location_id: location.id,
            tag_ids: tags.iter().map(|tag| tag.id).collect(),
        };

        let merged = match upsert {
            Upsert::Insert => Merged::Created(self.repository.insert_event(data).await?),
            Upsert::Update(id) => Merged::Updated(self.repository.update_event(id, data).await?),
        };

        ScheduleMetrics::record_merge(schedule::EVENT, merged.is_created());
        Ok(merged)
    }

    // ===== Deletes =====

    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: i64) -> EventResult<()> {
        if self.repository.get_event(id).await?.is_none() {
            return Err(EventError::DeleteMissing { kind: "event", id });
        }

        self.repository.delete_event(id).await?;
        ScheduleMetrics::record_delete(schedule::EVENT);
        Ok(())
    }

    /// Fails with `Conflict` while events still take place there.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: i64) -> EventResult<()> {
        if self.repository.get_location(id).await?.is_none() {
            return Err(EventError::DeleteMissing {
                kind: "location",
                id,
            });
        }

        let in_use = self.repository.count_events_at_location(id).await?;
        if in_use > 0 {
            return Err(EventError::Conflict(format!(
                "Location {} is still used by {} event(s)",
                id, in_use
            )));
        }

        self.repository.delete_location(id).await?;
        ScheduleMetrics::record_delete(schedule::LOCATION);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_tag(&self, id: i64) -> EventResult<()> {
        if self.repository.get_tag(id).await?.is_none() {
            return Err(EventError::DeleteMissing { kind: "tag", id });
        }

        self.repository.delete_tag(id).await?;
        ScheduleMetrics::record_delete(schedule::TAG);
        Ok(())
    }
}
