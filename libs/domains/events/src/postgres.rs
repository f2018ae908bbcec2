use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::HashMap;

use crate::{
    entity::{event_tags, events, locations, tags},
    error::{EventError, EventResult},
    models::{Event, EventData, Location, LocationData, Tag, TagData},
    repository::EventRepository,
};

pub struct PgEventRepository {
    db: DatabaseConnection,
}

impl PgEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attach tags to event rows already joined with their location.
    async fn assemble<C: ConnectionTrait>(
        conn: &C,
        rows: Vec<(events::Model, Option<locations::Model>)>,
    ) -> EventResult<Vec<Event>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|(event, _)| event.id).collect();
        let links = event_tags::Entity::find()
            .filter(event_tags::Column::EventId.is_in(ids))
            .order_by_asc(event_tags::Column::TagId)
            .find_also_related(tags::Entity)
            .all(conn)
            .await?;

        let mut tags_by_event: HashMap<i64, Vec<Tag>> = HashMap::new();
        for (link, tag) in links {
            if let Some(tag) = tag {
                tags_by_event
                    .entry(link.event_id)
                    .or_default()
                    .push(tag.into());
            }
        }

        rows.into_iter()
            .map(|(event, location)| {
                let location = location.ok_or_else(|| {
                    EventError::Internal(format!("event {} has no location", event.id))
                })?;
                let tags = tags_by_event.remove(&event.id).unwrap_or_default();
                Ok(event.into_event(location.into(), tags))
            })
            .collect()
    }

    async fn load_event<C: ConnectionTrait>(conn: &C, id: i64) -> EventResult<Option<Event>> {
        let row = events::Entity::find_by_id(id)
            .find_also_related(locations::Entity)
            .one(conn)
            .await?;

        match row {
            Some(row) => Ok(Self::assemble(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn link_tags<C: ConnectionTrait>(conn: &C, event_id: i64, tag_ids: &[i64]) -> EventResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let links = tag_ids
            .iter()
            .map(|tag_id| event_tags::ActiveModel::link(event_id, *tag_id));
        event_tags::Entity::insert_many(links)
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    async fn parties(&self, public_only: bool) -> EventResult<Vec<String>> {
        let mut query = events::Entity::find()
            .select_only()
            .column(events::Column::Party)
            .distinct();

        if public_only {
            query = query.filter(events::Column::Public.eq(true));
        }

        let parties = query
            .order_by_asc(events::Column::Party)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;

        Ok(parties)
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn get_event(&self, id: i64) -> EventResult<Option<Event>> {
        Self::load_event(&self.db, id).await
    }

    async fn get_location(&self, id: i64) -> EventResult<Option<Location>> {
        let model = locations::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_tag(&self, id: i64) -> EventResult<Option<Tag>> {
        let model = tags::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_events(&self, party: &str) -> EventResult<Vec<Event>> {
        let rows = events::Entity::find()
            .filter(events::Column::Party.eq(party))
            .order_by_asc(events::Column::StartTime)
            .order_by_asc(events::Column::Id)
            .find_also_related(locations::Entity)
            .all(&self.db)
            .await?;

        Self::assemble(&self.db, rows).await
    }

    async fn list_locations(&self) -> EventResult<Vec<Location>> {
        let models = locations::Entity::find()
            .order_by_asc(locations::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_tags(&self) -> EventResult<Vec<Tag>> {
        let models = tags::Entity::find()
            .order_by_asc(tags::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_parties(&self) -> EventResult<Vec<String>> {
        self.parties(false).await
    }

    async fn list_public_parties(&self) -> EventResult<Vec<String>> {
        self.parties(true).await
    }

    async fn insert_location(&self, data: LocationData) -> EventResult<Location> {
        let active: locations::ActiveModel = data.into();
        let model = active.insert(&self.db).await?;

        tracing::info!(location_id = model.id, "Created location");
        Ok(model.into())
    }

    async fn update_location(&self, id: i64, data: LocationData) -> EventResult<Location> {
        if locations::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(EventError::NotFound {
                kind: "location",
                id,
            });
        }

        let mut active: locations::ActiveModel = data.into();
        active.id = Set(id);
        let model = active.update(&self.db).await?;

        tracing::info!(location_id = id, "Updated location");
        Ok(model.into())
    }

    async fn delete_location(&self, id: i64) -> EventResult<bool> {
        let result = locations::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_tag(&self, data: TagData) -> EventResult<Tag> {
        let active: tags::ActiveModel = data.into();
        let model = active.insert(&self.db).await?;

        tracing::info!(tag_id = model.id, "Created tag");
        Ok(model.into())
    }

    async fn update_tag(&self, id: i64, data: TagData) -> EventResult<Tag> {
        if tags::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(EventError::NotFound { kind: "tag", id });
        }

        let mut active: tags::ActiveModel = data.into();
        active.id = Set(id);
        let model = active.update(&self.db).await?;
        Ok(model.into())
    }

    async fn delete_tag(&self, id: i64) -> EventResult<bool> {
        // event_tags rows go with it (ON DELETE CASCADE)
        let result = tags::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_event(&self, data: EventData) -> EventResult<Event> {
        let txn = self.db.begin().await?;

        let active: events::ActiveModel = (&data).into();
        let model = active.insert(&txn).await?;
        Self::link_tags(&txn, model.id, &data.tag_ids).await?;

        let event = Self::load_event(&txn, model.id).await?;
        txn.commit().await?;

        tracing::info!(event_id = model.id, party = %data.party, "Created event");
        event.ok_or_else(|| EventError::Internal(format!("event {} vanished after insert", model.id)))
    }

    async fn update_event(&self, id: i64, data: EventData) -> EventResult<Event> {
        let txn = self.db.begin().await?;

        if events::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(EventError::NotFound { kind: "event", id });
        }

        let mut active: events::ActiveModel = (&data).into();
        active.id = Set(id);
        active.update(&txn).await?;

        event_tags::Entity::delete_many()
            .filter(event_tags::Column::EventId.eq(id))
            .exec(&txn)
            .await?;
        Self::link_tags(&txn, id, &data.tag_ids).await?;

        let event = Self::load_event(&txn, id).await?;
        txn.commit().await?;

        tracing::info!(event_id = id, party = %data.party, "Updated event");
        event.ok_or_else(|| EventError::Internal(format!("event {} vanished after update", id)))
    }

    async fn delete_event(&self, id: i64) -> EventResult<bool> {
        let result = events::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn count_events_at_location(&self, location_id: i64) -> EventResult<u64> {
        let count = events::Entity::find()
            .filter(events::Column::LocationId.eq(location_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
