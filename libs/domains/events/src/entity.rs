use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

// ===== Locations Entity =====

pub mod locations {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "locations")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        #[sea_orm(column_type = "Text")]
        pub url: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::events::Entity")]
        Events,
    }

    impl Related<super::events::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Events.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Location {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
                description: model.description,
                url: model.url,
            }
        }
    }

    impl From<crate::models::LocationData> for ActiveModel {
        fn from(data: crate::models::LocationData) -> Self {
            ActiveModel {
                name: Set(data.name),
                description: Set(data.description),
                url: Set(data.url),
                ..Default::default()
            }
        }
    }
}

// ===== Tags Entity =====

pub mod tags {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "tags")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::event_tags::Entity")]
        EventTags,
    }

    impl Related<super::event_tags::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::EventTags.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Tag {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
            }
        }
    }

    impl From<crate::models::TagData> for ActiveModel {
        fn from(data: crate::models::TagData) -> Self {
            ActiveModel {
                name: Set(data.name),
                ..Default::default()
            }
        }
    }
}

// ===== Events Entity =====

pub mod events {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "events")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        #[sea_orm(column_type = "String(StringLen::N(255))")]
        pub party: String,
        pub public: bool,
        pub start_time: DateTimeWithTimeZone,
        pub end_time: DateTimeWithTimeZone,
        pub location_id: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::locations::Entity",
            from = "Column::LocationId",
            to = "super::locations::Column::Id"
        )]
        Location,
        #[sea_orm(has_many = "super::event_tags::Entity")]
        EventTags,
    }

    impl Related<super::locations::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Location.def()
        }
    }

    impl Related<super::event_tags::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::EventTags.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl Model {
        /// Assemble the domain event from its row and resolved references
        pub fn into_event(
            self,
            location: crate::models::Location,
            tags: Vec<crate::models::Tag>,
        ) -> crate::models::Event {
            crate::models::Event {
                id: self.id,
                name: self.name,
                description: self.description,
                party: self.party,
                public: self.public,
                start_time: self.start_time.into(),
                end_time: self.end_time.into(),
                location,
                tags,
            }
        }
    }

    impl From<&crate::models::EventData> for ActiveModel {
        fn from(data: &crate::models::EventData) -> Self {
            ActiveModel {
                name: Set(data.name.clone()),
                description: Set(data.description.clone()),
                party: Set(data.party.clone()),
                public: Set(data.public),
                start_time: Set(data.start_time.into()),
                end_time: Set(data.end_time.into()),
                location_id: Set(data.location_id),
                ..Default::default()
            }
        }
    }
}

// ===== Event Tags Join Entity =====

pub mod event_tags {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "event_tags")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub event_id: i64,
        #[sea_orm(primary_key, auto_increment = false)]
        pub tag_id: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::events::Entity",
            from = "Column::EventId",
            to = "super::events::Column::Id",
            on_delete = "Cascade"
        )]
        Event,
        #[sea_orm(
            belongs_to = "super::tags::Entity",
            from = "Column::TagId",
            to = "super::tags::Column::Id",
            on_delete = "Cascade"
        )]
        Tag,
    }

    impl Related<super::events::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Event.def()
        }
    }

    impl Related<super::tags::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Tag.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl ActiveModel {
        pub fn link(event_id: i64, tag_id: i64) -> Self {
            ActiveModel {
                event_id: Set(event_id),
                tag_id: Set(tag_id),
            }
        }
    }
}
