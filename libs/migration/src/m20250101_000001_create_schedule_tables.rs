use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(big_id(Locations::Id))
                    .col(string(Locations::Name))
                    .col(text(Locations::Description).default(""))
                    .col(string(Locations::Url).default(""))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(big_id(Tags::Id))
                    .col(string(Tags::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(big_id(Events::Id))
                    .col(string(Events::Name))
                    .col(text(Events::Description).default(""))
                    .col(string(Events::Party))
                    .col(boolean(Events::Public).default(true))
                    .col(timestamp_with_time_zone(Events::StartTime))
                    .col(timestamp_with_time_zone(Events::EndTime))
                    .col(big_integer(Events::LocationId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_location_id")
                            .from(Events::Table, Events::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_party")
                    .table(Events::Table)
                    .col(Events::Party)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_location_id")
                    .table(Events::Table)
                    .col(Events::LocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventTags::Table)
                    .if_not_exists()
                    .col(big_integer(EventTags::EventId))
                    .col(big_integer(EventTags::TagId))
                    .primary_key(
                        Index::create()
                            .col(EventTags::EventId)
                            .col(EventTags::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_tags_event_id")
                            .from(EventTags::Table, EventTags::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_tags_tag_id")
                            .from(EventTags::Table, EventTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_tags_tag_id")
                    .table(EventTags::Table)
                    .col(EventTags::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventTags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;

        Ok(())
    }
}

/// `BIGSERIAL PRIMARY KEY`
fn big_id<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Id,
    Name,
    Description,
    Url,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Name,
    Description,
    Party,
    Public,
    StartTime,
    EndTime,
    LocationId,
}

#[derive(DeriveIden)]
enum EventTags {
    Table,
    EventId,
    TagId,
}
