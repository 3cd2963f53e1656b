//! Table bootstrap
//!
//! Creates every table and index derived from the entity definitions.
//! Statements use `IF NOT EXISTS`, so running this against an existing
//! database is a no-op. Schema evolution is handled outside the service.

use super::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::info;

/// Create all tables and indexes
pub async fn create_all<C: ConnectionTrait>(db: &C) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve
    create_table(db, &schema, UserEntity).await?;
    create_table(db, &schema, FieldEntity).await?;
    create_table(db, &schema, ParticipantEntity).await?;
    create_table(db, &schema, TagCategoryEntity).await?;
    create_table(db, &schema, TagEntity).await?;
    create_table(db, &schema, RecordEntity).await?;
    create_table(db, &schema, RecordImageEntity).await?;
    create_table(db, &schema, RecordParticipantEntity).await?;
    create_table(db, &schema, RecordTagEntity).await?;

    for index in indexes() {
        db.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // A tag name is unique within its category
        Index::create()
            .name("uq_tags_category_name")
            .table(TagEntity)
            .col(TagColumn::CategoryId)
            .col(TagColumn::Name)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_records_created_by")
            .table(RecordEntity)
            .col(RecordColumn::CreatedBy)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_records_record_date")
            .table(RecordEntity)
            .col(RecordColumn::RecordDate)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_record_images_record_id")
            .table(RecordImageEntity)
            .col(RecordImageColumn::RecordId)
            .if_not_exists()
            .to_owned(),
    ]
}
