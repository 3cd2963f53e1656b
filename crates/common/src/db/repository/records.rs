//! Record operations

use super::Repository;
use crate::access::Visibility;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::records::pagination::{paginate, Page, PageWindow};
use crate::records::{associations, RecordContent, RecordDetail, RecordFilter, RecordInput, RecordPatch};
use crate::storage::{record_dir, BlobStore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Metadata of an image file already written to blob storage
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecordImage {
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
}

impl Repository {
    /// Filtered, visibility-scoped page of records with associations
    pub async fn list_records(
        &self,
        principal: &Principal,
        filter: &RecordFilter,
        window: PageWindow,
    ) -> Result<Page<RecordDetail>> {
        let visibility = Visibility::scope(principal);
        let conn = self.read_conn();

        let mut page = paginate(filter.select(visibility), conn, window).await?;
        let records = std::mem::take(&mut page.items);
        let loaded = associations::load_for_records(conn, &records).await?;

        Ok(page.with_items(RecordDetail::assemble(records, loaded)))
    }

    /// Every visible record matching `filter`, fully loaded, in list order
    pub async fn export_records(&self, principal: &Principal, filter: &RecordFilter) -> Result<Vec<RecordDetail>> {
        let visibility = Visibility::scope(principal);
        let conn = self.read_conn();

        let records = filter.select(visibility).all(conn).await?;
        let loaded = associations::load_for_records(conn, &records).await?;

        Ok(RecordDetail::assemble(records, loaded))
    }

    /// Record by id; another user's record is a permission error
    pub async fn get_record(&self, principal: &Principal, id: i32) -> Result<RecordDetail> {
        let conn = self.read_conn();
        let record = find_visible(conn, principal, id).await?;
        load_detail(conn, record).await
    }

    pub async fn create_record(&self, principal: &Principal, input: RecordInput) -> Result<RecordDetail> {
        input.validate()?;
        RecordContent::parse(input.kind, &input.content)?;

        let visibility = Visibility::scope(principal);
        let txn = self.begin().await?;

        if let Some(field_id) = input.field_id {
            ensure_field_visible(&txn, visibility, field_id).await?;
        }

        let now = chrono::Utc::now();
        let record = RecordActiveModel {
            title: Set(input.title),
            kind: Set(input.kind),
            record_date: Set(input.record_date),
            time_range: Set(input.time_range),
            duration: Set(input.duration),
            field_id: Set(input.field_id),
            specific_location: Set(input.specific_location),
            content: Set(input.content),
            status: Set(input.status),
            version: Set(1),
            created_by: Set(principal.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let participants =
            associations::replace_participants(&txn, visibility, record.id, &input.participant_ids).await?;
        let tags = associations::replace_tags(&txn, record.id, &input.tag_ids).await?;
        let field = match record.field_id {
            Some(field_id) => FieldEntity::find_by_id(field_id).one(&txn).await?,
            None => None,
        };

        txn.commit().await?;

        info!(
            record_id = record.id,
            user_id = principal.user_id,
            kind = record.kind.as_str(),
            participants = participants.len(),
            tags = tags.len(),
            "Record created"
        );

        Ok(RecordDetail {
            record,
            field,
            participants,
            tags,
        })
    }

    /// Partial update. When `patch.version` is given it must match the
    /// stored version. Association sets are replaced only when supplied.
    pub async fn update_record(&self, principal: &Principal, id: i32, patch: RecordPatch) -> Result<RecordDetail> {
        patch.check()?;

        let visibility = Visibility::scope(principal);
        let txn = self.begin().await?;
        let current = find_visible(&txn, principal, id).await?;

        if let Some(expected) = patch.version {
            if expected != current.version {
                return Err(AppError::VersionConflict {
                    id,
                    expected,
                    actual: current.version,
                });
            }
        }

        if patch.kind.is_some() || patch.content.is_some() {
            let kind = patch.kind.unwrap_or(current.kind);
            let content = patch.content.as_ref().unwrap_or(&current.content);
            RecordContent::parse(kind, content)?;
        }

        if let Some(Some(field_id)) = patch.field_id {
            ensure_field_visible(&txn, visibility, field_id).await?;
        }

        let mut active: RecordActiveModel = current.clone().into();
        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(kind) = patch.kind {
            active.kind = Set(kind);
        }
        if let Some(record_date) = patch.record_date {
            active.record_date = Set(record_date);
        }
        if let Some(time_range) = patch.time_range {
            active.time_range = Set(time_range);
        }
        if let Some(duration) = patch.duration {
            active.duration = Set(duration);
        }
        if let Some(field_id) = patch.field_id {
            active.field_id = Set(field_id);
        }
        if let Some(specific_location) = patch.specific_location {
            active.specific_location = Set(specific_location);
        }
        if let Some(content) = patch.content {
            active.content = Set(content);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        active.version = Set(current.version + 1);
        active.updated_at = Set(chrono::Utc::now());

        // Guard on the version we read so a concurrent writer cannot be
        // silently overwritten
        let result = RecordEntity::update_many()
            .set(active)
            .filter(RecordColumn::Id.eq(id))
            .filter(RecordColumn::Version.eq(current.version))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            let actual = RecordEntity::find_by_id(id)
                .one(&txn)
                .await?
                .map(|r| r.version)
                .unwrap_or(current.version);
            return Err(AppError::VersionConflict {
                id,
                expected: current.version,
                actual,
            });
        }

        if let Some(ref ids) = patch.participant_ids {
            associations::replace_participants(&txn, visibility, id, ids).await?;
        }
        if let Some(ref ids) = patch.tag_ids {
            associations::replace_tags(&txn, id, ids).await?;
        }

        let record = RecordEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::RecordNotFound { id })?;
        let detail = load_detail(&txn, record).await?;

        txn.commit().await?;

        info!(
            record_id = id,
            user_id = principal.user_id,
            version = detail.record.version,
            "Record updated"
        );

        Ok(detail)
    }

    /// Delete a record with its images, associations and image files.
    ///
    /// The per-record upload directory is removed when it ends up empty.
    pub async fn delete_record(&self, principal: &Principal, id: i32, blobs: &dyn BlobStore) -> Result<()> {
        let txn = self.begin().await?;
        let record = find_visible(&txn, principal, id).await?;

        let images = RecordImageEntity::find()
            .filter(RecordImageColumn::RecordId.eq(id))
            .all(&txn)
            .await?;

        RecordImageEntity::delete_many()
            .filter(RecordImageColumn::RecordId.eq(id))
            .exec(&txn)
            .await?;
        RecordParticipantEntity::delete_many()
            .filter(RecordParticipantColumn::RecordId.eq(id))
            .exec(&txn)
            .await?;
        RecordTagEntity::delete_many()
            .filter(RecordTagColumn::RecordId.eq(id))
            .exec(&txn)
            .await?;
        RecordEntity::delete_by_id(record.id).exec(&txn).await?;

        for image in &images {
            blobs.delete(&image.file_path).await?;
            if let Some(ref thumbnail) = image.thumbnail_path {
                blobs.delete(thumbnail).await?;
            }
        }
        blobs.remove_dir_if_empty(&record_dir(id)).await?;

        txn.commit().await?;

        info!(
            record_id = id,
            user_id = principal.user_id,
            images = images.len(),
            "Record deleted"
        );
        Ok(())
    }

    /// Images of a visible record, in display order
    pub async fn list_record_images(&self, principal: &Principal, record_id: i32) -> Result<Vec<RecordImage>> {
        let conn = self.read_conn();
        find_visible(conn, principal, record_id).await?;

        RecordImageEntity::find()
            .filter(RecordImageColumn::RecordId.eq(record_id))
            .order_by_asc(RecordImageColumn::SortOrder)
            .order_by_asc(RecordImageColumn::CreatedAt)
            .order_by_asc(RecordImageColumn::Id)
            .all(conn)
            .await
            .map_err(Into::into)
    }

    /// Register a stored image file against a record; appended last
    pub async fn add_record_image(
        &self,
        principal: &Principal,
        record_id: i32,
        image: NewRecordImage,
    ) -> Result<RecordImage> {
        let txn = self.begin().await?;
        find_visible(&txn, principal, record_id).await?;

        let position = RecordImageEntity::find()
            .filter(RecordImageColumn::RecordId.eq(record_id))
            .count(&txn)
            .await?;

        let saved = RecordImageActiveModel {
            record_id: Set(record_id),
            filename: Set(image.filename),
            original_filename: Set(image.original_filename),
            file_path: Set(image.file_path),
            thumbnail_path: Set(image.thumbnail_path),
            file_size: Set(image.file_size),
            mime_type: Set(image.mime_type),
            description: Set(image.description),
            sort_order: Set(position as i32),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(saved)
    }

    pub async fn get_record_image(&self, principal: &Principal, record_id: i32, image_id: i32) -> Result<RecordImage> {
        let conn = self.read_conn();
        find_visible(conn, principal, record_id).await?;

        RecordImageEntity::find_by_id(image_id)
            .filter(RecordImageColumn::RecordId.eq(record_id))
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("image", image_id))
    }
}

/// Load by id, then check ownership
async fn find_visible<C: ConnectionTrait>(conn: &C, principal: &Principal, id: i32) -> Result<Record> {
    let record = RecordEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::RecordNotFound { id })?;
    Visibility::scope(principal).ensure::<RecordEntity>(&record)?;
    Ok(record)
}

async fn load_detail<C: ConnectionTrait>(conn: &C, record: Record) -> Result<RecordDetail> {
    let loaded = associations::load_for_records(conn, std::slice::from_ref(&record)).await?;
    let mut details = RecordDetail::assemble(vec![record], loaded);
    details.pop().ok_or_else(|| AppError::Internal {
        message: "record detail assembly produced no rows".to_string(),
    })
}

/// A record may only point at a field its author can see
async fn ensure_field_visible<C: ConnectionTrait>(conn: &C, visibility: Visibility, field_id: i32) -> Result<()> {
    let field = FieldEntity::find_by_id(field_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::invalid_field("field_id", format!("Field {} does not exist", field_id)))?;
    visibility.ensure::<FieldEntity>(&field)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::records::{PageParams, RecordFilterParams};
    use crate::storage::LocalBlobStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn input(title: &str, kind: RecordType, day: u32) -> RecordInput {
        serde_json::from_value(json!({
            "title": title,
            "type": kind,
            "record_date": Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
        }))
        .unwrap()
    }

    async fn participant(repo: &Repository, who: &Principal, name: &str) -> Participant {
        repo.create_participant(who, serde_json::from_value(json!({"name_or_code": name})).unwrap())
            .await
            .unwrap()
    }

    fn window(skip: i64, limit: i64) -> PageWindow {
        PageParams { skip, limit }.window().unwrap()
    }

    #[tokio::test]
    async fn test_visibility_isolates_researchers() {
        let repo = repo().await;
        let mine = repo.create_record(&ALICE, input("Mine", RecordType::FieldNote, 1)).await.unwrap();
        repo.create_record(&BOB, input("Theirs", RecordType::FieldNote, 2)).await.unwrap();

        let page = repo.list_records(&ALICE, &RecordFilter::default(), window(0, 100)).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.iter().all(|d| d.record.created_by == ALICE.user_id));

        let page = repo.list_records(&ADMIN, &RecordFilter::default(), window(0, 100)).await.unwrap();
        assert_eq!(page.total, 2);

        // Detail lookups of someone else's record are forbidden, not hidden
        let err = repo.get_record(&BOB, mine.record.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        assert!(repo.get_record(&ADMIN, mine.record.id).await.is_ok());

        let err = repo.get_record(&ALICE, 999).await.unwrap_err();
        assert!(matches!(err, AppError::RecordNotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_pagination_total_and_order() {
        let repo = repo().await;
        for day in [3, 1, 5, 2, 4] {
            repo.create_record(&ALICE, input(&format!("Day {}", day), RecordType::Observation, day))
                .await
                .unwrap();
        }

        let page = repo.list_records(&ALICE, &RecordFilter::default(), window(1, 2)).await.unwrap();
        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.items.iter().map(|d| d.record.title.as_str()).collect();
        assert_eq!(titles, vec!["Day 4", "Day 3"]);

        let page = repo.list_records(&ALICE, &RecordFilter::default(), window(10, 2)).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);

        let all = repo.list_records(&ALICE, &RecordFilter::default(), window(0, 100)).await.unwrap();
        let dates: Vec<_> = all.items.iter().map(|d| d.record.record_date).collect();
        assert!(dates.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_association_filters_do_not_duplicate() {
        let repo = repo().await;
        let p1 = participant(&repo, &ALICE, "P1").await;
        let p2 = participant(&repo, &ALICE, "P2").await;

        let mut both = input("Both", RecordType::Interview, 1);
        both.participant_ids = vec![p1.id, p2.id];
        repo.create_record(&ALICE, both).await.unwrap();

        let mut one = input("One", RecordType::Interview, 2);
        one.participant_ids = vec![p2.id];
        repo.create_record(&ALICE, one).await.unwrap();

        repo.create_record(&ALICE, input("None", RecordType::Interview, 3)).await.unwrap();

        let filter = RecordFilter::from_params(RecordFilterParams {
            participant_ids: Some(format!("{},{}", p1.id, p2.id)),
            ..Default::default()
        })
        .unwrap();
        let page = repo.list_records(&ALICE, &filter, window(0, 100)).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        let ids: HashSet<_> = page.items.iter().map(|d| d.record.id).collect();
        assert_eq!(ids.len(), 2);

        // A malformed list is ignored rather than rejected
        let filter = RecordFilter::from_params(RecordFilterParams {
            participant_ids: Some("1,oops".into()),
            ..Default::default()
        })
        .unwrap();
        let page = repo.list_records(&ALICE, &filter, window(0, 100)).await.unwrap();
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_replace_semantics_and_unknown_ids() {
        let repo = repo().await;
        let a = participant(&repo, &ALICE, "A").await;
        let b = participant(&repo, &ALICE, "B").await;
        let c = participant(&repo, &ALICE, "C").await;

        let mut rec = input("Walk", RecordType::FieldNote, 1);
        rec.participant_ids = vec![a.id, b.id, 4242];
        let created = repo.create_record(&ALICE, rec).await.unwrap();
        let names: Vec<_> = created.participants.iter().map(|p| p.name_or_code.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let patch: RecordPatch =
            serde_json::from_value(json!({"participant_ids": [a.id, c.id, 9999]})).unwrap();
        let updated = repo.update_record(&ALICE, created.record.id, patch).await.unwrap();
        let names: Vec<_> = updated.participants.iter().map(|p| p.name_or_code.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);

        // Omitting the list leaves the set alone
        let patch: RecordPatch = serde_json::from_value(json!({"title": "Walk 2"})).unwrap();
        let updated = repo.update_record(&ALICE, created.record.id, patch).await.unwrap();
        assert_eq!(updated.participants.len(), 2);
    }

    #[tokio::test]
    async fn test_version_precondition() {
        let repo = repo().await;
        let created = repo.create_record(&ALICE, input("V", RecordType::Other, 1)).await.unwrap();
        assert_eq!(created.record.version, 1);

        let patch: RecordPatch = serde_json::from_value(json!({"status": "completed", "version": 1})).unwrap();
        let updated = repo.update_record(&ALICE, created.record.id, patch).await.unwrap();
        assert_eq!(updated.record.version, 2);
        assert_eq!(updated.record.status, RecordStatus::Completed);

        let stale: RecordPatch = serde_json::from_value(json!({"title": "Stale", "version": 1})).unwrap();
        let err = repo.update_record(&ALICE, created.record.id, stale).await.unwrap_err();
        assert!(matches!(err, AppError::VersionConflict { expected: 1, actual: 2, .. }));

        let unconditional: RecordPatch = serde_json::from_value(json!({"title": "Fresh"})).unwrap();
        let updated = repo.update_record(&ALICE, created.record.id, unconditional).await.unwrap();
        assert_eq!(updated.record.version, 3);
        assert_eq!(updated.record.title, "Fresh");
    }

    #[tokio::test]
    async fn test_update_checks_ownership_and_content() {
        let repo = repo().await;
        let created = repo.create_record(&ALICE, input("Owned", RecordType::Interview, 1)).await.unwrap();

        let patch: RecordPatch = serde_json::from_value(json!({"title": "Hijack"})).unwrap();
        let err = repo.update_record(&BOB, created.record.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let patch: RecordPatch =
            serde_json::from_value(json!({"content": {"qa_records": "nope"}})).unwrap();
        let err = repo.update_record(&ALICE, created.record.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        // The failed update rolled back: still version 1
        let detail = repo.get_record(&ALICE, created.record.id).await.unwrap();
        assert_eq!(detail.record.version, 1);
        assert_eq!(detail.record.title, "Owned");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_field_and_bad_content() {
        let repo = repo().await;
        let mut rec = input("Nowhere", RecordType::FieldNote, 1);
        rec.field_id = Some(77);
        let err = repo.create_record(&ALICE, rec).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "field_id"));

        let mut rec = input("Bad", RecordType::FieldNote, 1);
        rec.content = json!("just text");
        assert!(repo.create_record(&ALICE, rec).await.is_err());

        let page = repo.list_records(&ADMIN, &RecordFilter::default(), window(0, 10)).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_export_selection() {
        let repo = repo().await;
        let a = repo.create_record(&ALICE, input("A", RecordType::FieldNote, 1)).await.unwrap();
        repo.create_record(&ALICE, input("B", RecordType::FieldNote, 2)).await.unwrap();
        let theirs = repo.create_record(&BOB, input("C", RecordType::FieldNote, 3)).await.unwrap();

        let all = repo.export_records(&ALICE, &RecordFilter::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|d| d.record.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);

        // Explicit ids never widen visibility
        let filter = RecordFilter::default().with_record_ids(Some(vec![a.record.id, theirs.record.id]));
        let picked = repo.export_records(&ALICE, &filter).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].record.id, a.record.id);

        let filter = RecordFilter::default().with_record_ids(Some(vec![]));
        assert!(repo.export_records(&ALICE, &filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_images_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        let repo = repo().await;
        let p = participant(&repo, &ALICE, "P").await;

        let mut rec = input("Photos", RecordType::Observation, 1);
        rec.participant_ids = vec![p.id];
        let created = repo.create_record(&ALICE, rec).await.unwrap();
        let id = created.record.id;

        let path = format!("{}/one.jpg", record_dir(id));
        blobs.put(&path, b"jpeg").await.unwrap();
        let image = repo
            .add_record_image(
                &ALICE,
                id,
                NewRecordImage {
                    filename: "one.jpg".into(),
                    original_filename: "IMG_0001.jpg".into(),
                    file_path: path.clone(),
                    thumbnail_path: None,
                    file_size: 4,
                    mime_type: "image/jpeg".into(),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(image.sort_order, 0);
        assert_eq!(repo.list_record_images(&ALICE, id).await.unwrap().len(), 1);
        assert_eq!(repo.get_record_image(&ALICE, id, image.id).await.unwrap().file_path, path);
        assert!(matches!(
            repo.get_record_image(&ALICE, id, image.id + 1).await,
            Err(AppError::NotFound { .. })
        ));

        let err = repo.delete_record(&BOB, id, &blobs).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        repo.delete_record(&ALICE, id, &blobs).await.unwrap();
        assert!(!dir.path().join(record_dir(id)).exists());
        assert!(matches!(
            repo.get_record(&ALICE, id).await,
            Err(AppError::RecordNotFound { .. })
        ));
        // The participant survives; only the link is gone
        assert!(repo.get_participant(&ALICE, p.id).await.is_ok());
    }

    async fn tag(repo: &Repository, who: &Principal, name: &str) -> i32 {
        let category = match repo.list_tag_categories(None).await.unwrap().into_iter().next() {
            Some(c) => c.category.id,
            None => {
                repo.create_tag_category(who, serde_json::from_value(json!({"name": "Themes", "type": "theme"})).unwrap())
                    .await
                    .unwrap()
                    .id
            }
        };
        repo.create_tag(who, serde_json::from_value(json!({"name": name, "category_id": category})).unwrap())
            .await
            .unwrap()
            .tag
            .id
    }

    async fn titles(repo: &Repository, who: &Principal, params: RecordFilterParams) -> Vec<String> {
        let filter = RecordFilter::from_params(params).unwrap();
        let page = repo.list_records(who, &filter, window(0, 100)).await.unwrap();
        assert_eq!(page.total as usize, page.items.len());
        page.items.into_iter().map(|d| d.record.title).collect()
    }

    #[tokio::test]
    async fn test_cannot_link_other_users_participant_or_field() {
        let repo = repo().await;
        let secret = participant(&repo, &ALICE, "Alice-Informant").await;
        let field = repo
            .create_field(&ALICE, serde_json::from_value(json!({"region": "North", "location": "Harbour"})).unwrap())
            .await
            .unwrap();

        let mut rec = input("Borrowed", RecordType::Interview, 1);
        rec.participant_ids = vec![secret.id];
        let created = repo.create_record(&BOB, rec).await.unwrap();
        assert!(created.participants.is_empty());
        assert!(repo.get_record(&BOB, created.record.id).await.unwrap().participants.is_empty());

        let patch: RecordPatch = serde_json::from_value(json!({"participant_ids": [secret.id]})).unwrap();
        let updated = repo.update_record(&BOB, created.record.id, patch).await.unwrap();
        assert!(updated.participants.is_empty());

        let mut rec = input("Borrowed field", RecordType::FieldNote, 2);
        rec.field_id = Some(field.id);
        let err = repo.create_record(&BOB, rec).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let patch: RecordPatch = serde_json::from_value(json!({"field_id": field.id})).unwrap();
        let err = repo.update_record(&BOB, created.record.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let exported = repo.export_records(&BOB, &RecordFilter::default()).await.unwrap();
        assert!(exported.iter().all(|d| d.participants.is_empty() && d.field.is_none()));

        // Administrators may link anything
        let mut rec = input("Curated", RecordType::Interview, 3);
        rec.participant_ids = vec![secret.id];
        rec.field_id = Some(field.id);
        let created = repo.create_record(&ADMIN, rec).await.unwrap();
        assert_eq!(created.participants.len(), 1);
        assert!(created.field.is_some());
    }

    #[tokio::test]
    async fn test_scalar_filters_against_store() {
        let repo = repo().await;
        let mut done = input("Market day", RecordType::FieldNote, 1);
        done.status = RecordStatus::Completed;
        repo.create_record(&ALICE, done).await.unwrap();
        repo.create_record(&ALICE, input("Harbour talk", RecordType::Interview, 2)).await.unwrap();
        repo.create_record(&ALICE, input("Night market", RecordType::Observation, 3)).await.unwrap();

        let completed = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                status: Some(RecordStatus::Completed),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(completed, vec!["Market day"]);

        let found = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                search: Some("market".into()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(found, vec!["Night market", "Market day"]);

        let combined = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                search: Some("market".into()),
                status: Some(RecordStatus::Draft),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(combined, vec!["Night market"]);
    }

    #[tokio::test]
    async fn test_date_bounds_are_inclusive() {
        let repo = repo().await;
        for day in 1..=5 {
            repo.create_record(&ALICE, input(&format!("Day {}", day), RecordType::FieldNote, day))
                .await
                .unwrap();
        }

        let between = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                start_date: Some("2024-05-02T09:00:00Z".into()),
                end_date: Some("2024-05-04T09:00:00Z".into()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(between, vec!["Day 4", "Day 3", "Day 2"]);

        // A bare date is midnight UTC
        let from = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                start_date: Some("2024-05-04".into()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(from, vec!["Day 5", "Day 4"]);

        let until = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                end_date: Some("2024-05-02".into()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(until, vec!["Day 1"]);
    }

    #[tokio::test]
    async fn test_tag_filter_matches_any_listed_tag() {
        let repo = repo().await;
        let trade = tag(&repo, &ALICE, "trade").await;
        let ritual = tag(&repo, &ALICE, "ritual").await;
        let kin = tag(&repo, &ALICE, "kinship").await;

        let mut a = input("Auction", RecordType::FieldNote, 1);
        a.tag_ids = vec![trade, ritual];
        repo.create_record(&ALICE, a).await.unwrap();
        let mut b = input("Wedding", RecordType::FieldNote, 2);
        b.tag_ids = vec![ritual, kin];
        repo.create_record(&ALICE, b).await.unwrap();
        let mut c = input("Visit", RecordType::FieldNote, 3);
        c.tag_ids = vec![kin];
        repo.create_record(&ALICE, c).await.unwrap();

        let hit = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                tag_ids: Some(format!("{},{}", trade, ritual)),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(hit, vec!["Wedding", "Auction"]);

        let narrowed = titles(
            &repo,
            &ALICE,
            RecordFilterParams {
                tag_ids: Some(ritual.to_string()),
                search: Some("Wed".into()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(narrowed, vec!["Wedding"]);
    }

    #[tokio::test]
    async fn test_creator_filter_never_widens_scope() {
        let repo = repo().await;
        let shared = tag(&repo, &ADMIN, "shared").await;
        for (who, title, day) in [(&ALICE, "Alice one", 1), (&BOB, "Bob one", 2), (&BOB, "Bob two", 3)] {
            let mut rec = input(title, RecordType::Interview, day);
            rec.tag_ids = vec![shared];
            repo.create_record(who, rec).await.unwrap();
        }

        let combos = [
            RecordFilterParams {
                created_by: Some(BOB.user_id),
                ..Default::default()
            },
            RecordFilterParams {
                created_by: Some(BOB.user_id),
                kind: Some(RecordType::Interview),
                tag_ids: Some(shared.to_string()),
                ..Default::default()
            },
            RecordFilterParams {
                search: Some("one".into()),
                start_date: Some("2024-05-01".into()),
                ..Default::default()
            },
        ];
        for params in combos {
            let page = titles(&repo, &ALICE, params).await;
            assert!(page.iter().all(|t| t.starts_with("Alice")), "{:?}", page);
        }

        let bobs = titles(
            &repo,
            &ADMIN,
            RecordFilterParams {
                created_by: Some(BOB.user_id),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(bobs, vec!["Bob two", "Bob one"]);

        let filter = RecordFilter::from_params(RecordFilterParams {
            created_by: Some(BOB.user_id),
            ..Default::default()
        })
        .unwrap();
        assert!(repo.export_records(&ALICE, &filter).await.unwrap().is_empty());
        assert_eq!(repo.export_records(&ADMIN, &filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_tolerates_non_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        let repo = repo().await;
        let created = repo.create_record(&ALICE, input("Stray", RecordType::Other, 1)).await.unwrap();
        let id = created.record.id;

        blobs.put(&format!("{}/stray.bin", record_dir(id)), b"x").await.unwrap();
        repo.delete_record(&ALICE, id, &blobs).await.unwrap();
        assert!(dir.path().join(record_dir(id)).exists());
    }
}
