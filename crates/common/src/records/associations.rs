//! Participant and tag associations of records
//!
//! Assignment is whole-set replacement: the supplied ids are resolved
//! against existing rows (unknown ids are dropped without error) and the
//! resolved set becomes the record's entire association set.
//!
//! Participants are owned rows, so they resolve within the caller's
//! visibility; another researcher's participant is dropped like an unknown
//! id. Tags are shared and resolve globally.

use crate::access::Visibility;
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

/// Visible participants among `ids`, ordered by id
pub async fn resolve_participants<C: ConnectionTrait>(
    conn: &C,
    visibility: Visibility,
    ids: &[i32],
) -> Result<Vec<Participant>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found = ParticipantEntity::find()
        .filter(visibility.condition::<ParticipantEntity>())
        .filter(ParticipantColumn::Id.is_in(ids.iter().copied()))
        .order_by_asc(ParticipantColumn::Id)
        .all(conn)
        .await?;
    log_dropped("participant", ids, found.iter().map(|p| p.id));
    Ok(found)
}

/// Existing tags among `ids`, ordered by id
pub async fn resolve_tags<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<Vec<Tag>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found = TagEntity::find()
        .filter(TagColumn::Id.is_in(ids.iter().copied()))
        .order_by_asc(TagColumn::Id)
        .all(conn)
        .await?;
    log_dropped("tag", ids, found.iter().map(|t| t.id));
    Ok(found)
}

/// Make the resolved subset of `ids` the record's participant set
pub async fn replace_participants<C: ConnectionTrait>(
    conn: &C,
    visibility: Visibility,
    record_id: i32,
    ids: &[i32],
) -> Result<Vec<Participant>> {
    let resolved = resolve_participants(conn, visibility, ids).await?;

    RecordParticipantEntity::delete_many()
        .filter(RecordParticipantColumn::RecordId.eq(record_id))
        .exec(conn)
        .await?;

    if !resolved.is_empty() {
        let links = resolved.iter().map(|p| RecordParticipantActiveModel {
            record_id: Set(record_id),
            participant_id: Set(p.id),
        });
        RecordParticipantEntity::insert_many(links)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(resolved)
}

/// Make the resolved subset of `ids` the record's tag set
pub async fn replace_tags<C: ConnectionTrait>(conn: &C, record_id: i32, ids: &[i32]) -> Result<Vec<Tag>> {
    let resolved = resolve_tags(conn, ids).await?;

    RecordTagEntity::delete_many()
        .filter(RecordTagColumn::RecordId.eq(record_id))
        .exec(conn)
        .await?;

    if !resolved.is_empty() {
        let links = resolved.iter().map(|t| RecordTagActiveModel {
            record_id: Set(record_id),
            tag_id: Set(t.id),
        });
        RecordTagEntity::insert_many(links)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(resolved)
}

/// Association sets for many records, keyed by record id
#[derive(Debug, Default)]
pub struct LoadedAssociations {
    pub fields: HashMap<i32, Field>,
    pub participants: HashMap<i32, Vec<Participant>>,
    pub tags: HashMap<i32, Vec<Tag>>,
}

/// Batch-load field, participants and tags for `records`.
///
/// Three queries regardless of how many records are passed.
pub async fn load_for_records<C: ConnectionTrait>(conn: &C, records: &[Record]) -> Result<LoadedAssociations> {
    if records.is_empty() {
        return Ok(LoadedAssociations::default());
    }

    let record_ids: Vec<i32> = records.iter().map(|r| r.id).collect();
    let mut field_ids: Vec<i32> = records.iter().filter_map(|r| r.field_id).collect();
    field_ids.sort_unstable();
    field_ids.dedup();

    let fields = if field_ids.is_empty() {
        HashMap::new()
    } else {
        FieldEntity::find()
            .filter(FieldColumn::Id.is_in(field_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect()
    };

    let mut participants: HashMap<i32, Vec<Participant>> = HashMap::new();
    let links = RecordParticipantEntity::find()
        .filter(RecordParticipantColumn::RecordId.is_in(record_ids.iter().copied()))
        .find_also_related(ParticipantEntity)
        .all(conn)
        .await?;
    for (link, participant) in links {
        if let Some(participant) = participant {
            participants.entry(link.record_id).or_default().push(participant);
        }
    }
    for list in participants.values_mut() {
        list.sort_by_key(|p| p.id);
    }

    let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
    let links = RecordTagEntity::find()
        .filter(RecordTagColumn::RecordId.is_in(record_ids.iter().copied()))
        .find_also_related(TagEntity)
        .all(conn)
        .await?;
    for (link, tag) in links {
        if let Some(tag) = tag {
            tags.entry(link.record_id).or_default().push(tag);
        }
    }
    for list in tags.values_mut() {
        list.sort_by_key(|t| t.id);
    }

    Ok(LoadedAssociations {
        fields,
        participants,
        tags,
    })
}

fn log_dropped(kind: &str, requested: &[i32], found: impl Iterator<Item = i32>) {
    let found: Vec<i32> = found.collect();
    let dropped: Vec<i32> = requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    if !dropped.is_empty() {
        tracing::debug!(kind, ?dropped, "Ignoring unknown association ids");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::db::{schema, DbPool, NewUser, Repository};
    use crate::records::RecordInput;
    use serde_json::json;

    const ADMIN: Principal = Principal {
        user_id: 1,
        role: UserRole::Admin,
    };

    async fn setup() -> (DbPool, Repository) {
        let pool = DbPool::connect_single("sqlite::memory:").await.unwrap();
        schema::create_all(pool.write()).await.unwrap();
        let repo = Repository::new(pool.clone());
        repo.create_user(
            &ADMIN,
            NewUser {
                username: "admin".into(),
                email: "admin@example.org".into(),
                full_name: None,
                role: UserRole::Admin,
                is_active: true,
            },
        )
        .await
        .unwrap();
        (pool, repo)
    }

    async fn record(repo: &Repository) -> i32 {
        let input: RecordInput = serde_json::from_value(json!({
            "title": "Harbour walk",
            "type": "field_note",
            "record_date": "2024-04-01T08:00:00Z",
        }))
        .unwrap();
        repo.create_record(&ADMIN, input).await.unwrap().record.id
    }

    async fn participant(repo: &Repository, name: &str) -> i32 {
        let input = serde_json::from_value(json!({"name_or_code": name})).unwrap();
        repo.create_participant(&ADMIN, input).await.unwrap().id
    }

    #[tokio::test]
    async fn test_replace_drops_unknown_and_collapses_duplicates() {
        let (pool, repo) = setup().await;
        let record_id = record(&repo).await;
        let p1 = participant(&repo, "P-01").await;
        let p2 = participant(&repo, "P-02").await;

        let resolved = replace_participants(pool.write(), Visibility::All, record_id, &[p2, 999, p1, p2])
            .await
            .unwrap();
        assert_eq!(resolved.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p1, p2]);

        let resolved = replace_participants(pool.write(), Visibility::All, record_id, &[p2]).await.unwrap();
        assert_eq!(resolved.len(), 1);

        let links = RecordParticipantEntity::find()
            .filter(RecordParticipantColumn::RecordId.eq(record_id))
            .all(pool.read())
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].participant_id, p2);

        replace_participants(pool.write(), Visibility::All, record_id, &[]).await.unwrap();
        let loaded = load_for_records(
            pool.read(),
            &RecordEntity::find().all(pool.read()).await.unwrap(),
        )
        .await
        .unwrap();
        assert!(loaded.participants.get(&record_id).is_none());
    }

    #[tokio::test]
    async fn test_batch_load() {
        let (pool, repo) = setup().await;
        let first = record(&repo).await;
        let second = record(&repo).await;
        let p1 = participant(&repo, "P-01").await;

        let category = repo
            .create_tag_category(
                &ADMIN,
                serde_json::from_value(json!({"name": "Themes", "type": "theme"})).unwrap(),
            )
            .await
            .unwrap();
        let tag = repo
            .create_tag(
                &ADMIN,
                serde_json::from_value(json!({"name": "trade", "category_id": category.id})).unwrap(),
            )
            .await
            .unwrap();

        replace_participants(pool.write(), Visibility::All, first, &[p1]).await.unwrap();
        replace_tags(pool.write(), first, &[tag.tag.id]).await.unwrap();
        replace_tags(pool.write(), second, &[tag.tag.id, 404]).await.unwrap();

        let records = RecordEntity::find().all(pool.read()).await.unwrap();
        let loaded = load_for_records(pool.read(), &records).await.unwrap();

        assert_eq!(loaded.participants[&first].len(), 1);
        assert!(!loaded.participants.contains_key(&second));
        assert_eq!(loaded.tags[&first][0].name, "trade");
        assert_eq!(loaded.tags[&second].len(), 1);
        assert!(loaded.fields.is_empty());
    }

    #[tokio::test]
    async fn test_participants_resolve_within_visibility() {
        let (pool, repo) = setup().await;
        let record_id = record(&repo).await;
        let admins = participant(&repo, "Admin-only").await;

        let resolved = replace_participants(pool.write(), Visibility::Owner(2), record_id, &[admins])
            .await
            .unwrap();
        assert!(resolved.is_empty());
        assert_eq!(
            RecordParticipantEntity::find()
                .filter(RecordParticipantColumn::RecordId.eq(record_id))
                .all(pool.read())
                .await
                .unwrap()
                .len(),
            0
        );

        let resolved = resolve_participants(pool.read(), Visibility::Owner(ADMIN.user_id), &[admins])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_empty_input() {
        let (pool, _repo) = setup().await;
        assert!(resolve_tags(pool.read(), &[]).await.unwrap().is_empty());
        assert!(resolve_participants(pool.read(), Visibility::All, &[7]).await.unwrap().is_empty());
    }
}
