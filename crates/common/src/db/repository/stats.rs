//! Dashboard counters and activity feed

use super::Repository;
use crate::access::Visibility;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Shown when an entry's creator no longer exists
pub const UNKNOWN_CREATOR: &str = "Unknown";

/// Entity counts within the caller's visibility scope
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewStats {
    pub records_count: u64,
    pub participants_count: u64,
    pub fields_count: u64,
    pub tags_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Record,
    Participant,
    Field,
}

/// One entry of the recent-activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentActivity {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub creator_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentActivities {
    pub items: Vec<RecentActivity>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct RecentActivityParams {
    #[serde(default = "default_activity_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: u64,
}

impl Default for RecentActivityParams {
    fn default() -> Self {
        Self {
            limit: default_activity_limit(),
        }
    }
}

fn default_activity_limit() -> u64 {
    10
}

impl Repository {
    pub async fn overview_stats(&self, principal: &Principal) -> Result<OverviewStats> {
        let scope = Visibility::scope(principal);
        let conn = self.read_conn();

        let records_count = RecordEntity::find()
            .filter(scope.condition::<RecordEntity>())
            .count(conn)
            .await?;
        let participants_count = ParticipantEntity::find()
            .filter(scope.condition::<ParticipantEntity>())
            .count(conn)
            .await?;
        let fields_count = FieldEntity::find()
            .filter(scope.condition::<FieldEntity>())
            .count(conn)
            .await?;
        let tags_count = TagEntity::find()
            .filter(scope.condition::<TagEntity>())
            .count(conn)
            .await?;

        Ok(OverviewStats {
            records_count,
            participants_count,
            fields_count,
            tags_count,
        })
    }

    /// Newest records, participants and fields within scope, merged by
    /// creation time and cut to `limit`
    pub async fn recent_activities(
        &self,
        principal: &Principal,
        params: RecentActivityParams,
    ) -> Result<RecentActivities> {
        params.validate()?;
        let scope = Visibility::scope(principal);
        let conn = self.read_conn();
        let limit = params.limit;

        let records = RecordEntity::find()
            .filter(scope.condition::<RecordEntity>())
            .order_by_desc(RecordColumn::CreatedAt)
            .limit(limit)
            .all(conn)
            .await?;
        let participants = ParticipantEntity::find()
            .filter(scope.condition::<ParticipantEntity>())
            .order_by_desc(ParticipantColumn::CreatedAt)
            .limit(limit)
            .all(conn)
            .await?;
        let fields = FieldEntity::find()
            .filter(scope.condition::<FieldEntity>())
            .order_by_desc(FieldColumn::CreatedAt)
            .limit(limit)
            .all(conn)
            .await?;

        let mut creator_ids: Vec<i32> = records
            .iter()
            .map(|r| r.created_by)
            .chain(participants.iter().map(|p| p.created_by))
            .chain(fields.iter().map(|f| f.created_by))
            .collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators: HashMap<i32, String> = UserEntity::find()
            .filter(UserColumn::Id.is_in(creator_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name().to_string()))
            .collect();
        let creator_name = |id: i32| {
            creators
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_CREATOR.to_string())
        };

        let mut items: Vec<RecentActivity> = Vec::new();
        items.extend(records.into_iter().map(|r| RecentActivity {
            id: r.id,
            kind: ActivityKind::Record,
            action: "created".to_string(),
            title: r.title,
            created_at: r.created_at,
            creator_name: creator_name(r.created_by),
        }));
        items.extend(participants.into_iter().map(|p| RecentActivity {
            id: p.id,
            kind: ActivityKind::Participant,
            action: "created".to_string(),
            title: format!("Participant: {}", p.name_or_code),
            created_at: p.created_at,
            creator_name: creator_name(p.created_by),
        }));
        items.extend(fields.into_iter().map(|f| RecentActivity {
            id: f.id,
            kind: ActivityKind::Field,
            action: "created".to_string(),
            title: format!("Field: {}", f.full_location()),
            created_at: f.created_at,
            creator_name: creator_name(f.created_by),
        }));

        // Stable sort keeps record, participant, field order on ties
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit as usize);

        Ok(RecentActivities {
            total: items.len(),
            items,
        })
    }
}
