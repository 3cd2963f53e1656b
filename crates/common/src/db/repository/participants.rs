//! Participant operations

use super::Repository;
use crate::access::Visibility;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::records::double_option;
use crate::records::pagination::{paginate, Page, PageWindow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ParticipantInput {
    #[validate(length(min = 1, max = 100))]
    pub name_or_code: String,

    #[validate(length(max = 20))]
    pub gender: Option<String>,

    #[validate(length(max = 50))]
    pub age_range: Option<String>,

    #[validate(length(max = 100))]
    pub occupation: Option<String>,

    #[validate(length(max = 100))]
    pub education: Option<String>,

    pub contact_info: Option<Value>,

    pub social_attributes: Option<Value>,

    pub research_related: Option<Value>,

    #[serde(default)]
    pub is_anonymous: bool,

    #[serde(default)]
    pub data_sensitivity: DataSensitivity,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ParticipantPatch {
    #[validate(length(min = 1, max = 100))]
    pub name_or_code: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub gender: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub age_range: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub occupation: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub education: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub contact_info: Option<Option<Value>>,

    #[serde(default, deserialize_with = "double_option")]
    pub social_attributes: Option<Option<Value>>,

    #[serde(default, deserialize_with = "double_option")]
    pub research_related: Option<Option<Value>>,

    pub is_anonymous: Option<bool>,

    pub data_sensitivity: Option<DataSensitivity>,

    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantListParams {
    /// Substring of name/code, occupation or notes
    pub search: Option<String>,
    pub gender: Option<String>,
    pub is_anonymous: Option<bool>,
}

impl Repository {
    pub async fn list_participants(
        &self,
        principal: &Principal,
        params: &ParticipantListParams,
        window: PageWindow,
    ) -> Result<Page<Participant>> {
        let mut cond = Visibility::scope(principal).condition::<ParticipantEntity>();
        if let Some(ref search) = params.search {
            cond = cond.add(
                Condition::any()
                    .add(ParticipantColumn::NameOrCode.contains(search.as_str()))
                    .add(ParticipantColumn::Occupation.contains(search.as_str()))
                    .add(ParticipantColumn::Notes.contains(search.as_str())),
            );
        }
        if let Some(ref gender) = params.gender {
            cond = cond.add(ParticipantColumn::Gender.eq(gender.as_str()));
        }
        if let Some(is_anonymous) = params.is_anonymous {
            cond = cond.add(ParticipantColumn::IsAnonymous.eq(is_anonymous));
        }

        let select = ParticipantEntity::find()
            .filter(cond)
            .order_by_desc(ParticipantColumn::CreatedAt)
            .order_by_asc(ParticipantColumn::Id);
        paginate(select, self.read_conn(), window).await
    }

    pub async fn get_participant(&self, principal: &Principal, id: i32) -> Result<Participant> {
        find_visible(self.read_conn(), principal, id).await
    }

    pub async fn create_participant(&self, principal: &Principal, input: ParticipantInput) -> Result<Participant> {
        input.validate()?;

        let txn = self.begin().await?;
        let now = chrono::Utc::now();
        let participant = ParticipantActiveModel {
            name_or_code: Set(input.name_or_code),
            gender: Set(input.gender),
            age_range: Set(input.age_range),
            occupation: Set(input.occupation),
            education: Set(input.education),
            contact_info: Set(input.contact_info),
            social_attributes: Set(input.social_attributes),
            research_related: Set(input.research_related),
            is_anonymous: Set(input.is_anonymous),
            data_sensitivity: Set(input.data_sensitivity),
            notes: Set(input.notes),
            created_by: Set(principal.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            participant_id = participant.id,
            user_id = principal.user_id,
            sensitivity = ?participant.data_sensitivity,
            "Participant created"
        );
        Ok(participant)
    }

    pub async fn update_participant(
        &self,
        principal: &Principal,
        id: i32,
        patch: ParticipantPatch,
    ) -> Result<Participant> {
        patch.validate()?;

        let txn = self.begin().await?;
        let current = find_visible(&txn, principal, id).await?;

        let mut active: ParticipantActiveModel = current.into();
        if let Some(name_or_code) = patch.name_or_code {
            active.name_or_code = Set(name_or_code);
        }
        if let Some(gender) = patch.gender {
            active.gender = Set(gender);
        }
        if let Some(age_range) = patch.age_range {
            active.age_range = Set(age_range);
        }
        if let Some(occupation) = patch.occupation {
            active.occupation = Set(occupation);
        }
        if let Some(education) = patch.education {
            active.education = Set(education);
        }
        if let Some(contact_info) = patch.contact_info {
            active.contact_info = Set(contact_info);
        }
        if let Some(social_attributes) = patch.social_attributes {
            active.social_attributes = Set(social_attributes);
        }
        if let Some(research_related) = patch.research_related {
            active.research_related = Set(research_related);
        }
        if let Some(is_anonymous) = patch.is_anonymous {
            active.is_anonymous = Set(is_anonymous);
        }
        if let Some(data_sensitivity) = patch.data_sensitivity {
            active.data_sensitivity = Set(data_sensitivity);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(chrono::Utc::now());

        let participant = active.update(&txn).await?;
        txn.commit().await?;
        Ok(participant)
    }

    /// Delete a participant and unlink it from every record
    pub async fn delete_participant(&self, principal: &Principal, id: i32) -> Result<()> {
        let txn = self.begin().await?;
        let participant = find_visible(&txn, principal, id).await?;

        RecordParticipantEntity::delete_many()
            .filter(RecordParticipantColumn::ParticipantId.eq(id))
            .exec(&txn)
            .await?;
        ParticipantEntity::delete_by_id(participant.id).exec(&txn).await?;
        txn.commit().await?;

        info!(participant_id = id, user_id = principal.user_id, "Participant deleted");
        Ok(())
    }
}

async fn find_visible<C: ConnectionTrait>(conn: &C, principal: &Principal, id: i32) -> Result<Participant> {
    let participant = ParticipantEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("participant", id))?;
    Visibility::scope(principal).ensure::<ParticipantEntity>(&participant)?;
    Ok(participant)
}
