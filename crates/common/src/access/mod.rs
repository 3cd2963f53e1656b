//! Row-level visibility policy
//!
//! Every owned entity (records, fields, participants, tags) carries a
//! `created_by` column. Administrators see and mutate every row; everyone
//! else is confined to rows they created. Lists apply [`Visibility::condition`]
//! before any other filter, and lookups by id re-check with
//! [`Visibility::ensure_owner`], which fails with a permission error rather
//! than not-found.

use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{ColumnTrait, Condition, EntityTrait};

/// Entity whose rows carry an owner reference
pub trait OwnedEntity: EntityTrait {
    /// Column holding the creator's user id
    fn owner_column() -> Self::Column;

    /// Name used in permission errors
    fn resource_name() -> &'static str;
}

/// Model that knows its owner
pub trait Owned {
    fn owner_id(&self) -> i32;
}

macro_rules! owned_entity {
    ($entity:ty, $model:ty, $column:expr, $name:literal) => {
        impl OwnedEntity for $entity {
            fn owner_column() -> Self::Column {
                $column
            }

            fn resource_name() -> &'static str {
                $name
            }
        }

        impl Owned for $model {
            fn owner_id(&self) -> i32 {
                self.created_by
            }
        }
    };
}

owned_entity!(RecordEntity, Record, RecordColumn::CreatedBy, "record");
owned_entity!(FieldEntity, Field, FieldColumn::CreatedBy, "field");
owned_entity!(ParticipantEntity, Participant, ParticipantColumn::CreatedBy, "participant");
owned_entity!(TagEntity, Tag, TagColumn::CreatedBy, "tag");

/// What a principal may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// No restriction (administrators)
    All,
    /// Only rows created by this user
    Owner(i32),
}

impl Visibility {
    /// Derive the scope for an authenticated caller
    pub fn scope(principal: &Principal) -> Self {
        if principal.is_admin() {
            Visibility::All
        } else {
            Visibility::Owner(principal.user_id)
        }
    }

    /// Row predicate for entity `E`; always-true for [`Visibility::All`]
    pub fn condition<E: OwnedEntity>(&self) -> Condition {
        match self {
            Visibility::All => Condition::all(),
            Visibility::Owner(user_id) => Condition::all().add(E::owner_column().eq(*user_id)),
        }
    }

    /// Whether a row owned by `owner_id` is within scope
    pub fn permits(&self, owner_id: i32) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Owner(user_id) => *user_id == owner_id,
        }
    }

    /// Permission check for a row that was looked up by id
    pub fn ensure_owner<M: Owned>(&self, model: &M, resource: &str) -> Result<()> {
        if self.permits(model.owner_id()) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("Insufficient permission to access another user's {}", resource),
            })
        }
    }

    /// [`Self::ensure_owner`] with the resource name taken from the entity
    pub fn ensure<E>(&self, model: &E::Model) -> Result<()>
    where
        E: OwnedEntity,
        E::Model: Owned,
    {
        self.ensure_owner(model, E::resource_name())
    }
}
