//! User operations

use super::Repository;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::records::pagination::{paginate, Page, PageWindow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Account provisioned by an administrator
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(max = 100))]
    pub full_name: Option<String>,

    pub role: UserRole,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    /// Substring of username, email or full name
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl Repository {
    /// Find user by ID
    pub async fn find_user(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// The caller's own account
    pub async fn current_user(&self, principal: &Principal) -> Result<User> {
        self.find_user(principal.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", principal.user_id))
    }

    pub async fn list_users(
        &self,
        principal: &Principal,
        params: &UserListParams,
        window: PageWindow,
    ) -> Result<Page<User>> {
        principal.require_admin("list users")?;

        let mut cond = Condition::all();
        if let Some(ref search) = params.search {
            cond = cond.add(
                Condition::any()
                    .add(UserColumn::Username.contains(search.as_str()))
                    .add(UserColumn::Email.contains(search.as_str()))
                    .add(UserColumn::FullName.contains(search.as_str())),
            );
        }
        if let Some(role) = params.role {
            cond = cond.add(UserColumn::Role.eq(role));
        }
        if let Some(is_active) = params.is_active {
            cond = cond.add(UserColumn::IsActive.eq(is_active));
        }

        let select = UserEntity::find()
            .filter(cond)
            .order_by_asc(UserColumn::Id);
        paginate(select, self.read_conn(), window).await
    }

    /// Provision an account; usernames and emails are unique
    pub async fn create_user(&self, principal: &Principal, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let txn = self.begin().await?;

        // The very first account bootstraps the system and needs no admin
        let existing = UserEntity::find().count(&txn).await?;
        if existing > 0 {
            principal.require_admin("create users")?;
        }

        let taken = UserEntity::find()
            .filter(
                Condition::any()
                    .add(UserColumn::Username.eq(new_user.username.as_str()))
                    .add(UserColumn::Email.eq(new_user.email.as_str())),
            )
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(AppError::invalid_field(
                "username",
                "Username or email is already registered",
            ));
        }

        let now = chrono::Utc::now();
        let user = UserActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            full_name: Set(new_user.full_name),
            role: Set(new_user.role),
            is_active: Set(new_user.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(user_id = user.id, username = %user.username, role = ?user.role, "User created");
        Ok(user)
    }
}
