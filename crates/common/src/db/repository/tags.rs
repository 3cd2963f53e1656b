//! Tag categories and tags
//!
//! Both are readable by every authenticated user. Categories may only be
//! changed or removed by administrators; tags by their creator or an
//! administrator.

use super::Repository;
use crate::access::Visibility;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::records::double_option;
use crate::records::pagination::{paginate, Page, PageWindow};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use validator::Validate;

const COLOR_PATTERN: &str = r"^#[0-9A-Fa-f]{6}$";

fn check_color(color: Option<&str>) -> Result<()> {
    let Some(color) = color else {
        return Ok(());
    };
    let pattern = regex_lite::Regex::new(COLOR_PATTERN).map_err(|e| AppError::Internal {
        message: format!("Invalid color pattern: {}", e),
    })?;
    if pattern.is_match(color) {
        Ok(())
    } else {
        Err(AppError::invalid_field("color", "color must look like #RRGGBB"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagCategoryInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: TagCategoryType,

    pub description: Option<String>,

    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TagCategoryPatch {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<TagCategoryType>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

/// Category together with the number of tags it owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: TagCategory,
    pub tag_count: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    pub description: Option<String>,

    pub category_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TagPatch {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub category_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagListParams {
    pub category_id: Option<i32>,
    pub search: Option<String>,
}

/// Tag with its category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagView {
    #[serde(flatten)]
    pub tag: Tag,
    pub category: Option<TagCategory>,
}

impl Repository {
    // ==================== Categories ====================

    pub async fn list_tag_categories(&self, kind: Option<TagCategoryType>) -> Result<Vec<CategoryWithCount>> {
        let conn = self.read_conn();

        let mut select = TagCategoryEntity::find().order_by_asc(TagCategoryColumn::Name);
        if let Some(kind) = kind {
            select = select.filter(TagCategoryColumn::Kind.eq(kind));
        }
        let categories = select.all(conn).await?;
        let counts = tag_counts(conn).await?;

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithCount {
                tag_count: counts.get(&category.id).copied().unwrap_or(0),
                category,
            })
            .collect())
    }

    pub async fn get_tag_category(&self, id: i32) -> Result<CategoryWithCount> {
        let conn = self.read_conn();
        let category = find_category(conn, id).await?;
        let tag_count = count_tags_in(conn, id).await?;
        Ok(CategoryWithCount { category, tag_count })
    }

    pub async fn create_tag_category(&self, principal: &Principal, input: TagCategoryInput) -> Result<TagCategory> {
        input.validate()?;
        check_color(input.color.as_deref())?;

        let txn = self.begin().await?;
        ensure_category_name_free(&txn, &input.name, None).await?;

        let now = chrono::Utc::now();
        let category = TagCategoryActiveModel {
            name: Set(input.name),
            kind: Set(input.kind),
            description: Set(input.description),
            color: Set(Some(
                input
                    .color
                    .unwrap_or_else(|| tag_category::DEFAULT_CATEGORY_COLOR.to_string()),
            )),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(category_id = category.id, user_id = principal.user_id, "Tag category created");
        Ok(category)
    }

    pub async fn update_tag_category(
        &self,
        principal: &Principal,
        id: i32,
        patch: TagCategoryPatch,
    ) -> Result<TagCategory> {
        principal.require_admin("modify tag categories")?;
        patch.validate()?;
        if let Some(Some(ref color)) = patch.color {
            check_color(Some(color))?;
        }

        let txn = self.begin().await?;
        let current = find_category(&txn, id).await?;
        if let Some(ref name) = patch.name {
            ensure_category_name_free(&txn, name, Some(id)).await?;
        }

        let mut active: TagCategoryActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(kind) = patch.kind {
            active.kind = Set(kind);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(color) = patch.color {
            active.color = Set(color);
        }
        active.updated_at = Set(chrono::Utc::now());

        let category = active.update(&txn).await?;
        txn.commit().await?;
        Ok(category)
    }

    /// Delete an empty category; one that still owns tags is refused
    pub async fn delete_tag_category(&self, principal: &Principal, id: i32) -> Result<()> {
        principal.require_admin("delete tag categories")?;

        let txn = self.begin().await?;
        let category = find_category(&txn, id).await?;

        let owned = count_tags_in(&txn, id).await?;
        if owned > 0 {
            return Err(AppError::validation(format!(
                "Category '{}' still has {} tag(s); delete or move them first",
                category.name, owned
            )));
        }

        TagCategoryEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(category_id = id, user_id = principal.user_id, "Tag category deleted");
        Ok(())
    }

    // ==================== Tags ====================

    pub async fn list_tags(&self, params: &TagListParams, window: PageWindow) -> Result<Page<TagView>> {
        let conn = self.read_conn();

        let mut cond = Condition::all();
        if let Some(category_id) = params.category_id {
            cond = cond.add(TagColumn::CategoryId.eq(category_id));
        }
        if let Some(ref search) = params.search {
            cond = cond.add(TagColumn::Name.contains(search.as_str()));
        }

        let select = TagEntity::find()
            .filter(cond)
            .order_by_asc(TagColumn::Name)
            .order_by_asc(TagColumn::Id);
        let mut page = paginate(select, conn, window).await?;
        let tags = std::mem::take(&mut page.items);

        let category_ids: Vec<i32> = tags.iter().map(|t| t.category_id).collect();
        let categories: HashMap<i32, TagCategory> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            TagCategoryEntity::find()
                .filter(TagCategoryColumn::Id.is_in(category_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let views = tags
            .into_iter()
            .map(|tag| TagView {
                category: categories.get(&tag.category_id).cloned(),
                tag,
            })
            .collect();
        Ok(page.with_items(views))
    }

    pub async fn get_tag(&self, id: i32) -> Result<TagView> {
        let (tag, category) = TagEntity::find_by_id(id)
            .find_also_related(TagCategoryEntity)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::not_found("tag", id))?;
        Ok(TagView { tag, category })
    }

    /// Create a tag; names are unique within a category
    pub async fn create_tag(&self, principal: &Principal, input: TagInput) -> Result<TagView> {
        input.validate()?;

        let txn = self.begin().await?;
        let category = TagCategoryEntity::find_by_id(input.category_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::invalid_field(
                    "category_id",
                    format!("Tag category {} does not exist", input.category_id),
                )
            })?;
        ensure_tag_name_free(&txn, input.category_id, &input.name, None).await?;

        let now = chrono::Utc::now();
        let tag = TagActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            category_id: Set(input.category_id),
            created_by: Set(principal.user_id),
            usage_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(tag_id = tag.id, category_id = category.id, user_id = principal.user_id, "Tag created");
        Ok(TagView {
            tag,
            category: Some(category),
        })
    }

    pub async fn update_tag(&self, principal: &Principal, id: i32, patch: TagPatch) -> Result<TagView> {
        patch.validate()?;

        let txn = self.begin().await?;
        let current = find_tag(&txn, id).await?;
        Visibility::scope(principal).ensure::<TagEntity>(&current)?;

        if let Some(new_category) = patch.category_id {
            if TagCategoryEntity::find_by_id(new_category).count(&txn).await? == 0 {
                return Err(AppError::invalid_field(
                    "category_id",
                    format!("Tag category {} does not exist", new_category),
                ));
            }
        }
        let category_id = patch.category_id.unwrap_or(current.category_id);
        if patch.name.is_some() || patch.category_id.is_some() {
            let name = patch.name.as_deref().unwrap_or(&current.name);
            ensure_tag_name_free(&txn, category_id, name, Some(id)).await?;
        }

        let mut active: TagActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        active.category_id = Set(category_id);
        active.updated_at = Set(chrono::Utc::now());

        let tag = active.update(&txn).await?;
        let category = TagCategoryEntity::find_by_id(tag.category_id).one(&txn).await?;
        txn.commit().await?;

        Ok(TagView { tag, category })
    }

    /// Delete a tag and detach it from every record
    pub async fn delete_tag(&self, principal: &Principal, id: i32) -> Result<()> {
        let txn = self.begin().await?;
        let tag = find_tag(&txn, id).await?;
        Visibility::scope(principal).ensure::<TagEntity>(&tag)?;

        RecordTagEntity::delete_many()
            .filter(RecordTagColumn::TagId.eq(id))
            .exec(&txn)
            .await?;
        TagEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(tag_id = id, user_id = principal.user_id, "Tag deleted");
        Ok(())
    }
}

async fn find_category<C: ConnectionTrait>(conn: &C, id: i32) -> Result<TagCategory> {
    TagCategoryEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("tag category", id))
}

async fn find_tag<C: ConnectionTrait>(conn: &C, id: i32) -> Result<Tag> {
    TagEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("tag", id))
}

async fn count_tags_in<C: ConnectionTrait>(conn: &C, category_id: i32) -> Result<u64> {
    Ok(TagEntity::find()
        .filter(TagColumn::CategoryId.eq(category_id))
        .count(conn)
        .await?)
}

/// Tag count per category id, for categories owning at least one tag
async fn tag_counts<C: ConnectionTrait>(conn: &C) -> Result<HashMap<i32, u64>> {
    let rows: Vec<(i32, i64)> = TagEntity::find()
        .select_only()
        .column(TagColumn::CategoryId)
        .column_as(Expr::col(TagColumn::Id).count(), "tag_count")
        .group_by(TagColumn::CategoryId)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, n)| (id, n.max(0) as u64))
        .collect())
}

async fn ensure_category_name_free<C: ConnectionTrait>(conn: &C, name: &str, except: Option<i32>) -> Result<()> {
    let mut select = TagCategoryEntity::find().filter(TagCategoryColumn::Name.eq(name));
    if let Some(id) = except {
        select = select.filter(TagCategoryColumn::Id.ne(id));
    }
    if select.count(conn).await? > 0 {
        return Err(AppError::invalid_field(
            "name",
            format!("Tag category '{}' already exists", name),
        ));
    }
    Ok(())
}

async fn ensure_tag_name_free<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    name: &str,
    except: Option<i32>,
) -> Result<()> {
    let mut select = TagEntity::find()
        .filter(TagColumn::CategoryId.eq(category_id))
        .filter(TagColumn::Name.eq(name));
    if let Some(id) = except {
        select = select.filter(TagColumn::Id.ne(id));
    }
    if select.count(conn).await? > 0 {
        return Err(AppError::invalid_field(
            "name",
            format!("Tag '{}' already exists in this category", name),
        ));
    }
    Ok(())
}
