//! Offset/limit windows with an exact total

use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Raw `skip`/`limit` query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Validated window `[skip, skip + limit)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}

impl PageParams {
    /// Reject out-of-range values instead of clamping them
    pub fn window(self) -> Result<PageWindow> {
        if self.skip < 0 {
            return Err(AppError::invalid_field("skip", "skip must be >= 0"));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(AppError::invalid_field(
                "limit",
                format!("limit must be between 1 and {}", MAX_LIMIT),
            ));
        }
        Ok(PageWindow {
            skip: self.skip as u64,
            limit: self.limit as u64,
        })
    }
}

/// One page of results plus the size of the whole filtered set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            skip: self.skip,
            limit: self.limit,
        }
    }

    /// Replace the items, keeping the window and total
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            total: self.total,
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// Count the filtered set, then fetch the window.
///
/// The count runs on the unwindowed select, so it is independent of
/// `skip`/`limit`. A window past the end yields no items and the true total.
pub async fn paginate<E, C>(select: Select<E>, conn: &C, window: PageWindow) -> Result<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: ConnectionTrait,
{
    let total = select.clone().count(conn).await?;
    let items = select
        .offset(window.skip)
        .limit(window.limit)
        .all(conn)
        .await?;

    Ok(Page {
        items,
        total,
        skip: window.skip,
        limit: window.limit,
    })
}
