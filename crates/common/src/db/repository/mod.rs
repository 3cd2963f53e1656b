//! Repository pattern for database operations
//!
//! Every operation takes the calling [`Principal`] and applies the
//! visibility policy itself. Mutations run inside a transaction that is
//! committed on success and rolled back when dropped on an error path.

mod fields;
mod participants;
mod records;
mod stats;
mod tags;
mod users;

pub use fields::{FieldInput, FieldListParams, FieldPatch};
pub use participants::{ParticipantInput, ParticipantListParams, ParticipantPatch};
pub use records::NewRecordImage;
pub use stats::{ActivityKind, OverviewStats, RecentActivities, RecentActivity, RecentActivityParams};
pub use tags::{
    CategoryWithCount, TagCategoryInput, TagCategoryPatch, TagInput, TagListParams, TagPatch,
    TagView,
};
pub use users::{NewUser, UserListParams};

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Start a transaction on the primary
    async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.write_conn().begin().await?)
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
