//! Entry repository.
//!
//! Entries are append-only. The database trigger rejects updates and deletes.

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entities::entries;

/// Data access for the `entries` table.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    db: DatabaseConnection,
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Entries of an account, oldest first.
    pub async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id))
            .order_by_asc(entries::Column::CreatedAt)
            .order_by_asc(entries::Column::Id)
            .all(&self.db)
            .await
    }

    /// Entries of an account created at or before `cutoff`, oldest first.
    pub async fn list_by_account_up_to(
        &self,
        account_id: Uuid,
        cutoff: DateTime<FixedOffset>,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id))
            .filter(entries::Column::CreatedAt.lte(cutoff))
            .order_by_asc(entries::Column::CreatedAt)
            .order_by_asc(entries::Column::Id)
            .all(&self.db)
            .await
    }

    /// The `limit` most recent entries of an account, newest first.
    pub async fn list_recent_by_account(
        &self,
        account_id: Uuid,
        limit: u64,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id))
            .order_by_desc(entries::Column::CreatedAt)
            .order_by_desc(entries::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }

    /// Entries produced by one operation.
    pub async fn list_by_operation(
        &self,
        operation_id: Uuid,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::OperationId.eq(operation_id))
            .order_by_asc(entries::Column::CreatedAt)
            .order_by_asc(entries::Column::Id)
            .all(&self.db)
            .await
    }

    /// Inserts entry rows in one statement.
    pub async fn insert_many<C: ConnectionTrait>(
        conn: &C,
        models: Vec<entries::Model>,
    ) -> Result<(), DbErr> {
        if models.is_empty() {
            return Ok(());
        }

        entries::Entity::insert_many(models.into_iter().map(IntoActiveModel::into_active_model))
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }
}
