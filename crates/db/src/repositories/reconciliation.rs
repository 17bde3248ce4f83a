//! Reconciliation record repository.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::reconciliation_records;

/// Data access for the append-only `reconciliation_records` table.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a record by ID.
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<reconciliation_records::Model>, DbErr> {
        reconciliation_records::Entity::find_by_id(id).one(&self.db).await
    }

    /// History of an account, newest first.
    pub async fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<reconciliation_records::Model>, DbErr> {
        reconciliation_records::Entity::find()
            .filter(reconciliation_records::Column::AccountId.eq(account_id))
            .order_by_desc(reconciliation_records::Column::CreatedAt)
            .order_by_desc(reconciliation_records::Column::Id)
            .all(&self.db)
            .await
    }

    /// Every record, newest first.
    pub async fn list_all(&self) -> Result<Vec<reconciliation_records::Model>, DbErr> {
        reconciliation_records::Entity::find()
            .order_by_desc(reconciliation_records::Column::CreatedAt)
            .order_by_desc(reconciliation_records::Column::Id)
            .all(&self.db)
            .await
    }

    /// Appends a record.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: reconciliation_records::Model,
    ) -> Result<(), DbErr> {
        reconciliation_records::Entity::insert(model.into_active_model())
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }
}
