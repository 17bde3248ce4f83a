//! Operation repository.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, QueryFilter,
};
use uuid::Uuid;

use crate::entities::operations;

/// Data access for the `operations` table.
#[derive(Debug, Clone)]
pub struct OperationRepository {
    db: DatabaseConnection,
}

impl OperationRepository {
    /// Creates a new operation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an operation by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<operations::Model>, DbErr> {
        operations::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds the operation owning an idempotency key.
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<operations::Model>, DbErr> {
        operations::Entity::find()
            .filter(operations::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
    }

    /// Inserts an operation row.
    ///
    /// A second row with the same key violates `uq_operations_idempotency_key`.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: operations::Model,
    ) -> Result<(), DbErr> {
        operations::Entity::insert(model.into_active_model())
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// Writes the status columns of an existing row.
    pub async fn update_status<C: ConnectionTrait>(
        conn: &C,
        model: operations::Model,
    ) -> Result<(), DbErr> {
        operations::ActiveModel {
            id: Unchanged(model.id),
            status: Set(model.status),
            processed_at: Set(model.processed_at),
            failure_reason: Set(model.failure_reason),
            ..Default::default()
        }
        .update(conn)
        .await?;
        Ok(())
    }

    /// Deletes an operation. Returns false when no row matched.
    pub async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<bool, DbErr> {
        let result = operations::Entity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }
}
