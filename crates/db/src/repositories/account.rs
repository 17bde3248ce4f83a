//! Account repository.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, PaginatorTrait,
};
use uuid::Uuid;

use crate::entities::accounts;

/// Data access for the `accounts` table.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an account by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id).one(&self.db).await
    }

    /// Counts registered accounts.
    pub async fn count(&self) -> Result<u64, DbErr> {
        accounts::Entity::find().count(&self.db).await
    }

    /// Inserts an account row.
    pub async fn insert<C: ConnectionTrait>(conn: &C, model: accounts::Model) -> Result<(), DbErr> {
        accounts::Entity::insert(model.into_active_model())
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// Deletes an account. Returns false when no row matched.
    ///
    /// Fails with a foreign key violation while entries reference the account.
    pub async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<bool, DbErr> {
        let result = accounts::Entity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }
}
