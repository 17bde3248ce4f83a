//! `SeaORM` Entity for reconciliation_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ReconciliationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub reconciliation_date: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub expected_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub calculated_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub difference: Decimal,
    pub currency: String,
    pub status: ReconciliationStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
