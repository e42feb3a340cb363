//! `SeaORM` Entity for transactions table.
//!
//! Rows are append-only. A transfer writes two rows: the credit row on the
//! receiver (`from_account_id` set) and the debit row on the sender
//! (`to_account_id` and `related_transaction_id` set).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub transaction_id: i64,
    pub account_id: i64,
    pub transaction_category_id: Option<i64>,
    pub from_account_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub related_transaction_id: Option<i64>,
    /// `top_up`, `transfer` or `entry`.
    pub kind: String,
    pub amount: i64,
    pub transaction_date: DateTimeWithTimeZone,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::AccountId"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::transaction_categories::Entity",
        from = "Column::TransactionCategoryId",
        to = "super::transaction_categories::Column::TransactionCategoryId"
    )]
    TransactionCategories,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transaction_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
