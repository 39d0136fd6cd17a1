//! `SeaORM` Entity for tb_account_rules table
//!
//! One row grants a privilege set on one database scope to one account.
//! `dbname` may be a literal database name or a `LIKE`-style pattern.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tb_account_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bk_biz_id: i64,
    pub cluster_type: String,
    pub account_id: i64,
    pub dbname: String,
    /// Combined privilege string across all categories
    #[sea_orm(column_name = "priv", column_type = "Text")]
    pub all_priv: String,
    #[sea_orm(column_type = "Text")]
    pub dml_ddl_priv: String,
    #[sea_orm(column_type = "Text")]
    pub global_priv: String,
    pub creator: String,
    pub create_time: DateTime,
    pub operator: String,
    pub update_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
