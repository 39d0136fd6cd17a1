//! `SeaORM` Entity for tb_accounts table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tb_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bk_biz_id: i64,
    pub cluster_type: String,
    pub user: String,
    pub creator: String,
    pub create_time: DateTime,
    pub operator: String,
    pub update_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_rules::Entity")]
    AccountRules,
}

impl Related<super::account_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
