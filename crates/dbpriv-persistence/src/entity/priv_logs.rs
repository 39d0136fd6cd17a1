//! Privilege operation log entity for audit logging
//!
//! One row per successful account rule mutation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tb_priv_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bk_biz_id: i64,
    /// Ticket or request id that triggered the change
    pub ticket: String,
    pub operator: String,
    /// Serialized request payload
    #[sea_orm(column_type = "Text")]
    pub para: String,
    pub execute_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
