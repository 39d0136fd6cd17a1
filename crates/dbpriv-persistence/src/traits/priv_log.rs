//! Audit log persistence trait

use async_trait::async_trait;

use crate::model::{NewPrivLog, PrivLogInfo};

#[async_trait]
pub trait PrivLogPersistence: Send + Sync {
    /// Append an audit record, returning its id
    async fn priv_log_create(&self, log: NewPrivLog) -> anyhow::Result<i64>;

    /// Most recent audit records of a business, newest first
    async fn priv_log_find_by_biz(
        &self,
        bk_biz_id: i64,
        limit: u64,
    ) -> anyhow::Result<Vec<PrivLogInfo>>;
}
