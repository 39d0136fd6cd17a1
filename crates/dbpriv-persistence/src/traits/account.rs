//! Account persistence trait

use async_trait::async_trait;
use dbpriv_common::ClusterType;

use crate::model::AccountInfo;

/// Account lookup operations
#[async_trait]
pub trait AccountPersistence: Send + Sync {
    /// Count accounts matching business, cluster type and id (0 or 1)
    async fn account_count(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
    ) -> anyhow::Result<u64>;

    /// List all accounts of a business and cluster type
    async fn account_find_by_biz(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
    ) -> anyhow::Result<Vec<AccountInfo>>;

    /// List accounts of a business and cluster type restricted to the given ids
    async fn account_find_by_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        ids: &[i64],
    ) -> anyhow::Result<Vec<AccountInfo>>;

    /// Create an account, returning its id
    async fn account_create(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        user: &str,
        creator: &str,
    ) -> anyhow::Result<i64>;
}
