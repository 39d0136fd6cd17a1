//! Account rule persistence trait
//!
//! All reads are scoped by (business, cluster type, account). Writes are
//! either one atomic batch or one conditional statement whose affected-row
//! count is returned to the caller.

use async_trait::async_trait;
use dbpriv_common::ClusterType;

use crate::model::{AccountRuleInfo, AccountRulePatch, NewAccountRule, RuleScope};

#[async_trait]
pub trait AccountRulePersistence: Send + Sync {
    /// Find the rules of one account, optionally restricted to rule ids
    async fn rule_find_by_account(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        rule_ids: Option<&[i64]>,
    ) -> anyhow::Result<Vec<AccountRuleInfo>>;

    /// Distinct account ids owning any of the given rule ids
    async fn rule_find_account_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        rule_ids: &[i64],
    ) -> anyhow::Result<Vec<i64>>;

    /// Find the rule of an account on an exact database scope
    async fn rule_find_by_dbname(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        dbname: &str,
    ) -> anyhow::Result<Option<AccountRuleInfo>>;

    /// Insert all rules or none of them, returning the new ids in input order
    async fn rule_create_batch(&self, rules: Vec<NewAccountRule>) -> anyhow::Result<Vec<i64>>;

    /// Overwrite the mutable fields of one rule, returning affected rows
    async fn rule_update(
        &self,
        scope: RuleScope,
        account_id: i64,
        id: i64,
        patch: &AccountRulePatch,
    ) -> anyhow::Result<u64>;

    /// Delete rules by id within a business and cluster type, returning affected rows
    async fn rule_delete(&self, scope: RuleScope, ids: &[i64]) -> anyhow::Result<u64>;
}
