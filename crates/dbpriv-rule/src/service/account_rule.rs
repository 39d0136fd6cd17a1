//! Account rule operations
//!
//! Every operation re-reads the backing store; no rule state is cached
//! between calls. Mutations append an audit record after they succeed.

use std::sync::Arc;

use dbpriv_common::{ClusterType, PrivError, split_dbnames};
use dbpriv_persistence::{
    AccountPersistence, AccountRulePatch, AccountRulePersistence, NewAccountRule,
    PersistenceService, RuleScope,
};
use tokio::task::JoinHandle;
use tracing::info;

use super::RuleServiceConfig;
use crate::audit::{AuditSink, priv_log};
use crate::model::{
    AccountRuleGroup, AccountRulePara, AccountRuleQueryResult, DeleteAccountRuleRequest,
    QueryAccountRuleRequest,
};
use crate::policy::{PrivilegeSet, allowed_tokens, split_privileges};
use crate::preflight;

pub struct AccountRuleService {
    persistence: Arc<dyn PersistenceService>,
    audit: AuditSink,
    audit_task: Option<JoinHandle<()>>,
    default_cluster_type: ClusterType,
}

impl AccountRuleService {
    /// Create the service and start its audit writer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(persistence: Arc<dyn PersistenceService>, config: &RuleServiceConfig) -> Self {
        let (audit, audit_task) = AuditSink::spawn(persistence.clone(), config.audit_queue_capacity);
        Self {
            persistence,
            audit,
            audit_task: Some(audit_task),
            default_cluster_type: config.default_cluster_type,
        }
    }

    /// Create the service around an audit sink owned by the caller
    pub fn with_audit_sink(
        persistence: Arc<dyn PersistenceService>,
        audit: AuditSink,
        config: &RuleServiceConfig,
    ) -> Self {
        Self {
            persistence,
            audit,
            audit_task: None,
            default_cluster_type: config.default_cluster_type,
        }
    }

    /// Stop accepting audit records and wait until queued ones are written
    pub async fn shutdown(self) {
        let Self {
            audit, audit_task, ..
        } = self;
        drop(audit);
        if let Some(task) = audit_task {
            let _ = task.await;
        }
    }

    /// The only place an unset cluster type gets its default
    pub fn resolve_cluster_type(&self, cluster_type: Option<ClusterType>) -> ClusterType {
        cluster_type.unwrap_or(self.default_cluster_type)
    }

    /// Validate the fields shared by Add, AddDryRun and Modify and derive the
    /// stored privilege strings
    pub fn pre_check(&self, para: &AccountRulePara) -> anyhow::Result<(ClusterType, PrivilegeSet)> {
        if para.bk_biz_id == 0 {
            return Err(PrivError::BkBizIdIsEmpty.into());
        }
        if para.account_id == 0 {
            return Err(PrivError::AccountIdNull.into());
        }
        if para.dbname.trim().is_empty() {
            return Err(PrivError::DbNameNull.into());
        }

        let cluster_type = self.resolve_cluster_type(para.cluster_type);

        let privileges = split_privileges(cluster_type, &para.privileges);
        if privileges.is_empty() {
            return Err(PrivError::PrivNull.into());
        }

        let (rejected, ok) = allowed_tokens(cluster_type, &privileges.all);
        if !ok {
            return Err(PrivError::DisallowedPrivileges {
                cluster_type: cluster_type.to_string(),
                privileges: rejected,
            }
            .into());
        }

        Ok((cluster_type, privileges))
    }

    /// Rules grouped by account. `count` is the number of rules returned.
    pub async fn query(
        &self,
        req: &QueryAccountRuleRequest,
    ) -> anyhow::Result<AccountRuleQueryResult> {
        if req.bk_biz_id == 0 {
            return Err(PrivError::BkBizIdIsEmpty.into());
        }
        let cluster_type = self.resolve_cluster_type(req.cluster_type);
        let rule_ids = req.rule_ids.as_deref().filter(|ids| !ids.is_empty());

        let accounts = match rule_ids {
            Some(ids) => {
                let account_ids = self
                    .persistence
                    .rule_find_account_ids(req.bk_biz_id, cluster_type, ids)
                    .await?;
                if account_ids.is_empty() {
                    return Ok(AccountRuleQueryResult::default());
                }
                self.persistence
                    .account_find_by_ids(req.bk_biz_id, cluster_type, &account_ids)
                    .await?
            }
            None => {
                self.persistence
                    .account_find_by_biz(req.bk_biz_id, cluster_type)
                    .await?
            }
        };

        let mut items = Vec::with_capacity(accounts.len());
        let mut count = 0u64;
        for account in accounts {
            let rules = self
                .persistence
                .rule_find_by_account(req.bk_biz_id, cluster_type, account.id, rule_ids)
                .await?;
            count += rules.len() as u64;
            items.push(AccountRuleGroup { account, rules });
        }

        Ok(AccountRuleQueryResult { items, count })
    }

    /// Create one rule per database in `para.dbname`, all or none
    pub async fn add(&self, para: &AccountRulePara, ticket: &str) -> anyhow::Result<()> {
        let (cluster_type, privileges) = self.pre_check(para)?;
        let dbs = split_dbnames(&para.dbname)?;

        preflight::check(
            self.persistence.as_ref(),
            para.bk_biz_id,
            para.account_id,
            cluster_type,
            &dbs,
            false,
        )
        .await?;

        let now = chrono::Local::now().naive_local();
        let rules = dbs
            .iter()
            .map(|db| NewAccountRule {
                bk_biz_id: para.bk_biz_id,
                cluster_type,
                account_id: para.account_id,
                dbname: db.clone(),
                all_priv: privileges.all.clone(),
                dml_ddl_priv: privileges.dml_ddl.clone(),
                global_priv: privileges.global.clone(),
                creator: para.operator.clone(),
                create_time: now,
            })
            .collect();
        let ids = self.persistence.rule_create_batch(rules).await?;

        info!(
            bk_biz_id = para.bk_biz_id,
            account_id = para.account_id,
            cluster_type = %cluster_type,
            ticket = %ticket,
            rules = ids.len(),
            "account rules added"
        );
        self.audit
            .record(priv_log(para.bk_biz_id, ticket, &para.operator, para));

        Ok(())
    }

    /// Run every check of [`add`](Self::add) including overlap advisories,
    /// without writing.
    ///
    /// `Ok(())` means the request passes, and so may also be forced. On
    /// failure, use [`dbpriv_common::allows_force`] on the error to learn
    /// whether an operator may force the request through.
    pub async fn add_dry_run(&self, para: &AccountRulePara) -> anyhow::Result<()> {
        let (cluster_type, _) = self.pre_check(para)?;
        let dbs = split_dbnames(&para.dbname)?;

        preflight::check(
            self.persistence.as_ref(),
            para.bk_biz_id,
            para.account_id,
            cluster_type,
            &dbs,
            true,
        )
        .await
    }

    /// Replace the scope and privileges of rule `para.id`
    pub async fn modify(&self, para: &AccountRulePara, ticket: &str) -> anyhow::Result<()> {
        let (cluster_type, privileges) = self.pre_check(para)?;
        if para.id == 0 {
            return Err(PrivError::AccountRuleIdNull.into());
        }

        let dbname = para.dbname.trim();
        if dbname.contains(|c: char| c.is_whitespace() || c == ',' || c == ';') {
            return Err(PrivError::OnlyOneDatabaseAllowed.into());
        }

        // The new scope may belong to this rule but not to a sibling
        let owner = self
            .persistence
            .rule_find_by_dbname(para.bk_biz_id, cluster_type, para.account_id, dbname)
            .await?;
        if owner.is_some_and(|rule| rule.id != para.id) {
            return Err(PrivError::AccountRuleExisted.into());
        }

        let patch = AccountRulePatch {
            dbname: dbname.to_string(),
            all_priv: privileges.all,
            dml_ddl_priv: privileges.dml_ddl,
            global_priv: privileges.global,
            operator: para.operator.clone(),
            update_time: chrono::Local::now().naive_local(),
        };
        let scope = RuleScope {
            bk_biz_id: para.bk_biz_id,
            cluster_type,
        };
        let affected = self
            .persistence
            .rule_update(scope, para.account_id, para.id, &patch)
            .await?;
        if affected == 0 {
            return Err(PrivError::AccountRuleNotExisted.into());
        }

        info!(
            bk_biz_id = para.bk_biz_id,
            account_id = para.account_id,
            rule_id = para.id,
            ticket = %ticket,
            "account rule modified"
        );
        self.audit
            .record(priv_log(para.bk_biz_id, ticket, &para.operator, para));

        Ok(())
    }

    /// Delete rules by id within the request's business and cluster type
    pub async fn delete(&self, req: &DeleteAccountRuleRequest, ticket: &str) -> anyhow::Result<()> {
        if req.bk_biz_id == 0 {
            return Err(PrivError::BkBizIdIsEmpty.into());
        }
        if req.ids.is_empty() {
            return Err(PrivError::AccountRuleIdNull.into());
        }
        let scope = RuleScope {
            bk_biz_id: req.bk_biz_id,
            cluster_type: self.resolve_cluster_type(req.cluster_type),
        };

        let affected = self.persistence.rule_delete(scope, &req.ids).await?;
        if affected == 0 {
            return Err(PrivError::AccountRuleNotExisted.into());
        }

        info!(
            bk_biz_id = req.bk_biz_id,
            cluster_type = %scope.cluster_type,
            ticket = %ticket,
            requested = req.ids.len(),
            deleted = affected,
            "account rules deleted"
        );
        self.audit
            .record(priv_log(req.bk_biz_id, ticket, &req.operator, req));

        Ok(())
    }
}
