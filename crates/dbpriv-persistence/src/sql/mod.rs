//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! This module implements the persistence traits with direct SeaORM queries
//! against the `tb_accounts`, `tb_account_rules` and `tb_priv_logs` tables.

use async_trait::async_trait;
use dbpriv_common::ClusterType;
use sea_orm::{prelude::Expr, *};
use tracing::debug;

use crate::entity::{account_rules, accounts, priv_logs};
use crate::model::*;
use crate::traits::*;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// by delegating to direct database queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn account_entity_to_info(model: accounts::Model) -> anyhow::Result<AccountInfo> {
    Ok(AccountInfo {
        id: model.id,
        bk_biz_id: model.bk_biz_id,
        cluster_type: model.cluster_type.parse()?,
        user: model.user,
        creator: model.creator,
        create_time: model.create_time,
    })
}

fn rule_entity_to_info(model: account_rules::Model) -> anyhow::Result<AccountRuleInfo> {
    Ok(AccountRuleInfo {
        id: model.id,
        bk_biz_id: model.bk_biz_id,
        cluster_type: model.cluster_type.parse()?,
        account_id: model.account_id,
        dbname: model.dbname,
        all_priv: model.all_priv,
        dml_ddl_priv: model.dml_ddl_priv,
        global_priv: model.global_priv,
        creator: model.creator,
        create_time: model.create_time,
        operator: model.operator,
        update_time: model.update_time,
    })
}

fn priv_log_entity_to_info(model: priv_logs::Model) -> PrivLogInfo {
    PrivLogInfo {
        id: model.id,
        bk_biz_id: model.bk_biz_id,
        ticket: model.ticket,
        operator: model.operator,
        para: model.para,
        execute_time: model.execute_time,
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Execute a simple query to verify connectivity
        accounts::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i64>()
            .one(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================================================
// AccountPersistence implementation
// ============================================================================

#[async_trait]
impl AccountPersistence for ExternalDbPersistService {
    async fn account_count(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
    ) -> anyhow::Result<u64> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::BkBizId.eq(bk_biz_id))
            .filter(accounts::Column::ClusterType.eq(cluster_type.as_str()))
            .filter(accounts::Column::Id.eq(account_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    async fn account_find_by_biz(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
    ) -> anyhow::Result<Vec<AccountInfo>> {
        accounts::Entity::find()
            .filter(accounts::Column::BkBizId.eq(bk_biz_id))
            .filter(accounts::Column::ClusterType.eq(cluster_type.as_str()))
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(account_entity_to_info)
            .collect()
    }

    async fn account_find_by_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        ids: &[i64],
    ) -> anyhow::Result<Vec<AccountInfo>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        accounts::Entity::find()
            .filter(accounts::Column::BkBizId.eq(bk_biz_id))
            .filter(accounts::Column::ClusterType.eq(cluster_type.as_str()))
            .filter(accounts::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(account_entity_to_info)
            .collect()
    }

    async fn account_create(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        user: &str,
        creator: &str,
    ) -> anyhow::Result<i64> {
        let now = chrono::Local::now().naive_local();
        let entity = accounts::ActiveModel {
            bk_biz_id: Set(bk_biz_id),
            cluster_type: Set(cluster_type.as_str().to_string()),
            user: Set(user.to_string()),
            creator: Set(creator.to_string()),
            create_time: Set(now),
            operator: Set(creator.to_string()),
            update_time: Set(now),
            ..Default::default()
        };

        let result = accounts::Entity::insert(entity).exec(&self.db).await?;
        Ok(result.last_insert_id)
    }
}

// ============================================================================
// AccountRulePersistence implementation
// ============================================================================

#[async_trait]
impl AccountRulePersistence for ExternalDbPersistService {
    async fn rule_find_by_account(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        rule_ids: Option<&[i64]>,
    ) -> anyhow::Result<Vec<AccountRuleInfo>> {
        let mut query = account_rules::Entity::find()
            .filter(account_rules::Column::BkBizId.eq(bk_biz_id))
            .filter(account_rules::Column::ClusterType.eq(cluster_type.as_str()))
            .filter(account_rules::Column::AccountId.eq(account_id));

        if let Some(ids) = rule_ids {
            query = query.filter(account_rules::Column::Id.is_in(ids.to_vec()));
        }

        query
            .order_by_asc(account_rules::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(rule_entity_to_info)
            .collect()
    }

    async fn rule_find_account_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        rule_ids: &[i64],
    ) -> anyhow::Result<Vec<i64>> {
        if rule_ids.is_empty() {
            return Ok(vec![]);
        }

        let account_ids = account_rules::Entity::find()
            .select_only()
            .column(account_rules::Column::AccountId)
            .distinct()
            .filter(account_rules::Column::BkBizId.eq(bk_biz_id))
            .filter(account_rules::Column::ClusterType.eq(cluster_type.as_str()))
            .filter(account_rules::Column::Id.is_in(rule_ids.to_vec()))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;

        Ok(account_ids)
    }

    async fn rule_find_by_dbname(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        dbname: &str,
    ) -> anyhow::Result<Option<AccountRuleInfo>> {
        account_rules::Entity::find()
            .filter(account_rules::Column::BkBizId.eq(bk_biz_id))
            .filter(account_rules::Column::ClusterType.eq(cluster_type.as_str()))
            .filter(account_rules::Column::AccountId.eq(account_id))
            .filter(account_rules::Column::Dbname.eq(dbname))
            .one(&self.db)
            .await?
            .map(rule_entity_to_info)
            .transpose()
    }

    async fn rule_create_batch(&self, rules: Vec<NewAccountRule>) -> anyhow::Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(rules.len());
        debug!(count = rules.len(), "inserting account rules");

        // Dropping the transaction on an early return rolls back every row
        let tx = self.db.begin().await?;
        for rule in rules {
            let entity = account_rules::ActiveModel {
                bk_biz_id: Set(rule.bk_biz_id),
                cluster_type: Set(rule.cluster_type.as_str().to_string()),
                account_id: Set(rule.account_id),
                dbname: Set(rule.dbname),
                all_priv: Set(rule.all_priv),
                dml_ddl_priv: Set(rule.dml_ddl_priv),
                global_priv: Set(rule.global_priv),
                creator: Set(rule.creator.clone()),
                create_time: Set(rule.create_time),
                operator: Set(rule.creator),
                update_time: Set(rule.create_time),
                ..Default::default()
            };
            let result = account_rules::Entity::insert(entity).exec(&tx).await?;
            ids.push(result.last_insert_id);
        }
        tx.commit().await?;

        Ok(ids)
    }

    async fn rule_update(
        &self,
        scope: RuleScope,
        account_id: i64,
        id: i64,
        patch: &AccountRulePatch,
    ) -> anyhow::Result<u64> {
        let entity = account_rules::ActiveModel {
            dbname: Set(patch.dbname.clone()),
            all_priv: Set(patch.all_priv.clone()),
            dml_ddl_priv: Set(patch.dml_ddl_priv.clone()),
            global_priv: Set(patch.global_priv.clone()),
            operator: Set(patch.operator.clone()),
            update_time: Set(patch.update_time),
            ..Default::default()
        };

        let result = account_rules::Entity::update_many()
            .set(entity)
            .filter(account_rules::Column::Id.eq(id))
            .filter(account_rules::Column::BkBizId.eq(scope.bk_biz_id))
            .filter(account_rules::Column::ClusterType.eq(scope.cluster_type.as_str()))
            .filter(account_rules::Column::AccountId.eq(account_id))
            .exec(&self.db)
            .await?;

        debug!(
            id,
            account_id,
            rows_affected = result.rows_affected,
            "updated account rule"
        );
        Ok(result.rows_affected)
    }

    async fn rule_delete(&self, scope: RuleScope, ids: &[i64]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        // All three conditions go into one statement
        let result = account_rules::Entity::delete_many()
            .filter(account_rules::Column::Id.is_in(ids.to_vec()))
            .filter(account_rules::Column::BkBizId.eq(scope.bk_biz_id))
            .filter(account_rules::Column::ClusterType.eq(scope.cluster_type.as_str()))
            .exec(&self.db)
            .await?;

        debug!(
            bk_biz_id = scope.bk_biz_id,
            requested = ids.len(),
            rows_affected = result.rows_affected,
            "deleted account rules"
        );
        Ok(result.rows_affected)
    }
}

// ============================================================================
// PrivLogPersistence implementation
// ============================================================================

#[async_trait]
impl PrivLogPersistence for ExternalDbPersistService {
    async fn priv_log_create(&self, log: NewPrivLog) -> anyhow::Result<i64> {
        let entity = priv_logs::ActiveModel {
            bk_biz_id: Set(log.bk_biz_id),
            ticket: Set(log.ticket),
            operator: Set(log.operator),
            para: Set(log.para),
            execute_time: Set(log.execute_time),
            ..Default::default()
        };

        let inserted = entity.insert(&self.db).await?;
        Ok(inserted.id)
    }

    async fn priv_log_find_by_biz(
        &self,
        bk_biz_id: i64,
        limit: u64,
    ) -> anyhow::Result<Vec<PrivLogInfo>> {
        let logs = priv_logs::Entity::find()
            .filter(priv_logs::Column::BkBizId.eq(bk_biz_id))
            .order_by_desc(priv_logs::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(priv_log_entity_to_info)
            .collect();

        Ok(logs)
    }
}
