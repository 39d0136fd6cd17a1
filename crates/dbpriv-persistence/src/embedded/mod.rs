// Embedded persistence backend using RocksDB
// Provides standalone (single-node) storage without an external database

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dbpriv_common::ClusterType;
use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::{
    AccountInfo, AccountRuleInfo, AccountRulePatch, NewAccountRule, NewPrivLog, PrivLogInfo,
    RuleScope, StorageMode,
};
use crate::traits::{
    AccountPersistence, AccountRulePersistence, PersistenceService, PrivLogPersistence,
};

pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_ACCOUNT_RULES: &str = "account_rules";
pub const CF_PRIV_LOGS: &str = "priv_logs";
pub const CF_META: &str = "meta";

/// Standalone embedded persistence using RocksDB
///
/// Rows are stored as JSON under zero-padded id keys so that iteration order
/// matches id order. Id sequences live in the `meta` column family and are
/// advanced in the same write batch as the rows they number.
pub struct EmbeddedPersistService {
    db: Arc<DB>,
    /// Serializes read-modify-write sequences (id allocation, conditional updates)
    write_lock: Mutex<()>,
}

impl EmbeddedPersistService {
    /// Open (or create) a RocksDB database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ACCOUNT_RULES, Options::default()),
            ColumnFamilyDescriptor::new(CF_PRIV_LOGS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cfs)?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Create from a raw RocksDB instance that already has the column families
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Get a column family handle
    fn cf(&self, name: &str) -> anyhow::Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", name))
    }

    fn id_key(id: i64) -> String {
        format!("{:020}", id)
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, id: i64) -> anyhow::Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, Self::id_key(id).as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        id: i64,
        value: &T,
    ) -> anyhow::Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, Self::id_key(id).as_bytes(), serde_json::to_vec(value)?);
        Ok(())
    }

    /// Deserialize every row of a column family in id order
    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> anyhow::Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut items = Vec::new();

        let iter = self.db.iterator_cf(cf, IteratorMode::Start);
        for item in iter {
            let (_, value) = item.map_err(|e| anyhow::anyhow!("RocksDB iterator error: {}", e))?;
            items.push(serde_json::from_slice(&value)?);
        }

        Ok(items)
    }

    /// Reserve `count` consecutive ids for a column family.
    ///
    /// The advanced sequence is written through `batch`, so ids are only
    /// consumed when the batch commits. Caller must hold `write_lock`.
    fn allocate_ids(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        count: usize,
    ) -> anyhow::Result<Vec<i64>> {
        let meta = self.cf(CF_META)?;
        let seq_key = format!("seq:{}", cf_name);

        let current = match self.db.get_cf(meta, seq_key.as_bytes())? {
            Some(bytes) => std::str::from_utf8(&bytes)?.parse::<i64>()?,
            None => 0,
        };
        let last = current + count as i64;

        batch.put_cf(meta, seq_key.as_bytes(), last.to_string().as_bytes());
        Ok((current + 1..=last).collect())
    }

    fn create_account_locked(&self, account: AccountInfo) -> anyhow::Result<i64> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::default();

        let id = self.allocate_ids(&mut batch, CF_ACCOUNTS, 1)?[0];
        let account = AccountInfo { id, ..account };
        self.put_json(&mut batch, CF_ACCOUNTS, id, &account)?;

        self.db.write(batch)?;
        Ok(id)
    }

    fn create_rules_locked(&self, rules: Vec<NewAccountRule>) -> anyhow::Result<Vec<i64>> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::default();

        let ids = self.allocate_ids(&mut batch, CF_ACCOUNT_RULES, rules.len())?;
        for (id, rule) in ids.iter().zip(rules) {
            let info = AccountRuleInfo {
                id: *id,
                bk_biz_id: rule.bk_biz_id,
                cluster_type: rule.cluster_type,
                account_id: rule.account_id,
                dbname: rule.dbname,
                all_priv: rule.all_priv,
                dml_ddl_priv: rule.dml_ddl_priv,
                global_priv: rule.global_priv,
                operator: rule.creator.clone(),
                creator: rule.creator,
                create_time: rule.create_time,
                update_time: rule.create_time,
            };
            self.put_json(&mut batch, CF_ACCOUNT_RULES, *id, &info)?;
        }

        // One write batch: every row lands or none does
        self.db.write(batch)?;
        debug!(count = ids.len(), "inserted account rules");
        Ok(ids)
    }

    fn update_rule_locked(
        &self,
        scope: RuleScope,
        account_id: i64,
        id: i64,
        patch: &AccountRulePatch,
    ) -> anyhow::Result<u64> {
        let _guard = self.write_lock.lock();

        let Some(mut rule) = self.get_json::<AccountRuleInfo>(CF_ACCOUNT_RULES, id)? else {
            return Ok(0);
        };
        if !rule_in_scope(&rule, scope) || rule.account_id != account_id {
            return Ok(0);
        }

        rule.dbname = patch.dbname.clone();
        rule.all_priv = patch.all_priv.clone();
        rule.dml_ddl_priv = patch.dml_ddl_priv.clone();
        rule.global_priv = patch.global_priv.clone();
        rule.operator = patch.operator.clone();
        rule.update_time = patch.update_time;

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_ACCOUNT_RULES, id, &rule)?;
        self.db.write(batch)?;
        Ok(1)
    }

    fn delete_rules_locked(&self, scope: RuleScope, ids: &[i64]) -> anyhow::Result<u64> {
        let _guard = self.write_lock.lock();
        let cf = self.cf(CF_ACCOUNT_RULES)?;
        let mut batch = WriteBatch::default();
        let mut affected = 0;

        let unique: BTreeSet<i64> = ids.iter().copied().collect();
        for id in unique {
            if let Some(rule) = self.get_json::<AccountRuleInfo>(CF_ACCOUNT_RULES, id)? {
                if rule_in_scope(&rule, scope) {
                    batch.delete_cf(cf, Self::id_key(id).as_bytes());
                    affected += 1;
                }
            }
        }

        if affected > 0 {
            self.db.write(batch)?;
        }
        debug!(
            bk_biz_id = scope.bk_biz_id,
            requested = ids.len(),
            affected,
            "deleted account rules"
        );
        Ok(affected)
    }

    fn create_priv_log_locked(&self, log: NewPrivLog) -> anyhow::Result<i64> {
        let _guard = self.write_lock.lock();
        let mut batch = WriteBatch::default();

        let id = self.allocate_ids(&mut batch, CF_PRIV_LOGS, 1)?[0];
        let info = PrivLogInfo {
            id,
            bk_biz_id: log.bk_biz_id,
            ticket: log.ticket,
            operator: log.operator,
            para: log.para,
            execute_time: log.execute_time,
        };
        self.put_json(&mut batch, CF_PRIV_LOGS, id, &info)?;

        self.db.write(batch)?;
        Ok(id)
    }
}

fn rule_in_scope(rule: &AccountRuleInfo, scope: RuleScope) -> bool {
    rule.bk_biz_id == scope.bk_biz_id && rule.cluster_type == scope.cluster_type
}

#[async_trait]
impl PersistenceService for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Embedded
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        for name in [CF_ACCOUNTS, CF_ACCOUNT_RULES, CF_PRIV_LOGS, CF_META] {
            self.cf(name)?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountPersistence for EmbeddedPersistService {
    async fn account_count(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
    ) -> anyhow::Result<u64> {
        let found = self
            .get_json::<AccountInfo>(CF_ACCOUNTS, account_id)?
            .is_some_and(|a| a.bk_biz_id == bk_biz_id && a.cluster_type == cluster_type);
        Ok(u64::from(found))
    }

    async fn account_find_by_biz(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
    ) -> anyhow::Result<Vec<AccountInfo>> {
        let accounts = self
            .scan::<AccountInfo>(CF_ACCOUNTS)?
            .into_iter()
            .filter(|a| a.bk_biz_id == bk_biz_id && a.cluster_type == cluster_type)
            .collect();
        Ok(accounts)
    }

    async fn account_find_by_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        ids: &[i64],
    ) -> anyhow::Result<Vec<AccountInfo>> {
        let mut accounts = Vec::new();
        let unique: BTreeSet<i64> = ids.iter().copied().collect();
        for id in unique {
            if let Some(account) = self.get_json::<AccountInfo>(CF_ACCOUNTS, id)? {
                if account.bk_biz_id == bk_biz_id && account.cluster_type == cluster_type {
                    accounts.push(account);
                }
            }
        }
        Ok(accounts)
    }

    async fn account_create(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        user: &str,
        creator: &str,
    ) -> anyhow::Result<i64> {
        let account = AccountInfo {
            id: 0,
            bk_biz_id,
            cluster_type,
            user: user.to_string(),
            creator: creator.to_string(),
            create_time: chrono::Local::now().naive_local(),
        };
        self.create_account_locked(account)
    }
}

#[async_trait]
impl AccountRulePersistence for EmbeddedPersistService {
    async fn rule_find_by_account(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        rule_ids: Option<&[i64]>,
    ) -> anyhow::Result<Vec<AccountRuleInfo>> {
        let rules = self
            .scan::<AccountRuleInfo>(CF_ACCOUNT_RULES)?
            .into_iter()
            .filter(|r| {
                r.bk_biz_id == bk_biz_id
                    && r.cluster_type == cluster_type
                    && r.account_id == account_id
            })
            .filter(|r| rule_ids.is_none_or(|ids| ids.contains(&r.id)))
            .collect();
        Ok(rules)
    }

    async fn rule_find_account_ids(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        rule_ids: &[i64],
    ) -> anyhow::Result<Vec<i64>> {
        let mut account_ids = BTreeSet::new();
        for id in rule_ids {
            if let Some(rule) = self.get_json::<AccountRuleInfo>(CF_ACCOUNT_RULES, *id)? {
                if rule.bk_biz_id == bk_biz_id && rule.cluster_type == cluster_type {
                    account_ids.insert(rule.account_id);
                }
            }
        }
        Ok(account_ids.into_iter().collect())
    }

    async fn rule_find_by_dbname(
        &self,
        bk_biz_id: i64,
        cluster_type: ClusterType,
        account_id: i64,
        dbname: &str,
    ) -> anyhow::Result<Option<AccountRuleInfo>> {
        let rule = self
            .rule_find_by_account(bk_biz_id, cluster_type, account_id, None)
            .await?
            .into_iter()
            .find(|r| r.dbname == dbname);
        Ok(rule)
    }

    async fn rule_create_batch(&self, rules: Vec<NewAccountRule>) -> anyhow::Result<Vec<i64>> {
        if rules.is_empty() {
            return Ok(vec![]);
        }
        self.create_rules_locked(rules)
    }

    async fn rule_update(
        &self,
        scope: RuleScope,
        account_id: i64,
        id: i64,
        patch: &AccountRulePatch,
    ) -> anyhow::Result<u64> {
        self.update_rule_locked(scope, account_id, id, patch)
    }

    async fn rule_delete(&self, scope: RuleScope, ids: &[i64]) -> anyhow::Result<u64> {
        self.delete_rules_locked(scope, ids)
    }
}

#[async_trait]
impl PrivLogPersistence for EmbeddedPersistService {
    async fn priv_log_create(&self, log: NewPrivLog) -> anyhow::Result<i64> {
        self.create_priv_log_locked(log)
    }

    async fn priv_log_find_by_biz(
        &self,
        bk_biz_id: i64,
        limit: u64,
    ) -> anyhow::Result<Vec<PrivLogInfo>> {
        let cf = self.cf(CF_PRIV_LOGS)?;
        let mut logs = Vec::new();

        let iter = self.db.iterator_cf(cf, IteratorMode::End);
        for item in iter {
            if logs.len() as u64 >= limit {
                break;
            }
            let (_, value) = item.map_err(|e| anyhow::anyhow!("RocksDB iterator error: {}", e))?;
            let log: PrivLogInfo = serde_json::from_slice(&value)?;
            if log.bk_biz_id == bk_biz_id {
                logs.push(log);
            }
        }

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (EmbeddedPersistService, TempDir) {
        let tmp_dir = TempDir::new().unwrap();
        let service = EmbeddedPersistService::open(tmp_dir.path()).unwrap();
        (service, tmp_dir)
    }

    fn new_rule(account_id: i64, dbname: &str) -> NewAccountRule {
        NewAccountRule {
            bk_biz_id: 100,
            cluster_type: ClusterType::Mysql,
            account_id,
            dbname: dbname.to_string(),
            all_priv: "select,insert".to_string(),
            dml_ddl_priv: "select,insert".to_string(),
            global_priv: String::new(),
            creator: "admin".to_string(),
            create_time: chrono::Local::now().naive_local(),
        }
    }

    const MYSQL_100: RuleScope = RuleScope {
        bk_biz_id: 100,
        cluster_type: ClusterType::Mysql,
    };

    // ==================== Account Tests ====================

    #[tokio::test]
    async fn test_account_create_and_count() {
        let (svc, _tmp) = create_test_service();

        let id = svc
            .account_create(100, ClusterType::Mysql, "app_user", "admin")
            .await
            .unwrap();
        assert_eq!(id, 1);

        assert_eq!(svc.account_count(100, ClusterType::Mysql, id).await.unwrap(), 1);
        // Wrong business or cluster type does not count
        assert_eq!(svc.account_count(101, ClusterType::Mysql, id).await.unwrap(), 0);
        assert_eq!(
            svc.account_count(100, ClusterType::TendbCluster, id)
                .await
                .unwrap(),
            0
        );
        assert_eq!(svc.account_count(100, ClusterType::Mysql, 99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_account_find_by_biz_and_ids() {
        let (svc, _tmp) = create_test_service();

        let a = svc
            .account_create(100, ClusterType::Mysql, "u1", "admin")
            .await
            .unwrap();
        let b = svc
            .account_create(100, ClusterType::Mysql, "u2", "admin")
            .await
            .unwrap();
        svc.account_create(200, ClusterType::Mysql, "u3", "admin")
            .await
            .unwrap();

        let all = svc
            .account_find_by_biz(100, ClusterType::Mysql)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user, "u1");

        let picked = svc
            .account_find_by_ids(100, ClusterType::Mysql, &[b, b, 42])
            .await
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, b);
        assert_ne!(a, b);
    }

    // ==================== Rule Tests ====================

    #[tokio::test]
    async fn test_rule_batch_create_and_find() {
        let (svc, _tmp) = create_test_service();

        let ids = svc
            .rule_create_batch(vec![new_rule(1, "db1"), new_rule(1, "db2")])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let rules = svc
            .rule_find_by_account(100, ClusterType::Mysql, 1, None)
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].create_time, rules[0].update_time);
        assert_eq!(rules[0].operator, "admin");

        let only_second = svc
            .rule_find_by_account(100, ClusterType::Mysql, 1, Some(&[2]))
            .await
            .unwrap();
        assert_eq!(only_second.len(), 1);
        assert_eq!(only_second[0].dbname, "db2");

        let found = svc
            .rule_find_by_dbname(100, ClusterType::Mysql, 1, "db1")
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.id), Some(1));
        assert!(
            svc.rule_find_by_dbname(100, ClusterType::Mysql, 1, "db3")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rule_dbname_is_case_sensitive() {
        let (svc, _tmp) = create_test_service();

        svc.rule_create_batch(vec![new_rule(1, "db1"), new_rule(1, "DB1")])
            .await
            .unwrap();

        let upper = svc
            .rule_find_by_dbname(100, ClusterType::Mysql, 1, "DB1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(upper.id, 2);
        assert!(
            svc.rule_find_by_dbname(100, ClusterType::Mysql, 1, "Db1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rule_find_account_ids_distinct() {
        let (svc, _tmp) = create_test_service();

        svc.rule_create_batch(vec![new_rule(1, "a"), new_rule(1, "b"), new_rule(2, "c")])
            .await
            .unwrap();

        let ids = svc
            .rule_find_account_ids(100, ClusterType::Mysql, &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let none = svc
            .rule_find_account_ids(100, ClusterType::Sqlserver, &[1, 2, 3])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_rule_update_is_scoped() {
        let (svc, _tmp) = create_test_service();
        svc.rule_create_batch(vec![new_rule(1, "db1")]).await.unwrap();

        let patch = AccountRulePatch {
            dbname: "db9".to_string(),
            all_priv: "select".to_string(),
            dml_ddl_priv: "select".to_string(),
            global_priv: String::new(),
            operator: "bob".to_string(),
            update_time: chrono::Local::now().naive_local(),
        };

        // Wrong account or business: nothing changes
        assert_eq!(svc.rule_update(MYSQL_100, 2, 1, &patch).await.unwrap(), 0);
        let other_biz = RuleScope {
            bk_biz_id: 101,
            ..MYSQL_100
        };
        assert_eq!(svc.rule_update(other_biz, 1, 1, &patch).await.unwrap(), 0);
        assert_eq!(svc.rule_update(MYSQL_100, 1, 77, &patch).await.unwrap(), 0);

        assert_eq!(svc.rule_update(MYSQL_100, 1, 1, &patch).await.unwrap(), 1);
        let rule = svc
            .rule_find_by_account(100, ClusterType::Mysql, 1, None)
            .await
            .unwrap()
            .remove(0);
        assert_eq!(rule.dbname, "db9");
        assert_eq!(rule.all_priv, "select");
        assert_eq!(rule.operator, "bob");
        assert_eq!(rule.creator, "admin");
    }

    #[tokio::test]
    async fn test_rule_delete_counts_scoped_rows() {
        let (svc, _tmp) = create_test_service();
        svc.rule_create_batch(vec![new_rule(1, "db1"), new_rule(1, "db2")])
            .await
            .unwrap();

        let sqlserver = RuleScope {
            cluster_type: ClusterType::Sqlserver,
            ..MYSQL_100
        };
        assert_eq!(svc.rule_delete(sqlserver, &[1, 2]).await.unwrap(), 0);

        assert_eq!(svc.rule_delete(MYSQL_100, &[1, 1, 5]).await.unwrap(), 1);
        assert_eq!(svc.rule_delete(MYSQL_100, &[1]).await.unwrap(), 0);
        assert_eq!(
            svc.rule_find_by_account(100, ClusterType::Mysql, 1, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rule_ids_not_reused_after_delete() {
        let (svc, _tmp) = create_test_service();
        let ids = svc.rule_create_batch(vec![new_rule(1, "db1")]).await.unwrap();
        svc.rule_delete(MYSQL_100, &ids).await.unwrap();

        let next = svc.rule_create_batch(vec![new_rule(1, "db1")]).await.unwrap();
        assert_eq!(next, vec![2]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows_and_sequence() {
        let tmp_dir = TempDir::new().unwrap();
        {
            let svc = EmbeddedPersistService::open(tmp_dir.path()).unwrap();
            svc.rule_create_batch(vec![new_rule(1, "db1")]).await.unwrap();
        }

        let svc = EmbeddedPersistService::open(tmp_dir.path()).unwrap();
        let rules = svc
            .rule_find_by_account(100, ClusterType::Mysql, 1, None)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        let ids = svc.rule_create_batch(vec![new_rule(1, "db2")]).await.unwrap();
        assert_eq!(ids, vec![2]);
    }

    // ==================== Priv Log Tests ====================

    #[tokio::test]
    async fn test_priv_log_newest_first() {
        let (svc, _tmp) = create_test_service();

        for ticket in ["t1", "t2", "t3"] {
            svc.priv_log_create(NewPrivLog {
                bk_biz_id: 100,
                ticket: ticket.to_string(),
                operator: "admin".to_string(),
                para: "{}".to_string(),
                execute_time: chrono::Local::now().naive_local(),
            })
            .await
            .unwrap();
        }
        svc.priv_log_create(NewPrivLog {
            bk_biz_id: 200,
            ticket: "other".to_string(),
            operator: "admin".to_string(),
            para: "{}".to_string(),
            execute_time: chrono::Local::now().naive_local(),
        })
        .await
        .unwrap();

        let logs = svc.priv_log_find_by_biz(100, 2).await.unwrap();
        let tickets: Vec<&str> = logs.iter().map(|l| l.ticket.as_str()).collect();
        assert_eq!(tickets, vec!["t3", "t2"]);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (svc, _tmp) = create_test_service();
        assert!(svc.health_check().await.is_ok());
        assert_eq!(svc.storage_mode(), StorageMode::Embedded);
    }
}
