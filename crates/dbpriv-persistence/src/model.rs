//! Domain model types for the persistence abstraction layer
//!
//! These types are used as arguments and return values of the persistence
//! traits, decoupled from specific storage backends.

use chrono::NaiveDateTime;
use dbpriv_common::ClusterType;
use serde::{Deserialize, Serialize};

/// Account identity under a business / cluster scope
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: i64,
    pub bk_biz_id: i64,
    pub cluster_type: ClusterType,
    pub user: String,
    pub creator: String,
    pub create_time: NaiveDateTime,
}

/// Stored account rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRuleInfo {
    pub id: i64,
    pub bk_biz_id: i64,
    pub cluster_type: ClusterType,
    pub account_id: i64,
    pub dbname: String,
    #[serde(rename = "priv")]
    pub all_priv: String,
    pub dml_ddl_priv: String,
    pub global_priv: String,
    pub creator: String,
    pub create_time: NaiveDateTime,
    pub operator: String,
    pub update_time: NaiveDateTime,
}

/// Row to insert for a new account rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccountRule {
    pub bk_biz_id: i64,
    pub cluster_type: ClusterType,
    pub account_id: i64,
    pub dbname: String,
    pub all_priv: String,
    pub dml_ddl_priv: String,
    pub global_priv: String,
    pub creator: String,
    pub create_time: NaiveDateTime,
}

/// Full replacement of the mutable fields of an account rule.
///
/// Every field is written, so an empty string clears the stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRulePatch {
    pub dbname: String,
    pub all_priv: String,
    pub dml_ddl_priv: String,
    pub global_priv: String,
    pub operator: String,
    pub update_time: NaiveDateTime,
}

/// Selects which rows a conditional rule update or delete may touch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleScope {
    pub bk_biz_id: i64,
    pub cluster_type: ClusterType,
}

/// Stored audit record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivLogInfo {
    pub id: i64,
    pub bk_biz_id: i64,
    pub ticket: String,
    pub operator: String,
    pub para: String,
    pub execute_time: NaiveDateTime,
}

/// Audit record to append
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrivLog {
    pub bk_biz_id: i64,
    pub ticket: String,
    pub operator: String,
    pub para: String,
    pub execute_time: NaiveDateTime,
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    #[default]
    ExternalDb,
    /// Standalone embedded RocksDB (single node, no external DB)
    Embedded,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::ExternalDb => "external_db",
            StorageMode::Embedded => "embedded",
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" | "mysql" | "postgresql" => Ok(StorageMode::ExternalDb),
            "embedded" | "rocksdb" => Ok(StorageMode::Embedded),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mode_parse() {
        assert_eq!(
            "embedded".parse::<StorageMode>().unwrap(),
            StorageMode::Embedded
        );
        assert_eq!(
            "mysql".parse::<StorageMode>().unwrap(),
            StorageMode::ExternalDb
        );
        assert!("memory".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_rule_serializes_priv_field() {
        let now = chrono::Utc::now().naive_utc();
        let rule = AccountRuleInfo {
            id: 1,
            bk_biz_id: 100,
            cluster_type: ClusterType::Mysql,
            account_id: 7,
            dbname: "db%".to_string(),
            all_priv: "select,insert".to_string(),
            dml_ddl_priv: "select,insert".to_string(),
            global_priv: String::new(),
            creator: "admin".to_string(),
            create_time: now,
            operator: "admin".to_string(),
            update_time: now,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["priv"], "select,insert");
        assert_eq!(json["cluster_type"], "mysql");
    }
}
