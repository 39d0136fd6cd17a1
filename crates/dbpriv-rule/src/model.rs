//! Request and response types of the account rule service

use std::collections::BTreeMap;

use dbpriv_common::ClusterType;
use dbpriv_persistence::{AccountInfo, AccountRuleInfo};
use serde::{Deserialize, Serialize};

/// Parameters of Add, AddDryRun and Modify
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRulePara {
    /// Rule id, only used by Modify
    #[serde(default)]
    pub id: i64,
    pub bk_biz_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<ClusterType>,
    pub account_id: i64,
    /// One database scope, or several separated by whitespace, `,` or `;`
    pub dbname: String,
    /// Privileges keyed by category (`dml`, `ddl`, `global`, ...)
    #[serde(rename = "priv", default)]
    pub privileges: BTreeMap<String, String>,
    #[serde(default)]
    pub operator: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAccountRuleRequest {
    pub bk_biz_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<ClusterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_ids: Option<Vec<i64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccountRuleRequest {
    pub bk_biz_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<ClusterType>,
    #[serde(rename = "id")]
    pub ids: Vec<i64>,
    #[serde(default)]
    pub operator: String,
}

/// Rules of one account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRuleGroup {
    pub account: AccountInfo,
    pub rules: Vec<AccountRuleInfo>,
}

/// Result of a rule query; `count` is the number of rules, not accounts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRuleQueryResult {
    pub items: Vec<AccountRuleGroup>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_para_deserialize() {
        let json = r#"{
            "bk_biz_id": 100,
            "account_id": 3,
            "dbname": "db1 db2",
            "priv": {"dml": "select", "global": ""},
            "operator": "admin"
        }"#;
        let para: AccountRulePara = serde_json::from_str(json).unwrap();
        assert_eq!(para.id, 0);
        assert_eq!(para.cluster_type, None);
        assert_eq!(para.privileges.get("dml").map(String::as_str), Some("select"));
        assert_eq!(para.privileges.len(), 2);
    }

    #[test]
    fn test_delete_request_ids_field() {
        let json = r#"{"bk_biz_id": 1, "cluster_type": "tendbcluster", "id": [1, 2]}"#;
        let req: DeleteAccountRuleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ids, vec![1, 2]);
        assert_eq!(req.cluster_type, Some(ClusterType::TendbCluster));
    }
}
