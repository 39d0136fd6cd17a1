//! Privilege category policy per cluster engine type
//!
//! Each engine type accepts a fixed, ordered set of privilege categories in a
//! request's privilege map. The sharded cluster type additionally restricts
//! the individual privilege tokens that may be granted through the proxy.

use std::collections::BTreeMap;

use dbpriv_common::{
    ClusterType, PRIV_DDL, PRIV_DML, PRIV_GLOBAL, PRIV_MONGO_MANAGER, PRIV_MONGO_USER, PRIV_OWNER,
};

const STANDARD_CATEGORIES: &[&str] = &[PRIV_DML, PRIV_DDL, PRIV_GLOBAL];

const SQLSERVER_CATEGORIES: &[&str] = &[PRIV_DML, PRIV_OWNER];

const MONGODB_CATEGORIES: &[&str] = &[
    PRIV_DML,
    PRIV_DDL,
    PRIV_GLOBAL,
    PRIV_MONGO_USER,
    PRIV_MONGO_MANAGER,
];

/// Privileges the spider proxy of a sharded cluster can grant
const SPIDER_ALLOWED_PRIVS: &[&str] = &[
    "select",
    "insert",
    "update",
    "delete",
    "execute",
    "file",
    "reload",
    "process",
    "show databases",
];

/// Ordered privilege categories accepted for a cluster type
pub fn categories_for(cluster_type: ClusterType) -> &'static [&'static str] {
    match cluster_type {
        ClusterType::Sqlserver => SQLSERVER_CATEGORIES,
        ClusterType::Mongodb => MONGODB_CATEGORIES,
        ClusterType::Mysql | ClusterType::TendbCluster => STANDARD_CATEGORIES,
    }
}

/// Check a combined, comma separated privilege string against the token
/// allow-list of the cluster type.
///
/// Returns the `;`-joined rejected tokens and whether the string passed. Only
/// the sharded cluster type restricts tokens; every other type passes.
pub fn allowed_tokens(cluster_type: ClusterType, combined: &str) -> (String, bool) {
    if cluster_type != ClusterType::TendbCluster {
        return (String::new(), true);
    }

    let lowered = combined.to_lowercase();
    let rejected: Vec<&str> = lowered
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| !SPIDER_ALLOWED_PRIVS.contains(p))
        .collect();

    let ok = rejected.is_empty();
    (rejected.join(";"), ok)
}

/// Privilege strings derived from a request's privilege map
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrivilegeSet {
    /// Every category's privileges
    pub all: String,
    /// `dml` and `ddl` privileges
    pub dml_ddl: String,
    /// Non-standard privileges: `global`, `owner` and the mongo categories
    pub global: String,
}

impl PrivilegeSet {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Partition a privilege map into the stored privilege buckets.
///
/// Categories are visited in policy order; categories not accepted for the
/// cluster type and empty values are ignored.
pub fn split_privileges(
    cluster_type: ClusterType,
    privileges: &BTreeMap<String, String>,
) -> PrivilegeSet {
    let mut all = Vec::new();
    let mut dml_ddl = Vec::new();
    let mut global = Vec::new();

    for category in categories_for(cluster_type) {
        let Some(value) = privileges.get(*category) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        if *category == PRIV_DML || *category == PRIV_DDL {
            dml_ddl.push(value.as_str());
        } else {
            global.push(value.as_str());
        }
        all.push(value.as_str());
    }

    PrivilegeSet {
        all: join_privileges(&all),
        dml_ddl: join_privileges(&dml_ddl),
        global: join_privileges(&global),
    }
}

fn join_privileges(values: &[&str]) -> String {
    values.join(",").trim_matches(',').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn privs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_categories_for() {
        assert_eq!(categories_for(ClusterType::Sqlserver), &["dml", "owner"]);
        assert_eq!(categories_for(ClusterType::Mysql), &["dml", "ddl", "global"]);
        assert_eq!(
            categories_for(ClusterType::TendbCluster),
            &["dml", "ddl", "global"]
        );
        assert!(categories_for(ClusterType::Mongodb).contains(&"mongo_user"));
    }

    #[test]
    fn test_allowed_tokens_sharded() {
        assert_eq!(
            allowed_tokens(ClusterType::TendbCluster, "select,drop"),
            ("drop".to_string(), false)
        );
        assert_eq!(
            allowed_tokens(ClusterType::TendbCluster, "select,execute"),
            (String::new(), true)
        );
    }

    #[test]
    fn test_allowed_tokens_normalizes_case_and_spaces() {
        assert_eq!(
            allowed_tokens(ClusterType::TendbCluster, " SELECT , Show Databases,,"),
            (String::new(), true)
        );
        assert_eq!(
            allowed_tokens(ClusterType::TendbCluster, "alter, Drop ,select"),
            ("alter;drop".to_string(), false)
        );
    }

    #[test]
    fn test_allowed_tokens_other_types_pass() {
        assert_eq!(
            allowed_tokens(ClusterType::Mysql, "select,drop"),
            (String::new(), true)
        );
        assert_eq!(
            allowed_tokens(ClusterType::Sqlserver, "db_owner"),
            (String::new(), true)
        );
    }

    #[test]
    fn test_split_privileges_mysql() {
        let set = split_privileges(
            ClusterType::Mysql,
            &privs(&[
                ("dml", "select,insert"),
                ("ddl", "create"),
                ("global", "file"),
                ("owner", "db_owner"),
            ]),
        );
        assert_eq!(set.all, "select,insert,create,file");
        assert_eq!(set.dml_ddl, "select,insert,create");
        assert_eq!(set.global, "file");
    }

    #[test]
    fn test_split_privileges_sqlserver_owner_bucket() {
        let set = split_privileges(
            ClusterType::Sqlserver,
            &privs(&[("dml", "db_datareader"), ("owner", "db_owner")]),
        );
        assert_eq!(set.all, "db_datareader,db_owner");
        assert_eq!(set.dml_ddl, "db_datareader");
        assert_eq!(set.global, "db_owner");
    }

    #[test]
    fn test_split_privileges_skips_empty_values() {
        let set = split_privileges(
            ClusterType::Mysql,
            &privs(&[("dml", ""), ("ddl", ""), ("global", "")]),
        );
        assert!(set.is_empty());
        assert_eq!(set, PrivilegeSet::default());
    }

    #[test]
    fn test_split_privileges_trims_outer_commas() {
        let set = split_privileges(ClusterType::Mysql, &privs(&[("dml", "select,")]));
        assert_eq!(set.all, "select");
        assert_eq!(set.dml_ddl, "select");
    }
}
