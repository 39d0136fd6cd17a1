//! dbpriv Common - Shared types, error codes, and utilities
//!
//! This crate provides the foundational types used across all dbpriv components:
//! - Error types and error codes
//! - Cluster engine types
//! - Utility functions

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{ErrorCode, ErrorKind, PrivError, allows_force};
pub use utils::split_dbnames;

/// Privilege category names used in privilege maps
pub const PRIV_DML: &str = "dml";
pub const PRIV_DDL: &str = "ddl";
pub const PRIV_GLOBAL: &str = "global";
pub const PRIV_OWNER: &str = "owner";
pub const PRIV_MONGO_USER: &str = "mongo_user";
pub const PRIV_MONGO_MANAGER: &str = "mongo_manager";

/// Cluster engine types an account rule can belong to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    /// Single-instance or replicated MySQL (primary engine family)
    #[default]
    Mysql,
    /// Sharded MySQL cluster behind a spider proxy layer
    TendbCluster,
    Sqlserver,
    Mongodb,
}

impl ClusterType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClusterType::Mysql => "mysql",
            ClusterType::TendbCluster => "tendbcluster",
            ClusterType::Sqlserver => "sqlserver",
            ClusterType::Mongodb => "mongodb",
        }
    }

    /// Whether scope overlap detection is meaningful for this engine family
    pub fn supports_overlap_check(self) -> bool {
        matches!(self, ClusterType::Mysql | ClusterType::TendbCluster)
    }
}

impl std::fmt::Display for ClusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ClusterType {
    type Err = PrivError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(ClusterType::Mysql),
            "tendbcluster" => Ok(ClusterType::TendbCluster),
            "sqlserver" => Ok(ClusterType::Sqlserver),
            "mongodb" => Ok(ClusterType::Mongodb),
            _ => Err(PrivError::InvalidClusterType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_type_default() {
        assert_eq!(ClusterType::default(), ClusterType::Mysql);
    }

    #[test]
    fn test_cluster_type_parse() {
        assert_eq!(
            "tendbcluster".parse::<ClusterType>().unwrap(),
            ClusterType::TendbCluster
        );
        assert_eq!(
            "sqlserver".parse::<ClusterType>().unwrap(),
            ClusterType::Sqlserver
        );
        assert!(matches!(
            "redis".parse::<ClusterType>(),
            Err(PrivError::InvalidClusterType(_))
        ));
    }

    #[test]
    fn test_cluster_type_serde() {
        let json = serde_json::to_string(&ClusterType::TendbCluster).unwrap();
        assert_eq!(json, "\"tendbcluster\"");
        let parsed: ClusterType = serde_json::from_str("\"mongodb\"").unwrap();
        assert_eq!(parsed, ClusterType::Mongodb);
    }

    #[test]
    fn test_overlap_check_families() {
        assert!(ClusterType::Mysql.supports_overlap_check());
        assert!(ClusterType::TendbCluster.supports_overlap_check());
        assert!(!ClusterType::Sqlserver.supports_overlap_check());
        assert!(!ClusterType::Mongodb.supports_overlap_check());
    }
}
