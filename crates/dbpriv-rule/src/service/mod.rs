//! Account rule service implementations

pub mod account_rule;

pub use account_rule::AccountRuleService;

use dbpriv_common::ClusterType;
use serde::{Deserialize, Serialize};

use crate::audit::DEFAULT_QUEUE_CAPACITY;

/// Settings of the rule service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleServiceConfig {
    /// Cluster type applied when a request leaves it unset
    pub default_cluster_type: ClusterType,
    /// Bound of the audit record queue
    pub audit_queue_capacity: usize,
}

impl Default for RuleServiceConfig {
    fn default() -> Self {
        Self {
            default_cluster_type: ClusterType::Mysql,
            audit_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
