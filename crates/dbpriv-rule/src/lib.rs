//! dbpriv Rule - Account privilege rule validation and management
//!
//! This crate provides:
//! - Privilege category policy per cluster type
//! - Database scope overlap detection
//! - Preflight checks run before rules are created
//! - The account rule service (query, add, dry run, modify, delete)
//! - Best-effort audit logging of rule mutations

pub mod audit;
pub mod model;
pub mod overlap;
pub mod policy;
pub mod preflight;
pub mod service;

pub use audit::AuditSink;
pub use model::{
    AccountRuleGroup, AccountRulePara, AccountRuleQueryResult, DeleteAccountRuleRequest,
    QueryAccountRuleRequest,
};
pub use overlap::{OverlapFinding, find_overlaps, overlaps};
pub use policy::{PrivilegeSet, allowed_tokens, categories_for, split_privileges};
pub use service::{AccountRuleService, RuleServiceConfig};
