//! Read-only validation pass run before account rules are created
//!
//! The check reports every problem it finds in one message. Duplicate scopes
//! in a request and exact collisions with existing rules block the request but
//! may be forced through by an operator. Overlap findings are advisory and
//! only computed for dry runs. A missing account is never forceable.

use std::collections::HashSet;

use dbpriv_common::{ClusterType, PrivError};
use dbpriv_persistence::{AccountPersistence, AccountRulePersistence, PersistenceService};
use tracing::debug;

use crate::overlap::{find_overlaps, render_findings};

/// Check that rules for `dbs` can be added to the account.
///
/// On failure the error is `PrivError::AccountNotExisted`,
/// `PrivError::PreflightFailed` or a store error.
pub async fn check(
    persistence: &dyn PersistenceService,
    bk_biz_id: i64,
    account_id: i64,
    cluster_type: ClusterType,
    dbs: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    let count = persistence
        .account_count(bk_biz_id, cluster_type, account_id)
        .await?;
    if count == 0 {
        return Err(PrivError::AccountNotExisted.into());
    }

    let duplicates = duplicate_scopes(dbs);

    let rules = persistence
        .rule_find_by_account(bk_biz_id, cluster_type, account_id, None)
        .await?;
    let existing: Vec<String> = rules.into_iter().map(|r| r.dbname).collect();

    let existed: Vec<&str> = dbs
        .iter()
        .filter(|db| existing.contains(db))
        .map(String::as_str)
        .collect();

    let mut messages = Vec::new();
    let mut allow_force = true;

    if !existed.is_empty() {
        allow_force = false;
        messages.push(format!(
            "account rules for database ({}) already exist",
            existed.join(",")
        ));
    }
    if !duplicates.is_empty() {
        allow_force = false;
        messages.push(format!(
            "database ({}) is given more than once",
            duplicates.join(",")
        ));
    }

    if dry_run && cluster_type.supports_overlap_check() {
        let findings = find_overlaps(dbs, &existing);
        if !findings.is_empty() {
            debug!(
                bk_biz_id,
                account_id,
                findings = findings.len(),
                "scope overlaps found during dry run"
            );
            messages.push(format!(
                "overlap check between databases of account rules:\n{}",
                render_findings(&findings)
            ));
        }
    }

    if messages.is_empty() {
        return Ok(());
    }

    Err(PrivError::PreflightFailed {
        allow_force,
        message: messages.join("\n"),
    }
    .into())
}

/// Scopes repeated in the request, in the order their repeats appear
fn duplicate_scopes(dbs: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    dbs.iter()
        .filter(|db| !seen.insert(db.as_str()))
        .map(String::as_str)
        .collect()
}
