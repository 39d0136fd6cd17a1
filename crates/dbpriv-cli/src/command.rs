//! Subcommands of the dbpriv tool
//!
//! Rule operations read their request from a JSON file shaped like the
//! matching `dbpriv_rule` request type and print a JSON result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use dbpriv_common::{ClusterType, PrivError};
use dbpriv_persistence::{AccountPersistence, PersistenceService, PrivLogPersistence};
use dbpriv_rule::{
    AccountRulePara, AccountRuleService, DeleteAccountRuleRequest, QueryAccountRuleRequest,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List account rules grouped by account
    Query {
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Create one rule per database in the request
    Add {
        #[arg(short, long)]
        request: PathBuf,
        #[arg(short, long, default_value = "")]
        ticket: String,
    },
    /// Run the checks of `add` without writing
    AddDryRun {
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Change the database and privileges of one rule
    Modify {
        #[arg(short, long)]
        request: PathBuf,
        #[arg(short, long, default_value = "")]
        ticket: String,
    },
    /// Delete rules by id
    Delete {
        #[arg(short, long)]
        request: PathBuf,
        #[arg(short, long, default_value = "")]
        ticket: String,
    },
    /// Register an account rules can be attached to
    InitAccount {
        #[arg(long)]
        bk_biz_id: i64,
        #[arg(long, default_value = "mysql")]
        cluster_type: ClusterType,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "admin")]
        creator: String,
    },
    /// Show the latest audit records of a business
    PrivLogs {
        #[arg(long)]
        bk_biz_id: i64,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
}

fn read_request<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid request in {}", path.display()))
}

pub async fn run(
    command: Command,
    persistence: Arc<dyn PersistenceService>,
    service: &AccountRuleService,
) -> anyhow::Result<Value> {
    match command {
        Command::Query { request } => {
            let req: QueryAccountRuleRequest = read_request(&request)?;
            let result = service.query(&req).await?;
            Ok(serde_json::to_value(result)?)
        }
        Command::Add { request, ticket } => {
            let para: AccountRulePara = read_request(&request)?;
            service.add(&para, &ticket).await?;
            Ok(json!({ "code": 0, "message": "success" }))
        }
        Command::AddDryRun { request } => {
            let para: AccountRulePara = read_request(&request)?;
            match service.add_dry_run(&para).await {
                Ok(()) => Ok(json!({ "passed": true, "allow_force": true })),
                Err(e) => match e.downcast_ref::<PrivError>() {
                    Some(err) => Ok(json!({
                        "passed": false,
                        "allow_force": err.allows_force(),
                        "code": err.code().code,
                        "message": err.to_string(),
                    })),
                    None => Err(e),
                },
            }
        }
        Command::Modify { request, ticket } => {
            let para: AccountRulePara = read_request(&request)?;
            service.modify(&para, &ticket).await?;
            Ok(json!({ "code": 0, "message": "success" }))
        }
        Command::Delete { request, ticket } => {
            let req: DeleteAccountRuleRequest = read_request(&request)?;
            service.delete(&req, &ticket).await?;
            Ok(json!({ "code": 0, "message": "success" }))
        }
        Command::InitAccount {
            bk_biz_id,
            cluster_type,
            user,
            creator,
        } => {
            let id = persistence
                .account_create(bk_biz_id, cluster_type, &user, &creator)
                .await?;
            Ok(json!({ "id": id }))
        }
        Command::PrivLogs { bk_biz_id, limit } => {
            let logs = persistence.priv_log_find_by_biz(bk_biz_id, limit).await?;
            Ok(serde_json::to_value(logs)?)
        }
    }
}
