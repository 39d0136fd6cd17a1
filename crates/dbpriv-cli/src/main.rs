//! Main entry point for the dbpriv operator tool.

use std::process::ExitCode;

use clap::Parser;
use dbpriv_common::PrivError;
use dbpriv_cli::{
    command,
    model::{Cli, Configuration},
    startup,
};
use dbpriv_rule::AccountRuleService;
use serde_json::json;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let configuration = Configuration::new(&cli)?;

    let _logging_guard = startup::init_logging(&configuration.logging_config())
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let persistence = startup::open_persistence(&configuration).await?;
    let service =
        AccountRuleService::new(persistence.clone(), &configuration.rule_service_config()?);

    let result = command::run(cli.command, persistence, &service).await;

    // Flush queued audit records before exiting
    service.shutdown().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => match e.downcast_ref::<PrivError>() {
            Some(err) => {
                error!(code = err.code().code, "{}", err);
                let output = json!({ "code": err.code().code, "message": err.to_string() });
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}
