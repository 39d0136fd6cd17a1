//! Configuration management for the dbpriv tool
//!
//! Sources, lowest precedence first: the YAML file named by `--config`,
//! `DBPRIV_*` environment variables (`DBPRIV_DB__URL` sets `db.url`) and
//! command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment};
use dbpriv_common::ClusterType;
use dbpriv_persistence::StorageMode;
use dbpriv_rule::RuleServiceConfig;
use dbpriv_rule::audit::DEFAULT_QUEUE_CAPACITY;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::command::Command;
use crate::startup::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_DATA_DIR: &str = "data/dbpriv";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "dbpriv", version, about = "Manage database account privilege rules")]
pub struct Cli {
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    #[arg(short = 'm', long = "storage-mode")]
    pub storage_mode: Option<String>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long = "data-dir")]
    pub data_dir: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new(args: &Cli) -> anyhow::Result<Self> {
        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("dbpriv")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = &args.storage_mode {
            config_builder = config_builder.set_override("storage.mode", v.as_str())?;
        }
        if let Some(v) = &args.database_url {
            config_builder = config_builder.set_override("db.url", v.as_str())?;
        }
        if let Some(v) = &args.data_dir {
            config_builder = config_builder.set_override("storage.data_dir", v.as_str())?;
        }

        Ok(Configuration {
            config: config_builder.build()?,
        })
    }

    // ========================================================================
    // Storage Configuration
    // ========================================================================

    pub fn storage_mode(&self) -> anyhow::Result<StorageMode> {
        match self.config.get_string("storage.mode") {
            Ok(v) => v.parse().map_err(|e: String| anyhow::anyhow!(e)),
            Err(_) => Ok(StorageMode::default()),
        }
    }

    pub fn data_dir(&self) -> String {
        self.config
            .get_string("storage.data_dir")
            .unwrap_or(DEFAULT_DATA_DIR.to_string())
    }

    pub fn connect_options(&self) -> anyhow::Result<ConnectOptions> {
        let max_connections: u32 = self.get_unsigned("db.max_connections", 10)?;
        let min_connections: u32 = self.get_unsigned("db.min_connections", 1)?;
        let connect_timeout: u64 = self.get_unsigned("db.connect_timeout_secs", 30)?;
        let sqlx_logging = self.config.get_bool("db.sqlx_logging").unwrap_or(false);

        let url = self.config.get_string("db.url")?;

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .sqlx_logging(sqlx_logging);
        Ok(opt)
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let opt = self.connect_options()?;

        tracing::debug!(
            max_connections = ?opt.get_max_connections(),
            min_connections = ?opt.get_min_connections(),
            "Connecting to database"
        );

        Ok(Database::connect(opt).await?)
    }

    /// Read a non-negative integer, falling back to `default` when unset
    fn get_unsigned<T: TryFrom<i64>>(&self, key: &str, default: T) -> anyhow::Result<T> {
        match self.config.get_int(key) {
            Ok(v) => T::try_from(v)
                .map_err(|_| anyhow::anyhow!("invalid value for {}: {}", key, v)),
            Err(ConfigError::NotFound(_)) => Ok(default),
            Err(e) => Err(anyhow::anyhow!("invalid value for {}: {}", key, e)),
        }
    }

    // ========================================================================
    // Rule Service Configuration
    // ========================================================================

    pub fn rule_service_config(&self) -> anyhow::Result<RuleServiceConfig> {
        let default_cluster_type = match self.config.get_string("rule.default_cluster_type") {
            Ok(v) => v.parse::<ClusterType>()?,
            Err(_) => ClusterType::default(),
        };
        let audit_queue_capacity: usize =
            self.get_unsigned("rule.audit_queue_capacity", DEFAULT_QUEUE_CAPACITY)?;

        Ok(RuleServiceConfig {
            default_cluster_type,
            audit_queue_capacity: audit_queue_capacity.max(1),
        })
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        let log_dir = self.config.get_string("logs.path").ok();
        if log_dir.is_none() && self.config.get_string("logs.level").is_err() {
            return LoggingConfig::from_env();
        }

        LoggingConfig::from_config(
            log_dir,
            self.config.get_bool("logs.console").unwrap_or(true),
            self.config.get_bool("logs.file").unwrap_or(true),
            self.config
                .get_string("logs.level")
                .unwrap_or("info".to_string()),
        )
    }
}
