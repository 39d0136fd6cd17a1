//! Storage backend selection

use std::sync::Arc;

use dbpriv_persistence::{
    EmbeddedPersistService, ExternalDbPersistService, PersistenceService, StorageMode,
};
use tracing::info;

use crate::model::Configuration;

/// Open the configured backend and verify it answers
pub async fn open_persistence(
    configuration: &Configuration,
) -> anyhow::Result<Arc<dyn PersistenceService>> {
    let storage_mode = configuration.storage_mode()?;
    info!("Persistence mode: {}", storage_mode);

    let persistence: Arc<dyn PersistenceService> = match storage_mode {
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            Arc::new(ExternalDbPersistService::new(db))
        }
        StorageMode::Embedded => {
            let data_dir = configuration.data_dir();
            info!("Initializing embedded storage at: {}", data_dir);
            Arc::new(EmbeddedPersistService::open(&data_dir)?)
        }
    };

    persistence.health_check().await?;

    Ok(persistence)
}
