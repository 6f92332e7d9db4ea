//! Storage backend selection

use crate::config::StorageConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::seed::PopulationSeed;
use civic_storage::{CivicStorage, InMemoryCivicStorage};
use std::sync::Arc;

/// Open the configured store, preloading `seed` into an in-memory store
pub async fn open_storage(
    config: &StorageConfig,
    seed: Option<PopulationSeed>,
) -> DaemonResult<Arc<dyn CivicStorage>> {
    match config {
        StorageConfig::Memory => {
            let store = InMemoryCivicStorage::new();
            if let Some(seed) = seed {
                seed.apply(&store);
            }
            tracing::info!("Using in-memory storage");
            Ok(Arc::new(store))
        }
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            if seed.is_some() {
                return Err(DaemonError::Config(
                    "seed files are only supported with memory storage".to_string(),
                ));
            }
            open_postgres(url, *max_connections, *connect_timeout_secs).await
        }
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(
    url: &str,
    max_connections: u32,
    connect_timeout_secs: u64,
) -> DaemonResult<Arc<dyn CivicStorage>> {
    let store = civic_storage::postgres::PostgresCivicStorage::connect_with_options(
        url,
        max_connections,
        connect_timeout_secs,
    )
    .await?;
    tracing::info!(max_connections, "Using PostgreSQL storage");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(
    _url: &str,
    _max_connections: u32,
    _connect_timeout_secs: u64,
) -> DaemonResult<Arc<dyn CivicStorage>> {
    Err(DaemonError::Config(
        "postgres storage requires civicd built with the `postgres` feature".to_string(),
    ))
}
