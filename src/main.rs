use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatragi::config::Config;
use chatragi::ingest::IngestWatcher;
use chatragi::memory::RetentionSweeper;
use chatragi::vector_store::{EmbeddedStore, VectorCollection, CHAT_MEMORY, DOC_INDEX};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    config.log();
    config.ensure_dirs();

    let store = EmbeddedStore::open(&config.db_path)?;
    let doc_index: Arc<dyn VectorCollection> = Arc::new(store.collection(DOC_INDEX));
    let chat_memory: Arc<dyn VectorCollection> = Arc::new(store.collection(CHAT_MEMORY));

    // Expire stale memories before serving anything.
    let sweeper = RetentionSweeper::new(chat_memory.clone(), config.retention_days);
    if let Err(e) = sweeper.sweep() {
        warn!("Startup memory sweep failed: {}", e);
    }

    if config.sweep_interval_secs > 0 {
        let interval = Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; already swept
            loop {
                ticker.tick().await;
                if let Err(e) = sweeper.sweep() {
                    warn!("Periodic memory sweep failed: {}", e);
                }
            }
        });
    }

    let watcher = IngestWatcher::new(config, doc_index);

    tokio::select! {
        result = watcher.run() => {
            if let Err(e) = result {
                error!("Ingestion watcher stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
        }
    }

    Ok(())
}
