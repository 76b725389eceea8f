use std::sync::Arc;

use chrono::Utc;
use tickerlens_core::{AnalysisService, AnalysisServiceTrait};
use tickerlens_storage_sqlite::{
    db::{self, spawn_writer},
    SqliteCacheStore,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub analysis_service: Arc<dyn AnalysisServiceTrait>,
}

pub fn init_tracing() {
    let log_format = std::env::var("TL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Cache database in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let store = Arc::new(SqliteCacheStore::new(pool, writer));
    match store.purge_expired(Utc::now()).await {
        Ok(removed) => tracing::info!("Purged {} expired cache entries", removed),
        Err(e) => tracing::warn!("Could not purge expired cache entries: {}", e),
    }

    let analysis_service = AnalysisService::with_default_providers(store, config.engine.clone())
        .with_batch_concurrency(config.batch_concurrency);

    Ok(Arc::new(AppState {
        analysis_service: Arc::new(analysis_service),
    }))
}
