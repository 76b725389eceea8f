use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tickerlens_market_data::ProviderDescriptor;

use crate::main_lib::AppState;

/// Registered providers in fallback order, with their live health.
#[utoipa::path(
    get,
    path = "/api/v1/providers/health",
    responses((status = 200, description = "Provider descriptors"))
)]
pub async fn get_provider_health(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.analysis_service.provider_health())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/providers/health", get(get_provider_health))
}
