use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tickerlens_core::analysis::{BatchItem, ClearedEntries, FundamentalsSnapshot};
use tickerlens_core::indicators::IndicatorSnapshot;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const MAX_BATCH_TICKERS: usize = 100;

#[derive(Deserialize)]
struct BatchRequest {
    tickers: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tickers/{ticker}/indicators",
    params(("ticker" = String, Path, description = "Ticker such as TCS or RELIANCE.NS")),
    responses(
        (status = 200, description = "Indicator snapshot"),
        (status = 400, description = "Invalid ticker"),
        (status = 404, description = "Ticker not found"),
        (status = 502, description = "All providers exhausted"),
        (status = 504, description = "Timed out waiting for the fetch")
    )
)]
pub async fn get_indicators(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<IndicatorSnapshot>> {
    let snapshot = state.analysis_service.get_indicator_snapshot(&ticker).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickers/{ticker}/fundamentals",
    params(("ticker" = String, Path, description = "Ticker")),
    responses((status = 200, description = "Fundamentals snapshot"))
)]
pub async fn get_fundamentals(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<FundamentalsSnapshot>> {
    let snapshot = state
        .analysis_service
        .get_fundamentals_snapshot(&ticker)
        .await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickers/{ticker}/refresh",
    params(("ticker" = String, Path, description = "Ticker")),
    responses((status = 200, description = "Freshly fetched indicator snapshot"))
)]
pub async fn refresh_ticker(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<IndicatorSnapshot>> {
    let snapshot = state.analysis_service.refresh(&ticker).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tickers/{ticker}/cache",
    params(("ticker" = String, Path, description = "Ticker")),
    responses((status = 200, description = "Entries removed per tier"))
)]
pub async fn clear_ticker_cache(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ClearedEntries>> {
    let cleared = state.analysis_service.clear(&ticker).await?;
    Ok(Json(cleared))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickers/batch",
    responses(
        (status = 200, description = "Per-ticker results in request order"),
        (status = 400, description = "Too many tickers")
    )
)]
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchRequest>,
) -> ApiResult<Json<Vec<BatchItem>>> {
    if body.tickers.len() > MAX_BATCH_TICKERS {
        return Err(ApiError::BadRequest(format!(
            "at most {} tickers per batch, got {}",
            MAX_BATCH_TICKERS,
            body.tickers.len()
        )));
    }
    let items = state.analysis_service.analyze_batch(&body.tickers).await;
    Ok(Json(items))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickers/batch", post(analyze_batch))
        .route("/tickers/{ticker}/indicators", get(get_indicators))
        .route("/tickers/{ticker}/fundamentals", get(get_fundamentals))
        .route("/tickers/{ticker}/refresh", post(refresh_ticker))
        .route("/tickers/{ticker}/cache", delete(clear_ticker_cache))
}
