use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tickerlens_core::errors::Error as CoreError;
use tickerlens_market_data::{MarketDataError, ProviderAttempt};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<Vec<ProviderAttempt>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_invalid_ticker() => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Core(CoreError::MarketData(MarketDataError::AllProvidersExhausted {
                ..
            })) => StatusCode::BAD_GATEWAY,
            ApiError::Core(CoreError::FetchTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self);
        }
        let attempts = match &self {
            ApiError::Core(e) => e.attempts().map(<[ProviderAttempt]>::to_vec),
            ApiError::BadRequest(_) => None,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
            attempts,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
