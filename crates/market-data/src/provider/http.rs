//! Shared HTTP plumbing for providers: client construction and status mapping.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};

use crate::errors::MarketDataError;

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Connection settings shared by every provider client.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
        }
    }
}

impl HttpSettings {
    pub(crate) fn client(&self) -> Client {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Classify a non-success HTTP status.
///
/// - 404: this provider has nothing for the ticker
/// - 429: quota signal, with the provider's cool-down hint if any
/// - 401/403: credentials rejected
/// - anything else (mostly 5xx): transient provider error
pub(crate) fn status_error(
    provider: &str,
    symbol: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
) -> MarketDataError {
    match status {
        StatusCode::NOT_FOUND => MarketDataError::no_data(provider, symbol),
        StatusCode::TOO_MANY_REQUESTS => MarketDataError::RateLimited {
            provider: provider.to_string(),
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MarketDataError::Unauthorized {
            provider: provider.to_string(),
        },
        _ => MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("HTTP {}", status),
        },
    }
}

/// Send a request and map transport failures and error statuses.
pub(crate) async fn send(
    provider: &str,
    symbol: &str,
    request: RequestBuilder,
) -> Result<Response, MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(status_error(provider, symbol, status, retry_after(&response)))
}

/// Send a request and decode the body as JSON.
pub(crate) async fn get_json(
    provider: &str,
    symbol: &str,
    request: RequestBuilder,
) -> Result<serde_json::Value, MarketDataError> {
    send(provider, symbol, request)
        .await?
        .json::<serde_json::Value>()
        .await
        .map_err(|e| MarketDataError::malformed(provider, e.to_string()))
}

/// Send a request and return the body as text.
pub(crate) async fn get_text(
    provider: &str,
    symbol: &str,
    request: RequestBuilder,
) -> Result<String, MarketDataError> {
    send(provider, symbol, request)
        .await?
        .text()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RetryClass;

    #[test]
    fn test_status_mapping() {
        let err = status_error("STOOQ", "TCS", StatusCode::NOT_FOUND, None);
        assert!(matches!(err, MarketDataError::NoData { ref symbol, .. } if symbol == "TCS"));
        assert_eq!(err.retry_class(), RetryClass::NoCoverage);

        let err = status_error(
            "YAHOO",
            "TCS",
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(12)),
        );
        match err {
            MarketDataError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(12)))
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = status_error("TIINGO", "TCS", StatusCode::FORBIDDEN, None);
        assert_eq!(err.retry_class(), RetryClass::Failover);

        let err = status_error("TWELVE_DATA", "TCS", StatusCode::BAD_GATEWAY, None);
        assert_eq!(err.retry_class(), RetryClass::Transient);
        assert_eq!(err.to_string(), "Provider error: TWELVE_DATA - HTTP 502 Bad Gateway");
    }
}
