//! Engine configuration.
//!
//! Every knob is read from the environment. Unset variables take their
//! default; unparseable ones are logged and also take their default.

use std::str::FromStr;
use std::time::Duration;

use log::warn;

use tickerlens_market_data::{
    BackoffPolicy, BarInterval, Exchange, HealthConfig, HistoryPeriod, HttpSettings,
    ProviderKeys, RegistryConfig, SeriesRange,
};

use crate::constants::*;
use crate::indicators::IndicatorParams;

/// Cache sizing and freshness.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// TTL of price-series entries.
    pub price_ttl: Duration,
    /// TTL of fundamentals entries.
    pub fundamentals_ttl: Duration,
    /// Entries held by the in-memory tier.
    pub fast_capacity: usize,
    /// Longest a caller waits on an in-flight fetch.
    pub fetch_wait_ceiling: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            price_ttl: Duration::from_secs(DEFAULT_PRICE_TTL_SECS),
            fundamentals_ttl: Duration::from_secs(DEFAULT_FUNDAMENTALS_TTL_SECS),
            fast_capacity: DEFAULT_FAST_CAPACITY,
            fetch_wait_ceiling: Duration::from_secs(DEFAULT_FETCH_WAIT_CEILING_SECS),
        }
    }
}

/// Everything the analysis engine needs to be built.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub keys: ProviderKeys,
    pub preferred_exchange: Exchange,
    pub range: SeriesRange,
    pub http: HttpSettings,
    pub registry: RegistryConfig,
    pub health: HealthConfig,
    pub cache: CacheConfig,
    pub indicators: IndicatorParams,
    /// Fewest cleaned bars a price series must have to be accepted.
    pub min_series_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let indicators = IndicatorParams::default();
        Self {
            keys: ProviderKeys::default(),
            preferred_exchange: Exchange::Nse,
            range: SeriesRange::default(),
            http: HttpSettings::default(),
            registry: RegistryConfig::default(),
            health: HealthConfig::default(),
            cache: CacheConfig::default(),
            min_series_bars: indicators.rsi_length + 1,
            indicators,
        }
    }
}

impl EngineConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Env { lookup: &lookup };
        let defaults = Self::default();

        let indicators = IndicatorParams {
            rsi_length: env.parse("RSI_LENGTH", defaults.indicators.rsi_length),
            rsi_sma_length: env.parse("RSI_SMA_LENGTH", defaults.indicators.rsi_sma_length),
            rsi_ema_length: env.parse("RSI_EMA_LENGTH", defaults.indicators.rsi_ema_length),
            adx_length: env.parse("ADX_LENGTH", defaults.indicators.adx_length),
            adx_smoothing: env.parse("ADX_SMOOTHING", defaults.indicators.adx_smoothing),
            psar_af_start: env.parse("PSAR_AF_START", defaults.indicators.psar_af_start),
            psar_af_step: env.parse("PSAR_AF_STEP", defaults.indicators.psar_af_step),
            psar_af_max: env.parse("PSAR_AF_MAX", defaults.indicators.psar_af_max),
            supertrend_period: env.parse("SUPERTREND_PERIOD", defaults.indicators.supertrend_period),
            supertrend_multiplier: env.parse(
                "SUPERTREND_MULTIPLIER",
                defaults.indicators.supertrend_multiplier,
            ),
            donchian_length: env.parse("DONCHIAN_LENGTH", defaults.indicators.donchian_length),
            donchian_slope_bars: env.parse(
                "DONCHIAN_SLOPE_BARS",
                defaults.indicators.donchian_slope_bars,
            ),
            donchian_flat_pct: env.parse("DONCHIAN_FLAT_PCT", defaults.indicators.donchian_flat_pct),
            obv_sma_length: env.parse("OBV_SMA_LENGTH", defaults.indicators.obv_sma_length),
            volume_sma_length: env.parse("VOLUME_SMA_LENGTH", defaults.indicators.volume_sma_length),
            ..defaults.indicators.clone()
        };

        let backoff = BackoffPolicy {
            max_retries: env.parse("HTTP_MAX_RETRIES", defaults.registry.backoff.max_retries),
            base_delay: env.secs_f64("HTTP_BACKOFF", defaults.registry.backoff.base_delay),
            max_delay: env.secs_f64("HTTP_BACKOFF_MAX", defaults.registry.backoff.max_delay),
            jitter: env
                .parse("HTTP_BACKOFF_JITTER", defaults.registry.backoff.jitter)
                .clamp(0.0, 1.0),
        };

        let http = HttpSettings {
            connect_timeout: env.secs_f64("HTTP_CONNECT_TIMEOUT", defaults.http.connect_timeout),
            read_timeout: env.secs_f64("HTTP_READ_TIMEOUT", defaults.http.read_timeout),
        };

        let registry = RegistryConfig {
            backoff,
            // A provider call never outlives the HTTP read timeout by much
            call_timeout: http.read_timeout + http.connect_timeout,
            limiter_wait_ceiling: env.secs_f64(
                "RATE_LIMIT_WAIT_CEILING_SECONDS",
                defaults.registry.limiter_wait_ceiling,
            ),
        };

        let health = HealthConfig {
            failure_threshold: env
                .parse("PROVIDER_FAILURE_THRESHOLD", defaults.health.failure_threshold)
                .max(1),
            failure_window: env.secs_f64(
                "PROVIDER_FAILURE_WINDOW_SECONDS",
                defaults.health.failure_window,
            ),
            block_cooldown: env.secs_f64(
                "PROVIDER_BLOCK_COOLDOWN_SECONDS",
                defaults.health.block_cooldown,
            ),
        };

        let cache = CacheConfig {
            price_ttl: env.secs_f64("CACHE_EXPIRE_CORE_SECONDS", defaults.cache.price_ttl),
            fundamentals_ttl: env.secs_f64(
                "CACHE_EXPIRE_DATA_SECONDS",
                defaults.cache.fundamentals_ttl,
            ),
            fast_capacity: env
                .parse("CACHE_FAST_CAPACITY", defaults.cache.fast_capacity)
                .max(1),
            fetch_wait_ceiling: env.secs_f64(
                "FETCH_WAIT_CEILING_SECONDS",
                defaults.cache.fetch_wait_ceiling,
            ),
        };

        let range = SeriesRange {
            period: env.parse::<HistoryPeriod>("HISTORY_PERIOD", defaults.range.period),
            interval: env.parse::<BarInterval>("HISTORY_INTERVAL", defaults.range.interval),
        };

        let min_series_bars = env
            .parse("MIN_SERIES_BARS", indicators.rsi_length + 1)
            .max(1);

        Self {
            keys: ProviderKeys {
                twelve_data: env.string("TWELVE_DATA_API_KEY"),
                tiingo: env.string("TIINGO_API_KEY"),
            },
            preferred_exchange: env.parse("PREFERRED_EXCHANGE", defaults.preferred_exchange),
            range,
            http,
            registry,
            health,
            cache,
            indicators,
            min_series_bars,
        }
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, name: &str, default: T) -> T {
        match self.string(name) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring unparseable {}='{}', using the default", name, raw);
                default
            }),
        }
    }

    fn secs_f64(&self, name: &str, default: Duration) -> Duration {
        let secs = self.parse(name, default.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
            warn!("Ignoring out-of-range {}={}, using the default", name, secs);
            default
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.preferred_exchange, Exchange::Nse);
        assert_eq!(config.registry.backoff.max_retries, 2);
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.cache.price_ttl, Duration::from_secs(3600));
        assert_eq!(config.cache.fundamentals_ttl, Duration::from_secs(86400));
        assert_eq!(config.min_series_bars, 15);
        assert!(config.keys.twelve_data.is_none());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config_from(&[
            ("PREFERRED_EXCHANGE", "bse"),
            ("RSI_LENGTH", "10"),
            ("HTTP_BACKOFF", "0.5"),
            ("CACHE_FAST_CAPACITY", "not-a-number"),
            ("HISTORY_PERIOD", "2y"),
            ("TIINGO_API_KEY", "  secret "),
        ]);

        assert_eq!(config.preferred_exchange, Exchange::Bse);
        assert_eq!(config.indicators.rsi_length, 10);
        assert_eq!(config.min_series_bars, 11);
        assert_eq!(config.registry.backoff.base_delay, Duration::from_millis(500));
        assert_eq!(config.cache.fast_capacity, DEFAULT_FAST_CAPACITY);
        assert_eq!(config.range.period, HistoryPeriod::TwoYears);
        assert_eq!(config.keys.tiingo.as_deref(), Some("secret"));
    }
}
