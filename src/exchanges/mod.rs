//! Exchange adapter registry and factory
//!
//! This module provides:
//! - Central registration of all supported exchanges
//! - A factory resolving configured exchange names to adapters
//!
//! All exchange-specific logic must live in dedicated adapter modules.
//! The rest of the application must interact exclusively through
//! the `ExchangeAdapter` trait.

pub mod adapter;
pub mod http;
pub mod rate_limit;

mod binance;
mod bybit;
mod gateio;
mod kucoin;
mod okx;

use std::sync::Arc;
use std::time::Duration;

use adapter::ExchangeAdapter;

use crate::config::{ExchangeConfig, HttpSettings};
use crate::error::PulseError;

/// Names accepted in `exchanges[].name`.
pub const SUPPORTED_EXCHANGES: [&str; 5] = ["binance", "bybit", "gateio", "kucoin", "okx"];

/// Returns an exchange adapter instance by name.
///
/// RETURNS:
/// - `Ok(Some(adapter))` if the exchange is supported
/// - `Ok(None)` if the name is unknown
/// - `Err` if the adapter's HTTP client cannot be built
///
/// THREADING:
/// - Adapters are wrapped in `Arc` and shared across fetch tasks;
///   each one owns its own rate limiter.
pub fn get_adapter(
    cfg: &ExchangeConfig,
    http: &HttpSettings,
) -> Result<Option<Arc<dyn ExchangeAdapter>>, PulseError> {
    let interval = |default: Duration| {
        cfg.min_request_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(default)
    };

    let adapter: Arc<dyn ExchangeAdapter> = match cfg.name.as_str() {
        "binance" => Arc::new(binance::BinanceAdapter::new(
            http,
            interval(binance::DEFAULT_MIN_INTERVAL),
        )?),
        "bybit" => Arc::new(bybit::BybitAdapter::new(
            http,
            interval(bybit::DEFAULT_MIN_INTERVAL),
        )?),
        "gateio" => Arc::new(gateio::GateIoAdapter::new(
            http,
            interval(gateio::DEFAULT_MIN_INTERVAL),
        )?),
        "kucoin" => Arc::new(kucoin::KucoinAdapter::new(
            http,
            interval(kucoin::DEFAULT_MIN_INTERVAL),
        )?),
        "okx" => Arc::new(okx::OkxAdapter::new(http, interval(okx::DEFAULT_MIN_INTERVAL))?),
        _ => return Ok(None),
    };

    Ok(Some(adapter))
}

/// Resolves every enabled exchange in configuration order.
///
/// Unknown names fail here, at load time, rather than on every
/// collection cycle.
pub fn build_adapters(
    exchanges: &[ExchangeConfig],
    http: &HttpSettings,
) -> Result<Vec<Arc<dyn ExchangeAdapter>>, PulseError> {
    exchanges
        .iter()
        .filter(|e| e.enabled)
        .map(|cfg| {
            get_adapter(cfg, http)?.ok_or_else(|| {
                PulseError::config(format!(
                    "exchange '{}' is not supported (known: {})",
                    cfg.name,
                    SUPPORTED_EXCHANGES.join(", ")
                ))
            })
        })
        .collect()
}
