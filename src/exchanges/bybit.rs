use std::time::Duration;

use serde::Deserialize;

use crate::{
    config::HttpSettings,
    error::{AdapterError, PulseError},
    schema::Ticker,
    util,
};

use super::adapter::{ExchangeAdapter, select_top_pairs};
use super::http::VenueHttp;

const BASE_URL: &str = "https://api.bybit.com";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

const RET_OK: i64 = 0;
const RET_PARAMS_ERROR: i64 = 10001;
const RET_RATE_LIMIT: i64 = 10006;

/// Bybit v5 spot REST adapter
///
/// https://bybit-exchange.github.io/docs/v5/market/tickers
pub struct BybitAdapter {
    http: VenueHttp,
}

impl BybitAdapter {
    pub fn new(settings: &HttpSettings, min_interval: Duration) -> Result<Self, PulseError> {
        Ok(Self {
            http: VenueHttp::new("bybit", settings, min_interval)?,
        })
    }

    fn check(&self, env: &BybitEnvelope, symbol: Option<&str>) -> Result<(), AdapterError> {
        match (env.ret_code, symbol) {
            (RET_OK, _) => Ok(()),
            (RET_RATE_LIMIT, _) => Err(self.http.rate_limited()),
            // Bybit reports an unknown symbol as a parameter error
            (RET_PARAMS_ERROR, Some(symbol)) => Err(self.http.not_found(symbol)),
            (code, _) => Err(self.http.unavailable(format!("retCode {}: {}", code, env.ret_msg))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitEnvelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: BybitResult,
    time: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct BybitResult {
    #[serde(default)]
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
struct BybitTicker {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: Option<String>,
    #[serde(rename = "highPrice24h")]
    high_price_24h: Option<String>,
    #[serde(rename = "lowPrice24h")]
    low_price_24h: Option<String>,
    /// Fraction, "0.0123" means +1.23%
    #[serde(rename = "price24hPcnt")]
    price_24h_pcnt: Option<String>,
    /// Quote-currency turnover
    #[serde(rename = "turnover24h")]
    turnover_24h: Option<String>,
}

fn to_ticker(raw: &BybitTicker, symbol: String, time: Option<i64>) -> Ticker {
    Ticker::new(
        symbol,
        util::parse_num(raw.last_price.as_deref()),
        util::parse_num(raw.turnover_24h.as_deref()),
        util::parse_num(raw.price_24h_pcnt.as_deref()) * 100.0,
        util::parse_num(raw.high_price_24h.as_deref()),
        util::parse_num(raw.low_price_24h.as_deref()),
        util::from_millis(time),
    )
}

#[async_trait::async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn name(&self) -> &'static str {
        "bybit"
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!(
            "{}/v5/market/tickers?category=spot&symbol={}",
            BASE_URL,
            util::symbol_to_exchange(self.name(), symbol)
        );
        let env: BybitEnvelope = self.http.get_json(&url, Some(symbol)).await?;
        self.check(&env, Some(symbol))?;

        env.result
            .list
            .first()
            .map(|raw| to_ticker(raw, symbol.to_string(), env.time))
            .ok_or_else(|| self.http.not_found(symbol))
    }

    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError> {
        let url = format!("{}/v5/market/tickers?category=spot", BASE_URL);
        let env: BybitEnvelope = self.http.get_json(&url, None).await?;
        self.check(&env, None)?;

        let tickers = env
            .result
            .list
            .iter()
            .map(|raw| {
                let symbol = util::symbol_from_exchange(self.name(), &raw.symbol);
                to_ticker(raw, symbol, env.time)
            })
            .collect();

        Ok(select_top_pairs(tickers, quote_asset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_scaled_from_fraction() {
        let env: BybitEnvelope = serde_json::from_str(
            r#"{
                "retCode": 0,
                "retMsg": "OK",
                "result": {
                    "category": "spot",
                    "list": [{
                        "symbol": "ETHUSDT",
                        "lastPrice": "3000",
                        "highPrice24h": "3100",
                        "lowPrice24h": "2900",
                        "prevPrice24h": "3060",
                        "price24hPcnt": "-0.0196",
                        "volume24h": "1000",
                        "turnover24h": "3000000"
                    }]
                },
                "time": 1700000000000
            }"#,
        )
        .unwrap();

        let raw = &env.result.list[0];
        let t = to_ticker(raw, util::symbol_from_exchange("bybit", &raw.symbol), env.time);
        assert_eq!(t.symbol, "ETH/USDT");
        assert_eq!(t.quote_volume_24h, 3_000_000.0);
        assert!((t.change_pct_24h + 1.96).abs() < 1e-9);
    }

    #[test]
    fn error_envelope_without_result() {
        let env: BybitEnvelope =
            serde_json::from_str(r#"{ "retCode": 10001, "retMsg": "Not supported symbols", "result": {} }"#)
                .unwrap();
        let adapter = BybitAdapter::new(&HttpSettings::default(), Duration::ZERO).unwrap();

        assert!(matches!(
            adapter.check(&env, Some("FOO/USDT")),
            Err(AdapterError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            adapter.check(&env, None),
            Err(AdapterError::ExchangeUnavailable { .. })
        ));
    }
}
