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

const BASE_URL: &str = "https://api.binance.com";

/// Weight budget is 6000/min per IP; the all-tickers call costs 80.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Binance (Global) spot REST adapter
///
/// 24hr ticker statistics:
/// https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints
pub struct BinanceAdapter {
    http: VenueHttp,
}

impl BinanceAdapter {
    pub fn new(settings: &HttpSettings, min_interval: Duration) -> Result<Self, PulseError> {
        Ok(Self {
            http: VenueHttp::new("binance", settings, min_interval)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binance24hr {
    symbol: String,
    last_price: Option<String>,
    price_change_percent: Option<String>,
    high_price: Option<String>,
    low_price: Option<String>,
    quote_volume: Option<String>,
    close_time: Option<i64>,
}

fn to_ticker(raw: &Binance24hr, symbol: String) -> Ticker {
    Ticker::new(
        symbol,
        util::parse_num(raw.last_price.as_deref()),
        util::parse_num(raw.quote_volume.as_deref()),
        util::parse_num(raw.price_change_percent.as_deref()),
        util::parse_num(raw.high_price.as_deref()),
        util::parse_num(raw.low_price.as_deref()),
        util::from_millis(raw.close_time),
    )
}

#[async_trait::async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}",
            BASE_URL,
            util::symbol_to_exchange(self.name(), symbol)
        );
        let raw: Binance24hr = self.http.get_json(&url, Some(symbol)).await?;
        Ok(to_ticker(&raw, symbol.to_string()))
    }

    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError> {
        let url = format!("{}/api/v3/ticker/24hr", BASE_URL);
        let all: Vec<Binance24hr> = self.http.get_json(&url, None).await?;

        let tickers = all
            .iter()
            .map(|raw| to_ticker(raw, util::symbol_from_exchange(self.name(), &raw.symbol)))
            .collect();

        Ok(select_top_pairs(tickers, quote_asset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "symbol": "BTCUSDT",
        "priceChange": "-94.99999800",
        "priceChangePercent": "-0.95",
        "lastPrice": "50000.00",
        "highPrice": "51000.00",
        "lowPrice": "49000.00",
        "volume": "100.0",
        "quoteVolume": "5000000.5",
        "closeTime": 1700000000000
    }"#;

    #[test]
    fn decodes_24hr_ticker() {
        let raw: Binance24hr = serde_json::from_str(SAMPLE).unwrap();
        let t = to_ticker(&raw, util::symbol_from_exchange("binance", &raw.symbol));

        assert_eq!(t.symbol, "BTC/USDT");
        assert_eq!(t.last_price, 50000.0);
        assert_eq!(t.quote_volume_24h, 5000000.5);
        assert_eq!(t.change_pct_24h, -0.95);
        assert_eq!(t.high_24h, 51000.0);
        assert_eq!(t.observed_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let raw: Binance24hr = serde_json::from_str(r#"{ "symbol": "ETHUSDT" }"#).unwrap();
        let t = to_ticker(&raw, "ETH/USDT".into());
        assert_eq!(t.last_price, 0.0);
        assert_eq!(t.quote_volume_24h, 0.0);
    }
}
