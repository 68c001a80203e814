use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::{
    config::HttpSettings,
    error::{AdapterError, PulseError},
    schema::Ticker,
    util,
};

use super::adapter::{ExchangeAdapter, select_top_pairs};
use super::http::VenueHttp;

const BASE_URL: &str = "https://api.gateio.ws";

/// Public spot endpoints allow 200 requests per 10 seconds.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Gate.io v4 spot REST adapter
///
/// https://www.gate.io/docs/developers/apiv4/#retrieve-ticker-information
///
/// An unknown pair comes back as HTTP 400 INVALID_CURRENCY_PAIR,
/// which `VenueHttp` already maps to `SymbolNotFound`.
pub struct GateIoAdapter {
    http: VenueHttp,
}

impl GateIoAdapter {
    pub fn new(settings: &HttpSettings, min_interval: Duration) -> Result<Self, PulseError> {
        Ok(Self {
            http: VenueHttp::new("gateio", settings, min_interval)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GateTicker {
    currency_pair: String,
    last: Option<String>,
    /// Already in percent
    change_percentage: Option<String>,
    high_24h: Option<String>,
    low_24h: Option<String>,
    quote_volume: Option<String>,
}

// Gate.io tickers carry no timestamp.
fn to_ticker(raw: &GateTicker, symbol: String) -> Ticker {
    Ticker::new(
        symbol,
        util::parse_num(raw.last.as_deref()),
        util::parse_num(raw.quote_volume.as_deref()),
        util::parse_num(raw.change_percentage.as_deref()),
        util::parse_num(raw.high_24h.as_deref()),
        util::parse_num(raw.low_24h.as_deref()),
        Utc::now(),
    )
}

#[async_trait::async_trait]
impl ExchangeAdapter for GateIoAdapter {
    fn name(&self) -> &'static str {
        "gateio"
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!(
            "{}/api/v4/spot/tickers?currency_pair={}",
            BASE_URL,
            util::symbol_to_exchange(self.name(), symbol)
        );
        let list: Vec<GateTicker> = self.http.get_json(&url, Some(symbol)).await?;

        list.first()
            .map(|raw| to_ticker(raw, symbol.to_string()))
            .ok_or_else(|| self.http.not_found(symbol))
    }

    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError> {
        let url = format!("{}/api/v4/spot/tickers", BASE_URL);
        let list: Vec<GateTicker> = self.http.get_json(&url, None).await?;

        let tickers = list
            .iter()
            .map(|raw| to_ticker(raw, util::symbol_from_exchange(self.name(), &raw.currency_pair)))
            .collect();

        Ok(select_top_pairs(tickers, quote_asset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ticker_list() {
        let list: Vec<GateTicker> = serde_json::from_str(
            r#"[{
                "currency_pair": "BTC_USDT",
                "last": "50010",
                "lowest_ask": "50011",
                "highest_bid": "50009",
                "change_percentage": "3.0",
                "base_volume": "6",
                "quote_volume": "300",
                "high_24h": "50500",
                "low_24h": "48000"
            }, {
                "currency_pair": "ETH_BTC",
                "last": "0.05",
                "quote_volume": "12"
            }]"#,
        )
        .unwrap();

        let tickers: Vec<Ticker> = list
            .iter()
            .map(|raw| to_ticker(raw, util::symbol_from_exchange("gateio", &raw.currency_pair)))
            .collect();

        assert_eq!(tickers[0].symbol, "BTC/USDT");
        assert_eq!(tickers[0].change_pct_24h, 3.0);
        assert_eq!(tickers[0].quote_volume_24h, 300.0);
        assert_eq!(tickers[1].symbol, "ETH/BTC");
        assert_eq!(tickers[1].high_24h, 0.0);

        let top = select_top_pairs(tickers, "USDT", 10);
        assert_eq!(top.len(), 1);
    }
}
