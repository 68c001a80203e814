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

const BASE_URL: &str = "https://api.kucoin.com";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

const CODE_OK: &str = "200000";
const CODE_RATE_LIMIT: &str = "429000";

/// KuCoin spot REST adapter
///
/// https://www.kucoin.com/docs/rest/spot-trading/market-data/get-24hr-stats
///
/// Unknown symbols come back as code 200000 with every stat field
/// null, so a missing `last` means "not listed".
pub struct KucoinAdapter {
    http: VenueHttp,
}

impl KucoinAdapter {
    pub fn new(settings: &HttpSettings, min_interval: Duration) -> Result<Self, PulseError> {
        Ok(Self {
            http: VenueHttp::new("kucoin", settings, min_interval)?,
        })
    }

    fn check(&self, code: &str, msg: Option<&str>) -> Result<(), AdapterError> {
        match code {
            CODE_OK => Ok(()),
            CODE_RATE_LIMIT => Err(self.http.rate_limited()),
            other => Err(self
                .http
                .unavailable(format!("code {}: {}", other, msg.unwrap_or_default()))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KucoinEnvelope<T> {
    code: String,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KucoinAllTickers {
    time: Option<i64>,
    #[serde(default)]
    ticker: Vec<KucoinStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinStats {
    symbol: Option<String>,
    last: Option<String>,
    /// Fraction, "0.0123" means +1.23%
    change_rate: Option<String>,
    high: Option<String>,
    low: Option<String>,
    /// Quote-currency volume
    vol_value: Option<String>,
    time: Option<i64>,
}

fn to_ticker(raw: &KucoinStats, symbol: String, time: Option<i64>) -> Ticker {
    Ticker::new(
        symbol,
        util::parse_num(raw.last.as_deref()),
        util::parse_num(raw.vol_value.as_deref()),
        util::parse_num(raw.change_rate.as_deref()) * 100.0,
        util::parse_num(raw.high.as_deref()),
        util::parse_num(raw.low.as_deref()),
        util::from_millis(raw.time.or(time)),
    )
}

#[async_trait::async_trait]
impl ExchangeAdapter for KucoinAdapter {
    fn name(&self) -> &'static str {
        "kucoin"
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!(
            "{}/api/v1/market/stats?symbol={}",
            BASE_URL,
            util::symbol_to_exchange(self.name(), symbol)
        );
        let env: KucoinEnvelope<KucoinStats> = self.http.get_json(&url, Some(symbol)).await?;
        self.check(&env.code, env.msg.as_deref())?;

        match env.data {
            Some(raw) if raw.last.is_some() => Ok(to_ticker(&raw, symbol.to_string(), None)),
            _ => Err(self.http.not_found(symbol)),
        }
    }

    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError> {
        let url = format!("{}/api/v1/market/allTickers", BASE_URL);
        let env: KucoinEnvelope<KucoinAllTickers> = self.http.get_json(&url, None).await?;
        self.check(&env.code, env.msg.as_deref())?;

        let all = env
            .data
            .ok_or_else(|| self.http.malformed("allTickers without data"))?;

        let tickers = all
            .ticker
            .iter()
            .filter_map(|raw| {
                let symbol = util::symbol_from_exchange(self.name(), raw.symbol.as_deref()?);
                Some(to_ticker(raw, symbol, all.time))
            })
            .collect();

        Ok(select_top_pairs(tickers, quote_asset, limit))
    }
}
