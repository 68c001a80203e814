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

const BASE_URL: &str = "https://www.okx.com";

/// 20 requests per 2 seconds on the market endpoints.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

const CODE_OK: &str = "0";
const CODE_RATE_LIMIT: &str = "50011";
const CODE_NO_INSTRUMENT: &str = "51001";

/// OKX v5 REST adapter
///
/// https://www.okx.com/docs-v5/en/#order-book-trading-market-data-get-ticker
///
/// OKX answers HTTP 200 with a `code` field; anything but "0"
/// is an error.
pub struct OkxAdapter {
    http: VenueHttp,
}

impl OkxAdapter {
    pub fn new(settings: &HttpSettings, min_interval: Duration) -> Result<Self, PulseError> {
        Ok(Self {
            http: VenueHttp::new("okx", settings, min_interval)?,
        })
    }

    fn check(&self, env: &OkxEnvelope, symbol: Option<&str>) -> Result<(), AdapterError> {
        match (env.code.as_str(), symbol) {
            (CODE_OK, _) => Ok(()),
            (CODE_RATE_LIMIT, _) => Err(self.http.rate_limited()),
            (CODE_NO_INSTRUMENT, Some(symbol)) => Err(self.http.not_found(symbol)),
            (code, _) => Err(self.http.unavailable(format!("code {}: {}", code, env.msg))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OkxEnvelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<OkxTicker>,
}

#[derive(Debug, Deserialize)]
struct OkxTicker {
    #[serde(rename = "instId")]
    inst_id: String,
    last: Option<String>,
    #[serde(rename = "open24h")]
    open_24h: Option<String>,
    #[serde(rename = "high24h")]
    high_24h: Option<String>,
    #[serde(rename = "low24h")]
    low_24h: Option<String>,
    /// Spot: volume in quote currency
    #[serde(rename = "volCcy24h")]
    vol_ccy_24h: Option<String>,
    ts: Option<String>,
}

/// OKX has no percent field; change is derived from the 24h open.
fn to_ticker(raw: &OkxTicker, symbol: String) -> Ticker {
    let last = util::parse_num(raw.last.as_deref());
    let open = util::parse_num(raw.open_24h.as_deref());
    let change = if open > 0.0 {
        (last - open) / open * 100.0
    } else {
        0.0
    };

    Ticker::new(
        symbol,
        last,
        util::parse_num(raw.vol_ccy_24h.as_deref()),
        change,
        util::parse_num(raw.high_24h.as_deref()),
        util::parse_num(raw.low_24h.as_deref()),
        util::from_millis(raw.ts.as_deref().and_then(|s| s.parse().ok())),
    )
}

#[async_trait::async_trait]
impl ExchangeAdapter for OkxAdapter {
    fn name(&self) -> &'static str {
        "okx"
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!(
            "{}/api/v5/market/ticker?instId={}",
            BASE_URL,
            util::symbol_to_exchange(self.name(), symbol)
        );
        let env: OkxEnvelope = self.http.get_json(&url, Some(symbol)).await?;
        self.check(&env, Some(symbol))?;

        env.data
            .first()
            .map(|raw| to_ticker(raw, symbol.to_string()))
            .ok_or_else(|| self.http.not_found(symbol))
    }

    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError> {
        let url = format!("{}/api/v5/market/tickers?instType=SPOT", BASE_URL);
        let env: OkxEnvelope = self.http.get_json(&url, None).await?;
        self.check(&env, None)?;

        let tickers = env
            .data
            .iter()
            .map(|raw| to_ticker(raw, util::symbol_from_exchange(self.name(), &raw.inst_id)))
            .collect();

        Ok(select_top_pairs(tickers, quote_asset, limit))
    }
}
