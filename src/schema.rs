use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------
// Ticker
// ------------------------------------------------------------
//
// One exchange's 24h statistics for one symbol at one instant.
//
// IMPORTANT:
// - `symbol` is always in canonical BASE/QUOTE form ("BTC/USDT").
//   Adapters convert venue formats before building a Ticker.
// - Numbers are finite. Missing or unparsable venue fields become 0,
//   never NaN, so they can flow into sums and means safely.
// - Quote volume is never negative.
// - Deserialized tickers pass through `Ticker::new` as well.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(from = "RawTicker")]
pub struct Ticker {
    pub symbol: String,

    /// Last traded price
    pub last_price: f64,

    /// 24h volume denominated in the quote asset
    pub quote_volume_24h: f64,

    /// 24h change in percent (may be negative)
    pub change_pct_24h: f64,

    pub high_24h: f64,
    pub low_24h: f64,

    pub observed_at: DateTime<Utc>,
}

impl Ticker {
    pub fn new(
        symbol: impl Into<String>,
        last_price: f64,
        quote_volume_24h: f64,
        change_pct_24h: f64,
        high_24h: f64,
        low_24h: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: finite_or_zero(last_price),
            quote_volume_24h: finite_or_zero(quote_volume_24h).max(0.0),
            change_pct_24h: finite_or_zero(change_pct_24h),
            high_24h: finite_or_zero(high_24h),
            low_24h: finite_or_zero(low_24h),
            observed_at,
        }
    }
}

#[derive(Deserialize)]
struct RawTicker {
    symbol: String,
    last_price: f64,
    quote_volume_24h: f64,
    change_pct_24h: f64,
    high_24h: f64,
    low_24h: f64,
    observed_at: DateTime<Utc>,
}

impl From<RawTicker> for Ticker {
    fn from(raw: RawTicker) -> Self {
        Ticker::new(
            raw.symbol,
            raw.last_price,
            raw.quote_volume_24h,
            raw.change_pct_24h,
            raw.high_24h,
            raw.low_24h,
            raw.observed_at,
        )
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

// ------------------------------------------------------------
// Exchange observation
// ------------------------------------------------------------
//
// A ticker tagged with the exchange that produced it.
// Immutable once built; only read through accessors.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExchangeObservation {
    exchange: String,
    ticker: Ticker,
}

impl ExchangeObservation {
    pub fn new(exchange: impl Into<String>, ticker: Ticker) -> Self {
        Self {
            exchange: exchange.into(),
            ticker,
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn price(&self) -> f64 {
        self.ticker.last_price
    }

    pub fn volume(&self) -> f64 {
        self.ticker.quote_volume_24h
    }

    pub fn change(&self) -> f64 {
        self.ticker.change_pct_24h
    }
}

// ------------------------------------------------------------
// Aggregated symbol
// ------------------------------------------------------------
//
// Consensus view of one symbol across every exchange that reported
// it during a cycle.
//
// INVARIANTS:
// - `observations` is never empty
// - `total_volume_24h` is the sum of observation volumes
// - averages are taken over reporting exchanges only
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregatedSymbol {
    pub symbol: String,

    /// One entry per reporting exchange, ordered by exchange name
    pub observations: Vec<ExchangeObservation>,

    pub avg_price: f64,
    pub total_volume_24h: f64,
    pub avg_change_24h: f64,

    /// Highest 24h change among reporting exchanges.
    ///
    /// NOTE:
    /// No downstream consumer reads this yet; kept on the record
    /// so it is available once one does.
    pub max_change_24h: f64,
}

impl AggregatedSymbol {
    pub fn exchange_count(&self) -> usize {
        self.observations.len()
    }
}

// ------------------------------------------------------------
// Cycle report
// ------------------------------------------------------------
//
// Bookkeeping for one collection cycle. Lets callers tell
// "every adapter failed" apart from "adapters answered but
// nothing matched".
//
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub tasks_total: usize,
    pub tasks_ok: usize,
    pub tasks_failed: usize,
    pub tasks_cancelled: usize,

    /// Exchanges with at least one successful task, sorted
    pub exchanges_reporting: Vec<String>,
}

impl CycleReport {
    pub fn all_failed(&self) -> bool {
        self.tasks_total > 0 && self.tasks_ok == 0
    }
}

// ------------------------------------------------------------
// Pulse result
// ------------------------------------------------------------
//
// Ranked top-N aggregated snapshot for one cycle. Rebuilt from
// scratch on every cycle; the core keeps no copy of it.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PulseResult {
    pub generated_at: DateTime<Utc>,

    /// Sorted by total volume descending, ties by symbol ascending
    pub symbols: Vec<AggregatedSymbol>,

    pub report: CycleReport,
}

impl PulseResult {
    /// True when callers should show a "no data" state.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}
