use crate::error::AdapterError;
use crate::schema::Ticker;
use crate::util;

/// ExchangeAdapter is the abstraction layer between:
/// - The fan-out collector
/// - Exchange-specific REST market data APIs
///
/// Each exchange implementation must:
/// - Convert canonical symbols to the venue format and back
/// - Decode venue payloads into `Ticker`
/// - Map venue failures onto `AdapterError`
/// - Throttle itself (every request goes through its own rate limiter)
///
/// DESIGN GOALS:
/// - Zero exchange-specific logic outside adapters
/// - One adapter instance per exchange per process
/// - No retries here; the next scheduled cycle is the retry
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - Adapter instances are shared across concurrent fetch tasks,
///   which all funnel through the same limiter
///
#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Returns the canonical exchange name.
    ///
    /// CONTRACT:
    /// - Must match `exchanges[].name` in configuration
    /// - Used as the exchange key for collected tickers
    fn name(&self) -> &'static str;

    /// Fetches 24h statistics for one canonical symbol.
    ///
    /// The returned ticker carries the same canonical symbol that was
    /// requested.
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError>;

    /// Fetches the `limit` highest-volume pairs quoted in `quote_asset`.
    ///
    /// Implementations download the venue's full ticker list and
    /// hand it to `select_top_pairs`.
    async fn fetch_top_pairs(
        &self,
        quote_asset: &str,
        limit: usize,
    ) -> Result<Vec<Ticker>, AdapterError>;
}

/// Picks the top `limit` tickers by quote volume.
///
/// The quote-asset and non-zero volume filters run before the sort,
/// so the sort only sees candidates that can be returned. Equal
/// volumes are ordered by symbol to keep the cut stable.
pub fn select_top_pairs(tickers: Vec<Ticker>, quote_asset: &str, limit: usize) -> Vec<Ticker> {
    let mut candidates: Vec<Ticker> = tickers
        .into_iter()
        .filter(|t| util::is_quoted_in(&t.symbol, quote_asset))
        .filter(|t| t.quote_volume_24h > 0.0)
        .collect();

    candidates.sort_by(|a, b| {
        b.quote_volume_24h
            .total_cmp(&a.quote_volume_24h)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticker(symbol: &str, volume: f64) -> Ticker {
        Ticker::new(symbol, 1.0, volume, 0.0, 0.0, 0.0, Utc::now())
    }

    #[test]
    fn filters_before_ranking() {
        let tickers = vec![
            ticker("BTC/USDT", 500.0),
            ticker("ETH/BTC", 10_000.0),
            ticker("DOGE/USDT", 0.0),
            ticker("ETH/USDT", 300.0),
            ticker("SOL/USDT", 900.0),
        ];

        let top = select_top_pairs(tickers, "USDT", 2);
        let symbols: Vec<_> = top.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["SOL/USDT", "BTC/USDT"]);
    }

    #[test]
    fn limit_larger_than_candidates() {
        let top = select_top_pairs(vec![ticker("BTC/USDT", 1.0)], "USDT", 50);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn equal_volume_ordered_by_symbol() {
        let tickers = vec![ticker("XRP/USDT", 5.0), ticker("ADA/USDT", 5.0)];
        let top = select_top_pairs(tickers, "USDT", 2);
        assert_eq!(top[0].symbol, "ADA/USDT");
    }
}
