use std::collections::BTreeMap;

use crate::collector::CollectedTickers;
use crate::schema::{AggregatedSymbol, ExchangeObservation};

/// Folds per-exchange tickers into one consensus record per symbol.
///
/// - price and change are averaged over reporting exchanges only
/// - volume is summed, each venue's liquidity being independent
/// - max change is the highest change any venue reported
///
/// A symbol only gets an entry once some exchange reported it, so
/// there is never an empty bucket to average.
///
/// Observations inside a bucket are ordered by exchange name before
/// any arithmetic, which makes the floating point results identical
/// no matter in which order the fetch tasks completed. An exchange
/// reporting the same symbol twice only contributes its first ticker.
pub fn aggregate(collected: &CollectedTickers) -> BTreeMap<String, AggregatedSymbol> {
    let mut buckets: BTreeMap<String, Vec<ExchangeObservation>> = BTreeMap::new();

    for (exchange, tickers) in collected {
        for ticker in tickers {
            let bucket = buckets.entry(ticker.symbol.clone()).or_default();
            if bucket.iter().any(|o| o.exchange() == exchange) {
                log::debug!("[{}] duplicate ticker for {} dropped", exchange, ticker.symbol);
                continue;
            }
            bucket.push(ExchangeObservation::new(exchange.clone(), ticker.clone()));
        }
    }

    buckets
        .into_iter()
        .map(|(symbol, mut observations)| {
            observations.sort_by(|a, b| a.exchange().cmp(b.exchange()));
            let record = consensus(symbol.clone(), observations);
            (symbol, record)
        })
        .collect()
}

/// Caller guarantees `observations` is non-empty.
fn consensus(symbol: String, observations: Vec<ExchangeObservation>) -> AggregatedSymbol {
    let n = observations.len() as f64;

    let price_sum: f64 = observations.iter().map(ExchangeObservation::price).sum();
    let change_sum: f64 = observations.iter().map(ExchangeObservation::change).sum();
    let total_volume: f64 = observations.iter().map(ExchangeObservation::volume).sum();
    let max_change = observations
        .iter()
        .map(ExchangeObservation::change)
        .fold(f64::NEG_INFINITY, f64::max);

    AggregatedSymbol {
        symbol,
        avg_price: price_sum / n,
        total_volume_24h: total_volume,
        avg_change_24h: change_sum / n,
        max_change_24h: max_change,
        observations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Ticker;
    use chrono::Utc;

    fn ticker(symbol: &str, price: f64, volume: f64, change: f64) -> Ticker {
        Ticker::new(symbol, price, volume, change, 0.0, 0.0, Utc::now())
    }

    #[test]
    fn two_exchanges_one_symbol() {
        let mut collected = CollectedTickers::new();
        collected.insert("a".into(), vec![ticker("BTC/USDT", 50000.0, 100.0, 1.0)]);
        collected.insert("b".into(), vec![ticker("BTC/USDT", 50010.0, 300.0, 3.0)]);

        let out = aggregate(&collected);
        let btc = &out["BTC/USDT"];

        assert_eq!(btc.exchange_count(), 2);
        assert_eq!(btc.total_volume_24h, 400.0);
        assert_eq!(btc.avg_price, 50005.0);
        assert_eq!(btc.avg_change_24h, 2.0);
        assert_eq!(btc.max_change_24h, 3.0);
    }

    #[test]
    fn max_change_with_all_negative_changes() {
        let mut collected = CollectedTickers::new();
        collected.insert("a".into(), vec![ticker("ETH/USDT", 1.0, 1.0, -4.0)]);
        collected.insert("b".into(), vec![ticker("ETH/USDT", 1.0, 1.0, -2.0)]);

        let eth = &aggregate(&collected)["ETH/USDT"];
        assert_eq!(eth.max_change_24h, -2.0);
        assert_eq!(eth.avg_change_24h, -3.0);
    }

    #[test]
    fn exchange_without_tickers_creates_no_entries() {
        let mut collected = CollectedTickers::new();
        collected.insert("a".into(), vec![]);
        collected.insert("b".into(), vec![ticker("SOL/USDT", 100.0, 5.0, 0.5)]);

        let out = aggregate(&collected);
        assert_eq!(out.len(), 1);
        assert_eq!(out["SOL/USDT"].observations[0].exchange(), "b");
        assert!(aggregate(&CollectedTickers::new()).is_empty());
    }

    #[test]
    fn duplicate_exchange_ticker_is_dropped() {
        let mut collected = CollectedTickers::new();
        collected.insert(
            "a".into(),
            vec![
                ticker("BTC/USDT", 100.0, 10.0, 1.0),
                ticker("BTC/USDT", 999.0, 99.0, 9.0),
            ],
        );

        let btc = &aggregate(&collected)["BTC/USDT"];
        assert_eq!(btc.exchange_count(), 1);
        assert_eq!(btc.total_volume_24h, 10.0);
    }

    #[test]
    fn observations_sorted_by_exchange() {
        let mut collected = CollectedTickers::new();
        collected.insert("okx".into(), vec![ticker("BTC/USDT", 1.0, 1.0, 0.0)]);
        collected.insert("binance".into(), vec![ticker("BTC/USDT", 1.0, 1.0, 0.0)]);
        collected.insert("gateio".into(), vec![ticker("BTC/USDT", 1.0, 1.0, 0.0)]);

        let names: Vec<_> = aggregate(&collected)["BTC/USDT"]
            .observations
            .iter()
            .map(|o| o.exchange().to_string())
            .collect();
        assert_eq!(names, ["binance", "gateio", "okx"]);
    }
}
