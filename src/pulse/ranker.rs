use std::collections::BTreeMap;

use crate::error::PulseError;
use crate::schema::AggregatedSymbol;

/// Top `n` symbols by total volume, highest first.
///
/// Equal volumes are ordered by symbol ascending. Fewer than `n`
/// symbols simply returns all of them; `n == 0` is a configuration
/// error.
pub fn rank(
    aggregated: BTreeMap<String, AggregatedSymbol>,
    n: usize,
) -> Result<Vec<AggregatedSymbol>, PulseError> {
    if n == 0 {
        return Err(PulseError::config("pulse limit must be greater than zero"));
    }

    let mut ranked: Vec<AggregatedSymbol> = aggregated.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total_volume_24h
            .total_cmp(&a.total_volume_24h)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(n);

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, volume: f64) -> (String, AggregatedSymbol) {
        (
            symbol.to_string(),
            AggregatedSymbol {
                symbol: symbol.to_string(),
                observations: vec![],
                avg_price: 1.0,
                total_volume_24h: volume,
                avg_change_24h: 0.0,
                max_change_24h: 0.0,
            },
        )
    }

    fn symbols(ranked: &[AggregatedSymbol]) -> Vec<&str> {
        ranked.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn descending_volume_then_symbol() {
        let map = BTreeMap::from([
            record("ETH/USDT", 200.0),
            record("XRP/USDT", 500.0),
            record("ADA/USDT", 200.0),
            record("BTC/USDT", 900.0),
        ]);

        let ranked = rank(map, 10).unwrap();
        assert_eq!(symbols(&ranked), ["BTC/USDT", "XRP/USDT", "ADA/USDT", "ETH/USDT"]);
    }

    #[test]
    fn truncates_to_n() {
        let map = BTreeMap::from([record("A/USDT", 1.0), record("B/USDT", 2.0), record("C/USDT", 3.0)]);
        assert_eq!(symbols(&rank(map, 2).unwrap()), ["C/USDT", "B/USDT"]);
    }

    #[test]
    fn fewer_symbols_than_n() {
        let map = BTreeMap::from([record("A/USDT", 1.0), record("B/USDT", 2.0), record("C/USDT", 3.0)]);
        assert_eq!(rank(map, 10).unwrap().len(), 3);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let map = BTreeMap::from([record("A/USDT", 1.0)]);
        assert!(matches!(rank(map, 0), Err(PulseError::Configuration(_))));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(rank(BTreeMap::new(), 5).unwrap().is_empty());
    }
}
