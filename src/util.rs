/// Utility helpers shared by all exchange adapters.
///
/// This module contains:
/// - Symbol conversion between the canonical BASE/QUOTE form and
///   venue-specific formats
/// - Lenient numeric parsing for venue payloads
/// - Time helpers
///
/// IMPORTANT:
/// - No request logic lives here.
/// - Everything in this module is pure and deterministic.
///
use chrono::{DateTime, TimeZone, Utc};

/// Quote assets recognised when a venue glues BASE and QUOTE together
/// ("BTCUSDT"). Longer suffixes that end in a shorter one ("FDUSD",
/// "BUSD") must come before that shorter one ("USD").
const KNOWN_QUOTES: [&str; 10] = [
    "USDT", "USDC", "FDUSD", "BUSD", "TUSD", "BTC", "ETH", "BNB", "EUR", "USD",
];

/// Normalize a separator-delimited venue symbol into BASE/QUOTE.
///
/// Examples:
/// - "BTC_USDT" -> "BTC/USDT"
/// - "eth-usdt" -> "ETH/USDT"
pub fn normalize_symbol(raw: &str) -> String {
    raw.replace(['_', '-'], "/").to_uppercase()
}

/// Convert a canonical symbol into the exchange-specific format.
///
/// Examples:
/// - ("gateio", "BTC/USDT")  -> "BTC_USDT"
/// - ("binance", "BTC/USDT") -> "BTCUSDT"
/// - ("okx", "BTC/USDT")     -> "BTC-USDT"
pub fn symbol_to_exchange(exchange: &str, symbol: &str) -> String {
    let symbol = symbol.to_uppercase();
    match exchange {
        "gateio" => symbol.replace('/', "_"),
        "binance" | "bybit" => symbol.replace('/', ""),
        "okx" | "kucoin" => symbol.replace('/', "-"),
        _ => symbol,
    }
}

/// Convert an exchange-specific symbol into canonical BASE/QUOTE.
///
/// Venues without a separator are split on the first known quote
/// asset suffix. Unsplittable symbols are returned uppercased as-is;
/// they simply never match a BASE/QUOTE filter downstream.
pub fn symbol_from_exchange(exchange: &str, symbol: &str) -> String {
    match exchange {
        "gateio" | "okx" | "kucoin" => normalize_symbol(symbol),
        "binance" | "bybit" => {
            let upper = symbol.to_uppercase();
            for quote in KNOWN_QUOTES {
                if let Some(base) = upper.strip_suffix(quote) {
                    if !base.is_empty() {
                        return format!("{}/{}", base, quote);
                    }
                }
            }
            upper
        }
        _ => symbol.to_string(),
    }
}

/// True when `symbol` (canonical form) is quoted in `quote_asset`.
pub fn is_quoted_in(symbol: &str, quote_asset: &str) -> bool {
    symbol
        .rsplit_once('/')
        .is_some_and(|(_, quote)| quote.eq_ignore_ascii_case(quote_asset))
}

/// Parse a venue number. Missing, empty or garbage input yields 0.
pub fn parse_num(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Converts a venue timestamp in milliseconds, falling back to now.
pub fn from_millis(ms: Option<i64>) -> DateTime<Utc> {
    ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_venue_formats() {
        assert_eq!(symbol_to_exchange("gateio", "BTC/USDT"), "BTC_USDT");
        assert_eq!(symbol_to_exchange("binance", "btc/usdt"), "BTCUSDT");
        assert_eq!(symbol_to_exchange("bybit", "ETH/USDT"), "ETHUSDT");
        assert_eq!(symbol_to_exchange("okx", "BTC/USDT"), "BTC-USDT");
        assert_eq!(symbol_to_exchange("kucoin", "SOL/USDT"), "SOL-USDT");
    }

    #[test]
    fn splits_glued_symbols_on_known_quotes() {
        assert_eq!(symbol_from_exchange("binance", "BTCUSDT"), "BTC/USDT");
        assert_eq!(symbol_from_exchange("binance", "ETHBTC"), "ETH/BTC");
        assert_eq!(symbol_from_exchange("binance", "BTCFDUSD"), "BTC/FDUSD");
        assert_eq!(symbol_from_exchange("bybit", "SOLUSDC"), "SOL/USDC");
        assert_eq!(symbol_from_exchange("binance", "USDT"), "USDT");
    }

    #[test]
    fn normalizes_separated_symbols() {
        assert_eq!(symbol_from_exchange("gateio", "BTC_USDT"), "BTC/USDT");
        assert_eq!(symbol_from_exchange("okx", "ETH-USDT"), "ETH/USDT");
        assert_eq!(symbol_from_exchange("kucoin", "xrp-usdt"), "XRP/USDT");
    }

    #[test]
    fn quote_filter_matches_whole_quote_only() {
        assert!(is_quoted_in("BTC/USDT", "USDT"));
        assert!(is_quoted_in("BTC/USDT", "usdt"));
        assert!(!is_quoted_in("BTC/USDC", "USDT"));
        assert!(!is_quoted_in("USDT/TRY", "USDT"));
        assert!(!is_quoted_in("BTCUSDT", "USDT"));
    }

    #[test]
    fn lenient_number_parsing() {
        assert_eq!(parse_num(Some("42.5")), 42.5);
        assert_eq!(parse_num(Some(" -1.25 ")), -1.25);
        assert_eq!(parse_num(Some("")), 0.0);
        assert_eq!(parse_num(Some("NaN")), 0.0);
        assert_eq!(parse_num(None), 0.0);
    }
}
