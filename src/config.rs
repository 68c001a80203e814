use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::collector::CollectionRequest;
use crate::error::PulseError;
use crate::subscription::{SubscriptionTier, TierSchedule};

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// Top-level structure loaded from `config.json`.
//
// It defines:
// - Which exchanges are queried
// - What a collection cycle asks for (symbols or top pairs)
// - HTTP client settings shared by all adapters
// - Subscription cadence used by the scheduling loop
// - Output and debug switches
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// List of exchange configurations
    pub exchanges: Vec<ExchangeConfig>,

    /// Collection cycle parameters
    #[serde(default)]
    pub pulse: PulseConfig,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub subscription: SubscriptionConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

// ------------------------------------------------------------
// Exchange configuration
// ------------------------------------------------------------
//
// One entry per venue. `name` must match a registered adapter,
// otherwise loading fails (see `exchanges::build_adapters`).
//
#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Exchange identifier (e.g. "binance", "okx", "gateio")
    pub name: String,

    /// Enables or disables this exchange at runtime
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum spacing between two requests to this venue.
    /// Falls back to the adapter's own default when absent.
    pub min_request_interval_ms: Option<u64>,
}

impl ExchangeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            min_request_interval_ms: None,
        }
    }
}

// ------------------------------------------------------------
// Pulse configuration
// ------------------------------------------------------------
//
// IMPORTANT:
// - When `symbols` is set, every exchange is asked for exactly
//   those symbols (one task per exchange and symbol).
// - Otherwise each exchange gets one "top pairs" task.
// - Symbols are expected in canonical form: BASE/QUOTE.
//
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PulseConfig {
    pub symbols: Option<Vec<String>>,

    /// Pairs requested per exchange in top-pairs mode
    pub top_pairs: usize,

    /// Size of the ranked pulse. Defaults to `top_pairs`.
    pub pulse_limit: Option<usize>,

    /// Quote asset filter for top-pairs mode (e.g. "USDT")
    pub quote_asset: String,

    /// Hard deadline for one collection cycle
    pub cycle_timeout_ms: u64,

    /// Upper bound on concurrently running fetch tasks
    pub max_in_flight: usize,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            symbols: None,
            top_pairs: 50,
            pulse_limit: None,
            quote_asset: "USDT".to_string(),
            cycle_timeout_ms: 30_000,
            max_in_flight: 16,
        }
    }
}

impl PulseConfig {
    pub fn pulse_limit(&self) -> usize {
        self.pulse_limit.unwrap_or(self.top_pairs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    /// Builds the request for one collection cycle.
    ///
    /// Duplicate symbols are dropped; the first occurrence wins.
    pub fn request(&self) -> CollectionRequest {
        match &self.symbols {
            Some(symbols) if !symbols.is_empty() => {
                let mut seen = HashSet::new();
                let symbols = symbols
                    .iter()
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| seen.insert(s.clone()))
                    .collect();
                CollectionRequest::Symbols(symbols)
            }
            _ => CollectionRequest::TopPairs {
                quote_asset: self.quote_asset.to_uppercase(),
                limit: self.top_pairs,
            },
        }
    }
}

// ------------------------------------------------------------
// HTTP settings
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout, independent of the cycle deadline
    pub request_timeout_ms: u64,

    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            user_agent: concat!("market-pulse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ------------------------------------------------------------
// Subscription configuration
// ------------------------------------------------------------
//
// `schedule_tier` makes the binary loop on that tier's refresh
// interval instead of running a single cycle.
//
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SubscriptionConfig {
    pub tiers: TierSchedule,
    pub schedule_tier: Option<SubscriptionTier>,
}

// ------------------------------------------------------------
// Output configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Print every snapshot row as JSON (demo mode)
    pub print_rows: bool,

    /// Rows kept by the in-process snapshot history
    pub history: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_rows: false,
            history: 1_000,
        }
    }
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Raises the default log level to `debug`
    pub log: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Reads and parses a JSON config file.
    ///
    /// Overrides and validation are separate steps so the caller can
    /// set up logging in between.
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> anyhow::Result<Config> {
        serde_json::from_str(data).context("parsing config json")
    }

    /// Applies overrides from a key lookup (the process environment
    /// in production).
    ///
    /// Recognised keys:
    /// - PULSE_EXCHANGES         comma separated, replaces the list;
    ///                           entries also in the file keep their settings
    /// - PULSE_TOP_PAIRS
    /// - PULSE_QUOTE_ASSET
    /// - PULSE_CYCLE_TIMEOUT_MS
    ///
    /// Unparsable numbers are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup("PULSE_EXCHANGES") {
            let mut from_file = std::mem::take(&mut self.exchanges);
            self.exchanges = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|name| match from_file.iter().position(|e| e.name == name) {
                    Some(idx) => from_file.swap_remove(idx),
                    None => ExchangeConfig::new(name),
                })
                .collect();
        }

        if let Some(raw) = lookup("PULSE_TOP_PAIRS") {
            match raw.trim().parse() {
                Ok(n) => self.pulse.top_pairs = n,
                Err(_) => log::warn!("ignoring PULSE_TOP_PAIRS={raw:?}: not a number"),
            }
        }

        if let Some(quote) = lookup("PULSE_QUOTE_ASSET") {
            self.pulse.quote_asset = quote.trim().to_uppercase();
        }

        if let Some(raw) = lookup("PULSE_CYCLE_TIMEOUT_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.pulse.cycle_timeout_ms = ms,
                Err(_) => log::warn!("ignoring PULSE_CYCLE_TIMEOUT_MS={raw:?}: not a number"),
            }
        }
    }

    /// Rejects configurations no cycle could run with.
    ///
    /// Unknown exchange names are caught later, when adapters are
    /// resolved, since only the registry knows what exists.
    pub fn validate(&self) -> Result<(), PulseError> {
        let enabled: Vec<&str> = self.enabled_exchanges().map(|e| e.name.as_str()).collect();
        if enabled.is_empty() {
            return Err(PulseError::config("no enabled exchanges"));
        }

        let mut seen = HashSet::new();
        for name in &enabled {
            if !seen.insert(*name) {
                return Err(PulseError::config(format!("exchange '{name}' listed twice")));
            }
        }

        if self.pulse.top_pairs == 0 {
            return Err(PulseError::config("top_pairs must be greater than zero"));
        }
        if self.pulse.pulse_limit() == 0 {
            return Err(PulseError::config("pulse_limit must be greater than zero"));
        }
        if self.pulse.quote_asset.trim().is_empty() {
            return Err(PulseError::config("quote_asset must not be empty"));
        }
        if self.pulse.cycle_timeout_ms == 0 {
            return Err(PulseError::config("cycle_timeout_ms must be greater than zero"));
        }
        self.subscription.tiers.validate()?;
        if self.pulse.max_in_flight == 0 {
            return Err(PulseError::config("max_in_flight must be greater than zero"));
        }
        if let Some(symbols) = &self.pulse.symbols {
            if let Some(bad) = symbols.iter().find(|s| !s.contains('/')) {
                return Err(PulseError::config(format!(
                    "symbol '{bad}' is not in BASE/QUOTE form"
                )));
            }
        }

        Ok(())
    }

    pub fn enabled_exchanges(&self) -> impl Iterator<Item = &ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled)
    }

    pub fn debug_logging(&self) -> bool {
        self.debug
            .as_ref()
            .is_some_and(|d| d.log.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"{
        "exchanges": [
            { "name": "binance" },
            { "name": "okx", "enabled": true },
            { "name": "bybit", "enabled": false }
        ]
    }"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.pulse.top_pairs, 50);
        assert_eq!(cfg.pulse.pulse_limit(), 50);
        assert_eq!(cfg.pulse.quote_asset, "USDT");
        assert_eq!(cfg.http.request_timeout_ms, 10_000);
        assert!(cfg.subscription.schedule_tier.is_none());
        assert!(!cfg.debug_logging());

        let names: Vec<_> = cfg.enabled_exchanges().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["binance", "okx"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn top_pairs_request_by_default() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        assert_eq!(
            cfg.pulse.request(),
            CollectionRequest::TopPairs {
                quote_asset: "USDT".into(),
                limit: 50
            }
        );
    }

    #[test]
    fn explicit_symbols_are_deduplicated() {
        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.pulse.symbols = Some(vec!["btc/usdt".into(), "ETH/USDT".into(), "BTC/USDT".into()]);
        assert_eq!(
            cfg.pulse.request(),
            CollectionRequest::Symbols(vec!["BTC/USDT".into(), "ETH/USDT".into()])
        );
    }

    #[test]
    fn rejects_empty_exchange_list() {
        let cfg = Config::from_json(r#"{ "exchanges": [] }"#).unwrap();
        assert!(matches!(cfg.validate(), Err(PulseError::Configuration(_))));

        let cfg =
            Config::from_json(r#"{ "exchanges": [{ "name": "okx", "enabled": false }] }"#).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_limits_and_duplicates() {
        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.pulse.top_pairs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.pulse.pulse_limit = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.pulse.cycle_timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.exchanges.push(ExchangeConfig::new("okx"));
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.pulse.symbols = Some(vec!["BTCUSDT".into()]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PULSE_EXCHANGES", "gateio, kucoin,,"),
            ("PULSE_TOP_PAIRS", "20"),
            ("PULSE_QUOTE_ASSET", "usdc"),
            ("PULSE_CYCLE_TIMEOUT_MS", "oops"),
        ]);

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        let names: Vec<_> = cfg.exchanges.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["gateio", "kucoin"]);
        assert_eq!(cfg.pulse.top_pairs, 20);
        assert_eq!(cfg.pulse.quote_asset, "USDC");
        assert_eq!(cfg.pulse.cycle_timeout_ms, 30_000);
    }

    #[test]
    fn exchange_override_keeps_file_settings() {
        let mut cfg = Config::from_json(
            r#"{
                "exchanges": [
                    { "name": "binance", "min_request_interval_ms": 250 },
                    { "name": "okx", "enabled": false },
                    { "name": "bybit" }
                ]
            }"#,
        )
        .unwrap();
        cfg.apply_overrides(|k| (k == "PULSE_EXCHANGES").then(|| "okx,gateio,binance".to_string()));

        let names: Vec<_> = cfg.exchanges.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["okx", "gateio", "binance"]);
        assert!(!cfg.exchanges[0].enabled);
        assert!(cfg.exchanges[1].enabled);
        assert_eq!(cfg.exchanges[1].min_request_interval_ms, None);
        assert_eq!(cfg.exchanges[2].min_request_interval_ms, Some(250));
    }

    #[test]
    fn rejects_zero_tier_interval() {
        let cfg = Config::from_json(
            r#"{
                "exchanges": [{ "name": "binance" }],
                "subscription": { "tiers": { "premium_hours": 0 }, "schedule_tier": "premium" }
            }"#,
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(PulseError::Configuration(_))));
        assert!(cfg.subscription.tiers.refresh_interval(SubscriptionTier::Premium).is_err());
    }

    #[test]
    fn rejects_overflowing_tier_interval() {
        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.subscription.tiers.free_hours = u64::MAX;
        cfg.subscription.schedule_tier = Some(SubscriptionTier::Free);

        assert!(matches!(cfg.validate(), Err(PulseError::Configuration(_))));
        assert!(cfg.subscription.tiers.refresh_interval(SubscriptionTier::Free).is_err());
    }
}
