//! Market pulse pipeline
//!
//! One cycle: fan out to every exchange, fold the tickers per symbol,
//! keep the top N by volume. Nothing survives between cycles.

pub mod aggregator;
pub mod ranker;

use chrono::Utc;

pub use aggregator::aggregate;
pub use ranker::rank;

use crate::{
    collector::{CollectionRequest, FanoutCollector},
    config::Config,
    error::PulseError,
    exchanges,
    metrics::{METRICS, RuntimeMetrics},
    schema::PulseResult,
};

pub struct MarketPulse {
    collector: FanoutCollector,
    request: CollectionRequest,
    limit: usize,
}

impl MarketPulse {
    pub fn new(
        collector: FanoutCollector,
        request: CollectionRequest,
        limit: usize,
    ) -> Result<Self, PulseError> {
        if limit == 0 {
            return Err(PulseError::config("pulse limit must be greater than zero"));
        }
        Ok(Self {
            collector,
            request,
            limit,
        })
    }

    /// Validates the configuration and resolves every adapter.
    pub fn from_config(cfg: &Config) -> Result<Self, PulseError> {
        cfg.validate()?;

        let exchanges: Vec<_> = cfg.enabled_exchanges().cloned().collect();
        let adapters = exchanges::build_adapters(&exchanges, &cfg.http)?;
        let collector =
            FanoutCollector::new(adapters, cfg.pulse.cycle_timeout(), cfg.pulse.max_in_flight)?;

        Self::new(collector, cfg.pulse.request(), cfg.pulse.pulse_limit())
    }

    pub fn collector(&self) -> &FanoutCollector {
        &self.collector
    }

    /// Runs one collection cycle and returns the ranked pulse.
    ///
    /// Exchange failures never make this fail; an empty result means
    /// "no data" and `report` says why.
    pub async fn run_cycle(&self) -> Result<PulseResult, PulseError> {
        RuntimeMetrics::incr(&METRICS.cycles_run);

        let collection = self.collector.collect(&self.request).await?;
        let aggregated = aggregate(&collection.tickers);
        let distinct = aggregated.len();
        let symbols = rank(aggregated, self.limit)?;

        if symbols.is_empty() {
            RuntimeMetrics::incr(&METRICS.cycles_empty);
            log::info!(
                "pulse cycle produced no data ({} of {} tasks failed, {} cancelled)",
                collection.report.tasks_failed,
                collection.report.tasks_total,
                collection.report.tasks_cancelled
            );
        } else {
            log::info!(
                "pulse cycle: {} tickers from {:?}, {} symbols, kept top {}",
                collection.ticker_count(),
                collection.report.exchanges_reporting,
                distinct,
                symbols.len()
            );
        }

        Ok(PulseResult {
            generated_at: Utc::now(),
            symbols,
            report: collection.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_rejects_unknown_exchange() {
        let cfg = Config::from_json(r#"{ "exchanges": [{ "name": "mtgox" }] }"#).unwrap();
        assert!(matches!(
            MarketPulse::from_config(&cfg),
            Err(PulseError::Configuration(_))
        ));
    }

    #[test]
    fn from_config_builds_one_adapter_per_exchange() {
        let cfg = Config::from_json(
            r#"{ "exchanges": [{ "name": "binance" }, { "name": "okx" }, { "name": "bybit" }, { "name": "gateio" }] }"#,
        )
        .unwrap();

        let pulse = MarketPulse::from_config(&cfg).ok().unwrap();
        let names: Vec<_> = pulse.collector().exchanges().collect();
        assert_eq!(names, ["binance", "okx", "bybit", "gateio"]);
    }
}
