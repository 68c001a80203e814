use std::env;

use anyhow::Context;
use tokio::time::{MissedTickBehavior, interval};

use market_pulse::{
    Config, MarketPulse,
    metrics::METRICS,
    storage::{MemorySink, SnapshotSink, snapshot_rows},
};

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Load and validate configuration
// - Resolve exchange adapters
// - Run collection cycles and hand the rows to the snapshot sink
//
// Cadence:
// - Without `subscription.schedule_tier` a single cycle runs and the
//   process exits (cron style).
// - With it, cycles repeat on that tier's refresh interval.
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("PULSE_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());

    let mut config = Config::load(&path)?;
    init_logging(&config);
    config.apply_overrides(|key| env::var(key).ok());

    let pulse = MarketPulse::from_config(&config).context("invalid configuration")?;
    let sink = MemorySink::new(config.output.history);

    log::info!(
        "market pulse started with exchanges: {}",
        pulse.collector().exchanges().collect::<Vec<_>>().join(", ")
    );

    let Some(tier) = config.subscription.schedule_tier else {
        return run_once(&pulse, &sink, &config).await;
    };

    let every = config.subscription.tiers.refresh_interval(tier)?;
    log::info!("scheduling cycles every {:?} ({} tier)", every, tier);

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = run_once(&pulse, &sink, &config).await {
            log::error!("cycle failed: {e:#}");
        }
    }
}

/// One collection cycle, from fetch to stored rows.
async fn run_once(pulse: &MarketPulse, sink: &MemorySink, config: &Config) -> anyhow::Result<()> {
    let result = pulse.run_cycle().await?;

    if result.is_empty() {
        log::warn!("no market data available this cycle");
    } else {
        for (rank, agg) in result.symbols.iter().enumerate().take(10) {
            log::info!(
                "#{:<2} {:<12} price={:.6} vol24h={:.0} chg={:+.2}% ({} exchanges)",
                rank + 1,
                agg.symbol,
                agg.avg_price,
                agg.total_volume_24h,
                agg.avg_change_24h,
                agg.exchange_count()
            );
        }
    }

    let rows = snapshot_rows(&result);
    let stored = sink.store(&rows).await?;
    log::info!("stored {} snapshot rows", stored);

    if config.output.print_rows {
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }

    log::info!("[METRICS] {}", METRICS.summary());
    Ok(())
}

// RUST_LOG wins over the config's debug switch.
fn init_logging(config: &Config) {
    let default = if config.debug_logging() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
