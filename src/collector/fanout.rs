use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, timeout_at};

use crate::{
    error::{AdapterError, PulseError},
    exchanges::adapter::ExchangeAdapter,
    metrics::{METRICS, RuntimeMetrics},
    schema::{CycleReport, Ticker},
};

/// What one collection cycle asks every exchange for.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionRequest {
    /// One task per (exchange, symbol); symbols in BASE/QUOTE form
    Symbols(Vec<String>),

    /// One task per exchange
    TopPairs { quote_asset: String, limit: usize },
}

/// Exchange name -> tickers that exchange returned.
///
/// Ordered map so that folding it downstream never depends on
/// which task finished first.
pub type CollectedTickers = BTreeMap<String, Vec<Ticker>>;

/// Output of one cycle: the tickers plus how the tasks fared.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub tickers: CollectedTickers,
    pub report: CycleReport,
}

impl Collection {
    pub fn ticker_count(&self) -> usize {
        self.tickers.values().map(Vec::len).sum()
    }
}

/// Unit of work for a single fetch task.
#[derive(Debug, Clone)]
enum Unit {
    Ticker(String),
    TopPairs { quote_asset: String, limit: usize },
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Ticker(symbol) => write!(f, "ticker {symbol}"),
            Unit::TopPairs { quote_asset, limit } => write!(f, "top {limit} /{quote_asset} pairs"),
        }
    }
}

type Outcome = Result<Vec<Ticker>, AdapterError>;

/// Concurrent fan-out over all configured exchanges.
///
/// DESIGN:
/// - One task per (exchange, unit of work), spawned on a JoinSet
/// - At most `max_in_flight` tasks hold a permit at once
/// - Each task reports into its own slot (its task index); nothing
///   is shared between tasks except the adapter's own rate limiter
/// - When the cycle deadline passes, pending tasks are aborted and
///   whatever already finished is kept
/// - Slots are folded sequentially in task order once all tasks are
///   done or aborted
///
/// FAILURE POLICY:
/// - A failed, panicked or aborted task contributes nothing and is logged
/// - All tasks failing still yields `Ok` with an empty collection
/// - Only malformed requests are errors
pub struct FanoutCollector {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    cycle_timeout: Duration,
    max_in_flight: usize,
}

impl FanoutCollector {
    pub fn new(
        adapters: Vec<Arc<dyn ExchangeAdapter>>,
        cycle_timeout: Duration,
        max_in_flight: usize,
    ) -> Result<Self, PulseError> {
        if adapters.is_empty() {
            return Err(PulseError::config("collector needs at least one exchange"));
        }
        if cycle_timeout.is_zero() {
            return Err(PulseError::config("cycle timeout must be greater than zero"));
        }
        if max_in_flight == 0 {
            return Err(PulseError::config("max_in_flight must be greater than zero"));
        }

        Ok(Self {
            adapters,
            cycle_timeout,
            max_in_flight,
        })
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.iter().map(|a| a.name())
    }

    /// Runs one collection cycle.
    pub async fn collect(&self, request: &CollectionRequest) -> Result<Collection, PulseError> {
        let units = units_for(request)?;

        let tasks: Vec<(Arc<dyn ExchangeAdapter>, Unit)> = self
            .adapters
            .iter()
            .flat_map(|adapter| units.iter().map(move |unit| (adapter.clone(), unit.clone())))
            .collect();

        let labels: Vec<(&'static str, Unit)> = tasks
            .iter()
            .map(|(adapter, unit)| (adapter.name(), unit.clone()))
            .collect();

        log::info!(
            "collecting from {} exchanges: {} tasks",
            self.adapters.len(),
            tasks.len()
        );
        RuntimeMetrics::add(&METRICS.tasks_spawned, tasks.len());

        let slots = self.run_tasks(tasks).await;
        Ok(fold_slots(&labels, slots))
    }

    /// Spawns every task and waits for all of them or the deadline.
    ///
    /// Returned slots are indexed like `tasks`; `None` means the task
    /// was still pending at the deadline.
    async fn run_tasks(&self, tasks: Vec<(Arc<dyn ExchangeAdapter>, Unit)>) -> Vec<Option<Outcome>> {
        let mut slots: Vec<Option<Outcome>> = vec![None; tasks.len()];
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let deadline = Instant::now() + self.cycle_timeout;

        let mut set = JoinSet::new();
        for (index, (adapter, unit)) in tasks.into_iter().enumerate() {
            let permits = permits.clone();
            set.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = permits.acquire_owned().await.ok();
                (index, fetch(adapter, unit).await)
            });
        }

        loop {
            let next = timeout_at(deadline, set.join_next()).await;
            match next {
                Ok(Some(Ok((index, outcome)))) => slots[index] = Some(outcome),
                Ok(Some(Err(e))) => log::warn!("fetch task ended abnormally: {e}"),
                Ok(None) => break,
                Err(_) => {
                    log::warn!(
                        "cycle deadline of {:?} reached, aborting {} pending tasks",
                        self.cycle_timeout,
                        set.len()
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        slots
    }
}

fn units_for(request: &CollectionRequest) -> Result<Vec<Unit>, PulseError> {
    match request {
        CollectionRequest::Symbols(symbols) => {
            if symbols.is_empty() {
                return Err(PulseError::config("symbol list is empty"));
            }
            Ok(symbols.iter().cloned().map(Unit::Ticker).collect())
        }
        CollectionRequest::TopPairs { quote_asset, limit } => {
            if *limit == 0 {
                return Err(PulseError::config("top pairs limit must be greater than zero"));
            }
            Ok(vec![Unit::TopPairs {
                quote_asset: quote_asset.clone(),
                limit: *limit,
            }])
        }
    }
}

/// Runs one adapter call. A panicking adapter is reported as
/// unavailable instead of tearing down the task.
async fn fetch(adapter: Arc<dyn ExchangeAdapter>, unit: Unit) -> Outcome {
    let call = async {
        match &unit {
            Unit::Ticker(symbol) => adapter.fetch_ticker(symbol).await.map(|t| vec![t]),
            Unit::TopPairs { quote_asset, limit } => {
                adapter.fetch_top_pairs(quote_asset, *limit).await
            }
        }
    };

    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => Err(AdapterError::ExchangeUnavailable {
            exchange: adapter.name().to_string(),
            reason: "adapter panicked".to_string(),
        }),
    }
}

fn fold_slots(labels: &[(&'static str, Unit)], slots: Vec<Option<Outcome>>) -> Collection {
    let mut collection = Collection::default();
    let mut reporting = BTreeSet::new();
    let report = &mut collection.report;
    report.tasks_total = slots.len();

    for ((exchange, unit), slot) in labels.iter().zip(slots) {
        match slot {
            Some(Ok(tickers)) => {
                report.tasks_ok += 1;
                reporting.insert(exchange.to_string());
                RuntimeMetrics::incr(&METRICS.tasks_ok);
                RuntimeMetrics::add(&METRICS.tickers_collected, tickers.len());
                collection
                    .tickers
                    .entry(exchange.to_string())
                    .or_default()
                    .extend(tickers);
            }
            Some(Err(e)) => {
                report.tasks_failed += 1;
                RuntimeMetrics::incr(&METRICS.tasks_failed);
                log::warn!("[{}] {} failed: {}", exchange, unit, e);
            }
            None => {
                report.tasks_cancelled += 1;
                RuntimeMetrics::incr(&METRICS.tasks_cancelled);
                log::warn!("[{}] {} cancelled at cycle deadline", exchange, unit);
            }
        }
    }

    report.exchanges_reporting = reporting.into_iter().collect();

    if report.all_failed() {
        log::warn!(
            "all {} fetch tasks failed, cycle yields no data",
            report.tasks_total
        );
    }

    collection
}
