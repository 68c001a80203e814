/// Collector module
///
/// This module groups the logic responsible for:
/// - Turning a collection request into per-exchange fetch tasks
/// - Running those tasks concurrently under one cycle deadline
/// - Gathering successful tickers per exchange
///
/// Design notes:
/// - Exchange-specific logic MUST NOT live here
/// - One failing exchange never affects another one's results
/// - Aggregation happens downstream, in `pulse`
pub mod fanout;

pub use fanout::{CollectedTickers, Collection, CollectionRequest, FanoutCollector};
