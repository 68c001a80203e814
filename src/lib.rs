// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:        Configuration structs loaded from JSON
// - error:         Adapter and pipeline error types
// - schema:        Tickers, observations and aggregated records
// - util:          Symbol conversion, numeric parsing, time helpers
// - exchanges:     Exchange adapters and adapter registry
// - collector:     Concurrent fan-out over all exchanges
// - pulse:         Aggregation, ranking and the cycle pipeline
// - storage:       Snapshot rows and the sink they are written to
// - subscription:  Tier to refresh-interval mapping
// - metrics:       Global runtime counters
//
pub mod collector;
pub mod config;
pub mod error;
pub mod exchanges;
pub mod metrics;
pub mod pulse;
pub mod schema;
pub mod storage;
pub mod subscription;
pub mod util;

pub use collector::{CollectionRequest, FanoutCollector};
pub use config::Config;
pub use error::{AdapterError, PulseError};
pub use exchanges::adapter::ExchangeAdapter;
pub use pulse::MarketPulse;
pub use schema::{AggregatedSymbol, ExchangeObservation, PulseResult, Ticker};
