use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::schema::PulseResult;

// ------------------------------------------------------------
// Snapshot row
// ------------------------------------------------------------
//
// Flat record handed to the storage collaborator.
//
// One row per contributing exchange observation. Each row carries
// the consensus values of its symbol, so a symbol seen on three
// venues yields three rows with identical numbers and different
// `exchange` values.
//
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SnapshotRow {
    pub exchange: String,
    pub symbol: String,
    pub price: f64,
    pub volume_24h: f64,
    pub change_24h: f64,
    pub captured_at: DateTime<Utc>,
}

pub fn snapshot_rows(pulse: &PulseResult) -> Vec<SnapshotRow> {
    pulse
        .symbols
        .iter()
        .flat_map(|agg| {
            agg.observations.iter().map(move |obs| SnapshotRow {
                exchange: obs.exchange().to_string(),
                symbol: agg.symbol.clone(),
                price: agg.avg_price,
                volume_24h: agg.total_volume_24h,
                change_24h: agg.avg_change_24h,
                captured_at: pulse.generated_at,
            })
        })
        .collect()
}

/// Destination for snapshot rows.
///
/// Implementations own persistence; the pipeline only writes rows
/// and reads back the most recent ones.
#[async_trait::async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Stores rows, returns how many were accepted.
    async fn store(&self, rows: &[SnapshotRow]) -> anyhow::Result<usize>;

    /// Up to `n` rows, newest first.
    async fn latest(&self, n: usize) -> anyhow::Result<Vec<SnapshotRow>>;
}

/// Bounded in-process history. Oldest rows are evicted first.
pub struct MemorySink {
    capacity: usize,
    rows: Mutex<VecDeque<SnapshotRow>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rows: Mutex::new(VecDeque::with_capacity(capacity.min(4_096))),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait::async_trait]
impl SnapshotSink for MemorySink {
    async fn store(&self, rows: &[SnapshotRow]) -> anyhow::Result<usize> {
        let mut stored = self.rows.lock().await;
        for row in rows {
            if stored.len() == self.capacity {
                stored.pop_front();
            }
            if self.capacity > 0 {
                stored.push_back(row.clone());
            }
        }
        Ok(rows.len().min(self.capacity))
    }

    async fn latest(&self, n: usize) -> anyhow::Result<Vec<SnapshotRow>> {
        let stored = self.rows.lock().await;
        Ok(stored.iter().rev().take(n).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AggregatedSymbol, CycleReport, ExchangeObservation, Ticker};

    fn pulse() -> PulseResult {
        let now = Utc::now();
        let obs = |ex: &str, price, volume, change| {
            ExchangeObservation::new(ex, Ticker::new("BTC/USDT", price, volume, change, 0.0, 0.0, now))
        };

        PulseResult {
            generated_at: now,
            symbols: vec![AggregatedSymbol {
                symbol: "BTC/USDT".into(),
                observations: vec![obs("a", 50000.0, 100.0, 1.0), obs("b", 50010.0, 300.0, 3.0)],
                avg_price: 50005.0,
                total_volume_24h: 400.0,
                avg_change_24h: 2.0,
                max_change_24h: 3.0,
            }],
            report: CycleReport::default(),
        }
    }

    #[test]
    fn one_row_per_observation() {
        let rows = snapshot_rows(&pulse());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].exchange, "a");
        assert_eq!(rows[1].exchange, "b");
        assert!(rows.iter().all(|r| r.price == 50005.0 && r.volume_24h == 400.0));
    }

    #[tokio::test]
    async fn latest_is_newest_first_and_bounded() {
        let sink = MemorySink::new(3);
        let mut rows = snapshot_rows(&pulse());
        rows[1].symbol = "ETH/USDT".into();

        sink.store(&rows).await.unwrap();
        sink.store(&rows).await.unwrap();
        assert_eq!(sink.len().await, 3);

        let latest = sink.latest(2).await.unwrap();
        assert_eq!(latest[0].symbol, "ETH/USDT");
        assert_eq!(latest[1].symbol, "BTC/USDT");
    }
}
