//! Batched, idempotent upserts.
//!
//! Records are written in chunks of [`SyncConfig::batch_size`], one store
//! transaction per chunk. The store decides create, update or skip per record
//! following [`crate::models::decide_upsert`]. A chunk that fails is rolled back,
//! reported and counted as failed; the remaining chunks still run.

use crate::config::SyncConfig;
use crate::models::SyncRecord;
use crate::progress::{SyncEvent, SyncReporter};
use crate::sync::SyncStats;
use crate::traits::EntityStore;

/// Writes records of one kind to the store in bounded batches.
pub struct UpsertEngine<'a, S, R>
where
    S: EntityStore,
    R: SyncReporter,
{
    store: &'a S,
    config: &'a SyncConfig,
    reporter: &'a R,
}

impl<'a, S, R> UpsertEngine<'a, S, R>
where
    S: EntityStore,
    R: SyncReporter,
{
    pub fn new(store: &'a S, config: &'a SyncConfig, reporter: &'a R) -> Self {
        Self {
            store,
            config,
            reporter,
        }
    }

    /// Applies all records and returns the totals of committed batches.
    ///
    /// `fetched` in the returned stats is the number of records passed in.
    pub async fn apply_batch<T: SyncRecord>(&self, records: Vec<T>) -> SyncStats {
        let mut stats = SyncStats {
            fetched: records.len(),
            ..Default::default()
        };
        if records.is_empty() {
            return stats;
        }

        let size = self.config.batch_size.max(1);
        let batches = records.len().div_ceil(size);

        for (index, chunk) in records.chunks(size).enumerate() {
            let batch = T::into_batch(chunk.to_vec());
            match self
                .store
                .upsert_batch(&batch, self.config.batch_timeout)
                .await
            {
                Ok(outcome) => {
                    stats.record_batch(outcome);
                    self.reporter.report(SyncEvent::BatchCommitted {
                        kind: T::KIND,
                        batch: index + 1,
                        batches,
                        outcome,
                        totals: &stats,
                    });
                }
                Err(e) => {
                    stats.failed += chunk.len();
                    let error = e.to_string();
                    self.reporter.report(SyncEvent::BatchFailed {
                        kind: T::KIND,
                        batch: index + 1,
                        batches,
                        records: chunk.len(),
                        error: &error,
                    });
                }
            }
        }

        stats
    }
}
