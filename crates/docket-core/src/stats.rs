//! Matter statistics for reporting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MatterStatusRow;
use crate::status::{StatusCategory, classify, is_overdue_on, is_stale_at};

/// Aggregate counts over stored matters, derived from their status labels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub rfe: usize,
    pub overdue: usize,
    /// Active matters not updated remotely for more than the stale threshold.
    pub stale: usize,
    /// Matters whose status could not be classified.
    pub unknown: usize,
}

impl MatterStats {
    /// Classifies every row as of `now`.
    pub fn from_rows_at(rows: &[MatterStatusRow], stale_days: i64, now: DateTime<Utc>) -> Self {
        let today: NaiveDate = now.date_naive();
        let mut stats = Self {
            total: rows.len(),
            ..Default::default()
        };

        for row in rows {
            let label = row.status_name.as_deref();
            let classification = classify(label);

            if classification.is_active {
                stats.active += 1;
                if is_stale_at(row.remote_updated_at, stale_days, now) {
                    stats.stale += 1;
                }
            }
            if classification.is_completed {
                stats.completed += 1;
            }
            if classification.is_rfe && !classification.is_rfe_filed {
                stats.rfe += 1;
            }
            if classification.category == StatusCategory::Unknown {
                stats.unknown += 1;
            }
            if is_overdue_on(row.deadline, label, today) {
                stats.overdue += 1;
            }
        }

        stats
    }

    /// [`MatterStats::from_rows_at`] evaluated against the current time.
    pub fn from_rows(rows: &[MatterStatusRow], stale_days: i64) -> Self {
        Self::from_rows_at(rows, stale_days, Utc::now())
    }
}
