//! The usage ledger: minutes accumulated per target between flushes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single ledger entry on the wire: `{"domain": ..., "minutes": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    /// The target the minutes are attributed to.
    pub domain: String,
    /// Accumulated minutes, non-negative.
    pub minutes: f64,
}

/// A snapshot of ledger entries taken atomically at flush time.
///
/// Entries are deduplicated by target (the ledger keys them uniquely) and
/// ordered by target name so batches are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlushBatch {
    /// The snapshotted entries.
    pub entries: Vec<UsageEntry>,
}

impl FlushBatch {
    /// Returns true when the batch holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulator mapping target identifier to accumulated minutes.
///
/// Between two flushes a target's value only grows and is never negative.
/// Entries leave the ledger only through [`UsageLedger::snapshot_and_clear`]
/// and come back only through [`UsageLedger::restore`] after a failed
/// delivery.
#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: HashMap<String, f64>,
}

impl UsageLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted entries, e.g. after an unclean
    /// shutdown. Non-positive persisted values are dropped.
    #[must_use]
    pub fn from_entries(entries: HashMap<String, f64>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0.0)
            .collect();
        Self { entries }
    }

    /// Adds minutes to a target, creating the entry lazily.
    ///
    /// Negative input is clamped to zero (and logged); zero input is a no-op
    /// so the ledger never holds empty entries.
    pub fn accumulate(&mut self, target: &str, minutes: f64) {
        if minutes < 0.0 {
            tracing::warn!(target, minutes, "ignoring negative accumulation");
            return;
        }
        if minutes == 0.0 {
            return;
        }
        *self.entries.entry(target.to_string()).or_insert(0.0) += minutes;
    }

    /// Atomically copies the current map into a [`FlushBatch`] and empties
    /// the ledger. The batch may be empty.
    pub fn snapshot_and_clear(&mut self) -> FlushBatch {
        let mut entries: Vec<UsageEntry> = self
            .entries
            .drain()
            .map(|(domain, minutes)| UsageEntry { domain, minutes })
            .collect();
        entries.sort_by(|a, b| a.domain.cmp(&b.domain));
        FlushBatch { entries }
    }

    /// Merges a previously snapshotted batch back by additive accumulation.
    ///
    /// Used when delivery fails; time accumulated since the snapshot is
    /// preserved, never overwritten.
    pub fn restore(&mut self, batch: FlushBatch) {
        for entry in batch.entries {
            self.accumulate(&entry.domain, entry.minutes);
        }
    }

    /// Returns true when no minutes are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The pending minutes for a target, zero when absent.
    #[must_use]
    pub fn minutes_for(&self, target: &str) -> f64 {
        self.entries.get(target).copied().unwrap_or(0.0)
    }

    /// The backing map, for persistence.
    #[must_use]
    pub const fn entries(&self) -> &HashMap<String, f64> {
        &self.entries
    }
}
