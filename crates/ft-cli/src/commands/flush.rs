//! The `flush` command: drain the persisted ledger to the collector once.

use anyhow::{Context, Result};

use ft_core::UsageLedger;
use ft_store::LedgerStore;
use ft_transport::{CollectorClient, DeliverUsage};

use crate::Config;

/// Attempts a single delivery of everything pending in the persisted ledger.
///
/// Applies the same policy as the engine's flush tick: entries leave the
/// ledger before the network call and are written back untouched when
/// delivery fails, so nothing is lost and nothing is double-counted.
pub async fn run(config: &Config) -> Result<()> {
    let store = LedgerStore::open(&config.ledger_path).with_context(|| {
        format!("failed to open ledger at {}", config.ledger_path.display())
    })?;
    let mut ledger =
        UsageLedger::from_entries(store.load_ledger().context("failed to load ledger")?);

    if ledger.is_empty() {
        println!("Ledger is empty, nothing to flush.");
        return Ok(());
    }

    let client = CollectorClient::new(&config.collector_url, config.request_timeout())
        .context("invalid collector configuration")?;
    let batch = ledger.snapshot_and_clear();

    match client.deliver(&batch.entries).await {
        Ok(()) => {
            store
                .save_ledger(ledger.entries())
                .context("delivered, but failed to clear the persisted ledger")?;
            println!("Flushed {} entries to {}.", batch.entries.len(), config.collector_url);
            Ok(())
        }
        Err(err) => {
            // The persisted ledger was never cleared, so the batch is intact
            // for the next attempt.
            Err(err).context("delivery failed, ledger left untouched")
        }
    }
}
