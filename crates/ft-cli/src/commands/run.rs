//! The `run` command: the long-lived tracking engine.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use ft_core::{HostEvent, TargetResolver};
use ft_store::LedgerStore;
use ft_transport::CollectorClient;

use crate::Config;
use crate::engine::Engine;
use crate::host::{self, SharedTabs, WireEvent};

/// Queue depth for host events awaiting the engine.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Runs the engine until the host suspends or stdin closes.
pub async fn run(config: &Config) -> Result<()> {
    if let Some(parent) = config.ledger_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create ledger directory")?;
    }
    let store = LedgerStore::open(&config.ledger_path).with_context(|| {
        format!("failed to open ledger at {}", config.ledger_path.display())
    })?;
    let client = CollectorClient::new(&config.collector_url, config.request_timeout())
        .context("invalid collector configuration")?;
    let tabs = SharedTabs::default();
    let resolver = TargetResolver::new(config.aliases.clone());

    let engine = Engine::new(tabs.clone(), client, store, resolver);
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let engine_task = tokio::spawn(engine.run(rx, config.flush_interval()));

    tracing::info!(
        collector = %config.collector_url,
        interval_secs = config.flush_interval_secs,
        "tracking engine started, reading host events from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            // EOF: the host bridge went away. Treat it as a suspend so the
            // engine performs its final accumulation and flush.
            let _ = tx.send(HostEvent::HostSuspending).await;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let wire: WireEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(%err, line, "ignoring malformed host event");
                continue;
            }
        };
        let suspending = wire == WireEvent::Suspending;
        let event = host::apply_wire_event(&tabs, wire);
        if tx.send(event).await.is_err() {
            break;
        }
        if suspending {
            break;
        }
    }
    drop(tx);

    let engine = engine_task.await.context("engine task panicked")?;
    let stats = engine.stats();
    tracing::info!(
        events = stats.events_processed,
        delivered = stats.batches_delivered,
        transport_failures = stats.transport_failures,
        lookup_failures = stats.lookup_failures,
        "tracking engine stopped"
    );
    Ok(())
}
