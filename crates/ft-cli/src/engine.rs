//! The event-driven accounting engine.
//!
//! One task owns the tracker, the ledger and the store, consuming host
//! events from an mpsc queue and flush ticks from a timer. Because the
//! asynchronous tab lookup for `Activate` is awaited inside the event
//! handler, events that arrive while a lookup is in flight wait in the queue
//! and are replayed only after the lookup's disposition is known. That
//! serialization is what keeps a lookup racing a tab closure from leaving an
//! orphaned timer behind.
//!
//! Flush protocol: a batch leaves the ledger before the network call and is
//! restored (merged additively) only on a confirmed failure. A batch the
//! collector acknowledged can never be sent again.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use ft_core::{
    Contribution, FocusTracker, HostEvent, TabLookup, TargetResolver, TrackerState, UsageLedger,
};
use ft_store::LedgerStore;
use ft_transport::{DeliverUsage, TransportError};

/// Bound on the delivery attempted by the final flush when the host
/// suspends. A delivery that outlives it counts as failed, so the batch is
/// restored and stays in the persisted ledger for the next run.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters for every locally recovered error and delivery outcome.
///
/// The engine never escalates these conditions; tests (and operators) assert
/// on the counters instead of parsing log output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Events consumed from the queue.
    pub events_processed: u64,
    /// Activations discarded because the tab lookup failed.
    pub lookup_failures: u64,
    /// Batches restored after a failed delivery.
    pub transport_failures: u64,
    /// Ledger writes that failed (best-effort persistence).
    pub persist_failures: u64,
    /// Batches the collector acknowledged.
    pub batches_delivered: u64,
}

/// The accounting engine.
///
/// Generic over the tab-lookup and delivery seams so tests can drive both.
pub struct Engine<L, T> {
    tracker: FocusTracker,
    ledger: UsageLedger,
    store: LedgerStore,
    lookup: L,
    transport: T,
    resolver: TargetResolver,
    stats: EngineStats,
}

impl<L: TabLookup, T: DeliverUsage> Engine<L, T> {
    /// Builds an engine, recovering any ledger left over from a previous
    /// run. A corrupt persisted ledger is logged and discarded rather than
    /// halting startup.
    pub fn new(lookup: L, transport: T, store: LedgerStore, resolver: TargetResolver) -> Self {
        let mut stats = EngineStats::default();
        let ledger = match store.load_ledger() {
            Ok(entries) => {
                if !entries.is_empty() {
                    tracing::info!(targets = entries.len(), "recovered persisted ledger");
                }
                UsageLedger::from_entries(entries)
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load persisted ledger, starting empty");
                stats.persist_failures += 1;
                UsageLedger::new()
            }
        };

        Self {
            tracker: FocusTracker::new(),
            ledger,
            store,
            lookup,
            transport,
            resolver,
            stats,
        }
    }

    /// The tracker's current state.
    pub const fn state(&self) -> &TrackerState {
        self.tracker.state()
    }

    /// The in-memory ledger.
    pub const fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Mutable ledger access, for seeding state in tests and for the manual
    /// flush path.
    pub const fn ledger_mut(&mut self) -> &mut UsageLedger {
        &mut self.ledger
    }

    /// Recovered-error and delivery counters.
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Runs the engine until the host suspends or the event queue closes.
    ///
    /// Returns the engine so callers can inspect its final state. The first
    /// flush tick fires immediately, which promptly delivers anything
    /// recovered from an unclean shutdown.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<HostEvent>,
        flush_interval: Duration,
    ) -> Self {
        let mut ticker = tokio::time::interval(flush_interval);
        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(HostEvent::HostSuspending) => {
                        self.stats.events_processed += 1;
                        self.suspend().await;
                        break;
                    }
                    Some(event) => self.handle_event(event).await,
                    None => {
                        // Host went away without a suspend notification;
                        // make a best-effort final flush.
                        tracing::debug!("event queue closed, flushing and stopping");
                        self.final_flush().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.flush().await,
            }
        }
        self
    }

    /// Processes one host event.
    pub async fn handle_event(&mut self, event: HostEvent) {
        self.stats.events_processed += 1;
        tracing::trace!(?event, "processing host event");
        let now = Utc::now();

        let contribution = match event {
            HostEvent::Activate { tab_id } => match self.lookup.lookup(tab_id).await {
                Ok(url) => {
                    let target = self.resolver.resolve_url(&url);
                    self.tracker.activate(tab_id, target, now)
                }
                Err(err) => {
                    // Stale tab or host hiccup: discard the pending
                    // transition, prior state stays untouched.
                    tracing::debug!(%tab_id, %err, "tab lookup failed, keeping prior state");
                    self.stats.lookup_failures += 1;
                    None
                }
            },
            HostEvent::TargetChanged { tab_id, url } => {
                let target = self.resolver.resolve_url(&url);
                self.tracker.target_changed(tab_id, target, now)
            }
            HostEvent::TabClosed { tab_id } => self.tracker.tab_closed(tab_id, now),
            HostEvent::HostFocusChanged { focused } => {
                self.tracker.host_focus_changed(focused, now)
            }
            HostEvent::HostSuspending => {
                self.suspend().await;
                None
            }
        };

        if let Some(contribution) = contribution {
            self.record(&contribution);
        }
    }

    /// Feeds a contribution into the ledger and persists best-effort.
    fn record(&mut self, contribution: &Contribution) {
        tracing::debug!(
            target = %contribution.target,
            minutes = contribution.minutes,
            "accumulating focus time"
        );
        self.ledger
            .accumulate(&contribution.target, contribution.minutes);
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save_ledger(self.ledger.entries()) {
            // Best-effort: losing durability risks dropping pending minutes
            // on an unclean shutdown, but never halts tracking.
            tracing::warn!(%err, "failed to persist ledger");
            self.stats.persist_failures += 1;
        }
    }

    /// One flush cycle: snapshot, deliver, restore on failure.
    pub async fn flush(&mut self) {
        self.flush_bounded(None).await;
    }

    /// Flush with an optional bound on the delivery call itself.
    ///
    /// Only the network call races the deadline; the snapshot beforehand and
    /// the restore afterwards always run, so an unacknowledged batch is never
    /// dropped from the ledger mid-protocol. A delivery that outlives the
    /// bound counts as failed.
    async fn flush_bounded(&mut self, deadline: Option<Duration>) {
        if self.ledger.is_empty() {
            return;
        }
        let batch = self.ledger.snapshot_and_clear();
        self.persist();

        let delivery = self.transport.deliver(&batch.entries);
        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, delivery)
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(limit))),
            None => delivery.await,
        };

        match outcome {
            Ok(()) => {
                tracing::info!(entries = batch.entries.len(), "flushed usage batch");
                self.stats.batches_delivered += 1;
            }
            Err(err) => {
                tracing::warn!(%err, "delivery failed, restoring batch for retry");
                self.ledger.restore(batch);
                self.persist();
                self.stats.transport_failures += 1;
            }
        }
    }

    /// Final accumulation and bounded flush when the host suspends.
    async fn suspend(&mut self) {
        let contribution = self.tracker.suspend(Utc::now());
        if let Some(contribution) = contribution {
            self.record(&contribution);
        }
        self.final_flush().await;
    }

    async fn final_flush(&mut self) {
        self.flush_bounded(Some(SHUTDOWN_FLUSH_TIMEOUT)).await;
    }
}
