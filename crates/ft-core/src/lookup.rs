//! The asynchronous tab-lookup seam.

use std::future::Future;

use thiserror::Error;

use crate::event::TabId;

/// Why a tab lookup failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The tab no longer exists by the time it was queried.
    #[error("tab {0} no longer exists")]
    TabGone(TabId),
    /// The host could not answer the query.
    #[error("host lookup failed: {0}")]
    Host(String),
}

/// Resolves a tab to its current URL.
///
/// Lookups may suspend the event handler issuing them; the engine serializes
/// event processing so that events arriving while a lookup is in flight are
/// queued and replayed after the lookup's disposition is known. A failed
/// lookup discards the pending transition without touching tracker state.
pub trait TabLookup {
    /// Returns the tab's current URL, or an error if it is gone.
    fn lookup(&self, tab_id: TabId) -> impl Future<Output = Result<String, LookupError>> + Send;
}
