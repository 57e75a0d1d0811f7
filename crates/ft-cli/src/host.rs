//! The stdin host adapter.
//!
//! A host (browser extension bridge or anything else) feeds lifecycle events
//! as JSON lines, e.g.:
//!
//! ```text
//! {"type":"activate","tab_id":3,"url":"https://foo.com/x"}
//! {"type":"target_changed","tab_id":3,"url":"https://bar.com"}
//! {"type":"tab_closed","tab_id":3}
//! {"type":"host_focus","focused":false}
//! {"type":"suspending"}
//! ```
//!
//! URLs observed on the wire populate a shared tab table, which answers the
//! engine's asynchronous tab lookups during `Activate`. Closing a tab
//! removes it from the table, so a lookup that lost the race against closure
//! fails with a stale-tab error instead of resurrecting the tab.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;

use ft_core::{HostEvent, LookupError, TabId, TabLookup};

/// A host lifecycle event as it appears on the wire.
///
/// Unlike [`HostEvent`], `activate` may carry the URL the host already knows;
/// it is recorded in the tab table before the engine resolves the activation
/// through the lookup seam.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// A tab gained foreground focus.
    Activate {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    /// The tab navigated.
    TargetChanged { tab_id: TabId, url: String },
    /// A tab was closed.
    TabClosed { tab_id: TabId },
    /// The host window gained or lost OS focus.
    HostFocus { focused: bool },
    /// The host is shutting down.
    Suspending,
}

/// Shared table of the last URL observed per tab.
///
/// The reader task records URLs as wire events arrive; the engine consults
/// the table through [`TabLookup`] when handling `Activate`.
#[derive(Debug, Clone, Default)]
pub struct SharedTabs {
    inner: Arc<Mutex<HashMap<TabId, String>>>,
}

impl SharedTabs {
    /// Records the URL a tab currently shows.
    pub fn record(&self, tab_id: TabId, url: String) {
        self.lock().insert(tab_id, url);
    }

    /// Forgets a closed tab.
    pub fn forget(&self, tab_id: TabId) {
        self.lock().remove(&tab_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TabLookup for SharedTabs {
    async fn lookup(&self, tab_id: TabId) -> Result<String, LookupError> {
        self.lock()
            .get(&tab_id)
            .cloned()
            .ok_or(LookupError::TabGone(tab_id))
    }
}

/// Translates a wire event into a core event, updating the tab table.
///
/// Must be called in host order: table updates happen here, before the engine
/// processes the resulting event, so lookups see exactly what the host had
/// observed up to that point.
pub fn apply_wire_event(tabs: &SharedTabs, event: WireEvent) -> HostEvent {
    match event {
        WireEvent::Activate { tab_id, url } => {
            if let Some(url) = url {
                tabs.record(tab_id, url);
            }
            HostEvent::Activate { tab_id }
        }
        WireEvent::TargetChanged { tab_id, url } => {
            tabs.record(tab_id, url.clone());
            HostEvent::TargetChanged { tab_id, url }
        }
        WireEvent::TabClosed { tab_id } => {
            tabs.forget(tab_id);
            HostEvent::TabClosed { tab_id }
        }
        WireEvent::HostFocus { focused } => HostEvent::HostFocusChanged { focused },
        WireEvent::Suspending => HostEvent::HostSuspending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn activate_records_url_for_lookup() {
        let tabs = SharedTabs::default();
        let event = apply_wire_event(
            &tabs,
            WireEvent::Activate {
                tab_id: TabId(1),
                url: Some("https://foo.com/x".into()),
            },
        );
        assert_eq!(event, HostEvent::Activate { tab_id: TabId(1) });
        assert_eq!(tabs.lookup(TabId(1)).await.unwrap(), "https://foo.com/x");
    }

    #[tokio::test]
    async fn closed_tab_fails_lookup() {
        let tabs = SharedTabs::default();
        tabs.record(TabId(1), "https://foo.com".into());
        apply_wire_event(&tabs, WireEvent::TabClosed { tab_id: TabId(1) });

        assert_eq!(
            tabs.lookup(TabId(1)).await,
            Err(LookupError::TabGone(TabId(1)))
        );
    }

    #[test]
    fn wire_events_parse_from_json_lines() {
        let event: WireEvent =
            serde_json::from_str(r#"{"type":"activate","tab_id":3,"url":"https://foo.com"}"#)
                .unwrap();
        assert_eq!(
            event,
            WireEvent::Activate {
                tab_id: TabId(3),
                url: Some("https://foo.com".into()),
            }
        );

        let event: WireEvent = serde_json::from_str(r#"{"type":"activate","tab_id":3}"#).unwrap();
        assert_eq!(
            event,
            WireEvent::Activate {
                tab_id: TabId(3),
                url: None,
            }
        );

        let event: WireEvent = serde_json::from_str(r#"{"type":"suspending"}"#).unwrap();
        assert_eq!(event, WireEvent::Suspending);
    }
}
