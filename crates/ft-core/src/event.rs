//! Host lifecycle events consumed by the tracking engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the host assigns to a tab.
///
/// Opaque to the engine; it is only ever compared for equality against the
/// tab currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lifecycle notification from the host environment.
///
/// Events are delivered one at a time, in the order the host observed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A tab gained foreground focus. The tab's current URL is not part of
    /// the event; it must be resolved through an asynchronous lookup.
    Activate {
        /// The tab that gained focus.
        tab_id: TabId,
    },
    /// The tab already being tracked navigated to a new URL.
    TargetChanged {
        /// The tab that navigated.
        tab_id: TabId,
        /// The URL it navigated to.
        url: String,
    },
    /// A tab was closed.
    TabClosed {
        /// The tab that was closed.
        tab_id: TabId,
    },
    /// The whole host window gained or lost OS-level focus.
    HostFocusChanged {
        /// True when the host regained focus.
        focused: bool,
    },
    /// The host process is about to terminate.
    HostSuspending,
}
