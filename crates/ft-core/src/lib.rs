//! Core domain logic for the focus tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Focus tracking: the state machine that turns host lifecycle events
//!   into per-target duration contributions
//! - Usage ledger: the accumulator that holds minutes per target between
//!   flushes, with snapshot/restore semantics for lossless delivery
//! - Target resolution: extracting a domain from a navigated URL and
//!   mapping it through user-configured aliases

mod event;
mod ledger;
mod lookup;
mod resolve;
mod tracker;

pub use event::{HostEvent, TabId};
pub use ledger::{FlushBatch, UsageEntry, UsageLedger};
pub use lookup::{LookupError, TabLookup};
pub use resolve::{TargetResolver, UNKNOWN_TARGET, extract_domain};
pub use tracker::{Contribution, FocusTracker, TrackerState};
