//! The focus-tracking state machine.
//!
//! Converts an irregular stream of host lifecycle events into per-target
//! duration contributions. The tracker is a pure state machine: every
//! transition method takes the current time as a parameter, so callers (and
//! tests) control the clock. The engine loop feeds it wall-clock time.
//!
//! # Transition rule
//!
//! Whenever an event ends the current attribution interval, the elapsed time
//! for the currently tracked target is computed first (clamped to zero on
//! clock skew) and returned as a [`Contribution`] for the caller to feed into
//! the ledger. The event-specific transition is applied afterwards.

use chrono::{DateTime, Utc};

use crate::event::TabId;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Minutes attributed to a target by a completed tracking interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// The target the interval is attributed to.
    pub target: String,
    /// Elapsed minutes, always non-negative.
    pub minutes: f64,
}

/// The tracker's attribution state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerState {
    /// No target is being attributed.
    Idle,
    /// A target is actively accumulating time.
    Tracking {
        /// The resolved target (domain or alias).
        target: String,
        /// The host tab the target belongs to.
        tab_id: TabId,
        /// When the current interval began.
        started_at: DateTime<Utc>,
    },
    /// The host lost OS-level focus but the tab is still the logical target.
    Paused {
        /// The target to resume when focus returns.
        target: String,
        /// The host tab the target belongs to.
        tab_id: TabId,
    },
    /// The host is shutting down; no further transitions are accepted.
    Terminal,
}

/// Owned focus-tracking state machine.
///
/// Replaced wholesale on every transition; never mutated in place except the
/// interval start on resume.
#[derive(Debug)]
pub struct FocusTracker {
    state: TrackerState,
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTracker {
    /// Creates a tracker in the `Idle` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TrackerState::Idle,
        }
    }

    /// Returns the current state.
    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Closes the running interval, if any, without changing state.
    ///
    /// Returns `None` unless the tracker is `Tracking` and a positive amount
    /// of time has elapsed. Negative elapsed time (clock skew) is clamped to
    /// zero and never subtracted.
    fn close_interval(&self, now: DateTime<Utc>) -> Option<Contribution> {
        let TrackerState::Tracking {
            target, started_at, ..
        } = &self.state
        else {
            return None;
        };
        let elapsed_ms = (now - *started_at).num_milliseconds();
        if elapsed_ms < 0 {
            tracing::warn!(target = %target, elapsed_ms, "clock went backwards, clamping to zero");
        }
        if elapsed_ms <= 0 {
            return None;
        }
        #[expect(clippy::cast_precision_loss, reason = "intervals are far below 2^52 ms")]
        let minutes = elapsed_ms as f64 / MILLIS_PER_MINUTE;
        Some(Contribution {
            target: target.clone(),
            minutes,
        })
    }

    /// A tab gained foreground focus and its target has been resolved.
    ///
    /// The caller performs the asynchronous URL lookup before invoking this;
    /// on lookup failure the tracker must not be touched at all, which keeps
    /// the prior state (and its interval start) intact.
    pub fn activate(
        &mut self,
        tab_id: TabId,
        target: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Contribution> {
        if self.state == TrackerState::Terminal {
            return None;
        }
        let contribution = self.close_interval(now);
        self.state = TrackerState::Tracking {
            target: target.into(),
            tab_id,
            started_at: now,
        };
        contribution
    }

    /// The tracked tab navigated to a new target.
    ///
    /// Ignored unless the tracker is `Tracking` the same tab.
    pub fn target_changed(
        &mut self,
        tab_id: TabId,
        target: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Contribution> {
        match &self.state {
            TrackerState::Tracking { tab_id: tid, .. } if *tid == tab_id => {
                let contribution = self.close_interval(now);
                self.state = TrackerState::Tracking {
                    target: target.into(),
                    tab_id,
                    started_at: now,
                };
                contribution
            }
            _ => None,
        }
    }

    /// A tab was closed.
    ///
    /// Closes the interval and goes `Idle` when the tab is the one currently
    /// tracked. A paused tab that closes also goes `Idle`, so a later focus
    /// return cannot resume a dead tab. Other tabs are ignored.
    pub fn tab_closed(&mut self, tab_id: TabId, now: DateTime<Utc>) -> Option<Contribution> {
        match &self.state {
            TrackerState::Tracking { tab_id: tid, .. } if *tid == tab_id => {
                let contribution = self.close_interval(now);
                self.state = TrackerState::Idle;
                contribution
            }
            TrackerState::Paused { tab_id: tid, .. } if *tid == tab_id => {
                self.state = TrackerState::Idle;
                None
            }
            _ => None,
        }
    }

    /// The host window gained or lost OS-level focus.
    pub fn host_focus_changed(
        &mut self,
        focused: bool,
        now: DateTime<Utc>,
    ) -> Option<Contribution> {
        if focused {
            if let TrackerState::Paused { target, tab_id } = &self.state {
                self.state = TrackerState::Tracking {
                    target: target.clone(),
                    tab_id: *tab_id,
                    started_at: now,
                };
            }
            return None;
        }
        match &self.state {
            TrackerState::Tracking { target, tab_id, .. } => {
                let paused = TrackerState::Paused {
                    target: target.clone(),
                    tab_id: *tab_id,
                };
                let contribution = self.close_interval(now);
                self.state = paused;
                contribution
            }
            _ => None,
        }
    }

    /// The host is about to terminate.
    ///
    /// Closes any running interval and enters the absorbing `Terminal` state.
    pub fn suspend(&mut self, now: DateTime<Utc>) -> Option<Contribution> {
        let contribution = self.close_interval(now);
        self.state = TrackerState::Terminal;
        contribution
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::milliseconds(ms)
    }

    // Scenario A: activate at t=0, close at t=120000 => 2.0 minutes.
    #[test]
    fn activate_then_close_attributes_elapsed_minutes() {
        let mut tracker = FocusTracker::new();
        assert!(tracker.activate(TabId(1), "foo.com", at(0)).is_none());

        let contribution = tracker.tab_closed(TabId(1), at(120_000)).unwrap();
        assert_eq!(contribution.target, "foo.com");
        assert!((contribution.minutes - 2.0).abs() < f64::EPSILON);
        assert_eq!(*tracker.state(), TrackerState::Idle);
    }

    // Scenario B: pause closes the interval, resume restarts the clock.
    #[test]
    fn pause_and_resume_excludes_unfocused_time() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(4), "D", at(-60_000));

        let contribution = tracker.host_focus_changed(false, at(0)).unwrap();
        assert_eq!(contribution.target, "D");
        assert!((contribution.minutes - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            *tracker.state(),
            TrackerState::Paused {
                target: "D".into(),
                tab_id: TabId(4),
            }
        );

        assert!(tracker.host_focus_changed(true, at(10_000)).is_none());
        assert_eq!(
            *tracker.state(),
            TrackerState::Tracking {
                target: "D".into(),
                tab_id: TabId(4),
                started_at: at(10_000),
            }
        );
    }

    #[test]
    fn switching_tabs_closes_previous_interval() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));

        let contribution = tracker.activate(TabId(2), "bar.com", at(90_000)).unwrap();
        assert_eq!(contribution.target, "foo.com");
        assert!((contribution.minutes - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn navigation_in_tracked_tab_switches_target() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));

        let contribution = tracker
            .target_changed(TabId(1), "bar.com", at(30_000))
            .unwrap();
        assert_eq!(contribution.target, "foo.com");
        assert!((contribution.minutes - 0.5).abs() < f64::EPSILON);

        let contribution = tracker.tab_closed(TabId(1), at(60_000)).unwrap();
        assert_eq!(contribution.target, "bar.com");
        assert!((contribution.minutes - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn events_for_other_tabs_are_ignored() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));

        assert!(tracker.target_changed(TabId(9), "bar.com", at(1_000)).is_none());
        assert!(tracker.tab_closed(TabId(9), at(2_000)).is_none());
        assert!(matches!(
            tracker.state(),
            TrackerState::Tracking { target, tab_id, .. }
                if target == "foo.com" && *tab_id == TabId(1)
        ));
    }

    #[test]
    fn negative_elapsed_is_clamped_to_zero() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(60_000));

        // Clock went backwards before the tab closed.
        assert!(tracker.tab_closed(TabId(1), at(0)).is_none());
        assert_eq!(*tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn zero_elapsed_produces_no_contribution() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));
        assert!(tracker.activate(TabId(2), "bar.com", at(0)).is_none());
    }

    #[test]
    fn closing_paused_tab_goes_idle_without_accumulation() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));
        tracker.host_focus_changed(false, at(60_000));

        assert!(tracker.tab_closed(TabId(1), at(120_000)).is_none());
        assert_eq!(*tracker.state(), TrackerState::Idle);

        // Focus returning afterwards must not resurrect the dead tab.
        assert!(tracker.host_focus_changed(true, at(180_000)).is_none());
        assert_eq!(*tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn pause_while_idle_is_a_no_op() {
        let mut tracker = FocusTracker::new();
        assert!(tracker.host_focus_changed(false, at(0)).is_none());
        assert_eq!(*tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn terminal_state_absorbs_all_events() {
        let mut tracker = FocusTracker::new();
        tracker.activate(TabId(1), "foo.com", at(0));

        let contribution = tracker.suspend(at(60_000)).unwrap();
        assert!((contribution.minutes - 1.0).abs() < f64::EPSILON);
        assert_eq!(*tracker.state(), TrackerState::Terminal);

        assert!(tracker.activate(TabId(2), "bar.com", at(61_000)).is_none());
        assert!(tracker.host_focus_changed(true, at(62_000)).is_none());
        assert!(tracker.tab_closed(TabId(1), at(63_000)).is_none());
        assert_eq!(*tracker.state(), TrackerState::Terminal);
    }

    // Conservation: summed contributions equal total Tracking wall-clock time.
    #[test]
    fn contributions_conserve_tracked_time() {
        let mut tracker = FocusTracker::new();
        let mut total = 0.0;
        let mut add = |c: Option<Contribution>| {
            if let Some(c) = c {
                total += c.minutes;
            }
        };

        add(tracker.activate(TabId(1), "a.com", at(0)));
        add(tracker.target_changed(TabId(1), "b.com", at(30_000)));
        add(tracker.host_focus_changed(false, at(90_000))); // paused 90s..150s
        add(tracker.host_focus_changed(true, at(150_000)));
        add(tracker.activate(TabId(2), "c.com", at(210_000)));
        add(tracker.suspend(at(270_000)));

        // Tracking spans: 0..90s and 150s..270s = 3.5 minutes.
        assert!((total - 3.5).abs() < 1e-9);
    }
}
