//! Daily wall-clock triggers.
//!
//! A [`Scheduler`] holds named triggers, each with a time of day and the
//! date it last fired. [`Scheduler::tick`] reports the triggers that are due
//! and re-arms them for the next day. [`Scheduler::run`] drives `tick` until
//! shutdown, sleeping no longer than needed between checks.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::shutdown::ShutdownHandle;

/// Name of the trigger that marks absences.
pub const ABSENCE_SWEEP: &str = "absence-sweep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Trigger {
    at: NaiveTime,
    last_fired: Option<NaiveDate>,
}

impl Trigger {
    fn is_due(&self, now: NaiveDateTime) -> bool {
        now.time() >= self.at && self.last_fired != Some(now.date())
    }

    fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        if self.last_fired == Some(today) {
            let tomorrow = today.succ_opt().unwrap_or(today);
            tomorrow.and_time(self.at)
        } else if now.time() >= self.at {
            now
        } else {
            today.and_time(self.at)
        }
    }
}

/// Owns the registered daily triggers.
#[derive(Debug, Default)]
pub struct Scheduler {
    triggers: BTreeMap<String, Trigger>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a daily trigger at `at`.
    ///
    /// When `now` is already past `at`, the trigger first fires tomorrow
    /// unless `catch_up` is set, in which case the next tick fires it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        at: NaiveTime,
        now: NaiveDateTime,
        catch_up: bool,
    ) {
        let name = name.into();
        let last_fired = (!catch_up && now.time() > at).then(|| now.date());
        if last_fired.is_some() {
            info!(trigger = %name, %at, "Started after trigger time, first run is tomorrow");
        }
        debug!(trigger = %name, %at, "Registered daily trigger");
        self.triggers.insert(name, Trigger { at, last_fired });
    }

    /// Number of registered triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Whether no triggers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Names of the triggers due at `now`, marking each as fired for today.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<String> {
        let mut fired = Vec::new();
        for (name, trigger) in &mut self.triggers {
            if trigger.is_due(now) {
                trigger.last_fired = Some(now.date());
                fired.push(name.clone());
            }
        }
        fired
    }

    /// Time from `now` until the next trigger is due.
    ///
    /// Zero when a trigger is already due, `None` without triggers.
    #[must_use]
    pub fn until_next(&self, now: NaiveDateTime) -> Option<Duration> {
        self.triggers
            .values()
            .map(|trigger| trigger.next_fire(now))
            .min()
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Tick until `shutdown` is signalled.
    ///
    /// `clock` supplies the current local time. For every due trigger
    /// `on_fire(name, date)` is awaited before the next check. Between checks
    /// the loop sleeps until the next trigger, but never longer than
    /// `tick_interval`, so clock changes are noticed.
    pub async fn run<C, F, Fut>(
        &mut self,
        tick_interval: Duration,
        shutdown: &ShutdownHandle,
        mut clock: C,
        mut on_fire: F,
    ) where
        C: FnMut() -> NaiveDateTime,
        F: FnMut(String, NaiveDate) -> Fut,
        Fut: Future<Output = ()>,
    {
        debug!(
            triggers = self.len(),
            interval_ms = tick_interval.as_millis(),
            "Scheduler started"
        );

        while !shutdown.should_stop() {
            let now = clock();
            for name in self.tick(now) {
                info!(trigger = %name, "Trigger fired");
                on_fire(name, now.date()).await;
            }

            let delay = self
                .until_next(now)
                .map_or(tick_interval, |next| next.min(tick_interval));

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.stopped() => break,
            }
        }

        debug!("Scheduler stopped");
    }
}
