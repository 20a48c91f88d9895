//! Reminder window and the set of already-reminded keys.

use crate::tasks::model::{Task, UserId};
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashSet;
use std::fmt;

/// Identity of one reminder: the order id plus the deadline text it was
/// submitted with, scoped to the user that owns the task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub user_id: UserId,
    pub order_id: String,
    pub deadline_text: String,
}

impl ReminderKey {
    #[must_use]
    pub fn for_task(user_id: &str, task: &Task) -> Self {
        Self {
            user_id: user_id.to_owned(),
            order_id: task.order_id.clone(),
            deadline_text: task.deadline_text.clone(),
        }
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}_{}", self.user_id, self.order_id, self.deadline_text)
    }
}

/// Keys that already produced a reminder during this process lifetime.
///
/// In memory only; a restart clears it. Reminded tasks are removed from the
/// store, so a restart does not resurrect them.
#[derive(Debug, Default, Clone)]
pub struct RemindedSet {
    keys: HashSet<ReminderKey>,
}

impl RemindedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key. Returns `false` when it was already present.
    pub fn insert(&mut self, key: ReminderKey) -> bool {
        self.keys.insert(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ReminderKey) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// When a reminder fires relative to the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    /// How long before the deadline the reminder is aimed at.
    pub lead: TimeDelta,
    /// A tick fires when it lands strictly closer than this to the aim point.
    pub tolerance: TimeDelta,
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self {
            lead: TimeDelta::minutes(30),
            tolerance: TimeDelta::seconds(60),
        }
    }
}

impl ReminderWindow {
    #[must_use]
    pub fn new(lead_minutes: u32, tolerance_secs: u32) -> Self {
        Self {
            lead: TimeDelta::minutes(i64::from(lead_minutes)),
            tolerance: TimeDelta::seconds(i64::from(tolerance_secs)),
        }
    }

    /// Moment the reminder is aimed at.
    #[must_use]
    pub fn reminder_time(&self, deadline_at: NaiveDateTime) -> NaiveDateTime {
        deadline_at - self.lead
    }

    /// `|now - (deadline - lead)| < tolerance`.
    #[must_use]
    pub fn is_due(&self, deadline_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        let offset = now - self.reminder_time(deadline_at);
        offset.abs() < self.tolerance
    }
}
