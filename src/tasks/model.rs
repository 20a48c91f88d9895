//! Task record types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier of the user (chat) that owns a task list.
pub type UserId = String;

/// Fields extracted from one task line, before the deadline is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    /// URL or reference for the work item.
    pub link: String,
    /// Order identifier.
    pub order_id: String,
    /// Creation date as typed by the user; never interpreted.
    pub created_date: String,
    /// Deadline fragment, e.g. `20h59 17/1/2026`.
    pub deadline_text: String,
    /// The submitted line, trimmed.
    pub raw_line: String,
}

/// A parsed task with a resolved deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Free text, usually the order URL.
    pub link: String,
    /// Order identifier; unique per user after a reload.
    pub order_id: String,
    /// Creation date exactly as typed; never interpreted.
    pub created_date: String,
    /// Deadline as typed, e.g. `20h59 17/1/2026`.
    pub deadline_text: String,
    /// Local wall-clock time the deadline resolved to.
    pub deadline_at: NaiveDateTime,
    /// The trimmed submitted line; this is what gets persisted.
    pub raw_line: String,
}

impl Task {
    /// Attach a resolved deadline to parsed fields.
    #[must_use]
    pub fn from_fields(fields: TaskFields, deadline_at: NaiveDateTime) -> Self {
        Self {
            link: fields.link,
            order_id: fields.order_id,
            created_date: fields.created_date,
            deadline_text: fields.deadline_text,
            deadline_at,
            raw_line: fields.raw_line,
        }
    }

    /// Returns `true` when link, order id, created date and deadline text
    /// all match exactly.
    #[must_use]
    pub fn is_exact_duplicate_of(&self, other: &Task) -> bool {
        self.link == other.link
            && self.order_id == other.order_id
            && self.created_date == other.created_date
            && self.deadline_text == other.deadline_text
    }
}
