//! Shared handle over the task store.
//!
//! The inbound message path and the reminder scheduler both mutate the same
//! task lists. Every operation goes through one mutex, and persistence runs
//! inside the same critical section, so an add arriving mid-tick waits for
//! the tick's removal and save to finish.

use crate::scheduler::reminded::{RemindedSet, ReminderWindow};
use crate::tasks::model::Task;
use crate::tasks::store::{AddOutcome, DeleteError, DueReminder, TaskStore};
use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, thread-safe access to a [`TaskStore`].
#[derive(Debug, Clone)]
pub struct TaskStoreHandle {
    inner: Arc<Mutex<TaskStore>>,
}

impl TaskStoreHandle {
    #[must_use]
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    // Every store mutation leaves the lists consistent, so a panic while
    // holding the lock does not invalidate them.
    fn lock(&self) -> MutexGuard<'_, TaskStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_task(&self, user_id: &str, line: &str, now: NaiveDateTime) -> AddOutcome {
        self.lock().add_task(user_id, line, now)
    }

    pub fn add_lines(&self, user_id: &str, text: &str, now: NaiveDateTime) -> Vec<AddOutcome> {
        self.lock().add_lines(user_id, text, now)
    }

    /// Snapshot of a user's tasks in insertion order.
    #[must_use]
    pub fn list_tasks(&self, user_id: &str) -> Vec<Task> {
        self.lock().list_tasks(user_id).to_vec()
    }

    pub fn delete_task(&self, user_id: &str, index: usize) -> Result<Task, DeleteError> {
        self.lock().delete_task(user_id, index)
    }

    #[must_use]
    pub fn find_by_order_id(&self, user_id: &str, order_id: &str) -> Option<Task> {
        self.lock().find_by_order_id(user_id, order_id).cloned()
    }

    /// Scan-and-remove for one scheduler tick.
    pub fn take_due(
        &self,
        now: NaiveDateTime,
        window: &ReminderWindow,
        reminded: &mut RemindedSet,
    ) -> Vec<DueReminder> {
        self.lock().take_due(now, window, reminded)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write every user's task file.
    pub fn persist_all(&self) -> crate::Result<()> {
        self.lock().persist_all()
    }
}
