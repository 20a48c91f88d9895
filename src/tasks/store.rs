//! Per-user task store with flat-file persistence.
//!
//! Each user's tasks live in `<tasks_dir>/<encoded user id>.txt`, one raw
//! line per task, no header. See [`user_file_name`] for the encoding. Reloading re-parses and re-resolves every line, so tasks
//! whose deadline omits the year may land in a different year after a
//! rollover boundary has passed.

use crate::error::{Result, TaskbellError};
use crate::scheduler::reminded::{RemindedSet, ReminderKey, ReminderWindow};
use crate::tasks::deadline::{DeadlineError, resolve_deadline};
use crate::tasks::model::{Task, UserId};
use crate::tasks::parser::{ParseError, parse_line};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const TASK_FILE_EXTENSION: &str = "txt";

/// A line that could not become a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskInputError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
}

/// Result of submitting one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended to the user's list.
    Added(Task),
    /// An existing task matched on all four fields; nothing changed.
    Duplicate(Task),
    /// The line did not parse or its deadline did not resolve.
    Invalid(TaskInputError),
}

impl AddOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Added(_))
    }

    /// User-facing reply for a single submitted line.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Added(task) => format!(
                "✅ Added {} - deadline {}",
                task.order_id, task.deadline_text
            ),
            Self::Duplicate(task) => {
                format!("🚫 Rejected: {} is already in the list", task.order_id)
            }
            Self::Invalid(TaskInputError::Parse(_)) => {
                "❌ Wrong format. Send: link | order id | created date | deadline hour | deadline date"
                    .to_owned()
            }
            Self::Invalid(TaskInputError::Deadline(_)) => {
                "❌ Cannot read the deadline. Use 20h59 17/1/2026 or 13H 17/1".to_owned()
            }
        }
    }
}

/// Delete-by-index failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeleteError {
    #[error("no task #{index}; the list has {len} task(s)")]
    OutOfRange { index: usize, len: usize },
}

/// A task removed from the store because its reminder is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub user_id: UserId,
    pub task: Task,
}

/// Ordered task lists keyed by user.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: BTreeMap<UserId, Vec<Task>>,
    /// `None` keeps everything in memory.
    tasks_dir: Option<PathBuf>,
}

impl TaskStore {
    /// Create an empty store persisting into `tasks_dir`.
    #[must_use]
    pub fn new(tasks_dir: Option<PathBuf>) -> Self {
        Self {
            tasks: BTreeMap::new(),
            tasks_dir,
        }
    }

    /// Create a store and load whatever is already on disk.
    ///
    /// Load failures are logged; the store starts with whatever was read.
    #[must_use]
    pub fn open(tasks_dir: PathBuf, now: NaiveDateTime) -> Self {
        let mut store = Self::new(Some(tasks_dir));
        match store.load_all(now) {
            Ok(count) => info!("loaded {count} tasks for {} users", store.tasks.len()),
            Err(e) => error!("cannot load tasks: {e}"),
        }
        store
    }

    /// Directory the store persists into.
    #[must_use]
    pub fn tasks_dir(&self) -> Option<&Path> {
        self.tasks_dir.as_deref()
    }

    /// Submit one line for a user, persisting on success.
    pub fn add_task(&mut self, user_id: &str, line: &str, now: NaiveDateTime) -> AddOutcome {
        let outcome = self.insert(user_id, line, now);
        if outcome.is_accepted() {
            self.persist_user_logged(user_id);
        }
        outcome
    }

    /// Submit several lines at once; blank lines are skipped. Persists once.
    pub fn add_lines(&mut self, user_id: &str, text: &str, now: NaiveDateTime) -> Vec<AddOutcome> {
        let outcomes: Vec<AddOutcome> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.insert(user_id, line, now))
            .collect();
        if outcomes.iter().any(AddOutcome::is_accepted) {
            self.persist_user_logged(user_id);
        }
        outcomes
    }

    fn insert(&mut self, user_id: &str, line: &str, now: NaiveDateTime) -> AddOutcome {
        let task = match build_task(line, now) {
            Ok(task) => task,
            Err(e) => {
                debug!("rejected line for {user_id}: {e}");
                return AddOutcome::Invalid(e);
            }
        };

        let list = self.tasks.entry(user_id.to_owned()).or_default();
        if let Some(existing) = list.iter().find(|t| t.is_exact_duplicate_of(&task)) {
            return AddOutcome::Duplicate(existing.clone());
        }
        list.push(task.clone());
        AddOutcome::Added(task)
    }

    /// A user's tasks in insertion order.
    #[must_use]
    pub fn list_tasks(&self, user_id: &str) -> &[Task] {
        self.tasks.get(user_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// First task with the given order id.
    #[must_use]
    pub fn find_by_order_id(&self, user_id: &str, order_id: &str) -> Option<&Task> {
        self.list_tasks(user_id)
            .iter()
            .find(|t| t.order_id == order_id)
    }

    /// Remove the task at a 1-based position, persisting on success.
    pub fn delete_task(&mut self, user_id: &str, index: usize) -> std::result::Result<Task, DeleteError> {
        let len = self.list_tasks(user_id).len();
        if index == 0 || index > len {
            return Err(DeleteError::OutOfRange { index, len });
        }
        let removed = match self.tasks.get_mut(user_id) {
            Some(list) => list.remove(index - 1),
            None => return Err(DeleteError::OutOfRange { index, len }),
        };
        self.persist_user_logged(user_id);
        Ok(removed)
    }

    /// Users that currently own a task list (possibly empty).
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Total number of tasks across all users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every task whose reminder is due at `now`.
    ///
    /// Per user, only the first task for a given order id is considered in
    /// one scan. A task whose key is already in `reminded` is skipped and
    /// stays in the store. Due keys are recorded in `reminded` and affected
    /// users are persisted before this returns.
    pub fn take_due(
        &mut self,
        now: NaiveDateTime,
        window: &ReminderWindow,
        reminded: &mut RemindedSet,
    ) -> Vec<DueReminder> {
        let mut due = Vec::new();
        let mut touched_users = Vec::new();

        for (user_id, list) in &mut self.tasks {
            let mut handled_orders: HashSet<String> = HashSet::new();
            let mut due_indices = Vec::new();

            for (index, task) in list.iter().enumerate() {
                if handled_orders.contains(&task.order_id) {
                    continue;
                }
                let key = ReminderKey::for_task(user_id, task);
                if reminded.contains(&key) {
                    handled_orders.insert(task.order_id.clone());
                    continue;
                }
                if window.is_due(task.deadline_at, now) {
                    reminded.insert(key);
                    handled_orders.insert(task.order_id.clone());
                    due_indices.push(index);
                }
            }

            if due_indices.is_empty() {
                continue;
            }
            let mut removed: Vec<Task> = due_indices
                .into_iter()
                .rev()
                .map(|index| list.remove(index))
                .collect();
            removed.reverse();
            for task in removed {
                info!("removed {} for {user_id} after reminder", task.order_id);
                due.push(DueReminder {
                    user_id: user_id.clone(),
                    task,
                });
            }
            touched_users.push(user_id.clone());
        }

        for user_id in &touched_users {
            self.persist_user_logged(user_id);
        }
        due
    }

    /// Load every user file from the tasks directory.
    ///
    /// Returns the number of tasks loaded. Lines that fail to parse or
    /// resolve are skipped; a line whose order id is already loaded for the
    /// same user is skipped too. A file that cannot be read, or whose name
    /// does not decode to a user id, is logged and skipped.
    pub fn load_all(&mut self, now: NaiveDateTime) -> Result<usize> {
        let Some(dir) = self.tasks_dir.clone() else {
            return Ok(0);
        };

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no task directory at {}, starting fresh", dir.display());
                return Ok(0);
            }
            Err(e) => {
                return Err(TaskbellError::Persistence(format!(
                    "cannot read {}: {e}",
                    dir.display()
                )));
            }
        };

        let mut loaded = 0;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    error!("cannot list an entry in {}: {e}", dir.display());
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some(TASK_FILE_EXTENSION) {
                continue;
            }
            let Some(user_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(user_id_from_stem)
            else {
                warn!("skipping {}: not a task file name", path.display());
                continue;
            };
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    error!("cannot read {}: {e}", path.display());
                    continue;
                }
            };
            let count = self.load_user_text(&user_id, &text, now);
            debug!("loaded {count} tasks for {user_id} from {}", path.display());
            loaded += count;
        }
        Ok(loaded)
    }

    /// Ingest persisted lines for one user, keeping one task per order id.
    pub fn load_user_text(&mut self, user_id: &str, text: &str, now: NaiveDateTime) -> usize {
        let mut count = 0;
        for line in text.lines() {
            let task = match build_task(line, now) {
                Ok(task) => task,
                Err(e) => {
                    if !line.trim().is_empty() {
                        debug!("skipping stored line for {user_id}: {e}");
                    }
                    continue;
                }
            };
            if self.find_by_order_id(user_id, &task.order_id).is_some() {
                continue;
            }
            self.tasks.entry(user_id.to_owned()).or_default().push(task);
            count += 1;
        }
        count
    }

    /// Write one user's raw lines to disk.
    pub fn persist_user(&self, user_id: &str) -> Result<()> {
        let Some(dir) = &self.tasks_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir).map_err(|e| {
            TaskbellError::Persistence(format!("cannot create {}: {e}", dir.display()))
        })?;

        let path = dir.join(user_file_name(user_id));
        let tasks = self.list_tasks(user_id);
        let body: String = tasks.iter().map(|t| format!("{}\n", t.raw_line)).collect();
        std::fs::write(&path, body).map_err(|e| {
            TaskbellError::Persistence(format!("cannot write {}: {e}", path.display()))
        })?;
        debug!("saved {} tasks to {}", tasks.len(), path.display());
        Ok(())
    }

    /// Write every user's file.
    pub fn persist_all(&self) -> Result<()> {
        for user_id in self.tasks.keys() {
            self.persist_user(user_id)?;
        }
        Ok(())
    }

    fn persist_user_logged(&self, user_id: &str) {
        if let Err(e) = self.persist_user(user_id) {
            error!("cannot persist tasks for {user_id}: {e}");
        }
    }
}

/// Parse a line and resolve its deadline.
pub fn build_task(line: &str, now: NaiveDateTime) -> std::result::Result<Task, TaskInputError> {
    let fields = parse_line(line)?;
    let deadline_at = resolve_deadline(&fields.deadline_text, now)?;
    Ok(Task::from_fields(fields, deadline_at))
}

/// File name for a user's task file.
///
/// `[A-Za-z0-9_-]` is kept as is; every other byte of the id is written as
/// `%XX`, so the id can be recovered from the name. The empty id maps to
/// `%.txt`.
#[must_use]
pub fn user_file_name(user_id: &str) -> String {
    if user_id.is_empty() {
        return format!("%.{TASK_FILE_EXTENSION}");
    }
    let mut stem = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("{stem}.{TASK_FILE_EXTENSION}")
}

/// Inverse of [`user_file_name`] for a file stem. `None` when the stem was
/// not produced by it.
#[must_use]
pub fn user_id_from_stem(stem: &str) -> Option<UserId> {
    if stem == "%" {
        return Some(String::new());
    }
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
