//! Taskbell: chat-driven deadline reminders.
//!
//! Users send task lines (link, order id, created date, deadline) to a chat
//! bot. Lines are parsed with a cascade of grammars, deadlines are resolved
//! to local timestamps, and tasks are kept per user in flat files. A
//! background scheduler sends each task's reminder shortly before its
//! deadline and then drops the task.
//!
//! # Architecture
//!
//! - **tasks**: line parser, deadline resolver, per-user store, shared handle
//! - **scheduler**: periodic due-reminder scan and delivery
//! - **channels**: chat adapters (Telegram), command surface, routing runtime

pub mod channels;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod taskbell_dirs;
pub mod tasks;

pub use config::TaskbellConfig;
pub use error::{Result, TaskbellError};
pub use scheduler::ReminderScheduler;
pub use tasks::{TaskStore, TaskStoreHandle};
