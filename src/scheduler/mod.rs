//! Deadline reminder scheduling.
//!
//! [`ReminderScheduler`] polls the task store on a fixed interval and sends
//! one reminder per due task through a channel adapter.

pub mod reminded;
pub mod runner;

pub use reminded::{RemindedSet, ReminderKey, ReminderWindow};
pub use runner::{ReminderScheduler, TickReport};
