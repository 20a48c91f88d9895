//! Task lines: parsing, deadline resolution, and the per-user task store.
//!
//! A line submitted over a channel flows through [`parser::parse_line`],
//! then [`deadline::resolve_deadline`], and lands in the [`store::TaskStore`]
//! if it is not an exact duplicate of a task the user already has.

pub mod deadline;
pub mod model;
pub mod parser;
pub mod shared;
pub mod store;

pub use deadline::{DeadlineError, resolve_deadline};
pub use model::{Task, TaskFields, UserId};
pub use parser::{ParseError, parse_line};
pub use shared::TaskStoreHandle;
pub use store::{AddOutcome, DeleteError, DueReminder, TaskInputError, TaskStore};
