//! Chat command surface.
//!
//! Turns one inbound message into the reply text. Commands are accepted with
//! or without the leading slash, and a `@botname` suffix on the command word
//! is ignored. Anything that is not a command is treated as task lines.

use crate::tasks::model::Task;
use crate::tasks::shared::TaskStoreHandle;
use crate::tasks::store::AddOutcome;
use chrono::NaiveDateTime;

const START_TEXT: &str = "🤖 Deadline reminder bot\n\n\
📝 Add a task by sending one line per task:\n\
link | order id | created date | deadline hour | deadline date\n\
link , order id , created date , deadline hour , deadline date\n\
link ; order id ; created date ; deadline hour ; deadline date\n\
Or: link order id created date deadline hour deadline date\n\n\
📅 Deadline format: 20h59 17/1/2026\n\
📅 Short forms: 13H 17/1 or 13h30 17/1 (current year)\n\n\
📋 Commands:\n\
/start - show this guide\n\
/list - show your tasks\n\
/del <n> - delete task number n\n\
/help - examples\n\n\
A reminder is sent 30 minutes before each deadline.";

const HELP_TEXT: &str = "📖 Help\n\n\
🔹 Add a task:\n\
https://link.com | VNGH123 | 16/1/2026 | 20h59 | 17/1/2026\n\
https://link.com , VNGH123 , 16/1/2026 , 20h59 , 17/1/2026\n\
https://link.com ; VNGH123 ; 16/1/2026 ; 20h59 ; 17/1/2026\n\
https://link.com VNGH123 16/1/2026 20h59 17/1/2026\n\n\
🔹 Four-column form:\n\
https://link.com | VNGH123 | 16/1 | 13H 17/1\n\n\
🔹 Several lines in one message add several tasks.\n\
🔹 List: /list\n\
🔹 Delete: /del 2\n\n\
⚠️ Columns may be separated by | , ; or spaces.";

const DELETE_USAGE_TEXT: &str = "Usage: /del <number>, e.g. /del 1 (see /list)";

/// Parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    /// 1-based index as typed.
    Delete(usize),
    /// `del` with a missing or non-numeric argument.
    DeleteUsage,
    /// Slash command nobody handles.
    Unknown(String),
    /// Task lines to add.
    Submit(String),
}

impl Command {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let mut words = trimmed.split_whitespace();
        let Some(first) = words.next() else {
            return Self::Submit(String::new());
        };
        let slashed = first.starts_with('/');
        let word = first.trim_start_matches('/');
        let word = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        match word.as_str() {
            "start" if words.next().is_none() => Self::Start,
            "help" if words.next().is_none() => Self::Help,
            "list" if words.next().is_none() => Self::List,
            // Without the slash, a longer message is a task line whose
            // first column happens to read `del`.
            "del" | "delete" => match (words.next(), words.next()) {
                (Some(arg), None) => arg
                    .parse::<usize>()
                    .map_or(Self::DeleteUsage, Self::Delete),
                (None, _) => Self::DeleteUsage,
                (Some(_), Some(_)) if slashed => Self::DeleteUsage,
                (Some(_), Some(_)) => Self::Submit(trimmed.to_owned()),
            },
            _ if slashed && !trimmed.contains('\n') && !trimmed.contains('|') => {
                Self::Unknown(word)
            }
            _ => Self::Submit(trimmed.to_owned()),
        }
    }
}

/// Counts for a multi-line submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub added: usize,
    pub duplicates: usize,
    pub errors: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[AddOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                AddOutcome::Added(_) => summary.added += 1,
                AddOutcome::Duplicate(_) => summary.duplicates += 1,
                AddOutcome::Invalid(_) => summary.errors += 1,
            }
        }
        summary
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut text = format!("📊 Result:\n✅ Added: {} task(s)", self.added);
        if self.duplicates > 0 {
            text.push_str(&format!("\n🔄 Duplicates: {} task(s)", self.duplicates));
        }
        if self.errors > 0 {
            text.push_str(&format!("\n❌ Errors: {} task(s)", self.errors));
        }
        text
    }
}

/// Handle one inbound message for `user_id` and return the reply.
pub fn handle_message(
    store: &TaskStoreHandle,
    user_id: &str,
    text: &str,
    now: NaiveDateTime,
) -> String {
    match Command::parse(text) {
        Command::Start => START_TEXT.to_owned(),
        Command::Help => HELP_TEXT.to_owned(),
        Command::List => render_list(&store.list_tasks(user_id)),
        Command::Delete(index) => match store.delete_task(user_id, index) {
            Ok(task) => format!(
                "🗑️ Deleted {} - deadline {}",
                task.order_id, task.deadline_text
            ),
            Err(e) => format!("❌ {e}"),
        },
        Command::DeleteUsage => DELETE_USAGE_TEXT.to_owned(),
        Command::Unknown(word) => format!("Unknown command /{word}. Send /help for usage."),
        Command::Submit(body) => submit(store, user_id, &body, now),
    }
}

fn submit(store: &TaskStoreHandle, user_id: &str, body: &str, now: NaiveDateTime) -> String {
    if body.contains('\n') {
        let outcomes = store.add_lines(user_id, body, now);
        BatchSummary::from_outcomes(&outcomes).render()
    } else {
        store.add_task(user_id, body, now).message()
    }
}

/// `index. orderId - deadlineText (link)` per task, numbered from 1.
#[must_use]
pub fn render_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "📭 No tasks in your list".to_owned();
    }
    let mut text = String::from("📋 Your tasks:\n");
    for (i, task) in tasks.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} - {} ({})",
            i + 1,
            task.order_id,
            task.deadline_text,
            task.link
        ));
    }
    text
}
