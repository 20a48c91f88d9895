//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that ticks on a fixed interval. Each tick takes the
//! due tasks out of the store (which persists the removal), then sends one
//! reminder per task through the channel adapter. Delivery happens after
//! removal, so a failed send loses that reminder; failures are logged only.

use crate::channels::traits::{ChannelAdapter, OutboundMessage};
use crate::config::SchedulerConfig;
use crate::error::TaskbellError;
use crate::scheduler::reminded::{RemindedSet, ReminderWindow};
use crate::tasks::model::Task;
use crate::tasks::shared::TaskStoreHandle;
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest tick interval the loop accepts; `tokio::time::interval` rejects zero.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Source of "now" as local wall-clock time.
pub type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks removed from the store as due.
    pub due: usize,
    /// Reminders the adapter accepted.
    pub delivered: usize,
    /// Reminders the adapter rejected; these are not retried.
    pub failed: usize,
}

/// Background scheduler that sends deadline reminders.
pub struct ReminderScheduler {
    store: TaskStoreHandle,
    gateway: Arc<dyn ChannelAdapter>,
    reminded: RemindedSet,
    window: ReminderWindow,
    tick_interval: Duration,
    cancel: CancellationToken,
    clock: Clock,
}

impl ReminderScheduler {
    /// Create a scheduler with default timing and the local clock.
    pub fn new(
        store: TaskStoreHandle,
        gateway: Arc<dyn ChannelAdapter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            gateway,
            reminded: RemindedSet::new(),
            window: ReminderWindow::default(),
            tick_interval: Duration::from_secs(30),
            cancel,
            clock: Box::new(|| chrono::Local::now().naive_local()),
        }
    }

    /// Apply tick interval, lead time and tolerance from config.
    pub fn with_config(mut self, config: &SchedulerConfig) -> Self {
        self.window = ReminderWindow::new(config.lead_minutes, config.fire_tolerance_secs);
        self.tick_interval = Duration::from_secs(config.tick_interval_secs.max(1));
        self
    }

    /// Override the tick interval, clamped to [`MIN_TICK_INTERVAL`].
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    /// Override the clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Keys reminded so far in this process.
    pub fn reminded(&self) -> &RemindedSet {
        &self.reminded
    }

    /// Start the scheduler loop. It stops when the cancellation token fires.
    pub fn run(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "reminder scheduler started, ticking every {:?}",
                self.tick_interval
            );
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("reminder scheduler cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let now = (self.clock)();
                        self.tick_at(now).await;
                    }
                }
            }
        })
    }

    /// Execute one tick as of `now`.
    pub async fn tick_at(&mut self, now: NaiveDateTime) -> TickReport {
        let due = self.store.take_due(now, &self.window, &mut self.reminded);
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        if due.is_empty() {
            debug!("tick at {now}: nothing due");
            return report;
        }

        for reminder in due {
            let message = OutboundMessage {
                user_id: reminder.user_id.clone(),
                text: render_reminder(&reminder.task, &self.window),
            };
            match self.gateway.send(message).await {
                Ok(()) => {
                    report.delivered += 1;
                    info!(
                        "sent reminder for {} to {}",
                        reminder.task.order_id, reminder.user_id
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    let err = TaskbellError::Delivery(format!(
                        "reminder for {} to {} via {}: {e}",
                        reminder.task.order_id,
                        reminder.user_id,
                        self.gateway.id()
                    ));
                    warn!("{err}");
                }
            }
        }
        report
    }
}

/// Reminder text for one task.
#[must_use]
pub fn render_reminder(task: &Task, window: &ReminderWindow) -> String {
    format!(
        "⏰ DEADLINE REMINDER\n\n📋 Order: {}\n📅 Deadline: {}\n🔗 Link: {}\n\n⚠️ {} minutes left until the deadline!",
        task.order_id,
        task.deadline_text,
        task.link,
        window.lead.num_minutes()
    )
}
