//! Configuration types for the reminder bot.

use crate::error::TaskbellError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskbellConfig {
    /// Task file location.
    pub store: StoreConfig,
    /// Reminder timing.
    pub scheduler: SchedulerConfig,
    /// Telegram Bot API settings.
    pub telegram: TelegramConfig,
    /// Channel runtime settings.
    pub channels: ChannelsConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `<user_id>.txt` task files. `None` uses the
    /// platform data directory.
    pub tasks_dir: Option<PathBuf>,
}

impl StoreConfig {
    #[must_use]
    pub fn resolved_tasks_dir(&self) -> PathBuf {
        self.tasks_dir
            .clone()
            .unwrap_or_else(crate::taskbell_dirs::tasks_dir)
    }
}

/// When and how often the scheduler looks for due reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,
    /// Minutes before the deadline that the reminder is aimed at.
    pub lead_minutes: u32,
    /// A tick fires when it is strictly closer than this to the aim point.
    pub fire_tolerance_secs: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 30,
            lead_minutes: 30,
            fire_tolerance_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from BotFather. Empty disables the adapter unless the
    /// environment provides one.
    pub bot_token: String,
    /// Chat ids allowed to talk to the bot. Empty allows every chat.
    pub allowed_chat_ids: Vec<String>,
    /// Bot API base URL.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chat_ids: Vec::new(),
            api_base: "https://api.telegram.org".to_owned(),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    /// Token to use: `TELEGRAM_BOT_TOKEN` when set and non-empty, otherwise
    /// the configured one. `None` when both are blank.
    #[must_use]
    pub fn resolved_bot_token(&self) -> Option<String> {
        pick_token(std::env::var(BOT_TOKEN_ENV).ok(), &self.bot_token)
    }
}

fn pick_token(from_env: Option<String>, configured: &str) -> Option<String> {
    from_env
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            let configured = configured.trim();
            (!configured.is_empty()).then(|| configured.to_owned())
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Capacity of the inbound message queue shared by all adapters.
    pub inbound_queue_size: usize,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            inbound_queue_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily-rotated file here.
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filter: "taskbell=info".to_owned(),
        }
    }
}

impl TaskbellConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TaskbellError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TaskbellError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::taskbell_dirs::config_file()
    }
}
