use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Behaviour of a single store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name used in logs and errors (default: "store").
    #[serde(default = "default_store_name")]
    pub name: String,
    /// Commit an unchanged reduction without notifying observers
    /// (default: false).
    #[serde(default)]
    pub skip_unchanged: bool,
    /// Mailbox size of the async dispatcher (default: 64).
    #[serde(default = "default_dispatcher_buffer")]
    pub dispatcher_buffer: usize,
}

/// Diagnostic logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path. `UNISTATE_LOG` takes precedence.
    #[serde(default)]
    pub file: Option<String>,
}

pub(crate) const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

fn default_store_name() -> String {
    "store".to_string()
}

fn default_dispatcher_buffer() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_store_name(),
            skip_unchanged: false,
            dispatcher_buffer: default_dispatcher_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl StoreConfig {
    /// Same settings under another store name.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Same settings with `suffix` appended to the configured name, as
    /// `<name>.<suffix>`.
    pub fn scoped(&self, suffix: &str) -> Self {
        self.named(format!("{}.{}", self.name, suffix))
    }
}
