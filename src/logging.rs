use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Env var naming the log file. Overrides `logging.file` from the config.
pub const LOG_ENV_VAR: &str = "UNISTATE_LOG";

/// Initialize tracing with optional file output.
///
/// Logging is disabled unless `UNISTATE_LOG` or `logging.file` names a file,
/// so the JSON the CLI prints on stdout stays clean.
///
/// Log files are created with unique names to prevent conflicts when
/// multiple instances run simultaneously: `{path}.{timestamp}.{pid}`
pub fn init_tracing(config: &LoggingConfig) {
    let Some(log_path) = log_target(std::env::var(LOG_ENV_VAR).ok(), config) else {
        return;
    };

    let unique_path = unique_log_path(&log_path);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));

    let Ok(file) = std::fs::File::create(&unique_path) else {
        eprintln!("Warning: Failed to create log file: {}", unique_path);
        return;
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    // A subscriber may already be installed (tests, embedding applications).
    if tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing already initialized, not logging to {}", unique_path);
    }
}

fn log_target(env_value: Option<String>, config: &LoggingConfig) -> Option<String> {
    env_value
        .filter(|path| !path.is_empty())
        .or_else(|| config.file.clone())
}

fn unique_log_path(base: &str) -> String {
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}.{}.{}", base, timestamp, pid)
}
