use crate::error::ConsultError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log file name inside the configured log directory
pub const LOG_FILE_NAME: &str = "consult-search.log";

/// Crates whose debug output drowns the service's own
const QUIET_TARGETS: &[&str] = &["hyper=warn", "reqwest=warn", "actix_server=info"];

/// Console plus append-only file logging for the server
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), ConsultError> {
    let (log_file, log_file_path) = open_log_file(log_dir)?;
    let filter = env_filter(log_level);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter.clone());

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConsultError::config(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!("Logging to {} (level {})", log_file_path.display(), log_level);
    Ok(())
}

/// Stderr-only logging for the one-shot CLI commands; stdout stays clean
pub fn setup_console_logging(log_level: &str) -> Result<(), ConsultError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(log_level))
        .try_init()
        .map_err(|e| ConsultError::config(format!("Failed to install subscriber: {}", e)))
}

/// Parse a configured level name; `warning` is accepted as an alias
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

/// `RUST_LOG` wins; otherwise the configured level plus the quiet targets
fn env_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directives(log_level))
}

fn default_directives(log_level: &str) -> String {
    let level = parse_log_level(log_level).unwrap_or(Level::INFO);
    let mut directives = vec![level.to_string().to_lowercase()];
    directives.extend(QUIET_TARGETS.iter().map(|t| t.to_string()));
    directives.join(",")
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), ConsultError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        ConsultError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            ConsultError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_log_level(" WARNING "), Some(Level::WARN));
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn test_default_directives_fall_back_to_info() {
        assert_eq!(
            default_directives("debug"),
            "debug,hyper=warn,reqwest=warn,actix_server=info"
        );
        assert!(default_directives("loud").starts_with("info,"));
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("log");

        let (_, path) = open_log_file(&log_dir).unwrap();
        assert_eq!(path, log_dir.join(LOG_FILE_NAME));
        assert!(path.exists());
    }
}
