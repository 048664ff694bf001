use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with rotating file appender.
///
/// Logs are written to the specified directory with daily rotation.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for log files (e.g., "spellquest")
/// * `debug_mode` - If true, use debug level; otherwise use info level
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(log_dir: &str, log_prefix: &str, debug_mode: bool) -> Result<WorkerGuard> {
    init_subscriber(log_dir, log_prefix, debug_mode, false, false)
}

/// Setup logging from the `Logging` section of the user config.
///
/// Console output, when enabled, goes to stderr so it never interleaves with
/// the game's own text on stdout.
pub fn setup_logging_from_settings(
    settings: &LoggingSettings,
    log_prefix: &str,
) -> Result<WorkerGuard> {
    init_subscriber(
        &settings.log_dir,
        log_prefix,
        settings.debug_mode,
        settings.console_output,
        settings.json_format,
    )
}

fn ensure_log_dir(log_dir: &str) -> Result<()> {
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

fn init_subscriber(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
    json_format: bool,
) -> Result<WorkerGuard> {
    ensure_log_dir(log_dir)?;

    // Daily rotating file appender
    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let json_layer = json_format.then(|| {
        fmt::layer()
            .json()
            .with_writer(non_blocking.clone())
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let text_layer = (!json_format).then(|| {
        fmt::layer()
            .with_writer(non_blocking.clone())
            .with_ansi(false) // No ANSI codes in log files
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output,
        json_format
    );

    Ok(guard)
}
