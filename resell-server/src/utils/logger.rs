//! Logging Infrastructure
//!
//! - Console output: pretty in development, JSON in production
//! - Optional daily rotating files under `<log_dir>/app` and `<log_dir>/security`
//!   (`security` target events go only to the security file)

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level directive (e.g., "info", "resell_server=debug")
/// * `json_format` - JSON console output (production)
/// * `log_dir` - Optional directory for rotating log files
///
/// Calling it twice is harmless: the second call leaves the first subscriber in place.
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_filter(env_filter(level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(env_filter(level))
            .boxed()
    };
    layers.push(console_layer);

    if let Some(dir) = log_dir {
        let app_log_dir = dir.join("app");
        let security_log_dir = dir.join("security");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&security_log_dir)?;

        // Application logs, everything except security events
        let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::sync::Mutex::new(app_log))
                .with_filter(env_filter(level))
                .with_filter(filter_fn(|meta| meta.target() != "security"))
                .boxed(),
        );

        // Security logs (auth failures, permission denials)
        let security_log = RollingFileAppender::new(Rotation::DAILY, security_log_dir, "security");
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::sync::Mutex::new(security_log))
                .with_filter(filter_fn(|meta| meta.target() == "security"))
                .boxed(),
        );
    }

    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_creates_log_dirs() {
        let dir = tempfile::tempdir().unwrap();
        init_logger("debug", false, Some(dir.path())).unwrap();

        assert!(dir.path().join("app").is_dir());
        assert!(dir.path().join("security").is_dir());

        // second call must not fail
        init_logger("debug", true, None).unwrap();
    }
}
