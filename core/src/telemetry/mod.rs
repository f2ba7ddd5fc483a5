//! Tracing bootstrap and structured session telemetry.

pub mod events;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::collaborators::config::env_override;

const LOG_FILE_PREFIX: &str = "speaking-coach.log";

/// Installs the global subscriber.
///
/// `SPEAKING_COACH_LOG_FORMAT=json` switches stdout to JSON lines and
/// `SPEAKING_COACH_LOG_DIR` adds a daily-rolling file sink. Keep the returned
/// guard alive for the lifetime of the process so buffered file output is flushed.
pub fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env_override("SPEAKING_COACH_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let stdout_layer = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let (file_layer, guard) = match env_override("SPEAKING_COACH_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber).expect("failed to set global subscriber");
    guard
}
