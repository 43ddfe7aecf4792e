use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "womencypedia_cms=info";

/// Initializes console logging on stderr, plus JSON file logging with daily
/// rotation when `log_dir` is given. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed on exit.
pub fn init_logging(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // stdout carries command output, so the console layer writes to stderr
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, "womencypedia-cms.log");
                let (writer, guard) = tracing_appender::non_blocking(file_appender);
                (Some(fmt::layer().json().with_writer(writer)), Some(guard))
            }
            Err(e) => {
                eprintln!("could not create log directory '{}': {}", dir, e);
                (None, None)
            }
        },
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
    {
        eprintln!("logging was not initialized: {}", e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        let _first = init_logging(None);
        let second = init_logging(Some(path));
        assert!(second.is_some());
        assert!(dir.path().exists());
    }
}
