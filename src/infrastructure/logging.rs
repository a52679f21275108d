use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_FILE_NAME: &str = "dayplan.log";

/// Installs the global subscriber: human-readable lines on stderr and, when
/// `log_file` is set, JSON lines appended to that file.
///
/// `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str, log_file: Option<&Path>) -> Result<(), InfraError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(json_layer)
        .try_init()
        .map_err(|error| InfraError::InvalidConfig(format!("failed to install tracing subscriber: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn subscriber_is_installed_once() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join(LOG_FILE_NAME);

        let first = init_tracing("info", Some(&path));
        assert!(path.exists());
        if first.is_ok() {
            assert!(matches!(
                init_tracing("info", None),
                Err(InfraError::InvalidConfig(_))
            ));
        }
    }
}
