//! Tracing subscriber setup driven by [`LoggingConfig`].
//!
//! `RUST_LOG` overrides the configured level when set.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn format_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Build the filter for `config`, preferring `RUST_LOG` when it parses.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()))
}

/// Install the global subscriber. Fails if one is already installed or the
/// log file cannot be opened.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        layers.push(format_layer(std::io::stdout, config.json_format, true));
    }

    if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            ProtocolError::ConfigError("log_to_file is set without log_file_path".to_string())
        })?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        layers.push(format_layer(Arc::new(file), config.json_format, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
