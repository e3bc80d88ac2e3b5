use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of the process log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Plain,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "plain" | "text" | "pretty" => Ok(Self::Plain),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize structured logging with JSON format
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with specific level
pub fn init_with_level(level: &str) {
    init_with_format(level, LogFormat::Json)
}

/// Initialize logging; `RUST_LOG` overrides `level`
pub fn init_with_format(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // try_init: a second call keeps the first subscriber
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.with_target(true).try_init(),
    };
}

/// Initialize logging for tests (plain format)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
