//! Utilities for logging.
use std::fmt;
use std::str::FromStr;

use tracing::subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "human" | "pretty" => LogFormat::HumanReadable,
            "compact" => LogFormat::Compact,
            "json" => LogFormat::Json,
            other => return Err(format!("Unknown log format: {other}")),
        })
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HumanReadable => write!(f, "human"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Configure the global tracing subscriber.
///
/// `default_level` applies when `RUST_LOG` isn't set. Calling this more than
/// once is a no-op since the first subscriber wins.
pub fn configure_global_logger<W>(default_level: tracing::Level, format: LogFormat, make_writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(make_writer)
        .with_file(true)
        .with_line_number(true);

    let _ = match format {
        LogFormat::HumanReadable => subscriber::set_global_default(builder.finish()),
        LogFormat::Compact => subscriber::set_global_default(builder.compact().finish()),
        LogFormat::Json => subscriber::set_global_default(builder.json().finish()),
    };
}

/// Install a debug level subscriber that writes through the test harness.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
