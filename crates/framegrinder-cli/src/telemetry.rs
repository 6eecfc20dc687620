use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "framegrinder=info";

/// Log output format, selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        Self::from_value(std::env::var("LOG_FORMAT").ok().as_deref())
    }
}

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so stdout carries only command output. `RUST_LOG` overrides
/// the default `framegrinder=info` filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match LogFormat::from_env() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
