use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt as _};

const DEFAULT_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Flattened single-line JSON, no colours
    Json,
    /// Multi-line JSON with colours for local runs
    Pretty,
}

impl LogFormat {
    /// `json` / `prod` select [`LogFormat::Json`], anything else is pretty.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" || v == "prod" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(format: LogFormat) {
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().flatten_event(true).with_ansi(false))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().pretty().with_ansi(true))
            .init(),
    }
}
