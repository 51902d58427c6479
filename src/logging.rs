use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable. Extractor degradations are
/// logged at `warn`, request handling at `info`.
const DEFAULT_DIRECTIVES: &str = "census_services=info,tower_http=info,warn";

fn census_filter(from_env: Option<String>) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_logging() -> Result<()> {
    let filter = census_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}
