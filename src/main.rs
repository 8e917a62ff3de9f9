//! Newsroom recommender: binary entrypoint.
//! Loads `.env`, sets up tracing and serves the Axum router on Shuttle.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_LOG_JSON: &str = "RECOMMENDER_LOG_JSON";

/// Compact logs by default, JSON lines with `RECOMMENDER_LOG_JSON=1`.
/// A subscriber installed by the runtime wins; ours is then skipped.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newsroom_recommender=info,warn"));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = newsroom_recommender::app().await?;
    Ok(router.into())
}
