//! Event Feedback Sentiment Service: binary entrypoint.
//! Boots the Axum HTTP server with the sentiment engine, `/metrics` and CORS.

use std::sync::Arc;

use event_feedback_sentiment::feedback::{EventFeedback, InMemoryFeedback};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "event_feedback_sentiment=info,warn";
const DEMO_FEEDBACK_PATH: &str = "data/demo_feedback.json";

/// Compact logs by default, JSON lines with `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // try_init: the platform may have installed a subscriber already.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Event comments and ratings are owned by the host platform; locally we seed
/// the in-memory source from a JSON file when one is present.
fn load_feedback() -> InMemoryFeedback {
    let src = InMemoryFeedback::new();
    let Ok(raw) = std::fs::read_to_string(DEMO_FEEDBACK_PATH) else {
        return src;
    };
    match serde_json::from_str::<std::collections::HashMap<String, EventFeedback>>(&raw) {
        Ok(events) => {
            for (id, ev) in events {
                src.insert(id, ev);
            }
        }
        Err(e) => tracing::warn!(path = DEMO_FEEDBACK_PATH, error = %e, "ignoring malformed demo feedback"),
    }
    src
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let router = event_feedback_sentiment::app(Arc::new(load_feedback()))?;
    info!("event feedback sentiment service ready");
    Ok(router.into())
}
