//! Out-of-process analyzer: reads one JSON request from stdin, writes one JSON
//! response to stdout. Logs go to stderr so they never corrupt the reply.

use event_feedback_sentiment::analyze::wire::handle_json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;

    let resp = handle_json(&raw);
    if let Some(err) = &resp.error {
        tracing::warn!(error = %err, "request failed");
    }

    let mut out = serde_json::to_vec(&resp)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    Ok(())
}
