//! `events` subcommand.

use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};

use moltbunker_config::ClientConfig;
use moltbunker_ws::EventStream;

/// Subscribe to `channels` and print each update as one JSON line.
pub(crate) async fn run_events(
    config: &ClientConfig,
    channels: Vec<String>,
    token: Option<String>,
) -> anyhow::Result<()> {
    let token = token.or_else(|| config.auth.api_key.clone());
    if token.is_none() {
        warn!("No API key configured; connecting without a bearer token");
    }

    let stream = EventStream::new(config.api.base_url(), token.as_deref(), &config.events)?;
    for channel in channels {
        let name = channel.clone();
        stream.subscribe(channel, move |data| {
            println!("{}", json!({"channel": name, "data": data}));
        });
    }

    stream
        .connect()
        .await
        .context("failed to open event stream")?;
    info!(
        "Streaming {} channel(s), Ctrl-C to stop",
        stream.channels().len()
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = stream.wait() => {}
    }
    stream.close().await;

    if let Some(e) = stream.last_error() {
        warn!("Last error: {}", e);
    }
    Ok(())
}
