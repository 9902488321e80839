//! `exec` subcommand.

use std::io::Write;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use moltbunker_config::ClientConfig;
use moltbunker_ws::{ExecOptions, ExecSession};

/// Attach stdin/stdout to a container terminal.
pub(crate) async fn run_exec(
    config: &ClientConfig,
    container_id: &str,
    cols: Option<u16>,
    rows: Option<u16>,
    token: Option<String>,
) -> anyhow::Result<()> {
    let Some(token) = token.or_else(|| config.auth.api_key.clone()) else {
        bail!("exec requires a bearer token (--token or MOLTBUNKER_API_KEY)");
    };
    let private_key = config
        .auth
        .private_key
        .as_deref()
        .context("exec requires a wallet key (MOLTBUNKER_PRIVATE_KEY)")?;

    let mut options = ExecOptions::from(&config.exec);
    if let Some(cols) = cols {
        options.cols = cols;
    }
    if let Some(rows) = rows {
        options.rows = rows;
    }

    let session = ExecSession::new(
        config.api.base_url(),
        container_id,
        &token,
        private_key,
        options,
    )?;
    session.on_data(|data| {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(&data);
        let _ = out.flush();
    });
    session.on_error(|text| eprintln!("remote error: {}", text));

    session
        .connect()
        .await
        .with_context(|| format!("failed to attach to {}", container_id))?;
    info!("Attached to {}, Ctrl-C to detach", container_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = session.wait() => {
                info!("Session ended");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(e) = session.send(format!("{}\n", line)) {
                        debug!("Input not sent: {}", e);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    session.close().await;
    match session.last_error() {
        Some(e) => bail!("exec session failed: {}", e),
        None => Ok(()),
    }
}
