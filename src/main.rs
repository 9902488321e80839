//! Moltbunker - command line client for Moltbunker WebSocket sessions.

use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use moltbunker_config::{ClientConfig, ConfigLoader, ConfigValidator};

mod cli;
mod cmd_auth;
mod cmd_events;
mod cmd_exec;

use cli::{Cli, Commands};

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("moltbunker")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the program duration.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console on stderr; stdout carries command output.
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = ConfigLoader::expand_path(&path.to_string_lossy());
            ConfigLoader::load(Path::new(&path))
                .with_context(|| format!("failed to load {}", path))?
                .with_env_overrides()
        }
        None => ConfigLoader::load_default()?,
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }

    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    if !result.is_valid() {
        for error in &result.errors {
            tracing::error!("Config {}: {}", error.path, error.message);
        }
        bail!("invalid configuration ({} error(s))", result.errors.len());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_dir.as_deref())?;

    let config = load_config(&cli)?;
    info!("Using API at {}", config.api.base_url());

    match cli.command {
        Commands::Events { channels, token } => {
            cmd_events::run_events(&config, channels, token).await
        }
        Commands::Exec {
            container_id,
            cols,
            rows,
            token,
        } => cmd_exec::run_exec(&config, &container_id, cols, rows, token).await,
        Commands::Sign { message } => cmd_auth::sign(&config, &message),
        Commands::Whoami => cmd_auth::whoami(&config),
        Commands::Check => {
            println!("Configuration OK");
            Ok(())
        }
    }
}
