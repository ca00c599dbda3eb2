//! Hifumi bot binary.
//!
//! Loads configuration, opens the guild store, and dispatches console events
//! until input ends or a SIGTERM/SIGINT arrives.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use hifumi_bot::config::{self, Config};
use hifumi_bot::console::{self, WriterSink};
use hifumi_bot::locale::LanguageTable;
use hifumi_bot::{BotError, Defaults, Dispatcher};
use hifumi_store::{Store, StoreHandle};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HIFUMI_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries replies.
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), BotError> {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().unwrap_or("config.toml");

    let config = config::load_config(Some(selected_config_path))?;
    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = selected_config_path,
        "resolved startup configuration path"
    );

    let store = Store::open(&config.database.path, config.database.runtime_settings())?;
    let handle = StoreHandle::new(
        store,
        Duration::from_millis(config.database.op_timeout_ms),
    );

    let languages = LanguageTable::load_dir(Path::new(&config.bot.language_dir))?;

    let dispatcher = Dispatcher::new(
        handle,
        Arc::new(languages),
        Arc::new(WriterSink::new(std::io::stdout())),
        Defaults {
            prefix: config.bot.default_prefix.clone(),
            locale: config.bot.default_locale.clone(),
        },
    );

    tracing::info!(
        db = %config.database.path,
        prefix = %config.bot.default_prefix,
        "hifumi started, reading events from stdin"
    );

    console::run(
        BufReader::new(tokio::io::stdin()),
        dispatcher,
        shutdown_signal(),
    )
    .await?;

    tracing::info!("hifumi shut down");
    Ok(())
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
