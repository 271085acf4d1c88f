use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_thread_monitor::classifier::{Classifier, DisabledClassifier, OpenAiClassifier};
use forum_thread_monitor::config::Config;
use forum_thread_monitor::db::Database;
use forum_thread_monitor::fetch::HttpFetcher;
use forum_thread_monitor::monitor::{Monitor, MonitorContext};
use forum_thread_monitor::notify;
use forum_thread_monitor::parse::VanillaParser;
use forum_thread_monitor::settings::Settings;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forum-thread-monitor");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!(path = %config.database_path.display(), "Database initialized");

    let settings = Settings::load(&config.settings_path)
        .await
        .context("Failed to load settings")?;
    info!(
        path = %config.settings_path.display(),
        feeds = settings.urls.len(),
        extra_urls = settings.extra_urls.len(),
        "Settings loaded"
    );

    let classifier: Arc<dyn Classifier> = if config.openai_api_key.is_some() {
        Arc::new(OpenAiClassifier::from_config(&config).context("Failed to build classifier")?)
    } else {
        if settings.use_ai_filter {
            warn!("use_ai_filter is set but OPENAI_API_KEY is missing; AI-filtered items will be dropped");
        }
        Arc::new(DisabledClassifier)
    };

    let ctx = MonitorContext::new(
        db,
        Arc::new(HttpFetcher::new(config.fetch_timeout)?),
        Arc::new(VanillaParser::new()),
        classifier,
        notify::from_config(&config)?,
        settings,
    )
    .with_page_delay(config.page_delay);
    let monitor = Arc::new(Monitor::new(Arc::new(ctx)));

    let shutdown = CancellationToken::new();

    let reload_handle = spawn_reload_listener(
        Arc::clone(monitor.context()),
        config.settings_path.clone(),
        shutdown.clone(),
    );

    let monitor_task = {
        let monitor = Arc::clone(&monitor);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run(shutdown).await })
    };

    shutdown_signal().await;

    info!("Shutting down...");
    shutdown.cancel();

    if let Err(e) = monitor_task.await {
        error!("Monitor task failed: {e}");
    }
    if let Some(handle) = reload_handle {
        handle.abort();
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_thread_monitor=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

/// Reload settings from disk on SIGHUP.
#[cfg(unix)]
fn spawn_reload_listener(
    ctx: Arc<MonitorContext>,
    path: std::path::PathBuf,
    shutdown: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("Failed to install SIGHUP handler, settings reload disabled: {e}");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!(path = %path.display(), "SIGHUP received, reloading settings");
                    if let Err(e) = ctx.reload_from(&path).await {
                        error!("Settings reload failed, keeping previous settings: {e}");
                    }
                }
                () = shutdown.cancelled() => break,
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_reload_listener(
    _ctx: Arc<MonitorContext>,
    _path: std::path::PathBuf,
    _shutdown: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    None
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
