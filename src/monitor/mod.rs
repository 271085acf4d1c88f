//! Periodic ingestion of forum threads and comments.
//!
//! A [`Monitor`] repeatedly sweeps every configured source: directly watched
//! pages first, then feeds. Every thread seen during a sweep, new or known, has
//! its comment pages crawled from the stored cursor.

mod crawler;
mod reconcile;
mod sources;
mod sweep;

pub use reconcile::{reconcile_comment, reconcile_thread, Reconciled};
pub use sweep::SweepStats;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::classifier::Classifier;
use crate::config::ConfigError;
use crate::db::Database;
use crate::fetch::Fetcher;
use crate::notify::Notifier;
use crate::parse::PageParser;
use crate::settings::Settings;

use sweep::Sweep;

/// Everything a sweep needs, constructed once and shared.
pub struct MonitorContext {
    db: Database,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    page_delay: Duration,
    settings: RwLock<Arc<Settings>>,
}

impl MonitorContext {
    #[must_use]
    pub fn new(
        db: Database,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            fetcher,
            parser,
            classifier,
            notifier,
            page_delay: Duration::from_secs(1),
            settings: RwLock::new(Arc::new(settings)),
        }
    }

    /// Pause between two comment pages of the same thread.
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Current settings. A sweep holds on to the snapshot it started with.
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the active settings. Takes effect at the next sweep.
    pub fn reload(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
        info!("Settings reloaded");
    }

    /// Reload settings from a file, keeping the current ones on error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn reload_from(&self, path: &Path) -> Result<(), ConfigError> {
        let settings = Settings::load(path).await?;
        self.reload(settings);
        Ok(())
    }
}

/// Runs sweeps forever, sleeping `frequency` seconds in between.
pub struct Monitor {
    ctx: Arc<MonitorContext>,
    sweeping: AtomicBool,
}

impl Monitor {
    #[must_use]
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self {
            ctx,
            sweeping: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.ctx
    }

    /// Whether a sweep is in progress.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::Relaxed)
    }

    /// Sweep, sleep, repeat until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Starting monitor");

        loop {
            let stats = self.sweep_once(&shutdown).await;
            let interval = self.ctx.settings().sweep_interval();
            info!(
                new_threads = stats.threads_new,
                new_comments = stats.comments_new,
                pages = stats.pages_fetched,
                notifications = stats.notifications_sent,
                failed_sources = stats.sources_failed,
                sleep_secs = interval.as_secs(),
                "Sweep complete"
            );

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = shutdown.cancelled() => {
                    info!("Monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Run one sweep over every configured source.
    pub async fn sweep_once(&self, shutdown: &CancellationToken) -> SweepStats {
        let settings = self.ctx.settings();
        self.sweeping.store(true, Ordering::Relaxed);

        let mut sweep = Sweep::new(&self.ctx, &settings, shutdown);

        for url in &settings.extra_urls {
            if shutdown.is_cancelled() {
                break;
            }
            sweep.read_extra_page(url).await;
        }

        if !settings.only_extra {
            for url in &settings.urls {
                if shutdown.is_cancelled() {
                    break;
                }
                sweep.read_feed(url).await;
            }
        }

        self.sweeping.store(false, Ordering::Relaxed);
        sweep.stats
    }
}
