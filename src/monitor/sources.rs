//! Feed and single-page source readers.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::reconcile::reconcile_thread;
use super::sweep::Sweep;
use crate::constants::FEED_BATCH_LIMIT;
use crate::db::{get_thread_by_link, NewThread};
use crate::filter::{ItemKind, Verdict};
use crate::notify::format_thread_notice;
use crate::parse::parse_feed;

impl Sweep<'_> {
    /// Read one feed and ingest its newest entries.
    pub(super) async fn read_feed(&mut self, feed_url: &str) {
        info!(feed = %feed_url, "Checking feed");

        let response = match self.ctx.fetcher.fetch(feed_url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(feed = %feed_url, status = response.status, "Feed fetch returned error status");
                self.stats.sources_failed += 1;
                return;
            }
            Err(e) => {
                warn!(feed = %feed_url, "Feed fetch failed: {e:#}");
                self.stats.sources_failed += 1;
                return;
            }
        };

        let candidates = match parse_feed(response.body.as_bytes(), feed_url, FEED_BATCH_LIMIT) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(feed = %feed_url, error = %e, "Feed could not be parsed");
                self.stats.sources_failed += 1;
                return;
            }
        };

        for candidate in candidates {
            if self.shutdown.is_cancelled() {
                return;
            }
            let link = candidate.link.clone();
            if let Err(e) = self.ingest_thread(candidate).await {
                warn!(link = %link, "Failed to process thread: {e:#}");
            }
        }
    }

    /// Visit one directly watched discussion page.
    ///
    /// Known threads are crawled from their cursor without refetching the
    /// opening post.
    pub(super) async fn read_extra_page(&mut self, url: &str) {
        info!(url = %url, "Checking extra URL");

        match get_thread_by_link(self.ctx.db.pool(), url).await {
            Ok(Some(thread)) => {
                self.crawl_and_log(&thread).await;
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %url, "Failed to look up thread: {e:#}");
                self.stats.sources_failed += 1;
                return;
            }
        }

        let response = match self.ctx.fetcher.fetch(url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(url = %url, status = response.status, "Page fetch returned error status");
                self.stats.sources_failed += 1;
                return;
            }
            Err(e) => {
                warn!(url = %url, "Page fetch failed: {e:#}");
                self.stats.sources_failed += 1;
                return;
            }
        };

        let candidate = match self.ctx.parser.parse_thread_page(url, &response.body) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(url = %url, error = %e, "Page skipped");
                self.stats.sources_failed += 1;
                return;
            }
        };

        if let Err(e) = self.ingest_thread(candidate).await {
            warn!(url = %url, "Failed to process thread: {e:#}");
        }
    }

    /// Reconcile a thread candidate, announce it if new and fresh, then crawl
    /// its comments whether it was new or not.
    async fn ingest_thread(&mut self, candidate: NewThread) -> Result<()> {
        let ctx = self.ctx;
        let pool = ctx.db.pool();

        if reconcile_thread(pool, &candidate).await?.is_new() {
            self.stats.threads_new += 1;
            info!(link = %candidate.link, title = %candidate.title, "New thread");

            let verdict = self
                .filters
                .evaluate(
                    ItemKind::Thread,
                    &candidate.filter_text(),
                    candidate.pub_date,
                    Utc::now(),
                )
                .await;
            match verdict {
                Verdict::Notify { annotation } => {
                    self.notify(format_thread_notice(&candidate, &annotation))
                        .await;
                }
                Verdict::Skip(reason) => {
                    debug!(link = %candidate.link, ?reason, "Thread not notified");
                }
            }
        }

        let thread = get_thread_by_link(pool, &candidate.link)
            .await?
            .with_context(|| format!("Thread {} missing after reconciliation", candidate.link))?;

        self.crawl_and_log(&thread).await;
        Ok(())
    }
}
