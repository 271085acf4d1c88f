//! Comment-page traversal for one thread.
//!
//! Pages are fetched in increasing order starting at the thread's stored
//! cursor. The forum answers 404 for the first page past the end, which is
//! when the cursor is saved: one page back, so the next sweep re-reads the
//! last real page and catches replies posted there in the meantime.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, trace, warn};

use super::reconcile::reconcile_comment;
use super::sweep::Sweep;
use crate::db::{set_thread_last_page, Thread};
use crate::filter::{passes_structural, ItemKind, Verdict};
use crate::notify::format_comment_notice;
use crate::parse::ParsedComment;

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlEnd {
    /// Reached a missing page; the cursor now points at `last_page`.
    Exhausted { last_page: i64 },
    /// `page` could not be fetched; the cursor was left alone.
    Interrupted { page: i64 },
    /// Shutdown was requested before `page` was fetched.
    Cancelled { page: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_fetched: usize,
    pub comments_new: usize,
    pub end: CrawlEnd,
}

/// URL of comment page `page` of a thread.
#[must_use]
pub fn comment_page_url(thread_link: &str, page: i64) -> String {
    format!("{}/p{page}", thread_link.trim_end_matches('/'))
}

impl Sweep<'_> {
    /// Walk the comment pages of `thread` from its cursor until the end.
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures; fetch problems end the crawl
    /// with [`CrawlEnd::Interrupted`].
    pub(super) async fn crawl(&mut self, thread: &Thread) -> Result<CrawlReport> {
        let mut page = thread.start_page();
        let mut report = CrawlReport {
            pages_fetched: 0,
            comments_new: 0,
            end: CrawlEnd::Cancelled { page },
        };

        loop {
            if self.shutdown.is_cancelled() {
                report.end = CrawlEnd::Cancelled { page };
                break;
            }

            let url = comment_page_url(&thread.link, page);
            debug!(url = %url, "Fetching comment page");

            let response = match self.ctx.fetcher.fetch(&url).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %url, "Comment page fetch failed: {e:#}");
                    report.end = CrawlEnd::Interrupted { page };
                    break;
                }
            };

            if response.is_not_found() {
                let last_page = (page - 1).max(1);
                set_thread_last_page(self.ctx.db.pool(), &thread.link, last_page).await?;
                report.end = CrawlEnd::Exhausted { last_page };
                break;
            }

            if !response.is_success() {
                warn!(url = %url, status = response.status, "Comment page returned error status");
                report.end = CrawlEnd::Interrupted { page };
                break;
            }

            report.pages_fetched += 1;
            self.stats.pages_fetched += 1;

            for parsed in self.ctx.parser.parse_comment_page(thread, &response.body) {
                if self.handle_comment(thread, parsed).await? {
                    report.comments_new += 1;
                }
            }

            page += 1;

            if !self.ctx.page_delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.ctx.page_delay) => {}
                    () = self.shutdown.cancelled() => {
                        report.end = CrawlEnd::Cancelled { page };
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Crawl and log the outcome. Store errors are logged, not returned.
    pub(super) async fn crawl_and_log(&mut self, thread: &Thread) {
        match self.crawl(thread).await {
            Ok(report) => match report.end {
                CrawlEnd::Exhausted { last_page } => debug!(
                    link = %thread.link,
                    pages = report.pages_fetched,
                    new_comments = report.comments_new,
                    last_page,
                    "Thread crawled"
                ),
                CrawlEnd::Interrupted { page } => info!(
                    link = %thread.link,
                    page,
                    new_comments = report.comments_new,
                    "Thread crawl interrupted, will resume next sweep"
                ),
                CrawlEnd::Cancelled { page } => {
                    debug!(link = %thread.link, page, "Thread crawl cancelled");
                }
            },
            Err(e) => warn!(link = %thread.link, "Thread crawl failed: {e:#}"),
        }
    }

    /// Filter, store and possibly announce one parsed comment. Returns whether
    /// it was newly stored.
    async fn handle_comment(&mut self, thread: &Thread, parsed: ParsedComment) -> Result<bool> {
        if !passes_structural(self.settings.comment_filter, &parsed, &thread.creator) {
            trace!(comment_id = %parsed.comment.comment_id, "Comment dropped by structural filter");
            return Ok(false);
        }

        let comment = parsed.comment;
        if !reconcile_comment(self.ctx.db.pool(), &comment).await?.is_new() {
            return Ok(false);
        }
        self.stats.comments_new += 1;

        let verdict = self
            .filters
            .evaluate(ItemKind::Comment, &comment.message, comment.created_at, Utc::now())
            .await;
        match verdict {
            Verdict::Notify { annotation } => {
                self.notify(format_comment_notice(thread, &comment, &annotation))
                    .await;
            }
            Verdict::Skip(reason) => {
                debug!(comment_id = %comment.comment_id, ?reason, "Comment not notified");
            }
        }

        Ok(true)
    }
}
