use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::MonitorContext;
use crate::filter::FilterChain;
use crate::settings::Settings;

/// Counters for one sweep, logged when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub threads_new: usize,
    pub comments_new: usize,
    pub pages_fetched: usize,
    pub notifications_sent: usize,
    /// Sources (feeds or extra pages) that could not be read this sweep.
    pub sources_failed: usize,
}

/// One pass over all sources with a fixed settings snapshot.
pub(crate) struct Sweep<'a> {
    pub(super) ctx: &'a MonitorContext,
    pub(super) settings: &'a Settings,
    pub(super) filters: FilterChain<'a>,
    pub(super) shutdown: &'a CancellationToken,
    pub(super) stats: SweepStats,
}

impl<'a> Sweep<'a> {
    pub(super) fn new(
        ctx: &'a MonitorContext,
        settings: &'a Settings,
        shutdown: &'a CancellationToken,
    ) -> Self {
        Self {
            ctx,
            settings,
            filters: FilterChain::new(settings, ctx.classifier.as_ref()),
            shutdown,
            stats: SweepStats::default(),
        }
    }

    /// Hand a message to the notifier. Failures are logged and dropped.
    pub(super) async fn notify(&mut self, message: String) {
        match self.ctx.notifier.send(&message).await {
            Ok(()) => self.stats.notifications_sent += 1,
            Err(e) => warn!("Failed to send notification: {e:#}"),
        }
    }
}
