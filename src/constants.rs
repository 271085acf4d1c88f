//! Shared constants used across the application.

use std::time::Duration;

/// User agent string used for page and feed requests.
///
/// Forum software behind bot protection rejects obvious automation clients, so
/// requests present themselves as a current desktop browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Maximum number of feed entries considered per feed per sweep.
pub const FEED_BATCH_LIMIT: usize = 6;

/// Items published longer ago than this are stored but never notified.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
