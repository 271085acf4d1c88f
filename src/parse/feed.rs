use chrono::Utc;
use scraper::Html;
use tracing::debug;

use super::{feed_category, source_domain, ParseError};
use crate::db::NewThread;

/// Parse a syndication feed into at most `limit` thread candidates, in feed
/// order. Entries without a link are skipped.
///
/// # Errors
///
/// Returns an error if the body is not a feed `feed-rs` understands.
pub fn parse_feed(body: &[u8], feed_url: &str, limit: usize) -> Result<Vec<NewThread>, ParseError> {
    let feed = feed_rs::parser::parse(body)?;

    let domain = source_domain(feed_url);
    let category = feed_category(feed_url);

    let threads = feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| {
            let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()) else {
                debug!(id = %entry.id, "Feed entry without link, skipping");
                return None;
            };

            let description_html = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
                .unwrap_or_default();

            Some(NewThread {
                domain: domain.clone(),
                category: category.clone(),
                title: entry
                    .title
                    .map(|t| t.content.trim().to_string())
                    .unwrap_or_default(),
                link,
                description: html_to_text(&description_html),
                creator: entry
                    .authors
                    .first()
                    .map(|a| a.name.trim().to_string())
                    .unwrap_or_default(),
                pub_date: entry.published.or(entry.updated).unwrap_or_else(Utc::now),
            })
        })
        .collect();

    Ok(threads)
}

/// Render an HTML fragment as plain text with blank lines dropped.
pub(crate) fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
