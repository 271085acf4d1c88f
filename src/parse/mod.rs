//! Turning fetched documents into thread and comment candidates.
//!
//! Feed parsing is format-level and lives in [`feed`]. Discussion pages are
//! layout specific, so the pipeline only talks to them through [`PageParser`].

pub mod feed;
pub mod vanilla;

use thiserror::Error;

use crate::db::{NewComment, NewThread, Thread};

pub use feed::parse_feed;
pub use vanilla::VanillaParser;

#[derive(Debug, Error)]
pub enum ParseError {
    /// An expected region of the page is missing; the page is not a thread of
    /// the layout we know.
    #[error("page structure mismatch: missing {0}")]
    StructureMismatch(&'static str),
    #[error("failed to parse feed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
}

/// A comment as found on a page, before the structural filter runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedComment {
    pub comment: NewComment,
    /// Role badge shown next to the author, if any.
    pub role: Option<String>,
}

/// Layout-specific discussion page parser.
pub trait PageParser: Send + Sync {
    /// Parse the opening post of a discussion page.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::StructureMismatch`] when a required region is absent.
    fn parse_thread_page(&self, url: &str, html: &str) -> Result<NewThread, ParseError>;

    /// Parse every comment on one comment page of `thread`. Comments missing an
    /// id, author or timestamp are skipped.
    fn parse_comment_page(&self, thread: &Thread, html: &str) -> Vec<ParsedComment>;
}

/// Short site name of a source URL: the first host label, ignoring `www.`.
///
/// `https://lowendtalk.com/...` gives `lowendtalk`.
#[must_use]
pub fn source_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .map(|host| {
            let host = host.strip_prefix("www.").unwrap_or(&host);
            host.split('.').next().unwrap_or_default().to_string()
        })
        .unwrap_or_default()
}

/// Category of a feed URL: the path segment after `categories`.
#[must_use]
pub fn feed_category(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return String::new();
    };
    let Some(mut segments) = parsed.path_segments() else {
        return String::new();
    };
    segments
        .by_ref()
        .find(|s| *s == "categories")
        .and_then(|_| segments.next())
        .unwrap_or_default()
        .to_string()
}
