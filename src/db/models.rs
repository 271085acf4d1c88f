use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion thread discovered from a feed or a directly watched page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Thread {
    pub id: i64,
    pub link: String,
    pub domain: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub creator: String,
    pub pub_date: String,
    pub created_at: String,
    /// Next comment page to fetch.
    pub last_page: i64,
}

impl Thread {
    /// Page the next crawl starts from.
    #[must_use]
    pub fn start_page(&self) -> i64 {
        self.last_page.max(1)
    }
}

/// A comment posted in a thread.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    /// `{domain}_{forum comment id}`.
    pub comment_id: String,
    pub thread_url: String,
    pub author: String,
    pub message: String,
    pub created_at: String,
    pub created_at_recorded: String,
    pub url: String,
}

/// Data for inserting a new thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub domain: String,
    pub category: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub creator: String,
    pub pub_date: DateTime<Utc>,
}

impl NewThread {
    /// Text the keyword and AI rules look at.
    #[must_use]
    pub fn filter_text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.description)
        }
    }
}

/// Data for inserting a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub comment_id: String,
    pub thread_url: String,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

/// Result of an insert guarded by a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same key already exists; nothing was written.
    Duplicate,
}
