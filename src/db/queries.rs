use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Comment, InsertOutcome, NewComment, NewThread, Thread};

// ========== Threads ==========

/// Get a thread by its link.
pub async fn get_thread_by_link(pool: &SqlitePool, link: &str) -> Result<Option<Thread>> {
    sqlx::query_as("SELECT * FROM threads WHERE link = ?")
        .bind(link)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch thread by link")
}

/// Insert a thread unless one with the same link exists.
///
/// The unique index on `link` decides, so two concurrent callers racing on the
/// same link get exactly one `Inserted`.
pub async fn insert_thread(pool: &SqlitePool, thread: &NewThread) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r"
        INSERT INTO threads (link, domain, category, title, description, creator, pub_date, created_at, last_page)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
        ON CONFLICT(link) DO NOTHING
        ",
    )
    .bind(&thread.link)
    .bind(&thread.domain)
    .bind(&thread.category)
    .bind(&thread.title)
    .bind(&thread.description)
    .bind(&thread.creator)
    .bind(thread.pub_date.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .context("Failed to insert thread")?;

    Ok(if result.rows_affected() == 1 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Duplicate
    })
}

/// Persist the comment-page cursor of a thread.
///
/// Returns `false` if no thread has this link.
pub async fn set_thread_last_page(pool: &SqlitePool, link: &str, page: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE threads SET last_page = ? WHERE link = ?")
        .bind(page)
        .bind(link)
        .execute(pool)
        .await
        .context("Failed to update thread cursor")?;

    Ok(result.rows_affected() > 0)
}

/// Count stored threads.
pub async fn count_threads(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM threads")
        .fetch_one(pool)
        .await
        .context("Failed to count threads")?;
    Ok(count)
}

// ========== Comments ==========

/// Get a comment by its `{domain}_{id}` key.
pub async fn get_comment_by_id(pool: &SqlitePool, comment_id: &str) -> Result<Option<Comment>> {
    sqlx::query_as("SELECT * FROM comments WHERE comment_id = ?")
        .bind(comment_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch comment by id")
}

/// Insert a comment unless one with the same key exists. Stored comments are
/// never overwritten.
pub async fn insert_comment(pool: &SqlitePool, comment: &NewComment) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r"
        INSERT INTO comments (comment_id, thread_url, author, message, created_at, created_at_recorded, url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(comment_id) DO NOTHING
        ",
    )
    .bind(&comment.comment_id)
    .bind(&comment.thread_url)
    .bind(&comment.author)
    .bind(&comment.message)
    .bind(comment.created_at.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .bind(&comment.url)
    .execute(pool)
    .await
    .context("Failed to insert comment")?;

    Ok(if result.rows_affected() == 1 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Duplicate
    })
}

/// Count stored comments.
pub async fn count_comments(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;
    Ok(count)
}
