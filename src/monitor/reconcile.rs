//! Dedup-then-insert against the store's unique keys.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::{
    get_comment_by_id, get_thread_by_link, insert_comment, insert_thread, InsertOutcome,
    NewComment, NewThread,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    New,
    AlreadyExists,
}

impl Reconciled {
    #[must_use]
    pub fn is_new(self) -> bool {
        self == Self::New
    }
}

impl From<InsertOutcome> for Reconciled {
    fn from(outcome: InsertOutcome) -> Self {
        match outcome {
            InsertOutcome::Inserted => Self::New,
            InsertOutcome::Duplicate => Self::AlreadyExists,
        }
    }
}

/// Store a thread candidate unless its link is already known.
///
/// # Errors
///
/// Returns an error if the store cannot be queried or written.
pub async fn reconcile_thread(pool: &SqlitePool, candidate: &NewThread) -> Result<Reconciled> {
    if get_thread_by_link(pool, &candidate.link).await?.is_some() {
        return Ok(Reconciled::AlreadyExists);
    }

    let outcome = insert_thread(pool, candidate).await?;
    if outcome == InsertOutcome::Duplicate {
        debug!(link = %candidate.link, "Thread inserted concurrently by another writer");
    }
    Ok(outcome.into())
}

/// Store a comment candidate unless its id is already known. Existing
/// comments are left untouched.
///
/// # Errors
///
/// Returns an error if the store cannot be queried or written.
pub async fn reconcile_comment(pool: &SqlitePool, candidate: &NewComment) -> Result<Reconciled> {
    if get_comment_by_id(pool, &candidate.comment_id).await?.is_some() {
        return Ok(Reconciled::AlreadyExists);
    }

    let outcome = insert_comment(pool, candidate).await?;
    if outcome == InsertOutcome::Duplicate {
        debug!(comment_id = %candidate.comment_id, "Comment inserted concurrently by another writer");
    }
    Ok(outcome.into())
}
