//! The two filter tiers between a reconciled item and a notification.
//!
//! Tier 1 ([`passes_structural`]) runs on parsed comments before they are
//! stored. Tier 2 ([`FilterChain`]) runs only on newly stored items that are
//! still fresh: keyword rule first, then the AI classifier. The verdict itself
//! is computed by [`decide`], which does no I/O.

mod keywords;

pub use keywords::KeywordRule;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::constants::FRESHNESS_WINDOW;
use crate::parse::ParsedComment;
use crate::settings::{CommentFilter, Settings};

/// Tier 1. Returns `true` if the comment should be stored at all.
#[must_use]
pub fn passes_structural(mode: CommentFilter, parsed: &ParsedComment, thread_creator: &str) -> bool {
    match mode {
        CommentFilter::None => true,
        CommentFilter::ByRole => parsed
            .role
            .as_deref()
            .map(str::trim)
            .is_some_and(|role| !role.is_empty() && !role.eq_ignore_ascii_case("member")),
        CommentFilter::ByAuthor => parsed.comment.author == thread_creator,
    }
}

/// Whether an item published at `published` is still eligible for notification.
#[must_use]
pub fn is_fresh(published: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(published)
        .to_std()
        .map_or(true, |age| age <= FRESHNESS_WINDOW)
}

/// What kind of item is being filtered; selects the AI prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Thread,
    Comment,
}

/// Result of the AI stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome {
    /// AI filter disabled, or not reached.
    NotRun,
    Answer(String),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Stale,
    Keywords,
    AiRejected,
    AiFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Send a notification; `annotation` is the classifier's answer, or empty.
    Notify { annotation: String },
    Skip(SkipReason),
}

/// Combine the stage results into a verdict.
///
/// `keywords` is `None` when the keyword filter is disabled.
#[must_use]
pub fn decide(fresh: bool, keywords: Option<bool>, ai: AiOutcome) -> Verdict {
    if !fresh {
        return Verdict::Skip(SkipReason::Stale);
    }
    if keywords == Some(false) {
        return Verdict::Skip(SkipReason::Keywords);
    }
    match ai {
        AiOutcome::NotRun => Verdict::Notify {
            annotation: String::new(),
        },
        AiOutcome::Failed => Verdict::Skip(SkipReason::AiFailed),
        AiOutcome::Answer(answer) if answer.to_lowercase().contains("false") => {
            Verdict::Skip(SkipReason::AiRejected)
        }
        AiOutcome::Answer(answer) => Verdict::Notify { annotation: answer },
    }
}

/// Tier-2 filters bound to one sweep's settings.
pub struct FilterChain<'a> {
    settings: &'a Settings,
    keywords: KeywordRule,
    classifier: &'a dyn Classifier,
}

impl<'a> FilterChain<'a> {
    #[must_use]
    pub fn new(settings: &'a Settings, classifier: &'a dyn Classifier) -> Self {
        Self {
            settings,
            keywords: KeywordRule::parse(&settings.keywords_rule),
            classifier,
        }
    }

    /// Run freshness, keyword and AI stages in order, stopping at the first
    /// rejection so the classifier is only called when it can matter.
    pub async fn evaluate(
        &self,
        kind: ItemKind,
        text: &str,
        published: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Verdict {
        let fresh = is_fresh(published, now);
        if !fresh {
            return decide(false, None, AiOutcome::NotRun);
        }

        let keywords = self
            .settings
            .use_keywords_filter
            .then(|| self.keywords.matches(text));
        if keywords == Some(false) {
            return decide(true, keywords, AiOutcome::NotRun);
        }

        let ai = self.run_ai(kind, text).await;
        decide(true, keywords, ai)
    }

    async fn run_ai(&self, kind: ItemKind, text: &str) -> AiOutcome {
        if !self.settings.use_ai_filter {
            return AiOutcome::NotRun;
        }

        let prompt = match kind {
            ItemKind::Thread => self.settings.thread_prompt.as_deref(),
            ItemKind::Comment => self.settings.comment_prompt.as_deref(),
        };
        let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) else {
            warn!(?kind, "AI filter enabled but no prompt configured, skipping AI stage");
            return AiOutcome::NotRun;
        };

        match self.classifier.classify(text, prompt).await {
            Ok(answer) => {
                debug!(?kind, answer = %answer, "Classifier answered");
                AiOutcome::Answer(answer)
            }
            Err(e) => {
                warn!(?kind, error = %e, "Classifier failed, filtering item out");
                AiOutcome::Failed
            }
        }
    }
}
