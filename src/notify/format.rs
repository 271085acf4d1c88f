//! Plain-text notification messages.

use std::fmt::Write;

use crate::db::{NewComment, NewThread, Thread};

/// Longest body excerpt included in a message, in characters.
const EXCERPT_CHARS: usize = 600;

#[must_use]
pub fn format_thread_notice(thread: &NewThread, annotation: &str) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "[{}] New thread in {}", thread.domain, category_label(&thread.category));
    let _ = writeln!(msg, "{}", thread.title);
    let _ = writeln!(msg, "Author: {}", thread.creator);
    let _ = writeln!(msg, "Published: {}", thread.pub_date.format("%Y-%m-%d %H:%M UTC"));
    if !thread.description.is_empty() {
        let _ = write!(msg, "\n{}\n", excerpt(&thread.description));
    }
    push_annotation(&mut msg, annotation);
    let _ = write!(msg, "\n{}", thread.link);
    msg
}

#[must_use]
pub fn format_comment_notice(thread: &Thread, comment: &NewComment, annotation: &str) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "[{}] New comment in: {}", thread.domain, thread.title);
    let _ = writeln!(msg, "Author: {}", comment.author);
    let _ = writeln!(msg, "Published: {}", comment.created_at.format("%Y-%m-%d %H:%M UTC"));
    if !comment.message.is_empty() {
        let _ = write!(msg, "\n{}\n", excerpt(&comment.message));
    }
    push_annotation(&mut msg, annotation);
    let _ = write!(msg, "\n{}", comment.url);
    msg
}

fn category_label(category: &str) -> &str {
    if category.is_empty() {
        "discussions"
    } else {
        category
    }
}

fn push_annotation(msg: &mut String, annotation: &str) {
    let annotation = annotation.trim();
    if !annotation.is_empty() {
        let _ = write!(msg, "\nAI: {annotation}\n");
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}
