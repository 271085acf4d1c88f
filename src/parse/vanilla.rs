//! Parser for Vanilla Forums discussion pages (`LowEndTalk`, `LowEndSpirit`).

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, trace};

use super::{source_domain, PageParser, ParseError, ParsedComment};
use crate::db::{NewComment, NewThread, Thread};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid selector")
}

static DISCUSSION_HEADER: LazyLock<Selector> =
    LazyLock::new(|| selector("div.Item-Header.DiscussionHeader"));
static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("#Item_0.PageTitle"));
static TITLE_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static HEADER_AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector(".Author .Username"));
static HEADER_CATEGORY: LazyLock<Selector> = LazyLock::new(|| selector(".Category a"));
static TIME: LazyLock<Selector> = LazyLock::new(|| selector("time"));
static OPENING_MESSAGE: LazyLock<Selector> = LazyLock::new(|| selector(".Message.userContent"));

static COMMENT_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li.ItemComment"));
static COMMENT_AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector("a.Username"));
static COMMENT_ROLE: LazyLock<Selector> = LazyLock::new(|| selector("span.RoleTitle"));
static COMMENT_MESSAGE: LazyLock<Selector> = LazyLock::new(|| selector("div.Message"));

/// Parses the Vanilla 2.x "keystone" layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct VanillaParser;

impl VanillaParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PageParser for VanillaParser {
    fn parse_thread_page(&self, url: &str, html: &str) -> Result<NewThread, ParseError> {
        let document = Html::parse_document(html);

        let header = document
            .select(&DISCUSSION_HEADER)
            .next()
            .ok_or(ParseError::StructureMismatch("discussion header"))?;
        let page_title = document
            .select(&PAGE_TITLE)
            .next()
            .ok_or(ParseError::StructureMismatch("page title"))?;

        let title = first_text(page_title, &TITLE_HEADING).unwrap_or_default();
        let creator = first_text(header, &HEADER_AUTHOR).unwrap_or_default();
        let category = first_text(header, &HEADER_CATEGORY).unwrap_or_default();

        let pub_date = header
            .select(&TIME)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_datetime)
            .unwrap_or_else(|| {
                debug!(url = %url, "Discussion header has no usable timestamp, using now");
                Utc::now()
            });

        let description = document
            .select(&OPENING_MESSAGE)
            .next()
            .map(|message| {
                message
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Ok(NewThread {
            domain: source_domain(url),
            category,
            title,
            link: url.to_string(),
            description,
            creator,
            pub_date,
        })
    }

    fn parse_comment_page(&self, thread: &Thread, html: &str) -> Vec<ParsedComment> {
        let document = Html::parse_document(html);
        let origin = url::Url::parse(&thread.link)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| format!("https://{}.com", thread.domain));

        document
            .select(&COMMENT_ITEM)
            .filter_map(|item| {
                let local_id = item.value().id()?.split('_').nth(1)?.to_string();

                let Some(author) = first_text(item, &COMMENT_AUTHOR) else {
                    trace!(comment = %local_id, "Comment without author, skipping");
                    return None;
                };
                let Some(created_at) = item
                    .select(&TIME)
                    .next()
                    .and_then(|t| t.value().attr("datetime"))
                    .and_then(parse_datetime)
                else {
                    trace!(comment = %local_id, "Comment without timestamp, skipping");
                    return None;
                };

                let role = first_text(item, &COMMENT_ROLE);
                let message = item
                    .select(&COMMENT_MESSAGE)
                    .next()
                    .map(normalize_message)
                    .unwrap_or_default();

                Some(ParsedComment {
                    comment: NewComment {
                        comment_id: format!("{}_{local_id}", thread.domain),
                        thread_url: thread.link.clone(),
                        author,
                        message,
                        created_at,
                        url: format!("{origin}/discussion/comment/{local_id}/#Comment_{local_id}"),
                    },
                    role,
                })
            })
            .collect()
    }
}

/// Trimmed text of the first match below `scope`, if any.
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Flatten a comment body. Quoted posts become `[Quote]...[/Quote]` lines so
/// they stay distinguishable from what the author wrote.
fn normalize_message(message: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for child in message.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Node::Element(element) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let text = child_ref
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");

                if element.name() == "blockquote" && element.classes().any(|c| c == "UserQuote") {
                    parts.push(format!("[Quote]{text}[/Quote]"));
                } else if matches!(element.name(), "p" | "div") && !text.is_empty() {
                    parts.push(text);
                }
            }
            _ => {}
        }
    }

    parts.join("\n").trim().to_string()
}
