//! End-to-end feed sweeps against a mock forum.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use forum_thread_monitor::classifier::DisabledClassifier;
use forum_thread_monitor::config::Config;
use forum_thread_monitor::db::{count_comments, count_threads, get_thread_by_link, Database};
use forum_thread_monitor::fetch::HttpFetcher;
use forum_thread_monitor::monitor::{Monitor, MonitorContext};
use forum_thread_monitor::notify::Notifier;
use forum_thread_monitor::parse::VanillaParser;
use forum_thread_monitor::settings::Settings;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/categories/offers/feed.rss";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn rss_item(base: &str, n: u32, published: chrono::DateTime<Utc>) -> String {
    format!(
        r#"<item>
          <title>Offer {n}</title>
          <link>{base}/discussion/{n}/offer</link>
          <guid isPermaLink="false">{n}@/discussions</guid>
          <pubDate>{published}</pubDate>
          <dc:creator>host{n}</dc:creator>
          <description><![CDATA[<p>Deal number {n}</p>]]></description>
        </item>"#,
        published = published.to_rfc2822(),
    )
}

fn rss(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Offers</title>
    <link>https://forum.example/categories/offers</link>
    <description>Offers category</description>
    {}
  </channel>
</rss>"#,
        items.concat()
    )
}

async fn setup(settings: Settings) -> (Monitor, Arc<RecordingNotifier>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::new(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to create database");
    let config = Config::for_testing();
    let notifier = Arc::new(RecordingNotifier::default());

    let ctx = MonitorContext::new(
        db,
        Arc::new(HttpFetcher::new(config.fetch_timeout).unwrap()),
        Arc::new(VanillaParser::new()),
        Arc::new(DisabledClassifier),
        notifier.clone(),
        settings,
    )
    .with_page_delay(config.page_delay);

    (Monitor::new(Arc::new(ctx)), notifier, temp_dir)
}

fn feed_settings(feed_url: String) -> Settings {
    Settings {
        urls: vec![feed_url],
        extra_urls: Vec::new(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_new_feed_thread_notified_exactly_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    let link = format!("{base}/discussion/5/offer");

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss(&[rss_item(&base, 5, Utc::now() - chrono::Duration::minutes(10))])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discussion/5/offer/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><ul class="MessageList Comments"></ul></body></html>"#),
        )
        .mount(&server)
        .await;
    // Everything else, including /p2, is a 404 from the mock server.

    let (monitor, notifier, _temp_dir) = setup(feed_settings(format!("{base}{FEED_PATH}"))).await;
    let shutdown = CancellationToken::new();

    let first = monitor.sweep_once(&shutdown).await;
    let second = monitor.sweep_once(&shutdown).await;

    assert_eq!(first.threads_new, 1);
    assert_eq!(second.threads_new, 0);

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("New thread in offers"));
    assert!(sent[0].contains("Offer 5"));
    assert!(sent[0].contains("Author: host5"));
    assert!(sent[0].contains("Deal number 5"));
    assert!(sent[0].ends_with(&link));

    let pool = monitor.context().db().pool();
    assert_eq!(count_threads(pool).await.unwrap(), 1);
    let thread = get_thread_by_link(pool, &link).await.unwrap().unwrap();
    assert_eq!(thread.category, "offers");
    assert_eq!(thread.last_page, 1);
}

#[tokio::test]
async fn test_feed_batch_is_limited() {
    let server = MockServer::start().await;
    let base = server.uri();
    let old = Utc::now() - chrono::Duration::days(5);
    let items: Vec<String> = (1..=8).map(|n| rss_item(&base, n, old)).collect();

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&items)))
        .mount(&server)
        .await;

    let (monitor, notifier, _temp_dir) = setup(feed_settings(format!("{base}{FEED_PATH}"))).await;
    let stats = monitor.sweep_once(&CancellationToken::new()).await;

    assert_eq!(stats.threads_new, 6);
    let pool = monitor.context().db().pool();
    assert_eq!(count_threads(pool).await.unwrap(), 6);
    assert!(get_thread_by_link(pool, &format!("{base}/discussion/7/offer"))
        .await
        .unwrap()
        .is_none());
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_broken_feed_does_not_block_other_feeds() {
    let server = MockServer::start().await;
    let base = server.uri();
    let old = Utc::now() - chrono::Duration::days(5);

    Mock::given(method("GET"))
        .and(path("/categories/broken/feed.rss"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories/garbage/feed.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[rss_item(&base, 9, old)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discussion/9/offer/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><ul>
              <li class="Item ItemComment" id="Comment_900">
                <a class="Username" href="/profile/alice">alice</a>
                <time datetime="{}">then</time>
                <div class="Message userContent"><p>in stock?</p></div>
              </li></ul></body></html>"#,
            old.to_rfc3339()
        )))
        .mount(&server)
        .await;

    let settings = Settings {
        urls: vec![
            format!("{base}/categories/broken/feed.rss"),
            format!("{base}/categories/garbage/feed.rss"),
            format!("{base}{FEED_PATH}"),
        ],
        ..Settings::default()
    };
    let (monitor, _notifier, _temp_dir) = setup(settings).await;
    let stats = monitor.sweep_once(&CancellationToken::new()).await;

    assert_eq!(stats.sources_failed, 2);
    assert_eq!(stats.threads_new, 1);
    assert_eq!(stats.comments_new, 1);
    assert_eq!(count_comments(monitor.context().db().pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_only_extra_skips_feeds() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let settings = Settings {
        only_extra: true,
        ..feed_settings(format!("{base}{FEED_PATH}"))
    };
    let (monitor, _notifier, _temp_dir) = setup(settings).await;

    tokio::time::timeout(
        Duration::from_secs(5),
        monitor.sweep_once(&CancellationToken::new()),
    )
    .await
    .expect("Sweep did not finish");
}
