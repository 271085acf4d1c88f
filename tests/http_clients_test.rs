//! Tests for the HTTP-backed fetch, classify and notify implementations.

use std::time::Duration;

use forum_thread_monitor::classifier::{Classifier, ClassifierError, OpenAiClassifier};
use forum_thread_monitor::constants::BROWSER_USER_AGENT;
use forum_thread_monitor::fetch::{Fetcher, HttpFetcher};
use forum_thread_monitor::notify::{Notifier, TelegramNotifier};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ========== Fetcher ==========

#[tokio::test]
async fn test_fetcher_sends_browser_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discussion/5/offer"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let response = fetcher
        .fetch(&format!("{}/discussion/5/offer", server.uri()))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.body, "<html>ok</html>");

    // The UA contains commas, which the header matcher would split on.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let user_agent = requests[0]
        .headers
        .get("user-agent")
        .expect("No user agent sent")
        .to_str()
        .unwrap();
    assert_eq!(user_agent, BROWSER_USER_AGENT);
}

#[tokio::test]
async fn test_fetcher_reports_status_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discussion/5/offer/p9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let response = fetcher
        .fetch(&format!("{}/discussion/5/offer/p9", server.uri()))
        .await
        .unwrap();

    assert!(response.is_not_found());
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_fetcher_errors_without_response() {
    let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
    assert!(fetcher.fetch("http://127.0.0.1:1/feed.rss").await.is_err());
}

#[tokio::test]
async fn test_fetcher_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
    assert!(fetcher.fetch(&server.uri()).await.is_err());
}

// ========== Classifier ==========

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_classifier_posts_prompt_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": "Is this a deal?"},
                {"role": "user", "content": "Cheap NVMe VPS"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("True, 2 GB for $10 per year END debug tail")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let classifier = OpenAiClassifier::new(
        &format!("{}/v1", server.uri()),
        Some("sk-test".to_string()),
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap();

    let answer = classifier
        .classify("Cheap NVMe VPS", "Is this a deal?")
        .await
        .unwrap();
    assert_eq!(answer, "True, 2 GB for $10 per year ");
}

#[tokio::test]
async fn test_classifier_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let classifier = OpenAiClassifier::new(
        &format!("{}/v1", server.uri()),
        None,
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap();

    let err = classifier.classify("text", "prompt").await.unwrap_err();
    assert!(matches!(err, ClassifierError::Status { status: 429, .. }));
}

#[tokio::test]
async fn test_classifier_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let classifier = OpenAiClassifier::new(
        &format!("{}/v1", server.uri()),
        None,
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap();

    let err = classifier.classify("text", "prompt").await.unwrap_err();
    assert!(matches!(err, ClassifierError::Malformed(_)));
}

#[tokio::test]
async fn test_classifier_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("True END"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let classifier = OpenAiClassifier::new(
        &format!("{}/v1", server.uri()),
        None,
        "test-model",
        Duration::from_millis(200),
    )
    .unwrap();

    let err = classifier.classify("text", "prompt").await.unwrap_err();
    assert!(matches!(err, ClassifierError::Transport(ref e) if e.is_timeout()));
}

// ========== Telegram ==========

#[tokio::test]
async fn test_telegram_send_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "42",
            "text": "[lowendtalk] New thread in offers",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::new(&server.uri(), "test-token", "42").unwrap();
    notifier
        .send("[lowendtalk] New thread in offers")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_telegram_rejection_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"ok": false, "description": "chat not found"})),
        )
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::new(&server.uri(), "test-token", "42").unwrap();
    let err = notifier.send("hello").await.unwrap_err();
    assert!(err.to_string().contains("400"));
}
