// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: inbound event through dispatcher, queue and processor.

use std::time::Duration;

use linnet_agent::Dispatch;
use linnet_agent::health::Overall;
use linnet_agent::messages;
use linnet_core::{EventKind, HealthStatus, InboundEvent, MessageBody, MessageId, QuotedMedia};
use linnet_test_utils::{
    Delivery, MockMedia, MockReply, MockSearch, OTHER_USER, TEST_GROUP, TEST_USER, TestHarness,
    message_event, text_body,
};

#[tokio::test]
async fn ask_is_answered_through_the_reply_token() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["Rust is a systems language.".into()])
        .build();
    harness.start().unwrap();

    let outcome = harness.send_text("m1", "!hej what is rust?").await;
    assert!(matches!(outcome, Dispatch::Enqueued { position: 1, .. }));

    let stats = harness.wait_processed(1).await;
    assert_eq!(stats.total_processed, 1);

    let sent = harness.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].delivery, Delivery::Reply);
    assert_eq!(sent[0].target, "token-m1");
    assert_eq!(sent[0].text, "Rust is a systems language.");

    let requests = harness.backend.requests().await;
    assert_eq!(requests[0].prompt, "what is rust?");
    assert_eq!(
        requests[0].system_prompt.as_deref(),
        Some(harness.config.agent.system_prompt.as_str())
    );
    harness.stop().await;
}

#[tokio::test]
async fn delivered_reply_is_cached_and_remembered() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["first answer".into()])
        .build();
    harness.start().unwrap();

    harness.send_text("m1", "!hej tell me something").await;
    harness.wait_processed(1).await;

    let cached = harness
        .dispatcher
        .cache()
        .get(&MessageId::new("sent-1"))
        .expect("reply should be cached under its transport id");
    assert_eq!(cached.text_content(), Some("first answer"));

    let history = harness.dispatcher.context().render_recent(TEST_GROUP, 5);
    assert!(history.ends_with("Bot: first answer"), "history was: {history}");
    harness.stop().await;
}

#[tokio::test]
async fn history_is_passed_to_the_backend() {
    let harness = TestHarness::builder().build();
    harness.start().unwrap();

    harness.send_text("m1", "the meeting moved to friday").await;
    harness.send_text("m2", "!hej when is the meeting?").await;
    harness.wait_processed(1).await;

    let requests = harness.backend.requests().await;
    assert_eq!(
        requests[0].conversation_history.as_deref(),
        Some("User_U012: the meeting moved to friday")
    );
    harness.stop().await;
}

#[tokio::test]
async fn empty_ask_gets_usage_hint() {
    let harness = TestHarness::builder().build();

    let outcome = harness.send_text("m1", "!hej   ").await;

    assert_eq!(outcome, Dispatch::EmptyPrompt);
    assert_eq!(harness.channel.sent_texts().await, [messages::EMPTY_PROMPT]);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn bare_ask_on_quoted_text_uses_default_prompt() {
    let harness = TestHarness::builder().build();
    harness.start().unwrap();

    harness.send_text("m1", "hello").await;
    let outcome = harness.send_reply("m2", "!hej", "m1").await;
    assert!(matches!(outcome, Dispatch::Enqueued { .. }));
    harness.wait_processed(1).await;

    let requests = harness.backend.requests().await;
    assert_eq!(requests[0].prompt, harness.config.agent.default_prompt);
    assert_eq!(requests[0].context_text.as_deref(), Some("hello"));
    harness.stop().await;
}

#[tokio::test]
async fn bare_ask_on_unknown_quote_is_empty() {
    let harness = TestHarness::builder().build();

    let outcome = harness.send_reply("m2", "!hej", "m99").await;

    assert_eq!(outcome, Dispatch::EmptyPrompt);
}

#[tokio::test]
async fn quoted_image_is_loaded_for_the_backend() {
    let harness = TestHarness::builder()
        .with_media(MockMedia::returning("aW1hZ2U="))
        .build();
    harness.start().unwrap();

    harness
        .send_event(message_event("img1", TEST_USER, MessageBody::Image, None))
        .await;
    harness.send_reply("m2", "!hej what is in this picture?", "img1").await;
    harness.wait_processed(1).await;

    let media = harness.media.as_ref().unwrap();
    assert_eq!(
        media.loaded().await,
        [QuotedMedia::Message(MessageId::new("img1"))]
    );
    let requests = harness.backend.requests().await;
    assert_eq!(requests[0].image_base64.as_deref(), Some("aW1hZ2U="));
    assert!(requests[0].context_text.is_none());
    harness.stop().await;
}

#[tokio::test]
async fn failed_image_load_falls_back_to_text() {
    let harness = TestHarness::builder()
        .with_media(MockMedia::failing())
        .build();
    harness.start().unwrap();

    harness
        .send_event(message_event("img1", TEST_USER, MessageBody::Image, None))
        .await;
    harness.send_reply("m2", "!hej describe it", "img1").await;
    let stats = harness.wait_processed(1).await;

    assert_eq!(stats.total_errors, 0);
    assert!(harness.backend.requests().await[0].image_base64.is_none());
    harness.stop().await;
}

#[tokio::test]
async fn web_ask_carries_search_results() {
    let harness = TestHarness::builder()
        .with_search(MockSearch::returning("1. Rust 1.88 released"))
        .build();
    harness.start().unwrap();

    harness.send_text("m1", "!web latest rust release").await;
    harness.wait_processed(1).await;

    let search = harness.search.as_ref().unwrap();
    assert_eq!(
        search.queries().await,
        [("latest rust release".to_string(), 3)]
    );
    let requests = harness.backend.requests().await;
    assert_eq!(
        requests[0].search_results.as_deref(),
        Some("1. Rust 1.88 released")
    );
    harness.stop().await;
}

#[tokio::test]
async fn failed_search_degrades_to_plain_ask() {
    let harness = TestHarness::builder()
        .with_search(MockSearch::failing("quota exceeded"))
        .build();
    harness.start().unwrap();

    let outcome = harness.send_text("m1", "!web anything").await;
    assert!(matches!(outcome, Dispatch::Enqueued { .. }));
    harness.wait_processed(1).await;

    assert!(harness.backend.requests().await[0].search_results.is_none());
    harness.stop().await;
}

#[tokio::test]
async fn full_queue_answers_busy() {
    let harness = TestHarness::builder()
        .configure(|c| c.queue.max_size = 1)
        .build();

    assert!(matches!(
        harness.send_text("m1", "!hej one").await,
        Dispatch::Enqueued { position: 1, .. }
    ));
    assert_eq!(harness.send_text("m2", "!hej two").await, Dispatch::QueueFull);
    assert_eq!(harness.channel.sent_texts().await, [messages::QUEUE_BUSY]);
}

#[tokio::test]
async fn position_is_announced_when_enabled() {
    let harness = TestHarness::builder()
        .configure(|c| {
            c.agent.announce_position = true;
            c.queue.average_processing_secs = 15;
        })
        .build();

    harness.send_text("m1", "!hej one").await;
    harness.send_text("m2", "!hej two").await;

    assert_eq!(
        harness.channel.sent_texts().await,
        [messages::queued(1, 15), messages::queued(2, 30)]
    );
}

#[tokio::test]
async fn rate_limit_is_per_sender() {
    let harness = TestHarness::builder()
        .configure(|c| c.rate_limit.max_requests = 2)
        .build();

    harness.send_text("m1", "!hej one").await;
    harness.send_text("m2", "!hej two").await;
    let third = harness.send_text("m3", "!hej three").await;
    assert!(matches!(third, Dispatch::RateLimited { .. }));

    let other = harness
        .send_event(message_event("m4", OTHER_USER, text_body("!hej four"), None))
        .await;
    assert!(matches!(other, Dispatch::Enqueued { .. }));
}

#[tokio::test]
async fn failure_is_retried_once_then_reported() {
    let harness = TestHarness::builder().build();
    harness.backend.push_reply(MockReply::Fail("model crashed".into())).await;
    harness.backend.push_reply(MockReply::Fail("model crashed".into())).await;
    harness.start().unwrap();

    harness.send_text("m1", "!hej please answer").await;
    let stats = harness
        .wait_for(Duration::from_secs(5), |s| s.total_errors >= 2)
        .await
        .expect("both attempts should fail");

    assert_eq!(stats.total_retried, 1);
    assert_eq!(harness.backend.call_count().await, 2);
    assert_eq!(
        harness.channel.sent_texts().await,
        [messages::PROCESSING_ERROR]
    );
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failure_without_room_to_retry_is_reported() {
    let harness = TestHarness::builder()
        .configure(|c| c.queue.max_size = 1)
        .build();
    harness
        .backend
        .push_reply(MockReply::DelayedFail(Duration::from_secs(5), "model crashed".into()))
        .await;
    harness.start().unwrap();

    harness.send_text("m1", "!hej first").await;
    while harness.backend.call_count().await == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(matches!(
        harness.send_text("m2", "!hej second").await,
        Dispatch::Enqueued { position: 1, .. }
    ));

    let stats = harness
        .wait_for(Duration::from_secs(60), |s| s.total_processed >= 1)
        .await
        .expect("second request should be answered");
    assert_eq!(stats.total_retried, 0);
    assert_eq!(stats.total_abandoned, 1);

    let sent = harness.channel.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].target, "token-m1");
    assert_eq!(sent[0].text, messages::PROCESSING_ERROR);
    assert_eq!(sent[1].text, "mock response");
    harness.stop().await;
}

#[tokio::test]
async fn retry_success_does_not_report_failure() {
    let harness = TestHarness::builder().build();
    harness.backend.push_reply(MockReply::Fail("flaky".into())).await;
    harness.backend.push_reply(MockReply::Text("second try".into())).await;
    harness.start().unwrap();

    harness.send_text("m1", "!hej please answer").await;
    harness.wait_processed(1).await;

    assert_eq!(harness.channel.sent_texts().await, ["second try"]);
    harness.stop().await;
}

#[tokio::test]
async fn expired_reply_token_falls_back_to_push() {
    let harness = TestHarness::builder().build();
    harness.channel.fail_replies(true);
    harness.start().unwrap();

    harness.send_text("m1", "!hej hi").await;
    harness.wait_processed(1).await;

    let sent = harness.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].delivery, Delivery::Push);
    assert_eq!(sent[0].target, TEST_GROUP);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn timed_out_request_is_dropped_silently() {
    let harness = TestHarness::builder()
        .configure(|c| c.queue.timeout_secs = 30)
        .build();
    harness
        .backend
        .push_reply(MockReply::Delayed(Duration::from_secs(60), "too late".into()))
        .await;
    harness.start().unwrap();

    harness.send_text("m1", "!hej slow question").await;
    let stats = harness
        .wait_for(Duration::from_secs(120), |s| s.total_timeouts >= 1)
        .await
        .expect("request should time out");

    assert_eq!(stats.total_processed, 0);
    assert_eq!(harness.backend.call_count().await, 1);
    assert!(harness.channel.sent_texts().await.is_empty());
    harness.stop().await;
}

#[tokio::test]
async fn non_commands_and_other_events_are_only_recorded() {
    let harness = TestHarness::builder().build();

    assert_eq!(harness.send_text("m1", "just chatting").await, Dispatch::Ignored);
    assert_eq!(harness.send_text("m2", "!ping").await, Dispatch::Ignored);
    let follow = InboundEvent {
        kind: EventKind::Follow,
        reply_token: Some("t".into()),
        sender: Some(TEST_USER.into()),
        conversation: None,
        message: None,
    };
    assert_eq!(harness.send_event(follow).await, Dispatch::Ignored);

    assert_eq!(harness.dispatcher.cache().len(), 2);
    assert_eq!(harness.dispatcher.context().recent(TEST_GROUP, 10).len(), 2);
    assert!(harness.channel.sent_texts().await.is_empty());
}

#[tokio::test]
async fn health_report_reflects_queue_and_backend() {
    let harness = TestHarness::builder().build();

    let stopped = harness.health().await;
    assert_eq!(stopped.status, Overall::Degraded);

    harness.start().unwrap();
    let running = harness.health().await;
    assert_eq!(running.status, Overall::Healthy);

    harness
        .backend
        .set_health(HealthStatus::Unhealthy("connection refused".into()))
        .await;
    let report = harness.health().await;
    assert_eq!(report.status, Overall::Unhealthy);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["queue"]["state"], "running");
    assert_eq!(json["backend"]["detail"], "connection refused");
    harness.stop().await;
}
