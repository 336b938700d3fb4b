// tests/pipeline.rs
// Full request pipeline: recall → generate → classify → persist → alert.

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::http::StatusCode;

use common::{
    FailingChat, FailingClassifier, FailingEmbedder, StubChat, StubClassifier, StubEmbedder,
    spawn_webhook, sqlite_store, wait_for_count,
};
use convoflow::alert::AlertDispatcher;
use convoflow::error::ConvoError;
use convoflow::llm::ChatModel;
use convoflow::memory::types::SentimentLabel;
use convoflow::memory::{MemoryEngine, VectorStore};
use convoflow::orchestrator::ConversationOrchestrator;
use convoflow::sentiment::{Sentiment, SentimentClassifier};

const TRIGGERS: [SentimentLabel; 2] = [SentimentLabel::Negative, SentimentLabel::VeryNegative];

struct Fixture {
    engine: Arc<MemoryEngine>,
    orchestrator: ConversationOrchestrator,
}

async fn fixture(
    llm: Arc<dyn ChatModel>,
    classifier: Arc<dyn SentimentClassifier>,
    webhook_url: &str,
) -> Fixture {
    fixture_with_embedder(llm, classifier, webhook_url, StubEmbedder::new()).await
}

async fn fixture_with_embedder(
    llm: Arc<dyn ChatModel>,
    classifier: Arc<dyn SentimentClassifier>,
    webhook_url: &str,
    embedder: StubEmbedder,
) -> Fixture {
    let store: Arc<dyn VectorStore> = Arc::new(sqlite_store().await);
    let engine = Arc::new(MemoryEngine::new(store, Arc::new(embedder)));
    let alerts = Arc::new(AlertDispatcher::new(webhook_url, TRIGGERS, 2).unwrap());

    let orchestrator = ConversationOrchestrator::new(engine.clone(), llm, classifier, alerts, 3);
    Fixture {
        engine,
        orchestrator,
    }
}

fn neutral() -> Sentiment {
    Sentiment {
        label: SentimentLabel::Neutral,
        score: 0.5,
    }
}

// Webhook endpoint nobody listens on; dispatch must still be harmless.
const DEAD_WEBHOOK: &str = "http://127.0.0.1:1/webhook";

#[tokio::test]
async fn test_ask_on_empty_store_answers_without_sources() {
    let chat = Arc::new(StubChat::new("Hi! How can I help?"));
    let f = fixture(chat.clone(), Arc::new(StubClassifier::new(neutral())), DEAD_WEBHOOK).await;

    let outcome = f.orchestrator.ask("hello").await.unwrap();
    assert_eq!(outcome.answer, "Hi! How can I help?");
    assert!(outcome.sources.is_empty());

    // With no history the model sees the bare message.
    assert_eq!(chat.prompts.lock().unwrap().as_slice(), ["hello"]);

    // ask() never persists.
    assert!(f.engine.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_respond_persists_turn_with_sentiment_metadata() {
    let f = fixture(
        Arc::new(StubChat::new("Happy to help.")),
        Arc::new(StubClassifier::new(neutral())),
        DEAD_WEBHOOK,
    )
    .await;

    let outcome = f.orchestrator.respond("hello").await.unwrap();
    assert_eq!(outcome.answer, "Happy to help.");
    assert!(!outcome.alert_fired);

    let turns = f.engine.get_all().await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].id, outcome.turn_id);
    assert_eq!(turns[0].user_text, "hello");
    assert_eq!(turns[0].agent_text, "Happy to help.");
    assert_eq!(turns[0].sentiment, SentimentLabel::Neutral);
    assert!((turns[0].score - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn test_respond_feeds_recalled_context_to_model() {
    let chat = Arc::new(StubChat::new("ok"));
    let f = fixture(chat.clone(), Arc::new(StubClassifier::new(neutral())), DEAD_WEBHOOK).await;

    f.orchestrator.respond("my cat is named Miso").await.unwrap();
    f.orchestrator.respond("what is my cat called?").await.unwrap();

    let prompts = chat.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("my cat is named Miso"));
    assert!(prompts[1].ends_with("what is my cat called?"));
}

#[tokio::test]
async fn test_generation_failure_surfaces_and_persists_nothing() {
    let f = fixture(
        Arc::new(FailingChat),
        Arc::new(StubClassifier::new(neutral())),
        DEAD_WEBHOOK,
    )
    .await;

    let err = f.orchestrator.respond("hello").await.unwrap_err();
    assert!(matches!(err, ConvoError::Generation(_)));
    assert!(f.engine.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_classification_failure_surfaces_and_persists_nothing() {
    let f = fixture(
        Arc::new(StubChat::new("ok")),
        Arc::new(FailingClassifier),
        DEAD_WEBHOOK,
    )
    .await;

    let err = f.orchestrator.respond("hello").await.unwrap_err();
    assert!(matches!(err, ConvoError::Classification(_)));
    assert!(f.engine.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retrieval_failure_surfaces_before_generation() {
    let store: Arc<dyn VectorStore> = Arc::new(sqlite_store().await);
    let engine = Arc::new(MemoryEngine::new(store, Arc::new(FailingEmbedder)));
    let alerts = Arc::new(AlertDispatcher::new(DEAD_WEBHOOK, TRIGGERS, 2).unwrap());
    let chat = Arc::new(StubChat::new("ok"));
    let orchestrator = ConversationOrchestrator::new(
        engine,
        chat.clone(),
        Arc::new(StubClassifier::new(neutral())),
        alerts,
        3,
    );

    let err = orchestrator.respond("hello").await.unwrap_err();
    assert!(matches!(err, ConvoError::Retrieval(_)));
    assert!(chat.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_negative_sentiment_fires_webhook() {
    let counter = Arc::new(AtomicUsize::new(0));
    let last_body = Arc::new(Mutex::new(None));
    let url = spawn_webhook(
        counter.clone(),
        last_body.clone(),
        StatusCode::OK,
        Duration::ZERO,
    )
    .await;

    let f = fixture(
        Arc::new(StubChat::new("Sorry to hear that.")),
        Arc::new(StubClassifier::new(Sentiment {
            label: SentimentLabel::Negative,
            score: 0.1,
        })),
        &url,
    )
    .await;

    let outcome = f.orchestrator.respond("I hate this").await.unwrap();
    assert!(outcome.alert_fired);

    assert!(
        wait_for_count(&counter, 1, Duration::from_secs(2)).await,
        "webhook was never called"
    );

    let body = last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["user_text"], "I hate this");
    assert_eq!(body["ai_text"], "Sorry to hear that.");
    assert_eq!(body["metadata"]["sentiment"], "negative");
}

#[tokio::test]
async fn test_positive_sentiment_does_not_fire_webhook() {
    let counter = Arc::new(AtomicUsize::new(0));
    let url = spawn_webhook(
        counter.clone(),
        Arc::new(Mutex::new(None)),
        StatusCode::OK,
        Duration::ZERO,
    )
    .await;

    let f = fixture(
        Arc::new(StubChat::new("Great!")),
        Arc::new(StubClassifier::new(Sentiment {
            label: SentimentLabel::Positive,
            score: 0.9,
        })),
        &url,
    )
    .await;

    let outcome = f.orchestrator.respond("I love this").await.unwrap();
    assert!(!outcome.alert_fired);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_webhook_down_does_not_fail_pipeline() {
    let f = fixture(
        Arc::new(StubChat::new("Sorry.")),
        Arc::new(StubClassifier::new(Sentiment {
            label: SentimentLabel::Negative,
            score: 0.05,
        })),
        DEAD_WEBHOOK,
    )
    .await;

    let outcome = f.orchestrator.respond("I hate this").await.unwrap();
    assert!(outcome.alert_fired);
    assert_eq!(f.engine.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_webhook_does_not_delay_response() {
    let counter = Arc::new(AtomicUsize::new(0));
    let url = spawn_webhook(
        counter.clone(),
        Arc::new(Mutex::new(None)),
        StatusCode::OK,
        Duration::from_millis(800),
    )
    .await;

    let f = fixture(
        Arc::new(StubChat::new("Sorry.")),
        Arc::new(StubClassifier::new(Sentiment {
            label: SentimentLabel::VeryNegative,
            score: 0.02,
        })),
        &url,
    )
    .await;

    let start = Instant::now();
    let outcome = f.orchestrator.respond("this is awful").await.unwrap();
    assert!(outcome.alert_fired);
    assert!(
        start.elapsed() < Duration::from_millis(400),
        "response waited on the webhook"
    );

    // Delivery still completes on its own.
    assert!(wait_for_count(&counter, 1, Duration::from_secs(3)).await);
}
