// src/main.rs

use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use convoflow::alert::AlertDispatcher;
use convoflow::config::{Config, VectorBackend};
use convoflow::llm::{OpenAiChat, OpenAiEmbeddings};
use convoflow::memory::qdrant::QdrantVectorStore;
use convoflow::memory::sqlite::{SqliteVectorStore, migration};
use convoflow::memory::{MemoryEngine, VectorStore};
use convoflow::orchestrator::ConversationOrchestrator;
use convoflow::sentiment::HttpSentimentClassifier;

#[derive(Parser, Debug)]
#[command(name = "convoflow", about = "Conversational agent with vector memory")]
struct Args {
    /// Vector store backend (sqlite or qdrant)
    #[arg(long)]
    backend: Option<VectorBackend>,

    /// SQLite database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Alert webhook URL
    #[arg(long)]
    webhook_url: Option<String>,

    /// Number of prior turns recalled per request
    #[arg(long)]
    recall_k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(backend) = args.backend {
        config.vector_backend = backend;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(url) = args.webhook_url {
        config.webhook_url = url;
    }
    if let Some(k) = args.recall_k {
        config.recall_k = k;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level.parse().unwrap_or(tracing::Level::INFO))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting ConvoFlow");
    info!("Chat model: {}", config.chat_model);
    info!("Vector backend: {:?}", config.vector_backend);

    // Lifecycle is explicit: the store connection is opened here and released
    // on shutdown; every component is constructed once and injected.
    let mut sqlite_pool = None;
    let store: Arc<dyn VectorStore> = match config.vector_backend {
        VectorBackend::Sqlite => {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.sqlite_max_connections)
                .connect(&config.database_url)
                .await?;
            migration::run_migrations(&pool).await?;
            sqlite_pool = Some(pool.clone());
            Arc::new(SqliteVectorStore::new(pool))
        }
        VectorBackend::Qdrant => {
            let store = QdrantVectorStore::new(
                reqwest::Client::new(),
                config.qdrant_url.clone(),
                config.qdrant_collection.clone(),
                config.qdrant_embedding_dim,
            );
            store.ensure_collection().await?;
            Arc::new(store)
        }
    };

    let embedder = Arc::new(OpenAiEmbeddings::new(&config));
    let engine = Arc::new(
        MemoryEngine::new(store, embedder).with_degraded_recall(config.recall_degrade_to_empty),
    );

    let llm = Arc::new(OpenAiChat::new(&config)?);
    let classifier = Arc::new(HttpSentimentClassifier::new(
        reqwest::Client::new(),
        config.sentiment_url.clone(),
    ));
    let alerts = Arc::new(AlertDispatcher::new(
        config.webhook_url.clone(),
        config.alert_trigger_sentiments.clone(),
        config.alert_timeout_secs,
    )?);

    let orchestrator = ConversationOrchestrator::new(
        engine.clone(),
        llm,
        classifier,
        alerts,
        config.recall_k,
    );

    info!("Ready - type a message, or 'exit' to quit");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" {
            break;
        }

        match orchestrator.respond(message).await {
            Ok(outcome) => {
                let summary = format!(
                    "{}\n[sentiment: {} ({:.2}) | sources: {} | alert: {}]\n",
                    outcome.answer,
                    outcome.sentiment.label,
                    outcome.sentiment.score,
                    outcome.sources.len(),
                    if outcome.alert_fired { "fired" } else { "none" },
                );
                stdout.write_all(summary.as_bytes()).await?;
            }
            Err(e) => {
                stdout.write_all(format!("[error] {e}\n").as_bytes()).await?;
            }
        }
        stdout.flush().await?;
    }

    if let Some(pool) = sqlite_pool {
        pool.close().await;
    }
    info!("Shutting down");

    Ok(())
}
