#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use gyanika_config::Config;
use gyanika_core::ConversationStore;
use gyanika_memory::{AppendOutcome, MemoryOptions, MemoryRegistry, PostgresStore};

#[derive(Parser)]
#[command(name = "gyanika")]
#[command(about = "Gyanika conversation memory tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one conversation turn for a user
    Log {
        /// User identifier
        #[arg(short, long)]
        user: String,

        /// User display name (defaults to the identifier)
        #[arg(short, long)]
        name: Option<String>,

        /// The user's utterance
        #[arg(long)]
        user_msg: String,

        /// The assistant's reply
        #[arg(long)]
        agent_msg: String,

        /// Session summary recorded on close
        #[arg(long)]
        summary: Option<String>,

        /// Session topic recorded on close
        #[arg(long)]
        topic: Option<String>,
    },
    /// Print the memory context that would be injected for a user
    Recall {
        /// User identifier
        #[arg(short, long)]
        user: String,

        /// User display name (defaults to the identifier)
        #[arg(short, long)]
        name: Option<String>,

        /// Current query (accepted for parity with the agent callback)
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show configuration and check store connectivity
    Info,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

fn memory_options(config: &Config) -> MemoryOptions {
    MemoryOptions {
        short_term_capacity: config.memory.short_term_capacity,
        context_turns: config.memory.context_turns,
        short_term_snippet_chars: config.memory.short_term_snippet_chars,
        recall_fetch_limit: config.memory.recall_fetch_limit,
        recall_keep: config.memory.recall_keep,
        recall_snippet_chars: config.memory.recall_snippet_chars,
        duplicate_window: chrono::Duration::seconds(config.memory.duplicate_window_secs),
        assistant_name: config.assistant.name.clone(),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ConversationStore>> {
    let store = PostgresStore::new(&config.database.url).await?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Log {
            user,
            name,
            user_msg,
            agent_msg,
            summary,
            topic,
        } => {
            let config = Config::load()?;
            let store = open_store(&config).await?;
            let registry = MemoryRegistry::new(Arc::clone(&store), memory_options(&config));

            let name = name.unwrap_or_else(|| user.clone());
            let handle = registry.get_or_open(&user, &name).await?;
            let mut memory = handle.lock().await;

            match memory.append_turn(&user_msg, &agent_msg).await? {
                AppendOutcome::Appended => info!("turn recorded for {user}"),
                AppendOutcome::EmptyIgnored => info!("empty turn ignored for {user}"),
                AppendOutcome::DuplicateSuppressed => info!("duplicate turn suppressed for {user}"),
            }

            memory.end_session(summary.as_deref(), topic.as_deref()).await?;

            let stored = store
                .list_session_messages(memory.session_ref(), 50)
                .await?;
            println!(
                "Saved {} message(s) for {user} (session {}).",
                stored.len(),
                memory.session_ref().0
            );
        }
        Commands::Recall { user, name, query } => {
            let config = Config::load()?;
            let store = open_store(&config).await?;
            let registry = MemoryRegistry::new(store, memory_options(&config));

            let name = name.unwrap_or_else(|| user.clone());
            let handle = registry.get_or_open(&user, &name).await?;
            let mut memory = handle.lock().await;

            let context = memory.build_context_prompt(query.as_deref()).await?;
            if context.is_empty() {
                println!("No memory available for {user}.");
            } else {
                println!("{context}");
            }

            memory.end_session(None, None).await?;
        }
        Commands::Info => {
            let config = Config::load()?;
            println!("Config: {}", Config::config_path()?.display());
            println!("Database: {}", config.database.url);
            println!(
                "Memory: capacity={} recall={}:{} window={}s",
                config.memory.short_term_capacity,
                config.memory.recall_fetch_limit,
                config.memory.recall_keep,
                config.memory.duplicate_window_secs
            );

            match PostgresStore::new(&config.database.url).await {
                Ok(_) => println!("Store: connected"),
                Err(e) => println!("Store: unavailable ({e})"),
            }
        }
        Commands::Init => {
            Config::create_config()?;
        }
        Commands::Version => {
            println!("gyanika {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
