mod config;
mod repl;

use askai_engine::{ConversationEngine, InitOptions, SendOutcome};
use askai_llm::{ClaudeCliProvider, CliConfig, CodexCliProvider, OpenAIProvider, ProviderDispatcher};
use askai_persist::{JsonFileStore, KeyValueStore, ProfileCatalog, PromptCatalog, StorageKeys};
use askai_types::{EngineEvent, MessageRole};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::repl::{
    format_notice, format_profile_line, format_thread_line, resolve_thread, Command,
    StreamPrinter, HELP,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.storage_dir()));
    let keys = StorageKeys::new(config.storage.namespace.clone());

    let catalog = Arc::new(PromptCatalog::new(Arc::clone(&store)).with_keys(keys.clone()));
    catalog.ensure_default().await?;

    let engine = ConversationEngine::builder()
        .store(store)
        .keys(keys)
        .catalog(catalog.clone())
        .dispatcher(build_dispatcher(&config)?)
        .config((&config.engine).into())
        .build()?;

    let start_new = std::env::args().any(|arg| arg == "--new");
    let options = if start_new {
        InitOptions::start_new(None)
    } else {
        InitOptions::resume()
    };

    let render = tokio::spawn(render_events(engine.subscribe()));
    engine.initialize(options).await;

    println!("Ask AI. Type /help for commands.");
    print_history(&engine).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            command => run_command(&engine, catalog.as_ref(), command).await?,
        }
        prompt();
    }

    render.abort();
    Ok(())
}

fn build_dispatcher(config: &Config) -> anyhow::Result<ProviderDispatcher> {
    let shell_env = Arc::new(config.shell.shell_env());

    let mut dispatcher = ProviderDispatcher::new()
        .with_provider(Arc::new(CodexCliProvider::new(
            config.codex.apply(CliConfig::codex()),
            Arc::clone(&shell_env),
        )))
        .with_provider(Arc::new(ClaudeCliProvider::new(
            config.claude.apply(CliConfig::claude()),
            shell_env,
        )));

    match config.openai() {
        Some(openai) => dispatcher.register(Arc::new(OpenAIProvider::new(openai)?)),
        None => tracing::warn!("OPENAI_API_KEY not set; openai-api provider disabled"),
    }

    Ok(dispatcher)
}

async fn run_command(
    engine: &ConversationEngine,
    catalog: &PromptCatalog,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Send(text) => match send_and_stream(engine, &text).await {
            SendOutcome::Completed { .. } | SendOutcome::Failed(_) => println!(),
            SendOutcome::TooLong => {}
            SendOutcome::Dropped => println!("(busy, message ignored)"),
        },
        Command::New(profile_name) => {
            let profile_id = match profile_name {
                Some(name) => match catalog.find_by_name(&name).await? {
                    Some(profile) => Some(profile.id),
                    None => {
                        println!("No profile named {}", name);
                        return Ok(());
                    }
                },
                None => None,
            };
            if engine.create_thread(profile_id.as_deref()).await.is_some() {
                println!("Started a new conversation");
            }
        }
        Command::Threads => {
            let threads = engine.threads().await;
            let current = engine.current_thread_id().await;
            for (i, thread) in threads.iter().enumerate() {
                let is_current = current.as_deref() == Some(thread.id.as_str());
                println!("{}", format_thread_line(i + 1, thread, is_current));
            }
        }
        Command::Select(target) => {
            let threads = engine.threads().await;
            match resolve_thread(&threads, &target) {
                Some(thread) => {
                    engine.select_thread(&thread.id).await?;
                    engine.load_thread_messages(&thread.id).await?;
                    print_history(engine).await;
                }
                None => println!("No thread {}", target),
            }
        }
        Command::Delete(targets) => {
            let threads = engine.threads().await;
            let ids: Vec<String> = targets
                .iter()
                .filter_map(|t| resolve_thread(&threads, t))
                .map(|t| t.id.clone())
                .collect();
            if ids.is_empty() {
                println!("No matching threads");
            } else if engine.delete_threads(&ids).await {
                println!("Deleted {} thread(s)", ids.len());
            }
        }
        Command::Clear => {
            if engine.clear_messages().await {
                println!("Conversation cleared");
            }
        }
        Command::Profiles => {
            for profile in catalog.list().await? {
                println!("{}", format_profile_line(&profile));
            }
        }
        Command::Bind(name) => {
            let Some(thread_id) = engine.current_thread_id().await else {
                return Ok(());
            };
            let profile_id = match name {
                Some(name) => match catalog.find_by_name(&name).await? {
                    Some(profile) => Some(profile.id),
                    None => {
                        println!("No profile named {}", name);
                        return Ok(());
                    }
                },
                None => None,
            };
            engine
                .update_thread_custom_command(&thread_id, profile_id.as_deref())
                .await?;
        }
        Command::Help => println!("{}", HELP),
        Command::Unknown(line) => println!("Unknown command: {} (try /help)", line),
        Command::Empty | Command::Quit => {}
    }
    Ok(())
}

async fn print_history(engine: &ConversationEngine) {
    if let Some(thread) = engine.current_thread().await {
        println!("== {} ==", thread.title);
    }
    for message in engine.messages().await {
        let label = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "ai",
            MessageRole::System => continue,
        };
        let suffix = if message.is_interrupted() { " [interrupted]" } else { "" };
        println!("{}> {}{}", label, message.content, suffix);
    }
}

/// Print notices and status changes
async fn render_events(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(EngineEvent::Notice(notice)) => eprintln!("{}", format_notice(&notice)),
            Ok(EngineEvent::StatusChanged { status: Some(status) }) => eprintln!("{}", status),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "renderer lagged behind engine events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send `text` and print the reply as it grows
async fn send_and_stream(engine: &ConversationEngine, text: &str) -> SendOutcome {
    let mut events = engine.subscribe();
    let Some(thread_id) = engine.current_thread_id().await else {
        return SendOutcome::Dropped;
    };
    let known: HashSet<String> = engine.messages().await.into_iter().map(|m| m.id).collect();
    let mut printer = StreamPrinter::default();

    let send = engine.send_message(text);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            Ok(EngineEvent::MessagesChanged { thread_id: changed }) = events.recv() => {
                if changed == thread_id {
                    print_reply(engine, &thread_id, &known, &mut printer).await;
                }
            }
        }
    };

    print_reply(engine, &thread_id, &known, &mut printer).await;
    outcome
}

async fn print_reply(
    engine: &ConversationEngine,
    thread_id: &str,
    known: &HashSet<String>,
    printer: &mut StreamPrinter,
) {
    let Some(messages) = engine.cached_messages(thread_id).await else {
        return;
    };
    let Some(reply) = messages
        .last()
        .filter(|m| m.role == MessageRole::Assistant && !known.contains(&m.id))
    else {
        return;
    };
    if let Some(chunk) = printer.next_chunk(&reply.id, &reply.content) {
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout belongs to the conversation
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
