use askai_context::DefaultContextStrategy;
use askai_engine::{ConversationEngine, EngineError, InitOptions, SendOutcome};
use askai_llm::{
    CompletionOptions, CompletionProvider, CompletionResult, ProviderDispatcher, ProviderError,
};
use askai_persist::{
    ConversationStore, KeyValueStore, MemoryStore, PersistError, PromptCatalog,
};
use askai_types::{
    EngineEvent, ErrorKind, Message, MessageRole, Notice, NoticeLevel, Profile, ProviderId,
    DEFAULT_THREAD_TITLE,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Scripted provider
// ============================================================================

enum Step {
    /// Append text and report the running total
    Delta(&'static str),
    Sleep(Duration),
    Wait(Arc<Notify>),
    Fail(ProviderError),
}

#[derive(Clone)]
struct RecordedCall {
    messages: Vec<Message>,
    options: CompletionOptions,
}

#[derive(Default)]
struct ScriptedProvider {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push_script(&self, steps: Vec<Step>) {
        self.scripts.lock().unwrap().push_back(steps);
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call(&self, index: usize) -> RecordedCall {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAiApi
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> askai_llm::Result<CompletionResult> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            options: options.clone(),
        });
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Step::Delta("ok")]);

        let mut text = String::new();
        for step in steps {
            match step {
                Step::Delta(chunk) => {
                    text.push_str(chunk);
                    if let Some(sink) = &options.on_delta {
                        sink.emit(&text);
                    }
                }
                Step::Sleep(duration) => tokio::time::sleep(duration).await,
                Step::Wait(notify) => notify.notified().await,
                Step::Fail(error) => return Err(error),
            }
        }

        Ok(CompletionResult {
            content: text,
            model: "scripted-model".to_string(),
            used_web_search: Some(false),
        })
    }
}

/// Reads find nothing, writes always fail
struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> askai_persist::Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> askai_persist::Result<()> {
        Err(PersistError::Unavailable("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> askai_persist::Result<()> {
        Err(PersistError::Unavailable("disk full".to_string()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn engine_with(store: Arc<dyn KeyValueStore>, provider: Arc<ScriptedProvider>) -> ConversationEngine {
    ConversationEngine::builder()
        .store(store)
        .dispatcher(ProviderDispatcher::new().with_provider(provider))
        .build()
        .unwrap()
}

async fn ready_engine(
    store: Arc<MemoryStore>,
    provider: Arc<ScriptedProvider>,
) -> ConversationEngine {
    let engine = engine_with(store, provider);
    engine.initialize(InitOptions::resume()).await;
    engine
}

async fn stored_messages(store: &Arc<MemoryStore>, thread_id: &str) -> Vec<Message> {
    ConversationStore::new(store.clone())
        .load_messages(thread_id)
        .await
        .unwrap()
}

async fn wait_for_calls(provider: &ScriptedProvider, count: usize) {
    for _ in 0..1000 {
        if provider.call_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("provider was not called {} times", count);
}

fn drain_notices(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Notice(notice) = event {
            notices.push(notice);
        }
    }
    notices
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_two_sends_produce_titled_ordered_thread() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    provider.push_script(vec![Step::Delta("Hello"), Step::Delta("!")]);
    provider.push_script(vec![Step::Delta("Fine, thanks")]);
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    assert!(matches!(engine.send_message("hi").await, SendOutcome::Completed { .. }));
    assert!(matches!(
        engine.send_message("how are you").await,
        SendOutcome::Completed { .. }
    ));

    let thread = engine.current_thread().await.unwrap();
    assert_eq!(thread.title, "hi");

    let messages = stored_messages(&store, &thread_id).await;
    let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant
        ]
    );
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "Hello!");
    assert_eq!(messages[3].content, "Fine, thanks");
    assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert!(messages.iter().all(|m| !m.is_interrupted()));
    assert_eq!(messages[1].model.as_deref(), Some("scripted-model"));
    assert_eq!(messages[1].used_web_search, None);

    assert_eq!(engine.messages().await, messages);
    assert_eq!(engine.status().await, None);
    assert!(!engine.is_sending());
}

#[tokio::test]
async fn test_long_first_message_title_is_truncated() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store, ScriptedProvider::new()).await;

    engine
        .send_message("  this first message is definitely longer than thirty characters  ")
        .await;

    let thread = engine.current_thread().await.unwrap();
    assert_eq!(thread.title, "this first message is definite...");
}

#[tokio::test]
async fn test_blank_message_is_dropped() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let engine = ready_engine(store, provider.clone()).await;

    assert_eq!(engine.send_message("   \n").await, SendOutcome::Dropped);
    assert_eq!(provider.call_count(), 0);
    assert!(engine.messages().await.is_empty());
}

#[tokio::test]
async fn test_send_before_initialize_is_dropped() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let engine = engine_with(store, provider.clone());

    assert_eq!(engine.send_message("hello").await, SendOutcome::Dropped);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_second_send_while_in_flight_has_no_effect() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let release = Arc::new(Notify::new());
    provider.push_script(vec![Step::Wait(release.clone()), Step::Delta("done")]);
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.send_message("first").await }
    });
    wait_for_calls(&provider, 1).await;
    assert!(engine.is_sending());
    assert_eq!(engine.loading_thread_id().await.as_deref(), Some(thread_id.as_str()));

    assert_eq!(engine.send_message("second").await, SendOutcome::Dropped);

    release.notify_one();
    assert!(matches!(first.await.unwrap(), SendOutcome::Completed { .. }));

    assert_eq!(provider.call_count(), 1);
    let messages = stored_messages(&store, &thread_id).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(engine.loading_thread_id().await, None);
}

#[tokio::test]
async fn test_user_message_and_checkpoint_stored_before_dispatch() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let release = Arc::new(Notify::new());
    provider.push_script(vec![Step::Wait(release.clone()), Step::Delta("answer")]);
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    let send = tokio::spawn({
        let engine = engine.clone();
        async move { engine.send_message("hello").await }
    });
    wait_for_calls(&provider, 1).await;

    let stored = stored_messages(&store, &thread_id).await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, MessageRole::User);
    assert_eq!(stored[0].content, "hello");
    assert_eq!(stored[1].role, MessageRole::Assistant);
    assert_eq!(stored[1].content, "");
    assert_eq!(stored[1].interrupted, Some(true));

    // The in-memory copy is not flagged
    let cached = engine.messages().await;
    assert_eq!(cached[1].interrupted, None);
    assert_eq!(engine.status().await.as_deref(), Some("Thinking..."));

    release.notify_one();
    send.await.unwrap();

    let stored = stored_messages(&store, &thread_id).await;
    assert_eq!(stored[1].content, "answer");
    assert_eq!(stored[1].interrupted, None);
}

#[tokio::test(start_paused = true)]
async fn test_partial_reply_survives_restart() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let never = Arc::new(Notify::new());
    provider.push_script(vec![
        Step::Delta("Hel"),
        Step::Sleep(Duration::from_secs(4)),
        Step::Delta("lo wor"),
        Step::Wait(never.clone()),
    ]);
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    let send = tokio::spawn({
        let engine = engine.clone();
        async move { engine.send_message("greet me").await }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    let early = stored_messages(&store, &thread_id).await;
    assert_eq!(early[1].content, "");
    assert_eq!(engine.messages().await[1].content, "Hel");

    tokio::time::sleep(Duration::from_secs(10)).await;
    send.abort();

    let restarted = engine_with(store.clone(), ScriptedProvider::new());
    restarted.initialize(InitOptions::resume()).await;

    assert_eq!(restarted.current_thread_id().await.as_deref(), Some(thread_id.as_str()));
    let messages = restarted.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "greet me");
    assert_eq!(messages[1].content, "Hello wor");
    assert_eq!(messages[1].interrupted, Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_streaming_repaints_are_coalesced() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let mut steps = Vec::new();
    for _ in 0..20 {
        steps.push(Step::Delta("x"));
        steps.push(Step::Sleep(Duration::from_millis(10)));
    }
    provider.push_script(steps);
    let engine = ready_engine(store, provider).await;
    let thread_id = engine.current_thread_id().await.unwrap();
    let mut events = engine.subscribe();

    let outcome = engine.send_message("stream please").await;
    assert!(matches!(outcome, SendOutcome::Completed { .. }));

    let mut repaints = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(&event, EngineEvent::MessagesChanged { thread_id: id } if *id == thread_id) {
            repaints += 1;
        }
    }
    // 20 deltas over ~200ms fit in a handful of 150ms windows
    assert!(repaints >= 2, "got {} repaints", repaints);
    assert!(repaints <= 8, "got {} repaints", repaints);
    assert_eq!(engine.messages().await[1].content, "x".repeat(20));
}

#[tokio::test]
async fn test_reply_lands_on_originating_thread_after_switch() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let release = Arc::new(Notify::new());
    provider.push_script(vec![Step::Wait(release.clone()), Step::Delta("answer")]);
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let a = engine.current_thread_id().await.unwrap();
    let b = engine.create_thread(None).await.unwrap();
    engine.select_thread(&a).await.unwrap();

    let send = tokio::spawn({
        let engine = engine.clone();
        async move { engine.send_message("question for a").await }
    });
    wait_for_calls(&provider, 1).await;

    engine.select_thread(&b).await.unwrap();
    release.notify_one();
    assert!(matches!(send.await.unwrap(), SendOutcome::Completed { .. }));

    assert_eq!(engine.current_thread_id().await, Some(b.clone()));
    assert!(engine.messages().await.is_empty());

    let on_a = engine.cached_messages(&a).await.unwrap();
    assert_eq!(on_a.len(), 2);
    assert_eq!(on_a[1].content, "answer");
    assert_eq!(stored_messages(&store, &a).await, on_a);
    assert!(stored_messages(&store, &b).await.is_empty());
}

#[tokio::test]
async fn test_send_refused_when_history_cannot_be_loaded() {
    let store = Arc::new(MemoryStore::new());
    let first = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let thread_id = first.current_thread_id().await.unwrap();
    let messages_key = format!("ask-ai:messages:{}", thread_id);
    store.set(&messages_key, "[{broken".to_string()).await.unwrap();

    let provider = ScriptedProvider::new();
    let engine = ready_engine(store.clone(), provider.clone()).await;
    assert_eq!(engine.current_thread_id().await, Some(thread_id.clone()));
    assert_eq!(engine.cached_messages(&thread_id).await, None);
    let mut events = engine.subscribe();

    assert_eq!(engine.send_message("hello").await, SendOutcome::Dropped);

    assert_eq!(provider.call_count(), 0);
    assert_eq!(store.get(&messages_key).await.unwrap().as_deref(), Some("[{broken"));
    assert_eq!(engine.cached_messages(&thread_id).await, None);
    let notices = drain_notices(&mut events);
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Failure && n.title == "Failed to load conversation"));
    assert!(!engine.is_sending());
    assert_eq!(engine.status().await, None);
}

#[tokio::test]
async fn test_message_over_budget_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let engine = ConversationEngine::builder()
        .store(store.clone())
        .dispatcher(ProviderDispatcher::new().with_provider(provider.clone()))
        .context_strategy(Arc::new(DefaultContextStrategy::new().with_context_limit(10)))
        .build()
        .unwrap();
    engine.initialize(InitOptions::resume()).await;
    let thread_id = engine.current_thread_id().await.unwrap();
    let mut events = engine.subscribe();

    let outcome = engine.send_message(&"x".repeat(200)).await;

    assert_eq!(outcome, SendOutcome::TooLong);
    assert_eq!(provider.call_count(), 0);
    let stored = stored_messages(&store, &thread_id).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, MessageRole::User);

    let notices = drain_notices(&mut events);
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Failure && n.title == "Message is too long"));
    assert!(!engine.is_sending());
    assert_eq!(engine.status().await, None);
}

#[tokio::test]
async fn test_provider_failure_keeps_partial_as_interrupted() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    provider.push_script(vec![
        Step::Delta("par"),
        Step::Fail(ProviderError::Http {
            status: 401,
            body: "invalid key".to_string(),
        }),
    ]);
    let engine = ready_engine(store.clone(), provider).await;
    let thread_id = engine.current_thread_id().await.unwrap();
    let mut events = engine.subscribe();

    let outcome = engine.send_message("hello").await;

    let SendOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(error.kind, ErrorKind::Auth);

    let cached = engine.messages().await;
    assert_eq!(cached[1].content, "par");
    assert_eq!(cached[1].interrupted, Some(true));

    let stored = stored_messages(&store, &thread_id).await;
    assert_eq!(stored[1].content, "par");
    assert_eq!(stored[1].interrupted, Some(true));

    let notices = drain_notices(&mut events);
    assert!(notices.iter().any(|n| n.title == "Failed to send"
        && n.message.as_deref() == Some(error.message.as_str())));
    assert!(!engine.is_sending());
}

#[tokio::test]
async fn test_unregistered_provider_fails_as_auth() {
    let store = Arc::new(MemoryStore::new());
    let catalog = PromptCatalog::new(store.clone());
    let profile = Profile::new("Claude", "").with_provider(ProviderId::ClaudeCli);
    let profile_id = profile.id.clone();
    catalog.add(profile).await.unwrap();

    let engine = ready_engine(store, ScriptedProvider::new()).await;
    engine.create_thread(Some(profile_id.as_str())).await.unwrap();

    let outcome = engine.send_message("hi").await;
    let SendOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(error.kind, ErrorKind::Auth);
}

#[tokio::test]
async fn test_system_prompt_sent_but_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let catalog = PromptCatalog::new(store.clone());
    let profile = Profile::new("Terse", "  Be terse.  ").with_model("gpt-4.1-mini");
    let profile_id = profile.id.clone();
    catalog.add(profile).await.unwrap();

    let provider = ScriptedProvider::new();
    let engine = ready_engine(store.clone(), provider.clone()).await;
    let thread_id = engine.create_thread(Some(profile_id.as_str())).await.unwrap();

    engine.send_message("hi").await;

    let call = provider.call(0);
    assert_eq!(call.messages[0].role, MessageRole::System);
    assert_eq!(call.messages[0].id, "system-prompt");
    assert_eq!(call.messages[0].content, "Be terse.");
    assert_eq!(call.messages[1].content, "hi");
    assert_eq!(call.options.model.as_deref(), Some("gpt-4.1-mini"));
    assert_eq!(call.options.system_prompt.as_deref(), Some("Be terse."));

    let stored = stored_messages(&store, &thread_id).await;
    assert!(stored.iter().all(|m| m.role != MessageRole::System));
}

#[tokio::test]
async fn test_missing_bound_profile_falls_back_to_default() {
    let store = Arc::new(MemoryStore::new());
    let catalog = PromptCatalog::new(store.clone());
    catalog.ensure_default().await.unwrap();

    let provider = ScriptedProvider::new();
    let engine = ready_engine(store, provider.clone()).await;
    engine.create_thread(Some("deleted-profile")).await.unwrap();

    engine.send_message("hi").await;

    let call = provider.call(0);
    assert_eq!(call.options.model.as_deref(), Some("gpt-4.1-nano"));
    assert!(call.messages.iter().all(|m| m.role != MessageRole::System));
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_initialize_on_empty_store_creates_thread() {
    let store = Arc::new(MemoryStore::new());
    let catalog = PromptCatalog::new(store.clone());
    let default_id = catalog.ensure_default().await.unwrap();

    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;

    let threads = engine.threads().await;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].title, DEFAULT_THREAD_TITLE);
    assert_eq!(threads[0].custom_command_id.as_deref(), Some(default_id.as_str()));
    assert_eq!(engine.current_thread_id().await, Some(threads[0].id.clone()));

    let conversations = ConversationStore::new(store);
    assert_eq!(conversations.load_threads().await.unwrap().len(), 1);
    assert_eq!(
        conversations.load_current_thread_id().await.unwrap(),
        Some(threads[0].id.clone())
    );
}

#[tokio::test]
async fn test_initialize_restores_saved_pointer() {
    let store = Arc::new(MemoryStore::new());
    let first = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let original = first.current_thread_id().await.unwrap();
    first.create_thread(None).await.unwrap();
    first.select_thread(&original).await.unwrap();

    let second = ready_engine(store, ScriptedProvider::new()).await;

    assert_eq!(second.threads().await.len(), 2);
    assert_eq!(second.current_thread_id().await, Some(original.clone()));
    assert_eq!(second.cached_messages(&original).await, Some(Vec::new()));
}

#[tokio::test]
async fn test_initialize_with_stale_pointer_picks_most_recent() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let first = ready_engine(store.clone(), provider.clone()).await;
    let older = first.current_thread_id().await.unwrap();
    let newer = first.create_thread(None).await.unwrap();
    first.select_thread(&older).await.unwrap();
    first.send_message("bump").await;

    ConversationStore::new(store.clone())
        .save_current_thread_id("gone")
        .await
        .unwrap();

    let second = ready_engine(store, provider).await;
    assert_eq!(second.current_thread_id().await, Some(older));
    assert_ne!(second.current_thread_id().await, Some(newer));
}

#[tokio::test]
async fn test_initialize_start_new_prepends_thread() {
    let store = Arc::new(MemoryStore::new());
    let first = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let existing = first.current_thread_id().await.unwrap();

    let second = engine_with(store, ScriptedProvider::new());
    second
        .initialize(InitOptions::start_new(Some("profile-1".to_string())))
        .await;

    let current = second.current_thread().await.unwrap();
    assert_ne!(current.id, existing);
    assert_eq!(current.custom_command_id.as_deref(), Some("profile-1"));
    assert_eq!(second.threads().await.len(), 2);
}

#[tokio::test]
async fn test_unreadable_thread_index_is_left_intact() {
    let store = Arc::new(MemoryStore::new());
    let corrupt = r#"[{"id":"t1","title":"Important""#.to_string();
    store.set("ask-ai:threads", corrupt.clone()).await.unwrap();
    store
        .set("ask-ai:messages:t1", "[]".to_string())
        .await
        .unwrap();

    let engine = engine_with(store.clone(), ScriptedProvider::new());
    let mut events = engine.subscribe();
    engine.initialize(InitOptions::resume()).await;

    // Usable in memory
    assert!(engine.is_initialized().await);
    let threads = engine.threads().await;
    assert_eq!(threads.len(), 1);
    assert_eq!(engine.current_thread_id().await, Some(threads[0].id.clone()));

    assert_eq!(store.get("ask-ai:threads").await.unwrap(), Some(corrupt));
    assert!(store.get("ask-ai:current-thread-id").await.unwrap().is_none());
    assert!(store.get("ask-ai:messages:t1").await.unwrap().is_some());

    let notices = drain_notices(&mut events);
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Failure && n.title == "Failed to restore conversations"));
}

// ============================================================================
// Thread lifecycle
// ============================================================================

#[tokio::test]
async fn test_delete_current_thread_switches_to_most_recent() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let a = engine.current_thread_id().await.unwrap();
    let b = engine.create_thread(None).await.unwrap();
    let c = engine.create_thread(None).await.unwrap();

    engine.select_thread(&a).await.unwrap();
    engine.send_message("activity on a").await;
    engine.select_thread(&c).await.unwrap();
    engine.send_message("doomed").await;

    assert!(engine.delete_thread(&c).await);

    assert_eq!(engine.current_thread_id().await, Some(a.clone()));
    assert_eq!(engine.messages().await.len(), 2);
    let ids: Vec<String> = engine.threads().await.into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![a.clone(), b]);
    assert!(store.get(&format!("ask-ai:messages:{}", c)).await.unwrap().is_none());
    assert_eq!(engine.cached_messages(&c).await, None);
}

#[tokio::test]
async fn test_delete_other_thread_keeps_current() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let a = engine.current_thread_id().await.unwrap();
    let b = engine.create_thread(None).await.unwrap();

    assert!(engine.delete_thread(&a).await);

    assert_eq!(engine.current_thread_id().await, Some(b));
    let stored = ConversationStore::new(store).load_threads().await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_delete_all_threads_leaves_fresh_thread() {
    let store = Arc::new(MemoryStore::new());
    let catalog = PromptCatalog::new(store.clone());
    let default_id = catalog.ensure_default().await.unwrap();
    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let a = engine.current_thread_id().await.unwrap();
    let b = engine.create_thread(None).await.unwrap();
    engine.send_message("something").await;

    assert!(engine.delete_threads(&[a.clone(), b.clone()]).await);

    let threads = engine.threads().await;
    assert_eq!(threads.len(), 1);
    let fresh = &threads[0];
    assert!(fresh.id != a && fresh.id != b);
    assert_eq!(fresh.title, DEFAULT_THREAD_TITLE);
    assert_eq!(fresh.custom_command_id.as_deref(), Some(default_id.as_str()));
    assert_eq!(engine.current_thread_id().await, Some(fresh.id.clone()));
    assert!(engine.messages().await.is_empty());
    assert_eq!(
        ConversationStore::new(store).load_current_thread_id().await.unwrap(),
        Some(fresh.id.clone())
    );
}

#[tokio::test]
async fn test_clear_messages_empties_current_thread() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let thread_id = engine.current_thread_id().await.unwrap();
    engine.send_message("hi").await;

    assert!(engine.clear_messages().await);

    assert!(engine.messages().await.is_empty());
    assert!(stored_messages(&store, &thread_id).await.is_empty());
    assert_eq!(engine.threads().await.len(), 1);
}

#[tokio::test]
async fn test_lifecycle_ignored_while_sending() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new();
    let release = Arc::new(Notify::new());
    provider.push_script(vec![Step::Wait(release.clone())]);
    let engine = ready_engine(store, provider.clone()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    let send = tokio::spawn({
        let engine = engine.clone();
        async move { engine.send_message("busy").await }
    });
    wait_for_calls(&provider, 1).await;

    assert_eq!(engine.create_thread(None).await, None);
    assert!(!engine.clear_messages().await);
    assert!(!engine.delete_thread(&thread_id).await);
    assert_eq!(engine.threads().await.len(), 1);

    release.notify_one();
    send.await.unwrap();
    assert!(engine.create_thread(None).await.is_some());
}

#[tokio::test]
async fn test_unknown_thread_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store, ScriptedProvider::new()).await;

    assert!(matches!(
        engine.select_thread("missing").await,
        Err(EngineError::ThreadNotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        engine.load_thread_messages("missing").await,
        Err(EngineError::ThreadNotFound(_))
    ));
    assert!(matches!(
        engine.update_thread_custom_command("missing", Some("p")).await,
        Err(EngineError::ThreadNotFound(_))
    ));
}

#[tokio::test]
async fn test_update_thread_custom_command_is_persisted() {
    let store = Arc::new(MemoryStore::new());
    let engine = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let thread_id = engine.current_thread_id().await.unwrap();

    engine
        .update_thread_custom_command(&thread_id, Some("profile-9"))
        .await
        .unwrap();

    let stored = ConversationStore::new(store).load_threads().await.unwrap();
    assert_eq!(stored[0].custom_command_id.as_deref(), Some("profile-9"));

    engine.update_thread_custom_command(&thread_id, None).await.unwrap();
    assert_eq!(engine.current_thread().await.unwrap().custom_command_id, None);
}

#[tokio::test]
async fn test_load_thread_messages_fills_cache() {
    let store = Arc::new(MemoryStore::new());
    let first = ready_engine(store.clone(), ScriptedProvider::new()).await;
    let thread_id = first.current_thread_id().await.unwrap();
    first.send_message("remember me").await;

    let second = engine_with(store, ScriptedProvider::new());
    second.initialize(InitOptions::resume()).await;
    second.load_thread_messages(&thread_id).await.unwrap();

    let cached = second.cached_messages(&thread_id).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0].content, "remember me");
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn test_write_failures_are_reported_not_fatal() {
    let provider = ScriptedProvider::new();
    let engine = engine_with(Arc::new(FailingStore), provider.clone());
    let mut events = engine.subscribe();

    engine.initialize(InitOptions::resume()).await;
    assert!(engine.is_initialized().await);
    assert!(drain_notices(&mut events)
        .iter()
        .any(|n| n.level == NoticeLevel::Failure));

    let outcome = engine.send_message("hi").await;
    assert!(matches!(outcome, SendOutcome::Completed { .. }));
    assert_eq!(engine.messages().await.len(), 2);

    let notices = drain_notices(&mut events);
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.title == "Failed to save message"));
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Failure && n.title == "Failed to save conversation"));
}
