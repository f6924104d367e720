use askai_context::ContextStrategy;
use askai_llm::ProviderDispatcher;
use askai_persist::{ConversationStore, ProfileCatalog};
use askai_types::{ApiError, EngineConfig, EngineEvent, Message, Notice, Thread};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::builder::EngineBuilder;
use crate::error::{EngineError, Result};
use crate::lock::SendLock;

const EVENT_CAPACITY: usize = 256;

/// How [`ConversationEngine::initialize`] should start
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Always open a fresh thread, even when threads were restored
    pub start_new: bool,
    /// Profile bound to a thread created during startup
    pub profile_id: Option<String>,
}

impl InitOptions {
    pub fn resume() -> Self {
        Self::default()
    }

    pub fn start_new(profile_id: Option<String>) -> Self {
        Self {
            start_new: true,
            profile_id,
        }
    }
}

/// Result of [`ConversationEngine::send_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed { message_id: String },
    /// Ignored: another send in flight, engine not ready, empty text, or the
    /// thread history could not be loaded
    Dropped,
    /// Even the minimal history does not fit the model's budget
    TooLong,
    Failed(ApiError),
}

#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) threads: Vec<Thread>,
    pub(crate) current_thread_id: Option<String>,
    pub(crate) cache: HashMap<String, Vec<Message>>,
    pub(crate) status: Option<String>,
    pub(crate) loading_thread_id: Option<String>,
    pub(crate) initialized: bool,
}

impl EngineState {
    pub(crate) fn thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.threads.iter().any(|t| t.id == id)
    }

    fn most_recent(&self) -> Option<&Thread> {
        self.threads.iter().max_by_key(|t| t.updated_at)
    }
}

pub(crate) struct EngineInner {
    pub(crate) store: ConversationStore,
    pub(crate) catalog: Arc<dyn ProfileCatalog>,
    pub(crate) dispatcher: ProviderDispatcher,
    pub(crate) context: Arc<dyn ContextStrategy>,
    pub(crate) config: EngineConfig,
    pub(crate) state: RwLock<EngineState>,
    pub(crate) lock: SendLock,
    events: broadcast::Sender<EngineEvent>,
}

/// Owns thread and message state and runs turns against the providers
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConversationEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl ConversationEngine {
    pub(crate) fn new(
        store: ConversationStore,
        catalog: Arc<dyn ProfileCatalog>,
        dispatcher: ProviderDispatcher,
        context: Arc<dyn ContextStrategy>,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                store,
                catalog,
                dispatcher,
                context,
                config,
                state: RwLock::new(EngineState::default()),
                lock: SendLock::new(),
                events,
            }),
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.inner.events.send(event);
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.emit(EngineEvent::Notice(notice));
    }

    pub(crate) fn messages_changed(&self, thread_id: &str) {
        self.emit(EngineEvent::MessagesChanged {
            thread_id: thread_id.to_string(),
        });
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    /// Threads, most recently active first
    pub async fn threads(&self) -> Vec<Thread> {
        let mut threads = self.inner.state.read().await.threads.clone();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        threads
    }

    pub async fn current_thread_id(&self) -> Option<String> {
        self.inner.state.read().await.current_thread_id.clone()
    }

    pub async fn current_thread(&self) -> Option<Thread> {
        let state = self.inner.state.read().await;
        let id = state.current_thread_id.as_deref()?;
        state.threads.iter().find(|t| t.id == id).cloned()
    }

    /// Cached messages of the current thread
    pub async fn messages(&self) -> Vec<Message> {
        let state = self.inner.state.read().await;
        state
            .current_thread_id
            .as_ref()
            .and_then(|id| state.cache.get(id))
            .cloned()
            .unwrap_or_default()
    }

    /// Cached messages of any thread; `None` when not loaded yet
    pub async fn cached_messages(&self, thread_id: &str) -> Option<Vec<Message>> {
        self.inner.state.read().await.cache.get(thread_id).cloned()
    }

    pub async fn status(&self) -> Option<String> {
        self.inner.state.read().await.status.clone()
    }

    /// Thread whose turn is in flight
    pub async fn loading_thread_id(&self) -> Option<String> {
        self.inner.state.read().await.loading_thread_id.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.state.read().await.initialized
    }

    pub fn is_sending(&self) -> bool {
        self.inner.lock.is_held()
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Restore threads and the current-thread pointer, creating a thread when
    /// none can be restored. When the index cannot be read the fresh thread
    /// lives in memory only until the next write.
    pub async fn initialize(&self, options: InitOptions) {
        let Some(_guard) = self.inner.lock.try_acquire() else {
            tracing::warn!("initialize called while a send is in flight");
            return;
        };
        if self.is_initialized().await {
            return;
        }

        // An unreadable index is left untouched in storage
        let (restored, index_readable) = match self.inner.store.load_threads().await {
            Ok(threads) => (threads, true),
            Err(e) => {
                tracing::warn!(error = %e, "failed to restore threads");
                self.notify(
                    Notice::failure("Failed to restore conversations")
                        .with_message("Starting a new conversation"),
                );
                (Vec::new(), false)
            }
        };

        let mut cache = HashMap::new();
        for thread in &restored {
            match self.inner.store.load_messages(&thread.id).await {
                Ok(messages) => {
                    cache.insert(thread.id.clone(), messages);
                }
                Err(e) => {
                    tracing::warn!(thread_id = %thread.id, error = %e, "failed to pre-load messages");
                }
            }
        }

        let current_id = if options.start_new || restored.is_empty() {
            let profile_id = self.seed_profile_id(options.profile_id.as_deref()).await;
            let thread = Thread::new(self.inner.config.placeholder_title.clone(), profile_id);
            let id = thread.id.clone();
            cache.insert(id.clone(), Vec::new());

            let mut threads = Vec::with_capacity(restored.len() + 1);
            threads.push(thread);
            threads.extend(restored);

            if index_readable {
                self.persist_index(&threads, Some(&id), "Failed to save conversation")
                    .await;
            }
            self.install(threads, id.clone(), cache).await;
            id
        } else {
            let saved = match self.inner.store.load_current_thread_id().await {
                Ok(saved) => saved,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to restore current thread pointer");
                    None
                }
            };
            let id = saved
                .filter(|id| restored.iter().any(|t| &t.id == id))
                .or_else(|| restored.iter().max_by_key(|t| t.updated_at).map(|t| t.id.clone()))
                .unwrap_or_default();

            self.install(restored, id.clone(), cache).await;
            id
        };

        tracing::info!(current_thread_id = %current_id, "conversation engine ready");
        self.emit(EngineEvent::ThreadsChanged);
        self.emit(EngineEvent::CurrentThreadChanged {
            thread_id: current_id.clone(),
        });
        self.messages_changed(&current_id);
    }

    async fn install(&self, threads: Vec<Thread>, current: String, cache: HashMap<String, Vec<Message>>) {
        let mut state = self.inner.state.write().await;
        state.threads = threads;
        state.current_thread_id = Some(current);
        state.cache = cache;
        state.initialized = true;
    }

    /// Explicit profile, else the catalog default
    async fn seed_profile_id(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(id) = explicit {
            return Some(id.to_string());
        }
        match self.inner.catalog.default_profile().await {
            Ok(profile) => profile.map(|p| p.id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read default profile");
                None
            }
        }
    }

    /// Save the thread index and optionally the pointer; failures become a notice
    async fn persist_index(&self, threads: &[Thread], current: Option<&str>, failure_title: &str) -> bool {
        let result = async {
            self.inner.store.save_threads(threads).await?;
            if let Some(id) = current {
                self.inner.store.save_current_thread_id(id).await?;
            }
            Ok::<(), askai_persist::PersistError>(())
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to save thread index");
                self.notify(Notice::failure(failure_title));
                false
            }
        }
    }

    // ========================================================================
    // Thread lifecycle
    // ========================================================================

    /// Empty the current thread. No effect while a send is in flight.
    pub async fn clear_messages(&self) -> bool {
        let Some(_guard) = self.inner.lock.try_acquire() else {
            return false;
        };

        let thread_id = {
            let mut state = self.inner.state.write().await;
            let Some(id) = state.current_thread_id.clone().filter(|_| state.initialized) else {
                return false;
            };
            state.cache.insert(id.clone(), Vec::new());
            id
        };
        self.messages_changed(&thread_id);

        if let Err(e) = self.inner.store.clear_messages(&thread_id).await {
            tracing::warn!(thread_id = %thread_id, error = %e, "failed to clear messages");
            self.notify(Notice::failure("Failed to clear conversation"));
        }
        true
    }

    /// Open a new thread and make it current. Returns `None` while a send is
    /// in flight.
    pub async fn create_thread(&self, profile_id: Option<&str>) -> Option<String> {
        let _guard = self.inner.lock.try_acquire()?;
        if !self.is_initialized().await {
            return None;
        }

        let profile_id = self.seed_profile_id(profile_id).await;
        let thread = Thread::new(self.inner.config.placeholder_title.clone(), profile_id);
        let id = thread.id.clone();

        let threads = {
            let mut state = self.inner.state.write().await;
            state.threads.insert(0, thread);
            state.current_thread_id = Some(id.clone());
            state.cache.insert(id.clone(), Vec::new());
            state.threads.clone()
        };

        tracing::info!(thread_id = %id, "created thread");
        self.emit(EngineEvent::ThreadsChanged);
        self.emit(EngineEvent::CurrentThreadChanged {
            thread_id: id.clone(),
        });
        self.messages_changed(&id);

        self.persist_index(&threads, Some(&id), "Failed to create thread")
            .await;
        Some(id)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> bool {
        self.delete_threads(&[thread_id.to_string()]).await
    }

    /// Delete a batch of threads with their stored messages
    ///
    /// If nothing remains a fresh thread replaces them; if the current thread
    /// went away the most recently active survivor becomes current and its
    /// messages are reloaded; otherwise the current thread is kept.
    pub async fn delete_threads(&self, thread_ids: &[String]) -> bool {
        if thread_ids.is_empty() {
            return false;
        }
        let Some(_guard) = self.inner.lock.try_acquire() else {
            return false;
        };
        if !self.is_initialized().await {
            return false;
        }

        let doomed: HashSet<&str> = thread_ids.iter().map(String::as_str).collect();

        for id in &doomed {
            if let Err(e) = self.inner.store.clear_messages(id).await {
                tracing::warn!(thread_id = %id, error = %e, "failed to delete stored messages");
            }
        }

        let replacement_profile = self.seed_profile_id(None).await;

        enum Next {
            Replaced(String),
            Switched(String),
            Kept,
        }

        let (threads, next) = {
            let mut state = self.inner.state.write().await;
            for id in &doomed {
                state.cache.remove(*id);
            }
            state.threads.retain(|t| !doomed.contains(t.id.as_str()));

            let current_deleted = state
                .current_thread_id
                .as_deref()
                .map_or(true, |id| doomed.contains(id));

            let next = if state.threads.is_empty() {
                let thread = Thread::new(
                    self.inner.config.placeholder_title.clone(),
                    replacement_profile,
                );
                let id = thread.id.clone();
                state.threads.push(thread);
                state.cache.insert(id.clone(), Vec::new());
                state.current_thread_id = Some(id.clone());
                Next::Replaced(id)
            } else if current_deleted {
                let id = state
                    .most_recent()
                    .map(|t| t.id.clone())
                    .unwrap_or_default();
                state.current_thread_id = Some(id.clone());
                Next::Switched(id)
            } else {
                Next::Kept
            };

            (state.threads.clone(), next)
        };

        tracing::info!(count = doomed.len(), "deleted threads");
        self.emit(EngineEvent::ThreadsChanged);

        match next {
            Next::Replaced(id) => {
                self.emit(EngineEvent::CurrentThreadChanged {
                    thread_id: id.clone(),
                });
                self.messages_changed(&id);
                self.persist_index(&threads, Some(&id), "Failed to save threads")
                    .await;
            }
            Next::Switched(id) => {
                self.emit(EngineEvent::CurrentThreadChanged {
                    thread_id: id.clone(),
                });
                if self
                    .persist_index(&threads, Some(&id), "Failed to switch threads")
                    .await
                {
                    match self.inner.store.load_messages(&id).await {
                        Ok(messages) => {
                            self.inner.state.write().await.cache.insert(id.clone(), messages);
                            self.messages_changed(&id);
                        }
                        Err(e) => {
                            tracing::warn!(thread_id = %id, error = %e, "failed to reload messages");
                            self.notify(Notice::failure("Failed to switch threads"));
                        }
                    }
                }
            }
            Next::Kept => {
                self.persist_index(&threads, None, "Failed to save threads")
                    .await;
            }
        }

        true
    }

    /// Move the current-thread pointer without reloading messages
    pub async fn select_thread(&self, thread_id: &str) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            if !state.contains(thread_id) {
                return Err(EngineError::ThreadNotFound(thread_id.to_string()));
            }
            state.current_thread_id = Some(thread_id.to_string());
        }
        self.emit(EngineEvent::CurrentThreadChanged {
            thread_id: thread_id.to_string(),
        });

        if let Err(e) = self.inner.store.save_current_thread_id(thread_id).await {
            tracing::warn!(thread_id, error = %e, "failed to save current thread pointer");
        }
        Ok(())
    }

    /// Fill the cache for a thread unless it is already there
    pub async fn load_thread_messages(&self, thread_id: &str) -> Result<()> {
        {
            let state = self.inner.state.read().await;
            if !state.contains(thread_id) {
                return Err(EngineError::ThreadNotFound(thread_id.to_string()));
            }
            if state.cache.contains_key(thread_id) {
                return Ok(());
            }
        }

        match self.inner.store.load_messages(thread_id).await {
            Ok(messages) => {
                let inserted = {
                    let mut state = self.inner.state.write().await;
                    if state.cache.contains_key(thread_id) {
                        false
                    } else {
                        state.cache.insert(thread_id.to_string(), messages);
                        true
                    }
                };
                if inserted {
                    self.messages_changed(thread_id);
                }
            }
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "failed to load messages");
            }
        }
        Ok(())
    }

    /// Bind a thread to a profile, or unbind it with `None`
    pub async fn update_thread_custom_command(
        &self,
        thread_id: &str,
        profile_id: Option<&str>,
    ) -> Result<()> {
        let threads = {
            let mut state = self.inner.state.write().await;
            let thread = state
                .thread_mut(thread_id)
                .ok_or_else(|| EngineError::ThreadNotFound(thread_id.to_string()))?;
            thread.custom_command_id = profile_id.map(str::to_string);
            state.threads.clone()
        };
        self.emit(EngineEvent::ThreadsChanged);

        self.persist_index(&threads, None, "Failed to update thread")
            .await;
        Ok(())
    }
}
