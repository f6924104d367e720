//! The send turn: persist the user message, trim, dispatch, stream, finalize

use askai_llm::{
    classify_provider_error, CompletionOptions, CompletionResult, DeltaSink, ProviderError,
};
use askai_types::{Message, Notice, Profile, ProviderId};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::engine::{ConversationEngine, SendOutcome};
use crate::throttle::Throttle;

pub(crate) const STATUS_THINKING: &str = "Thinking...";
const SYSTEM_PROMPT_ID: &str = "system-prompt";

/// Everything a dispatch needs, resolved from the thread's profile
struct TurnPlan {
    provider: ProviderId,
    model: Option<String>,
    options: CompletionOptions,
    system_prompt: Option<String>,
}

impl TurnPlan {
    fn from_profile(profile: Option<&Profile>) -> Self {
        let provider = profile.and_then(|p| p.provider).unwrap_or_default();
        let model = profile
            .and_then(|p| p.model.clone())
            .filter(|m| !m.trim().is_empty());
        let system_prompt = profile
            .map(|p| p.system_prompt.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut options = CompletionOptions::new();
        if let Some(model) = &model {
            options = options.with_model(model.clone());
        }
        if let Some(effort) = profile.and_then(|p| p.reasoning_effort) {
            options = options.with_reasoning_effort(effort);
        }
        if let Some(prompt) = &system_prompt {
            options = options.with_system_prompt(prompt.clone());
        }

        Self {
            provider,
            model,
            options,
            system_prompt,
        }
    }
}

impl ConversationEngine {
    /// Send `text` to the current thread and stream the reply into the cache
    ///
    /// Returns [`SendOutcome::Dropped`] without side effects when another send
    /// is in flight, the engine is not initialized, or `text` is blank.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Dropped;
        }
        let Some(_guard) = self.inner.lock.try_acquire() else {
            tracing::debug!("send ignored: another send is in flight");
            return SendOutcome::Dropped;
        };

        let thread_id = {
            let state = self.inner.state.read().await;
            match state.current_thread_id.clone() {
                Some(id) if state.initialized => id,
                _ => return SendOutcome::Dropped,
            }
        };

        let outcome = self.run_turn(&thread_id, text).await;

        {
            let mut state = self.inner.state.write().await;
            state.status = None;
            state.loading_thread_id = None;
        }
        self.emit(askai_types::EngineEvent::StatusChanged { status: None });

        outcome
    }

    async fn run_turn(&self, thread_id: &str, text: &str) -> SendOutcome {
        let config = &self.inner.config;

        if self.cached_messages(thread_id).await.is_none() {
            let loaded = match self.inner.store.load_messages(thread_id).await {
                Ok(messages) => messages,
                Err(e) => {
                    // Caching an empty list here would overwrite the stored history
                    tracing::warn!(thread_id, error = %e, "failed to load messages before send");
                    self.notify(
                        Notice::failure("Failed to load conversation")
                            .with_message("The message was not sent."),
                    );
                    return SendOutcome::Dropped;
                }
            };
            self.inner
                .state
                .write()
                .await
                .cache
                .entry(thread_id.to_string())
                .or_insert(loaded);
        }

        // Optimistic update: user message, title and activity time
        let user_message = Message::user(thread_id, text);
        let (history, threads, bound_profile) = {
            let mut state = self.inner.state.write().await;
            let cached = state.cache.entry(thread_id.to_string()).or_default();
            let first_message = cached.is_empty();
            cached.push(user_message);
            let history = cached.clone();

            let bound_profile = match state.thread_mut(thread_id) {
                Some(thread) => {
                    if first_message {
                        thread.title = config.derive_title(text);
                    }
                    thread.updated_at = Utc::now();
                    thread.custom_command_id.clone()
                }
                None => None,
            };

            state.status = Some(STATUS_THINKING.to_string());
            state.loading_thread_id = Some(thread_id.to_string());
            (history, state.threads.clone(), bound_profile)
        };
        self.messages_changed(thread_id);
        self.emit(askai_types::EngineEvent::ThreadsChanged);
        self.emit(askai_types::EngineEvent::StatusChanged {
            status: Some(STATUS_THINKING.to_string()),
        });

        let saved = async {
            self.inner.store.save_messages(thread_id, &history).await?;
            self.inner.store.save_threads(&threads).await
        }
        .await;
        if let Err(e) = saved {
            tracing::warn!(thread_id, error = %e, "failed to save user message");
            self.notify(
                Notice::warning("Failed to save message")
                    .with_message("The message may not be restored next time."),
            );
        }

        let profile = self.resolve_profile(bound_profile.as_deref()).await;
        let plan = TurnPlan::from_profile(profile.as_ref());

        let mut for_api = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &plan.system_prompt {
            for_api.push(
                Message::system(thread_id, prompt.clone()).with_created_at(DateTime::<Utc>::UNIX_EPOCH),
            );
            if let Some(first) = for_api.first_mut() {
                first.id = SYSTEM_PROMPT_ID.to_string();
            }
        }
        for_api.extend(history);

        let budget_model = plan.model.as_deref().unwrap_or(&config.default_model);
        let trim = self.inner.context.trim(for_api, budget_model);
        if trim.exceeds_limit {
            tracing::info!(thread_id, model = budget_model, "message exceeds context budget");
            self.notify(
                Notice::failure("Message is too long")
                    .with_message("Shorten the message and try again."),
            );
            return SendOutcome::TooLong;
        }
        if trim.was_trimmed {
            tracing::debug!(thread_id, kept = trim.trimmed.len(), "trimmed conversation history");
            self.notify(Notice::info("Some older messages were omitted"));
        }

        // Crash-recovery checkpoint: the stored copy stays flagged until the
        // turn completes.
        let placeholder = Message::assistant(thread_id, "");
        let placeholder_id = placeholder.id.clone();
        self.inner
            .state
            .write()
            .await
            .cache
            .entry(thread_id.to_string())
            .or_default()
            .push(placeholder);
        self.messages_changed(thread_id);
        self.flush_partial_to_storage(thread_id, &placeholder_id, "").await;

        tracing::info!(
            thread_id,
            provider = %plan.provider,
            model = plan.model.as_deref().unwrap_or("provider default"),
            messages = trim.trimmed.len(),
            "dispatching turn"
        );

        let (sink, delta_rx) = DeltaSink::channel();
        let options = plan.options.with_delta_sink(sink);
        let (result, latest) = self
            .stream_completion(thread_id, &placeholder_id, plan.provider, &trim.trimmed, options, delta_rx)
            .await;

        match result {
            Ok(completion) => self.finish_turn(thread_id, &placeholder_id, completion).await,
            Err(e) => {
                let api_error = classify_provider_error(plan.provider, &e);
                tracing::error!(
                    thread_id,
                    provider = %plan.provider,
                    kind = api_error.kind.as_str(),
                    error = %e,
                    "completion failed"
                );

                {
                    let mut state = self.inner.state.write().await;
                    if let Some(message) = find_message(&mut state.cache, thread_id, &placeholder_id) {
                        if let Some(text) = latest {
                            message.content = text;
                        }
                        message.interrupted = Some(true);
                    }
                }
                self.messages_changed(thread_id);
                self.notify(Notice::failure("Failed to send").with_message(api_error.message.clone()));
                SendOutcome::Failed(api_error)
            }
        }
    }

    /// Drive the provider call while applying deltas under the two throttles
    async fn stream_completion(
        &self,
        thread_id: &str,
        placeholder_id: &str,
        provider: ProviderId,
        messages: &[Message],
        options: CompletionOptions,
        mut delta_rx: mpsc::UnboundedReceiver<String>,
    ) -> (Result<CompletionResult, ProviderError>, Option<String>) {
        let config = &self.inner.config;
        let mut ui = Throttle::immediate(config.ui_flush_interval);
        let mut storage = Throttle::started_at(config.storage_flush_interval, Instant::now());
        let mut latest: Option<String> = None;

        let completion = self.inner.dispatcher.send_completion(provider, messages, options);
        tokio::pin!(completion);

        let result = loop {
            let ui_deadline = ui.deadline();
            let storage_deadline = storage.deadline();

            tokio::select! {
                result = &mut completion => break result,
                Some(text) = delta_rx.recv() => {
                    if latest.is_none() {
                        self.set_status(None).await;
                    }
                    latest = Some(text);
                    let now = Instant::now();
                    if ui.on_event(now) {
                        self.apply_partial(thread_id, placeholder_id, latest.as_deref().unwrap_or_default()).await;
                        ui.fired(now);
                    }
                    if storage.on_event(now) {
                        self.flush_partial_to_storage(thread_id, placeholder_id, latest.as_deref().unwrap_or_default()).await;
                        storage.fired(now);
                    }
                }
                _ = sleep_until(ui_deadline.unwrap_or_else(Instant::now)), if ui_deadline.is_some() => {
                    self.apply_partial(thread_id, placeholder_id, latest.as_deref().unwrap_or_default()).await;
                    ui.fired(Instant::now());
                }
                _ = sleep_until(storage_deadline.unwrap_or_else(Instant::now)), if storage_deadline.is_some() => {
                    self.flush_partial_to_storage(thread_id, placeholder_id, latest.as_deref().unwrap_or_default()).await;
                    storage.fired(Instant::now());
                }
            }
        };

        // Deltas emitted right before completion may still be queued
        while let Ok(text) = delta_rx.try_recv() {
            latest = Some(text);
            let now = Instant::now();
            ui.on_event(now);
            storage.on_event(now);
        }

        if let Some(text) = latest.as_deref() {
            let now = Instant::now();
            if ui.is_pending() {
                self.apply_partial(thread_id, placeholder_id, text).await;
                ui.fired(now);
            }
            if storage.is_pending() {
                self.flush_partial_to_storage(thread_id, placeholder_id, text).await;
                storage.fired(now);
            }
        }

        (result, latest)
    }

    async fn finish_turn(
        &self,
        thread_id: &str,
        placeholder_id: &str,
        completion: CompletionResult,
    ) -> SendOutcome {
        let (messages, threads) = {
            let mut state = self.inner.state.write().await;
            if let Some(message) = find_message(&mut state.cache, thread_id, placeholder_id) {
                message.content = completion.content;
                message.model = Some(completion.model.clone());
                message.used_web_search = completion.used_web_search.filter(|used| *used);
                message.interrupted = None;
            }
            let messages = state.cache.get(thread_id).cloned().unwrap_or_default();
            if let Some(thread) = state.thread_mut(thread_id) {
                thread.touch();
            }
            (messages, state.threads.clone())
        };
        self.messages_changed(thread_id);
        self.emit(askai_types::EngineEvent::ThreadsChanged);

        let saved = async {
            self.inner.store.save_messages(thread_id, &messages).await?;
            self.inner.store.save_threads(&threads).await
        }
        .await;
        if let Err(e) = saved {
            tracing::warn!(thread_id, error = %e, "failed to save completed turn");
            self.notify(
                Notice::failure("Failed to save conversation")
                    .with_message("The conversation may not be restored next time."),
            );
        }

        tracing::info!(thread_id, model = %completion.model, "turn completed");
        SendOutcome::Completed {
            message_id: placeholder_id.to_string(),
        }
    }

    /// Bound profile, else the default one; lookup failures count as absent
    async fn resolve_profile(&self, bound: Option<&str>) -> Option<Profile> {
        let catalog = &self.inner.catalog;
        if let Some(id) = bound {
            match catalog.get(id).await {
                Ok(Some(profile)) => return Some(profile),
                Ok(None) => tracing::debug!(profile_id = id, "bound profile missing, using default"),
                Err(e) => tracing::warn!(profile_id = id, error = %e, "failed to read bound profile"),
            }
        }
        match catalog.default_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read default profile");
                None
            }
        }
    }

    async fn set_status(&self, status: Option<String>) {
        self.inner.state.write().await.status = status.clone();
        self.emit(askai_types::EngineEvent::StatusChanged { status });
    }

    /// UI-visible update of the message under construction
    async fn apply_partial(&self, thread_id: &str, placeholder_id: &str, text: &str) {
        let updated = {
            let mut state = self.inner.state.write().await;
            match find_message(&mut state.cache, thread_id, placeholder_id) {
                Some(message) => {
                    message.content = text.to_string();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.messages_changed(thread_id);
        }
    }

    /// Persist the thread with the partial reply flagged as interrupted
    async fn flush_partial_to_storage(&self, thread_id: &str, placeholder_id: &str, text: &str) {
        let snapshot = {
            let state = self.inner.state.read().await;
            let mut messages = state.cache.get(thread_id).cloned().unwrap_or_default();
            if let Some(message) = messages.iter_mut().find(|m| m.id == placeholder_id) {
                message.content = text.to_string();
                message.interrupted = Some(true);
            }
            messages
        };

        if let Err(e) = self.inner.store.save_messages(thread_id, &snapshot).await {
            tracing::warn!(thread_id, error = %e, "failed to checkpoint partial reply");
        }
    }
}

fn find_message<'a>(
    cache: &'a mut std::collections::HashMap<String, Vec<Message>>,
    thread_id: &str,
    message_id: &str,
) -> Option<&'a mut Message> {
    cache
        .get_mut(thread_id)?
        .iter_mut()
        .find(|m| m.id == message_id)
}
