use askai_context::{ContextStrategy, DefaultContextStrategy};
use askai_llm::ProviderDispatcher;
use askai_persist::{ConversationStore, KeyValueStore, ProfileCatalog, PromptCatalog, StorageKeys};
use askai_types::EngineConfig;
use std::sync::Arc;

use crate::engine::ConversationEngine;
use crate::error::{EngineError, Result};

/// Builder for [`ConversationEngine`]
///
/// A store and a dispatcher are required. Without an explicit catalog the
/// engine reads profiles from the same store.
pub struct EngineBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    keys: StorageKeys,
    catalog: Option<Arc<dyn ProfileCatalog>>,
    dispatcher: Option<ProviderDispatcher>,
    context: Arc<dyn ContextStrategy>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            keys: StorageKeys::default(),
            catalog: None,
            dispatcher: None,
            context: Arc::new(DefaultContextStrategy::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn ProfileCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn dispatcher(mut self, dispatcher: ProviderDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn context_strategy(mut self, context: Arc<dyn ContextStrategy>) -> Self {
        self.context = context;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ConversationEngine> {
        let store = self.store.ok_or(EngineError::MissingComponent("store"))?;
        let dispatcher = self
            .dispatcher
            .ok_or(EngineError::MissingComponent("dispatcher"))?;

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(PromptCatalog::new(Arc::clone(&store)).with_keys(self.keys.clone())),
        };
        let conversations = ConversationStore::new(store).with_keys(self.keys);

        Ok(ConversationEngine::new(
            conversations,
            catalog,
            dispatcher,
            self.context,
            self.config,
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
