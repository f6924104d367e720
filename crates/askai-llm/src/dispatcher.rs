use askai_types::{Message, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::traits::{CompletionOptions, CompletionProvider, CompletionResult};

/// Routes a completion to the provider registered for a [`ProviderId`]
#[derive(Clone, Default)]
pub struct ProviderDispatcher {
    providers: HashMap<ProviderId, Arc<dyn CompletionProvider>>,
}

impl ProviderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the provider's own id, replacing any previous entry
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn register(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(&id).cloned()
    }

    pub fn is_registered(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }

    pub async fn send_completion(
        &self,
        provider: ProviderId,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResult> {
        let backend = self
            .providers
            .get(&provider)
            .ok_or(ProviderError::NotConfigured(provider))?;

        backend.complete(messages, options).await
    }
}
