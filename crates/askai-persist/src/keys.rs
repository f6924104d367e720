pub const DEFAULT_NAMESPACE: &str = "ask-ai";

/// Namespaced storage keys
#[derive(Debug, Clone)]
pub struct StorageKeys {
    namespace: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl StorageKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn messages(&self, thread_id: &str) -> String {
        format!("{}:messages:{}", self.namespace, thread_id)
    }

    pub fn threads(&self) -> String {
        format!("{}:threads", self.namespace)
    }

    pub fn current_thread_id(&self) -> String {
        format!("{}:current-thread-id", self.namespace)
    }

    pub fn profiles(&self) -> String {
        format!("{}:custom-commands", self.namespace)
    }

    pub fn default_profile_id(&self) -> String {
        format!("{}:default-command-id", self.namespace)
    }
}
