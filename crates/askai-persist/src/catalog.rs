use askai_types::{config::DEFAULT_MODEL, Profile, ProviderId};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{PersistError, Result};
use crate::keys::StorageKeys;
use crate::store::KeyValueStore;

pub const DEFAULT_PROFILE_NAME: &str = "Default";
const DEFAULT_PROFILE_ICON: &str = "Bubble";

/// Read-side lookup the engine needs from a profile catalog
#[async_trait]
pub trait ProfileCatalog: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Profile>>;

    async fn default_profile(&self) -> Result<Option<Profile>>;

    /// Case-insensitive name lookup
    async fn find_by_name(&self, name: &str) -> Result<Option<Profile>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Ordered list of prompt profiles kept under a single key
#[derive(Clone)]
pub struct PromptCatalog {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl PromptCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            keys: StorageKeys::default(),
        }
    }

    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub async fn list(&self) -> Result<Vec<Profile>> {
        match self.store.get(&self.keys.profiles()).await? {
            Some(raw) if !raw.is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn save_all(&self, profiles: &[Profile]) -> Result<()> {
        let raw = serde_json::to_string(profiles)?;
        self.store.set(&self.keys.profiles(), raw).await
    }

    pub async fn add(&self, profile: Profile) -> Result<()> {
        let mut profiles = self.list().await?;
        profiles.push(profile);
        self.save_all(&profiles).await
    }

    pub async fn update(&self, profile: Profile) -> Result<()> {
        let mut profiles = self.list().await?;
        let slot = profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| PersistError::ProfileNotFound(profile.id.clone()))?;
        *slot = profile;
        self.save_all(&profiles).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut profiles = self.list().await?;
        if profiles.iter().any(|p| p.id == id && p.is_default()) {
            return Err(PersistError::DefaultProfileProtected);
        }
        profiles.retain(|p| p.id != id);
        self.save_all(&profiles).await
    }

    /// Swap a profile with its neighbour; no-op at the edges
    pub async fn reorder(&self, id: &str, direction: MoveDirection) -> Result<()> {
        let mut profiles = self.list().await?;
        let Some(index) = profiles.iter().position(|p| p.id == id) else {
            return Ok(());
        };

        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < profiles.len() => index + 1,
            _ => return Ok(()),
        };

        profiles.swap(index, target);
        self.save_all(&profiles).await
    }

    /// Create the default profile on first run, or repair the recorded one.
    /// Returns its id.
    pub async fn ensure_default(&self) -> Result<String> {
        let key = self.keys.default_profile_id();

        if let Some(existing_id) = self.store.get(&key).await?.filter(|id| !id.is_empty()) {
            let mut profiles = self.list().await?;
            if let Some(profile) = profiles.iter_mut().find(|p| p.id == existing_id) {
                let mut dirty = false;
                if !profile.is_default() {
                    profile.is_default = Some(true);
                    dirty = true;
                }
                if profile.provider.is_none() {
                    profile.provider = Some(ProviderId::OpenAiApi);
                    dirty = true;
                }
                if profile.model.is_none() {
                    profile.model = Some(DEFAULT_MODEL.to_string());
                    dirty = true;
                }
                if dirty {
                    tracing::info!(profile_id = %existing_id, "migrated default profile");
                    self.save_all(&profiles).await?;
                }
            }
            return Ok(existing_id);
        }

        let mut profile = Profile::new(DEFAULT_PROFILE_NAME, "")
            .with_provider(ProviderId::OpenAiApi)
            .with_model(DEFAULT_MODEL);
        profile.icon = Some(DEFAULT_PROFILE_ICON.to_string());
        profile.is_default = Some(true);
        let id = profile.id.clone();

        let mut profiles = self.list().await?;
        profiles.insert(0, profile);
        self.save_all(&profiles).await?;
        self.store.set(&key, id.clone()).await?;

        tracing::info!(profile_id = %id, "created default profile");
        Ok(id)
    }
}

#[async_trait]
impl ProfileCatalog for PromptCatalog {
    async fn get(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    async fn default_profile(&self) -> Result<Option<Profile>> {
        Ok(self.list().await?.into_iter().find(Profile::is_default))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Profile>> {
        let wanted = name.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|p| p.name.to_lowercase() == wanted))
    }
}
