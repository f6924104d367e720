use askai_llm::{CliConfig, OpenAIConfig, ShellEnv};
use askai_types::{EngineConfig, DEFAULT_MODEL};
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub engine: EngineSection,
    pub openai: OpenAiSection,
    pub codex: CliSection,
    pub claude: CliSection,
    pub shell: ShellSection,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `~/.askai`
    pub dir: Option<PathBuf>,
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            namespace: "ask-ai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub ui_flush_ms: u64,
    pub storage_flush_ms: u64,
    pub title_max_chars: usize,
    pub default_model: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            ui_flush_ms: 150,
            storage_flush_ms: 3000,
            title_max_chars: 30,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl From<&EngineSection> for EngineConfig {
    fn from(section: &EngineSection) -> Self {
        EngineConfig::new()
            .with_ui_flush_interval(Duration::from_millis(section.ui_flush_ms))
            .with_storage_flush_interval(Duration::from_millis(section.storage_flush_ms))
            .with_title_max_chars(section.title_max_chars)
            .with_default_model(section.default_model.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    pub base_url: String,
    pub default_model: String,
    pub timeout_secs: Option<u64>,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            base_url: askai_llm::openai::OPENAI_API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: Some(300),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliSection {
    pub executable: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for CliSection {
    fn default() -> Self {
        Self {
            executable: None,
            working_dir: None,
            timeout_secs: 120,
        }
    }
}

impl CliSection {
    /// Apply overrides on top of a provider's stock launch settings
    pub fn apply(&self, base: CliConfig) -> CliConfig {
        let mut cli = base.with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(executable) = &self.executable {
            cli.executable = executable.clone();
        }
        if let Some(dir) = &self.working_dir {
            cli = cli.with_working_dir(dir.clone());
        }
        cli
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    pub enabled: bool,
    pub program: String,
    /// Variables imported from the login shell when missing from the environment
    pub import: Vec<String>,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "zsh".to_string(),
            import: vec!["CLAUDE_CODE_OAUTH_TOKEN".to_string()],
        }
    }
}

impl ShellSection {
    pub fn shell_env(&self) -> ShellEnv {
        if self.enabled {
            ShellEnv::new(self.program.clone(), self.import.clone())
        } else {
            ShellEnv::disabled()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `ASKAI__SECTION__KEY` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("ASKAI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Optional: without a key the hosted provider is simply not registered
        cfg.openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        Ok(cfg)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage.dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".askai")
        })
    }

    /// `None` when no API key is available
    pub fn openai(&self) -> Option<OpenAIConfig> {
        if self.openai_api_key.trim().is_empty() {
            return None;
        }
        let mut openai = OpenAIConfig::new(self.openai_api_key.trim())
            .with_base_url(self.openai.base_url.clone())
            .with_default_model(self.openai.default_model.clone());
        if let Some(secs) = self.openai.timeout_secs {
            openai = openai.with_timeout(Duration::from_secs(secs));
        }
        Some(openai)
    }
}
