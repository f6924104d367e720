use askai_types::{Message, ProviderId};
use async_trait::async_trait;
use std::sync::Arc;

use super::config::CliConfig;
use super::env::ShellEnv;
use super::process::build_command;
use crate::error::{ProviderError, Result};
use crate::prompt::{combined_system_prompt, format_transcript};
use crate::traits::{CompletionOptions, CompletionProvider, CompletionResult};

pub const CODEX_LOCAL_DEFAULT: &str = "Codex CLI (local default)";

/// Non-streaming provider: `codex exec` prints the whole answer on exit
pub struct CodexCliProvider {
    config: CliConfig,
    shell_env: Arc<ShellEnv>,
}

impl CodexCliProvider {
    pub fn new(config: CliConfig, shell_env: Arc<ShellEnv>) -> Self {
        Self { config, shell_env }
    }

    pub fn build_args(messages: &[Message], options: &CompletionOptions) -> Vec<String> {
        let mut args = vec!["exec".to_string(), "--skip-git-repo-check".to_string()];

        if let Some(model) = &options.model {
            args.push("-m".to_string());
            args.push(model.clone());
        }

        if let Some(effort) = options.reasoning_effort {
            args.push("-c".to_string());
            args.push(format!("model_reasoning_effort=\"{}\"", effort));
        }

        if let Some(system) = combined_system_prompt(options.system_prompt.as_deref(), messages) {
            args.push("-c".to_string());
            args.push(format!("developer_instructions=\"{}\"", system.replace('"', "\\\"")));
        }

        args.push(format_transcript(messages));
        args
    }
}

#[async_trait]
impl CompletionProvider for CodexCliProvider {
    fn id(&self) -> ProviderId {
        ProviderId::CodexCli
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResult> {
        let label = self.config.command_label();
        let args = Self::build_args(messages, &options);
        let mut command = build_command(&self.config, &self.shell_env, &args).await;

        tracing::debug!(command = %label, "running codex cli");

        let child = command.spawn().map_err(|e| ProviderError::CliLaunch {
            command: self.config.executable.display().to_string(),
            message: e.to_string(),
        })?;

        // Dropping the pending wait kills the child (kill_on_drop)
        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::CliTimeout {
                command: label.clone(),
                seconds: self.config.timeout.as_secs(),
            })?
            .map_err(|e| ProviderError::Stream(format!("{}: {}", label, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::cli_exit(label, output.status.code(), &stderr));
        }

        let content = String::from_utf8_lossy(&output.stdout).trim().to_string();
        options.emit(&content);

        Ok(CompletionResult {
            content,
            model: options
                .model
                .clone()
                .unwrap_or_else(|| CODEX_LOCAL_DEFAULT.to_string()),
            used_web_search: None,
        })
    }
}
