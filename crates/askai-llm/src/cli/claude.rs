use askai_types::{Message, ProviderId};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use super::config::CliConfig;
use super::env::ShellEnv;
use super::process::build_command;
use crate::buffer_utils::CircularLineBuffer;
use crate::error::{ProviderError, Result};
use crate::prompt::{combined_system_prompt, format_single_or_transcript};
use crate::traits::{CompletionOptions, CompletionProvider, CompletionResult};

pub const CLAUDE_LOCAL_DEFAULT: &str = "Claude Code CLI (local default)";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeEvent {
    StreamEvent { event: InnerEvent },
    Assistant { message: AssistantMessage },
    Result {
        #[serde(default)]
        result: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InnerEvent {
    ContentBlockDelta { delta: BlockDelta },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    model: Option<String>,
}

/// Accumulated view of a `stream-json` run
#[derive(Debug, Default)]
pub struct ClaudeStreamState {
    pub text_so_far: String,
    pub result_text: Option<String>,
    pub cli_model: Option<String>,
}

impl ClaudeStreamState {
    /// Apply one NDJSON line; lines that are not JSON events are ignored
    pub fn apply_line(&mut self, line: &str, options: &CompletionOptions) {
        if line.is_empty() {
            return;
        }
        let Ok(event) = serde_json::from_str::<ClaudeEvent>(line) else {
            tracing::trace!(line, "skipping non-event output");
            return;
        };

        match event {
            ClaudeEvent::StreamEvent {
                event: InnerEvent::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                },
            } => {
                self.text_so_far.push_str(&text);
                options.emit(&self.text_so_far);
            }
            ClaudeEvent::Assistant { message } => {
                if let Some(text) = message
                    .content
                    .first()
                    .and_then(|block| block.get("text"))
                    .and_then(Value::as_str)
                {
                    self.text_so_far = text.to_string();
                    options.emit(&self.text_so_far);
                }
                if let Some(model) = message.model {
                    self.cli_model = Some(model);
                }
            }
            ClaudeEvent::Result { result: Some(result) } => {
                self.result_text = Some(result);
            }
            _ => {}
        }
    }

    /// The result event wins over streamed text when it is non-empty
    pub fn content(&self) -> String {
        match &self.result_text {
            Some(result) if !result.is_empty() => result.clone(),
            _ => self.text_so_far.clone(),
        }
    }

    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match (self.cli_model.as_deref().filter(|m| !m.is_empty() && *m != "claude"), requested) {
            (Some(cli), Some(_)) => cli.to_string(),
            (Some(cli), None) => format!("{} (local default)", cli),
            (None, Some(requested)) => requested.to_string(),
            (None, None) => CLAUDE_LOCAL_DEFAULT.to_string(),
        }
    }
}

/// Streaming provider over `claude -p --output-format stream-json`
pub struct ClaudeCliProvider {
    config: CliConfig,
    shell_env: Arc<ShellEnv>,
}

impl ClaudeCliProvider {
    pub fn new(config: CliConfig, shell_env: Arc<ShellEnv>) -> Self {
        Self { config, shell_env }
    }

    pub fn build_args(messages: &[Message], options: &CompletionOptions) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-p".to_string(),
            format_single_or_transcript(messages),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--include-partial-messages".to_string(),
        ];

        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(system) = combined_system_prompt(options.system_prompt.as_deref(), messages) {
            args.push("--system-prompt".to_string());
            args.push(system);
        }

        args
    }
}

#[async_trait]
impl CompletionProvider for ClaudeCliProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ClaudeCli
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResult> {
        let label = self.config.command_label();
        let args = Self::build_args(messages, &options);
        let mut command = build_command(&self.config, &self.shell_env, &args).await;

        tracing::debug!(command = %label, "running claude cli");

        let mut child = command.spawn().map_err(|e| ProviderError::CliLaunch {
            command: self.config.executable.display().to_string(),
            message: e.to_string(),
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Stream(format!("{}: stdout not captured", label)))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::Stream(format!("{}: stderr not captured", label)))?;

        let stderr_task = tokio::spawn(async move {
            let mut bytes = Vec::new();
            let _ = stderr.read_to_end(&mut bytes).await;
            String::from_utf8_lossy(&bytes).into_owned()
        });

        let mut state = ClaudeStreamState::default();
        let run = async {
            let mut buffer = CircularLineBuffer::with_capacity(8192);
            let mut chunk = vec![0u8; 8192];

            loop {
                let n = stdout
                    .read(&mut chunk)
                    .await
                    .map_err(|e| ProviderError::Stream(format!("{}: {}", label, e)))?;
                if n == 0 {
                    break;
                }
                buffer.extend(&chunk[..n]);
                while let Some(line) = buffer.next_line() {
                    if let Ok(line) = line {
                        state.apply_line(&line, &options);
                    }
                }
            }
            if let Some(Ok(rest)) = buffer.take_remainder() {
                state.apply_line(&rest, &options);
            }

            child
                .wait()
                .await
                .map_err(|e| ProviderError::Stream(format!("{}: {}", label, e)))
        };

        let outcome = tokio::time::timeout(self.config.timeout, run).await;
        let status = match outcome {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(ProviderError::CliTimeout {
                    command: label,
                    seconds: self.config.timeout.as_secs(),
                });
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(ProviderError::cli_exit(label, status.code(), &stderr));
        }

        Ok(CompletionResult {
            content: state.content(),
            model: state.resolve_model(options.model.as_deref()),
            used_web_search: None,
        })
    }
}
