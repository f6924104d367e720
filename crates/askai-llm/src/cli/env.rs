use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;

const SHELL_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Variables that only exist in the user's interactive shell
///
/// Looked up once on first use and cached for the lifetime of the value;
/// share one instance between providers so the shell runs once per process.
#[derive(Debug)]
pub struct ShellEnv {
    shell: Option<String>,
    names: Vec<String>,
    cache: OnceCell<HashMap<String, String>>,
}

impl ShellEnv {
    pub fn new(shell: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            shell: Some(shell.into()),
            names,
            cache: OnceCell::new(),
        }
    }

    /// `zsh` login shell importing the Claude OAuth token
    pub fn login_shell() -> Self {
        Self::new("zsh", vec!["CLAUDE_CODE_OAUTH_TOKEN".to_string()])
    }

    /// Never spawns a shell
    pub fn disabled() -> Self {
        Self {
            shell: None,
            names: Vec::new(),
            cache: OnceCell::new(),
        }
    }

    pub async fn vars(&self) -> &HashMap<String, String> {
        self.cache.get_or_init(|| self.fetch()).await
    }

    async fn fetch(&self) -> HashMap<String, String> {
        let mut found = HashMap::new();
        let Some(shell) = &self.shell else {
            return found;
        };

        for name in &self.names {
            if std::env::var_os(name).is_some() {
                continue;
            }
            if let Some(value) = lookup(shell, name).await {
                tracing::debug!(variable = %name, "imported variable from login shell");
                found.insert(name.clone(), value);
            }
        }

        found
    }
}

async fn lookup(shell: &str, name: &str) -> Option<String> {
    let script = format!("echo \"${{{}}}\"", name);
    let mut command = Command::new(shell);
    command.arg("-ilc").arg(script).kill_on_drop(true);

    match tokio::time::timeout(SHELL_LOOKUP_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => {
            let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!value.is_empty()).then_some(value)
        }
        Ok(Err(e)) => {
            tracing::debug!(variable = %name, error = %e, "login shell lookup failed");
            None
        }
        Err(_) => {
            tracing::debug!(variable = %name, "login shell lookup timed out");
            None
        }
    }
}

/// Prefix `current` with the directories of `extra` it does not already contain
pub fn augmented_path(current: &OsString, extra: &[PathBuf]) -> OsString {
    let existing: Vec<PathBuf> = std::env::split_paths(current).collect();
    let missing = extra.iter().filter(|dir| !existing.contains(dir)).cloned();

    std::env::join_paths(missing.chain(existing.iter().cloned())).unwrap_or_else(|_| current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augmented_path_only_adds_missing_dirs() {
        let current = OsString::from("/usr/bin:/usr/local/bin");
        let extra = vec![PathBuf::from("/opt/tool/bin"), PathBuf::from("/usr/local/bin")];

        assert_eq!(
            augmented_path(&current, &extra),
            OsString::from("/opt/tool/bin:/usr/bin:/usr/local/bin")
        );
    }

    #[tokio::test]
    async fn test_disabled_shell_env_is_empty() {
        let env = ShellEnv::disabled();
        assert!(env.vars().await.is_empty());
    }
}
