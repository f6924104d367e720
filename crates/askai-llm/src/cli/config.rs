use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(120);

/// How to launch one CLI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub executable: PathBuf,
    /// Defaults to the home directory
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    /// Prepended to `PATH` when missing from it
    pub extra_path_dirs: Vec<PathBuf>,
}

pub(crate) fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_path_dirs(home: &std::path::Path) -> Vec<PathBuf> {
    vec![
        home.join("n/bin"),
        home.join(".local/bin"),
        PathBuf::from("/usr/local/bin"),
    ]
}

impl CliConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            timeout: DEFAULT_CLI_TIMEOUT,
            extra_path_dirs: default_path_dirs(&home_dir()),
        }
    }

    /// `~/n/bin/codex`
    pub fn codex() -> Self {
        Self::new(home_dir().join("n/bin/codex"))
    }

    /// `~/.local/bin/claude`
    pub fn claude() -> Self {
        Self::new(home_dir().join(".local/bin/claude"))
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra_path_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.extra_path_dirs = dirs;
        self
    }

    pub fn working_dir(&self) -> PathBuf {
        self.working_dir.clone().unwrap_or_else(home_dir)
    }

    pub(crate) fn command_label(&self) -> String {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable.display().to_string())
    }
}
