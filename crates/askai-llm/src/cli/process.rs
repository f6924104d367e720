use std::process::Stdio;
use tokio::process::Command;

use super::config::CliConfig;
use super::env::{augmented_path, ShellEnv};

/// Command with working directory, augmented `PATH`, imported shell
/// variables and piped output. The child dies with the handle.
pub(crate) async fn build_command(config: &CliConfig, shell_env: &ShellEnv, args: &[String]) -> Command {
    let mut command = Command::new(&config.executable);
    command
        .args(args)
        .current_dir(config.working_dir())
        .envs(shell_env.vars().await)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let current = std::env::var_os("PATH").unwrap_or_default();
    command.env("PATH", augmented_path(&current, &config.extra_path_dirs));

    command
}
