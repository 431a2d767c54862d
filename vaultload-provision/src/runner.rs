//! Execution of single commands through the external CLI

use async_trait::async_trait;
use tracing::debug;
use vaultload_config::CliConfig;

use crate::command::Command;
use crate::error::CommandError;

/// Executes one command and returns its captured output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &Command) -> Result<Vec<u8>, CommandError>;
}

/// Runs commands as `<binary> <args...> --config <file>`
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: String,
    config_file: String,
}

impl CliRunner {
    pub fn new(binary: impl Into<String>, config_file: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            config_file: config_file.into(),
        }
    }

    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(&config.binary, &config.config_file)
    }

    /// Full argument list including the trailing config flag
    pub fn invocation_args(&self, command: &Command) -> Vec<String> {
        let mut args = command.args();
        args.push("--config".to_string());
        args.push(self.config_file.clone());
        args
    }

    fn render(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(&self, command: &Command) -> Result<Vec<u8>, CommandError> {
        let args = self.invocation_args(command);
        debug!("Running {}", self.render(&args));

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: self.render(&args),
                source,
            })?;

        // stdout followed by stderr
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if !output.status.success() {
            return Err(CommandError::NonZeroExit {
                command: self.render(&args),
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&combined).into_owned(),
            });
        }

        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_is_appended() {
        let runner = CliRunner::new("thy", ".thy.yml");
        let args = runner.invocation_args(&Command::raw(["auth", "clear"]));
        assert_eq!(args, vec!["auth", "clear", "--config", ".thy.yml"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_invocation_captures_output() {
        let runner = CliRunner::new("echo", "cfg.yml");
        let output = runner.run(&Command::raw(["hello"])).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output).trim(), "hello --config cfg.yml");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let runner = CliRunner::new("false", "cfg.yml");
        let err = runner.run(&Command::raw(["x"])).await.unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let runner = CliRunner::new("/nonexistent/vaultload-cli-binary", "cfg.yml");
        let err = runner.run(&Command::raw(["x"])).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
