//! `wg` command-line tool as a key source

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::KeygenError;

use super::KeyTool;

/// Upper bound on a single `wg` invocation
pub const DEFAULT_KEYGEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `wg genkey` and `wg pubkey`
#[derive(Debug, Clone)]
pub struct WgTool {
    program: PathBuf,
    timeout: Duration,
}

impl Default for WgTool {
    fn default() -> Self {
        Self::new("wg", DEFAULT_KEYGEN_TIMEOUT)
    }
}

impl WgTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run `wg <subcommand>`, optionally feeding stdin, and return trimmed stdout
    async fn run(&self, subcommand: &str, input: Option<&str>) -> Result<String, KeygenError> {
        let command = format!("{} {}", self.program.display(), subcommand);
        tracing::debug!("Running `{}`", command);

        let mut child = Command::new(&self.program)
            .arg(subcommand)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| KeygenError::Spawn {
                command: command.clone(),
                source,
            })?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|source| KeygenError::Spawn {
                    command: command.clone(),
                    source,
                })?;
            // Close stdin so `wg pubkey` sees EOF
            drop(stdin);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| KeygenError::Timeout {
                command: command.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|source| KeygenError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(KeygenError::Exit {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match String::from_utf8(output.stdout) {
            Ok(stdout) if !stdout.trim().is_empty() => Ok(stdout.trim().to_string()),
            _ => Err(KeygenError::EmptyOutput { command }),
        }
    }
}

#[async_trait]
impl KeyTool for WgTool {
    async fn generate_key(&self) -> Result<String, KeygenError> {
        self.run("genkey", None).await
    }

    async fn derive_public_key(&self, private_key: &str) -> Result<String, KeygenError> {
        self.run("pubkey", Some(private_key)).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary() {
        let tool = WgTool::new("/nonexistent/wg-binary", DEFAULT_KEYGEN_TIMEOUT);
        let err = tool.generate_key().await.unwrap_err();
        assert!(matches!(err, KeygenError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        // `false` ignores its arguments and exits 1
        let tool = WgTool::new("false", DEFAULT_KEYGEN_TIMEOUT);
        let err = tool.generate_key().await.unwrap_err();
        assert!(matches!(err, KeygenError::Exit { .. }));
    }

    #[tokio::test]
    async fn test_empty_output() {
        // `true` exits 0 without printing anything
        let tool = WgTool::new("true", DEFAULT_KEYGEN_TIMEOUT);
        let err = tool.generate_key().await.unwrap_err();
        assert!(matches!(err, KeygenError::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        // `echo genkey` prints its argument
        let tool = WgTool::new("echo", DEFAULT_KEYGEN_TIMEOUT);
        assert_eq!(tool.generate_key().await.unwrap(), "genkey");
    }
}
