use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Budget for every privileged command issued by the panel.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Shell used to obtain a privileged context on a rooted device.
pub const DEFAULT_SHELL: &str = "su";

const EXIT_DIRECTIVE: &str = "exit";
const PREFLIGHT_COMMAND: &str = "echo root-check";

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to launch shell '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Shell {0} pipe unavailable")]
    MissingPipe(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single shell command plus the wall-clock budget it may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: String,
    timeout: Duration,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub timed_out: bool,
}

impl CommandResult {
    /// Exit code zero is not enough: any stderr output counts as failure.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.stderr.is_empty() && !self.timed_out
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        if self.timed_out {
            ExecutionOutcome::TimedOut
        } else if self.is_success() {
            ExecutionOutcome::Success
        } else {
            ExecutionOutcome::Failed
        }
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n").trim().to_string()
    }

    pub fn timed_out() -> Self {
        Self {
            exit_code: -1,
            stdout: Vec::new(),
            stderr: Vec::new(),
            timed_out: true,
        }
    }

    pub fn from_error(error: &ExecutorError) -> Self {
        Self {
            exit_code: -1,
            stdout: Vec::new(),
            stderr: vec![error.to_string()],
            timed_out: false,
        }
    }
}

/// Seam between the panel and whatever actually runs commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, request: &CommandRequest) -> CommandResult;

    /// Trimmed stdout, only when the command succeeded.
    async fn execute_for_output(&self, request: &CommandRequest) -> Option<String> {
        let result = self.execute(request).await;
        if result.is_success() {
            Some(result.stdout_text())
        } else {
            None
        }
    }
}

/// Runs each command in its own privileged shell.
pub struct CommandExecutor {
    shell: String,
}

impl CommandExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Runs a harmless command so the privilege prompt shows up before the
    /// first real toggle.
    pub async fn preflight(&self) -> bool {
        let result = self.execute(&CommandRequest::new(PREFLIGHT_COMMAND)).await;
        let ok = result.is_success();
        if ok {
            tracing::info!("Privileged shell '{}' is available", self.shell);
        } else {
            tracing::warn!(
                "Privileged shell '{}' check failed: exit={} stderr={:?}",
                self.shell,
                result.exit_code,
                result.stderr
            );
        }
        ok
    }

    async fn run(&self, request: &CommandRequest) -> Result<CommandResult, ExecutorError> {
        let mut cmd = Command::new(&self.shell);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down anything the shell started
        #[cfg(unix)]
        {
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let mut child = cmd.spawn().map_err(|source| ExecutorError::Spawn {
            shell: self.shell.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) = (stdin, stdout, stderr) else {
            terminate(&mut child).await;
            return Err(ExecutorError::MissingPipe("stdio"));
        };

        let script = format!("{}\n{}\n", request.command(), EXIT_DIRECTIVE);

        let exchange = async {
            stdin.write_all(script.as_bytes()).await?;
            stdin.flush().await?;
            drop(stdin);

            let mut out = Vec::new();
            let mut err = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            )?;
            Ok::<_, std::io::Error>((status, out, err))
        };

        let outcome = timeout(request.timeout(), exchange).await;
        match outcome {
            Ok(Ok((status, out, err))) => Ok(CommandResult {
                exit_code: status.code().unwrap_or(-1),
                stdout: split_lines(&out),
                stderr: split_lines(&err),
                timed_out: false,
            }),
            Ok(Err(e)) => {
                terminate(&mut child).await;
                Err(ExecutorError::Io(e))
            }
            Err(_) => {
                tracing::error!(
                    "Command '{}' timed out after {:?}",
                    request.command(),
                    request.timeout()
                );
                terminate(&mut child).await;
                Ok(CommandResult::timed_out())
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    async fn execute(&self, request: &CommandRequest) -> CommandResult {
        tracing::debug!("Executing command: {}", request.command());

        let result = match self.run(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Command '{}' could not run: {}", request.command(), e);
                return CommandResult::from_error(&e);
            }
        };

        for line in &result.stderr {
            tracing::warn!("STDERR ({}): {}", request.command(), line);
        }
        tracing::debug!(
            "Command '{}' finished: exit={} outcome={:?}",
            request.command(),
            result.exit_code,
            result.outcome()
        );
        result
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!("Kill after failure returned: {}", e);
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh() -> CommandExecutor {
        CommandExecutor::new("sh")
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        let request = CommandRequest::new("svc wifi enable");
        assert_eq!(request.timeout(), Duration::from_secs(5));
        assert_eq!(request.command(), "svc wifi enable");
    }

    #[test]
    fn test_outcome_classification() {
        let ok = CommandResult {
            exit_code: 0,
            stdout: vec!["1".to_string()],
            stderr: vec![],
            timed_out: false,
        };
        assert_eq!(ok.outcome(), ExecutionOutcome::Success);

        let noisy = CommandResult {
            stderr: vec!["warning".to_string()],
            ..ok.clone()
        };
        assert!(!noisy.is_success());
        assert_eq!(noisy.outcome(), ExecutionOutcome::Failed);

        assert_eq!(CommandResult::timed_out().outcome(), ExecutionOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_successful_command() {
        let result = sh().execute(&CommandRequest::new("echo hello")).await;
        assert!(result.is_success());
        assert_eq!(result.stdout, vec!["hello".to_string()]);
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_stderr_demotes_zero_exit() {
        let result = sh().execute(&CommandRequest::new("echo oops 1>&2")).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stderr, vec!["oops".to_string()]);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let result = sh().execute(&CommandRequest::new("exit 3")).await;
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.outcome(), ExecutionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_execute_for_output_trims() {
        let output = sh()
            .execute_for_output(&CommandRequest::new("printf '  1  \\n'"))
            .await;
        assert_eq!(output, Some("1".to_string()));

        let failed = sh()
            .execute_for_output(&CommandRequest::new("echo 1; echo bad 1>&2"))
            .await;
        assert_eq!(failed, None);
    }

    #[tokio::test]
    async fn test_timeout_reports_and_returns_promptly() {
        let start = Instant::now();
        let request = CommandRequest::new("sleep 30").with_timeout(Duration::from_millis(200));
        let result = sh().execute(&request).await;

        assert!(result.timed_out);
        assert!(!result.is_success());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_failed_result() {
        let executor = CommandExecutor::new("/nonexistent/flipqs-shell");
        let result = executor.execute(&CommandRequest::new("echo hi")).await;
        assert_eq!(result.outcome(), ExecutionOutcome::Failed);
        assert_eq!(result.exit_code, -1);
        assert!(!result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_preflight() {
        assert!(sh().preflight().await);
        assert!(!CommandExecutor::new("/nonexistent/flipqs-shell").preflight().await);
    }
}
