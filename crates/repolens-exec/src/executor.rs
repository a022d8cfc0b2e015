//! Bounded execution of a single git subcommand.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use repolens_core::{ExecutorConfig, LensError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::policy::CommandPolicy;

/// How a finished process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code; `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8.
    pub stderr: String,
    /// Exit status details.
    pub exit: ExitInfo,
}

/// Runs allow-listed git subcommands inside one repository.
///
/// The working directory is fixed at construction and verified with
/// `git rev-parse --git-dir`. Each [`execute`](Self::execute) call spawns
/// exactly one process, so a shared executor can serve concurrent callers.
///
/// # Examples
///
/// ```no_run
/// use repolens_core::ExecutorConfig;
/// use repolens_exec::{CommandExecutor, CommandPolicy};
///
/// # async fn run() -> repolens_core::Result<()> {
/// let executor =
///     CommandExecutor::new(".", CommandPolicy::standard(), ExecutorConfig::default()).await?;
/// let out = executor.execute("rev-list", &["--count", "HEAD"], None).await?;
/// println!("{} commits", out.stdout.trim());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    workdir: PathBuf,
    policy: CommandPolicy,
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Bind an executor to the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] for an empty path and
    /// [`LensError::NotARepository`] if `path` is not a directory or the
    /// `rev-parse` check fails for any reason.
    pub async fn new(
        path: impl AsRef<Path>,
        policy: CommandPolicy,
        config: ExecutorConfig,
    ) -> Result<Self, LensError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LensError::Validation("repository path is empty".into()));
        }
        if !path.is_dir() {
            return Err(LensError::NotARepository(path.to_path_buf()));
        }

        let executor = Self {
            workdir: path.to_path_buf(),
            policy,
            config,
        };

        match executor.execute("rev-parse", &["--git-dir"], None).await {
            Ok(_) => Ok(executor),
            Err(LensError::Execution { message, .. }) => {
                debug!(path = %path.display(), %message, "rev-parse check failed");
                Err(LensError::NotARepository(path.to_path_buf()))
            }
            Err(e) => Err(e),
        }
    }

    /// Directory every command runs in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The policy this executor enforces.
    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    /// Limits in effect.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `git <command> <args...>` and capture its output.
    ///
    /// `timeout` overrides the configured default for this call only. The
    /// command and every argument are validated before a process exists.
    ///
    /// # Errors
    ///
    /// - [`LensError::CommandNotAllowed`] / [`LensError::InvalidArgument`]
    ///   from the policy, with nothing spawned
    /// - [`LensError::Execution`] if spawning fails or the exit code is nonzero
    /// - [`LensError::Timeout`] if the deadline passes; the child is killed
    /// - [`LensError::OutputTooLarge`] if either stream exceeds the byte cap;
    ///   the child is killed
    pub async fn execute<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, LensError> {
        self.policy.check(command, args)?;

        let deadline = timeout.unwrap_or_else(|| self.config.timeout());
        let limit = self.config.max_output_bytes;

        // An already-expired deadline never spawns.
        if deadline.is_zero() {
            return Err(timed_out(command, deadline));
        }

        let mut cmd = Command::new(&self.config.program);
        cmd.arg(command)
            .args(args.iter().map(AsRef::as_ref))
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_PAGER", "cat")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            program = %self.config.program,
            command,
            args = args.len(),
            timeout_ms = deadline.as_millis() as u64,
            "spawning"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| LensError::Execution {
            command: command.to_string(),
            code: None,
            message: format!("failed to spawn {}: {e}", self.config.program),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let run = async {
            let (out, err) = tokio::try_join!(
                read_capped(stdout, limit, command),
                read_capped(stderr, limit, command)
            )?;
            let status = child.wait().await?;
            Ok::<_, LensError>((out, err, status))
        };

        let outcome = tokio::time::timeout(deadline, run).await;
        let (stdout, stderr, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                if matches!(e, LensError::OutputTooLarge { .. }) {
                    warn!(command, limit, "output cap exceeded, killing git");
                }
                let _ = child.start_kill();
                return Err(e);
            }
            Err(_) => {
                warn!(
                    command,
                    timeout_ms = deadline.as_millis() as u64,
                    "deadline exceeded, killing git"
                );
                let _ = child.start_kill();
                return Err(timed_out(command, deadline));
            }
        };

        let exit = ExitInfo {
            code: status.code(),
            elapsed: started.elapsed(),
        };
        // The timer has millisecond resolution, so a process can finish just
        // past its deadline without the timeout firing.
        if exit.elapsed > deadline {
            warn!(
                command,
                elapsed_ms = exit.elapsed.as_millis() as u64,
                "finished after deadline"
            );
            return Err(timed_out(command, deadline));
        }
        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            return Err(LensError::Execution {
                command: command.to_string(),
                code: exit.code,
                message: stderr.trim().to_string(),
            });
        }

        debug!(
            command,
            bytes = stdout.len(),
            elapsed_ms = exit.elapsed.as_millis() as u64,
            "finished"
        );

        Ok(CommandOutput {
            stdout,
            stderr,
            exit,
        })
    }
}

fn timed_out(command: &str, deadline: Duration) -> LensError {
    LensError::Timeout {
        command: command.to_string(),
        timeout: deadline,
    }
}

async fn read_capped<R>(
    reader: Option<R>,
    limit: usize,
    command: &str,
) -> Result<Vec<u8>, LensError>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(LensError::OutputTooLarge {
                command: command.to_string(),
                limit,
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_path_is_validation_error() {
        let err = CommandExecutor::new("", CommandPolicy::standard(), ExecutorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_directory_is_not_a_repository() {
        let err = CommandExecutor::new(
            "/definitely/not/here/repolens",
            CommandPolicy::standard(),
            ExecutorConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LensError::NotARepository(_)));
    }

    #[tokio::test]
    async fn policy_runs_before_spawn() {
        // A program that cannot exist proves nothing was spawned: the
        // policy error comes back instead of a spawn failure.
        let executor = CommandExecutor {
            workdir: std::env::temp_dir(),
            policy: CommandPolicy::standard(),
            config: ExecutorConfig {
                program: "/nonexistent/repolens-git".into(),
                ..ExecutorConfig::default()
            },
        };

        let err = executor.execute("push", &["origin"], None).await.unwrap_err();
        assert!(matches!(err, LensError::CommandNotAllowed(_)));

        let err = executor.execute("log", &["--author=`id`"], None).await.unwrap_err();
        assert!(matches!(err, LensError::InvalidArgument { .. }));

        let err = executor.execute("log", &["--all"], None).await.unwrap_err();
        assert!(matches!(err, LensError::Execution { code: None, .. }));
    }

    /// A directory where `sh <subcommand>` runs a script named after the
    /// subcommand, standing in for git.
    fn scripted(scripts: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in scripts {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    fn sh_config() -> ExecutorConfig {
        ExecutorConfig {
            program: "sh".into(),
            ..ExecutorConfig::default()
        }
    }

    #[tokio::test]
    async fn failed_git_dir_check_is_not_a_repository() {
        let dir = scripted(&[(
            "rev-parse",
            "echo 'fatal: not a git repository' >&2; exit 128\n",
        )]);
        let err = CommandExecutor::new(dir.path(), CommandPolicy::standard(), sh_config())
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::NotARepository(_)));
    }

    #[tokio::test]
    async fn deadline_kills_slow_process() {
        let dir = scripted(&[("rev-parse", "echo .git\n"), ("log", "sleep 5\n")]);
        let executor = CommandExecutor::new(dir.path(), CommandPolicy::standard(), sh_config())
            .await
            .unwrap();

        let started = Instant::now();
        let err = executor
            .execute("log", &["--all"], Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn zero_deadline_times_out_without_running() {
        let dir = scripted(&[
            ("rev-parse", "echo .git\n"),
            ("log", "touch ran; echo hi\n"),
        ]);
        let executor = CommandExecutor::new(dir.path(), CommandPolicy::standard(), sh_config())
            .await
            .unwrap();

        let err = executor
            .execute("log", &["--all"], Some(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Timeout { .. }), "{err:?}");
        assert_eq!(err.kind(), repolens_core::ErrorKind::Timeout);
        assert!(!dir.path().join("ran").exists());
    }

    #[tokio::test]
    async fn fast_exit_past_deadline_is_timeout() {
        let dir = scripted(&[("rev-parse", "echo .git\n"), ("log", "echo hi\n")]);
        let executor = CommandExecutor::new(dir.path(), CommandPolicy::standard(), sh_config())
            .await
            .unwrap();

        let err = executor
            .execute("log", &["--all"], Some(Duration::from_nanos(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Timeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn per_call_timeout_overrides_default() {
        let dir = scripted(&[("rev-parse", "echo .git\n"), ("log", "sleep 1; echo done\n")]);
        let config = ExecutorConfig {
            timeout_secs: 1,
            ..sh_config()
        };
        let executor = CommandExecutor::new(dir.path(), CommandPolicy::standard(), config)
            .await
            .unwrap();

        let out = executor
            .execute("log", &["--all"], Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "done");
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let dir = scripted(&[
            ("rev-parse", "echo .git\n"),
            ("log", "echo '  boom  ' >&2; exit 3\n"),
        ]);
        let executor = CommandExecutor::new(dir.path(), CommandPolicy::standard(), sh_config())
            .await
            .unwrap();

        let err = executor.execute::<&str>("log", &[], None).await.unwrap_err();
        match err {
            LensError::Execution { code, message, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(message, "boom");
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_capped_enforces_limit() {
        let data: &[u8] = b"0123456789";
        let ok = read_capped(Some(data), 10, "log").await.unwrap();
        assert_eq!(ok.len(), 10);

        let err = read_capped(Some(data), 9, "log").await.unwrap_err();
        assert!(matches!(err, LensError::OutputTooLarge { limit: 9, .. }));

        let none: Option<&[u8]> = None;
        assert!(read_capped(none, 1, "log").await.unwrap().is_empty());
    }
}
