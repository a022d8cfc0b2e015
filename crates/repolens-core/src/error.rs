use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur across the repolens pipeline.
///
/// Library crates return this type directly. Callers that need a coarse
/// classification (for exit codes, say) use [`LensError::kind`].
///
/// Parsers never produce these: malformed git output is dropped line by
/// line rather than reported.
///
/// # Examples
///
/// ```
/// use repolens_core::{ErrorKind, LensError};
///
/// let err = LensError::CommandNotAllowed("push".into());
/// assert!(err.to_string().contains("push"));
/// assert_eq!(err.kind(), ErrorKind::Validation);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Invalid input: empty repository path, bad date range, bad option value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The git subcommand is not on the executor's allow-list.
    #[error("command not allowed: {0}")]
    CommandNotAllowed(String),

    /// A process argument failed sanitization.
    #[error("invalid argument {arg:?}: {reason}")]
    InvalidArgument {
        /// The offending argument, truncated for display.
        arg: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A regex or glob failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern as supplied.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// The working directory is not inside a git repository.
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The process could not be spawned or exited unsuccessfully.
    #[error("git {command} failed{}: {message}", code_suffix(.code))]
    Execution {
        /// The git subcommand.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Trimmed stderr or spawn error.
        message: String,
    },

    /// The process outlived its deadline and was killed.
    #[error("git {command} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// The git subcommand.
        command: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// Captured output exceeded the configured byte cap.
    #[error("git {command} produced more than {limit} bytes of output")]
    OutputTooLarge {
        /// The git subcommand.
        command: String,
        /// The configured cap.
        limit: usize,
    },

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

/// Coarse classification of a [`LensError`].
///
/// # Examples
///
/// ```
/// use repolens_core::{ErrorKind, LensError};
/// use std::time::Duration;
///
/// let err = LensError::Timeout { command: "log".into(), timeout: Duration::from_secs(1) };
/// assert_eq!(err.kind(), ErrorKind::Timeout);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input: paths, commands, arguments, patterns, ranges.
    Validation,
    /// Working directory is not a repository.
    NotARepository,
    /// Spawn failure, nonzero exit, or oversized output.
    Execution,
    /// Deadline exceeded.
    Timeout,
    /// Configuration could not be parsed.
    Config,
    /// Local I/O failure.
    Io,
}

impl LensError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LensError::Validation(_)
            | LensError::CommandNotAllowed(_)
            | LensError::InvalidArgument { .. }
            | LensError::InvalidPattern { .. } => ErrorKind::Validation,
            LensError::NotARepository(_) => ErrorKind::NotARepository,
            LensError::Execution { .. } | LensError::OutputTooLarge { .. } => ErrorKind::Execution,
            LensError::Timeout { .. } => ErrorKind::Timeout,
            LensError::Toml(_) => ErrorKind::Config,
            LensError::Io(_) => ErrorKind::Io,
        }
    }
}
