//! Allow-list and argument sanitization for git invocations.

use std::collections::BTreeSet;

use repolens_core::LensError;

/// Longest argument accepted, in characters.
pub const MAX_ARG_LEN: usize = 4096;

const STANDARD_COMMANDS: [&str; 8] = [
    "log",
    "shortlog",
    "branch",
    "rev-list",
    "rev-parse",
    "config",
    "status",
    "version",
];

/// Which git subcommands may run and how arguments are vetted.
///
/// A policy is an immutable value handed to the executor at construction;
/// there is no process-wide allow-list.
///
/// # Examples
///
/// ```
/// use repolens_exec::CommandPolicy;
///
/// let policy = CommandPolicy::standard();
/// assert!(policy.check_command("log").is_ok());
/// assert!(policy.check_command("push").is_err());
/// assert!(policy.check_command("init").is_err());
/// assert!(CommandPolicy::with_fixtures().check_command("init").is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPolicy {
    allowed: BTreeSet<String>,
    max_arg_len: usize,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandPolicy {
    /// Read-only history commands.
    pub fn standard() -> Self {
        Self {
            allowed: STANDARD_COMMANDS.iter().map(|c| c.to_string()).collect(),
            max_arg_len: MAX_ARG_LEN,
        }
    }

    /// The standard set plus `init`, for building test repositories.
    pub fn with_fixtures() -> Self {
        let mut policy = Self::standard();
        policy.allowed.insert("init".into());
        policy
    }

    /// Subcommands this policy permits, sorted.
    pub fn allowed_commands(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Reject a subcommand that is not on the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::CommandNotAllowed`].
    pub fn check_command(&self, command: &str) -> Result<(), LensError> {
        if self.allowed.contains(command) {
            Ok(())
        } else {
            Err(LensError::CommandNotAllowed(command.to_string()))
        }
    }

    /// Reject an argument that could smuggle a second command.
    ///
    /// Arguments never pass through a shell, but quoted format strings end up
    /// in hooks, aliases and pagers often enough that these are refused:
    /// NUL bytes, over-long values, line breaks, backticks, `$(`, `${`, `&&`,
    /// and a `;` followed by a command word. A lone `|` is allowed because
    /// the log format uses it as a field separator.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::InvalidArgument`] naming the first problem found.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens_exec::CommandPolicy;
    ///
    /// let policy = CommandPolicy::standard();
    /// assert!(policy.check_arg("--format=%H|%an|%ae").is_ok());
    /// assert!(policy.check_arg("--author=`whoami`").is_err());
    /// assert!(policy.check_arg("--since=2024-01-01; rm -rf /").is_err());
    /// ```
    pub fn check_arg(&self, arg: &str) -> Result<(), LensError> {
        let reject = |reason: &str| LensError::InvalidArgument {
            arg: truncate_for_display(arg),
            reason: reason.to_string(),
        };

        if arg.contains('\0') {
            return Err(reject("contains a NUL byte"));
        }
        if arg.chars().count() > self.max_arg_len {
            return Err(reject(&format!(
                "longer than {} characters",
                self.max_arg_len
            )));
        }
        if arg.contains('\n') || arg.contains('\r') {
            return Err(reject("contains a line break"));
        }
        if arg.contains('`') {
            return Err(reject("contains a backtick"));
        }
        if arg.contains("$(") || arg.contains("${") {
            return Err(reject("contains a shell expansion"));
        }
        if arg.contains("&&") {
            return Err(reject("contains a command separator"));
        }
        if has_chained_command(arg) {
            return Err(reject("contains a chained command"));
        }
        Ok(())
    }

    /// Validate a full invocation before anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns the first command or argument error.
    pub fn check<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<(), LensError> {
        self.check_command(command)?;
        for arg in args {
            self.check_arg(arg.as_ref())?;
        }
        Ok(())
    }
}

/// `;` followed (after optional whitespace) by something that starts a word.
fn has_chained_command(arg: &str) -> bool {
    arg.match_indices(';').any(|(idx, _)| {
        arg[idx + 1..]
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
    })
}

fn truncate_for_display(arg: &str) -> String {
    const SHOWN: usize = 64;
    let cleaned: String = arg
        .chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .take(SHOWN)
        .collect();
    if arg.chars().count() > SHOWN {
        format!("{cleaned}…")
    } else {
        cleaned
    }
}
