//! Repository access behind a swappable async trait.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use repolens_analytics::aggregate_contributors;
use repolens_core::{AnalysisConfig, Commit, Contributor, ExecutorConfig, LensError, Result};
use repolens_exec::{CommandExecutor, CommandPolicy};
use repolens_parse::{
    parse_branches, parse_commit_count, parse_commit_log, parse_contributors, parse_version,
    LOG_FORMAT,
};
use tracing::debug;

/// History selection pushed down to `git log`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// `--since=YYYY-MM-DD`
    pub since: Option<NaiveDate>,
    /// `--until=YYYY-MM-DD`
    pub until: Option<NaiveDate>,
    /// `--author=<pattern>`, interpreted by git as a regex.
    pub author: Option<String>,
}

impl LogQuery {
    /// Take the window and author pattern from an analysis config.
    pub fn from_analysis(config: &AnalysisConfig) -> Self {
        Self {
            since: config.since,
            until: config.until,
            author: config.author.clone(),
        }
    }

    /// Arguments for `git log`, format contract first.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use repolens::LogQuery;
    ///
    /// let query = LogQuery { since: NaiveDate::from_ymd_opt(2024, 1, 1), ..Default::default() };
    /// let args = query.to_args();
    /// assert_eq!(args[0], "--format=%H|%an|%ae|%ad|%cn|%ce|%cd|%s|%P|%T");
    /// assert_eq!(args.last().map(String::as_str), Some("--since=2024-01-01"));
    /// ```
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--format={LOG_FORMAT}"),
            "--date=iso".to_string(),
            "--numstat".to_string(),
            "--all".to_string(),
        ];
        if let Some(since) = self.since {
            args.push(format!("--since={}", since.format("%Y-%m-%d")));
        }
        if let Some(until) = self.until {
            args.push(format!("--until={}", until.format("%Y-%m-%d")));
        }
        if let Some(author) = &self.author {
            args.push(format!("--author={author}"));
        }
        args
    }
}

/// Read-only operations over one repository.
///
/// [`GitRepository`] runs the git CLI; [`InMemoryRepository`] serves fixed
/// data for tests.
#[async_trait]
pub trait RepositoryOps: Send + Sync {
    /// Commits across all refs, newest first.
    async fn commit_log(&self, query: &LogQuery) -> Result<Vec<Commit>>;

    /// Every commit authored with exactly this email.
    async fn author_commits(&self, email: &str) -> Result<Vec<Commit>>;

    /// Contributor stubs with name, email and commit count only.
    async fn contributors(&self) -> Result<Vec<Contributor>>;

    /// Local and remote branch names.
    async fn branches(&self) -> Result<Vec<String>>;

    /// Commits reachable from `HEAD`.
    async fn commit_count(&self) -> Result<u64>;

    /// Version of the underlying tool.
    async fn tool_version(&self) -> Result<String>;
}

/// [`RepositoryOps`] backed by the git command line.
#[derive(Debug, Clone)]
pub struct GitRepository {
    executor: CommandExecutor,
}

impl GitRepository {
    /// Open the repository containing `path` with the standard policy.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::NotARepository`] if `path` is not inside a git
    /// work tree, or [`LensError::Validation`] for an empty path.
    pub async fn open(path: impl AsRef<Path>, config: &ExecutorConfig) -> Result<Self> {
        let executor = CommandExecutor::new(path, CommandPolicy::standard(), config.clone()).await?;
        Ok(Self { executor })
    }

    /// Wrap an existing executor.
    pub fn from_executor(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// The executor every command runs through.
    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<String> {
        let output = self.executor.execute(command, args, None).await?;
        Ok(output.stdout)
    }
}

fn unrecognized(command: &str, output: &str) -> LensError {
    LensError::Execution {
        command: command.to_string(),
        code: None,
        message: format!("unrecognized output: {:?}", output.trim()),
    }
}

#[async_trait]
impl RepositoryOps for GitRepository {
    async fn commit_log(&self, query: &LogQuery) -> Result<Vec<Commit>> {
        let stdout = self.run("log", &query.to_args()).await?;
        let commits = parse_commit_log(&stdout);
        debug!(commits = commits.len(), "read commit log");
        Ok(commits)
    }

    async fn author_commits(&self, email: &str) -> Result<Vec<Commit>> {
        let mut args = LogQuery::default().to_args();
        args.push("--fixed-strings".to_string());
        args.push(format!("--author=<{email}>"));

        let stdout = self.run("log", &args).await?;
        // `--author` matches "Name <email>" by substring, so re-check exactly.
        Ok(parse_commit_log(&stdout)
            .into_iter()
            .filter(|c| c.author.email == email)
            .collect())
    }

    async fn contributors(&self) -> Result<Vec<Contributor>> {
        let args = ["-sne", "--all", "HEAD"].map(String::from);
        let stdout = self.run("shortlog", &args).await?;
        Ok(parse_contributors(&stdout))
    }

    async fn branches(&self) -> Result<Vec<String>> {
        let stdout = self.run("branch", &["-a".to_string()]).await?;
        Ok(parse_branches(&stdout))
    }

    async fn commit_count(&self) -> Result<u64> {
        let args = ["--count", "HEAD"].map(String::from);
        let stdout = self.run("rev-list", &args).await?;
        parse_commit_count(&stdout).ok_or_else(|| unrecognized("rev-list", &stdout))
    }

    async fn tool_version(&self) -> Result<String> {
        let stdout = self.run("version", &[]).await?;
        parse_version(&stdout).ok_or_else(|| unrecognized("version", &stdout))
    }
}

/// [`RepositoryOps`] over a fixed commit list.
///
/// Author lookups for emails registered with
/// [`fail_author`](Self::fail_author) return an execution error, which lets
/// tests exercise partial enhancement failures.
///
/// # Examples
///
/// ```
/// use repolens::{InMemoryRepository, RepositoryOps};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let repo = InMemoryRepository::new(Vec::new()).fail_author("bad@example.com");
/// assert!(repo.author_commits("bad@example.com").await.is_err());
/// assert_eq!(repo.commit_count().await.unwrap(), 0);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    commits: Vec<Commit>,
    branches: Vec<String>,
    failing_authors: HashSet<String>,
}

impl InMemoryRepository {
    /// Serve `commits` as the whole history, with a single `main` branch.
    pub fn new(commits: Vec<Commit>) -> Self {
        Self {
            commits,
            branches: vec!["main".to_string()],
            failing_authors: HashSet::new(),
        }
    }

    /// Replace the branch list.
    pub fn with_branches(mut self, branches: Vec<String>) -> Self {
        self.branches = branches;
        self
    }

    /// Make author lookups for `email` fail.
    pub fn fail_author(mut self, email: impl Into<String>) -> Self {
        self.failing_authors.insert(email.into());
        self
    }
}

#[async_trait]
impl RepositoryOps for InMemoryRepository {
    async fn commit_log(&self, query: &LogQuery) -> Result<Vec<Commit>> {
        Ok(self
            .commits
            .iter()
            .filter(|c| query.since.map_or(true, |s| c.author_day() >= s))
            .filter(|c| query.until.map_or(true, |u| c.author_day() <= u))
            .filter(|c| {
                query.author.as_deref().map_or(true, |a| {
                    format!("{} <{}>", c.author.name, c.author.email).contains(a)
                })
            })
            .cloned()
            .collect())
    }

    async fn author_commits(&self, email: &str) -> Result<Vec<Commit>> {
        if self.failing_authors.contains(email) {
            return Err(LensError::Execution {
                command: "log".to_string(),
                code: Some(128),
                message: format!("lookup failed for {email}"),
            });
        }
        Ok(self
            .commits
            .iter()
            .filter(|c| c.author.email == email)
            .cloned()
            .collect())
    }

    async fn contributors(&self) -> Result<Vec<Contributor>> {
        Ok(aggregate_contributors(&self.commits)
            .into_iter()
            .map(|full| {
                let mut stub = Contributor::new(full.name, full.email);
                stub.total_commits = full.total_commits;
                stub
            })
            .collect())
    }

    async fn branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.clone())
    }

    async fn commit_count(&self) -> Result<u64> {
        Ok(self.commits.len() as u64)
    }

    async fn tool_version(&self) -> Result<String> {
        Ok("in-memory".to_string())
    }
}
