//! Individual commit predicates.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use repolens_core::{AuthorMatch, Commit, LensError, MessageMatch, SizeBounds};

/// A predicate over commits with a human-readable description.
///
/// Filters are stateless after construction and safe to share across
/// threads. The only exception to pure per-commit testing is the cap
/// reported by [`limit`](CommitFilter::limit), which [`crate::FilterChain`]
/// applies once all predicates have run.
pub trait CommitFilter: Send + Sync {
    /// Whether `commit` passes this filter.
    fn matches(&self, commit: &Commit) -> bool;

    /// One-line description for display.
    fn describe(&self) -> String;

    /// Maximum number of commits to keep, if this filter caps the result.
    fn limit(&self) -> Option<usize> {
        None
    }
}

/// Keeps commits whose author day falls in an inclusive window.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use repolens_filter::{CommitFilter, DateRangeFilter};
///
/// let f = DateRangeFilter::new(NaiveDate::from_ymd_opt(2024, 1, 1), None).unwrap();
/// assert_eq!(f.describe(), "date: since 2024-01-01");
/// ```
#[derive(Debug, Clone)]
pub struct DateRangeFilter {
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl DateRangeFilter {
    /// Create a date filter.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] if `since` is after `until`.
    pub fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Self, LensError> {
        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                return Err(LensError::Validation(format!(
                    "date filter starts after it ends: {s} > {u}"
                )));
            }
        }
        Ok(Self { since, until })
    }
}

impl CommitFilter for DateRangeFilter {
    fn matches(&self, commit: &Commit) -> bool {
        let day = commit.author_day();
        self.since.map_or(true, |s| day >= s) && self.until.map_or(true, |u| day <= u)
    }

    fn describe(&self) -> String {
        match (self.since, self.until) {
            (Some(s), Some(u)) => format!("date: {s} to {u}"),
            (Some(s), None) => format!("date: since {s}"),
            (None, Some(u)) => format!("date: until {u}"),
            (None, None) => "date: any".into(),
        }
    }
}

/// How a text pattern is compared once compiled.
#[derive(Debug, Clone)]
enum TextMatcher {
    Exact(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(Regex),
}

impl TextMatcher {
    fn is_match(&self, text: &str, case_sensitive: bool) -> bool {
        let folded;
        let text = if case_sensitive || matches!(self, TextMatcher::Regex(_)) {
            text
        } else {
            folded = text.to_lowercase();
            folded.as_str()
        };
        match self {
            TextMatcher::Exact(p) => text == p,
            TextMatcher::Contains(p) => text.contains(p.as_str()),
            TextMatcher::StartsWith(p) => text.starts_with(p.as_str()),
            TextMatcher::EndsWith(p) => text.ends_with(p.as_str()),
            TextMatcher::Regex(re) => re.is_match(text),
        }
    }
}

fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, LensError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| LensError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn fold(pattern: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        pattern.to_string()
    } else {
        pattern.to_lowercase()
    }
}

fn sensitivity(case_sensitive: bool) -> &'static str {
    if case_sensitive {
        ""
    } else {
        " (case-insensitive)"
    }
}

/// Keeps commits whose author name or email matches a pattern.
///
/// # Examples
///
/// ```
/// use repolens_core::AuthorMatch;
/// use repolens_filter::{AuthorFilter, CommitFilter};
///
/// let f = AuthorFilter::new("@Example.com", AuthorMatch::EmailDomain, false).unwrap();
/// assert_eq!(f.describe(), "author email domain 'Example.com' (case-insensitive)");
/// assert!(AuthorFilter::new("(", AuthorMatch::Regex, true).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct AuthorFilter {
    pattern: String,
    mode: AuthorMatch,
    case_sensitive: bool,
    matcher: TextMatcher,
}

impl AuthorFilter {
    /// Compile an author filter.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] for an empty pattern and
    /// [`LensError::InvalidPattern`] if a regex does not compile.
    pub fn new(pattern: &str, mode: AuthorMatch, case_sensitive: bool) -> Result<Self, LensError> {
        if pattern.trim().is_empty() {
            return Err(LensError::Validation("author pattern is empty".into()));
        }
        let pattern = match mode {
            AuthorMatch::EmailDomain => pattern.trim().trim_start_matches('@').to_string(),
            _ => pattern.to_string(),
        };
        let matcher = match mode {
            AuthorMatch::Exact | AuthorMatch::EmailDomain => {
                TextMatcher::Exact(fold(&pattern, case_sensitive))
            }
            AuthorMatch::Contains => TextMatcher::Contains(fold(&pattern, case_sensitive)),
            AuthorMatch::Regex => TextMatcher::Regex(compile_regex(&pattern, case_sensitive)?),
        };
        Ok(Self {
            pattern,
            mode,
            case_sensitive,
            matcher,
        })
    }
}

impl CommitFilter for AuthorFilter {
    fn matches(&self, commit: &Commit) -> bool {
        let author = &commit.author;
        match self.mode {
            AuthorMatch::EmailDomain => author
                .email
                .rsplit_once('@')
                .is_some_and(|(_, domain)| self.matcher.is_match(domain, self.case_sensitive)),
            _ => {
                self.matcher.is_match(&author.name, self.case_sensitive)
                    || self.matcher.is_match(&author.email, self.case_sensitive)
            }
        }
    }

    fn describe(&self) -> String {
        let verb = match self.mode {
            AuthorMatch::Exact => "is",
            AuthorMatch::Contains => "contains",
            AuthorMatch::Regex => "matches",
            AuthorMatch::EmailDomain => "email domain",
        };
        format!(
            "author {verb} '{}'{}",
            self.pattern,
            sensitivity(self.case_sensitive)
        )
    }
}

/// Keeps commits whose subject matches a pattern.
///
/// # Examples
///
/// ```
/// use repolens_core::MessageMatch;
/// use repolens_filter::{CommitFilter, MessageFilter};
///
/// let f = MessageFilter::new("fix", MessageMatch::StartsWith, true).unwrap();
/// assert_eq!(f.describe(), "message starts with 'fix'");
/// ```
#[derive(Debug, Clone)]
pub struct MessageFilter {
    pattern: String,
    mode: MessageMatch,
    case_sensitive: bool,
    matcher: TextMatcher,
}

impl MessageFilter {
    /// Compile a message filter.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::InvalidPattern`] if a regex does not compile.
    /// The error is raised here, never when the filter is applied.
    pub fn new(pattern: &str, mode: MessageMatch, case_sensitive: bool) -> Result<Self, LensError> {
        let matcher = match mode {
            MessageMatch::Contains => TextMatcher::Contains(fold(pattern, case_sensitive)),
            MessageMatch::StartsWith => TextMatcher::StartsWith(fold(pattern, case_sensitive)),
            MessageMatch::EndsWith => TextMatcher::EndsWith(fold(pattern, case_sensitive)),
            MessageMatch::Regex => TextMatcher::Regex(compile_regex(pattern, case_sensitive)?),
        };
        Ok(Self {
            pattern: pattern.to_string(),
            mode,
            case_sensitive,
            matcher,
        })
    }
}

impl CommitFilter for MessageFilter {
    fn matches(&self, commit: &Commit) -> bool {
        self.matcher.is_match(&commit.message, self.case_sensitive)
    }

    fn describe(&self) -> String {
        let verb = match self.mode {
            MessageMatch::Contains => "contains",
            MessageMatch::StartsWith => "starts with",
            MessageMatch::EndsWith => "ends with",
            MessageMatch::Regex => "matches",
        };
        format!(
            "message {verb} '{}'{}",
            self.pattern,
            sensitivity(self.case_sensitive)
        )
    }
}

/// Keeps commits whose size falls inside [`SizeBounds`].
///
/// A bound of `None` or `0` leaves that side open.
///
/// # Examples
///
/// ```
/// use repolens_core::SizeBounds;
/// use repolens_filter::{CommitFilter, SizeFilter};
///
/// let f = SizeFilter::new(SizeBounds {
///     min_insertions: Some(50),
///     max_files: Some(10),
///     ..Default::default()
/// });
/// assert_eq!(f.describe(), "size: insertions >= 50, files <= 10");
/// ```
#[derive(Debug, Clone)]
pub struct SizeFilter {
    bounds: SizeBounds,
}

impl SizeFilter {
    /// Create a size filter.
    pub fn new(bounds: SizeBounds) -> Self {
        Self { bounds }
    }
}

fn within(value: u64, min: Option<u64>, max: Option<u64>) -> bool {
    let min_ok = min.filter(|&m| m > 0).map_or(true, |m| value >= m);
    let max_ok = max.filter(|&m| m > 0).map_or(true, |m| value <= m);
    min_ok && max_ok
}

impl CommitFilter for SizeFilter {
    fn matches(&self, commit: &Commit) -> bool {
        let b = &self.bounds;
        let s = &commit.stats;
        within(s.insertions, b.min_insertions, b.max_insertions)
            && within(s.deletions, b.min_deletions, b.max_deletions)
            && within(s.files_changed, b.min_files, b.max_files)
    }

    fn describe(&self) -> String {
        let b = &self.bounds;
        let mut parts = Vec::new();
        let mut push = |name: &str, op: &str, bound: Option<u64>| {
            if let Some(v) = bound.filter(|&v| v > 0) {
                parts.push(format!("{name} {op} {v}"));
            }
        };
        push("insertions", ">=", b.min_insertions);
        push("insertions", "<=", b.max_insertions);
        push("deletions", ">=", b.min_deletions);
        push("deletions", "<=", b.max_deletions);
        push("files", ">=", b.min_files);
        push("files", "<=", b.max_files);
        if parts.is_empty() {
            "size: any".into()
        } else {
            format!("size: {}", parts.join(", "))
        }
    }
}

/// Drops merge commits (two or more parents).
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeFilter;

impl CommitFilter for MergeFilter {
    fn matches(&self, commit: &Commit) -> bool {
        !commit.is_merge()
    }

    fn describe(&self) -> String {
        "excluding merge commits".into()
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<glob::Pattern>, LensError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| LensError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn any_glob(patterns: &[glob::Pattern], path: &str) -> bool {
    patterns.iter().any(|p| p.matches(path))
}

/// Keeps commits that touch at least one file matching any glob.
///
/// # Examples
///
/// ```
/// use repolens_filter::{CommitFilter, IncludeFilesFilter};
///
/// let f = IncludeFilesFilter::new(&["src/**/*.rs".to_string()]).unwrap();
/// assert_eq!(f.describe(), "files matching: src/**/*.rs");
/// assert!(IncludeFilesFilter::new(&["[".to_string()]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct IncludeFilesFilter {
    patterns: Vec<glob::Pattern>,
}

impl IncludeFilesFilter {
    /// Compile include globs.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::InvalidPattern`] for the first bad glob.
    pub fn new(patterns: &[String]) -> Result<Self, LensError> {
        Ok(Self {
            patterns: compile_globs(patterns)?,
        })
    }
}

impl CommitFilter for IncludeFilesFilter {
    fn matches(&self, commit: &Commit) -> bool {
        commit
            .stats
            .files
            .iter()
            .any(|f| any_glob(&self.patterns, &f.path))
    }

    fn describe(&self) -> String {
        format!("files matching: {}", join_patterns(&self.patterns))
    }
}

/// Drops commits whose changed files all match an exclude glob.
///
/// A commit that also touches a non-excluded file is kept, as is a commit
/// without file-level data.
#[derive(Debug, Clone)]
pub struct ExcludeFilesFilter {
    patterns: Vec<glob::Pattern>,
}

impl ExcludeFilesFilter {
    /// Compile exclude globs.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::InvalidPattern`] for the first bad glob.
    pub fn new(patterns: &[String]) -> Result<Self, LensError> {
        Ok(Self {
            patterns: compile_globs(patterns)?,
        })
    }
}

impl CommitFilter for ExcludeFilesFilter {
    fn matches(&self, commit: &Commit) -> bool {
        let files = &commit.stats.files;
        files.is_empty() || files.iter().any(|f| !any_glob(&self.patterns, &f.path))
    }

    fn describe(&self) -> String {
        format!("excluding files: {}", join_patterns(&self.patterns))
    }
}

fn join_patterns(patterns: &[glob::Pattern]) -> String {
    patterns
        .iter()
        .map(glob::Pattern::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Caps the number of commits returned by a chain.
///
/// A cap of zero means no cap, like a zero size bound.
#[derive(Debug, Clone, Copy)]
pub struct LimitFilter {
    max: usize,
}

impl LimitFilter {
    /// Keep at most `max` commits.
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl CommitFilter for LimitFilter {
    fn matches(&self, _commit: &Commit) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("limit: {} commits", self.max)
    }

    fn limit(&self) -> Option<usize> {
        (self.max > 0).then_some(self.max)
    }
}

/// Records branches of interest without filtering.
///
/// Parsed commits carry no branch membership, so every commit passes. The
/// description says so, so the limitation is visible to users.
#[derive(Debug, Clone)]
pub struct BranchFilter {
    branches: Vec<String>,
}

impl BranchFilter {
    /// Create a pass-through branch filter.
    pub fn new(branches: Vec<String>) -> Self {
        Self { branches }
    }
}

impl CommitFilter for BranchFilter {
    fn matches(&self, _commit: &Commit) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!(
            "branches: {} (not applied per commit)",
            self.branches.join(", ")
        )
    }
}
