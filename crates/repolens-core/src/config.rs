use std::time::Duration;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// Top-level configuration, usually read from `.repolens.toml` by the caller.
///
/// # Examples
///
/// ```
/// use repolens_core::LensConfig;
///
/// let config = LensConfig::default();
/// assert_eq!(config.executor.timeout_secs, 30);
/// assert!(config.analysis.include_merges);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LensConfig {
    /// Process execution limits.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// What history to analyze.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Extended commit filters.
    #[serde(default)]
    pub filters: FilterOptions,
}

impl LensConfig {
    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Toml`] if parsing fails, or
    /// [`LensError::Validation`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens_core::LensConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// since = "2024-01-01"
    /// limit = 50
    /// "#;
    /// let config = LensConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.limit, Some(50));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LensError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), LensError> {
        self.executor.validate()?;
        self.analysis.time_range().validate()?;
        TimeRange {
            since: self.filters.since,
            until: self.filters.until,
        }
        .validate()?;
        self.filters.size.validate()
    }
}

/// Limits applied to every external process.
///
/// # Examples
///
/// ```
/// use repolens_core::ExecutorConfig;
/// use std::time::Duration;
///
/// let config = ExecutorConfig::default();
/// assert_eq!(config.program, "git");
/// assert_eq!(config.timeout(), Duration::from_secs(30));
/// assert_eq!(config.max_output_bytes, 64 * 1024 * 1024);
/// assert_eq!(config.max_parallel, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Executable to invoke (default: `git`).
    #[serde(default = "default_program")]
    pub program: String,
    /// Default deadline per call in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hard cap on captured stdout/stderr bytes (default: 64 MiB).
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Worker pool size for per-contributor enhancement (default: 4).
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_program() -> String {
    "git".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_max_parallel() -> usize {
    4
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            max_parallel: default_max_parallel(),
        }
    }
}

impl ExecutorConfig {
    /// Default deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), LensError> {
        if self.program.trim().is_empty() {
            return Err(LensError::Validation("executor.program is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(LensError::Validation(
                "executor.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(LensError::Validation(
                "executor.max_output_bytes must be greater than zero".into(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(LensError::Validation(
                "executor.max_parallel must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Inclusive calendar-day window; either side may be open.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use repolens_core::TimeRange;
///
/// let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
/// let range = TimeRange::parse("2w", today).unwrap();
/// assert_eq!(range.since, NaiveDate::from_ymd_opt(2024, 6, 16));
/// assert_eq!(range.until, None);
///
/// let range = TimeRange::parse("2024-01-01..2024-03-31", today).unwrap();
/// assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// First included day.
    pub since: Option<NaiveDate>,
    /// Last included day.
    pub until: Option<NaiveDate>,
}

impl TimeRange {
    /// Parse a range expression relative to `today`.
    ///
    /// Accepted forms:
    /// - `YYYY-MM-DD..YYYY-MM-DD`, with either side optional
    /// - a single `YYYY-MM-DD` (since that day)
    /// - `<N>d`, `<N>w`, `<N>m`, `<N>y` (the last N days/weeks/months/years)
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] for anything else, or when the
    /// resulting `since` is after `until`.
    pub fn parse(expr: &str, today: NaiveDate) -> Result<Self, LensError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(LensError::Validation("empty date range".into()));
        }

        let range = if let Some((since, until)) = expr.split_once("..") {
            Self {
                since: parse_optional_date(since)?,
                until: parse_optional_date(until)?,
            }
        } else if let Some(since) = parse_relative(expr, today)? {
            Self {
                since: Some(since),
                until: None,
            }
        } else {
            Self {
                since: Some(parse_date(expr)?),
                until: None,
            }
        };

        range.validate()?;
        Ok(range)
    }

    /// Ensure `since <= until` when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] when the range is inverted.
    pub fn validate(&self) -> Result<(), LensError> {
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(LensError::Validation(format!(
                    "date range starts after it ends: {since} > {until}"
                )));
            }
        }
        Ok(())
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.since.map_or(true, |since| day >= since)
            && self.until.map_or(true, |until| day <= until)
    }

    /// Whether neither side is bounded.
    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, LensError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| LensError::Validation(format!("invalid date {s:?}: {e}")))
}

fn parse_optional_date(s: &str) -> Result<Option<NaiveDate>, LensError> {
    if s.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(s).map(Some)
    }
}

fn parse_relative(expr: &str, today: NaiveDate) -> Result<Option<NaiveDate>, LensError> {
    let Some(unit) = expr.chars().last() else {
        return Ok(None);
    };
    let digits = &expr[..expr.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let n: u32 = digits
        .parse()
        .map_err(|e| LensError::Validation(format!("invalid date range {expr:?}: {e}")))?;

    let since = match unit.to_ascii_lowercase() {
        'd' => today.checked_sub_days(Days::new(u64::from(n))),
        'w' => today.checked_sub_days(Days::new(u64::from(n) * 7)),
        'm' => today.checked_sub_months(Months::new(n)),
        'y' => n
            .checked_mul(12)
            .and_then(|months| today.checked_sub_months(Months::new(months))),
        _ => return Ok(None),
    };
    since
        .map(Some)
        .ok_or_else(|| LensError::Validation(format!("date range {expr:?} is out of bounds")))
}

/// History selection supplied by the CLI or config layer.
///
/// # Examples
///
/// ```
/// use repolens_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert!(config.include_merges);
/// assert!(config.time_range().is_unbounded());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First included day (passed to `git log --since`).
    #[serde(default)]
    pub since: Option<NaiveDate>,
    /// Last included day (passed to `git log --until`).
    #[serde(default)]
    pub until: Option<NaiveDate>,
    /// Author pattern (passed to `git log --author`).
    #[serde(default)]
    pub author: Option<String>,
    /// Maximum number of commits after filtering. Zero means no limit.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Keep merge commits (default: true).
    #[serde(default = "default_true")]
    pub include_merges: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            since: None,
            until: None,
            author: None,
            limit: None,
            include_merges: true,
        }
    }
}

impl AnalysisConfig {
    /// The configured window.
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            since: self.since,
            until: self.until,
        }
    }
}

/// How an author pattern is compared against name and email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorMatch {
    /// Name or email equals the pattern.
    Exact,
    /// Name or email contains the pattern.
    #[default]
    Contains,
    /// Name or email matches the regex.
    Regex,
    /// Email domain equals the pattern (leading `@` optional).
    EmailDomain,
}

/// How a message pattern is compared against the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageMatch {
    /// Subject contains the pattern.
    #[default]
    Contains,
    /// Subject starts with the pattern.
    StartsWith,
    /// Subject ends with the pattern.
    EndsWith,
    /// Subject matches the regex.
    Regex,
}

/// Independent bounds on commit size. `None` or `0` leaves a side open.
///
/// # Examples
///
/// ```
/// use repolens_core::SizeBounds;
///
/// let bounds = SizeBounds { min_insertions: Some(0), ..SizeBounds::default() };
/// assert!(bounds.is_unconstrained());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    /// Minimum lines added.
    #[serde(default)]
    pub min_insertions: Option<u64>,
    /// Maximum lines added.
    #[serde(default)]
    pub max_insertions: Option<u64>,
    /// Minimum lines removed.
    #[serde(default)]
    pub min_deletions: Option<u64>,
    /// Maximum lines removed.
    #[serde(default)]
    pub max_deletions: Option<u64>,
    /// Minimum files changed.
    #[serde(default)]
    pub min_files: Option<u64>,
    /// Maximum files changed.
    #[serde(default)]
    pub max_files: Option<u64>,
}

impl SizeBounds {
    /// Whether every bound is absent or zero.
    pub fn is_unconstrained(&self) -> bool {
        [
            self.min_insertions,
            self.max_insertions,
            self.min_deletions,
            self.max_deletions,
            self.min_files,
            self.max_files,
        ]
        .iter()
        .all(|bound| bound.unwrap_or(0) == 0)
    }

    fn validate(&self) -> Result<(), LensError> {
        let pairs = [
            ("insertions", self.min_insertions, self.max_insertions),
            ("deletions", self.min_deletions, self.max_deletions),
            ("files", self.min_files, self.max_files),
        ];
        for (name, min, max) in pairs {
            if let (Some(min), Some(max)) = (min, max) {
                if min > 0 && max > 0 && min > max {
                    return Err(LensError::Validation(format!(
                        "min_{name} ({min}) exceeds max_{name} ({max})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Extended commit filter options.
///
/// # Examples
///
/// ```
/// use repolens_core::{AuthorMatch, FilterOptions};
///
/// let options = FilterOptions::default();
/// assert_eq!(options.author_match, AuthorMatch::Contains);
/// assert!(options.include_merges);
/// assert!(!options.case_sensitive);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    /// First included author day.
    #[serde(default)]
    pub since: Option<NaiveDate>,
    /// Last included author day.
    #[serde(default)]
    pub until: Option<NaiveDate>,
    /// Author pattern.
    #[serde(default)]
    pub author: Option<String>,
    /// How `author` is compared.
    #[serde(default)]
    pub author_match: AuthorMatch,
    /// Case-sensitive author and message comparisons (default: false).
    #[serde(default)]
    pub case_sensitive: bool,
    /// Branches of interest. Not applied per commit.
    #[serde(default)]
    pub branches: Vec<String>,
    /// Subject pattern.
    #[serde(default)]
    pub message: Option<String>,
    /// How `message` is compared.
    #[serde(default)]
    pub message_match: MessageMatch,
    /// Commit size bounds.
    #[serde(default)]
    pub size: SizeBounds,
    /// Keep commits touching at least one file matching these globs.
    #[serde(default)]
    pub include_files: Vec<String>,
    /// Drop commits whose files all match these globs.
    #[serde(default)]
    pub exclude_files: Vec<String>,
    /// Keep merge commits (default: true).
    #[serde(default = "default_true")]
    pub include_merges: bool,
    /// Cap on the number of commits returned. Zero means no limit.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            since: None,
            until: None,
            author: None,
            author_match: AuthorMatch::default(),
            case_sensitive: false,
            branches: Vec::new(),
            message: None,
            message_match: MessageMatch::default(),
            size: SizeBounds::default(),
            include_files: Vec::new(),
            exclude_files: Vec::new(),
            include_merges: true,
            limit: None,
        }
    }
}

impl FilterOptions {
    /// Fill unset fields from the analysis config.
    ///
    /// Explicit filter values win. Merges are kept only if both allow them.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens_core::{AnalysisConfig, FilterOptions};
    ///
    /// let analysis = AnalysisConfig {
    ///     limit: Some(10),
    ///     include_merges: false,
    ///     ..Default::default()
    /// };
    /// let options = FilterOptions { limit: Some(3), ..Default::default() };
    /// let options = options.with_analysis(&analysis);
    /// assert_eq!(options.limit, Some(3));
    /// assert!(!options.include_merges);
    /// ```
    pub fn with_analysis(mut self, analysis: &AnalysisConfig) -> Self {
        self.since = self.since.or(analysis.since);
        self.until = self.until.or(analysis.until);
        if self.author.is_none() {
            self.author = analysis.author.clone();
        }
        self.limit = self.limit.filter(|&n| n > 0).or(analysis.limit);
        self.include_merges = self.include_merges && analysis.include_merges;
        self
    }
}
