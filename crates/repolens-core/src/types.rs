use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Name, email and timestamp of an author or committer.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repolens_core::Signature;
///
/// let sig = Signature {
///     name: "Ada".into(),
///     email: "ada@example.com".into(),
///     date: DateTime::parse_from_rfc3339("2024-01-15T10:30:00-08:00").unwrap(),
/// };
/// assert_eq!(sig.date.offset().local_minus_utc(), -8 * 3600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Timestamp with the offset recorded in the commit.
    pub date: DateTime<FixedOffset>,
}

/// How a file was touched by a commit.
///
/// Derived from numstat text, so this is a heuristic rather than git's own
/// diff status. See `repolens_parse::infer_status`.
///
/// # Examples
///
/// ```
/// use repolens_core::FileStatus;
///
/// assert_eq!(FileStatus::Renamed.to_string(), "renamed");
/// assert_eq!(FileStatus::Added.code(), 'A');
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// New file.
    Added,
    /// Existing file modified.
    Modified,
    /// File removed.
    Deleted,
    /// File moved from `old_path`.
    Renamed,
    /// File copied from `old_path`.
    Copied,
}

impl FileStatus {
    /// Single-letter code as printed by `git diff --name-status`.
    pub fn code(self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Copied => 'C',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Deleted => write!(f, "deleted"),
            FileStatus::Renamed => write!(f, "renamed"),
            FileStatus::Copied => write!(f, "copied"),
        }
    }
}

/// A single file change within a commit.
///
/// # Examples
///
/// ```
/// use repolens_core::{FileChange, FileStatus};
///
/// let change = FileChange::new("src/Main.RS", FileStatus::Modified, 10, 3);
/// assert_eq!(change.extension().as_deref(), Some("rs"));
/// assert!(!change.binary);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// File path relative to repo root (the new path for renames).
    pub path: String,
    /// Inferred change status.
    pub status: FileStatus,
    /// Lines added.
    pub insertions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Whether git reported the file as binary (`-` in numstat).
    #[serde(default)]
    pub binary: bool,
    /// Previous path for renames and copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileChange {
    /// Create a text file change with no previous path.
    pub fn new(
        path: impl Into<String>,
        status: FileStatus,
        insertions: u64,
        deletions: u64,
    ) -> Self {
        Self {
            path: path.into(),
            status,
            insertions,
            deletions,
            binary: false,
            old_path: None,
        }
    }

    /// Lower-cased extension of the file name, if any.
    ///
    /// Dotfiles such as `.gitignore` have no extension.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// Aggregate line and file counts for a commit or a diff-stat.
///
/// # Examples
///
/// ```
/// use repolens_core::{CommitStats, FileChange, FileStatus};
///
/// let stats = CommitStats::from_files(vec![
///     FileChange::new("a.rs", FileStatus::Modified, 5, 2),
///     FileChange::new("b.rs", FileStatus::Added, 10, 0),
/// ]);
/// assert_eq!(stats.files_changed, 2);
/// assert_eq!(stats.insertions, 15);
/// assert_eq!(stats.deletions, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStats {
    /// Number of files touched.
    pub files_changed: u64,
    /// Total lines added.
    pub insertions: u64,
    /// Total lines removed.
    pub deletions: u64,
    /// Per-file breakdown, when available.
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl CommitStats {
    /// Build stats whose totals are the sums over `files`, saturating at
    /// `u64::MAX`.
    pub fn from_files(files: Vec<FileChange>) -> Self {
        let (insertions, deletions) = files.iter().fold((0u64, 0u64), |(ins, del), f| {
            (ins.saturating_add(f.insertions), del.saturating_add(f.deletions))
        });
        Self {
            files_changed: files.len() as u64,
            insertions,
            deletions,
            files,
        }
    }

    /// Insertions plus deletions, saturating.
    pub fn churn(&self) -> u64 {
        self.insertions.saturating_add(self.deletions)
    }
}

/// One commit parsed from `git log` output. Immutable once parsed.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use repolens_core::{Commit, CommitStats, Signature};
///
/// let sig = Signature {
///     name: "Ada".into(),
///     email: "ada@example.com".into(),
///     date: DateTime::parse_from_rfc3339("2024-01-15T23:30:00-08:00").unwrap(),
/// };
/// let commit = Commit {
///     hash: "abc1234def".into(),
///     message: "Initial commit".into(),
///     author: sig.clone(),
///     committer: sig,
///     parents: vec![],
///     tree: "tree456".into(),
///     stats: CommitStats::default(),
/// };
/// assert!(commit.is_root());
/// assert_eq!(commit.short_hash(), "abc1234");
/// // The calendar day is taken in the commit's own offset.
/// assert_eq!(commit.author_day().to_string(), "2024-01-15");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Subject line.
    pub message: String,
    /// Author signature.
    pub author: Signature,
    /// Committer signature.
    pub committer: Signature,
    /// Parent hashes; empty for a root commit.
    pub parents: Vec<String>,
    /// Tree hash.
    pub tree: String,
    /// Line and file statistics.
    pub stats: CommitStats,
}

impl Commit {
    /// Whether this commit has two or more parents.
    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First seven characters of the hash.
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(7)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }

    /// Calendar day of the author date, in the offset it was recorded with.
    pub fn author_day(&self) -> NaiveDate {
        self.author.date.date_naive()
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A person contributing to the repository, keyed by email.
///
/// Built incrementally while streaming that person's commits and frozen
/// afterwards. Records parsed from `git shortlog` only carry
/// `total_commits`; the remaining fields stay zero until enhanced.
///
/// All breakdowns are ordered maps. Queries that pick a "most active" key
/// break ties by choosing the lowest key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    /// Display name.
    pub name: String,
    /// Email address; identity key.
    pub email: String,
    /// Number of commits attributed to this email.
    pub total_commits: u64,
    /// Lines added across those commits.
    pub insertions: u64,
    /// Lines removed across those commits.
    pub deletions: u64,
    /// Earliest author date.
    pub first_commit: Option<DateTime<FixedOffset>>,
    /// Latest author date.
    pub last_commit: Option<DateTime<FixedOffset>>,
    /// Distinct calendar days with at least one commit.
    pub active_days: u64,
    /// Commits per calendar day.
    #[serde(default)]
    pub commits_by_day: BTreeMap<NaiveDate, u64>,
    /// Commits per hour of day (0–23).
    #[serde(default)]
    pub commits_by_hour: BTreeMap<u32, u64>,
    /// Commits per weekday, 0 = Monday through 6 = Sunday.
    #[serde(default)]
    pub commits_by_weekday: BTreeMap<u32, u64>,
    /// Changed files per lower-cased extension (`(none)` when absent).
    #[serde(default)]
    pub file_types: BTreeMap<String, u64>,
}

impl Contributor {
    /// Create an empty contributor record.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens_core::Contributor;
    ///
    /// let c = Contributor::new("Ada", "ada@example.com");
    /// assert_eq!(c.total_commits, 0);
    /// assert!(c.most_active_hour().is_none());
    /// ```
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            total_commits: 0,
            insertions: 0,
            deletions: 0,
            first_commit: None,
            last_commit: None,
            active_days: 0,
            commits_by_day: BTreeMap::new(),
            commits_by_hour: BTreeMap::new(),
            commits_by_weekday: BTreeMap::new(),
            file_types: BTreeMap::new(),
        }
    }

    /// Hour of day with the most commits; lowest hour wins ties.
    pub fn most_active_hour(&self) -> Option<u32> {
        busiest(&self.commits_by_hour).copied()
    }

    /// Weekday with the most commits; Monday-first order wins ties.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Weekday;
    /// use repolens_core::Contributor;
    ///
    /// let mut c = Contributor::new("Ada", "ada@example.com");
    /// c.commits_by_weekday.insert(4, 3);
    /// c.commits_by_weekday.insert(1, 3);
    /// assert_eq!(c.most_active_weekday(), Some(Weekday::Tue));
    /// ```
    pub fn most_active_weekday(&self) -> Option<Weekday> {
        busiest(&self.commits_by_weekday).and_then(|&idx| WEEKDAYS.get(idx as usize).copied())
    }

    /// Extension touched most often; alphabetical order wins ties.
    pub fn most_common_file_type(&self) -> Option<&str> {
        busiest(&self.file_types).map(String::as_str)
    }

    /// The `n` most frequent file types, by count descending then name.
    pub fn top_file_types(&self, n: usize) -> Vec<(&str, u64)> {
        let mut types: Vec<(&str, u64)> = self
            .file_types
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        types.truncate(n);
        types
    }
}

fn busiest<K: Ord>(buckets: &BTreeMap<K, u64>) -> Option<&K> {
    let mut best: Option<(&K, u64)> = None;
    for (key, &count) in buckets {
        // Ascending iteration plus strict comparison keeps the lowest key on ties.
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

/// A calendar-day histogram of commit counts.
///
/// `daily_commits` has an entry for every day from `start_date` to
/// `end_date` inclusive; days without commits hold zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionGraph {
    /// First day in the window.
    pub start_date: NaiveDate,
    /// Last day in the window.
    pub end_date: NaiveDate,
    /// Commit count per day.
    pub daily_commits: BTreeMap<NaiveDate, u64>,
    /// Largest single-day count (0 if empty).
    pub max_commits: u64,
    /// Sum of all daily counts.
    pub total_commits: u64,
}

/// Consecutive-day activity runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    /// Run ending at the most recent day present in the data.
    pub current: u64,
    /// Longest run anywhere in the data.
    pub longest: u64,
}

/// Coarse direction of recent monthly commit volume.
///
/// # Examples
///
/// ```
/// use repolens_core::ActivityTrend;
///
/// assert_eq!("Increasing".parse::<ActivityTrend>().unwrap(), ActivityTrend::Increasing);
/// assert_eq!(ActivityTrend::Stable.to_string(), "stable");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTrend {
    /// Recent months are more than 20% above the earlier average.
    Increasing,
    /// Within ±20%, or not enough data.
    #[default]
    Stable,
    /// Recent months are more than 20% below the earlier average.
    Decreasing,
}

impl fmt::Display for ActivityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityTrend::Increasing => write!(f, "increasing"),
            ActivityTrend::Stable => write!(f, "stable"),
            ActivityTrend::Decreasing => write!(f, "decreasing"),
        }
    }
}

impl FromStr for ActivityTrend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increasing" => Ok(ActivityTrend::Increasing),
            "stable" => Ok(ActivityTrend::Stable),
            "decreasing" => Ok(ActivityTrend::Decreasing),
            other => Err(format!("unknown activity trend: {other}")),
        }
    }
}

/// Commit and author counts for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyGrowth {
    /// Month as `YYYY-MM`.
    pub month: String,
    /// Commits authored in the month.
    pub commits: u64,
    /// Distinct author emails in the month.
    pub authors: u64,
}

/// Repository-level health indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    /// Earliest author date.
    pub first_commit: Option<DateTime<FixedOffset>>,
    /// Latest author date.
    pub last_commit: Option<DateTime<FixedOffset>>,
    /// `last_commit - first_commit`; zero with fewer than two commits.
    pub age: Duration,
    /// Whole days in `age`.
    pub age_days: u64,
    /// Number of commits analyzed.
    pub total_commits: u64,
    /// Commits per day of age (age floored at one day).
    pub commit_frequency: f64,
    /// Number of known contributors.
    pub contributor_count: u64,
    /// Contributors whose last commit is within three months.
    pub active_contributors: u64,
    /// Recent vs. historical monthly volume.
    pub activity_trend: ActivityTrend,
    /// Per-month series, oldest first.
    pub monthly_growth: Vec<MonthlyGrowth>,
    /// Weighted score in `[0, 100]`.
    pub health_score: f64,
}
