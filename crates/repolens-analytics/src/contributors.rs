//! Per-author aggregation of commit history.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use repolens_core::{Commit, Contributor};

/// Bucket name for files without an extension.
pub const NO_EXTENSION: &str = "(none)";

/// Accumulates one contributor's commits, then freezes into a [`Contributor`].
///
/// # Examples
///
/// ```
/// use repolens_analytics::ContributorBuilder;
///
/// let contributor = ContributorBuilder::new("Ada", "ada@example.com").finish();
/// assert_eq!(contributor.total_commits, 0);
/// assert_eq!(contributor.active_days, 0);
/// ```
#[derive(Debug, Clone)]
pub struct ContributorBuilder {
    contributor: Contributor,
}

impl ContributorBuilder {
    /// Start an empty record for one author.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            contributor: Contributor::new(name, email),
        }
    }

    /// Add one commit's totals and buckets.
    pub fn record(&mut self, commit: &Commit) {
        let c = &mut self.contributor;
        let date = commit.author.date;

        c.total_commits += 1;
        c.insertions = c.insertions.saturating_add(commit.stats.insertions);
        c.deletions = c.deletions.saturating_add(commit.stats.deletions);

        if c.first_commit.map_or(true, |first| date < first) {
            c.first_commit = Some(date);
        }
        if c.last_commit.map_or(true, |last| date > last) {
            c.last_commit = Some(date);
        }

        *c.commits_by_day.entry(commit.author_day()).or_default() += 1;
        *c.commits_by_hour.entry(date.hour()).or_default() += 1;
        *c.commits_by_weekday
            .entry(date.weekday().num_days_from_monday())
            .or_default() += 1;

        for file in &commit.stats.files {
            let ext = file.extension().unwrap_or_else(|| NO_EXTENSION.to_string());
            *c.file_types.entry(ext).or_default() += 1;
        }
    }

    /// Freeze the accumulated record.
    pub fn finish(mut self) -> Contributor {
        self.contributor.active_days = self.contributor.commits_by_day.len() as u64;
        self.contributor
    }
}

/// Group commits by author email into contributor records.
///
/// The display name is taken from the first commit seen for each email.
/// Output is sorted by commit count descending, then email ascending.
///
/// # Examples
///
/// ```
/// use repolens_analytics::aggregate_contributors;
///
/// assert!(aggregate_contributors(&[]).is_empty());
/// ```
pub fn aggregate_contributors(commits: &[Commit]) -> Vec<Contributor> {
    let mut builders: BTreeMap<&str, ContributorBuilder> = BTreeMap::new();

    for commit in commits {
        builders
            .entry(commit.author.email.as_str())
            .or_insert_with(|| ContributorBuilder::new(&commit.author.name, &commit.author.email))
            .record(commit);
    }

    let mut contributors: Vec<Contributor> = builders
        .into_values()
        .map(ContributorBuilder::finish)
        .collect();
    contributors.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.email.cmp(&b.email))
    });
    contributors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_on, commit_with_files};
    use chrono::{NaiveDate, Weekday};

    #[test]
    fn totals_equal_sum_over_attributed_commits() {
        let commits = vec![
            commit_with_files(
                "ada@example.com",
                "2024-01-15 10:30:00 -0800",
                &[("src/a.rs", 10, 2)],
            ),
            commit_with_files("bob@example.com", "2024-01-15 11:00:00 -0800", &[("b.py", 1, 1)]),
            commit_with_files(
                "ada@example.com",
                "2024-01-16 14:00:00 -0800",
                &[("src/b.rs", 5, 0), ("Makefile", 1, 1)],
            ),
        ];
        let contributors = aggregate_contributors(&commits);
        assert_eq!(contributors.len(), 2);

        let ada = &contributors[0];
        assert_eq!(ada.email, "ada@example.com");
        assert_eq!(ada.total_commits, 2);
        assert_eq!(ada.insertions, 16);
        assert_eq!(ada.deletions, 3);
        assert_eq!(ada.active_days, 2);
        assert_eq!(ada.file_types.get("rs"), Some(&2));
        assert_eq!(ada.file_types.get(NO_EXTENSION), Some(&1));
        assert_eq!(ada.most_common_file_type(), Some("rs"));
    }

    #[test]
    fn first_and_last_dates_and_buckets() {
        let commits = vec![
            commit_on("ada@example.com", "2024-01-17 09:00:00 +0000"),
            commit_on("ada@example.com", "2024-01-15 09:00:00 +0000"),
            commit_on("ada@example.com", "2024-01-15 22:00:00 +0000"),
        ];
        let ada = &aggregate_contributors(&commits)[0];
        assert_eq!(
            ada.first_commit.map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            ada.last_commit.map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(2024, 1, 17)
        );
        assert_eq!(ada.active_days, 2);
        assert_eq!(ada.most_active_hour(), Some(9));
        // 2024-01-15 is a Monday.
        assert_eq!(ada.most_active_weekday(), Some(Weekday::Mon));
        assert_eq!(ada.commits_by_weekday.get(&2), Some(&1));
    }

    #[test]
    fn huge_totals_saturate() {
        let commits = vec![
            commit_with_files(
                "ada@example.com",
                "2024-01-15 10:30:00 -0800",
                &[("a.rs", u64::MAX, 0)],
            ),
            commit_with_files("ada@example.com", "2024-01-16 10:30:00 -0800", &[("b.rs", 3, 0)]),
        ];
        let ada = &aggregate_contributors(&commits)[0];
        assert_eq!(ada.total_commits, 2);
        assert_eq!(ada.insertions, u64::MAX);
    }

    #[test]
    fn ties_sort_by_email() {
        let commits = vec![
            commit_on("zed@example.com", "2024-01-15 09:00:00 +0000"),
            commit_on("amy@example.com", "2024-01-15 09:00:00 +0000"),
        ];
        let emails: Vec<_> = aggregate_contributors(&commits)
            .into_iter()
            .map(|c| c.email)
            .collect();
        assert_eq!(emails, vec!["amy@example.com", "zed@example.com"]);
    }
}
