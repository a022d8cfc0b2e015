//! Repository health indicators and the weighted health score.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Months, Utc};
use repolens_core::{ActivityTrend, Commit, Contributor, HealthMetrics, MonthlyGrowth};

const SECS_PER_DAY: u64 = 86_400;

/// Relative change in monthly volume that counts as a trend.
const TREND_THRESHOLD: f64 = 0.2;

/// Months counted as "recent" by the trend and activity checks.
const RECENT_MONTHS: usize = 3;

/// Compute health metrics for a commit set.
///
/// Active contributors are those whose last commit is no older than three
/// calendar months before `now`. A contributor without a recorded last
/// commit falls back to its latest commit in `commits`.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use repolens_analytics::health_metrics;
/// use repolens_core::ActivityTrend;
///
/// let metrics = health_metrics(&[], &[], Utc::now());
/// assert_eq!(metrics.total_commits, 0);
/// assert_eq!(metrics.activity_trend, ActivityTrend::Stable);
/// ```
pub fn health_metrics(
    commits: &[Commit],
    contributors: &[Contributor],
    now: DateTime<Utc>,
) -> HealthMetrics {
    let first_commit = commits.iter().map(|c| c.author.date).min();
    let last_commit = commits.iter().map(|c| c.author.date).max();

    let age = match (first_commit, last_commit) {
        (Some(first), Some(last)) if commits.len() >= 2 => {
            (last - first).to_std().unwrap_or(Duration::ZERO)
        }
        _ => Duration::ZERO,
    };
    let age_days = age.as_secs() / SECS_PER_DAY;
    let total_commits = commits.len() as u64;
    let commit_frequency = total_commits as f64 / age_days.max(1) as f64;

    let monthly_growth = monthly_growth(commits);
    let activity_trend = activity_trend(&monthly_growth);

    let mut metrics = HealthMetrics {
        first_commit,
        last_commit,
        age,
        age_days,
        total_commits,
        commit_frequency,
        contributor_count: contributors.len() as u64,
        active_contributors: active_contributors(commits, contributors, now),
        activity_trend,
        monthly_growth,
        health_score: 0.0,
    };
    metrics.health_score = health_score(&metrics);
    metrics
}

fn active_contributors(
    commits: &[Commit],
    contributors: &[Contributor],
    now: DateTime<Utc>,
) -> u64 {
    let Some(cutoff) = now.checked_sub_months(Months::new(RECENT_MONTHS as u32)) else {
        return 0;
    };

    let mut latest: HashMap<&str, DateTime<FixedOffset>> = HashMap::new();
    for commit in commits {
        let entry = latest
            .entry(commit.author.email.as_str())
            .or_insert(commit.author.date);
        if commit.author.date > *entry {
            *entry = commit.author.date;
        }
    }

    contributors
        .iter()
        .filter_map(|c| c.last_commit.or_else(|| latest.get(c.email.as_str()).copied()))
        .filter(|last| *last >= cutoff)
        .count() as u64
}

/// Commits and distinct authors per calendar month, oldest first.
///
/// Months without commits are absent.
pub fn monthly_growth(commits: &[Commit]) -> Vec<MonthlyGrowth> {
    let mut months: BTreeMap<String, (u64, BTreeSet<&str>)> = BTreeMap::new();
    for commit in commits {
        let key = commit.author.date.format("%Y-%m").to_string();
        let (count, authors) = months.entry(key).or_default();
        *count += 1;
        authors.insert(commit.author.email.as_str());
    }

    months
        .into_iter()
        .map(|(month, (commits, authors))| MonthlyGrowth {
            month,
            commits,
            authors: authors.len() as u64,
        })
        .collect()
}

/// Classify recent monthly volume against the earlier average.
///
/// Needs at least three months of data. The mean of the last three months
/// is compared with the mean of all earlier months; a relative change above
/// 20% either way is a trend. With no earlier months the trend is stable.
/// An earlier mean of zero is increasing if recent activity exists.
///
/// # Examples
///
/// ```
/// use repolens_analytics::activity_trend;
/// use repolens_core::{ActivityTrend, MonthlyGrowth};
///
/// let series: Vec<_> = [10, 10, 10, 20, 20, 20]
///     .iter()
///     .enumerate()
///     .map(|(i, &n)| MonthlyGrowth { month: format!("2024-0{}", i + 1), commits: n, authors: 1 })
///     .collect();
/// assert_eq!(activity_trend(&series), ActivityTrend::Increasing);
/// assert_eq!(activity_trend(&series[..2]), ActivityTrend::Stable);
/// ```
pub fn activity_trend(monthly: &[MonthlyGrowth]) -> ActivityTrend {
    if monthly.len() < RECENT_MONTHS {
        return ActivityTrend::Stable;
    }

    let (earlier, recent) = monthly.split_at(monthly.len() - RECENT_MONTHS);
    if earlier.is_empty() {
        return ActivityTrend::Stable;
    }

    let recent_mean = mean_commits(recent);
    let earlier_mean = mean_commits(earlier);

    if earlier_mean == 0.0 {
        return if recent_mean > 0.0 {
            ActivityTrend::Increasing
        } else {
            ActivityTrend::Stable
        };
    }

    let change = (recent_mean - earlier_mean) / earlier_mean;
    if change > TREND_THRESHOLD {
        ActivityTrend::Increasing
    } else if change < -TREND_THRESHOLD {
        ActivityTrend::Decreasing
    } else {
        ActivityTrend::Stable
    }
}

fn mean_commits(months: &[MonthlyGrowth]) -> f64 {
    if months.is_empty() {
        return 0.0;
    }
    months.iter().map(|m| m.commits as f64).sum::<f64>() / months.len() as f64
}

/// Weighted health score in `[0, 100]`.
///
/// | Component | Range |
/// |-----------|-------|
/// | commit frequency | 0–30 |
/// | active contributors | 0–25 |
/// | activity trend | 5, 15 or 20 |
/// | repository age | 0, 5, 10 or 15 |
/// | monthly consistency | 0–10 |
pub fn health_score(metrics: &HealthMetrics) -> f64 {
    let score = frequency_score(metrics.commit_frequency)
        + contributor_score(metrics.active_contributors)
        + trend_score(metrics.activity_trend)
        + age_score(metrics.age_days)
        + consistency_score(&metrics.monthly_growth);
    score.clamp(0.0, 100.0)
}

fn frequency_score(per_day: f64) -> f64 {
    if per_day >= 1.0 {
        30.0
    } else if per_day >= 0.1 {
        20.0 + (per_day - 0.1) / 0.9 * 10.0
    } else {
        (per_day.max(0.0) / 0.1) * 20.0
    }
}

fn contributor_score(active: u64) -> f64 {
    match active {
        0 => 0.0,
        1 => 10.0,
        2..=4 => 15.0 + (active - 2) as f64 * 4.5,
        _ => 25.0,
    }
}

fn trend_score(trend: ActivityTrend) -> f64 {
    match trend {
        ActivityTrend::Increasing => 20.0,
        ActivityTrend::Stable => 15.0,
        ActivityTrend::Decreasing => 5.0,
    }
}

fn age_score(age_days: u64) -> f64 {
    if age_days >= 365 {
        15.0
    } else if age_days >= 90 {
        10.0
    } else if age_days >= 30 {
        5.0
    } else {
        0.0
    }
}

fn consistency_score(monthly: &[MonthlyGrowth]) -> f64 {
    if monthly.len() < RECENT_MONTHS {
        return 0.0;
    }
    let mean = mean_commits(monthly);
    if mean == 0.0 {
        return 0.0;
    }
    let variance = monthly
        .iter()
        .map(|m| (m.commits as f64 - mean).powi(2))
        .sum::<f64>()
        / monthly.len() as f64;
    let cv = variance.sqrt() / mean;
    10.0 / (1.0 + cv * cv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::commit_on;
    use chrono::TimeZone;

    fn series(counts: &[u64]) -> Vec<MonthlyGrowth> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &commits)| MonthlyGrowth {
                month: format!("2023-{:02}", i + 1),
                commits,
                authors: 1,
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn single_commit_has_zero_age() {
        let commits = vec![commit_on("a@x.io", "2024-05-20 12:00:00 +0000")];
        let m = health_metrics(&commits, &[], now());
        assert_eq!(m.age, Duration::ZERO);
        assert_eq!(m.age_days, 0);
        assert_eq!(m.commit_frequency, 1.0);
    }

    #[test]
    fn age_and_frequency() {
        let commits = vec![
            commit_on("a@x.io", "2024-05-11 12:00:00 +0000"),
            commit_on("a@x.io", "2024-05-01 12:00:00 +0000"),
            commit_on("b@x.io", "2024-05-06 12:00:00 +0000"),
        ];
        let m = health_metrics(&commits, &[], now());
        assert_eq!(m.age_days, 10);
        assert!((m.commit_frequency - 0.3).abs() < 1e-9);
        assert_eq!(m.total_commits, 3);
    }

    #[test]
    fn active_contributors_use_three_calendar_months() {
        let mut recent = Contributor::new("A", "a@x.io");
        recent.last_commit = Some(
            DateTime::parse_from_rfc3339("2024-03-01T00:00:00+00:00").unwrap(),
        );
        let mut stale = Contributor::new("B", "b@x.io");
        stale.last_commit = Some(
            DateTime::parse_from_rfc3339("2024-02-29T23:59:59+00:00").unwrap(),
        );
        // No recorded date: falls back to the commit list.
        let stub = Contributor::new("C", "c@x.io");
        let commits = vec![commit_on("c@x.io", "2024-05-30 10:00:00 +0000")];

        let m = health_metrics(&commits, &[recent, stale, stub], now());
        assert_eq!(m.contributor_count, 3);
        assert_eq!(m.active_contributors, 2);
    }

    #[test]
    fn monthly_growth_counts_distinct_authors() {
        let commits = vec![
            commit_on("a@x.io", "2024-02-10 12:00:00 +0000"),
            commit_on("a@x.io", "2024-01-10 12:00:00 +0000"),
            commit_on("b@x.io", "2024-01-20 12:00:00 +0000"),
            commit_on("a@x.io", "2024-01-21 12:00:00 +0000"),
        ];
        let growth = monthly_growth(&commits);
        assert_eq!(growth.len(), 2);
        assert_eq!(growth[0].month, "2024-01");
        assert_eq!((growth[0].commits, growth[0].authors), (3, 2));
        assert_eq!((growth[1].commits, growth[1].authors), (1, 1));
    }

    #[test]
    fn trend_needs_history() {
        assert_eq!(activity_trend(&series(&[1, 50])), ActivityTrend::Stable);
        // Exactly three months leaves nothing to compare against.
        assert_eq!(activity_trend(&series(&[1, 5, 50])), ActivityTrend::Stable);
    }

    #[test]
    fn trend_thresholds() {
        assert_eq!(activity_trend(&series(&[10, 10, 13, 13, 13])), ActivityTrend::Increasing);
        assert_eq!(activity_trend(&series(&[10, 10, 12, 12, 12])), ActivityTrend::Stable);
        assert_eq!(activity_trend(&series(&[10, 10, 7, 7, 7])), ActivityTrend::Decreasing);
    }

    #[test]
    fn trend_with_zero_earlier_mean() {
        assert_eq!(activity_trend(&series(&[0, 0, 1, 2, 3])), ActivityTrend::Increasing);
        assert_eq!(activity_trend(&series(&[0, 0, 0, 0])), ActivityTrend::Stable);
    }

    #[test]
    fn sub_scores() {
        assert_eq!(frequency_score(2.0), 30.0);
        assert_eq!(frequency_score(0.1), 20.0);
        assert!((frequency_score(0.55) - 25.0).abs() < 1e-9);
        assert!((frequency_score(0.05) - 10.0).abs() < 1e-9);
        assert_eq!(frequency_score(0.0), 0.0);

        assert_eq!(contributor_score(0), 0.0);
        assert_eq!(contributor_score(1), 10.0);
        assert_eq!(contributor_score(2), 15.0);
        assert_eq!(contributor_score(4), 24.0);
        assert_eq!(contributor_score(9), 25.0);

        assert_eq!(age_score(400), 15.0);
        assert_eq!(age_score(90), 10.0);
        assert_eq!(age_score(30), 5.0);
        assert_eq!(age_score(29), 0.0);

        assert_eq!(consistency_score(&series(&[5, 5])), 0.0);
        assert_eq!(consistency_score(&series(&[5, 5, 5])), 10.0);
        assert!(consistency_score(&series(&[1, 10, 1])) < 5.0);
    }

    #[test]
    fn score_is_bounded() {
        let commits: Vec<_> = (1..=28)
            .map(|d| commit_on("a@x.io", &format!("2024-02-{d:02} 12:00:00 +0000")))
            .collect();
        let m = health_metrics(&commits, &[], now());
        assert!((0.0..=100.0).contains(&m.health_score));

        let empty = health_metrics(&[], &[], now());
        // Only the stable-trend component contributes.
        assert_eq!(empty.health_score, 15.0);
    }
}
