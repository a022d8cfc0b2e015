//! Calendar-day contribution graph and streaks.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use repolens_core::{Commit, ContributionGraph, Streaks, TimeRange};

/// Default look-back when the range leaves the start open.
const DEFAULT_WINDOW_DAYS: u64 = 365;

/// Build a zero-filled day histogram of commits.
///
/// The window uses the explicit bounds of `range` where present. An open
/// side widens to cover both the year ending `today` and the span of the
/// commits themselves. Commits outside the window are not counted. Each
/// commit lands on its author date's calendar day as recorded, without
/// timezone normalization.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use repolens_analytics::contribution_graph;
/// use repolens_core::TimeRange;
///
/// let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
/// let range = TimeRange::parse("2024-06-01..2024-06-30", today).unwrap();
/// let graph = contribution_graph(&[], &range, today);
/// assert_eq!(graph.daily_commits.len(), 30);
/// assert_eq!(graph.max_commits, 0);
/// ```
pub fn contribution_graph(
    commits: &[Commit],
    range: &TimeRange,
    today: NaiveDate,
) -> ContributionGraph {
    let (start, end) = window(commits, range, today);

    let mut daily: BTreeMap<NaiveDate, u64> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, 0))
        .collect();

    for commit in commits {
        if let Some(count) = daily.get_mut(&commit.author_day()) {
            *count += 1;
        }
    }

    let max_commits = daily.values().copied().max().unwrap_or(0);
    let total_commits = daily.values().sum();

    ContributionGraph {
        start_date: start,
        end_date: end,
        daily_commits: daily,
        max_commits,
        total_commits,
    }
}

fn window(commits: &[Commit], range: &TimeRange, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = commits.iter().map(Commit::author_day).min();
    let last = commits.iter().map(Commit::author_day).max();

    let end = range
        .until
        .unwrap_or_else(|| last.map_or(today, |l| l.max(today)));
    let start = range.since.unwrap_or_else(|| {
        let year_ago = today
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .unwrap_or(today);
        first.map_or(year_ago, |f| f.min(year_ago)).min(end)
    });

    (start, end.max(start))
}

/// Longest and current runs of consecutive days with commits.
///
/// `longest` scans every key. `current` counts backward from the latest key
/// in `daily`, not from the real-world date, and stops at the first zero or
/// missing day. Keys need not be zero-filled.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use chrono::NaiveDate;
/// use repolens_analytics::calculate_streaks;
///
/// let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
/// let daily = BTreeMap::from([(d(1), 1), (d(2), 1), (d(3), 0), (d(4), 1), (d(5), 1)]);
/// let streaks = calculate_streaks(&daily);
/// assert_eq!((streaks.current, streaks.longest), (2, 2));
/// ```
pub fn calculate_streaks(daily: &BTreeMap<NaiveDate, u64>) -> Streaks {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for (&day, &count) in daily {
        if count == 0 {
            run = 0;
        } else if run > 0 && prev.and_then(|p| p.succ_opt()) == Some(day) {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
        prev = Some(day);
    }

    let mut current = 0;
    let mut expected: Option<NaiveDate> = None;
    for (&day, &count) in daily.iter().rev() {
        if count == 0 || expected.is_some_and(|e| e != day) {
            break;
        }
        current += 1;
        expected = day.pred_opt();
    }

    Streaks { current, longest }
}

/// Bucket a day's commit count into an intensity level from 0 to 4.
///
/// # Examples
///
/// ```
/// use repolens_analytics::activity_level;
///
/// assert_eq!(activity_level(0), 0);
/// assert_eq!(activity_level(3), 1);
/// assert_eq!(activity_level(9), 2);
/// assert_eq!(activity_level(19), 3);
/// assert_eq!(activity_level(20), 4);
/// ```
pub fn activity_level(count: u64) -> u8 {
    match count {
        0 => 0,
        1..=3 => 1,
        4..=9 => 2,
        10..=19 => 3,
        _ => 4,
    }
}
