//! Analytics over parsed commit history.
//!
//! All functions are pure and total: empty input produces zero-valued
//! results. Time-dependent calculations take `now`/`today` explicitly so
//! results are reproducible.

mod contribution;
mod contributors;
mod health;

use chrono::{DateTime, Utc};
use repolens_core::{AnalysisConfig, Commit, ContributionGraph, Contributor, HealthMetrics, Streaks};
use serde::{Deserialize, Serialize};

pub use contribution::{activity_level, calculate_streaks, contribution_graph};
pub use contributors::{aggregate_contributors, ContributorBuilder, NO_EXTENSION};
pub use health::{activity_trend, health_metrics, health_score, monthly_growth};

/// Everything computed for one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Day histogram over the effective window.
    pub graph: ContributionGraph,
    /// Streaks over `graph.daily_commits`.
    pub streaks: Streaks,
    /// Repository health.
    pub health: HealthMetrics,
    /// Contributor records, most active first.
    pub contributors: Vec<Contributor>,
}

/// Run every analysis over an already-filtered commit set.
///
/// `contributors` are used as given when non-empty; otherwise they are
/// aggregated from `commits`.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use repolens_analytics::analyze;
/// use repolens_core::AnalysisConfig;
///
/// let result = analyze(&[], &[], &AnalysisConfig::default(), Utc::now());
/// assert_eq!(result.graph.total_commits, 0);
/// assert!(result.contributors.is_empty());
/// ```
pub fn analyze(
    commits: &[Commit],
    contributors: &[Contributor],
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let contributors = if contributors.is_empty() {
        aggregate_contributors(commits)
    } else {
        contributors.to_vec()
    };

    let graph = contribution_graph(commits, &config.time_range(), now.date_naive());
    let streaks = calculate_streaks(&graph.daily_commits);
    let health = health_metrics(commits, &contributors, now);

    AnalysisResult {
        graph,
        streaks,
        health,
        contributors,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::commit_on;
    use chrono::TimeZone;

    #[test]
    fn analyze_aggregates_when_no_contributors_given() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let commits = vec![
            commit_on("a@x.io", "2024-05-30 12:00:00 +0000"),
            commit_on("a@x.io", "2024-05-31 12:00:00 +0000"),
            commit_on("b@x.io", "2024-05-31 15:00:00 +0000"),
        ];
        let result = analyze(&commits, &[], &AnalysisConfig::default(), now);
        assert_eq!(result.contributors.len(), 2);
        assert_eq!(result.contributors[0].email, "a@x.io");
        assert_eq!(result.graph.total_commits, 3);
        assert_eq!(result.streaks.current, 0);
        assert_eq!(result.streaks.longest, 2);
        assert_eq!(result.health.active_contributors, 2);
    }

    #[test]
    fn analyze_respects_configured_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let config = AnalysisConfig {
            since: chrono::NaiveDate::from_ymd_opt(2024, 5, 31),
            until: chrono::NaiveDate::from_ymd_opt(2024, 5, 31),
            ..AnalysisConfig::default()
        };
        let commits = vec![
            commit_on("a@x.io", "2024-05-30 12:00:00 +0000"),
            commit_on("a@x.io", "2024-05-31 12:00:00 +0000"),
        ];
        let result = analyze(&commits, &[], &config, now);
        assert_eq!(result.graph.daily_commits.len(), 1);
        assert_eq!(result.graph.total_commits, 1);
        assert_eq!(result.streaks, repolens_core::Streaks { current: 1, longest: 1 });
    }

    #[test]
    fn result_serializes_camel_case() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let result = analyze(&[], &[], &AnalysisConfig::default(), now);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["graph"]["dailyCommits"].is_object());
        assert!(json["health"]["healthScore"].is_number());
    }
}
