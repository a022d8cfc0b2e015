//! End-to-end analysis: read history, filter it, analyze it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use repolens_analytics::{analyze, AnalysisResult};
use repolens_core::{LensConfig, Result};
use repolens_filter::FilterChain;
use serde::Serialize;
use tracing::info;

use crate::enhance::enhance_contributors;
use crate::repository::{LogQuery, RepositoryOps};

/// A contributor whose enhancement failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementFailure {
    /// Contributor email.
    pub email: String,
    /// Rendered error.
    pub error: String,
}

/// Output of [`analyze_repository`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Graph, streaks, health and contributors.
    pub analysis: AnalysisResult,
    /// One line per active filter.
    pub filters: Vec<String>,
    /// Branch names.
    pub branches: Vec<String>,
    /// Commits read before filtering.
    pub commits_scanned: usize,
    /// Commits that survived the filter chain.
    pub commits_analyzed: usize,
    /// Contributors kept at their base record.
    pub enhancement_failures: Vec<EnhancementFailure>,
}

/// Run the full pipeline against `repo`.
///
/// The filter chain is built first, so a bad pattern fails before any git
/// command runs. The analysis window is pushed down to `git log`; author
/// and every other predicate are applied by the chain. Contributor
/// enhancement failures are reported in the result rather than aborting it.
///
/// # Errors
///
/// Returns the first error from filter construction or from reading the
/// log, contributors or branches.
pub async fn analyze_repository<R>(
    repo: Arc<R>,
    config: &LensConfig,
    now: DateTime<Utc>,
) -> Result<AnalysisReport>
where
    R: RepositoryOps + ?Sized + 'static,
{
    config.validate()?;

    let options = config.filters.clone().with_analysis(&config.analysis);
    let chain = FilterChain::from_options(&options)?;

    let query = LogQuery {
        since: options.since,
        until: options.until,
        author: None,
    };
    let commits = repo.commit_log(&query).await?;
    let commits_scanned = commits.len();
    let filtered = chain.apply(commits);
    info!(
        scanned = commits_scanned,
        kept = filtered.len(),
        filters = chain.len(),
        "filtered history"
    );

    let stubs = repo.contributors().await?;
    let enhanced =
        enhance_contributors(Arc::clone(&repo), stubs, config.executor.max_parallel).await;
    let mut failures = Vec::new();
    let contributors: Vec<_> = enhanced
        .into_iter()
        .map(|e| {
            if let Some(err) = &e.error {
                failures.push(EnhancementFailure {
                    email: e.contributor.email.clone(),
                    error: err.to_string(),
                });
            }
            e.contributor
        })
        .collect();
    info!(
        contributors = contributors.len(),
        failed = failures.len(),
        "enhanced contributors"
    );

    let branches = repo.branches().await?;
    let analysis = analyze(&filtered, &contributors, &config.analysis, now);
    info!(
        health_score = analysis.health.health_score,
        trend = %analysis.health.activity_trend,
        "analysis complete"
    );

    Ok(AnalysisReport {
        analysis,
        filters: chain.describe(),
        branches,
        commits_scanned,
        commits_analyzed: filtered.len(),
        enhancement_failures: failures,
    })
}
