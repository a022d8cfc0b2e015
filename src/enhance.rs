//! Parallel per-contributor statistics.

use std::sync::Arc;

use repolens_analytics::ContributorBuilder;
use repolens_core::{Commit, Contributor, LensError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::repository::RepositoryOps;

/// A contributor after enhancement.
///
/// On failure `contributor` is the unchanged input record and `error` says
/// why.
#[derive(Debug)]
pub struct EnhancedContributor {
    /// Full statistics, or the input record on failure.
    pub contributor: Contributor,
    /// Why the lookup failed, if it did.
    pub error: Option<LensError>,
}

impl EnhancedContributor {
    /// Whether the full statistics were computed.
    pub fn is_enhanced(&self) -> bool {
        self.error.is_none()
    }
}

/// Rebuild a contributor's statistics from their own commits.
///
/// Only commits whose author email equals the contributor's are counted.
pub fn enhance_from_commits(base: &Contributor, commits: &[Commit]) -> Contributor {
    let mut builder = ContributorBuilder::new(&base.name, &base.email);
    for commit in commits.iter().filter(|c| c.author.email == base.email) {
        builder.record(commit);
    }
    builder.finish()
}

/// Fetch and aggregate each contributor's commits on a bounded worker pool.
///
/// At most `max_parallel` lookups run at once (minimum one). Output order
/// matches `contributors` regardless of completion order. A failed lookup
/// leaves that contributor's base record in place and does not affect the
/// others.
pub async fn enhance_contributors<R>(
    repo: Arc<R>,
    contributors: Vec<Contributor>,
    max_parallel: usize,
) -> Vec<EnhancedContributor>
where
    R: RepositoryOps + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();

    for (index, base) in contributors.iter().enumerate() {
        let repo = Arc::clone(&repo);
        let semaphore = Arc::clone(&semaphore);
        let base = base.clone();
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, Err(LensError::Validation("worker pool closed".into())));
            };
            let outcome = repo
                .author_commits(&base.email)
                .await
                .map(|commits| enhance_from_commits(&base, &commits));
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<Result<Contributor, LensError>>> =
        (0..contributors.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => warn!(error = %e, "enhancement task aborted"),
        }
    }

    let enhanced: Vec<EnhancedContributor> = contributors
        .into_iter()
        .zip(slots)
        .map(|(base, slot)| match slot {
            Some(Ok(contributor)) => EnhancedContributor {
                contributor,
                error: None,
            },
            Some(Err(e)) => {
                warn!(email = %base.email, error = %e, "contributor enhancement failed");
                EnhancedContributor {
                    contributor: base,
                    error: Some(e),
                }
            }
            None => EnhancedContributor {
                error: Some(LensError::Execution {
                    command: "log".to_string(),
                    code: None,
                    message: format!("enhancement task for {} did not finish", base.email),
                }),
                contributor: base,
            },
        })
        .collect();

    debug!(
        total = enhanced.len(),
        failed = enhanced.iter().filter(|e| !e.is_enhanced()).count(),
        "enhanced contributors"
    );
    enhanced
}
