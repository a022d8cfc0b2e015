//! Repository insight from git history.
//!
//! repolens runs allow-listed git commands ([`repolens_exec`]), parses their
//! text output ([`repolens_parse`]), narrows the commits with composable
//! filters ([`repolens_filter`]) and computes contribution graphs, streaks
//! and health metrics ([`repolens_analytics`]). This crate wires those
//! stages together behind the [`RepositoryOps`] trait.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use repolens::{analyze_repository, GitRepository};
//! use repolens_core::LensConfig;
//!
//! # async fn run() -> repolens_core::Result<()> {
//! let config = LensConfig::default();
//! let repo = Arc::new(GitRepository::open(".", &config.executor).await?);
//! let report = analyze_repository(repo, &config, Utc::now()).await?;
//! println!("health score {:.1}", report.analysis.health.health_score);
//! # Ok(())
//! # }
//! ```

mod enhance;
mod pipeline;
mod repository;

pub use enhance::{enhance_contributors, enhance_from_commits, EnhancedContributor};
pub use pipeline::{analyze_repository, AnalysisReport, EnhancementFailure};
pub use repository::{GitRepository, InMemoryRepository, LogQuery, RepositoryOps};
