//! Core types, configuration, and error handling for repolens.
//!
//! This crate provides the shared foundation used by all other repolens crates:
//! - [`LensError`]: unified error type using `thiserror`
//! - [`LensConfig`]: executor limits, analysis window and filter options
//! - The history model: [`Commit`], [`FileChange`], [`Contributor`],
//!   [`ContributionGraph`], [`HealthMetrics`]

mod config;
mod error;
mod types;

pub use config::{
    AnalysisConfig, AuthorMatch, ExecutorConfig, FilterOptions, LensConfig, MessageMatch,
    SizeBounds, TimeRange,
};
pub use error::{ErrorKind, LensError};
pub use types::{
    ActivityTrend, Commit, CommitStats, ContributionGraph, Contributor, FileChange, FileStatus,
    HealthMetrics, MonthlyGrowth, Signature, Streaks,
};

/// A convenience `Result` type for repolens operations.
pub type Result<T> = std::result::Result<T, LensError>;
