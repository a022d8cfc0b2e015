//! Composable commit filters.
//!
//! Every filter implements [`CommitFilter`]. A [`FilterChain`] ANDs its
//! members together and applies any limit once the predicates have run, so
//! a limit always caps the fully filtered result.

mod chain;
mod filters;

pub use chain::FilterChain;
pub use filters::{
    AuthorFilter, BranchFilter, CommitFilter, DateRangeFilter, ExcludeFilesFilter,
    IncludeFilesFilter, LimitFilter, MergeFilter, MessageFilter, SizeFilter,
};
