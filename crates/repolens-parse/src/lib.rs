//! Lenient parsers for git's text output.
//!
//! Turns `git log --numstat`, `--stat` summaries, `git shortlog -sne` and
//! `git branch -a` output into [`repolens_core`] records. Every function is
//! pure and total: lines that do not fit the expected shape are dropped
//! (and counted at `debug` level), never reported as errors. Callers that
//! want strictness must compare input and output sizes themselves.

mod diffstat;
mod log;
mod numstat;
mod refs;
mod shortlog;

pub use diffstat::parse_diff_stat;
pub use log::{parse_commit_log, parse_git_date, DATE_FORMAT, LOG_FORMAT};
pub use numstat::infer_status;
pub use refs::{parse_branches, parse_commit_count, parse_version};
pub use shortlog::parse_contributors;
