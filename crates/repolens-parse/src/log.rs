use chrono::{DateTime, FixedOffset};
use repolens_core::{Commit, CommitStats, FileChange, Signature};
use tracing::debug;

use crate::numstat::parse_numstat_line;

/// `git log --format` string whose output [`parse_commit_log`] understands.
pub const LOG_FORMAT: &str = "%H|%an|%ae|%ad|%cn|%ce|%cd|%s|%P|%T";

/// Layout of `%ad`/`%cd` under `--date=iso`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const HEADER_FIELDS: usize = 10;

struct PendingCommit {
    commit: Commit,
    files: Vec<FileChange>,
}

/// Parse `git log --format=<LOG_FORMAT> --date=iso --numstat` output.
///
/// Each commit is a header line followed by zero or more numstat lines;
/// blank lines are ignored. A header that does not split into ten
/// pipe-separated fields, lacks a hash or an author/committer name or
/// email, or carries an unparsable date is dropped **together with** the
/// numstat lines that follow it. Nothing here returns an error.
///
/// A subject containing `|` is recovered by taking seven fields from the
/// left and two from the right.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_commit_log;
///
/// let log = "abc123|John Doe|john@example.com|2024-01-15 10:30:00 -0800|\
///            John Doe|john@example.com|2024-01-15 10:30:00 -0800|\
///            Initial commit|parent123|tree456\n\
///            \n\
///            5\t2\tREADME.md\n\
///            10\t0\tsrc/main.go\n";
/// let commits = parse_commit_log(log);
/// assert_eq!(commits.len(), 1);
/// assert_eq!(commits[0].hash, "abc123");
/// assert_eq!(commits[0].stats.files_changed, 2);
/// assert_eq!(commits[0].stats.insertions, 15);
/// assert_eq!(commits[0].stats.deletions, 2);
/// ```
pub fn parse_commit_log(text: &str) -> Vec<Commit> {
    let mut commits = Vec::new();
    let mut current: Option<PendingCommit> = None;
    let mut skipped_headers = 0usize;
    let mut orphan_lines = 0usize;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(change) = parse_numstat_line(line) {
            match current.as_mut() {
                Some(pending) => pending.files.push(change),
                None => orphan_lines += 1,
            }
            continue;
        }

        flush(&mut current, &mut commits);
        match parse_header(line) {
            Some(commit) => {
                current = Some(PendingCommit {
                    commit,
                    files: Vec::new(),
                })
            }
            None => {
                skipped_headers += 1;
                debug!(line, "skipping malformed commit header");
            }
        }
    }
    flush(&mut current, &mut commits);

    if skipped_headers > 0 || orphan_lines > 0 {
        debug!(
            parsed = commits.len(),
            skipped_headers, orphan_lines, "commit log parsed with dropped input"
        );
    }
    commits
}

fn flush(current: &mut Option<PendingCommit>, commits: &mut Vec<Commit>) {
    if let Some(PendingCommit { mut commit, files }) = current.take() {
        commit.stats = CommitStats::from_files(files);
        commits.push(commit);
    }
}

fn parse_header(line: &str) -> Option<Commit> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < HEADER_FIELDS {
        return None;
    }
    let n = fields.len();

    let hash = fields[0].trim();
    if hash.is_empty() || hash.contains(char::is_whitespace) {
        return None;
    }

    let author = signature(fields[1], fields[2], fields[3])?;
    let committer = signature(fields[4], fields[5], fields[6])?;
    let message = fields[7..n - 2].join("|");
    let parents = fields[n - 2]
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let tree = fields[n - 1].trim().to_string();

    Some(Commit {
        hash: hash.to_string(),
        message,
        author,
        committer,
        parents,
        tree,
        stats: CommitStats::default(),
    })
}

fn signature(name: &str, email: &str, date: &str) -> Option<Signature> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() {
        return None;
    }
    Some(Signature {
        name: name.to_string(),
        email: email.to_string(),
        date: parse_git_date(date)?,
    })
}

/// Parse an `--date=iso` timestamp, keeping its offset.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_git_date;
///
/// let date = parse_git_date("2024-01-15 10:30:00 -0800").unwrap();
/// assert_eq!(date.offset().local_minus_utc(), -8 * 3600);
/// assert!(parse_git_date("yesterday").is_none());
/// ```
pub fn parse_git_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
