use std::sync::OnceLock;

use regex::Regex;
use repolens_core::{CommitStats, FileChange};
use tracing::debug;

use crate::numstat::{file_change, parse_count};

fn summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(\d+) files? changed",
            r"(?:, (\d+) insertions?\(\+\))?",
            r"(?:, (\d+) deletions?\(-\))?\s*$",
        ))
        .expect("valid summary regex")
    })
}

fn file_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(.+?)\s+\|\s+(\d+)(?:\s+([+-]+))?\s*$").expect("valid file line regex")
    })
}

fn binary_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(.+?)\s+\|\s+Bin\b").expect("valid binary line regex"))
}

/// Parse `git diff --stat` / `git log --stat` summary text.
///
/// Per-file lines (`path | N ++--`) become [`FileChange`]s whose counts are
/// split from `N` in the proportion of the `+`/`-` graph. The totals line
/// (`N files changed, X insertions(+), Y deletions(-)`) is taken verbatim
/// and is **not** recomputed from the per-file lines; without a totals line
/// the per-file sums are used. Unrecognized lines are skipped.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_diff_stat;
///
/// let text = " src/main.rs | 12 +++++++++---\n \
///              README.md   |  2 ++\n \
///              2 files changed, 11 insertions(+), 3 deletions(-)\n";
/// let stats = parse_diff_stat(text);
/// assert_eq!(stats.files_changed, 2);
/// assert_eq!(stats.insertions, 11);
/// assert_eq!(stats.deletions, 3);
/// assert_eq!(stats.files[0].path, "src/main.rs");
/// ```
pub fn parse_diff_stat(text: &str) -> CommitStats {
    let mut files: Vec<FileChange> = Vec::new();
    let mut totals: Option<(u64, u64, u64)> = None;
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = summary_re().captures(line) {
            let count = |i: usize| caps.get(i).and_then(|m| parse_count(m.as_str())).unwrap_or(0);
            totals = Some((count(1), count(2), count(3)));
            continue;
        }

        if let Some(caps) = binary_line_re().captures(line) {
            files.push(file_change(caps[1].trim(), 0, 0, true));
            continue;
        }

        if let Some(caps) = file_line_re().captures(line) {
            let Some(changes) = parse_count(&caps[2]) else {
                skipped += 1;
                continue;
            };
            let graph = caps.get(3).map_or("", |m| m.as_str());
            let (insertions, deletions) = split_changes(changes, graph);
            files.push(file_change(caps[1].trim(), insertions, deletions, false));
            continue;
        }

        skipped += 1;
    }

    if skipped > 0 {
        debug!(skipped, "diff-stat lines not recognized");
    }

    match totals {
        Some((files_changed, insertions, deletions)) => CommitStats {
            files_changed,
            insertions,
            deletions,
            files,
        },
        None => CommitStats::from_files(files),
    }
}

/// Divide a per-file change count between insertions and deletions.
///
/// The graph is scaled down for large changes, so it only gives the ratio.
fn split_changes(changes: u64, graph: &str) -> (u64, u64) {
    let plus = graph.chars().filter(|&c| c == '+').count() as u64;
    let minus = graph.chars().filter(|&c| c == '-').count() as u64;
    match (plus, minus) {
        (0, 0) => (0, 0),
        (_, 0) => (changes, 0),
        (0, _) => (0, changes),
        _ if plus + minus == changes => (plus, minus),
        _ => {
            // Widened so counts near u64::MAX cannot overflow the product.
            let (c, p, m) = (u128::from(changes), u128::from(plus), u128::from(minus));
            let insertions = ((c * p + (p + m) / 2) / (p + m)).min(c) as u64;
            (insertions, changes - insertions)
        }
    }
}
