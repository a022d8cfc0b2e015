//! Per-file line counts and the status heuristic shared by the log and
//! diff-stat parsers.

use repolens_core::{FileChange, FileStatus};

/// Guess a file's status from its line counts.
///
/// Numstat text carries no real diff status, so this is an approximation:
/// a rename path wins, pure additions count as `Added`, pure deletions as
/// `Deleted`, and everything else (including binary 0/0) as `Modified`.
/// `Copied` is never produced.
///
/// # Examples
///
/// ```
/// use repolens_core::FileStatus;
/// use repolens_parse::infer_status;
///
/// assert_eq!(infer_status(10, 0, false), FileStatus::Added);
/// assert_eq!(infer_status(0, 4, false), FileStatus::Deleted);
/// assert_eq!(infer_status(3, 1, false), FileStatus::Modified);
/// assert_eq!(infer_status(0, 0, false), FileStatus::Modified);
/// assert_eq!(infer_status(3, 0, true), FileStatus::Renamed);
/// ```
pub fn infer_status(insertions: u64, deletions: u64, renamed: bool) -> FileStatus {
    if renamed {
        FileStatus::Renamed
    } else if insertions > 0 && deletions == 0 {
        FileStatus::Added
    } else if deletions > 0 && insertions == 0 {
        FileStatus::Deleted
    } else {
        FileStatus::Modified
    }
}

/// Parse `insertions<TAB>deletions<TAB>path`.
///
/// A `-` in either count marks a binary file, recorded as 0/0.
pub(crate) fn parse_numstat_line(line: &str) -> Option<FileChange> {
    let mut parts = line.splitn(3, '\t');
    let ins = parts.next()?.trim();
    let del = parts.next()?.trim();
    let path = parts.next()?.trim();
    if path.is_empty() {
        return None;
    }

    let (insertions, deletions, binary) = if ins == "-" || del == "-" {
        // Both columns must still be well-formed.
        let malformed = |col: &str| col != "-" && parse_count(col).is_none();
        if malformed(ins) || malformed(del) {
            return None;
        }
        (0, 0, true)
    } else {
        (parse_count(ins)?, parse_count(del)?, false)
    };

    Some(file_change(path, insertions, deletions, binary))
}

pub(crate) fn file_change(path: &str, insertions: u64, deletions: u64, binary: bool) -> FileChange {
    let (path, old_path) = expand_rename(path);
    FileChange {
        status: infer_status(insertions, deletions, old_path.is_some()),
        path,
        insertions,
        deletions,
        binary,
        old_path,
    }
}

/// Digits only; `str::parse` would also accept a leading `+`.
pub(crate) fn parse_count(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Split git's rename notation into `(new_path, Some(old_path))`.
///
/// Handles both `old => new` and `dir/{old => new}/file`, including the
/// empty-side form `dir/{ => sub}/file`.
pub(crate) fn expand_rename(path: &str) -> (String, Option<String>) {
    if let Some(open) = path.find('{') {
        if let Some(close_rel) = path[open..].find('}') {
            let close = open + close_rel;
            if let Some((old_mid, new_mid)) = path[open + 1..close].split_once(" => ") {
                let prefix = &path[..open];
                let suffix = &path[close + 1..];
                let old = normalize_slashes(&format!("{prefix}{old_mid}{suffix}"));
                let new = normalize_slashes(&format!("{prefix}{new_mid}{suffix}"));
                return (new, Some(old));
            }
        }
    }

    if let Some((old, new)) = path.split_once(" => ") {
        return (new.trim().to_string(), Some(old.trim().to_string()));
    }

    (path.to_string(), None)
}

fn normalize_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && (out.is_empty() || out.ends_with('/')) {
            continue;
        }
        out.push(c);
    }
    out
}
