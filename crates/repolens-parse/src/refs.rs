use tracing::debug;

/// Parse `git branch -a` output into branch names.
///
/// Strips the current-branch (`* `) and worktree (`+ `) markers and the
/// two-space indent, rewrites `remotes/<remote>/<name>` to `<remote>/<name>`,
/// and drops symbolic refs (`origin/HEAD -> origin/main`) and detached-HEAD
/// lines.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_branches;
///
/// let text = "* main\n  feature/x\n  remotes/origin/HEAD -> origin/main\n  remotes/origin/main\n";
/// assert_eq!(parse_branches(text), vec!["main", "feature/x", "origin/main"]);
/// ```
pub fn parse_branches(text: &str) -> Vec<String> {
    let mut branches = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        let name = line
            .strip_prefix("* ")
            .or_else(|| line.strip_prefix("+ "))
            .unwrap_or(line)
            .trim();

        if name.is_empty() {
            continue;
        }
        if name.contains(" -> ") {
            debug!(line, "skipping symbolic ref");
            continue;
        }
        if name.starts_with('(') {
            debug!(line, "skipping detached HEAD");
            continue;
        }

        let name = name.strip_prefix("remotes/").unwrap_or(name);
        branches.push(name.to_string());
    }

    branches
}

/// Parse `git rev-list --count` output.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_commit_count;
///
/// assert_eq!(parse_commit_count("1234\n"), Some(1234));
/// assert_eq!(parse_commit_count("fatal: bad revision"), None);
/// ```
pub fn parse_commit_count(text: &str) -> Option<u64> {
    crate::numstat::parse_count(text.trim())
}

/// Extract the version number from `git version` output.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_version;
///
/// assert_eq!(parse_version("git version 2.43.0\n").as_deref(), Some("2.43.0"));
/// assert_eq!(parse_version("git version 2.39.3 (Apple Git-146)").as_deref(), Some("2.39.3"));
/// assert_eq!(parse_version("hello"), None);
/// ```
pub fn parse_version(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix("git version ")?;
    rest.split_whitespace().next().map(str::to_string)
}
