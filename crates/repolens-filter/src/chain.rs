use repolens_core::{Commit, FilterOptions, LensError};
use tracing::debug;

use crate::filters::{
    AuthorFilter, BranchFilter, CommitFilter, DateRangeFilter, ExcludeFilesFilter,
    IncludeFilesFilter, LimitFilter, MergeFilter, MessageFilter, SizeFilter,
};

/// An ordered conjunction of commit filters.
///
/// # Examples
///
/// ```
/// use repolens_core::FilterOptions;
/// use repolens_filter::FilterChain;
///
/// let options = FilterOptions { limit: Some(5), include_merges: false, ..Default::default() };
/// let chain = FilterChain::from_options(&options).unwrap();
/// assert_eq!(chain.describe(), vec!["excluding merge commits", "limit: 5 commits"]);
/// assert!(chain.apply(Vec::new()).is_empty());
/// ```
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn CommitFilter>>,
}

impl FilterChain {
    /// An empty chain. Applying it returns its input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn push(&mut self, filter: impl CommitFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, filter: impl CommitFilter + 'static) -> Self {
        self.push(filter);
        self
    }

    /// Build a chain from options.
    ///
    /// Filters are added in a fixed order: date, author, include-files,
    /// exclude-files, merge, limit, branch, message, size. Unset options add
    /// nothing, and a limit of zero counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::InvalidPattern`] for a regex or glob that does not
    /// compile, and [`LensError::Validation`] for an inverted date range or
    /// an empty author pattern.
    pub fn from_options(options: &FilterOptions) -> Result<Self, LensError> {
        let mut chain = Self::new();

        if options.since.is_some() || options.until.is_some() {
            chain.push(DateRangeFilter::new(options.since, options.until)?);
        }
        if let Some(author) = &options.author {
            chain.push(AuthorFilter::new(
                author,
                options.author_match,
                options.case_sensitive,
            )?);
        }
        if !options.include_files.is_empty() {
            chain.push(IncludeFilesFilter::new(&options.include_files)?);
        }
        if !options.exclude_files.is_empty() {
            chain.push(ExcludeFilesFilter::new(&options.exclude_files)?);
        }
        if !options.include_merges {
            chain.push(MergeFilter);
        }
        if let Some(limit) = options.limit.filter(|&n| n > 0) {
            chain.push(LimitFilter::new(limit));
        }
        if !options.branches.is_empty() {
            chain.push(BranchFilter::new(options.branches.clone()));
        }
        if let Some(message) = &options.message {
            chain.push(MessageFilter::new(
                message,
                options.message_match,
                options.case_sensitive,
            )?);
        }
        if !options.size.is_unconstrained() {
            chain.push(SizeFilter::new(options.size));
        }

        Ok(chain)
    }

    /// Whether `commit` passes every predicate. Limits are not consulted.
    pub fn matches(&self, commit: &Commit) -> bool {
        self.filters.iter().all(|f| f.matches(commit))
    }

    /// Keep the commits that pass every predicate, in input order, then
    /// truncate to the smallest limit in the chain.
    pub fn apply(&self, commits: Vec<Commit>) -> Vec<Commit> {
        if self.filters.is_empty() {
            return commits;
        }

        let before = commits.len();
        let mut kept: Vec<Commit> = commits.into_iter().filter(|c| self.matches(c)).collect();
        if let Some(limit) = self.limit() {
            kept.truncate(limit);
        }
        debug!(before, after = kept.len(), filters = self.filters.len(), "applied filter chain");
        kept
    }

    /// The effective limit: the smallest one any filter declares.
    pub fn limit(&self) -> Option<usize> {
        self.filters.iter().filter_map(|f| f.limit()).min()
    }

    /// One line per filter, in chain order.
    pub fn describe(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.describe()).collect()
    }

    /// Number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};
    use repolens_core::{AuthorMatch, CommitStats, MessageMatch, Signature, SizeBounds};

    fn commit(hash: &str, date: &str, insertions: u64) -> Commit {
        let sig = Signature {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
        };
        Commit {
            hash: hash.into(),
            message: format!("change {hash}"),
            author: sig.clone(),
            committer: sig,
            parents: vec!["p".into()],
            tree: "t".into(),
            stats: CommitStats {
                files_changed: 1,
                insertions,
                deletions: 0,
                files: Vec::new(),
            },
        }
    }

    fn hashes(commits: &[Commit]) -> Vec<&str> {
        commits.iter().map(|c| c.hash.as_str()).collect()
    }

    #[test]
    fn empty_chain_is_identity() {
        let input = vec![
            commit("a", "2024-01-01T00:00:00Z", 1),
            commit("b", "2024-01-02T00:00:00Z", 2),
        ];
        let chain = FilterChain::from_options(&FilterOptions::default()).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.apply(input.clone()), input);
    }

    #[test]
    fn min_insertions_keeps_larger_commits() {
        let input = vec![
            commit("a", "2024-01-01T00:00:00Z", 5),
            commit("b", "2024-01-01T00:00:00Z", 50),
            commit("c", "2024-01-01T00:00:00Z", 200),
            commit("d", "2024-01-01T00:00:00Z", 1000),
        ];
        let options = FilterOptions {
            size: SizeBounds {
                min_insertions: Some(50),
                ..SizeBounds::default()
            },
            ..FilterOptions::default()
        };
        let out = FilterChain::from_options(&options).unwrap().apply(input);
        assert_eq!(hashes(&out), vec!["b", "c", "d"]);
    }

    #[test]
    fn limit_caps_the_date_filtered_set() {
        let input = vec![
            commit("old1", "2023-06-01T00:00:00Z", 1),
            commit("old2", "2023-07-01T00:00:00Z", 1),
            commit("new1", "2024-02-01T00:00:00Z", 1),
            commit("new2", "2024-03-01T00:00:00Z", 1),
            commit("new3", "2024-04-01T00:00:00Z", 1),
        ];
        let since = NaiveDate::from_ymd_opt(2024, 1, 1);

        // Limit pushed before the date filter still caps the filtered set.
        let mut chain = FilterChain::new();
        chain.push(LimitFilter::new(2));
        chain.push(DateRangeFilter::new(since, None).unwrap());
        assert_eq!(hashes(&chain.apply(input.clone())), vec!["new1", "new2"]);

        let options = FilterOptions {
            since,
            limit: Some(2),
            ..FilterOptions::default()
        };
        let chain = FilterChain::from_options(&options).unwrap();
        assert_eq!(hashes(&chain.apply(input)), vec!["new1", "new2"]);
    }

    #[test]
    fn smallest_limit_wins() {
        let input: Vec<_> = (0..10)
            .map(|i| commit(&i.to_string(), "2024-01-01T00:00:00Z", 1))
            .collect();
        let chain = FilterChain::new()
            .with(LimitFilter::new(7))
            .with(LimitFilter::new(3));
        assert_eq!(chain.limit(), Some(3));
        assert_eq!(chain.apply(input).len(), 3);
    }

    #[test]
    fn zero_limit_is_no_limit() {
        let input: Vec<_> = (0..4)
            .map(|i| commit(&i.to_string(), "2024-01-01T00:00:00Z", 1))
            .collect();
        let options = FilterOptions {
            limit: Some(0),
            ..FilterOptions::default()
        };
        let chain = FilterChain::from_options(&options).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.limit(), None);
        assert_eq!(chain.apply(input.clone()).len(), 4);

        let chain = FilterChain::new().with(LimitFilter::new(0));
        assert_eq!(chain.apply(input).len(), 4);
    }

    #[test]
    fn from_options_uses_fixed_order() {
        let options = FilterOptions {
            since: NaiveDate::from_ymd_opt(2024, 1, 1),
            author: Some("alice".into()),
            message: Some("fix".into()),
            message_match: MessageMatch::StartsWith,
            include_files: vec!["*.rs".into()],
            exclude_files: vec!["*.lock".into()],
            include_merges: false,
            limit: Some(10),
            branches: vec!["main".into()],
            size: SizeBounds {
                max_files: Some(20),
                ..SizeBounds::default()
            },
            ..FilterOptions::default()
        };
        let chain = FilterChain::from_options(&options).unwrap();
        let described = chain.describe();
        assert_eq!(chain.len(), 9);
        let prefixes: Vec<&str> = described
            .iter()
            .map(|d| d.split([':', ' ']).next().unwrap_or_default())
            .collect();
        assert_eq!(
            prefixes,
            vec![
                "date", "author", "files", "excluding", "excluding", "limit", "branches",
                "message", "size"
            ]
        );
        assert_eq!(described[4], "excluding merge commits");
    }

    #[test]
    fn invalid_patterns_fail_at_construction() {
        let bad_regex = FilterOptions {
            author: Some("[".into()),
            author_match: AuthorMatch::Regex,
            ..FilterOptions::default()
        };
        assert!(matches!(
            FilterChain::from_options(&bad_regex),
            Err(LensError::InvalidPattern { .. })
        ));

        let bad_glob = FilterOptions {
            exclude_files: vec!["src/[".into()],
            ..FilterOptions::default()
        };
        assert!(matches!(
            FilterChain::from_options(&bad_glob),
            Err(LensError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn apply_preserves_input_order() {
        let input = vec![
            commit("z", "2024-01-03T00:00:00Z", 100),
            commit("y", "2024-01-01T00:00:00Z", 1),
            commit("x", "2024-01-02T00:00:00Z", 100),
        ];
        let options = FilterOptions {
            size: SizeBounds {
                min_insertions: Some(10),
                ..SizeBounds::default()
            },
            ..FilterOptions::default()
        };
        let out = FilterChain::from_options(&options).unwrap().apply(input);
        assert_eq!(hashes(&out), vec!["z", "x"]);
    }
}
