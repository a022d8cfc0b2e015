use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use repolens::{analyze_repository, GitRepository, LogQuery, RepositoryOps};
use repolens_core::{ErrorKind, ExecutorConfig, FileStatus, LensConfig};

fn git(dir: &Path, args: &[&str], who: (&str, &str), date: &str) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", who.0)
        .env("GIT_AUTHOR_EMAIL", who.1)
        .env("GIT_COMMITTER_NAME", who.0)
        .env("GIT_COMMITTER_EMAIL", who.1)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

const ADA: (&str, &str) = ("Ada Lovelace", "ada@example.com");
const BOB: (&str, &str) = ("Bob Ross", "bob@example.com");

/// Three commits by two authors on consecutive days.
fn fixture_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();
    let day1 = "2024-01-15T10:30:00-08:00";
    git(p, &["init", "-q", "-b", "main"], ADA, day1);

    std::fs::write(p.join("README.md"), "hello\nworld\n").unwrap();
    git(p, &["add", "README.md"], ADA, day1);
    git(p, &["commit", "-q", "-m", "Initial commit"], ADA, day1);

    std::fs::create_dir(p.join("src")).unwrap();
    std::fs::write(p.join("src/main.rs"), "fn main() {}\n").unwrap();
    git(p, &["add", "."], BOB, "2024-01-16T09:00:00+01:00");
    git(p, &["commit", "-q", "-m", "Add entry point"], BOB, "2024-01-16T09:00:00+01:00");

    std::fs::remove_file(p.join("README.md")).unwrap();
    git(p, &["add", "-A"], ADA, "2024-01-17T12:00:00-08:00");
    git(p, &["commit", "-q", "-m", "Drop readme"], ADA, "2024-01-17T12:00:00-08:00");

    dir
}

#[tokio::test]
async fn open_rejects_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = GitRepository::open(dir.path(), &ExecutorConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotARepository);
}

#[tokio::test]
async fn reads_log_with_numstat() {
    let dir = fixture_repo();
    let repo = GitRepository::open(dir.path(), &ExecutorConfig::default())
        .await
        .unwrap();

    let commits = repo.commit_log(&LogQuery::default()).await.unwrap();
    assert_eq!(commits.len(), 3);

    let newest = &commits[0];
    assert_eq!(newest.message, "Drop readme");
    assert_eq!(newest.stats.files[0].status, FileStatus::Deleted);
    assert_eq!(newest.stats.deletions, 2);

    let root = &commits[2];
    assert!(root.is_root());
    assert_eq!(root.hash.len(), 40);
    assert_eq!(root.author.date.to_rfc3339(), "2024-01-15T10:30:00-08:00");
    assert_eq!(root.stats.files[0].status, FileStatus::Added);
}

#[tokio::test]
async fn log_query_pushes_down_window() {
    let dir = fixture_repo();
    let repo = GitRepository::open(dir.path(), &ExecutorConfig::default())
        .await
        .unwrap();

    let query = LogQuery {
        author: Some("Bob".into()),
        ..LogQuery::default()
    };
    let commits = repo.commit_log(&query).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].author.email, "bob@example.com");
}

#[tokio::test]
async fn metadata_commands() {
    let dir = fixture_repo();
    let repo = GitRepository::open(dir.path(), &ExecutorConfig::default())
        .await
        .unwrap();

    assert_eq!(repo.commit_count().await.unwrap(), 3);
    assert_eq!(repo.branches().await.unwrap(), vec!["main"]);
    assert!(repo.tool_version().await.unwrap().starts_with('2'));

    let contributors = repo.contributors().await.unwrap();
    assert_eq!(contributors.len(), 2);
    assert_eq!(contributors[0].email, "ada@example.com");
    assert_eq!(contributors[0].total_commits, 2);

    let ada = repo.author_commits("ada@example.com").await.unwrap();
    assert_eq!(ada.len(), 2);
    assert!(ada.iter().all(|c| c.author.email == "ada@example.com"));
}

#[tokio::test]
async fn one_email_under_two_names_is_one_contributor() {
    let dir = fixture_repo();
    let p = dir.path();
    let short_name = ("Ada", "ada@example.com");
    std::fs::write(p.join("NOTES"), "n\n").unwrap();
    git(p, &["add", "NOTES"], short_name, "2024-01-18T08:00:00-08:00");
    git(p, &["commit", "-q", "-m", "Notes"], short_name, "2024-01-18T08:00:00-08:00");

    let repo = Arc::new(GitRepository::open(p, &ExecutorConfig::default()).await.unwrap());
    let contributors = repo.contributors().await.unwrap();
    assert_eq!(contributors.len(), 2);
    let ada = contributors
        .iter()
        .find(|c| c.email == "ada@example.com")
        .unwrap();
    assert_eq!(ada.total_commits, 3);

    let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
    let report = analyze_repository(repo, &LensConfig::default(), now).await.unwrap();
    assert_eq!(report.analysis.health.contributor_count, 2);
    let ada = report
        .analysis
        .contributors
        .iter()
        .find(|c| c.email == "ada@example.com")
        .unwrap();
    assert_eq!(ada.total_commits, 3);
}

#[tokio::test]
async fn end_to_end_report() {
    let dir = fixture_repo();
    let config = LensConfig::default();
    let repo = Arc::new(GitRepository::open(dir.path(), &config.executor).await.unwrap());
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();

    let report = analyze_repository(repo, &config, now).await.unwrap();
    assert_eq!(report.commits_analyzed, 3);
    assert!(report.enhancement_failures.is_empty());

    let analysis = &report.analysis;
    assert_eq!(analysis.graph.total_commits, 3);
    assert_eq!(analysis.streaks.longest, 3);
    assert_eq!(analysis.health.contributor_count, 2);
    assert_eq!(analysis.health.active_contributors, 2);
    assert_eq!(analysis.contributors[0].active_days, 2);
}
