//! GitCli against real repositories in temp directories.

use std::path::Path;
use std::process::Command;

use pubflow_core::ports::{CommitAuthor, GitPort};
use pubflow_github::GitCli;

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A work tree on `master` with one commit and a bare `origin`.
fn make_repos() -> (tempfile::TempDir, tempfile::TempDir) {
    let remote = tempfile::tempdir().unwrap();
    run_git(remote.path(), &["init", "--bare"]);

    let work = tempfile::tempdir().unwrap();
    run_git(work.path(), &["init"]);
    run_git(work.path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);
    std::fs::write(work.path().join("bots.json"), "[]\n").unwrap();
    run_git(work.path(), &["add", "-A"]);
    run_git(
        work.path(),
        &[
            "-c",
            "user.name=seed",
            "-c",
            "user.email=seed@example.com",
            "commit",
            "-m",
            "seed",
        ],
    );
    let remote_path = remote.path().to_string_lossy().to_string();
    run_git(work.path(), &["remote", "add", "origin", &remote_path]);
    (work, remote)
}

#[tokio::test]
async fn publish_cycle_commits_and_pushes() {
    let (work, remote) = make_repos();
    let git = GitCli::new(work.path());

    git.switch_create("publish/issue1").await.unwrap();
    git.reset_hard("master").await.unwrap();
    std::fs::write(work.path().join("bots.json"), "[{\"name\": \"x\"}]\n").unwrap();
    git.add_all().await.unwrap();
    git.commit(":beers: publish bot x", &CommitAuthor::for_login("he0119"))
        .await
        .unwrap();
    git.push("publish/issue1", true).await.unwrap();

    let log = run_git(
        remote.path(),
        &["log", "-1", "--format=%an|%ae|%s", "publish/issue1"],
    );
    assert_eq!(log, "he0119|he0119@users.noreply.github.com|:beers: publish bot x");

    git.delete_remote_branch("publish/issue1").await.unwrap();
    let refs = run_git(remote.path(), &["for-each-ref", "--format=%(refname)"]);
    assert!(!refs.contains("publish/issue1"), "remote refs: {refs}");

    let err = git.delete_remote_branch("publish/issue1").await.unwrap_err();
    assert_eq!(err.command, "push");
}

#[tokio::test]
async fn switch_create_restarts_existing_branch() {
    let (work, _remote) = make_repos();
    let git = GitCli::new(work.path());

    git.switch_create("publish/issue2").await.unwrap();
    std::fs::write(work.path().join("bots.json"), "[1]\n").unwrap();
    git.add_all().await.unwrap();
    git.commit("first attempt", &CommitAuthor::for_login("a"))
        .await
        .unwrap();

    run_git(work.path(), &["checkout", "master"]);
    git.switch_create("publish/issue2").await.unwrap();

    assert_eq!(run_git(work.path(), &["log", "-1", "--format=%s"]), "seed");
    assert_eq!(
        run_git(work.path(), &["rev-parse", "--abbrev-ref", "HEAD"]),
        "publish/issue2"
    );
}

#[tokio::test]
async fn failures_carry_command_and_stderr() {
    let (work, _remote) = make_repos();
    let git = GitCli::new(work.path());

    let err = git.reset_hard("no-such-ref").await.unwrap_err();
    assert_eq!(err.command, "reset");
    assert!(!err.message.is_empty());

    let missing = GitCli::new(work.path().join("missing"));
    let err = missing.add_all().await.unwrap_err();
    assert!(err.message.contains("failed to run git"));
}
