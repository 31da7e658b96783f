//! Throwaway git and hg repositories for tests.
//!
//! Fixtures are built with plain `std::process::Command` calls so they do not
//! depend on the code under test. Every commit gets a fixed author and date,
//! which keeps log output and cross-history matching deterministic.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

pub const AUTHOR_NAME: &str = "Jane Doe";
pub const AUTHOR_EMAIL: &str = "jane@example.org";
/// Epoch seconds of the first fixture commit; later commits add a minute each.
pub const BASE_EPOCH: i64 = 1_700_000_000;
/// RFC 2822 rendering of [`BASE_EPOCH`] in UTC.
pub const BASE_DATE_RFC2822: &str = "Tue, 14 Nov 2023 22:13:20 +0000";

/// Messages of the standard three-commit history, oldest first.
pub const HISTORY: [&str; 3] = [
    "Initial commit",
    "Issue 1 - Add \"quoted\" feature",
    "Noissue - Tidy up",
];

/// True when `program --version` runs successfully.
pub fn tool_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Skip the current test (by returning) when `program` is not installed.
#[macro_export]
macro_rules! require_tool {
    ($program:expr) => {
        if !$crate::test_fixtures::tool_available($program) {
            eprintln!("skipping: {} not available", $program);
            return;
        }
    };
}

fn run(program: &str, dir: &Path, args: &[&str], env: &[(&str, String)]) -> String {
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir);
    for (k, v) in env {
        cmd.env(k, v);
    }
    let out = cmd.output().expect("failed to spawn fixture command");
    assert!(
        out.status.success(),
        "{} {:?} failed: {}",
        program,
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

// ─── git ────────────────────────────────────────────────────────────

pub fn git(dir: &Path, args: &[&str]) -> String {
    run("git", dir, args, &[])
}

/// Empty git repository on `master` with a local identity and an `origin`
/// remote pointing at itself (so `fetch` succeeds offline).
pub fn git_init(dir: &Path) {
    git(dir, &["init", "-q", "."]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(dir, &["config", "user.name", AUTHOR_NAME]);
    git(dir, &["config", "user.email", AUTHOR_EMAIL]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    let own = dir.display().to_string();
    git(dir, &["remote", "add", "origin", &own]);
}

/// Write `file`, commit everything with a pinned author date and return the
/// short hash.
pub fn git_commit(dir: &Path, file: &str, content: &str, message: &str, epoch: i64) -> String {
    std::fs::write(dir.join(file), content).expect("write fixture file");
    git(dir, &["add", "-A"]);
    let date = format!("{} +0000", epoch);
    run(
        "git",
        dir,
        &["commit", "-q", "-m", message],
        &[
            ("GIT_AUTHOR_NAME", AUTHOR_NAME.to_string()),
            ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL.to_string()),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_DATE", date),
        ],
    );
    git(dir, &["log", "-1", "--format=%h"])
}

/// A git repository holding [`HISTORY`]; returns it with its short hashes.
pub fn git_history() -> (TempDir, Vec<String>) {
    let dir = TempDir::new().expect("tempdir");
    git_init(dir.path());
    let hashes = HISTORY
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            git_commit(dir.path(), "file.txt", &format!("line {}\n", i), msg, BASE_EPOCH + 60 * i as i64)
        })
        .collect();
    (dir, hashes)
}

// ─── hg ─────────────────────────────────────────────────────────────

fn hg_env() -> Vec<(&'static str, String)> {
    vec![("HGPLAIN", "1".to_string()), ("HGRCPATH", String::new())]
}

pub fn hg(dir: &Path, args: &[&str]) -> String {
    run("hg", dir, args, &hg_env())
}

/// Empty hg repository with a username and a default path pointing at
/// itself (so `pull` succeeds offline).
pub fn hg_init(dir: &Path) {
    hg(dir, &["init", "."]);
    let hgrc = format!(
        "[ui]\nusername = {} <{}>\n[paths]\ndefault = {}\n",
        AUTHOR_NAME,
        AUTHOR_EMAIL,
        dir.display()
    );
    std::fs::write(dir.join(".hg").join("hgrc"), hgrc).expect("write hgrc");
}

/// Write `file`, commit with a pinned date, move the `master` bookmark and
/// return the short hash.
pub fn hg_commit(dir: &Path, file: &str, content: &str, message: &str, epoch: i64) -> String {
    std::fs::write(dir.join(file), content).expect("write fixture file");
    let user = format!("{} <{}>", AUTHOR_NAME, AUTHOR_EMAIL);
    let date = format!("{} 0", epoch);
    hg(dir, &["commit", "-A", "-m", message, "-u", &user, "-d", &date]);
    hg(dir, &["bookmark", "-f", "-r", ".", "master"]);
    hg(dir, &["log", "-r", ".", "--template", "{node|short}"])
}

/// An hg repository holding [`HISTORY`]; returns it with its short hashes.
pub fn hg_history() -> (TempDir, Vec<String>) {
    let dir = TempDir::new().expect("tempdir");
    hg_init(dir.path());
    let hashes = HISTORY
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            hg_commit(dir.path(), "file.txt", &format!("line {}\n", i), msg, BASE_EPOCH + 60 * i as i64)
        })
        .collect();
    (dir, hashes)
}
