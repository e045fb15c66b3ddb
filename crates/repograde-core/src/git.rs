//! Git metadata for graded repositories.

use std::path::Path;
use std::process::Command;

/// Descriptor recorded when git metadata cannot be read.
pub const UNKNOWN_COMMIT: &str = "Unknown";

/// Committer date of the most recent commit, as printed by
/// `git log -1 --format=%cd`.
///
/// Returns [`UNKNOWN_COMMIT`] when git is missing, the directory is not a
/// repository, or the repository has no commits.
pub fn last_commit_date(repo_dir: &Path) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_dir)
        .args(["log", "-1", "--format=%cd"])
        .output();

    match output {
        Ok(o) if o.status.success() => {
            let date = String::from_utf8_lossy(&o.stdout).trim().to_string();
            if date.is_empty() {
                UNKNOWN_COMMIT.to_string()
            } else {
                date
            }
        }
        Ok(o) => {
            tracing::debug!(
                repo = %repo_dir.display(),
                stderr = %String::from_utf8_lossy(&o.stderr).trim(),
                "git log failed"
            );
            UNKNOWN_COMMIT.to_string()
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to run git");
            UNKNOWN_COMMIT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[test]
    fn last_commit_date_reads_head() {
        let repo = make_git_repo();
        let date = last_commit_date(repo.path());
        assert_ne!(date, UNKNOWN_COMMIT);
        assert!(!date.is_empty());
    }

    #[test]
    fn last_commit_date_unknown_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(last_commit_date(dir.path()), UNKNOWN_COMMIT);
    }

    #[test]
    fn last_commit_date_unknown_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(last_commit_date(&dir.path().join("gone")), UNKNOWN_COMMIT);
    }
}
