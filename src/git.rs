//! Thin wrapper over the `git` command line

use crate::fs::ensure_directory;
use crate::{Result, VibeError};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// The two git operations the setup branch needs
pub trait GitService {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    fn pull(&self, repo: &Path) -> Result<()>;
}

/// Runs the system `git` binary
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    fn run(&self, op: &str, target: &Path, args: &[&str]) -> Result<()> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .output()
            .map_err(|e| VibeError::operation(op, target, e))?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(VibeError::operation(
            op,
            target,
            VibeError::Other(format!(
                "git exited with {}\nOutput: {}",
                output.status,
                combined.trim()
            )),
        ))
    }
}

impl GitService for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_arg = dest.to_string_lossy();
        self.run("git clone", dest, &["clone", url, &dest_arg])
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        let repo_arg = repo.to_string_lossy();
        self.run("git pull", repo, &["-C", &repo_arg, "pull"])
    }
}

/// Pull when `dest` is already a checkout, clone otherwise
pub fn clone_or_pull(git: &dyn GitService, url: &str, dest: &Path, dir_mode: u32) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_directory(parent, dir_mode)?;
    }

    if dest.join(".git").exists() {
        info!(repo = %dest.display(), "updating repository");
        git.pull(dest)
    } else {
        info!(url, dest = %dest.display(), "cloning repository");
        git.clone_repo(url, dest)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl GitService for Recorder {
        fn clone_repo(&self, url: &str, _dest: &Path) -> Result<()> {
            self.calls.borrow_mut().push(format!("clone {url}"));
            Ok(())
        }

        fn pull(&self, _repo: &Path) -> Result<()> {
            self.calls.borrow_mut().push("pull".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_clones_when_not_a_checkout() {
        let dir = TempDir::new().unwrap();
        let git = Recorder::default();

        clone_or_pull(&git, "https://example.com/repo", &dir.path().join("a/b"), 0o755).unwrap();

        assert_eq!(*git.calls.borrow(), vec!["clone https://example.com/repo"]);
        assert!(dir.path().join("a").is_dir());
    }

    #[test]
    fn test_pulls_existing_checkout() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("repo/.git")).unwrap();
        let git = Recorder::default();

        clone_or_pull(&git, "https://example.com/repo", &dir.path().join("repo"), 0o755).unwrap();

        assert_eq!(*git.calls.borrow(), vec!["pull"]);
    }

    #[test]
    fn test_failed_command_is_operation_error() {
        let dir = TempDir::new().unwrap();
        // not a repository, so git either fails or is missing
        let err = GitCli.pull(dir.path()).unwrap_err();
        assert!(matches!(err, VibeError::Operation { .. }));
    }
}
