use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Trait defining Git operations required by the library
pub trait Git {
    /// Run a Git command with the given arguments and return its raw stdout
    ///
    /// # Errors
    ///
    /// Returns an error if the git command cannot be executed or exits unsuccessfully
    fn run_git_command(&self, args: &[&str]) -> impl Future<Output = Result<String>> + Send;
}

/// Implementation of Git operations using the local Git CLI
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    /// Creates a new `GitCli` that runs every command from `work_dir`
    #[must_use]
    pub const fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }
}

impl Git for GitCli {
    #[instrument(skip(self), fields(args = ?args, work_dir = %self.work_dir.display()))]
    async fn run_git_command(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|e| Error::GitCommandError(e.to_string()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            debug!(error = %error, "Git command failed");
            return Err(Error::GitCommandError(error.trim_end().to_string()));
        }

        let result =
            String::from_utf8(output.stdout).map_err(|e| Error::GitCommandError(e.to_string()))?;

        debug!(
            output_length = result.len(),
            "Git command completed successfully"
        );
        Ok(result)
    }
}

/// Resolve the top level of the work tree enclosing the git working directory.
///
/// # Errors
///
/// Any failure is reported as [`Error::NotARepository`]; callers use it to fall back
/// to a plain listing.
#[instrument(skip(git))]
pub async fn show_toplevel(git: &impl Git) -> Result<PathBuf> {
    let output = git
        .run_git_command(&["rev-parse", "--show-toplevel"])
        .await
        .map_err(|e| Error::NotARepository(e.to_string()))?;

    let root = output.trim();
    if root.is_empty() {
        return Err(Error::NotARepository("empty top level".to_string()));
    }

    debug!(root = %root, "Repository root discovered");
    Ok(PathBuf::from(root))
}

/// Run both porcelain status queries for `dir` concurrently.
///
/// The first report includes ignored entries (untracked directories collapsed), the
/// second lists every untracked file individually. Listing both in one query would
/// recurse into ignored directories.
///
/// # Errors
///
/// Returns an error if either query fails.
#[instrument(skip(git), fields(dir = %dir.display()))]
pub async fn status_reports(git: &impl Git, dir: &Path) -> Result<[String; 2]> {
    let pathspec = dir.to_string_lossy();
    let pathspec: &str = &pathspec;
    let ignored_args = ["status", "--porcelain", "--ignored", "--", pathspec];
    let untracked_args = [
        "status",
        "--porcelain",
        "--untracked-files=all",
        "--",
        pathspec,
    ];

    let (ignored, untracked) = tokio::try_join!(
        git.run_git_command(&ignored_args),
        git.run_git_command(&untracked_args),
    )?;

    debug!(
        ignored_length = ignored.len(),
        untracked_length = untracked.len(),
        "Status reports collected"
    );
    Ok([ignored, untracked])
}
