use crate::error::Result;
use crate::git::{self, Git, GitCli};
use crate::metadata;
use crate::reconcile::reconcile;
use crate::status;
use crate::types::{ColumnWidths, Listing, ListingMode, ListingOptions, StatusMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Lists a directory, annotating entries with git status when it sits in a work tree
pub struct Lister<G = GitCli> {
    git: G,
    dir: PathBuf,
    options: ListingOptions,
}

impl Lister<GitCli> {
    /// Create a lister for `dir` backed by the local git CLI
    #[instrument(skip(dir))]
    pub fn new(dir: &Path, options: ListingOptions) -> Self {
        debug!(dir = %dir.display(), "Creating lister");
        Self::with_git(GitCli::new(dir.to_path_buf()), dir, options)
    }
}

impl<G: Git> Lister<G> {
    /// Create a lister that runs its git queries through `git`
    pub fn with_git(git: G, dir: &Path, options: ListingOptions) -> Self {
        Self {
            git,
            dir: dir.to_path_buf(),
            options,
        }
    }

    /// Build the listing.
    ///
    /// Falls back to a plain listing when the directory is not inside a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be read
    /// - A status query fails inside a repository
    /// - Metadata cannot be read for a listed file
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn list(&self) -> Result<Listing> {
        let dir = tokio::fs::canonicalize(&self.dir).await?;

        match git::show_toplevel(&self.git).await {
            Ok(root) => {
                let root = tokio::fs::canonicalize(&root).await.unwrap_or(root);
                debug!(root = %root.display(), "Listing inside repository");
                self.list_git(dir, root).await
            }
            Err(e) => {
                debug!(error = %e, "Falling back to plain listing");
                self.list_plain(dir).await
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_git(&self, dir: PathBuf, root: PathBuf) -> Result<Listing> {
        let reports = git::status_reports(&self.git, &dir).await?;

        let mut statuses = status::parse_status(&reports, &root, &dir);
        status::remove_untracked_folders(&mut statuses);
        if !self.options.all {
            status::remove_hidden(&mut statuses);
        }

        let names = metadata::read_dir_names(&dir, self.options.all).await?;
        let reconciled = reconcile(statuses, &names);

        let (entries, total_blocks) = metadata::collect_entries(&dir, reconciled).await?;
        Ok(Listing {
            widths: ColumnWidths::from_entries(&entries),
            dir,
            mode: ListingMode::Git { root },
            total_blocks,
            entries,
        })
    }

    /// `.` and `..` are dot entries, so like every other hidden name they need `all`.
    #[instrument(skip(self))]
    async fn list_plain(&self, dir: PathBuf) -> Result<Listing> {
        let mut names = metadata::read_dir_names(&dir, self.options.all).await?;
        if self.options.all {
            names.extend([OsString::from("."), OsString::from("..")]);
        }
        let reconciled = reconcile(StatusMap::new(), &names);

        let (entries, total_blocks) = metadata::collect_entries(&dir, reconciled).await?;
        Ok(Listing {
            widths: ColumnWidths::from_entries(&entries),
            dir,
            mode: ListingMode::Plain,
            total_blocks,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use tree_fs::{Tree, TreeBuilder};

    struct FakeGit {
        toplevel: Option<PathBuf>,
        ignored: String,
        untracked: String,
        fail_status: bool,
    }

    impl FakeGit {
        fn repo(root: &Path, ignored: &str, untracked: &str) -> Self {
            Self {
                toplevel: Some(root.to_path_buf()),
                ignored: ignored.to_string(),
                untracked: untracked.to_string(),
                fail_status: false,
            }
        }

        fn outside_repo() -> Self {
            Self {
                toplevel: None,
                ignored: String::new(),
                untracked: String::new(),
                fail_status: false,
            }
        }
    }

    impl Git for FakeGit {
        async fn run_git_command(&self, args: &[&str]) -> Result<String> {
            match args.first().copied() {
                Some("rev-parse") => self
                    .toplevel
                    .as_ref()
                    .map(|root| format!("{}\n", root.display()))
                    .ok_or_else(|| Error::GitCommandError("not a git repository".to_string())),
                Some("status") if self.fail_status => {
                    Err(Error::GitCommandError("status failed".to_string()))
                }
                Some("status") if args.contains(&"--ignored") => Ok(self.ignored.clone()),
                Some("status") => Ok(self.untracked.clone()),
                _ => Err(Error::GitCommandError(format!("unexpected command {args:?}"))),
            }
        }
    }

    fn root_of(tree: &Tree) -> PathBuf {
        tree.root.canonicalize().expect("Failed to canonicalize")
    }

    fn names_and_codes(listing: &Listing) -> Vec<(&str, &str)> {
        listing
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.status.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_statuses_merged_with_listing() {
        let tree = TreeBuilder::default()
            .add_file("foo.txt", "content")
            .add_file("bar.txt", "content")
            .add_file("baz.txt", "content")
            .create()
            .expect("Failed to create tree");
        let root = root_of(&tree);
        let git = FakeGit::repo(&root, " M foo.txt\n?? bar.txt\n", " M foo.txt\n?? bar.txt\n");

        let listing = Lister::with_git(git, &tree.root, ListingOptions::default())
            .list()
            .await
            .expect("Failed to list");

        assert_eq!(listing.mode, ListingMode::Git { root });
        assert_eq!(
            names_and_codes(&listing),
            vec![("bar.txt", "??"), ("baz.txt", "  "), ("foo.txt", " M")]
        );
        assert_eq!(listing.widths.mode, 10);
    }

    #[tokio::test]
    async fn test_deleted_file_gets_placeholder_entry() {
        let tree = TreeBuilder::default()
            .add_file("kept.txt", "content")
            .create()
            .expect("Failed to create tree");
        let root = root_of(&tree);
        let git = FakeGit::repo(&root, "D  gone.txt\n", "D  gone.txt\n");

        let listing = Lister::with_git(git, &tree.root, ListingOptions::default())
            .list()
            .await
            .expect("Failed to list");

        assert_eq!(
            names_and_codes(&listing),
            vec![("gone.txt", "D "), ("kept.txt", "  ")]
        );
        let gone = &listing.entries[0];
        assert!(gone.is_deleted());
        assert_eq!(gone.uid, "·············");
        assert_eq!(listing.widths.uid, 13);
    }

    #[tokio::test]
    async fn test_subdirectory_paths_rebased() {
        let tree = TreeBuilder::default()
            .add_file("src/lib.rs", "content")
            .add_file("src/main.rs", "content")
            .add_file("README.md", "content")
            .create()
            .expect("Failed to create tree");
        let root = root_of(&tree);
        let git = FakeGit::repo(&root, " M src/lib.rs\n", " M src/lib.rs\n");

        let listing = Lister::with_git(git, &tree.root.join("src"), ListingOptions::default())
            .list()
            .await
            .expect("Failed to list");

        assert_eq!(listing.dir, root.join("src"));
        assert_eq!(
            names_and_codes(&listing),
            vec![("lib.rs", " M"), ("main.rs", "  ")]
        );
    }

    #[tokio::test]
    async fn test_hidden_entries_need_all() {
        let tree = TreeBuilder::default()
            .add_file("visible", "content")
            .add_file(".env", "content")
            .create()
            .expect("Failed to create tree");
        let root = root_of(&tree);
        let report = "?? .env\n?? visible\n";

        let hidden = Lister::with_git(
            FakeGit::repo(&root, report, report),
            &tree.root,
            ListingOptions::default(),
        )
        .list()
        .await
        .expect("Failed to list");
        let all = Lister::with_git(
            FakeGit::repo(&root, report, report),
            &tree.root,
            ListingOptions {
                all: true,
                ..ListingOptions::default()
            },
        )
        .list()
        .await
        .expect("Failed to list");

        assert_eq!(names_and_codes(&hidden), vec![("visible", "??")]);
        assert_eq!(
            names_and_codes(&all),
            vec![(".env", "??"), ("visible", "??")]
        );
    }

    #[tokio::test]
    async fn test_plain_listing_outside_repository() {
        let tree = TreeBuilder::default()
            .add_file("b.txt", "content")
            .add_file("a.txt", "content")
            .create()
            .expect("Failed to create tree");

        let lister =
            Lister::with_git(FakeGit::outside_repo(), &tree.root, ListingOptions::default());
        let listing = lister.list().await.expect("Failed to list");

        assert_eq!(listing.mode, ListingMode::Plain);
        assert_eq!(
            names_and_codes(&listing),
            vec![("a.txt", "  "), ("b.txt", "  ")]
        );
    }

    #[tokio::test]
    async fn test_plain_listing_with_all_includes_dot_entries() {
        let tree = TreeBuilder::default()
            .add_file("a.txt", "content")
            .create()
            .expect("Failed to create tree");
        let options = ListingOptions {
            all: true,
            ..ListingOptions::default()
        };

        let listing = Lister::with_git(FakeGit::outside_repo(), &tree.root, options)
            .list()
            .await
            .expect("Failed to list");

        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "a.txt"]);
        assert!(listing.entries[0].is_directory);
    }

    #[tokio::test]
    async fn test_non_utf8_names_listed_in_both_modes() {
        use std::os::unix::ffi::OsStrExt;

        let tree = TreeBuilder::default()
            .add_file("ok.txt", "content")
            .create()
            .expect("Failed to create tree");
        let bad = std::ffi::OsStr::from_bytes(b"bad\xffname");
        std::fs::write(tree.root.join(bad), "content").expect("Failed to create file");
        let root = root_of(&tree);
        let report = "?? \"bad\\377name\"\n";

        let plain = Lister::with_git(
            FakeGit::outside_repo(),
            &tree.root,
            ListingOptions::default(),
        )
        .list()
        .await
        .expect("Failed to list");
        let git = Lister::with_git(
            FakeGit::repo(&root, report, report),
            &tree.root,
            ListingOptions::default(),
        )
        .list()
        .await
        .expect("Failed to list");

        assert_eq!(
            names_and_codes(&plain),
            vec![("bad\u{FFFD}name", "  "), ("ok.txt", "  ")]
        );
        assert_eq!(
            names_and_codes(&git),
            vec![("bad\u{FFFD}name", "??"), ("ok.txt", "  ")]
        );
        assert_eq!(git.entries[0].size, "7");
    }

    #[tokio::test]
    async fn test_status_failure_is_fatal() {
        let tree = TreeBuilder::default()
            .add_file("a.txt", "content")
            .create()
            .expect("Failed to create tree");
        let mut git = FakeGit::repo(&root_of(&tree), "", "");
        git.fail_status = true;

        let result = Lister::with_git(git, &tree.root, ListingOptions::default())
            .list()
            .await;

        assert!(matches!(result, Err(Error::GitCommandError(_))));
    }
}
