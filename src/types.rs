use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Two-character porcelain status code, e.g. `" M"`, `"??"` or `"!!"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(String);

impl StatusCode {
    /// Builds a code from the first two characters of `code`.
    ///
    /// Returns `None` when fewer than two characters are available.
    #[must_use]
    pub fn new(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let x = chars.next()?;
        let y = chars.next()?;
        Some(Self([x, y].iter().collect()))
    }

    /// The code of a file that git reports nothing about.
    #[must_use]
    pub fn clean() -> Self {
        Self("  ".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.0 == "  "
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.0 == "D " || self.0 == " D"
    }

    #[must_use]
    pub fn is_untracked(&self) -> bool {
        self.0 == "??"
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.0 == "!!"
    }

    /// Renames and copies carry `old -> new` in their path field.
    #[must_use]
    pub fn is_rename_or_copy(&self) -> bool {
        self.0.starts_with('R') || self.0.starts_with('C')
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::clean()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed status line, keyed in a [`StatusMap`] by its path relative to the listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: StatusCode,
    /// The porcelain path ended with `/` before it was trimmed.
    pub is_dir: bool,
    /// Exact on-disk path relative to the listed directory; the map key may be lossy.
    pub path: PathBuf,
}

pub type StatusMap = HashMap<String, StatusEntry>;

/// A reconciled row waiting for its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Printable name, used for sorting and display
    pub name: String,
    /// Path to stat, relative to the listed directory
    pub path: PathBuf,
    pub status: StatusCode,
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub mode: String,
    pub nlink: String,
    pub uid: String,
    pub gid: String,
    pub size: String,
    pub date: String,
    pub status: StatusCode,
    pub name: String,
    pub is_directory: bool,
    pub is_symbolic_link: bool,
    pub is_executable: bool,
    pub realpath: Option<PathBuf>,
}

impl Entry {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }
}

/// Maximum printed width of each variable-width column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnWidths {
    pub mode: usize,
    pub nlink: usize,
    pub uid: usize,
    pub gid: usize,
    pub size: usize,
    pub date: usize,
}

impl ColumnWidths {
    /// Folds every entry into a fresh set of widths.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut widths, entry| {
            widths.observe(entry);
            widths
        })
    }

    pub fn observe(&mut self, entry: &Entry) {
        let width = |value: &str| value.chars().count();
        self.mode = self.mode.max(width(&entry.mode));
        self.nlink = self.nlink.max(width(&entry.nlink));
        self.uid = self.uid.max(width(&entry.uid));
        self.gid = self.gid.max(width(&entry.gid));
        self.size = self.size.max(width(&entry.size));
        self.date = self.date.max(width(&entry.date));
    }
}

/// How the listed directory relates to version control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingMode {
    /// Inside a work tree whose top level is `root`.
    Git { root: PathBuf },
    /// Not inside a repository.
    Plain,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub dir: PathBuf,
    pub mode: ListingMode,
    pub total_blocks: u64,
    pub widths: ColumnWidths,
    pub entries: Vec<Entry>,
}

impl Listing {
    #[must_use]
    pub const fn is_git(&self) -> bool {
        matches!(self.mode, ListingMode::Git { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingOptions {
    /// Include entries whose name starts with `.`
    pub all: bool,
}
