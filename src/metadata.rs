//! Filesystem metadata for listing entries.
//!
//! Every file is stat'ed concurrently; results are folded back in listing order once
//! all lookups have finished, so widths and block totals are computed in one pass.

use chrono::{DateTime, Local, TimeZone};
use nix::unistd::{Gid, Group, Uid, User};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::{Entry, ListedFile, StatusCode};

const DATE_FORMAT: &str = "%b %d %H:%M";

const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

/// Raw `lstat` result for one file.
#[derive(Debug, Clone)]
pub struct FileStat {
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub blocks: u64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// Resolved target, only for symbolic links
    pub realpath: Option<PathBuf>,
}

/// Stat `path` without following symbolic links.
///
/// # Errors
///
/// Returns [`Error::MetadataUnavailable`] if the file cannot be stat'ed.
pub async fn stat(path: PathBuf) -> Result<FileStat> {
    let metadata = tokio::fs::symlink_metadata(&path)
        .await
        .map_err(|source| Error::MetadataUnavailable {
            path: path.clone(),
            source,
        })?;

    let file_type = metadata.file_type();
    let realpath = if file_type.is_symlink() {
        Some(resolve_link(&path).await?)
    } else {
        None
    };

    Ok(FileStat {
        mode: metadata.mode(),
        nlink: metadata.nlink(),
        uid: metadata.uid(),
        gid: metadata.gid(),
        size: metadata.size(),
        blocks: metadata.blocks(),
        mtime: metadata.mtime(),
        mtime_nsec: metadata.mtime_nsec(),
        is_dir: file_type.is_dir(),
        is_symlink: file_type.is_symlink(),
        realpath,
    })
}

/// Canonical target of a link, or its raw target when the link dangles.
async fn resolve_link(path: &Path) -> Result<PathBuf> {
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return Ok(resolved);
    }

    let target = tokio::fs::read_link(path)
        .await
        .map_err(|source| Error::MetadataUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), target = %target.display(), "Dangling symbolic link");

    Ok(match path.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target,
    })
}

/// Names of the entries in `dir`, skipping dot files unless `include_hidden` is set.
///
/// Names are returned exactly as the OS reports them, valid UTF-8 or not.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub async fn read_dir_names(dir: &Path, include_hidden: bool) -> Result<Vec<OsString>> {
    let mut names = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name();
        if include_hidden || !name.as_bytes().starts_with(b".") {
            names.push(name);
        }
    }

    debug!(count = names.len(), "Directory read");
    Ok(names)
}

/// Build entries for every listed file, stat'ing all live files concurrently.
///
/// Deleted files get placeholder entries instead of a lookup. Returns the entries in
/// input order together with the summed block count of the live ones.
///
/// # Errors
///
/// The first failed lookup aborts the remaining ones and is returned.
#[instrument(skip(files), fields(dir = %dir.display(), count = files.len()))]
pub async fn collect_entries(dir: &Path, files: Vec<ListedFile>) -> Result<(Vec<Entry>, u64)> {
    let mut tasks = JoinSet::new();
    for (index, file) in files.iter().enumerate() {
        if file.status.is_deleted() {
            continue;
        }
        let path = dir.join(&file.path);
        tasks.spawn(async move { (index, stat(path).await) });
    }

    let mut stats: Vec<Option<FileStat>> = files.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(|e| Error::TaskError(e.to_string()))?;
        stats[index] = Some(result?);
    }

    let mut names = NameCache::default();
    let mut total_blocks = 0;
    let mut entries = Vec::with_capacity(files.len());
    for (file, stat) in files.into_iter().zip(stats) {
        match stat {
            Some(stat) => {
                total_blocks += stat.blocks;
                entries.push(entry_from_stat(file.name, file.status, &stat, &mut names));
            }
            None => entries.push(deleted_entry(file.name, file.status)),
        }
    }

    debug!(entries = entries.len(), total_blocks, "Entries collected");
    Ok((entries, total_blocks))
}

/// Entry for a file that no longer exists on disk.
#[must_use]
pub fn deleted_entry(name: String, status: StatusCode) -> Entry {
    Entry {
        mode: "··········".to_string(),
        nlink: "···".to_string(),
        uid: "·············".to_string(),
        gid: "·····".to_string(),
        size: "·····".to_string(),
        date: "··· ·· ·····".to_string(),
        status,
        name,
        is_directory: false,
        is_symbolic_link: false,
        is_executable: false,
        realpath: None,
    }
}

fn entry_from_stat(
    name: String,
    status: StatusCode,
    stat: &FileStat,
    names: &mut NameCache,
) -> Entry {
    Entry {
        mode: mode_string(stat.mode),
        nlink: stat.nlink.to_string(),
        uid: names.user(stat.uid),
        gid: names.group(stat.gid),
        size: stat.size.to_string(),
        date: Local
            .timestamp_opt(stat.mtime, u32::try_from(stat.mtime_nsec).unwrap_or(0))
            .earliest()
            .map_or_else(|| stat.mtime.to_string(), |time| format_date(&time)),
        status,
        name,
        is_directory: stat.is_dir,
        is_symbolic_link: stat.is_symlink,
        is_executable: is_executable(stat.mode),
        realpath: stat.realpath.clone(),
    }
}

pub(crate) fn format_date<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format(DATE_FORMAT).to_string()
}

/// Any of the owner, group or other execute bits.
#[must_use]
pub const fn is_executable(mode: u32) -> bool {
    mode & 0o111 != 0
}

/// `ls -l` style mode string, e.g. `drwxr-xr-x`.
#[must_use]
pub fn mode_string(mode: u32) -> String {
    let kind = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        S_IFREG => '-',
        _ => '?',
    };

    let bit = |mask: u32, c: char| if mode & mask == 0 { '-' } else { c };
    let special = |exec: u32, flag: u32, set: char| match (mode & exec != 0, mode & flag != 0) {
        (true, true) => set,
        (false, true) => set.to_ascii_uppercase(),
        (true, false) => 'x',
        (false, false) => '-',
    };

    [
        kind,
        bit(0o400, 'r'),
        bit(0o200, 'w'),
        special(0o100, 0o4000, 's'),
        bit(0o040, 'r'),
        bit(0o020, 'w'),
        special(0o010, 0o2000, 's'),
        bit(0o004, 'r'),
        bit(0o002, 'w'),
        special(0o001, 0o1000, 't'),
    ]
    .iter()
    .collect()
}

/// Memoized uid/gid to name lookups; unknown ids print as numbers.
#[derive(Default)]
struct NameCache {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl NameCache {
    fn user(&mut self, uid: u32) -> String {
        self.users
            .entry(uid)
            .or_insert_with(|| {
                User::from_uid(Uid::from_raw(uid))
                    .ok()
                    .flatten()
                    .map_or_else(|| uid.to_string(), |user| user.name)
            })
            .clone()
    }

    fn group(&mut self, gid: u32) -> String {
        self.groups
            .entry(gid)
            .or_insert_with(|| {
                Group::from_gid(Gid::from_raw(gid))
                    .ok()
                    .flatten()
                    .map_or_else(|| gid.to_string(), |group| group.name)
            })
            .clone()
    }
}
