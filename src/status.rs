//! Porcelain status parsing.
//!
//! Two reports are merged into one [`StatusMap`] keyed by paths relative to the listed
//! directory. The reports overlap on purpose, so identical lines are collapsed before
//! anything is inserted.

use std::collections::HashSet;
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::types::{StatusCode, StatusEntry, StatusMap};

/// Parse raw `git status --porcelain` reports into a [`StatusMap`].
///
/// Paths in the reports are relative to `repo_root`; keys in the returned map are
/// relative to `dir`. When the same path shows up with different codes the later line
/// wins.
#[instrument(skip(reports), fields(report_count = reports.len(), repo_root = %repo_root.display(), dir = %dir.display()))]
pub fn parse_status<S: AsRef<str>>(reports: &[S], repo_root: &Path, dir: &Path) -> StatusMap {
    let mut seen = HashSet::new();
    let mut statuses = StatusMap::new();

    let lines = reports
        .iter()
        .flat_map(|report| report_lines(report.as_ref()))
        .filter(|line| seen.insert(*line));

    for line in lines {
        let Some((path, code, is_dir)) = parse_line(line) else {
            debug!(line = %line, "Skipping malformed status line");
            continue;
        };

        let relative = rebase(&path, repo_root, dir);
        if relative.as_os_str().is_empty() {
            // the listed directory itself
            continue;
        }
        let key = relative.to_string_lossy().into_owned();
        statuses.insert(
            key,
            StatusEntry {
                code,
                is_dir,
                path: relative,
            },
        );
    }

    debug!(count = statuses.len(), "Status lines parsed");
    statuses
}

/// Drop untracked directories; their files are already listed one by one.
#[instrument(skip_all)]
pub fn remove_untracked_folders(statuses: &mut StatusMap) {
    let before = statuses.len();
    statuses.retain(|_, entry| !(entry.code.is_untracked() && entry.is_dir));
    debug!(removed = before - statuses.len(), "Untracked folders removed");
}

/// Drop entries whose first path component is a dot file.
#[instrument(skip_all)]
pub fn remove_hidden(statuses: &mut StatusMap) {
    statuses.retain(|path, _| !is_hidden(path));
}

pub(crate) fn is_hidden(path: &str) -> bool {
    path.starts_with('.')
}

/// Every report ends with a newline, which leaves one empty trailing element.
fn report_lines(report: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = report.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

fn parse_line(line: &str) -> Option<(PathBuf, StatusCode, bool)> {
    let code = StatusCode::new(line.get(..2)?)?;
    let mut path = line.get(3..)?;

    if code.is_rename_or_copy() {
        if let Some((_, to)) = path.rsplit_once(" -> ") {
            path = to;
        }
    }

    let mut bytes = unquote(path);
    let is_dir = bytes.last() == Some(&b'/');
    if is_dir {
        bytes.pop();
    }
    if bytes.is_empty() {
        return None;
    }

    Some((PathBuf::from(OsString::from_vec(bytes)), code, is_dir))
}

fn rebase(path: &Path, repo_root: &Path, dir: &Path) -> PathBuf {
    let absolute = repo_root.join(path);
    let relative = absolute.strip_prefix(dir).map(Path::to_path_buf);
    relative.unwrap_or(absolute)
}

/// Undo git's C-style quoting of unusual path names, yielding the raw name bytes.
fn unquote(path: &str) -> Vec<u8> {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return path.as_bytes().to_vec();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(byte) = iter.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match iter.next() {
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b't') => bytes.push(b'\t'),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'v') => bytes.push(0x0b),
            Some(b'f') => bytes.push(0x0c),
            Some(b'r') => bytes.push(b'\r'),
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&next) if (b'0'..=b'7').contains(&next) => {
                            value = value * 8 + u32::from(next - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    bytes
}
