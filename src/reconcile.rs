//! Aligns a [`StatusMap`] with what is actually on disk.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::types::{ListedFile, StatusCode, StatusMap};

/// Merge `statuses` with the literal listing of the directory.
///
/// Ignored entries survive only when they name a top-level file, files git says
/// nothing about are marked clean, and the result is sorted by name. Tracked changes
/// below the top level (and deletions) are kept even though the listing does not show
/// them. Listing names are matched by their printable form but keep their exact bytes
/// for the metadata lookup.
#[instrument(skip_all, fields(statuses = statuses.len(), listing = listing.len()))]
pub fn reconcile<S: AsRef<OsStr>>(mut statuses: StatusMap, listing: &[S]) -> Vec<ListedFile> {
    let names: HashMap<String, &OsStr> = listing
        .iter()
        .map(|name| {
            let name = name.as_ref();
            (name.to_string_lossy().into_owned(), name)
        })
        .collect();

    let before = statuses.len();
    statuses.retain(|path, entry| !entry.code.is_ignored() || names.contains_key(path.as_str()));
    debug!(trimmed = before - statuses.len(), "Nested ignored entries trimmed");

    let mut merged: Vec<ListedFile> = statuses
        .into_iter()
        .map(|(name, entry)| ListedFile {
            name,
            path: entry.path,
            status: entry.code,
        })
        .collect();

    let known: HashSet<String> = merged.iter().map(|file| file.name.clone()).collect();
    merged.extend(
        names
            .into_iter()
            .filter(|(name, _)| !known.contains(name))
            .map(|(name, raw)| ListedFile {
                name,
                path: PathBuf::from(raw),
                status: StatusCode::clean(),
            }),
    );

    merged.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    debug!(entries = merged.len(), "Statuses reconciled");
    merged
}
