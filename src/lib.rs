pub use error::{Error, Result};
pub use processor::Lister;
pub use types::{
    ColumnWidths, Entry, ListedFile, Listing, ListingMode, ListingOptions, StatusCode,
    StatusEntry, StatusMap,
};

use std::path::Path;

mod error;
pub mod git;
pub mod markers;
pub mod metadata;
pub mod processor;
pub mod reconcile;
pub mod render;
pub mod status;
mod types;

/// Lists `dir`, annotating each entry with its git status when `dir` is inside a work tree.
///
/// # Arguments
///
/// * `dir`: The directory to list.
/// * `options`: Hidden-file options.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, a status query fails, or metadata
/// cannot be read for one of the listed files. Not being inside a repository is not an
/// error; the listing is produced without status markers.
pub async fn list(dir: &Path, options: ListingOptions) -> Result<Listing> {
    Lister::new(dir, options).list().await
}
