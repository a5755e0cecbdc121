use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Git command failed: {0}")]
    GitCommandError(String),

    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("Cannot read metadata for {}: {source}", path.display())]
    MetadataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata task failed: {0}")]
    TaskError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
