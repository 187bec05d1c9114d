use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or resolving an API description document.
///
/// Every variant aborts tool registration for the whole document.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("API document not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to read API document {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse API document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unsupported $ref (only same-document '#/...' references are allowed): {0}")]
    UnsupportedReference(String),
    #[error("invalid API document: {0}")]
    InvalidSpec(String),
}
