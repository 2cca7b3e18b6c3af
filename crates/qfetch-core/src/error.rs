use thiserror::Error;

/// Errors raised by the result cache and its collaborators.
///
/// The cache-side variants map one-to-one onto how callers must react:
/// `NotFound` is expected and never logged as an error, `ReadError` is
/// treated as a miss, `WriteError` never fails an in-flight response, and
/// `Fetch` is the only variant that surfaces to the caller of a cached
/// query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("cache entry not found: {0}")]
    NotFound(String),

    #[error("cache read error: {0}")]
    ReadError(String),

    #[error("cache write error: {0}")]
    WriteError(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] ConnectorError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
}

/// Errors surfaced across the remote-engine boundary.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("query execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
