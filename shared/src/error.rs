use thiserror::Error;

/// Failures that reach a caller. Persistence and remote-directory problems
/// are handled (logged and discarded) at their call sites and never
/// propagate out of the containers.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input on a create path (e.g. empty passenger name)
    #[error("validation error: {0}")]
    Validation(String),

    /// Identity-provider failure the caller must see (sign-in rejected)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote user-directory failure, caught by the directory container
    #[error("remote directory error: {0}")]
    Remote(String),

    /// Durable local store failure, caught by the store adapter
    #[error("local store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
