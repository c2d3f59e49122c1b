use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Service error taxonomy. The API layer maps these one-to-one onto status
/// codes (404 / 409 / 400 / 500); raw engine errors never cross this boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl StoreError {
    /// Error mapper for insert sites: a constraint violation means the row
    /// already exists (unique index is the final arbiter against races),
    /// anything else is a storage fault.
    pub fn on_insert(what: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(what)
            }
            other => other.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> StoreError {
        StoreError::Validation(msg.into())
    }
}
