use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("match not found: {0}")]
    NotFound(String),

    /// `create` lost against an existing row with the same match id.
    #[error("match already exists: {0}")]
    Duplicate(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("store backend error: {0}")]
    Backend(#[source] BoxError),

    /// A stored row could not be decoded into a `MatchRecord`.
    #[error("store codec error: {0}")]
    Codec(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}
