use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage is closed")]
    Closed,
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Closed => "STORAGE_CLOSED",
            StorageError::Backend(_) => "STORAGE_BACKEND",
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
