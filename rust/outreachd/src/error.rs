use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadParams(String),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl OutreachError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::BadParams(message.into())
    }

    /// Stable code carried in the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Validation(_) => "validation_failed",
            Self::BadParams(_) => "bad_params",
            Self::Db(_) => "db_query_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, OutreachError>;
