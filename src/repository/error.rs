use thiserror::Error;

/// Failures reported by persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("corrupted record: {0}")]
    CorruptedData(String),
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;
