use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },
    #[error("not found")]
    NotFound,
    #[error("request already acted on")]
    AlreadyActed,
    #[error("forbidden")]
    Forbidden,
    #[error("collaborator failure: {0}")]
    Collaborator(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
