use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotesError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error")]
    Internal,
}

impl NotesError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for NotesError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            e @ (NoteNotFound { .. } | UserNotFound { .. }) => Self::not_found(e.to_string()),
            e @ NoteForbidden { .. } => Self::forbidden(e.to_string()),
            e @ Validation { .. } => Self::validation(e.to_string()),
            NotAuthenticated | InvalidCredentials => Self::Unauthorized,
            Database { .. } | Internal { .. } => Self::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    #[test]
    fn internal_details_are_not_exposed() {
        let e: NotesError = DomainError::database("disk I/O error").into();
        assert_eq!(e, NotesError::Internal);
        assert_eq!(e.to_string(), "Internal error");
    }

    #[test]
    fn ownership_maps_to_forbidden() {
        let e: NotesError = DomainError::note_forbidden(7).into();
        assert!(matches!(e, NotesError::Forbidden { .. }));
    }
}
